//! Process setup and `tracing` integration
//!
//! This module connects the facility with the `tracing` ecosystem:
//! - Single initialization point via `init(profile)`
//! - [`FacilityLayer`] turning `tracing` events into facility events
//! - Formatting macros (`xlog_info!`, `xlog_error!`, ...) that defer rendering
//!   until the level check passed
//!
//! # Usage
//!
//! ```rust
//! use xlfacility_core::logging_facility::{init, Profile};
//!
//! // Initialize once at application startup
//! init(Profile::Test);
//! tracing::info!(target: "app", "ready");
//! ```

pub mod bridge;
pub mod init;
pub mod macros;

pub use bridge::FacilityLayer;
pub use init::{init, Profile};
