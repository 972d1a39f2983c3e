//! XLFacility Core - process-wide logging dispatch and routing
//!
//! This crate provides the facility that routes log events to pluggable
//! logger backends, including:
//! - A shared facility with a global level floor and call stack threshold
//! - Per-logger delivery threads so a slow backend only delays itself
//! - A dedicated internal logger for the facility's own diagnostics
//! - Optional capture of standard output and standard error as events
//! - Optional logging of panics and constructed exceptions
//! - Bundled backends and a bridge from the `tracing` ecosystem

pub mod callstack;
pub mod capture;
pub mod config;
pub mod errors;
pub mod event;
pub mod exception;
pub mod facility;
pub mod format;
mod hooks;
pub mod logger;
pub mod loggers;
pub mod logging_facility;
mod worker;

// Re-export commonly used types
pub use capture::StandardStream;
pub use config::FacilityConfig;
pub use errors::{FacilityError, FacilityErrorKind, Result};
pub use event::Event;
pub use exception::Exception;
pub use facility::Facility;
pub use format::FORMAT_PLACEHOLDER;
pub use hooks::PANIC_FLUSH_TIMEOUT;
pub use logger::Logger;
pub use worker::LOGGER_QUEUE_CAPACITY;
pub use xlfacility_core_types::{schema, LogLevel};
