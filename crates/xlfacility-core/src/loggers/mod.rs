//! Bundled logger backends
//!
//! - [`StandardLogger`]: text or JSON lines on standard output or error
//! - [`CallbackLogger`]: calls a closure for each event
//! - [`MemoryLogger`]: keeps events in memory for inspection
//! - [`TracingLogger`]: forwards events into `tracing`

pub mod callback;
pub mod memory;
pub mod standard;
pub mod tracing_logger;

pub use callback::CallbackLogger;
pub use memory::MemoryLogger;
pub use standard::{OutputFormat, StandardLogger};
pub use tracing_logger::{TracingLogger, TRACING_TARGET};
