//! Canonical schema constants for facility events
//!
//! These constants are compared by value, so any string equal to one of them
//! is treated as the reserved tag.

// Reserved tags
pub const TAG_INTERNAL: &str = "xlfacility.internal";
pub const TAG_CAPTURED_STDOUT: &str = "xlfacility.captured-stdout";
pub const TAG_CAPTURED_STDERR: &str = "xlfacility.captured-stderr";
pub const TAG_UNCAUGHT_EXCEPTIONS: &str = "xlfacility.uncaught-exceptions";
pub const TAG_INITIALIZED_EXCEPTIONS: &str = "xlfacility.initialized-exceptions";

// Environment
pub const ENV_MIN_LOG_LEVEL: &str = "XLFacilityMinLogLevel";
