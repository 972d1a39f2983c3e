//! Core types shared across the XLFacility crates
//!
//! This crate provides the foundational types used by the dispatcher and
//! by logger backends:
//!
//! - **Levels**: `LogLevel` ordering, parsing and an atomic cell
//! - **Schema constants**: Reserved tags and environment variable names

pub mod level;
pub mod schema;

pub use level::{AtomicLogLevel, LevelParseError, LogLevel};
