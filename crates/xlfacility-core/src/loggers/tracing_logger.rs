//! Backend that re-emits events through `tracing`
//!
//! Levels map onto the nearest `tracing` level: DEBUG and VERBOSE become
//! `DEBUG`, EXCEPTION and ABORT become `ERROR`. Every event is emitted under
//! [`TRACING_TARGET`], which the facility's own `tracing` bridge ignores.

use xlfacility_core_types::{AtomicLogLevel, LogLevel};

use crate::event::Event;
use crate::logger::Logger;

/// Target of every `tracing` event emitted by [`TracingLogger`]
pub const TRACING_TARGET: &str = "xlfacility_core::events";

/// Forwards delivered events to the active `tracing` subscriber
#[derive(Default)]
pub struct TracingLogger {
    min_level: AtomicLogLevel,
}

impl TracingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_min_level(&self, level: LogLevel) {
        self.min_level.store(level);
    }
}

macro_rules! forward {
    ($macro:ident, $event:expr) => {{
        let event = $event;
        tracing::$macro!(
            target: TRACING_TARGET,
            facility_level = %event.level(),
            tag = event.tag().unwrap_or_default(),
            frames = event.callstack().map_or(0, <[String]>::len),
            "{}",
            event.message()
        )
    }};
}

impl Logger for TracingLogger {
    fn deliver(&self, event: &Event) {
        match event.level() {
            LogLevel::Debug | LogLevel::Verbose => forward!(debug, event),
            LogLevel::Info => forward!(info, event),
            LogLevel::Warning => forward!(warn, event),
            LogLevel::Error | LogLevel::Exception | LogLevel::Abort => forward!(error, event),
        }
    }

    fn min_level(&self) -> LogLevel {
        self.min_level.load()
    }

    fn name(&self) -> &str {
        "TracingLogger"
    }
}
