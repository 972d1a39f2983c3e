//! `tracing` to facility bridge
//!
//! [`FacilityLayer`] converts each `tracing` event into a facility event:
//! - level: TRACE and DEBUG become DEBUG, WARN becomes WARNING
//! - tag: the event target
//! - message: the `message` field followed by the other fields as `key=value`
//!
//! Events emitted by this crate, and events raised from inside a logger, are
//! not bridged so that loggers writing to `tracing` cannot loop.

use std::fmt::{self, Write as _};
use std::sync::{Arc, Weak};

use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;
use xlfacility_core_types::LogLevel;

use crate::facility::{Facility, Inner};
use crate::worker::in_logger_code;

const OWN_TARGET_PREFIX: &str = env!("CARGO_CRATE_NAME");

/// Field `tracing` uses for the formatted message of an event
const TRACING_MESSAGE_FIELD: &str = "message";

/// Map a `tracing` level onto a facility level
pub fn level_from_tracing(level: &Level) -> LogLevel {
    match *level {
        Level::TRACE | Level::DEBUG => LogLevel::Debug,
        Level::INFO => LogLevel::Info,
        Level::WARN => LogLevel::Warning,
        Level::ERROR => LogLevel::Error,
    }
}

struct FieldVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl FieldVisitor {
    fn new() -> Self {
        Self {
            message: None,
            fields: Vec::new(),
        }
    }

    fn record(&mut self, field: &Field, value: String) {
        if field.name() == TRACING_MESSAGE_FIELD {
            self.message = Some(value);
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }

    fn into_message(self) -> String {
        let mut message = self.message.unwrap_or_default();
        for (key, value) in self.fields {
            if !message.is_empty() {
                message.push(' ');
            }
            let _ = write!(message, "{}={}", key, value);
        }
        message
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record(field, format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record(field, value.to_string());
    }
}

/// Layer forwarding `tracing` events to a facility
///
/// The layer holds the facility weakly; once the facility is dropped the
/// layer does nothing.
pub struct FacilityLayer {
    inner: Weak<Inner>,
}

impl FacilityLayer {
    pub fn new(facility: &Facility) -> Self {
        Self {
            inner: Arc::downgrade(facility.inner()),
        }
    }
}

impl<S> Layer<S> for FacilityLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().starts_with(OWN_TARGET_PREFIX) || in_logger_code() {
            return;
        }
        let Some(inner) = self.inner.upgrade() else {
            return;
        };

        let level = level_from_tracing(metadata.level());
        if !inner.is_enabled(level) {
            return;
        }

        let mut visitor = FieldVisitor::new();
        event.record(&mut visitor);
        inner.log_message(visitor.into_message(), Some(metadata.target()), level);
    }
}
