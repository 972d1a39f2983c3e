//! Logging initialization module
//!
//! Provides a single initialization point for the process: it configures the
//! shared facility for the profile and routes `tracing` events into it.

use std::sync::{Arc, Once};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use xlfacility_core_types::LogLevel;

use crate::capture::StandardStream;
use crate::facility::Facility;
use crate::logger::Logger;
use crate::loggers::{OutputFormat, StandardLogger};

use super::bridge::FacilityLayer;

/// Logging profile configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output for development
    Development,
    /// JSON structured output for production
    Production,
    /// No output backend; tests attach their own loggers
    Test,
}

impl Profile {
    /// Global floor applied to the shared facility
    pub fn min_log_level(&self) -> LogLevel {
        match self {
            Profile::Development | Profile::Test => LogLevel::Debug,
            Profile::Production => LogLevel::Info,
        }
    }

    /// Directive used when `RUST_LOG` is not set
    pub fn default_filter(&self) -> &'static str {
        match self {
            Profile::Development => "debug",
            Profile::Production => "info",
            Profile::Test => "trace",
        }
    }
}

static INIT_ONCE: Once = Once::new();

/// Initialize the logging facility
///
/// This function should be called once at application startup. Later calls
/// are ignored, whatever their profile.
///
/// # Profiles
///
/// - **Development**: text lines on stderr, DEBUG floor
/// - **Production**: JSON lines on stderr, INFO floor
/// - **Test**: no backend, every `tracing` event bridged
///
/// # Example
///
/// ```
/// use xlfacility_core::logging_facility::{init, Profile};
///
/// init(Profile::Development);
/// ```
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        let facility = Facility::shared();
        facility.set_min_log_level(profile.min_log_level());

        let backend: Option<Arc<dyn Logger>> = match profile {
            Profile::Development => Some(StandardLogger::shared_error()),
            Profile::Production => Some(Arc::new(StandardLogger::new(
                StandardStream::Error,
                OutputFormat::Json,
            ))),
            Profile::Test => None,
        };
        if let Some(backend) = backend {
            // The shared stderr logger may already be installed
            if let Err(e) = facility.add_logger(backend) {
                tracing::debug!(error = %e, "Profile backend not added");
            }
        }

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(profile.default_filter()));
        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(FacilityLayer::new(facility))
            .try_init();
        if installed.is_err() {
            facility.log_message(
                "A global tracing subscriber is already set; tracing events are not bridged",
                Some(xlfacility_core_types::schema::TAG_INTERNAL),
                LogLevel::Warning,
            );
        }
    });
}
