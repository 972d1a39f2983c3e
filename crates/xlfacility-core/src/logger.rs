//! Logger capability trait
//!
//! A logger is any backend that consumes events. The facility owns the
//! lifecycle calls (`open` when added, `close` when removed) and delivers
//! each accepted event from a thread dedicated to that logger.

use crate::errors::Result;
use crate::event::Event;
use crate::worker::guarded;
use std::sync::Arc;
use xlfacility_core_types::LogLevel;

/// Stand-in used when a logger panics while naming itself
const UNNAMED_LOGGER: &str = "<unnamed logger>";

/// Contract every logger backend fulfils
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`. `deliver` is only ever called from
/// one thread at a time per registration, but the same `Event` may be read by
/// other loggers concurrently.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use xlfacility_core::{Event, Facility, LogLevel, Logger};
///
/// struct Printer;
///
/// impl Logger for Printer {
///     fn deliver(&self, event: &Event) {
///         println!("{} {}", event.level(), event.message());
///     }
/// }
///
/// let facility = Facility::new();
/// facility.add_logger(Arc::new(Printer)).unwrap();
/// facility.log_message("hello", None, LogLevel::Error);
/// facility.flush();
/// ```
pub trait Logger: Send + Sync {
    /// Prepare the backend for delivery
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be used; the facility then
    /// refuses to register it.
    fn open(&self) -> Result<()> {
        Ok(())
    }

    /// Release backend resources
    fn close(&self) {}

    /// Consume one event
    ///
    /// Failures are the backend's own concern and must not escape. A logger
    /// may flush or remove itself from here; neither waits on its own queue.
    fn deliver(&self, event: &Event);

    /// Minimum level this backend wants to receive
    fn min_level(&self) -> LogLevel {
        LogLevel::MIN
    }

    /// Per-backend threshold check
    ///
    /// Runs on the logging thread. A logger whose check panics receives no
    /// further events.
    fn accepts(&self, level: LogLevel) -> bool {
        level >= self.min_level()
    }

    /// Name used in diagnostics and errors
    ///
    /// Read once when the logger is added.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Identity of a logger instance, independent of the trait object vtable
pub(crate) fn logger_id<L: Logger + ?Sized>(logger: &Arc<L>) -> usize {
    Arc::as_ptr(logger) as *const () as usize
}

/// The logger's name, or a placeholder if `name` panics
pub(crate) fn logger_name<L: Logger + ?Sized>(logger: &L) -> String {
    guarded(|| logger.name().to_string()).unwrap_or_else(|_| UNNAMED_LOGGER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Quiet;

    impl Logger for Quiet {
        fn deliver(&self, _event: &Event) {}

        fn min_level(&self) -> LogLevel {
            LogLevel::Warning
        }
    }

    #[test]
    fn test_logger_is_object_safe() {
        let logger: Arc<dyn Logger> = Arc::new(Quiet);
        assert!(logger.open().is_ok());
        logger.close();
    }

    #[test]
    fn test_accepts_uses_min_level() {
        let logger = Quiet;
        assert!(!logger.accepts(LogLevel::Info));
        assert!(logger.accepts(LogLevel::Warning));
        assert!(logger.accepts(LogLevel::Abort));
    }

    #[test]
    fn test_default_name_is_type_name() {
        assert!(Quiet.name().ends_with("Quiet"));
    }

    struct Nameless;

    impl Logger for Nameless {
        fn deliver(&self, _event: &Event) {}

        fn name(&self) -> &str {
            panic!("no name")
        }
    }

    #[test]
    fn test_logger_name_survives_panicking_name() {
        assert!(logger_name(&Quiet).ends_with("Quiet"));
        assert_eq!(logger_name(&Nameless), UNNAMED_LOGGER);
    }

    #[test]
    fn test_logger_id_is_stable_across_coercion() {
        let concrete = Arc::new(Quiet);
        let erased: Arc<dyn Logger> = concrete.clone();
        assert_eq!(logger_id(&concrete), logger_id(&erased));

        let other: Arc<dyn Logger> = Arc::new(Quiet);
        assert_ne!(logger_id(&erased), logger_id(&other));
    }
}
