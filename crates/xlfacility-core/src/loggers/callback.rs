//! Closure-backed logger

use xlfacility_core_types::{AtomicLogLevel, LogLevel};

use crate::event::Event;
use crate::logger::Logger;

type Callback = Box<dyn Fn(&Event) + Send + Sync>;

/// Calls a closure for every delivered event
pub struct CallbackLogger {
    callback: Callback,
    min_level: AtomicLogLevel,
}

impl CallbackLogger {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
            min_level: AtomicLogLevel::new(LogLevel::MIN),
        }
    }

    pub fn set_min_level(&self, level: LogLevel) {
        self.min_level.store(level);
    }
}

impl Logger for CallbackLogger {
    fn deliver(&self, event: &Event) {
        (self.callback)(event);
    }

    fn min_level(&self) -> LogLevel {
        self.min_level.load()
    }

    fn name(&self) -> &str {
        "CallbackLogger"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_callback_invoked_per_event() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let logger = CallbackLogger::new(move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let event = Event::new(LogLevel::Info, None, "x".to_string(), None);
        logger.deliver(&event);
        logger.deliver(&event);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_min_level() {
        let logger = CallbackLogger::new(|_| {});
        assert!(logger.accepts(LogLevel::Debug));
        logger.set_min_level(LogLevel::Error);
        assert!(!logger.accepts(LogLevel::Warning));
    }
}
