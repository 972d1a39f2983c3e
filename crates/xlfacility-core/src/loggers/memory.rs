//! In-memory logger for assertions and diagnostics
//!
//! Delivered events are kept in arrival order. With a capacity set, the
//! oldest events are discarded first.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use xlfacility_core_types::{AtomicLogLevel, LogLevel};

use crate::event::Event;
use crate::logger::Logger;

/// Keeps delivered events in memory
#[derive(Default)]
pub struct MemoryLogger {
    events: Mutex<VecDeque<Event>>,
    capacity: Option<usize>,
    min_level: AtomicLogLevel,
    opens: AtomicUsize,
    closes: AtomicUsize,
}

impl MemoryLogger {
    /// Unbounded logger accepting every level
    pub fn new() -> Self {
        Self::default()
    }

    /// Logger that keeps at most `capacity` of the most recent events
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub fn set_min_level(&self, level: LogLevel) {
        self.min_level.store(level);
    }

    /// Get all retained events
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|events| events.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Get the messages of all retained events
    pub fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|event| event.message().to_string())
            .collect()
    }

    /// Count retained events matching a predicate
    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Event) -> bool,
    {
        self.events
            .lock()
            .map(|events| events.iter().filter(|e| predicate(e)).count())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard all retained events
    pub fn clear(&self) {
        self.events.lock().map(|mut events| events.clear()).ok();
    }

    /// Number of times the facility opened this logger
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of times the facility closed this logger
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Logger for MemoryLogger {
    fn open(&self) -> crate::errors::Result<()> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn deliver(&self, event: &Event) {
        let capacity = self.capacity;
        self.events
            .lock()
            .map(|mut events| {
                if capacity == Some(0) {
                    return;
                }
                if capacity.is_some_and(|max| events.len() >= max) {
                    events.pop_front();
                }
                events.push_back(event.clone());
            })
            .ok();
    }

    fn min_level(&self) -> LogLevel {
        self.min_level.load()
    }

    fn name(&self) -> &str {
        "MemoryLogger"
    }
}
