use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::time::{Duration, Instant};

use xlfacility_core::errors::{FacilityError, Result};
use xlfacility_core::{Event, Facility, LogLevel, Logger};

/// Create an independent facility that accepts every level
#[allow(dead_code)]
pub fn new_facility() -> Facility {
    let facility = Facility::new();
    facility.set_min_log_level(LogLevel::Debug);
    facility
}

/// Backend recording every delivered event
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
    min_level: Option<LogLevel>,
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
}

#[allow(dead_code)]
impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_min_level(level: LogLevel) -> Arc<Self> {
        Arc::new(Self {
            min_level: Some(level),
            ..Self::default()
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|e| e.message().to_string())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl Logger for Recorder {
    fn open(&self) -> Result<()> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn deliver(&self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn min_level(&self) -> LogLevel {
        self.min_level.unwrap_or(LogLevel::MIN)
    }

    fn name(&self) -> &str {
        "Recorder"
    }
}

/// Backend whose open hook always fails
#[allow(dead_code)]
pub struct FailingOpen;

impl Logger for FailingOpen {
    fn open(&self) -> Result<()> {
        Err(FacilityError::open_failed("FailingOpen", "device missing"))
    }

    fn deliver(&self, _event: &Event) {
        panic!("a logger that failed to open must never receive events");
    }

    fn name(&self) -> &str {
        "FailingOpen"
    }
}

/// Backend that panics on every delivery and on close
#[allow(dead_code)]
pub struct Panicking;

impl Logger for Panicking {
    fn deliver(&self, _event: &Event) {
        panic!("backend exploded");
    }

    fn close(&self) {
        panic!("close exploded");
    }

    fn name(&self) -> &str {
        "Panicking"
    }
}

/// Backend that blocks in `deliver` until released
#[derive(Default)]
pub struct Blocking {
    released: Mutex<bool>,
    signal: Condvar,
    pub delivered: AtomicUsize,
}

#[allow(dead_code)]
impl Blocking {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn release(&self) {
        *self.released.lock().unwrap() = true;
        self.signal.notify_all();
    }
}

impl Logger for Blocking {
    fn deliver(&self, _event: &Event) {
        let released = self.released.lock().unwrap();
        let _released = self
            .signal
            .wait_timeout_while(released, Duration::from_secs(30), |released| !*released)
            .unwrap();
        self.delivered.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "Blocking"
    }
}

/// Backend whose level check panics
#[allow(dead_code)]
pub struct PanickyAccepts;

impl Logger for PanickyAccepts {
    fn deliver(&self, _event: &Event) {
        panic!("a logger whose level check panicked must never receive events");
    }

    fn accepts(&self, _level: LogLevel) -> bool {
        panic!("level check exploded");
    }

    fn name(&self) -> &str {
        "PanickyAccepts"
    }
}

/// Backend that panics when asked for its name
#[allow(dead_code)]
#[derive(Default)]
pub struct PanickyName {
    pub delivered: AtomicUsize,
    pub closes: AtomicUsize,
}

impl Logger for PanickyName {
    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn deliver(&self, _event: &Event) {
        self.delivered.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        panic!("name exploded");
    }
}

/// Backend that calls back into its facility from `deliver`
///
/// A `"flush"` message flushes the facility and a `"remove"` message removes
/// this logger.
#[allow(dead_code)]
pub struct Reentrant {
    facility: Weak<Facility>,
    me: Weak<Reentrant>,
    pub delivered: AtomicUsize,
    pub closes: AtomicUsize,
}

#[allow(dead_code)]
impl Reentrant {
    pub fn new(facility: &Arc<Facility>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            facility: Arc::downgrade(facility),
            me: me.clone(),
            delivered: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        })
    }
}

impl Logger for Reentrant {
    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn deliver(&self, event: &Event) {
        self.delivered.fetch_add(1, Ordering::SeqCst);
        let Some(facility) = self.facility.upgrade() else {
            return;
        };
        match event.message() {
            "flush" => facility.flush(),
            "remove" => {
                if let Some(me) = self.me.upgrade() {
                    facility.remove_logger(&me);
                }
            }
            _ => {}
        }
    }

    fn name(&self) -> &str {
        "Reentrant"
    }
}

/// Poll `condition` until it holds or `timeout` passes
#[allow(dead_code)]
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
