//! Per-logger delivery worker
//!
//! Every registered logger gets its own thread fed by a bounded queue, so a
//! slow or hung logger only delays itself. Events queued from one thread are
//! delivered in the order they were queued. When a queue is full new events
//! for that logger are dropped and counted; the count is reported once the
//! queue drains.

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, TrySendError};
use xlfacility_core_types::LogLevel;

use crate::errors::{FacilityError, Result};
use crate::event::Event;
use crate::logger::Logger;

/// Events a logger's queue holds before new events for it are dropped
pub const LOGGER_QUEUE_CAPACITY: usize = 4096;

static NEXT_WORKER_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    /// Id of the worker running on this thread, 0 elsewhere
    static CURRENT_WORKER: Cell<usize> = const { Cell::new(0) };
    static IN_LOGGER_CALL: Cell<bool> = const { Cell::new(false) };
}

/// Returns true when called from a delivery thread or from a guarded logger call
pub(crate) fn in_logger_code() -> bool {
    CURRENT_WORKER.with(Cell::get) != 0 || IN_LOGGER_CALL.with(Cell::get)
}

fn is_current_worker(id: usize) -> bool {
    CURRENT_WORKER.with(Cell::get) == id
}

/// Run logger code on the caller's thread and catch its panics
///
/// Panic hooks and the `tracing` bridge see the call as logger code, so a
/// panic caught here is never logged as uncaught.
pub(crate) fn guarded<R>(f: impl FnOnce() -> R) -> thread::Result<R> {
    let outer = IN_LOGGER_CALL.with(|flag| flag.replace(true));
    let outcome = panic::catch_unwind(AssertUnwindSafe(f));
    IN_LOGGER_CALL.with(|flag| flag.set(outer));
    outcome
}

/// Failure raised inside a logger, reported back to the facility
pub(crate) enum Fault {
    Deliver,
    Close,
    Accepts,
    /// The reason holds the number of dropped events
    Overflow,
}

/// Callback invoked when a logger fails
pub(crate) type FaultReporter = Arc<dyn Fn(&str, Fault, String) + Send + Sync>;

/// Fault raised on the caller's thread, reported once no lock is held
pub(crate) struct PendingFault {
    reporter: FaultReporter,
    name: String,
    fault: Fault,
    reason: String,
}

impl PendingFault {
    pub(crate) fn report(self) {
        (self.reporter)(&self.name, self.fault, self.reason);
    }
}

enum Command {
    Deliver(Arc<Event>),
    Flush(Sender<()>),
    Close(Sender<()>),
}

pub(crate) struct Worker {
    id: usize,
    logger: Arc<dyn Logger>,
    name: String,
    sender: Sender<Command>,
    dropped: Arc<AtomicUsize>,
    accepts_faulted: AtomicBool,
    reporter: FaultReporter,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Start the delivery thread for an already opened logger
    ///
    /// # Errors
    ///
    /// Returns `WorkerSpawnFailed` if the OS refuses to create the thread.
    pub(crate) fn spawn(logger: Arc<dyn Logger>, name: String, reporter: FaultReporter) -> Result<Self> {
        let id = NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = crossbeam_channel::bounded(LOGGER_QUEUE_CAPACITY);
        let dropped = Arc::new(AtomicUsize::new(0));

        let state = DeliveryState {
            id,
            logger: logger.clone(),
            name: name.clone(),
            dropped: dropped.clone(),
            reporter: reporter.clone(),
        };
        let handle = thread::Builder::new()
            .name(format!("xlfacility-{}", short_name(&name)))
            .spawn(move || state.run(receiver))
            .map_err(|e| FacilityError::WorkerSpawnFailed {
                logger: name.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            logger,
            name,
            sender,
            dropped,
            accepts_faulted: AtomicBool::new(false),
            reporter,
            handle: Some(handle),
        })
    }

    pub(crate) fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Ask the logger whether it wants events at `level`
    ///
    /// A panicking check counts as a refusal. Only the first panic is handed
    /// back; later ones are silent.
    pub(crate) fn accepts(&self, level: LogLevel) -> std::result::Result<bool, PendingFault> {
        match guarded(|| self.logger.accepts(level)) {
            Ok(accepted) => Ok(accepted),
            Err(_) if self.accepts_faulted.swap(true, Ordering::AcqRel) => Ok(false),
            Err(payload) => Err(PendingFault {
                reporter: self.reporter.clone(),
                name: self.name.clone(),
                fault: Fault::Accepts,
                reason: panic_message(payload.as_ref()),
            }),
        }
    }

    /// Queue an event; never blocks
    pub(crate) fn deliver(&self, event: Arc<Event>) {
        // A disconnected queue means the worker already closed
        if let Err(TrySendError::Full(_)) = self.sender.try_send(Command::Deliver(event)) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Handle that can wait for this worker without borrowing it
    pub(crate) fn flusher(&self) -> Flusher {
        Flusher {
            id: self.id,
            sender: self.sender.clone(),
        }
    }

    /// Deliver pending events, call the logger's close hook and stop the thread
    ///
    /// From the worker's own delivery thread this only disconnects the queue;
    /// the thread closes the logger after delivering what is left.
    pub(crate) fn close(mut self) {
        if is_current_worker(self.id) {
            return;
        }
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        if self.sender.send(Command::Close(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        } else {
            // Worker is gone; close on the caller's thread instead
            let _ = guarded(|| self.logger.close());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Detached flush handle, usable after the registry lock was released
pub(crate) struct Flusher {
    id: usize,
    sender: Sender<Command>,
}

impl Flusher {
    /// Wait until everything queued before this call has been delivered
    ///
    /// Returns false if the deadline passed first. On the worker's own
    /// delivery thread it returns true at once.
    pub(crate) fn flush(&self, deadline: Option<Instant>) -> bool {
        if is_current_worker(self.id) {
            return true;
        }
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        let command = Command::Flush(ack_tx);
        match deadline {
            Some(deadline) => match self.sender.send_deadline(command, deadline) {
                Ok(()) => ack_rx.recv_deadline(deadline).is_ok(),
                Err(SendTimeoutError::Timeout(_)) => false,
                Err(SendTimeoutError::Disconnected(_)) => true,
            },
            None => {
                // Errors here mean the worker exited, which also drains it
                if self.sender.send(command).is_ok() {
                    let _ = ack_rx.recv();
                }
                true
            }
        }
    }
}

struct DeliveryState {
    id: usize,
    logger: Arc<dyn Logger>,
    name: String,
    dropped: Arc<AtomicUsize>,
    reporter: FaultReporter,
}

impl DeliveryState {
    fn run(self, receiver: Receiver<Command>) {
        CURRENT_WORKER.with(|current| current.set(self.id));

        for command in receiver.iter() {
            match command {
                Command::Deliver(event) => {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.logger.deliver(&event)));
                    if let Err(payload) = outcome {
                        (self.reporter)(&self.name, Fault::Deliver, panic_message(payload.as_ref()));
                    }
                    if receiver.is_empty() {
                        self.report_dropped();
                    }
                }
                Command::Flush(ack) => {
                    self.report_dropped();
                    let _ = ack.send(());
                }
                Command::Close(ack) => {
                    self.report_dropped();
                    self.close();
                    let _ = ack.send(());
                    return;
                }
            }
        }

        // Every sender is gone without a close command
        self.report_dropped();
        self.close();
    }

    fn close(&self) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.logger.close()));
        if let Err(payload) = outcome {
            (self.reporter)(&self.name, Fault::Close, panic_message(payload.as_ref()));
        }
    }

    fn report_dropped(&self) {
        let count = self.dropped.swap(0, Ordering::Relaxed);
        if count > 0 {
            (self.reporter)(&self.name, Fault::Overflow, count.to_string());
        }
    }
}

/// Render a panic payload as text
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn short_name(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        messages: Mutex<Vec<String>>,
        closed: Mutex<bool>,
    }

    impl Logger for Recorder {
        fn deliver(&self, event: &Event) {
            if event.message() == "boom" {
                panic!("recorder exploded");
            }
            self.messages.lock().unwrap().push(event.message().to_string());
        }

        fn close(&self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    /// Holds the delivery thread inside `deliver` until the gate opens
    struct Gate {
        entered: Sender<()>,
        open: Receiver<()>,
        delivered: AtomicUsize,
    }

    impl Logger for Gate {
        fn deliver(&self, event: &Event) {
            if event.message() == "hold" {
                let _ = self.entered.send(());
                let _ = self.open.recv();
            }
            self.delivered.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct BadThreshold;

    impl Logger for BadThreshold {
        fn deliver(&self, _event: &Event) {}

        fn accepts(&self, _level: LogLevel) -> bool {
            panic!("threshold exploded");
        }
    }

    fn event(message: &str) -> Arc<Event> {
        Arc::new(Event::new(LogLevel::Info, None, message.to_string(), None))
    }

    fn silent_reporter() -> FaultReporter {
        Arc::new(|_: &str, _: Fault, _: String| {})
    }

    fn spawn(logger: Arc<dyn Logger>, reporter: FaultReporter) -> Worker {
        Worker::spawn(logger, "test".to_string(), reporter).unwrap()
    }

    #[test]
    fn test_delivers_in_queue_order_then_closes() {
        let recorder = Arc::new(Recorder::default());
        let worker = spawn(recorder.clone(), silent_reporter());

        worker.deliver(event("a"));
        worker.deliver(event("b"));
        worker.close();

        assert_eq!(*recorder.messages.lock().unwrap(), vec!["a", "b"]);
        assert!(*recorder.closed.lock().unwrap());
    }

    #[test]
    fn test_panic_is_reported_and_worker_survives() {
        let recorder = Arc::new(Recorder::default());
        let faults = Arc::new(Mutex::new(Vec::new()));
        let sink = faults.clone();
        let reporter: FaultReporter = Arc::new(move |_: &str, fault: Fault, message: String| {
            if let Fault::Deliver = fault {
                sink.lock().unwrap().push(message);
            }
        });
        let worker = spawn(recorder.clone(), reporter);

        worker.deliver(event("boom"));
        worker.deliver(event("after"));
        assert!(worker.flusher().flush(Some(Instant::now() + Duration::from_secs(5))));

        assert_eq!(*faults.lock().unwrap(), vec!["recorder exploded"]);
        assert_eq!(*recorder.messages.lock().unwrap(), vec!["after"]);
        worker.close();
    }

    #[test]
    fn test_full_queue_drops_and_reports_count_once() {
        let (entered_tx, entered_rx) = crossbeam_channel::bounded(1);
        let (open_tx, open_rx) = crossbeam_channel::bounded(1);
        let gate = Arc::new(Gate {
            entered: entered_tx,
            open: open_rx,
            delivered: AtomicUsize::new(0),
        });
        let overflows = Arc::new(Mutex::new(Vec::new()));
        let sink = overflows.clone();
        let reporter: FaultReporter = Arc::new(move |_: &str, fault: Fault, count: String| {
            if let Fault::Overflow = fault {
                sink.lock().unwrap().push(count);
            }
        });
        let worker = spawn(gate.clone(), reporter);

        worker.deliver(event("hold"));
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        for _ in 0..LOGGER_QUEUE_CAPACITY + 5 {
            worker.deliver(event("queued"));
        }
        open_tx.send(()).unwrap();
        assert!(worker.flusher().flush(Some(Instant::now() + Duration::from_secs(10))));

        assert_eq!(gate.delivered.load(Ordering::SeqCst), LOGGER_QUEUE_CAPACITY + 1);
        assert_eq!(*overflows.lock().unwrap(), vec!["5"]);
        worker.close();
    }

    #[test]
    fn test_flush_deadline_covers_a_full_queue() {
        let (entered_tx, entered_rx) = crossbeam_channel::bounded(1);
        let (open_tx, open_rx) = crossbeam_channel::bounded(1);
        let gate = Arc::new(Gate {
            entered: entered_tx,
            open: open_rx,
            delivered: AtomicUsize::new(0),
        });
        let worker = spawn(gate, silent_reporter());

        worker.deliver(event("hold"));
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        for _ in 0..LOGGER_QUEUE_CAPACITY {
            worker.deliver(event("queued"));
        }

        assert!(!worker.flusher().flush(Some(Instant::now() + Duration::from_millis(100))));
        open_tx.send(()).unwrap();
        worker.close();
    }

    #[test]
    fn test_panicking_threshold_is_refused_and_handed_back_once() {
        let reported = Arc::new(Mutex::new(Vec::new()));
        let sink = reported.clone();
        let reporter: FaultReporter = Arc::new(move |_: &str, fault: Fault, reason: String| {
            if let Fault::Accepts = fault {
                sink.lock().unwrap().push(reason);
            }
        });
        let worker = spawn(Arc::new(BadThreshold), reporter);

        let first = worker.accepts(LogLevel::Info);
        assert!(!in_logger_code());
        match first {
            Err(fault) => fault.report(),
            Ok(_) => panic!("a panicking threshold must be handed back"),
        }
        assert!(matches!(worker.accepts(LogLevel::Error), Ok(false)));

        assert_eq!(*reported.lock().unwrap(), vec!["threshold exploded"]);
        worker.close();
    }

    #[test]
    fn test_guarded_marks_logger_code() {
        assert!(!in_logger_code());
        assert!(guarded(in_logger_code).unwrap());
        assert!(guarded(|| -> bool { panic!("caught") }).is_err());
        assert!(!in_logger_code());
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("xlfacility_core::loggers::MemoryLogger"), "MemoryLogger");
        assert_eq!(short_name("Plain"), "Plain");
    }
}
