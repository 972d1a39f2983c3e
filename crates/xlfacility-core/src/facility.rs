//! The facility: logger registry and event dispatch
//!
//! # Routing
//!
//! 1. Events below `min_log_level` are dropped before anything is built.
//! 2. The event gets a call stack when its level reaches
//!    `min_capture_callstack_level`.
//! 3. Events tagged `TAG_INTERNAL` go to the internal logger only.
//! 4. Every other event is queued for each registered logger that accepts its
//!    level.
//!
//! # Concurrency
//!
//! Dispatch holds the registry read lock only while queueing; loggers run on
//! their own delivery threads. Registry changes are serialized by a separate
//! mutex so that `open` and `close` never run under the registry lock.

use std::fmt;
use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{
    Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use std::time::{Duration, Instant};

use xlfacility_core_types::schema::TAG_INTERNAL;
use xlfacility_core_types::{AtomicLogLevel, LogLevel};

use crate::callstack;
use crate::capture::{self, StandardStream};
use crate::config::FacilityConfig;
use crate::errors::{FacilityError, Result};
use crate::event::Event;
use crate::exception::Exception;
use crate::format::{self, FORMAT_PLACEHOLDER};
use crate::hooks;
use crate::logger::{logger_id, logger_name, Logger};
use crate::loggers::StandardLogger;
use crate::worker::{guarded, panic_message, Fault, FaultReporter, PendingFault, Worker};

static SHARED: OnceLock<Facility> = OnceLock::new();

/// Central dispatcher owning the logger registry
///
/// Use [`Facility::shared`] for the process-wide instance, or
/// [`Facility::new`] for an independent one (tests, embedded subsystems).
pub struct Facility {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    min_log_level: AtomicLogLevel,
    min_capture_callstack_level: AtomicLogLevel,
    registry: RwLock<Registry>,
    mutation: Mutex<()>,
    logs_uncaught_exceptions: AtomicBool,
    logs_initialized_exceptions: AtomicBool,
    captures_standard_output: AtomicBool,
    captures_standard_error: AtomicBool,
}

#[derive(Default)]
struct Registry {
    workers: Vec<Worker>,
    internal: Option<Arc<dyn Logger>>,
    /// Worker for an internal logger that is not also registered
    dedicated_internal: Option<Worker>,
}

impl Registry {
    fn position(&self, id: usize) -> Option<usize> {
        self.workers
            .iter()
            .position(|worker| logger_id(worker.logger()) == id)
    }

    fn internal_id(&self) -> Option<usize> {
        self.internal.as_ref().map(logger_id)
    }

    fn internal_worker(&self) -> Option<&Worker> {
        let id = self.internal_id()?;
        match self.position(id) {
            Some(index) => self.workers.get(index),
            None => self.dedicated_internal.as_ref(),
        }
    }
}

impl Facility {
    /// Create an independent facility with default configuration
    ///
    /// The instance starts with no loggers.
    pub fn new() -> Self {
        Self::with_config(FacilityConfig::default())
    }

    /// Create an independent facility from an explicit configuration
    ///
    /// Toggles that cannot be applied (for example a stream already captured
    /// by another facility) are left off and reported through `tracing`.
    pub fn with_config(config: FacilityConfig) -> Self {
        let facility = Self {
            inner: Arc::new(Inner {
                min_log_level: AtomicLogLevel::new(config.min_log_level),
                min_capture_callstack_level: AtomicLogLevel::new(
                    config.min_capture_callstack_level,
                ),
                registry: RwLock::new(Registry::default()),
                mutation: Mutex::new(()),
                logs_uncaught_exceptions: AtomicBool::new(false),
                logs_initialized_exceptions: AtomicBool::new(false),
                captures_standard_output: AtomicBool::new(false),
                captures_standard_error: AtomicBool::new(false),
            }),
        };

        facility.set_logs_uncaught_exceptions(config.logs_uncaught_exceptions);
        facility.set_logs_initialized_exceptions(config.logs_initialized_exceptions);
        if config.captures_standard_output {
            if let Err(e) = facility.set_captures_standard_output(true) {
                tracing::warn!(error = %e, "Standard output capture not enabled");
            }
        }
        if config.captures_standard_error {
            if let Err(e) = facility.set_captures_standard_error(true) {
                tracing::warn!(error = %e, "Standard error capture not enabled");
            }
        }

        facility
    }

    /// The process-wide facility, created on first access
    ///
    /// It is configured from the environment. When standard error is a
    /// terminal the shared standard error logger is pre-installed, and in
    /// debug builds it is also the internal logger.
    pub fn shared() -> &'static Facility {
        SHARED.get_or_init(|| {
            let facility = Facility::with_config(FacilityConfig::from_env());
            facility.install_default_loggers();
            facility
        })
    }

    /// The process-wide facility, if it has been created
    pub fn try_shared() -> Option<&'static Facility> {
        SHARED.get()
    }

    pub(crate) fn inner(&self) -> &Arc<Inner> {
        &self.inner
    }

    fn install_default_loggers(&self) {
        if !std::io::stderr().is_terminal() {
            return;
        }
        let logger: Arc<dyn Logger> = StandardLogger::shared_error();
        if self.add_logger(logger.clone()).is_ok() && cfg!(debug_assertions) {
            let _ = self.set_internal_logger(Some(logger));
        }
    }

    // ========== Levels ==========

    pub fn min_log_level(&self) -> LogLevel {
        self.inner.min_log_level.load()
    }

    pub fn set_min_log_level(&self, level: LogLevel) {
        self.inner.min_log_level.store(level);
    }

    pub fn min_capture_callstack_level(&self) -> LogLevel {
        self.inner.min_capture_callstack_level.load()
    }

    pub fn set_min_capture_callstack_level(&self, level: LogLevel) {
        self.inner.min_capture_callstack_level.store(level);
    }

    // ========== Registry ==========

    /// Snapshot of the registered loggers
    pub fn loggers(&self) -> Vec<Arc<dyn Logger>> {
        self.inner
            .read_registry()
            .workers
            .iter()
            .map(|worker| worker.logger().clone())
            .collect()
    }

    /// Open a logger and start delivering events to it
    ///
    /// Returns the logger on success. The registry is unchanged on failure.
    ///
    /// # Errors
    ///
    /// - `LoggerAlreadyAdded` if this instance is already registered
    /// - the logger's own error (or `LoggerOpenFailed`) if `open` fails
    /// - `WorkerSpawnFailed` if its delivery thread cannot be started
    pub fn add_logger(&self, logger: Arc<dyn Logger>) -> Result<Arc<dyn Logger>> {
        let _guard = self.inner.lock_mutation();
        let id = logger_id(&logger);
        let name = logger_name(&*logger);

        let dedicated = {
            let mut registry = self.inner.write_registry();
            if registry.position(id).is_some() {
                return Err(FacilityError::LoggerAlreadyAdded { logger: name });
            }
            // An internal-only logger is already open; move its worker over
            let promote = registry
                .dedicated_internal
                .as_ref()
                .is_some_and(|worker| logger_id(worker.logger()) == id);
            if promote {
                registry.dedicated_internal.take()
            } else {
                None
            }
        };

        let worker = match dedicated {
            Some(worker) => worker,
            None => self.inner.open_worker(&logger, name.clone())?,
        };

        self.inner.write_registry().workers.push(worker);
        tracing::debug!(logger = %name, "Added logger");
        Ok(logger)
    }

    /// Close and unregister a logger
    ///
    /// Removing a logger that is not registered does nothing. If the logger
    /// was the internal logger, the internal logger is cleared.
    pub fn remove_logger<L: Logger + ?Sized>(&self, logger: &Arc<L>) {
        let _guard = self.inner.lock_mutation();
        let id = logger_id(logger);

        let removed = {
            let mut registry = self.inner.write_registry();
            let removed = registry
                .position(id)
                .map(|index| registry.workers.remove(index));
            if removed.is_some() && registry.internal_id() == Some(id) {
                registry.internal = None;
            }
            removed
        };

        if let Some(worker) = removed {
            let name = worker.name().to_string();
            worker.close();
            tracing::debug!(logger = %name, "Removed logger");
        }
    }

    /// Close and unregister every logger
    ///
    /// A logger whose `close` panics does not prevent the others from closing.
    pub fn remove_all_loggers(&self) {
        let _guard = self.inner.lock_mutation();

        let removed = {
            let mut registry = self.inner.write_registry();
            let internal_registered = registry
                .internal_id()
                .is_some_and(|id| registry.position(id).is_some());
            if internal_registered {
                registry.internal = None;
            }
            std::mem::take(&mut registry.workers)
        };

        for worker in removed {
            worker.close();
        }
    }

    /// The logger receiving internal-tagged events
    pub fn internal_logger(&self) -> Option<Arc<dyn Logger>> {
        self.inner.read_registry().internal.clone()
    }

    /// Choose the logger that receives internal-tagged events
    ///
    /// The logger may be one of the registered loggers or a separate one; a
    /// separate logger is opened here and closed when it is replaced.
    /// Passing `None` discards internal events.
    ///
    /// # Errors
    ///
    /// Returns the open error of a logger that is not registered and fails
    /// to open. The previous internal logger stays in place in that case.
    pub fn set_internal_logger(&self, logger: Option<Arc<dyn Logger>>) -> Result<()> {
        let _guard = self.inner.lock_mutation();

        let new_id = logger.as_ref().map(logger_id);
        let (current_id, registered) = {
            let registry = self.inner.read_registry();
            let registered = new_id.is_some_and(|id| registry.position(id).is_some());
            (registry.internal_id(), registered)
        };
        if current_id == new_id {
            return Ok(());
        }

        let dedicated = match &logger {
            Some(logger) if !registered => {
                Some(self.inner.open_worker(logger, logger_name(&**logger))?)
            }
            _ => None,
        };

        let previous = {
            let mut registry = self.inner.write_registry();
            registry.internal = logger;
            std::mem::replace(&mut registry.dedicated_internal, dedicated)
        };
        if let Some(worker) = previous {
            worker.close();
        }
        Ok(())
    }

    // ========== Logging ==========

    /// Log a fully formatted message
    pub fn log_message(&self, message: impl Into<String>, tag: Option<&str>, level: LogLevel) {
        self.inner.log_message(message, tag, level);
    }

    /// Log a message built from format arguments
    ///
    /// The arguments are rendered only if `level` passes the global floor. If
    /// rendering fails the message becomes [`FORMAT_PLACEHOLDER`]; debug
    /// builds then fail a `debug_assert!` after the event was dispatched.
    pub fn log_message_with_format(
        &self,
        tag: Option<&str>,
        level: LogLevel,
        args: fmt::Arguments<'_>,
    ) {
        self.inner.log_message_with_format(tag, level, args);
    }

    /// Log an exception at the EXCEPTION level
    pub fn log_exception(&self, exception: &Exception, tag: Option<&str>) {
        self.inner.log_exception(exception, tag);
    }

    /// Ingestion hook for captured standard stream lines
    pub fn ingest_captured_line(&self, stream: StandardStream, line: impl Into<String>) {
        self.inner.ingest_captured_line(stream, line);
    }

    /// Wait until every event logged before this call has been delivered
    ///
    /// A logger that never returns from `deliver` blocks this call forever;
    /// use [`Facility::flush_timeout`] when that matters.
    pub fn flush(&self) {
        self.inner.flush_until(None);
    }

    /// Like [`Facility::flush`] with an upper bound on the wait
    ///
    /// Returns true if every logger caught up in time.
    pub fn flush_timeout(&self, timeout: Duration) -> bool {
        self.inner.flush_timeout(timeout)
    }

    // ========== Extensions ==========

    pub fn logs_uncaught_exceptions(&self) -> bool {
        self.inner.logs_uncaught_exceptions.load(Ordering::Acquire)
    }

    /// Log panics through a process panic hook
    ///
    /// The hook is installed once per process and chains to the previous one.
    pub fn set_logs_uncaught_exceptions(&self, enabled: bool) {
        self.inner
            .logs_uncaught_exceptions
            .store(enabled, Ordering::Release);
        hooks::set_uncaught(&self.inner, enabled);
    }

    pub fn logs_initialized_exceptions(&self) -> bool {
        self.inner.logs_initialized_exceptions.load(Ordering::Acquire)
    }

    /// Log every [`Exception`] at the moment it is constructed
    pub fn set_logs_initialized_exceptions(&self, enabled: bool) {
        self.inner
            .logs_initialized_exceptions
            .store(enabled, Ordering::Release);
        hooks::set_initialized(&self.inner, enabled);
    }

    pub fn captures_standard_output(&self) -> bool {
        self.inner.captures_standard_output.load(Ordering::Acquire)
    }

    /// Turn standard output into INFO events
    ///
    /// # Errors
    ///
    /// Returns `CaptureInUse` if another facility captures the stream,
    /// `CaptureUnsupported` off Unix, or `CaptureFailed` on OS errors.
    pub fn set_captures_standard_output(&self, enabled: bool) -> Result<()> {
        self.set_capture(StandardStream::Output, enabled)
    }

    pub fn captures_standard_error(&self) -> bool {
        self.inner.captures_standard_error.load(Ordering::Acquire)
    }

    /// Turn standard error into ERROR events
    ///
    /// # Errors
    ///
    /// Same as [`Facility::set_captures_standard_output`].
    pub fn set_captures_standard_error(&self, enabled: bool) -> Result<()> {
        self.set_capture(StandardStream::Error, enabled)
    }

    fn set_capture(&self, stream: StandardStream, enabled: bool) -> Result<()> {
        let owner = Arc::as_ptr(&self.inner) as usize;
        let flag = match stream {
            StandardStream::Output => &self.inner.captures_standard_output,
            StandardStream::Error => &self.inner.captures_standard_error,
        };

        if enabled {
            let weak = Arc::downgrade(&self.inner);
            capture::start(
                stream,
                owner,
                Box::new(move |line| {
                    if let Some(inner) = weak.upgrade() {
                        inner.ingest_captured_line(stream, line);
                    }
                }),
            )?;
            flag.store(true, Ordering::Release);
        } else {
            // Stop before clearing so the final partial line is still accepted
            let stopped = capture::stop(stream, owner);
            flag.store(false, Ordering::Release);
            stopped?;
        }
        Ok(())
    }
}

impl Default for Facility {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Facility {
    fn drop(&mut self) {
        if self.captures_standard_output() {
            let _ = self.set_captures_standard_output(false);
        }
        if self.captures_standard_error() {
            let _ = self.set_captures_standard_error(false);
        }
        hooks::set_uncaught(&self.inner, false);
        hooks::set_initialized(&self.inner, false);
        self.remove_all_loggers();
        let _ = self.set_internal_logger(None);
    }
}

impl Inner {
    fn read_registry(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_mutation(&self) -> MutexGuard<'_, ()> {
        self.mutation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open `logger` and start its delivery worker
    fn open_worker(self: &Arc<Self>, logger: &Arc<dyn Logger>, name: String) -> Result<Worker> {
        let opened = guarded(|| logger.open()).unwrap_or_else(|payload| {
            Err(FacilityError::open_failed(
                name.as_str(),
                panic_message(payload.as_ref()),
            ))
        });
        if let Err(e) = opened {
            self.log_internal(LogLevel::Error, e.to_string());
            return Err(e);
        }

        let reporter = self.fault_reporter(logger_id(logger));
        Worker::spawn(logger.clone(), name, reporter).map_err(|e| {
            let _ = guarded(|| logger.close());
            e
        })
    }

    fn fault_reporter(self: &Arc<Self>, id: usize) -> FaultReporter {
        let weak = Arc::downgrade(self);
        Arc::new(move |name: &str, fault: Fault, reason: String| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            // Never report the internal logger's faults to itself
            if inner.read_registry().internal_id() == Some(id) {
                return;
            }
            let message = match fault {
                Fault::Deliver => format!("Logger {} panicked while logging: {}", name, reason),
                Fault::Close => format!("Logger {} panicked while closing: {}", name, reason),
                Fault::Accepts => format!(
                    "Logger {} panicked while checking its level and receives no more events: {}",
                    name, reason
                ),
                Fault::Overflow => format!(
                    "Logger {} dropped {} events while its queue was full",
                    name, reason
                ),
            };
            inner.log_internal(LogLevel::Error, message);
        })
    }

    /// Returns true if `level` passes the global floor
    pub(crate) fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.min_log_level.load()
    }

    fn log_internal(&self, level: LogLevel, message: String) {
        self.log_message(message, Some(TAG_INTERNAL), level);
    }

    pub(crate) fn log_message(&self, message: impl Into<String>, tag: Option<&str>, level: LogLevel) {
        if !self.is_enabled(level) {
            return;
        }
        self.dispatch(self.build_event(level, tag, message.into(), None));
    }

    fn log_message_with_format(&self, tag: Option<&str>, level: LogLevel, args: fmt::Arguments<'_>) {
        if !self.is_enabled(level) {
            return;
        }

        match format::render(args) {
            Some(message) => self.dispatch(self.build_event(level, tag, message, None)),
            None => {
                self.dispatch(self.build_event(level, tag, FORMAT_PLACEHOLDER.to_string(), None));
                self.log_internal(LogLevel::Error, "Failed formatting log message".to_string());
                debug_assert!(false, "Failed formatting log message");
            }
        }
    }

    pub(crate) fn log_exception(&self, exception: &Exception, tag: Option<&str>) {
        let level = LogLevel::Exception;
        if !self.is_enabled(level) {
            return;
        }
        let callstack = exception.callstack().map(<[String]>::to_vec);
        self.dispatch(self.build_event(level, tag, exception.description(), callstack));
    }

    fn ingest_captured_line(&self, stream: StandardStream, line: impl Into<String>) {
        self.log_message(line, Some(stream.tag()), stream.level());
    }

    fn build_event(
        &self,
        level: LogLevel,
        tag: Option<&str>,
        message: String,
        callstack: Option<Vec<String>>,
    ) -> Event {
        let callstack = callstack.or_else(|| {
            (level >= self.min_capture_callstack_level.load()).then(callstack::capture)
        });
        Event::new(level, tag.map(str::to_string), message, callstack)
    }

    fn dispatch(&self, event: Event) {
        let event = Arc::new(event);
        let mut faults: Vec<PendingFault> = Vec::new();

        {
            let registry = self.read_registry();
            let mut offer = |worker: &Worker| match worker.accepts(event.level()) {
                Ok(true) => worker.deliver(event.clone()),
                Ok(false) => {}
                Err(fault) => faults.push(fault),
            };

            if event.is_internal() {
                if let Some(worker) = registry.internal_worker() {
                    offer(worker);
                }
            } else {
                registry.workers.iter().for_each(offer);
            }
        }

        // Reporting dispatches again, so the registry lock must be released
        for fault in faults {
            fault.report();
        }
    }

    pub(crate) fn flush_timeout(&self, timeout: Duration) -> bool {
        self.flush_until(Some(Instant::now() + timeout))
    }

    fn flush_until(&self, deadline: Option<Instant>) -> bool {
        let flushers: Vec<_> = {
            let registry = self.read_registry();
            registry
                .workers
                .iter()
                .chain(registry.dedicated_internal.as_ref())
                .map(Worker::flusher)
                .collect()
        };
        flushers
            .iter()
            .fold(true, |done, flusher| flusher.flush(deadline) && done)
    }
}
