//! Process-level exception hooks
//!
//! A single panic hook is installed the first time any facility enables
//! uncaught-exception logging. It chains to the hook that was in place before
//! it, and logs to whichever facilities currently have the toggle on.
//!
//! Neither hook logs from logger code (a delivery thread, or a logger method
//! the facility calls on the caller's thread), so a logger that panics or
//! creates exceptions cannot feed itself.

use std::panic::{self, PanicHookInfo};
use std::sync::{Arc, Mutex, MutexGuard, Once, PoisonError, Weak};
use std::time::Duration;

use xlfacility_core_types::schema::{TAG_INITIALIZED_EXCEPTIONS, TAG_UNCAUGHT_EXCEPTIONS};

use crate::exception::Exception;
use crate::facility::Inner;
use crate::worker::in_logger_code;

/// Upper bound on waiting for loggers before the previous panic hook runs
pub const PANIC_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

type Listeners = Mutex<Vec<Weak<Inner>>>;

static UNCAUGHT: Listeners = Mutex::new(Vec::new());
static INITIALIZED: Listeners = Mutex::new(Vec::new());
static INSTALL_PANIC_HOOK: Once = Once::new();

fn listeners(list: &'static Listeners) -> MutexGuard<'static, Vec<Weak<Inner>>> {
    list.lock().unwrap_or_else(PoisonError::into_inner)
}

fn set_listener(list: &'static Listeners, inner: &Arc<Inner>, enabled: bool) {
    let mut guard = listeners(list);
    let target = Arc::downgrade(inner);
    guard.retain(|weak| weak.strong_count() > 0 && !Weak::ptr_eq(weak, &target));
    if enabled {
        guard.push(target);
    }
}

fn live_listeners(list: &'static Listeners) -> Vec<Arc<Inner>> {
    listeners(list).iter().filter_map(Weak::upgrade).collect()
}

/// Register or unregister a facility for uncaught-exception logging
pub(crate) fn set_uncaught(inner: &Arc<Inner>, enabled: bool) {
    if enabled {
        install_panic_hook();
    }
    set_listener(&UNCAUGHT, inner, enabled);
}

/// Register or unregister a facility for initialized-exception logging
pub(crate) fn set_initialized(inner: &Arc<Inner>, enabled: bool) {
    set_listener(&INITIALIZED, inner, enabled);
}

/// Called whenever an `Exception` is constructed
pub(crate) fn notify_initialized(exception: &Exception) {
    if in_logger_code() {
        return;
    }
    for inner in live_listeners(&INITIALIZED) {
        inner.log_exception(exception, Some(TAG_INITIALIZED_EXCEPTIONS));
    }
}

fn install_panic_hook() {
    INSTALL_PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
            log_panic(info);
            previous(info);
        }));
        tracing::debug!("Installed panic hook for uncaught exception logging");
    });
}

fn log_panic(info: &PanicHookInfo<'_>) {
    if in_logger_code() {
        return;
    }
    let targets = live_listeners(&UNCAUGHT);
    if targets.is_empty() {
        return;
    }

    let exception = Exception::from_panic(info);
    for inner in &targets {
        inner.log_exception(&exception, Some(TAG_UNCAUGHT_EXCEPTIONS));
    }
    for inner in &targets {
        inner.flush_timeout(PANIC_FLUSH_TIMEOUT);
    }
}
