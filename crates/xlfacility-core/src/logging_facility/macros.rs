//! Formatting logging macros
//!
//! Each macro takes a facility, an optional `tag = expr` and format
//! arguments. Arguments are only rendered when the level passes the
//! facility's global floor.

#[doc(hidden)]
#[macro_export]
macro_rules! __xlog {
    ($facility:expr, $level:expr, tag = $tag:expr, $($arg:tt)+) => {
        $facility.log_message_with_format(
            ::core::option::Option::Some(::core::convert::AsRef::<str>::as_ref(&$tag)),
            $level,
            ::core::format_args!($($arg)+),
        )
    };
    ($facility:expr, $level:expr, $($arg:tt)+) => {
        $facility.log_message_with_format(
            ::core::option::Option::None,
            $level,
            ::core::format_args!($($arg)+),
        )
    };
}

/// Log at DEBUG
///
/// # Example
///
/// ```
/// # use xlfacility_core::{xlog_debug, Facility};
/// let facility = Facility::new();
/// xlog_debug!(facility, "cache size {}", 42);
/// xlog_debug!(facility, tag = "cache", "evicted {} entries", 3);
/// ```
#[macro_export]
macro_rules! xlog_debug {
    ($facility:expr, $($arg:tt)+) => {
        $crate::__xlog!($facility, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log at VERBOSE
#[macro_export]
macro_rules! xlog_verbose {
    ($facility:expr, $($arg:tt)+) => {
        $crate::__xlog!($facility, $crate::LogLevel::Verbose, $($arg)+)
    };
}

/// Log at INFO
#[macro_export]
macro_rules! xlog_info {
    ($facility:expr, $($arg:tt)+) => {
        $crate::__xlog!($facility, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log at WARNING
#[macro_export]
macro_rules! xlog_warning {
    ($facility:expr, $($arg:tt)+) => {
        $crate::__xlog!($facility, $crate::LogLevel::Warning, $($arg)+)
    };
}

/// Log at ERROR
#[macro_export]
macro_rules! xlog_error {
    ($facility:expr, $($arg:tt)+) => {
        $crate::__xlog!($facility, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log at EXCEPTION
#[macro_export]
macro_rules! xlog_exception {
    ($facility:expr, $($arg:tt)+) => {
        $crate::__xlog!($facility, $crate::LogLevel::Exception, $($arg)+)
    };
}

/// Log at ABORT, give loggers a bounded time to catch up, then abort
///
/// # Example
///
/// ```no_run
/// # use xlfacility_core::{xlog_abort, Facility};
/// let facility = Facility::new();
/// xlog_abort!(facility, "corrupted journal at offset {}", 512);
/// ```
#[macro_export]
macro_rules! xlog_abort {
    ($facility:expr, $($arg:tt)+) => {{
        let facility = &$facility;
        $crate::__xlog!(facility, $crate::LogLevel::Abort, $($arg)+);
        facility.flush_timeout($crate::PANIC_FLUSH_TIMEOUT);
        ::std::process::abort()
    }};
}

/// Abort through [`xlog_abort!`] when a condition does not hold
#[macro_export]
macro_rules! xlog_check {
    ($facility:expr, $condition:expr $(,)?) => {
        if !$condition {
            $crate::xlog_abort!(
                $facility,
                "Failed checking condition \"{}\" at {}:{}",
                ::core::stringify!($condition),
                ::core::file!(),
                ::core::line!()
            );
        }
    };
}

/// Abort through [`xlog_abort!`]; marks code that must never run
#[macro_export]
macro_rules! xlog_unreachable {
    ($facility:expr $(,)?) => {
        $crate::xlog_abort!(
            $facility,
            "Reached unreachable code at {}:{}",
            ::core::file!(),
            ::core::line!()
        )
    };
}
