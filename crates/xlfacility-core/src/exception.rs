//! Exception values
//!
//! Rust has no exception objects, so `Exception` is the value the facility
//! logs for errors and panics. Creating one through `new`, `with_callstack`
//! or `from_error` notifies every facility that logs initialized exceptions.

use std::error::Error;
use std::fmt;
use std::panic::PanicHookInfo;

use crate::callstack;
use crate::hooks;

/// A named failure with a reason and an optional call stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    name: String,
    reason: String,
    callstack: Option<Vec<String>>,
}

impl Exception {
    /// Create an exception carrying the current call stack
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::with_callstack(name, reason, Some(callstack::capture()))
    }

    /// Create an exception with an explicit call stack
    pub fn with_callstack(
        name: impl Into<String>,
        reason: impl Into<String>,
        callstack: Option<Vec<String>>,
    ) -> Self {
        let exception = Self {
            name: name.into(),
            reason: reason.into(),
            callstack,
        };
        hooks::notify_initialized(&exception);
        exception
    }

    /// Describe an error and its `source()` chain
    ///
    /// The name is the error's type name without its module path.
    pub fn from_error<E: Error + ?Sized>(error: &E) -> Self {
        let type_name = std::any::type_name::<E>();
        let name = type_name.rsplit("::").next().unwrap_or(type_name);

        let mut reason = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            reason.push_str(": ");
            reason.push_str(&cause.to_string());
            source = cause.source();
        }

        Self::with_callstack(name, reason, Some(callstack::capture()))
    }

    /// Describe a panic from inside a panic hook
    ///
    /// Does not notify initialized-exception listeners.
    pub fn from_panic(info: &PanicHookInfo<'_>) -> Self {
        let payload = info.payload();
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Box<dyn Any>".to_string()
        };

        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("<unnamed>");
        let reason = match info.location() {
            Some(location) => format!(
                "thread '{}' panicked at {}:{}:{}: {}",
                thread_name,
                location.file(),
                location.line(),
                location.column(),
                message
            ),
            None => format!("thread '{}' panicked: {}", thread_name, message),
        };

        Self {
            name: "panic".to_string(),
            reason,
            callstack: Some(callstack::capture()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn callstack(&self) -> Option<&[String]> {
        self.callstack.as_deref()
    }

    /// Message used when the exception is logged
    pub fn description(&self) -> String {
        format!("Exception \"{}\": {}", self.name, self.reason)
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

impl Error for Exception {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "disk unplugged")
        }
    }

    impl Error for Inner {}

    #[derive(Debug)]
    struct Outer(Inner);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "write failed")
        }
    }

    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_description_format() {
        let exception = Exception::with_callstack("IOError", "pipe closed", None);
        assert_eq!(exception.description(), "Exception \"IOError\": pipe closed");
        assert_eq!(exception.to_string(), exception.description());
    }

    #[test]
    fn test_new_captures_callstack() {
        let exception = Exception::new("Oops", "bad state");
        assert!(exception.callstack().is_some_and(|frames| !frames.is_empty()));
    }

    #[test]
    fn test_from_error_includes_source_chain() {
        let exception = Exception::from_error(&Outer(Inner));
        assert_eq!(exception.name(), "Outer");
        assert_eq!(exception.reason(), "write failed: disk unplugged");
    }
}
