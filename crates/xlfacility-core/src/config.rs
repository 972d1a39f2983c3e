//! Facility configuration
//!
//! Defaults follow the build profile: debug builds log everything from DEBUG,
//! release builds from INFO. The `XLFacilityMinLogLevel` environment variable
//! overrides the floor when it holds an integer level.

use serde::{Deserialize, Serialize};
use xlfacility_core_types::schema::ENV_MIN_LOG_LEVEL;
use xlfacility_core_types::LogLevel;

/// Initial state of a facility
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FacilityConfig {
    /// Global floor; events below it are dropped before being built
    pub min_log_level: LogLevel,
    /// Events at or above this level carry a call stack
    pub min_capture_callstack_level: LogLevel,
    pub logs_uncaught_exceptions: bool,
    pub logs_initialized_exceptions: bool,
    pub captures_standard_output: bool,
    pub captures_standard_error: bool,
}

impl Default for FacilityConfig {
    fn default() -> Self {
        Self {
            min_log_level: default_min_log_level(),
            min_capture_callstack_level: LogLevel::Exception,
            logs_uncaught_exceptions: false,
            logs_initialized_exceptions: false,
            captures_standard_output: false,
            captures_standard_error: false,
        }
    }
}

impl FacilityConfig {
    /// Defaults with the process environment applied
    pub fn from_env() -> Self {
        Self::default().with_env_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    ///
    /// Values that are not an integer within the level range are ignored.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_MIN_LOG_LEVEL).and_then(|raw| parse_env_level(&raw)) {
            self.min_log_level = level;
        }
        self
    }
}

fn default_min_log_level() -> LogLevel {
    if cfg!(debug_assertions) {
        LogLevel::Debug
    } else {
        LogLevel::Info
    }
}

fn parse_env_level(raw: &str) -> Option<LogLevel> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|value| LogLevel::try_from(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(value: &'static str) -> impl Fn(&str) -> Option<String> {
        move |key| (key == ENV_MIN_LOG_LEVEL).then(|| value.to_string())
    }

    #[test]
    fn test_defaults() {
        let config = FacilityConfig::default();
        assert_eq!(config.min_capture_callstack_level, LogLevel::Exception);
        assert!(!config.logs_uncaught_exceptions);
        assert!(!config.captures_standard_output);
        if cfg!(debug_assertions) {
            assert_eq!(config.min_log_level, LogLevel::Debug);
        } else {
            assert_eq!(config.min_log_level, LogLevel::Info);
        }
    }

    #[test]
    fn test_env_override_applies_integer_in_range() {
        let config = FacilityConfig::default().with_env_lookup(lookup("4"));
        assert_eq!(config.min_log_level, LogLevel::Error);
    }

    #[test]
    fn test_env_override_ignores_out_of_range() {
        let base = FacilityConfig::default();
        let config = base.clone().with_env_lookup(lookup("9"));
        assert_eq!(config.min_log_level, base.min_log_level);
    }

    #[test]
    fn test_env_override_ignores_names() {
        let base = FacilityConfig::default();
        let config = base.clone().with_env_lookup(lookup("error"));
        assert_eq!(config.min_log_level, base.min_log_level);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: FacilityConfig =
            serde_json::from_str(r#"{"min_log_level":"WARNING","captures_standard_error":true}"#)
                .unwrap();
        assert_eq!(config.min_log_level, LogLevel::Warning);
        assert!(config.captures_standard_error);
        assert_eq!(config.min_capture_callstack_level, LogLevel::Exception);
    }
}
