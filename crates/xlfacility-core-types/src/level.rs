//! Log levels
//!
//! Levels are ordered by increasing severity. The numeric value of each level
//! is stable and is what the `XLFacilityMinLogLevel` environment variable uses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use thiserror::Error;

/// Severity of a log event
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug = 0,
    Verbose = 1,
    Info = 2,
    Warning = 3,
    Error = 4,
    Exception = 5,
    Abort = 6,
}

impl LogLevel {
    /// Lowest level
    pub const MIN: LogLevel = LogLevel::Debug;

    /// Highest level
    pub const MAX: LogLevel = LogLevel::Abort;

    /// Every level in ascending order
    pub const ALL: [LogLevel; 7] = [
        LogLevel::Debug,
        LogLevel::Verbose,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Exception,
        LogLevel::Abort,
    ];

    /// Get the canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Verbose => "VERBOSE",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Exception => "EXCEPTION",
            LogLevel::Abort => "ABORT",
        }
    }

    /// Get the stable numeric value
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Convert from the numeric value, returning `None` when out of range
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string or number does not name a level
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LevelParseError {
    #[error("Log level out of range: {value} (expected {min}..={max})", min = LogLevel::MIN.as_u8(), max = LogLevel::MAX.as_u8())]
    OutOfRange { value: i64 },

    #[error("Unknown log level: {value}")]
    Unknown { value: String },
}

impl TryFrom<i64> for LogLevel {
    type Error = LevelParseError;

    fn try_from(value: i64) -> Result<Self, LevelParseError> {
        u8::try_from(value)
            .ok()
            .and_then(LogLevel::from_u8)
            .ok_or(LevelParseError::OutOfRange { value })
    }
}

impl TryFrom<u8> for LogLevel {
    type Error = LevelParseError;

    fn try_from(value: u8) -> Result<Self, LevelParseError> {
        LogLevel::try_from(i64::from(value))
    }
}

/// Parses either the numeric value (`"2"`) or a case-insensitive name (`"info"`)
impl FromStr for LogLevel {
    type Err = LevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(value) = trimmed.parse::<i64>() {
            return LogLevel::try_from(value);
        }
        LogLevel::ALL
            .iter()
            .copied()
            .find(|level| level.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| LevelParseError::Unknown {
                value: trimmed.to_string(),
            })
    }
}

/// A `LogLevel` that can be read and written concurrently without a lock
#[derive(Debug)]
pub struct AtomicLogLevel(AtomicU8);

impl AtomicLogLevel {
    pub fn new(level: LogLevel) -> Self {
        Self(AtomicU8::new(level.as_u8()))
    }

    pub fn load(&self) -> LogLevel {
        // Only valid discriminants are ever stored
        LogLevel::from_u8(self.0.load(Ordering::Acquire)).unwrap_or(LogLevel::MAX)
    }

    pub fn store(&self, level: LogLevel) {
        self.0.store(level.as_u8(), Ordering::Release);
    }
}

impl Default for AtomicLogLevel {
    fn default() -> Self {
        Self::new(LogLevel::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        for pair in LogLevel::ALL.windows(2) {
            assert!(pair[0] < pair[1], "{} should be below {}", pair[0], pair[1]);
        }
        assert_eq!(LogLevel::MIN, LogLevel::Debug);
        assert_eq!(LogLevel::MAX, LogLevel::Abort);
    }

    #[test]
    fn test_numeric_values_are_stable() {
        assert_eq!(LogLevel::Debug.as_u8(), 0);
        assert_eq!(LogLevel::Info.as_u8(), 2);
        assert_eq!(LogLevel::Abort.as_u8(), 6);
        assert_eq!(LogLevel::from_u8(4), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_u8(7), None);
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!("3".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!(" 0 ".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!(
            "7".parse::<LogLevel>(),
            Err(LevelParseError::OutOfRange { value: 7 })
        );
        assert_eq!(
            "-1".parse::<LogLevel>(),
            Err(LevelParseError::OutOfRange { value: -1 })
        );
    }

    #[test]
    fn test_try_from_integers() {
        assert_eq!(LogLevel::try_from(4_i64), Ok(LogLevel::Error));
        assert_eq!(LogLevel::try_from(6_u8), Ok(LogLevel::Abort));
        assert_eq!(
            LogLevel::try_from(200_u8),
            Err(LevelParseError::OutOfRange { value: 200 })
        );
    }

    #[test]
    fn test_parse_name() {
        assert_eq!("verbose".parse::<LogLevel>(), Ok(LogLevel::Verbose));
        assert_eq!("EXCEPTION".parse::<LogLevel>(), Ok(LogLevel::Exception));
        assert!(matches!(
            "loud".parse::<LogLevel>(),
            Err(LevelParseError::Unknown { .. })
        ));
    }

    #[test]
    fn test_display_matches_as_str() {
        assert_eq!(format!("{}", LogLevel::Warning), "WARNING");
    }

    #[test]
    fn test_serde_uses_upper_case_names() {
        let json = serde_json::to_string(&LogLevel::Error).unwrap();
        assert_eq!(json, "\"ERROR\"");
        let level: LogLevel = serde_json::from_str("\"ABORT\"").unwrap();
        assert_eq!(level, LogLevel::Abort);
    }

    #[test]
    fn test_atomic_level_round_trip() {
        let cell = AtomicLogLevel::new(LogLevel::Info);
        assert_eq!(cell.load(), LogLevel::Info);
        cell.store(LogLevel::Exception);
        assert_eq!(cell.load(), LogLevel::Exception);
    }
}
