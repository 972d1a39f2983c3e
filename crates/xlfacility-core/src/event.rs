//! Log events
//!
//! An `Event` is built once per accepted log call and shared by reference with
//! every logger that receives it. It has no mutating API.

use chrono::{DateTime, Utc};
use serde::Serialize;
use xlfacility_core_types::schema::TAG_INTERNAL;
use xlfacility_core_types::LogLevel;

/// One immutable log occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    timestamp: DateTime<Utc>,
    level: LogLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    callstack: Option<Vec<String>>,
}

impl Event {
    /// Create an event stamped with the current time
    pub fn new(
        level: LogLevel,
        tag: Option<String>,
        message: String,
        callstack: Option<Vec<String>>,
    ) -> Self {
        Self::with_timestamp(Utc::now(), level, tag, message, callstack)
    }

    /// Create an event with an explicit timestamp
    pub fn with_timestamp(
        timestamp: DateTime<Utc>,
        level: LogLevel,
        tag: Option<String>,
        message: String,
        callstack: Option<Vec<String>>,
    ) -> Self {
        Self {
            timestamp,
            level,
            tag,
            message,
            callstack,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the captured call stack, if any
    pub fn callstack(&self) -> Option<&[String]> {
        self.callstack.as_deref()
    }

    /// Returns true if the event carries the internal tag
    pub fn is_internal(&self) -> bool {
        self.tag() == Some(TAG_INTERNAL)
    }

    /// Serialize to a single JSON line
    pub fn to_json(&self) -> String {
        // Serialization of plain strings and a timestamp cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Event {
        Event::with_timestamp(
            Utc.with_ymd_and_hms(2026, 1, 3, 12, 0, 0).unwrap(),
            LogLevel::Warning,
            Some("net".to_string()),
            "connection reset".to_string(),
            None,
        )
    }

    #[test]
    fn test_accessors() {
        let event = sample();
        assert_eq!(event.level(), LogLevel::Warning);
        assert_eq!(event.tag(), Some("net"));
        assert_eq!(event.message(), "connection reset");
        assert!(event.callstack().is_none());
        assert!(!event.is_internal());
    }

    #[test]
    fn test_internal_tag_detection() {
        let event = Event::new(
            LogLevel::Error,
            Some(TAG_INTERNAL.to_string()),
            "x".to_string(),
            None,
        );
        assert!(event.is_internal());
    }

    #[test]
    fn test_json_omits_absent_fields() {
        let json: serde_json::Value = serde_json::from_str(&sample().to_json()).unwrap();
        assert_eq!(json["level"], "WARNING");
        assert_eq!(json["tag"], "net");
        assert_eq!(json["message"], "connection reset");
        assert!(json.get("callstack").is_none());
    }
}
