use thiserror::Error;

/// Result type alias using FacilityError
pub type Result<T> = std::result::Result<T, FacilityError>;

/// Canonical error kind taxonomy
///
/// Logging calls never fail. The only fallible surfaces are registry
/// configuration and standard stream capture, and each kind maps to a stable
/// code usable in tests and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacilityErrorKind {
    // Registry configuration
    AlreadyAdded,
    OpenFailed,
    WorkerUnavailable,

    // Stream capture
    CaptureInUse,
    CaptureUnsupported,
    CaptureFailed,
}

impl FacilityErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            FacilityErrorKind::AlreadyAdded => "ERR_LOGGER_ALREADY_ADDED",
            FacilityErrorKind::OpenFailed => "ERR_LOGGER_OPEN_FAILED",
            FacilityErrorKind::WorkerUnavailable => "ERR_WORKER_UNAVAILABLE",
            FacilityErrorKind::CaptureInUse => "ERR_CAPTURE_IN_USE",
            FacilityErrorKind::CaptureUnsupported => "ERR_CAPTURE_UNSUPPORTED",
            FacilityErrorKind::CaptureFailed => "ERR_CAPTURE_FAILED",
        }
    }

    /// Returns true for errors reported by registry configuration calls
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FacilityErrorKind::AlreadyAdded
                | FacilityErrorKind::OpenFailed
                | FacilityErrorKind::WorkerUnavailable
        )
    }
}

/// Errors surfaced by the facility
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FacilityError {
    /// The same logger instance is already registered
    #[error("Logger already added: {logger}")]
    LoggerAlreadyAdded { logger: String },

    /// The logger's open hook reported a failure
    #[error("Failed opening logger {logger}: {reason}")]
    LoggerOpenFailed { logger: String, reason: String },

    /// The delivery thread for a logger could not be started
    #[error("Failed starting delivery worker for logger {logger}: {reason}")]
    WorkerSpawnFailed { logger: String, reason: String },

    /// Another facility instance already captures this stream
    #[error("Standard stream {stream} is already captured by another facility")]
    CaptureInUse { stream: String },

    /// Descriptor redirection is not available on this platform
    #[error("Capturing standard streams is not supported on this platform")]
    CaptureUnsupported,

    /// Redirecting or restoring the descriptor failed
    #[error("Failed capturing standard stream {stream}: {reason}")]
    CaptureFailed { stream: String, reason: String },
}

impl FacilityError {
    /// Build an open failure for a logger with the given reason
    pub fn open_failed(logger: impl Into<String>, reason: impl Into<String>) -> Self {
        FacilityError::LoggerOpenFailed {
            logger: logger.into(),
            reason: reason.into(),
        }
    }

    /// Get the error kind
    pub fn kind(&self) -> FacilityErrorKind {
        match self {
            FacilityError::LoggerAlreadyAdded { .. } => FacilityErrorKind::AlreadyAdded,
            FacilityError::LoggerOpenFailed { .. } => FacilityErrorKind::OpenFailed,
            FacilityError::WorkerSpawnFailed { .. } => FacilityErrorKind::WorkerUnavailable,
            FacilityError::CaptureInUse { .. } => FacilityErrorKind::CaptureInUse,
            FacilityError::CaptureUnsupported => FacilityErrorKind::CaptureUnsupported,
            FacilityError::CaptureFailed { .. } => FacilityErrorKind::CaptureFailed,
        }
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }
}
