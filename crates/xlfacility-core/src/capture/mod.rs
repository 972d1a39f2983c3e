//! Standard stream capture
//!
//! Redirecting a standard descriptor is process-wide, so at most one facility
//! can capture each stream at a time. Captured text is split into lines and
//! each line becomes an event at a fixed level:
//!
//! - standard output: INFO, tagged `TAG_CAPTURED_STDOUT`
//! - standard error: ERROR, tagged `TAG_CAPTURED_STDERR`
//!
//! A trailing line without a terminator is emitted when capture stops.

pub mod line_splitter;
#[cfg(unix)]
mod redirect;

pub use line_splitter::LineSplitter;

use std::fmt;
use std::fs::File;
use std::io;

use xlfacility_core_types::schema::{TAG_CAPTURED_STDERR, TAG_CAPTURED_STDOUT};
use xlfacility_core_types::LogLevel;

use crate::errors::Result;

/// One of the process's standard streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardStream {
    Output,
    Error,
}

impl StandardStream {
    /// Level assigned to captured lines
    pub fn level(&self) -> LogLevel {
        match self {
            StandardStream::Output => LogLevel::Info,
            StandardStream::Error => LogLevel::Error,
        }
    }

    /// Reserved tag assigned to captured lines
    pub fn tag(&self) -> &'static str {
        match self {
            StandardStream::Output => TAG_CAPTURED_STDOUT,
            StandardStream::Error => TAG_CAPTURED_STDERR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StandardStream::Output => "stdout",
            StandardStream::Error => "stderr",
        }
    }

    fn slot(&self) -> usize {
        match self {
            StandardStream::Output => 0,
            StandardStream::Error => 1,
        }
    }
}

impl fmt::Display for StandardStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if any facility currently captures `stream`
pub fn is_captured(stream: StandardStream) -> bool {
    imp::is_captured(stream)
}

/// Open an independent handle to the stream's original destination
///
/// While the stream is captured this is the destination that was in place
/// before capture started, so writing to it never feeds back into capture.
///
/// # Errors
///
/// Returns the OS error if the descriptor cannot be duplicated.
pub fn open_original(stream: StandardStream) -> io::Result<File> {
    imp::open_original(stream)
}

/// Start capturing `stream` on behalf of `owner`
pub(crate) fn start(
    stream: StandardStream,
    owner: usize,
    sink: Box<dyn FnMut(String) + Send>,
) -> Result<()> {
    imp::start(stream, owner, sink)
}

/// Stop capturing `stream` if `owner` holds it
///
/// Returns true if a capture was stopped.
pub(crate) fn stop(stream: StandardStream, owner: usize) -> Result<bool> {
    imp::stop(stream, owner)
}

#[cfg(unix)]
mod imp {
    use super::redirect::{self, LineSink, StreamRedirect};
    use super::StandardStream;
    use crate::errors::{FacilityError, Result};
    use std::fs::File;
    use std::io;
    use std::os::unix::io::RawFd;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    struct ActiveCapture {
        owner: usize,
        redirect: StreamRedirect,
    }

    static ACTIVE: Mutex<[Option<ActiveCapture>; 2]> = Mutex::new([None, None]);

    fn active() -> MutexGuard<'static, [Option<ActiveCapture>; 2]> {
        ACTIVE.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fd(stream: StandardStream) -> RawFd {
        match stream {
            StandardStream::Output => libc::STDOUT_FILENO,
            StandardStream::Error => libc::STDERR_FILENO,
        }
    }

    pub(super) fn is_captured(stream: StandardStream) -> bool {
        active()[stream.slot()].is_some()
    }

    pub(super) fn open_original(stream: StandardStream) -> io::Result<File> {
        let slots = active();
        let source = slots[stream.slot()]
            .as_ref()
            .map(|capture| capture.redirect.saved_fd())
            .unwrap_or_else(|| fd(stream));
        redirect::duplicate(source)
    }

    pub(super) fn start(stream: StandardStream, owner: usize, sink: LineSink) -> Result<()> {
        let mut slots = active();
        let slot = &mut slots[stream.slot()];

        if let Some(capture) = slot {
            return if capture.owner == owner {
                Ok(())
            } else {
                Err(FacilityError::CaptureInUse {
                    stream: stream.to_string(),
                })
            };
        }

        let redirect = StreamRedirect::start(fd(stream), stream.as_str(), sink).map_err(|e| {
            FacilityError::CaptureFailed {
                stream: stream.to_string(),
                reason: e.to_string(),
            }
        })?;
        *slot = Some(ActiveCapture { owner, redirect });
        tracing::debug!(stream = stream.as_str(), "Started capturing standard stream");
        Ok(())
    }

    pub(super) fn stop(stream: StandardStream, owner: usize) -> Result<bool> {
        let mut slots = active();
        let slot = &mut slots[stream.slot()];

        match slot.take() {
            Some(capture) if capture.owner == owner => {
                capture
                    .redirect
                    .stop()
                    .map_err(|e| FacilityError::CaptureFailed {
                        stream: stream.to_string(),
                        reason: e.to_string(),
                    })?;
                tracing::debug!(stream = stream.as_str(), "Stopped capturing standard stream");
                Ok(true)
            }
            other => {
                *slot = other;
                Ok(false)
            }
        }
    }
}

#[cfg(not(unix))]
mod imp {
    use super::StandardStream;
    use crate::errors::{FacilityError, Result};
    use std::fs::File;
    use std::io;

    pub(super) fn is_captured(_stream: StandardStream) -> bool {
        false
    }

    pub(super) fn open_original(_stream: StandardStream) -> io::Result<File> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "descriptor duplication is not supported on this platform",
        ))
    }

    pub(super) fn start(
        _stream: StandardStream,
        _owner: usize,
        _sink: Box<dyn FnMut(String) + Send>,
    ) -> Result<()> {
        Err(FacilityError::CaptureUnsupported)
    }

    pub(super) fn stop(_stream: StandardStream, _owner: usize) -> Result<bool> {
        Ok(false)
    }
}
