//! Standard stream backend
//!
//! Each event becomes one line, followed by its call stack frames indented by
//! four spaces. The destination is a duplicate of the stream's descriptor as
//! it was before any capture, taken when the logger is opened.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use xlfacility_core_types::{AtomicLogLevel, LogLevel};

use crate::capture::{self, StandardStream};
use crate::errors::{FacilityError, Result};
use crate::event::Event;
use crate::logger::Logger;

static SHARED_OUTPUT: OnceLock<Arc<StandardLogger>> = OnceLock::new();
static SHARED_ERROR: OnceLock<Arc<StandardLogger>> = OnceLock::new();

/// Line layout written by a [`StandardLogger`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `2026-01-03 12:00:00.000 [WARNING] (net) connection reset`
    #[default]
    Text,
    /// One [`Event::to_json`] object per line
    Json,
}

/// Writes events to standard output or standard error
///
/// The same instance may be registered with several facilities; the
/// destination stays open until the last registration closes it.
pub struct StandardLogger {
    stream: StandardStream,
    format: OutputFormat,
    min_level: AtomicLogLevel,
    output: Mutex<Output>,
}

#[derive(Default)]
struct Output {
    opens: usize,
    writer: Option<Box<dyn Write + Send>>,
}

impl StandardLogger {
    pub fn new(stream: StandardStream, format: OutputFormat) -> Self {
        Self {
            stream,
            format,
            min_level: AtomicLogLevel::new(LogLevel::MIN),
            output: Mutex::new(Output::default()),
        }
    }

    /// Process-wide text logger for standard output
    pub fn shared_output() -> Arc<StandardLogger> {
        SHARED_OUTPUT
            .get_or_init(|| Arc::new(Self::new(StandardStream::Output, OutputFormat::Text)))
            .clone()
    }

    /// Process-wide text logger for standard error
    pub fn shared_error() -> Arc<StandardLogger> {
        SHARED_ERROR
            .get_or_init(|| Arc::new(Self::new(StandardStream::Error, OutputFormat::Text)))
            .clone()
    }

    pub fn stream(&self) -> StandardStream {
        self.stream
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn set_min_level(&self, level: LogLevel) {
        self.min_level.store(level);
    }

    /// Render an event the way this logger writes it, including the newline
    pub fn render(&self, event: &Event) -> String {
        match self.format {
            OutputFormat::Text => render_text(event),
            OutputFormat::Json => {
                let mut line = event.to_json();
                line.push('\n');
                line
            }
        }
    }

    fn output(&self) -> MutexGuard<'_, Output> {
        self.output.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open_writer(&self) -> io::Result<Box<dyn Write + Send>> {
        match capture::open_original(self.stream) {
            Ok(file) => Ok(Box::new(file) as Box<dyn Write + Send>),
            // Platforms without descriptor duplication cannot capture either
            Err(e) if e.kind() == io::ErrorKind::Unsupported => Ok(match self.stream {
                StandardStream::Output => Box::new(io::stdout()),
                StandardStream::Error => Box::new(io::stderr()),
            }),
            Err(e) => Err(e),
        }
    }
}

impl Logger for StandardLogger {
    fn open(&self) -> Result<()> {
        let mut output = self.output();
        if output.writer.is_none() {
            let writer = self
                .open_writer()
                .map_err(|e| FacilityError::open_failed(self.name(), e.to_string()))?;
            output.writer = Some(writer);
        }
        output.opens += 1;
        Ok(())
    }

    fn close(&self) {
        let mut output = self.output();
        output.opens = output.opens.saturating_sub(1);
        if output.opens == 0 {
            if let Some(mut writer) = output.writer.take() {
                let _ = writer.flush();
            }
        }
    }

    fn deliver(&self, event: &Event) {
        let line = self.render(event);
        let mut output = self.output();
        if let Some(writer) = output.writer.as_mut() {
            // Nowhere left to report a failing standard stream
            let _ = writer.write_all(line.as_bytes());
            let _ = writer.flush();
        }
    }

    fn min_level(&self) -> LogLevel {
        self.min_level.load()
    }

    fn name(&self) -> &str {
        match self.stream {
            StandardStream::Output => "StandardLogger(stdout)",
            StandardStream::Error => "StandardLogger(stderr)",
        }
    }
}

fn render_text(event: &Event) -> String {
    let mut line = format!(
        "{} [{}]",
        event.timestamp().format("%Y-%m-%d %H:%M:%S%.3f"),
        event.level()
    );
    if let Some(tag) = event.tag() {
        line.push_str(" (");
        line.push_str(tag);
        line.push(')');
    }
    line.push(' ');
    line.push_str(event.message());
    line.push('\n');

    for frame in event.callstack().unwrap_or_default() {
        line.push_str("    ");
        line.push_str(frame);
        line.push('\n');
    }
    line
}
