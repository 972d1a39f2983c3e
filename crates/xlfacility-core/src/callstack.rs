//! Call stack capture
//!
//! Frames are rendered by `std::backtrace` and reduced to one descriptor per
//! frame, e.g. `"3: my_crate::module::function"`.

use std::backtrace::Backtrace;

/// Capture the current thread's call stack
///
/// Capture is forced regardless of `RUST_BACKTRACE`. The returned list is
/// empty only on platforms where backtraces are unsupported.
pub fn capture() -> Vec<String> {
    parse_frames(&Backtrace::force_capture().to_string())
}

/// Extract frame descriptors from a rendered backtrace
///
/// Rendered backtraces interleave numbered frame lines with `at file:line`
/// location lines. Locations are appended to the preceding frame.
pub(crate) fn parse_frames(rendered: &str) -> Vec<String> {
    let mut frames: Vec<String> = Vec::new();

    for line in rendered.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(location) = trimmed.strip_prefix("at ") {
            if let Some(last) = frames.last_mut() {
                last.push_str(" (");
                last.push_str(location);
                last.push(')');
            }
            continue;
        }

        let is_numbered = trimmed
            .split_once(':')
            .map(|(index, _)| !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false);
        if is_numbered {
            frames.push(trimmed.to_string());
        }
    }

    frames
}
