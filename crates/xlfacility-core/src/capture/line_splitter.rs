//! Splits a byte stream into text lines

/// Buffers bytes until a newline completes a line
///
/// `\n` terminates a line and a preceding `\r` is dropped. Empty lines are
/// skipped. Bytes that are not valid UTF-8 are replaced lossily.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and return every line they complete
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut start = 0;

        for (offset, byte) in bytes.iter().enumerate() {
            if *byte != b'\n' {
                continue;
            }
            self.pending.extend_from_slice(&bytes[start..offset]);
            if let Some(line) = take_line(&mut self.pending) {
                lines.push(line);
            }
            start = offset + 1;
        }
        self.pending.extend_from_slice(&bytes[start..]);

        lines
    }

    /// Return the unterminated remainder, if any, and reset
    pub fn finish(&mut self) -> Option<String> {
        take_line(&mut self.pending)
    }
}

fn take_line(buffer: &mut Vec<u8>) -> Option<String> {
    if buffer.last() == Some(&b'\r') {
        buffer.pop();
    }
    let line = String::from_utf8_lossy(buffer).into_owned();
    buffer.clear();
    (!line.is_empty()).then_some(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_complete_lines() {
        let mut splitter = LineSplitter::new();
        assert_eq!(splitter.push(b"line1\nline2\n"), vec!["line1", "line2"]);
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn test_partial_line_is_held_until_terminated() {
        let mut splitter = LineSplitter::new();
        assert!(splitter.push(b"hel").is_empty());
        assert_eq!(splitter.push(b"lo\nwor"), vec!["hello"]);
        assert_eq!(splitter.finish(), Some("wor".to_string()));
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn test_crlf_and_empty_lines() {
        let mut splitter = LineSplitter::new();
        assert_eq!(splitter.push(b"a\r\n\n\r\nb\n"), vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut splitter = LineSplitter::new();
        let lines = splitter.push(b"ok \xff\n");
        assert_eq!(lines, vec!["ok \u{fffd}"]);
    }

    proptest! {
        #[test]
        fn prop_chunking_does_not_change_lines(
            text in "[a-z\\n]{0,64}",
            cut_points in proptest::collection::vec(0usize..64, 0..8),
        ) {
            let bytes = text.as_bytes();

            let mut whole = LineSplitter::new();
            let mut expected = whole.push(bytes);
            expected.extend(whole.finish());

            let mut cuts: Vec<usize> = cut_points.into_iter().map(|c| c.min(bytes.len())).collect();
            cuts.sort_unstable();
            let mut chunked = LineSplitter::new();
            let mut actual = Vec::new();
            let mut start = 0;
            for cut in cuts {
                actual.extend(chunked.push(&bytes[start..cut]));
                start = cut;
            }
            actual.extend(chunked.push(&bytes[start..]));
            actual.extend(chunked.finish());

            prop_assert_eq!(actual, expected);
        }
    }
}
