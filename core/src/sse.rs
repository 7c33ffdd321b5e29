//! Server-Sent-Events line scanning
//!
//! An SSE frame boundary can fall in the middle of a transport chunk, so
//! both ends of the pipeline reassemble lines through a carry-over buffer:
//! each incoming byte chunk is appended, complete lines are drained, and the
//! trailing partial line waits for the next chunk.

/// Prefix of a meaningful SSE line
pub const DATA_PREFIX: &str = "data: ";

/// Terminal sentinel payload closing a stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// Payload of a single `data:` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseData {
    /// A JSON (or other) payload to be parsed by the caller
    Payload(String),
    /// The `[DONE]` terminator
    Done,
}

/// Extract the payload from one SSE line.
///
/// Lines without the `data: ` prefix (blank separators, comments, event
/// names) carry nothing and yield `None`.
pub fn parse_data_line(line: &str) -> Option<SseData> {
    let data = line.strip_prefix(DATA_PREFIX)?;
    if data.trim() == DONE_SENTINEL {
        Some(SseData::Done)
    } else {
        Some(SseData::Payload(data.to_string()))
    }
}

/// Format a payload as a wire frame: `data: <payload>\n\n`
pub fn format_frame(payload: &str) -> String {
    format!("{}{}\n\n", DATA_PREFIX, payload)
}

/// Incremental line scanner over a byte-chunk stream
#[derive(Debug, Default)]
pub struct LineScanner {
    buffer: Vec<u8>,
}

impl LineScanner {
    /// Create an empty scanner
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every complete line it closed.
    ///
    /// The carry-over buffer holds raw bytes and only complete lines are
    /// decoded, so a multibyte character whose bytes straddle a chunk
    /// boundary is reassembled intact. Invalid UTF-8 within a line is
    /// replaced rather than failed: a lossy character in a malformed line
    /// gets skipped at parse time like any other bad line.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Whatever is still waiting for a newline
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_line() {
        assert_eq!(
            parse_data_line(r#"data: {"content":"你好"}"#),
            Some(SseData::Payload(r#"{"content":"你好"}"#.to_string()))
        );
        assert_eq!(parse_data_line("data: [DONE]"), Some(SseData::Done));
        assert_eq!(parse_data_line(""), None);
        assert_eq!(parse_data_line(": keep-alive"), None);
        assert_eq!(parse_data_line("event: message"), None);
    }

    #[test]
    fn test_scanner_reassembles_split_frames() {
        let mut scanner = LineScanner::new();

        // A frame boundary falling inside a chunk must not lose data.
        let lines = scanner.push(b"data: {\"con");
        assert!(lines.is_empty());
        assert_eq!(scanner.pending(), b"data: {\"con".as_slice());

        let lines = scanner.push(b"tent\":\"A\"}\n\ndata: [DO");
        assert_eq!(lines, vec!["data: {\"content\":\"A\"}".to_string(), String::new()]);

        let lines = scanner.push(b"NE]\n\n");
        assert_eq!(lines, vec!["data: [DONE]".to_string(), String::new()]);
    }

    #[test]
    fn test_scanner_keeps_split_multibyte_chars_intact() {
        let mut scanner = LineScanner::new();
        let line = "data: {\"content\":\"你好\"}\n";
        let frame = line.as_bytes();

        // 你 occupies bytes 18..21; cut after its first byte.
        assert!(!line.is_char_boundary(19));
        assert!(scanner.push(&frame[..19]).is_empty());
        let lines = scanner.push(&frame[19..]);
        assert_eq!(lines, vec!["data: {\"content\":\"你好\"}".to_string()]);
    }

    #[test]
    fn test_scanner_strips_carriage_returns() {
        let mut scanner = LineScanner::new();
        let lines = scanner.push(b"data: x\r\n");
        assert_eq!(lines, vec!["data: x".to_string()]);
    }

    #[test]
    fn test_scanner_multiple_frames_in_one_chunk() {
        let mut scanner = LineScanner::new();
        let lines = scanner.push(b"data: 1\n\ndata: 2\n\n");
        let data: Vec<_> = lines.iter().filter_map(|l| parse_data_line(l)).collect();
        assert_eq!(
            data,
            vec![
                SseData::Payload("1".to_string()),
                SseData::Payload("2".to_string())
            ]
        );
    }
}
