//! Server-Sent Events (SSE) line framing.
//!
//! Only the `data:` field carries payloads; everything else is classified so
//! the reader can skip it.
//!
//! SSE format:
//! ```text
//! event: ping
//!
//! data: {"key": "value"}
//!
//! data: {"another": "event"}
//!
//! data: [DONE]
//! ```

use bytes::{Bytes, BytesMut};

use crate::error::FramingError;

/// Field prefix of payload-carrying lines.
pub const DATA_PREFIX: &str = "data:";

/// Payload marking clean stream termination.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Start of an in-band error envelope inside a `data:` payload.
const ERROR_PREFIX: &[u8] = br#"{"error""#;

/// SSE fields that are valid but carry nothing for this protocol.
const KNOWN_FIELDS: [&[u8]; 3] = [b"event:", b"id:", b"retry:"];

/// A classified SSE line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// `data:` line; holds the trimmed payload.
    Data(&'a [u8]),
    /// Empty line: keep-alive or frame boundary.
    Blank,
    /// `:`-prefixed comment.
    Comment,
    /// `event:`, `id:` or `retry:` field.
    Field,
    /// Anything else. Kept by the reader in case it is a raw error body.
    Other(&'a [u8]),
}

impl Line<'_> {
    /// Parse one line (without its terminator).
    pub fn parse(line: &[u8]) -> Line<'_> {
        let line = line.trim_ascii();
        if line.is_empty() {
            return Line::Blank;
        }
        if let Some(data) = parse_sse_line(line) {
            return Line::Data(data);
        }
        if line.starts_with(b":") {
            return Line::Comment;
        }
        if KNOWN_FIELDS.iter().any(|field| line.starts_with(field)) {
            return Line::Field;
        }
        Line::Other(line)
    }
}

/// Extract the payload of a `data:` line.
///
/// The prefix and one following space are stripped, then the rest is trimmed.
///
/// # Example
/// ```
/// use sseread::sse::parse_sse_line;
///
/// assert_eq!(parse_sse_line(b"data: {\"key\": \"value\"}"), Some(&b"{\"key\": \"value\"}"[..]));
/// assert_eq!(parse_sse_line(b"data:[DONE]"), Some(&b"[DONE]"[..]));
/// assert_eq!(parse_sse_line(b"event: ping"), None);
/// ```
pub fn parse_sse_line(line: &[u8]) -> Option<&[u8]> {
    let data = line.strip_prefix(DATA_PREFIX.as_bytes())?;
    let data = data.strip_prefix(b" ").unwrap_or(data);
    Some(data.trim_ascii())
}

/// Check if a data payload is the termination sentinel.
///
/// # Example
/// ```
/// use sseread::sse::is_done_marker;
///
/// assert!(is_done_marker(b"[DONE]"));
/// assert!(is_done_marker(b" [DONE] "));
/// assert!(!is_done_marker(b"{\"data\": \"value\"}"));
/// ```
pub fn is_done_marker(data: &[u8]) -> bool {
    data.trim_ascii() == DONE_SENTINEL.as_bytes()
}

/// Whether a data payload looks like an `{"error": ...}` envelope.
pub fn is_error_payload(data: &[u8]) -> bool {
    data.starts_with(ERROR_PREFIX)
}

/// Accumulates raw bytes and yields complete `\n`-terminated lines.
///
/// Bytes after the last terminator stay buffered until more input arrives.
#[derive(Debug)]
pub struct LineBuffer {
    buf: BytesMut,
    // Bytes of `buf` already known to contain no terminator.
    scanned: usize,
    max_line_bytes: usize,
}

impl LineBuffer {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            scanned: 0,
            max_line_bytes,
        }
    }

    /// Append a chunk read from the byte source.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Take the next complete line, without its `\n` or trailing `\r`.
    ///
    /// Returns `Ok(None)` when no terminator is buffered yet, and an error
    /// once a line, complete or pending, exceeds the line limit.
    pub fn next_line(&mut self) -> Result<Option<Bytes>, FramingError> {
        match self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
            Some(offset) => {
                let end = self.scanned + offset;
                let mut line = self.buf.split_to(end + 1);
                self.scanned = 0;
                line.truncate(end);
                if line.last() == Some(&b'\r') {
                    line.truncate(end - 1);
                }
                if line.len() > self.max_line_bytes {
                    return Err(FramingError::LineTooLong {
                        limit: self.max_line_bytes,
                    });
                }
                Ok(Some(line.freeze()))
            }
            None => {
                self.scanned = self.buf.len();
                if self.buf.len() > self.max_line_bytes {
                    return Err(FramingError::LineTooLong {
                        limit: self.max_line_bytes,
                    });
                }
                Ok(None)
            }
        }
    }

    /// Bytes buffered after the last complete line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Drop everything buffered.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.scanned = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sse_line() {
        assert_eq!(parse_sse_line(b"data: hello"), Some(&b"hello"[..]));
        assert_eq!(
            parse_sse_line(b"data: {\"key\": \"value\"}"),
            Some(&b"{\"key\": \"value\"}"[..])
        );
        assert_eq!(parse_sse_line(b"data:   spaces  "), Some(&b"spaces"[..]));
        assert_eq!(parse_sse_line(b"data:"), Some(&b""[..]));
        assert_eq!(parse_sse_line(b"invalid"), None);
        assert_eq!(parse_sse_line(b""), None);
    }

    #[test]
    fn test_is_done_marker() {
        assert!(is_done_marker(b"[DONE]"));
        assert!(!is_done_marker(b""));
        assert!(!is_done_marker(b"data"));
        assert!(!is_done_marker(b"[DONE]x"));
    }

    #[test]
    fn test_line_classification() {
        assert_eq!(Line::parse(b""), Line::Blank);
        assert_eq!(Line::parse(b"   "), Line::Blank);
        assert_eq!(Line::parse(b": keep-alive"), Line::Comment);
        assert_eq!(Line::parse(b"event: ping"), Line::Field);
        assert_eq!(Line::parse(b"id: 42"), Line::Field);
        assert_eq!(Line::parse(b"retry: 1000"), Line::Field);
        assert_eq!(Line::parse(b"  data: {}"), Line::Data(b"{}"));
        assert_eq!(Line::parse(b"{\"error\": {}}"), Line::Other(b"{\"error\": {}}"));
    }

    #[test]
    fn test_error_payload_detection() {
        assert!(is_error_payload(br#"{"error":{"message":"boom"}}"#));
        assert!(!is_error_payload(br#"{"id":"1","error":null}"#));
    }

    #[test]
    fn test_line_buffer_across_chunks() {
        let mut lines = LineBuffer::new(1024);
        lines.extend(b"data: {\"id\"");
        assert_eq!(lines.next_line().unwrap(), None);

        lines.extend(b":\"1\"}\r\n\ndata: [DO");
        assert_eq!(
            lines.next_line().unwrap().as_deref(),
            Some(&b"data: {\"id\":\"1\"}"[..])
        );
        assert_eq!(lines.next_line().unwrap().as_deref(), Some(&b""[..]));
        assert_eq!(lines.next_line().unwrap(), None);
        assert_eq!(lines.pending(), b"data: [DO".len());

        lines.extend(b"NE]\n");
        assert_eq!(
            lines.next_line().unwrap().as_deref(),
            Some(&b"data: [DONE]"[..])
        );
        assert_eq!(lines.pending(), 0);
    }

    #[test]
    fn test_line_buffer_limit() {
        let mut lines = LineBuffer::new(8);
        lines.extend(b"0123456789");
        assert_eq!(
            lines.next_line(),
            Err(FramingError::LineTooLong { limit: 8 })
        );

        lines.clear();
        lines.extend(b"short\n");
        assert_eq!(lines.next_line().unwrap().as_deref(), Some(&b"short"[..]));
    }

    #[test]
    fn test_line_buffer_limit_with_terminator() {
        let mut lines = LineBuffer::new(8);
        lines.extend(b"0123456789\n");
        assert_eq!(
            lines.next_line(),
            Err(FramingError::LineTooLong { limit: 8 })
        );

        let mut lines = LineBuffer::new(8);
        lines.extend(b"01234567\r\n");
        assert_eq!(lines.next_line().unwrap().as_deref(), Some(&b"01234567"[..]));
    }
}
