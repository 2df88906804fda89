//! Error types for stream construction and consumption.
//!
//! Every variant is terminal for the stream that produced it. Errors are
//! `Clone` so a closed reader can report the same failure on every later pull.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::codec::ApiError;

/// Errors surfaced by [`StreamReader`](crate::stream::StreamReader) construction and pulls.
#[derive(Error, Debug, Clone)]
pub enum StreamError {
    /// Structured API error, either from a failing status or delivered in-band.
    #[error("API error (HTTP {status}): {error}")]
    Api { status: StatusCode, error: ApiError },

    /// Non-success status whose body is not a structured API error.
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl StreamError {
    /// Whether this is a connection-level failure (reset, timeout, cancellation).
    pub fn is_transport(&self) -> bool {
        matches!(self, StreamError::Transport(_))
    }

    /// Whether a payload failed to decode into the target type.
    pub fn is_decode(&self) -> bool {
        matches!(self, StreamError::Decode(_))
    }

    /// The structured API error, if this failure carries one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            StreamError::Api { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Connection-level failures of the byte source or the request itself.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(Arc<reqwest::Error>),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("read timed out after {0:?}")]
    Timeout(Duration),

    #[error("stream cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Http(Arc::new(err))
    }
}

/// The byte source produced data that cannot be framed as SSE lines.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    #[error("stream has sent too many empty messages ({limit} allowed)")]
    TooManyEmptyMessages { limit: usize },

    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
}

/// A `data:` payload did not match the target type's shape.
#[derive(Error, Debug, Clone)]
#[error("failed to decode stream payload: {source}")]
pub struct DecodeError {
    #[source]
    source: Arc<dyn std::error::Error + Send + Sync>,
    payload: bytes::Bytes,
}

impl DecodeError {
    pub fn new(
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
        payload: impl Into<bytes::Bytes>,
    ) -> Self {
        Self {
            source: Arc::from(source.into()),
            payload: payload.into(),
        }
    }

    /// The raw payload bytes that failed to decode.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            StreamError::from(TransportError::Cancelled).to_string(),
            "stream cancelled"
        );
        assert_eq!(
            StreamError::from(FramingError::TooManyEmptyMessages { limit: 3 }).to_string(),
            "stream has sent too many empty messages (3 allowed)"
        );
        assert_eq!(
            StreamError::Status {
                status: StatusCode::BAD_GATEWAY,
                body: "upstream".to_string(),
            }
            .to_string(),
            "unexpected HTTP status 502 Bad Gateway: upstream"
        );
    }

    #[test]
    fn test_decode_error_keeps_payload() {
        let source = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = DecodeError::new(source, &b"nope"[..]);
        assert_eq!(err.payload(), b"nope");
        assert!(std::error::Error::source(&err).is_some());

        let cloned = StreamError::from(err).clone();
        assert!(cloned.is_decode());
        assert!(!cloned.is_transport());
    }
}
