//! Payload decoding for stream frames and error bodies.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DecodeError;

/// Decodes frame payloads into `T` and error bodies into [`ApiError`].
///
/// The reader never inspects payload shape; all knowledge of `T`'s wire
/// format lives here.
pub trait Codec<T>: Send + Sync {
    /// Decode one `data:` payload into the target type.
    fn decode(&self, payload: &[u8]) -> Result<T, DecodeError>;

    /// Try to read a structured API error out of `body`.
    ///
    /// Returns `None` when the body is not an error envelope.
    fn decode_error(&self, body: &[u8]) -> Option<ApiError>;
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T: DeserializeOwned> Codec<T> for JsonCodec {
    fn decode(&self, payload: &[u8]) -> Result<T, DecodeError> {
        serde_json::from_slice(payload)
            .map_err(|e| DecodeError::new(e, bytes::Bytes::copy_from_slice(payload)))
    }

    fn decode_error(&self, body: &[u8]) -> Option<ApiError> {
        serde_json::from_slice::<ErrorResponse>(body)
            .ok()
            .and_then(|resp| resp.error)
    }
}

/// Envelope used by the API for error bodies: `{"error": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ErrorResponse {
    pub error: Option<ApiError>,
}

/// Structured error returned by the completion API.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ApiError {
    /// Machine-readable code. The API sends either a string or a number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,

    #[serde(default)]
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,

    #[serde(rename = "type", default)]
    pub error_type: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.error_type.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.error_type, self.message)
        }
    }
}
