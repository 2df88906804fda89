//! # sseread - typed Server-Sent Events reader for AI-completion APIs
//!
//! Completion endpoints stream their output as `data:` lines carrying JSON
//! chunks, terminated by `data: [DONE]`. This crate turns such a response
//! body into a pull-based sequence of typed values.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Generic over the payload type; any `serde` type works with [`JsonCodec`]
//! - Partial reads buffered across chunk boundaries
//! - API errors detected at open time and in-band
//! - Deterministic terminal states and exactly-once release of the body
//!
//! ## Architecture
//!
//! - **[`Transport`]**: opens a [`StreamRequest`] and returns status, headers
//!   and a byte source. [`HttpTransport`] is the `reqwest` implementation.
//! - **[`Codec`]**: decodes payload bytes into `T`, and error bodies into
//!   [`ApiError`].
//! - **[`StreamReader`]**: frames the byte source into SSE lines and drives
//!   the codec, one value per [`recv`](StreamReader::recv).
//!
//! ## Example
//! ```no_run
//! use serde::Deserialize;
//! use sseread::{open_stream, HttpTransport, StreamOptions, StreamRequest, TransportOptions};
//!
//! #[derive(Debug, Deserialize)]
//! struct Chunk {
//!     id: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = HttpTransport::new(TransportOptions::default())?;
//!     let request = StreamRequest::post_json(
//!         "https://api.openai.com/v1/chat/completions",
//!         &serde_json::json!({"model": "gpt-4o", "stream": true, "messages": []}),
//!     )?;
//!
//!     let mut stream = open_stream::<Chunk, _>(&transport, request, StreamOptions::default()).await?;
//!     while let Some(chunk) = stream.recv().await? {
//!         println!("{:?}", chunk);
//!     }
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod error;
pub mod http;
pub mod options;
pub mod sse;
pub mod stream;
pub mod transport;

// Re-exports for convenience
pub use codec::{ApiError, Codec, ErrorResponse, JsonCodec};
pub use error::{DecodeError, FramingError, StreamError, TransportError};
pub use http::HttpTransport;
pub use options::{StreamOptions, TransportOptions};
pub use stream::{open_stream, open_stream_with, StreamReader};
pub use transport::{ByteSource, StreamRequest, Transport, TransportResponse};
