//! Transport seam: how a request becomes a status, headers and a byte source.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;

/// A response body delivered as a stream of byte chunks.
pub type ByteSource = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Opens streaming requests.
///
/// Implementations must not read from the returned byte source; it belongs
/// to the reader that consumes the response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, request: StreamRequest) -> Result<TransportResponse, TransportError>;
}

/// A fully-formed streaming request.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// Aborts the request and any pull blocked on it when cancelled.
    pub cancellation: Option<CancellationToken>,
}

impl StreamRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            cancellation: None,
        }
    }

    /// POST `body` as JSON to `url`.
    pub fn post_json<B: Serialize + ?Sized>(
        url: impl Into<String>,
        body: &B,
    ) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(body)?;
        let mut request = Self::new(Method::POST, url);
        request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        request.body = Some(Bytes::from(body));
        Ok(request)
    }

    /// Add a header, replacing any previous value for the same name.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the cancellation signal.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// What a transport hands back once the response head has arrived.
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ByteSource,
}

impl TransportResponse {
    pub fn new(
        status: StatusCode,
        headers: HeaderMap,
        body: impl Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
    ) -> Self {
        Self {
            status,
            headers,
            body: Box::pin(body),
        }
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_post_json() {
        let request = StreamRequest::post_json(
            "http://localhost/v1/chat/completions",
            &json!({"model": "gpt-4o", "stream": true}),
        )
        .unwrap();

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.headers[CONTENT_TYPE], "application/json");
        let body: serde_json::Value = serde_json::from_slice(request.body.as_ref().unwrap()).unwrap();
        assert_eq!(body["stream"], true);
        assert!(request.cancellation.is_none());
    }

    #[test]
    fn test_with_header_replaces() {
        let name = HeaderName::from_static("openai-beta");
        let request = StreamRequest::new(Method::GET, "http://localhost")
            .with_header(name.clone(), HeaderValue::from_static("assistants=v1"))
            .with_header(name.clone(), HeaderValue::from_static("assistants=v2"));
        assert_eq!(request.headers.get_all(&name).iter().count(), 1);
        assert_eq!(request.headers[&name], "assistants=v2");
    }
}
