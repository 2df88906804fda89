//! `reqwest`-backed transport.
//!
//! This module provides HTTP client construction from [`TransportOptions`]
//! and a [`Transport`] implementation that hands the response body to the
//! reader as a byte stream.

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{HeaderValue, ACCEPT, CACHE_CONTROL, CONNECTION};
use reqwest::{Client, RequestBuilder};
use std::collections::HashMap;

use crate::error::TransportError;
use crate::options::TransportOptions;
use crate::transport::{StreamRequest, Transport, TransportResponse};

/// Build a configured HTTP client from transport options.
///
/// This applies common configuration like timeouts and proxies.
pub fn build_http_client(transport_options: &TransportOptions) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder();

    if let Some(timeout) = transport_options.timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(timeout) = transport_options.connect_timeout {
        builder = builder.connect_timeout(timeout);
    }

    if let Some(proxy_url) = &transport_options.proxy {
        match reqwest::Proxy::all(proxy_url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(e) => tracing::warn!(proxy = %proxy_url, error = %e, "ignoring invalid proxy"),
        }
    }

    builder.build()
}

/// Add extra headers to a request if specified in transport options.
pub fn add_extra_headers(
    mut request: RequestBuilder,
    extra_headers: &Option<HashMap<String, String>>,
) -> RequestBuilder {
    if let Some(headers) = extra_headers {
        for (key, value) in headers {
            request = request.header(key, value);
        }
    }
    request
}

/// HTTP transport for streaming endpoints.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    options: TransportOptions,
}

impl HttpTransport {
    pub fn new(options: TransportOptions) -> Result<Self, TransportError> {
        let client = build_http_client(&options)
            .map_err(|e| TransportError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, options })
    }

    /// Use an existing client. Timeouts and proxy in `options` are ignored.
    pub fn with_client(client: Client, options: TransportOptions) -> Self {
        Self { client, options }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, request: StreamRequest) -> Result<TransportResponse, TransportError> {
        let StreamRequest {
            method,
            url,
            headers,
            body,
            ..
        } = request;

        let mut req = self
            .client
            .request(method.clone(), &url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"))
            .header(CONNECTION, HeaderValue::from_static("keep-alive"))
            .headers(headers);

        req = add_extra_headers(req, &self.options.extra_headers);

        if let Some(body) = body {
            req = req.body(body);
        }

        tracing::debug!(%method, %url, "opening stream");
        let response = req.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes_stream().map_err(TransportError::from);

        Ok(TransportResponse::new(status, headers, body))
    }
}
