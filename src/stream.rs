//! Typed pull-based reader over an SSE response body.

use std::marker::PhantomData;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::{stream, Stream, StreamExt};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::codec::{Codec, JsonCodec};
use crate::error::{FramingError, StreamError, TransportError};
use crate::options::StreamOptions;
use crate::sse::{self, Line, LineBuffer};
use crate::transport::{ByteSource, StreamRequest, Transport, TransportResponse};

#[derive(Debug)]
enum State {
    Open,
    Done,
    Failed(StreamError),
}

/// Reads `data:` frames from a response body and decodes them into `T`.
///
/// A reader has exactly one consumer: [`recv`](Self::recv) takes `&mut self`,
/// so concurrent pulls on the same reader cannot compile. Readers for
/// different requests share nothing.
///
/// The body is released the first time the reader reaches a terminal state:
/// the `[DONE]` sentinel, end of input, any error, or [`close`](Self::close).
/// From then on every pull returns the same outcome without touching the body.
pub struct StreamReader<T, C = JsonCodec> {
    source: Option<ByteSource>,
    lines: LineBuffer,
    codec: C,
    options: StreamOptions,
    cancellation: Option<CancellationToken>,
    status: StatusCode,
    headers: HeaderMap,
    // Non-SSE lines seen so far; may turn out to be a raw error body.
    error_body: BytesMut,
    state: State,
    _payload: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> StreamReader<T, JsonCodec> {
    /// Build a JSON reader from an opened response.
    pub async fn new(response: TransportResponse) -> Result<Self, StreamError> {
        Self::with_codec(response, JsonCodec, StreamOptions::default()).await
    }
}

impl<T, C: Codec<T>> StreamReader<T, C> {
    /// Build a reader from an opened response.
    ///
    /// A non-success status never produces a reader: the body is drained and
    /// returned as [`StreamError::Api`] when it holds an error envelope, or
    /// [`StreamError::Status`] otherwise.
    pub async fn with_codec(
        response: TransportResponse,
        codec: C,
        options: StreamOptions,
    ) -> Result<Self, StreamError> {
        let TransportResponse {
            status,
            headers,
            body,
        } = response;

        if !status.is_success() {
            let body = read_to_end(body, options.read_timeout).await?;
            return Err(match codec.decode_error(&body) {
                Some(error) => {
                    tracing::warn!(%status, %error, "stream request rejected");
                    StreamError::Api { status, error }
                }
                None => StreamError::Status {
                    status,
                    body: String::from_utf8_lossy(&body).into_owned(),
                },
            });
        }

        tracing::debug!(%status, "stream opened");
        Ok(Self {
            source: Some(body),
            lines: LineBuffer::new(options.max_line_bytes),
            codec,
            options,
            cancellation: None,
            status,
            headers,
            error_body: BytesMut::new(),
            state: State::Open,
            _payload: PhantomData,
        })
    }

    /// Abort pending and future reads when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Status of the response that opened this stream.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Headers of the response that opened this stream.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Whether the reader has reached a terminal state.
    pub fn is_closed(&self) -> bool {
        !matches!(self.state, State::Open)
    }

    /// Pull the next value.
    ///
    /// Returns `Ok(Some(value))` for each decoded frame, `Ok(None)` once the
    /// stream has ended cleanly, and `Err` when it failed. Both `Ok(None)` and
    /// `Err` are repeated on every later call.
    pub async fn recv(&mut self) -> Result<Option<T>, StreamError> {
        match &self.state {
            State::Open => {}
            State::Done => return Ok(None),
            State::Failed(err) => return Err(err.clone()),
        }

        match self.advance().await {
            Ok(Some(value)) => Ok(Some(value)),
            Ok(None) => {
                tracing::debug!("stream finished");
                self.finish(State::Done);
                Ok(None)
            }
            Err(err) => {
                tracing::warn!(error = %err, "stream failed");
                self.finish(State::Failed(err.clone()));
                Err(err)
            }
        }
    }

    /// Release the response body. Safe to call any number of times.
    pub fn close(&mut self) {
        if matches!(self.state, State::Open) {
            tracing::debug!("stream closed by caller");
            self.finish(State::Done);
        }
    }

    /// Adapt into a [`Stream`] that yields values, then at most one error.
    pub fn into_stream(self) -> impl Stream<Item = Result<T, StreamError>> + Send
    where
        T: Send,
    {
        stream::unfold(Some(self), |reader| async move {
            let mut reader = reader?;
            match reader.recv().await {
                Ok(Some(value)) => Some((Ok(value), Some(reader))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
    }

    fn finish(&mut self, state: State) {
        self.state = state;
        self.source = None;
        self.lines.clear();
        self.error_body.clear();
    }

    async fn advance(&mut self) -> Result<Option<T>, StreamError> {
        let mut discarded = 0usize;

        loop {
            let Some(line) = self.lines.next_line()? else {
                match self.read_chunk().await? {
                    Some(chunk) => {
                        self.lines.extend(&chunk);
                        continue;
                    }
                    None => return self.end_of_input(),
                }
            };

            match Line::parse(&line) {
                Line::Data(payload) => {
                    // Stray lines before a frame are not part of an error body.
                    self.error_body.clear();
                    if sse::is_done_marker(payload) {
                        return Ok(None);
                    }
                    if sse::is_error_payload(payload) {
                        if let Some(error) = self.codec.decode_error(payload) {
                            return Err(StreamError::Api {
                                status: self.status,
                                error,
                            });
                        }
                    }
                    tracing::trace!(bytes = payload.len(), "decoding frame");
                    return self.codec.decode(payload).map(Some).map_err(Into::into);
                }
                Line::Other(content) => self.buffer_stray_line(content),
                Line::Blank | Line::Comment | Line::Field => {
                    tracing::trace!("discarding non-data line");
                }
            }

            discarded += 1;
            if let Some(limit) = self.options.empty_messages_limit {
                if discarded > limit {
                    return Err(FramingError::TooManyEmptyMessages { limit }.into());
                }
            }
        }
    }

    // Kept at most `max_line_bytes` long; a larger body is not an error envelope.
    fn buffer_stray_line(&mut self, content: &[u8]) {
        tracing::trace!(bytes = content.len(), "buffering unrecognized line");
        let room = self
            .options
            .max_line_bytes
            .saturating_sub(self.error_body.len());
        self.error_body
            .extend_from_slice(&content[..content.len().min(room)]);
    }

    fn end_of_input(&mut self) -> Result<Option<T>, StreamError> {
        if self.lines.pending() > 0 {
            tracing::trace!(bytes = self.lines.pending(), "dropping unterminated trailing line");
        }
        if !self.error_body.is_empty() {
            if let Some(error) = self.codec.decode_error(&self.error_body) {
                return Err(StreamError::Api {
                    status: self.status,
                    error,
                });
            }
        }
        Ok(None)
    }

    async fn read_chunk(&mut self) -> Result<Option<Bytes>, StreamError> {
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };
        let read = next_chunk(source, self.options.read_timeout);

        let chunk = match &self.cancellation {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Err(TransportError::Cancelled.into()),
                chunk = read => chunk?,
            },
            None => read.await?,
        };
        Ok(chunk)
    }
}

impl<T, C> std::fmt::Debug for StreamReader<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamReader")
            .field("status", &self.status)
            .field("state", &self.state)
            .field("released", &self.source.is_none())
            .finish_non_exhaustive()
    }
}

async fn next_chunk(
    source: &mut ByteSource,
    timeout: Option<Duration>,
) -> Result<Option<Bytes>, TransportError> {
    let item = match timeout {
        Some(limit) => tokio::time::timeout(limit, source.next())
            .await
            .map_err(|_| TransportError::Timeout(limit))?,
        None => source.next().await,
    };
    item.transpose()
}

async fn read_to_end(
    mut source: ByteSource,
    timeout: Option<Duration>,
) -> Result<Bytes, TransportError> {
    let mut body = BytesMut::new();
    while let Some(chunk) = next_chunk(&mut source, timeout).await? {
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

/// Open `request` on `transport` and wrap the response in a JSON reader.
///
/// The request's cancellation token, if any, covers both the open and every
/// later pull.
pub async fn open_stream<T, Tr>(
    transport: &Tr,
    request: StreamRequest,
    options: StreamOptions,
) -> Result<StreamReader<T>, StreamError>
where
    T: DeserializeOwned,
    Tr: Transport + ?Sized,
{
    open_stream_with(transport, request, JsonCodec, options).await
}

/// Like [`open_stream`], with an explicit codec.
pub async fn open_stream_with<T, C, Tr>(
    transport: &Tr,
    request: StreamRequest,
    codec: C,
    options: StreamOptions,
) -> Result<StreamReader<T, C>, StreamError>
where
    C: Codec<T>,
    Tr: Transport + ?Sized,
{
    let cancellation = request.cancellation.clone();

    // Covers the response head and, on a failing status, draining the error body.
    let construct = async {
        let response = transport.open(request).await?;
        StreamReader::with_codec(response, codec, options).await
    };

    let reader = match &cancellation {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => return Err(TransportError::Cancelled.into()),
            reader = construct => reader?,
        },
        None => construct.await?,
    };
    Ok(match cancellation {
        Some(token) => reader.with_cancellation(token),
        None => reader,
    })
}
