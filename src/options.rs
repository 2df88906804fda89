//! Options for the stream reader and the HTTP transport.

use std::collections::HashMap;
use std::time::Duration;

/// Consecutive non-data lines tolerated within a single pull.
pub const DEFAULT_EMPTY_MESSAGES_LIMIT: usize = 300;

/// Longest unterminated line the reader will buffer.
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Reader behavior.
///
/// # Example
/// ```rust
/// use sseread::options::StreamOptions;
/// use std::time::Duration;
///
/// let options = StreamOptions::default()
///     .with_empty_messages_limit(Some(50))
///     .with_read_timeout(Duration::from_secs(30));
/// assert_eq!(options.empty_messages_limit, Some(50));
/// ```
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Fail a pull after this many consecutive discarded lines. `None` disables the check.
    pub empty_messages_limit: Option<usize>,

    /// Fail when a line grows past this many bytes without a terminator.
    pub max_line_bytes: usize,

    /// Upper bound on each read from the byte source.
    pub read_timeout: Option<Duration>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            empty_messages_limit: Some(DEFAULT_EMPTY_MESSAGES_LIMIT),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            read_timeout: None,
        }
    }
}

impl StreamOptions {
    pub fn with_empty_messages_limit(mut self, limit: Option<usize>) -> Self {
        self.empty_messages_limit = limit;
        self
    }

    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }
}

/// HTTP transport configuration.
///
/// # Example
/// ```rust
/// use sseread::options::TransportOptions;
/// use std::time::Duration;
///
/// let options = TransportOptions::default()
///     .with_timeout(Duration::from_secs(600))
///     .with_header("OpenAI-Beta".to_string(), "assistants=v1".to_string());
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Total request timeout, including reading the whole body
    pub timeout: Option<Duration>,

    pub connect_timeout: Option<Duration>,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in requests
    pub extra_headers: Option<HashMap<String, String>>,
}

impl TransportOptions {
    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Set extra headers.
    pub fn with_extra_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.extra_headers = Some(headers);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }
}
