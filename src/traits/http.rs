//! HTTP transport trait abstraction.
//!
//! Provides a trait-based abstraction for opening a streaming GET request,
//! enabling dependency injection and scripted transports in tests.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;

/// HTTP headers represented as a key-value map.
pub type Headers = HashMap<String, String>;

/// Response body delivered incrementally as byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// A response whose headers have arrived and whose body is still streaming.
pub struct StreamingResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Headers,
    /// Response body chunks; the stream ends when the server closes it
    pub body: ByteStream,
}

impl StreamingResponse {
    /// Create a response with no headers.
    pub fn new(status: u16, body: ByteStream) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body,
        }
    }

    /// Create a response with headers.
    pub fn with_headers(status: u16, headers: Headers, body: ByteStream) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// HTTP transport errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// Connection failed
    ConnectionFailed(String),
    /// Request timeout
    Timeout(String),
    /// Request was cancelled
    Cancelled,
    /// IO error while reading the body
    Io(String),
    /// Invalid URL
    InvalidUrl(String),
    /// Redirect chain exceeded the configured limit
    TooManyRedirects(usize),
    /// Other error
    Other(String),
}

impl HttpError {
    /// Whether the request was cancelled rather than failed.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, HttpError::Cancelled)
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            HttpError::Timeout(msg) => write!(f, "Request timeout: {}", msg),
            HttpError::Cancelled => write!(f, "Request cancelled"),
            HttpError::Io(msg) => write!(f, "IO error: {}", msg),
            HttpError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            HttpError::TooManyRedirects(limit) => {
                write!(f, "Too many redirects (limit {})", limit)
            }
            HttpError::Other(msg) => write!(f, "HTTP error: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}

/// Trait for the streaming HTTP transport.
///
/// The returned future resolves once response headers are available; the
/// body then arrives through [`StreamingResponse::body`]. Implementations
/// are expected to follow redirects, applying `headers` on every hop.
///
/// Cancellation is dropping: dropping the future or the body stream must
/// abort the underlying request.
///
/// # Example
///
/// ```ignore
/// use eventsource::traits::{Headers, HttpClient};
/// use futures_util::StreamExt;
///
/// async fn dump<C: HttpClient>(client: &C) -> Result<(), HttpError> {
///     let mut response = client.get_stream("https://example.com/events", &Headers::new()).await?;
///     while let Some(chunk) = response.body.next().await {
///         println!("{} bytes", chunk?.len());
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue a streaming GET request.
    ///
    /// # Arguments
    /// * `url` - The URL to request
    /// * `headers` - Request headers, re-applied on each redirect hop
    ///
    /// # Returns
    /// The response with its body still streaming, or an error if no
    /// response headers were received
    async fn get_stream(&self, url: &str, headers: &Headers)
        -> Result<StreamingResponse, HttpError>;
}
