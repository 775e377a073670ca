//! Mock HTTP client for testing.
//!
//! Provides a scripted streaming client: each request takes the next
//! configured response from a queue, so tests can describe a sequence of
//! connection attempts.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::traits::{ByteStream, Headers, HttpClient, HttpError, StreamingResponse};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request URL
    pub url: String,
    /// Request headers
    pub headers: Headers,
}

impl RecordedRequest {
    /// Look up a header case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Respond with a status, deliver the chunks, then end the body
    Stream { status: u16, chunks: Vec<Bytes> },
    /// Respond with a status, deliver the chunks, then fail the body
    StreamThenError {
        status: u16,
        chunks: Vec<Bytes>,
        error: HttpError,
    },
    /// Respond with a status, deliver the chunks, then keep the body open
    Open { status: u16, chunks: Vec<Bytes> },
    /// Fail before any response arrives
    Error(HttpError),
}

impl MockResponse {
    /// A body that ends after `chunks`.
    pub fn stream(status: u16, chunks: &[&str]) -> Self {
        MockResponse::Stream {
            status,
            chunks: to_bytes(chunks),
        }
    }

    /// A body that never ends after `chunks`.
    pub fn open(status: u16, chunks: &[&str]) -> Self {
        MockResponse::Open {
            status,
            chunks: to_bytes(chunks),
        }
    }

    /// A body that fails with `error` after `chunks`.
    pub fn stream_then_error(status: u16, chunks: &[&str], error: HttpError) -> Self {
        MockResponse::StreamThenError {
            status,
            chunks: to_bytes(chunks),
            error,
        }
    }

    fn into_result(self) -> Result<StreamingResponse, HttpError> {
        match self {
            MockResponse::Stream { status, chunks } => {
                let body: ByteStream = Box::pin(futures::stream::iter(
                    chunks.into_iter().map(Ok::<Bytes, HttpError>),
                ));
                Ok(StreamingResponse::new(status, body))
            }
            MockResponse::StreamThenError {
                status,
                chunks,
                error,
            } => {
                let items = chunks
                    .into_iter()
                    .map(Ok::<Bytes, HttpError>)
                    .chain(std::iter::once(Err(error)));
                let body: ByteStream = Box::pin(futures::stream::iter(items));
                Ok(StreamingResponse::new(status, body))
            }
            MockResponse::Open { status, chunks } => {
                let body: ByteStream = Box::pin(
                    futures::stream::iter(chunks.into_iter().map(Ok::<Bytes, HttpError>))
                        .chain(futures::stream::pending()),
                );
                Ok(StreamingResponse::new(status, body))
            }
            MockResponse::Error(err) => Err(err),
        }
    }
}

fn to_bytes(chunks: &[&str]) -> Vec<Bytes> {
    chunks
        .iter()
        .map(|chunk| Bytes::copy_from_slice(chunk.as_bytes()))
        .collect()
}

/// Mock HTTP client for testing.
///
/// Responses are consumed in order; once the queue is empty the default
/// response (if any) is used for every further request.
///
/// # Example
///
/// ```ignore
/// use eventsource::adapters::mock::{MockHttpClient, MockResponse};
///
/// let client = MockHttpClient::new();
/// client.push_response(MockResponse::stream(250, &["data: first\n\n"]));
/// client.set_default_response(MockResponse::open(200, &[]));
///
/// let response = client.get_stream("http://localhost/events", &Headers::new()).await?;
/// assert_eq!(response.status, 250);
/// assert_eq!(client.request_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    /// Responses for the next requests, in order
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    /// Response used when the queue is empty
    default_response: Arc<Mutex<Option<MockResponse>>>,
    /// Recorded requests for verification
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a client with a queue of responses.
    pub fn with_responses(responses: impl IntoIterator<Item = MockResponse>) -> Self {
        let client = Self::new();
        for response in responses {
            client.push_response(response);
        }
        client
    }

    /// Queue a response for the next unanswered request.
    pub fn push_response(&self, response: MockResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// Set the response used once the queue is empty.
    pub fn set_default_response(&self, response: MockResponse) {
        *self.default_response.lock().unwrap() = Some(response);
    }

    /// Get all recorded requests.
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests made so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Clear all recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    fn record_request(&self, url: &str, headers: &Headers) {
        self.requests.lock().unwrap().push(RecordedRequest {
            url: url.to_string(),
            headers: headers.clone(),
        });
    }

    fn next_response(&self) -> Option<MockResponse> {
        if let Some(response) = self.responses.lock().unwrap().pop_front() {
            return Some(response);
        }
        self.default_response.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get_stream(
        &self,
        url: &str,
        headers: &Headers,
    ) -> Result<StreamingResponse, HttpError> {
        self.record_request(url, headers);

        match self.next_response() {
            Some(response) => response.into_result(),
            None => Err(HttpError::Other(format!("No mock response for URL: {}", url))),
        }
    }
}
