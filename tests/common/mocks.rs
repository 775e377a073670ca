//! Mock implementations for test fixtures.
//!
//! This module re-exports the mock implementations from
//! `eventsource::adapters::mock` and provides test-specific configurations.

pub use eventsource::adapters::mock::{InMemoryLastEventIdStore, MockHttpClient, MockResponse};
pub use eventsource::traits::{Headers, HttpClient, HttpError};

/// Configuration for scripting a sequence of connection attempts.
pub struct MockStreamConfig {
    client: MockHttpClient,
}

impl MockStreamConfig {
    /// Creates a new mock stream configuration.
    pub fn new() -> Self {
        Self {
            client: MockHttpClient::new(),
        }
    }

    /// Next attempt: respond with `status`, send `chunks`, end the body.
    pub fn then_stream(self, status: u16, chunks: &[&str]) -> Self {
        self.client.push_response(MockResponse::stream(status, chunks));
        self
    }

    /// Next attempt: respond with `status`, send `chunks`, keep the body open.
    pub fn then_open(self, status: u16, chunks: &[&str]) -> Self {
        self.client.push_response(MockResponse::open(status, chunks));
        self
    }

    /// Next attempt: respond with `status`, send `chunks`, fail the body.
    pub fn then_body_error(self, status: u16, chunks: &[&str], error: HttpError) -> Self {
        self.client
            .push_response(MockResponse::stream_then_error(status, chunks, error));
        self
    }

    /// Next attempt: fail before any response.
    pub fn then_connect_error(self, error: HttpError) -> Self {
        self.client.push_response(MockResponse::Error(error));
        self
    }

    /// Every attempt after the scripted ones.
    pub fn otherwise(self, response: MockResponse) -> Self {
        self.client.set_default_response(response);
        self
    }

    /// Builds the configured MockHttpClient.
    pub fn build(self) -> MockHttpClient {
        self.client
    }
}

impl Default for MockStreamConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_stream_config_order() {
        let client = MockStreamConfig::new()
            .then_stream(250, &["data: a\n\n"])
            .then_connect_error(HttpError::Timeout("t".to_string()))
            .otherwise(MockResponse::stream(204, &[]))
            .build();

        let first = client.get_stream("http://h/e", &Headers::new()).await.unwrap();
        assert_eq!(first.status, 250);
        assert!(client.get_stream("http://h/e", &Headers::new()).await.is_err());
        let third = client.get_stream("http://h/e", &Headers::new()).await.unwrap();
        assert_eq!(third.status, 204);
    }
}
