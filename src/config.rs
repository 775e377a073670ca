//! Event source configuration.

use std::time::Duration;

use url::Url;

use crate::error::{EventSourceError, EventSourceResult};
use crate::traits::Headers;

/// Reconnection delay used until the server sends a `retry` field.
pub const DEFAULT_RETRY_TIME_MS: u64 = 3000;

/// Redirect hops followed before a request fails.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Configuration for an [`EventSource`](crate::EventSource).
#[derive(Debug, Clone)]
pub struct EventSourceConfig {
    /// Stream endpoint
    pub url: Url,
    /// Caller headers sent with every request and redirect hop
    pub headers: Headers,
    /// Initial reconnection delay
    pub retry_time: Duration,
    /// Forget the persisted last event id when the event source is created
    pub reset_last_event_id: bool,
    /// Redirect hops followed by the default transport
    pub max_redirects: usize,
}

impl EventSourceConfig {
    /// Create a configuration for `url` with default settings.
    ///
    /// Only `http` and `https` URLs are accepted.
    pub fn new(url: &str) -> EventSourceResult<Self> {
        let url = Url::parse(url)?;
        Self::from_url(url)
    }

    /// Create a configuration from an already parsed URL.
    pub fn from_url(url: Url) -> EventSourceResult<Self> {
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(EventSourceError::UnsupportedScheme(other.to_string())),
        }

        Ok(Self {
            url,
            headers: Headers::new(),
            retry_time: Duration::from_millis(DEFAULT_RETRY_TIME_MS),
            reset_last_event_id: false,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        })
    }

    /// Add a caller header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Replace all caller headers.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Set the initial reconnection delay.
    pub fn with_retry_time(mut self, retry_time: Duration) -> Self {
        self.retry_time = retry_time;
        self
    }

    /// Forget any persisted last event id on creation.
    pub fn with_reset_last_event_id(mut self, reset: bool) -> Self {
        self.reset_last_event_id = reset;
        self
    }

    /// Set the redirect limit for the default transport.
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Check that every caller header is valid HTTP.
    pub fn validate(&self) -> EventSourceResult<()> {
        for (name, value) in &self.headers {
            let name_ok = reqwest::header::HeaderName::from_bytes(name.as_bytes()).is_ok();
            let value_ok = reqwest::header::HeaderValue::from_str(value).is_ok();
            if !name_ok || !value_ok {
                return Err(EventSourceError::InvalidHeader { name: name.clone() });
            }
        }
        Ok(())
    }
}
