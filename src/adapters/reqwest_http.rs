//! Reqwest-based HTTP client adapter.
//!
//! This module provides a production HTTP client implementation using reqwest,
//! implementing the [`HttpClient`] trait from `crate::traits`.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use tracing::debug;
use url::Url;

use crate::config::DEFAULT_MAX_REDIRECTS;
use crate::traits::{ByteStream, Headers, HttpClient, HttpError, StreamingResponse};

/// Redirect statuses that carry a `Location` to follow.
const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

/// HTTP client implementation using reqwest.
///
/// Redirects are followed by the adapter rather than by reqwest so that the
/// caller's headers are applied unchanged on every hop, including hops to
/// another host.
///
/// # Example
///
/// ```ignore
/// use eventsource::adapters::ReqwestHttpClient;
/// use eventsource::traits::{Headers, HttpClient};
///
/// let client = ReqwestHttpClient::new()?;
/// let response = client.get_stream("https://example.com/events", &Headers::new()).await?;
/// println!("Status: {}", response.status);
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    max_redirects: usize,
}

impl ReqwestHttpClient {
    /// Create a new ReqwestHttpClient with default settings.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_max_redirects(DEFAULT_MAX_REDIRECTS)
    }

    /// Create a client that follows at most `max_redirects` hops.
    pub fn with_max_redirects(max_redirects: usize) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(Self::convert_error)?;
        Ok(Self {
            client,
            max_redirects,
        })
    }

    /// Create a new ReqwestHttpClient with a custom reqwest::Client.
    ///
    /// The client should be built with `redirect::Policy::none()`; otherwise
    /// reqwest follows redirects itself under its own header rules.
    pub fn with_client(client: reqwest::Client, max_redirects: usize) -> Self {
        Self {
            client,
            max_redirects,
        }
    }

    /// Get a reference to the underlying reqwest::Client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    /// Redirect hops followed before a request fails.
    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    /// Convert reqwest error to HttpError.
    fn convert_error(err: reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout(err.to_string())
        } else if err.is_connect() {
            HttpError::ConnectionFailed(err.to_string())
        } else if err.is_builder() {
            HttpError::InvalidUrl(err.to_string())
        } else {
            HttpError::Other(err.to_string())
        }
    }

    /// Convert a body read error to HttpError.
    fn convert_body_error(err: reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout(err.to_string())
        } else {
            HttpError::Io(err.to_string())
        }
    }

    /// Convert reqwest headers to our Headers type.
    fn convert_headers(headers: &reqwest::header::HeaderMap) -> Headers {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    /// Apply headers to a request builder.
    fn apply_headers(
        builder: reqwest::RequestBuilder,
        headers: &Headers,
    ) -> reqwest::RequestBuilder {
        let mut builder = builder;
        for (key, value) in headers {
            builder = builder.header(key, value);
        }
        builder
    }

    /// Resolve the target of a redirect response, if it is one we follow.
    fn redirect_target(response: &reqwest::Response) -> Result<Option<Url>, HttpError> {
        if !REDIRECT_STATUSES.contains(&response.status().as_u16()) {
            return Ok(None);
        }

        let Some(location) = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
        else {
            return Ok(None);
        };

        response
            .url()
            .join(location)
            .map(Some)
            .map_err(|e| HttpError::InvalidUrl(format!("{}: {}", location, e)))
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get_stream(
        &self,
        url: &str,
        headers: &Headers,
    ) -> Result<StreamingResponse, HttpError> {
        let mut current = Url::parse(url).map_err(|e| HttpError::InvalidUrl(e.to_string()))?;
        let mut hops = 0;

        loop {
            let builder = self.client.get(current.clone());
            let builder = Self::apply_headers(builder, headers);

            let response = builder.send().await.map_err(Self::convert_error)?;

            if let Some(next) = Self::redirect_target(&response)? {
                if hops >= self.max_redirects {
                    return Err(HttpError::TooManyRedirects(self.max_redirects));
                }
                hops += 1;
                debug!(
                    "Following {} redirect to {}",
                    response.status().as_u16(),
                    next
                );
                current = next;
                continue;
            }

            let status = response.status().as_u16();
            let response_headers = Self::convert_headers(response.headers());
            let body: ByteStream = Box::pin(
                response
                    .bytes_stream()
                    .map(|result| result.map_err(Self::convert_body_error)),
            );

            return Ok(StreamingResponse::with_headers(status, response_headers, body));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reqwest_http_client_new() {
        let client = ReqwestHttpClient::new().unwrap();
        assert_eq!(client.max_redirects(), DEFAULT_MAX_REDIRECTS);
        let _inner = client.inner();
    }

    #[test]
    fn test_reqwest_http_client_clone() {
        let client = ReqwestHttpClient::with_max_redirects(3).unwrap();
        let cloned = client.clone();
        assert_eq!(cloned.max_redirects(), 3);
    }

    #[test]
    fn test_reqwest_http_client_with_custom_client() {
        let custom = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap();
        let client = ReqwestHttpClient::with_client(custom, 1);
        assert_eq!(client.max_redirects(), 1);
    }

    #[test]
    fn test_convert_headers() {
        let mut header_map = reqwest::header::HeaderMap::new();
        header_map.insert(
            reqwest::header::CONTENT_TYPE,
            "text/event-stream".parse().unwrap(),
        );
        header_map.insert(reqwest::header::CACHE_CONTROL, "no-cache".parse().unwrap());

        let headers = ReqwestHttpClient::convert_headers(&header_map);
        assert_eq!(
            headers.get("content-type"),
            Some(&"text/event-stream".to_string())
        );
        assert_eq!(headers.get("cache-control"), Some(&"no-cache".to_string()));
    }

    #[tokio::test]
    async fn test_get_stream_invalid_url() {
        let client = ReqwestHttpClient::new().unwrap();
        let result = client.get_stream("not-a-valid-url", &Headers::new()).await;
        assert!(matches!(result, Err(HttpError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_get_stream_connection_refused() {
        let client = ReqwestHttpClient::new().unwrap();
        // Use a port that's unlikely to be in use
        let result = client
            .get_stream("http://127.0.0.1:59999/events", &Headers::new())
            .await;
        assert!(matches!(
            result,
            Err(HttpError::ConnectionFailed(_)) | Err(HttpError::Other(_))
        ));
    }
}
