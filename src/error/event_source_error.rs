//! Setup errors for the event source.
//!
//! Failures while building an event source (bad URL, bad headers, unreadable
//! persistence). Errors that end a running stream are [`StreamError`]s and go
//! through the completion callback instead.
//!
//! [`StreamError`]: super::StreamError

use thiserror::Error;

use super::category::ErrorCategory;
use super::stream::StreamError;
use crate::traits::StoreError;

/// Error raised by fallible event source operations.
#[derive(Debug, Error)]
pub enum EventSourceError {
    /// The stream URL could not be parsed.
    #[error("Invalid stream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The stream URL uses a scheme other than http or https.
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// A caller-supplied header name or value is not valid HTTP.
    #[error("Invalid header '{name}'")]
    InvalidHeader { name: String },

    /// The last-event-id store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stream ended with an error.
    #[error(transparent)]
    Stream(#[from] StreamError),
}

impl EventSourceError {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            EventSourceError::InvalidUrl(_)
            | EventSourceError::UnsupportedScheme(_)
            | EventSourceError::InvalidHeader { .. } => ErrorCategory::Configuration,
            EventSourceError::Store(_) => ErrorCategory::System,
            EventSourceError::Stream(err) => err.category(),
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            EventSourceError::Stream(err) => err.is_retryable(),
            _ => false,
        }
    }
}

/// Type alias for Results using [`EventSourceError`].
pub type EventSourceResult<T> = Result<T, EventSourceError>;
