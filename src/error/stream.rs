//! Stream termination error types.
//!
//! This module defines the errors handed to the completion callback when a
//! connection ends for a reason other than a clean close.

use std::fmt;

use super::category::ErrorCategory;
use crate::traits::HttpError;

/// Why a stream ended with an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The server answered with an HTTP error status (4xx/5xx).
    HttpStatus {
        status: u16,
    },

    /// The transport failed (connect, read, timeout, cancellation).
    Transport(HttpError),
}

impl StreamError {
    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            StreamError::HttpStatus { status } => Some(*status),
            StreamError::Transport(_) => None,
        }
    }

    /// Whether the stream was cancelled rather than failed.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StreamError::Transport(err) if err.is_cancellation())
    }

    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            StreamError::HttpStatus { status } if *status >= 500 => ErrorCategory::Server,
            StreamError::HttpStatus { .. } => ErrorCategory::Client,
            StreamError::Transport(HttpError::InvalidUrl(_)) => ErrorCategory::Configuration,
            StreamError::Transport(_) => ErrorCategory::Network,
        }
    }

    /// Check if this error is likely transient and can be retried by the caller.
    pub fn is_retryable(&self) -> bool {
        !self.is_cancellation() && self.category().is_retryable()
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            StreamError::HttpStatus { status } if *status >= 500 => {
                format!("The server failed with status {}. Please try again later.", status)
            }
            StreamError::HttpStatus { status } => {
                format!("The server rejected the stream request (status {}).", status)
            }
            StreamError::Transport(HttpError::Cancelled) => {
                "The stream was cancelled.".to_string()
            }
            StreamError::Transport(HttpError::Timeout(_)) => {
                "The stream timed out. The connection may have been lost.".to_string()
            }
            StreamError::Transport(_) => {
                "Connection to the server was lost.".to_string()
            }
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            StreamError::HttpStatus { .. } => "E_STREAM_STATUS",
            StreamError::Transport(HttpError::Cancelled) => "E_STREAM_CANCELLED",
            StreamError::Transport(HttpError::Timeout(_)) => "E_STREAM_TIMEOUT",
            StreamError::Transport(_) => "E_STREAM_TRANSPORT",
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::HttpStatus { status } => write!(f, "HTTP Status Code: {}", status),
            StreamError::Transport(err) => write!(f, "Stream transport error: {}", err),
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StreamError::HttpStatus { .. } => None,
            StreamError::Transport(err) => Some(err),
        }
    }
}

impl From<HttpError> for StreamError {
    fn from(err: HttpError) -> Self {
        StreamError::Transport(err)
    }
}
