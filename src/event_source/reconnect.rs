//! Reconnection policy.
//!
//! A finished connection is re-established only when the server accepted the
//! request with a non-terminal success status and nothing asked the stream
//! to stop.

use crate::traits::HttpError;

/// Status with which the server ends the stream for good.
pub const NO_CONTENT: u16 = 204;

/// Whether a finished connection should be re-established.
///
/// Statuses 201 through 299 other than 204 qualify. Everything else ends the
/// stream: no status at all (the request never got a response), 200,
/// redirects that were not followed, and every error status.
pub fn should_reconnect(status: Option<u16>, error: Option<&HttpError>) -> bool {
    let Some(status) = status else {
        return false;
    };

    if error.is_some_and(HttpError::is_cancellation) {
        return false;
    }

    (201..=299).contains(&status) && status != NO_CONTENT
}

/// Whether `status` is an HTTP error that must be surfaced as such.
pub fn is_error_status(status: u16) -> bool {
    status >= 400
}
