//! Error handling for the event source.
//!
//! - **Error Categories**: High-level classification for handling decisions
//! - **Stream Errors**: Why a running stream ended, handed to the completion
//!   callback
//! - **Setup Errors**: `EventSourceError` for fallible construction
//! - **Result Type Alias**: `EventSourceResult<T>`
//!
//! Decode problems (invalid UTF-8 in a block, malformed `retry` values) are
//! not errors at all: they are skipped silently and never reach the caller.
//!
//! | Category | Description | Retryable |
//! |----------|-------------|-----------|
//! | Network | Connection, DNS, timeout | Yes |
//! | Server | HTTP 5xx | Yes |
//! | Client | HTTP 4xx | No |
//! | System | Persistence failures | No |
//! | Configuration | Invalid URL or headers | No |

mod category;
mod event_source_error;
mod stream;

pub use category::ErrorCategory;
pub use event_source_error::{EventSourceError, EventSourceResult};
pub use stream::StreamError;
