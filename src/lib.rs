//! eventsource - a Server-Sent Events client
//!
//! The crate turns a chunked HTTP response body into discrete events and
//! keeps the subscription alive across connection lifetimes.
//!
//! - [`sse`] - incremental stream parsing, no I/O
//! - [`event_source`] - connection lifecycle, reconnection and dispatch
//! - [`traits`] - transport and persistence seams
//! - [`adapters`] - reqwest transport, file store and test doubles

pub mod adapters;
pub mod config;
pub mod error;
pub mod event_source;
pub mod prelude;
pub mod sse;
pub mod traits;

pub use config::{EventSourceConfig, DEFAULT_MAX_REDIRECTS, DEFAULT_RETRY_TIME_MS};
pub use error::{ErrorCategory, EventSourceError, EventSourceResult, StreamError};
pub use event_source::{Completion, EventSource, ReadyState, TargetKey};
pub use sse::{Event, StreamParser};
