//! Trait abstractions for dependency injection and testability.
//!
//! The event source talks to the outside world through these traits, so the
//! transport and the persistence layer can be swapped for test doubles.
//!
//! # Traits
//!
//! - [`HttpClient`] - Streaming GET requests
//! - [`LastEventIdStore`] - Last-event-id persistence

pub mod http;
pub mod store;

pub use http::{ByteStream, Headers, HttpClient, HttpError, StreamingResponse};
pub use store::{LastEventIdStore, StoreError};
