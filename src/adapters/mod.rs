//! Concrete implementations of trait abstractions.
//!
//! This module provides production-ready adapters that implement the traits
//! defined in `crate::traits`.
//!
//! # Adapters
//!
//! - [`ReqwestHttpClient`] - Streaming HTTP client using reqwest
//! - [`FileLastEventIdStore`] - File-based last-event-id storage
//!
//! # Mock Implementations
//!
//! The [`mock`] submodule provides test doubles for all adapters:
//! - [`mock::MockHttpClient`] - Scripted streaming responses
//! - [`mock::InMemoryLastEventIdStore`] - In-memory last-event-id storage

pub mod file_store;
pub mod mock;
pub mod reqwest_http;

pub use file_store::FileLastEventIdStore;
pub use mock::{InMemoryLastEventIdStore, MockHttpClient, MockResponse};
pub use reqwest_http::ReqwestHttpClient;
