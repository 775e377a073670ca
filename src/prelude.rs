//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```ignore
//! use eventsource::prelude::*;
//! ```
//!
//! This will import:
//! - The event source and its configuration
//! - Parser types (Event, StreamParser)
//! - Error types
//! - Transport and store traits with their default adapters

pub use crate::config::EventSourceConfig;
pub use crate::event_source::{EventSource, ReadyState};

pub use crate::sse::{Event, StreamParser};

pub use crate::error::{EventSourceError, EventSourceResult, StreamError};

pub use crate::adapters::{FileLastEventIdStore, ReqwestHttpClient};
pub use crate::traits::{Headers, HttpClient, HttpError, LastEventIdStore, StoreError};
