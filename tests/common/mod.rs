//! Common test utilities for integration tests.
//!
//! This module provides reusable fixtures for driving an event source against
//! a scripted transport and recording what its callbacks observed.
//!
//! # Example
//!
//! ```ignore
//! let client = MockStreamConfig::new().then_stream(200, &["data: hi\n\n"]).build();
//! let fixture = TestSourceBuilder::new().build(client).await;
//! fixture.source.connect(None);
//! settle().await;
//! assert_eq!(fixture.recorder.messages().len(), 1);
//! ```

#![allow(dead_code)]

pub mod mocks;

pub use mocks::*;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use eventsource::{EventSource, EventSourceConfig};

/// URL used by fixtures.
pub const TEST_URL: &str = "http://localhost:8080/events";

/// One callback invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Open,
    Message {
        id: Option<String>,
        name: String,
        data: Option<String>,
    },
    Complete {
        status: Option<u16>,
        should_retry: Option<bool>,
        error: Option<String>,
    },
}

impl Recorded {
    /// Shorthand for an expected message.
    pub fn message(id: Option<&str>, name: &str, data: Option<&str>) -> Self {
        Recorded::Message {
            id: id.map(str::to_string),
            name: name.to_string(),
            data: data.map(str::to_string),
        }
    }
}

/// Collects callback invocations in order.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Vec<Recorded>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register open, message and completion callbacks on `source`.
    pub fn attach(&self, source: &EventSource) {
        let log = self.log.clone();
        source.on_open(move || log.lock().unwrap().push(Recorded::Open));

        source.on_message(self.listener());

        let log = self.log.clone();
        source.on_complete(move |status, should_retry, error| {
            log.lock().unwrap().push(Recorded::Complete {
                status,
                should_retry,
                error: error.map(|e| e.to_string()),
            });
        });
    }

    /// A message callback that records into this recorder.
    pub fn listener(&self) -> impl Fn(Option<&str>, &str, Option<&str>) + Send + Sync + 'static {
        let log = self.log.clone();
        move |id, name, data| {
            log.lock().unwrap().push(Recorded::message(id, name, data));
        }
    }

    /// Everything recorded so far.
    pub fn all(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    /// Recorded messages only.
    pub fn messages(&self) -> Vec<Recorded> {
        self.all()
            .into_iter()
            .filter(|r| matches!(r, Recorded::Message { .. }))
            .collect()
    }

    /// Recorded completions only.
    pub fn completions(&self) -> Vec<Recorded> {
        self.all()
            .into_iter()
            .filter(|r| matches!(r, Recorded::Complete { .. }))
            .collect()
    }

    pub fn open_count(&self) -> usize {
        self.all().iter().filter(|r| **r == Recorded::Open).count()
    }
}

/// An event source wired to mocks, with handles to inspect them.
pub struct TestSource {
    pub source: EventSource,
    pub client: MockHttpClient,
    pub store: InMemoryLastEventIdStore,
    pub recorder: Recorder,
}

/// Builder for test event sources.
pub struct TestSourceBuilder {
    url: String,
    retry_time: Option<Duration>,
    headers: Vec<(String, String)>,
    store: InMemoryLastEventIdStore,
    reset_last_event_id: bool,
}

impl TestSourceBuilder {
    pub fn new() -> Self {
        Self {
            url: TEST_URL.to_string(),
            retry_time: None,
            headers: Vec::new(),
            store: InMemoryLastEventIdStore::new(),
            reset_last_event_id: false,
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn with_retry_time(mut self, retry_time: Duration) -> Self {
        self.retry_time = Some(retry_time);
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Share a store with other fixtures.
    pub fn with_store(mut self, store: InMemoryLastEventIdStore) -> Self {
        self.store = store;
        self
    }

    pub fn with_reset_last_event_id(mut self) -> Self {
        self.reset_last_event_id = true;
        self
    }

    /// Build the event source with a recorder already attached.
    pub async fn build(self, client: MockHttpClient) -> TestSource {
        let mut config = EventSourceConfig::new(&self.url)
            .unwrap()
            .with_reset_last_event_id(self.reset_last_event_id);
        if let Some(retry_time) = self.retry_time {
            config = config.with_retry_time(retry_time);
        }
        for (name, value) in self.headers {
            config = config.with_header(name, value);
        }

        let source = EventSource::new(
            config,
            Arc::new(client.clone()),
            Arc::new(self.store.clone()),
        )
        .await
        .unwrap();

        let recorder = Recorder::new();
        recorder.attach(&source);

        TestSource {
            source,
            client,
            store: self.store,
            recorder,
        }
    }
}

impl Default for TestSourceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Let spawned tasks run until they block, without moving a paused clock.
pub async fn settle() {
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }
}
