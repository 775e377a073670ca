//! Event source: a reconnecting Server-Sent Events subscription.
//!
//! An [`EventSource`] issues a streaming GET through an injected
//! [`HttpClient`], feeds the body through a fresh parser per attempt and
//! dispatches the resulting events to registered callbacks. Whether and when
//! a finished attempt is followed by another is decided by the reconnection
//! policy in [`reconnect`].
//!
//! All callbacks of one event source run on its connection task, one at a
//! time, in the order events completed parsing. Each event's id is recorded
//! and persisted right before that event is dispatched.

pub mod callbacks;
pub mod reconnect;
pub mod state;
pub mod target;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::adapters::{FileLastEventIdStore, ReqwestHttpClient};
use crate::config::EventSourceConfig;
use crate::error::{EventSourceResult, StreamError};
use crate::traits::{Headers, HttpClient, HttpError, LastEventIdStore};

pub use callbacks::{CompleteCallback, Completion, MessageCallback, OpenCallback, MESSAGE_EVENT};
pub use state::ReadyState;
pub use target::TargetKey;

use callbacks::Callbacks;
use state::{AppliedEvent, ConnectionState, Finished, HeadersOutcome, MessageDispatch};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the handle and its connection task.
struct Shared {
    config: EventSourceConfig,
    target: TargetKey,
    client: Arc<dyn HttpClient>,
    store: Arc<dyn LastEventIdStore>,
    store_key: String,
    state: Mutex<ConnectionState>,
    callbacks: Mutex<Callbacks>,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        lock(&self.state).is_current(generation)
    }

    fn request_headers(&self) -> Headers {
        lock(&self.state).request_headers(&self.config.headers)
    }

    fn headers_received(&self, generation: u64, status: u16) -> HeadersOutcome {
        let outcome = lock(&self.state).headers_received(generation, status);

        if outcome == HeadersOutcome::Open {
            let callback = lock(&self.callbacks).open_callback();
            if let Some(callback) = callback {
                if self.is_current(generation) {
                    callback();
                }
            }
        }

        outcome
    }

    async fn bytes_received(&self, generation: u64, bytes: &[u8]) {
        let events = lock(&self.state).parse(generation, bytes);

        for event in events {
            let applied = lock(&self.state).apply_event(generation, event);
            let Some(AppliedEvent { persist, dispatch }) = applied else {
                return;
            };

            if let Some(id) = persist {
                self.persist(&id).await;
            }
            if let Some(dispatch) = dispatch {
                self.dispatch_message(generation, dispatch);
            }
        }
    }

    async fn persist(&self, id: &str) {
        if let Err(e) = self.store.save(&self.store_key, id).await {
            warn!("Failed to persist last event id for {}: {}", self.target, e);
        }
    }

    fn dispatch_message(&self, generation: u64, dispatch: MessageDispatch) {
        let targets = lock(&self.callbacks).message_targets(dispatch.event_name.as_deref());

        for (callback, name) in targets {
            if !self.is_current(generation) {
                return;
            }
            callback(
                dispatch.last_event_id.as_deref(),
                &name,
                dispatch.data.as_deref(),
            );
        }
    }

    /// Finish the current attempt and return the reconnection delay, if any.
    fn completed(&self, generation: u64, error: Option<HttpError>) -> Option<Duration> {
        let Finished {
            completion,
            reconnect_after,
        } = lock(&self.state).completed(generation, error)?;

        let callback = lock(&self.callbacks).complete_callback(&completion);
        if let Some(callback) = callback {
            if self.is_current(generation) {
                deliver_completion(&callback, &completion);
            }
        }

        reconnect_after
    }
}

fn deliver_completion(callback: &CompleteCallback, completion: &Completion) {
    callback(
        completion.status,
        completion.should_retry,
        completion.error.as_ref(),
    );
}

/// Drive one generation: request, stream, and reconnect until the policy
/// says stop or the generation is superseded.
async fn run_connection(shared: Arc<Shared>, generation: u64, resume_from: Option<String>) {
    if let Some(id) = resume_from {
        shared.persist(&id).await;
    }

    loop {
        let headers = shared.request_headers();
        debug!(
            "Requesting {} (generation {}, resuming: {})",
            shared.config.url,
            generation,
            headers.contains_key(state::LAST_EVENT_ID)
        );

        let result = shared
            .client
            .get_stream(shared.config.url.as_str(), &headers)
            .await;

        let reconnect_after = match result {
            Err(err) => shared.completed(generation, Some(err)),
            Ok(response) => {
                match shared.headers_received(generation, response.status) {
                    HeadersOutcome::Open => {}
                    HeadersOutcome::Closed | HeadersOutcome::Stale => return,
                }

                let mut body = response.body;
                let mut error = None;
                while let Some(chunk) = body.next().await {
                    match chunk {
                        Ok(bytes) => shared.bytes_received(generation, &bytes).await,
                        Err(err) => {
                            error = Some(err);
                            break;
                        }
                    }
                }

                shared.completed(generation, error)
            }
        };

        let Some(delay) = reconnect_after else {
            return;
        };

        info!("Reconnecting to {} in {:?}", shared.target, delay);
        tokio::time::sleep(delay).await;

        if !lock(&shared.state).restart(generation) {
            return;
        }
    }
}

/// A Server-Sent Events subscription to one URL.
///
/// Construction performs no I/O beyond restoring the persisted last event
/// id. [`connect`](Self::connect) must be called from within a Tokio
/// runtime; the connection runs on a spawned task that is aborted by
/// [`disconnect`](Self::disconnect) or when the event source is dropped.
///
/// # Example
///
/// ```ignore
/// use eventsource::{EventSource, EventSourceConfig};
///
/// let config = EventSourceConfig::new("https://example.com/events")?;
/// let source = EventSource::with_defaults(config).await?;
///
/// source.on_message(|id, _name, data| {
///     println!("{:?}: {:?}", id, data);
/// });
/// source.add_event_listener("update", |_id, name, data| {
///     println!("{} -> {:?}", name, data);
/// });
/// source.connect(None);
/// ```
pub struct EventSource {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl EventSource {
    /// Create an event source with an explicit transport and id store.
    ///
    /// Restores the persisted last event id of the target, or forgets it
    /// when the config asks for a reset.
    pub async fn new(
        config: EventSourceConfig,
        client: Arc<dyn HttpClient>,
        store: Arc<dyn LastEventIdStore>,
    ) -> EventSourceResult<Self> {
        config.validate()?;

        let target = TargetKey::from_url(&config.url);
        let store_key = target.store_key();
        let last_event_id = restore_last_event_id(
            store.as_ref(),
            &store_key,
            &target,
            config.reset_last_event_id,
        )
        .await;
        let state = ConnectionState::new(config.retry_time, last_event_id);

        debug!("Created event source for {}", target);

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                target,
                client,
                store,
                store_key,
                state: Mutex::new(state),
                callbacks: Mutex::new(Callbacks::default()),
            }),
            task: Mutex::new(None),
        })
    }

    /// Create an event source using reqwest and the file-based id store.
    pub async fn with_defaults(config: EventSourceConfig) -> EventSourceResult<Self> {
        let client = ReqwestHttpClient::with_max_redirects(config.max_redirects)
            .map_err(StreamError::Transport)?;
        let store = FileLastEventIdStore::new()?;
        Self::new(config, Arc::new(client), Arc::new(store)).await
    }

    /// Open the stream, replacing any connection already running.
    ///
    /// An explicit `last_event_id` replaces the known one and is persisted
    /// by the connection task before its first request.
    pub fn connect(&self, last_event_id: Option<String>) {
        let (generation, resume_from) = {
            let mut state = lock(&self.shared.state);
            let resume_from = last_event_id.filter(|id| state.set_last_event_id(id));
            (state.start(), resume_from)
        };
        info!("Connecting to {} (generation {})", self.shared.target, generation);

        let handle = tokio::spawn(run_connection(
            self.shared.clone(),
            generation,
            resume_from,
        ));
        if let Some(previous) = lock(&self.task).replace(handle) {
            previous.abort();
        }
    }

    /// Close the stream and cancel any scheduled reconnection.
    ///
    /// Once this returns no further callback starts for the closed
    /// connection. A callback already running on another thread may still
    /// complete.
    pub fn disconnect(&self) {
        lock(&self.shared.state).stop();
        if let Some(task) = lock(&self.task).take() {
            info!("Disconnecting from {}", self.shared.target);
            task.abort();
        }
    }

    /// Set the callback invoked when a connection opens.
    pub fn on_open<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        lock(&self.shared.callbacks).set_on_open(Arc::new(callback));
    }

    /// Set the callback for unnamed events and events named `"message"`.
    pub fn on_message<F>(&self, callback: F)
    where
        F: Fn(Option<&str>, &str, Option<&str>) + Send + Sync + 'static,
    {
        lock(&self.shared.callbacks).set_on_message(Arc::new(callback));
    }

    /// Set the callback invoked when a connection ends.
    ///
    /// If a connection already ended before any completion callback was
    /// set, the new callback is invoked immediately with that completion.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: Fn(Option<u16>, Option<bool>, Option<&StreamError>) + Send + Sync + 'static,
    {
        let callback: CompleteCallback = Arc::new(callback);
        let pending = lock(&self.shared.callbacks).set_on_complete(callback.clone());
        if let Some(completion) = pending {
            deliver_completion(&callback, &completion);
        }
    }

    /// Register the listener for events named `name`, replacing any previous one.
    pub fn add_event_listener<F>(&self, name: impl Into<String>, callback: F)
    where
        F: Fn(Option<&str>, &str, Option<&str>) + Send + Sync + 'static,
    {
        lock(&self.shared.callbacks).add_listener(name.into(), Arc::new(callback));
    }

    /// Remove the listener for `name`. Returns whether one was registered.
    pub fn remove_event_listener(&self, name: &str) -> bool {
        lock(&self.shared.callbacks).remove_listener(name)
    }

    /// Names with a registered listener, sorted.
    pub fn events(&self) -> Vec<String> {
        lock(&self.shared.callbacks).listener_names()
    }

    /// The stream URL.
    pub fn url(&self) -> &Url {
        &self.shared.config.url
    }

    /// The caller headers sent with every request.
    pub fn headers(&self) -> &Headers {
        &self.shared.config.headers
    }

    /// The persistence identity of the stream target.
    pub fn target(&self) -> &TargetKey {
        &self.shared.target
    }

    /// Whether the stream is closed, connecting or open.
    pub fn ready_state(&self) -> ReadyState {
        lock(&self.shared.state).ready_state()
    }

    /// The current reconnection delay.
    pub fn retry_time(&self) -> Duration {
        lock(&self.shared.state).retry_time()
    }

    /// The most recent event id, sent as `Last-Event-Id` on reconnection.
    pub fn last_event_id(&self) -> Option<String> {
        lock(&self.shared.state).last_event_id().map(str::to_string)
    }
}

async fn restore_last_event_id(
    store: &dyn LastEventIdStore,
    key: &str,
    target: &TargetKey,
    reset: bool,
) -> Option<String> {
    if reset {
        if let Err(e) = store.remove(key).await {
            warn!("Failed to reset last event id for {}: {}", target, e);
        }
        return None;
    }

    match store.load(key).await {
        Ok(Some(id)) => {
            debug!("Restored last event id {:?} for {}", id, target);
            Some(id)
        }
        Ok(None) => None,
        Err(e) => {
            warn!("Failed to restore last event id for {}: {}", target, e);
            None
        }
    }
}

impl Drop for EventSource {
    fn drop(&mut self) {
        self.disconnect();
    }
}
