//! Callback slots and the named-listener map.
//!
//! Callbacks are cloned out of the registry before they run, so a callback
//! may register or remove other callbacks without deadlocking.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::StreamError;

/// Name under which unnamed events are dispatched.
pub const MESSAGE_EVENT: &str = "message";

/// Invoked when a connection opens.
pub type OpenCallback = Arc<dyn Fn() + Send + Sync>;

/// Invoked with `(last_event_id, event_name, data)` for a dispatched event.
pub type MessageCallback = Arc<dyn Fn(Option<&str>, &str, Option<&str>) + Send + Sync>;

/// Invoked with `(status, should_retry, error)` when a connection ends.
pub type CompleteCallback =
    Arc<dyn Fn(Option<u16>, Option<bool>, Option<&StreamError>) + Send + Sync>;

/// How a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Response status, when a response was received
    pub status: Option<u16>,
    /// Whether a reconnection was scheduled, when a response was received
    pub should_retry: Option<bool>,
    /// Why the stream failed, if it did
    pub error: Option<StreamError>,
}

/// Registered callbacks of one event source.
#[derive(Default)]
pub(crate) struct Callbacks {
    on_open: Option<OpenCallback>,
    on_message: Option<MessageCallback>,
    on_complete: Option<CompleteCallback>,
    listeners: HashMap<String, MessageCallback>,
    /// A completion that happened before any completion callback existed.
    pending_completion: Option<Completion>,
}

impl Callbacks {
    pub fn set_on_open(&mut self, callback: OpenCallback) {
        self.on_open = Some(callback);
    }

    pub fn set_on_message(&mut self, callback: MessageCallback) {
        self.on_message = Some(callback);
    }

    /// Install the completion callback, returning a completion that arrived
    /// before it so the caller can deliver it.
    pub fn set_on_complete(&mut self, callback: CompleteCallback) -> Option<Completion> {
        self.on_complete = Some(callback);
        self.pending_completion.take()
    }

    pub fn add_listener(&mut self, name: String, callback: MessageCallback) {
        self.listeners.insert(name, callback);
    }

    pub fn remove_listener(&mut self, name: &str) -> bool {
        self.listeners.remove(name).is_some()
    }

    /// Registered listener names, sorted.
    pub fn listener_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.listeners.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn open_callback(&self) -> Option<OpenCallback> {
        self.on_open.clone()
    }

    /// Resolve the callbacks an event with `event_name` is delivered to,
    /// paired with the name each one receives.
    ///
    /// Unnamed and `"message"` events go to the message callback. Named
    /// events go to the listener of that name. An event named `"message"`
    /// reaches both when a `"message"` listener exists.
    pub fn message_targets(&self, event_name: Option<&str>) -> Vec<(MessageCallback, String)> {
        let mut targets = Vec::new();

        if matches!(event_name, None | Some(MESSAGE_EVENT)) {
            if let Some(callback) = &self.on_message {
                targets.push((callback.clone(), MESSAGE_EVENT.to_string()));
            }
        }

        if let Some(name) = event_name {
            if let Some(listener) = self.listeners.get(name) {
                targets.push((listener.clone(), name.to_string()));
            }
        }

        targets
    }

    /// Take the completion callback for `completion`, or park the
    /// completion until one is registered.
    pub fn complete_callback(&mut self, completion: &Completion) -> Option<CompleteCallback> {
        match &self.on_complete {
            Some(callback) => Some(callback.clone()),
            None => {
                self.pending_completion = Some(completion.clone());
                None
            }
        }
    }
}
