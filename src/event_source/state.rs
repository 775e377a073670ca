//! Connection state machine.
//!
//! [`ConnectionState`] holds everything that outlives a single HTTP attempt:
//! ready state, last event id, retry interval and the parser of the attempt
//! in flight. It performs no I/O and runs no callbacks; every transition
//! returns what should be persisted or dispatched and the caller does it.
//!
//! Each `connect` and `disconnect` starts a new generation. Transport
//! notifications carry the generation they were issued under and are
//! ignored once it is no longer current.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::callbacks::Completion;
use super::reconnect::{is_error_status, should_reconnect, NO_CONTENT};
use crate::error::StreamError;
use crate::sse::{Event, StreamParser};
use crate::traits::{Headers, HttpError};

pub(crate) const ACCEPT: &str = "Accept";
pub(crate) const CACHE_CONTROL: &str = "Cache-Control";
pub(crate) const LAST_EVENT_ID: &str = "Last-Event-Id";

/// Lifecycle state of an event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyState {
    /// No connection, and none scheduled to open right now.
    #[default]
    Closed,
    /// A request was issued and no response has arrived yet.
    Connecting,
    /// Response headers arrived and the body is streaming.
    Open,
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadyState::Closed => write!(f, "closed"),
            ReadyState::Connecting => write!(f, "connecting"),
            ReadyState::Open => write!(f, "open"),
        }
    }
}

/// What the response headers mean for the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeadersOutcome {
    /// The attempt was superseded by `connect` or `disconnect`.
    Stale,
    /// The server closed the stream for good with 204.
    Closed,
    /// The stream is open.
    Open,
}

/// An event ready for delivery to message callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MessageDispatch {
    pub last_event_id: Option<String>,
    pub event_name: Option<String>,
    pub data: Option<String>,
}

/// Effect of one parsed event on the connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct AppliedEvent {
    /// New last event id that must be persisted before dispatching.
    pub persist: Option<String>,
    /// Message to deliver, absent for retry-only events.
    pub dispatch: Option<MessageDispatch>,
}

/// Result of a finished attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Finished {
    pub completion: Completion,
    /// Delay before the next attempt, if one should be made.
    pub reconnect_after: Option<Duration>,
}

pub(crate) struct ConnectionState {
    ready_state: ReadyState,
    generation: u64,
    /// Whether the current attempt still owes a completion.
    in_flight: bool,
    /// Status of the current attempt's response.
    status: Option<u16>,
    parser: StreamParser,
    last_event_id: Option<String>,
    retry_time: Duration,
}

impl ConnectionState {
    /// Create a closed state resuming from `last_event_id`.
    pub fn new(retry_time: Duration, last_event_id: Option<String>) -> Self {
        Self {
            ready_state: ReadyState::Closed,
            generation: 0,
            in_flight: false,
            status: None,
            parser: StreamParser::new(),
            last_event_id,
            retry_time,
        }
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    pub fn retry_time(&self) -> Duration {
        self.retry_time
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Replace the known last event id. Returns whether it changed.
    pub fn set_last_event_id(&mut self, id: &str) -> bool {
        if self.last_event_id.as_deref() == Some(id) {
            return false;
        }
        self.last_event_id = Some(id.to_string());
        true
    }

    /// Begin a new generation and its first attempt.
    pub fn start(&mut self) -> u64 {
        self.generation += 1;
        self.begin_attempt();
        self.generation
    }

    /// Begin the next attempt of `generation` after a reconnection delay.
    ///
    /// Returns false if the generation was superseded meanwhile.
    pub fn restart(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.begin_attempt();
        true
    }

    /// End the current generation. Nothing issued under it has any further
    /// effect.
    pub fn stop(&mut self) {
        self.generation += 1;
        self.in_flight = false;
        self.status = None;
        self.parser.reset();
        self.ready_state = ReadyState::Closed;
    }

    fn begin_attempt(&mut self) {
        self.parser = StreamParser::new();
        self.in_flight = true;
        self.status = None;
        self.ready_state = ReadyState::Connecting;
    }

    /// Headers for the next request: the caller's headers, the stream
    /// negotiation headers and the resumption id when one is known.
    pub fn request_headers(&self, caller: &Headers) -> Headers {
        let resume_id = self.last_event_id.as_deref().filter(|id| !id.is_empty());

        let mut headers: Headers = caller
            .iter()
            .filter(|(name, _)| {
                !name.eq_ignore_ascii_case(ACCEPT)
                    && !name.eq_ignore_ascii_case(CACHE_CONTROL)
                    && !(resume_id.is_some() && name.eq_ignore_ascii_case(LAST_EVENT_ID))
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        headers.insert(ACCEPT.to_string(), "text/event-stream".to_string());
        headers.insert(CACHE_CONTROL.to_string(), "no-cache".to_string());
        if let Some(id) = resume_id {
            headers.insert(LAST_EVENT_ID.to_string(), id.to_string());
        }

        headers
    }

    /// Apply the response status of the current attempt.
    pub fn headers_received(&mut self, generation: u64, status: u16) -> HeadersOutcome {
        if !self.is_current(generation) || !self.in_flight {
            return HeadersOutcome::Stale;
        }

        self.status = Some(status);

        if status == NO_CONTENT {
            info!("Server closed the stream with 204");
            self.in_flight = false;
            self.parser.reset();
            self.ready_state = ReadyState::Closed;
            return HeadersOutcome::Closed;
        }

        debug!("Stream open with status {}", status);
        self.ready_state = ReadyState::Open;
        HeadersOutcome::Open
    }

    /// Feed body bytes of the current attempt through the parser.
    ///
    /// The returned events have not been applied yet; each one goes through
    /// [`apply_event`](Self::apply_event) right before it is dispatched.
    pub fn parse(&mut self, generation: u64, bytes: &[u8]) -> Vec<Event> {
        if !self.is_current(generation) || self.ready_state != ReadyState::Open {
            return Vec::new();
        }

        self.parser.append(bytes)
    }

    /// Take over the id and retry interval of `event`.
    ///
    /// Returns `None` once the attempt is no longer open, in which case the
    /// event and everything after it must be dropped.
    pub fn apply_event(&mut self, generation: u64, event: Event) -> Option<AppliedEvent> {
        if !self.is_current(generation) || self.ready_state != ReadyState::Open {
            return None;
        }

        let mut applied = AppliedEvent::default();

        if let Some(id) = &event.id {
            if self.set_last_event_id(id) {
                applied.persist = Some(id.clone());
            }
        }

        if let Some(millis) = event.retry_time {
            debug!("Retry time set to {}ms", millis);
            self.retry_time = Duration::from_millis(millis);
        }

        if !event.is_retry_only() {
            applied.dispatch = Some(MessageDispatch {
                last_event_id: self.last_event_id.clone(),
                event_name: event.event_name,
                data: event.data,
            });
        }

        Some(applied)
    }

    /// Finish the current attempt.
    ///
    /// Returns `None` when the attempt is stale or already finished (a 204
    /// close). Otherwise closes the state and decides on reconnection.
    pub fn completed(&mut self, generation: u64, error: Option<HttpError>) -> Option<Finished> {
        if !self.is_current(generation) || !self.in_flight {
            return None;
        }

        self.in_flight = false;
        self.ready_state = ReadyState::Closed;

        let status = self.status;
        let reconnect = should_reconnect(status, error.as_ref());

        let error = match status {
            Some(status) if is_error_status(status) => Some(StreamError::HttpStatus { status }),
            _ => error.map(StreamError::Transport),
        };

        match (&error, reconnect) {
            (Some(e), false) => warn!("Stream ended: {}", e),
            (Some(e), true) => info!("Stream interrupted: {}", e),
            (None, _) => info!("Stream ended with status {:?}", status),
        }

        Some(Finished {
            completion: Completion {
                status,
                should_retry: status.map(|_| reconnect),
                error,
            },
            reconnect_after: reconnect.then_some(self.retry_time),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ConnectionState {
        ConnectionState::new(Duration::from_millis(3000), None)
    }

    fn open(state: &mut ConnectionState, status: u16) -> u64 {
        let generation = state.start();
        assert_eq!(state.headers_received(generation, status), HeadersOutcome::Open);
        generation
    }

    /// Parse `bytes` and apply every event, as the connection task does.
    fn feed(state: &mut ConnectionState, generation: u64, bytes: &[u8]) -> Vec<AppliedEvent> {
        state
            .parse(generation, bytes)
            .into_iter()
            .map_while(|event| state.apply_event(generation, event))
            .collect()
    }

    fn dispatch_all(
        state: &mut ConnectionState,
        generation: u64,
        bytes: &[u8],
    ) -> Vec<MessageDispatch> {
        feed(state, generation, bytes)
            .into_iter()
            .filter_map(|applied| applied.dispatch)
            .collect()
    }

    #[test]
    fn test_lifecycle() {
        let mut state = state();
        assert_eq!(state.ready_state(), ReadyState::Closed);

        let generation = state.start();
        assert_eq!(state.ready_state(), ReadyState::Connecting);

        state.headers_received(generation, 200);
        assert_eq!(state.ready_state(), ReadyState::Open);

        let finished = state.completed(generation, None).unwrap();
        assert_eq!(state.ready_state(), ReadyState::Closed);
        assert_eq!(finished.completion.status, Some(200));
        assert_eq!(finished.completion.should_retry, Some(false));
        assert!(finished.completion.error.is_none());
        assert!(finished.reconnect_after.is_none());
    }

    #[test]
    fn test_204_closes_without_completion() {
        let mut state = state();
        let generation = state.start();

        assert_eq!(state.headers_received(generation, 204), HeadersOutcome::Closed);
        assert_eq!(state.ready_state(), ReadyState::Closed);
        assert!(dispatch_all(&mut state, generation, b"data: x\n\n").is_empty());
        assert!(state.completed(generation, None).is_none());
    }

    #[test]
    fn test_250_schedules_reconnect_after_retry_time() {
        let mut state = state();
        let generation = open(&mut state, 250);

        let finished = state.completed(generation, None).unwrap();
        assert_eq!(finished.reconnect_after, Some(Duration::from_millis(3000)));
        assert_eq!(finished.completion.should_retry, Some(true));

        assert!(state.restart(generation));
        assert_eq!(state.ready_state(), ReadyState::Connecting);
    }

    #[test]
    fn test_error_status_synthesizes_error() {
        let mut state = state();
        let generation = open(&mut state, 503);

        let finished = state.completed(generation, None).unwrap();
        assert_eq!(
            finished.completion.error,
            Some(StreamError::HttpStatus { status: 503 })
        );
        assert_eq!(finished.completion.should_retry, Some(false));
        assert!(finished.reconnect_after.is_none());
    }

    #[test]
    fn test_transport_failure_without_response() {
        let mut state = state();
        let generation = state.start();

        let error = HttpError::ConnectionFailed("refused".to_string());
        let finished = state.completed(generation, Some(error.clone())).unwrap();
        assert_eq!(finished.completion.status, None);
        assert_eq!(finished.completion.should_retry, None);
        assert_eq!(finished.completion.error, Some(StreamError::Transport(error)));
        assert!(finished.reconnect_after.is_none());
    }

    #[test]
    fn test_cancelled_stream_does_not_reconnect() {
        let mut state = state();
        let generation = open(&mut state, 250);

        let finished = state.completed(generation, Some(HttpError::Cancelled)).unwrap();
        assert!(finished.reconnect_after.is_none());
    }

    #[test]
    fn test_retry_only_event_updates_retry_time_without_dispatch() {
        let mut state = state();
        let generation = open(&mut state, 200);

        let dispatches = dispatch_all(&mut state, generation, b"retry: 20000\n\n");
        assert!(dispatches.is_empty());
        assert_eq!(state.retry_time(), Duration::from_millis(20000));
    }

    #[test]
    fn test_retry_time_inherited_across_attempts() {
        let mut state = state();
        let generation = open(&mut state, 250);
        dispatch_all(&mut state, generation, b"retry: 40\n\n");

        let finished = state.completed(generation, None).unwrap();
        assert_eq!(finished.reconnect_after, Some(Duration::from_millis(40)));

        state.restart(generation);
        state.headers_received(generation, 250);
        dispatch_all(&mut state, generation, b"data: no retry here\n\n");
        assert_eq!(state.retry_time(), Duration::from_millis(40));
    }

    #[test]
    fn test_dispatch_uses_latest_id() {
        let mut state = state();
        let generation = open(&mut state, 200);

        let dispatches = dispatch_all(
            &mut state,
            generation,
            b"id: 1\ndata: a\n\ndata: b\n\nid: 2\nevent: tick\ndata: c\n\n",
        );

        assert_eq!(
            dispatches,
            vec![
                MessageDispatch {
                    last_event_id: Some("1".to_string()),
                    event_name: None,
                    data: Some("a".to_string()),
                },
                MessageDispatch {
                    last_event_id: Some("1".to_string()),
                    event_name: None,
                    data: Some("b".to_string()),
                },
                MessageDispatch {
                    last_event_id: Some("2".to_string()),
                    event_name: Some("tick".to_string()),
                    data: Some("c".to_string()),
                },
            ]
        );
        assert_eq!(state.last_event_id(), Some("2"));
    }

    #[test]
    fn test_bytes_ignored_unless_open() {
        let mut state = state();
        let generation = state.start();
        assert!(dispatch_all(&mut state, generation, b"data: early\n\n").is_empty());
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let mut state = state();
        let old = open(&mut state, 250);
        let new = state.start();
        assert_ne!(old, new);

        assert!(dispatch_all(&mut state, old, b"id: 9\ndata: x\n\n").is_empty());
        assert_eq!(state.headers_received(old, 200), HeadersOutcome::Stale);
        assert!(state.completed(old, None).is_none());
        assert!(!state.restart(old));
        assert_eq!(state.ready_state(), ReadyState::Connecting);
        assert_eq!(state.last_event_id(), None);
    }

    #[test]
    fn test_stop_closes_and_suppresses() {
        let mut state = state();
        let generation = open(&mut state, 250);
        state.stop();

        assert_eq!(state.ready_state(), ReadyState::Closed);
        assert!(state.completed(generation, None).is_none());
        assert!(!state.restart(generation));
    }

    #[test]
    fn test_fresh_parser_per_attempt() {
        let mut state = state();
        let generation = open(&mut state, 250);
        dispatch_all(&mut state, generation, b"data: partial");
        state.completed(generation, None);

        state.restart(generation);
        state.headers_received(generation, 250);
        let dispatches = dispatch_all(&mut state, generation, b"data: whole\n\n");
        assert_eq!(dispatches.len(), 1);
        assert_eq!(dispatches[0].data.as_deref(), Some("whole"));
    }

    #[test]
    fn test_request_headers() {
        let mut state = state();
        let mut caller = Headers::new();
        caller.insert("Authorization".to_string(), "Bearer t".to_string());
        caller.insert("accept".to_string(), "text/html".to_string());

        let headers = state.request_headers(&caller);
        assert_eq!(headers.get("Authorization").map(String::as_str), Some("Bearer t"));
        assert_eq!(headers.get("Accept").map(String::as_str), Some("text/event-stream"));
        assert_eq!(headers.get("Cache-Control").map(String::as_str), Some("no-cache"));
        assert!(!headers.contains_key("accept"));
        assert!(!headers.contains_key("Last-Event-Id"));

        let generation = open(&mut state, 200);
        dispatch_all(&mut state, generation, b"id: 42\n\n");
        let headers = state.request_headers(&caller);
        assert_eq!(headers.get("Last-Event-Id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_empty_id_sends_no_header() {
        let mut state = state();
        let generation = open(&mut state, 200);
        dispatch_all(&mut state, generation, b"id\ndata: x\n\n");

        assert_eq!(state.last_event_id(), Some(""));
        assert!(!state.request_headers(&Headers::new()).contains_key("Last-Event-Id"));
    }

    #[test]
    fn test_new_ids_are_reported_for_persistence() {
        let mut state = state();
        let generation = open(&mut state, 200);

        let applied = feed(
            &mut state,
            generation,
            b"id: 7\ndata: a\n\nid: 7\ndata: b\n\nid: 8\n\n",
        );
        let persisted: Vec<_> = applied.iter().map(|a| a.persist.as_deref()).collect();
        assert_eq!(persisted, vec![Some("7"), None, Some("8")]);
    }

    #[test]
    fn test_events_apply_one_at_a_time() {
        let mut state = state();
        let generation = open(&mut state, 200);

        let events = state.parse(
            generation,
            b"id: 1\ndata: a\n\nretry: 50\nid: 2\ndata: b\n\n",
        );
        assert_eq!(events.len(), 2);
        assert_eq!(state.last_event_id(), None);

        let mut events = events.into_iter();
        state.apply_event(generation, events.next().unwrap()).unwrap();
        assert_eq!(state.last_event_id(), Some("1"));
        assert_eq!(state.retry_time(), Duration::from_millis(3000));

        state.apply_event(generation, events.next().unwrap()).unwrap();
        assert_eq!(state.last_event_id(), Some("2"));
        assert_eq!(state.retry_time(), Duration::from_millis(50));
    }

    #[test]
    fn test_events_after_stop_are_not_applied() {
        let mut state = state();
        let generation = open(&mut state, 200);

        let mut events = state
            .parse(generation, b"id: 1\ndata: a\n\nid: 2\ndata: b\n\n")
            .into_iter();
        let first = state.apply_event(generation, events.next().unwrap()).unwrap();
        assert_eq!(first.persist.as_deref(), Some("1"));

        state.stop();
        assert!(state.apply_event(generation, events.next().unwrap()).is_none());
        assert_eq!(state.last_event_id(), Some("1"));
    }

    #[test]
    fn test_explicit_resume_id() {
        let mut state =
            ConnectionState::new(Duration::from_millis(3000), Some("old".to_string()));

        assert!(state.set_last_event_id("resume-here"));
        assert!(!state.set_last_event_id("resume-here"));
        state.start();

        assert_eq!(state.last_event_id(), Some("resume-here"));
        let headers = state.request_headers(&Headers::new());
        assert_eq!(headers.get("Last-Event-Id").map(String::as_str), Some("resume-here"));
    }

    #[test]
    fn test_ready_state_display() {
        assert_eq!(ReadyState::Closed.to_string(), "closed");
        assert_eq!(ReadyState::Connecting.to_string(), "connecting");
        assert_eq!(ReadyState::Open.to_string(), "open");
    }
}
