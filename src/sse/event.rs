//! Event model and block-to-event decoding.
//!
//! An event block is the text between two blank-line delimiters. Each line of
//! the block is a `field: value` pair; only `id`, `event`, `data` and `retry`
//! are recognized, everything else is consumed without effect.

/// A single event decoded from one event block.
///
/// Fields are `None` when the block contained no line for them, which is
/// distinct from `Some(String::new())` (field present with an empty value).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Event {
    /// Value of the last `id` line.
    pub id: Option<String>,
    /// Value of the last `event` line.
    pub event_name: Option<String>,
    /// All `data` values of the block joined by `\n`.
    pub data: Option<String>,
    /// Last `retry` value that parsed as a base-10 integer, in milliseconds.
    pub retry_time: Option<u64>,
}

/// A recognized field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Event,
    Data,
    Retry,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Field::Id),
            "event" => Some(Field::Event),
            "data" => Some(Field::Data),
            "retry" => Some(Field::Retry),
            _ => None,
        }
    }
}

impl Event {
    /// Decode an event block.
    ///
    /// Returns `None` for an empty block and for a block whose text starts
    /// with `:`, which marks the whole block as a comment.
    pub fn parse(block: &str) -> Option<Event> {
        if block.is_empty() || block.starts_with(':') {
            return None;
        }

        let mut event = Event::default();
        for line in split_lines(block) {
            let (name, value) = split_field(line);
            let Some(field) = Field::from_name(name) else {
                continue;
            };

            match field {
                Field::Id => event.id = Some(value.to_string()),
                // An empty event name means "no name", which dispatches as a message.
                Field::Event if value.is_empty() => event.event_name = None,
                Field::Event => event.event_name = Some(value.to_string()),
                Field::Data => match event.data.as_mut() {
                    Some(data) => {
                        data.push('\n');
                        data.push_str(value);
                    }
                    None => event.data = Some(value.to_string()),
                },
                Field::Retry => {
                    if let Ok(millis) = value.trim().parse::<u64>() {
                        event.retry_time = Some(millis);
                    }
                }
            }
        }

        Some(event)
    }

    /// True when the block only adjusted the reconnection delay.
    pub fn is_retry_only(&self) -> bool {
        self.id.is_none()
            && self.event_name.is_none()
            && self.data.is_none()
            && self.retry_time.is_some()
    }

    /// Name this event is dispatched under: the event name, or `"message"`.
    pub fn dispatch_name(&self) -> &str {
        self.event_name.as_deref().unwrap_or("message")
    }
}

/// Split a block into lines on any of the three newline conventions.
pub(crate) fn split_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                lines.push(&text[start..i]);
                i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                start = i;
            }
            b'\n' => {
                lines.push(&text[start..i]);
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }

    if start < bytes.len() {
        lines.push(&text[start..]);
    }

    lines
}

/// Split a line at its first `:` into field name and value.
///
/// A line without a colon is a field name with an empty value. Trailing
/// blanks between the name and the colon are not part of the name, and one
/// space directly after the colon is not part of the value.
fn split_field(line: &str) -> (&str, &str) {
    match line.split_once(':') {
        Some((name, value)) => (
            name.trim_end_matches([' ', '\t']),
            value.strip_prefix(' ').unwrap_or(value),
        ),
        None => (line, ""),
    }
}
