//! Incremental byte-stream parser.
//!
//! Bytes arrive in arbitrary chunks. The parser keeps everything that has not
//! yet been closed by a blank line and turns every completed block into an
//! [`Event`].

use tracing::debug;

use super::event::Event;

/// Longest block delimiter (`\r\n\r\n`) minus one. A delimiter that was cut
/// by a chunk boundary starts at most this many bytes before the old end.
const MAX_DELIMITER_OVERLAP: usize = 3;

/// Stateful parser that turns raw byte chunks into events.
///
/// Each connection owns its own parser; it is not shared and needs no
/// synchronization.
#[derive(Debug, Default)]
pub struct StreamParser {
    /// Bytes received but not yet resolved into complete blocks.
    buffer: Vec<u8>,
    /// Offset from which the next delimiter search starts. Everything before
    /// it is known to contain no delimiter.
    scan_from: usize,
}

impl StreamParser {
    /// Create an empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return the events whose blocks it completed.
    ///
    /// Events are returned in the order their blocks completed. A chunk may
    /// complete any number of blocks, including none.
    pub fn append(&mut self, chunk: &[u8]) -> Vec<Event> {
        if chunk.is_empty() {
            return Vec::new();
        }

        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut block_start = 0;
        let mut search_from = self.scan_from;

        while let Some((position, len)) = find_delimiter(&self.buffer, search_from) {
            if position > block_start {
                if let Some(event) = decode_block(&self.buffer[block_start..position]) {
                    events.push(event);
                }
            }

            block_start = position + len;
            search_from = block_start;
        }

        self.buffer.drain(..block_start);
        self.scan_from = self.buffer.len().saturating_sub(MAX_DELIMITER_OVERLAP);

        events
    }

    /// The unresolved bytes retained for the next call.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// The unresolved bytes as text, if they are valid UTF-8.
    pub fn current_buffer(&self) -> Option<&str> {
        std::str::from_utf8(&self.buffer).ok()
    }

    /// Whether no partial block is pending.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop any partial block.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.scan_from = 0;
    }
}

/// Find the earliest block delimiter at or after `from`.
///
/// Recognizes `\n\n`, `\r\n\r\n` and `\r\r`, returning the delimiter's start
/// offset and length. At a given offset at most one of them can match.
fn find_delimiter(buffer: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut i = from;
    while i + 1 < buffer.len() {
        match (buffer[i], buffer[i + 1]) {
            (b'\n', b'\n') | (b'\r', b'\r') => return Some((i, 2)),
            (b'\r', b'\n') if buffer[i + 2..].starts_with(b"\r\n") => return Some((i, 4)),
            _ => i += 1,
        }
    }
    None
}

fn decode_block(bytes: &[u8]) -> Option<Event> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Event::parse(text),
        Err(err) => {
            debug!("Dropping event block with invalid UTF-8: {}", err);
            None
        }
    }
}
