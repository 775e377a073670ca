//! Server-Sent Events wire format.
//!
//! The stream is a sequence of event blocks separated by blank lines, where a
//! line ends with `\n`, `\r\n` or `\r`. Inside a block:
//! - `id: <value>` - resumption token for `Last-Event-Id`
//! - `event: <name>` - event name (absent means `message`)
//! - `data: <value>` - payload line, repeated lines are joined with `\n`
//! - `retry: <millis>` - reconnection delay hint
//! - Lines starting with `:` - comments (ignored)
//!
//! # Module structure
//! - `event` - [`Event`] and block decoding
//! - `parser` - [`StreamParser`], incremental buffering of byte chunks

mod event;
mod parser;

pub use event::Event;
pub use parser::StreamParser;
