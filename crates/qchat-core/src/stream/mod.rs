//! Streaming response ingestion.
//!
//! The backend answers `POST /api/chat` with SSE-style frames:
//!
//! ```text
//! data: {"chunk":"Hello "}
//!
//! data: {"chunk":"world"}
//!
//! data: [DONE]
//! ```
//!
//! `frame` splits raw bytes into frames, `parser` turns `data:` payloads into
//! [`StreamEvent`]s and `ingest` folds those events into the in-flight
//! assistant message.

pub mod frame;
pub mod ingest;
pub mod parser;

pub use frame::{FrameDecoder, frame_payloads};
pub use ingest::{Fold, StreamIngestor, StreamState};
pub use parser::{DONE_SENTINEL, StreamParser, parse_payload};

/// Application-level event decoded from one `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Text to append to the in-flight message.
    TextDelta(String),
    /// Server-reported error; terminal for the stream.
    Error(String),
    /// The `[DONE]` sentinel; terminal for the stream.
    End,
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Error(_) | StreamEvent::End)
    }
}
