//! Folds decoded stream events into the in-flight assistant message.

use std::fmt::Display;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ChatError;
use crate::stream::StreamEvent;
use crate::stream::parser::StreamParser;

/// Prefix written into a message whose stream failed.
pub const ERROR_PREFIX: &str = "Error: ";

/// Lifecycle of the in-flight message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Content is still being appended.
    Streaming,
    /// `[DONE]` was seen or the byte stream closed cleanly.
    Completed,
    /// A terminal error overwrote the content.
    Failed,
    /// The caller cancelled; partial content is kept.
    Cancelled,
}

impl StreamState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, StreamState::Streaming)
    }
}

/// Result of applying one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fold {
    /// Content changed; the UI should re-render.
    Updated,
    /// The stream reached a terminal state.
    Finished,
    /// Nothing changed (empty delta, or the message is already frozen).
    Ignored,
}

/// Owns the content of the one in-flight assistant message for a stream.
#[derive(Debug)]
pub struct StreamIngestor {
    message_id: String,
    content: String,
    state: StreamState,
    error: Option<ChatError>,
    frames: usize,
}

impl StreamIngestor {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            content: String::new(),
            state: StreamState::Streaming,
            error: None,
            frames: 0,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// The error that ended the stream, if it failed.
    pub fn error(&self) -> Option<&ChatError> {
        self.error.as_ref()
    }

    /// Applies one decoded event. Events after a terminal state are ignored.
    pub fn apply(&mut self, event: StreamEvent) -> Fold {
        if self.state.is_terminal() {
            return Fold::Ignored;
        }
        self.frames += 1;

        match event {
            StreamEvent::TextDelta(text) => {
                if text.is_empty() {
                    return Fold::Ignored;
                }
                self.content.push_str(&text);
                Fold::Updated
            }
            StreamEvent::Error(message) => {
                self.fail(ChatError::ServerReportedError(message));
                Fold::Finished
            }
            StreamEvent::End => {
                self.state = StreamState::Completed;
                Fold::Finished
            }
        }
    }

    /// Freezes the message with an error, overwriting its content.
    ///
    /// Does nothing if the stream already reached a terminal state.
    pub fn fail(&mut self, error: ChatError) {
        if self.state.is_terminal() {
            return;
        }
        self.content = format!("{ERROR_PREFIX}{error}");
        self.state = StreamState::Failed;
        self.error = Some(error);
    }

    /// Freezes the message as complete if it is still streaming.
    pub fn finish(&mut self) {
        if !self.state.is_terminal() {
            self.state = StreamState::Completed;
        }
    }

    /// Freezes the message as cancelled, keeping the partial content.
    pub fn cancel(&mut self) {
        if !self.state.is_terminal() {
            self.state = StreamState::Cancelled;
        }
    }

    /// Drives a response byte stream to a terminal state.
    ///
    /// `on_update` runs with `(message_id, content)` once per decoded frame
    /// that changed the content, including the final error overwrite.
    /// Malformed frames are logged and skipped. When `cancel` fires the byte
    /// stream is dropped before this returns.
    pub async fn run<S, E, F>(&mut self, bytes: S, cancel: &CancellationToken, mut on_update: F)
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: Display,
        F: FnMut(&str, &str),
    {
        info!(message_id = %self.message_id, "stream started");
        let mut events = StreamParser::new(bytes);

        while !self.state.is_terminal() {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    self.cancel();
                    break;
                }
                next = events.next() => next,
            };

            match next {
                Some(Ok(event)) => {
                    debug!(message_id = %self.message_id, ?event, "stream event");
                    match self.apply(event) {
                        Fold::Updated => on_update(&self.message_id, &self.content),
                        Fold::Finished if self.state == StreamState::Failed => {
                            on_update(&self.message_id, &self.content);
                        }
                        Fold::Finished | Fold::Ignored => {}
                    }
                }
                Some(Err(err)) if !err.is_terminal() => {
                    warn!(message_id = %self.message_id, error = %err, "skipping frame");
                }
                Some(Err(err)) => {
                    self.fail(err);
                    on_update(&self.message_id, &self.content);
                }
                // Closed without [DONE]: nothing may stay in flight.
                None => self.finish(),
            }
        }

        drop(events);
        info!(
            message_id = %self.message_id,
            state = ?self.state,
            frames = self.frames,
            chars = self.content.len(),
            "stream finished"
        );
    }
}
