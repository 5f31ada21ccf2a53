//! Payload parsing and the byte-stream to event adapter.

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use serde_json::Value;

use crate::error::ChatError;
use crate::stream::StreamEvent;
use crate::stream::frame::{FrameDecoder, frame_payloads};

/// Payload that marks normal stream termination.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Parses one trimmed `data:` payload into a `StreamEvent`.
///
/// # Errors
/// Returns `ChatError::MalformedFrame` when the payload is neither the
/// sentinel nor a JSON object carrying `chunk` or `error`.
pub fn parse_payload(payload: &str) -> Result<StreamEvent, ChatError> {
    let payload = payload.trim();
    if payload == DONE_SENTINEL {
        return Ok(StreamEvent::End);
    }

    let value: Value = serde_json::from_str(payload)
        .map_err(|err| ChatError::MalformedFrame(format!("invalid JSON: {err}")))?;
    let Some(object) = value.as_object() else {
        return Err(ChatError::MalformedFrame(
            "payload is not a JSON object".to_string(),
        ));
    };

    match object.get("error") {
        Some(Value::String(message)) if !message.is_empty() => {
            return Ok(StreamEvent::Error(message.clone()));
        }
        Some(Value::Null | Value::Bool(false) | Value::String(_)) | None => {}
        Some(other) => return Ok(StreamEvent::Error(other.to_string())),
    }

    match object.get("chunk") {
        Some(Value::String(chunk)) => Ok(StreamEvent::TextDelta(chunk.clone())),
        Some(Value::Null) | None => Err(ChatError::MalformedFrame(
            "payload has neither chunk nor error".to_string(),
        )),
        Some(other) => Err(ChatError::MalformedFrame(format!(
            "chunk is not a string: {other}"
        ))),
    }
}

/// Stream adapter that converts a response byte stream into `StreamEvent`s.
///
/// Yields one item per `data:` payload in arrival order. Malformed payloads
/// are yielded as `ChatError::MalformedFrame` and the stream keeps going.
/// After a terminal event (`End` or `Error`) or a transport failure nothing
/// more is yielded, even if further payloads were already buffered.
pub struct StreamParser<S> {
    inner: S,
    decoder: FrameDecoder,
    pending: VecDeque<Result<StreamEvent, ChatError>>,
    terminated: bool,
    exhausted: bool,
}

impl<S> StreamParser<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(),
            pending: VecDeque::new(),
            terminated: false,
            exhausted: false,
        }
    }

    fn queue_frames(&mut self, frames: Vec<String>) {
        for frame in frames {
            self.queue_frame(&frame);
        }
    }

    fn queue_frame(&mut self, frame: &str) {
        for payload in frame_payloads(frame) {
            if self.terminated {
                return;
            }
            let parsed = parse_payload(payload);
            if matches!(&parsed, Ok(event) if event.is_terminal()) {
                self.terminated = true;
            }
            self.pending.push_back(parsed);
        }
    }
}

impl<S, E> Stream for StreamParser<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    type Item = Result<StreamEvent, ChatError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Poll::Ready(Some(item));
            }
            if self.terminated || self.exhausted {
                return Poll::Ready(None);
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    let frames = self.decoder.push(&chunk);
                    self.queue_frames(frames);
                }
                Poll::Ready(Some(Err(err))) => {
                    self.terminated = true;
                    return Poll::Ready(Some(Err(ChatError::Transport(err.to_string()))));
                }
                Poll::Ready(None) => {
                    // Servers may close without a trailing blank line.
                    let decoder = std::mem::take(&mut self.decoder);
                    if let Some(frame) = decoder.finish() {
                        self.queue_frame(&frame);
                    }
                    self.exhausted = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
