//! Error taxonomy for a single chat exchange.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Categories of chat errors for consistent handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network failure or non-2xx status before streaming started
    RequestFailed,
    /// Response had no readable body
    StreamUnavailable,
    /// One frame could not be decoded (non-fatal)
    MalformedFrame,
    /// The server put an `error` field in a frame
    ServerReported,
    /// The byte stream failed mid-read
    Transport,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::RequestFailed => write!(f, "request_failed"),
            ErrorKind::StreamUnavailable => write!(f, "stream_unavailable"),
            ErrorKind::MalformedFrame => write!(f, "malformed_frame"),
            ErrorKind::ServerReported => write!(f, "server_reported"),
            ErrorKind::Transport => write!(f, "transport"),
        }
    }
}

/// Error raised while requesting or ingesting a streamed response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// `status` is `None` when the request never produced a response.
    #[error("{}", describe_request_failure(*status, status_text))]
    RequestFailed {
        status: Option<u16>,
        status_text: String,
    },
    #[error("Failed to get response reader")]
    StreamUnavailable,
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),
    #[error("{0}")]
    ServerReportedError(String),
    #[error("Stream read failed: {0}")]
    Transport(String),
}

impl ChatError {
    /// Builds a `RequestFailed` error from an HTTP status.
    pub fn http_status(status: u16, status_text: impl Into<String>) -> Self {
        ChatError::RequestFailed {
            status: Some(status),
            status_text: status_text.into(),
        }
    }

    /// Builds a `RequestFailed` error for a request that never got a response.
    pub fn network(message: impl Into<String>) -> Self {
        ChatError::RequestFailed {
            status: None,
            status_text: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::RequestFailed { .. } => ErrorKind::RequestFailed,
            ChatError::StreamUnavailable => ErrorKind::StreamUnavailable,
            ChatError::MalformedFrame(_) => ErrorKind::MalformedFrame,
            ChatError::ServerReportedError(_) => ErrorKind::ServerReported,
            ChatError::Transport(_) => ErrorKind::Transport,
        }
    }

    /// Whether this error ends the stream it occurred in.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChatError::MalformedFrame(_))
    }

    /// Whether the failure happened before any response byte was read.
    pub fn is_request_level(&self) -> bool {
        matches!(
            self,
            ChatError::RequestFailed { .. } | ChatError::StreamUnavailable
        )
    }
}

fn describe_request_failure(status: Option<u16>, status_text: &str) -> String {
    match status {
        Some(code) => format!("Server responded with {code}: {status_text}"),
        None => status_text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_failed_display_includes_status() {
        let err = ChatError::http_status(503, "Service Unavailable");
        assert_eq!(
            err.to_string(),
            "Server responded with 503: Service Unavailable"
        );
        assert_eq!(err.kind(), ErrorKind::RequestFailed);
    }

    #[test]
    fn test_network_failure_display_is_message_only() {
        let err = ChatError::network("Connection failed: refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
        assert!(err.is_request_level());
    }

    #[test]
    fn test_malformed_frame_is_not_terminal() {
        assert!(!ChatError::MalformedFrame("bad".into()).is_terminal());
        assert!(ChatError::ServerReportedError("boom".into()).is_terminal());
        assert!(ChatError::Transport("reset".into()).is_terminal());
    }
}
