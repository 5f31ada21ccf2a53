//! HTTP client for the chat backend's streaming endpoint.

use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_LENGTH};
use serde::Serialize;
use tracing::debug;

use crate::error::ChatError;

const CHAT_PATH: &str = "/api/chat";

/// Raw response body of a chat request.
pub type ByteStream = BoxStream<'static, Result<Bytes, reqwest::Error>>;

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    /// Omitted for the first message of a new chat.
    #[serde(rename = "chatId", skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, chat_id: Option<String>) -> Self {
        Self {
            message: message.into(),
            chat_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    /// Creates a client for a backend at `base_url` (e.g. `http://localhost:8000`).
    ///
    /// `connect_timeout` bounds connection setup only; a response stream may
    /// stay open for as long as the server keeps writing.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, connect_timeout: Option<Duration>) -> Result<Self, ChatError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ChatError::network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sends a chat request and returns the response body as a byte stream.
    ///
    /// # Errors
    /// - `RequestFailed` if the request could not be sent or the status is
    ///   not 2xx.
    /// - `StreamUnavailable` if the response has no body to read.
    pub async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, ChatError> {
        let url = format!("{}{CHAT_PATH}", self.base_url);
        debug!(%url, chat_id = ?request.chat_id, "opening chat stream");

        let response = self
            .http
            .post(&url)
            .header(ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::http_status(
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
            ));
        }

        let empty_body = status == StatusCode::NO_CONTENT
            || response
                .headers()
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.trim() == "0");
        if empty_body {
            return Err(ChatError::StreamUnavailable);
        }

        Ok(response.bytes_stream().boxed())
    }
}

fn classify_reqwest_error(e: &reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::network(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        ChatError::network(format!("Connection failed: {e}"))
    } else if e.is_request() {
        ChatError::network(format!("Request error: {e}"))
    } else {
        ChatError::network(format!("Network error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn test_request_body_omits_missing_chat_id() {
        let json = serde_json::to_value(ChatRequest::new("hi", None)).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "hi" }));

        let json = serde_json::to_value(ChatRequest::new("hi", Some("c1".into()))).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "hi", "chatId": "c1" }));
    }

    #[tokio::test]
    async fn test_open_stream_posts_and_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(header("accept", "text/event-stream"))
            .and(body_json(serde_json::json!({ "message": "hi", "chatId": "c1" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string("data: {\"chunk\":\"x\"}\n\ndata: [DONE]\n\n"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatClient::new(&format!("{}/", server.uri()), None).unwrap();
        let mut stream = client
            .open_stream(&ChatRequest::new("hi", Some("c1".into())))
            .await
            .unwrap();

        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk.unwrap());
        }
        assert!(String::from_utf8(body).unwrap().ends_with("[DONE]\n\n"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_request_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri(), None).unwrap();
        let err = client
            .open_stream(&ChatRequest::new("hi", None))
            .await
            .err()
            .unwrap();
        assert_eq!(err, ChatError::http_status(503, "Service Unavailable"));
        assert_eq!(
            err.to_string(),
            "Server responded with 503: Service Unavailable"
        );
    }

    #[tokio::test]
    async fn test_empty_body_is_stream_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri(), None).unwrap();
        let err = client
            .open_stream(&ChatRequest::new("hi", None))
            .await
            .err()
            .unwrap();
        assert_eq!(err, ChatError::StreamUnavailable);
    }

    #[tokio::test]
    async fn test_connection_refused_has_no_status() {
        // Port 9 (discard) is not expected to be listening.
        let client = ChatClient::new("http://127.0.0.1:9", Some(Duration::from_secs(2))).unwrap();
        let err = client
            .open_stream(&ChatRequest::new("hi", None))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ChatError::RequestFailed { status: None, .. }));
    }
}
