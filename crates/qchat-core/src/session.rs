//! Conversation view model: one chat, its messages, and the in-flight stream.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::chat::{ChatStore, Message, MessageLog, Role};
use crate::client::{ChatClient, ChatRequest};
use crate::error::ChatError;
use crate::storage::{Storage, StorageError};
use crate::stream::{StreamIngestor, StreamState};

/// Receives session changes as they happen.
///
/// Every method defaults to a no-op so front ends implement only what they
/// display.
pub trait ChatObserver {
    /// A message was appended to the conversation.
    fn message_added(&mut self, _message: &Message) {}

    /// The content of message `id` changed.
    fn message_updated(&mut self, _id: &str, _content: &str) {}

    fn loading_changed(&mut self, _loading: bool) {}

    /// An error was put in the session's error slot.
    fn error_raised(&mut self, _message: &str) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ChatObserver for NoopObserver {}

/// One conversation as seen by a front end.
///
/// `chat_id` is `None` for a conversation that has not been persisted yet;
/// its id is assigned when the first exchange completes.
#[derive(Debug)]
pub struct ChatSession<S> {
    client: ChatClient,
    store: ChatStore<S>,
    chat_id: Option<String>,
    messages: MessageLog,
    is_loading: bool,
    error: Option<String>,
    /// Replies whose exchange failed; kept on screen but never persisted.
    failed: HashSet<String>,
    cancel: CancellationToken,
}

impl<S: Storage> ChatSession<S> {
    /// Starts a new, unsaved conversation.
    pub fn new(client: ChatClient, store: ChatStore<S>) -> Self {
        Self {
            client,
            store,
            chat_id: None,
            messages: Vec::new(),
            is_loading: false,
            error: None,
            failed: HashSet::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Opens a stored conversation.
    ///
    /// # Errors
    /// Returns an error if storage cannot be read.
    pub fn open(
        client: ChatClient,
        store: ChatStore<S>,
        chat_id: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let chat_id = chat_id.into();
        let messages = store.load_messages(&chat_id)?;
        Ok(Self {
            chat_id: Some(chat_id),
            messages,
            ..Self::new(client, store)
        })
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Message of the last failed exchange, until dismissed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn store(&self) -> &ChatStore<S> {
        &self.store
    }

    /// Returns a token that cancels the next (or current) stream.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancels the in-flight stream, keeping its partial content.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Sends a prompt and streams the reply into the conversation.
    ///
    /// Blank prompts are ignored and return `Ok(None)`. Otherwise returns the
    /// final state of the reply. Stream failures end up in the reply content
    /// and the error slot, not in the returned `Result`.
    ///
    /// # Errors
    /// Returns an error only if the finished exchange cannot be persisted.
    pub async fn send(
        &mut self,
        prompt: &str,
        observer: &mut impl ChatObserver,
    ) -> Result<Option<StreamState>, StorageError> {
        if prompt.trim().is_empty() || self.is_loading {
            return Ok(None);
        }
        self.error = None;

        let user = Message::user(prompt);
        let reply = Message::assistant("");
        let reply_id = reply.id.clone();
        observer.message_added(&user);
        observer.message_added(&reply);
        self.messages.push(user);
        self.messages.push(reply);

        self.set_loading(true, observer);
        let token = self.cancel.clone();
        let request = ChatRequest::new(prompt, self.chat_id.clone());

        let opened = tokio::select! {
            biased;
            () = token.cancelled() => None,
            result = self.client.open_stream(&request) => Some(result),
        };

        let mut ingestor = StreamIngestor::new(reply_id.clone());
        match opened {
            None => ingestor.cancel(),
            Some(Err(err)) => self.fail_request(&reply_id, &err, &mut ingestor, observer),
            Some(Ok(bytes)) => {
                let messages = &mut self.messages;
                ingestor
                    .run(bytes, &token, |id, content| {
                        set_content(messages, id, content);
                        observer.message_updated(id, content);
                    })
                    .await;
                if let Some(err) = ingestor.error() {
                    self.raise(err.to_string(), observer);
                }
            }
        }
        self.set_loading(false, observer);

        if token.is_cancelled() {
            self.cancel = CancellationToken::new();
        }

        let state = ingestor.state();
        match state {
            StreamState::Cancelled if ingestor.content().is_empty() => {
                self.messages.retain(|m| m.id != reply_id);
            }
            StreamState::Completed | StreamState::Cancelled => {
                if !ingestor.content().is_empty() {
                    self.persist(prompt)?;
                }
            }
            StreamState::Failed => {
                self.failed.insert(reply_id);
            }
            StreamState::Streaming => {}
        }
        Ok(Some(state))
    }

    fn fail_request(
        &mut self,
        reply_id: &str,
        err: &ChatError,
        ingestor: &mut StreamIngestor,
        observer: &mut impl ChatObserver,
    ) {
        warn!(error = %err, kind = %err.kind(), "chat request failed");
        ingestor.fail(err.clone());
        let content = format!("Error: {err}. Please try again later.");
        set_content(&mut self.messages, reply_id, &content);
        observer.message_updated(reply_id, &content);
        self.raise(err.to_string(), observer);
    }

    fn raise(&mut self, message: String, observer: &mut impl ChatObserver) {
        observer.error_raised(&message);
        self.error = Some(message);
    }

    fn set_loading(&mut self, loading: bool, observer: &mut impl ChatObserver) {
        self.is_loading = loading;
        observer.loading_changed(loading);
    }

    /// The conversation without failed exchanges (their prompt and reply).
    fn persistable(&self) -> MessageLog {
        let mut log: MessageLog = Vec::with_capacity(self.messages.len());
        for message in &self.messages {
            if self.failed.contains(&message.id) {
                if log.last().is_some_and(|m| m.role == Role::User) {
                    log.pop();
                }
                continue;
            }
            log.push(message.clone());
        }
        log
    }

    fn persist(&mut self, prompt: &str) -> Result<(), StorageError> {
        let log = self.persistable();
        match &self.chat_id {
            Some(chat_id) => {
                self.store.save_messages(chat_id, &log)?;
                self.store.retitle_if_new(chat_id, prompt)?;
            }
            None => {
                let chat_id = uuid::Uuid::new_v4().to_string();
                let record = self.store.record_first_exchange(&chat_id, &log)?;
                info!(chat_id = %record.id, title = %record.title, "chat created");
                self.chat_id = Some(chat_id);
            }
        }
        Ok(())
    }
}

fn set_content(messages: &mut [Message], id: &str, content: &str) {
    if let Some(message) = messages.iter_mut().find(|m| m.id == id) {
        content.clone_into(&mut message.content);
    }
}
