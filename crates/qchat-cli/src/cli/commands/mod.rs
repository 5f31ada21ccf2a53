//! CLI command handlers.

pub mod chat;
pub mod chats;
pub mod config;
pub mod render;
pub mod send;

use anyhow::{Context, Result};
use qchat_core::interrupt;
use qchat_core::session::{ChatObserver, ChatSession};
use qchat_core::storage::Storage;
use qchat_core::stream::StreamState;
use tracing::debug;

/// Sends `prompt`, letting Ctrl+C cancel the reply while it streams.
async fn stream_reply<S: Storage>(
    session: &mut ChatSession<S>,
    prompt: &str,
    observer: &mut impl ChatObserver,
) -> Result<Option<StreamState>> {
    interrupt::reset();
    let cancel = session.cancel_handle();
    let watcher = tokio::spawn(async move {
        interrupt::wait_for_interrupt().await;
        debug!("interrupt received, cancelling reply");
        cancel.cancel();
    });

    let result = session.send(prompt, observer).await;
    watcher.abort();
    interrupt::reset();
    result.context("save chat")
}
