//! One-shot send command.

use std::io;

use anyhow::{Result, bail};
use qchat_core::interrupt::InterruptedError;
use qchat_core::stream::StreamState;
use tracing::debug;

use super::stream_reply;
use crate::cli::AppContext;
use crate::cli::terminal::TerminalObserver;

pub async fn run(ctx: &AppContext, message: &str, chat_id: Option<&str>, html: bool) -> Result<()> {
    let mut session = ctx.session(chat_id)?;
    let mut observer = if html {
        TerminalObserver::html(io::stdout())
    } else {
        TerminalObserver::new(io::stdout())
    };

    let Some(state) = stream_reply(&mut session, message, &mut observer).await? else {
        bail!("Message is empty");
    };

    debug!(?state, chat_id = ?session.chat_id(), "send finished");
    if let Some(id) = session.chat_id() {
        eprintln!("Chat: {id}");
    }

    if state == StreamState::Cancelled {
        return Err(InterruptedError.into());
    }
    if let Some(error) = session.error() {
        bail!("{error}");
    }
    Ok(())
}
