//! Interactive chat command.

use std::io::{self, Write};

use anyhow::{Context, Result};
use qchat_core::chat::DEFAULT_CHAT_TITLE;
use qchat_core::interrupt::{self, InterruptedError};
use qchat_core::stream::StreamState;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::stream_reply;
use crate::cli::AppContext;
use crate::cli::terminal::{TerminalObserver, format_transcript};

pub async fn run(ctx: &AppContext, chat_id: Option<&str>) -> Result<()> {
    let mut session = ctx.session(chat_id)?;

    let title = match session.chat_id() {
        Some(id) => session.store().chat_title(id)?,
        None => DEFAULT_CHAT_TITLE.to_string(),
    };
    println!("{title}");
    if !session.messages().is_empty() {
        println!("\n{}\n", format_transcript(session.messages()));
    }
    println!("Type a message and press Enter. /quit exits, Ctrl+C stops a reply.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut observer = TerminalObserver::new(io::stdout());
    loop {
        print!("> ");
        io::stdout().flush()?;

        let line = tokio::select! {
            biased;
            () = interrupt::wait_for_interrupt() => return Err(InterruptedError.into()),
            line = lines.next_line() => line.context("read stdin")?,
        };
        let Some(line) = line else { break };

        let prompt = line.trim();
        match prompt {
            "" => continue,
            "/quit" | "/exit" => break,
            _ => {}
        }

        if stream_reply(&mut session, prompt, &mut observer).await? == Some(StreamState::Cancelled) {
            println!("[stopped]");
        }
        session.dismiss_error();
    }

    if let Some(id) = session.chat_id() {
        println!("Chat: {id}");
    }
    Ok(())
}
