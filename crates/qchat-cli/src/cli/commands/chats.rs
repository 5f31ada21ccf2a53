//! Saved chat command handlers.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use qchat_core::chat::group_by_date;
use qchat_core::markdown;
use tracing::info;

use crate::cli::AppContext;
use crate::cli::terminal::format_transcript;

pub fn list(ctx: &AppContext) -> Result<()> {
    let chats = ctx.store()?.list_chats().context("list chats")?;
    if chats.is_empty() {
        println!("No chats found.");
        return Ok(());
    }

    let groups = group_by_date(&chats, Utc::now());
    for (label, chats) in groups.labelled() {
        println!("{label}");
        for chat in chats {
            println!(
                "  {}  {}  {}",
                chat.title,
                chat.id,
                chat.created_at.format("%Y-%m-%d %H:%M")
            );
        }
    }
    Ok(())
}

pub fn new(ctx: &AppContext) -> Result<()> {
    let chat = ctx.store()?.create_chat().context("create chat")?;
    println!("{}", chat.id);
    Ok(())
}

pub fn show(ctx: &AppContext, id: &str, html: bool) -> Result<()> {
    let store = ctx.store()?;
    let messages = store
        .load_messages(id)
        .with_context(|| format!("load chat '{id}'"))?;

    if html {
        for message in &messages {
            println!("{}", markdown::render_message(message.role, &message.content));
        }
    } else {
        println!("{}\n", store.chat_title(id)?);
        println!("{}", format_transcript(&messages));
    }
    Ok(())
}

pub fn delete(ctx: &AppContext, id: &str) -> Result<()> {
    let removed = ctx
        .store()?
        .delete_chat(id)
        .with_context(|| format!("delete chat '{id}'"))?;
    if !removed {
        bail!("Chat '{id}' not found");
    }
    info!(chat_id = %id, "chat deleted");
    println!("Deleted chat {id}");
    Ok(())
}
