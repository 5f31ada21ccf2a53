//! Markdown rendering command.

use std::io::Read;

use anyhow::{Context, Result};
use qchat_core::markdown;

/// Renders markdown read from stdin and prints the HTML fragment.
pub fn run() -> Result<()> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("read markdown from stdin")?;
    println!("{}", markdown::render(&text));
    Ok(())
}
