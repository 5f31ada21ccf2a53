//! Streams session updates to a terminal.

use std::io::Write;

use qchat_core::chat::{Message, Role};
use qchat_core::markdown;
use qchat_core::session::ChatObserver;

/// Prints each assistant reply as it grows.
///
/// In text mode only the unseen suffix is written on each update. When the
/// content is replaced rather than extended (an error overwrite), the new
/// content is printed on its own line.
///
/// In HTML mode every update re-renders the reply through the markdown
/// renderer; the latest rendering is written once the stream ends.
pub struct TerminalObserver<W: Write> {
    out: W,
    reply_id: Option<String>,
    shown: String,
    /// Latest HTML rendering of the reply (HTML mode only).
    rendered: Option<String>,
}

impl<W: Write> TerminalObserver<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            reply_id: None,
            shown: String::new(),
            rendered: None,
        }
    }

    pub fn html(out: W) -> Self {
        Self {
            rendered: Some(String::new()),
            ..Self::new(out)
        }
    }

    fn write(&mut self, text: &str) {
        // Nothing sensible to do if the terminal went away mid-reply.
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }
}

impl<W: Write> ChatObserver for TerminalObserver<W> {
    fn message_added(&mut self, message: &Message) {
        if message.role == Role::Assistant {
            self.reply_id = Some(message.id.clone());
            self.shown.clear();
            if let Some(rendered) = &mut self.rendered {
                rendered.clear();
            }
        }
    }

    fn message_updated(&mut self, id: &str, content: &str) {
        if self.reply_id.as_deref() != Some(id) {
            return;
        }
        if let Some(rendered) = &mut self.rendered {
            *rendered = markdown::render_message(Role::Assistant, content);
            return;
        }
        if let Some(suffix) = content.strip_prefix(self.shown.as_str()) {
            self.write(suffix);
        } else {
            self.write("\n");
            self.write(content);
        }
        content.clone_into(&mut self.shown);
    }

    fn loading_changed(&mut self, loading: bool) {
        if loading {
            return;
        }
        match self.rendered.take() {
            Some(html) => {
                if !html.is_empty() {
                    self.write(&html);
                    self.write("\n");
                }
                self.rendered = Some(String::new());
            }
            None if !self.shown.is_empty() => self.write("\n"),
            None => {}
        }
    }
}

/// Formats messages as a plain-text transcript.
pub fn format_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| match m.role {
            Role::User => format!("> {}", m.content),
            Role::Assistant => m.content.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(observer: TerminalObserver<Vec<u8>>) -> String {
        String::from_utf8(observer.out).unwrap()
    }

    #[test]
    fn test_prints_only_new_text() {
        let reply = Message::assistant("");
        let mut observer = TerminalObserver::new(Vec::new());
        observer.message_added(&Message::user("hi"));
        observer.message_added(&reply);
        observer.message_updated(&reply.id, "Hel");
        observer.message_updated(&reply.id, "Hello ✓");
        observer.loading_changed(false);
        assert_eq!(output(observer), "Hello ✓\n");
    }

    #[test]
    fn test_error_overwrite_starts_new_line() {
        let reply = Message::assistant("");
        let mut observer = TerminalObserver::new(Vec::new());
        observer.message_added(&reply);
        observer.message_updated(&reply.id, "partial");
        observer.message_updated(&reply.id, "Error: boom");
        assert_eq!(output(observer), "partial\nError: boom");
    }

    #[test]
    fn test_html_mode_renders_latest_content_once() {
        let reply = Message::assistant("");
        let mut observer = TerminalObserver::html(Vec::new());
        observer.message_added(&reply);
        observer.loading_changed(true);
        observer.message_updated(&reply.id, "**Sup");
        observer.message_updated(&reply.id, "**Superposition**\n```\nx");
        assert_eq!(
            observer.rendered.as_deref(),
            Some(
                "<div class=\"markdown-content\"><p><strong>Superposition</strong></p>\n<pre><code>x</code></pre></div>"
            )
        );
        observer.message_updated(&reply.id, "**Superposition** done");
        observer.loading_changed(false);
        assert_eq!(
            output(observer),
            "<div class=\"markdown-content\"><p><strong>Superposition</strong> done</p></div>\n"
        );
    }

    #[test]
    fn test_html_mode_skips_removed_reply() {
        let reply = Message::assistant("");
        let mut observer = TerminalObserver::html(Vec::new());
        observer.message_added(&reply);
        observer.loading_changed(false);
        assert_eq!(output(observer), "");
    }

    #[test]
    fn test_format_transcript() {
        let messages = [Message::user("What is a qubit?"), Message::assistant("A unit.")];
        assert_eq!(format_transcript(&messages), "> What is a qubit?\n\nA unit.");
    }
}
