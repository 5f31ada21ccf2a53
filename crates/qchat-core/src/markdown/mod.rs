//! Incremental markdown renderer.
//!
//! [`render`] is a pure function of the current message buffer: every
//! streamed delta re-renders the whole text from scratch, so there is no
//! retained state to get out of sync. The buffer may end mid-token; unclosed
//! constructs degrade to literal text (or an open code block) rather than
//! producing broken markup.
//!
//! The supported subset is deliberately small and not CommonMark:
//!
//! - fenced code (```` ``` ````), which may open and close on the same line
//! - `#`, `##`, `###` headings
//! - numbered steps (`1. ...`) rendered as labelled step blocks
//! - `-` list items grouped into one `<ul>` per run
//! - `**strong**`, `*emphasis*`, `` `code` `` and `[label](url)` inline
//! - paragraphs, with single newlines kept as `<br>`
//!
//! All source text is HTML-escaped; the only raw markup in the output is the
//! markup produced here. Only feed raw message text in, never rendered HTML.

mod block;
mod inline;

use crate::chat::Role;
use block::{Block, parse_blocks};
use inline::{parse_inline, render_inline};

/// Renders a message buffer into an HTML fragment.
pub fn render(text: &str) -> String {
    let mut html = String::with_capacity(text.len() + text.len() / 2);
    for (i, block) in parse_blocks(text).iter().enumerate() {
        if i > 0 {
            html.push('\n');
        }
        render_block(block, &mut html);
    }
    html
}

/// Renders a message for display.
///
/// Assistant content goes through [`render`]; user content is shown verbatim
/// (escaped, whitespace preserved). An assistant message with no content yet
/// renders as a typing indicator.
pub fn render_message(role: Role, content: &str) -> String {
    match role {
        Role::User => {
            let mut html = String::from("<div class=\"whitespace-pre-wrap\">");
            escape_into(content, &mut html);
            html.push_str("</div>");
            html
        }
        Role::Assistant if content.is_empty() => {
            "<div class=\"typing-indicator\"><span></span><span></span><span></span></div>"
                .to_string()
        }
        Role::Assistant => format!("<div class=\"markdown-content\">{}</div>", render(content)),
    }
}

fn render_block(block: &Block<'_>, out: &mut String) {
    match block {
        Block::Paragraph(lines) => {
            out.push_str("<p>");
            render_lines(lines, out);
            out.push_str("</p>");
        }
        Block::Heading { level, text } => {
            out.push_str(&format!("<h{level}>"));
            render_inline(&parse_inline(text), out);
            out.push_str(&format!("</h{level}>"));
        }
        Block::Step { label, body } => {
            out.push_str("<div class=\"markdown-step\"><strong class=\"step-number\">");
            escape_into(label, out);
            out.push_str("</strong> ");
            render_lines(body, out);
            out.push_str("</div>");
        }
        Block::List(items) => {
            out.push_str("<ul class=\"markdown-list\">");
            for item in items {
                out.push_str("<li>");
                render_inline(&parse_inline(item), out);
                out.push_str("</li>");
            }
            out.push_str("</ul>");
        }
        Block::Code { language, body } => {
            match language {
                Some(language) => {
                    out.push_str("<pre><code class=\"language-");
                    escape_into(language, out);
                    out.push_str("\">");
                }
                None => out.push_str("<pre><code>"),
            }
            escape_into(body, out);
            out.push_str("</code></pre>");
        }
    }
}

fn render_lines(lines: &[&str], out: &mut String) {
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push_str("<br>");
        }
        render_inline(&parse_inline(line), out);
    }
}

/// Appends `text` to `out` with HTML special characters escaped.
pub(crate) fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold_and_italic() {
        let html = render("**bold** and *italic*");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>italic</em>"));
        assert_eq!(html, "<p><strong>bold</strong> and <em>italic</em></p>");
    }

    #[test]
    fn test_fenced_code_is_not_formatted() {
        let html = render("```code here```");
        assert_eq!(html, "<pre><code>code here</code></pre>");

        let html = render("```\n**not bold** and *not em*\n```");
        assert_eq!(
            html,
            "<pre><code>**not bold** and *not em*</code></pre>"
        );
        assert!(!html.contains("<strong>"));
        assert!(!html.contains("<em>"));
    }

    #[test]
    fn test_numbered_steps() {
        let html = render("1. First step\n2. Second step");
        assert_eq!(
            html,
            "<div class=\"markdown-step\"><strong class=\"step-number\">1.</strong> First step</div>\n\
             <div class=\"markdown-step\"><strong class=\"step-number\">2.</strong> Second step</div>"
        );
    }

    #[test]
    fn test_step_spans_blank_lines_until_next_step() {
        assert_eq!(
            render("1. Install it\n\nThen restart.\n2. Next"),
            "<div class=\"markdown-step\"><strong class=\"step-number\">1.</strong> Install it<br><br>Then restart.</div>\n\
             <div class=\"markdown-step\"><strong class=\"step-number\">2.</strong> Next</div>"
        );
    }

    #[test]
    fn test_headings() {
        assert_eq!(
            render("# One\n## Two\n### Three"),
            "<h1>One</h1>\n<h2>Two</h2>\n<h3>Three</h3>"
        );
    }

    #[test]
    fn test_list_run_wrapped_once() {
        let html = render("Gates:\n- H\n- X\n- CNOT");
        assert_eq!(
            html,
            "<p>Gates:</p>\n<ul class=\"markdown-list\"><li>H</li><li>X</li><li>CNOT</li></ul>"
        );
        assert_eq!(html.matches("<ul").count(), 1);
    }

    #[test]
    fn test_soft_breaks_and_paragraphs() {
        assert_eq!(
            render("line one\nline two\n\n\n\nnext paragraph"),
            "<p>line one<br>line two</p>\n<p>next paragraph</p>"
        );
    }

    #[test]
    fn test_blank_input_renders_nothing() {
        assert_eq!(render(""), "");
        assert_eq!(render("\n\n  \n"), "");
    }

    #[test]
    fn test_streaming_prefixes_never_break_markup() {
        let full = "## Plan\n1. Run `qiskit`\n2. **Measure** the [state](https://q.example)\n```python\nprint('hi')\n```\n- done";
        for end in (0..=full.len()).filter(|i| full.is_char_boundary(*i)) {
            let html = render(&full[..end]);
            assert_eq!(
                html.matches("<pre>").count(),
                html.matches("</pre>").count()
            );
            assert_eq!(
                html.matches("<strong").count(),
                html.matches("</strong>").count()
            );
            assert_eq!(html.matches("<p>").count(), html.matches("</p>").count());
            assert!(!html.contains("<p><p>"));
        }
    }

    #[test]
    fn test_unterminated_fence_renders_open_code_block() {
        assert_eq!(
            render("Try:\n```\nx = *y*"),
            "<p>Try:</p>\n<pre><code>x = *y*</code></pre>"
        );
    }

    #[test]
    fn test_reflected_markup_is_escaped() {
        let html = render("Error: <img src=x onerror=alert(1)>");
        assert_eq!(
            html,
            "<p>Error: &lt;img src=x onerror=alert(1)&gt;</p>"
        );
    }

    #[test]
    fn test_render_message_by_role() {
        assert_eq!(
            render_message(Role::User, "**raw** <b>"),
            "<div class=\"whitespace-pre-wrap\">**raw** &lt;b&gt;</div>"
        );
        assert_eq!(
            render_message(Role::Assistant, "**hi**"),
            "<div class=\"markdown-content\"><p><strong>hi</strong></p></div>"
        );
        assert!(render_message(Role::Assistant, "").contains("typing-indicator"));
    }
}
