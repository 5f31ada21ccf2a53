//! Inline spans within a single line: code, strong, emphasis, links.

use crate::markdown::escape_into;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Inline<'a> {
    Text(&'a str),
    Code(&'a str),
    Strong(Vec<Inline<'a>>),
    Emphasis(Vec<Inline<'a>>),
    Link { label: Vec<Inline<'a>>, href: &'a str },
}

/// Schemes a link may point at; anything else renders as its label.
const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Parses one line into inline nodes.
///
/// Unclosed markers (common while a response is still streaming) are kept as
/// literal text.
pub(crate) fn parse_inline(text: &str) -> Vec<Inline<'_>> {
    let bytes = text.as_bytes();
    let mut nodes = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let parsed = match bytes[i] {
            b'`' => code_span(&text[i..]),
            b'*' => emphasis(&text[i..]),
            b'[' => link(&text[i..]),
            _ => None,
        };

        match parsed {
            Some((node, consumed)) => {
                if text_start < i {
                    nodes.push(Inline::Text(&text[text_start..i]));
                }
                nodes.push(node);
                i += consumed;
                text_start = i;
            }
            None => i += 1,
        }
    }

    if text_start < text.len() {
        nodes.push(Inline::Text(&text[text_start..]));
    }
    nodes
}

fn code_span(rest: &str) -> Option<(Inline<'_>, usize)> {
    let inner = &rest[1..];
    let end = inner.find('`')?;
    if end == 0 {
        return None;
    }
    Some((Inline::Code(&inner[..end]), end + 2))
}

fn emphasis(rest: &str) -> Option<(Inline<'_>, usize)> {
    if let Some(inner) = rest.strip_prefix("**") {
        let end = inner.find("**")?;
        return Some((Inline::Strong(parse_inline(&inner[..end])), end + 4));
    }

    let inner = &rest[1..];
    let end = inner.find('*')?;
    if end == 0 {
        return None;
    }
    Some((Inline::Emphasis(parse_inline(&inner[..end])), end + 2))
}

fn link(rest: &str) -> Option<(Inline<'_>, usize)> {
    let close = rest.find(']')?;
    let label = &rest[1..close];
    if label.is_empty() {
        return None;
    }
    let target = rest[close + 1..].strip_prefix('(')?;
    let end = target.find(')')?;
    let href = &target[..end];
    if href.is_empty() {
        return None;
    }
    Some((
        Inline::Link {
            label: parse_inline(label),
            href,
        },
        close + 1 + 1 + end + 1,
    ))
}

/// Relative links are allowed; absolute links must use an allowed scheme.
fn is_safe_href(href: &str) -> bool {
    let href = href.trim();
    let scheme_end = href.find(':');
    let path_start = href.find(['/', '?', '#']);
    match (scheme_end, path_start) {
        (Some(colon), Some(path)) if path < colon => true,
        (Some(colon), _) => {
            let scheme = href[..colon].to_ascii_lowercase();
            ALLOWED_SCHEMES.contains(&scheme.as_str())
        }
        (None, _) => true,
    }
}

pub(crate) fn render_inline(nodes: &[Inline<'_>], out: &mut String) {
    for node in nodes {
        match node {
            Inline::Text(text) => escape_into(text, out),
            Inline::Code(code) => {
                out.push_str("<code>");
                escape_into(code, out);
                out.push_str("</code>");
            }
            Inline::Strong(children) => {
                out.push_str("<strong>");
                render_inline(children, out);
                out.push_str("</strong>");
            }
            Inline::Emphasis(children) => {
                out.push_str("<em>");
                render_inline(children, out);
                out.push_str("</em>");
            }
            Inline::Link { label, href } => {
                if is_safe_href(href) {
                    out.push_str("<a href=\"");
                    escape_into(href.trim(), out);
                    out.push_str("\">");
                    render_inline(label, out);
                    out.push_str("</a>");
                } else {
                    render_inline(label, out);
                }
            }
        }
    }
}
