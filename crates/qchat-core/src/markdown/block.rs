//! Block segmentation: fenced code, headings, numbered steps, lists, paragraphs.

const FENCE: &str = "```";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Block<'a> {
    /// Consecutive prose lines; rendered with `<br>` between them.
    Paragraph(Vec<&'a str>),
    Heading { level: usize, text: &'a str },
    /// `label` keeps its trailing dot (`"2."`). An empty body line marks a
    /// blank-line gap.
    Step { label: &'a str, body: Vec<&'a str> },
    List(Vec<&'a str>),
    Code {
        language: Option<&'a str>,
        body: &'a str,
    },
}

/// Splits raw text into blocks.
///
/// Fenced regions are cut out first so nothing inside them is ever seen by
/// the prose rules. An opening fence with no closing fence yet (the usual
/// state mid-stream) runs to the end of the text.
pub(crate) fn parse_blocks(text: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(FENCE) {
        parse_prose(&rest[..start], &mut blocks);
        let after = &rest[start + FENCE.len()..];
        match after.find(FENCE) {
            Some(end) => {
                blocks.push(code_block(&after[..end]));
                rest = &after[end + FENCE.len()..];
            }
            None => {
                blocks.push(code_block(after));
                rest = "";
            }
        }
    }
    parse_prose(rest, &mut blocks);

    blocks
}

fn code_block(inner: &str) -> Block<'_> {
    if let Some((first_line, body)) = inner.split_once('\n')
        && is_language_tag(first_line)
    {
        return Block::Code {
            language: Some(first_line.trim()),
            body: body.trim(),
        };
    }
    Block::Code {
        language: None,
        body: inner.trim(),
    }
}

fn is_language_tag(line: &str) -> bool {
    let tag = line.trim_end();
    !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | '#' | '.'))
}

fn parse_prose<'a>(text: &'a str, blocks: &mut Vec<Block<'a>>) {
    let mut lines = text.lines().peekable();

    while let Some(line) = lines.next() {
        if line.trim().is_empty() {
            continue;
        }

        if let Some((level, text)) = heading(line) {
            blocks.push(Block::Heading { level, text });
            continue;
        }

        if let Some((label, first)) = step_start(line) {
            let mut body = vec![first];
            while let Some(next) = lines.next_if(|l| step_start(l).is_none()) {
                let next = next.trim();
                if !next.is_empty() || body.last().is_some_and(|l| !l.is_empty()) {
                    body.push(next);
                }
            }
            while body.len() > 1 && body.last().is_some_and(|l| l.is_empty()) {
                body.pop();
            }
            blocks.push(Block::Step { label, body });
            continue;
        }

        if let Some(item) = list_item(line) {
            let mut items = vec![item];
            while let Some(next) = lines.next_if(|l| list_item(l).is_some()) {
                items.extend(list_item(next));
            }
            blocks.push(Block::List(items));
            continue;
        }

        let mut paragraph = vec![line.trim()];
        while let Some(next) = lines.next_if(|l| !ends_run(l)) {
            paragraph.push(next.trim());
        }
        blocks.push(Block::Paragraph(paragraph));
    }
}

/// A blank line or the start of another block ends a paragraph.
fn ends_run(line: &str) -> bool {
    line.trim().is_empty()
        || heading(line).is_some()
        || step_start(line).is_some()
        || list_item(line).is_some()
}

/// `#`, `##` or `###` followed by a space.
fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.bytes().take_while(|b| *b == b'#').count();
    if !(1..=3).contains(&level) {
        return None;
    }
    let text = line[level..].strip_prefix(' ')?;
    Some((level, text.trim()))
}

/// `<digits>.` followed by whitespace.
fn step_start(line: &str) -> Option<(&str, &str)> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = line[digits..].strip_prefix('.')?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((&line[..=digits], rest.trim()))
}

/// Any line whose first non-blank character is `-`.
fn list_item(line: &str) -> Option<&str> {
    line.trim_start().strip_prefix('-').map(str::trim)
}
