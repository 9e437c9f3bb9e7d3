//! Speech text preparation.
//!
//! [`prepare`] flattens Markdown into prose a speech engine can read aloud and
//! [`chunk`] cuts that prose into segments no longer than a provider limit.
//! Segments break on paragraphs where possible and on sentences (`". "`)
//! otherwise. Order matters: callers concatenate the audio for each segment.

use std::sync::LazyLock;

use regex::Regex;

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

fn rule(pattern: &str, replacement: &'static str) -> Rule {
    Rule { pattern: Regex::new(pattern).expect("valid speech regex"), replacement }
}

/// Applied in order; later rules assume earlier ones already ran.
static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        rule(r"(?s)```.*?```", ""),
        rule(r"`([^`]+)`", "$1"),
        rule(r"!\[([^\]]*)\]\([^)]*\)", "$1"),
        rule(r"\[([^\]]+)\]\([^)]*\)", "$1"),
        rule(r"(?m)^#{1,6}[ \t]+", ""),
        rule(r"\*\*\*(.+?)\*\*\*", "$1"),
        rule(r"\*\*(.+?)\*\*", "$1"),
        rule(r"\*([^*\n].*?)\*", "$1"),
        rule(r"___(.+?)___", "$1"),
        rule(r"__(.+?)__", "$1"),
        rule(r"_([^_\n].*?)_", "$1"),
        rule(r"(?m)^[-*_]{3,}[ \t]*$", ""),
        rule(r"(?m)^>[ \t]?", ""),
        rule(r"<[^>]+>", ""),
        rule(r"(?m)^[ \t]*(?:[-*+]|\d+\.)[ \t]+", ""),
        rule(r"\n{3,}", "\n\n"),
    ]
});

/// Strips Markdown syntax, keeping the words a listener should hear.
///
/// Code blocks are dropped; inline code, image alt text and link text are
/// kept. Paragraph breaks survive as blank lines.
///
/// ```rust
/// use lectern_core::speech::prepare;
///
/// assert_eq!(prepare("## Hi\n\nSee **[docs](https://d.test)**."), "Hi\n\nSee docs.");
/// ```
pub fn prepare(markdown: &str) -> String {
    let text = markdown.replace("\r\n", "\n");
    let text = RULES
        .iter()
        .fold(text, |acc, rule| rule.pattern.replace_all(&acc, rule.replacement).into_owned());
    text.trim().to_string()
}

/// Splits prepared text into segments of at most `max_chars` characters.
///
/// Paragraphs (`\n\n`) are packed together while they fit. A paragraph longer
/// than the limit is split after each `". "`, and a sentence still longer
/// than the limit is broken at its last whitespace inside the limit, or
/// mid-word when there is none. `max_chars` below 1 is treated as 1.
pub fn chunk(text: &str, max_chars: usize) -> Vec<String> {
    let max = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        let para_len = char_len(paragraph);

        if !current.is_empty() && char_len(&current) + 2 + para_len > max {
            flush(&mut chunks, &mut current);
        }

        if para_len > max {
            flush(&mut chunks, &mut current);
            let mut sentences = String::new();
            for sentence in paragraph.split_inclusive(". ") {
                for piece in hard_split(sentence, max) {
                    if !sentences.is_empty() && char_len(&sentences) + char_len(piece) > max {
                        flush(&mut chunks, &mut sentences);
                    }
                    sentences.push_str(piece);
                }
            }
            if !sentences.trim().is_empty() {
                current = sentences;
            }
        } else if current.is_empty() {
            current = paragraph.to_string();
        } else {
            current.push_str("\n\n");
            current.push_str(paragraph);
        }
    }

    flush(&mut chunks, &mut current);
    tracing::debug!(segments = chunks.len(), max_chars = max, "chunked speech text");
    chunks
}

/// [`prepare`] followed by [`chunk`].
pub fn speech_segments(markdown: &str, max_chars: usize) -> Vec<String> {
    chunk(&prepare(markdown), max_chars)
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn flush(chunks: &mut Vec<String>, buffer: &mut String) {
    let trimmed = buffer.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    buffer.clear();
}

/// Cuts `text` into pieces of at most `max` characters whose concatenation
/// is `text`.
fn hard_split(text: &str, max: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = text;

    while char_len(rest) > max {
        let limit = rest.char_indices().nth(max).map_or(rest.len(), |(i, _)| i);
        let window = &rest[..limit];
        let cut = window
            .char_indices()
            .filter(|(_, c)| c.is_whitespace())
            .last()
            .map_or(limit, |(i, c)| i + c.len_utf8());
        pieces.push(&rest[..cut]);
        rest = &rest[cut..];
    }

    if !rest.is_empty() {
        pieces.push(rest);
    }
    pieces
}
