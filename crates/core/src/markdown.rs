//! Markdown emission.
//!
//! [`to_markdown`] converts a cleaned HTML fragment with ATX headings, `-`
//! bullets and fenced code, then collapses blank-line runs so the output never
//! holds more than one empty line in a row. [`render_document`] adds TOML
//! front matter for storage.

use std::sync::LazyLock;

use regex::Regex;
use time::format_description::well_known::Rfc3339;

use crate::article::ExtractedArticle;

static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").expect("valid blank-run regex"));

/// Converts an HTML fragment to Markdown.
///
/// ```rust
/// use lectern_core::markdown::to_markdown;
///
/// let md = to_markdown("<h2>Intro</h2><ul><li>one</li></ul>");
/// assert!(md.starts_with("## Intro"));
/// assert!(md.contains("- one"));
/// ```
pub fn to_markdown(content_html: &str) -> String {
    let converted = html_to_markdown(content_html);
    collapse_blank_lines(&converted).trim().to_string()
}

/// Replaces every run of three or more newlines with exactly two.
///
/// Lines holding only spaces or tabs count as blank.
pub fn collapse_blank_lines(markdown: &str) -> String {
    let unified = markdown.replace("\r\n", "\n");
    BLANK_RUNS.replace_all(&unified, "\n\n").into_owned()
}

#[cfg(feature = "markdown")]
fn html_to_markdown(html: &str) -> String {
    use htmd::HtmlToMarkdown;
    use htmd::options::{BulletListMarker, CodeBlockStyle, HeadingStyle, Options};

    let converter = HtmlToMarkdown::builder()
        .options(Options {
            heading_style: HeadingStyle::Atx,
            bullet_list_marker: BulletListMarker::Dash,
            ul_bullet_spacing: 1,
            ol_number_spacing: 1,
            code_block_style: CodeBlockStyle::Fenced,
            ..Default::default()
        })
        .build();

    match converter.convert(html) {
        Ok(markdown) => markdown,
        Err(err) => {
            tracing::warn!(error = %err, "markdown conversion failed, emitting plain text");
            plain_text(html)
        }
    }
}

/// Fallback HTML to text conversion when markdown feature is disabled
#[cfg(not(feature = "markdown"))]
fn html_to_markdown(html: &str) -> String {
    plain_text(html)
}

fn plain_text(html: &str) -> String {
    scraper::Html::parse_fragment(html).root_element().text().collect()
}

/// Markdown prefixed with `+++` TOML front matter describing the article.
///
/// Keys: `title`, `author`, `source`, `url`, `published`, `word_count`,
/// `reading_time`. Absent values are left out.
pub fn render_document(article: &ExtractedArticle) -> String {
    let mut out = String::from("+++");
    out.push_str(&format!("\ntitle = {}", toml_escape_string(&article.title)));

    if let Some(author) = &article.author {
        out.push_str(&format!("\nauthor = {}", toml_escape_string(author)));
    }
    if let Some(source) = article.source_name() {
        out.push_str(&format!("\nsource = {}", toml_escape_string(&source)));
    }
    if !article.canonical_url.is_empty() {
        out.push_str(&format!("\nurl = {}", toml_escape_string(&article.canonical_url)));
    }
    if let Some(published) = article.published_at()
        && let Ok(stamp) = published.format(&Rfc3339)
    {
        out.push_str(&format!("\npublished = {}", toml_escape_string(&stamp)));
    }

    out.push_str(&format!("\nword_count = {}", article.word_count));
    out.push_str(&format!("\nreading_time = {}", article.reading_time_minutes));
    out.push_str("\n+++\n\n");
    out.push_str(&article.content_markdown);
    out.push('\n');
    out
}

/// Escape a string for TOML format
fn toml_escape_string(s: &str) -> String {
    let needs_escape = s.contains('"') || s.contains('\\') || s.contains('\n');
    if needs_escape {
        format!(
            "\"{}\"",
            s.replace('\\', "\\\\").replace('\"', "\\\"").replace('\n', "\\n")
        )
    } else {
        format!("\"{}\"", s)
    }
}
