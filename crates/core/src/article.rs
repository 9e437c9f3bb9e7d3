//! Pipeline input and output records.
//!
//! [`RawDocument`] is what the pipeline consumes and [`ExtractedArticle`] is
//! what it hands to storage and indexing. Articles are complete or absent:
//! the pipeline never returns a partially filled record.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use url::Url;

/// Words read per minute when estimating reading time.
pub const WORDS_PER_MINUTE: usize = 250;

const MAX_SLUG_CHARS: usize = 80;

static SLUG_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"));

/// A document waiting to be extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawDocument {
    /// A fetched page. `final_url` is the address after redirects.
    WebPage { html: String, final_url: String },
    /// One RFC 5322 message, undecoded.
    EmailMessage { mime_bytes: Vec<u8> },
}

/// Header data carried by articles that came from email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailOrigin {
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub sender_name: String,
    pub sender_email: String,
}

/// The pipeline's output for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedArticle {
    pub title: String,
    pub author: Option<String>,
    pub content_markdown: String,
    /// Post-redirect URL for web pages, empty for email.
    pub canonical_url: String,
    /// Present only for articles parsed from email.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email: Option<EmailOrigin>,
    pub word_count: usize,
    pub reading_time_minutes: usize,
}

impl ExtractedArticle {
    /// Builds a web article, deriving word count and reading time.
    pub fn web(title: String, author: Option<String>, content_markdown: String, canonical_url: String) -> Self {
        let word_count = word_count(&content_markdown);
        Self {
            title,
            author,
            content_markdown,
            canonical_url,
            email: None,
            word_count,
            reading_time_minutes: reading_time_minutes(word_count),
        }
    }

    /// Builds an email article. The sender's display name doubles as author.
    pub fn email(title: String, content_markdown: String, origin: EmailOrigin) -> Self {
        let word_count = word_count(&content_markdown);
        Self {
            title,
            author: Some(origin.sender_name.clone()),
            content_markdown,
            canonical_url: String::new(),
            email: Some(origin),
            word_count,
            reading_time_minutes: reading_time_minutes(word_count),
        }
    }

    pub fn is_email(&self) -> bool {
        self.email.is_some()
    }

    pub fn published_at(&self) -> Option<OffsetDateTime> {
        self.email.as_ref().and_then(|origin| origin.published_at)
    }

    /// Human-readable name of where the article came from.
    ///
    /// Web: the URL host without a leading `www.`. Email: the sender's name,
    /// or the local part of the address when the name is empty.
    pub fn source_name(&self) -> Option<String> {
        if let Some(origin) = &self.email {
            let name = origin.sender_name.trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
            return origin
                .sender_email
                .split('@')
                .next()
                .filter(|local| !local.is_empty())
                .map(str::to_string);
        }

        let url = Url::parse(&self.canonical_url).ok()?;
        let host = url.host_str()?;
        Some(host.strip_prefix("www.").unwrap_or(host).to_string())
    }

    /// File-safe slug dated by the publication date, or today (UTC) when unknown.
    pub fn slug(&self) -> String {
        let date = self.published_at().unwrap_or_else(OffsetDateTime::now_utc).date();
        slug_for(&self.title, date)
    }
}

/// Whitespace-separated word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Whole minutes needed to read `words`, never less than one.
pub fn reading_time_minutes(words: usize) -> usize {
    words.div_ceil(WORDS_PER_MINUTE).max(1)
}

/// `YYYY-MM-DD_title-words`, the title part capped at 80 characters.
///
/// ```rust
/// use lectern_core::article::slug_for;
/// use time::macros::date;
///
/// assert_eq!(slug_for("Hello, World!", date!(2024 - 03 - 09)), "2024-03-09_hello-world");
/// ```
pub fn slug_for(title: &str, date: Date) -> String {
    let lowered = title.to_lowercase();
    let dashed = SLUG_SEPARATOR.replace_all(&lowered, "-");
    let truncated: String = dashed.trim_matches('-').chars().take(MAX_SLUG_CHARS).collect();
    format!(
        "{:04}-{:02}-{:02}_{}",
        date.year(),
        u8::from(date.month()),
        date.day(),
        truncated.trim_end_matches('-')
    )
}

/// `slug`, or `slug-2`, `slug-3`, … if `<dir>/<slug>.<extension>` is taken.
pub fn unique_slug(slug: &str, dir: &Path, extension: &str) -> String {
    if !dir.join(format!("{slug}.{extension}")).exists() {
        return slug.to_string();
    }
    let mut n = 2;
    while dir.join(format!("{slug}-{n}.{extension}")).exists() {
        n += 1;
    }
    format!("{slug}-{n}")
}
