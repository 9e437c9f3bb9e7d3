//! Error types for Lectern operations.
//!
//! [`LecternError`] covers the whole ingestion pipeline: fetching a page,
//! parsing a MIME message, and rejecting documents that carry no usable
//! content. Structural problems inside the readability pass are *not*
//! surfaced here; the extractor falls back to the raw body instead.
//!
//! # Example
//!
//! ```rust
//! use lectern_core::{LecternError, Result};
//!
//! fn ensure_body(markdown: &str) -> Result<&str> {
//!     if markdown.trim().is_empty() {
//!         return Err(LecternError::EmptyContent);
//!     }
//!     Ok(markdown)
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ingestion operations.
///
/// Variants fall into three groups:
///
/// - fetch failures (network, status, timeout, bad URL), which a caller may
///   retry as a whole;
/// - malformed content (no body, too little text), which is terminal for that
///   document;
/// - local failures (I/O, configuration).
#[derive(Error, Debug)]
pub enum LecternError {
    /// HTTP request errors from reqwest.
    ///
    /// Wraps DNS failures, refused connections, TLS problems and body read errors.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status code.
    #[error("HTTP {status} returned for {url}")]
    HttpStatus { status: u16, url: String },

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML parsing errors, usually an invalid CSS selector.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// The readability score of the best candidate is below the threshold.
    #[error("Content is not readable (score {score} below threshold {threshold})")]
    NotReadable { score: f64, threshold: f64 },

    /// No candidate element was found at all.
    #[error("No content could be extracted from the document")]
    NoContent,

    /// The MIME message could not be parsed.
    #[error("Malformed email: {0}")]
    MalformedEmail(String),

    /// The email has neither a `text/html` nor a `text/plain` part.
    #[error("Email has no text/html or text/plain content")]
    MissingBody,

    /// The extracted Markdown is shorter than the minimum length.
    #[error("Extracted content too short ({length} chars, minimum {minimum})")]
    ContentTooShort { length: usize, minimum: usize },

    /// The extracted Markdown is empty.
    #[error("Extracted content is empty")]
    EmptyContent,

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (unreadable or invalid config file).
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LecternError {
    /// Whether this error came from fetching a page.
    ///
    /// Fetch failures are never retried by the pipeline; the caller decides
    /// whether to retry the whole ingestion.
    pub fn is_fetch_failure(&self) -> bool {
        match self {
            #[cfg(feature = "fetch")]
            LecternError::Http(_) => true,
            LecternError::HttpStatus { .. } | LecternError::Timeout { .. } | LecternError::InvalidUrl(_) => true,
            _ => false,
        }
    }

    /// Whether the document was rejected as un-ingestible.
    pub fn is_malformed_content(&self) -> bool {
        matches!(
            self,
            LecternError::MalformedEmail(_)
                | LecternError::MissingBody
                | LecternError::ContentTooShort { .. }
                | LecternError::EmptyContent
        )
    }
}

impl From<mailparse::MailParseError> for LecternError {
    fn from(err: mailparse::MailParseError) -> Self {
        LecternError::MalformedEmail(err.to_string())
    }
}

impl From<serde_json::Error> for LecternError {
    fn from(err: serde_json::Error) -> Self {
        LecternError::ConfigError(err.to_string())
    }
}

/// Result type alias for LecternError.
pub type Result<T> = std::result::Result<T, LecternError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LecternError::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_content_too_short_message() {
        let err = LecternError::ContentTooShort { length: 7, minimum: 20 };
        assert!(err.to_string().contains('7'));
        assert!(err.to_string().contains("20"));
    }

    #[test]
    fn test_classification() {
        assert!(LecternError::Timeout { timeout: 30 }.is_fetch_failure());
        assert!(LecternError::HttpStatus { status: 404, url: "https://example.com".into() }.is_fetch_failure());
        assert!(!LecternError::MissingBody.is_fetch_failure());

        assert!(LecternError::MissingBody.is_malformed_content());
        assert!(LecternError::EmptyContent.is_malformed_content());
        assert!(!LecternError::NoContent.is_malformed_content());
    }

    #[test]
    fn test_http_status_message() {
        let err = LecternError::HttpStatus { status: 503, url: "https://example.com/a".to_string() };
        assert_eq!(err.to_string(), "HTTP 503 returned for https://example.com/a");
    }
}
