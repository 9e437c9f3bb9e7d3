//! Readability extraction.
//!
//! [`Readability::extract`] turns a full HTML document into a title and a
//! main-content fragment. It never fails: when the document has no candidate
//! that clears the score threshold, the untouched `<body>` content is returned
//! with [`Extraction::fallback`] set, and a warning is logged.
//!
//! # Example
//!
//! ```rust
//! use lectern_core::Readability;
//!
//! let html = "<html><head><title>Hi</title></head><body><nav>Home</nav></body></html>";
//! let extraction = Readability::new().extract(html, None);
//! assert_eq!(extraction.title, "Hi");
//! assert!(extraction.fallback);
//! ```

use serde::{Deserialize, Serialize};
use url::Url;

use crate::extract::{ExtractConfig, extract_content};
use crate::parse::Document;
use crate::postprocess::PostProcessConfig;
use crate::preprocess::{PreprocessConfig, preprocess_html};

/// Title used when a page has none.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Configuration for the Readability builder.
///
/// # Example
///
/// ```rust
/// use lectern_core::ReadabilityConfig;
///
/// let config = ReadabilityConfig::builder()
///     .min_score(25.0)
///     .char_threshold(500)
///     .preserve_images(true)
///     .build();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadabilityConfig {
    /// Minimum score threshold for extraction (default: 20.0).
    pub min_score: f64,

    /// Minimum character count for valid content (default: 500).
    pub char_threshold: usize,

    /// Number of top candidates to track (default: 5).
    pub nb_top_candidates: usize,

    /// Maximum elements to parse (0 = unlimited, default: 0).
    pub max_elems_to_parse: usize,

    /// Whether to remove unlikely candidates (default: true).
    pub remove_unlikely: bool,

    /// Whether to preserve class attributes in output HTML (default: false).
    pub keep_classes: bool,

    /// Whether to preserve images in output HTML (default: true).
    pub preserve_images: bool,
}

impl Default for ReadabilityConfig {
    fn default() -> Self {
        Self {
            min_score: 20.0,
            char_threshold: 500,
            nb_top_candidates: 5,
            max_elems_to_parse: 0,
            remove_unlikely: true,
            keep_classes: false,
            preserve_images: true,
        }
    }
}

impl ReadabilityConfig {
    /// Creates a new builder for ReadabilityConfig.
    pub fn builder() -> ReadabilityConfigBuilder {
        ReadabilityConfigBuilder::new()
    }
}

/// Builder for ReadabilityConfig.
pub struct ReadabilityConfigBuilder {
    config: ReadabilityConfig,
}

impl ReadabilityConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: ReadabilityConfig::default() }
    }

    /// Sets the minimum score threshold.
    pub fn min_score(mut self, value: f64) -> Self {
        self.config.min_score = value;
        self
    }

    /// Sets the character threshold.
    pub fn char_threshold(mut self, value: usize) -> Self {
        self.config.char_threshold = value;
        self
    }

    /// Sets the number of top candidates.
    pub fn nb_top_candidates(mut self, value: usize) -> Self {
        self.config.nb_top_candidates = value;
        self
    }

    /// Sets the maximum elements to parse.
    pub fn max_elems_to_parse(mut self, value: usize) -> Self {
        self.config.max_elems_to_parse = value;
        self
    }

    /// Sets whether to remove unlikely candidates.
    pub fn remove_unlikely(mut self, value: bool) -> Self {
        self.config.remove_unlikely = value;
        self
    }

    /// Sets whether to preserve class attributes in output HTML.
    pub fn keep_classes(mut self, value: bool) -> Self {
        self.config.keep_classes = value;
        self
    }

    /// Sets whether to preserve images in output HTML.
    pub fn preserve_images(mut self, value: bool) -> Self {
        self.config.preserve_images = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> ReadabilityConfig {
        self.config
    }
}

impl Default for ReadabilityConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Title and main content of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub title: String,
    /// HTML fragment holding the main content.
    pub content_html: String,
    /// `true` when no subtree qualified and `content_html` is the raw body.
    pub fallback: bool,
}

/// Main entry point for content extraction.
#[derive(Debug, Clone, Default)]
pub struct Readability {
    config: ReadabilityConfig,
}

impl Readability {
    /// Creates a new Readability instance with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new Readability instance with a custom configuration.
    pub fn with_config(config: ReadabilityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReadabilityConfig {
        &self.config
    }

    /// Extracts the title and main content of `html`.
    ///
    /// With a `base_url`, links and images in the content are made absolute.
    pub fn extract(&self, html: &str, base_url: Option<&Url>) -> Extraction {
        let raw = Document::parse(html);
        let title = raw.extract_title().unwrap_or_else(|| DEFAULT_TITLE.to_string());

        let preprocess = PreprocessConfig {
            remove_unlikely: self.config.remove_unlikely,
            base_url: base_url.cloned(),
            ..Default::default()
        };
        let cleaned = Document::parse(&preprocess_html(html, &preprocess));

        match extract_content(&cleaned, &self.extract_config()) {
            Ok(extracted) => {
                tracing::debug!(
                    score = extracted.top_score,
                    elements = extracted.element_count,
                    bytes = extracted.content.len(),
                    "readability extracted main content"
                );
                Extraction { title, content_html: extracted.content, fallback: false }
            }
            Err(err) => {
                tracing::warn!(error = %err, "readability found no qualifying content, using the raw body");
                Extraction { title, content_html: raw.body_inner_html(), fallback: true }
            }
        }
    }

    fn extract_config(&self) -> ExtractConfig {
        ExtractConfig {
            min_score_threshold: self.config.min_score,
            max_top_candidates: self.config.nb_top_candidates,
            char_threshold: self.config.char_threshold,
            max_elements: self.config.max_elems_to_parse,
            sibling_threshold: 0.2,
            postprocess: PostProcessConfig {
                strip_images: !self.config.preserve_images,
                keep_classes: self.config.keep_classes,
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_HTML: &str = r##"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <title>Test Article</title>
            <meta name="author" content="Test Author">
        </head>
        <body>
            <nav class="menu"><a href="/">Home</a> <a href="/about">About</a></nav>
            <article class="main-content">
                <h1>Article Title</h1>
                <p>This is a long paragraph with lots of content to ensure it meets the character threshold.</p>
                <p>This is another long paragraph with plenty of content, text, commas, and meaningful sentences for scoring.</p>
                <p>A third paragraph with substantial content that should help boost the overall readability score. <a href="/more">More</a></p>
            </article>
        </body>
        </html>
    "##;

    #[test]
    fn test_readability_config_default() {
        let config = ReadabilityConfig::default();
        assert_eq!(config.min_score, 20.0);
        assert_eq!(config.char_threshold, 500);
        assert_eq!(config.nb_top_candidates, 5);
        assert_eq!(config.max_elems_to_parse, 0);
        assert!(config.remove_unlikely);
        assert!(!config.keep_classes);
        assert!(config.preserve_images);
    }

    #[test]
    fn test_readability_config_builder() {
        let config = ReadabilityConfig::builder()
            .min_score(30.0)
            .char_threshold(1000)
            .nb_top_candidates(10)
            .max_elems_to_parse(500)
            .remove_unlikely(false)
            .keep_classes(true)
            .preserve_images(false)
            .build();

        assert_eq!(config.min_score, 30.0);
        assert_eq!(config.char_threshold, 1000);
        assert_eq!(config.nb_top_candidates, 10);
        assert_eq!(config.max_elems_to_parse, 500);
        assert!(!config.remove_unlikely);
        assert!(config.keep_classes);
        assert!(!config.preserve_images);
    }

    #[test]
    fn test_extract_article() {
        let extraction = Readability::new().extract(ARTICLE_HTML, None);

        assert!(!extraction.fallback);
        assert_eq!(extraction.title, "Test Article");
        assert!(extraction.content_html.contains("another long paragraph"));
        assert!(!extraction.content_html.contains("About"));
    }

    #[test]
    fn test_extract_resolves_links() {
        let base = Url::parse("https://example.com/posts/1").unwrap();
        let extraction = Readability::new().extract(ARTICLE_HTML, Some(&base));
        assert!(extraction.content_html.contains(r#"href="https://example.com/more""#));
    }

    #[test]
    fn test_fallback_returns_raw_body() {
        let html = r#"<html><body><div class="sidebar"><span>tiny</span></div></body></html>"#;
        let extraction = Readability::new().extract(html, None);

        assert!(extraction.fallback);
        assert_eq!(extraction.title, DEFAULT_TITLE);
        assert_eq!(extraction.content_html, r#"<div class="sidebar"><span>tiny</span></div>"#);
    }

    #[test]
    fn test_fallback_on_garbage_input() {
        let extraction = Readability::new().extract("\u{0}<<<>>>not html", None);
        assert!(extraction.fallback);
        assert!(extraction.content_html.contains("not html"));
    }

    #[test]
    fn test_with_config() {
        let reader = Readability::with_config(ReadabilityConfig::builder().min_score(25.0).build());
        assert_eq!(reader.config().min_score, 25.0);
    }
}
