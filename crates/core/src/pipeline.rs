//! End-to-end ingestion.
//!
//! [`Pipeline`] strings the stages together:
//!
//! - web: sanitize → collect images → readability → reinject images →
//!   Markdown
//! - email: MIME parse → sanitize → readability → Markdown
//!
//! Each call owns its document tree from start to finish, so a `Pipeline`
//! can be shared freely between concurrent ingestions.

use std::fs;
use std::path::{Path, PathBuf};

use url::Url;

use crate::article::{ExtractedArticle, RawDocument};
use crate::config::PipelineConfig;
use crate::images::{Placement, collect_from_tree, reinject};
use crate::markdown::to_markdown;
use crate::parse::Document;
use crate::readability::Readability;
use crate::sanitize::sanitize;
use crate::speech::speech_segments;
use crate::tree::ParsedTree;
use crate::{LecternError, Result, email};

/// Outcome of importing a directory of messages.
///
/// Every file is either processed or failed; one failure never stops the
/// rest of the batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: Vec<(PathBuf, ExtractedArticle)>,
    pub failed: Vec<(PathBuf, LecternError)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.processed.len() + self.failed.len()
    }

    /// `true` when there was at least one file and none of them succeeded.
    pub fn all_failed(&self) -> bool {
        self.processed.is_empty() && !self.failed.is_empty()
    }
}

/// Runs extractions with one configuration.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
    readability: Readability,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        let readability = Readability::with_config(config.readability.clone());
        Self { config, readability }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extracts an article from an already fetched page.
    ///
    /// `final_url` is the post-redirect address: it becomes the canonical URL
    /// and the base for resolving relative links and images.
    ///
    /// # Errors
    ///
    /// [`LecternError::EmptyContent`] when nothing survives as Markdown.
    pub fn extract_web(&self, html: &str, final_url: &str) -> Result<ExtractedArticle> {
        let base = Url::parse(final_url).ok();

        let tree = sanitize(ParsedTree::parse_document(html), &self.config.sanitize);
        let images = collect_from_tree(&tree, &self.config.images, base.as_ref());
        let extraction = self.readability.extract(&tree.to_html(), base.as_ref());
        let reinjection = reinject(&extraction.content_html, &images);

        let anchored = reinjection.placements.iter().filter(|(_, p)| *p == Placement::Anchored).count();
        tracing::debug!(
            collected = images.len(),
            reinjected = reinjection.placements.len(),
            anchored,
            fallback = extraction.fallback,
            "recovered images"
        );

        let author = Document::parse(html).extract_author();
        let markdown = to_markdown(&reinjection.content_html);
        if markdown.is_empty() {
            return Err(LecternError::EmptyContent);
        }

        tracing::info!(url = final_url, title = %extraction.title, chars = markdown.len(), "extracted web page");
        Ok(ExtractedArticle::web(extraction.title, author, markdown, final_url.to_string()))
    }

    /// Fetches `url` and extracts it.
    #[cfg(feature = "fetch")]
    pub async fn fetch_and_extract(&self, url: &str) -> Result<ExtractedArticle> {
        let page = crate::fetch::fetch_page(url, &self.config.fetch).await?;
        self.extract_web(&page.html, &page.final_url)
    }

    /// Extracts an article from one raw MIME message.
    pub fn parse_email(&self, raw: &[u8]) -> Result<ExtractedArticle> {
        email::parse_email(raw, &self.config)
    }

    pub fn parse_email_file(&self, path: impl AsRef<Path>) -> Result<ExtractedArticle> {
        email::parse_email_file(path, &self.config)
    }

    /// Parses every `*.eml` file in `dir`, in file-name order.
    ///
    /// # Errors
    ///
    /// Only when `dir` itself cannot be listed; per-file failures land in
    /// [`BatchReport::failed`].
    pub fn import_email_dir(&self, dir: impl AsRef<Path>) -> Result<BatchReport> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(LecternError::FileNotFound(dir.to_path_buf()));
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("eml")))
            .collect();
        paths.sort();

        let mut report = BatchReport::default();
        for path in paths {
            match self.parse_email_file(&path) {
                Ok(article) => report.processed.push((path, article)),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "failed to import email");
                    report.failed.push((path, err));
                }
            }
        }

        tracing::info!(processed = report.processed.len(), failed = report.failed.len(), "imported email directory");
        Ok(report)
    }

    /// Extracts either kind of raw document.
    pub fn extract(&self, document: &RawDocument) -> Result<ExtractedArticle> {
        match document {
            RawDocument::WebPage { html, final_url } => self.extract_web(html, final_url),
            RawDocument::EmailMessage { mime_bytes } => self.parse_email(mime_bytes),
        }
    }

    /// Speech-ready segments of an article, in reading order.
    pub fn speech_segments(&self, article: &ExtractedArticle) -> Vec<String> {
        speech_segments(&article.content_markdown, self.config.speech.max_chunk_chars)
    }
}
