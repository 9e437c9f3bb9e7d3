//! Pipeline configuration.
//!
//! Every stage reads its knobs from one [`PipelineConfig`]. The heuristic
//! tables (tracking parameters, tracking hosts, spacer filenames, content
//! container classes) are immutable `const` data; a config starts from them
//! and may replace any of them wholesale.
//!
//! # Example
//!
//! ```rust
//! use lectern_core::PipelineConfig;
//!
//! let config = PipelineConfig::builder()
//!     .timeout(10)
//!     .max_chunk_chars(2000)
//!     .build();
//! assert!(config.validate().is_ok());
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::readability::ReadabilityConfig;
use crate::{LecternError, Result};

/// Query parameters dropped from links. Compared case-insensitively.
pub const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_content",
    "utm_term",
    "mc_cid",
    "mc_eid",
    "ref",
    "ref_src",
    "s",
    "sref",
    "fbclid",
    "gclid",
];

/// Substrings of `<img src>` values served by open-tracking beacons.
pub const TRACKING_SRC_PATTERNS: &[&str] = &[
    "open.substack.com",
    "list-manage.com/track",
    "mailchimp.com/track",
    "email.mg.",
    "/beacon",
    "/track/open",
    "/pixel",
    "trk.klclick",
];

/// Substrings of `<img src>` values that identify layout spacers.
pub const SPACER_SRC_PATTERNS: &[&str] = &["trans_1x1", "spacer"];

/// Class names that locate the main content container, tried in order.
pub const CONTENT_CLASS_SELECTORS: &[&str] = &["body markup", "post-content", "article-content", "entry-content"];

/// Class markers for `<div>` elements that wrap a single image.
pub const IMAGE_WRAPPER_MARKERS: &[&str] = &["image-container"];

/// Default maximum size of one speech segment, in characters.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 4000;

/// HTTP settings for the web fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Identifying User-Agent string.
    pub user_agent: String,
    /// Redirects followed before giving up.
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 30, user_agent: "Lectern/0.1 (reading assistant)".to_string(), max_redirects: 10 }
    }
}

/// Tables used by the tracking and layout sanitizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizeConfig {
    pub tracking_params: Vec<String>,
    pub tracking_src_patterns: Vec<String>,
    pub spacer_src_patterns: Vec<String>,
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            tracking_params: to_owned(TRACKING_PARAMS),
            tracking_src_patterns: to_owned(TRACKING_SRC_PATTERNS),
            spacer_src_patterns: to_owned(SPACER_SRC_PATTERNS),
        }
    }
}

/// Settings for image position recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageRecoveryConfig {
    /// Class-name fragments tried in order; the first element whose `class`
    /// contains one becomes the content container.
    pub content_class_selectors: Vec<String>,
    pub image_wrapper_markers: Vec<String>,
    /// Number of trailing characters kept as the anchor.
    pub anchor_chars: usize,
}

impl Default for ImageRecoveryConfig {
    fn default() -> Self {
        Self {
            content_class_selectors: to_owned(CONTENT_CLASS_SELECTORS),
            image_wrapper_markers: to_owned(IMAGE_WRAPPER_MARKERS),
            anchor_chars: 80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub max_chunk_chars: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self { max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS }
    }
}

/// Complete configuration for the ingestion pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub fetch: FetchConfig,
    pub sanitize: SanitizeConfig,
    pub images: ImageRecoveryConfig,
    pub readability: ReadabilityConfig,
    pub speech: SpeechConfig,
}

impl PipelineConfig {
    /// Creates a new builder for PipelineConfig.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }

    /// Loads a JSON config file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`LecternError::FileNotFound`] if `path` does not exist and
    /// [`LecternError::ConfigError`] if the file is not valid JSON or fails
    /// [`PipelineConfig::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LecternError::FileNotFound(path.to_path_buf()));
        }

        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;

        tracing::debug!(path = %path.display(), "loaded pipeline config");
        Ok(config)
    }

    /// Loads `<config dir>/lectern/config.json` if it exists, defaults otherwise.
    pub fn load_default() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Rejects settings no stage can work with.
    pub fn validate(&self) -> Result<()> {
        if self.speech.max_chunk_chars == 0 {
            return Err(LecternError::ConfigError("speech.max_chunk_chars must be greater than 0".to_string()));
        }
        if self.fetch.timeout == 0 {
            return Err(LecternError::ConfigError("fetch.timeout must be greater than 0".to_string()));
        }
        if self.images.anchor_chars == 0 {
            return Err(LecternError::ConfigError("images.anchor_chars must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// Location of the user-level config file.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lectern").join("config.json"))
}

/// Builder for PipelineConfig.
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self { config: PipelineConfig::default() }
    }

    /// Sets the fetch timeout in seconds.
    pub fn timeout(mut self, secs: u64) -> Self {
        self.config.fetch.timeout = secs;
        self
    }

    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.config.fetch.user_agent = value.into();
        self
    }

    pub fn max_redirects(mut self, value: usize) -> Self {
        self.config.fetch.max_redirects = value;
        self
    }

    /// Replaces the tracking query-parameter denylist.
    pub fn tracking_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.sanitize.tracking_params = params.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the tracking-host/path denylist for images.
    pub fn tracking_src_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.sanitize.tracking_src_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the ordered content-container class list.
    pub fn content_class_selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.images.content_class_selectors = selectors.into_iter().map(Into::into).collect();
        self
    }

    pub fn readability(mut self, value: ReadabilityConfig) -> Self {
        self.config.readability = value;
        self
    }

    pub fn max_chunk_chars(mut self, value: usize) -> Self {
        self.config.speech.max_chunk_chars = value;
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn to_owned(table: &[&str]) -> Vec<String> {
    table.iter().map(|s| s.to_string()).collect()
}
