//! Turns web pages and raw email into clean Markdown and speech-ready text.
//!
//! ```rust,no_run
//! use lectern_core::{Pipeline, PipelineConfig};
//!
//! # async fn run() -> lectern_core::Result<()> {
//! let pipeline = Pipeline::with_config(PipelineConfig::load_default()?);
//! let article = pipeline.fetch_and_extract("https://example.com/post").await?;
//! for segment in pipeline.speech_segments(&article) {
//!     println!("{segment}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod article;
pub mod config;
pub mod email;
pub mod error;
pub mod extract;
#[cfg(feature = "fetch")]
pub mod fetch;
pub mod images;
pub mod markdown;
pub mod metadata;
pub mod parse;
pub mod pipeline;
pub mod postprocess;
pub mod preprocess;
pub mod readability;
pub mod sanitize;
pub mod scoring;
pub mod speech;
pub mod tree;

pub use article::{EmailOrigin, ExtractedArticle, RawDocument};
pub use config::{FetchConfig, ImageRecoveryConfig, PipelineConfig, PipelineConfigBuilder, SanitizeConfig, SpeechConfig};
pub use email::{EmailMessage, parse_email, parse_email_file};
pub use error::{LecternError, Result};
#[doc(hidden)]
pub use extract::{ExtractConfig, ExtractedContent, extract_content};
#[cfg(feature = "fetch")]
pub use fetch::{FetchedPage, fetch_page};
pub use images::{AnchorMatch, ContentImage, Placement, Reinjection, collect, reinject, reinject_images};
pub use markdown::{render_document, to_markdown};
pub use parse::{Document, Element};
pub use pipeline::{BatchReport, Pipeline};
#[doc(hidden)]
pub use postprocess::{PostProcessConfig, postprocess_html};
#[doc(hidden)]
pub use preprocess::{PreprocessConfig, preprocess_html};
pub use readability::{Extraction, Readability, ReadabilityConfig, ReadabilityConfigBuilder};
pub use sanitize::{sanitize, sanitize_html, strip_tracking_params};
pub use speech::{chunk, prepare, speech_segments};
pub use tree::{NodeId, ParsedTree};
