//! Candidate selection for the readability pass.
//!
//! 1. Score every block-level candidate ([`crate::scoring`]).
//! 2. Add half of each candidate's score to its parent and a third to its
//!    grandparent.
//! 3. Keep the best-scoring candidate, provided it clears the threshold.
//! 4. Join it with qualifying siblings, in document order.
//! 5. Clean the result ([`crate::postprocess`]).

use std::cmp::Ordering;
use std::collections::HashMap;

use ego_tree::NodeId;

use crate::parse::{Document, Element};
use crate::postprocess::{PostProcessConfig, postprocess_html};
use crate::scoring::{ScoreConfig, calculate_score, link_density};
use crate::{LecternError, Result};

/// Configuration for content extraction.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Minimum score the top candidate must reach.
    pub min_score_threshold: f64,
    /// Candidates kept after ranking.
    pub max_top_candidates: usize,
    /// Non-sectioning candidates need at least a tenth of this in text.
    pub char_threshold: usize,
    /// Cap on scanned candidates (0 = unlimited).
    pub max_elements: usize,
    /// A sibling joins the output if it scores this fraction of the top score.
    pub sibling_threshold: f64,
    pub postprocess: PostProcessConfig,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            min_score_threshold: 20.0,
            max_top_candidates: 5,
            char_threshold: 500,
            max_elements: 1000,
            sibling_threshold: 0.2,
            postprocess: PostProcessConfig::default(),
        }
    }
}

/// Result of content extraction.
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    /// Cleaned HTML fragment holding the main content.
    pub content: String,
    pub top_score: f64,
    /// Number of top-level elements joined into `content`.
    pub element_count: usize,
}

#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    element: Element<'a>,
    score: f64,
}

const CANDIDATE_SELECTOR: &str = "div, article, section, main, p, td, pre, blockquote";

fn identify_candidates<'a>(doc: &'a Document, config: &ExtractConfig, score_config: &ScoreConfig) -> Vec<Candidate<'a>> {
    let limit = if config.max_elements == 0 { usize::MAX } else { config.max_elements };

    doc.select(CANDIDATE_SELECTOR)
        .unwrap_or_default()
        .into_iter()
        .take(limit)
        .filter(|element| {
            matches!(element.tag_name().as_str(), "article" | "section" | "main")
                || element.text().chars().count() >= config.char_threshold / 10
        })
        .map(|element| Candidate { element, score: calculate_score(&element, score_config).final_score })
        .collect()
}

/// Returns every scored node keyed by id, ancestors boosted by their
/// candidates' initial scores.
fn propagate_scores<'a>(candidates: &[Candidate<'a>], score_config: &ScoreConfig) -> HashMap<NodeId, Candidate<'a>> {
    let mut scored: HashMap<NodeId, Candidate<'a>> =
        candidates.iter().map(|candidate| (candidate.element.id(), *candidate)).collect();

    for candidate in candidates {
        let mut ancestor = candidate.element.parent();
        for divisor in [2.0, 3.0] {
            let Some(current) = ancestor.filter(|el| !matches!(el.tag_name().as_str(), "html" | "head")) else {
                break;
            };
            let entry = scored
                .entry(current.id())
                .or_insert_with(|| Candidate { element: current, score: calculate_score(&current, score_config).final_score });
            entry.score += candidate.score / divisor;
            ancestor = current.parent();
        }
    }

    scored
}

fn compare_candidates(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    a.score
        .partial_cmp(&b.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| candidate_priority(&a.element.tag_name()).cmp(&candidate_priority(&b.element.tag_name())))
        .then_with(|| a.element.text().chars().count().cmp(&b.element.text().chars().count()))
}

fn candidate_priority(tag_name: &str) -> u8 {
    match tag_name {
        "article" | "main" | "section" => 3,
        "div" => 2,
        _ => 1,
    }
}

fn is_sibling_worthy(sibling: &Element<'_>, scored: &HashMap<NodeId, Candidate<'_>>, threshold: f64) -> bool {
    if scored.get(&sibling.id()).is_some_and(|c| c.score >= threshold) {
        return true;
    }
    if sibling.tag_name() == "p" {
        let length = sibling.text().trim().chars().count();
        return length > 80 && link_density(sibling) < 0.25;
    }
    false
}

/// Extracts the main content of `doc`.
///
/// # Errors
///
/// [`LecternError::NoContent`] when nothing qualifies as a candidate and
/// [`LecternError::NotReadable`] when the best candidate scores below
/// `min_score_threshold`.
pub fn extract_content(doc: &Document, config: &ExtractConfig) -> Result<ExtractedContent> {
    let score_config = ScoreConfig::default();

    let candidates = identify_candidates(doc, config, &score_config);
    if candidates.is_empty() {
        return Err(LecternError::NoContent);
    }

    let scored = propagate_scores(&candidates, &score_config);
    let mut ranked: Vec<Candidate<'_>> = scored.values().copied().collect();
    ranked.sort_by(|a, b| compare_candidates(b, a));
    ranked.truncate(config.max_top_candidates.max(1));

    let top = ranked[0];
    tracing::debug!(tag = %top.element.tag_name(), score = top.score, candidates = scored.len(), "top candidate");

    if top.score < config.min_score_threshold {
        return Err(LecternError::NotReadable { score: top.score, threshold: config.min_score_threshold });
    }

    let sibling_threshold = (top.score * config.sibling_threshold).max(10.0);
    let parts: Vec<Element<'_>> = match top.element.parent() {
        Some(parent) => parent
            .children()
            .into_iter()
            .filter(|child| child.id() == top.element.id() || is_sibling_worthy(child, &scored, sibling_threshold))
            .collect(),
        None => vec![top.element],
    };

    let joined = parts.iter().map(Element::outer_html).collect::<Vec<_>>().join("\n");
    let content = postprocess_html(&joined, &config.postprocess);

    Ok(ExtractedContent { content, top_score: top.score, element_count: parts.len() })
}
