//! Text- and link-density scoring for readability candidates.

use std::sync::LazyLock;

use regex::Regex;

use crate::parse::Element;

/// Weights used by [`calculate_score`].
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Weight for class/id names that suggest content.
    pub positive_weight: f64,
    /// Weight for class/id names that suggest boilerplate.
    pub negative_weight: f64,
    /// Cap on the character-count part of content density.
    pub max_char_density_score: f64,
    /// Cap on the comma-count part of content density.
    pub max_comma_density_score: f64,
    pub chars_per_point: usize,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            positive_weight: 25.0,
            negative_weight: -25.0,
            max_char_density_score: 3.0,
            max_comma_density_score: 3.0,
            chars_per_point: 100,
        }
    }
}

/// Breakdown of one element's score.
#[derive(Debug, Clone)]
pub struct ScoreResult {
    pub base_score: f64,
    pub class_weight: f64,
    pub content_density: f64,
    /// Ratio of link text to all text, 0.0 to 1.0.
    pub link_density: f64,
    pub final_score: f64,
}

static POSITIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story|tweet)")
        .expect("valid positive pattern")
});

static NEGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup|newsletter|unsubscribe)",
    )
    .expect("valid negative pattern")
});

/// Score contributed by the tag alone.
pub fn base_tag_score(element: &Element<'_>) -> f64 {
    match element.tag_name().as_str() {
        "article" => 10.0,
        "section" => 8.0,
        "div" => 5.0,
        "td" | "blockquote" => 3.0,
        "form" | "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" | "header" | "footer" | "nav" => -5.0,
        _ => 0.0,
    }
}

/// `positive_weight` if the id or any class looks like content,
/// `negative_weight` if it looks like boilerplate, else zero.
///
/// The id is checked before the classes; within each, a positive match wins.
pub fn class_id_weight(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    let names = element
        .attr("id")
        .into_iter()
        .chain(element.attr("class").into_iter().flat_map(str::split_whitespace));

    for name in names {
        if POSITIVE.is_match(name) {
            return config.positive_weight;
        }
        if NEGATIVE.is_match(name) {
            return config.negative_weight;
        }
    }
    0.0
}

/// One point per `chars_per_point` characters plus one per comma, each capped.
pub fn content_density_score(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    let text = element.text();
    let char_score = ((text.chars().count() / config.chars_per_point) as f64).min(config.max_char_density_score);
    let comma_score = (text.matches(',').count() as f64).min(config.max_comma_density_score);
    char_score + comma_score
}

pub fn link_density(element: &Element<'_>) -> f64 {
    let text_length = element.text().chars().count();
    if text_length == 0 {
        return 0.0;
    }

    let link_length: usize = element
        .select("a")
        .unwrap_or_default()
        .iter()
        .map(|link| link.text().chars().count())
        .sum();

    link_length as f64 / text_length as f64
}

/// `<pre>` blocks dominated by punctuation are code listings, not prose.
fn looks_like_code(tag_name: &str, text: &str) -> bool {
    if tag_name != "pre" || text.len() <= 50 {
        return false;
    }
    let len = text.len() as f64;
    let commas = text.matches(',').count() as f64 / len;
    let spaces = text.matches(' ').count() as f64 / len;
    let special = text.chars().filter(|c| !c.is_alphanumeric() && !c.is_whitespace()).count() as f64 / len;

    special > 0.15 && commas < 0.01 && spaces < 0.15
}

/// Combines tag, class/id, density and link-density into a final score.
///
/// The link-density penalty is halved for elements that look like content
/// by name or that carry more than 500 characters of text.
pub fn calculate_score(element: &Element<'_>, config: &ScoreConfig) -> ScoreResult {
    let base_score = base_tag_score(element);
    let class_weight = class_id_weight(element, config);
    let content_density = content_density_score(element, config);
    let ld = link_density(element);

    let text = element.text();
    let code_penalty = if looks_like_code(&element.tag_name(), &text) { -10.0 } else { 0.0 };
    let content_rich = text.chars().count() > 500;
    let link_penalty = if class_weight > 0.0 || content_rich { 1.0 - ld * 0.5 } else { 1.0 - ld };

    let final_score = (base_score + class_weight + content_density + code_penalty) * link_penalty;

    ScoreResult { base_score, class_weight, content_density, link_density: ld, final_score }
}
