//! Streaming cleanup run before readability scoring.
//!
//! Everything here is a `lol_html` rewrite over the raw markup; a rewrite that
//! fails hands back its input unchanged.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Configuration for HTML preprocessing.
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Tags dropped together with their content.
    pub strip_tags: Vec<&'static str>,
    /// Unwrap elements whose class/id look like boilerplate.
    pub remove_unlikely: bool,
    /// Drop inline-hidden elements.
    pub remove_hidden: bool,
    /// Base URL for making `href`/`src` absolute.
    pub base_url: Option<Url>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            strip_tags: vec!["script", "style", "noscript", "iframe", "svg", "canvas", "form", "button"],
            remove_unlikely: true,
            remove_hidden: true,
            base_url: None,
        }
    }
}

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment pattern"));

static UNLIKELY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup)",
    )
    .expect("valid unlikely pattern")
});

static MAYBE_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story|tweet)")
        .expect("valid candidate pattern")
});

static HIDDEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(display\s*:\s*none|visibility\s*:\s*hidden)").expect("valid hidden pattern"));

static PRE_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<pre\b.*?</pre>").expect("valid pre pattern"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Runs every enabled cleanup step over `html`.
pub fn preprocess_html(html: &str, config: &PreprocessConfig) -> String {
    let mut processed = remove_tags(html, &config.strip_tags);
    processed = COMMENT.replace_all(&processed, "").into_owned();

    if config.remove_unlikely {
        processed = remove_unlikely_candidates(&processed);
    }
    if config.remove_hidden {
        processed = remove_hidden_elements(&processed);
    }
    if let Some(base_url) = &config.base_url {
        processed = convert_relative_urls(&processed, base_url);
    }

    normalize_whitespace(&processed)
}

fn rewrite(html: &str, settings: lol_html::Settings<'_, '_>) -> String {
    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = lol_html::HtmlRewriter::new(settings, |chunk: &[u8]| output.extend_from_slice(chunk));

    if rewriter.write(html.as_bytes()).is_err() {
        return html.to_string();
    }
    if rewriter.end().is_err() {
        return html.to_string();
    }

    if output.is_empty() { html.to_string() } else { String::from_utf8_lossy(&output).into_owned() }
}

fn remove_tags(html: &str, tags: &[&str]) -> String {
    if tags.is_empty() {
        return html.to_string();
    }
    let selector = tags.join(", ");
    rewrite(
        html,
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!(selector, |el| {
                el.remove();
                Ok(())
            })],
            ..Default::default()
        },
    )
}

fn unlikely(name: &str) -> bool {
    UNLIKELY.is_match(name) && !MAYBE_CANDIDATE.is_match(name)
}

/// Unwraps elements whose id or a class names boilerplate, unless the same
/// name also suggests content.
fn remove_unlikely_candidates(html: &str) -> String {
    rewrite(
        html,
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!("*", |el| {
                let id_hit = el.get_attribute("id").is_some_and(|id| unlikely(&id));
                let class_hit = el
                    .get_attribute("class")
                    .is_some_and(|class| class.split_whitespace().any(unlikely));
                if id_hit || class_hit {
                    el.remove_and_keep_content();
                }
                Ok(())
            })],
            ..Default::default()
        },
    )
}

fn remove_hidden_elements(html: &str) -> String {
    rewrite(
        html,
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!("[style]", |el| {
                if el.get_attribute("style").is_some_and(|style| HIDDEN.is_match(&style)) {
                    el.remove();
                }
                Ok(())
            })],
            ..Default::default()
        },
    )
}

/// Makes `<a href>`, `<img src>` and `<link href>` absolute against `base_url`.
pub fn convert_relative_urls(html: &str, base_url: &Url) -> String {
    rewrite(
        html,
        lol_html::Settings {
            element_content_handlers: vec![
                lol_html::element!("a[href], link[href]", |el| {
                    if let Some(href) = el.get_attribute("href")
                        && let Ok(absolute) = base_url.join(&href)
                    {
                        el.set_attribute("href", absolute.as_str()).ok();
                    }
                    Ok(())
                }),
                lol_html::element!("img[src]", |el| {
                    if let Some(src) = el.get_attribute("src")
                        && let Ok(absolute) = base_url.join(&src)
                    {
                        el.set_attribute("src", absolute.as_str()).ok();
                    }
                    Ok(())
                }),
            ],
            ..Default::default()
        },
    )
}

/// Collapses whitespace runs to one space everywhere except inside `<pre>`.
fn normalize_whitespace(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for block in PRE_BLOCK.find_iter(html) {
        out.push_str(&WHITESPACE.replace_all(&html[last..block.start()], " "));
        out.push_str(block.as_str());
        last = block.end();
    }
    out.push_str(&WHITESPACE.replace_all(&html[last..], " "));
    out
}
