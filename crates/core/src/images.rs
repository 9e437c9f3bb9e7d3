//! Image position recovery.
//!
//! Readability scoring drops most `<figure>` blocks because they carry little
//! text. Before extraction, [`collect`] records every content image together
//! with the tail of the text that preceded it; after extraction, [`reinject`]
//! puts each image that went missing back after the first block whose text
//! ends with, or contains, that anchor.
//!
//! Matching is a heuristic. A miss is not an error: the image is appended at
//! the end of the content and the placement is reported as
//! [`Placement::Appended`].

use std::collections::HashSet;

use scraper::Selector;
use serde::Serialize;
use url::Url;

use crate::config::ImageRecoveryConfig;
use crate::tree::{NodeId, ParsedTree};

/// Tags searched for an anchor during reinjection.
const ANCHOR_BLOCKS: &str = "p, h1, h2, h3, h4, h5, h6, blockquote, li";

/// A content image seen before extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentImage {
    pub src: String,
    pub alt: String,
    /// Text of the nested `<figcaption>`, empty when there is none.
    pub caption: String,
    /// Trailing text of the closest preceding block, empty when none.
    pub anchor: String,
}

/// Outcome of searching for an anchor among candidate blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorMatch {
    /// Index of the first matching block.
    Found(usize),
    NoMatch,
}

/// Where a reinjected image ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Right after the block holding its anchor.
    Anchored,
    /// At the end of the content.
    Appended,
}

/// Result of [`reinject`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reinjection {
    pub content_html: String,
    /// One entry per reinjected image, by `src`, in insertion order.
    pub placements: Vec<(String, Placement)>,
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Last `n` characters of `text`.
fn tail_chars(text: &str, n: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(n)).collect()
}

fn first_descendant(tree: &ParsedTree, id: NodeId, selector: &Selector) -> Option<NodeId> {
    tree.element(id)?.select(selector).next().map(|el| el.id())
}

fn find_container(tree: &ParsedTree, config: &ImageRecoveryConfig) -> NodeId {
    for fragment in &config.content_class_selectors {
        let selector = format!(r#"[class*="{}"]"#, fragment.replace('"', "\\\""));
        if let Ok(hits) = tree.select(&selector)
            && let Some(first) = hits.first()
        {
            return *first;
        }
    }
    tree.body().unwrap_or_else(|| tree.content_root())
}

/// Records the content images of a full HTML document.
///
/// Relative `src` values are resolved against `base_url` when given.
pub fn collect(html: &str, config: &ImageRecoveryConfig, base_url: Option<&Url>) -> Vec<ContentImage> {
    collect_from_tree(&ParsedTree::parse_document(html), config, base_url)
}

/// Records the content images of an already parsed tree.
pub fn collect_from_tree(tree: &ParsedTree, config: &ImageRecoveryConfig, base_url: Option<&Url>) -> Vec<ContentImage> {
    let (Ok(figure), Ok(img), Ok(figcaption)) =
        (Selector::parse("figure"), Selector::parse("img[src]"), Selector::parse("figcaption"))
    else {
        return Vec::new();
    };

    let container = find_container(tree, config);
    let mut images = Vec::new();
    let mut preceding = String::new();

    for child in tree.child_elements(container) {
        let tag = tree.tag_name(child).unwrap_or_default();
        let class = tree.attr(child, "class").unwrap_or_default();

        let wrapper = (tag == "figure"
            || (tag == "div" && config.image_wrapper_markers.iter().any(|m| class.contains(m.as_str()))))
        .then_some(child)
        .or_else(|| first_descendant(tree, child, &figure));

        let Some(wrapper) = wrapper else {
            let text = collapse_whitespace(&tree.text(child));
            if !text.is_empty() {
                preceding = text;
            }
            continue;
        };

        if let Some(img_id) = first_descendant(tree, wrapper, &img)
            && let Some(src) = tree.attr(img_id, "src").filter(|s| !s.trim().is_empty())
        {
            let src = match base_url.and_then(|base| base.join(src.trim()).ok()) {
                Some(absolute) => absolute.to_string(),
                None => src,
            };
            let caption = first_descendant(tree, wrapper, &figcaption)
                .map(|id| collapse_whitespace(&tree.text(id)))
                .unwrap_or_default();

            images.push(ContentImage {
                src,
                alt: tree.attr(img_id, "alt").unwrap_or_default(),
                caption,
                anchor: tail_chars(&preceding, config.anchor_chars),
            });
        }
        preceding.clear();
    }

    tracing::debug!(count = images.len(), "collected content images");
    images
}

/// Finds the first block whose text ends with or contains `anchor`.
///
/// Both sides are compared whitespace-collapsed. An empty anchor never
/// matches.
pub fn find_anchor_block<S: AsRef<str>>(blocks: &[S], anchor: &str) -> AnchorMatch {
    let anchor = collapse_whitespace(anchor);
    if anchor.is_empty() {
        return AnchorMatch::NoMatch;
    }

    blocks
        .iter()
        .position(|block| {
            let text = collapse_whitespace(block.as_ref());
            text.ends_with(&anchor) || text.contains(&anchor)
        })
        .map_or(AnchorMatch::NoMatch, AnchorMatch::Found)
}

fn image_wrapper_html(image: &ContentImage) -> String {
    let mut html = format!(r#"<p><img src="{}""#, html_escape::encode_double_quoted_attribute(&image.src));
    if !image.alt.is_empty() {
        html.push_str(&format!(r#" alt="{}""#, html_escape::encode_double_quoted_attribute(&image.alt)));
    }
    html.push('>');
    if !image.caption.is_empty() {
        html.push_str(&format!("<br><em>{}</em>", html_escape::encode_text(&image.caption)));
    }
    html.push_str("</p>");
    html
}

/// Puts back every collected image whose `src` is missing from `content_html`.
///
/// Each missing `src` is inserted once, even if it was collected twice.
pub fn reinject(content_html: &str, images: &[ContentImage]) -> Reinjection {
    let mut tree = ParsedTree::parse_fragment(content_html);

    let present: HashSet<String> = tree
        .select("img[src]")
        .unwrap_or_default()
        .into_iter()
        .filter_map(|id| tree.attr(id, "src"))
        .collect();

    let mut seen = HashSet::new();
    let missing: Vec<&ContentImage> = images
        .iter()
        .filter(|image| !present.contains(&image.src) && seen.insert(image.src.as_str()))
        .collect();

    if missing.is_empty() {
        return Reinjection { content_html: content_html.to_string(), placements: Vec::new() };
    }

    let container = tree.body().unwrap_or_else(|| tree.content_root());
    let blocks: Vec<(NodeId, String)> = tree
        .select(ANCHOR_BLOCKS)
        .unwrap_or_default()
        .into_iter()
        .map(|id| (id, collapse_whitespace(&tree.text(id))))
        .filter(|(_, text)| !text.is_empty())
        .collect();
    let block_texts: Vec<&str> = blocks.iter().map(|(_, text)| text.as_str()).collect();

    let mut placements = Vec::with_capacity(missing.len());
    for image in missing {
        let wrapper = image_wrapper_html(image);

        let anchored = match find_anchor_block(&block_texts, &image.anchor) {
            AnchorMatch::Found(index) => tree.insert_html_after(blocks[index].0, &wrapper),
            AnchorMatch::NoMatch => false,
        };

        if anchored {
            placements.push((image.src.clone(), Placement::Anchored));
        } else {
            tracing::warn!(src = %image.src, "no block matched the image anchor, appending at the end");
            tree.append_html(container, &wrapper);
            placements.push((image.src.clone(), Placement::Appended));
        }
    }

    tracing::debug!(reinjected = placements.len(), "reinjected missing images");
    Reinjection { content_html: tree.to_html(), placements }
}

/// [`reinject`], keeping only the HTML.
pub fn reinject_images(content_html: &str, images: &[ContentImage]) -> String {
    reinject(content_html, images).content_html
}
