use scraper::ElementRef;

use crate::tree::{NodeId, ParsedTree};

/// Configuration for cleaning up extracted content.
#[derive(Debug, Clone)]
pub struct PostProcessConfig {
    /// Remove blocks with no text and no media.
    pub remove_empty_nodes: bool,
    /// Remove blocks that are mostly link text.
    pub remove_high_link_density: bool,
    /// Link density above which a block is dropped (0.0 to 1.0).
    pub max_link_density: f64,
    /// Unwrap a `<div>` whose only child is another `<div>`.
    pub clean_nested_divs: bool,
    pub strip_images: bool,
    /// Keep `class` attributes in the output.
    pub keep_classes: bool,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            remove_empty_nodes: true,
            remove_high_link_density: true,
            max_link_density: 0.5,
            clean_nested_divs: true,
            strip_images: false,
            keep_classes: false,
        }
    }
}

const LINK_DENSITY_TAGS: &str = "div, section, aside, nav, ul, ol, li, p";
const EMPTY_CANDIDATE_TAGS: &str = "div, p, span, section, article, aside, nav, header, footer";
const MEDIA_TAGS: &[&str] = &["img", "picture", "video", "audio", "embed", "object", "svg"];

/// Cleans an extracted content fragment.
pub fn postprocess_html(html: &str, config: &PostProcessConfig) -> String {
    let processed = strip_attributes(html, config);

    let mut tree = ParsedTree::parse_fragment(&processed);
    if config.remove_high_link_density {
        tree = remove_high_link_density(tree, config.max_link_density);
    }
    if config.remove_empty_nodes {
        tree = remove_empty_nodes(tree);
    }
    if config.clean_nested_divs {
        tree = clean_nested_divs(tree);
    }
    tree.to_html()
}

fn strip_attributes(html: &str, config: &PostProcessConfig) -> String {
    let handlers: Vec<_> = [
        config.strip_images.then(|| {
            lol_html::element!("img", |el| {
                el.remove();
                Ok(())
            })
        }),
        (!config.keep_classes).then(|| {
            lol_html::element!("[class]", |el| {
                el.remove_attribute("class");
                Ok(())
            })
        }),
    ]
    .into_iter()
    .flatten()
    .collect();

    if handlers.is_empty() {
        return html.to_string();
    }

    match lol_html::rewrite_str(html, lol_html::RewriteStrSettings { element_content_handlers: handlers, ..Default::default() })
    {
        Ok(output) => output,
        Err(_) => html.to_string(),
    }
}

fn link_density(tree: &ParsedTree, id: NodeId) -> Option<f64> {
    let element = tree.element(id)?;
    let text_length = tree.text(id).trim().chars().count();
    if text_length == 0 {
        return None;
    }

    let link_length: usize = element
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "a")
        .map(|a| a.text().map(|t| t.chars().count()).sum::<usize>())
        .sum();

    Some(link_length as f64 / text_length as f64)
}

fn remove_high_link_density(mut tree: ParsedTree, max_density: f64) -> ParsedTree {
    for id in tree.select(LINK_DENSITY_TAGS).unwrap_or_default() {
        if link_density(&tree, id).is_some_and(|density| density > max_density) {
            tree.remove(id);
        }
    }
    tree
}

fn has_media(tree: &ParsedTree, id: NodeId) -> bool {
    tree.element(id).is_some_and(|el| {
        el.descendants()
            .filter_map(ElementRef::wrap)
            .any(|d| MEDIA_TAGS.contains(&d.value().name()))
    })
}

fn remove_empty_nodes(mut tree: ParsedTree) -> ParsedTree {
    for id in tree.select(EMPTY_CANDIDATE_TAGS).unwrap_or_default() {
        if tree.text(id).trim().is_empty() && !has_media(&tree, id) {
            tree.remove(id);
        }
    }
    tree
}

fn clean_nested_divs(mut tree: ParsedTree) -> ParsedTree {
    for id in tree.select("div").unwrap_or_default() {
        let children = tree.child_elements(id);
        let only_div = children.len() == 1 && tree.tag_name(children[0]).as_deref() == Some("div");
        if only_div && tree.direct_text(id).trim().is_empty() {
            tree.unwrap(id);
        }
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_classes_by_default() {
        let html = r#"<div class="content"><p class="lead">Text</p></div>"#;
        let result = postprocess_html(html, &PostProcessConfig::default());
        assert!(!result.contains("class="));
        assert!(result.contains("<p>Text</p>"));
    }

    #[test]
    fn test_keep_classes() {
        let config = PostProcessConfig { keep_classes: true, ..Default::default() };
        let result = postprocess_html(r#"<p class="lead">Text</p>"#, &config);
        assert!(result.contains(r#"class="lead""#));
    }

    #[test]
    fn test_strip_images() {
        let config = PostProcessConfig { strip_images: true, ..Default::default() };
        let result = postprocess_html(r#"<p>Text <img src="a.png"></p>"#, &config);
        assert!(!result.contains("<img"));
        assert!(result.contains("Text"));
    }

    #[test]
    fn test_empty_nodes_removed_but_media_kept() {
        let html = r#"<div><p>Text</p><p> </p><div><span></span></div><p><img src="a.png"></p></div>"#;
        let result = postprocess_html(html, &PostProcessConfig::default());
        assert!(!result.contains("<p> </p>"));
        assert!(!result.contains("<span>"));
        assert!(result.contains(r#"<p><img src="a.png"></p>"#));
    }

    #[test]
    fn test_high_link_density_removed() {
        let html = r##"<div><p>Real paragraph text that carries the article.</p>
            <ul><li><a href="#">Home</a></li><li><a href="#">About</a></li></ul></div>"##;
        let result = postprocess_html(html, &PostProcessConfig::default());
        assert!(!result.contains("Home"));
        assert!(result.contains("Real paragraph"));
    }

    #[test]
    fn test_clean_nested_divs() {
        let html = r#"<div><div><p>Deep</p></div></div>"#;
        let result = postprocess_html(html, &PostProcessConfig::default());
        assert_eq!(result, "<div><p>Deep</p></div>");
    }
}
