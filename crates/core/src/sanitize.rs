//! Tracking and layout cleanup.
//!
//! Newsletter and legacy-site markup carries noise that readability scoring
//! and Markdown conversion handle badly: open-tracking pixels, `utm_*`
//! decorated links, spacer GIFs, image maps, and tables used for layout.
//! [`sanitize`] strips all of it and is idempotent.

use url::form_urlencoded;

use crate::config::SanitizeConfig;
use crate::tree::{NodeId, ParsedTree};

const LAYOUT_TAGS: &str = "table, tbody, thead, tfoot, tr, td, th";

/// Counts of what one [`sanitize`] pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeStats {
    pub unwrapped: usize,
    pub images_removed: usize,
    pub maps_removed: usize,
    pub links_rewritten: usize,
}

/// Cleans a tree and hands it back.
pub fn sanitize(tree: ParsedTree, config: &SanitizeConfig) -> ParsedTree {
    sanitize_with_stats(tree, config).0
}

/// Like [`sanitize`], also reporting what was changed.
pub fn sanitize_with_stats(mut tree: ParsedTree, config: &SanitizeConfig) -> (ParsedTree, SanitizeStats) {
    let mut stats = SanitizeStats::default();

    for id in tree.select(LAYOUT_TAGS).unwrap_or_default() {
        if tree.unwrap(id) {
            stats.unwrapped += 1;
        }
    }

    for id in tree.select("img").unwrap_or_default() {
        if (is_tracking_pixel(&tree, id, config) || is_spacer(&tree, id, config)) && tree.remove(id) {
            stats.images_removed += 1;
        }
    }

    for id in tree.select("map").unwrap_or_default() {
        if tree.remove(id) {
            stats.maps_removed += 1;
        }
    }

    for id in tree.select("a[href]").unwrap_or_default() {
        if let Some(href) = tree.attr(id, "href")
            && let Some(clean) = strip_tracking_params(&href, &config.tracking_params)
        {
            tree.set_attr(id, "href", &clean);
            stats.links_rewritten += 1;
        }
    }

    tracing::debug!(
        unwrapped = stats.unwrapped,
        images_removed = stats.images_removed,
        maps_removed = stats.maps_removed,
        links_rewritten = stats.links_rewritten,
        "sanitized tree"
    );
    (tree, stats)
}

/// Parses `html` as a document, sanitizes it and serializes it again.
///
/// Unwrapping tables can leave nesting the parser never builds, such as a
/// `<p>` inside a `<p>`. When anything was unwrapped the result is parsed and
/// cleaned once more, so the returned markup reparses to the same tree and
/// `sanitize_html(sanitize_html(x)) == sanitize_html(x)`.
pub fn sanitize_html(html: &str, config: &SanitizeConfig) -> String {
    let (tree, stats) = sanitize_with_stats(ParsedTree::parse_document(html), config);
    if stats.unwrapped == 0 {
        return tree.to_html();
    }
    sanitize(ParsedTree::parse_document(&tree.to_html()), config).to_html()
}

fn dimension(tree: &ParsedTree, id: NodeId, name: &str) -> String {
    tree.attr(id, name).map(|v| v.trim().to_string()).unwrap_or_default()
}

fn src_lower(tree: &ParsedTree, id: NodeId) -> String {
    tree.attr(id, "src").unwrap_or_default().to_lowercase()
}

fn is_tracking_pixel(tree: &ParsedTree, id: NodeId, config: &SanitizeConfig) -> bool {
    let tiny = |v: &str| v == "0" || v == "1";
    if tiny(&dimension(tree, id, "width")) && tiny(&dimension(tree, id, "height")) {
        return true;
    }

    let style: String = tree
        .attr(id, "style")
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    if style.contains("display:none") || style.contains("visibility:hidden") {
        return true;
    }

    let src = src_lower(tree, id);
    config
        .tracking_src_patterns
        .iter()
        .any(|pattern| src.contains(&pattern.to_lowercase()))
}

fn is_spacer(tree: &ParsedTree, id: NodeId, config: &SanitizeConfig) -> bool {
    if tree.attr(id, "usemap").is_some() || tree.attr(id, "ismap").is_some() {
        return true;
    }
    if dimension(tree, id, "width") == "1" || dimension(tree, id, "height") == "1" {
        return true;
    }
    let src = src_lower(tree, id);
    config
        .spacer_src_patterns
        .iter()
        .any(|pattern| src.contains(&pattern.to_lowercase()))
}

/// Removes denylisted query parameters from `href`.
///
/// Keys are percent-decoded and compared case-insensitively. Kept pairs are
/// copied verbatim and in order; path and fragment are untouched. Returns
/// `None` when nothing was dropped, so callers leave the link alone.
///
/// ```rust
/// use lectern_core::sanitize::strip_tracking_params;
///
/// let denylist = vec!["utm_source".to_string()];
/// assert_eq!(
///     strip_tracking_params("https://a.test/p?id=3&utm_source=mail#top", &denylist).as_deref(),
///     Some("https://a.test/p?id=3#top"),
/// );
/// assert_eq!(strip_tracking_params("https://a.test/p?id=3", &denylist), None);
/// ```
pub fn strip_tracking_params(href: &str, denylist: &[String]) -> Option<String> {
    let (before_fragment, fragment) = match href.find('#') {
        Some(i) => (&href[..i], &href[i..]),
        None => (href, ""),
    };
    let (base, query) = before_fragment.split_once('?')?;

    let mut dropped = false;
    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| {
            let raw_key = pair.split('=').next().unwrap_or_default();
            let key = form_urlencoded::parse(raw_key.as_bytes())
                .next()
                .map(|(k, _)| k.into_owned())
                .unwrap_or_default();
            let deny = !key.is_empty() && denylist.iter().any(|d| d.eq_ignore_ascii_case(&key));
            dropped |= deny;
            !deny
        })
        .collect();

    if !dropped {
        return None;
    }

    let mut clean = base.to_string();
    if !kept.is_empty() {
        clean.push('?');
        clean.push_str(&kept.join("&"));
    }
    clean.push_str(fragment);
    Some(clean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn run(html: &str) -> String {
        sanitize(ParsedTree::parse_fragment(html), &SanitizeConfig::default()).to_html()
    }

    fn denylist() -> Vec<String> {
        SanitizeConfig::default().tracking_params
    }

    #[rstest]
    #[case(r#"<img src="https://cdn.test/a.png" width="1" height="1">"#)]
    #[case(r#"<img src="https://cdn.test/a.png" width="0" height="0">"#)]
    #[case(r#"<img src="https://cdn.test/a.png" style="display: none">"#)]
    #[case(r#"<img src="https://cdn.test/a.png" style="VISIBILITY : hidden;">"#)]
    #[case(r#"<img src="https://eotrx.substackcdn.com/open.substack.com/x.gif">"#)]
    #[case(r#"<img src="https://us1.list-manage.com/track/open.php?u=1">"#)]
    #[case(r#"<img src="https://example.com/track/open/abc">"#)]
    #[case(r#"<img src="https://example.com/t/PIXEL.gif">"#)]
    #[case(r##"<img src="https://site.test/a.png" usemap="#nav">"##)]
    #[case(r#"<img src="https://site.test/a.png" ismap>"#)]
    #[case(r#"<img src="https://site.test/a.png" width="1" height="40">"#)]
    #[case(r#"<img src="https://site.test/images/trans_1x1.gif">"#)]
    #[case(r#"<img src="https://site.test/spacer.gif" width="10">"#)]
    fn test_noise_images_removed(#[case] img: &str) {
        let out = run(&format!("<p>Text{}</p>", img));
        assert_eq!(out, "<p>Text</p>");
    }

    #[rstest]
    #[case(r#"<img src="https://cdn.test/photo.jpg" width="600" height="400">"#)]
    #[case(r#"<img src="https://cdn.test/photo.jpg">"#)]
    #[case(r#"<img src="https://cdn.test/photo.jpg" width="0" height="400">"#)]
    fn test_content_images_kept(#[case] img: &str) {
        let out = run(&format!("<p>{}</p>", img));
        assert!(out.contains("photo.jpg"));
    }

    #[test]
    fn test_layout_tables_unwrapped_in_order() {
        let html = "<table><tbody><tr><td><p>One</p></td><td><p>Two</p></td></tr></tbody></table><p>Three</p>";
        assert_eq!(run(html), "<p>One</p><p>Two</p><p>Three</p>");
    }

    #[test]
    fn test_maps_removed() {
        let html = r#"<p>Nav</p><map name="nav"><area href="/a" coords="0,0,1,1"></map>"#;
        assert_eq!(run(html), "<p>Nav</p>");
    }

    #[test]
    fn test_links_rewritten() {
        let html = r#"<a href="https://news.test/post?id=7&amp;utm_source=newsletter&amp;utm_medium=email">Read</a>"#;
        assert_eq!(run(html), r#"<a href="https://news.test/post?id=7">Read</a>"#);
    }

    #[test]
    fn test_idempotent() {
        let html = r#"<table><tr><td>
            <p>Hello <a href="https://x.test/a?utm_campaign=c&amp;q=1#frag">link</a></p>
            <img src="https://cdn.test/p.gif" width="1" height="1">
            <img src="https://cdn.test/photo.jpg" alt="Photo">
            <map name="m"></map>
        </td></tr></table>"#;

        let config = SanitizeConfig::default();
        let once = sanitize(ParsedTree::parse_document(html), &config).to_html();
        let twice = sanitize(ParsedTree::parse_document(&once), &config).to_html();
        assert_eq!(once, twice);

        let (_, stats) = sanitize_with_stats(ParsedTree::parse_document(&once), &config);
        assert_eq!(stats, SanitizeStats::default());
    }

    #[rstest]
    #[case("<p>intro<table><tr><td><p>cell</p></td></tr></table></p>")]
    #[case(r#"<a href="https://a.test/">go<table><tr><td><a href="https://b.test/">in</a></td></tr></table></a>"#)]
    #[case("<ul><li>one<table><tr><td><ul><li>two</li></ul></td></tr></table></li></ul>")]
    #[case("<table><tr><td><table><tr><td><p>deep</p></td></tr></table></td></tr></table>")]
    fn test_sanitize_html_reaches_fixed_point(#[case] html: &str) {
        let config = SanitizeConfig::default();
        let once = sanitize_html(html, &config);
        let twice = sanitize_html(&once, &config);
        assert_eq!(once, twice);
        assert!(!once.contains("<table"));
    }

    #[test]
    fn test_sanitize_html_keeps_nested_table_text() {
        let out = sanitize_html(
            "<p>intro<table><tr><td><p>cell</p></td></tr></table></p>",
            &SanitizeConfig::default(),
        );
        assert!(out.find("intro").unwrap() < out.find("cell").unwrap());
        assert!(!out.contains("<p>intro<p>"));
    }

    #[rstest]
    #[case("https://a.test/p/q?utm_source=x", Some("https://a.test/p/q"))]
    #[case("https://a.test/p?a=1&utm_medium=m&b=2", Some("https://a.test/p?a=1&b=2"))]
    #[case("https://a.test/p?UTM_Source=x&keep=Y", Some("https://a.test/p?keep=Y"))]
    #[case("https://a.test/p?utm%5Fterm=x&z=1", Some("https://a.test/p?z=1"))]
    #[case("https://a.test/p?fbclid=abc#section-2", Some("https://a.test/p#section-2"))]
    #[case("https://a.test/p?mc_cid=1&mc_eid=2&ref=tw&s=09&sref=3", Some("https://a.test/p"))]
    #[case("https://a.test/p?b=2&a=1", None)]
    #[case("https://a.test/p?source=utm_source", None)]
    #[case("https://a.test/p#utm_source=x", None)]
    #[case("/relative/path", None)]
    fn test_strip_tracking_params(#[case] href: &str, #[case] expected: Option<&str>) {
        assert_eq!(strip_tracking_params(href, &denylist()).as_deref(), expected);
    }

    #[test]
    fn test_stripping_preserves_path_and_kept_values() {
        let href = "https://a.test/a%20b/c;p?x=%2F1&utm_content=z&y=a+b&x=2";
        let clean = strip_tracking_params(href, &denylist()).unwrap();
        assert_eq!(clean, "https://a.test/a%20b/c;p?x=%2F1&y=a+b&x=2");
    }
}
