use serde_json::Value;

use crate::parse::Document;

impl Document {
    /// Extract title with priority fallback:
    /// 1. JSON-LD `headline`
    /// 2. Open Graph `og:title`
    /// 3. Twitter `twitter:title`
    /// 4. `<title>` element
    /// 5. First `<h1>` element
    pub fn extract_title(&self) -> Option<String> {
        if let Some(headline) = self.json_ld_field(|value| value.get("headline").and_then(Value::as_str).map(str::to_string)) {
            return Some(headline);
        }

        self.meta_content("og:title")
            .or_else(|| self.meta_content("twitter:title"))
            .or_else(|| self.title())
            .or_else(|| self.first_text("h1"))
    }

    /// Extract author with priority fallback:
    /// 1. Meta `author`
    /// 2. Meta `article:author`
    /// 3. JSON-LD `author` (string, object or array of either)
    /// 4. `[rel="author"]` text
    /// 5. `[itemprop="author"]` text
    pub fn extract_author(&self) -> Option<String> {
        self.meta_content("author")
            .or_else(|| self.meta_content("article:author"))
            .or_else(|| self.json_ld_field(|value| value.get("author").and_then(author_name)))
            .or_else(|| self.first_text(r#"[rel="author"]"#))
            .or_else(|| self.first_text(r#"[itemprop="author"]"#))
    }

    /// Content of `<meta name=..>` or `<meta property=..>`, trimmed, non-empty.
    fn meta_content(&self, key: &str) -> Option<String> {
        for attr in ["name", "property"] {
            let selector = format!(r#"meta[{}="{}"]"#, attr, key);
            if let Ok(elements) = self.select(&selector)
                && let Some(content) = elements.iter().find_map(|el| el.attr("content"))
            {
                let content = content.trim();
                if !content.is_empty() {
                    return Some(content.to_string());
                }
            }
        }
        None
    }

    fn first_text(&self, selector: &str) -> Option<String> {
        self.select(selector)
            .ok()?
            .iter()
            .map(|el| el.text().split_whitespace().collect::<Vec<_>>().join(" "))
            .find(|text| !text.is_empty())
    }

    /// First non-empty result of `field` over the page's JSON-LD blocks,
    /// looking inside `@graph` arrays and top-level arrays too.
    fn json_ld_field(&self, field: impl Fn(&Value) -> Option<String>) -> Option<String> {
        let scripts = self.select(r#"script[type="application/ld+json"]"#).ok()?;
        for script in scripts {
            let Ok(value) = serde_json::from_str::<Value>(script.text().trim()) else {
                continue;
            };
            let nodes: Vec<&Value> = match &value {
                Value::Array(items) => items.iter().collect(),
                Value::Object(map) => match map.get("@graph").and_then(Value::as_array) {
                    Some(graph) => std::iter::once(&value).chain(graph.iter()).collect(),
                    None => vec![&value],
                },
                _ => continue,
            };
            if let Some(found) = nodes.into_iter().find_map(&field) {
                let found = found.trim().to_string();
                if !found.is_empty() {
                    return Some(found);
                }
            }
        }
        None
    }
}

fn author_name(author: &Value) -> Option<String> {
    match author {
        Value::String(name) => Some(name.clone()),
        Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
        Value::Array(items) => items.iter().find_map(author_name),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_priority() {
        let html = r#"<html><head>
            <title>Tab Title</title>
            <meta property="og:title" content="OG Title">
        </head><body><h1>Heading</h1></body></html>"#;
        assert_eq!(Document::parse(html).extract_title(), Some("OG Title".to_string()));

        let html = "<html><head><title>Tab Title</title></head><body><h1>Heading</h1></body></html>";
        assert_eq!(Document::parse(html).extract_title(), Some("Tab Title".to_string()));

        let html = "<html><body><h1>  Only   Heading </h1></body></html>";
        assert_eq!(Document::parse(html).extract_title(), Some("Only Heading".to_string()));
    }

    #[test]
    fn test_title_from_json_ld() {
        let html = r#"<html><head>
            <script type="application/ld+json">{"@type": "NewsArticle", "headline": "LD Headline"}</script>
            <title>Tab Title</title>
        </head><body></body></html>"#;
        assert_eq!(Document::parse(html).extract_title(), Some("LD Headline".to_string()));
    }

    #[test]
    fn test_author_from_meta_either_attribute_order() {
        let html = r#"<html><head><meta name="author" content=" Jane Doe "></head></html>"#;
        assert_eq!(Document::parse(html).extract_author(), Some("Jane Doe".to_string()));

        let html = r#"<html><head><meta content="John Roe" name="author"></head></html>"#;
        assert_eq!(Document::parse(html).extract_author(), Some("John Roe".to_string()));
    }

    #[test]
    fn test_author_from_article_author() {
        let html = r#"<html><head><meta property="article:author" content="Ann Writer"></head></html>"#;
        assert_eq!(Document::parse(html).extract_author(), Some("Ann Writer".to_string()));
    }

    #[test]
    fn test_author_from_json_ld_graph() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@graph": [{"@type": "WebSite"}, {"@type": "Article", "author": [{"@type": "Person", "name": "Graph Author"}]}]}
        </script></head></html>"#;
        assert_eq!(Document::parse(html).extract_author(), Some("Graph Author".to_string()));
    }

    #[test]
    fn test_author_from_rel() {
        let html = r#"<html><body><a rel="author" href="/me">Rel Author</a></body></html>"#;
        assert_eq!(Document::parse(html).extract_author(), Some("Rel Author".to_string()));
    }

    #[test]
    fn test_no_metadata() {
        let doc = Document::parse("<html><body><p>text</p></body></html>");
        assert_eq!(doc.extract_title(), None);
        assert_eq!(doc.extract_author(), None);
    }
}
