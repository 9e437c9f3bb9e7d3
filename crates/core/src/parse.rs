//! Read-only query view over parsed HTML.
//!
//! [`Document`] is what the readability scorer walks: it never mutates, and
//! every [`Element`] it hands out carries its [`NodeId`] and a parent link so
//! scores can be propagated up the tree. Mutation lives in
//! [`crate::tree::ParsedTree`].
//!
//! # Example
//!
//! ```rust
//! use lectern_core::parse::Document;
//!
//! let doc = Document::parse("<html><head><title>Test</title></head><body><p class=\"c\">Hi</p></body></html>");
//! assert_eq!(doc.title(), Some("Test".to_string()));
//! assert_eq!(doc.select("p.c").unwrap()[0].text(), "Hi");
//! ```

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};

use crate::{LecternError, Result};

/// A parsed HTML document.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses a complete HTML document. Parsing is lenient and never fails.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// Returns a reference to the underlying `scraper::Html` instance.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Selects elements using a CSS selector, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`LecternError::HtmlParseError`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel =
            Selector::parse(selector).map_err(|e| LecternError::HtmlParseError(format!("Invalid selector: {}", e)))?;

        Ok(self.html.select(&sel).map(Element::new).collect())
    }

    /// Looks an element up by node id.
    pub fn get(&self, id: NodeId) -> Option<Element<'_>> {
        self.html.tree.get(id).and_then(ElementRef::wrap).map(Element::new)
    }

    /// Content of the first `<title>` element, trimmed.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Inner HTML of `<body>`, or of the root element when there is none.
    pub fn body_inner_html(&self) -> String {
        match self.select("body").ok().and_then(|els| els.into_iter().next()) {
            Some(body) => body.inner_html(),
            None => self.html.root_element().inner_html(),
        }
    }
}

/// A single element of a [`Document`].
#[derive(Clone, Copy, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    fn new(element: ElementRef<'a>) -> Self {
        Self { element }
    }

    pub fn id(&self) -> NodeId {
        self.element.id()
    }

    /// The closest ancestor that is an element.
    pub fn parent(&self) -> Option<Element<'a>> {
        self.element.parent().and_then(ElementRef::wrap).map(Element::new)
    }

    /// Direct element children, in order.
    pub fn children(&self) -> Vec<Element<'a>> {
        self.element.children().filter_map(ElementRef::wrap).map(Element::new).collect()
    }

    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    /// Concatenation of all text nodes within this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Lowercase tag name.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Selects descendant elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`LecternError::HtmlParseError`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel =
            Selector::parse(selector).map_err(|e| LecternError::HtmlParseError(format!("Invalid selector: {}", e)))?;

        Ok(self.element.select(&sel).map(Element::new).collect())
    }
}
