//! Null-safe node queries over a rendered document.
//!
//! Extractors only ever see [`Document`] and [`Node`]: select-all, text-read
//! and attribute-read. Every accessor returns `Option` instead of failing, so
//! a card with missing fields still projects into an offer.

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A parsed, rendered page.
pub struct Document {
    html: Html,
}

/// One element inside a [`Document`].
#[derive(Clone, Copy)]
pub struct Node<'a> {
    element: ElementRef<'a>,
}

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!(selector, "invalid selector: {e}");
            None
        }
    }
}

/// Collapse runs of whitespace and trim; empty text reads as absent.
fn clean_text<'t>(parts: impl Iterator<Item = &'t str>) -> Option<String> {
    let text = parts.flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ");
    if text.is_empty() { None } else { Some(text) }
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// Every element matching `selector`, in document order.
    pub fn select_all(&self, selector: &str) -> Vec<Node<'_>> {
        let Some(parsed) = parse_selector(selector) else {
            return Vec::new();
        };
        self.html.select(&parsed).map(|element| Node { element }).collect()
    }

    /// Text of the first element matching `selector`.
    pub fn text(&self, selector: &str) -> Option<String> {
        self.select_all(selector).first().and_then(Node::full_text)
    }
}

impl<'a> Node<'a> {
    /// Descendants matching `selector`, in document order.
    pub fn select_all(&self, selector: &str) -> Vec<Node<'a>> {
        let Some(parsed) = parse_selector(selector) else {
            return Vec::new();
        };
        self.element.select(&parsed).map(|element| Node { element }).collect()
    }

    fn first(&self, selector: &str) -> Option<Node<'a>> {
        let parsed = parse_selector(selector)?;
        self.element.select(&parsed).next().map(|element| Node { element })
    }

    /// Whitespace-normalized text of this node.
    pub fn full_text(&self) -> Option<String> {
        clean_text(self.element.text())
    }

    /// Text of the first descendant matching `selector`.
    pub fn text(&self, selector: &str) -> Option<String> {
        self.first(selector)?.full_text()
    }

    /// Attribute of this node itself.
    pub fn own_attr(&self, name: &str) -> Option<String> {
        self.element
            .value()
            .attr(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Attribute of the first descendant matching `selector`.
    pub fn attr(&self, selector: &str, name: &str) -> Option<String> {
        self.first(selector)?.own_attr(name)
    }

    /// Attribute of the first descendant matching `selector`, resolved
    /// against `base` when it is a relative URL.
    pub fn url_attr(&self, selector: &str, name: &str, base: &Url) -> Option<String> {
        let raw = self.attr(selector, name)?;
        Some(base.join(&raw).map(|u| u.to_string()).unwrap_or(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"
        <ul>
            <li class="card"><a href="/item/1"><span class="name">  First
                item </span></a><img src="https://img.example/1.jpg"></li>
            <li class="card"><span class="name"></span></li>
        </ul>
    "#;

    #[test]
    fn test_select_all_document_order() {
        let doc = Document::parse(HTML);
        assert_eq!(doc.select_all("li.card").len(), 2);
    }

    #[test]
    fn test_text_is_collapsed() {
        let doc = Document::parse(HTML);
        let cards = doc.select_all("li.card");
        assert_eq!(cards[0].text(".name"), Some("First item".to_string()));
    }

    #[test]
    fn test_missing_fields_are_none() {
        let doc = Document::parse(HTML);
        let cards = doc.select_all("li.card");
        assert_eq!(cards[1].text(".name"), None);
        assert_eq!(cards[1].attr("img", "src"), None);
        assert_eq!(cards[1].text(".does-not-exist"), None);
    }

    #[test]
    fn test_url_attr_resolves_relative() {
        let doc = Document::parse(HTML);
        let base = Url::parse("https://market.example/search?q=x").unwrap();
        let cards = doc.select_all("li.card");
        assert_eq!(cards[0].url_attr("a", "href", &base), Some("https://market.example/item/1".to_string()));
        assert_eq!(cards[0].url_attr("img", "src", &base), Some("https://img.example/1.jpg".to_string()));
    }

    #[test]
    fn test_invalid_selector_yields_nothing() {
        let doc = Document::parse(HTML);
        assert!(doc.select_all("li[[").is_empty());
        assert_eq!(doc.text("li[["), None);
    }
}
