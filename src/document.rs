//! Parsed HTML documents and per-node accessors

use scraper::{ElementRef, Html};

use crate::error::ParseError;
use crate::path::NodePath;

/// A parsed page. Not `Sync`; each extraction call owns its own document.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parse raw page bytes. The bytes must be UTF-8; a declared charset is
    /// not honoured, so pages in other encodings are decoded by the caller.
    /// The markup itself is parsed leniently.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(bytes)?;
        Ok(Self::parse_str(text))
    }

    pub fn parse_str(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// The root element (`<html>`).
    pub fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    pub fn select(&self, path: &NodePath) -> Vec<ElementRef<'_>> {
        path.select(&self.html)
    }

    pub fn select_from<'a>(&'a self, path: &NodePath, node: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        path.select_from(&self.html, node)
    }
}

/// Concatenated text of the node and its descendants.
pub fn text_of(node: ElementRef<'_>) -> String {
    node.text().collect()
}

pub fn inner_html_of(node: ElementRef<'_>) -> String {
    node.inner_html()
}

pub fn attr_of(node: ElementRef<'_>, name: &str) -> String {
    node.value().attr(name).unwrap_or_default().to_string()
}
