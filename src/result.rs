//! Extraction output

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// One record: field name to value.
pub type Item = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub url: String,
    pub anchor: String,
}

impl Link {
    pub fn new(url: impl Into<String>, anchor: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anchor: anchor.into(),
        }
    }
}

/// Named groups of items and links, each in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractResult {
    pub items: BTreeMap<String, Vec<Item>>,
    pub links: BTreeMap<String, Vec<Link>>,
}

impl ExtractResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_item(&mut self, name: &str, item: Item) {
        self.items.entry(name.to_string()).or_default().push(item);
    }

    pub fn push_link(&mut self, name: &str, link: Link) {
        self.links.entry(name.to_string()).or_default().push(link);
    }

    /// Items under `name`; empty if none were extracted.
    pub fn items(&self, name: &str) -> &[Item] {
        self.items.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn links(&self, name: &str) -> &[Link] {
        self.links.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.links.is_empty()
    }
}

impl fmt::Display for ExtractResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, links) in &self.links {
            for link in links {
                writeln!(f, "{name} {} {}", link.url, link.anchor)?;
            }
        }
        for (name, items) in &self.items {
            writeln!(f, "{name}")?;
            for item in items {
                for (key, value) in item {
                    writeln!(f, "{key} : {value}")?;
                }
            }
        }
        Ok(())
    }
}
