//! Template-driven extraction
//!
//! For one page: pick the template by site, pick the first `<url>` section
//! whose pattern matches, then resolve supports, links and items in that
//! order. Support variables resolved early are visible to everything after.

use std::sync::Arc;

use scraper::ElementRef;

use crate::config::Options;
use crate::context::Context;
use crate::document::Document;
use crate::error::{ExtractError, ExtractorError};
use crate::fetch::{Fetcher, HttpClient};
use crate::methods::MethodRegistry;
use crate::resolver::{captures_of, FieldResolver};
use crate::result::{ExtractResult, Item, Link};
use crate::template::{ItemSection, Template, TemplateSet, UrlSection};

/// Loaded templates, registered methods and the network client.
///
/// Read-only once built; share it between worker threads behind an `Arc`.
pub struct Extractor {
    templates: TemplateSet,
    methods: MethodRegistry,
    fetcher: Arc<dyn Fetcher>,
}

impl Extractor {
    /// Build the HTTP client and load every template in `options.template_dir`.
    pub fn new(options: &Options) -> Result<Self, ExtractorError> {
        let client = HttpClient::from_options(options)?;
        let templates = TemplateSet::load_dir(&options.template_dir)?;
        tracing::info!(
            dir = %options.template_dir.display(),
            templates = templates.len(),
            "extractor ready"
        );
        Ok(Self::from_parts(templates, Arc::new(client)))
    }

    pub fn from_parts(templates: TemplateSet, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            templates,
            methods: MethodRegistry::new(),
            fetcher,
        }
    }

    /// Make `name` available to the `method` attribute of fields.
    pub fn register_method<F>(&mut self, name: impl Into<String>, method: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.methods.register(name, method);
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    pub fn methods(&self) -> &MethodRegistry {
        &self.methods
    }

    pub fn fetcher(&self) -> &dyn Fetcher {
        self.fetcher.as_ref()
    }

    /// Extract from a fetched page.
    ///
    /// Fails only if no template covers `url` or the page is not UTF-8.
    pub fn extract(&self, url: &str, page: &[u8]) -> Result<ExtractResult, ExtractError> {
        let template = self
            .templates
            .find(url)
            .ok_or_else(|| ExtractError::TemplateNotFound(url.to_string()))?;
        let document = Document::parse(page)?;
        Ok(self.extract_document(url, &document, template))
    }

    /// Run `template` against an already parsed page. Only the first matching
    /// `<url>` section is used; no match gives an empty result.
    pub fn extract_document(
        &self,
        url: &str,
        document: &Document,
        template: &Template,
    ) -> ExtractResult {
        let resolver = FieldResolver::new(self.fetcher.as_ref(), &self.methods);

        for (index, section) in template.urls.iter().enumerate() {
            let Some(captures) = captures_of(&section.pattern, url) else {
                continue;
            };
            tracing::debug!(template = %template.name, section = index, url, "url section matched");
            let run = SectionRun {
                resolver: &resolver,
                url,
                document,
                section,
            };
            return run.extract(&captures);
        }

        tracing::debug!(template = %template.name, url, "no url section matched");
        ExtractResult::new()
    }
}

struct SectionRun<'r, 'a> {
    resolver: &'r FieldResolver<'a>,
    url: &'r str,
    document: &'r Document,
    section: &'r UrlSection,
}

impl SectionRun<'_, '_> {
    fn extract(&self, captures: &[String]) -> ExtractResult {
        let supports = self.supports(captures);
        let mut result = ExtractResult::new();
        self.links(&supports, &mut result);
        self.items(&supports, &mut result);
        result
    }

    fn supports(&self, captures: &[String]) -> Context {
        let captured = Context::from_captures(captures);
        let mut supports = captured.clone();
        supports.insert("and", "&");

        for (key, combine) in &self.section.extra {
            let value = combine.exec(&captured);
            if !value.is_empty() {
                supports.insert(key.clone(), value);
            }
        }

        for support in &self.section.supports {
            let scope = support
                .path
                .as_ref()
                .and_then(|path| self.document.select(path).into_iter().next())
                .unwrap_or_else(|| self.document.root());

            for field in &support.fields {
                // Link fields have no single value to store.
                if supports.contains(&field.name) || field.kind.is_link() {
                    continue;
                }
                let value = self.resolver.content(self.url, scope, field, &supports);
                supports.insert(field.name.clone(), value);
            }
        }
        supports
    }

    fn links(&self, supports: &Context, result: &mut ExtractResult) {
        for link in &self.section.links {
            let roots = match &link.path {
                Some(path) => self.document.select(path),
                None => vec![self.document.root()],
            };
            for root in roots {
                if link.kind.is_link() {
                    for found in self.resolver.links(self.url, root, link, supports, false) {
                        result.push_link(&link.name, found);
                    }
                } else {
                    let value = self.resolver.content(self.url, root, link, supports);
                    if !value.is_empty() {
                        result.push_link(&link.name, Link::new(value, ""));
                    }
                }
            }
        }
    }

    fn items(&self, supports: &Context, result: &mut ExtractResult) {
        for item in &self.section.items {
            let cells = match &item.path {
                Some(path) => self.document.select(path),
                None => vec![self.document.root()],
            };
            for cell in cells {
                let record = self.record(item, cell, supports);
                result.push_item(&item.name, record);
            }
        }
    }

    /// One record per cell. The first field of a given name wins, even when
    /// its value is empty.
    fn record(&self, item: &ItemSection, cell: ElementRef<'_>, supports: &Context) -> Item {
        let mut record = Item::new();
        for field in &item.fields {
            if record.contains_key(&field.name) {
                continue;
            }
            let candidates = match &field.path {
                Some(path) => self.document.select_from(path, cell),
                None => vec![cell],
            };
            let value = if field.kind.is_link() {
                candidates.into_iter().find_map(|node| {
                    self.resolver
                        .links(self.url, node, field, supports, true)
                        .into_iter()
                        .next()
                        .map(|link| link.url)
                })
            } else {
                candidates
                    .into_iter()
                    .map(|node| self.resolver.content(self.url, node, field, supports))
                    .find(|value| !value.is_empty())
            };
            record.insert(field.name.clone(), value.unwrap_or_default());
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;
    use crate::resolver::tests::StubFetcher;
    use pretty_assertions::assert_eq;

    fn extractor(templates: &[&str], fetcher: StubFetcher) -> Extractor {
        let mut set = TemplateSet::new();
        for markup in templates {
            set.insert(Template::parse(markup).unwrap());
        }
        Extractor::from_parts(set, Arc::new(fetcher))
    }

    fn record(pairs: &[(&str, &str)]) -> Item {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_end_to_end_example() {
        let ex = extractor(
            &[r#"<template domain="x.com" name="x">
                <url pattern="^http://x\.com/(\w+)$">
                    <item name="post" xpath="//div">
                        <field name="id" type="text" output="${0}-${1}"/>
                    </item>
                </url>
            </template>"#],
            StubFetcher::default(),
        );

        let result = ex
            .extract("http://x.com/p1", b"<html><body><div>42</div></body></html>")
            .unwrap();
        assert_eq!(result.items("post"), &[record(&[("id", "42-p1")])]);
    }

    #[test]
    fn test_first_matching_section_wins() {
        let ex = extractor(
            &[r#"<template domain="x.com" name="x">
                <url pattern="^http://x\.com/">
                    <item name="first"><field name="t" xpath="//h1" type="text"/></item>
                </url>
                <url pattern="^http://x\.com/a">
                    <item name="second"><field name="t" xpath="//h1" type="text"/></item>
                    <link name="all" type="a"/>
                </url>
            </template>"#],
            StubFetcher::default(),
        );

        let result = ex
            .extract("http://x.com/a", br#"<h1>Title</h1><a href="/b">b</a>"#)
            .unwrap();
        assert_eq!(result.items("first"), &[record(&[("t", "Title")])]);
        assert!(result.items("second").is_empty());
        assert!(result.links.is_empty());
    }

    #[test]
    fn test_no_matching_section_is_empty() {
        let ex = extractor(
            &[r#"<template domain="x.com" name="x"><url pattern="^http://x\.com/only$"><item name="i"/></url></template>"#],
            StubFetcher::default(),
        );
        let result = ex.extract("http://x.com/other", b"<p>hi</p>").unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_duplicate_field_names_keep_first() {
        let ex = extractor(
            &[r#"<template domain="x.com" name="x">
                <url pattern=".">
                    <item name="i" xpath="//li">
                        <field name="v" xpath="em" type="text"/>
                        <field name="v" xpath="b" type="text"/>
                        <field name="w" xpath="b" type="text"/>
                    </item>
                </url>
            </template>"#],
            StubFetcher::default(),
        );

        let result = ex
            .extract("http://x.com/", b"<ul><li><b>bold</b></li><li><em>em</em><b>b</b></li></ul>")
            .unwrap();
        assert_eq!(
            result.items("i"),
            &[
                record(&[("v", ""), ("w", "bold")]),
                record(&[("v", "em"), ("w", "b")]),
            ]
        );
    }

    #[test]
    fn test_first_non_empty_candidate() {
        let ex = extractor(
            &[r#"<template domain="x.com" name="x">
                <url pattern=".">
                    <item name="i" xpath="//ul">
                        <field name="num" xpath="li" type="text" pattern="\d+"/>
                        <field name="link" xpath="li" type="a" pattern=".*/p/.*"/>
                    </item>
                </url>
            </template>"#],
            StubFetcher::default(),
        );

        let result = ex
            .extract(
                "http://x.com/",
                br#"<ul><li>none</li><li><a href="/about">a</a>12</li><li><a href="/p/3">3</a>34</li></ul>"#,
            )
            .unwrap();
        assert_eq!(result.items("i"), &[record(&[("num", "12"), ("link", "/p/3")])]);
    }

    #[test]
    fn test_empty_records_are_kept() {
        let ex = extractor(
            &[r#"<template domain="x.com" name="x">
                <url pattern=".">
                    <item name="row" xpath="//tr"><field name="c" xpath="td" type="text"/></item>
                </url>
            </template>"#],
            StubFetcher::default(),
        );

        let result = ex
            .extract("http://x.com/", b"<table><tr><td>1</td></tr><tr><th>h</th></tr></table>")
            .unwrap();
        assert_eq!(result.items("row"), &[record(&[("c", "1")]), record(&[("c", "")])]);
    }

    #[test]
    fn test_supports_and_extras() {
        let ex = extractor(
            &[r#"<template domain="x.com" name="x">
                <url pattern="^http://x\.com/(\w+)/(\d+)$" cat="${1}" missing="${9}" api="http://api.x.com/?c=$1&amp;id=$2">
                    <support xpath="//title">
                        <field name="title" type="text"/>
                        <field name="title" type="text" output="ignored"/>
                        <field name="nav" type="a"/>
                        <field name="label" output="${cat}${and}${title}"/>
                    </support>
                    <support>
                        <field name="cat" output="overridden"/>
                        <field name="title2" output="${title}"/>
                    </support>
                    <item name="page">
                        <field name="cat" output="${cat}"/>
                        <field name="label" output="${label}"/>
                        <field name="api" output="${api}"/>
                        <field name="missing" output="${missing}"/>
                        <field name="title2" output="${title2}"/>
                        <field name="nav" output="${nav}"/>
                    </item>
                </url>
            </template>"#],
            StubFetcher::default(),
        );

        let result = ex
            .extract(
                "http://x.com/books/7",
                br#"<html><head><title>Shelf</title></head><body><a href="/n">n</a></body></html>"#,
            )
            .unwrap();
        assert_eq!(
            result.items("page"),
            &[record(&[
                ("cat", "books"),
                ("label", "books&Shelf"),
                ("api", "http://api.x.com/?c=books&id=7"),
                ("missing", ""),
                ("title2", "Shelf"),
                ("nav", ""),
            ])]
        );
    }

    #[test]
    fn test_support_scope_ignores_field_xpath() {
        let ex = extractor(
            &[r#"<template domain="x.com" name="x">
                <url pattern=".">
                    <support xpath="//div[@id='meta']">
                        <field name="whole" xpath="span[2]" type="text"/>
                    </support>
                    <support xpath="//div[@id='absent']">
                        <field name="fallback" type="attr" prop="lang"/>
                    </support>
                    <item name="i">
                        <field name="whole" output="${whole}"/>
                        <field name="fallback" output="${fallback}"/>
                    </item>
                </url>
            </template>"#],
            StubFetcher::default(),
        );

        let result = ex
            .extract(
                "http://x.com/",
                br#"<html lang="fi"><body><div id="meta"><span>a</span><span>b</span></div></body></html>"#,
            )
            .unwrap();
        assert_eq!(
            result.items("i"),
            &[record(&[("whole", "ab"), ("fallback", "fi")])]
        );
    }

    #[test]
    fn test_link_sections() {
        let ex = extractor(
            &[r#"<template domain="x.com" name="x">
                <url pattern=".">
                    <link name="pages" xpath="//div[@class='pager']" type="a" pattern="page=(\d+)" output="http://x.com/?page=${1}"/>
                    <link name="pics" type="img"/>
                    <link name="ids" xpath="//span" type="text" pattern="id(\d+)" output="http://x.com/item/${1}"/>
                </url>
            </template>"#],
            StubFetcher::default(),
        );

        let result = ex
            .extract(
                "http://x.com/",
                br##"<div class="pager"><a href="?page=2">2</a><a href="#">top</a></div>
                    <div class="pager"><a href="?page=3">3</a></div>
                    <img src="/a.png" alt="A">
                    <span>id1</span><span>none</span><span>id2</span>"##,
            )
            .unwrap();

        assert_eq!(
            result.links("pages"),
            &[Link::new("http://x.com/?page=2", "2"), Link::new("http://x.com/?page=3", "3")]
        );
        assert_eq!(result.links("pics"), &[Link::new("/a.png", "A")]);
        assert_eq!(
            result.links("ids"),
            &[Link::new("http://x.com/item/1", ""), Link::new("http://x.com/item/2", "")]
        );
    }

    #[test]
    fn test_chained_request_reset_end_to_end() {
        let fetcher = StubFetcher::default().with("http://api.x.com/stock?id=5", 200, "sold out");
        let ex = extractor(
            &[r#"<template domain="x.com" name="x">
                <url pattern="^http://x\.com/p/(\d+)$">
                    <support><field name="sku" output="SKU-${1}"/></support>
                    <item name="p">
                        <field name="stock" xpath="//b" type="text" request="http://api.x.com/stock?id=$1" filter="stock: (\d+)" output="${0}${sku}"/>
                        <field name="name" xpath="//b" type="text"/>
                    </item>
                </url>
            </template>"#],
            fetcher,
        );

        let result = ex.extract("http://x.com/p/5", b"<b>Widget</b>").unwrap();
        assert_eq!(result.items("p"), &[record(&[("stock", ""), ("name", "Widget")])]);
    }

    #[test]
    fn test_methods_are_applied() {
        let mut ex = extractor(
            &[r#"<template domain="x.com" name="x">
                <url pattern=".">
                    <item name="i" xpath="//p">
                        <field name="a" type="text" method="shout"/>
                        <field name="b" type="text" method="nope"/>
                    </item>
                </url>
            </template>"#],
            StubFetcher::default(),
        );
        ex.register_method("shout", |s: &str| format!("{}!", s.to_uppercase()));

        let result = ex.extract("http://x.com/", b"<p>hi</p>").unwrap();
        assert_eq!(result.items("i"), &[record(&[("a", "HI!"), ("b", "")])]);
    }

    #[test]
    fn test_call_level_errors() {
        let ex = extractor(
            &[r#"<template domain="x.com" name="x"><url pattern="."/></template>"#],
            StubFetcher::default(),
        );

        assert!(matches!(
            ex.extract("http://y.com/", b"<p/>"),
            Err(ExtractError::TemplateNotFound(_))
        ));
        assert!(matches!(
            ex.extract("http://www.x.com/", &[0xff, 0xfe]),
            Err(ExtractError::Parse(_))
        ));
        assert!(ex.extract("http://www.x.com/", b"<p/>").is_ok());
    }

    #[test]
    fn test_concurrent_extraction() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Extractor>();

        let ex = extractor(
            &[r#"<template domain="x.com" name="x">
                <url pattern="^http://x\.com/(\d+)$">
                    <item name="i" xpath="//p"><field name="v" type="text" output="${1}:${0}"/></item>
                </url>
            </template>"#],
            StubFetcher::default(),
        );

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|n| {
                    let ex = &ex;
                    s.spawn(move || {
                        let page = format!("<p>page{n}</p>");
                        ex.extract(&format!("http://x.com/{n}"), page.as_bytes()).unwrap()
                    })
                })
                .collect();
            for (n, handle) in handles.into_iter().enumerate() {
                let result = handle.join().unwrap();
                let expected = format!("{n}:page{n}");
                assert_eq!(result.items("i")[0]["v"], expected);
            }
        });
    }
}
