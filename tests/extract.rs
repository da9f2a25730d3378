// tests/extract.rs
//
// Whole-pipeline extraction over templates loaded from disk.
//
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use template_extract::{
    ExtractError, ExtractResult, Extractor, FetchError, FetchResponse, Fetcher, Item, Link, Options,
    TemplateSet,
};

const SHOP_TEMPLATE: &str = r#"<template domain="shop.com" name="shop">
    <url pattern="^https?://(?:www\.)?shop\.com/list/(\w+)\?page=(\d+)$" category="${1}">
        <link name="next" xpath="//div[@class='pager']" type="a" pattern="page=(\d+)" output="http://shop.com/list/${category}?page=${1}"/>
        <item name="product" xpath="//li[@class='product']">
            <field name="id" xpath="a" type="attr" prop="data-id"/>
            <field name="title" xpath="a" type="text"/>
            <field name="url" xpath="a" type="a"/>
            <field name="stock" xpath="a" type="attr" prop="data-id"
                   request="http://api.shop.com/stock?id=${0}${and}cat=${category}"
                   filter="&quot;stock&quot;:\s*(\d+)" output="${1}"/>
            <field name="category" output="${category}"/>
        </item>
    </url>
    <url pattern="^https?://(?:www\.)?shop\.com/p/(\d+)$">
        <support xpath="//meta[@name='brand']">
            <field name="brand" type="attr" prop="content"/>
        </support>
        <item name="detail">
            <field name="sku" output="${brand}-${1}"/>
            <field name="price" xpath="//span[@class='price']" type="text" pattern="([\d.]+)" output="${1}" method="cents"/>
        </item>
    </url>
</template>
"#;

const LIST_PAGE: &str = r#"<html><body>
<ul>
  <li class="product"><a data-id="11" href="/p/11">Kettle</a></li>
  <li class="product"><a data-id="12" href="/p/12">Toaster</a></li>
  <li class="ad"><a data-id="99" href="/ad">Ad</a></li>
</ul>
<div class="pager"><a href="?page=1">prev</a><a href="?page=3">next</a></div>
</body></html>"#;

const DETAIL_PAGE: &str = r#"<html><head><title>Kettle</title><meta name="brand" content="ACME"></head>
<body><span class="price">$12.50</span></body></html>"#;

#[derive(Default)]
struct StockApi {
    stock: HashMap<String, String>,
    requests: Mutex<Vec<(String, String)>>,
}

impl Fetcher for StockApi {
    fn get(&self, url: &str, referer: &str) -> Result<FetchResponse, FetchError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), referer.to_string()));
        match self.stock.get(url) {
            Some(body) => Ok(FetchResponse::ok(body.as_bytes())),
            None => Ok(FetchResponse {
                status: 500,
                body: Vec::new(),
            }),
        }
    }
}

fn write_templates(dir: &Path) {
    fs::write(dir.join("shop.xml"), SHOP_TEMPLATE).unwrap();
    fs::write(
        dir.join("blog.xml"),
        r#"<template domain="blog.org" name="blog"><url pattern="."><link name="posts" type="a"/></url></template>"#,
    )
    .unwrap();
}

fn item(pairs: &[(&str, &str)]) -> Item {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn shop_extractor(api: Arc<StockApi>) -> Extractor {
    let dir = tempfile::tempdir().unwrap();
    write_templates(dir.path());
    let templates = TemplateSet::load_dir(dir.path()).unwrap();
    assert_eq!(templates.len(), 2);

    let mut extractor = Extractor::from_parts(templates, api);
    extractor.register_method("cents", |s: &str| {
        s.parse::<f64>()
            .map(|v| format!("{}", (v * 100.0).round() as i64))
            .unwrap_or_default()
    });
    extractor
}

#[test]
fn list_page_items_links_and_chained_requests() {
    let api = Arc::new(StockApi {
        stock: HashMap::from([(
            "http://api.shop.com/stock?id=11&cat=kitchen".to_string(),
            r#"{"stock": 4}"#.to_string(),
        )]),
        ..StockApi::default()
    });
    let extractor = shop_extractor(api.clone());

    let url = "http://www.shop.com/list/kitchen?page=2";
    let result = extractor.extract(url, LIST_PAGE.as_bytes()).unwrap();

    assert_eq!(
        result.items("product"),
        &[
            item(&[
                ("id", "11"),
                ("title", "Kettle"),
                ("url", "/p/11"),
                ("stock", "4"),
                ("category", "kitchen"),
            ]),
            item(&[
                ("id", "12"),
                ("title", "Toaster"),
                ("url", "/p/12"),
                ("stock", ""),
                ("category", "kitchen"),
            ]),
        ]
    );
    assert_eq!(
        result.links("next"),
        &[
            Link::new("http://shop.com/list/kitchen?page=1", "prev"),
            Link::new("http://shop.com/list/kitchen?page=3", "next"),
        ]
    );

    let requests = api.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|(_, referer)| referer == url));
}

#[test]
fn detail_page_uses_second_section() {
    let extractor = shop_extractor(Arc::new(StockApi::default()));

    let result = extractor
        .extract("https://shop.com/p/11", DETAIL_PAGE.as_bytes())
        .unwrap();
    assert_eq!(
        result.items("detail"),
        &[item(&[("sku", "ACME-11"), ("price", "1250")])]
    );
    assert!(result.links.is_empty());
    assert!(result.items("product").is_empty());
}

#[test]
fn result_serializes_to_json() {
    let extractor = shop_extractor(Arc::new(StockApi::default()));
    let result: ExtractResult = extractor
        .extract("https://shop.com/p/11", DETAIL_PAGE.as_bytes())
        .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "items": { "detail": [ { "price": "1250", "sku": "ACME-11" } ] },
            "links": {}
        })
    );
}

#[test]
fn extractor_from_options() {
    let dir = tempfile::tempdir().unwrap();
    write_templates(dir.path());

    let options = Options {
        template_dir: dir.path().to_path_buf(),
        proxy_file: Some(dir.path().join("missing.list")),
        ..Options::default()
    };
    let extractor = Extractor::new(&options).unwrap();
    assert_eq!(extractor.templates().len(), 2);

    let result = extractor
        .extract(
            "https://news.blog.org/2024",
            br#"<a href="/a">A</a><p><a href="/b">B</a></p>"#,
        )
        .unwrap();
    assert_eq!(
        result.links("posts"),
        &[Link::new("/a", "A"), Link::new("/b", "B")]
    );

    assert!(matches!(
        extractor.extract("https://unknown.net/", b"<p/>"),
        Err(ExtractError::TemplateNotFound(_))
    ));
}

#[test]
fn broken_template_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("bad.xml"),
        r#"<template domain="bad.com" name="bad"><url pattern="(unclosed"/></template>"#,
    )
    .unwrap();

    let options = Options {
        template_dir: dir.path().to_path_buf(),
        proxy_file: None,
        ..Options::default()
    };
    assert!(Extractor::new(&options).is_err());
}
