//! Site templates
//!
//! A template is an XML file:
//!
//! ```xml
//! <template domain="x.com" name="x">
//!   <url pattern="^http://x\.com/(\w+)$" id="${1}">
//!     <support xpath="//head">
//!       <field name="title" xpath="title" type="text"/>
//!     </support>
//!     <link name="next" xpath="//div[@class='pager']" type="a"/>
//!     <item name="product" xpath="//div[@class='product']">
//!       <field name="price" xpath="span" type="text" pattern="(\d+)" output="${1}"/>
//!     </item>
//!   </url>
//! </template>
//! ```
//!
//! Regexes, path expressions and combines are compiled once here, so a
//! malformed template fails at load time and never during extraction.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;

use crate::combine::Combine;
use crate::error::TemplateError;
use crate::path::NodePath;
use crate::site;

const TEMPLATE: &str = "template";
const URL: &str = "url";
const SUPPORT: &str = "support";
const LINK: &str = "link";
const ITEM: &str = "item";
const FIELD: &str = "field";

#[derive(Debug, Clone)]
pub struct Template {
    pub domain: String,
    pub name: String,
    pub urls: Vec<UrlSection>,
}

/// Rules for the URLs matching `pattern`.
#[derive(Debug, Clone)]
pub struct UrlSection {
    pub pattern: Regex,
    /// Extra attributes of `<url>`, evaluated against the URL's own captures.
    pub extra: Vec<(String, Combine)>,
    pub supports: Vec<ItemSection>,
    pub links: Vec<FieldSection>,
    pub items: Vec<ItemSection>,
}

/// A `<support>` or `<item>` block.
#[derive(Debug, Clone)]
pub struct ItemSection {
    pub name: String,
    pub path: Option<NodePath>,
    pub fields: Vec<FieldSection>,
}

/// A `<field>` or `<link>`: how to derive one value (or a set of links).
#[derive(Debug, Clone)]
pub struct FieldSection {
    pub name: String,
    pub path: Option<NodePath>,
    pub kind: FieldKind,
    /// Attribute read by `type="attr"`.
    pub prop: String,
    pub pattern: Option<Regex>,
    pub request: Option<Combine>,
    pub filter: Option<Regex>,
    /// Defaults to `${0}`.
    pub output: Combine,
    pub method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// No `type`: the seed text is empty.
    Bare,
    Html,
    Text,
    Attr,
    Anchor,
    Image,
    /// Unrecognized `type`; behaves like `Bare`.
    Other(String),
}

impl FieldKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "" => FieldKind::Bare,
            "html" => FieldKind::Html,
            "text" => FieldKind::Text,
            "attr" => FieldKind::Attr,
            "a" => FieldKind::Anchor,
            "img" => FieldKind::Image,
            other => FieldKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldKind::Bare => "",
            FieldKind::Html => "html",
            FieldKind::Text => "text",
            FieldKind::Attr => "attr",
            FieldKind::Anchor => "a",
            FieldKind::Image => "img",
            FieldKind::Other(s) => s,
        }
    }

    /// `a` and `img` fields produce links rather than text.
    pub fn is_link(&self) -> bool {
        matches!(self, FieldKind::Anchor | FieldKind::Image)
    }
}

impl Template {
    pub fn parse(markup: &str) -> Result<Self, TemplateError> {
        let root = read_tree(markup)?;
        Self::from_element(&root)
    }

    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let markup = fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&markup)
    }

    fn from_element(el: &RawElement) -> Result<Self, TemplateError> {
        el.expect_name(TEMPLATE)?;

        let mut domain = String::new();
        let mut name = String::new();
        for (key, value) in &el.attrs {
            match key.as_str() {
                "domain" => domain = value.clone(),
                "name" => name = value.clone(),
                _ => return Err(unknown_attribute(TEMPLATE, key)),
            }
        }
        if domain.is_empty() {
            return Err(missing_attribute(TEMPLATE, "domain"));
        }
        if name.is_empty() {
            return Err(missing_attribute(TEMPLATE, "name"));
        }

        let urls = el
            .children
            .iter()
            .map(UrlSection::from_element)
            .collect::<Result<_, _>>()?;

        Ok(Self { domain, name, urls })
    }
}

impl UrlSection {
    fn from_element(el: &RawElement) -> Result<Self, TemplateError> {
        el.expect_name(URL)?;

        let mut pattern = None;
        let mut extra = Vec::new();
        for (key, value) in &el.attrs {
            if key == "pattern" {
                pattern = compile_regex(key, value)?;
            } else {
                extra.push((key.clone(), Combine::parse(value)));
            }
        }
        let pattern = pattern.ok_or_else(|| missing_attribute(URL, "pattern"))?;

        let mut section = Self {
            pattern,
            extra,
            supports: Vec::new(),
            links: Vec::new(),
            items: Vec::new(),
        };
        for child in &el.children {
            match child.name.as_str() {
                SUPPORT => section.supports.push(ItemSection::from_element(child, SUPPORT)?),
                LINK => section.links.push(FieldSection::from_element(child, LINK)?),
                ITEM => section.items.push(ItemSection::from_element(child, ITEM)?),
                other => tracing::debug!(element = other, "skipping unknown element in <url>"),
            }
        }
        Ok(section)
    }
}

impl ItemSection {
    fn from_element(el: &RawElement, element: &'static str) -> Result<Self, TemplateError> {
        let mut name = String::new();
        let mut path = None;
        for (key, value) in &el.attrs {
            match key.as_str() {
                "name" => name = value.clone(),
                "xpath" => path = compile_path(value)?,
                _ => return Err(unknown_attribute(element, key)),
            }
        }
        if element == ITEM && name.is_empty() {
            return Err(missing_attribute(ITEM, "name"));
        }

        let fields: Vec<FieldSection> = el
            .children
            .iter()
            .map(|child| FieldSection::from_element(child, FIELD))
            .collect::<Result<_, _>>()?;

        // Support fields read the section's scope node directly.
        if element == SUPPORT {
            for field in fields.iter().filter(|f| f.path.is_some()) {
                tracing::warn!(field = %field.name, "xpath on a <support> field is ignored");
            }
        }

        Ok(Self { name, path, fields })
    }
}

impl FieldSection {
    fn from_element(el: &RawElement, element: &'static str) -> Result<Self, TemplateError> {
        el.expect_name(element)?;

        let mut field = Self {
            name: String::new(),
            path: None,
            kind: FieldKind::Bare,
            prop: String::new(),
            pattern: None,
            request: None,
            filter: None,
            output: Combine::whole_match(),
            method: None,
        };
        for (key, value) in &el.attrs {
            match key.as_str() {
                "name" => field.name = value.clone(),
                "xpath" => field.path = compile_path(value)?,
                "type" => field.kind = FieldKind::parse(value),
                "prop" => field.prop = value.clone(),
                "pattern" => field.pattern = compile_regex(key, value)?,
                "request" => field.request = parse_combine(value),
                "filter" => field.filter = compile_regex(key, value)?,
                "output" => {
                    if let Some(output) = parse_combine(value) {
                        field.output = output;
                    }
                }
                "method" if !value.is_empty() => field.method = Some(value.clone()),
                "method" => {}
                _ => return Err(unknown_attribute(element, key)),
            }
        }

        if element == LINK && field.name.is_empty() {
            return Err(missing_attribute(LINK, "name"));
        }
        if let FieldKind::Other(kind) = &field.kind {
            tracing::warn!(
                field = %field.name,
                kind = %kind,
                "unknown field type, seed text will be empty"
            );
        }
        Ok(field)
    }
}

fn compile_regex(attribute: &str, value: &str) -> Result<Option<Regex>, TemplateError> {
    if value.is_empty() {
        return Ok(None);
    }
    Regex::new(value)
        .map(Some)
        .map_err(|source| TemplateError::InvalidRegex {
            attribute: attribute.to_string(),
            source,
        })
}

fn compile_path(value: &str) -> Result<Option<NodePath>, TemplateError> {
    if value.is_empty() {
        return Ok(None);
    }
    NodePath::parse(value)
        .map(Some)
        .map_err(|source| TemplateError::InvalidPath {
            expr: value.to_string(),
            source,
        })
}

fn parse_combine(value: &str) -> Option<Combine> {
    let combine = Combine::parse(value);
    (!combine.is_empty()).then_some(combine)
}

fn missing_attribute(element: &'static str, attribute: &'static str) -> TemplateError {
    TemplateError::MissingAttribute { element, attribute }
}

fn unknown_attribute(element: &'static str, attribute: &str) -> TemplateError {
    TemplateError::UnknownAttribute {
        element,
        attribute: attribute.to_string(),
    }
}

/// Element tree with text, comments and declarations already dropped.
#[derive(Debug)]
struct RawElement {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<RawElement>,
}

impl RawElement {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, TemplateError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attrs.push((key, value));
        }
        Ok(Self {
            name,
            attrs,
            children: Vec::new(),
        })
    }

    fn expect_name(&self, expected: &'static str) -> Result<(), TemplateError> {
        if self.name == expected {
            Ok(())
        } else {
            Err(TemplateError::UnexpectedElement {
                expected,
                found: self.name.clone(),
            })
        }
    }
}

fn read_tree(markup: &str) -> Result<RawElement, TemplateError> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<RawElement> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => stack.push(RawElement::from_start(&e)?),
            Event::Empty(e) => {
                let el = RawElement::from_start(&e)?;
                attach(&mut stack, &mut root, el);
            }
            Event::End(_) => {
                if let Some(el) = stack.pop() {
                    attach(&mut stack, &mut root, el);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    root.ok_or(TemplateError::Empty)
}

fn attach(stack: &mut [RawElement], root: &mut Option<RawElement>, el: RawElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(el),
        None if root.is_none() => *root = Some(el),
        None => tracing::debug!(element = %el.name, "ignoring extra top-level element"),
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "<template domain=\"{}\" name=\"{}\">",
            escape(&self.domain),
            escape(&self.name)
        )?;
        for url in &self.urls {
            write!(f, "  <url pattern=\"{}\"", escape(url.pattern.as_str()))?;
            for (key, value) in &url.extra {
                write!(f, " {key}=\"{}\"", escape(&value.to_string()))?;
            }
            writeln!(f, ">")?;

            for support in &url.supports {
                write_section(f, SUPPORT, support)?;
            }
            for link in &url.links {
                write_field(f, LINK, link, "    ")?;
            }
            for item in &url.items {
                write_section(f, ITEM, item)?;
            }
            writeln!(f, "  </url>")?;
        }
        writeln!(f, "</template>")
    }
}

fn write_section(f: &mut fmt::Formatter<'_>, element: &str, section: &ItemSection) -> fmt::Result {
    write!(f, "    <{element}")?;
    write_attr(f, "name", &section.name)?;
    if let Some(path) = &section.path {
        write_attr(f, "xpath", path.as_str())?;
    }
    writeln!(f, ">")?;
    for field in &section.fields {
        write_field(f, FIELD, field, "      ")?;
    }
    writeln!(f, "    </{element}>")
}

fn write_field(
    f: &mut fmt::Formatter<'_>,
    element: &str,
    field: &FieldSection,
    indent: &str,
) -> fmt::Result {
    write!(f, "{indent}<{element}")?;
    write_attr(f, "name", &field.name)?;
    if let Some(path) = &field.path {
        write_attr(f, "xpath", path.as_str())?;
    }
    write_attr(f, "type", field.kind.as_str())?;
    write_attr(f, "prop", &field.prop)?;
    if let Some(pattern) = &field.pattern {
        write_attr(f, "pattern", pattern.as_str())?;
    }
    if let Some(request) = &field.request {
        write_attr(f, "request", &request.to_string())?;
    }
    if let Some(filter) = &field.filter {
        write_attr(f, "filter", filter.as_str())?;
    }
    write_attr(f, "output", &field.output.to_string())?;
    if let Some(method) = &field.method {
        write_attr(f, "method", method)?;
    }
    writeln!(f, "/>")
}

fn write_attr(f: &mut fmt::Formatter<'_>, key: &str, value: &str) -> fmt::Result {
    if value.is_empty() {
        return Ok(());
    }
    write!(f, " {key}=\"{}\"", escape(value))
}

/// Loaded templates keyed by domain.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: HashMap<String, Template>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every regular file in `dir` as a template. Files are read in name
    /// order; a later file with the same domain replaces an earlier one.
    pub fn load_dir(dir: &Path) -> Result<Self, TemplateError> {
        let io_err = |source| TemplateError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        let mut set = Self::new();
        for file in &files {
            let template = Template::from_file(file)?;
            tracing::info!(file = %file.display(), domain = %template.domain, "loaded template");
            set.insert(template);
        }
        Ok(set)
    }

    pub fn insert(&mut self, template: Template) {
        let domain = template.domain.clone();
        if let Some(old) = self.templates.insert(domain, template) {
            tracing::warn!(domain = %old.domain, replaced = %old.name, "duplicate template domain");
        }
    }

    pub fn get(&self, domain: &str) -> Option<&Template> {
        self.templates.get(domain)
    }

    /// Look a URL up by its site (host) first, then by its domain.
    pub fn find(&self, url: &str) -> Option<&Template> {
        let site = site::site_of(url);
        self.get(&site)
            .or_else(|| self.get(&site::domain_of(&site)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
