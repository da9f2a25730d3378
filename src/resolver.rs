//! Field resolution
//!
//! A field turns seed text into a value in five stages:
//! `pattern` splits the seed into captures, `request`/`filter` optionally
//! replace them with captures from a chained fetch, `output` joins them back
//! into a string and `method` post-processes the result.
//!
//! Every failure along the way (no match, missing variable, failed fetch,
//! unknown method) yields an empty string instead of an error.

use regex::Regex;
use scraper::ElementRef;

use crate::context::Context;
use crate::document::{attr_of, inner_html_of, text_of};
use crate::fetch::Fetcher;
use crate::methods::MethodRegistry;
use crate::result::Link;
use crate::template::{FieldKind, FieldSection};

pub struct FieldResolver<'a> {
    fetcher: &'a dyn Fetcher,
    methods: &'a MethodRegistry,
}

impl<'a> FieldResolver<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, methods: &'a MethodRegistry) -> Self {
        Self { fetcher, methods }
    }

    /// Resolve `field` against `seed`. `ctx` is this call's private scope;
    /// `base_url` is sent as the referer of any chained request.
    pub fn resolve(
        &self,
        base_url: &str,
        seed: &str,
        field: &FieldSection,
        mut ctx: Context,
    ) -> String {
        let captures = match &field.pattern {
            Some(pattern) => match captures_of(pattern, seed) {
                Some(captures) => captures,
                None => return String::new(),
            },
            None => vec![seed.to_string()],
        };
        ctx.cover(&captures);

        if let Some(request) = &field.request {
            let url = request.exec(&ctx);
            if !url.is_empty() {
                let Some(body) = self.download(&url, base_url) else {
                    return String::new();
                };
                match &field.filter {
                    Some(filter) => match captures_of(filter, &body) {
                        Some(captures) => ctx.cover(&captures),
                        None => {
                            tracing::debug!(
                                field = %field.name,
                                url = %url,
                                "filter did not match response"
                            );
                            ctx.clear();
                        }
                    },
                    None => ctx.insert("0", body),
                }
            }
        }

        let value = field.output.exec(&ctx);

        match &field.method {
            Some(name) => self.methods.apply(name, &value).unwrap_or_else(|| {
                tracing::debug!(field = %field.name, method = %name, "method not registered");
                String::new()
            }),
            None => value,
        }
    }

    /// Resolve with the node's text as seed, chosen by the field's type.
    /// Types without node text still resolve, with an empty seed.
    pub fn content(
        &self,
        base_url: &str,
        node: ElementRef<'_>,
        field: &FieldSection,
        ctx: &Context,
    ) -> String {
        let seed = match field.kind {
            FieldKind::Html => inner_html_of(node),
            FieldKind::Text => text_of(node),
            FieldKind::Attr => attr_of(node, &field.prop),
            _ => String::new(),
        };
        self.resolve(base_url, &seed, field, ctx.clone())
    }

    /// Collect links from `a` (href, text) or `img` (src, alt) elements at or
    /// below `node`, in document order. With `single`, stop at the first one.
    pub fn links(
        &self,
        base_url: &str,
        node: ElementRef<'_>,
        field: &FieldSection,
        ctx: &Context,
        single: bool,
    ) -> Vec<Link> {
        let (tag, url_attr) = match field.kind {
            FieldKind::Anchor => ("a", "href"),
            FieldKind::Image => ("img", "src"),
            _ => return Vec::new(),
        };

        let mut links = Vec::new();
        let candidates = node
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == tag);
        for el in candidates {
            let url = self.resolve(base_url, &attr_of(el, url_attr), field, ctx.clone());
            if url.is_empty() {
                continue;
            }
            let anchor = match field.kind {
                FieldKind::Anchor => text_of(el),
                _ => attr_of(el, "alt"),
            };
            links.push(Link { url, anchor });
            if single {
                break;
            }
        }
        links
    }

    fn download(&self, url: &str, referer: &str) -> Option<String> {
        match self.fetcher.get(url, referer) {
            Ok(response) if response.is_success() => {
                let body = response.text();
                tracing::trace!(url, body = %body, "chained request");
                Some(body)
            }
            Ok(response) => {
                tracing::debug!(url, status = response.status, "chained request failed");
                None
            }
            Err(err) => {
                tracing::debug!(url, error = %err, "chained request failed");
                None
            }
        }
    }
}

/// Whole match followed by every group; groups that did not participate are "".
pub(crate) fn captures_of(re: &Regex, text: &str) -> Option<Vec<String>> {
    let captures = re.captures(text)?;
    Some(
        captures
            .iter()
            .map(|m| m.map_or_else(String::new, |m| m.as_str().to_string()))
            .collect(),
    )
}
