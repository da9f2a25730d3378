//! Template-driven HTML extraction
//!
//! Per-site XML templates describe which parts of a page become records and
//! links:
//! - `<url>` sections selected by a regex over the page URL
//! - `<support>` fields resolved once into page-level variables
//! - `<link>` fields collected into named link lists
//! - `<item>` sections producing one record per matched node
//!
//! Field values flow through regex captures and the `${name}` combine
//! language, optionally via a chained HTTP request.

pub mod combine;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod extractor;
pub mod fetch;
pub mod methods;
pub mod path;
pub mod resolver;
pub mod result;
pub mod site;
pub mod template;

pub use combine::Combine;
pub use config::Options;
pub use context::Context;
pub use document::Document;
pub use error::{
    ClientError, ConfigError, ExtractError, ExtractorError, FetchError, ParseError, TemplateError,
};
pub use extractor::Extractor;
pub use fetch::{FetchResponse, Fetcher, HttpClient};
pub use methods::MethodRegistry;
pub use path::{NodePath, PathError};
pub use resolver::FieldResolver;
pub use result::{ExtractResult, Item, Link};
pub use template::{FieldKind, FieldSection, ItemSection, Template, TemplateSet, UrlSection};
