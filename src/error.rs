//! Error types
//!
//! Only load-time and call-level failures are errors. Anything that goes wrong
//! while resolving a single field degrades that field to an empty string.

use std::path::PathBuf;

use thiserror::Error;

use crate::path::PathError;

/// A template could not be built from its markup.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("<{element}> has unknown attribute '{attribute}'")]
    UnknownAttribute {
        element: &'static str,
        attribute: String,
    },

    #[error("expected <{expected}>, found <{found}>")]
    UnexpectedElement {
        expected: &'static str,
        found: String,
    },

    #[error("invalid regex in '{attribute}': {source}")]
    InvalidRegex {
        attribute: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid path expression '{expr}': {source}")]
    InvalidPath {
        expr: String,
        #[source]
        source: PathError,
    },

    #[error("template markup has no root element")]
    Empty,

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The fetched document could not be turned into a DOM.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// A single GET through the network collaborator failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),

    #[error("unexpected status {0}")]
    Status(u16),
}

/// The network collaborator could not be set up.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid proxy '{proxy}': {source}")]
    InvalidProxy {
        proxy: String,
        #[source]
        source: ureq::Error,
    },

    #[error("{}:{line}: expected name=value", path.display())]
    CookieFormat { path: PathBuf, line: usize },
}

/// An extraction call failed before the engine ran.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no template for {0}")]
    TemplateNotFound(String),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// An [`Extractor`](crate::Extractor) could not be constructed.
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Configuration file could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
