//! Extractor configuration

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Directory holding one template file per site.
    pub template_dir: PathBuf,
    pub user_agent: String,
    /// Line-delimited proxy URLs. Ignored if the file does not exist.
    pub proxy_file: Option<PathBuf>,
    /// `<dir>/<domain>/<file>` with `name=value` cookie lines.
    pub cookie_dir: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("template"),
            user_agent: "template-extract".to_string(),
            proxy_file: Some(PathBuf::from("proxy.list")),
            cookie_dir: None,
            timeout_secs: 30,
        }
    }
}

impl Options {
    /// Read options from a JSON file; missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}
