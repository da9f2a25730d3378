//! Variable scope used while resolving fields
//!
//! Numeric keys ("0", "1", ...) hold the capture groups of the most recent
//! matching step; named keys hold support variables. Nested scopes receive a
//! clone, so writes never leak into sibling scopes.

use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    vars: HashMap<String, String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scope from regex captures, keyed by group index.
    pub fn from_captures(captures: &[String]) -> Self {
        let mut ctx = Self::new();
        ctx.cover(captures);
        ctx
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Write `values` under "0", "1", ..., replacing existing numeric keys.
    /// Named keys and numeric keys past the end of `values` are left alone.
    pub fn cover(&mut self, values: &[String]) {
        for (i, value) in values.iter().enumerate() {
            self.vars.insert(i.to_string(), value.clone());
        }
    }

    /// Drop every key, numeric and named.
    pub fn clear(&mut self) {
        self.vars.clear();
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Context
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cover_keeps_named_keys() {
        let mut ctx: Context = [("0", "old"), ("1", "one"), ("id", "7")].into_iter().collect();
        ctx.cover(&["new".to_string()]);

        assert_eq!(ctx.get("0"), Some("new"));
        assert_eq!(ctx.get("1"), Some("one"));
        assert_eq!(ctx.get("id"), Some("7"));
    }

    #[test]
    fn test_clone_isolates_scopes() {
        let parent: Context = [("and", "&")].into_iter().collect();
        let mut child = parent.clone();
        child.insert("x", "1");

        assert!(child.contains("x"));
        assert!(!parent.contains("x"));
    }
}
