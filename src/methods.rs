//! Named post-processing functions applied to resolved field values

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type FieldMethod = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Registry consulted by a field's `method` attribute. Populate it before
/// extraction starts; an unregistered name turns the field's value into "".
#[derive(Clone, Default)]
pub struct MethodRegistry {
    methods: HashMap<String, FieldMethod>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, method: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(method));
    }

    pub fn get(&self, name: &str) -> Option<&FieldMethod> {
        self.methods.get(name)
    }

    /// Apply `name` to `value`; `None` if no such method is registered.
    pub fn apply(&self, name: &str, value: &str) -> Option<String> {
        self.get(name).map(|method| method(value))
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("MethodRegistry").field("methods", &names).finish()
    }
}
