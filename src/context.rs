//! RO-Crate @context handling
//!
//! The context only stores the extension terms; the RO-Crate base context is
//! implied and prepended on output.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use crate::vocab::ROCRATE_CONTEXT;

/// Extension terms of a crate's @context, name -> absolute URI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    terms: IndexMap<String, String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, uri: impl Into<String>) {
        self.terms.insert(name.into(), uri.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.terms.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.terms.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.terms.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.terms.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Wire form: the base context alone, or `[base, {extensions}]`
    pub fn to_json(&self) -> Value {
        if self.terms.is_empty() {
            json!(ROCRATE_CONTEXT)
        } else {
            let extensions: Map<String, Value> = self
                .terms
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            json!([ROCRATE_CONTEXT, extensions])
        }
    }

    /// Parse a wire @context, keeping only string-valued extension terms
    pub fn from_json(value: &Value) -> Self {
        let mut context = Context::new();
        match value {
            Value::Array(items) => {
                for item in items {
                    context.absorb(item);
                }
            }
            other => context.absorb(other),
        }
        context
    }

    fn absorb(&mut self, item: &Value) {
        if let Value::Object(obj) = item {
            for (name, uri) in obj {
                if let Some(uri) = uri.as_str() {
                    self.add(name.clone(), uri);
                }
            }
        }
    }
}
