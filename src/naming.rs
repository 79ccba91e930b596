//! Class and property naming
//!
//! Heurist record types become RO-Crate classes and fields become properties.
//! Their names are synthesized from the Heurist display names and must stay
//! unique across the generated vocabulary.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::id::SourceKey;
use crate::vocab::is_reserved_class;

static PARENTHESES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]+\)").expect("valid regex"));
static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9 ]").expect("valid regex"));

/// A Heurist entity that can be given a class or property name
pub trait Named {
    fn source_key(&self) -> SourceKey;
    /// The human-readable name the synthesized name is derived from
    fn label(&self) -> &str;
}

fn words(label: &str) -> Vec<String> {
    let without_parentheses = PARENTHESES.replace_all(label, "");
    let cleaned = NON_ALPHANUMERIC.replace_all(&without_parentheses, " ");
    cleaned.split_whitespace().map(String::from).collect()
}

fn upper_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// PascalCase class name: "Historical event (legacy)" -> "HistoricalEvent"
pub fn class_name(label: &str) -> String {
    words(label).iter().map(|w| upper_first(w)).collect()
}

/// camelCase property name: "Date of birth" -> "dateOfBirth"
pub fn property_name(label: &str) -> String {
    words(label)
        .iter()
        .enumerate()
        .map(|(index, word)| {
            if index == 0 {
                word.to_ascii_lowercase()
            } else {
                upper_first(word)
            }
        })
        .collect()
}

/// Assigns unique names to Heurist entities, memoized per entity
#[derive(Debug, Default)]
pub struct NameResolver {
    resolved: HashMap<SourceKey, String>,
    taken: HashSet<String>,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_resolved<N: Named + ?Sized>(&self, entity: &N) -> bool {
        self.resolved.contains_key(&entity.source_key())
    }

    /// The name assigned to a key, if any
    pub fn get(&self, key: &SourceKey) -> Option<&str> {
        self.resolved.get(key).map(String::as_str)
    }

    /// Resolve an entity's name
    ///
    /// The first call synthesizes and memoizes the name; `context_name` is
    /// prepended to the label when the plain name is already taken (or is a
    /// reserved class name). Later calls return the memoized name whatever
    /// `context_name` they pass.
    pub fn resolve<N: Named + ?Sized>(&mut self, entity: &N, context_name: &str) -> String {
        let key = entity.source_key();
        if let Some(name) = self.resolved.get(&key) {
            return name.clone();
        }

        let is_class = key.is_class();
        let mut name = synthesize(entity.label(), is_class);
        if self.is_taken(&name, is_class) {
            let prefixed = synthesize(&format!("{} {}", context_name, entity.label()), is_class);
            if !prefixed.is_empty() {
                name = prefixed;
            }
        }
        if self.is_taken(&name, is_class) {
            let mut delta = 1;
            while self.is_taken(&format!("{}{}", name, delta), is_class) {
                delta += 1;
            }
            name = format!("{}{}", name, delta);
        }

        self.add_entry_from_identifier(key, name.clone());
        name
    }

    /// Whether the entity's unprefixed name collides with an assigned name
    ///
    /// Always false once the entity itself has been resolved.
    pub fn has_name_conflict<N: Named + ?Sized>(&self, entity: &N) -> bool {
        let key = entity.source_key();
        if self.resolved.contains_key(&key) {
            return false;
        }
        self.taken.contains(&synthesize(entity.label(), key.is_class()))
    }

    /// Seed a name directly, bypassing synthesis
    pub fn add_entry_from_identifier(&mut self, key: SourceKey, name: impl Into<String>) {
        let name = name.into();
        self.taken.insert(name.clone());
        self.resolved.insert(key, name);
    }

    pub fn add_entry<N: Named + ?Sized>(&mut self, entity: &N, name: impl Into<String>) {
        self.add_entry_from_identifier(entity.source_key(), name);
    }

    fn is_taken(&self, name: &str, is_class: bool) -> bool {
        self.taken.contains(name) || (is_class && is_reserved_class(name))
    }
}

fn synthesize(label: &str, is_class: bool) -> String {
    let name = if is_class {
        class_name(label)
    } else {
        property_name(label)
    };
    if !name.is_empty() {
        name
    } else if is_class {
        "Unnamed".to_string()
    } else {
        "unnamed".to_string()
    }
}
