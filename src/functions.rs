//! Value functions
//!
//! A configuration can attach a named function to a field or base field. The
//! function then supplies the emitted value instead of the type-based
//! rendering.

use std::collections::HashMap;

use crate::entity::PropertyValue;
use crate::error::ConvertError;
use crate::source::FieldValue;

/// Name of the verbatim text function
pub const TO_TEXT: &str = "to_text";

/// A named transform of a field value
pub trait ValueFunction {
    fn name(&self) -> &'static str;

    fn apply(&self, value: &FieldValue) -> PropertyValue;
}

/// Emits the raw field value as a plain string
pub struct ToText;

impl ValueFunction for ToText {
    fn name(&self) -> &'static str {
        TO_TEXT
    }

    fn apply(&self, value: &FieldValue) -> PropertyValue {
        PropertyValue::from(value.raw.as_str())
    }
}

/// Dispatch table of the known value functions
pub struct FunctionRegistry {
    functions: HashMap<&'static str, Box<dyn ValueFunction>>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };
        registry.register(Box::new(ToText));
        registry
    }
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, function: Box<dyn ValueFunction>) {
        self.functions.insert(function.name(), function);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Look up a function by name
    ///
    /// # Errors
    /// Returns `UnknownValueFunction` for any name that is not registered.
    pub fn get(&self, name: &str) -> Result<&dyn ValueFunction, ConvertError> {
        self.functions
            .get(name)
            .map(|function| function.as_ref())
            .ok_or_else(|| ConvertError::UnknownValueFunction(name.to_string()))
    }

    /// Apply the named function to a field value
    pub fn apply(&self, name: &str, value: &FieldValue) -> Result<PropertyValue, ConvertError> {
        Ok(self.get(name)?.apply(value))
    }
}
