//! Mapping configuration
//!
//! A configuration is itself an RO-Crate. Mapping entities point at a Heurist
//! record type or vocabulary through `_sourceType`; their @type is the class to
//! use and their properties map fields or term attributes to property names.
//! `rdfs:Class` and `rdf:Property` entities not labelled with a leading
//! underscore are custom definitions merged into every converted crate.
//!
//! ```json
//! {"@id": "#person", "@type": "Person",
//!  "_sourceType": {"@id": "#rt10"},
//!  "_name": {"@id": "#f1"}}
//! {"@id": "#rt10", "@type": "_RecordType", "_sourceIdentifier": "10"}
//! {"@id": "#f1", "@type": "_Field", "_sourceIdentifier": "1"}
//! ```

use indexmap::IndexMap;

use crate::diagnostics::Diagnostics;
use crate::entity::{Entity, EntityRef, PropertyValue};
use crate::error::ConvertError;
use crate::id::{field_id, term_attribute_id, TermAttribute};
use crate::metadata::Metadata;
use crate::vocab::{
    CFG_BASE_FIELD, CFG_FIELD, CFG_NAME_ALIAS, CFG_RECORD_TYPE, CFG_SOURCE_IDENTIFIER,
    CFG_SOURCE_TYPE, CFG_TERM_CODE, CFG_TERM_DESCRIPTION, CFG_TERM_LABEL, CFG_VALUE_FUNCTION,
    CFG_VOCABULARY, RDFS_CLASS, RDFS_LABEL, RDF_PROPERTY,
};

/// Mapping entity properties that never map a field
const EXCLUDED_PROPERTIES: [&str; 2] = [CFG_SOURCE_TYPE, "name"];

/// Lookup tables parsed from a configuration crate
#[derive(Debug, Default)]
pub struct Configuration {
    metadata: Metadata,
    term_classes: IndexMap<String, String>,
    term_properties: IndexMap<String, String>,
    record_type_classes: IndexMap<String, String>,
    field_properties: IndexMap<String, String>,
    field_functions: IndexMap<String, String>,
    custom_classes: IndexMap<String, EntityRef>,
    custom_properties: IndexMap<String, EntityRef>,
}

impl Configuration {
    /// A configuration mapping nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse the mappings of a loaded configuration crate
    ///
    /// Malformed mapping entities are reported and skipped.
    pub fn from_metadata(metadata: Metadata, diagnostics: &dyn Diagnostics) -> Self {
        let mut configuration = Self {
            metadata,
            ..Self::default()
        };
        let entities: Vec<EntityRef> = configuration.metadata.entities().cloned().collect();
        for entity_ref in &entities {
            let entity = entity_ref.borrow();
            if entity.get(CFG_SOURCE_TYPE).is_some() {
                configuration.parse_mapping(&entity, diagnostics);
            } else {
                configuration.parse_custom_definition(entity_ref, &entity);
            }
        }
        configuration
    }

    /// Load and parse a configuration crate from its JSON text
    pub fn from_json_str(content: &str, diagnostics: &dyn Diagnostics) -> Result<Self, ConvertError> {
        let metadata = Metadata::from_json_str(content)?;
        Ok(Self::from_metadata(metadata, diagnostics))
    }

    /// The configuration crate itself
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn term_class(&self, term_id: &str) -> Option<&str> {
        self.term_classes.get(term_id).map(String::as_str)
    }

    /// Property mapped to a term attribute, keyed `termId:attribute`
    pub fn term_property(&self, term_attribute_id: &str) -> Option<&str> {
        self.term_properties.get(term_attribute_id).map(String::as_str)
    }

    pub fn record_type_class(&self, record_type_id: &str) -> Option<&str> {
        self.record_type_classes.get(record_type_id).map(String::as_str)
    }

    /// Property mapped to a field (`rt:bf`) or a base field (`bf`)
    pub fn field_property(&self, id: &str) -> Option<&str> {
        self.field_properties.get(id).map(String::as_str)
    }

    /// Name of the value function attached to a field or base field
    pub fn field_function(&self, id: &str) -> Option<&str> {
        self.field_functions.get(id).map(String::as_str)
    }

    pub fn term_classes(&self) -> &IndexMap<String, String> {
        &self.term_classes
    }

    pub fn term_properties(&self) -> &IndexMap<String, String> {
        &self.term_properties
    }

    pub fn record_type_classes(&self) -> &IndexMap<String, String> {
        &self.record_type_classes
    }

    pub fn field_properties(&self) -> &IndexMap<String, String> {
        &self.field_properties
    }

    pub fn field_functions(&self) -> &IndexMap<String, String> {
        &self.field_functions
    }

    /// Custom class definitions keyed by label
    pub fn custom_classes(&self) -> &IndexMap<String, EntityRef> {
        &self.custom_classes
    }

    /// Custom property definitions keyed by label
    pub fn custom_properties(&self) -> &IndexMap<String, EntityRef> {
        &self.custom_properties
    }

    fn parse_mapping(&mut self, entity: &Entity, diagnostics: &dyn Diagnostics) {
        let Some(source_type) = entity.get(CFG_SOURCE_TYPE).and_then(PropertyValue::as_entity)
        else {
            diagnostics.warning(&format!(
                "Invalid `{}` in entity ({})",
                CFG_SOURCE_TYPE,
                entity.id()
            ));
            return;
        };
        let source_type = source_type.borrow();
        let Some(source_id) = source_identifier(&source_type) else {
            diagnostics.warning(&format!(
                "The `{}` is missing in the source type ({})",
                CFG_SOURCE_IDENTIFIER,
                source_type.id()
            ));
            return;
        };
        let Some(class_name) = entity.entity_type().filter(|t| !t.is_empty()) else {
            diagnostics.warning(&format!(
                "Missing target class type of entity ({})",
                entity.id()
            ));
            return;
        };

        match source_type.entity_type() {
            Some(CFG_RECORD_TYPE) => {
                self.record_type_classes
                    .insert(source_id.clone(), class_name.to_string());
                self.map_record_properties(entity, &source_id, diagnostics);
            }
            Some(CFG_VOCABULARY) => {
                self.term_classes
                    .insert(source_id.clone(), class_name.to_string());
                self.map_term_attributes(entity, &source_id, diagnostics);
            }
            other => diagnostics.warning(&format!(
                "Unsupported source type `{}` ({})",
                other.unwrap_or_default(),
                source_type.id()
            )),
        }
    }

    fn map_record_properties(
        &mut self,
        entity: &Entity,
        record_type_id: &str,
        diagnostics: &dyn Diagnostics,
    ) {
        for (name, value) in mapped_properties(entity) {
            for item in value.items() {
                let Some(target) = item.as_entity() else {
                    diagnostics.warning(&format!(
                        "Invalid mapping of property `{}` in entity ({})",
                        name,
                        entity.id()
                    ));
                    continue;
                };
                let target = target.borrow();
                let Some(target_id) = source_identifier(&target) else {
                    diagnostics.warning(&format!(
                        "The `{}` is missing in the target ({})",
                        CFG_SOURCE_IDENTIFIER,
                        target.id()
                    ));
                    continue;
                };
                let key = match target.entity_type() {
                    Some(CFG_FIELD) => field_id(record_type_id, &target_id),
                    Some(CFG_BASE_FIELD) => target_id,
                    other => {
                        diagnostics.warning(&format!(
                            "Invalid mapping type ({}) of property `{}` in entity ({})",
                            other.unwrap_or_default(),
                            name,
                            entity.id()
                        ));
                        continue;
                    }
                };

                if let Some(function) = target.get(CFG_VALUE_FUNCTION) {
                    match function_name(function) {
                        Some(function) => {
                            self.field_functions.insert(key.clone(), function);
                        }
                        None => diagnostics.warning(&format!(
                            "Invalid value function in entity ({})",
                            target.id()
                        )),
                    }
                }
                self.field_properties.insert(key, name.to_string());
            }
        }
    }

    fn map_term_attributes(&mut self, entity: &Entity, term_id: &str, diagnostics: &dyn Diagnostics) {
        for (name, value) in mapped_properties(entity) {
            for item in value.items() {
                let attribute = item
                    .as_entity()
                    .and_then(|target| term_attribute(target.borrow().entity_type()));
                match attribute {
                    Some(attribute) => {
                        self.term_properties
                            .insert(term_attribute_id(term_id, attribute), name.to_string());
                    }
                    None => diagnostics.warning(&format!(
                        "Invalid mapping of property `{}` in entity ({})",
                        name,
                        entity.id()
                    )),
                }
            }
        }
    }

    fn parse_custom_definition(&mut self, entity_ref: &EntityRef, entity: &Entity) {
        let Some(label) = entity.get_str(RDFS_LABEL).filter(|l| !l.starts_with('_')) else {
            return;
        };
        if entity.has_type(RDFS_CLASS) {
            self.custom_classes
                .insert(label.to_string(), entity_ref.clone());
        } else if entity.has_type(RDF_PROPERTY) {
            self.custom_properties
                .insert(label.to_string(), entity_ref.clone());
        }
    }
}

/// Properties of a mapping entity with `_name` read as `name`
fn mapped_properties(entity: &Entity) -> impl Iterator<Item = (&str, &PropertyValue)> {
    entity
        .properties()
        .iter()
        .filter(|(name, _)| !EXCLUDED_PROPERTIES.contains(&name.as_str()))
        .map(|(name, value)| {
            let name = if name == CFG_NAME_ALIAS { "name" } else { name.as_str() };
            (name, value)
        })
}

fn source_identifier(entity: &Entity) -> Option<String> {
    entity
        .get(CFG_SOURCE_IDENTIFIER)
        .and_then(PropertyValue::to_plain_string)
        .filter(|id| !id.is_empty())
}

fn function_name(value: &PropertyValue) -> Option<String> {
    let function = value.as_entity()?.borrow();
    let name = function
        .get("name")
        .and_then(PropertyValue::to_plain_string)
        .filter(|name| !name.is_empty());
    name
}

fn term_attribute(entity_type: Option<&str>) -> Option<TermAttribute> {
    match entity_type? {
        CFG_TERM_LABEL => Some(TermAttribute::Label),
        CFG_TERM_DESCRIPTION => Some(TermAttribute::Description),
        CFG_TERM_CODE => Some(TermAttribute::Code),
        _ => None,
    }
}
