//! Class and property definitions
//!
//! Views over entities fixed to `rdfs:Class` and `rdf:Property`, the two kinds
//! of entity the converter uses to describe the vocabulary derived from the
//! Heurist schema.

use crate::entity::{Entity, EntityRef, PropertyValue};
use crate::vocab::{DOMAIN_INCLUDES, RANGE_INCLUDES, RDFS_CLASS, RDFS_COMMENT, RDFS_LABEL, RDF_PROPERTY};

/// An `rdfs:Class` entity
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDefinition(EntityRef);

impl ClassDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self(Entity::with_id(RDFS_CLASS, id).into_ref())
    }

    /// View an existing entity as a class definition
    pub fn from_entity(entity: EntityRef) -> Option<Self> {
        let is_class = entity.borrow().has_type(RDFS_CLASS);
        is_class.then_some(Self(entity))
    }

    pub fn entity(&self) -> &EntityRef {
        &self.0
    }

    pub fn id(&self) -> String {
        self.0.id()
    }

    pub fn name(&self) -> Option<String> {
        self.0.borrow().get_str(RDFS_LABEL).map(String::from)
    }

    pub fn set_name(&self, name: &str) {
        self.0.borrow_mut().set(RDFS_LABEL, name);
    }

    pub fn description(&self) -> Option<String> {
        self.0.borrow().get_str(RDFS_COMMENT).map(String::from)
    }

    pub fn set_description(&self, description: &str) {
        self.0.borrow_mut().set(RDFS_COMMENT, description);
    }
}

/// An `rdf:Property` entity
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDefinition(EntityRef);

impl PropertyDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self(Entity::with_id(RDF_PROPERTY, id).into_ref())
    }

    /// View an existing entity as a property definition
    pub fn from_entity(entity: EntityRef) -> Option<Self> {
        let is_property = entity.borrow().has_type(RDF_PROPERTY);
        is_property.then_some(Self(entity))
    }

    pub fn entity(&self) -> &EntityRef {
        &self.0
    }

    pub fn id(&self) -> String {
        self.0.id()
    }

    pub fn name(&self) -> Option<String> {
        self.0.borrow().get_str(RDFS_LABEL).map(String::from)
    }

    pub fn set_name(&self, name: &str) {
        self.0.borrow_mut().set(RDFS_LABEL, name);
    }

    pub fn description(&self) -> Option<String> {
        self.0.borrow().get_str(RDFS_COMMENT).map(String::from)
    }

    pub fn set_description(&self, description: &str) {
        self.0.borrow_mut().set(RDFS_COMMENT, description);
    }

    /// @ids of the domain classes, local or external
    pub fn domain_ids(&self) -> Vec<String> {
        self.referenced_ids(DOMAIN_INCLUDES)
    }

    pub fn add_domain(&self, domain: &ClassDefinition) {
        self.0
            .borrow_mut()
            .append(DOMAIN_INCLUDES, domain.entity().clone());
    }

    /// Add an external domain class (e.g. a schema.org class) by @id
    pub fn add_domain_id(&self, id: &str) {
        self.0.borrow_mut().append(DOMAIN_INCLUDES, PropertyValue::id(id));
    }

    /// @ids of the range classes, local or external
    pub fn range_ids(&self) -> Vec<String> {
        self.referenced_ids(RANGE_INCLUDES)
    }

    pub fn add_range(&self, range: &ClassDefinition) {
        self.0
            .borrow_mut()
            .append(RANGE_INCLUDES, range.entity().clone());
    }

    /// Add an external range class by @id
    pub fn add_range_id(&self, id: &str) {
        self.0.borrow_mut().append(RANGE_INCLUDES, PropertyValue::id(id));
    }

    fn referenced_ids(&self, property: &str) -> Vec<String> {
        self.0
            .borrow()
            .get(property)
            .map(|value| {
                value
                    .items()
                    .into_iter()
                    .filter_map(PropertyValue::referenced_id)
                    .collect()
            })
            .unwrap_or_default()
    }
}
