//! RO-Crate metadata graph
//!
//! Owns the metadata descriptor, the root dataset, every other entity keyed
//! by @id and the @context. Serializes the whole graph into a JSON-LD
//! document and parses such a document back into linked entities.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::{json, Value};

use crate::context::Context;
use crate::entity::{flatten_into, Entity, EntityRef, PropertyValue};
use crate::error::ConvertError;
use crate::vocab::{
    METADATA_DESCRIPTOR_ID, ROCRATE_PROFILE, ROOT_ENTITY_ID, TYPE_CREATIVE_WORK, TYPE_DATASET,
};

/// An RO-Crate metadata graph
#[derive(Debug, Clone)]
pub struct Metadata {
    main_entity: EntityRef,
    root_entity: EntityRef,
    entities: IndexMap<String, EntityRef>,
    context: Context,
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

impl Metadata {
    /// An empty crate: descriptor and root dataset only
    pub fn new() -> Self {
        let root_entity = create_root_entity();
        let mut entities = IndexMap::new();
        entities.insert(ROOT_ENTITY_ID.to_string(), root_entity.clone());
        Self {
            main_entity: create_main_entity(),
            root_entity,
            entities,
            context: Context::new(),
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// The metadata descriptor (`ro-crate-metadata.json`)
    pub fn main_entity(&self) -> &EntityRef {
        &self.main_entity
    }

    pub fn root_entity(&self) -> &EntityRef {
        &self.root_entity
    }

    pub fn get_entity(&self, id: &str) -> Option<EntityRef> {
        self.entities.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    /// Add an entity to the graph table
    ///
    /// An entity already stored under the same @id is replaced and returned.
    pub fn add_entity(&mut self, entity: EntityRef) -> Option<EntityRef> {
        let id = entity.id();
        if id == ROOT_ENTITY_ID {
            self.root_entity = entity.clone();
        }
        self.entities.insert(id, entity)
    }

    /// All entities of the table, in insertion order
    pub fn entities(&self) -> impl Iterator<Item = &EntityRef> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn set_root_name(&self, name: &str) {
        self.root_entity.borrow_mut().set("name", name);
    }

    pub fn set_root_description(&self, description: &str) {
        self.root_entity.borrow_mut().set("description", description);
    }

    /// Flat @graph: descriptor first, then every stored entity and its
    /// referents, each @id exactly once
    pub fn graph(&self) -> Vec<Value> {
        let mut seen = HashSet::new();
        let mut graph = Vec::new();
        flatten_into(&self.main_entity, &mut seen, &mut graph);
        for entity in self.entities.values() {
            flatten_into(entity, &mut seen, &mut graph);
        }
        graph
    }

    /// Build the complete JSON-LD document
    pub fn to_jsonld(&self) -> Value {
        json!({
            "@context": self.context.to_json(),
            "@graph": self.graph()
        })
    }

    /// Serialize the document to a JSON string
    pub fn to_json_string(&self, pretty: bool) -> Result<String, ConvertError> {
        let doc = self.to_jsonld();
        if pretty {
            Ok(serde_json::to_string_pretty(&doc)?)
        } else {
            Ok(serde_json::to_string(&doc)?)
        }
    }

    /// Parse a JSON-LD document into linked entities
    ///
    /// `{"@id": ...}` values naming an entity of the same graph become live
    /// references; all others stay stubs. A missing root dataset is created.
    pub fn from_jsonld(doc: &Value) -> Result<Self, ConvertError> {
        let obj = doc.as_object().ok_or_else(|| {
            ConvertError::InvalidDocument("document is not a JSON object".to_string())
        })?;
        let graph = obj
            .get("@graph")
            .and_then(Value::as_array)
            .ok_or_else(|| ConvertError::InvalidDocument("missing @graph array".to_string()))?;

        let context = obj.get("@context").map(Context::from_json).unwrap_or_default();

        let mut main_entity = None;
        let mut entities: IndexMap<String, EntityRef> = IndexMap::new();
        for item in graph {
            let entity = Entity::from_json(item)?;
            let is_descriptor = entity.id().ends_with(METADATA_DESCRIPTOR_ID)
                && entity.has_type(TYPE_CREATIVE_WORK);
            if is_descriptor && main_entity.is_none() {
                main_entity = Some(entity.into_ref());
            } else {
                entities.insert(entity.id().to_string(), entity.into_ref());
            }
        }

        let root_entity = match entities.get(ROOT_ENTITY_ID) {
            Some(root) => root.clone(),
            None => {
                let root = create_root_entity();
                entities.insert(ROOT_ENTITY_ID.to_string(), root.clone());
                root
            }
        };

        let lookup = |id: &str| entities.get(id).cloned();
        for entity in entities.values() {
            entity.borrow_mut().link_with(&lookup);
        }

        Ok(Self {
            main_entity: main_entity.unwrap_or_else(create_main_entity),
            root_entity,
            entities,
            context,
        })
    }

    /// Parse a JSON-LD document from a string
    pub fn from_json_str(content: &str) -> Result<Self, ConvertError> {
        let doc: Value = serde_json::from_str(content)?;
        Self::from_jsonld(&doc)
    }
}

fn create_main_entity() -> EntityRef {
    let mut entity = Entity::with_id(TYPE_CREATIVE_WORK, METADATA_DESCRIPTOR_ID);
    entity.set("conformsTo", PropertyValue::id(ROCRATE_PROFILE));
    entity.set("about", PropertyValue::id(ROOT_ENTITY_ID));
    entity.into_ref()
}

fn create_root_entity() -> EntityRef {
    Entity::with_id(TYPE_DATASET, ROOT_ENTITY_ID).into_ref()
}
