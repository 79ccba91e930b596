//! RO-Crate entity model
//!
//! Entities are graph nodes shared by live reference: an entity holding a
//! reference to another entity sees every later mutation of it. Flattening
//! turns an entity and everything reachable from it into plain JSON-LD
//! records, substituting each reference with an `{"@id": ...}` stub.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::ConvertError;
use crate::id::generate_fragment_id;

/// A property value of an entity
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Plain JSON value (string, number, boolean, or a non-reference object)
    Literal(Value),
    /// Live reference to an entity of the same graph
    Ref(EntityRef),
    /// Bare `{"@id": ...}` reference not backed by a live entity
    Id(String),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Reference stub value
    pub fn id(id: impl Into<String>) -> Self {
        PropertyValue::Id(id.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Literal(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityRef> {
        match self {
            PropertyValue::Ref(entity) => Some(entity),
            _ => None,
        }
    }

    /// Literal value as a string, accepting numbers as well
    pub fn to_plain_string(&self) -> Option<String> {
        match self {
            PropertyValue::Literal(Value::String(s)) => Some(s.clone()),
            PropertyValue::Literal(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// The @id this value points at, live or stub
    pub fn referenced_id(&self) -> Option<String> {
        match self {
            PropertyValue::Ref(entity) => Some(entity.id()),
            PropertyValue::Id(id) => Some(id.clone()),
            _ => None,
        }
    }

    /// The value as a list of items; a single value is a one-item list
    pub fn items(&self) -> Vec<&PropertyValue> {
        match self {
            PropertyValue::List(items) => items.iter().collect(),
            other => vec![other],
        }
    }

    /// Wire form of the value
    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Literal(value) => value.clone(),
            PropertyValue::Ref(entity) => id_stub(&entity.id()),
            PropertyValue::Id(id) => id_stub(id),
            PropertyValue::List(items) => {
                Value::Array(items.iter().map(PropertyValue::to_json).collect())
            }
        }
    }

    /// Parse a wire value; `{"@id": ...}` objects become unlinked stubs
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(obj) if obj.len() == 1 => match obj.get("@id") {
                Some(Value::String(id)) => PropertyValue::Id(id.clone()),
                _ => PropertyValue::Literal(value.clone()),
            },
            Value::Array(items) => {
                PropertyValue::List(items.iter().map(PropertyValue::from_json).collect())
            }
            other => PropertyValue::Literal(other.clone()),
        }
    }

    fn collect_refs(&self, out: &mut Vec<EntityRef>) {
        match self {
            PropertyValue::Ref(entity) => out.push(entity.clone()),
            PropertyValue::List(items) => items.iter().for_each(|item| item.collect_refs(out)),
            PropertyValue::Literal(_) | PropertyValue::Id(_) => {}
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Literal(Value::String(value.to_string()))
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Literal(Value::String(value))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Literal(Value::from(value))
    }
}

impl From<u64> for PropertyValue {
    fn from(value: u64) -> Self {
        PropertyValue::Literal(Value::from(value))
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Literal(Value::Bool(value))
    }
}

impl From<EntityRef> for PropertyValue {
    fn from(value: EntityRef) -> Self {
        PropertyValue::Ref(value)
    }
}

fn id_stub(id: &str) -> Value {
    let mut obj = Map::new();
    obj.insert("@id".to_string(), Value::String(id.to_string()));
    Value::Object(obj)
}

/// A node of the RO-Crate graph
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: String,
    types: Vec<String>,
    properties: IndexMap<String, PropertyValue>,
}

impl Entity {
    /// Create an entity; without an id a fresh fragment id is generated
    pub fn new(entity_type: impl Into<String>, id: Option<String>) -> Self {
        Self {
            id: id.unwrap_or_else(generate_fragment_id),
            types: vec![entity_type.into()],
            properties: IndexMap::new(),
        }
    }

    pub fn with_id(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(entity_type, Some(id.into()))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// The first @type, the one the converter treats as the entity's class
    pub fn entity_type(&self) -> Option<&str> {
        self.types.first().map(String::as_str)
    }

    pub fn types(&self) -> &[String] {
        &self.types
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.types.iter().any(|t| t == type_name)
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropertyValue::as_str)
    }

    pub fn properties(&self) -> &IndexMap<String, PropertyValue> {
        &self.properties
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.insert(name.into(), value.into());
    }

    /// Add a value to a property without discarding existing values
    ///
    /// A property holding a single value becomes a list of both values.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        let value = value.into();
        match self.properties.entry(name.into()) {
            indexmap::map::Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                match existing {
                    PropertyValue::List(items) => items.push(value),
                    single => {
                        let previous = std::mem::replace(single, PropertyValue::List(Vec::new()));
                        *single = PropertyValue::List(vec![previous, value]);
                    }
                }
            }
            indexmap::map::Entry::Vacant(slot) => {
                slot.insert(value);
            }
        }
    }

    pub fn unset(&mut self, name: &str) -> Option<PropertyValue> {
        self.properties.shift_remove(name)
    }

    /// Append an entity to `hasPart`
    pub fn add_part(&mut self, part: EntityRef) {
        self.append("hasPart", part);
    }

    pub fn into_ref(self) -> EntityRef {
        EntityRef::new(self)
    }

    /// Entities referenced live from this entity, in property order
    pub fn linked_entities(&self) -> Vec<EntityRef> {
        let mut out = Vec::new();
        for value in self.properties.values() {
            value.collect_refs(&mut out);
        }
        out
    }

    /// Plain JSON-LD record of this entity alone
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("@id".to_string(), Value::String(self.id.clone()));
        match self.types.as_slice() {
            [] => {}
            [single] => {
                obj.insert("@type".to_string(), Value::String(single.clone()));
            }
            many => {
                obj.insert(
                    "@type".to_string(),
                    Value::Array(many.iter().cloned().map(Value::String).collect()),
                );
            }
        }
        for (name, value) in &self.properties {
            obj.insert(name.clone(), value.to_json());
        }
        Value::Object(obj)
    }

    /// Parse a plain JSON-LD record; references stay unlinked stubs
    pub fn from_json(value: &Value) -> Result<Self, ConvertError> {
        let obj = value.as_object().ok_or_else(|| {
            ConvertError::InvalidDocument("graph entity is not a JSON object".to_string())
        })?;
        let id = obj
            .get("@id")
            .and_then(Value::as_str)
            .ok_or_else(|| ConvertError::InvalidDocument("graph entity without @id".to_string()))?;

        let types = match obj.get("@type") {
            Some(Value::String(t)) => vec![t.clone()],
            Some(Value::Array(arr)) => arr
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect(),
            _ => vec![],
        };

        let properties = obj
            .iter()
            .filter(|(key, _)| *key != "@id" && *key != "@type")
            .map(|(key, v)| (key.clone(), PropertyValue::from_json(v)))
            .collect();

        Ok(Self {
            id: id.to_string(),
            types,
            properties,
        })
    }

    /// Replace stubs whose @id `lookup` resolves with live references
    pub(crate) fn link_with(&mut self, lookup: &dyn Fn(&str) -> Option<EntityRef>) {
        for value in self.properties.values_mut() {
            link_value(value, lookup);
        }
    }

    /// Replace every live reference with the value `map` returns for it
    ///
    /// A reference `map` returns `None` for is removed, together with the
    /// property when nothing else is left in it.
    pub(crate) fn map_refs(&mut self, map: &dyn Fn(&EntityRef) -> Option<PropertyValue>) {
        self.properties.retain(|_, value| map_value_refs(value, map));
    }
}

/// Returns false when nothing is left of `value`
fn map_value_refs(
    value: &mut PropertyValue,
    map: &dyn Fn(&EntityRef) -> Option<PropertyValue>,
) -> bool {
    match value {
        PropertyValue::Ref(entity) => match map(entity) {
            Some(replacement) => {
                *value = replacement;
                true
            }
            None => false,
        },
        PropertyValue::List(items) => {
            items.retain_mut(|item| map_value_refs(item, map));
            !items.is_empty()
        }
        PropertyValue::Literal(_) | PropertyValue::Id(_) => true,
    }
}

fn link_value(value: &mut PropertyValue, lookup: &dyn Fn(&str) -> Option<EntityRef>) {
    match value {
        PropertyValue::Id(id) => {
            if let Some(entity) = lookup(id) {
                *value = PropertyValue::Ref(entity);
            }
        }
        PropertyValue::List(items) => items.iter_mut().for_each(|item| link_value(item, lookup)),
        PropertyValue::Literal(_) | PropertyValue::Ref(_) => {}
    }
}

/// Shared, mutable handle to an entity
#[derive(Clone)]
pub struct EntityRef(Rc<RefCell<Entity>>);

impl EntityRef {
    pub fn new(entity: Entity) -> Self {
        Self(Rc::new(RefCell::new(entity)))
    }

    pub fn borrow(&self) -> Ref<'_, Entity> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Entity> {
        self.0.borrow_mut()
    }

    pub fn id(&self) -> String {
        self.borrow().id().to_string()
    }

    pub fn ptr_eq(&self, other: &EntityRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Flatten this entity and everything reachable from it
    ///
    /// Each @id appears once in the output; the entity itself comes first.
    pub fn flatten(&self) -> Vec<Value> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        flatten_into(self, &mut seen, &mut out);
        out
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

// Only the id: entity graphs can be cyclic.
impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(entity) => f.debug_tuple("EntityRef").field(&entity.id()).finish(),
            Err(_) => f.write_str("EntityRef(<borrowed>)"),
        }
    }
}

/// Breadth-first flattening sharing `seen` across calls
pub(crate) fn flatten_into(root: &EntityRef, seen: &mut HashSet<String>, out: &mut Vec<Value>) {
    let mut queue = VecDeque::from([root.clone()]);
    while let Some(entity) = queue.pop_front() {
        let entity = entity.borrow();
        if !seen.insert(entity.id().to_string()) {
            continue;
        }
        out.push(entity.to_json());
        queue.extend(entity.linked_entities());
    }
}
