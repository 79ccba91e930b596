//! Heurist to RO-Crate conversion
//!
//! The conversion runs in a fixed sequence, each stage reading the state the
//! previous ones built:
//!
//! 1. Root dataset name and description
//! 2. Configuration: seed names, merge custom definitions
//! 3. Vocabularies and terms
//! 4. Records, in two passes: entity shells first so field values can point
//!    at any record, then field values
//!
//! Class and property definitions are created the first time a record type or
//! field is met.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde_json::Value;
use url::Url;

use crate::config::Configuration;
use crate::definition::{ClassDefinition, PropertyDefinition};
use crate::diagnostics::Diagnostics;
use crate::entity::{Entity, EntityRef, PropertyValue};
use crate::error::ConvertError;
use crate::functions::FunctionRegistry;
use crate::id::{record_entity_id, term_attribute_id, term_entity_id, Namespace, SourceKey, TermAttribute};
use crate::metadata::Metadata;
use crate::naming::NameResolver;
use crate::normalize::{normalize_upload_date, parse_wkt, render_date, Geometry};
use crate::source::{
    BaseField, BaseFieldType, Field, FieldValue, FieldValueKind, FileValue, RecordType,
    SourceDatabase, Term,
};
use crate::vocab::{
    schema_org, CFG_SOURCE_TYPE, DEFAULT_NAMESPACE_BASE, TYPE_DEFINED_TERM, TYPE_DEFINED_TERM_SET,
    TYPE_FILE, TYPE_GEO_COORDINATES, TYPE_GEO_SHAPE, TYPE_MEDIA_OBJECT,
};

/// Options for conversion
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Base URL of the namespace holding the generated classes and properties
    pub namespace_base: String,
    /// Root dataset name, overriding the database's declared name
    pub name: Option<String>,
    /// Root dataset description, overriding the database's declared description
    pub description: Option<String>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            namespace_base: DEFAULT_NAMESPACE_BASE.to_string(),
            name: None,
            description: None,
        }
    }
}

/// Categories counted during conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatCategory {
    Terms,
    Records,
    Classes,
    Properties,
    Files,
    Geo,
}

impl StatCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatCategory::Terms => "terms",
            StatCategory::Records => "records",
            StatCategory::Classes => "classes",
            StatCategory::Properties => "properties",
            StatCategory::Files => "files",
            StatCategory::Geo => "geo",
        }
    }
}

impl fmt::Display for StatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics from conversion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertStats {
    counts: BTreeMap<StatCategory, usize>,
}

impl ConvertStats {
    pub fn add(&mut self, category: StatCategory) {
        *self.counts.entry(category).or_insert(0) += 1;
    }

    pub fn get(&self, category: StatCategory) -> usize {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    /// Non-zero categories in a fixed order
    pub fn iter(&self) -> impl Iterator<Item = (StatCategory, usize)> + '_ {
        self.counts.iter().map(|(category, count)| (*category, *count))
    }
}

impl fmt::Display for ConvertStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(category, count)| format!("{} {}", count, category))
            .collect();
        if parts.is_empty() {
            f.write_str("nothing converted")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

/// Result of conversion
#[derive(Debug)]
pub struct ConvertResult {
    /// The converted crate
    pub metadata: Metadata,
    /// Statistics about the conversion
    pub stats: ConvertStats,
    /// Stored filenames of the local uploads the crate refers to
    pub uploaded_files: Vec<String>,
}

impl ConvertResult {
    pub fn to_jsonld(&self) -> Value {
        self.metadata.to_jsonld()
    }

    pub fn to_json_string(&self, pretty: bool) -> Result<String, ConvertError> {
        self.metadata.to_json_string(pretty)
    }
}

/// Convert a Heurist database into an RO-Crate
///
/// # Errors
/// Returns `InvalidNamespace` when the namespace base is not a usable URL and
/// `UnknownValueFunction` when the configuration names a value function that
/// does not exist. Every other defect is reported through `diagnostics`.
pub fn convert(
    source: &SourceDatabase,
    configuration: &Configuration,
    options: &ConvertOptions,
    diagnostics: &dyn Diagnostics,
) -> Result<ConvertResult, ConvertError> {
    Converter::new(source, configuration, options, diagnostics)?.run()
}

/// State of one conversion run
pub struct Converter<'a> {
    source: &'a SourceDatabase,
    configuration: &'a Configuration,
    options: &'a ConvertOptions,
    diagnostics: &'a dyn Diagnostics,
    functions: FunctionRegistry,
    namespace: Namespace,
    metadata: Metadata,
    names: NameResolver,
    /// Heurist entity -> @id of the entity converted from it
    id_map: HashMap<SourceKey, String>,
    stats: ConvertStats,
    uploaded_files: Vec<String>,
}

impl<'a> Converter<'a> {
    pub fn new(
        source: &'a SourceDatabase,
        configuration: &'a Configuration,
        options: &'a ConvertOptions,
        diagnostics: &'a dyn Diagnostics,
    ) -> Result<Self, ConvertError> {
        Ok(Self {
            source,
            configuration,
            options,
            diagnostics,
            functions: FunctionRegistry::new(),
            namespace: Namespace::new(&options.namespace_base, &source.db_name)?,
            metadata: Metadata::new(),
            names: NameResolver::new(),
            id_map: HashMap::new(),
            stats: ConvertStats::default(),
            uploaded_files: Vec::new(),
        })
    }

    pub fn run(mut self) -> Result<ConvertResult, ConvertError> {
        self.set_root_metadata();
        self.diagnostics.info("Processing configuration...");
        self.process_configuration();
        self.diagnostics.info("Processing terms...");
        self.convert_terms();
        self.diagnostics.info("Processing records...");
        self.convert_records()?;
        self.diagnostics.info(&format!("Converted {}", self.stats));

        Ok(ConvertResult {
            metadata: self.metadata,
            stats: self.stats,
            uploaded_files: self.uploaded_files,
        })
    }

    fn set_root_metadata(&mut self) {
        let name = self.options.name.as_deref().or(self.source.name.as_deref());
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            self.metadata.set_root_name(name);
        }
        let description = self
            .options
            .description
            .as_deref()
            .or(self.source.description.as_deref());
        if let Some(description) = description.filter(|d| !d.is_empty()) {
            self.metadata.set_root_description(description);
        }
    }

    fn process_configuration(&mut self) {
        let source = self.source;
        let configuration = self.configuration;

        for (term_id, class_name) in configuration.term_classes() {
            if source.find_term(term_id).is_some() {
                self.names
                    .add_entry_from_identifier(SourceKey::Term(term_id.clone()), class_name.clone());
            } else {
                self.warn(format!(
                    "Can't find the mapped term ({}) defined in the configuration",
                    term_id
                ));
            }
        }
        for (attribute_id, property_name) in configuration.term_properties() {
            self.names.add_entry_from_identifier(
                SourceKey::TermAttribute(attribute_id.clone()),
                property_name.clone(),
            );
        }
        for (record_type_id, class_name) in configuration.record_type_classes() {
            if source.find_record_type(record_type_id).is_some() {
                self.names.add_entry_from_identifier(
                    SourceKey::RecordType(record_type_id.clone()),
                    class_name.clone(),
                );
            } else {
                self.warn(format!(
                    "Can't find the mapped record type ({}) defined in the configuration",
                    record_type_id
                ));
            }
        }
        for (id, property_name) in configuration.field_properties() {
            if id.contains(':') {
                if source.find_field(id).is_some() {
                    self.names
                        .add_entry_from_identifier(SourceKey::Field(id.clone()), property_name.clone());
                } else {
                    self.warn(format!(
                        "Can't find the mapped field ({}) defined in the configuration",
                        id
                    ));
                }
            } else if source.find_base_field(id).is_some() {
                self.names
                    .add_entry_from_identifier(SourceKey::BaseField(id.clone()), property_name.clone());
            } else {
                self.warn(format!(
                    "Can't find the mapped base field ({}) defined in the configuration",
                    id
                ));
            }
        }

        self.merge_custom_definitions();
    }

    /// Copy the configuration's custom definitions into this run's namespace
    ///
    /// References between custom definitions are carried over to the copies,
    /// and a reference to a mapping entity becomes the class it maps to.
    /// References to other external entities become stubs, any other
    /// reference is dropped.
    fn merge_custom_definitions(&mut self) {
        let configuration = self.configuration;
        let diagnostics = self.diagnostics;
        let originals: Vec<(&String, &EntityRef, StatCategory)> = configuration
            .custom_classes()
            .iter()
            .map(|(label, entity)| (label, entity, StatCategory::Classes))
            .chain(
                configuration
                    .custom_properties()
                    .iter()
                    .map(|(label, entity)| (label, entity, StatCategory::Properties)),
            )
            .collect();

        let copies: Vec<(EntityRef, EntityRef)> = originals
            .iter()
            .map(|(label, original, _)| {
                let mut copy = original.borrow().clone();
                copy.set_id(self.namespace.definition_id(label));
                ((*original).clone(), copy.into_ref())
            })
            .collect();
        let class_copy = |class_name: &str| {
            originals
                .iter()
                .zip(copies.iter())
                .find(|((label, _, category), _)| {
                    *category == StatCategory::Classes && label.as_str() == class_name
                })
                .map(|(_, (_, copy))| copy.clone())
        };

        let relink = |target: &EntityRef| {
            if let Some((_, copy)) = copies.iter().find(|(original, _)| original.ptr_eq(target)) {
                return Some(PropertyValue::Ref(copy.clone()));
            }
            let target = target.borrow();
            if target.get(CFG_SOURCE_TYPE).is_some() {
                if let Some(class_name) = target.entity_type().filter(|t| !t.is_empty()) {
                    return Some(match class_copy(class_name) {
                        Some(copy) => PropertyValue::Ref(copy),
                        None => PropertyValue::id(
                            configuration
                                .metadata()
                                .context()
                                .get(class_name)
                                .map(String::from)
                                .unwrap_or_else(|| schema_org(class_name)),
                        ),
                    });
                }
            }
            if Url::parse(target.id()).is_ok() {
                return Some(PropertyValue::id(target.id()));
            }
            diagnostics.warning(&format!(
                "Can't resolve the reference ({}) of a custom definition, the reference was dropped",
                target.id()
            ));
            None
        };
        for (_, copy) in &copies {
            copy.borrow_mut().map_refs(&relink);
        }

        for ((label, _, category), (_, copy)) in originals.iter().zip(copies.iter()) {
            self.metadata
                .context_mut()
                .add(label.as_str(), copy.id());
            self.add_entity(copy.clone());
            self.stats.add(*category);
        }
    }

    fn convert_terms(&mut self) {
        let source = self.source;
        let configuration = self.configuration;

        for vocabulary in source.vocabularies() {
            let descendants = descendant_terms(source, &vocabulary.id);
            match configuration.term_class(&vocabulary.id) {
                Some(class_name) => {
                    // Terms become entities of the mapped class; no container
                    let property = |attribute| {
                        configuration.term_property(&term_attribute_id(&vocabulary.id, attribute))
                    };
                    let label = property(TermAttribute::Label);
                    let description = property(TermAttribute::Description);
                    let code = property(TermAttribute::Code);
                    for term in descendants {
                        let mut entity = Entity::with_id(class_name, term_entity_id(&term.id));
                        if let Some(label) = label {
                            entity.set(label, term.label.as_str());
                        }
                        if let (Some(property), Some(value)) = (description, non_empty(&term.description)) {
                            entity.set(property, value);
                        }
                        if let (Some(property), Some(value)) = (code, non_empty(&term.code)) {
                            entity.set(property, value);
                        }
                        let entity = entity.into_ref();
                        self.metadata.root_entity().borrow_mut().add_part(entity.clone());
                        self.register_term(term, entity);
                    }
                }
                None => {
                    let mut set = Entity::with_id(TYPE_DEFINED_TERM_SET, term_entity_id(&vocabulary.id));
                    set.set("name", vocabulary.label.as_str());
                    if let Some(description) = non_empty(&vocabulary.description) {
                        set.set("description", description);
                    }
                    let set = set.into_ref();
                    for term in descendants {
                        let entity = defined_term(term).into_ref();
                        set.borrow_mut().append("hasDefinedTerm", entity.clone());
                        self.register_term(term, entity);
                    }
                    self.metadata.root_entity().borrow_mut().add_part(set.clone());
                    self.register_term(vocabulary, set);
                }
            }
        }
    }

    fn register_term(&mut self, term: &Term, entity: EntityRef) {
        self.id_map
            .insert(SourceKey::Term(term.id.clone()), entity.id());
        self.add_entity(entity);
        self.stats.add(StatCategory::Terms);
    }

    fn convert_records(&mut self) -> Result<(), ConvertError> {
        let source = self.source;

        // Shells first: values may point at records converted later
        for record in source.records() {
            let Some(record_type) = source.find_record_type(&record.record_type_id) else {
                self.warn(format!(
                    "Can't find the record type ({}) of record ({})",
                    record.record_type_id, record.id
                ));
                continue;
            };
            let class_name = self.record_type_class_name(record_type);
            let entity = Entity::with_id(class_name, record_entity_id(&record.id)).into_ref();
            self.metadata.root_entity().borrow_mut().add_part(entity.clone());
            self.id_map
                .insert(SourceKey::Record(record.id.clone()), entity.id());
            self.add_entity(entity);
            self.stats.add(StatCategory::Records);
        }

        for record in source.records() {
            let Some(entity) = self
                .id_map
                .get(&SourceKey::Record(record.id.clone()))
                .and_then(|id| self.metadata.get_entity(id))
            else {
                continue;
            };
            for (field_id, values) in record.values() {
                let Some(field) = source.find_field(field_id) else {
                    self.warn(format!(
                        "Can't find the field ({}) on record type ({})",
                        field_id, record.record_type_id
                    ));
                    continue;
                };
                if field.record_type_id != record.record_type_id {
                    self.warn(format!(
                        "The field ({}) does not belong to the record type ({}) of record ({})",
                        field_id, record.record_type_id, record.id
                    ));
                    continue;
                }
                let Some(base_field) = source.find_base_field(&field.base_field_id) else {
                    self.warn(format!(
                        "Can't find the base field ({}) of field ({})",
                        field.base_field_id, field_id
                    ));
                    continue;
                };

                let property_name = self.property_name(field, base_field);
                for value in values {
                    self.set_field_value(&entity, &property_name, field, base_field, value)?;
                }
            }
        }
        Ok(())
    }

    /// Property name a field's values are emitted under
    ///
    /// A field-scoped configuration mapping wins; otherwise the shared
    /// base-field name is used unless it collides with another name.
    fn property_name(&mut self, field: &Field, base_field: &BaseField) -> String {
        let field_mapped = self.configuration.field_property(&field.id()).is_some();
        if field_mapped || self.names.has_name_conflict(base_field) {
            self.field_property_name(field, base_field)
        } else {
            self.base_field_property_name(base_field)
        }
    }

    fn set_field_value(
        &mut self,
        record: &EntityRef,
        property_name: &str,
        field: &Field,
        base_field: &BaseField,
        value: &FieldValue,
    ) -> Result<(), ConvertError> {
        let function = self
            .configuration
            .field_function(&field.id())
            .or_else(|| self.configuration.field_function(&base_field.id));
        if let Some(function) = function {
            let converted = self.functions.apply(function, value)?;
            record.borrow_mut().append(property_name, converted);
            return Ok(());
        }

        match (base_field.field_type, &value.kind) {
            (BaseFieldType::Date, FieldValueKind::Date { date }) => {
                record
                    .borrow_mut()
                    .append(property_name, render_date(date, &value.raw));
            }
            (BaseFieldType::Date, FieldValueKind::Generic) => {
                record.borrow_mut().append(property_name, value.raw.as_str());
            }
            (BaseFieldType::Geo, FieldValueKind::Geo { wkt }) => {
                self.set_geo_value(record, property_name, wkt);
            }
            (BaseFieldType::File, FieldValueKind::File { file }) => {
                self.set_file_value(record, property_name, file);
            }
            (BaseFieldType::Term, FieldValueKind::Term { term_id }) => {
                match self
                    .id_map
                    .get(&SourceKey::Term(term_id.clone()))
                    .and_then(|id| self.metadata.get_entity(id))
                {
                    Some(term) => record.borrow_mut().append(property_name, term),
                    None => self.warn(format!("Can't find the referenced term ({})", term_id)),
                }
            }
            (BaseFieldType::RecordPointer, FieldValueKind::RecordPointer { record_id }) => {
                // Bare stub: the target is emitted once, at the top level
                match self.id_map.get(&SourceKey::Record(record_id.clone())) {
                    Some(id) => {
                        let stub = PropertyValue::id(id.as_str());
                        record.borrow_mut().append(property_name, stub);
                    }
                    None => self.warn(format!("Can't find the referenced record ({})", record_id)),
                }
            }
            (
                BaseFieldType::Date
                | BaseFieldType::Geo
                | BaseFieldType::File
                | BaseFieldType::Term
                | BaseFieldType::RecordPointer,
                _,
            ) => self.warn(format!(
                "Unexpected value ({}) for field ({}) of type {:?}",
                value.raw,
                field.id(),
                base_field.field_type
            )),
            _ => record.borrow_mut().append(property_name, value.raw.as_str()),
        }
        Ok(())
    }

    fn set_geo_value(&mut self, record: &EntityRef, property_name: &str, wkt: &str) {
        let entity = match parse_wkt(wkt) {
            Some(Geometry::Point {
                longitude,
                latitude,
            }) => {
                let mut entity = Entity::new(TYPE_GEO_COORDINATES, None);
                entity.set("latitude", latitude);
                entity.set("longitude", longitude);
                entity
            }
            Some(Geometry::Shape {
                property,
                coordinates,
            }) => {
                let mut entity = Entity::new(TYPE_GEO_SHAPE, None);
                entity.set(property, coordinates);
                entity
            }
            None => {
                self.warn(format!("Unsupported geo value ({})", wkt));
                return;
            }
        };
        let entity = entity.into_ref();
        record.borrow_mut().append(property_name, entity.clone());
        self.add_entity(entity);
        self.stats.add(StatCategory::Geo);
    }

    fn set_file_value(&mut self, record: &EntityRef, property_name: &str, file: &FileValue) {
        let id = if file.is_remote() {
            match non_empty(&file.url) {
                Some(url) => url.to_string(),
                None => {
                    self.warn("Remote file without URL".to_string());
                    return;
                }
            }
        } else {
            match file.local_name() {
                Some(name) => name,
                None => {
                    self.warn(format!(
                        "Uploaded file without identifier or name ({})",
                        file.file_id.as_deref().unwrap_or_default()
                    ));
                    return;
                }
            }
        };

        // Files shared by several records are emitted once
        if let Some(existing) = self.metadata.get_entity(&id) {
            if existing.borrow().has_type(TYPE_FILE) {
                record.borrow_mut().append(property_name, existing);
                return;
            }
        }

        let mut entity = Entity::with_id(TYPE_FILE, id.as_str());
        if !file.is_remote() {
            if let Some(name) = non_empty(&file.original_name) {
                entity.set("name", name);
            }
        }
        if let Some(size) = file.size.filter(|s| *s > 0) {
            entity.set("contentSize", size);
        }
        if let Some(mime_type) = non_empty(&file.mime_type) {
            entity.set("encodingFormat", mime_type);
        }
        if let Some(date) = non_empty(&file.upload_date) {
            let date = normalize_upload_date(date).unwrap_or_else(|| date.to_string());
            entity.set("uploadDate", date);
        }

        let entity = entity.into_ref();
        if !file.is_remote() {
            self.uploaded_files.push(id);
            self.metadata.root_entity().borrow_mut().add_part(entity.clone());
        }
        record.borrow_mut().append(property_name, entity.clone());
        self.add_entity(entity);
        self.stats.add(StatCategory::Files);
    }

    fn record_type_class_name(&mut self, record_type: &RecordType) -> String {
        if !self.names.has_resolved(record_type) {
            let name = self.names.resolve(record_type, &self.source.db_name);
            let id = self.namespace.definition_id(&name);
            self.metadata.context_mut().add(name.as_str(), id.as_str());

            let definition = ClassDefinition::new(id.as_str());
            definition.set_name(&name);
            if let Some(description) = non_empty(&record_type.description) {
                definition.set_description(description);
            }
            self.add_entity(definition.entity().clone());
            self.id_map
                .insert(SourceKey::RecordType(record_type.id.clone()), id);
            self.stats.add(StatCategory::Classes);
        }
        self.names.resolve(record_type, "")
    }

    fn base_field_property_name(&mut self, base_field: &BaseField) -> String {
        if !self.names.has_resolved(base_field) {
            let name = self.names.resolve(base_field, "");
            let definition = self.property_definition(&name, base_field.description.as_deref());
            let domain = self.source.base_field_record_types(&base_field.id);
            self.set_property_domains(&definition, &domain);
            self.set_property_ranges(&definition, base_field);
            self.id_map
                .insert(SourceKey::BaseField(base_field.id.clone()), definition.id());
            self.add_entity(definition.entity().clone());
        }
        self.names.resolve(base_field, "")
    }

    fn field_property_name(&mut self, field: &Field, base_field: &BaseField) -> String {
        if !self.names.has_resolved(field) {
            let source = self.source;
            let record_type = source.find_record_type(&field.record_type_id);
            let context_name = record_type.map(|r| r.name.as_str()).unwrap_or_default();
            let name = self.names.resolve(field, context_name);
            let definition = self.property_definition(&name, field.description.as_deref());
            let domain: Vec<&RecordType> = record_type.into_iter().collect();
            self.set_property_domains(&definition, &domain);
            self.set_property_ranges(&definition, base_field);
            self.id_map
                .insert(SourceKey::Field(field.id()), definition.id());
            self.add_entity(definition.entity().clone());
        }
        self.names.resolve(field, "")
    }

    fn property_definition(&mut self, name: &str, description: Option<&str>) -> PropertyDefinition {
        let id = self.namespace.definition_id(name);
        self.metadata.context_mut().add(name, id.as_str());
        let definition = PropertyDefinition::new(id);
        definition.set_name(name);
        if let Some(description) = description.filter(|d| !d.is_empty()) {
            definition.set_description(description);
        }
        self.stats.add(StatCategory::Properties);
        definition
    }

    fn set_property_domains(&self, definition: &PropertyDefinition, record_types: &[&RecordType]) {
        let mut added = HashSet::new();
        for record_type in record_types {
            match self.class_reference(record_type) {
                Some(ClassReference::Local(class)) => {
                    if added.insert(class.id()) {
                        definition.add_domain(&class);
                    }
                }
                Some(ClassReference::External(id)) => {
                    if added.insert(id.clone()) {
                        definition.add_domain_id(&id);
                    }
                }
                None => {}
            }
        }
    }

    fn set_property_ranges(&self, definition: &PropertyDefinition, base_field: &BaseField) {
        match base_field.field_type {
            BaseFieldType::Term => definition.add_range_id(&schema_org(TYPE_DEFINED_TERM)),
            BaseFieldType::File => definition.add_range_id(&schema_org(TYPE_MEDIA_OBJECT)),
            BaseFieldType::Geo => {
                definition.add_range_id(&schema_org(TYPE_GEO_COORDINATES));
                definition.add_range_id(&schema_org(TYPE_GEO_SHAPE));
            }
            BaseFieldType::RecordPointer => {
                let mut added = HashSet::new();
                for target_id in &base_field.target_record_types {
                    let Some(record_type) = self.source.find_record_type(target_id) else {
                        self.diagnostics.debug(&format!(
                            "Unknown target record type ({}) of base field ({})",
                            target_id, base_field.id
                        ));
                        continue;
                    };
                    match self.class_reference(record_type) {
                        Some(ClassReference::Local(class)) => {
                            if added.insert(class.id()) {
                                definition.add_range(&class);
                            }
                        }
                        Some(ClassReference::External(id)) => {
                            if added.insert(id.clone()) {
                                definition.add_range_id(&id);
                            }
                        }
                        None => {}
                    }
                }
            }
            _ => {}
        }
    }

    /// The class a record type was converted to
    ///
    /// A locally defined class when one was created, else the configured
    /// class: its context URI if known, a schema.org class otherwise.
    fn class_reference(&self, record_type: &RecordType) -> Option<ClassReference> {
        let local = self
            .id_map
            .get(&SourceKey::RecordType(record_type.id.clone()))
            .and_then(|id| self.metadata.get_entity(id))
            .and_then(ClassDefinition::from_entity);
        if let Some(class) = local {
            return Some(ClassReference::Local(class));
        }
        let class_name = self.configuration.record_type_class(&record_type.id)?;
        let id = self
            .metadata
            .context()
            .get(class_name)
            .map(String::from)
            .unwrap_or_else(|| schema_org(class_name));
        Some(ClassReference::External(id))
    }

    fn add_entity(&mut self, entity: EntityRef) {
        let id = entity.id();
        if self.metadata.add_entity(entity).is_some() {
            self.warn(format!(
                "Duplicate entity id ({}), the previous entity was replaced",
                id
            ));
        }
    }

    fn warn(&self, message: String) {
        self.diagnostics.warning(&message);
    }
}

enum ClassReference {
    Local(ClassDefinition),
    External(String),
}

fn defined_term(term: &Term) -> Entity {
    let mut entity = Entity::with_id(TYPE_DEFINED_TERM, term_entity_id(&term.id));
    entity.set("name", term.label.as_str());
    if let Some(description) = non_empty(&term.description) {
        entity.set("description", description);
    }
    if let Some(code) = non_empty(&term.code) {
        entity.set("termCode", code);
    }
    entity
}

/// Every term below `parent_id`, depth first
fn descendant_terms<'s>(source: &'s SourceDatabase, parent_id: &'s str) -> Vec<&'s Term> {
    let mut out = Vec::new();
    let mut visited = HashSet::from([parent_id.to_string()]);
    let mut stack: Vec<&Term> = source.child_terms(parent_id).collect();
    stack.reverse();
    while let Some(term) = stack.pop() {
        if !visited.insert(term.id.clone()) {
            continue;
        }
        out.push(term);
        let mut children: Vec<&Term> = source.child_terms(&term.id).collect();
        children.reverse();
        stack.extend(children);
    }
    out
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectedDiagnostics;
    use crate::source::{DateParts, DateValue, Record};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record_type(id: &str, name: &str) -> RecordType {
        RecordType {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
        }
    }

    fn base_field(id: &str, name: &str, field_type: BaseFieldType) -> BaseField {
        BaseField {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            field_type,
            target_record_types: vec![],
        }
    }

    fn field(record_type_id: &str, base_field_id: &str, name: &str) -> Field {
        Field {
            record_type_id: record_type_id.to_string(),
            base_field_id: base_field_id.to_string(),
            name: name.to_string(),
            description: None,
        }
    }

    fn term(id: &str, label: &str, parent_id: Option<&str>) -> Term {
        Term {
            id: id.to_string(),
            label: label.to_string(),
            description: None,
            code: None,
            parent_id: parent_id.map(String::from),
        }
    }

    /// Person (10) and Place (11); Person has name (1), born (2), location (3),
    /// colour (4), knows (5) and photo (6)
    fn sample_database() -> SourceDatabase {
        let mut db = SourceDatabase::new("archive");
        db.name = Some("The Archive".to_string());
        db.description = Some("Records of the archive".to_string());
        db.add_record_type(record_type("10", "Person"));
        db.add_record_type(record_type("11", "Place"));

        db.add_base_field(base_field("1", "Name", BaseFieldType::Text));
        db.add_base_field(base_field("2", "Date of birth", BaseFieldType::Date));
        db.add_base_field(base_field("3", "Location", BaseFieldType::Geo));
        db.add_base_field(base_field("4", "Colour", BaseFieldType::Term));
        let mut knows = base_field("5", "Knows", BaseFieldType::RecordPointer);
        knows.target_record_types = vec!["10".to_string()];
        db.add_base_field(knows);
        db.add_base_field(base_field("6", "Photo", BaseFieldType::File));

        for (bf, name) in [
            ("1", "Name"),
            ("2", "Date of birth"),
            ("3", "Location"),
            ("4", "Colour"),
            ("5", "Knows"),
            ("6", "Photo"),
        ] {
            db.add_field(field("10", bf, name));
        }
        db.add_field(field("11", "1", "Name"));

        db.add_term(term("100", "Colours", None));
        db.add_term(term("101", "Red", Some("100")));
        db.add_term(term("102", "Blue", Some("100")));

        db.add_record(Record::new("1", "10"));
        db.add_record(Record::new("42", "10"));
        db.add_record(Record::new("7", "11"));
        db
    }

    fn run(db: &SourceDatabase, configuration: &Configuration) -> (ConvertResult, Vec<String>) {
        let diagnostics = CollectedDiagnostics::new();
        let result = convert(db, configuration, &ConvertOptions::default(), &diagnostics).unwrap();
        (result, diagnostics.warnings())
    }

    fn graph_entity(result: &ConvertResult, id: &str) -> Value {
        result
            .to_jsonld()["@graph"]
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["@id"] == id)
            .cloned()
            .unwrap_or(Value::Null)
    }

    #[test]
    fn test_root_name_and_description() {
        let db = sample_database();
        let (result, _) = run(&db, &Configuration::empty());
        let root = graph_entity(&result, "./");
        assert_eq!(root["name"], "The Archive");
        assert_eq!(root["description"], "Records of the archive");

        let options = ConvertOptions {
            name: Some("Renamed".to_string()),
            ..ConvertOptions::default()
        };
        let result = convert(&db, &Configuration::empty(), &options, &CollectedDiagnostics::new())
            .unwrap();
        assert_eq!(graph_entity(&result, "./")["name"], "Renamed");
    }

    #[test]
    fn test_vocabulary_becomes_defined_term_set() {
        let db = sample_database();
        let (result, warnings) = run(&db, &Configuration::empty());
        assert!(warnings.is_empty(), "{:?}", warnings);

        assert_eq!(
            graph_entity(&result, "#term_100"),
            json!({
                "@id": "#term_100",
                "@type": "DefinedTermSet",
                "name": "Colours",
                "hasDefinedTerm": [{"@id": "#term_101"}, {"@id": "#term_102"}]
            })
        );
        assert_eq!(
            graph_entity(&result, "#term_101"),
            json!({"@id": "#term_101", "@type": "DefinedTerm", "name": "Red"})
        );
        assert_eq!(graph_entity(&result, "#term_102")["@type"], "DefinedTerm");
        assert_eq!(result.stats.get(StatCategory::Terms), 3);
    }

    #[test]
    fn test_nested_terms_are_flattened_into_the_set() {
        let mut db = sample_database();
        db.add_term(term("103", "Dark red", Some("101")));
        let (result, _) = run(&db, &Configuration::empty());
        let set = graph_entity(&result, "#term_100");
        assert_eq!(
            set["hasDefinedTerm"],
            json!([{"@id": "#term_101"}, {"@id": "#term_103"}, {"@id": "#term_102"}])
        );
    }

    #[test]
    fn test_mapped_vocabulary_uses_configured_class() {
        let mut db = sample_database();
        db.add_term(Term {
            code: Some("R".to_string()),
            ..term("103", "Dark red", Some("101"))
        });
        let diagnostics = CollectedDiagnostics::new();
        let configuration = Configuration::from_json_str(
            &json!({
                "@context": "https://w3id.org/ro/crate/1.1/context",
                "@graph": [
                    {"@id": "#colour", "@type": "Colour",
                     "_sourceType": {"@id": "#voc"},
                     "_name": {"@id": "#label"},
                     "code": {"@id": "#code"}},
                    {"@id": "#voc", "@type": "_Vocabulary", "_sourceIdentifier": "100"},
                    {"@id": "#label", "@type": "_VocabularyTermLabel"},
                    {"@id": "#code", "@type": "_VocabularyTermCode"}
                ]
            })
            .to_string(),
            &diagnostics,
        )
        .unwrap();
        let (result, _) = run(&db, &configuration);

        assert_eq!(graph_entity(&result, "#term_100"), Value::Null);
        assert_eq!(
            graph_entity(&result, "#term_103"),
            json!({"@id": "#term_103", "@type": "Colour", "name": "Dark red", "code": "R"})
        );
        assert_eq!(graph_entity(&result, "#term_101")["@type"], "Colour");
        assert_eq!(result.stats.get(StatCategory::Terms), 3);
    }

    #[test]
    fn test_records_and_class_definitions() {
        let mut db = sample_database();
        db.add_field_value("1", "1", "Alice", FieldValueKind::Generic);
        db.add_field_value("7", "1", "Paris", FieldValueKind::Generic);
        let (result, warnings) = run(&db, &Configuration::empty());
        assert!(warnings.is_empty(), "{:?}", warnings);

        assert_eq!(
            graph_entity(&result, "#rec_1"),
            json!({"@id": "#rec_1", "@type": "Person", "name": "Alice"})
        );
        assert_eq!(
            graph_entity(&result, "https://w3id.org/ro/terms/archive#Person"),
            json!({
                "@id": "https://w3id.org/ro/terms/archive#Person",
                "@type": "rdfs:Class",
                "rdfs:label": "Person"
            })
        );
        // The shared base field is defined once, on every record type using it
        assert_eq!(
            graph_entity(&result, "https://w3id.org/ro/terms/archive#name")["domainIncludes"],
            json!([
                {"@id": "https://w3id.org/ro/terms/archive#Person"},
                {"@id": "https://w3id.org/ro/terms/archive#Place"}
            ])
        );
        assert_eq!(
            result.metadata.context().get("Person"),
            Some("https://w3id.org/ro/terms/archive#Person")
        );

        let root = graph_entity(&result, "./");
        assert_eq!(
            root["hasPart"],
            json!([
                {"@id": "#term_100"},
                {"@id": "#rec_1"},
                {"@id": "#rec_42"},
                {"@id": "#rec_7"}
            ])
        );
        assert_eq!(result.stats.get(StatCategory::Records), 3);
        assert_eq!(result.stats.get(StatCategory::Classes), 2);
        assert_eq!(result.stats.get(StatCategory::Properties), 1);
    }

    #[test]
    fn test_duplicate_record_type_names() {
        let mut db = SourceDatabase::new("mydb");
        db.add_record_type(record_type("1", "Text"));
        db.add_record_type(record_type("2", "Text"));
        db.add_record_type(record_type("3", "Dataset"));
        db.add_record(Record::new("1", "1"));
        db.add_record(Record::new("2", "2"));
        db.add_record(Record::new("3", "3"));
        let (result, _) = run(&db, &Configuration::empty());

        assert_eq!(graph_entity(&result, "#rec_1")["@type"], "Text");
        assert_eq!(graph_entity(&result, "#rec_2")["@type"], "MydbText");
        assert_eq!(graph_entity(&result, "#rec_3")["@type"], "MydbDataset");
    }

    #[test]
    fn test_date_values() {
        let mut db = sample_database();
        db.add_field_value(
            "1",
            "2",
            "1850",
            FieldValueKind::Date {
                date: DateValue::Simple(DateParts::year("1850")),
            },
        );
        db.add_field_value(
            "42",
            "2",
            "1800-1900",
            FieldValueKind::Date {
                date: DateValue::Range {
                    earliest: Some(DateParts::year("1800")),
                    latest: Some(DateParts::year("1900")),
                },
            },
        );
        let (result, _) = run(&db, &Configuration::empty());
        assert_eq!(graph_entity(&result, "#rec_1")["dateOfBirth"], "1850");
        assert_eq!(graph_entity(&result, "#rec_42")["dateOfBirth"], "1800/1900");
    }

    #[test]
    fn test_geo_point_and_shape() {
        let mut db = sample_database();
        db.add_field_value(
            "1",
            "3",
            "POINT(10.5 20.25)",
            FieldValueKind::Geo {
                wkt: "POINT(10.5 20.25)".to_string(),
            },
        );
        db.add_field_value(
            "1",
            "3",
            "LINESTRING(0 0, 1 1)",
            FieldValueKind::Geo {
                wkt: "LINESTRING(0 0, 1 1)".to_string(),
            },
        );
        db.add_field_value(
            "1",
            "3",
            "garbage",
            FieldValueKind::Geo {
                wkt: "garbage".to_string(),
            },
        );
        let (result, warnings) = run(&db, &Configuration::empty());
        assert_eq!(warnings, vec!["Unsupported geo value (garbage)".to_string()]);

        let locations = graph_entity(&result, "#rec_1")["location"].clone();
        let ids: Vec<&str> = locations
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["@id"].as_str().unwrap())
            .collect();
        assert_eq!(ids.len(), 2);

        let point = graph_entity(&result, ids[0]);
        assert_eq!(point["@type"], "GeoCoordinates");
        assert_eq!(point["longitude"], json!(10.5));
        assert_eq!(point["latitude"], json!(20.25));
        let shape = graph_entity(&result, ids[1]);
        assert_eq!(shape["@type"], "GeoShape");
        assert_eq!(shape["line"], "0 0, 1 1");
        assert_eq!(result.stats.get(StatCategory::Geo), 2);

        let property = graph_entity(&result, "https://w3id.org/ro/terms/archive#location");
        assert_eq!(
            property["rangeIncludes"],
            json!([
                {"@id": "http://schema.org/GeoCoordinates"},
                {"@id": "http://schema.org/GeoShape"}
            ])
        );
    }

    #[test]
    fn test_file_values() {
        let mut db = sample_database();
        let mut photo = FileValue {
            file_id: Some("9".to_string()),
            original_name: Some("alice.jpg".to_string()),
            mime_type: Some("image/jpeg".to_string()),
            upload_date: Some("2021-04-01 13:45:00".to_string()),
            ..FileValue::default()
        };
        photo.set_size(2, "KB");
        db.add_field_value("1", "6", "alice.jpg", FieldValueKind::File { file: photo.clone() });
        db.add_field_value("42", "6", "alice.jpg", FieldValueKind::File { file: photo });
        let remote = FileValue {
            original_name: Some("_remote".to_string()),
            url: Some("https://example.org/bob.png".to_string()),
            ..FileValue::default()
        };
        db.add_field_value("42", "6", "remote", FieldValueKind::File { file: remote });
        let broken = FileValue {
            original_name: Some("_remote".to_string()),
            ..FileValue::default()
        };
        db.add_field_value("42", "6", "broken", FieldValueKind::File { file: broken });

        let (result, warnings) = run(&db, &Configuration::empty());
        assert_eq!(warnings, vec!["Remote file without URL".to_string()]);
        assert_eq!(result.uploaded_files, vec!["ulf_9_alice.jpg".to_string()]);
        assert_eq!(
            graph_entity(&result, "ulf_9_alice.jpg"),
            json!({
                "@id": "ulf_9_alice.jpg",
                "@type": "File",
                "name": "alice.jpg",
                "contentSize": 2048,
                "encodingFormat": "image/jpeg",
                "uploadDate": "2021-04-01T13:45:00+00:00"
            })
        );
        assert_eq!(
            graph_entity(&result, "#rec_42")["photo"],
            json!([{"@id": "ulf_9_alice.jpg"}, {"@id": "https://example.org/bob.png"}])
        );
        assert_eq!(result.stats.get(StatCategory::Files), 2);
    }

    #[test]
    fn test_term_reference() {
        let mut db = sample_database();
        db.add_field_value("1", "4", "101", FieldValueKind::Term { term_id: "101".to_string() });
        db.add_field_value("1", "4", "999", FieldValueKind::Term { term_id: "999".to_string() });
        let (result, warnings) = run(&db, &Configuration::empty());
        assert_eq!(warnings, vec!["Can't find the referenced term (999)".to_string()]);
        assert_eq!(graph_entity(&result, "#rec_1")["colour"], json!({"@id": "#term_101"}));
        assert_eq!(
            graph_entity(&result, "https://w3id.org/ro/terms/archive#colour")["rangeIncludes"],
            json!({"@id": "http://schema.org/DefinedTerm"})
        );
    }

    #[test]
    fn test_record_pointer_is_a_bare_stub() {
        let mut db = sample_database();
        db.add_field_value(
            "1",
            "5",
            "42",
            FieldValueKind::RecordPointer {
                record_id: "42".to_string(),
            },
        );
        db.add_field_value("42", "1", "Bob", FieldValueKind::Generic);
        let (result, _) = run(&db, &Configuration::empty());

        let person = graph_entity(&result, "#rec_1");
        assert_eq!(person["knows"], json!({"@id": "#rec_42"}));
        assert_eq!(graph_entity(&result, "#rec_42")["name"], "Bob");
        assert_eq!(
            graph_entity(&result, "https://w3id.org/ro/terms/archive#knows")["rangeIncludes"],
            json!({"@id": "https://w3id.org/ro/terms/archive#Person"})
        );
    }

    #[test]
    fn test_dangling_references_are_dropped_with_warning() {
        let mut db = sample_database();
        db.add_field_value(
            "1",
            "5",
            "404",
            FieldValueKind::RecordPointer {
                record_id: "404".to_string(),
            },
        );
        db.add_record(Record::new("8", "99"));
        let (result, warnings) = run(&db, &Configuration::empty());
        assert_eq!(
            warnings,
            vec![
                "Can't find the record type (99) of record (8)".to_string(),
                "Can't find the referenced record (404)".to_string()
            ]
        );
        assert_eq!(graph_entity(&result, "#rec_1").get("knows"), None);
        assert_eq!(graph_entity(&result, "#rec_8"), Value::Null);
    }

    #[test]
    fn test_conflicting_base_field_name_uses_field_name() {
        let mut db = sample_database();
        db.add_base_field(base_field("7", "name", BaseFieldType::Text));
        db.add_field(field("11", "7", "Name"));
        db.add_field_value("1", "1", "Alice", FieldValueKind::Generic);
        db.add_field_value("7", "7", "Paris", FieldValueKind::Generic);
        let (result, _) = run(&db, &Configuration::empty());

        assert_eq!(graph_entity(&result, "#rec_1")["name"], "Alice");
        assert_eq!(graph_entity(&result, "#rec_7")["placeName"], "Paris");
        let property = graph_entity(&result, "https://w3id.org/ro/terms/archive#placeName");
        assert_eq!(
            property["domainIncludes"],
            json!({"@id": "https://w3id.org/ro/terms/archive#Place"})
        );
    }

    fn mapping_configuration() -> Configuration {
        let diagnostics = CollectedDiagnostics::new();
        Configuration::from_json_str(
            &json!({
                "@context": "https://w3id.org/ro/crate/1.1/context",
                "@graph": [
                    {"@id": "#person", "@type": "Human",
                     "_sourceType": {"@id": "#rt10"},
                     "_name": {"@id": "#f1"},
                     "born": {"@id": "#bf2"}},
                    {"@id": "#rt10", "@type": "_RecordType", "_sourceIdentifier": "10"},
                    {"@id": "#f1", "@type": "_Field", "_sourceIdentifier": "1"},
                    {"@id": "#bf2", "@type": "_BaseField", "_sourceIdentifier": "2",
                     "_valueFunction": {"@id": "#text"}},
                    {"@id": "#text", "@type": "_ValueFunction", "name": "to_text"},
                    {"@id": "https://example.org/Human", "@type": "rdfs:Class",
                     "rdfs:label": "Human", "rdfs:comment": "A person"},
                    {"@id": "https://example.org/born", "@type": "rdf:Property",
                     "rdfs:label": "born",
                     "domainIncludes": {"@id": "https://example.org/Human"}}
                ]
            })
            .to_string(),
            &diagnostics,
        )
        .unwrap()
    }

    #[test]
    fn test_configuration_seeds_names_and_functions() {
        let mut db = sample_database();
        db.add_field_value("1", "1", "Alice", FieldValueKind::Generic);
        db.add_field_value(
            "1",
            "2",
            "c. 1850",
            FieldValueKind::Date {
                date: DateValue::Simple(DateParts::year("1850")),
            },
        );
        let configuration = mapping_configuration();
        let (result, warnings) = run(&db, &configuration);
        assert!(warnings.is_empty(), "{:?}", warnings);

        assert_eq!(
            graph_entity(&result, "#rec_1"),
            json!({"@id": "#rec_1", "@type": "Human", "name": "Alice", "born": "c. 1850"})
        );
        // Mapped names create no generated definitions
        assert_eq!(
            graph_entity(&result, "https://w3id.org/ro/terms/archive#Person"),
            Value::Null
        );
        assert_eq!(
            graph_entity(&result, "https://w3id.org/ro/terms/archive#name"),
            Value::Null
        );
    }

    #[test]
    fn test_custom_definitions_move_into_namespace() {
        let db = sample_database();
        let configuration = mapping_configuration();
        let (result, _) = run(&db, &configuration);

        assert_eq!(
            result.metadata.context().get("Human"),
            Some("https://w3id.org/ro/terms/archive#Human")
        );
        assert_eq!(
            graph_entity(&result, "https://w3id.org/ro/terms/archive#born"),
            json!({
                "@id": "https://w3id.org/ro/terms/archive#born",
                "@type": "rdf:Property",
                "rdfs:label": "born",
                "domainIncludes": {"@id": "https://w3id.org/ro/terms/archive#Human"}
            })
        );
        assert_eq!(graph_entity(&result, "https://example.org/Human"), Value::Null);
        // The configuration itself is left untouched
        assert_eq!(
            configuration.custom_classes()["Human"].id(),
            "https://example.org/Human"
        );
    }

    #[test]
    fn test_domain_of_configured_record_type() {
        let mut db = sample_database();
        db.add_field_value(
            "1",
            "3",
            "POINT(1 2)",
            FieldValueKind::Geo {
                wkt: "POINT(1 2)".to_string(),
            },
        );

        // The configured class is known to the context through its custom definition
        let (result, _) = run(&db, &mapping_configuration());
        assert_eq!(
            graph_entity(&result, "https://w3id.org/ro/terms/archive#location")["domainIncludes"],
            json!({"@id": "https://w3id.org/ro/terms/archive#Human"})
        );

        let diagnostics = CollectedDiagnostics::new();
        let configuration = Configuration::from_json_str(
            &json!({
                "@context": "https://w3id.org/ro/crate/1.1/context",
                "@graph": [
                    {"@id": "#person", "@type": "Person", "_sourceType": {"@id": "#rt10"}},
                    {"@id": "#rt10", "@type": "_RecordType", "_sourceIdentifier": 10}
                ]
            })
            .to_string(),
            &diagnostics,
        )
        .unwrap();
        let (result, _) = run(&db, &configuration);
        assert_eq!(graph_entity(&result, "#rec_1")["@type"], "Person");
        assert_eq!(
            graph_entity(&result, "https://w3id.org/ro/terms/archive#location")["domainIncludes"],
            json!({"@id": "http://schema.org/Person"})
        );
    }

    #[test]
    fn test_unknown_value_function_is_fatal() {
        let mut db = sample_database();
        db.add_field_value("1", "1", "Alice", FieldValueKind::Generic);
        let diagnostics = CollectedDiagnostics::new();
        let configuration = Configuration::from_json_str(
            &json!({
                "@context": "https://w3id.org/ro/crate/1.1/context",
                "@graph": [
                    {"@id": "#person", "@type": "Human",
                     "_sourceType": {"@id": "#rt10"},
                     "_name": {"@id": "#f1"}},
                    {"@id": "#rt10", "@type": "_RecordType", "_sourceIdentifier": "10"},
                    {"@id": "#f1", "@type": "_Field", "_sourceIdentifier": "1",
                     "_valueFunction": {"@id": "#fn"}},
                    {"@id": "#fn", "@type": "_ValueFunction", "name": "shout"}
                ]
            })
            .to_string(),
            &diagnostics,
        )
        .unwrap();

        let err = convert(&db, &configuration, &ConvertOptions::default(), &diagnostics).unwrap_err();
        assert!(matches!(err, ConvertError::UnknownValueFunction(name) if name == "shout"));
    }

    #[test]
    fn test_dangling_configuration_references_are_skipped() {
        let db = sample_database();
        let diagnostics = CollectedDiagnostics::new();
        let configuration = Configuration::from_json_str(
            &json!({
                "@context": "https://w3id.org/ro/crate/1.1/context",
                "@graph": [
                    {"@id": "#x", "@type": "Ghost",
                     "_sourceType": {"@id": "#rt"},
                     "title": {"@id": "#f"}},
                    {"@id": "#rt", "@type": "_RecordType", "_sourceIdentifier": "77"},
                    {"@id": "#f", "@type": "_BaseField", "_sourceIdentifier": "88"}
                ]
            })
            .to_string(),
            &diagnostics,
        )
        .unwrap();
        let (_, warnings) = run(&db, &configuration);
        assert_eq!(
            warnings,
            vec![
                "Can't find the mapped record type (77) defined in the configuration".to_string(),
                "Can't find the mapped base field (88) defined in the configuration".to_string()
            ]
        );
    }

    #[test]
    fn test_output_graph_is_closed_and_unique() {
        let mut db = sample_database();
        db.add_field_value("1", "1", "Alice", FieldValueKind::Generic);
        db.add_field_value("1", "4", "102", FieldValueKind::Term { term_id: "102".to_string() });
        db.add_field_value(
            "1",
            "5",
            "42",
            FieldValueKind::RecordPointer {
                record_id: "42".to_string(),
            },
        );
        db.add_field_value(
            "42",
            "3",
            "POINT(1 2)",
            FieldValueKind::Geo {
                wkt: "POINT(1 2)".to_string(),
            },
        );
        let (result, _) = run(&db, &Configuration::empty());
        assert_graph_closed_and_unique(&result);
    }

    #[test]
    fn test_custom_definition_references_are_resolved() {
        let mut db = sample_database();
        db.add_field_value("1", "1", "Alice", FieldValueKind::Generic);
        let configuration = Configuration::from_json_str(
            &json!({
                "@context": "https://w3id.org/ro/crate/1.1/context",
                "@graph": [
                    {"@id": "#person", "@type": "Human", "_sourceType": {"@id": "#rt10"}},
                    {"@id": "#place", "@type": "Location", "_sourceType": {"@id": "#rt11"}},
                    {"@id": "#rt10", "@type": "_RecordType", "_sourceIdentifier": "10"},
                    {"@id": "#rt11", "@type": "_RecordType", "_sourceIdentifier": "11"},
                    {"@id": "https://example.org/Human", "@type": "rdfs:Class",
                     "rdfs:label": "Human"},
                    {"@id": "https://example.org/Thing", "@type": "rdfs:Class"},
                    {"@id": "https://example.org/born", "@type": "rdf:Property",
                     "rdfs:label": "born",
                     "domainIncludes": {"@id": "#person"},
                     "rangeIncludes": [
                         {"@id": "#place"},
                         {"@id": "https://example.org/Thing"},
                         {"@id": "#rt10"}
                     ]}
                ]
            })
            .to_string(),
            &CollectedDiagnostics::new(),
        )
        .unwrap();
        let (result, warnings) = run(&db, &configuration);

        assert_eq!(
            graph_entity(&result, "https://w3id.org/ro/terms/archive#born"),
            json!({
                "@id": "https://w3id.org/ro/terms/archive#born",
                "@type": "rdf:Property",
                "rdfs:label": "born",
                "domainIncludes": {"@id": "https://w3id.org/ro/terms/archive#Human"},
                "rangeIncludes": [
                    {"@id": "http://schema.org/Location"},
                    {"@id": "https://example.org/Thing"}
                ]
            })
        );
        assert_eq!(
            warnings,
            vec![
                "Can't resolve the reference (#rt10) of a custom definition, the reference was dropped"
                    .to_string()
            ]
        );
        assert_graph_closed_and_unique(&result);
    }

    /// Every @id appears once and every stub points at an emitted entity or
    /// an external URI
    fn assert_graph_closed_and_unique(result: &ConvertResult) {
        let doc = result.to_jsonld();
        let graph = doc["@graph"].as_array().unwrap();

        let ids: Vec<&str> = graph.iter().map(|e| e["@id"].as_str().unwrap()).collect();
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len());

        fn stubs<'v>(value: &'v Value, out: &mut Vec<&'v str>) {
            match value {
                Value::Object(obj) if obj.len() == 1 => {
                    if let Some(Value::String(id)) = obj.get("@id") {
                        out.push(id);
                    }
                }
                Value::Array(items) => items.iter().for_each(|item| stubs(item, out)),
                _ => {}
            }
        }
        let mut referenced = Vec::new();
        for entity in graph {
            for (key, value) in entity.as_object().unwrap() {
                if key != "@id" && key != "@type" {
                    stubs(value, &mut referenced);
                }
            }
        }
        for id in referenced {
            assert!(
                unique.contains(id)
                    || (id.starts_with("http") && !id.starts_with("https://w3id.org/ro/terms/")),
                "dangling reference {id}"
            );
        }
    }

    #[test]
    fn test_round_trip_of_converted_crate() {
        let mut db = sample_database();
        db.add_field_value("1", "4", "101", FieldValueKind::Term { term_id: "101".to_string() });
        db.add_field_value(
            "1",
            "5",
            "42",
            FieldValueKind::RecordPointer {
                record_id: "42".to_string(),
            },
        );
        let (result, _) = run(&db, &Configuration::empty());
        let text = result.to_json_string(false).unwrap();
        let parsed = Metadata::from_json_str(&text).unwrap();

        assert_eq!(parsed.len(), result.metadata.len());
        assert_eq!(parsed.to_jsonld(), result.to_jsonld());
        let person = parsed.get_entity("#rec_1").unwrap();
        let knows = person.borrow().get("knows").unwrap().as_entity().cloned().unwrap();
        assert!(knows.ptr_eq(&parsed.get_entity("#rec_42").unwrap()));
    }

    #[test]
    fn test_invalid_namespace_base() {
        let db = sample_database();
        let options = ConvertOptions {
            namespace_base: "no scheme".to_string(),
            ..ConvertOptions::default()
        };
        let result = convert(&db, &Configuration::empty(), &options, &CollectedDiagnostics::new());
        assert!(matches!(result, Err(ConvertError::InvalidNamespace { .. })));
    }

    #[test]
    fn test_stats_display() {
        let mut stats = ConvertStats::default();
        assert_eq!(stats.to_string(), "nothing converted");
        stats.add(StatCategory::Records);
        stats.add(StatCategory::Records);
        stats.add(StatCategory::Terms);
        assert_eq!(stats.to_string(), "1 terms, 2 records");
    }
}
