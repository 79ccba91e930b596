//! Vocabulary definitions for Heurist to RO-Crate conversion
//!
//! Defines the RO-Crate identifiers the converter emits, the schema.org
//! classes used for ranges, and the marker names a configuration crate
//! uses to describe its mappings.

/// RO-Crate 1.1 JSON-LD context
pub const ROCRATE_CONTEXT: &str = "https://w3id.org/ro/crate/1.1/context";

/// RO-Crate profile the metadata descriptor conforms to
pub const ROCRATE_PROFILE: &str = "https://w3id.org/ro/crate/1.1";

/// Standard metadata descriptor filename
pub const METADATA_DESCRIPTOR_ID: &str = "ro-crate-metadata.json";

/// Root entity ID
pub const ROOT_ENTITY_ID: &str = "./";

/// Default base of the namespace holding the generated classes and properties
pub const DEFAULT_NAMESPACE_BASE: &str = "https://w3id.org/ro/terms/";

/// schema.org base used for external class references
pub const SCHEMA_ORG: &str = "http://schema.org/";

pub const TYPE_CREATIVE_WORK: &str = "CreativeWork";
pub const TYPE_DATASET: &str = "Dataset";
pub const TYPE_FILE: &str = "File";
pub const TYPE_DEFINED_TERM: &str = "DefinedTerm";
pub const TYPE_DEFINED_TERM_SET: &str = "DefinedTermSet";
pub const TYPE_GEO_COORDINATES: &str = "GeoCoordinates";
pub const TYPE_GEO_SHAPE: &str = "GeoShape";
pub const TYPE_MEDIA_OBJECT: &str = "MediaObject";

/// Class names the converter emits itself; record types may not take them
pub const RESERVED_CLASSES: [&str; 7] = [
    TYPE_CREATIVE_WORK,
    TYPE_DATASET,
    TYPE_FILE,
    TYPE_DEFINED_TERM,
    TYPE_DEFINED_TERM_SET,
    TYPE_GEO_COORDINATES,
    TYPE_GEO_SHAPE,
];

pub const RDFS_CLASS: &str = "rdfs:Class";
pub const RDF_PROPERTY: &str = "rdf:Property";
pub const RDFS_LABEL: &str = "rdfs:label";
pub const RDFS_COMMENT: &str = "rdfs:comment";
pub const DOMAIN_INCLUDES: &str = "domainIncludes";
pub const RANGE_INCLUDES: &str = "rangeIncludes";

/// Configuration: link from a mapping entity to the source entity it maps
pub const CFG_SOURCE_TYPE: &str = "_sourceType";
/// Configuration: source identifier on a source type or mapping target
pub const CFG_SOURCE_IDENTIFIER: &str = "_sourceIdentifier";
/// Configuration: value function attached to a mapping target
pub const CFG_VALUE_FUNCTION: &str = "_valueFunction";
/// Configuration: property alias standing for the literal `name` property
pub const CFG_NAME_ALIAS: &str = "_name";

pub const CFG_RECORD_TYPE: &str = "_RecordType";
pub const CFG_VOCABULARY: &str = "_Vocabulary";
pub const CFG_FIELD: &str = "_Field";
pub const CFG_BASE_FIELD: &str = "_BaseField";
pub const CFG_TERM_LABEL: &str = "_VocabularyTermLabel";
pub const CFG_TERM_DESCRIPTION: &str = "_VocabularyTermDescription";
pub const CFG_TERM_CODE: &str = "_VocabularyTermCode";

/// Original file name marking a file field value as a remote URL
pub const REMOTE_FILE_SENTINEL: &str = "_remote";

/// Check whether a candidate class name is reserved
pub fn is_reserved_class(name: &str) -> bool {
    RESERVED_CLASSES.contains(&name)
}

/// External reference to a schema.org class
pub fn schema_org(class_name: &str) -> String {
    format!("{}{}", SCHEMA_ORG, class_name)
}
