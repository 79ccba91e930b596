//! Identifier handling for Heurist to RO-Crate conversion
//!
//! Derives the @ids of converted entities from Heurist identifiers and
//! builds the engine-internal keys used to look up Heurist entities across
//! the conversion.

use std::fmt;

use ulid::Ulid;
use url::Url;

use crate::error::ConvertError;

/// Engine-internal key of a Heurist entity
///
/// Each kind of Heurist entity has its own identifier space, so the same raw
/// id ("12") can name a record type, a base field and a term at once. The key
/// keeps them apart in every lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKey {
    RecordType(String),
    BaseField(String),
    /// Field id in the form `recordTypeId:baseFieldId`
    Field(String),
    Term(String),
    /// Term attribute id in the form `termId:attribute`
    TermAttribute(String),
    Record(String),
}

impl SourceKey {
    /// Whether the entity is named as a class (PascalCase) rather than a property
    pub fn is_class(&self) -> bool {
        matches!(self, SourceKey::RecordType(_) | SourceKey::Term(_))
    }

    /// The raw Heurist identifier without the kind prefix
    pub fn raw_id(&self) -> &str {
        match self {
            SourceKey::RecordType(id)
            | SourceKey::BaseField(id)
            | SourceKey::Field(id)
            | SourceKey::Term(id)
            | SourceKey::TermAttribute(id)
            | SourceKey::Record(id) => id,
        }
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self {
            SourceKey::RecordType(_) => 'r',
            SourceKey::BaseField(_) => 'b',
            SourceKey::Field(_) => 'f',
            SourceKey::Term(_) | SourceKey::TermAttribute(_) => 't',
            SourceKey::Record(_) => 'c',
        };
        write!(f, "{}{}", prefix, self.raw_id())
    }
}

/// Attributes of a term a configuration can map to properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermAttribute {
    Label,
    Description,
    Code,
}

impl TermAttribute {
    pub const ALL: [TermAttribute; 3] = [
        TermAttribute::Label,
        TermAttribute::Description,
        TermAttribute::Code,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TermAttribute::Label => "label",
            TermAttribute::Description => "description",
            TermAttribute::Code => "code",
        }
    }
}

/// Field id: the binding of a base field to one record type
pub fn field_id(record_type_id: &str, base_field_id: &str) -> String {
    format!("{}:{}", record_type_id, base_field_id)
}

/// Term attribute id used to key the term property mappings
pub fn term_attribute_id(term_id: &str, attribute: TermAttribute) -> String {
    format!("{}:{}", term_id, attribute.as_str())
}

/// @id of the entity converted from a Heurist record
pub fn record_entity_id(record_id: &str) -> String {
    format!("#rec_{}", record_id)
}

/// @id of the entity converted from a Heurist term or vocabulary
pub fn term_entity_id(term_id: &str) -> String {
    format!("#term_{}", term_id)
}

/// Fresh fragment @id for entities without a Heurist identity
pub fn generate_fragment_id() -> String {
    format!("#{}", Ulid::new())
}

/// Namespace holding the classes and properties generated for one database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    url: Url,
}

impl Namespace {
    /// Build the namespace `<base><db_name>`
    ///
    /// # Errors
    /// Returns `InvalidNamespace` when `base` is not an absolute hierarchical URL.
    pub fn new(base: &str, db_name: &str) -> Result<Self, ConvertError> {
        let invalid = |reason: String| ConvertError::InvalidNamespace {
            base: base.to_string(),
            reason,
        };

        let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
        url.set_fragment(None);
        if !db_name.is_empty() {
            url.path_segments_mut()
                .map_err(|_| invalid("URL cannot be a base".to_string()))?
                .pop_if_empty()
                .push(db_name);
        }
        Ok(Self { url })
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// @id of a class or property definition: `<namespace>#<name>`
    pub fn definition_id(&self, name: &str) -> String {
        let mut url = self.url.clone();
        url.set_fragment(Some(name));
        url.into()
    }
}
