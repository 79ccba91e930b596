//! Heurist source data
//!
//! An id-keyed arena holding the exported Heurist structure (record types,
//! base fields, fields, terms) and data (records with typed field values).
//! Relations between entities are plain ids resolved through the lookup
//! methods, so the naturally cyclic source graph needs no shared ownership.

use indexmap::IndexMap;
use std::path::Path;

use serde::Deserialize;

use crate::diagnostics::Diagnostics;
use crate::error::ConvertError;
use crate::id::{field_id, SourceKey};
use crate::naming::Named;
use crate::normalize::normalize_file_size;
use crate::vocab::REMOTE_FILE_SENTINEL;

/// A Heurist record type
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecordType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Named for RecordType {
    fn source_key(&self) -> SourceKey {
        SourceKey::RecordType(self.id.clone())
    }

    fn label(&self) -> &str {
        &self.name
    }
}

/// Semantic type of a base field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum BaseFieldType {
    #[serde(rename = "blocktext")]
    Memo,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "enum")]
    Term,
    #[serde(rename = "file")]
    File,
    #[serde(rename = "float")]
    Decimal,
    #[serde(rename = "freetext")]
    Text,
    #[serde(rename = "geo")]
    Geo,
    #[serde(rename = "integer")]
    Integer,
    #[serde(rename = "relationtype")]
    RelationType,
    #[serde(rename = "relmarker")]
    Relationship,
    #[serde(rename = "resource")]
    RecordPointer,
    #[serde(rename = "separator")]
    Separator,
    #[serde(other)]
    Other,
}

/// A Heurist base field (detail type), shared across record types
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BaseField {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub field_type: BaseFieldType,
    /// Record types a record pointer may target
    #[serde(default)]
    pub target_record_types: Vec<String>,
}

impl Named for BaseField {
    fn source_key(&self) -> SourceKey {
        SourceKey::BaseField(self.id.clone())
    }

    fn label(&self) -> &str {
        &self.name
    }
}

/// The binding of a base field to one record type
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Field {
    pub record_type_id: String,
    pub base_field_id: String,
    /// Display name on the record type
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Field {
    pub fn id(&self) -> String {
        field_id(&self.record_type_id, &self.base_field_id)
    }
}

impl Named for Field {
    fn source_key(&self) -> SourceKey {
        SourceKey::Field(self.id())
    }

    fn label(&self) -> &str {
        &self.name
    }
}

/// A Heurist term; a term without parent is a vocabulary
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Term {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl Term {
    pub fn is_vocabulary(&self) -> bool {
        self.parent_id.as_deref().map_or(true, str::is_empty)
    }
}

/// Year, month and day components as exported
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DateParts {
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub day: Option<String>,
}

impl DateParts {
    pub fn year(year: impl Into<String>) -> Self {
        Self {
            year: Some(year.into()),
            ..Self::default()
        }
    }

    pub fn ymd(year: impl Into<String>, month: impl Into<String>, day: impl Into<String>) -> Self {
        Self {
            year: Some(year.into()),
            month: Some(month.into()),
            day: Some(day.into()),
        }
    }
}

/// Temporal content of a date field value
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DateValue {
    Simple(DateParts),
    /// Range with earliest (terminus post quem) and latest (terminus ante quem) bounds
    Range {
        #[serde(default)]
        earliest: Option<DateParts>,
        #[serde(default)]
        latest: Option<DateParts>,
    },
}

/// An uploaded or remote file attached to a record
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "FileExport")]
pub struct FileValue {
    pub file_id: Option<String>,
    /// Original file name; the remote sentinel marks a remote URL
    pub original_name: Option<String>,
    pub mime_type: Option<String>,
    /// Size in bytes
    pub size: Option<u64>,
    pub upload_date: Option<String>,
    pub url: Option<String>,
}

/// Wire form of a file value; `size` is in `size_unit`, bytes when absent
#[derive(Debug, Deserialize)]
struct FileExport {
    #[serde(default)]
    file_id: Option<String>,
    #[serde(default)]
    original_name: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    size_unit: Option<String>,
    #[serde(default)]
    upload_date: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl From<FileExport> for FileValue {
    fn from(export: FileExport) -> Self {
        let mut file = FileValue {
            file_id: export.file_id,
            original_name: export.original_name,
            mime_type: export.mime_type,
            size: None,
            upload_date: export.upload_date,
            url: export.url,
        };
        if let Some(size) = export.size {
            file.set_size(size, export.size_unit.as_deref().unwrap_or("B"));
        }
        file
    }
}

impl FileValue {
    /// Set the size from a value in a declared unit (B, KB, MB, GB)
    pub fn set_size(&mut self, size: u64, unit: &str) {
        self.size = Some(normalize_file_size(size, unit));
    }

    pub fn is_remote(&self) -> bool {
        self.original_name.as_deref() == Some(REMOTE_FILE_SENTINEL)
    }

    /// Stored filename of a local upload: `ulf_<fileId>_<originalName>`
    ///
    /// Only the final component of the original name is used, so the stored
    /// name never leaves the directory it is written to.
    pub fn local_name(&self) -> Option<String> {
        if self.is_remote() {
            return None;
        }
        let id = self.file_id.as_deref().filter(|id| is_plain_name(id))?;
        let name = self
            .original_name
            .as_deref()
            .and_then(|name| Path::new(name).file_name())
            .and_then(|name| name.to_str())?;
        Some(format!("ulf_{}_{}", id, name))
    }
}

/// Whether `name` is a single path component usable as a file name
pub fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    )
}

/// Typed payload of a field value
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldValueKind {
    Generic,
    Date { date: DateValue },
    Geo { wkt: String },
    File { file: FileValue },
    Term { term_id: String },
    RecordPointer { record_id: String },
}

/// One value of a field on a record
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    /// Back-reference to the field (`recordTypeId:baseFieldId`)
    pub field_id: String,
    /// Raw exported value
    pub raw: String,
    pub kind: FieldValueKind,
}

/// A Heurist record
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub title: Option<String>,
    pub record_type_id: String,
    values: IndexMap<String, Vec<FieldValue>>,
}

impl Record {
    pub fn new(id: impl Into<String>, record_type_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            record_type_id: record_type_id.into(),
            values: IndexMap::new(),
        }
    }

    pub fn add_value(&mut self, value: FieldValue) {
        self.values
            .entry(value.field_id.clone())
            .or_default()
            .push(value);
    }

    /// Field values grouped by field id, in first-seen order
    pub fn values(&self) -> &IndexMap<String, Vec<FieldValue>> {
        &self.values
    }

    pub fn field_values(&self, field_id: &str) -> Option<&[FieldValue]> {
        self.values.get(field_id).map(Vec::as_slice)
    }
}

/// Exported Heurist database
#[derive(Debug, Clone, Default)]
pub struct SourceDatabase {
    pub db_name: String,
    pub name: Option<String>,
    pub description: Option<String>,
    record_types: IndexMap<String, RecordType>,
    base_fields: IndexMap<String, BaseField>,
    fields: IndexMap<String, Field>,
    terms: IndexMap<String, Term>,
    records: IndexMap<String, Record>,
}

impl SourceDatabase {
    pub fn new(db_name: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            ..Self::default()
        }
    }

    pub fn add_record_type(&mut self, record_type: RecordType) {
        self.record_types.insert(record_type.id.clone(), record_type);
    }

    pub fn add_base_field(&mut self, base_field: BaseField) {
        self.base_fields.insert(base_field.id.clone(), base_field);
    }

    pub fn add_field(&mut self, field: Field) {
        self.fields.insert(field.id(), field);
    }

    pub fn add_term(&mut self, term: Term) {
        self.terms.insert(term.id.clone(), term);
    }

    pub fn add_record(&mut self, record: Record) {
        self.records.insert(record.id.clone(), record);
    }

    /// Attach a value for a base field to a record
    ///
    /// When the record's type carries no field for the base field, a
    /// non-standard field is created from the base field so ad-hoc values
    /// survive. Returns false when the record, its record type or the base
    /// field is unknown.
    pub fn add_field_value(
        &mut self,
        record_id: &str,
        base_field_id: &str,
        raw: impl Into<String>,
        kind: FieldValueKind,
    ) -> bool {
        let Some(record_type_id) = self.records.get(record_id).map(|r| r.record_type_id.clone())
        else {
            return false;
        };
        let id = field_id(&record_type_id, base_field_id);
        if !self.fields.contains_key(&id) {
            let Some(base_field) = self.base_fields.get(base_field_id) else {
                return false;
            };
            if !self.record_types.contains_key(&record_type_id) {
                return false;
            }
            let field = Field {
                record_type_id: record_type_id.clone(),
                base_field_id: base_field_id.to_string(),
                name: base_field.name.clone(),
                description: base_field.description.clone(),
            };
            self.fields.insert(id.clone(), field);
        }

        match self.records.get_mut(record_id) {
            Some(record) => {
                record.add_value(FieldValue {
                    field_id: id,
                    raw: raw.into(),
                    kind,
                });
                true
            }
            None => false,
        }
    }

    pub fn find_term(&self, id: &str) -> Option<&Term> {
        self.terms.get(id)
    }

    pub fn find_record_type(&self, id: &str) -> Option<&RecordType> {
        self.record_types.get(id)
    }

    pub fn find_base_field(&self, id: &str) -> Option<&BaseField> {
        self.base_fields.get(id)
    }

    /// Find a field by its `recordTypeId:baseFieldId` id
    pub fn find_field(&self, id: &str) -> Option<&Field> {
        self.fields.get(id)
    }

    pub fn find_field_by_record_type_and_base_field(
        &self,
        record_type_id: &str,
        base_field_id: &str,
    ) -> Option<&Field> {
        self.fields.get(&field_id(record_type_id, base_field_id))
    }

    pub fn find_record(&self, id: &str) -> Option<&Record> {
        self.records.get(id)
    }

    /// Top-level terms
    pub fn vocabularies(&self) -> impl Iterator<Item = &Term> {
        self.terms.values().filter(|t| t.is_vocabulary())
    }

    pub fn child_terms<'a>(&'a self, parent_id: &'a str) -> impl Iterator<Item = &'a Term> + 'a {
        self.terms
            .values()
            .filter(move |t| t.parent_id.as_deref() == Some(parent_id))
    }

    /// Record types with a field bound to the base field
    pub fn base_field_record_types(&self, base_field_id: &str) -> Vec<&RecordType> {
        self.fields
            .values()
            .filter(|f| f.base_field_id == base_field_id)
            .filter_map(|f| self.record_types.get(&f.record_type_id))
            .collect()
    }

    pub fn record_types(&self) -> impl Iterator<Item = &RecordType> {
        self.record_types.values()
    }

    pub fn base_fields(&self) -> impl Iterator<Item = &BaseField> {
        self.base_fields.values()
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    pub fn terms(&self) -> impl Iterator<Item = &Term> {
        self.terms.values()
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Load a JSON export dump
    ///
    /// Values that can't be attached to a record are warned about and dropped.
    pub fn from_json_str(content: &str, diagnostics: &dyn Diagnostics) -> Result<Self, ConvertError> {
        let export: SourceExport = serde_json::from_str(content)?;
        Ok(export.into_database(diagnostics))
    }
}

/// Wire form of an exported database
#[derive(Debug, Deserialize)]
struct SourceExport {
    db_name: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    record_types: Vec<RecordType>,
    #[serde(default)]
    base_fields: Vec<BaseField>,
    #[serde(default)]
    fields: Vec<Field>,
    #[serde(default)]
    terms: Vec<Term>,
    #[serde(default)]
    records: Vec<RecordExport>,
}

#[derive(Debug, Deserialize)]
struct RecordExport {
    id: String,
    record_type_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    values: Vec<ValueExport>,
}

#[derive(Debug, Deserialize)]
struct ValueExport {
    base_field_id: String,
    #[serde(default)]
    raw: String,
    #[serde(flatten)]
    kind: FieldValueKind,
}

impl SourceExport {
    fn into_database(self, diagnostics: &dyn Diagnostics) -> SourceDatabase {
        let mut db = SourceDatabase::new(self.db_name);
        db.name = self.name;
        db.description = self.description;
        self.record_types.into_iter().for_each(|r| db.add_record_type(r));
        self.base_fields.into_iter().for_each(|b| db.add_base_field(b));
        self.fields.into_iter().for_each(|f| db.add_field(f));
        self.terms.into_iter().for_each(|t| db.add_term(t));

        // Shells first: record pointer values may target any record.
        let mut pending = Vec::new();
        for record in self.records {
            let mut shell = Record::new(record.id.clone(), record.record_type_id);
            shell.title = record.title;
            db.add_record(shell);
            pending.push((record.id, record.values));
        }
        for (record_id, values) in pending {
            for value in values {
                if !db.add_field_value(&record_id, &value.base_field_id, value.raw, value.kind) {
                    diagnostics.warning(&format!(
                        "Can't attach the value of base field ({}) to record ({}), the value was dropped",
                        value.base_field_id, record_id
                    ));
                }
            }
        }
        db
    }
}
