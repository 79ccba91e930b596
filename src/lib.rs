//! Heurist to RO-Crate Conversion Library
//!
//! This library converts the export of a Heurist database into an RO-Crate:
//! a JSON-LD metadata document describing the database's records, its
//! vocabularies and the uploaded files they reference.
//!
//! # Overview
//!
//! Heurist databases carry their own schema. The converter derives a small
//! vocabulary from it and describes every record in terms of that vocabulary:
//!
//! 1. Record types become `rdfs:Class` definitions, fields become
//!    `rdf:Property` definitions with domains and ranges
//! 2. Vocabularies become `DefinedTermSet`s holding their terms
//! 3. Records become entities typed by their record type's class, with field
//!    values rendered by type (dates, geometries, files, term and record
//!    references)
//! 4. Everything is flattened into a single @graph with each @id once
//!
//! Generated class and property names live in a per-database namespace and
//! are registered in the @context.
//!
//! # Configuration
//!
//! A configuration crate can map record types and vocabularies onto existing
//! classes, fields and term attributes onto existing properties, attach value
//! functions to fields, and contribute custom class and property definitions.
//! See [`config`] for the mapping format.
//!
//! # Usage
//!
//! ```ignore
//! use heurist_rocrate::{convert, Configuration, ConvertOptions, SourceDatabase, TracingDiagnostics};
//!
//! let source = SourceDatabase::from_json_str(&export, &TracingDiagnostics)?;
//! let result = convert(
//!     &source,
//!     &Configuration::empty(),
//!     &ConvertOptions::default(),
//!     &TracingDiagnostics,
//! )?;
//!
//! println!("{}", result.to_json_string(true)?);
//! ```

pub mod config;
pub mod context;
pub mod convert;
pub mod definition;
pub mod diagnostics;
pub mod entity;
pub mod error;
pub mod functions;
pub mod id;
pub mod metadata;
pub mod naming;
pub mod normalize;
pub mod package;
pub mod source;
pub mod vocab;

// Re-export main types for convenience
pub use crate::config::Configuration;
pub use crate::convert::{
    convert, ConvertOptions, ConvertResult, ConvertStats, Converter, StatCategory,
};
pub use crate::diagnostics::{CollectedDiagnostics, Diagnostics, Level, TracingDiagnostics};
pub use crate::entity::{Entity, EntityRef, PropertyValue};
pub use crate::error::ConvertError;
pub use crate::metadata::Metadata;
pub use crate::package::{write_directory, write_zip};
pub use crate::source::SourceDatabase;
pub use crate::vocab::DEFAULT_NAMESPACE_BASE;
