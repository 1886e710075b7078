//! Schema system - embedded corpus assets and catalog validation

pub mod registry;
pub mod validator;

pub use registry::SchemaRegistry;
pub use validator::{
    validate, ClassSchema, CorpusSchema, EntryReport, FieldRule, FieldType, SchemaViolation,
    Section, ValidationReport,
};
