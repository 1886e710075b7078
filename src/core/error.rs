//! Error taxonomy shared by every ADG module

use miette::Diagnostic;
use thiserror::Error;

use crate::core::store::StoreError;
use crate::schema::validator::SchemaViolation;

/// Crate-wide result alias
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure ADG can report
///
/// Errors are raised where they are detected. Nothing in the crate retries or
/// compensates; callers decide whether to delete and rebuild a design.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Unknown component model: {model}")]
    #[diagnostic(
        code(adg::corpus::unknown_model),
        help("Check the model name against `adg corpus show`")
    )]
    UnknownModel { model: String },

    #[error("Duplicate component model '{model}' in catalog")]
    #[diagnostic(code(adg::corpus::duplicate_model))]
    DuplicateModel { model: String },

    #[error("Catalog file is malformed: {} problem(s)", .problems.len())]
    #[diagnostic(code(adg::corpus::catalog_format))]
    CatalogFormat { problems: Vec<String> },

    #[error("Catalog entry '{model}' violates the {class} schema: {} violation(s)", .violations.len())]
    #[diagnostic(code(adg::schema::violation))]
    SchemaViolation {
        model: String,
        class: String,
        #[related]
        violations: Vec<SchemaViolation>,
    },

    #[error("Design '{design}' references missing instance '{instance}'")]
    #[diagnostic(code(adg::design::missing_instance))]
    MissingInstance { design: String, instance: String },

    #[error("Design '{design}' already has an instance named '{instance}'")]
    #[diagnostic(code(adg::design::duplicate_instance))]
    DuplicateInstance { design: String, instance: String },

    #[error("Instance '{instance}' assigns '{attribute}' to missing parameter '{parameter}'")]
    #[diagnostic(code(adg::design::missing_parameter))]
    MissingParameter {
        instance: String,
        attribute: String,
        parameter: String,
    },

    #[error("Design '{design}' already has a parameter named '{parameter}'")]
    #[diagnostic(code(adg::design::duplicate_parameter))]
    DuplicateParameter { design: String, parameter: String },

    #[error("Connector '{connector}' does not exist on '{instance}' (model {model})")]
    #[diagnostic(code(adg::design::invalid_connector))]
    InvalidConnector {
        instance: String,
        model: String,
        connector: String,
    },

    #[error("Invalid parameter '{attribute}' on '{instance}': {reason}")]
    #[diagnostic(code(adg::builder::invalid_parameter))]
    InvalidParameter {
        instance: String,
        attribute: String,
        reason: String,
    },

    #[error("Handle for '{name}' does not belong to the open design '{design}'")]
    #[diagnostic(
        code(adg::builder::foreign_handle),
        help("Handles are only valid inside the session that created them")
    )]
    ForeignHandle { design: String, name: String },

    #[error("Design '{design}' already exists in the store")]
    #[diagnostic(
        code(adg::builder::design_exists),
        help("Delete it first or enable `overwrite_designs`")
    )]
    DesignExists { design: String },

    #[error("Design '{design}' does not exist in the store")]
    #[diagnostic(code(adg::store::unknown_design), help("List designs with `adg design list`"))]
    UnknownDesign { design: String },

    #[error("Query template '{name}' not found (searched: {})", .searched.join(", "))]
    #[diagnostic(code(adg::query::template_not_found))]
    TemplateNotFound { name: String, searched: Vec<String> },

    #[error("Template parameter '{key}' is not an identifier")]
    #[diagnostic(
        code(adg::query::invalid_key),
        help("Keys are matched as whole identifiers: letters, digits and '_'")
    )]
    InvalidTemplateKey { key: String },

    #[error("Query block {block} of template '{template}' timed out after {timeout_ms} ms")]
    #[diagnostic(code(adg::query::timeout))]
    QueryTimeout {
        template: String,
        block: usize,
        timeout_ms: u64,
    },

    #[error("Cannot align study column '{column}': {len} value(s), expected {expected}")]
    #[diagnostic(code(adg::study::align))]
    AlignError {
        column: String,
        len: usize,
        expected: usize,
    },

    #[error("Artifact key '{key}' does not stay below the sink root")]
    #[diagnostic(
        code(adg::study::artifact_key),
        help("Design names used for staging must not be absolute or contain '..'")
    )]
    InvalidArtifactKey { key: String },

    #[error(transparent)]
    #[diagnostic(code(adg::store))]
    Store(#[from] StoreError),

    #[error("I/O error on {path}: {source}")]
    #[diagnostic(code(adg::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    #[diagnostic(code(adg::json))]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    #[diagnostic(code(adg::yaml))]
    Yaml(#[from] serde_yml::Error),

    #[error("CSV error: {0}")]
    #[diagnostic(code(adg::csv))]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub(crate) fn invalid_parameter(
        instance: impl Into<String>,
        attribute: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            instance: instance.into(),
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }
}
