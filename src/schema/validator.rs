//! Corpus schema validation with per-entry reporting
//!
//! The corpus schema maps a classification to the properties, parameters and
//! connectors its models must declare. Each classification compiles into a
//! flat table of [`FieldRule`]s that is evaluated the same way for every
//! catalog entry. Validation never stops at the first problem: every
//! violation of an entry is collected before the next entry is checked.

use miette::Diagnostic;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::core::error::{Error, Result};
use crate::entities::component::{Catalog, ComponentModel, ParameterSpec};
use crate::schema::registry::SchemaRegistry;

/// Declared value type of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[serde(alias = "number")]
    Float,
    #[serde(alias = "integer")]
    Int,
    #[serde(alias = "str")]
    String,
}

impl FieldType {
    /// Does `value` parse as this type?
    pub fn accepts(&self, value: &JsonValue) -> bool {
        match (self, value) {
            (FieldType::String, JsonValue::String(_) | JsonValue::Number(_) | JsonValue::Bool(_)) => true,
            (FieldType::Float, JsonValue::Number(_)) => true,
            (FieldType::Float, JsonValue::String(s)) => s.trim().parse::<f64>().is_ok(),
            (FieldType::Int, JsonValue::Number(n)) => n.is_i64() || n.is_u64(),
            (FieldType::Int, JsonValue::String(s)) => s.trim().parse::<i64>().is_ok(),
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Float => write!(f, "float"),
            FieldType::Int => write!(f, "int"),
            FieldType::String => write!(f, "string"),
        }
    }
}

/// A schema field: a bare type, or a type with an explicit `required` flag
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FieldDecl {
    Bare(FieldType),
    Detailed {
        #[serde(rename = "type")]
        kind: FieldType,
        #[serde(default)]
        required: Option<bool>,
    },
}

impl FieldDecl {
    fn kind(&self) -> FieldType {
        match self {
            FieldDecl::Bare(kind) | FieldDecl::Detailed { kind, .. } => *kind,
        }
    }

    fn required_or(&self, default: bool) -> bool {
        match self {
            FieldDecl::Detailed {
                required: Some(r), ..
            } => *r,
            _ => default,
        }
    }
}

/// Schema record for one classification
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassSchema {
    #[serde(default)]
    pub properties: BTreeMap<String, FieldDecl>,
    #[serde(default)]
    pub parameters: BTreeMap<String, FieldDecl>,
    #[serde(default)]
    pub connectors: Vec<String>,
}

/// Which part of a component model a rule looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Property,
    Parameter,
    Connector,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Property => write!(f, "property"),
            Section::Parameter => write!(f, "parameter"),
            Section::Connector => write!(f, "connector"),
        }
    }
}

/// One row of the rule table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub section: Section,
    pub name: String,
    /// Connectors carry no type
    pub kind: Option<FieldType>,
    pub required: bool,
}

impl ClassSchema {
    /// Compile this record into a flat rule table
    ///
    /// Properties and connectors are required unless marked otherwise;
    /// parameters are optional unless marked `required: true`.
    pub fn rules(&self) -> Vec<FieldRule> {
        let properties = self.properties.iter().map(|(name, decl)| FieldRule {
            section: Section::Property,
            name: name.clone(),
            kind: Some(decl.kind()),
            required: decl.required_or(true),
        });
        let parameters = self.parameters.iter().map(|(name, decl)| FieldRule {
            section: Section::Parameter,
            name: name.clone(),
            kind: Some(decl.kind()),
            required: decl.required_or(false),
        });
        let connectors = self.connectors.iter().map(|name| FieldRule {
            section: Section::Connector,
            name: name.clone(),
            kind: None,
            required: true,
        });
        properties.chain(parameters).chain(connectors).collect()
    }
}

/// The corpus schema: classification -> record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct CorpusSchema {
    classes: BTreeMap<String, ClassSchema>,
}

impl CorpusSchema {
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json_str(&content)
    }

    /// The schema compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::from_json_str(SchemaRegistry::default().schema())
    }

    pub fn load_or_embedded(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Self::embedded(),
        }
    }

    pub fn class(&self, class: &str) -> Option<&ClassSchema> {
        self.classes.get(class)
    }
}

/// A single missing or mistyped field on a catalog entry
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(adg::schema::field))]
pub struct SchemaViolation {
    pub section: Section,
    pub field: String,
    pub message: String,

    #[help]
    help: Option<String>,
}

impl SchemaViolation {
    fn missing(rule: &FieldRule) -> Self {
        let help = match rule.section {
            Section::Connector => format!("Add '{}' to the model's connectors", rule.name),
            section => format!("Add the '{}' {} to the model", rule.name, section),
        };
        Self {
            section: rule.section,
            field: rule.name.clone(),
            message: format!("missing required {} '{}'", rule.section, rule.name),
            help: Some(help),
        }
    }

    fn mistyped(rule: &FieldRule, what: &str, value: &JsonValue, kind: FieldType) -> Self {
        Self {
            section: rule.section,
            field: rule.name.clone(),
            message: format!(
                "{} '{}' {} {} is not a valid {}",
                rule.section, rule.name, what, value, kind
            ),
            help: None,
        }
    }
}

/// Outcome for one catalog entry
#[derive(Debug, Clone)]
pub struct EntryReport {
    pub model: String,
    pub class: String,
    pub violations: Vec<SchemaViolation>,
    pub warnings: Vec<String>,
}

impl EntryReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Outcome for a whole catalog
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub entries: Vec<EntryReport>,
}

impl ValidationReport {
    pub fn valid_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_valid()).count()
    }

    pub fn invalid_count(&self) -> usize {
        self.entries.len() - self.valid_count()
    }

    pub fn warning_count(&self) -> usize {
        self.entries.iter().map(|e| e.warnings.len()).sum()
    }

    pub fn is_valid(&self) -> bool {
        self.invalid_count() == 0
    }

    pub fn entry(&self, model: &str) -> Option<&EntryReport> {
        self.entries.iter().find(|e| e.model == model)
    }

    /// Turn the first invalid entry into an error
    pub fn into_result(self) -> Result<Self> {
        if let Some(bad) = self.entries.iter().find(|e| !e.is_valid()) {
            return Err(Error::SchemaViolation {
                model: bad.model.clone(),
                class: bad.class.clone(),
                violations: bad.violations.clone(),
            });
        }
        Ok(self)
    }
}

/// Validate every catalog entry against the schema record of its class
///
/// Pure: reads both inputs and returns a report. Unknown classifications and
/// missing optional fields become warnings; missing required fields and
/// values that do not parse as their declared type are violations.
pub fn validate(catalog: &Catalog, schema: &CorpusSchema) -> ValidationReport {
    let entries = catalog
        .models()
        .map(|model| validate_entry(model, schema))
        .collect();
    ValidationReport { entries }
}

fn validate_entry(model: &ComponentModel, schema: &CorpusSchema) -> EntryReport {
    let mut report = EntryReport {
        model: model.model.clone(),
        class: model.class.clone(),
        violations: Vec::new(),
        warnings: Vec::new(),
    };

    let Some(class) = schema.class(&model.class) else {
        report
            .warnings
            .push(format!("unknown classification '{}'", model.class));
        return report;
    };

    for rule in class.rules() {
        check_rule(&rule, model, &mut report);
    }
    report
}

fn check_rule(rule: &FieldRule, model: &ComponentModel, report: &mut EntryReport) {
    let present = match rule.section {
        Section::Property => model.properties.contains_key(&rule.name),
        Section::Parameter => model.parameters.contains_key(&rule.name),
        Section::Connector => model.has_connector(&rule.name),
    };

    if !present {
        if rule.required {
            report.violations.push(SchemaViolation::missing(rule));
        } else {
            report
                .warnings
                .push(format!("missing optional {} '{}'", rule.section, rule.name));
        }
        return;
    }

    let Some(kind) = rule.kind else {
        return;
    };

    match rule.section {
        Section::Property => {
            if let Some(value) = model.properties.get(&rule.name) {
                if !kind.accepts(value) {
                    report
                        .violations
                        .push(SchemaViolation::mistyped(rule, "value", value, kind));
                }
            }
        }
        Section::Parameter => {
            if let Some(spec) = model.parameters.get(&rule.name) {
                check_parameter_spec(rule, spec, kind, report);
            }
        }
        Section::Connector => {}
    }
}

fn check_parameter_spec(
    rule: &FieldRule,
    spec: &ParameterSpec,
    kind: FieldType,
    report: &mut EntryReport,
) {
    // Bounds of a string parameter are not checked: they have no ordering
    let bounds_kind = if kind == FieldType::String {
        None
    } else {
        Some(kind)
    };

    for (what, value, expected) in [
        ("minimum", &spec.minimum, bounds_kind),
        ("maximum", &spec.maximum, bounds_kind),
        ("assigned", &spec.assigned, Some(kind)),
    ] {
        if let (Some(value), Some(expected)) = (value, expected) {
            if !expected.accepts(value) {
                report
                    .violations
                    .push(SchemaViolation::mistyped(rule, what, value, expected));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"{
        "Cylinder": {
            "properties": {"DENSITY": "float"},
            "parameters": {
                "DIAMETER": {"type": "float", "required": true},
                "LENGTH": "float"
            },
            "connectors": ["BaseConnection", "EndConnection"]
        },
        "Motor": {
            "properties": {"KV": "int"},
            "parameters": {},
            "connectors": ["Base_Connector"]
        }
    }"#;

    fn catalog(json: &str) -> Catalog {
        Catalog::from_json_str(json).unwrap()
    }

    #[test]
    fn test_rule_table_defaults() {
        let schema = CorpusSchema::from_json_str(SCHEMA).unwrap();
        let rules = schema.class("Cylinder").unwrap().rules();
        assert_eq!(rules.len(), 5);

        let diameter = rules.iter().find(|r| r.name == "DIAMETER").unwrap();
        assert!(diameter.required);
        let length = rules.iter().find(|r| r.name == "LENGTH").unwrap();
        assert!(!length.required);
        let density = rules.iter().find(|r| r.name == "DENSITY").unwrap();
        assert!(density.required);
        assert!(rules
            .iter()
            .filter(|r| r.section == Section::Connector)
            .all(|r| r.kind.is_none() && r.required));
    }

    #[test]
    fn test_missing_connector_counted_per_entry() {
        let schema = CorpusSchema::from_json_str(SCHEMA).unwrap();
        let catalog = catalog(
            r#"[
            {"class": "Cylinder", "model": "TubeA",
             "properties": {"DENSITY": 1.6},
             "parameters": {"DIAMETER": {"minimum": "10"}, "LENGTH": {}},
             "connectors": ["BaseConnection", "EndConnection"]},
            {"class": "Cylinder", "model": "TubeB",
             "properties": {"DENSITY": "1.6"},
             "parameters": {"DIAMETER": {}},
             "connectors": ["BaseConnection"]},
            {"class": "Motor", "model": "MotorA",
             "properties": {"KV": 380},
             "connectors": ["Base_Connector"]}
        ]"#,
        );

        let report = validate(&catalog, &schema);
        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.valid_count(), 2);
        assert_eq!(report.invalid_count(), 1);

        let bad = report.entry("TubeB").unwrap();
        assert_eq!(bad.violations.len(), 1);
        assert_eq!(bad.violations[0].section, Section::Connector);
        assert_eq!(bad.violations[0].field, "EndConnection");
        // Optional LENGTH is only a warning
        assert_eq!(bad.warnings, vec!["missing optional parameter 'LENGTH'".to_string()]);
    }

    #[test]
    fn test_all_violations_of_an_entry_are_collected() {
        let schema = CorpusSchema::from_json_str(SCHEMA).unwrap();
        let catalog = catalog(
            r#"[
            {"class": "Cylinder", "model": "Broken",
             "properties": {"DENSITY": "heavy"},
             "parameters": {"LENGTH": {"minimum": "short"}},
             "connectors": []}
        ]"#,
        );

        let report = validate(&catalog, &schema);
        let entry = report.entry("Broken").unwrap();
        // DENSITY type, DIAMETER missing, LENGTH minimum type, two connectors
        assert_eq!(entry.violations.len(), 5, "{:?}", entry.violations);
    }

    #[test]
    fn test_unknown_class_is_a_warning() {
        let schema = CorpusSchema::from_json_str(SCHEMA).unwrap();
        let catalog = catalog(r#"[{"class": "Balloon", "model": "B1"}]"#);

        let report = validate(&catalog, &schema);
        assert!(report.is_valid());
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn test_int_type_rejects_fractions() {
        let schema = CorpusSchema::from_json_str(SCHEMA).unwrap();
        let catalog = catalog(
            r#"[{"class": "Motor", "model": "M", "properties": {"KV": 380.5},
                 "connectors": ["Base_Connector"]}]"#,
        );
        let report = validate(&catalog, &schema);
        assert_eq!(report.invalid_count(), 1);

        let err = report.into_result().unwrap_err();
        assert!(matches!(err, Error::SchemaViolation { ref model, .. } if model == "M"));
    }

    #[test]
    fn test_embedded_corpus_is_valid() {
        let catalog = Catalog::embedded().unwrap();
        let schema = CorpusSchema::embedded().unwrap();
        let report = validate(&catalog, &schema);
        let problems: Vec<_> = report
            .entries
            .iter()
            .filter(|e| !e.is_valid())
            .map(|e| (&e.model, &e.violations))
            .collect();
        assert!(problems.is_empty(), "{:?}", problems);
        assert_eq!(report.valid_count(), catalog.len());
    }
}
