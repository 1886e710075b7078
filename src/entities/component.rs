//! Component models and the corpus catalog

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::error::{Error, Result};
use crate::schema::registry::SchemaRegistry;

/// Classification of the orientation anchor model
pub const ORIENT_CLASS: &str = "Orient";

/// Parameter declaration on a component model
///
/// Bounds and defaults are kept as raw JSON: catalogs write them both as
/// numbers and as numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned: Option<JsonValue>,
}

fn json_f64(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl ParameterSpec {
    pub fn minimum_f64(&self) -> Option<f64> {
        self.minimum.as_ref().and_then(json_f64)
    }

    pub fn maximum_f64(&self) -> Option<f64> {
        self.maximum.as_ref().and_then(json_f64)
    }
}

/// An immutable catalog entry describing one component model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentModel {
    /// Classification (e.g. "Wing", "Cylinder", "Orient")
    pub class: String,

    /// Unique model name
    pub model: String,

    /// Scalar attributes describing the model itself
    #[serde(default)]
    pub properties: BTreeMap<String, JsonValue>,

    /// Tunable parameters an instance may assign
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterSpec>,

    /// Named ports
    #[serde(default)]
    pub connectors: Vec<String>,
}

impl ComponentModel {
    pub fn has_connector(&self, connector: &str) -> bool {
        self.connectors.iter().any(|c| c == connector)
    }

    pub fn is_orient(&self) -> bool {
        self.class == ORIENT_CLASS
    }
}

/// The corpus: every known component model, keyed by model name
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    models: BTreeMap<String, ComponentModel>,
}

impl Catalog {
    /// Build a catalog from already-parsed entries
    pub fn from_models(models: impl IntoIterator<Item = ComponentModel>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for model in models {
            if map.contains_key(&model.model) {
                return Err(Error::DuplicateModel { model: model.model });
            }
            map.insert(model.model.clone(), model);
        }
        Ok(Self { models: map })
    }

    /// Parse catalog JSON, checking its structure first
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: JsonValue = serde_json::from_str(content)?;
        let problems = SchemaRegistry::default().check_catalog_format(&raw);
        if !problems.is_empty() {
            return Err(Error::CatalogFormat { problems });
        }
        let entries: Vec<ComponentModel> = serde_json::from_value(raw)?;
        Self::from_models(entries)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json_str(&content)
    }

    /// The corpus compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::from_json_str(SchemaRegistry::default().catalog())
    }

    /// Load `path` if given, otherwise the embedded corpus
    pub fn load_or_embedded(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Self::embedded(),
        }
    }

    /// Look up a model by name
    pub fn get_model(&self, name: &str) -> Result<&ComponentModel> {
        self.models.get(name).ok_or_else(|| Error::UnknownModel {
            model: name.to_string(),
        })
    }

    pub fn models(&self) -> impl Iterator<Item = &ComponentModel> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_catalog_loads() {
        let catalog = Catalog::embedded().unwrap();
        assert!(!catalog.is_empty());
        let orient = catalog.get_model("Orient").unwrap();
        assert!(orient.is_orient());
        assert!(orient.has_connector("ORIENTCONN"));
        assert_eq!(catalog.get_model("PortedCylinder").unwrap().class, "Cylinder");
    }

    #[test]
    fn test_unknown_model() {
        let catalog = Catalog::embedded().unwrap();
        let err = catalog.get_model("Zeppelin").unwrap_err();
        assert!(matches!(err, Error::UnknownModel { ref model } if model == "Zeppelin"));
    }

    #[test]
    fn test_duplicate_model_rejected() {
        let json = r#"[
            {"class": "Hub", "model": "Hub4", "connectors": ["Top"]},
            {"class": "Hub", "model": "Hub4", "connectors": ["Top"]}
        ]"#;
        let err = Catalog::from_json_str(json).unwrap_err();
        assert!(matches!(err, Error::DuplicateModel { ref model } if model == "Hub4"));
    }

    #[test]
    fn test_malformed_catalog_reports_every_problem() {
        let json = r#"[
            {"class": "Hub"},
            {"model": "NoClass", "connectors": "not-a-list"}
        ]"#;
        let err = Catalog::from_json_str(json).unwrap_err();
        match err {
            Error::CatalogFormat { problems } => assert!(problems.len() >= 3, "{:?}", problems),
            other => panic!("expected CatalogFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_parameter_bounds_accept_strings_and_numbers() {
        let spec = ParameterSpec {
            minimum: Some(JsonValue::from("8")),
            maximum: Some(JsonValue::from(200.5)),
            assigned: None,
        };
        assert_eq!(spec.minimum_f64(), Some(8.0));
        assert_eq!(spec.maximum_f64(), Some(200.5));
    }
}
