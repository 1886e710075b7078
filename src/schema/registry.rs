//! Embedded corpus assets: default catalog, corpus schema and the catalog
//! file-format schema

use rust_embed::Embed;
use serde_json::Value as JsonValue;

#[derive(Embed)]
#[folder = "corpus/"]
struct EmbeddedCorpus;

const CATALOG_FILE: &str = "catalog.json";
const SCHEMA_FILE: &str = "schema.json";
const CATALOG_FORMAT_FILE: &str = "catalog.schema.json";

/// Access to the assets compiled into the binary
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    catalog: String,
    schema: String,
    catalog_format: String,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self {
            catalog: embedded_str(CATALOG_FILE),
            schema: embedded_str(SCHEMA_FILE),
            catalog_format: embedded_str(CATALOG_FORMAT_FILE),
        }
    }
}

fn embedded_str(name: &str) -> String {
    EmbeddedCorpus::get(name)
        .map(|file| String::from_utf8_lossy(&file.data).into_owned())
        .unwrap_or_default()
}

impl SchemaRegistry {
    /// Default component catalog (JSON array)
    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    /// Default corpus schema (JSON object keyed by classification)
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Structural check of a raw catalog document
    ///
    /// Returns one message per problem, each prefixed with the JSON pointer of
    /// the offending value. An empty list means the document is well formed.
    pub fn check_catalog_format(&self, raw: &JsonValue) -> Vec<String> {
        let format: JsonValue = match serde_json::from_str(&self.catalog_format) {
            Ok(v) => v,
            Err(e) => return vec![format!("embedded catalog format is unreadable: {}", e)],
        };
        let validator = match jsonschema::validator_for(&format) {
            Ok(v) => v,
            Err(e) => return vec![format!("embedded catalog format is invalid: {}", e)],
        };

        validator
            .iter_errors(raw)
            .map(|error| {
                let path = error.instance_path.to_string();
                let at = if path.is_empty() { "/".to_string() } else { path };
                format!("{}: {}", at, error)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assets_are_embedded() {
        let registry = SchemaRegistry::default();
        assert!(registry.catalog().trim_start().starts_with('['));
        assert!(registry.schema().trim_start().starts_with('{'));
    }

    #[test]
    fn test_embedded_catalog_is_well_formed() {
        let registry = SchemaRegistry::default();
        let raw: JsonValue = serde_json::from_str(registry.catalog()).unwrap();
        assert!(registry.check_catalog_format(&raw).is_empty());
    }

    #[test]
    fn test_catalog_must_be_an_array() {
        let registry = SchemaRegistry::default();
        let problems = registry.check_catalog_format(&serde_json::json!({"model": "Hub4"}));
        assert_eq!(problems.len(), 1);
        assert!(problems[0].starts_with("/:"));
    }
}
