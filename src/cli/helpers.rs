//! Shared helper functions for CLI commands

use miette::Result;
use serde_json::Value as JsonValue;
use tabled::{builder::Builder, settings::Style};

use crate::cli::GlobalOpts;
use crate::core::config::Config;
use crate::core::store::{Row, SqliteStore};
use crate::query::client::Client;

/// Load the layered config, with `--store` taking precedence
pub fn load_config(global: &GlobalOpts) -> Config {
    let mut config = Config::load();
    if let Some(store) = &global.store {
        config.store = Some(store.clone());
    }
    config
}

/// Open the configured store and wrap it in a client
pub fn open_client(config: &Config) -> Result<Client<SqliteStore>> {
    let path = config.store_path();
    let store = SqliteStore::open(&path)?;
    Ok(Client::from_config(store, config))
}

/// Parse a `KEY=VALUE` argument
pub fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Render a JSON cell without quoting strings
pub fn cell(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

fn columns(rows: &[Row]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// Result rows as a rounded table
pub fn rows_table(rows: &[Row]) -> String {
    let columns = columns(rows);
    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.to_uppercase()));
    for row in rows {
        builder.push_record(
            columns
                .iter()
                .map(|c| row.get(c).map(cell).unwrap_or_default()),
        );
    }
    builder.build().with(Style::rounded()).to_string()
}

/// Result rows as tab-separated lines, header first
pub fn rows_tsv(rows: &[Row]) -> String {
    let columns = columns(rows);
    let mut out = columns.join("\t");
    for row in rows {
        out.push('\n');
        let line: Vec<String> = columns
            .iter()
            .map(|c| row.get(c).map(cell).unwrap_or_default())
            .collect();
        out.push_str(&line.join("\t"));
    }
    out
}
