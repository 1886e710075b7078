//! Graph store - where design graphs live once they leave the builder
//!
//! This module provides:
//! - The [`GraphStore`] trait: the narrow set of round trips the builder and
//!   the query client need from a remote design store
//! - [`SqliteStore`], a SQLite-backed implementation whose templated queries
//!   are SQL
//!
//! Every call is a blocking round trip. Nothing here retries: a failed call
//! surfaces directly to the caller.

mod queries;
mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Diagnostic;
use rusqlite::Connection;
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

/// One result row of a templated query, keyed by column name
pub type Row = Map<String, JsonValue>;

/// Current schema version - the store refuses databases written by a newer one
const SCHEMA_VERSION: i32 = 1;

/// Transport and backend failures
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("Store connection is closed")]
    #[diagnostic(
        code(adg::store::closed),
        help("Open a new client; closed connections are never reopened")
    )]
    Closed,

    #[error("Query interrupted after {} ms", .0.as_millis())]
    #[diagnostic(code(adg::store::timeout))]
    Timeout(Duration),

    #[error("Store rejected {operation}: {message}")]
    #[diagnostic(code(adg::store::rejected))]
    Rejected { operation: String, message: String },

    #[error("Store database {path} has schema version {found}, expected {expected}")]
    #[diagnostic(code(adg::store::schema_version))]
    SchemaVersion {
        path: String,
        found: i32,
        expected: i32,
    },

    #[error("SQLite error: {0}")]
    #[diagnostic(code(adg::store::sqlite))]
    Sqlite(#[from] rusqlite::Error),
}

/// The round trips a design store must support
pub trait GraphStore {
    fn create_design(&mut self, name: &str) -> Result<(), StoreError>;

    fn create_instance(&mut self, design: &str, model: &str, name: &str) -> Result<(), StoreError>;

    fn create_parameter(&mut self, design: &str, name: &str, value: &str) -> Result<(), StoreError>;

    fn assign_parameter(
        &mut self,
        design: &str,
        instance: &str,
        attribute: &str,
        parameter: &str,
    ) -> Result<(), StoreError>;

    fn create_connection(
        &mut self,
        design: &str,
        instance1: &str,
        connector1: &str,
        instance2: &str,
        connector2: &str,
    ) -> Result<(), StoreError>;

    /// Mark `instance` as the orientation anchor of `design`
    fn orient_design(&mut self, design: &str, instance: &str) -> Result<(), StoreError>;

    fn delete_design(&mut self, name: &str) -> Result<(), StoreError>;

    fn design_names(&mut self) -> Result<Vec<String>, StoreError>;

    /// Run one query, giving up with [`StoreError::Timeout`] after `timeout`
    fn submit(&mut self, query: &str, timeout: Duration) -> Result<Vec<Row>, StoreError>;

    /// Release the connection. Later calls fail with [`StoreError::Closed`].
    fn close(&mut self) -> Result<(), StoreError>;

    fn is_open(&self) -> bool;
}

/// Design store backed by a SQLite database
pub struct SqliteStore {
    conn: Option<Connection>,
    location: PathBuf,
}

impl SqliteStore {
    /// Open or create a store database
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Rejected {
                    operation: "open".to_string(),
                    message: format!("{}: {}", parent.display(), e),
                })?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn, path.to_path_buf())
    }

    /// Open a private in-memory store (used by tests and dry runs)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, PathBuf::from(":memory:"))
    }

    fn from_connection(conn: Connection, location: PathBuf) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut store = Self {
            conn: Some(conn),
            location,
        };
        store.init_schema()?;
        tracing::debug!(location = %store.location.display(), "opened design store");
        Ok(store)
    }

    /// Where the database lives
    pub fn location(&self) -> &Path {
        &self.location
    }

    fn conn(&self) -> Result<&Connection, StoreError> {
        self.conn.as_ref().ok_or(StoreError::Closed)
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        if self.conn.is_some() {
            tracing::warn!(
                location = %self.location.display(),
                "design store dropped without close()"
            );
        }
    }
}
