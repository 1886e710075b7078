//! Database schema initialization

use rusqlite::{params, OptionalExtension};

use super::{SqliteStore, StoreError, SCHEMA_VERSION};

impl SqliteStore {
    /// Create tables on a fresh database and check the version of an old one
    pub(super) fn init_schema(&mut self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- One row per design graph
            CREATE TABLE IF NOT EXISTS designs (
                name TEXT PRIMARY KEY,
                created TEXT NOT NULL,
                orient TEXT
            );

            -- Component instances placed in a design
            CREATE TABLE IF NOT EXISTS instances (
                design TEXT NOT NULL,
                name TEXT NOT NULL,
                model TEXT NOT NULL,
                PRIMARY KEY (design, name),
                FOREIGN KEY (design) REFERENCES designs(name) ON DELETE CASCADE
            );

            -- Named scalar values, always stored in their wire (string) form
            CREATE TABLE IF NOT EXISTS parameters (
                design TEXT NOT NULL,
                name TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (design, name),
                FOREIGN KEY (design) REFERENCES designs(name) ON DELETE CASCADE
            );

            -- Instance attribute -> parameter indirection
            CREATE TABLE IF NOT EXISTS assignments (
                design TEXT NOT NULL,
                instance TEXT NOT NULL,
                attr TEXT NOT NULL,
                parameter TEXT NOT NULL,
                PRIMARY KEY (design, instance, attr),
                FOREIGN KEY (design, instance) REFERENCES instances(design, name) ON DELETE CASCADE,
                FOREIGN KEY (design, parameter) REFERENCES parameters(design, name) ON DELETE CASCADE
            );

            -- Undirected multigraph edges; id keeps insertion order
            CREATE TABLE IF NOT EXISTS connections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                design TEXT NOT NULL,
                instance1 TEXT NOT NULL,
                connector1 TEXT NOT NULL,
                instance2 TEXT NOT NULL,
                connector2 TEXT NOT NULL,
                FOREIGN KEY (design, instance1) REFERENCES instances(design, name) ON DELETE CASCADE,
                FOREIGN KEY (design, instance2) REFERENCES instances(design, name) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_connections_design ON connections(design);
            "#,
        )?;

        let found: Option<i32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        match found {
            None => {
                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?1)",
                    params![SCHEMA_VERSION],
                )?;
            }
            Some(v) if v != SCHEMA_VERSION => {
                return Err(StoreError::SchemaVersion {
                    path: self.location.display().to_string(),
                    found: v,
                    expected: SCHEMA_VERSION,
                });
            }
            Some(_) => {}
        }

        Ok(())
    }
}
