//! `GraphStore` round trips for the SQLite store

use std::time::{Duration, Instant};

use chrono::Utc;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, ErrorCode};
use serde_json::{Map, Value as JsonValue};

use super::{GraphStore, Row, SqliteStore, StoreError};

/// How many SQLite VM steps run between deadline checks
const PROGRESS_STEPS: i32 = 1_000;

/// Turn constraint failures into `Rejected` so callers see which call failed
fn rejected(operation: &str, err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, msg) if e.code == ErrorCode::ConstraintViolation => {
            StoreError::Rejected {
                operation: operation.to_string(),
                message: msg.clone().unwrap_or_else(|| e.to_string()),
            }
        }
        _ => StoreError::Sqlite(err),
    }
}

fn is_interrupt(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::OperationInterrupted
    )
}

fn to_json(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(i) => JsonValue::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueRef::Text(t) => JsonValue::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => JsonValue::Array(b.iter().map(|x| JsonValue::from(*x)).collect()),
    }
}

fn run_query(conn: &Connection, query: &str) -> Result<Vec<Row>, rusqlite::Error> {
    let mut stmt = conn.prepare(query)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

    let mut out = Vec::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut record = Map::new();
        for (idx, column) in columns.iter().enumerate() {
            record.insert(column.clone(), to_json(row.get_ref(idx)?));
        }
        out.push(record);
    }
    Ok(out)
}

impl SqliteStore {
    fn execute(
        &self,
        operation: &str,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(sql, params).map_err(|e| rejected(operation, e))?;
        tracing::trace!(operation, changed, "store round trip");
        Ok(changed)
    }

    fn require_design(&self, operation: &str, design: &str) -> Result<(), StoreError> {
        let exists: bool = self.conn()?.query_row(
            "SELECT EXISTS(SELECT 1 FROM designs WHERE name = ?1)",
            params![design],
            |row| row.get(0),
        )?;
        if exists {
            Ok(())
        } else {
            Err(StoreError::Rejected {
                operation: operation.to_string(),
                message: format!("no design named '{}'", design),
            })
        }
    }
}

impl GraphStore for SqliteStore {
    fn create_design(&mut self, name: &str) -> Result<(), StoreError> {
        self.execute(
            "create_design",
            "INSERT INTO designs (name, created) VALUES (?1, ?2)",
            params![name, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn create_instance(&mut self, design: &str, model: &str, name: &str) -> Result<(), StoreError> {
        self.execute(
            "create_instance",
            "INSERT INTO instances (design, name, model) VALUES (?1, ?2, ?3)",
            params![design, name, model],
        )?;
        Ok(())
    }

    fn create_parameter(&mut self, design: &str, name: &str, value: &str) -> Result<(), StoreError> {
        self.execute(
            "create_parameter",
            "INSERT INTO parameters (design, name, value) VALUES (?1, ?2, ?3)",
            params![design, name, value],
        )?;
        Ok(())
    }

    fn assign_parameter(
        &mut self,
        design: &str,
        instance: &str,
        attribute: &str,
        parameter: &str,
    ) -> Result<(), StoreError> {
        self.execute(
            "assign_parameter",
            "INSERT OR REPLACE INTO assignments (design, instance, attr, parameter)
             VALUES (?1, ?2, ?3, ?4)",
            params![design, instance, attribute, parameter],
        )?;
        Ok(())
    }

    fn create_connection(
        &mut self,
        design: &str,
        instance1: &str,
        connector1: &str,
        instance2: &str,
        connector2: &str,
    ) -> Result<(), StoreError> {
        self.execute(
            "create_connection",
            "INSERT INTO connections (design, instance1, connector1, instance2, connector2)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![design, instance1, connector1, instance2, connector2],
        )?;
        Ok(())
    }

    fn orient_design(&mut self, design: &str, instance: &str) -> Result<(), StoreError> {
        self.require_design("orient_design", design)?;
        let known: bool = self.conn()?.query_row(
            "SELECT EXISTS(SELECT 1 FROM instances WHERE design = ?1 AND name = ?2)",
            params![design, instance],
            |row| row.get(0),
        )?;
        if !known {
            return Err(StoreError::Rejected {
                operation: "orient_design".to_string(),
                message: format!("no instance '{}' in design '{}'", instance, design),
            });
        }
        self.execute(
            "orient_design",
            "UPDATE designs SET orient = ?2 WHERE name = ?1",
            params![design, instance],
        )?;
        Ok(())
    }

    fn delete_design(&mut self, name: &str) -> Result<(), StoreError> {
        self.require_design("delete_design", name)?;
        self.execute(
            "delete_design",
            "DELETE FROM designs WHERE name = ?1",
            params![name],
        )?;
        Ok(())
    }

    fn design_names(&mut self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name FROM designs ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn submit(&mut self, query: &str, timeout: Duration) -> Result<Vec<Row>, StoreError> {
        let conn = self.conn()?;
        let deadline = Instant::now() + timeout;
        conn.progress_handler(PROGRESS_STEPS, Some(move || Instant::now() >= deadline));
        let result = run_query(conn, query);
        conn.progress_handler(PROGRESS_STEPS, None::<fn() -> bool>);

        result.map_err(|e| {
            if is_interrupt(&e) {
                StoreError::Timeout(timeout)
            } else {
                rejected("submit", e)
            }
        })
    }

    fn close(&mut self) -> Result<(), StoreError> {
        match self.conn.take() {
            Some(conn) => {
                conn.close().map_err(|(_, e)| StoreError::Sqlite(e))?;
                tracing::debug!(location = %self.location.display(), "closed design store");
                Ok(())
            }
            None => Err(StoreError::Closed),
        }
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_design() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.create_design("quad").unwrap();
        store.create_instance("quad", "Hub4", "hub").unwrap();
        store.create_instance("quad", "Cylinder", "arm").unwrap();
        store
    }

    #[test]
    fn test_design_round_trips() {
        let mut store = store_with_design();
        store.create_parameter("quad", "arm_LENGTH", "150").unwrap();
        store.assign_parameter("quad", "arm", "LENGTH", "arm_LENGTH").unwrap();
        store
            .create_connection("quad", "hub", "Side_Connector_1", "arm", "BaseConnection")
            .unwrap();

        assert_eq!(store.design_names().unwrap(), vec!["quad".to_string()]);

        let rows = store
            .submit(
                "SELECT instance, attr, parameter FROM assignments WHERE design = 'quad'",
                Duration::from_secs(5),
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["parameter"], JsonValue::from("arm_LENGTH"));
        store.close().unwrap();
    }

    #[test]
    fn test_instance_in_unknown_design_is_rejected() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let err = store.create_instance("ghost", "Hub4", "hub").unwrap_err();
        assert!(matches!(err, StoreError::Rejected { ref operation, .. } if operation == "create_instance"));
        store.close().unwrap();
    }

    #[test]
    fn test_delete_cascades() {
        let mut store = store_with_design();
        store.create_parameter("quad", "p", "1").unwrap();
        store.delete_design("quad").unwrap();

        assert!(store.design_names().unwrap().is_empty());
        let rows = store
            .submit("SELECT COUNT(*) AS n FROM instances", Duration::from_secs(5))
            .unwrap();
        assert_eq!(rows[0]["n"], JsonValue::from(0));
        store.close().unwrap();
    }

    #[test]
    fn test_orient_requires_known_instance() {
        let mut store = store_with_design();
        assert!(store.orient_design("quad", "nope").is_err());
        store.create_instance("quad", "Orient", "Orient").unwrap();
        store.orient_design("quad", "Orient").unwrap();
        store.close().unwrap();
    }

    #[test]
    fn test_submit_times_out() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let slow = "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 1000000000) \
                    SELECT COUNT(*) FROM c";
        let err = store.submit(slow, Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));

        // The connection stays usable after an interrupt
        let rows = store.submit("SELECT 1 AS one", Duration::from_secs(5)).unwrap();
        assert_eq!(rows[0]["one"], JsonValue::from(1));
        store.close().unwrap();
    }

    #[test]
    fn test_calls_after_close_fail() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.close().unwrap();
        assert!(!store.is_open());
        assert!(matches!(store.create_design("x"), Err(StoreError::Closed)));
        assert!(matches!(store.close(), Err(StoreError::Closed)));
    }
}
