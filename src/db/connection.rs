use rusqlite::Connection;
use std::cell::RefCell;

use crate::errors::ReplicaError;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

/// Process-lifetime handle on the replica. The connection is opened on first
/// use and reused for every query of the run. Single-threaded only.
pub struct Database {
    path: String,
    conn: RefCell<Option<Connection>>,
}

impl Database {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            conn: RefCell::new(None),
        }
    }

    /// An in-memory replica; lives as long as this handle.
    pub fn in_memory() -> Self {
        Self::new(":memory:")
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Provides a mutable connection to the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, ReplicaError>
    where
        F: FnOnce(&mut Connection) -> Result<T, ReplicaError>,
    {
        let mut slot = self
            .conn
            .try_borrow_mut()
            .map_err(|_| ReplicaError::Store("replica connection already in use".into()))?;

        if slot.is_none() {
            let conn = Connection::open(&self.path).map_err(|e| ReplicaError::StoreUnavailable {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
            tracing::debug!(path = %self.path, "opened replica");
            *slot = Some(conn);
        }

        match slot.as_mut() {
            Some(conn) => f(conn),
            None => Err(ReplicaError::StoreUnavailable {
                path: self.path.clone(),
                reason: "connection slot empty".into(),
            }),
        }
    }
}

/// Create the replica tables if they are not there yet.
pub fn init_db(db: &Database) -> Result<(), ReplicaError> {
    db.with_conn(|conn| {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| ReplicaError::StoreUnavailable {
                path: db.path().to_string(),
                reason: format!("failed to apply schema: {e}"),
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_replica_tables() {
        let db = Database::in_memory();
        init_db(&db).unwrap();
        // applying twice is harmless
        init_db(&db).unwrap();

        let tables: Vec<String> = db
            .with_conn(|conn| {
                let mut stmt = conn
                    .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                    .map_err(|e| ReplicaError::Store(e.to_string()))?;
                let rows = stmt
                    .query_map([], |row| row.get::<_, String>(0))
                    .map_err(|e| ReplicaError::Store(e.to_string()))?;
                let mut out = Vec::new();
                for r in rows {
                    out.push(r.map_err(|e| ReplicaError::Store(e.to_string()))?);
                }
                Ok(out)
            })
            .unwrap();

        assert_eq!(
            tables,
            ["candidate_tags", "candidates", "facilities", "needs", "tracking"]
        );
    }

    #[test]
    fn unopenable_path_is_store_unavailable() {
        let db = Database::new("/definitely/not/a/dir/replica.sqlite3");
        let err = init_db(&db).unwrap_err();
        assert!(matches!(err, ReplicaError::StoreUnavailable { .. }));
    }
}
