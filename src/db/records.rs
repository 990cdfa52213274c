use rusqlite::{params, Connection, Params};
use sha2::{Digest, Sha256};

use crate::domain::Record;
use crate::errors::ReplicaError;
use crate::source::Collection;

/// Insert or replace every record in one transaction. Whole rows are replaced;
/// fields are never patched.
pub fn upsert_batch(
    conn: &mut Connection,
    collection: Collection,
    records: &[Record],
) -> Result<usize, ReplicaError> {
    let sql = format!(
        "INSERT INTO {} (id, fields) VALUES (?1, ?2)
         ON CONFLICT(id) DO UPDATE SET fields = excluded.fields",
        collection.table()
    );

    let tx = conn
        .transaction()
        .map_err(|e| ReplicaError::Store(e.to_string()))?;
    {
        let mut stmt = tx
            .prepare_cached(&sql)
            .map_err(|e| ReplicaError::Store(e.to_string()))?;

        for record in records {
            let payload = record.to_payload()?;
            stmt.execute(params![record.id, payload])
                .map_err(|e| ReplicaError::Store(e.to_string()))?;
        }
    }
    tx.commit()
        .map_err(|e| ReplicaError::Store(e.to_string()))?;

    Ok(records.len())
}

/// Parse a stored row, or log and drop it. Malformed payloads never abort a
/// query.
pub fn decode_or_skip(table: &'static str, id: String, payload: &str) -> Option<Record> {
    match Record::from_row(table, id, payload) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(error = %e, "skipping malformed record");
            None
        }
    }
}

/// Run a query returning `(id, fields)` rows from `table`.
pub fn query_records<P: Params>(
    conn: &Connection,
    table: &'static str,
    sql: &str,
    params: P,
) -> Result<Vec<Record>, ReplicaError> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| ReplicaError::Store(e.to_string()))?;

    let rows = stmt
        .query_map(params, |row| {
            Ok((
                row.get::<_, String>(0)?, // id
                row.get::<_, String>(1)?, // fields
            ))
        })
        .map_err(|e| ReplicaError::Store(e.to_string()))?;

    let mut out = Vec::new();
    for r in rows {
        let (id, payload) = r.map_err(|e| ReplicaError::Store(e.to_string()))?;
        if let Some(record) = decode_or_skip(table, id, &payload) {
            out.push(record);
        }
    }
    Ok(out)
}

pub fn load_all(conn: &Connection, collection: Collection) -> Result<Vec<Record>, ReplicaError> {
    let sql = format!("SELECT id, fields FROM {} ORDER BY id", collection.table());
    query_records(conn, collection.table(), &sql, [])
}

pub fn count(conn: &Connection, collection: Collection) -> Result<i64, ReplicaError> {
    let sql = format!("SELECT COUNT(*) FROM {}", collection.table());
    conn.query_row(&sql, [], |r| r.get(0))
        .map_err(|e| ReplicaError::Store(format!("count {} failed: {e}", collection)))
}

/// Row count plus a SHA-256 over every `(id, fields)` pair in id order. Two
/// replicas with equal fingerprints hold the same content.
pub fn table_fingerprint(
    conn: &Connection,
    collection: Collection,
) -> Result<(i64, String), ReplicaError> {
    let sql = format!("SELECT id, fields FROM {} ORDER BY id", collection.table());
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| ReplicaError::Store(e.to_string()))?;
    let mut rows = stmt
        .query([])
        .map_err(|e| ReplicaError::Store(e.to_string()))?;

    let mut hasher = Sha256::new();
    let mut n = 0i64;
    while let Some(row) = rows.next().map_err(|e| ReplicaError::Store(e.to_string()))? {
        let id: String = row.get(0).map_err(|e| ReplicaError::Store(e.to_string()))?;
        let fields: String = row.get(1).map_err(|e| ReplicaError::Store(e.to_string()))?;
        hasher.update(id.as_bytes());
        hasher.update([0u8]);
        hasher.update(fields.as_bytes());
        hasher.update([b'\n']);
        n += 1;
    }

    let digest = hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<String>();
    Ok((n, digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::{init_db, Database};
    use serde_json::json;

    fn record(id: &str, fields: serde_json::Value) -> Record {
        Record::from_remote(id, fields.as_object().cloned().unwrap())
    }

    fn make_db() -> Database {
        let db = Database::in_memory();
        init_db(&db).unwrap();
        db
    }

    #[test]
    fn upsert_replaces_whole_rows() {
        let db = make_db();

        db.with_conn(|conn| {
            upsert_batch(conn, Collection::Facilities, &[
                record("recA", json!({ "Facility Name": "Old", "Region": ["North"] })),
                record("recB", json!({ "Facility Name": "Other" })),
            ])?;
            upsert_batch(conn, Collection::Facilities, &[
                record("recA", json!({ "Facility Name": "New" })),
            ])?;

            assert_eq!(count(conn, Collection::Facilities)?, 2);

            let rows = load_all(conn, Collection::Facilities)?;
            assert_eq!(rows[0].id, "recA");
            assert_eq!(rows[0].display("facility_name"), "New");
            // the old region did not survive; nothing is merged
            assert!(rows[0].get("region").is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let db = make_db();

        db.with_conn(|conn| {
            upsert_batch(conn, Collection::Candidates, &[record("recOk", json!({ "Name": "Ok" }))])?;
            conn.execute(
                "INSERT INTO candidates (id, fields) VALUES ('recBad', '{broken')",
                [],
            )
            .map_err(|e| ReplicaError::Store(e.to_string()))?;

            let rows = load_all(conn, Collection::Candidates)?;
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].id, "recOk");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn fingerprint_tracks_content() {
        let db = make_db();

        let (n0, empty) = db.with_conn(|conn| table_fingerprint(conn, Collection::Needs)).unwrap();
        assert_eq!(n0, 0);

        db.with_conn(|conn| {
            upsert_batch(conn, Collection::Needs, &[record("recN", json!({ "Needs Met": "No" }))])
        })
        .unwrap();
        let (n1, first) = db.with_conn(|conn| table_fingerprint(conn, Collection::Needs)).unwrap();

        db.with_conn(|conn| {
            upsert_batch(conn, Collection::Needs, &[record("recN", json!({ "Needs Met": "No" }))])
        })
        .unwrap();
        let (n2, second) = db.with_conn(|conn| table_fingerprint(conn, Collection::Needs)).unwrap();

        assert_eq!((n1, n2), (1, 1));
        assert_eq!(first, second);
        assert_ne!(first, empty);
        assert_eq!(first.len(), 64);
    }
}
