use rusqlite::{params, Connection};

use crate::db::records::decode_or_skip;
use crate::errors::ReplicaError;
use crate::domain::Record;
use crate::source::Collection;

const SQL_CANDIDATES_FOR_FACILITY: &str = include_str!("../../sql/candidates_for_facility.sql");

/// Eligible candidate rows for `facility_id`, each paired with whether the
/// notification log already lists it for this facility.
pub fn candidates_for_facility(
    conn: &Connection,
    facility_id: &str,
) -> Result<Vec<(Record, bool)>, ReplicaError> {
    let mut stmt = conn
        .prepare(SQL_CANDIDATES_FOR_FACILITY)
        .map_err(|e| ReplicaError::Store(e.to_string()))?;

    let rows = stmt
        .query_map(params![facility_id], |row| {
            Ok((
                row.get::<_, String>(0)?, // id
                row.get::<_, String>(1)?, // fields
                row.get::<_, String>(2)?, // previously_sent
            ))
        })
        .map_err(|e| ReplicaError::Store(e.to_string()))?;

    let mut out = Vec::new();
    for r in rows {
        let (id, payload, previously_sent) = r.map_err(|e| ReplicaError::Store(e.to_string()))?;
        if let Some(record) = decode_or_skip(Collection::Candidates.table(), id, &payload) {
            out.push((record, previously_sent == "Yes"));
        }
    }
    Ok(out)
}
