use rusqlite::{params, Connection};

use crate::db::records::query_records;
use crate::domain::Record;
use crate::errors::ReplicaError;
use crate::source::Collection;

const SQL_FACILITIES_IN_NEED: &str = include_str!("../../sql/facilities_in_need.sql");
const SQL_CURRENT_NEED: &str = include_str!("../../sql/current_need.sql");

/// Facility rows whose latest need is unmet, ordered by id.
pub fn facilities_in_need(conn: &Connection) -> Result<Vec<Record>, ReplicaError> {
    query_records(conn, Collection::Facilities.table(), SQL_FACILITIES_IN_NEED, [])
}

/// The latest need row referencing `facility_id`, if any.
pub fn current_need(conn: &Connection, facility_id: &str) -> Result<Option<Record>, ReplicaError> {
    let mut rows = query_records(conn, Collection::Needs.table(), SQL_CURRENT_NEED, params![facility_id])?;
    Ok(rows.pop())
}
