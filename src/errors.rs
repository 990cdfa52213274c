// errors.rs
use thiserror::Error;

use crate::source::{Collection, SourceError};

/// Errors originating from the replica store, the sync engine, or the
/// remote source sitting behind it.
#[derive(Debug, Error)]
pub enum ReplicaError {
    /// Remote paging or a remote write failed. Batches committed before the
    /// failure stay in the store.
    #[error("remote source unavailable while reading {collection}: {source}")]
    SourceUnavailable {
        collection: Collection,
        #[source]
        source: SourceError,
    },

    /// The SQLite file could not be opened or the schema could not be applied.
    #[error("replica store unavailable at '{path}': {reason}")]
    StoreUnavailable { path: String, reason: String },

    /// A stored payload could not be parsed back into fields.
    #[error("malformed record '{id}' in {table}: {reason}")]
    MalformedRecord {
        table: &'static str,
        id: String,
        reason: String,
    },

    #[error("database error: {0}")]
    Store(String),

    #[error("configuration collection has no '{0}' entry")]
    MissingSetting(String),
}

impl ReplicaError {
    pub fn source_unavailable(collection: Collection, source: SourceError) -> Self {
        ReplicaError::SourceUnavailable { collection, source }
    }
}

