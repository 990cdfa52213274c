mod airtable;
mod source_error;

pub use airtable::{AirtableSource, AirtableTables};
pub use source_error::SourceError;

use serde::Deserialize;
use std::fmt;

use crate::domain::Record;
use crate::errors::ReplicaError;

/// The remote collections this crate knows about. All but `Configuration`
/// are mirrored into the replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Candidates,
    Facilities,
    Needs,
    CandidateTags,
    Tracking,
    Configuration,
}

impl Collection {
    /// Replicated collections, in fill order.
    pub const REPLICATED: [Collection; 5] = [
        Collection::Candidates,
        Collection::Facilities,
        Collection::Needs,
        Collection::CandidateTags,
        Collection::Tracking,
    ];

    /// Local table name. Only these fixed names are ever spliced into SQL.
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Candidates => "candidates",
            Collection::Facilities => "facilities",
            Collection::Needs => "needs",
            Collection::CandidateTags => "candidate_tags",
            Collection::Tracking => "tracking",
            Collection::Configuration => "configuration",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// A record exactly as the remote source returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    pub id: String,
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl RawRecord {
    pub fn into_record(self) -> Record {
        Record::from_remote(self.id, self.fields)
    }
}

/// One page of a collection plus the cursor for the next one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub records: Vec<RawRecord>,
    #[serde(default)]
    pub offset: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PageOptions {
    pub page_size: Option<u32>,
    pub view: Option<String>,
}

/// Paginated read access and point writes against the remote tables.
pub trait RemoteSource {
    fn fetch_page(
        &self,
        collection: Collection,
        offset: Option<&str>,
        options: &PageOptions,
    ) -> Result<Page, SourceError>;

    /// Replace the named fields of one record. Field names are the remote's own.
    fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), SourceError>;

    /// Append a record, returning its new id.
    fn create(
        &self,
        collection: Collection,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, SourceError>;

    /// Walk a collection to exhaustion, handing each page's records to
    /// `on_page`. Stops early (without error) if the source repeats a cursor.
    fn for_each_page<F>(
        &self,
        collection: Collection,
        options: &PageOptions,
        mut on_page: F,
    ) -> Result<usize, ReplicaError>
    where
        F: FnMut(Vec<Record>) -> Result<(), ReplicaError>,
    {
        let mut offset: Option<String> = None;
        let mut seen = std::collections::HashSet::new();
        let mut pages = 0;

        loop {
            let page = self
                .fetch_page(collection, offset.as_deref(), options)
                .map_err(|e| ReplicaError::source_unavailable(collection, e))?;
            pages += 1;

            tracing::debug!(%collection, page = pages, records = page.records.len(), "fetched page");

            let records = page.records.into_iter().map(RawRecord::into_record).collect();
            on_page(records)?;

            match page.offset {
                Some(next) if seen.insert(next.clone()) => offset = Some(next),
                Some(next) => {
                    tracing::warn!(%collection, offset = %next, "offset repeated, stopping");
                    break;
                }
                None => break,
            }
        }

        Ok(pages)
    }
}

impl<T: RemoteSource + ?Sized> RemoteSource for &T {
    fn fetch_page(
        &self,
        collection: Collection,
        offset: Option<&str>,
        options: &PageOptions,
    ) -> Result<Page, SourceError> {
        (**self).fetch_page(collection, offset, options)
    }

    fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), SourceError> {
        (**self).update(collection, id, fields)
    }

    fn create(
        &self,
        collection: Collection,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, SourceError> {
        (**self).create(collection, fields)
    }
}
