// sync.rs
use std::fmt;

use crate::db::connection::{init_db, Database};
use crate::db::records::{table_fingerprint, upsert_batch};
use crate::domain::Record;
use crate::errors::ReplicaError;
use crate::source::{Collection, PageOptions, RemoteSource};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// What one collection's sync wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionReport {
    pub collection: Collection,
    pub pages: usize,
    pub records: usize,
    pub batches: usize,
    pub rows_in_table: i64,
    pub fingerprint: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub collections: Vec<CollectionReport>,
}

impl SyncReport {
    pub fn get(&self, collection: Collection) -> Option<&CollectionReport> {
        self.collections.iter().find(|c| c.collection == collection)
    }

    pub fn total_records(&self) -> usize {
        self.collections.iter().map(|c| c.records).sum()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.collections {
            writeln!(
                f,
                "{:<15} {:>6} records {:>4} batches {:>6} rows  {}",
                c.collection.table(),
                c.records,
                c.batches,
                c.rows_in_table,
                &c.fingerprint[..12.min(c.fingerprint.len())]
            )?;
        }
        Ok(())
    }
}

/// Buffers records and flushes a transaction every `batch_size` records.
struct BatchWriter<'a> {
    db: &'a Database,
    collection: Collection,
    batch_size: usize,
    buffer: Vec<Record>,
    written: usize,
    batches: usize,
}

impl<'a> BatchWriter<'a> {
    fn new(db: &'a Database, collection: Collection, batch_size: usize) -> Self {
        Self {
            db,
            collection,
            batch_size: batch_size.max(1),
            buffer: Vec::with_capacity(batch_size.clamp(1, DEFAULT_BATCH_SIZE)),
            written: 0,
            batches: 0,
        }
    }

    fn push_all(&mut self, records: Vec<Record>) -> Result<(), ReplicaError> {
        for record in records {
            self.buffer.push(record);
            if self.buffer.len() >= self.batch_size {
                self.flush()?;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ReplicaError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let collection = self.collection;
        let batch = std::mem::take(&mut self.buffer);
        let n = self.db.with_conn(|conn| upsert_batch(conn, collection, &batch))?;

        self.written += n;
        self.batches += 1;
        tracing::debug!(%collection, batch = self.batches, records = n, "flushed batch");
        Ok(())
    }
}

/// Page one collection to exhaustion into its replica table.
///
/// A failure part way through leaves every already-flushed batch committed.
pub fn fill_collection<S: RemoteSource>(
    source: &S,
    db: &Database,
    collection: Collection,
    batch_size: usize,
    options: &PageOptions,
) -> Result<CollectionReport, ReplicaError> {
    let mut writer = BatchWriter::new(db, collection, batch_size);

    let pages = source.for_each_page(collection, options, |records| writer.push_all(records))?;
    writer.flush()?;

    let (rows_in_table, fingerprint) = db.with_conn(|conn| table_fingerprint(conn, collection))?;

    tracing::info!(
        %collection,
        pages,
        records = writer.written,
        batches = writer.batches,
        rows = rows_in_table,
        "collection synced"
    );

    Ok(CollectionReport {
        collection,
        pages,
        records: writer.written,
        batches: writer.batches,
        rows_in_table,
        fingerprint,
    })
}

/// Full replace of every replicated collection, in `Collection::REPLICATED`
/// order. Stops at the first collection that fails.
pub fn fill_all<S: RemoteSource>(
    source: &S,
    db: &Database,
    batch_size: usize,
    options: &PageOptions,
) -> Result<SyncReport, ReplicaError> {
    init_db(db)?;

    let mut report = SyncReport::default();
    for collection in Collection::REPLICATED {
        match fill_collection(source, db, collection, batch_size, options) {
            Ok(c) => report.collections.push(c),
            Err(e) => {
                tracing::error!(%collection, error = %e, "sync aborted");
                return Err(e);
            }
        }
    }
    Ok(report)
}
