// replica.rs
use serde_json::{json, Map};
use std::cell::Cell;

use crate::db::connection::Database;
use crate::db::records::load_all;
use crate::db::{candidates, needs};
use crate::domain::facility::SUPPRESS_NO_CANDIDATES_FIELD;
use crate::domain::{Candidate, Facility, Need, TrackingEvent};
use crate::errors::ReplicaError;
use crate::settings::RunSettings;
use crate::source::{Collection, PageOptions, RemoteSource};
use crate::sync::{fill_all, SyncReport, DEFAULT_BATCH_SIZE};

/// Everything one run needs: the remote source, the local replica, and the
/// knobs for syncing between them. Built once per run and passed around.
pub struct Replica<S: RemoteSource> {
    source: S,
    db: Database,
    batch_size: usize,
    page_options: PageOptions,
    filled: Cell<bool>,
}

impl<S: RemoteSource> Replica<S> {
    pub fn new(source: S, db: Database) -> Self {
        Self {
            source,
            db,
            batch_size: DEFAULT_BATCH_SIZE,
            page_options: PageOptions::default(),
            filled: Cell::new(false),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_page_options(mut self, options: PageOptions) -> Self {
        self.page_options = options;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn is_filled(&self) -> bool {
        self.filled.get()
    }

    /// Pull every replicated collection and upsert it locally. Safe to call
    /// again; the store is only marked filled once all collections finish.
    pub fn fill(&self) -> Result<SyncReport, ReplicaError> {
        tracing::info!(path = %self.db.path(), batch_size = self.batch_size, "filling replica");
        let report = fill_all(&self.source, &self.db, self.batch_size, &self.page_options)?;
        self.filled.set(true);
        tracing::info!(records = report.total_records(), "replica filled");
        Ok(report)
    }

    /// Fill once per process if nothing has yet.
    pub fn ensure_filled(&self) -> Result<(), ReplicaError> {
        if !self.filled.get() {
            self.fill()?;
        }
        Ok(())
    }

    /// Facilities whose latest need has not been met.
    pub fn facilities_in_need(&self) -> Result<Vec<Facility>, ReplicaError> {
        self.ensure_filled()?;
        let rows = self.db.with_conn(|conn| needs::facilities_in_need(conn))?;
        Ok(rows.into_iter().map(Facility::new).collect())
    }

    /// The latest need referencing `facility_id`.
    pub fn current_need(&self, facility_id: &str) -> Result<Option<Need>, ReplicaError> {
        self.ensure_filled()?;
        let row = self.db.with_conn(|conn| needs::current_need(conn, facility_id))?;
        Ok(row.map(Need::new))
    }

    /// Candidates eligible for the facility's latest need or explicitly tagged
    /// for it, each marked with whether it was already sent.
    pub fn candidates_for_facility(&self, facility: &Facility) -> Result<Vec<Candidate>, ReplicaError> {
        self.ensure_filled()?;
        let rows = self
            .db
            .with_conn(|conn| candidates::candidates_for_facility(conn, facility.id()))?;

        tracing::debug!(facility = %facility.id(), matches = rows.len(), "matched candidates");
        Ok(rows
            .into_iter()
            .map(|(record, sent)| Candidate::new(record, sent))
            .collect())
    }

    /// Facilities with the approved box checked; unapproved ones are left out.
    pub fn approved_facilities(&self) -> Result<Vec<Facility>, ReplicaError> {
        self.ensure_filled()?;
        let rows = self.db.with_conn(|conn| load_all(conn, Collection::Facilities))?;
        Ok(rows
            .into_iter()
            .map(Facility::new)
            .filter(Facility::is_approved)
            .collect())
    }

    pub fn facility(&self, facility_id: &str) -> Result<Option<Facility>, ReplicaError> {
        Ok(self
            .list_all_facilities()?
            .into_iter()
            .find(|f| f.id() == facility_id))
    }

    fn list_all_facilities(&self) -> Result<Vec<Facility>, ReplicaError> {
        self.ensure_filled()?;
        let rows = self.db.with_conn(|conn| load_all(conn, Collection::Facilities))?;
        Ok(rows.into_iter().map(Facility::new).collect())
    }

    /// Write-through to the remote facility record; the replica is untouched
    /// until the next fill.
    pub fn update_facility_no_candidates_suppression(
        &self,
        facility: &Facility,
        value: bool,
    ) -> Result<(), ReplicaError> {
        let mut fields = Map::new();
        fields.insert(SUPPRESS_NO_CANDIDATES_FIELD.to_string(), json!(value));

        self.source
            .update(Collection::Facilities, facility.id(), fields)
            .map_err(|e| ReplicaError::source_unavailable(Collection::Facilities, e))?;

        tracing::info!(facility = %facility.id(), value, "updated no-candidates suppression");
        Ok(())
    }

    /// Append an outreach event to the remote notification log. The caller
    /// decides whether a failure matters.
    pub fn track(&self, event: &TrackingEvent) -> Result<(), ReplicaError> {
        let id = self
            .source
            .create(Collection::Tracking, event.to_remote_fields())
            .map_err(|e| ReplicaError::source_unavailable(Collection::Tracking, e))?;

        tracing::debug!(
            facility = %event.facility_id,
            mailing_type = event.mailing_type.as_str(),
            tracking_id = %id,
            "tracked outreach"
        );
        Ok(())
    }

    /// Key/value run settings, read straight from the remote configuration
    /// collection.
    pub fn settings(&self) -> Result<RunSettings, ReplicaError> {
        let mut records = Vec::new();
        self.source
            .for_each_page(Collection::Configuration, &self.page_options, |page| {
                records.extend(page);
                Ok(())
            })?;
        RunSettings::from_records(&records)
    }
}
