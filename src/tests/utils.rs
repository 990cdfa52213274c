use serde_json::{json, Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::Database;
use crate::domain::{Candidate, Facility};
use crate::replica::Replica;
use crate::source::{Collection, Page, PageOptions, RawRecord, RemoteSource, SourceError};

/// In-memory stand-in for the remote base. Pages are slices of each
/// collection; the offset is the index of the next record.
pub struct FakeSource {
    collections: RefCell<HashMap<Collection, Vec<RawRecord>>>,
    page_size: usize,
    fail_page: Cell<Option<(Collection, usize)>>,
    fail_updates: Cell<bool>,
    fail_creates: Cell<bool>,
    fetches: Cell<usize>,
    pub updates: RefCell<Vec<(Collection, String, Map<String, Value>)>>,
    pub created: RefCell<Vec<(Collection, Map<String, Value>)>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            collections: RefCell::new(HashMap::new()),
            page_size: 100,
            fail_page: Cell::new(None),
            fail_updates: Cell::new(false),
            fail_creates: Cell::new(false),
            fetches: Cell::new(0),
            updates: RefCell::new(Vec::new()),
            created: RefCell::new(Vec::new()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Add a record with remote-style (un-normalized) field names.
    pub fn add(&self, collection: Collection, id: &str, fields: Value) -> &Self {
        let fields = match fields {
            Value::Object(map) => map,
            other => panic!("fields must be an object, got {other}"),
        };
        self.collections
            .borrow_mut()
            .entry(collection)
            .or_default()
            .push(RawRecord {
                id: id.to_string(),
                fields,
            });
        self
    }

    pub fn remove(&self, collection: Collection, id: &str) {
        if let Some(records) = self.collections.borrow_mut().get_mut(&collection) {
            records.retain(|r| r.id != id);
        }
    }

    /// Make the `page`-th page (0-based) of `collection` fail.
    pub fn fail_on_page(&self, collection: Collection, page: usize) {
        self.fail_page.set(Some((collection, page)));
    }

    pub fn heal(&self) {
        self.fail_page.set(None);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.set(fail);
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.set(fail);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.get()
    }
}

impl RemoteSource for FakeSource {
    fn fetch_page(
        &self,
        collection: Collection,
        offset: Option<&str>,
        _options: &PageOptions,
    ) -> Result<Page, SourceError> {
        self.fetches.set(self.fetches.get() + 1);

        let start: usize = offset.map(|o| o.parse().unwrap()).unwrap_or(0);
        if self.fail_page.get() == Some((collection, start / self.page_size)) {
            return Err(SourceError::Network("connection reset".into()));
        }

        let collections = self.collections.borrow();
        let all = collections.get(&collection).map(Vec::as_slice).unwrap_or(&[]);
        let end = (start + self.page_size).min(all.len());
        let records = all.get(start..end).unwrap_or(&[]).to_vec();

        Ok(Page {
            records,
            offset: (end < all.len()).then(|| end.to_string()),
        })
    }

    fn update(&self, collection: Collection, id: &str, fields: Map<String, Value>) -> Result<(), SourceError> {
        if self.fail_updates.get() {
            return Err(SourceError::Api { status: 503, body: "unavailable".into() });
        }
        self.updates.borrow_mut().push((collection, id.to_string(), fields));
        Ok(())
    }

    fn create(&self, collection: Collection, fields: Map<String, Value>) -> Result<String, SourceError> {
        if self.fail_creates.get() {
            return Err(SourceError::Api { status: 422, body: "invalid field".into() });
        }
        let mut created = self.created.borrow_mut();
        created.push((collection, fields));
        Ok(format!("recT{}", created.len()))
    }
}

pub fn unique_temp_db_path(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("{prefix}_{nanos}.sqlite3"));
    p.to_string_lossy().to_string()
}

/// A replica over `source` backed by a fresh in-memory database.
pub fn make_replica(source: &FakeSource) -> Replica<&FakeSource> {
    Replica::new(source, Database::in_memory())
}

pub fn candidate_ids(candidates: &[Candidate]) -> Vec<&str> {
    candidates.iter().map(Candidate::id).collect()
}

pub fn facility_ids(facilities: &[Facility]) -> Vec<&str> {
    facilities.iter().map(Facility::id).collect()
}

/// A small base exercising both match paths.
///
/// recF1 Lakeside (North, Hospital): latest need Pharmacy, older need Nursing
/// recF2 Pine Manor (South, Nursing Home only): need Nursing
/// recF3 Harbor House (North): no needs, but a tag authorizes recC3
/// recF4 Closed Ward (North): latest need met, older one open
pub fn seed_base(source: &FakeSource) {
    source
        .add(Collection::Facilities, "recF1", json!({
            "Facility Name": "Lakeside Clinic",
            "Region": ["North"],
            "Facility Type": ["Hospital"],
            "Approved": true,
            "Contact Email": "ops@lakeside.org",
            "Contact Name": "Dana",
        }))
        .add(Collection::Facilities, "recF2", json!({
            "Facility Name": "Pine Manor",
            "Region": ["South"],
            "Facility Type": ["Nursing Home"],
            "Approved": true,
            "Contact Email": "desk@pinemanor.org",
        }))
        .add(Collection::Facilities, "recF3", json!({
            "Facility Name": "Harbor House",
            "Region": ["North"],
            "Facility Type": ["Clinic"],
            "Approved": true,
        }))
        .add(Collection::Facilities, "recF4", json!({
            "Facility Name": "Closed Ward",
            "Region": ["North"],
            "Facility Type": ["Hospital"],
        }));

    source
        .add(Collection::Needs, "recN1", json!({
            "Facility": ["recF1"],
            "Time Requested": "2024-01-01T09:00:00.000Z",
            "Needs Met": "No",
            "Practice Area 1": "Nursing",
        }))
        .add(Collection::Needs, "recN2", json!({
            "Facility": ["recF1"],
            "Time Requested": "2024-03-01T09:00:00.000Z",
            "Practice Area 1": "Pharmacy",
        }))
        .add(Collection::Needs, "recN3", json!({
            "Facility": ["recF2"],
            "Time Requested": "2024-02-01T09:00:00.000Z",
            "Practice Area 1": "Nursing",
        }))
        .add(Collection::Needs, "recN4", json!({
            "Facility": ["recF4"],
            "Time Requested": "2024-01-15T09:00:00.000Z",
            "Needs Met": "No",
            "Practice Area 1": "Pharmacy",
        }))
        .add(Collection::Needs, "recN5", json!({
            "Facility": ["recF4"],
            "Time Requested": "2024-02-15T09:00:00.000Z",
            "Needs Met": "Yes",
            "Practice Area 1": "Pharmacy",
        }));

    source
        .add(Collection::Candidates, "recC1", json!({
            "Name": "Avery Stone",
            "Regional Availability": ["North"],
            "High Priority Health Care Practice": ["Pharmacy"],
        }))
        .add(Collection::Candidates, "recC2", json!({
            "Name": "Blake Moss",
            "Regional Availability": ["North"],
            "High Priority Health Care Practice": ["Nursing"],
        }))
        .add(Collection::Candidates, "recC3", json!({
            "Name": "Casey Hart",
            "Regional Availability": ["North"],
            "High Priority Health Care Practice": ["Pharmacy"],
            "Hired": true,
        }))
        .add(Collection::Candidates, "recC4", json!({
            "Name": "Drew Lake",
            "Regional Availability": ["South"],
            "High Priority Health Care Practice": ["Nursing"],
            "Retirement Home Availability": "Yes",
        }))
        .add(Collection::Candidates, "recC5", json!({
            "Name": "Emery Cole",
            "Regional Availability": ["South"],
            "High Priority Health Care Practice": ["Nursing"],
            "Retirement Home Availability": "No",
        }))
        .add(Collection::Candidates, "recC6", json!({
            "Name": "Finley Rowe",
            "Regional Availability": ["North"],
            "High Priority Health Care Practice": ["Pharmacy"],
            "Unavailable": true,
        }))
        .add(Collection::Candidates, "recC7", json!({
            "Name": "Gray Ellis",
            "Regional Availability": ["East", "North"],
            "High Priority Health Care Practice": ["Dental", "Pharmacy"],
        }));

    source
        .add(Collection::CandidateTags, "recG1", json!({
            "Authorized Facilities": ["recF1", "recF3"],
            "Candidates": ["recC3", "recC7"],
        }));

    source
        .add(Collection::Tracking, "recT1", json!({
            "Facility": ["recF1"],
            "Mailing Type": "Candidate List",
            "Candidates": ["recC1"],
        }))
        .add(Collection::Tracking, "recT2", json!({
            "Facility": ["recF9"],
            "Mailing Type": "Candidate List",
            "Candidates": ["recC7"],
        }))
        .add(Collection::Tracking, "recT3", json!({
            "Facility": ["recF2"],
            "Mailing Type": "Candidate List",
            "Candidates": ["recC7"],
        }));
}
