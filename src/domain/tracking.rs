// src/domain/tracking.rs

use serde_json::{json, Map, Value as JsonValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailingType {
    CandidateList,
    NoCandidates,
}

impl MailingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MailingType::CandidateList => "Candidate List",
            MailingType::NoCandidates => "No Candidates",
        }
    }
}

/// One outreach event headed for the notification log.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingEvent {
    pub facility_id: String,
    pub mailing_type: MailingType,
    pub email_address: String,
    pub candidates: Vec<String>,
    pub count: Option<usize>,
}

impl TrackingEvent {
    pub fn new(facility_id: impl Into<String>, mailing_type: MailingType, email_address: impl Into<String>) -> Self {
        Self {
            facility_id: facility_id.into(),
            mailing_type,
            email_address: email_address.into(),
            candidates: Vec::new(),
            count: None,
        }
    }

    pub fn with_candidates(mut self, candidates: Vec<String>) -> Self {
        self.count = Some(candidates.len());
        self.candidates = candidates;
        self
    }

    /// Fields in the remote table's own (un-normalized) naming. The facility
    /// is a linked-record field, hence the single-element list.
    pub fn to_remote_fields(&self) -> Map<String, JsonValue> {
        let mut fields = Map::new();
        fields.insert("Facility".into(), json!([self.facility_id]));
        fields.insert("Mailing Type".into(), json!(self.mailing_type.as_str()));
        fields.insert("Email Address".into(), json!(self.email_address));
        if !self.candidates.is_empty() {
            fields.insert("Candidates".into(), json!(self.candidates));
        }
        if let Some(count) = self.count {
            fields.insert("Count".into(), json!(count));
        }
        fields
    }
}
