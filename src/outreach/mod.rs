mod candidate_lists;
mod needs_requests;
mod outbox;
mod sendgrid;

pub use candidate_lists::CandidateListRun;
pub use needs_requests::NeedsRequestRun;
pub use outbox::{candidate_json_row, DirectoryExporter, JsonLinesNotifier};
pub use sendgrid::SendGridNotifier;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;

use crate::domain::{Candidate, Facility};
use crate::errors::ReplicaError;

#[derive(Debug, Error)]
pub enum OutreachError {
    #[error("send failed: {0}")]
    Notify(String),
    #[error("export failed: {0}")]
    Export(String),
    #[error(transparent)]
    Replica(#[from] ReplicaError),
}

/// A transactional template email, ready for whatever delivers it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateMessage {
    pub to: String,
    pub from: String,
    pub template_id: String,
    pub unsubscribe_group_id: String,
    pub data: serde_json::Value,
}

/// Sends template emails. Rendering and delivery live with the implementor.
pub trait Notifier {
    fn send(&self, message: &TemplateMessage) -> Result<(), OutreachError>;
}

/// Turns a facility's candidate rows into a downloadable file and returns
/// its link.
pub trait CandidateExporter {
    fn export(&self, facility: &Facility, candidates: &[Candidate]) -> Result<String, OutreachError>;
}

#[derive(Debug, Clone)]
pub struct OutreachOptions {
    /// Do everything except send.
    pub dry_run: bool,
    /// Deliver every message here instead of to the facility.
    pub override_email_destination: Option<String>,
    pub today: NaiveDate,
}

/// The calendar date at `now` for someone in `timezone`.
pub fn today_in(timezone: Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&timezone).date_naive()
}

impl OutreachOptions {
    /// Live-send options for a run happening at `now`, dated in `timezone`.
    pub fn at(timezone: Tz, now: DateTime<Utc>) -> Self {
        Self {
            dry_run: false,
            override_email_destination: None,
            today: today_in(timezone, now),
        }
    }

    fn recipient(&self, facility_email: &str) -> String {
        self.override_email_destination
            .clone()
            .unwrap_or_else(|| facility_email.to_string())
    }

    /// "October 19, 2026"
    fn display_date(&self) -> String {
        self.today.format("%B %-d, %Y").to_string()
    }
}

/// Tally of what a run did, facility by facility.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sent: usize,
    pub no_candidates_sent: usize,
    pub suppressed: usize,
    pub dry_run: usize,
    pub missing_email: usize,
    pub failed: usize,
}
