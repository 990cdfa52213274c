use serde_json::json;

use super::{CandidateExporter, Notifier, OutreachError, OutreachOptions, RunSummary, TemplateMessage};
use crate::domain::{Candidate, Facility, MailingType, TrackingEvent};
use crate::replica::Replica;
use crate::settings::{prefill_facility_link, RunSettings};
use crate::source::RemoteSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Sent,
    NoCandidatesSent,
    Suppressed,
    DryRun,
}

/// Sends each approved facility in need either its current candidate list or,
/// once, a "no candidates" notice.
pub struct CandidateListRun<'a, S: RemoteSource> {
    replica: &'a Replica<S>,
    settings: &'a RunSettings,
    notifier: &'a dyn Notifier,
    exporter: &'a dyn CandidateExporter,
    options: OutreachOptions,
}

impl<'a, S: RemoteSource> CandidateListRun<'a, S> {
    pub fn new(
        replica: &'a Replica<S>,
        settings: &'a RunSettings,
        notifier: &'a dyn Notifier,
        exporter: &'a dyn CandidateExporter,
        options: OutreachOptions,
    ) -> Self {
        Self {
            replica,
            settings,
            notifier,
            exporter,
            options,
        }
    }

    /// One facility failing does not stop the others.
    pub fn run(&self) -> Result<RunSummary, OutreachError> {
        let mut summary = RunSummary::default();

        for facility in self.replica.facilities_in_need()? {
            if !facility.is_approved() {
                continue;
            }

            let Some(email) = facility.contact_email() else {
                tracing::warn!(facility = %facility.name(), "no contact email, skipping candidate list");
                summary.missing_email += 1;
                continue;
            };

            match self.handle_facility(&facility, &email) {
                Ok(outcome) => {
                    tracing::info!(facility = %facility.name(), email = %email, ?outcome, "finished candidate list");
                    match outcome {
                        Outcome::Sent => summary.sent += 1,
                        Outcome::NoCandidatesSent => summary.no_candidates_sent += 1,
                        Outcome::Suppressed => summary.suppressed += 1,
                        Outcome::DryRun => summary.dry_run += 1,
                    }
                }
                Err(e) => {
                    tracing::error!(facility = %facility.name(), email = %email, error = %e, "candidate list failed");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    fn handle_facility(&self, facility: &Facility, email: &str) -> Result<Outcome, OutreachError> {
        let candidates = self.replica.candidates_for_facility(facility)?;

        if candidates.is_empty() {
            self.handle_without_candidates(facility, email)
        } else {
            self.handle_with_candidates(facility, email, &candidates)
        }
    }

    fn handle_with_candidates(
        &self,
        facility: &Facility,
        email: &str,
        candidates: &[Candidate],
    ) -> Result<Outcome, OutreachError> {
        // a future empty list should be announced again
        self.replica
            .update_facility_no_candidates_suppression(facility, false)?;

        let download_url = self.exporter.export(facility, candidates)?;

        if self.options.dry_run {
            tracing::info!(facility = %facility.name(), "dry run, not sending candidate list");
            return Ok(Outcome::DryRun);
        }

        let count = candidates.len();
        let message = TemplateMessage {
            to: self.options.recipient(email),
            from: self.settings.send_email_from.clone(),
            template_id: self.settings.candidates_template_id.clone(),
            unsubscribe_group_id: self.settings.unsubscribe_group_id.clone(),
            data: json!({
                "download_url": download_url,
                "feedback_form_url": prefill_facility_link(&self.settings.feedback_form_url, facility.id()),
                "date": self.options.display_date(),
                "name": facility.contact_name(),
                "candidate_count_string": candidate_count_string(count),
            }),
        };
        self.notifier.send(&message)?;

        let event = TrackingEvent::new(facility.id(), MailingType::CandidateList, email)
            .with_candidates(candidates.iter().map(|c| c.id().to_string()).collect());
        if let Err(e) = self.replica.track(&event) {
            tracing::warn!(facility = %facility.id(), error = %e, "could not track candidate list");
        }

        Ok(Outcome::Sent)
    }

    fn handle_without_candidates(&self, facility: &Facility, email: &str) -> Result<Outcome, OutreachError> {
        if self.options.dry_run {
            tracing::info!(facility = %facility.name(), "dry run, not sending no-candidates notice");
            return Ok(Outcome::DryRun);
        }

        if facility.suppresses_no_candidates_email() {
            tracing::warn!(facility = %facility.name(), "no-candidates notice already sent, suppressing");
            return Ok(Outcome::Suppressed);
        }

        self.replica
            .update_facility_no_candidates_suppression(facility, true)?;

        let message = TemplateMessage {
            to: self.options.recipient(email),
            from: self.settings.send_email_from.clone(),
            template_id: self.settings.no_candidates_template_id.clone(),
            unsubscribe_group_id: self.settings.unsubscribe_group_id.clone(),
            data: json!({
                "feedback_form_url": prefill_facility_link(&self.settings.feedback_form_url, facility.id()),
                "date": self.options.display_date(),
                "name": facility.contact_name(),
            }),
        };
        self.notifier.send(&message)?;

        let event = TrackingEvent::new(facility.id(), MailingType::NoCandidates, email);
        if let Err(e) = self.replica.track(&event) {
            tracing::warn!(facility = %facility.id(), error = %e, "could not track no-candidates notice");
        }

        Ok(Outcome::NoCandidatesSent)
    }
}

fn candidate_count_string(count: usize) -> String {
    if count > 1 {
        format!("are {count} candidates")
    } else {
        "is 1 candidate".to_string()
    }
}
