use serde_json::json;

use super::{Notifier, OutreachError, OutreachOptions, RunSummary, TemplateMessage};
use crate::domain::Facility;
use crate::replica::Replica;
use crate::settings::{prefill_facility_link, RunSettings};
use crate::source::RemoteSource;

/// Asks every approved facility to tell us about its current needs.
pub struct NeedsRequestRun<'a, S: RemoteSource> {
    replica: &'a Replica<S>,
    settings: &'a RunSettings,
    notifier: &'a dyn Notifier,
    options: OutreachOptions,
}

impl<'a, S: RemoteSource> NeedsRequestRun<'a, S> {
    pub fn new(
        replica: &'a Replica<S>,
        settings: &'a RunSettings,
        notifier: &'a dyn Notifier,
        options: OutreachOptions,
    ) -> Self {
        Self {
            replica,
            settings,
            notifier,
            options,
        }
    }

    pub fn run(&self) -> Result<RunSummary, OutreachError> {
        let mut summary = RunSummary::default();

        for facility in self.replica.approved_facilities()? {
            let Some(email) = facility.contact_email() else {
                tracing::warn!(facility = %facility.name(), "no contact email, skipping needs request");
                summary.missing_email += 1;
                continue;
            };

            if self.options.dry_run {
                tracing::info!(facility = %facility.name(), "dry run, not sending needs request");
                summary.dry_run += 1;
                continue;
            }

            match self.notifier.send(&self.message(&facility, &email)) {
                Ok(()) => {
                    tracing::info!(facility = %facility.name(), email = %email, "sent needs request");
                    summary.sent += 1;
                }
                Err(e) => {
                    tracing::error!(facility = %facility.name(), email = %email, error = %e, "needs request failed");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    fn message(&self, facility: &Facility, email: &str) -> TemplateMessage {
        TemplateMessage {
            to: self.options.recipient(email),
            from: self.settings.send_email_from.clone(),
            template_id: self.settings.needs_template_id.clone(),
            unsubscribe_group_id: self.settings.unsubscribe_group_id.clone(),
            data: json!({
                "name": facility.contact_name(),
                "facility_name": facility.name(),
                "date": self.options.display_date(),
                "feedback_form_url": prefill_facility_link(&self.settings.feedback_form_url, facility.id()),
                "needs_form_url": prefill_facility_link(&self.settings.needs_form_url, facility.id()),
            }),
        }
    }
}
