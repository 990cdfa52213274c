// src/domain/candidate.rs

use crate::domain::record::{Record, Value};

/// Derived field set on every matcher result.
pub const PREVIOUSLY_SENT: &str = "previously_sent";

/// Field to column header mapping used when candidate rows are handed to an
/// exporter.
pub const CANDIDATE_COLUMNS: &[(&str, &str)] = &[
    ("name", "Name"),
    ("phone_number", "Phone Number"),
    ("email_address", "Email Address"),
    ("date_of_birth", "Date of Birth"),
    ("street_address", "Street Address"),
    ("city", "City"),
    ("zip_code", "Zip Code"),
    ("state", "State"),
    ("regional_availability", "Regional Availability"),
    ("license_number", "License Number"),
    ("license_status", "License Status"),
    ("npi_number", "NPI Number"),
    ("out_of_state_license", "Out of State License"),
    ("practice_recency", "Practice Recency"),
    ("high_priority_health_care_practice", "High Priority Practice"),
    ("additional_practice_areas", "Additional Practice Areas"),
    ("certifications", "Certifications"),
    ("language_proficiency", "Languages Proficiencies"),
    ("populations_served", "Populations Served"),
    ("date_available", "Date Available"),
    ("available_on_weekdays", "Weekday Availability"),
    ("workday_availability", "Workday Availability"),
    ("ft_v_pt", "Full-time or Part-time?"),
    ("notes_about_availability", "Notes about Availability"),
    ("retirement_home_availability", "Willing to work at retirement homes?"),
    ("covid_comfort", "Comfortable working with CoVid patients?"),
    ("critical_care_comfort", "Comfortable working in a crit care setting?"),
    ("mrc_member", "Is an MRC Member?"),
    ("need_housing", "Would need housing?"),
    ("telehealth_availability", "Available to telehealth?"),
    ("interest_and_ability", "Interest and Ability"),
    (PREVIOUSLY_SENT, "Previously Sent"),
];

/// A prospective worker, as returned for one facility.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    record: Record,
}

impl Candidate {
    /// Wrap a stored candidate, stamping the `previously_sent` field.
    pub fn new(mut record: Record, previously_sent: bool) -> Self {
        let label = if previously_sent { "Yes" } else { "No" };
        record.set(PREVIOUSLY_SENT, Value::String(label.to_string()));
        Self { record }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn name(&self) -> &str {
        self.record.get_str("name").unwrap_or("")
    }

    pub fn previously_sent(&self) -> bool {
        matches!(self.record.get_str(PREVIOUSLY_SENT), Ok("Yes"))
    }

    /// One display string per entry of `CANDIDATE_COLUMNS`, in order.
    pub fn export_row(&self) -> Vec<String> {
        CANDIDATE_COLUMNS
            .iter()
            .map(|(key, _)| self.record.display(key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn export_row_follows_columns() {
        let map = json!({
            "Name": "Grace Hopper",
            "Regional Availability": ["North", "Metro"],
            "MRC Member": true
        })
        .as_object()
        .cloned()
        .unwrap();
        let c = Candidate::new(Record::from_remote("recC", map), true);

        let row = c.export_row();
        assert_eq!(row.len(), CANDIDATE_COLUMNS.len());
        assert_eq!(row[0], "Grace Hopper");
        assert_eq!(row[8], "North, Metro");
        assert_eq!(row[27], "true");
        assert_eq!(row.last().map(String::as_str), Some("Yes"));
        assert!(c.previously_sent());
    }
}
