// src/domain/facility.rs

use crate::domain::record::Record;

/// Remote field flipped to stop repeat "no candidates" emails.
pub const SUPPRESS_NO_CANDIDATES_FIELD: &str = "Suppress No Candidates Email";

/// An organization that submits staffing needs and receives candidate lists.
#[derive(Debug, Clone, PartialEq)]
pub struct Facility {
    record: Record,
}

impl Facility {
    pub fn new(record: Record) -> Self {
        Self { record }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn name(&self) -> &str {
        self.record.get_str("facility_name").map(str::trim).unwrap_or("")
    }

    /// Trimmed, lowercased contact address; `None` when blank or absent.
    pub fn contact_email(&self) -> Option<String> {
        self.record
            .get_str("contact_email")
            .ok()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
    }

    pub fn contact_name(&self) -> &str {
        self.record.get_str("contact_name").unwrap_or("")
    }

    pub fn is_approved(&self) -> bool {
        self.record.flag("approved")
    }

    pub fn suppresses_no_candidates_email(&self) -> bool {
        self.record.flag("suppress_no_candidates_email")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn facility(fields: serde_json::Value) -> Facility {
        let map = fields.as_object().cloned().unwrap();
        Facility::new(Record::from_remote("recF", map))
    }

    #[test]
    fn contact_email_is_cleaned() {
        let f = facility(json!({ "Contact Email": "  Boss@Example.COM " }));
        assert_eq!(f.contact_email().as_deref(), Some("boss@example.com"));
        assert_eq!(facility(json!({ "Contact Email": "  " })).contact_email(), None);
    }

    #[test]
    fn checkboxes_default_to_false() {
        let f = facility(json!({ "Facility Name": " Oak Grove " }));
        assert_eq!(f.name(), "Oak Grove");
        assert!(!f.is_approved());
        assert!(!f.suppresses_no_candidates_email());
    }
}
