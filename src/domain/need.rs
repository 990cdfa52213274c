// src/domain/need.rs

use chrono::{DateTime, Utc};

use crate::domain::record::{Record, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NeedsMet {
    Yes,
    No,
    /// Null or absent.
    Unset,
    /// Any other value, kept as display text.
    Other(String),
}

/// A facility's staffing request.
#[derive(Debug, Clone, PartialEq)]
pub struct Need {
    record: Record,
}

impl Need {
    pub fn new(record: Record) -> Self {
        Self { record }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn time_requested(&self) -> Option<DateTime<Utc>> {
        self.record
            .get_optional_timestamp("time_requested")
            .ok()
            .flatten()
    }

    pub fn needs_met(&self) -> NeedsMet {
        match self.record.get("needs_met") {
            None => NeedsMet::Unset,
            Some(Value::String(s)) if s == "Yes" => NeedsMet::Yes,
            Some(Value::String(s)) if s == "No" => NeedsMet::No,
            Some(other) => NeedsMet::Other(other.display()),
        }
    }

    /// Open only while "No" or unset, the same rule `facilities_in_need` applies.
    pub fn is_unmet(&self) -> bool {
        matches!(self.needs_met(), NeedsMet::No | NeedsMet::Unset)
    }

    pub fn primary_practice_area(&self) -> Option<&str> {
        self.record.get_str("practice_area_1").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn need(fields: serde_json::Value) -> Need {
        let map = fields.as_object().cloned().unwrap();
        Need::new(Record::from_remote("recN", map))
    }

    #[test]
    fn needs_met_states() {
        assert_eq!(need(json!({ "Needs Met": "Yes" })).needs_met(), NeedsMet::Yes);
        assert_eq!(need(json!({ "Needs Met": "No" })).needs_met(), NeedsMet::No);
        assert_eq!(need(json!({})).needs_met(), NeedsMet::Unset);
        assert!(need(json!({ "Needs Met": null })).is_unmet());
        assert!(need(json!({ "Needs Met": "No" })).is_unmet());
        assert!(!need(json!({ "Needs Met": "Yes" })).is_unmet());
    }

    #[test]
    fn unknown_needs_met_is_not_open() {
        let partial = need(json!({ "Needs Met": "Partially" }));
        assert_eq!(partial.needs_met(), NeedsMet::Other("Partially".into()));
        assert!(!partial.is_unmet());

        let checkbox = need(json!({ "Needs Met": false }));
        assert_eq!(checkbox.needs_met(), NeedsMet::Other("false".into()));
        assert!(!checkbox.is_unmet());
    }

    #[test]
    fn primary_area_and_request_time() {
        let n = need(json!({
            "Practice Area 1": "Nursing",
            "Time Requested": "2020-04-01T09:00:00.000Z"
        }));

        assert_eq!(n.primary_practice_area(), Some("Nursing"));
        assert!(n.time_requested().is_some());
        assert_eq!(need(json!({})).primary_practice_area(), None);
    }
}
