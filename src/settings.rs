// settings.rs
use std::collections::HashMap;

use crate::domain::Record;
use crate::errors::ReplicaError;

/// Run-time settings kept by operators in the remote configuration table
/// (template ids, form links, sender).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub needs_form_url: String,
    pub feedback_form_url: String,
    pub candidates_template_id: String,
    pub needs_template_id: String,
    pub no_candidates_template_id: String,
    pub send_email_from: String,
    pub unsubscribe_group_id: String,
}

impl RunSettings {
    /// Build from configuration records holding `key` and `value` fields.
    /// Keys are matched case-insensitively; rows missing either field are
    /// ignored.
    pub fn from_records(records: &[Record]) -> Result<Self, ReplicaError> {
        let map: HashMap<String, String> = records
            .iter()
            .filter_map(|r| {
                let key = r.get_str("key").ok()?;
                let value = r.get_str("value").ok()?;
                Some((key.trim().to_lowercase(), value.trim().to_string()))
            })
            .collect();

        let get = |key: &str| {
            map.get(key)
                .cloned()
                .ok_or_else(|| ReplicaError::MissingSetting(key.to_string()))
        };

        Ok(Self {
            needs_form_url: get("needs_form_url")?,
            feedback_form_url: get("feedback_form_url")?,
            candidates_template_id: get("candidates_template_id")?,
            needs_template_id: get("needs_template_id")?,
            no_candidates_template_id: get("no_candidates_template_id")?,
            send_email_from: get("send_email_from")?,
            unsubscribe_group_id: get("unsubscribe_group_id")?,
        })
    }
}

/// `<base_url>?prefill_Facility=<id>`, the form link that pre-selects the
/// facility.
pub fn prefill_facility_link(base_url: &str, facility_id: &str) -> String {
    format!("{base_url}?prefill_Facility={facility_id}")
}
