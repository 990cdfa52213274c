use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use thiserror::Error;

use crate::outreach::OutreachOptions;
use crate::source::AirtableTables;
use crate::sync::DEFAULT_BATCH_SIZE;

/// Top-level configuration for a run, read from the environment (and a
/// `.env` file when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub airtable: AirtableConfig,
    pub replica: ReplicaConfig,
    pub telemetry: TelemetryConfig,
    pub outreach: OutreachConfig,
}

#[derive(Debug, Clone)]
pub struct AirtableConfig {
    pub api_key: String,
    pub base_id: String,
    pub tables: AirtableTables,
    pub page_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct ReplicaConfig {
    /// SQLite path; `:memory:` keeps the replica in process.
    pub db_path: String,
    pub batch_size: usize,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct OutreachConfig {
    /// Zone the display date in outgoing mail is taken in.
    pub timezone: Tz,
    pub override_email_destination: Option<String>,
    /// Needed only to actually send.
    pub sendgrid_api_key: Option<String>,
    pub export_dir: PathBuf,
    pub export_base_url: Option<Url>,
}

impl OutreachConfig {
    pub fn options(&self, dry_run: bool, now: DateTime<Utc>) -> OutreachOptions {
        OutreachOptions {
            dry_run,
            override_email_destination: self.override_email_destination.clone(),
            ..OutreachOptions::at(self.timezone, now)
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `load` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let optional = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = AirtableTables::default();
        let tables = AirtableTables {
            candidates: or_default("AIRTABLE_CANDIDATES_TABLE", &defaults.candidates),
            facilities: or_default("AIRTABLE_FACILITIES_TABLE", &defaults.facilities),
            needs: or_default("AIRTABLE_NEEDS_TABLE", &defaults.needs),
            candidate_tags: or_default("AIRTABLE_CANDIDATE_TAGS_TABLE", &defaults.candidate_tags),
            tracking: or_default("AIRTABLE_TRACKING_TABLE", &defaults.tracking),
            configuration: or_default("AIRTABLE_CONFIG_TABLE", &defaults.configuration),
        };

        let batch_size_raw = or_default("STAFFING_SYNC_BATCH_SIZE", &DEFAULT_BATCH_SIZE.to_string());
        let batch_size = match batch_size_raw.trim().parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(ConfigError::Invalid {
                    var: "STAFFING_SYNC_BATCH_SIZE",
                    value: batch_size_raw.clone(),
                    reason: "expected a positive integer",
                })
            }
        };

        let delay_raw = or_default("STAFFING_PAGE_DELAY_MS", "0");
        let page_delay = delay_raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::Invalid {
                var: "STAFFING_PAGE_DELAY_MS",
                value: delay_raw.clone(),
                reason: "expected milliseconds",
            })?;

        let timezone_raw = or_default("NEXP_TIMEZONE", "US/Central");
        let timezone = timezone_raw
            .trim()
            .parse::<Tz>()
            .map_err(|_| ConfigError::Invalid {
                var: "NEXP_TIMEZONE",
                value: timezone_raw.clone(),
                reason: "expected an IANA time zone name",
            })?;

        let export_base_url = match optional("STAFFING_EXPORT_BASE_URL") {
            None => None,
            Some(raw) => {
                // a trailing slash keeps `join` from dropping the last segment
                let with_slash = if raw.ends_with('/') { raw.clone() } else { format!("{raw}/") };
                Some(Url::parse(&with_slash).map_err(|_| ConfigError::Invalid {
                    var: "STAFFING_EXPORT_BASE_URL",
                    value: raw,
                    reason: "expected an absolute URL",
                })?)
            }
        };

        Ok(Self {
            airtable: AirtableConfig {
                api_key: required("AIRTABLE_API_KEY")?,
                base_id: required("AIRTABLE_BASE_ID")?,
                tables,
                page_delay,
            },
            replica: ReplicaConfig {
                db_path: or_default("STAFFING_DB_PATH", ":memory:"),
                batch_size,
            },
            telemetry: TelemetryConfig {
                log_level: or_default("STAFFING_LOG_LEVEL", "info"),
            },
            outreach: OutreachConfig {
                timezone,
                override_email_destination: optional("OVERRIDE_EMAIL_DESTINATION"),
                sendgrid_api_key: optional("SENDGRID_API_KEY"),
                export_dir: PathBuf::from(or_default("STAFFING_EXPORT_DIR", "exports")),
                export_base_url,
            },
        })
    }
}
