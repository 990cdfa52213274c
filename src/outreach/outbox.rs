// src/outreach/outbox.rs
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use url::Url;

use super::{CandidateExporter, Notifier, OutreachError, TemplateMessage};
use crate::domain::{Candidate, Facility, CANDIDATE_COLUMNS};

/// Writes each message as one JSON line instead of delivering it.
pub struct JsonLinesNotifier<W: Write> {
    out: RefCell<W>,
}

impl<W: Write> JsonLinesNotifier<W> {
    pub fn new(out: W) -> Self {
        Self { out: RefCell::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write> Notifier for JsonLinesNotifier<W> {
    fn send(&self, message: &TemplateMessage) -> Result<(), OutreachError> {
        let mut out = self.out.borrow_mut();
        serde_json::to_writer(&mut *out, message).map_err(|e| OutreachError::Notify(e.to_string()))?;
        writeln!(out).map_err(|e| OutreachError::Notify(e.to_string()))
    }
}

/// A candidate as one JSON object keyed by export column header, id first.
pub fn candidate_json_row(candidate: &Candidate) -> Value {
    let mut row = Map::new();
    row.insert("id".into(), Value::String(candidate.id().to_string()));
    for ((_, header), value) in CANDIDATE_COLUMNS.iter().zip(candidate.export_row()) {
        row.insert((*header).to_string(), Value::String(value));
    }
    Value::Object(row)
}

/// Writes each list to `<dir>/<facility id>-<date>.jsonl`. The returned link
/// is under `base_url` when one is set (the directory is served from there),
/// otherwise a `file://` URL.
pub struct DirectoryExporter {
    dir: PathBuf,
    base_url: Option<Url>,
    date: NaiveDate,
}

impl DirectoryExporter {
    pub fn new(dir: impl Into<PathBuf>, base_url: Option<Url>, date: NaiveDate) -> Self {
        Self {
            dir: dir.into(),
            base_url,
            date,
        }
    }

    fn file_name(&self, facility: &Facility) -> String {
        format!("{}-{}.jsonl", facility.id(), self.date.format("%Y-%m-%d"))
    }
}

impl CandidateExporter for DirectoryExporter {
    fn export(&self, facility: &Facility, candidates: &[Candidate]) -> Result<String, OutreachError> {
        let export_err = |e: std::io::Error| OutreachError::Export(e.to_string());

        fs::create_dir_all(&self.dir).map_err(export_err)?;
        let name = self.file_name(facility);
        let path = self.dir.join(&name);

        let mut out = BufWriter::new(fs::File::create(&path).map_err(export_err)?);
        for candidate in candidates {
            serde_json::to_writer(&mut out, &candidate_json_row(candidate))
                .map_err(|e| OutreachError::Export(e.to_string()))?;
            writeln!(out).map_err(export_err)?;
        }
        out.flush().map_err(export_err)?;

        tracing::info!(facility = %facility.id(), path = %path.display(), rows = candidates.len(), "candidate list written");

        let link = match &self.base_url {
            Some(base) => base.join(&name).map_err(|e| OutreachError::Export(e.to_string()))?,
            None => {
                let absolute = fs::canonicalize(&path).map_err(export_err)?;
                Url::from_file_path(&absolute).map_err(|_| {
                    OutreachError::Export(format!("cannot link {}", absolute.display()))
                })?
            }
        };
        Ok(link.to_string())
    }
}
