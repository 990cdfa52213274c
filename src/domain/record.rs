// src/domain/record.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::ReplicaError;

/// A single field value as it lives in the replica.
///
/// The remote source is loosely typed; everything it hands us is coerced into
/// one of these shapes at ingestion so the rest of the crate never has to
/// inspect raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<String>),
}

impl Value {
    /// Coerce arbitrary JSON into a `Value`.
    ///
    /// Arrays become string lists (nulls dropped, other scalars rendered as
    /// JSON text). Objects, which show up for attachments and collaborator
    /// fields, are kept as compact JSON text.
    pub fn from_json(raw: serde_json::Value) -> Self {
        match raw {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::List(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        serde_json::Value::Null => None,
                        serde_json::Value::String(s) => Some(s),
                        other => Some(other.to_string()),
                    })
                    .collect(),
            ),
            obj @ serde_json::Value::Object(_) => Value::String(obj.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Human readable rendering; lists are comma delimited.
    pub fn display(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::List(items) => items.join(", "),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(Value::from_json)
    }
}

/// Typed-missing signal returned by the record getters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("field '{0}' is missing")]
    Missing(String),
    #[error("field '{key}' is a {found}, expected {expected}")]
    WrongType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Lowercase, strip, and turn runs of whitespace into underscores.
/// "Facility Name " -> "facility_name"
pub fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, fields: BTreeMap<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Build a record from the remote representation, normalizing keys.
    pub fn from_remote(id: impl Into<String>, raw: serde_json::Map<String, serde_json::Value>) -> Self {
        let fields = raw
            .into_iter()
            .map(|(k, v)| (normalize_key(&k), Value::from_json(v)))
            .collect();
        Self::new(id, fields)
    }

    /// Parse a stored `(id, fields)` row.
    pub fn from_row(table: &'static str, id: String, payload: &str) -> Result<Self, ReplicaError> {
        let fields: BTreeMap<String, Value> =
            serde_json::from_str(payload).map_err(|e| ReplicaError::MalformedRecord {
                table,
                id: id.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { id, fields })
    }

    /// Serialized payload for the `fields` column. Keys come out sorted, so an
    /// unchanged record always produces the same text.
    pub fn to_payload(&self) -> Result<String, ReplicaError> {
        serde_json::to_string(&self.fields).map_err(|e| ReplicaError::MalformedRecord {
            table: "payload",
            id: self.id.clone(),
            reason: e.to_string(),
        })
    }

    /// A missing key and an explicit null both read as `None`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn get_str(&self, key: &str) -> Result<&str, FieldError> {
        match self.require(key)? {
            Value::String(s) => Ok(s),
            other => Err(wrong_type(key, "string", other)),
        }
    }

    /// Lists are returned as-is; a bare string is not silently promoted.
    pub fn get_list(&self, key: &str) -> Result<&[String], FieldError> {
        match self.require(key)? {
            Value::List(items) => Ok(items),
            other => Err(wrong_type(key, "list", other)),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, FieldError> {
        match self.require(key)? {
            Value::Bool(b) => Ok(*b),
            other => Err(wrong_type(key, "boolean", other)),
        }
    }

    /// `Ok(None)` when the field is absent; an unparseable string is a type error.
    pub fn get_optional_timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>, FieldError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(|_| FieldError::WrongType {
                    key: key.to_string(),
                    expected: "RFC 3339 timestamp",
                    found: "string",
                }),
            Some(other) => Err(wrong_type(key, "RFC 3339 timestamp", other)),
        }
    }

    /// Display text for a field, empty when absent.
    pub fn display(&self, key: &str) -> String {
        self.get(key).map(Value::display).unwrap_or_default()
    }

    /// Truthiness the way the source uses checkboxes: unchecked boxes are
    /// simply absent.
    pub fn flag(&self, key: &str) -> bool {
        self.get_bool(key).unwrap_or(false)
    }

    fn require(&self, key: &str) -> Result<&Value, FieldError> {
        self.get(key).ok_or_else(|| FieldError::Missing(key.to_string()))
    }
}

fn wrong_type(key: &str, expected: &'static str, found: &Value) -> FieldError {
    FieldError::WrongType {
        key: key.to_string(),
        expected,
        found: found.kind(),
    }
}
