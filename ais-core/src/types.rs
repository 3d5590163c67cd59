//! Shared types, error enum, and the decoded vessel report for ais-core.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// All errors produced by ais-core.
#[derive(Debug, Error)]
pub enum AisError {
    #[error("unrecognized NMEA sentence: {0}")]
    UnrecognizedSentence(String),
    #[error("checksum mismatch: computed {computed}, sentence carried {carried}")]
    ChecksumMismatch { computed: String, carried: String },
    #[error("malformed sentence: {0}")]
    MalformedSentence(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AisError>;

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// A single decoded field. Reports arrive from several feeds (raw NMEA, JSON
/// aggregators, websocket streams) whose field types disagree, so values keep
/// their source type and coerce on read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Flag(bool),
    Text(String),
}

impl FieldValue {
    /// Numeric view of the value. Text parses as a float; flags have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Text(s) => s.trim().parse().ok(),
            FieldValue::Flag(_) => None,
        }
    }

    /// Integer view of the value. Floats truncate; text parses as an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            FieldValue::Float(v) => Some(*v as i64),
            FieldValue::Text(s) => s.trim().parse().ok(),
            FieldValue::Flag(_) => None,
        }
    }

    /// Borrow the value as text. Only `Text` qualifies.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// A present-and-meaningful check: zero numbers, false flags, and empty
    /// strings all read as absent when resolving field aliases.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Int(v) => *v != 0,
            FieldValue::Float(v) => *v != 0.0,
            FieldValue::Flag(b) => *b,
            FieldValue::Text(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Flag(b) => write!(f, "{b}"),
            FieldValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Int(v as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Flag(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

// ---------------------------------------------------------------------------
// Vessel reports
// ---------------------------------------------------------------------------

/// A decoded vessel report: a bag of named fields.
///
/// Different feeds name the same quantity differently (`lat` from NMEA
/// decode, `LATITUDE` from AISHub, `latitude` from SeaVision), so lookups go
/// through [`AisReport::first_of`] with an explicit alias list rather than a
/// single canonical key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AisReport {
    fields: HashMap<String, FieldValue>,
}

impl AisReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<FieldValue>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// First alias whose value is present and truthy, in list order.
    pub fn first_of(&self, aliases: &[&str]) -> Option<&FieldValue> {
        aliases
            .iter()
            .filter_map(|k| self.fields.get(*k))
            .find(|v| v.is_truthy())
    }

    /// AIS message type, if this report came from a decoded payload.
    pub fn msg_type(&self) -> Option<u32> {
        self.get("type").and_then(|v| v.as_i64()).map(|v| v as u32)
    }

    /// MMSI rendered as a digit string, or `None` when missing/zero.
    pub fn mmsi(&self) -> Option<String> {
        self.first_of(&["mmsi", "MMSI"]).map(|v| v.to_string())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_coercion() {
        assert_eq!(FieldValue::Int(11).as_f64(), Some(11.0));
        assert_eq!(FieldValue::Text("97.1".into()).as_f64(), Some(97.1));
        assert_eq!(FieldValue::Float(95.9).as_i64(), Some(95));
        assert_eq!(FieldValue::Flag(true).as_f64(), None);
        assert_eq!(FieldValue::Text("n/a".into()).as_f64(), None);
    }

    #[test]
    fn test_truthiness() {
        assert!(!FieldValue::Int(0).is_truthy());
        assert!(!FieldValue::Float(0.0).is_truthy());
        assert!(!FieldValue::Text(String::new()).is_truthy());
        assert!(FieldValue::Text("0".into()).is_truthy());
        assert!(FieldValue::Int(-1).is_truthy());
    }

    #[test]
    fn test_first_of_skips_empty_aliases() {
        let mut report = AisReport::new();
        report.insert("lat", 0.0);
        report.insert("LATITUDE", 37.816913);
        let v = report.first_of(&["lat", "LATITUDE", "latitude"]).unwrap();
        assert_eq!(v.as_f64(), Some(37.816913));
    }

    #[test]
    fn test_mmsi_display() {
        let mut report = AisReport::new();
        report.insert("mmsi", 366892000_i64);
        assert_eq!(report.mmsi().as_deref(), Some("366892000"));

        let mut report = AisReport::new();
        report.insert("MMSI", "366892000");
        assert_eq!(report.mmsi().as_deref(), Some("366892000"));

        let mut report = AisReport::new();
        report.insert("mmsi", 0_i64);
        assert_eq!(report.mmsi(), None);
    }
}
