//! Vessel-name registry.
//!
//! Static-data messages carry vessel names; position reports usually do not.
//! The registry remembers names (and last known positions) per MMSI so that
//! later position reports can be enriched before the CoT transform runs.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use ais_core::types::AisReport;

/// Cache writes are batched: one save per this many new names.
const SAVE_EVERY: usize = 5;

/// Last reported position for a vessel, kept so static-data reports (which
/// carry no coordinates) can still produce a plottable event.
#[derive(Debug, Clone, Copy)]
pub struct LastPosition {
    pub lat: f64,
    pub lon: f64,
    pub seen: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct VesselRegistry {
    names: HashMap<String, String>,
    positions: HashMap<String, LastPosition>,
    cache_file: Option<PathBuf>,
}

impl VesselRegistry {
    /// Create a registry, loading cached names from `cache_file` when given.
    pub fn new(cache_file: Option<&str>) -> Self {
        let mut registry = VesselRegistry {
            cache_file: cache_file.map(PathBuf::from),
            ..Default::default()
        };
        if let Some(path) = registry.cache_file.clone() {
            registry.load_cache(&path);
        }
        info!(names = registry.names.len(), "vessel registry initialized");
        registry
    }

    fn load_cache(&mut self, path: &Path) {
        if !path.exists() {
            return;
        }
        match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<HashMap<String, String>>(&text) {
                Ok(names) => {
                    debug!(names = names.len(), "loaded vessel name cache");
                    self.names = names;
                }
                Err(err) => warn!(%err, "vessel name cache is not valid JSON"),
            },
            Err(err) => warn!(%err, "could not read vessel name cache"),
        }
    }

    fn save_cache(&self) {
        let Some(path) = &self.cache_file else {
            return;
        };
        match serde_json::to_string(&self.names) {
            Ok(json) => {
                if let Err(err) = fs::write(path, json) {
                    warn!(%err, "could not write vessel name cache");
                }
            }
            Err(err) => warn!(%err, "could not serialize vessel name cache"),
        }
    }

    /// Record a vessel name from a static-data message.
    pub fn update_name(&mut self, mmsi: &str, name: &str) {
        let name = name.trim();
        if mmsi.is_empty() || name.is_empty() {
            return;
        }
        let was_new = self
            .names
            .insert(mmsi.to_string(), name.to_string())
            .is_none();
        debug!(mmsi, name, "updated vessel name");
        if was_new && self.cache_file.is_some() && self.names.len() % SAVE_EVERY == 0 {
            self.save_cache();
        }
    }

    pub fn name(&self, mmsi: &str) -> Option<&str> {
        self.names.get(mmsi).map(String::as_str)
    }

    /// Record the last known position of a vessel.
    pub fn update_position(&mut self, mmsi: &str, lat: f64, lon: f64) {
        if mmsi.is_empty() {
            return;
        }
        self.positions.insert(
            mmsi.to_string(),
            LastPosition {
                lat,
                lon,
                seen: Utc::now(),
            },
        );
    }

    pub fn position(&self, mmsi: &str) -> Option<LastPosition> {
        self.positions.get(mmsi).copied()
    }

    /// Inject the registered name into a report that lacks one.
    pub fn enrich(&self, report: &mut AisReport) {
        let Some(mmsi) = report.mmsi() else {
            return;
        };
        if report.get("name").map(|v| v.is_truthy()).unwrap_or(false) {
            return;
        }
        if let Some(name) = self.name(&mmsi) {
            report.insert("name", name);
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
