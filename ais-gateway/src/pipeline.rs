//! Report-to-event pipeline shared by every source adapter.

use anyhow::Context;
use tracing::info;

use ais_core::config::Config;
use ais_core::registry::{KnownCraftDb, MidDb, ShipDb};
use ais_core::types::AisReport;
use ais_core::{CotEvent, CotTransformer};

pub struct Pipeline {
    transformer: CotTransformer,
    known_craft: Option<KnownCraftDb>,
    include_all_craft: bool,
}

impl Pipeline {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let known_craft = match &config.known_craft {
            Some(path) => {
                let db = KnownCraftDb::from_file(path)
                    .with_context(|| format!("loading known craft file {path}"))?;
                info!(path, entries = db.len(), "loaded known craft file");
                Some(db)
            }
            None => None,
        };

        Ok(Pipeline {
            transformer: CotTransformer::new(
                config.cot.clone(),
                MidDb::bundled(),
                ShipDb::bundled(),
            ),
            known_craft,
            include_all_craft: config.cot.include_all_craft,
        })
    }

    /// Transform one report into a CoT event. `None` when the report lacks a
    /// usable position or MMSI, or when a known-craft file is acting as an
    /// allow-list and this vessel is not on it.
    pub fn event_for(&self, report: &AisReport) -> Option<CotEvent> {
        let mmsi = report.mmsi();
        let known = match (&self.known_craft, &mmsi) {
            (Some(db), Some(mmsi)) => {
                let hit = db.lookup(mmsi);
                if hit.is_none() && !self.include_all_craft {
                    return None;
                }
                hit
            }
            (Some(_), None) => return None,
            (None, _) => None,
        };
        self.transformer.transform(report, known)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
