//! The CoT transform engine: decoded vessel report -> CoT event.
//!
//! One report in, at most one event out. Reports missing a usable position
//! or MMSI produce no event; that is the normal fate of a large share of
//! traffic, not an error. Classification heuristics (flag country, AtoN,
//! SAR, Coast Guard rescue station) and the operator's Known Craft
//! overrides both feed into the emitted type, callsign, and stale TTL.

use chrono::{DateTime, Duration, Utc};

use crate::config::{CotConfig, DEFAULT_COT_STALE, DEFAULT_COT_TYPE};
use crate::cot::{AisExtension, CotEvent, CotPoint, DEFAULT_HOW};
use crate::registry::{is_aton, is_crs, is_sar, KnownCraft, MidDb, ShipDb};
use crate::types::AisReport;

/// Field-name aliases, in resolution order, for values that arrive under
/// different names depending on the source feed.
const LAT_ALIASES: &[&str] = &["lat", "LATITUDE", "latitude"];
const LON_ALIASES: &[&str] = &["lon", "LONGITUDE", "longitude"];
const MMSI_ALIASES: &[&str] = &["mmsi", "MMSI"];
const NAME_ALIASES: &[&str] = &["name", "NAME"];
const HEADING_ALIASES: &[&str] = &["heading", "HEADING"];
const SPEED_ALIASES: &[&str] = &["speed", "SPEED", "SOG"];
const TYPE_ALIASES: &[&str] = &["type", "TYPE", "veselType"];

/// AIS speed-over-ground is reported in 0.1-knot units; CoT wants m/s.
const SOG_TO_MS: f64 = 0.1 / 1.944;

/// Transform engine. Owns its configuration and reference tables; holds no
/// per-report state, so one instance serves every source task.
#[derive(Debug, Clone)]
pub struct CotTransformer {
    config: CotConfig,
    mid_db: MidDb,
    ship_db: ShipDb,
}

impl CotTransformer {
    pub fn new(config: CotConfig, mid_db: MidDb, ship_db: ShipDb) -> Self {
        CotTransformer {
            config,
            mid_db,
            ship_db,
        }
    }

    /// Transform one report, stamping the current time.
    pub fn transform(&self, report: &AisReport, known: Option<&KnownCraft>) -> Option<CotEvent> {
        self.transform_at(report, known, Utc::now())
    }

    /// Transform with an explicit clock, for deterministic callers.
    pub fn transform_at(
        &self,
        report: &AisReport,
        known: Option<&KnownCraft>,
        now: DateTime<Utc>,
    ) -> Option<CotEvent> {
        // Position and identity are mandatory. Zero lat/lon reads as
        // missing; so does a field that fails numeric coercion.
        let lat = report
            .first_of(LAT_ALIASES)
            .and_then(|v| v.as_f64())
            .filter(|v| *v != 0.0)?;
        let lon = report
            .first_of(LON_ALIASES)
            .and_then(|v| v.as_f64())
            .filter(|v| *v != 0.0)?;
        let mmsi = report.first_of(MMSI_ALIASES)?.to_string();

        let aton = is_aton(&mmsi);
        if aton && self.config.ignore_aton {
            return None;
        }

        let uid = format!("MMSI-{mmsi}");

        let mut cot_type = self
            .config
            .cot_type
            .clone()
            .or_else(|| known.and_then(|k| k.cot_type.clone()))
            .unwrap_or_else(|| DEFAULT_COT_TYPE.to_string());
        let mut cot_stale = self
            .config
            .stale
            .or_else(|| known.and_then(|k| k.stale))
            .unwrap_or(DEFAULT_COT_STALE);

        let mut remarks_fields: Vec<String> = Vec::new();
        let mut xais = AisExtension {
            cot_host_id: self.config.host_id.clone(),
            ..Default::default()
        };

        let mut ais_name = report
            .first_of(NAME_ALIASES)
            .map(|v| v.to_string().replace('@', "").trim().to_string())
            .unwrap_or_default();

        let shipname = report
            .first_of(&["shipname"])
            .map(|v| v.to_string())
            .unwrap_or_else(|| self.ship_db.shipname(&mmsi).to_string());

        let vessel_type = report
            .first_of(TYPE_ALIASES)
            .map(|v| v.to_string())
            .unwrap_or_default();

        if !ais_name.is_empty() {
            remarks_fields.push(format!("AIS Name: {ais_name}"));
            xais.ais_name = ais_name.clone();
        }

        if !shipname.is_empty() {
            ais_name = shipname.clone();
            remarks_fields.push(format!("Shipname: {shipname}"));
            xais.shipname = shipname;
        }

        let mut callsign = known
            .and_then(|k| k.name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or(ais_name);
        if callsign.is_empty() {
            callsign = mmsi.clone();
        }

        if let Some(country) = self.mid_db.country(&mmsi) {
            cot_type = rewrite_prefix(&cot_type, "a-n");
            remarks_fields.push(format!("Country: {country}"));
            xais.country = country.to_string();
            if country.contains("United States of America") {
                cot_type = rewrite_prefix(&cot_type, "a-f");
            }
        }

        if !vessel_type.is_empty() {
            remarks_fields.push(format!("Type: {vessel_type}"));
            xais.vessel_type = vessel_type;
        }

        remarks_fields.push(format!("MMSI: {mmsi}"));
        xais.mmsi = mmsi.clone();

        xais.aton = aton;
        if aton {
            cot_type = "a-n-S-N".to_string();
            cot_stale = 86400;
            callsign = format!("AtoN {callsign}");
            remarks_fields.push("AtoN: true".to_string());
        }

        let uscg = is_sar(&mmsi);
        xais.uscg = uscg;
        if uscg {
            cot_type = "a-f-S-X-L".to_string();
            remarks_fields.push("USCG: true".to_string());
        }

        let crs = is_crs(&mmsi);
        xais.crs = crs;
        if crs {
            cot_type = "a-f-G-I-U-T".to_string();
            cot_stale = 86400;
            callsign = format!("USCG CRS {callsign}");
            remarks_fields.push("USCG CRS: true".to_string());
        }

        let course = report.first_of(HEADING_ALIASES).and_then(|v| v.as_f64());
        // Zero speed is ambiguous between "stationary" and "not available";
        // the attribute is omitted rather than emitted as 0.
        let speed = report
            .first_of(SPEED_ALIASES)
            .and_then(|v| v.as_f64())
            .map(|sog| sog * SOG_TO_MS)
            .filter(|ms| *ms != 0.0);

        if !self.config.host_id.is_empty() {
            remarks_fields.push(self.config.host_id.clone());
        }

        Some(CotEvent {
            cot_type,
            uid,
            time: now,
            start: now,
            stale: now + Duration::seconds(cot_stale as i64),
            how: DEFAULT_HOW.to_string(),
            point: CotPoint::new(lat, lon),
            callsign,
            course,
            speed,
            remarks: remarks_fields.join(" "),
            icon: self.config.icon.clone(),
            ais: xais,
        })
    }
}

/// Swap the leading affiliation prefix of a CoT type (`a-u`, `a-n`, `a-f`),
/// keeping the remainder.
fn rewrite_prefix(cot_type: &str, prefix: &str) -> String {
    let rest = cot_type.get(3..).unwrap_or("");
    format!("{prefix}{rest}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
