//! JSON feed normalization.
//!
//! Polled aggregator feeds (AISHub, SeaVision) and the AISStream.io websocket
//! each ship their own field names and units. Everything funnels into the
//! alias-tolerant [`AisReport`] shape the CoT transform consumes: `mmsi`,
//! `lat`/`lon`, `name`, `cog`, `heading`, and `SOG` in 0.1-knot units.

use serde_json::Value;
use tracing::debug;

use ais_core::types::{AisReport, FieldValue};

use crate::vessels::VesselRegistry;

/// AIS "true heading not available" sentinel.
const HEADING_UNAVAILABLE: f64 = 511.0;

/// Coordinates closer to 0,0 than this are placeholders, not fixes.
const COORD_EPSILON: f64 = 1e-7;

fn field_from_json(value: &Value) -> Option<FieldValue> {
    match value {
        Value::String(s) => Some(FieldValue::Text(s.clone())),
        Value::Bool(b) => Some(FieldValue::Flag(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(FieldValue::Int(i))
            } else {
                n.as_f64().map(FieldValue::Float)
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Flatten one polled-feed record into a report. Scalar fields carry over
/// under their source names; the transform's alias lists absorb the
/// AISHub/SeaVision naming differences. Nested values are dropped.
pub fn report_from_json(record: &Value) -> Option<AisReport> {
    let object = record.as_object()?;
    let mut report = AisReport::new();
    for (key, value) in object {
        if let Some(field) = field_from_json(value) {
            report.insert(key, field);
        }
    }
    if report.is_empty() {
        None
    } else {
        Some(report)
    }
}

// ---------------------------------------------------------------------------
// AISStream.io envelope flattening
// ---------------------------------------------------------------------------

fn str_field<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn f64_field(body: &Value, key: &str) -> Option<f64> {
    body.get(key).and_then(Value::as_f64)
}

/// Cog, Sog, TrueHeading common to all position-bearing message types. The
/// 511 heading sentinel falls back to course over ground when one is present.
fn motion_fields(body: &Value, report: &mut AisReport) {
    if let Some(cog) = f64_field(body, "Cog") {
        report.insert("cog", cog);
    }
    if let Some(sog) = f64_field(body, "Sog") {
        report.insert("SOG", sog);
    }
    if let Some(heading) = f64_field(body, "TrueHeading") {
        if heading == HEADING_UNAVAILABLE {
            if let Some(cog) = f64_field(body, "Cog") {
                report.insert("heading", cog);
            }
        } else {
            report.insert("heading", heading);
        }
    }
}

fn dimension_fields(body: &Value, report: &mut AisReport) {
    let Some(dim) = body.get("Dimension").filter(|d| d.is_object()) else {
        return;
    };
    for (src, dst) in [("A", "dim_a"), ("B", "dim_b"), ("C", "dim_c"), ("D", "dim_d")] {
        if let Some(v) = dim.get(src).and_then(Value::as_i64) {
            report.insert(dst, v);
        }
    }
}

/// Required live position. `None` when absent or zero (a vessel at exactly
/// 0,0 is a codec placeholder, not a fix).
fn required_position(
    body: &Value,
    report: &mut AisReport,
    registry: &mut VesselRegistry,
    mmsi: i64,
) -> Option<()> {
    let lat = f64_field(body, "Latitude").filter(|v| *v != 0.0)?;
    let lon = f64_field(body, "Longitude").filter(|v| *v != 0.0)?;
    report.insert("lat", lat);
    report.insert("lon", lon);
    registry.update_position(&mmsi.to_string(), lat, lon);
    Some(())
}

/// Static-data messages carry no coordinates; fall back to the vessel's last
/// known position, or a 0,0 placeholder that normalization strips.
fn registry_position(report: &mut AisReport, registry: &VesselRegistry, mmsi: i64) {
    if let Some(pos) = registry.position(&mmsi.to_string()) {
        let age = (chrono::Utc::now() - pos.seen).num_seconds();
        debug!(mmsi, age_s = age, "using last known position for static report");
        report.insert("lat", pos.lat);
        report.insert("lon", pos.lon);
        report.insert("position_source", "last_known");
    } else {
        report.insert("lat", 0.0);
        report.insert("lon", 0.0);
        report.insert("position_source", "placeholder");
    }
}

/// Flatten an AISStream.io envelope (`MessageType` + `Message` + `MetaData`)
/// into a report. Returns `None` for unsupported types and for messages
/// missing the fields a CoT event needs.
pub fn flatten_envelope(envelope: &Value, registry: &mut VesselRegistry) -> Option<AisReport> {
    let message_type = envelope.get("MessageType").and_then(Value::as_str)?;
    let body = envelope.get("Message").and_then(|m| m.get(message_type))?;

    let mmsi = body.get("UserID").and_then(Value::as_i64).filter(|m| *m != 0)?;
    let mut report = AisReport::new();
    report.insert("mmsi", mmsi);

    // Names can ride on the metadata wrapper as well as the payload.
    if let Some(meta) = envelope.get("MetaData") {
        if let Some(name) = str_field(meta, "ShipName")
            .or_else(|| str_field(meta, "Name"))
            .or_else(|| str_field(meta, "VesselName"))
        {
            registry.update_name(&mmsi.to_string(), name);
        }
    }
    if let Some(name) = str_field(body, "Name") {
        report.insert("name", name);
        registry.update_name(&mmsi.to_string(), name);
    }

    match message_type {
        "PositionReport" => {
            required_position(body, &mut report, registry, mmsi)?;
            motion_fields(body, &mut report);
            if let Some(status) = body.get("NavigationalStatus").and_then(Value::as_i64) {
                report.insert("nav_status", status);
            }
            if let Some(raim) = body.get("Raim").and_then(Value::as_bool) {
                report.insert("raim", raim);
            }
            registry.enrich(&mut report);
        }
        "StandardClassBPositionReport" => {
            required_position(body, &mut report, registry, mmsi)?;
            motion_fields(body, &mut report);
            registry.enrich(&mut report);
        }
        "ExtendedClassBPositionReport" => {
            required_position(body, &mut report, registry, mmsi)?;
            motion_fields(body, &mut report);
            if let Some(shiptype) = body.get("Type").and_then(Value::as_i64) {
                report.insert("shiptype", shiptype);
            }
            dimension_fields(body, &mut report);
            registry.enrich(&mut report);
        }
        "AidsToNavigationReport" => {
            required_position(body, &mut report, registry, mmsi)?;
            report.insert("aton", true);
            if let Some(shiptype) = body.get("Type").and_then(Value::as_i64) {
                report.insert("shiptype", shiptype);
            }
            if let Some(ext) = str_field(body, "NameExtension") {
                let combined = match report.get("name").and_then(|v| v.as_text()) {
                    Some(name) => format!("{name} {ext}"),
                    None => ext.to_string(),
                };
                report.insert("name", combined);
            }
            if let Some(virtual_aid) = body.get("VirtualAtoN").and_then(Value::as_bool) {
                report.insert("virtual_aid", virtual_aid);
            }
            dimension_fields(body, &mut report);
        }
        "ShipStaticData" => {
            if let Some(shiptype) = body
                .get("ShipType")
                .or_else(|| body.get("Type"))
                .and_then(Value::as_i64)
            {
                report.insert("shiptype", shiptype);
            }
            if let Some(callsign) = str_field(body, "CallSign") {
                report.insert("callsign", callsign);
            }
            if let Some(destination) = str_field(body, "Destination") {
                report.insert("destination", destination);
            }
            if let Some(eta) = body.get("Eta").filter(|e| e.is_object()) {
                let parts: Option<Vec<i64>> = ["Month", "Day", "Hour", "Minute"]
                    .iter()
                    .map(|k| eta.get(k).and_then(Value::as_i64))
                    .collect();
                if let Some(p) = parts {
                    report.insert("eta", format!("{:02}/{:02} {:02}:{:02}", p[0], p[1], p[2], p[3]));
                }
            }
            dimension_fields(body, &mut report);
            registry_position(&mut report, registry, mmsi);
        }
        "StaticDataReport" => {
            if let Some(part_a) = body
                .get("ReportA")
                .filter(|r| r.get("Valid").and_then(Value::as_bool).unwrap_or(false))
            {
                if let Some(name) = str_field(part_a, "Name") {
                    report.insert("name", name);
                    registry.update_name(&mmsi.to_string(), name);
                }
            }
            if let Some(part_b) = body
                .get("ReportB")
                .filter(|r| r.get("Valid").and_then(Value::as_bool).unwrap_or(false))
            {
                if let Some(shiptype) = part_b.get("ShipType").and_then(Value::as_i64) {
                    report.insert("shiptype", shiptype);
                }
                if let Some(callsign) = str_field(part_b, "CallSign") {
                    report.insert("callsign", callsign);
                }
                dimension_fields(part_b, &mut report);
            }
            registry_position(&mut report, registry, mmsi);
        }
        other => {
            debug!(message_type = other, "unsupported AISStream message type");
            return None;
        }
    }

    Some(report)
}

// ---------------------------------------------------------------------------
// Post-flatten normalization
// ---------------------------------------------------------------------------

/// Clean up a flattened websocket report before the transform sees it:
/// heading sanity (with course-over-ground fallback), knots to 0.1-knot-unit
/// compensation for `SOG`, placeholder coordinate stripping, and MMSI
/// stringification.
pub fn normalize(report: &mut AisReport) {
    // cog first, heading may fall back to it
    let cog = match report.get("cog").map(|v| v.as_f64()) {
        Some(Some(v)) if (0.0..=360.0).contains(&v) => {
            report.insert("cog", v);
            Some(v)
        }
        Some(_) => {
            report.remove("cog");
            None
        }
        None => None,
    };

    match report.get("heading").map(|v| v.as_f64()) {
        Some(Some(h)) if h == HEADING_UNAVAILABLE || !(0.0..=360.0).contains(&h) => match cog {
            Some(c) => report.insert("heading", c),
            None => {
                report.remove("heading");
            }
        },
        Some(Some(h)) => report.insert("heading", h),
        Some(None) => {
            report.remove("heading");
        }
        None => {}
    }

    // AISStream reports speed in knots; the transform expects 0.1-knot units.
    match report.get("SOG").map(|v| v.as_f64()) {
        Some(Some(knots)) => report.insert("SOG", knots * 10.0),
        Some(None) => {
            report.remove("SOG");
        }
        None => {}
    }

    let placeholder = report
        .get("position_source")
        .and_then(|v| v.as_text())
        .map(|s| s == "placeholder")
        .unwrap_or(false);
    for coord in ["lat", "lon"] {
        match report.get(coord).map(|v| v.as_f64()) {
            Some(Some(v)) if v.abs() < COORD_EPSILON => {
                if placeholder {
                    report.remove(coord);
                }
            }
            Some(Some(v)) => report.insert(coord, v),
            Some(None) => {
                report.remove(coord);
            }
            None => {}
        }
    }

    if let Some(mmsi) = report.get("mmsi").map(|v| v.to_string()) {
        report.insert("mmsi", mmsi);
    }
    let trimmed_name = report
        .get("name")
        .and_then(|v| v.as_text())
        .map(|s| s.trim().to_string());
    if let Some(name) = trimmed_name {
        report.insert("name", name);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_from_json_flattens_scalars() {
        let record = json!({
            "MMSI": 366892000_i64,
            "LATITUDE": 41.1,
            "LONGITUDE": -71.3,
            "NAME": "CAPE HENLOPEN",
            "SOG": 64,
            "nested": {"dropped": true},
        });
        let report = report_from_json(&record).unwrap();
        assert_eq!(report.mmsi().as_deref(), Some("366892000"));
        assert_eq!(
            report.get("NAME").and_then(|v| v.as_text()),
            Some("CAPE HENLOPEN")
        );
        assert_eq!(report.get("SOG").and_then(|v| v.as_i64()), Some(64));
        assert!(report.get("nested").is_none());
    }

    #[test]
    fn test_report_from_json_rejects_non_objects() {
        assert!(report_from_json(&json!([1, 2])).is_none());
        assert!(report_from_json(&json!({})).is_none());
    }

    fn position_envelope(heading: i64) -> Value {
        json!({
            "MessageType": "PositionReport",
            "MetaData": {"ShipName": "CAPE HENLOPEN"},
            "Message": {
                "PositionReport": {
                    "UserID": 366892000_i64,
                    "Latitude": 41.1,
                    "Longitude": -71.3,
                    "Cog": 95.0,
                    "Sog": 6.4,
                    "TrueHeading": heading,
                    "NavigationalStatus": 0,
                }
            }
        })
    }

    #[test]
    fn test_flatten_position_report() {
        let mut registry = VesselRegistry::new(None);
        let report = flatten_envelope(&position_envelope(95), &mut registry).unwrap();
        assert_eq!(report.get("mmsi").and_then(|v| v.as_i64()), Some(366892000));
        assert_eq!(report.get("lat").and_then(|v| v.as_f64()), Some(41.1));
        assert_eq!(report.get("heading").and_then(|v| v.as_f64()), Some(95.0));
        assert_eq!(report.get("SOG").and_then(|v| v.as_f64()), Some(6.4));
        // metadata name lands in the registry and is echoed back by enrich
        assert_eq!(
            report.get("name").and_then(|v| v.as_text()),
            Some("CAPE HENLOPEN")
        );
        assert!(registry.position("366892000").is_some());
    }

    #[test]
    fn test_heading_sentinel_falls_back_to_cog() {
        let mut registry = VesselRegistry::new(None);
        let report = flatten_envelope(&position_envelope(511), &mut registry).unwrap();
        assert_eq!(report.get("heading").and_then(|v| v.as_f64()), Some(95.0));
    }

    #[test]
    fn test_flatten_rejects_zero_position() {
        let mut registry = VesselRegistry::new(None);
        let envelope = json!({
            "MessageType": "PositionReport",
            "Message": {
                "PositionReport": {"UserID": 366892000_i64, "Latitude": 0.0, "Longitude": 0.0}
            }
        });
        assert!(flatten_envelope(&envelope, &mut registry).is_none());
    }

    #[test]
    fn test_flatten_rejects_missing_mmsi_and_unknown_type() {
        let mut registry = VesselRegistry::new(None);
        let no_mmsi = json!({
            "MessageType": "PositionReport",
            "Message": {"PositionReport": {"Latitude": 41.1, "Longitude": -71.3}}
        });
        assert!(flatten_envelope(&no_mmsi, &mut registry).is_none());

        let unknown = json!({
            "MessageType": "BaseStationReport",
            "Message": {"BaseStationReport": {"UserID": 3669720_i64}}
        });
        assert!(flatten_envelope(&unknown, &mut registry).is_none());
    }

    #[test]
    fn test_static_data_uses_last_known_position() {
        let mut registry = VesselRegistry::new(None);
        registry.update_position("366892000", 41.1, -71.3);
        let envelope = json!({
            "MessageType": "ShipStaticData",
            "Message": {
                "ShipStaticData": {
                    "UserID": 366892000_i64,
                    "Name": "CAPE HENLOPEN",
                    "CallSign": "WYR4481",
                    "ShipType": 60,
                    "Eta": {"Month": 5, "Day": 1, "Hour": 13, "Minute": 30},
                }
            }
        });
        let report = flatten_envelope(&envelope, &mut registry).unwrap();
        assert_eq!(report.get("lat").and_then(|v| v.as_f64()), Some(41.1));
        assert_eq!(
            report.get("position_source").and_then(|v| v.as_text()),
            Some("last_known")
        );
        assert_eq!(report.get("eta").and_then(|v| v.as_text()), Some("05/01 13:30"));
        assert_eq!(registry.name("366892000"), Some("CAPE HENLOPEN"));
    }

    #[test]
    fn test_static_data_placeholder_stripped_by_normalize() {
        let mut registry = VesselRegistry::new(None);
        let envelope = json!({
            "MessageType": "ShipStaticData",
            "Message": {
                "ShipStaticData": {"UserID": 366892000_i64, "Name": "CAPE HENLOPEN"}
            }
        });
        let mut report = flatten_envelope(&envelope, &mut registry).unwrap();
        assert_eq!(report.get("lat").and_then(|v| v.as_f64()), Some(0.0));

        normalize(&mut report);
        assert!(report.get("lat").is_none());
        assert!(report.get("lon").is_none());
    }

    #[test]
    fn test_static_data_report_parts() {
        let mut registry = VesselRegistry::new(None);
        let envelope = json!({
            "MessageType": "StaticDataReport",
            "Message": {
                "StaticDataReport": {
                    "UserID": 338123456_i64,
                    "ReportA": {"Valid": true, "Name": "PROGUY"},
                    "ReportB": {"Valid": true, "ShipType": 37, "CallSign": "TC6163"},
                }
            }
        });
        let report = flatten_envelope(&envelope, &mut registry).unwrap();
        assert_eq!(report.get("name").and_then(|v| v.as_text()), Some("PROGUY"));
        assert_eq!(report.get("shiptype").and_then(|v| v.as_i64()), Some(37));
        assert_eq!(
            report.get("callsign").and_then(|v| v.as_text()),
            Some("TC6163")
        );
        assert_eq!(registry.name("338123456"), Some("PROGUY"));
    }

    #[test]
    fn test_normalize_sog_knots_to_tenth_knot_units() {
        let mut report = AisReport::new();
        report.insert("mmsi", 366892000_i64);
        report.insert("SOG", 6.4);
        normalize(&mut report);
        let sog = report.get("SOG").and_then(|v| v.as_f64()).unwrap();
        assert!((sog - 64.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_out_of_range_heading_dropped() {
        let mut report = AisReport::new();
        report.insert("heading", 720.0);
        normalize(&mut report);
        assert!(report.get("heading").is_none());

        let mut with_cog = AisReport::new();
        with_cog.insert("heading", 720.0);
        with_cog.insert("cog", 182.5);
        normalize(&mut with_cog);
        assert_eq!(with_cog.get("heading").and_then(|v| v.as_f64()), Some(182.5));
    }

    #[test]
    fn test_normalize_stringifies_mmsi() {
        let mut report = AisReport::new();
        report.insert("mmsi", 366892000_i64);
        normalize(&mut report);
        assert_eq!(
            report.get("mmsi").and_then(|v| v.as_text()),
            Some("366892000")
        );
    }
}
