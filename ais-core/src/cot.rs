//! Cursor-on-Target event structure and XML rendering.
//!
//! Output framing is "TAK Protocol Version 0": an XML declaration, a
//! newline, then the `<event>` document. Timestamps render as ISO-8601 UTC
//! with a `Z` suffix.

use std::fmt::{self, Write};

use chrono::{DateTime, SecondsFormat, Utc};

/// CoT schema version carried on every event.
pub const COT_VERSION: &str = "2.0";

/// Default `how` attribute: machine-generated, GPS-derived.
pub const DEFAULT_HOW: &str = "m-g";

/// Sentinel for unknown positional accuracy (ce/le) and altitude (hae).
pub const UNKNOWN_ACCURACY: f64 = 9_999_999.0;

/// Geographic point child of an event.
#[derive(Debug, Clone, PartialEq)]
pub struct CotPoint {
    pub lat: f64,
    pub lon: f64,
    pub hae: f64,
    pub ce: f64,
    pub le: f64,
}

impl CotPoint {
    /// A point with unknown altitude and accuracy.
    pub fn new(lat: f64, lon: f64) -> Self {
        CotPoint {
            lat,
            lon,
            hae: UNKNOWN_ACCURACY,
            ce: UNKNOWN_ACCURACY,
            le: UNKNOWN_ACCURACY,
        }
    }
}

/// Vessel-classification extension element (`<__ais>`), carrying the raw
/// flags the transform derived so downstream consumers need not re-derive
/// them from the MMSI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AisExtension {
    pub cot_host_id: String,
    pub ais_name: String,
    pub shipname: String,
    pub country: String,
    pub vessel_type: String,
    pub mmsi: String,
    pub aton: bool,
    pub uscg: bool,
    pub crs: bool,
}

/// A complete CoT event.
#[derive(Debug, Clone, PartialEq)]
pub struct CotEvent {
    pub cot_type: String,
    pub uid: String,
    pub time: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub stale: DateTime<Utc>,
    pub how: String,
    pub point: CotPoint,
    pub callsign: String,
    /// Track course in degrees, omitted from XML when absent.
    pub course: Option<f64>,
    /// Track speed in m/s, omitted from XML when absent.
    pub speed: Option<f64>,
    pub remarks: String,
    /// Optional `<usericon>` iconset path.
    pub icon: Option<String>,
    pub ais: AisExtension,
}

impl CotEvent {
    /// Render with TAK Protocol Version 0 framing.
    pub fn to_xml(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CotEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        write!(
            f,
            r#"<event version="{}" uid="{}" type="{}" time="{}" start="{}" stale="{}" how="{}">"#,
            COT_VERSION,
            Escaped(&self.uid),
            Escaped(&self.cot_type),
            timestamp(&self.time),
            timestamp(&self.start),
            timestamp(&self.stale),
            Escaped(&self.how),
        )?;
        write!(
            f,
            r#"<point lat="{}" lon="{}" hae="{}" ce="{}" le="{}"/>"#,
            self.point.lat, self.point.lon, self.point.hae, self.point.ce, self.point.le
        )?;
        write!(f, "<detail>")?;
        write!(f, "<track")?;
        if let Some(course) = self.course {
            write!(f, r#" course="{course}""#)?;
        }
        if let Some(speed) = self.speed {
            write!(f, r#" speed="{speed}""#)?;
        }
        write!(f, "/>")?;
        write!(f, r#"<contact callsign="{}"/>"#, Escaped(&self.callsign))?;
        write!(f, "<remarks>{}</remarks>", Escaped(&self.remarks))?;
        self.write_ais_extension(f)?;
        if let Some(icon) = &self.icon {
            write!(f, r#"<usericon iconsetpath="{}"/>"#, Escaped(icon))?;
        }
        write!(f, "</detail>")?;
        writeln!(f, "</event>")
    }
}

impl CotEvent {
    fn write_ais_extension(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ais = &self.ais;
        write!(f, r#"<__ais cot_host_id="{}""#, Escaped(&ais.cot_host_id))?;
        if !ais.ais_name.is_empty() {
            write!(f, r#" ais_name="{}""#, Escaped(&ais.ais_name))?;
        }
        if !ais.shipname.is_empty() {
            write!(f, r#" shipname="{}""#, Escaped(&ais.shipname))?;
        }
        if !ais.country.is_empty() {
            write!(f, r#" country="{}""#, Escaped(&ais.country))?;
        }
        if !ais.vessel_type.is_empty() {
            write!(f, r#" vessel_type="{}""#, Escaped(&ais.vessel_type))?;
        }
        write!(
            f,
            r#" mmsi="{}" aton="{}" uscg="{}" crs="{}"/>"#,
            Escaped(&ais.mmsi),
            ais.aton,
            ais.uscg,
            ais.crs
        )
    }
}

fn timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// XML-escapes on the fly, avoiding a String per attribute.
struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in self.0.chars() {
            match ch {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&apos;")?,
                _ => f.write_char(ch)?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_event() -> CotEvent {
        let time = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        CotEvent {
            cot_type: "a-f-S-X-M".to_string(),
            uid: "MMSI-366892000".to_string(),
            time,
            start: time,
            stale: time + chrono::Duration::seconds(3600),
            how: DEFAULT_HOW.to_string(),
            point: CotPoint::new(37.81691333333333, -122.51208),
            callsign: "366892000".to_string(),
            course: Some(95.0),
            speed: Some(3.2921810699588478),
            remarks: "MMSI: 366892000".to_string(),
            icon: None,
            ais: AisExtension {
                mmsi: "366892000".to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_framing() {
        let xml = sample_event().to_xml();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<event "));
        assert!(xml.ends_with("</event>\n"));
    }

    #[test]
    fn test_event_attributes() {
        let xml = sample_event().to_xml();
        assert!(xml.contains(r#"version="2.0""#));
        assert!(xml.contains(r#"uid="MMSI-366892000""#));
        assert!(xml.contains(r#"type="a-f-S-X-M""#));
        assert!(xml.contains(r#"stale="2024-05-01T13:00:00.000Z""#));
        assert!(xml.contains(r#"how="m-g""#));
    }

    #[test]
    fn test_point_sentinels() {
        let xml = sample_event().to_xml();
        assert!(xml.contains(r#"hae="9999999""#));
        assert!(xml.contains(r#"ce="9999999""#));
        assert!(xml.contains(r#"lat="37.81691333333333""#));
    }

    #[test]
    fn test_track_renders_integral_course_without_fraction() {
        let xml = sample_event().to_xml();
        assert!(xml.contains(r#"<track course="95" speed="3.2921810699588478"/>"#));
    }

    #[test]
    fn test_track_omits_absent_speed() {
        let mut event = sample_event();
        event.speed = None;
        event.course = None;
        assert!(event.to_xml().contains("<track/>"));
    }

    #[test]
    fn test_xml_escaping() {
        let mut event = sample_event();
        event.callsign = "A&B <Tug>".to_string();
        let xml = event.to_xml();
        assert!(xml.contains(r#"callsign="A&amp;B &lt;Tug&gt;""#));
    }
}
