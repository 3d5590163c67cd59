//! Vessel registries and MMSI classification.
//!
//! Three lookup tables feed the CoT transform: the ITU Maritime
//! Identification Digits table (MMSI prefix -> flag country), a ship-name
//! registry keyed by MMSI, and the operator-supplied Known Craft file that
//! overrides CoT type, stale, and callsign per vessel. The first two ship
//! with the crate and can be replaced from disk; prefix classification
//! (AtoN / SAR / CRS) is pure string matching and needs no table.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::types::{AisError, Result};

const MID_CSV: &str = include_str!("../data/mid.csv");
const SHIP_DB: &str = include_str!("../data/ships.txt");

// ---------------------------------------------------------------------------
// CSV plumbing
// ---------------------------------------------------------------------------

/// Split one CSV line, honoring double-quoted fields.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                cur.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut cur));
            }
            _ => cur.push(ch),
        }
    }
    fields.push(cur);
    fields
}

// ---------------------------------------------------------------------------
// MID database
// ---------------------------------------------------------------------------

/// ITU Maritime Identification Digits: 3-digit MMSI prefix -> country.
#[derive(Debug, Clone, Default)]
pub struct MidDb {
    countries: HashMap<String, String>,
}

impl MidDb {
    /// The table bundled with the crate.
    pub fn bundled() -> Self {
        Self::from_csv(MID_CSV)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref()).map_err(AisError::Io)?;
        Ok(Self::from_csv(&text))
    }

    /// Parse a CSV with `Digit` and `Allocated to` columns.
    pub fn from_csv(text: &str) -> Self {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let header: Vec<String> = match lines.next() {
            Some(h) => split_csv_line(h),
            None => return Self::default(),
        };
        let digit_col = header.iter().position(|h| h.trim() == "Digit");
        let country_col = header.iter().position(|h| h.trim() == "Allocated to");
        let (Some(digit_col), Some(country_col)) = (digit_col, country_col) else {
            return Self::default();
        };
        let mut countries = HashMap::new();
        for line in lines {
            let fields = split_csv_line(line);
            if let (Some(digit), Some(country)) = (fields.get(digit_col), fields.get(country_col))
            {
                countries.insert(digit.trim().to_string(), country.trim().to_string());
            }
        }
        MidDb { countries }
    }

    /// Flag country for an MMSI, from its first three digits.
    pub fn country(&self, mmsi: &str) -> Option<&str> {
        let prefix = mmsi.get(..3)?;
        self.countries.get(prefix).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Ship-name registry
// ---------------------------------------------------------------------------

/// MMSI -> vessel name registry. The file format is headerless CSV with
/// columns MMSI, name, unk, vtype.
#[derive(Debug, Clone, Default)]
pub struct ShipDb {
    names: HashMap<String, String>,
}

impl ShipDb {
    pub fn bundled() -> Self {
        Self::from_csv(SHIP_DB)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref()).map_err(AisError::Io)?;
        Ok(Self::from_csv(&text))
    }

    pub fn from_csv(text: &str) -> Self {
        let mut names = HashMap::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_csv_line(line);
            if let (Some(mmsi), Some(name)) = (fields.first(), fields.get(1)) {
                names.insert(mmsi.trim().to_string(), name.trim().to_string());
            }
        }
        ShipDb { names }
    }

    /// Registered name for an MMSI, or `""` when unknown.
    pub fn shipname(&self, mmsi: &str) -> &str {
        self.names.get(mmsi).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Known Craft overrides
// ---------------------------------------------------------------------------

/// One row of the operator's Known Craft file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnownCraft {
    pub mmsi: String,
    /// Callsign override.
    pub name: Option<String>,
    /// CoT type override.
    pub cot_type: Option<String>,
    /// Stale override, seconds.
    pub stale: Option<u64>,
}

/// Known Craft file: per-MMSI CoT overrides, CSV with a header row naming
/// at least `MMSI`; `NAME`, `COT`, and `STALE` columns are honored.
#[derive(Debug, Clone, Default)]
pub struct KnownCraftDb {
    rows: HashMap<String, KnownCraft>,
}

impl KnownCraftDb {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref()).map_err(AisError::Io)?;
        Ok(Self::from_csv(&text))
    }

    pub fn from_csv(text: &str) -> Self {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let header: Vec<String> = match lines.next() {
            Some(h) => split_csv_line(h),
            None => return Self::default(),
        };
        let col = |name: &str| header.iter().position(|h| h.trim() == name);
        let Some(mmsi_col) = col("MMSI") else {
            return Self::default();
        };
        let name_col = col("NAME");
        let cot_col = col("COT");
        let stale_col = col("STALE");

        let field = |fields: &[String], idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| fields.get(i))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let mut rows = HashMap::new();
        for line in lines {
            let fields = split_csv_line(line);
            let Some(mmsi) = fields.get(mmsi_col).map(|s| s.trim().to_string()) else {
                continue;
            };
            if mmsi.is_empty() {
                continue;
            }
            let craft = KnownCraft {
                mmsi: mmsi.clone(),
                name: field(&fields, name_col),
                cot_type: field(&fields, cot_col),
                stale: field(&fields, stale_col).and_then(|s| s.parse().ok()),
            };
            rows.insert(mmsi, craft);
        }
        KnownCraftDb { rows }
    }

    pub fn lookup(&self, mmsi: &str) -> Option<&KnownCraft> {
        self.rows.get(mmsi)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// MMSI prefix classification
// ---------------------------------------------------------------------------

/// Aid-to-Navigation MMSIs use the format 99MIDXXXX.
pub fn is_aton(mmsi: &str) -> bool {
    mmsi.starts_with("99")
}

/// Search-and-Rescue aircraft use 111MIDXXX; two US Coast Guard prefixes
/// also fly SAR.
pub fn is_sar(mmsi: &str) -> bool {
    if mmsi.starts_with("111") {
        return true;
    }
    matches!(mmsi.get(..5), Some("30386") | Some("33885"))
}

/// US Coast Guard Coastal Radio Stations: 3669XXX (7 digits) or the
/// zero-padded 003369 prefix.
pub fn is_crs(mmsi: &str) -> bool {
    (mmsi.len() == 7 && mmsi.starts_with("3669")) || mmsi.starts_with("003369")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mid_lookup() {
        let db = MidDb::bundled();
        assert_eq!(db.country("366892000"), Some("United States of America"));
        assert_eq!(db.country("211433000"), Some("Germany"));
        assert_eq!(db.country("000000000"), None);
        assert_eq!(db.country("12"), None);
    }

    #[test]
    fn test_shipname_lookup() {
        let db = ShipDb::bundled();
        assert_eq!(db.shipname("303990000"), "USCG EAGLE");
        assert_eq!(db.shipname("938852000"), "");
    }

    #[test]
    fn test_aton() {
        assert!(is_aton("993692016"));
        assert!(!is_aton("211433000"));
    }

    #[test]
    fn test_sar() {
        assert!(is_sar("111892000"));
        assert!(is_sar("303862000"));
        assert!(is_sar("338852000"));
        assert!(!is_sar("938852000"));
    }

    #[test]
    fn test_crs() {
        assert!(is_crs("3669145"));
        assert!(is_crs("003369000"));
        assert!(!is_crs("36690000")); // 8 digits
        assert!(!is_crs("3669"));
        assert!(!is_crs("211433000"));
    }

    #[test]
    fn test_known_craft_parsing() {
        let csv = "MMSI,NAME,COT,STALE\n366892000,TACO_01,a-f-S-T-A-C-O,\n";
        let db = KnownCraftDb::from_csv(csv);
        let craft = db.lookup("366892000").unwrap();
        assert_eq!(craft.name.as_deref(), Some("TACO_01"));
        assert_eq!(craft.cot_type.as_deref(), Some("a-f-S-T-A-C-O"));
        assert_eq!(craft.stale, None);
        assert!(db.lookup("211433000").is_none());
    }

    #[test]
    fn test_quoted_csv_fields() {
        let fields = split_csv_line("338,\"United States of America\",x");
        assert_eq!(fields[1], "United States of America");
        let fields = split_csv_line("a,\"b,c\",\"d\"\"e\"");
        assert_eq!(fields, vec!["a", "b,c", "d\"e"]);
    }

    #[test]
    fn test_empty_database_inputs() {
        assert!(MidDb::from_csv("").is_empty());
        assert!(ShipDb::from_csv("").is_empty());
        assert!(KnownCraftDb::from_csv("").is_empty());
    }
}
