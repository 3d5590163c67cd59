//! AIS payload decoding: sentence ingest, fragment reassembly, and
//! per-message-type bitfield extraction.

use crate::bits::Bits;
use crate::sentence::{compute_checksum, parse_sentence};
use crate::types::{AisError, AisReport, Result};

/// Outcome of feeding one line to the decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A complete message decoded to a report.
    Report(AisReport),
    /// Nothing yet: blank line, or a fragment awaiting its successors.
    Incomplete,
}

/// Stateful sentence decoder.
///
/// Multi-fragment messages (type 5 static data is the usual case) arrive as
/// consecutive sentences whose payloads concatenate before unarmoring. Each
/// decoder owns its own reassembly buffer, so feed every line of one input
/// stream through the same instance.
#[derive(Debug, Default)]
pub struct AisDecoder {
    fragment_buf: String,
}

impl AisDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest one raw NMEA line.
    ///
    /// Returns `Decoded::Incomplete` for blank lines and for fragments still
    /// waiting on the rest of their message. A continuation fragment whose
    /// opening fragment was never seen is dropped the same way. Checksum
    /// failures and malformed framing are errors.
    pub fn decode_line(&mut self, line: &str) -> Result<Decoded> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Decoded::Incomplete);
        }

        let sentence = parse_sentence(line)?;
        let computed = compute_checksum(line);
        if computed != sentence.checksum {
            return Err(AisError::ChecksumMismatch {
                computed,
                carried: sentence.checksum,
            });
        }

        let payload = if sentence.fragment_count == 1 {
            sentence.payload
        } else if sentence.fragment_index < sentence.fragment_count {
            if self.fragment_buf.is_empty() && sentence.fragment_index > 1 {
                // Mid-message fragment with no opening fragment buffered.
                return Ok(Decoded::Incomplete);
            }
            self.fragment_buf.push_str(&sentence.payload);
            return Ok(Decoded::Incomplete);
        } else {
            if self.fragment_buf.is_empty() {
                return Ok(Decoded::Incomplete);
            }
            let mut full = std::mem::take(&mut self.fragment_buf);
            full.push_str(&sentence.payload);
            full
        };

        Ok(Decoded::Report(decode_payload(&payload)))
    }
}

/// Decode an unarmored-ready payload string into a report.
///
/// Unrecognized message types yield a minimal report carrying only `type`;
/// that is not an error.
pub fn decode_payload(payload: &str) -> AisReport {
    let bits = Bits::from_armored(payload);
    let msg_type = bits.uint(0, 6) as u32;
    match msg_type {
        1 | 2 | 3 => position_report(&bits),
        4 => base_station_report(&bits),
        5 => static_voyage_data(&bits),
        18 => class_b_position(&bits),
        19 => extended_class_b_position(&bits),
        21 => aid_to_navigation(&bits),
        24 => static_data_report(&bits),
        _ => {
            let mut report = AisReport::new();
            report.insert("type", msg_type);
            report
        }
    }
}

fn common_header(bits: &Bits) -> AisReport {
    let mut report = AisReport::new();
    report.insert("type", bits.uint(0, 6) as i64);
    report.insert("repeat", bits.uint(6, 8) as i64);
    report.insert("mmsi", bits.uint(8, 38) as i64);
    report
}

/// Types 1/2/3: Class A position report.
fn position_report(bits: &Bits) -> AisReport {
    let mut report = common_header(bits);
    report.insert("status", bits.uint(38, 42) as i64);
    report.insert("turn", bits.int(42, 50));
    report.insert("speed", bits.uint(50, 60) as i64);
    report.insert("accuracy", bits.flag(60));
    report.insert("lon", bits.int(61, 89) as f64 / 600000.0);
    report.insert("lat", bits.int(89, 116) as f64 / 600000.0);
    report.insert("course", bits.uint(116, 128) as f64 * 0.1);
    report.insert("heading", bits.uint(128, 137) as i64);
    report.insert("second", bits.uint(137, 143) as i64);
    report.insert("maneuver", bits.uint(143, 145) as i64);
    report.insert("raim", bits.flag(148));
    report.insert("radio", bits.uint(149, 168) as i64);
    report
}

/// Type 4: base station report (UTC + position).
fn base_station_report(bits: &Bits) -> AisReport {
    let mut report = common_header(bits);
    report.insert("year", bits.uint(38, 52) as i64);
    report.insert("month", bits.uint(52, 56) as i64);
    report.insert("day", bits.uint(56, 61) as i64);
    report.insert("hour", bits.uint(61, 66) as i64);
    report.insert("minute", bits.uint(66, 72) as i64);
    report.insert("second", bits.uint(72, 78) as i64);
    report.insert("accuracy", bits.flag(78));
    report.insert("lon", bits.int(79, 107) as f64 / 600000.0);
    report.insert("lat", bits.int(107, 134) as f64 / 600000.0);
    report.insert("epfd", bits.uint(134, 138) as i64);
    report.insert("raim", bits.flag(148));
    report.insert("radio", bits.uint(149, 168) as i64);
    report
}

/// Type 5: static and voyage-related data (two fragments on the wire).
fn static_voyage_data(bits: &Bits) -> AisReport {
    let mut report = common_header(bits);
    report.insert("ais_version", bits.uint(38, 40) as i64);
    report.insert("imo", bits.uint(40, 70) as i64);
    report.insert("callsign", bits.text(70, 112));
    report.insert("shipname", bits.text(112, 232));
    report.insert("shiptype", bits.uint(232, 240) as i64);
    report.insert("to_bow", bits.uint(240, 249) as i64);
    report.insert("to_stern", bits.uint(249, 258) as i64);
    report.insert("to_port", bits.uint(258, 264) as i64);
    report.insert("to_starboard", bits.uint(264, 270) as i64);
    report.insert("epfd", bits.uint(270, 274) as i64);
    report.insert("month", bits.uint(274, 278) as i64);
    report.insert("day", bits.uint(278, 283) as i64);
    report.insert("hour", bits.uint(283, 288) as i64);
    report.insert("minute", bits.uint(288, 294) as i64);
    report.insert("draught", bits.uint(294, 302) as f64 / 10.0);
    report.insert("dte", bits.flag(302));
    report
}

/// Type 18: Class B position report.
fn class_b_position(bits: &Bits) -> AisReport {
    let mut report = common_header(bits);
    report.insert("speed", bits.uint(46, 56) as i64);
    report.insert("accuracy", bits.flag(56));
    report.insert("lon", bits.int(57, 85) as f64 / 600000.0);
    report.insert("lat", bits.int(85, 112) as f64 / 600000.0);
    report.insert("course", bits.uint(112, 124) as f64 * 0.1);
    report.insert("heading", bits.uint(124, 133) as i64);
    report.insert("second", bits.uint(133, 139) as i64);
    report.insert("regional", bits.uint(139, 141) as i64);
    report.insert("cs", bits.flag(141));
    report.insert("display", bits.flag(142));
    report.insert("dsc", bits.flag(143));
    report.insert("band", bits.flag(144));
    report.insert("msg22", bits.flag(145));
    report.insert("assigned", bits.flag(146));
    report.insert("raim", bits.flag(147));
    report.insert("radio", bits.uint(148, 168) as i64);
    report
}

/// Type 19: extended Class B position report.
fn extended_class_b_position(bits: &Bits) -> AisReport {
    let mut report = common_header(bits);
    report.insert("speed", bits.uint(46, 56) as i64);
    report.insert("accuracy", bits.flag(56));
    report.insert("lon", bits.int(57, 85) as f64 / 600000.0);
    report.insert("lat", bits.int(85, 112) as f64 / 600000.0);
    report.insert("course", bits.uint(112, 124) as f64 * 0.1);
    report.insert("heading", bits.uint(124, 133) as i64);
    report.insert("second", bits.uint(133, 139) as i64);
    report.insert("regional", bits.uint(139, 143) as i64);
    report.insert("shipname", bits.text(143, 263));
    report.insert("to_bow", bits.uint(271, 280) as i64);
    report.insert("to_stern", bits.uint(280, 288) as i64);
    report.insert("to_port", bits.uint(289, 295) as i64);
    report.insert("to_starboard", bits.uint(295, 301) as i64);
    report.insert("epfd", bits.uint(301, 305) as i64);
    report.insert("raim", bits.flag(305));
    report.insert("dte", bits.flag(306));
    report.insert("assigned", bits.flag(307));
    report
}

/// Type 21: aid-to-navigation report.
fn aid_to_navigation(bits: &Bits) -> AisReport {
    let mut report = common_header(bits);
    report.insert("aid_type", bits.uint(38, 43) as i64);
    report.insert("name", bits.text(43, 163));
    report.insert("accuracy", bits.flag(163));
    report.insert("lon", bits.int(164, 192) as f64 / 600000.0);
    report.insert("lat", bits.int(192, 219) as f64 / 600000.0);
    report.insert("to_bow", bits.uint(219, 228) as i64);
    report.insert("to_stern", bits.uint(228, 237) as i64);
    report.insert("to_port", bits.uint(237, 243) as i64);
    report.insert("to_starboard", bits.uint(243, 249) as i64);
    report.insert("epfd", bits.uint(249, 253) as i64);
    report.insert("second", bits.uint(253, 259) as i64);
    report.insert("off_position", bits.flag(259));
    report.insert("regional", bits.uint(260, 268) as i64);
    report.insert("raim", bits.flag(268));
    report.insert("virtual_aid", bits.flag(269));
    report.insert("assigned", bits.flag(270));
    report.insert("name_ext", bits.text(272, 361));
    report
}

/// An auxiliary craft (tender, lifeboat) carries a 98xxxxxxx MMSI and
/// reports its mothership's MMSI instead of hull dimensions.
pub fn is_auxiliary_craft(mmsi: i64) -> bool {
    mmsi / 10_000_000 == 98
}

/// Type 24: static data report, part A (name) or part B (type/vendor/hull).
fn static_data_report(bits: &Bits) -> AisReport {
    let mut report = common_header(bits);
    let partno = bits.uint(38, 40) as i64;
    report.insert("partno", partno);
    if partno == 0 {
        report.insert("shipname", bits.text(40, 160));
    } else {
        report.insert("shiptype", bits.uint(40, 48) as i64);
        report.insert("vendorid", bits.uint(48, 66) as i64);
        // Older transponder models pack text here; may be garbage.
        report.insert("vendorname", bits.text(48, 90));
        report.insert("model", bits.uint(66, 70) as i64);
        report.insert("serial", bits.uint(70, 90) as i64);
        report.insert("callsign", bits.text(90, 132));
        let mmsi = bits.uint(8, 38) as i64;
        if is_auxiliary_craft(mmsi) {
            report.insert("mothership_mmsi", bits.uint(132, 162) as i64);
        } else {
            report.insert("to_bow", bits.uint(132, 141) as i64);
            report.insert("to_stern", bits.uint(141, 150) as i64);
            report.insert("to_port", bits.uint(150, 156) as i64);
            report.insert("to_starboard", bits.uint(156, 162) as i64);
        }
    }
    report
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValue;

    fn decode(lines: &[&str]) -> AisReport {
        let mut decoder = AisDecoder::new();
        let mut out = None;
        for line in lines {
            if let Decoded::Report(r) = decoder.decode_line(line).unwrap() {
                out = Some(r);
            }
        }
        out.expect("no complete report")
    }

    fn f(report: &AisReport, key: &str) -> f64 {
        report.get(key).unwrap().as_f64().unwrap()
    }

    fn i(report: &AisReport, key: &str) -> i64 {
        report.get(key).unwrap().as_i64().unwrap()
    }

    fn s<'a>(report: &'a AisReport, key: &str) -> &'a str {
        report.get(key).unwrap().as_text().unwrap()
    }

    #[test]
    fn test_type1_position_report() {
        let r = decode(&["!AIVDM,1,1,,B,15NO=ndP01JrjhlH@0s;3?vD0L0e,0*77"]);
        assert_eq!(i(&r, "type"), 1);
        assert_eq!(i(&r, "mmsi"), 367513050);
        assert_eq!(i(&r, "status"), 12);
        assert_eq!(i(&r, "turn"), -128);
        assert_eq!(i(&r, "speed"), 1);
        assert_eq!(r.get("accuracy"), Some(&FieldValue::Flag(false)));
        assert!((f(&r, "lon") - -71.04251666666667).abs() < 1e-12);
        assert!((f(&r, "lat") - 42.38034).abs() < 1e-12);
        assert!((f(&r, "course") - 282.8).abs() < 1e-9);
        assert_eq!(i(&r, "heading"), 511);
        assert_eq!(i(&r, "second"), 10);
        assert_eq!(i(&r, "radio"), 114733);
    }

    #[test]
    fn test_type1_negative_lon() {
        let r = decode(&["!AIVDM,1,1,,B,139`n:0P0;o>Qm@EUc838wvj2<25,0*4E"]);
        assert_eq!(i(&r, "mmsi"), 211433000);
        assert_eq!(i(&r, "speed"), 11);
        assert!((f(&r, "lon") - -122.65529333333333).abs() < 1e-12);
        assert!((f(&r, "lat") - 37.72890666666667).abs() < 1e-12);
        assert!((f(&r, "course") - 80.3).abs() < 1e-9);
        assert_eq!(i(&r, "heading"), 511);
        assert_eq!(r.get("raim"), Some(&FieldValue::Flag(true)));
    }

    #[test]
    fn test_type18_own_ship() {
        let r = decode(&["!AIVDO,1,1,,,B00000000868rA6<H7KNswPUoP06,0*6A"]);
        assert_eq!(i(&r, "type"), 18);
        assert_eq!(i(&r, "mmsi"), 0);
        assert_eq!(i(&r, "speed"), 0);
        assert!((f(&r, "lon") - 5.364536666666667).abs() < 1e-12);
        assert!((f(&r, "lat") - 43.294916666666666).abs() < 1e-12);
        assert!((f(&r, "course") - 356.6).abs() < 1e-9);
        assert_eq!(i(&r, "heading"), 511);
        assert_eq!(i(&r, "radio"), 917510);
    }

    #[test]
    fn test_type4_base_station() {
        let r = decode(&["!AIVDM,1,1,,A,402;rdiuho;N>0NJbOMX8?vp2<05,0*6B"]);
        assert_eq!(i(&r, "type"), 4);
        assert_eq!(i(&r, "mmsi"), 2292403);
        assert_eq!(i(&r, "year"), 2012);
        assert_eq!(i(&r, "month"), 3);
        assert_eq!(i(&r, "day"), 14);
        assert_eq!(i(&r, "hour"), 11);
        assert_eq!(i(&r, "minute"), 30);
        assert!((f(&r, "lon") - 6.644611666666667).abs() < 1e-12);
        assert!((f(&r, "lat") - -60.07114833333333).abs() < 1e-12);
        assert_eq!(i(&r, "epfd"), 14);
    }

    #[test]
    fn test_type5_two_fragments() {
        let r = decode(&[
            "!AIVDM,2,1,3,B,55P5TL01VIaAL@7WKO@mBplU@<PDhh000000001S;AJ::4A80?4i@E53,0*3E",
            "!AIVDM,2,2,3,B,1@0000000000000,2*55",
        ]);
        assert_eq!(i(&r, "type"), 5);
        assert_eq!(i(&r, "mmsi"), 369190000);
        assert_eq!(i(&r, "imo"), 6710932);
        assert_eq!(s(&r, "callsign"), "WDA9674");
        assert_eq!(s(&r, "shipname"), "MT.MITCHELL");
        assert_eq!(i(&r, "shiptype"), 99);
        assert_eq!(i(&r, "to_bow"), 90);
        assert_eq!(i(&r, "to_stern"), 90);
        assert!((f(&r, "draught") - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_fragment_without_opener_is_dropped() {
        let mut decoder = AisDecoder::new();
        let out = decoder
            .decode_line("!AIVDM,2,2,3,B,1@0000000000000,2*55")
            .unwrap();
        assert_eq!(out, Decoded::Incomplete);
    }

    #[test]
    fn test_type19_extended_class_b() {
        let r = decode(&[
            "!AIVDM,1,1,,B,C5N3SRgPEnJGEBT>NhWAwwo862PaLELTBJ:V00000000S0D:R220,0*0B",
        ]);
        assert_eq!(i(&r, "type"), 19);
        assert_eq!(s(&r, "shipname"), "CAPT.J.RIMES");
        assert_eq!(i(&r, "speed"), 87);
        assert!((f(&r, "lon") - -88.81039166666666).abs() < 1e-12);
        assert!((f(&r, "lat") - 29.543695).abs() < 1e-12);
        assert!((f(&r, "course") - 335.9).abs() < 1e-9);
        assert_eq!(i(&r, "to_bow"), 5);
        assert_eq!(i(&r, "epfd"), 1);
        // mmsi is carried even though the position fields start at bit 46
        assert!(r.get("mmsi").is_some());
    }

    #[test]
    fn test_type21_aid_to_navigation() {
        let r = decode(&[
            "!AIVDM,1,1,,B,E>k`sO70VQ97aRh1T0W72V@611@=FVj<;V5d@00003vP100,2*7A",
        ]);
        assert_eq!(i(&r, "type"), 21);
        assert_eq!(i(&r, "mmsi"), 993672060);
        assert_eq!(s(&r, "name"), "AMBROSE CHANNEL LBB");
        assert_eq!(i(&r, "aid_type"), 14);
        assert!((f(&r, "lon") - -74.00936666666666).abs() < 1e-12);
        assert!((f(&r, "lat") - 40.52795).abs() < 1e-12);
        assert_eq!(s(&r, "name_ext"), "");
        assert_eq!(r.get("virtual_aid"), Some(&FieldValue::Flag(true)));
    }

    #[test]
    fn test_type24_part_a() {
        let r = decode(&["!AIVDM,1,1,,A,H42O55i18tMET00000000000000,2*6D"]);
        assert_eq!(i(&r, "type"), 24);
        assert_eq!(i(&r, "partno"), 0);
        assert_eq!(i(&r, "mmsi"), 271041815);
        assert_eq!(s(&r, "shipname"), "PROGUY");
    }

    #[test]
    fn test_type24_part_b() {
        let r = decode(&["!AIVDM,1,1,,A,H42O55lti4hhhilD3nink000?050,0*40"]);
        assert_eq!(i(&r, "partno"), 1);
        assert_eq!(i(&r, "shiptype"), 60);
        assert_eq!(s(&r, "callsign"), "TC6163");
        assert_eq!(i(&r, "serial"), 199796);
        assert_eq!(i(&r, "to_stern"), 15);
        assert!(r.get("mothership_mmsi").is_none());
    }

    #[test]
    fn test_auxiliary_craft_check() {
        assert!(is_auxiliary_craft(980123456));
        assert!(!is_auxiliary_craft(366892000));
    }

    #[test]
    fn test_unknown_type_yields_minimal_report() {
        // 'F' unarmors to 22, an unsupported type
        let r = decode_payload("F0000000");
        assert_eq!(r.msg_type(), Some(22));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn test_bad_checksum_is_an_error() {
        let mut decoder = AisDecoder::new();
        let err = decoder
            .decode_line("!AIVDM,1,1,,B,15NO=ndP01JrjhlH@0s;3?vD0L0e,0*00")
            .unwrap_err();
        assert!(matches!(err, AisError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_blank_line_is_incomplete() {
        let mut decoder = AisDecoder::new();
        assert_eq!(decoder.decode_line("").unwrap(), Decoded::Incomplete);
        assert_eq!(decoder.decode_line("  \r\n").unwrap(), Decoded::Incomplete);
    }
}
