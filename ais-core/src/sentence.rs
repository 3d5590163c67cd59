//! NMEA 0183 AIVDM/AIVDO sentence framing.
//!
//! Splits a raw sentence into its seven comma-separated fields and verifies
//! the XOR checksum. Payload bit decoding lives in [`crate::bits`] and
//! [`crate::decode`].

use crate::types::{AisError, Result};

/// Talker prefixes this crate accepts. AIVDM carries reports received from
/// other vessels; AIVDO carries own-ship reports.
pub const SENTENCE_PREFIXES: &[&str] = &["!AIVDM", "!AIVDO"];

/// A parsed (but not yet decoded) AIVDM/AIVDO sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    /// Talker prefix, e.g. `!AIVDM`.
    pub prefix: String,
    /// Total fragments in the message this sentence belongs to.
    pub fragment_count: u32,
    /// 1-based index of this fragment.
    pub fragment_index: u32,
    /// Sequential message id linking fragments. Often empty for
    /// single-fragment messages.
    pub message_id: Option<u32>,
    /// Radio channel (`A` or `B`), may be empty.
    pub channel: String,
    /// 6-bit armored payload.
    pub payload: String,
    /// Number of padding bits appended to the last payload character.
    pub fill_bits: u32,
    /// Checksum hex digits carried after `*`, uppercased.
    pub checksum: String,
}

/// Compute the NMEA checksum of a sentence: XOR of every byte between the
/// leading `!`/`$` (exclusive) and the `*` (exclusive, or end of string when
/// absent), formatted as two uppercase hex digits.
pub fn compute_checksum(sentence: &str) -> String {
    let bytes = sentence.as_bytes();
    let start = match bytes.first() {
        Some(b'!') | Some(b'$') => 1,
        _ => 0,
    };
    let end = sentence.rfind('*').unwrap_or(sentence.len());
    let mut sum = 0u8;
    for &b in &bytes[start..end] {
        sum ^= b;
    }
    format!("{sum:02X}")
}

/// Parse one raw line into a [`Sentence`].
///
/// Does not verify the checksum; callers compare [`compute_checksum`] against
/// [`Sentence::checksum`] before trusting the payload (the decoder does this
/// for every line it ingests).
pub fn parse_sentence(line: &str) -> Result<Sentence> {
    let line = line.trim();
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != 7 {
        return Err(AisError::MalformedSentence(format!(
            "expected 7 comma-separated fields, got {}",
            fields.len()
        )));
    }

    let prefix = fields[0];
    if !SENTENCE_PREFIXES.contains(&prefix) {
        return Err(AisError::UnrecognizedSentence(prefix.to_string()));
    }

    let fragment_count = parse_u32(fields[1], "fragment count")?;
    let fragment_index = parse_u32(fields[2], "fragment index")?;
    let message_id = if fields[3].is_empty() {
        None
    } else {
        Some(parse_u32(fields[3], "message id")?)
    };

    // Last field is "<fill>*<checksum>".
    let (fill, checksum) = fields[6].split_once('*').ok_or_else(|| {
        AisError::MalformedSentence(format!("missing checksum delimiter in {:?}", fields[6]))
    })?;
    let fill_bits = parse_u32(fill, "fill bits")?;

    Ok(Sentence {
        prefix: prefix.to_string(),
        fragment_count,
        fragment_index,
        message_id,
        channel: fields[4].to_string(),
        payload: fields[5].to_string(),
        fill_bits,
        checksum: checksum.trim().to_ascii_uppercase(),
    })
}

fn parse_u32(s: &str, what: &str) -> Result<u32> {
    s.trim()
        .parse()
        .map_err(|_| AisError::MalformedSentence(format!("bad {what}: {s:?}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
