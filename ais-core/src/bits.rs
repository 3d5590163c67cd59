//! 6-bit payload armoring and bitfield extraction.
//!
//! AIVDM payloads pack message bits into printable ASCII, six bits per
//! character. [`Bits`] unpacks a payload once and hands out integer, signed,
//! flag, and 6-bit-ASCII views of arbitrary bit ranges.

/// Unpacked payload bits, one `0`/`1` per entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bits {
    bits: Vec<u8>,
}

impl Bits {
    /// Unarmor a payload string. Each character maps to a 6-bit group:
    /// subtract 48, and subtract 8 more when the result exceeds 40.
    pub fn from_armored(payload: &str) -> Self {
        let mut bits = Vec::with_capacity(payload.len() * 6);
        for ch in payload.chars() {
            let mut val = ch as i32 - 48;
            if val > 40 {
                val -= 8;
            }
            let val = (val & 0x3F) as u8;
            for shift in (0..6).rev() {
                bits.push((val >> shift) & 1);
            }
        }
        Bits { bits }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Unsigned integer from `[start, end)`. Ranges past the end of the
    /// payload are clamped, so truncated payloads decode as zero.
    pub fn uint(&self, start: usize, end: usize) -> u64 {
        let end = end.min(self.bits.len());
        if start >= end {
            return 0;
        }
        let mut val = 0u64;
        for &b in &self.bits[start..end] {
            val = (val << 1) | b as u64;
        }
        val
    }

    /// Two's-complement signed integer from `[start, end)`.
    pub fn int(&self, start: usize, end: usize) -> i64 {
        let end = end.min(self.bits.len());
        if start >= end {
            return 0;
        }
        let width = end - start;
        let raw = self.uint(start, end);
        if width < 64 && raw & (1 << (width - 1)) != 0 {
            raw as i64 - (1i64 << width)
        } else {
            raw as i64
        }
    }

    /// Single bit as a boolean. Out-of-range reads as false.
    pub fn flag(&self, idx: usize) -> bool {
        self.bits.get(idx).is_some_and(|&b| b == 1)
    }

    /// 6-bit ASCII string from `[start, end)`: values below 32 shift up by
    /// 64, `@` (the null fill character) drops, trailing whitespace trims.
    pub fn text(&self, start: usize, end: usize) -> String {
        let end = end.min(self.bits.len());
        let mut out = String::new();
        let mut pos = start;
        while pos + 6 <= end {
            let mut code = self.uint(pos, pos + 6) as u8;
            if code < 32 {
                code += 64;
            }
            if code != b'@' {
                out.push(code as char);
            }
            pos += 6;
        }
        out.trim_end().to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_armoring_low_and_high_chars() {
        // '0' -> 0, 'W' -> 39, '`' -> 40, 'w' -> 63
        let b = Bits::from_armored("0");
        assert_eq!(b.uint(0, 6), 0);
        let b = Bits::from_armored("W");
        assert_eq!(b.uint(0, 6), 39);
        let b = Bits::from_armored("`");
        assert_eq!(b.uint(0, 6), 40);
        let b = Bits::from_armored("w");
        assert_eq!(b.uint(0, 6), 63);
    }

    #[test]
    fn test_uint_spans_characters() {
        // "15" -> 000001 000101
        let b = Bits::from_armored("15");
        assert_eq!(b.len(), 12);
        assert_eq!(b.uint(0, 6), 1);
        assert_eq!(b.uint(6, 12), 5);
        assert_eq!(b.uint(0, 12), 69);
    }

    #[test]
    fn test_signed_negative() {
        let b = Bits::from_armored("W"); // 100111
        assert_eq!(b.int(0, 4), -7); // 1001 in 4-bit two's complement
        assert_eq!(b.int(2, 6), 7); // 0111
        let b = Bits::from_armored("w"); // 111111
        assert_eq!(b.int(0, 6), -1);
    }

    #[test]
    fn test_clamped_out_of_range() {
        let b = Bits::from_armored("1");
        assert_eq!(b.uint(4, 20), 1); // clamps to [4, 6) = 01
        assert_eq!(b.uint(10, 20), 0);
        assert_eq!(b.int(10, 20), 0);
        assert!(!b.flag(99));
        assert_eq!(b.text(6, 60), "");
    }

    #[test]
    fn test_sixbit_text() {
        // 'A' is code 1 (000001), '@' is code 0 and drops
        let mut armored = String::new();
        // code 1 three times -> "AAA": armored char for 000001 is '1'
        armored.push('1');
        armored.push('1');
        armored.push('1');
        let b = Bits::from_armored(&armored);
        assert_eq!(b.text(0, 18), "AAA");
        // all-zero payload is all '@', decodes empty
        let b = Bits::from_armored("000");
        assert_eq!(b.text(0, 18), "");
    }
}
