//! Modified UTF-8, the string encoding used by `CONSTANT_Utf8` entries.
//!
//! It differs from standard UTF-8 in two ways: NUL is written as the two
//! bytes `C0 80`, and supplementary characters are written as a surrogate
//! pair with each half encoded as three bytes. Pool entries keep their raw
//! bytes; these helpers only run when a string is looked at or added.

use std::borrow::Cow;

/// Decodes raw pool bytes. Ill-formed sequences become U+FFFD.
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    // Standard UTF-8 rejects both special forms, so anything it accepts is
    // already the correct text.
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Cow::Borrowed(text);
    }

    let mut units = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter().copied();
    while let Some(a) = iter.next() {
        let unit = if a & 0x80 == 0 {
            Some(a as u16)
        } else if a & 0xe0 == 0xc0 {
            iter.next()
                .filter(|b| b & 0xc0 == 0x80)
                .map(|b| ((a as u16 & 0x1f) << 6) | (b as u16 & 0x3f))
        } else if a & 0xf0 == 0xe0 {
            match (iter.next(), iter.next()) {
                (Some(b), Some(c)) if b & 0xc0 == 0x80 && c & 0xc0 == 0x80 => Some(
                    ((a as u16 & 0x0f) << 12) | ((b as u16 & 0x3f) << 6) | (c as u16 & 0x3f),
                ),
                _ => None,
            }
        } else {
            None
        };
        units.push(unit.unwrap_or(0xfffd));
    }

    Cow::Owned(String::from_utf16_lossy(&units))
}

/// Encodes text the way it must appear inside the pool.
pub fn encode(text: &str) -> Cow<'_, [u8]> {
    if !text.bytes().any(|b| b == 0) && text.chars().all(|c| (c as u32) < 0x10000) {
        return Cow::Borrowed(text.as_bytes());
    }

    let mut out = Vec::with_capacity(text.len() + 8);
    for unit in text.encode_utf16() {
        match unit {
            1..=0x7f => out.push(unit as u8),
            0 | 0x80..=0x7ff => {
                out.push(0xc0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
            _ => {
                out.push(0xe0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3f) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
        }
    }
    Cow::Owned(out)
}
