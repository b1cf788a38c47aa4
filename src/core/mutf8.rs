//! Modified UTF-8, the string encoding of class-file `Utf8` constants.
//!
//! Differs from standard UTF-8 in two places: NUL is written as the two-byte
//! sequence `C0 80`, and characters outside the BMP are written as a UTF-16
//! surrogate pair with each half encoded as a three-byte sequence.

pub fn encode(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    let mut units = [0u16; 2];
    for c in s.chars() {
        for &unit in c.encode_utf16(&mut units).iter() {
            push_unit(&mut out, unit);
        }
    }
    out
}

fn push_unit(out: &mut Vec<u8>, unit: u16) {
    match unit {
        0x0001..=0x007F => out.push(unit as u8),
        0x0000 | 0x0080..=0x07FF => {
            out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
            out.push(0x80 | (unit & 0x3F) as u8);
        }
        _ => {
            out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
            out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
            out.push(0x80 | (unit & 0x3F) as u8);
        }
    }
}

/// Returns `None` on truncated sequences, invalid lead bytes or unpaired
/// surrogates.
pub fn decode(bytes: &[u8]) -> Option<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            0x01..=0x7F => {
                units.push(b as u16);
                i += 1;
            }
            0xC0..=0xDF => {
                let b2 = continuation(bytes, i + 1)?;
                units.push((((b & 0x1F) as u16) << 6) | b2);
                i += 2;
            }
            0xE0..=0xEF => {
                let b2 = continuation(bytes, i + 1)?;
                let b3 = continuation(bytes, i + 2)?;
                units.push((((b & 0x0F) as u16) << 12) | (b2 << 6) | b3);
                i += 3;
            }
            _ => return None,
        }
    }
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

fn continuation(bytes: &[u8], at: usize) -> Option<u16> {
    match bytes.get(at) {
        Some(&b) if b & 0xC0 == 0x80 => Some((b & 0x3F) as u16),
        _ => None,
    }
}
