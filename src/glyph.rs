//! Upside-down glyph lookup tables
//!
//! Each ASCII letter maps to a fixed-capacity slot holding the UTF-8
//! sequence of a lookalike "flipped" character. Slots are left-justified
//! and padded with `0xFF` filler bytes; the real sequence length is
//! derived by classifying the slot's own lead byte, never stored.

/// Filler byte marking unused trailing slot cells. Must never be copied
/// to the output.
pub const SLOT_FILLER: u8 = 0xFF;

/// Flipped glyphs for `a`-`z`, two bytes per slot.
const LOWERCASE: [[u8; 2]; 26] = [
    [0xc9, 0x90], // a
    [0x71, 0xff], // b (q)
    [0xc9, 0x94], // c
    [0x70, 0xff], // d (p)
    [0xc7, 0x9d], // e
    [0xc9, 0x9f], // f
    [0xc6, 0x83], // g
    [0xc9, 0xa5], // h
    [0xc4, 0xb1], // i
    [0xc9, 0xbe], // j
    [0xca, 0x9e], // k
    [0xca, 0x83], // l
    [0xc9, 0xaf], // m
    [0x75, 0xff], // n (u)
    [0x6f, 0xff], // o (o)
    [0x64, 0xff], // p (d)
    [0x62, 0xff], // q (b)
    [0xc9, 0xb9], // r
    [0x73, 0xff], // s (s)
    [0xca, 0x87], // t
    [0x6e, 0xff], // u (n)
    [0xca, 0x8c], // v
    [0xca, 0x8d], // w
    [0x78, 0xff], // x
    [0xca, 0x8e], // y
    [0x7a, 0xff], // z
];

/// Flipped glyphs for `A`-`Z`, four bytes per slot.
const UPPERCASE: [[u8; 4]; 26] = [
    [0xe2, 0x88, 0x80, 0xff], // A
    [0xf0, 0x90, 0x90, 0x92], // B
    [0xe2, 0x86, 0x83, 0xff], // C
    [0xe2, 0x97, 0x96, 0xff], // D
    [0xc6, 0x8e, 0xff, 0xff], // E
    [0xe2, 0x84, 0xb2, 0xff], // F
    [0xe2, 0x85, 0x81, 0xff], // G
    [0x48, 0xff, 0xff, 0xff], // H
    [0x49, 0xff, 0xff, 0xff], // I
    [0xc5, 0xbf, 0xff, 0xff], // J
    [0xe2, 0x8b, 0x8a, 0xff], // K
    [0xe2, 0x85, 0x82, 0xff], // L
    [0x57, 0xff, 0xff, 0xff], // M
    [0xe1, 0xb4, 0x8e, 0xff], // N
    [0x4f, 0xff, 0xff, 0xff], // O
    [0xd4, 0x80, 0xff, 0xff], // P
    [0xce, 0x8c, 0xff, 0xff], // Q
    [0xe1, 0xb4, 0x9a, 0xff], // R
    [0x53, 0xff, 0xff, 0xff], // S
    [0xe2, 0x8a, 0xa5, 0xff], // T
    [0xe2, 0x88, 0xa9, 0xff], // U
    [0xe1, 0xb4, 0xa7, 0xff], // V
    [0x4d, 0xff, 0xff, 0xff], // W
    [0x58, 0xff, 0xff, 0xff], // X
    [0xe2, 0x85, 0x84, 0xff], // Y
    [0x5a, 0xff, 0xff, 0xff], // Z
];

/// Error for a byte that cannot start a UTF-8 sequence: a bare
/// continuation byte or an obsolete 5/6-byte lead. Fatal for the run,
/// since it means a glyph slot is corrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingError {
    /// The offending lead byte.
    pub byte: u8,
}

impl std::fmt::Display for EncodingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unexpected UTF-8 encoding (lead byte 0x{:02x})", self.byte)
    }
}

impl std::error::Error for EncodingError {}

/// Determine the size of a UTF-8 character by inspecting its first byte.
pub fn char_size(lead: u8) -> Result<usize, EncodingError> {
    if lead & 0b1000_0000 == 0 {
        Ok(1)
    } else if lead & 0b1110_0000 == 0b1100_0000 {
        Ok(2)
    } else if lead & 0b1111_0000 == 0b1110_0000 {
        Ok(3)
    } else if lead & 0b1111_1000 == 0b1111_0000 {
        Ok(4)
    } else {
        Err(EncodingError { byte: lead })
    }
}

/// Resolve the output sequence for one input byte.
///
/// Letters return their flipped glyph with the filler bytes trimmed off;
/// every other byte maps to itself (`None`), length one. Bytes of
/// pre-existing multibyte sequences are therefore passed through
/// unchanged, byte for byte, with no re-encoding.
pub fn lookup(byte: u8) -> Result<Option<&'static [u8]>, EncodingError> {
    let slot: &'static [u8] = match byte {
        b'a'..=b'z' => &LOWERCASE[(byte - b'a') as usize],
        b'A'..=b'Z' => &UPPERCASE[(byte - b'A') as usize],
        _ => return Ok(None),
    };
    let len = char_size(slot[0])?;
    Ok(Some(&slot[..len]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph(byte: u8) -> &'static [u8] {
        lookup(byte).unwrap().expect("letter must have a glyph")
    }

    #[test]
    fn test_char_size_classification() {
        assert_eq!(char_size(b'x'), Ok(1));
        assert_eq!(char_size(0xc9), Ok(2));
        assert_eq!(char_size(0xe2), Ok(3));
        assert_eq!(char_size(0xf0), Ok(4));
    }

    #[test]
    fn test_char_size_rejects_continuation_byte() {
        assert_eq!(char_size(0x90), Err(EncodingError { byte: 0x90 }));
    }

    #[test]
    fn test_char_size_rejects_obsolete_long_leads() {
        // 5-byte (111110xx) and 6-byte (1111110x) leads.
        assert!(char_size(0xf8).is_err());
        assert!(char_size(0xfc).is_err());
        assert!(char_size(0xff).is_err());
    }

    #[test]
    fn test_lowercase_slot_lengths_match_lead_byte() {
        for letter in b'a'..=b'z' {
            let seq = glyph(letter);
            assert_eq!(seq.len(), char_size(seq[0]).unwrap());
            assert!(seq.len() <= 2);
        }
    }

    #[test]
    fn test_uppercase_slot_lengths_match_lead_byte() {
        for letter in b'A'..=b'Z' {
            let seq = glyph(letter);
            assert_eq!(seq.len(), char_size(seq[0]).unwrap());
            assert!(seq.len() <= 4);
        }
    }

    #[test]
    fn test_filler_never_part_of_a_glyph() {
        for letter in (b'a'..=b'z').chain(b'A'..=b'Z') {
            assert!(!glyph(letter).contains(&SLOT_FILLER));
        }
    }

    #[test]
    fn test_every_glyph_is_valid_utf8() {
        for letter in (b'a'..=b'z').chain(b'A'..=b'Z') {
            assert!(std::str::from_utf8(glyph(letter)).is_ok());
        }
    }

    #[test]
    fn test_ascii_flips_to_ascii_where_a_lookalike_exists() {
        assert_eq!(glyph(b'b'), b"q");
        assert_eq!(glyph(b'n'), b"u");
        assert_eq!(glyph(b'M'), b"W");
        assert_eq!(glyph(b'o'), b"o");
    }

    #[test]
    fn test_non_letters_pass_through() {
        for byte in [b'0', b' ', b'\n', b'\t', 0x00, 0x7f, 0x80, 0xc9, 0xff] {
            assert_eq!(lookup(byte).unwrap(), None);
        }
    }
}
