//! Case-flip transcoding
//!
//! The no-formatting-options path: every ASCII letter in a block is
//! replaced by its upside-down glyph, everything else is copied
//! verbatim. Output length is not known until the block is scanned, so
//! the block is processed in two passes: the first sums the per-byte
//! lengths to size the allocation exactly, the second materializes the
//! sequences.

use crate::glyph::{lookup, EncodingError};

/// Exact output length for `input` under the case-flip transform.
pub fn output_len(input: &[u8]) -> Result<usize, EncodingError> {
    let mut len = 0;
    for &byte in input {
        len += match lookup(byte)? {
            Some(seq) => seq.len(),
            None => 1,
        };
    }
    Ok(len)
}

/// Transcode one input block into a freshly sized output block.
///
/// The result is the concatenation, in input order, of each byte's
/// looked-up sequence. Every output unit is self-contained, so blocks
/// can be cut anywhere without carry-over between calls.
pub fn flip_block(input: &[u8]) -> Result<Vec<u8>, EncodingError> {
    let len = output_len(input)?;
    let mut out = Vec::with_capacity(len);
    for &byte in input {
        match lookup(byte)? {
            Some(seq) => out.extend_from_slice(seq),
            None => out.push(byte),
        }
    }
    debug_assert_eq!(out.len(), len);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_letter_lengths_match_table() {
        for letter in b'a'..=b'z' {
            let expected = lookup(letter).unwrap().unwrap().len();
            assert_eq!(flip_block(&[letter]).unwrap().len(), expected);
        }
        for letter in b'A'..=b'Z' {
            let expected = lookup(letter).unwrap().unwrap().len();
            assert_eq!(flip_block(&[letter]).unwrap().len(), expected);
        }
    }

    #[test]
    fn test_non_letter_bytes_map_to_themselves() {
        let input: Vec<u8> = (0u8..=255)
            .filter(|b| !b.is_ascii_alphabetic())
            .collect();
        assert_eq!(flip_block(&input).unwrap(), input);
    }

    #[test]
    fn test_flip_hello() {
        // h e l l o -> latin small letters turned h, e, esh, esh, o
        assert_eq!(flip_block(b"hello").unwrap(), "ɥǝʃʃo".as_bytes());
    }

    #[test]
    fn test_flip_mixed_case() {
        assert_eq!(
            flip_block(b"AbC").unwrap(),
            [0xe2, 0x88, 0x80, 0x71, 0xe2, 0x86, 0x83]
        );
    }

    #[test]
    fn test_output_len_matches_flip_block() {
        let input = b"The quick brown fox: 42!\n";
        assert_eq!(
            output_len(input).unwrap(),
            flip_block(input).unwrap().len()
        );
    }

    #[test]
    fn test_multibyte_input_passes_through_unchanged() {
        let input = "naïve résumé — ☃".as_bytes();
        let out = flip_block(input).unwrap();
        // The ASCII letters flip, the multibyte sequences survive intact.
        let expected: Vec<u8> = input
            .iter()
            .flat_map(|&b| match lookup(b).unwrap() {
                Some(seq) => seq.to_vec(),
                None => vec![b],
            })
            .collect();
        assert_eq!(out, expected);
        assert!(out.windows(3).any(|w| w == "☃".as_bytes()));
    }

    #[test]
    fn test_empty_block() {
        assert_eq!(flip_block(b"").unwrap(), b"");
    }
}
