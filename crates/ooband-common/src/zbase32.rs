// ============================================
// File: crates/ooband-common/src/zbase32.rs
// ============================================
//! # z-base-32
//!
//! Human-oriented base-32 encoding (lowercase, no padding). Every output
//! character is valid inside a DNS label, which is why identifiers use it.
//!
//! Bits are consumed most-significant first; a trailing partial quintet
//! is padded with zero bits, so `n` bytes encode to `ceil(8n / 5)` chars.
//! The codec itself is a `data-encoding` specification; this module only
//! fixes the alphabet and the error type.

use data_encoding::Encoding;
use data_encoding_macro::new_encoding;

use crate::error::{CommonError, Result};

/// The z-base-32 alphabet.
pub const ALPHABET: &[u8; 32] = b"ybndrfg8ejkmcpqxot1uwisza345h769";

/// z-base-32 codec. Uppercase input decodes like lowercase.
const ZBASE32: Encoding = new_encoding! {
    symbols: "ybndrfg8ejkmcpqxot1uwisza345h769",
    translate_from: "YBNDRFGEJKMCPQXOTUWISZAH",
    translate_to: "ybndrfgejkmcpqxotuwiszah",
    check_trailing_bits: false,
};

/// Returns the number of characters `len` bytes encode to.
///
/// `const` so identifier layouts can size their labels at compile time.
#[must_use]
pub const fn encoded_len(len: usize) -> usize {
    (len * 8 + 4) / 5
}

/// Encodes `data` as z-base-32.
#[must_use]
pub fn encode(data: &[u8]) -> String {
    ZBASE32.encode(data)
}

/// Decodes a z-base-32 string.
///
/// Trailing pad bits that do not complete a byte are dropped.
///
/// # Errors
/// Returns `CommonError::Decoding` on a character outside the alphabet or
/// a length no byte string encodes to.
pub fn decode(input: &str) -> Result<Vec<u8>> {
    ZBASE32
        .decode(input.as_bytes())
        .map_err(|e| CommonError::Decoding {
            context: "z-base-32".into(),
            details: e.to_string(),
        })
}

/// Returns `true` if every character of `input` is in the alphabet.
#[must_use]
pub fn is_valid(input: &str) -> bool {
    input.bytes().all(|b| ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_lengths() {
        assert_eq!(encoded_len(7), 12);
        assert_eq!(encoded_len(8), 13);
        assert_eq!(encoded_len(12), 20);
        assert_eq!(encode(&[0u8; 7]).len(), 12);
        assert_eq!(encode(&[0u8; 8]).len(), 13);
        assert_eq!(encode(&[0u8; 12]).len(), 20);
        for len in 0..40 {
            assert_eq!(encoded_len(len), ZBASE32.encode_len(len), "{len} bytes");
        }
    }

    #[test]
    fn test_known_values() {
        assert_eq!(encode(&[]), "");
        assert_eq!(encode(&[0x00]), "yy");
        assert_eq!(encode(&[0xFF]), "9h");
        assert_eq!(encode(&[0xF0, 0xBF, 0xC7]), "6n9hq");
    }

    #[test]
    fn test_decode_recovers_bytes() {
        let data = [0x5A, 0x01, 0xC3, 0x99, 0xFE, 0x10, 0x42];
        let encoded = encode(&data);
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_decode_accepts_uppercase() {
        let encoded = encode(&[0xF0, 0xBF, 0xC7]);
        assert_eq!(decode(&encoded.to_ascii_uppercase()).unwrap(), [0xF0, 0xBF, 0xC7]);
    }

    #[test]
    fn test_codec_alphabet_matches_constant() {
        assert_eq!(ZBASE32.specification().symbols.as_bytes(), ALPHABET);
    }

    #[test]
    fn test_decode_rejects_foreign_characters() {
        assert!(decode("ybnd0").is_err());
        assert!(decode("ybnd-").is_err());
    }

    #[test]
    fn test_output_is_label_safe() {
        let encoded = encode(&[0xAB; 32]);
        assert!(is_valid(&encoded));
        assert!(encoded.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
    }
}
