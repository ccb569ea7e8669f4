// crates/strata-providers/src/ebcdic.rs
// ============================================================================
// Module: EBCDIC Codec
// Description: Code page 500 translation and signed overpunch numerics.
// Purpose: Encode and decode fixed-width mainframe records.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Code page 500 is a bijection between the 256 EBCDIC byte values and the
//! 256 Latin-1 code points, so both directions are plain table lookups. The
//! optional LF swap exchanges the mappings of EBCDIC `0x15` (NEL) and `0x25`
//! (LF) for files written by systems that treat NEL as the line feed.
//!
//! Signed integers use zoned overpunch: the sign is folded into the last
//! digit, `{` and `a`..`i` for positive digits `0`..`9` and `j`..`s` for
//! negative ones. Unsigned integers are plain zero-padded digits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use strata_core::ComponentError;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Codec failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A character has no code page 500 byte.
    #[error("character U+{0:04X} cannot be encoded in cp500")]
    Unencodable(u32),
    /// A numeric field holds something other than digits.
    #[error("invalid numeric field '{0}'")]
    InvalidDigits(String),
    /// A value needs more digits than the field holds.
    #[error("value {value} does not fit in {width} digits")]
    Overflow {
        /// Rendered value.
        value: String,
        /// Field width.
        width: usize,
    },
}

impl From<CodecError> for ComponentError {
    fn from(err: CodecError) -> Self {
        Self::Input(err.to_string())
    }
}

// ============================================================================
// SECTION: Tables
// ============================================================================

/// EBCDIC byte to Latin-1 code point.
pub const CP500_TO_LATIN1: [u8; 256] = [
    0x00, 0x01, 0x02, 0x03, 0x9C, 0x09, 0x86, 0x7F, 0x97, 0x8D, 0x8E, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
    0x10, 0x11, 0x12, 0x13, 0x9D, 0x85, 0x08, 0x87, 0x18, 0x19, 0x92, 0x8F, 0x1C, 0x1D, 0x1E, 0x1F,
    0x80, 0x81, 0x82, 0x83, 0x84, 0x0A, 0x17, 0x1B, 0x88, 0x89, 0x8A, 0x8B, 0x8C, 0x05, 0x06, 0x07,
    0x90, 0x91, 0x16, 0x93, 0x94, 0x95, 0x96, 0x04, 0x98, 0x99, 0x9A, 0x9B, 0x14, 0x15, 0x9E, 0x1A,
    0x20, 0xA0, 0xE2, 0xE4, 0xE0, 0xE1, 0xE3, 0xE5, 0xE7, 0xF1, 0x5B, 0x2E, 0x3C, 0x28, 0x2B, 0x21,
    0x26, 0xE9, 0xEA, 0xEB, 0xE8, 0xED, 0xEE, 0xEF, 0xEC, 0xDF, 0x5D, 0x24, 0x2A, 0x29, 0x3B, 0x5E,
    0x2D, 0x2F, 0xC2, 0xC4, 0xC0, 0xC1, 0xC3, 0xC5, 0xC7, 0xD1, 0xA6, 0x2C, 0x25, 0x5F, 0x3E, 0x3F,
    0xF8, 0xC9, 0xCA, 0xCB, 0xC8, 0xCD, 0xCE, 0xCF, 0xCC, 0x60, 0x3A, 0x23, 0x40, 0x27, 0x3D, 0x22,
    0xD8, 0x61, 0x62, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0xAB, 0xBB, 0xF0, 0xFD, 0xFE, 0xB1,
    0xB0, 0x6A, 0x6B, 0x6C, 0x6D, 0x6E, 0x6F, 0x70, 0x71, 0x72, 0xAA, 0xBA, 0xE6, 0xB8, 0xC6, 0xA4,
    0xB5, 0x7E, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A, 0xA1, 0xBF, 0xD0, 0xDD, 0xDE, 0xAE,
    0xA2, 0xA3, 0xA5, 0xB7, 0xA9, 0xA7, 0xB6, 0xBC, 0xBD, 0xBE, 0xAC, 0x7C, 0xAF, 0xA8, 0xB4, 0xD7,
    0x7B, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0xAD, 0xF4, 0xF6, 0xF2, 0xF3, 0xF5,
    0x7D, 0x4A, 0x4B, 0x4C, 0x4D, 0x4E, 0x4F, 0x50, 0x51, 0x52, 0xB9, 0xFB, 0xFC, 0xF9, 0xFA, 0xFF,
    0x5C, 0xF7, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0xB2, 0xD4, 0xD6, 0xD2, 0xD3, 0xD5,
    0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0xB3, 0xDB, 0xDC, 0xD9, 0xDA, 0x9F,
];

/// Latin-1 code point to EBCDIC byte.
pub const LATIN1_TO_CP500: [u8; 256] = invert(&CP500_TO_LATIN1);

/// EBCDIC NEL.
const EBCDIC_NEL: u8 = 0x15;
/// EBCDIC LF.
const EBCDIC_LF: u8 = 0x25;

/// Inverts a byte permutation.
#[allow(clippy::cast_possible_truncation, reason = "Indices stay below 256.")]
const fn invert(table: &[u8; 256]) -> [u8; 256] {
    let mut out = [0_u8; 256];
    let mut i = 0;
    while i < 256 {
        out[table[i] as usize] = i as u8;
        i += 1;
    }
    out
}

// ============================================================================
// SECTION: Codec
// ============================================================================

/// Code page 500 codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cp500 {
    /// Exchange NEL and LF.
    pub swap_lf: bool,
}

impl Cp500 {
    /// Creates a codec.
    #[must_use]
    pub const fn new(swap_lf: bool) -> Self {
        Self { swap_lf }
    }

    /// Decodes EBCDIC bytes to text.
    #[must_use]
    pub fn decode(&self, bytes: &[u8]) -> String {
        bytes.iter().map(|b| char::from(CP500_TO_LATIN1[usize::from(self.swap(*b))])).collect()
    }

    /// Encodes text to EBCDIC bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Unencodable`] for characters above U+00FF.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, CodecError> {
        text.chars()
            .map(|c| {
                let latin = u8::try_from(c).map_err(|_| CodecError::Unencodable(u32::from(c)))?;
                Ok(self.swap(LATIN1_TO_CP500[usize::from(latin)]))
            })
            .collect()
    }

    /// Applies the optional NEL/LF exchange.
    const fn swap(self, byte: u8) -> u8 {
        match byte {
            EBCDIC_NEL if self.swap_lf => EBCDIC_LF,
            EBCDIC_LF if self.swap_lf => EBCDIC_NEL,
            other => other,
        }
    }
}

// ============================================================================
// SECTION: Overpunch
// ============================================================================

/// Final characters of positive values, by digit.
const POSITIVE_PUNCH: [char; 10] = ['{', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i'];
/// Final characters of negative values, by digit.
const NEGATIVE_PUNCH: [char; 10] = ['j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's'];

/// Renders a signed value as a zero-padded overpunched field.
///
/// # Errors
///
/// Returns [`CodecError::Overflow`] when the digits exceed `width`.
pub fn encode_signed(value: i64, width: usize) -> Result<String, CodecError> {
    let digits = value.unsigned_abs().to_string();
    if digits.len() > width {
        return Err(CodecError::Overflow {
            value: value.to_string(),
            width,
        });
    }
    let table = if value < 0 { &NEGATIVE_PUNCH } else { &POSITIVE_PUNCH };
    let (head, last) = digits.split_at(digits.len() - 1);
    let digit = last.bytes().next().map_or(0, |b| usize::from(b - b'0'));
    let mut out = "0".repeat(width - digits.len());
    out.push_str(head);
    out.push(table[digit]);
    Ok(out)
}

/// Parses an overpunched field.
///
/// # Errors
///
/// Returns [`CodecError::InvalidDigits`] for anything but digits followed by
/// one punch character.
pub fn decode_signed(field: &str) -> Result<i64, CodecError> {
    let invalid = || CodecError::InvalidDigits(field.to_string());
    let trimmed = field.trim();
    let mut chars = trimmed.chars();
    let last = chars.next_back().ok_or_else(invalid)?;
    let head = chars.as_str();
    if !head.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let (digit, negative) = if let Some(d) = POSITIVE_PUNCH.iter().position(|c| *c == last) {
        (d, false)
    } else if let Some(d) = NEGATIVE_PUNCH.iter().position(|c| *c == last) {
        (d, true)
    } else {
        return Err(invalid());
    };
    let magnitude: i64 = format!("{head}{digit}").parse().map_err(|_| invalid())?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// Renders an unsigned value as a zero-padded field.
///
/// # Errors
///
/// Returns [`CodecError::Overflow`] when the digits exceed `width`.
pub fn encode_unsigned(value: u64, width: usize) -> Result<String, CodecError> {
    let digits = value.to_string();
    if digits.len() > width {
        return Err(CodecError::Overflow { value: digits, width });
    }
    Ok(format!("{digits:0>width$}"))
}

/// Parses a zero-padded unsigned field.
///
/// # Errors
///
/// Returns [`CodecError::InvalidDigits`] for non-digit content.
pub fn decode_unsigned(field: &str) -> Result<u64, CodecError> {
    let trimmed = field.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::InvalidDigits(field.to_string()));
    }
    trimmed.parse().map_err(|_| CodecError::InvalidDigits(field.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
