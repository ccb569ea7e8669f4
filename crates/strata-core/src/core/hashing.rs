// crates/strata-core/src/core/hashing.rs
// ============================================================================
// Module: Strata Content Hashing
// Description: SHA-256 content hashing for immutable store inputs.
// Purpose: Derive stable object identifiers from raw payload bytes.
// Dependencies: sha2
// ============================================================================

//! ## Overview
//! Immutable inputs (menus and configurations without an embedded id, and
//! files already on disk) are addressed by the lowercase hex SHA-256 digest of
//! their bytes. Identical bytes always hash to the same id; the store resolves
//! the resulting collisions with a duplicate suffix.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;

use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Buffer size used when hashing streams.
const HASH_CHUNK_BYTES: usize = 64 * 1024;

/// Hashes raw bytes and returns the lowercase hex digest.
#[must_use]
pub fn hash_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

/// Hashes a reader to exhaustion and returns the lowercase hex digest.
///
/// # Errors
///
/// Returns the underlying I/O error when reading fails.
pub fn hash_reader<R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0_u8; HASH_CHUNK_BYTES];
    loop {
        let read = reader.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[.. read]);
    }
    Ok(hex_encode(&hasher.finalize()))
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}
