//! Stable violation identities for baseline diffing
//!
//! A fingerprint is the first 8 bytes of a SHA-256 digest over the trimmed
//! `(rule_id, file_path, symbol)` triple, rendered as 16 lowercase hex
//! characters. Fields are joined with a NUL byte, which never occurs in rule
//! ids, paths or symbol names, so `("ab", "c")` and `("a", "bc")` hash
//! differently.

use sha2::{Digest, Sha256};

pub const FINGERPRINT_LEN: usize = 16;

const FIELD_SEPARATOR: u8 = 0x00;

pub fn generate_fingerprint(rule_id: &str, file_path: &str, symbol: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(rule_id.trim().as_bytes());
    hasher.update([FIELD_SEPARATOR]);
    hasher.update(file_path.trim().as_bytes());
    hasher.update([FIELD_SEPARATOR]);
    hasher.update(symbol.trim().as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..FINGERPRINT_LEN / 2])
}

/// Whether `value` has the shape of a fingerprint produced by this module
pub fn is_valid_fingerprint(value: &str) -> bool {
    value.len() == FINGERPRINT_LEN
        && value.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
