//! Change-detection hashing of canonical embedding text.
//!
//! Not security-sensitive — the hash only has to make "did the text
//! change?" cheap to answer without storing the full previous text.

use sha2::{Digest, Sha256};

/// Hex-encoded sha256 of the canonical text.
pub fn text_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
