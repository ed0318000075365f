//! Intake API key generation and validation.

use anyhow::Result;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Prefix for intake API keys.
pub const KEY_PREFIX: &str = "lk_";

/// Random portion of the key, in bytes (hex-encoded it is twice as long).
const KEY_RANDOM_BYTES: usize = 24;

/// Characters of the key kept in clear for display: prefix plus 8.
const DISPLAY_PREFIX_LEN: usize = 11;

/// Generate a new API key.
///
/// Returns (full_key, key_hash, key_prefix). Only the hash is stored; the
/// full key is shown to the user once.
pub fn generate_api_key() -> (String, String, String) {
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..KEY_RANDOM_BYTES).map(|_| rng.gen()).collect();

    let full_key = format!("{}{}", KEY_PREFIX, hex::encode(&random_bytes));
    let key_hash = hash_key(&full_key);
    let key_prefix = full_key.chars().take(DISPLAY_PREFIX_LEN).collect();

    (full_key, key_hash, key_prefix)
}

pub fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check prefix, length and hex body before touching the database.
pub fn validate_key_format(key: &str) -> Result<()> {
    let Some(random_part) = key.strip_prefix(KEY_PREFIX) else {
        anyhow::bail!("Invalid key format: must start with '{}'", KEY_PREFIX);
    };

    if random_part.len() != KEY_RANDOM_BYTES * 2 {
        anyhow::bail!(
            "Invalid key format: expected {} characters, got {}",
            KEY_PREFIX.len() + KEY_RANDOM_BYTES * 2,
            key.len()
        );
    }

    if !random_part.chars().all(|c| c.is_ascii_hexdigit()) {
        anyhow::bail!("Invalid key format: contains non-hex characters");
    }

    Ok(())
}
