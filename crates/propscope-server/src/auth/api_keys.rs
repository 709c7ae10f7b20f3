use sha2::{Digest, Sha256};

/// Prefix every issued API key starts with.
pub const API_KEY_PREFIX: &str = "psk_";

/// Number of leading characters kept for display (`psk_` + 8 hex chars).
const DISPLAY_PREFIX_LEN: usize = 12;

/// A freshly issued key. `raw_key` is shown to the operator once and never
/// stored.
#[derive(Debug, Clone)]
pub struct GeneratedApiKey {
    pub raw_key: String,
    pub hash: String,
    pub prefix: String,
}

/// Generate a new API key: `psk_` + 32 random hex chars.
pub fn generate_api_key() -> GeneratedApiKey {
    use rand::RngCore;
    let mut buf = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut buf);

    let raw_key = format!("{API_KEY_PREFIX}{}", hex::encode(buf));
    let hash = hash_api_key(&raw_key);
    let prefix = raw_key.chars().take(DISPLAY_PREFIX_LEN).collect();

    GeneratedApiKey {
        raw_key,
        hash,
        prefix,
    }
}

/// Generate a key ID: "key_" + 10 random alphanumeric chars.
pub fn generate_key_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let chars: String = (0..10)
        .map(|_| {
            let idx = rng.gen_range(0..36u8);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect();
    format!("key_{chars}")
}

/// Hash an API key with SHA-256 (lowercase hex).
pub fn hash_api_key(raw_key: &str) -> String {
    hex::encode(Sha256::digest(raw_key.as_bytes()))
}
