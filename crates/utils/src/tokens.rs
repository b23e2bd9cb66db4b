use rand::RngCore;
use sha2::{Digest, Sha256};

/// Byte length of a raw invite token before hex encoding.
const TOKEN_BYTES: usize = 32;

/// Generate a high-entropy invite token. The raw value is handed to the
/// caller exactly once; only its hash may be stored.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// One-way hash of a raw token, the only form that is persisted.
pub fn hash_token(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_is_stable_and_distinct_from_raw() {
        let raw = generate_token();
        let h1 = hash_token(&raw);
        let h2 = hash_token(&raw);
        assert_eq!(h1, h2);
        assert_ne!(h1, raw);
        assert_eq!(h1.len(), 64);
    }
}
