//! Replay digest of a raw init-data blob

use sha2::{Digest, Sha256};

/// SHA-256 of the raw blob bytes, as received (not of the parsed fields)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplayDigest([u8; 32]);

impl ReplayDigest {
    /// Digest a raw init-data string
    pub fn of(raw: &str) -> Self {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&Sha256::digest(raw.as_bytes()));
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex digits, for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl std::fmt::Debug for ReplayDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReplayDigest({}…)", self.short())
    }
}

impl std::fmt::Display for ReplayDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_of_raw_bytes() {
        let digest = ReplayDigest::of("");
        assert_eq!(
            digest.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(digest.short(), "e3b0c442");
    }

    #[test]
    fn test_encoding_differences_give_distinct_digests() {
        // Same decoded fields, different raw bytes
        assert_ne!(ReplayDigest::of("a=x+y&hash=00"), ReplayDigest::of("a=x%20y&hash=00"));
    }
}
