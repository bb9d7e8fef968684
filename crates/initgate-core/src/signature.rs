//! Keyed-hash signature verification
//!
//! The verification key is `HMAC-SHA256(key = "WebAppData", msg = bot_token)`
//! and the expected signature is `hex(HMAC-SHA256(key, check_string))`.
//! The key is derived once and held by [`VerificationSecret`].

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::canonical::CheckString;
use crate::error::{Rejection, Result, SecretError};

type HmacSha256 = Hmac<Sha256>;

/// Domain-separation label for deriving the verification key
pub const SECRET_DERIVATION_LABEL: &[u8] = b"WebAppData";

/// Length of a hex-encoded HMAC-SHA256 signature
pub const SIGNATURE_HEX_LEN: usize = 64;

/// Derived verification key
///
/// Immutable after construction and wiped on drop. `Debug` shows only a
/// fingerprint (a hash prefix of the key), never key bytes.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct VerificationSecret {
    key: [u8; 32],
}

impl std::fmt::Debug for VerificationSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationSecret")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

impl VerificationSecret {
    /// Derive the verification key from a platform bot token
    ///
    /// Deriving twice from the same token yields the same key.
    pub fn from_bot_token(bot_token: &str) -> std::result::Result<Self, SecretError> {
        if bot_token.is_empty() {
            return Err(SecretError::EmptyToken);
        }
        if bot_token.chars().any(char::is_whitespace) {
            return Err(SecretError::Whitespace);
        }

        let key = hmac_sha256(SECRET_DERIVATION_LABEL, bot_token.as_bytes())
            .map_err(|_| SecretError::EmptyToken)?;
        Ok(Self { key })
    }

    /// Wrap an already-derived key
    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Short identifier safe for logs: first 8 hex digits of SHA-256(key)
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.key);
        format!("{}…", &hex::encode(digest)[..8])
    }

    /// Compute the lowercase hex signature of a check string
    pub fn sign(&self, check: &CheckString) -> Result<String> {
        Ok(hex::encode(self.mac(check)?))
    }

    /// Check a supplied hex signature against a check string
    ///
    /// # Errors
    /// * `CryptoError` if `supplied_hex` is not exactly 64 hex digits
    /// * `SignatureMismatch` if it decodes but does not match
    pub fn verify(&self, check: &CheckString, supplied_hex: &str) -> Result<()> {
        if supplied_hex.len() != SIGNATURE_HEX_LEN {
            return Err(Rejection::CryptoError(format!(
                "expected {} hex digits, got {}",
                SIGNATURE_HEX_LEN,
                supplied_hex.len()
            )));
        }

        let supplied = hex::decode(supplied_hex)
            .map_err(|_| Rejection::CryptoError("signature is not hex".into()))?;

        let computed = self.mac(check)?;

        if bool::from(computed.as_slice().ct_eq(supplied.as_slice())) {
            Ok(())
        } else {
            Err(Rejection::SignatureMismatch)
        }
    }

    fn mac(&self, check: &CheckString) -> Result<[u8; 32]> {
        hmac_sha256(&self.key, check.as_bytes())
            .map_err(|_| Rejection::CryptoError("keyed hash unavailable".into()))
    }
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> std::result::Result<[u8; 32], hmac::digest::InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(key)?;
    mac.update(message);
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}
