//! Error types for init-data verification

use thiserror::Error;

/// Result type alias using Rejection
pub type Result<T> = std::result::Result<T, Rejection>;

/// Pipeline stage a verification reached before it was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Nothing checked yet (parsing failed)
    Unverified,
    /// Fields decoded, signature not yet checked
    Parsed,
    /// Signature verified, freshness not yet checked
    SignatureValid,
    /// Within the freshness window, not yet admitted
    Fresh,
    /// Admitted by the replay guard (terminal accept)
    Admitted,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Unverified => "unverified",
            Stage::Parsed => "parsed",
            Stage::SignatureValid => "signature_valid",
            Stage::Fresh => "fresh",
            Stage::Admitted => "admitted",
        };
        f.write_str(name)
    }
}

/// Reasons init data can be rejected
///
/// Messages never carry the secret, the supplied signature, or raw field
/// values. Callers turn any of these into an authentication failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The `hash` field is absent or empty
    #[error("init data carries no hash")]
    MissingHash,

    /// Bad encoding, bad structure, or an unparseable claim
    #[error("malformed init data: {0}")]
    MalformedInput(String),

    /// Supplied signature is not 64 hex digits
    #[error("unusable signature: {0}")]
    CryptoError(String),

    /// Computed and supplied signatures differ
    #[error("signature mismatch")]
    SignatureMismatch,

    /// Issued longer ago than the freshness window allows
    #[error("init data is stale: issued {age_secs}s ago, window is {max_age_secs}s")]
    Stale { age_secs: u64, max_age_secs: u64 },

    /// Issued further in the future than the clock-skew tolerance allows
    #[error("init data issued {lead_secs}s in the future, tolerance is {tolerance_secs}s")]
    NotYetValid { lead_secs: u64, tolerance_secs: u64 },

    /// This exact blob has already been accepted once
    #[error("init data already processed")]
    AlreadyProcessed,

    /// The replay store could not be reached; fails closed
    #[error("replay store unavailable: {0}")]
    StorageUnavailable(String),
}

impl Rejection {
    /// Stage the pipeline had reached when this rejection was raised
    pub fn stage(&self) -> Stage {
        match self {
            Rejection::MissingHash | Rejection::MalformedInput(_) => Stage::Unverified,
            Rejection::CryptoError(_) | Rejection::SignatureMismatch => Stage::Parsed,
            Rejection::Stale { .. } | Rejection::NotYetValid { .. } => Stage::SignatureValid,
            Rejection::AlreadyProcessed | Rejection::StorageUnavailable(_) => Stage::Fresh,
        }
    }

    /// Only storage outages are worth retrying with the same blob
    pub fn is_retryable(&self) -> bool {
        matches!(self, Rejection::StorageUnavailable(_))
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::MissingHash => "MISSING_HASH",
            Rejection::MalformedInput(_) => "MALFORMED_INPUT",
            Rejection::CryptoError(_) => "CRYPTO_ERROR",
            Rejection::SignatureMismatch => "SIGNATURE_MISMATCH",
            Rejection::Stale { .. } => "STALE",
            Rejection::NotYetValid { .. } => "NOT_YET_VALID",
            Rejection::AlreadyProcessed => "ALREADY_PROCESSED",
            Rejection::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
        }
    }
}

impl From<serde_json::Error> for Rejection {
    fn from(err: serde_json::Error) -> Self {
        Rejection::MalformedInput(format!("user payload: {}", err))
    }
}

/// Errors deriving the verification secret at startup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecretError {
    #[error("bot token is empty")]
    EmptyToken,

    #[error("bot token contains whitespace")]
    Whitespace,
}
