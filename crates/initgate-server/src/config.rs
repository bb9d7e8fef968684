//! Gate configuration
//!
//! Everything is read from the environment once at startup. Missing or
//! invalid values are fatal there and nowhere else.

use initgate_core::{FreshnessPolicy, SecretError, VerificationSecret};
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

use crate::core::ReplayPolicy;

/// Upper bound on replay retention (30 days)
pub const MAX_RETENTION_SECS: u64 = 30 * 24 * 60 * 60;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_PRUNE_INTERVAL_SECS: u64 = 60;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 2000;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("BOT_TOKEN is unusable: {0}")]
    Secret(#[from] SecretError),

    #[error("REPLAY_RETENTION_SECS ({retention}) is shorter than max age plus skew plus one ({minimum})")]
    RetentionTooShort { retention: u64, minimum: u64 },

    #[error("REPLAY_STORE_URL selects postgres but the postgres feature is not enabled")]
    PostgresDisabled,
}

/// Where replay records live
#[derive(Clone, PartialEq, Eq)]
pub enum StoreTarget {
    /// Process-local store (`memory://`)
    Memory,
    /// PostgreSQL connection string
    Postgres(String),
}

impl std::fmt::Debug for StoreTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreTarget::Memory => f.write_str("Memory"),
            // Connection strings carry credentials
            StoreTarget::Postgres(_) => f.write_str("Postgres([redacted])"),
        }
    }
}

impl StoreTarget {
    fn parse(url: &str) -> Result<Self, ConfigError> {
        if url == "memory" || url.starts_with("memory://") {
            Ok(StoreTarget::Memory)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            if cfg!(feature = "postgres") {
                Ok(StoreTarget::Postgres(url.to_string()))
            } else {
                Err(ConfigError::PostgresDisabled)
            }
        } else {
            Err(ConfigError::Invalid {
                var: "REPLAY_STORE_URL",
                reason: "expected memory:// or postgres://".into(),
            })
        }
    }
}

/// Gate configuration
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Derived verification secret; the raw token is not retained
    pub secret: VerificationSecret,
    pub store: StoreTarget,
    pub freshness: FreshnessPolicy,
    pub replay: ReplayPolicy,
    pub prune_interval: Duration,
    pub port: u16,
    pub log_level: Level,
}

impl GateConfig {
    /// Load from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("BOT_TOKEN")
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::Missing("BOT_TOKEN"))?;
        let secret = VerificationSecret::from_bot_token(token.trim())?;

        let store_url = lookup("REPLAY_STORE_URL")
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::Missing("REPLAY_STORE_URL"))?;
        let store = StoreTarget::parse(&store_url)?;

        let defaults = FreshnessPolicy::default();
        let freshness = FreshnessPolicy::new(
            parse_or(&lookup, "INITDATA_MAX_AGE_SECS", defaults.max_age_secs)?,
            parse_or(&lookup, "INITDATA_MAX_FUTURE_SKEW_SECS", defaults.max_future_skew_secs)?,
        );

        let minimum = freshness.min_replay_retention_secs();
        let retention = parse_or(&lookup, "REPLAY_RETENTION_SECS", minimum)?;
        if retention < minimum {
            return Err(ConfigError::RetentionTooShort { retention, minimum });
        }
        if retention > MAX_RETENTION_SECS {
            return Err(ConfigError::Invalid {
                var: "REPLAY_RETENTION_SECS",
                reason: format!("must not exceed {}", MAX_RETENTION_SECS),
            });
        }

        let store_timeout_ms = parse_or(&lookup, "REPLAY_STORE_TIMEOUT_MS", DEFAULT_STORE_TIMEOUT_MS)?;
        if store_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "REPLAY_STORE_TIMEOUT_MS",
                reason: "must be positive".into(),
            });
        }

        let prune_interval_secs =
            parse_or(&lookup, "REPLAY_PRUNE_INTERVAL_SECS", DEFAULT_PRUNE_INTERVAL_SECS)?;
        if prune_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "REPLAY_PRUNE_INTERVAL_SECS",
                reason: "must be positive".into(),
            });
        }

        let port = parse_or(&lookup, "INITGATE_PORT", DEFAULT_PORT)?;
        let log_level = parse_or(&lookup, "INITGATE_LOG_LEVEL", Level::INFO)?;

        Ok(Self {
            secret,
            store,
            freshness,
            replay: ReplayPolicy::new(retention, Duration::from_millis(store_timeout_ms)),
            prune_interval: Duration::from_secs(prune_interval_secs),
            port,
            log_level,
        })
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
    }
}
