//! Freshness gate
//!
//! Bounds how long a signed blob stays usable. The window is policy, set per
//! deployment. Boundaries are inclusive on both sides: an age of exactly
//! `max_age_secs` passes, as does a lead of exactly `max_future_skew_secs`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Rejection, Result};

/// Default freshness window (five minutes)
pub const DEFAULT_MAX_AGE_SECS: u64 = 300;

/// Default tolerance for client clocks running ahead
pub const DEFAULT_MAX_FUTURE_SKEW_SECS: u64 = 30;

/// Freshness policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessPolicy {
    /// Maximum accepted age, in seconds
    pub max_age_secs: u64,
    /// Maximum accepted lead of `auth_date` over server time, in seconds
    pub max_future_skew_secs: u64,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            max_future_skew_secs: DEFAULT_MAX_FUTURE_SKEW_SECS,
        }
    }
}

impl FreshnessPolicy {
    pub fn new(max_age_secs: u64, max_future_skew_secs: u64) -> Self {
        Self {
            max_age_secs,
            max_future_skew_secs,
        }
    }

    /// Shortest replay retention that keeps every acceptable blob recorded
    ///
    /// A blob is accepted from `auth_date - max_future_skew` until the last
    /// instant of second `auth_date + max_age`, since both bounds are
    /// inclusive and `now` is truncated to whole seconds. The extra second
    /// keeps the record alive past that instant.
    pub fn min_replay_retention_secs(&self) -> u64 {
        self.max_age_secs
            .saturating_add(self.max_future_skew_secs)
            .saturating_add(1)
    }

    /// Check an issuance time against `now` (both epoch seconds)
    pub fn check(&self, auth_date: i64, now: i64) -> Result<()> {
        let age = i128::from(now) - i128::from(auth_date);

        if age >= 0 {
            let age_secs = u64::try_from(age).unwrap_or(u64::MAX);
            if age_secs > self.max_age_secs {
                debug!(age_secs, max_age_secs = self.max_age_secs, "Init data stale");
                return Err(Rejection::Stale {
                    age_secs,
                    max_age_secs: self.max_age_secs,
                });
            }
        } else {
            let lead_secs = u64::try_from(-age).unwrap_or(u64::MAX);
            if lead_secs > self.max_future_skew_secs {
                debug!(
                    lead_secs,
                    tolerance_secs = self.max_future_skew_secs,
                    "Init data issued in the future"
                );
                return Err(Rejection::NotYetValid {
                    lead_secs,
                    tolerance_secs: self.max_future_skew_secs,
                });
            }
        }

        Ok(())
    }
}

/// Parse an `auth_date` value
///
/// Only plain decimal digits are accepted (no sign, no whitespace).
pub fn parse_auth_date(raw: &str) -> Result<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Rejection::MalformedInput(
            "auth_date is not a non-negative integer".into(),
        ));
    }

    raw.parse::<u64>()
        .ok()
        .and_then(|v| i64::try_from(v).ok())
        .ok_or_else(|| Rejection::MalformedInput("auth_date out of range".into()))
}

/// Parse `auth_date` and check it against `now`
pub fn check_freshness(auth_date_raw: &str, now: i64, policy: &FreshnessPolicy) -> Result<i64> {
    let auth_date = parse_auth_date(auth_date_raw)?;
    policy.check(auth_date, now)?;
    Ok(auth_date)
}
