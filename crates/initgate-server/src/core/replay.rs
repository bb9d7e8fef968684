//! Replay guard
//!
//! Admits each distinct init-data blob at most once. Correctness rests on the
//! store's atomic insert-if-absent, not on any lock held here, so it holds
//! across processes sharing one store.

use chrono::{DateTime, Duration, Utc};
use initgate_core::{Rejection, ReplayDigest};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::storage::{Admission, ReplayRecord, ReplayStore, StorageError};

/// Default per-call store timeout
pub const DEFAULT_STORE_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(2000);

/// Retention and timeout settings for the replay guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayPolicy {
    /// How long a record is kept after admission, in seconds
    ///
    /// Must be at least `max_age + max_future_skew` of the freshness policy;
    /// configuration enforces this.
    pub retention_secs: u64,
    /// Upper bound on a single store call
    pub store_timeout: std::time::Duration,
}

impl ReplayPolicy {
    pub fn new(retention_secs: u64, store_timeout: std::time::Duration) -> Self {
        Self {
            retention_secs,
            store_timeout,
        }
    }
}

/// Replay guard backed by a [`ReplayStore`]
#[derive(Debug, Clone)]
pub struct ReplayGuard {
    store: Arc<dyn ReplayStore>,
    policy: ReplayPolicy,
}

impl ReplayGuard {
    pub fn new(store: Arc<dyn ReplayStore>, policy: ReplayPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &Arc<dyn ReplayStore> {
        &self.store
    }

    pub fn policy(&self) -> &ReplayPolicy {
        &self.policy
    }

    /// Record `digest` as consumed, or reject if it already was
    ///
    /// # Errors
    /// * `AlreadyProcessed` if the digest is present
    /// * `StorageUnavailable` on any store error or timeout; never fails open
    pub async fn admit_once(&self, digest: ReplayDigest, now: DateTime<Utc>) -> Result<(), Rejection> {
        let expires_at = i64::try_from(self.policy.retention_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| Rejection::StorageUnavailable("replay retention out of range".into()))?;

        let record = ReplayRecord {
            digest,
            seen_at: now,
            expires_at,
        };

        let outcome =
            tokio::time::timeout(self.policy.store_timeout, self.store.insert_if_absent(record)).await;

        match outcome {
            Ok(Ok(Admission::Admitted)) => {
                debug!(digest = %digest, backend = self.store.backend(), "Replay digest admitted");
                Ok(())
            }
            Ok(Ok(Admission::AlreadyPresent)) => {
                warn!(digest = %digest, "SECURITY: Replayed init data rejected");
                Err(Rejection::AlreadyProcessed)
            }
            Ok(Err(e)) => {
                error!(digest = %digest, backend = self.store.backend(), error = %e, "Replay store failed");
                Err(Rejection::StorageUnavailable(e.to_string()))
            }
            Err(_) => {
                error!(
                    digest = %digest,
                    backend = self.store.backend(),
                    timeout_ms = self.policy.store_timeout.as_millis() as u64,
                    "Replay store timed out"
                );
                Err(Rejection::StorageUnavailable("replay store timed out".into()))
            }
        }
    }

    /// Remove expired records
    pub async fn prune(&self, now: DateTime<Utc>) -> Result<u64, StorageError> {
        self.store.prune_expired(now).await
    }
}

/// Run [`ReplayGuard::prune`] every `interval` until the task is aborted
pub fn spawn_pruner(guard: ReplayGuard, interval: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = interval.as_secs(),
            retention_secs = guard.policy().retention_secs,
            "Replay pruning started"
        );

        loop {
            ticker.tick().await;
            match guard.prune(Utc::now()).await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "Pruned expired replay records"),
                Err(e) => warn!(error = %e, "Replay pruning failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;

    /// Store that always fails
    #[derive(Debug)]
    struct BrokenStore;

    #[async_trait]
    impl ReplayStore for BrokenStore {
        async fn insert_if_absent(&self, _record: ReplayRecord) -> Result<Admission, StorageError> {
            Err(StorageError::Connection("connection refused".into()))
        }

        async fn prune_expired(&self, _now: DateTime<Utc>) -> Result<u64, StorageError> {
            Err(StorageError::Connection("connection refused".into()))
        }

        async fn ping(&self) -> Result<(), StorageError> {
            Err(StorageError::Connection("connection refused".into()))
        }

        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    /// Store that never answers
    #[derive(Debug)]
    struct HangingStore;

    #[async_trait]
    impl ReplayStore for HangingStore {
        async fn insert_if_absent(&self, _record: ReplayRecord) -> Result<Admission, StorageError> {
            std::future::pending().await
        }

        async fn prune_expired(&self, _now: DateTime<Utc>) -> Result<u64, StorageError> {
            std::future::pending().await
        }

        async fn ping(&self) -> Result<(), StorageError> {
            std::future::pending().await
        }

        fn backend(&self) -> &'static str {
            "hanging"
        }
    }

    fn policy() -> ReplayPolicy {
        ReplayPolicy::new(330, std::time::Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_admit_once() {
        let guard = ReplayGuard::new(Arc::new(MemoryStore::new()), policy());
        let digest = ReplayDigest::of("blob");
        let now = Utc::now();

        assert!(guard.admit_once(digest, now).await.is_ok());
        assert_eq!(guard.admit_once(digest, now).await, Err(Rejection::AlreadyProcessed));
    }

    #[tokio::test]
    async fn test_record_expiry_follows_retention() {
        let store = Arc::new(MemoryStore::new());
        let guard = ReplayGuard::new(store.clone(), policy());
        let now = Utc::now();

        guard.admit_once(ReplayDigest::of("blob"), now).await.unwrap();

        assert_eq!(guard.prune(now + Duration::seconds(329)).await.unwrap(), 0);
        assert_eq!(guard.prune(now + Duration::seconds(330)).await.unwrap(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_storage_error_fails_closed() {
        let guard = ReplayGuard::new(Arc::new(BrokenStore), policy());
        let result = guard.admit_once(ReplayDigest::of("blob"), Utc::now()).await;

        let err = result.unwrap_err();
        assert!(matches!(err, Rejection::StorageUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_timeout_fails_closed() {
        let guard = ReplayGuard::new(Arc::new(HangingStore), policy());
        let result = guard.admit_once(ReplayDigest::of("blob"), Utc::now()).await;
        assert!(matches!(result, Err(Rejection::StorageUnavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pruner_runs_periodically() {
        let store = Arc::new(MemoryStore::new());
        let guard = ReplayGuard::new(store.clone(), ReplayPolicy::new(0, DEFAULT_STORE_TIMEOUT));

        guard
            .admit_once(ReplayDigest::of("blob"), Utc::now() - Duration::seconds(10))
            .await
            .unwrap();
        assert_eq!(store.len(), 1);

        let handle = spawn_pruner(guard, std::time::Duration::from_secs(60));
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        handle.abort();

        assert!(store.is_empty());
    }
}
