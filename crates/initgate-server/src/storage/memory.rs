//! In-memory storage backend
//!
//! Default replay store using a mutex-guarded hashmap.
//! Suitable for development and single-instance deployments.
//! Data is lost on restart, so a restart reopens the freshness window for
//! blobs seen before it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use initgate_core::ReplayDigest;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::{Admission, ReplayRecord, ReplayStore, StorageError};

/// In-memory replay store implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<ReplayDigest, ReplayRecord>>,
}

impl MemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held
    pub fn len(&self) -> usize {
        self.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<ReplayDigest, ReplayRecord>>, StorageError> {
        self.records
            .lock()
            .map_err(|_| StorageError::Database("replay store lock poisoned".into()))
    }
}

#[async_trait]
impl ReplayStore for MemoryStore {
    async fn insert_if_absent(&self, record: ReplayRecord) -> Result<Admission, StorageError> {
        let mut records = self.lock()?;
        match records.entry(record.digest) {
            Entry::Occupied(_) => Ok(Admission::AlreadyPresent),
            Entry::Vacant(slot) => {
                debug!(digest = %record.digest, expires_at = %record.expires_at, "Recorded replay digest");
                slot.insert(record);
                Ok(Admission::Admitted)
            }
        }
    }

    async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64, StorageError> {
        let mut records = self.lock()?;
        let before = records.len();
        records.retain(|_, r| r.expires_at > now);
        Ok((before - records.len()) as u64)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.lock().map(|_| ())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
