//! Storage abstraction for the replay guard
//!
//! The replay store is a set of digests of init-data blobs that were already
//! accepted. Two backends are provided:
//! - in-memory (default), for development and single-instance deployments
//! - PostgreSQL (feature `postgres`), for durable state shared by several
//!   instances
//!
//! The trait exposes one admission primitive, an atomic insert-if-absent.
//! There is no `exists` query: checking and inserting in two
//! steps lets two concurrent identical requests both pass.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use initgate_core::ReplayDigest;
use std::fmt::Debug;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

/// One accepted init-data blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayRecord {
    /// SHA-256 of the raw blob
    pub digest: ReplayDigest,
    /// When the blob was admitted
    pub seen_at: DateTime<Utc>,
    /// When the record may be pruned
    pub expires_at: DateTime<Utc>,
}

/// Outcome of an insert-if-absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The record was written by this call
    Admitted,
    /// A record with the same digest already existed; nothing was written
    AlreadyPresent,
}

/// Storage backend trait for replay records
///
/// Implementations must be thread-safe, and `insert_if_absent` must be a
/// single atomic conditional write: of any number of concurrent calls with
/// the same digest, exactly one returns `Admitted`.
#[async_trait]
pub trait ReplayStore: Send + Sync + Debug {
    /// Atomically insert the record unless its digest is already present
    async fn insert_if_absent(&self, record: ReplayRecord) -> Result<Admission, StorageError>;

    /// Delete records with `expires_at <= now`, returning how many were removed
    async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64, StorageError>;

    /// Cheap reachability probe for readiness checks
    async fn ping(&self) -> Result<(), StorageError>;

    /// Backend name for diagnostics
    fn backend(&self) -> &'static str;
}
