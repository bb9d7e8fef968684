//! Init-Data Verification Gate
//!
//! An HTTP service that authenticates mini-app users from the signed
//! init-data blob the messaging client hands to the app. A blob is accepted
//! once: its signature must match, its `auth_date` must be inside the
//! freshness window, and it must not have been seen before.
//!
//! ## API Endpoints
//!
//! - `GET /health` - Liveness check
//! - `GET /ready` - Readiness check, pings the replay store
//! - `POST /v1/auth/verify` - Verify init data from a JSON body
//! - `GET /v1/auth/me` - Verify init data from `Authorization: tma ...`
//!   and describe the caller

pub mod api;
pub mod config;
pub mod core;
pub mod storage;

pub use api::create_router;
pub use api::handlers::{AppState, VerifiedUser};
pub use config::{ConfigError, GateConfig, StoreTarget};
pub use self::core::{spawn_pruner, ReplayGuard, ReplayPolicy, Verifier};
pub use storage::{MemoryStore, ReplayStore, StorageError};
#[cfg(feature = "postgres")]
pub use storage::PostgresStore;
