//! Core logic for the verification gate

mod replay;
mod verifier;

pub use replay::{spawn_pruner, ReplayGuard, ReplayPolicy, DEFAULT_STORE_TIMEOUT};
pub use verifier::Verifier;
