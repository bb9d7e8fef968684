//! HTTP handlers for the verification gate

mod session;
mod verify;

pub use session::{me, MeResponse, VerifiedUser, INIT_DATA_HEADER, TMA_SCHEME};
pub use verify::{verify_init_data, AppState, VerifyRequest, VerifyResponse};
