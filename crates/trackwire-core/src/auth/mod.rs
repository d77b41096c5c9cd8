//! Authentication state and credential persistence.
//!
//! This module provides:
//! - `AuthStore`: the process-wide credential store with explicit lifecycle
//!   operations (`init_auth`, `set_auth`, `logout`) and observable flags
//! - `TokenStorage`: file-backed persistence for the two bearer credentials
//!
//! Credentials are persisted to disk so a restarted client can resume its
//! session without re-authenticating; validity is only ever established by
//! the server (a 401 on use).

pub mod storage;
pub mod store;

pub use storage::{StoredTokens, TokenStorage};
pub use store::AuthStore;
