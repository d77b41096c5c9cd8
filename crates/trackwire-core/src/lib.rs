//! Core client library for trackwire.
//!
//! This crate is the resilience layer that sits between the UI and the
//! trackwire REST API. It owns three loosely coupled services:
//!
//! - [`auth::AuthStore`]: the process-wide credential store (access token,
//!   refresh token, signed-in identity) backed by on-disk storage
//! - [`api::ApiClient`]: an authenticated request wrapper that absorbs a
//!   single token expiry per call by refreshing and retrying once
//! - [`push::PushClient`]: a server-sent-events subscriber that fans events
//!   out to registered handlers and reconnects with linear backoff
//!
//! UI layers construct these once at startup and share them:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use trackwire_core::api::ApiClient;
//! use trackwire_core::auth::{AuthStore, TokenStorage};
//! use trackwire_core::config::Config;
//! use trackwire_core::notify::NoticeBus;
//! use trackwire_core::push::PushClient;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::from_env();
//! let notices = NoticeBus::new();
//! let storage = TokenStorage::new(Config::cache_dir()?);
//! let auth = Arc::new(AuthStore::new(storage, notices.clone(), config.headless));
//! auth.init_auth();
//!
//! let api = ApiClient::new(&config, auth.clone(), notices.clone())?;
//! let push = PushClient::new(&config, auth);
//! # let _ = (api, push);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod notify;
pub mod push;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthStore, TokenStorage};
pub use config::Config;
pub use notify::{Notice, NoticeBus};
pub use push::{HandlerId, PushClient};
