//! Server-push event subscription.
//!
//! This module provides:
//! - `PushClient`: a single-connection, multi-listener distributor for the
//!   backend's server-sent-events feed, with bounded linear-backoff
//!   reconnection
//! - `SseParser`: an incremental parser for the text/event-stream wire
//!   format
//!
//! The feed is one-directional (server to client). Domain events arrive as
//! JSON documents and are forwarded to registered handlers untouched.

pub mod client;
pub mod parse;

pub use client::{EventHandler, HandlerId, PushClient};
pub use parse::SseParser;
