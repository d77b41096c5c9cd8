//! REST API client module for the trackwire backend.
//!
//! This module provides the `ApiClient` for making authenticated requests.
//! Every call carries the stored bearer token; a 401 response triggers a
//! silent token refresh and a single retry before any error reaches the
//! caller.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
