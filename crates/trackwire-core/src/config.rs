//! Application configuration.
//!
//! The only externally tunable value is the API base URL, resolved once at
//! startup from the environment. Retry counts and backoff delays are fixed
//! constants owned by the modules that use them.

use std::path::PathBuf;

use anyhow::Result;

/// Application name used for cache directory paths
const APP_NAME: &str = "trackwire";

/// Environment variable overriding the API base URL
const API_BASE_ENV: &str = "TRACKWIRE_API_BASE";

/// Environment variable marking a non-interactive (headless) run
const HEADLESS_ENV: &str = "TRACKWIRE_HEADLESS";

/// Fallback API base URL when the environment does not provide one
pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL all endpoint paths are joined onto, without a trailing slash.
    pub api_base: String,
    /// Suppresses interactive side effects (sign-in redirect, live events).
    pub headless: bool,
}

impl Config {
    /// Resolve configuration from the environment.
    ///
    /// A `.env` file is honored when present; real environment variables
    /// take precedence over it.
    pub fn from_env() -> Self {
        // Silently ignore a missing .env file
        let _ = dotenvy::dotenv();

        let api_base = std::env::var(API_BASE_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_base = api_base.trim_end_matches('/').to_string();

        let headless = std::env::var(HEADLESS_ENV)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self { api_base, headless }
    }

    /// Directory where persisted credentials live.
    pub fn cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            headless: false,
        }
    }
}
