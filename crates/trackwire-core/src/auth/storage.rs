use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Token file name inside the storage directory
const TOKENS_FILE: &str = "tokens.json";

/// The two persisted credential values. Either may be absent independently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// File-backed storage for bearer credentials.
///
/// The directory is injected so tests can point each store at a fresh
/// location instead of the shared cache dir.
pub struct TokenStorage {
    dir: PathBuf,
}

impl TokenStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Read both tokens from disk. A missing file reads as both-absent.
    pub fn load(&self) -> Result<StoredTokens> {
        let path = self.tokens_path();
        if !path.exists() {
            return Ok(StoredTokens::default());
        }
        let contents = std::fs::read_to_string(&path)
            .context("Failed to read token file")?;
        serde_json::from_str(&contents).context("Failed to parse token file")
    }

    /// Persist a new access token, leaving the refresh token untouched.
    pub fn save_access(&self, token: &str) -> Result<()> {
        let mut tokens = self.load().unwrap_or_default();
        tokens.access_token = Some(token.to_string());
        self.save(&tokens)
    }

    /// Persist a new refresh token, leaving the access token untouched.
    pub fn save_refresh(&self, token: &str) -> Result<()> {
        let mut tokens = self.load().unwrap_or_default();
        tokens.refresh_token = Some(token.to_string());
        self.save(&tokens)
    }

    /// Erase both tokens. Safe to call when nothing is stored.
    pub fn clear(&self) -> Result<()> {
        let path = self.tokens_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove token file")?;
        }
        Ok(())
    }

    fn save(&self, tokens: &StoredTokens) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .context("Failed to create token storage directory")?;
        let contents = serde_json::to_string_pretty(tokens)?;
        std::fs::write(self.tokens_path(), contents)
            .context("Failed to write token file")?;
        Ok(())
    }

    fn tokens_path(&self) -> PathBuf {
        self.dir.join(TOKENS_FILE)
    }
}
