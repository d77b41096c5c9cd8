use std::sync::Mutex;

use serde_json::Value;
use tracing::{debug, warn};

use crate::models::UserProfile;
use crate::notify::{Notice, NoticeBus};

use super::TokenStorage;

#[derive(Debug, Default)]
struct AuthState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    identity: Option<UserProfile>,
    logged_in: bool,
    loading: bool,
}

/// Process-wide credential store.
///
/// Constructed once at startup and shared as `Arc<AuthStore>` by everything
/// that attaches credentials to requests. All operations are total: storage
/// failures degrade to the in-memory state with a warning rather than
/// surfacing to callers.
pub struct AuthStore {
    storage: TokenStorage,
    notices: NoticeBus,
    headless: bool,
    state: Mutex<AuthState>,
}

impl AuthStore {
    /// Create a store with all fields absent and `loading` set, the state a
    /// fresh process starts in before `init_auth` runs.
    pub fn new(storage: TokenStorage, notices: NoticeBus, headless: bool) -> Self {
        Self {
            storage,
            notices,
            headless,
            state: Mutex::new(AuthState {
                loading: true,
                ..AuthState::default()
            }),
        }
    }

    /// Bootstrap from persisted storage without contacting the network.
    ///
    /// The session is considered live only when both credentials are
    /// present; a lone token is carried anyway so an in-flight flow can
    /// still use it. Always ends with `loading` cleared.
    pub fn init_auth(&self) {
        let tokens = self.storage.load().unwrap_or_else(|err| {
            warn!(error = %err, "Failed to load persisted tokens, starting signed out");
            Default::default()
        });

        let mut state = self.state.lock().unwrap();
        state.logged_in = tokens.access_token.is_some() && tokens.refresh_token.is_some();
        state.access_token = tokens.access_token;
        state.refresh_token = tokens.refresh_token;
        state.loading = false;
        debug!(logged_in = state.logged_in, "Auth store initialized");
    }

    /// Record a successful sign-in.
    ///
    /// The refresh token is optional to support flows that only rotate the
    /// access token; when absent, a previously stored refresh token stays.
    pub fn set_auth(&self, identity: UserProfile, access_token: String, refresh_token: Option<String>) {
        if let Err(err) = self.storage.save_access(&access_token) {
            warn!(error = %err, "Failed to persist access token");
        }
        if let Some(ref refresh) = refresh_token {
            if let Err(err) = self.storage.save_refresh(refresh) {
                warn!(error = %err, "Failed to persist refresh token");
            }
        }

        let mut state = self.state.lock().unwrap();
        state.access_token = Some(access_token);
        if refresh_token.is_some() {
            state.refresh_token = refresh_token;
        }
        state.identity = Some(identity);
        state.logged_in = true;
    }

    /// Replace only the access token, as the refresh protocol does. The
    /// refresh token is not rotated.
    pub fn set_access_token(&self, access_token: String) {
        if let Err(err) = self.storage.save_access(&access_token) {
            warn!(error = %err, "Failed to persist refreshed access token");
        }
        self.state.lock().unwrap().access_token = Some(access_token);
    }

    /// Sign out: erase persisted credentials and clear all state. Idempotent.
    ///
    /// Publishes a redirect notice so the UI can route to sign-in; headless
    /// runs suppress it.
    pub fn logout(&self) {
        if let Err(err) = self.storage.clear() {
            warn!(error = %err, "Failed to erase persisted tokens");
        }

        {
            let mut state = self.state.lock().unwrap();
            state.access_token = None;
            state.refresh_token = None;
            state.identity = None;
            state.logged_in = false;
        }

        if !self.headless {
            self.notices.emit(Notice::RedirectToSignIn);
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.lock().unwrap().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state.lock().unwrap().refresh_token.clone()
    }

    pub fn identity(&self) -> Option<Value> {
        self.state.lock().unwrap().identity.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.lock().unwrap().logged_in
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().unwrap().loading
    }
}
