//! User-facing notices emitted by the resilience layer.
//!
//! The core never renders anything itself; it publishes notices on a
//! broadcast bus and the UI decides how to present them (a soft toast for a
//! silent token refresh, a prominent one plus a redirect for session
//! expiry). Emitting with no subscribers is a no-op, so headless runs get
//! suppression for free.

use tokio::sync::broadcast;
use tracing::debug;

/// Buffer size for the notice channel.
/// Notices are rare (one per refresh or logout), 16 is plenty of headroom.
const NOTICE_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// An expired access token was silently replaced; the current operation
    /// carried on uninterrupted.
    SessionRefreshed,
    /// The refresh protocol could not produce a usable credential; the user
    /// has been signed out.
    SessionExpired,
    /// The user should be taken to the sign-in entry point.
    RedirectToSignIn,
}

/// Clonable handle to the notice channel.
#[derive(Clone)]
pub struct NoticeBus {
    tx: broadcast::Sender<Notice>,
}

impl NoticeBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to notices. Each subscriber sees every notice emitted after
    /// it subscribed.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Publish a notice. Dropped silently when nobody is listening.
    pub fn emit(&self, notice: Notice) {
        if self.tx.send(notice).is_err() {
            debug!(?notice, "Notice dropped, no subscribers");
        }
    }
}

impl Default for NoticeBus {
    fn default() -> Self {
        Self::new()
    }
}
