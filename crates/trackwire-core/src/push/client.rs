//! Live event subscription client.
//!
//! One long-lived connection to the backend's event feed, fanned out to any
//! number of registered handlers. The connection is owned by a background
//! task that reconnects on its own with linearly increasing delay, up to a
//! bounded attempt count, and can be cancelled at any point by
//! `disconnect()` - including while a reconnect delay is pending.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::auth::AuthStore;
use crate::config::Config;

use super::parse::SseParser;

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of reconnect attempts before the feed is abandoned.
/// After the fifth failure the task stops silently; only a fresh `connect()`
/// starts it again.
const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Linear backoff step: reconnect attempt n waits n times this long.
const RECONNECT_BASE_DELAY_MS: u64 = 1000;

/// Server-push endpoint, relative to the API base
const EVENTS_PATH: &str = "/issues/events";

/// Delay before reconnect attempt `attempt` (1-based): 1s, 2s, ... 5s.
fn reconnect_delay(attempt: u32) -> Duration {
    Duration::from_millis(RECONNECT_BASE_DELAY_MS * u64::from(attempt))
}

pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Registration token returned by `add_handler`, used to remove the handler
/// later. Each registration is distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type HandlerMap = Arc<Mutex<HashMap<HandlerId, EventHandler>>>;

struct Connection {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Client for the backend's server-sent-events feed.
pub struct PushClient {
    // No request timeout here: the stream is expected to stay open.
    client: Client,
    base_url: String,
    auth: Arc<AuthStore>,
    headless: bool,
    handlers: HandlerMap,
    next_handler_id: AtomicU64,
    connected: Arc<AtomicBool>,
    conn: Mutex<Option<Connection>>,
}

impl PushClient {
    pub fn new(config: &Config, auth: Arc<AuthStore>) -> Self {
        Self {
            client: Client::new(),
            base_url: config.api_base.clone(),
            auth,
            headless: config.headless,
            handlers: Arc::new(Mutex::new(HashMap::new())),
            next_handler_id: AtomicU64::new(0),
            connected: Arc::new(AtomicBool::new(false)),
            conn: Mutex::new(None),
        }
    }

    /// Open the event feed in a background task.
    ///
    /// No-op when running headless, when no access token is stored (this
    /// client never triggers a refresh itself), or when the feed is already
    /// running. Must be called from within a tokio runtime.
    pub fn connect(&self) {
        if self.headless {
            debug!("Headless run, skipping event feed");
            return;
        }
        if self.auth.access_token().is_none() {
            debug!("No access token stored, skipping event feed");
            return;
        }

        let mut conn = self.conn.lock().unwrap();
        if let Some(existing) = conn.as_ref() {
            if !existing.task.is_finished() {
                debug!("Event feed already running");
                return;
            }
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = Worker {
            client: self.client.clone(),
            url: format!("{}{}", self.base_url, EVENTS_PATH),
            auth: self.auth.clone(),
            handlers: self.handlers.clone(),
            connected: self.connected.clone(),
        };
        let task = tokio::spawn(worker.run(shutdown_rx));
        *conn = Some(Connection {
            shutdown: shutdown_tx,
            task,
        });
    }

    /// Close the feed. Safe to call repeatedly or when already closed.
    ///
    /// Cancels an in-flight read as well as a pending reconnect delay, so a
    /// disconnected client stays disconnected.
    pub fn disconnect(&self) {
        let conn = self.conn.lock().unwrap().take();
        if let Some(conn) = conn {
            let _ = conn.shutdown.send(true);
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Register a handler for every decoded event. Handlers may be added or
    /// removed at any time, including from inside another handler.
    pub fn add_handler(&self, handler: impl Fn(&Value) + Send + Sync + 'static) -> HandlerId {
        let id = HandlerId(self.next_handler_id.fetch_add(1, Ordering::SeqCst));
        self.handlers.lock().unwrap().insert(id, Arc::new(handler));
        id
    }

    /// Remove a previously registered handler. Unknown ids are ignored.
    pub fn remove_handler(&self, id: HandlerId) {
        self.handlers.lock().unwrap().remove(&id);
    }

    /// True iff the underlying transport is currently open - false while
    /// connecting, backing off, abandoned, or closed.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for PushClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// State moved into the background task.
struct Worker {
    client: Client,
    url: String,
    auth: Arc<AuthStore>,
    handlers: HandlerMap,
    connected: Arc<AtomicBool>,
}

impl Worker {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut attempts: u32 = 0;
        loop {
            if *shutdown.borrow() {
                break;
            }
            // Re-read the token before every attempt; a logout between
            // attempts ends the feed instead of reconnecting with a stale
            // credential.
            let Some(token) = self.auth.access_token() else {
                debug!("Access token gone, stopping event feed");
                break;
            };

            match self.open(&token).await {
                Ok(response) => {
                    info!("Event feed connected");
                    self.connected.store(true, Ordering::SeqCst);
                    attempts = 0;
                    let shutting_down = self.consume(response, &mut shutdown).await;
                    self.connected.store(false, Ordering::SeqCst);
                    if shutting_down {
                        break;
                    }
                    warn!("Event feed interrupted");
                }
                Err(err) => {
                    warn!(error = %err, "Failed to open event feed");
                }
            }

            attempts += 1;
            if attempts > MAX_RECONNECT_ATTEMPTS {
                warn!("Max reconnect attempts reached, abandoning event feed");
                break;
            }
            info!(attempt = attempts, max = MAX_RECONNECT_ATTEMPTS, "Scheduling reconnect");
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(reconnect_delay(attempts)) => {}
            }
            // A disconnect may have raced the timer
            if *shutdown.borrow() {
                break;
            }
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    async fn open(&self, token: &str) -> anyhow::Result<reqwest::Response> {
        // The transport cannot carry custom headers, so the token travels as
        // a query parameter. The full URL is sensitive; it stays out of logs.
        let response = self
            .client
            .get(&self.url)
            .query(&[("token", token)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("event feed endpoint returned status {}", status);
        }
        Ok(response)
    }

    /// Read the open stream until shutdown or a transport failure. Returns
    /// true when stopping because of shutdown.
    async fn consume(
        &self,
        response: reqwest::Response,
        shutdown: &mut watch::Receiver<bool>,
    ) -> bool {
        let mut stream = response.bytes_stream();
        let mut parser = SseParser::new();
        loop {
            tokio::select! {
                _ = shutdown.changed() => return true,
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        // Payloads dispatch in arrival order; one event's
                        // handlers finish before the next event is parsed.
                        for payload in parser.push(&bytes) {
                            self.dispatch(&payload);
                        }
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, "Event feed read failed");
                        return false;
                    }
                    None => {
                        debug!("Event feed closed by server");
                        return false;
                    }
                }
            }
        }
    }

    fn dispatch(&self, payload: &str) {
        let event: Value = match serde_json::from_str(payload) {
            Ok(event) => event,
            Err(err) => {
                // Malformed payloads are dropped; the feed stays up
                warn!(error = %err, "Dropping unparseable event payload");
                return;
            }
        };

        // Snapshot the registry so handlers added or removed during dispatch
        // cannot disturb the current batch.
        let snapshot: Vec<EventHandler> = {
            let handlers = self.handlers.lock().unwrap();
            handlers.values().cloned().collect()
        };
        for handler in snapshot {
            if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
                error!("Event handler panicked");
            }
        }
    }
}
