// Application state module
// Shared, read-mostly state handed to every connection

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use super::types::Config;

/// Application state
pub struct AppState {
    pub config: Config,

    // Cached config values for fast access without locks
    pub cached_access_log: Arc<AtomicBool>,

    /// Flips to `true` once when the process should stop accepting connections
    shutdown: watch::Sender<bool>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            cached_access_log: Arc::new(AtomicBool::new(config.logging.access_log)),
            shutdown: watch::channel(false).0,
        }
    }

    pub fn access_log_enabled(&self) -> bool {
        self.cached_access_log.load(Ordering::Relaxed)
    }

    /// Ask the accept loop and every open connection to wind down
    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Receiver that observes [`AppState::request_shutdown`], even if it was
    /// called before subscribing
    pub fn shutdown_listener(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}
