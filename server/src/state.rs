//! Shared application state for the game server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use everwhen::session::Event;
use everwhen::store::SessionStore;
use tokio::sync::broadcast;

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    /// Per-session broadcast channels feeding the SSE streams.
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<Event>>>>,
}

impl AppState {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self {
            store,
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Sender for a session's event stream, created on first use.
    pub fn channel(&self, session_id: &str) -> broadcast::Sender<Event> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(64).0)
            .clone()
    }

    pub fn drop_channel(&self, session_id: &str) {
        self.channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(session_id);
    }
}
