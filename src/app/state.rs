//! Application state shared across connections and routes

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::config::Config;
use crate::game::{PeerHandle, SessionRegistry};
use crate::matchmaking::Matchmaker;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionRegistry>,
    pub matchmaker: Arc<Matchmaker>,
    /// Every open client connection, for shutdown broadcast
    pub connections: Arc<DashMap<Uuid, PeerHandle>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Initialize session registry
        let sessions = Arc::new(SessionRegistry::new());

        // Matchmaker binds new sessions into the shared registry
        let matchmaker = Arc::new(Matchmaker::new(sessions.clone(), config.rules.clone()));

        Self {
            config,
            sessions,
            matchmaker,
            connections: Arc::new(DashMap::new()),
        }
    }
}
