//! Matchmaker: login-name uniqueness, waiting queue and session creation

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::game::outbound::ServerMsg;
use crate::game::rules::GameRules;
use crate::game::{GameSession, PeerHandle, Seat, SessionHandle, SessionRegistry};

use super::queue::{QueuedPlayer, WaitingQueue};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchmakingError {
    #[error("name {0} is already logged in")]
    DuplicateIdentity(String),

    #[error("login name must not be empty")]
    EmptyName,
}

#[derive(Default)]
struct MatchmakerState {
    queue: WaitingQueue,
    /// Logged-in name -> connection id
    active: HashMap<String, Uuid>,
}

/// Pairs logged-in players into sessions.
///
/// Registration is a single critical section: uniqueness check, SUCCESS,
/// enqueue and pairing all happen under one lock.
pub struct Matchmaker {
    inner: Mutex<MatchmakerState>,
    sessions: Arc<SessionRegistry>,
    rules: GameRules,
}

impl Matchmaker {
    pub fn new(sessions: Arc<SessionRegistry>, rules: GameRules) -> Self {
        Self {
            inner: Mutex::new(MatchmakerState::default()),
            sessions,
            rules,
        }
    }

    /// Log `peer` in as `name` and try to pair it.
    ///
    /// Returns the new session when this login completed a pair.
    pub fn register(
        &self,
        peer: &PeerHandle,
        name: &str,
    ) -> Result<Option<Arc<SessionHandle>>, MatchmakingError> {
        if name.is_empty() {
            return Err(MatchmakingError::EmptyName);
        }

        let mut state = self.inner.lock();
        if state.active.contains_key(name) {
            warn!(conn_id = %peer.id(), name = %name, "Duplicate login rejected");
            return Err(MatchmakingError::DuplicateIdentity(name.to_string()));
        }

        state.active.insert(name.to_string(), peer.id());
        peer.set_name(name);
        peer.send(&ServerMsg::Success);
        state
            .queue
            .enqueue(QueuedPlayer::new(peer.clone(), name.to_string()));

        info!(
            conn_id = %peer.id(),
            name = %name,
            queue_size = state.queue.len(),
            "Player logged in"
        );

        let Some((first, second)) = state.queue.try_form_pair() else {
            return Ok(None);
        };

        let waited = first.wait_time();
        let session = GameSession::new(Uuid::new_v4(), first.name, second.name, self.rules.clone());
        let handle = Arc::new(SessionHandle::new(session, first.peer, second.peer));

        // READY is queued before the session becomes reachable
        for seat in Seat::ALL {
            handle.peer(seat).send(&ServerMsg::Ready);
        }
        self.sessions.insert(handle.clone());

        info!(
            session_id = %handle.id(),
            first = ?handle.peer(Seat::First).name(),
            second = ?handle.peer(Seat::Second).name(),
            waited_ms = waited.as_millis() as u64,
            "Session created"
        );

        Ok(Some(handle))
    }

    /// Forget a connection: leave the queue and free its name if it holds it
    pub fn unregister(&self, conn_id: Uuid, name: Option<&str>) {
        let mut state = self.inner.lock();
        state.queue.dequeue(conn_id);

        if let Some(name) = name {
            if state.active.get(name) == Some(&conn_id) {
                state.active.remove(name);
                info!(conn_id = %conn_id, name = %name, "Player logged out");
            }
        }
    }

    pub fn queue_size(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn online_players(&self) -> usize {
        self.inner.lock().active.len()
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.inner.lock().active.contains_key(name)
    }

    pub fn is_queued(&self, conn_id: &Uuid) -> bool {
        self.inner.lock().queue.contains(conn_id)
    }
}
