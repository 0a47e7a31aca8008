//! Live sessions and the connection -> session binding

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use super::outbound::ServerMsg;
use super::peer::PeerHandle;
use super::session::{GameSession, Notice, Seat, SessionError, SessionPhase};

/// A running session plus the two connections playing it.
///
/// All mutations go through the session lock, and outbound tokens are queued
/// while it is held, so both clients observe events in the same order.
pub struct SessionHandle {
    id: Uuid,
    state: Mutex<GameSession>,
    peers: [PeerHandle; 2],
}

impl SessionHandle {
    pub fn new(session: GameSession, first: PeerHandle, second: PeerHandle) -> Self {
        Self {
            id: session.id(),
            state: Mutex::new(session),
            peers: [first, second],
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn peer(&self, seat: Seat) -> &PeerHandle {
        &self.peers[seat.index()]
    }

    pub fn seat_of(&self, conn_id: Uuid) -> Option<Seat> {
        Seat::ALL
            .into_iter()
            .find(|&seat| self.peer(seat).id() == conn_id)
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.lock().phase()
    }

    fn deliver(&self, notices: &[Notice]) {
        for notice in notices {
            self.peer(notice.to).send(&notice.msg);
        }
    }

    /// Run an infallible mutation, deliver its notices and return them.
    /// An empty result means the mutation changed nothing players can see.
    pub fn apply<F>(&self, f: F) -> Vec<Notice>
    where
        F: FnOnce(&mut GameSession) -> Vec<Notice>,
    {
        let mut session = self.state.lock();
        let notices = f(&mut session);
        self.deliver(&notices);
        notices
    }

    /// Run a player action. A rejected action answers FAILURE to `seat`.
    pub fn act<F>(&self, seat: Seat, f: F) -> Result<SessionPhase, SessionError>
    where
        F: FnOnce(&mut GameSession) -> Result<Vec<Notice>, SessionError>,
    {
        let mut session = self.state.lock();
        match f(&mut session) {
            Ok(notices) => {
                self.deliver(&notices);
                Ok(session.phase())
            }
            Err(e) => {
                self.peer(seat).send(&ServerMsg::Failure);
                Err(e)
            }
        }
    }

    pub fn summary(&self) -> SessionSummary {
        let session = self.state.lock();
        SessionSummary {
            id: self.id,
            players: Seat::ALL.map(|seat| session.player_name(seat).to_string()),
            phase: session.phase(),
            started_at: session.started_at(),
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("phase", &self.state.try_lock().map(|s| s.phase()))
            .field("peers", &self.peers)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub players: [String; 2],
    pub phase: SessionPhase,
    pub started_at: DateTime<Utc>,
}

/// Registry of all live sessions
pub struct SessionRegistry {
    sessions: DashMap<Uuid, Arc<SessionHandle>>,
    /// Connection id -> session id
    by_player: DashMap<Uuid, Uuid>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            by_player: DashMap::new(),
        }
    }

    /// Register a session and bind both of its connections to it
    pub fn insert(&self, handle: Arc<SessionHandle>) {
        for seat in Seat::ALL {
            self.by_player.insert(handle.peer(seat).id(), handle.id());
        }
        self.sessions.insert(handle.id(), handle);
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<SessionHandle>> {
        self.sessions.get(id).map(|s| s.value().clone())
    }

    /// Session the connection currently plays in, if any
    pub fn session_for(&self, conn_id: Uuid) -> Option<Arc<SessionHandle>> {
        let session_id = *self.by_player.get(&conn_id)?;
        self.get(&session_id)
    }

    /// Drop the session and release both players. Idempotent.
    pub fn remove(&self, id: &Uuid) -> Option<Arc<SessionHandle>> {
        let (_, handle) = self.sessions.remove(id)?;
        for seat in Seat::ALL {
            self.by_player
                .remove_if(&handle.peer(seat).id(), |_, bound| bound == id);
        }
        Some(handle)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn summaries(&self) -> Vec<SessionSummary> {
        let handles: Vec<Arc<SessionHandle>> =
            self.sessions.iter().map(|s| s.value().clone()).collect();
        let mut summaries: Vec<SessionSummary> = handles.iter().map(|h| h.summary()).collect();
        summaries.sort_by_key(|s| s.started_at);
        summaries
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::fixtures::{FLEET, FLEET_CELLS};
    use crate::game::rules::GameRules;
    use crate::game::ships::{Rotation, ShipShape};
    use crate::game::outbound::WireCoord;
    use crate::game::peer::{test_peer, Outgoing};

    fn handle() -> (
        Arc<SessionHandle>,
        tokio::sync::mpsc::UnboundedReceiver<Outgoing>,
        tokio::sync::mpsc::UnboundedReceiver<Outgoing>,
    ) {
        let (a, rx_a) = test_peer();
        let (b, rx_b) = test_peer();
        let session = GameSession::new(
            Uuid::new_v4(),
            "alice".to_string(),
            "bob".to_string(),
            GameRules::default(),
        );
        (Arc::new(SessionHandle::new(session, a, b)), rx_a, rx_b)
    }

    fn line(rx: &mut tokio::sync::mpsc::UnboundedReceiver<Outgoing>) -> String {
        match rx.try_recv() {
            Ok(Outgoing::Line(line)) => line,
            other => panic!("expected a line, got {other:?}"),
        }
    }

    #[test]
    fn test_insert_binds_both_players() {
        let registry = SessionRegistry::new();
        let (handle, _a, _b) = handle();
        let first = handle.peer(Seat::First).id();
        let second = handle.peer(Seat::Second).id();

        registry.insert(handle.clone());
        assert_eq!(registry.active_sessions(), 1);
        assert_eq!(registry.session_for(first).map(|s| s.id()), Some(handle.id()));
        assert_eq!(handle.seat_of(second), Some(Seat::Second));
        assert_eq!(handle.seat_of(Uuid::new_v4()), None);

        assert!(registry.remove(&handle.id()).is_some());
        assert!(registry.remove(&handle.id()).is_none());
        assert!(registry.session_for(first).is_none());
        assert!(registry.session_for(second).is_none());
        assert_eq!(registry.active_sessions(), 0);
    }

    #[test]
    fn test_act_answers_failure_on_rejection() {
        let (handle, mut rx_a, mut rx_b) = handle();

        let result = handle.act(Seat::Second, |s| s.bomb(Seat::Second, WireCoord::new(1, 1)));
        assert!(result.is_err());
        assert_eq!(line(&mut rx_b), "FAILURE");
        assert!(rx_a.try_recv().is_err());

        let phase = handle
            .act(Seat::First, |s| {
                s.place_ship(Seat::First, WireCoord::new(1, 1), ShipShape::OneShape, Rotation::Deg0)
            })
            .unwrap();
        assert_eq!(phase, SessionPhase::Placement);
        assert_eq!(line(&mut rx_a), "SUCCESS");
    }

    #[test]
    fn test_apply_routes_notices_by_seat() {
        let (handle, mut rx_a, mut rx_b) = handle();
        let notices = handle.apply(|s| s.forfeit(Seat::First));
        assert_eq!(notices, vec![Notice::new(Seat::Second, ServerMsg::Win)]);
        assert_eq!(handle.phase(), SessionPhase::Finished);
        assert_eq!(line(&mut rx_b), "WIN");
        assert!(rx_a.try_recv().is_err());

        // Already over: nothing further is delivered
        assert!(handle.apply(|s| s.forfeit(Seat::Second)).is_empty());
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_err());
    }

    fn drain_shots(rx: &mut tokio::sync::mpsc::UnboundedReceiver<Outgoing>) -> Vec<String> {
        let mut shots = Vec::new();
        while let Ok(out) = rx.try_recv() {
            if let Outgoing::Line(line) = out {
                if line.starts_with("HIT") || line.starts_with("MISS") {
                    shots.push(line);
                }
            }
        }
        shots
    }

    #[test]
    fn test_concurrent_shots_reach_both_players_in_one_order() {
        const SHOTS_PER_SEAT: usize = 40;

        let (handle, mut rx_a, mut rx_b) = handle();
        for seat in Seat::ALL {
            for &(row, col, shape, rotation) in FLEET {
                handle
                    .act(seat, |s| s.place_ship(seat, WireCoord::new(row, col), shape, rotation))
                    .unwrap();
            }
        }
        assert_eq!(handle.phase(), SessionPhase::Battle);
        while rx_a.try_recv().is_ok() {}
        while rx_b.try_recv().is_ok() {}

        let misses: Vec<WireCoord> = (1..=10)
            .flat_map(|row| (1..=10).map(move |col| (row, col)))
            .filter(|cell| !FLEET_CELLS.contains(cell))
            .map(|(row, col)| WireCoord::new(row, col))
            .collect();

        std::thread::scope(|scope| {
            for seat in Seat::ALL {
                let handle = &handle;
                let misses = &misses;
                scope.spawn(move || {
                    let mut fired = 0;
                    while fired < SHOTS_PER_SEAT {
                        let at = misses[fired % misses.len()];
                        if handle.act(seat, |s| s.bomb(seat, at)).is_ok() {
                            fired += 1;
                        } else {
                            std::thread::yield_now();
                        }
                    }
                });
            }
        });

        let seen_by_first = drain_shots(&mut rx_a);
        let seen_by_second = drain_shots(&mut rx_b);
        assert_eq!(seen_by_first.len(), 2 * SHOTS_PER_SEAT);
        assert_eq!(seen_by_first, seen_by_second);
        assert_eq!(handle.phase(), SessionPhase::Battle);
    }

    #[test]
    fn test_summaries_report_names_and_phase() {
        let registry = SessionRegistry::new();
        let (handle, _a, _b) = handle();
        registry.insert(handle.clone());

        let summaries = registry.summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].players, ["alice".to_string(), "bob".to_string()]);
        assert_eq!(summaries[0].phase, SessionPhase::Placement);

        let json = serde_json::to_value(&summaries[0]).unwrap();
        assert_eq!(json["phase"], "placement");
    }
}
