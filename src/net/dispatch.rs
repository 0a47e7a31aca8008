//! Command dispatch: maps one parsed line onto the matchmaker or session

use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::{GameSession, Notice, PeerHandle, Seat, SessionError, SessionPhase};
use crate::matchmaking::MatchmakingError;

use super::protocol::{ClientCommand, ParseError, ServerMsg};

/// What the reader loop should do after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Continue,
    Close,
}

/// Evaluate one parsed inbound line for `peer`
pub fn dispatch(
    command: Result<ClientCommand, ParseError>,
    peer: &PeerHandle,
    state: &AppState,
) -> Disposition {
    let cmd = match command {
        Ok(cmd) => cmd,
        Err(e) => {
            debug!(conn_id = %peer.id(), error = %e, "Rejected malformed command");
            peer.send(&ServerMsg::Failure);
            return Disposition::Continue;
        }
    };

    if peer.name().is_none() {
        dispatch_unauthenticated(cmd, peer, state)
    } else {
        dispatch_authenticated(cmd, peer, state)
    }
}

fn dispatch_unauthenticated(cmd: ClientCommand, peer: &PeerHandle, state: &AppState) -> Disposition {
    match cmd {
        ClientCommand::User { name } => match state.matchmaker.register(peer, &name) {
            Ok(_) => Disposition::Continue,
            Err(e @ MatchmakingError::DuplicateIdentity(_)) => {
                warn!(conn_id = %peer.id(), error = %e, "Login refused, closing connection");
                peer.send(&ServerMsg::Failure);
                Disposition::Close
            }
            Err(e) => {
                debug!(conn_id = %peer.id(), error = %e, "Login refused");
                peer.send(&ServerMsg::Failure);
                Disposition::Continue
            }
        },
        ClientCommand::Ping => {
            peer.send(&ServerMsg::Pong);
            Disposition::Continue
        }
        ClientCommand::Quit => {
            peer.send(&ServerMsg::Quit);
            Disposition::Close
        }
        other => {
            debug!(conn_id = %peer.id(), command = other.keyword(), "Command before login");
            peer.send(&ServerMsg::Failure);
            Disposition::Continue
        }
    }
}

fn dispatch_authenticated(cmd: ClientCommand, peer: &PeerHandle, state: &AppState) -> Disposition {
    match cmd {
        ClientCommand::Place {
            at,
            shape,
            rotation,
        } => play(peer, state, "PLACE", |session, seat| {
            session.place_ship(seat, at, shape, rotation)
        }),
        ClientCommand::Bomb { at } => {
            play(peer, state, "BOMB", |session, seat| session.bomb(seat, at))
        }
        ClientCommand::Ping => {
            peer.send(&ServerMsg::Pong);
            Disposition::Continue
        }
        ClientCommand::Quit => {
            // Opponent is notified during teardown
            peer.send(&ServerMsg::Quit);
            Disposition::Close
        }
        ClientCommand::User { .. } => {
            debug!(conn_id = %peer.id(), "Already logged in");
            peer.send(&ServerMsg::Failure);
            Disposition::Continue
        }
    }
}

/// Run a game action against the sender's session
fn play<F>(peer: &PeerHandle, state: &AppState, command: &'static str, action: F) -> Disposition
where
    F: FnOnce(&mut GameSession, Seat) -> Result<Vec<Notice>, SessionError>,
{
    let Some(session) = state.sessions.session_for(peer.id()) else {
        debug!(conn_id = %peer.id(), command, "No session bound");
        peer.send(&ServerMsg::Failure);
        return Disposition::Continue;
    };

    let Some(seat) = session.seat_of(peer.id()) else {
        error!(
            conn_id = %peer.id(),
            session_id = %session.id(),
            "Connection bound to a session it does not play in"
        );
        return Disposition::Close;
    };

    match session.act(seat, |s| action(s, seat)) {
        Ok(SessionPhase::Finished) => {
            state.sessions.remove(&session.id());
            info!(session_id = %session.id(), "Session finished and released");
        }
        Ok(_) => {}
        Err(e) => {
            debug!(
                conn_id = %peer.id(),
                session_id = %session.id(),
                seat = ?seat,
                command,
                error = %e,
                "Rejected command"
            );
        }
    }

    Disposition::Continue
}
