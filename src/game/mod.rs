//! Game rules engine: ships, grids, sessions

pub mod grid;
pub mod outbound;
pub mod peer;
pub mod registry;
pub mod rules;
pub mod session;
pub mod ships;

#[cfg(test)]
pub mod fixtures;

pub use peer::PeerHandle;
pub use registry::{SessionHandle, SessionRegistry, SessionSummary};
pub use session::{GameSession, Notice, Seat, SessionError, SessionPhase};
