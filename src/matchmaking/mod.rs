//! Login and pairing of players into sessions

pub mod queue;
pub mod service;

pub use service::{Matchmaker, MatchmakingError};
