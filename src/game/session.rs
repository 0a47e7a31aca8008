//! Per-match state machine: placement phase, alternating battle, finish

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::outbound::{ServerMsg, WireCoord};

use super::grid::{Grid, PlacementError, ShotOutOfBounds, ShotOutcome};
use super::rules::GameRules;
use super::ships::{Rotation, ShipShape};

/// Which side of the session a player occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    pub const ALL: [Seat; 2] = [Seat::First, Seat::Second];

    pub fn opponent(self) -> Seat {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }
}

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Both players place ships in any order
    Placement,
    /// Players alternate shots
    Battle,
    /// A player won or left
    Finished,
}

/// Outbound token addressed to one seat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notice {
    pub to: Seat,
    pub msg: ServerMsg,
}

impl Notice {
    pub fn new(to: Seat, msg: ServerMsg) -> Self {
        Self { to, msg }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("action not allowed during {0:?} phase")]
    WrongPhase(SessionPhase),

    #[error("not this player's turn")]
    NotYourTurn,

    #[error("placement quota for {0} exhausted")]
    QuotaExceeded(ShipShape),

    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    Shot(#[from] ShotOutOfBounds),
}

#[derive(Debug, Clone)]
struct PlayerBoard {
    name: String,
    grid: Grid,
    placed_by_shape: HashMap<ShipShape, u32>,
    ships_placed: u32,
}

impl PlayerBoard {
    fn new(name: String) -> Self {
        Self {
            name,
            grid: Grid::new(),
            placed_by_shape: ShipShape::ALL.iter().map(|&s| (s, 0)).collect(),
            ships_placed: 0,
        }
    }
}

/// Authoritative state of one two-player match
#[derive(Debug, Clone)]
pub struct GameSession {
    id: Uuid,
    players: [PlayerBoard; 2],
    phase: SessionPhase,
    first_player_turn: bool,
    winner: Option<Seat>,
    rules: GameRules,
    started_at: DateTime<Utc>,
}

impl GameSession {
    pub fn new(id: Uuid, first: String, second: String, rules: GameRules) -> Self {
        Self {
            id,
            players: [PlayerBoard::new(first), PlayerBoard::new(second)],
            phase: SessionPhase::Placement,
            first_player_turn: true,
            winner: None,
            rules,
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn winner(&self) -> Option<Seat> {
        self.winner
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn player_name(&self, seat: Seat) -> &str {
        &self.players[seat.index()].name
    }

    pub fn grid(&self, seat: Seat) -> &Grid {
        &self.players[seat.index()].grid
    }

    pub fn ships_placed(&self, seat: Seat) -> u32 {
        self.players[seat.index()].ships_placed
    }

    /// Seat allowed to fire, only meaningful during battle
    pub fn turn_holder(&self) -> Option<Seat> {
        match self.phase {
            SessionPhase::Battle if self.first_player_turn => Some(Seat::First),
            SessionPhase::Battle => Some(Seat::Second),
            _ => None,
        }
    }

    fn board_mut(&mut self, seat: Seat) -> &mut PlayerBoard {
        &mut self.players[seat.index()]
    }

    pub fn can_place_ship(&self, seat: Seat, shape: ShipShape) -> bool {
        let placed = self.players[seat.index()]
            .placed_by_shape
            .get(&shape)
            .copied()
            .unwrap_or(0);
        placed < self.rules.quota_for(shape)
    }

    pub fn increment_ship_count(&mut self, seat: Seat, shape: ShipShape) {
        *self.board_mut(seat).placed_by_shape.entry(shape).or_insert(0) += 1;
    }

    /// Record a successful placement. Returns true when this placement
    /// moved the session into the battle phase.
    pub fn increment_ships_placed(&mut self, seat: Seat) -> bool {
        self.board_mut(seat).ships_placed += 1;

        let threshold = self.rules.min_ships_for_battle;
        if self.phase == SessionPhase::Placement
            && self.players.iter().all(|p| p.ships_placed >= threshold)
        {
            self.phase = SessionPhase::Battle;
            self.first_player_turn = true;
            return true;
        }
        false
    }

    /// Both players may act during placement; only the turn holder in battle
    pub fn is_player_turn(&self, seat: Seat) -> bool {
        match self.phase {
            SessionPhase::Placement => true,
            SessionPhase::Battle => self.turn_holder() == Some(seat),
            SessionPhase::Finished => false,
        }
    }

    /// Hand the turn to the other player and re-check the win condition.
    /// No-op outside the battle phase.
    pub fn switch_turn(&mut self) -> Vec<Notice> {
        if self.phase != SessionPhase::Battle {
            debug!(session_id = %self.id, phase = ?self.phase, "Turn switch ignored");
            return Vec::new();
        }

        self.first_player_turn = !self.first_player_turn;
        let mut notices = Vec::with_capacity(3);
        if let Some(holder) = self.turn_holder() {
            notices.push(Notice::new(holder, ServerMsg::Turn));
        }
        notices.extend(self.check_win());
        notices
    }

    /// Finish the session if either fleet is fully sunk
    pub fn check_win(&mut self) -> Vec<Notice> {
        if self.phase != SessionPhase::Battle {
            return Vec::new();
        }

        let sunk = Seat::ALL
            .into_iter()
            .find(|&seat| self.grid(seat).all_sunk());

        match sunk {
            Some(loser) => {
                let winner = loser.opponent();
                self.finish(winner);
                info!(
                    session_id = %self.id,
                    winner = %self.player_name(winner),
                    loser = %self.player_name(loser),
                    "Fleet sunk, match won"
                );
                vec![
                    Notice::new(winner, ServerMsg::Win),
                    Notice::new(loser, ServerMsg::Lost),
                ]
            }
            None => Vec::new(),
        }
    }

    fn finish(&mut self, winner: Seat) {
        self.phase = SessionPhase::Finished;
        self.winner = Some(winner);
    }

    /// Place a ship on the sender's own grid
    pub fn place_ship(
        &mut self,
        seat: Seat,
        at: WireCoord,
        shape: ShipShape,
        rotation: Rotation,
    ) -> Result<Vec<Notice>, SessionError> {
        if self.phase != SessionPhase::Placement {
            return Err(SessionError::WrongPhase(self.phase));
        }
        if !self.can_place_ship(seat, shape) {
            return Err(SessionError::QuotaExceeded(shape));
        }

        let (row, col) = at.to_grid();
        let cells = self.board_mut(seat).grid.place(row, col, shape, rotation)?;
        self.increment_ship_count(seat, shape);
        let battle_started = self.increment_ships_placed(seat);

        debug!(
            session_id = %self.id,
            player = %self.player_name(seat),
            shape = %shape,
            rotation = rotation.code(),
            cells,
            "Ship placed"
        );

        let mut notices = vec![Notice::new(seat, ServerMsg::Success)];
        if battle_started {
            info!(session_id = %self.id, "Placement complete, battle begins");
            if let Some(holder) = self.turn_holder() {
                notices.push(Notice::new(holder, ServerMsg::Turn));
            }
        }
        Ok(notices)
    }

    /// Fire at the opponent's grid
    pub fn bomb(&mut self, seat: Seat, at: WireCoord) -> Result<Vec<Notice>, SessionError> {
        if self.phase != SessionPhase::Battle {
            return Err(SessionError::WrongPhase(self.phase));
        }
        if !self.is_player_turn(seat) {
            return Err(SessionError::NotYourTurn);
        }

        let target = seat.opponent();
        let (row, col) = at.to_grid();
        let outcome = self.board_mut(target).grid.shoot(row, col)?;

        let msg = match outcome {
            ShotOutcome::Hit => ServerMsg::Hit { at },
            ShotOutcome::Miss => ServerMsg::Miss { at },
        };
        debug!(
            session_id = %self.id,
            player = %self.player_name(seat),
            result = %msg,
            "Shot resolved"
        );

        let mut notices = vec![Notice::new(seat, msg), Notice::new(target, msg)];
        let win = self.check_win();
        if win.is_empty() {
            notices.extend(self.switch_turn());
        } else {
            notices.extend(win);
        }
        Ok(notices)
    }

    /// `seat` leaves the match; the opponent wins unless it is already over
    pub fn forfeit(&mut self, seat: Seat) -> Vec<Notice> {
        if self.phase == SessionPhase::Finished {
            return Vec::new();
        }

        let winner = seat.opponent();
        self.finish(winner);
        info!(
            session_id = %self.id,
            player = %self.player_name(seat),
            "Player left, opponent wins"
        );
        vec![Notice::new(winner, ServerMsg::Win)]
    }
}
