//! Board coordinates and outbound tokens shared by sessions and connections

use std::fmt;

/// Board position as it travels on the wire (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireCoord {
    pub row: i32,
    pub col: i32,
}

impl WireCoord {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// 0-based grid index. The only place wire coordinates are normalized.
    pub fn to_grid(self) -> (i64, i64) {
        (i64::from(self.row) - 1, i64::from(self.col) - 1)
    }
}

/// Tokens sent from server to client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMsg {
    Success,
    Failure,
    /// Both players have been paired and placement may begin
    Ready,
    Hit { at: WireCoord },
    Miss { at: WireCoord },
    Turn,
    Win,
    Lost,
    Pong,
    Quit,
}

impl fmt::Display for ServerMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMsg::Success => f.write_str("SUCCESS"),
            ServerMsg::Failure => f.write_str("FAILURE"),
            ServerMsg::Ready => f.write_str("READY"),
            ServerMsg::Hit { at } => write!(f, "HIT {} {}", at.row, at.col),
            ServerMsg::Miss { at } => write!(f, "MISS {} {}", at.row, at.col),
            ServerMsg::Turn => f.write_str("TURN"),
            ServerMsg::Win => f.write_str("WIN"),
            ServerMsg::Lost => f.write_str("LOST"),
            ServerMsg::Pong => f.write_str("PONG"),
            ServerMsg::Quit => f.write_str("QUIT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_coord_is_one_based() {
        assert_eq!(WireCoord::new(1, 1).to_grid(), (0, 0));
        assert_eq!(WireCoord::new(10, 3).to_grid(), (9, 2));
        assert_eq!(WireCoord::new(0, 0).to_grid(), (-1, -1));
    }

    #[test]
    fn test_server_tokens() {
        assert_eq!(ServerMsg::Success.to_string(), "SUCCESS");
        assert_eq!(ServerMsg::Failure.to_string(), "FAILURE");
        assert_eq!(
            ServerMsg::Hit {
                at: WireCoord::new(5, 5)
            }
            .to_string(),
            "HIT 5 5"
        );
        assert_eq!(
            ServerMsg::Miss {
                at: WireCoord::new(1, 10)
            }
            .to_string(),
            "MISS 1 10"
        );
        assert_eq!(ServerMsg::Lost.to_string(), "LOST");
    }
}
