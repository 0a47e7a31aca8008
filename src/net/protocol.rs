//! Line protocol definitions
//! One command per inbound line, one token per outbound line

use std::str::FromStr;

use crate::game::ships::{Rotation, ShipShape};

pub use crate::game::outbound::{ServerMsg, WireCoord};

/// Commands sent from client to server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Log in with a display name
    User { name: String },

    /// Place a ship with its bounding box at `at`
    Place {
        at: WireCoord,
        shape: ShipShape,
        rotation: Rotation,
    },

    /// Fire at the opponent's grid
    Bomb { at: WireCoord },

    /// Liveness check
    Ping,

    /// Leave the server
    Quit,
}

impl ClientCommand {
    /// Keyword as it appears on the wire
    pub fn keyword(&self) -> &'static str {
        match self {
            ClientCommand::User { .. } => "USER",
            ClientCommand::Place { .. } => "PLACE",
            ClientCommand::Bomb { .. } => "BOMB",
            ClientCommand::Ping => "PING",
            ClientCommand::Quit => "QUIT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("{command} expects {expected} argument(s), got {got}")]
    WrongArity {
        command: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("not a number: {0}")]
    InvalidNumber(String),

    #[error(transparent)]
    UnknownShape(#[from] crate::game::ships::UnknownShape),

    #[error("invalid rotation: {0}")]
    InvalidRotation(String),
}

fn expect_args(command: &'static str, args: &[&str], expected: usize) -> Result<(), ParseError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ParseError::WrongArity {
            command,
            expected,
            got: args.len(),
        })
    }
}

fn parse_number(raw: &str) -> Result<i32, ParseError> {
    raw.parse()
        .map_err(|_| ParseError::InvalidNumber(raw.to_string()))
}

fn parse_coord(row: &str, col: &str) -> Result<WireCoord, ParseError> {
    Ok(WireCoord::new(parse_number(row)?, parse_number(col)?))
}

impl FromStr for ClientCommand {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let keyword = parts.next().ok_or(ParseError::Empty)?;
        let args: Vec<&str> = parts.collect();

        match keyword {
            "USER" => {
                expect_args("USER", &args, 1)?;
                Ok(ClientCommand::User {
                    name: args[0].to_string(),
                })
            }
            "PLACE" => {
                expect_args("PLACE", &args, 4)?;
                let at = parse_coord(args[0], args[1])?;
                let shape = args[2].parse::<ShipShape>()?;
                let rotation = args[3]
                    .parse::<i64>()
                    .ok()
                    .and_then(Rotation::from_code)
                    .ok_or_else(|| ParseError::InvalidRotation(args[3].to_string()))?;
                Ok(ClientCommand::Place {
                    at,
                    shape,
                    rotation,
                })
            }
            "BOMB" => {
                expect_args("BOMB", &args, 2)?;
                Ok(ClientCommand::Bomb {
                    at: parse_coord(args[0], args[1])?,
                })
            }
            "PING" => {
                expect_args("PING", &args, 0)?;
                Ok(ClientCommand::Ping)
            }
            "QUIT" => {
                expect_args("QUIT", &args, 0)?;
                Ok(ClientCommand::Quit)
            }
            other => Err(ParseError::UnknownCommand(other.to_string())),
        }
    }
}
