//! Configuration module - environment variable parsing

use std::collections::HashMap;
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::game::rules::GameRules;
use crate::game::ships::ShipShape;

/// Port used when neither GAME_PORT nor PORT holds a valid value
pub const DEFAULT_GAME_PORT: u16 = 12345;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Interface the game listener binds to
    pub bind_host: IpAddr,
    /// Game listener port
    pub game_port: u16,
    /// Status HTTP server address, `None` when disabled
    pub status_addr: Option<SocketAddr>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Placement and battle rules for every session
    pub rules: GameRules,
    /// Inbound lines allowed per second per connection
    pub input_rate_limit: u32,

    /// Problems that fell back to defaults; logged once tracing is up
    pub warnings: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_source<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();
        let defaults = Config::default();

        let game_port = match get("GAME_PORT").or_else(|| get("PORT")) {
            Some(raw) => raw.trim().parse::<u16>().unwrap_or_else(|_| {
                warnings.push(format!(
                    "Invalid game port {raw:?}, using default {DEFAULT_GAME_PORT}"
                ));
                DEFAULT_GAME_PORT
            }),
            None => {
                warnings.push(format!(
                    "GAME_PORT not set, using default {DEFAULT_GAME_PORT}"
                ));
                DEFAULT_GAME_PORT
            }
        };

        let bind_host = match get("BIND_HOST") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "BIND_HOST",
                value: raw,
            })?,
            None => defaults.bind_host,
        };

        let status_addr = match get("STATUS_ADDR") {
            Some(raw) if raw.trim().eq_ignore_ascii_case("off") => None,
            Some(raw) => Some(raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "STATUS_ADDR",
                value: raw,
            })?),
            None => defaults.status_addr,
        };

        let mut rules = defaults.rules;
        if let Some(raw) = get("MIN_SHIPS_FOR_BATTLE") {
            rules.min_ships_for_battle = parse_u32("MIN_SHIPS_FOR_BATTLE", raw)?;
        }
        if let Some(raw) = get("SHIP_QUOTA_DEFAULT") {
            rules.default_shape_quota = parse_u32("SHIP_QUOTA_DEFAULT", raw)?;
        }
        if let Some(raw) = get("SHIP_QUOTAS") {
            rules.shape_quotas = parse_quotas(&raw)?;
        }
        if rules.max_ships() < rules.min_ships_for_battle {
            warnings.push(format!(
                "Ship quotas allow at most {} ships but battle needs {}; sessions can never leave placement",
                rules.max_ships(),
                rules.min_ships_for_battle
            ));
        }

        let input_rate_limit = match get("INPUT_RATE_LIMIT") {
            Some(raw) => parse_u32("INPUT_RATE_LIMIT", raw)?,
            None => defaults.input_rate_limit,
        };

        Ok(Self {
            bind_host,
            game_port,
            status_addr,
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
            rules,
            input_rate_limit,
            warnings,
        })
    }

    /// Address the game listener binds to
    pub fn game_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.game_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            game_port: DEFAULT_GAME_PORT,
            status_addr: Some(SocketAddr::from(([0, 0, 0, 0], 8081))),
            log_level: "info".to_string(),
            rules: GameRules::default(),
            input_rate_limit: 20,
            warnings: Vec::new(),
        }
    }
}

fn parse_u32(var: &'static str, raw: String) -> Result<u32, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value: raw })
}

/// Parse `NAME=N,NAME=N`
fn parse_quotas(raw: &str) -> Result<HashMap<ShipShape, u32>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let invalid = || ConfigError::InvalidQuota(entry.to_string());
            let (name, count) = entry.split_once('=').ok_or_else(invalid)?;
            let shape = name.trim().parse::<ShipShape>().map_err(|_| invalid())?;
            let count = count.trim().parse::<u32>().map_err(|_| invalid())?;
            Ok((shape, count))
        })
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("Invalid ship quota entry: {0:?} (expected NAME=COUNT)")]
    InvalidQuota(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_source(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.game_port, DEFAULT_GAME_PORT);
        assert_eq!(config.game_addr().to_string(), "0.0.0.0:12345");
        assert_eq!(config.status_addr, Some("0.0.0.0:8081".parse().unwrap()));
        assert_eq!(config.rules, GameRules::default());
        assert_eq!(config.input_rate_limit, 20);
        assert_eq!(config.warnings.len(), 1);
    }

    #[test]
    fn test_port_fallbacks() {
        assert_eq!(load(&[("PORT", "4000")]).unwrap().game_port, 4000);
        assert_eq!(
            load(&[("GAME_PORT", "5000"), ("PORT", "4000")])
                .unwrap()
                .game_port,
            5000
        );

        let config = load(&[("GAME_PORT", "not-a-port")]).unwrap();
        assert_eq!(config.game_port, DEFAULT_GAME_PORT);
        assert!(config.warnings[0].contains("not-a-port"));

        let config = load(&[("GAME_PORT", "70000")]).unwrap();
        assert_eq!(config.game_port, DEFAULT_GAME_PORT);
    }

    #[test]
    fn test_status_server_can_be_disabled() {
        let config = load(&[("STATUS_ADDR", "off")]).unwrap();
        assert_eq!(config.status_addr, None);

        let config = load(&[("STATUS_ADDR", "127.0.0.1:9000")]).unwrap();
        assert_eq!(config.status_addr, Some("127.0.0.1:9000".parse().unwrap()));

        assert!(load(&[("STATUS_ADDR", "nowhere")]).is_err());
    }

    #[test]
    fn test_rule_overrides() {
        let config = load(&[
            ("GAME_PORT", "12345"),
            ("MIN_SHIPS_FOR_BATTLE", "3"),
            ("SHIP_QUOTA_DEFAULT", "1"),
            ("SHIP_QUOTAS", "L_SHAPE=3, FOUR_SHAPE=0"),
        ])
        .unwrap();

        assert_eq!(config.rules.min_ships_for_battle, 3);
        assert_eq!(config.rules.quota_for(ShipShape::LShape), 3);
        assert_eq!(config.rules.quota_for(ShipShape::FourShape), 0);
        assert_eq!(config.rules.quota_for(ShipShape::OneShape), 1);
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn test_unreachable_threshold_warns() {
        let config = load(&[("GAME_PORT", "1"), ("MIN_SHIPS_FOR_BATTLE", "50")]).unwrap();
        assert_eq!(config.warnings.len(), 1);
    }

    #[test]
    fn test_malformed_values_are_errors() {
        assert!(matches!(
            load(&[("SHIP_QUOTAS", "SIX_SHAPE=1")]),
            Err(ConfigError::InvalidQuota(_))
        ));
        assert!(matches!(
            load(&[("SHIP_QUOTAS", "L_SHAPE")]),
            Err(ConfigError::InvalidQuota(_))
        ));
        assert!(matches!(
            load(&[("MIN_SHIPS_FOR_BATTLE", "-1")]),
            Err(ConfigError::Invalid { var: "MIN_SHIPS_FOR_BATTLE", .. })
        ));
        assert!(load(&[("BIND_HOST", "localhost")]).is_err());
    }
}
