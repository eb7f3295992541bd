use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use party_shared::config::MatchTuning;

use crate::player::{Roster, RosterError};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP + WebSocket bind address
    pub listen_addr: String,
    /// TCP bind address for physical controllers
    pub controller_addr: String,
    pub tick_rate_hz: u32,
    pub broadcast_rate_hz: u32,
    /// Base seed; each match adds its sequence number
    pub rng_seed: u64,
    /// Length of matches that do not end on lives
    pub match_duration_secs: u64,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Roster in force until the first `init`
    pub player_names: Vec<String>,
    pub tuning: MatchTuning,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9001".to_string(),
            controller_addr: "0.0.0.0:9002".to_string(),
            tick_rate_hz: 60,
            broadcast_rate_hz: 15,
            rng_seed: 42,
            match_duration_secs: 90,
            log_level: "info".to_string(),
            player_names: vec!["Mario".to_string(), "Waluigi".to_string()],
            tuning: MatchTuning::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("{0}")]
    Rejected(String),
}

impl ServerConfig {
    /// Defaults overridden by `PARTY_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("PARTY_LISTEN_ADDR") {
            config.listen_addr = parse_addr("PARTY_LISTEN_ADDR", addr)?;
        }
        if let Some(addr) = lookup("PARTY_CONTROLLER_ADDR") {
            config.controller_addr = parse_addr("PARTY_CONTROLLER_ADDR", addr)?;
        }
        if let Some(v) = lookup("PARTY_TICK_RATE_HZ") {
            config.tick_rate_hz = parse("PARTY_TICK_RATE_HZ", v)?;
        }
        if let Some(v) = lookup("PARTY_BROADCAST_RATE_HZ") {
            config.broadcast_rate_hz = parse("PARTY_BROADCAST_RATE_HZ", v)?;
        }
        if let Some(v) = lookup("PARTY_RNG_SEED") {
            config.rng_seed = parse("PARTY_RNG_SEED", v)?;
        }
        if let Some(v) = lookup("PARTY_MATCH_DURATION_SECS") {
            config.match_duration_secs = parse("PARTY_MATCH_DURATION_SECS", v)?;
        }
        if let Some(level) = lookup("PARTY_LOG_LEVEL") {
            config.log_level = level;
        }
        if let Some(names) = lookup("PARTY_PLAYER_NAMES") {
            config.player_names = parse_names(&names);
        }

        config.validate().map_err(ConfigError::Rejected)?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_rate_hz == 0 {
            return Err("tick_rate_hz must be > 0".to_string());
        }
        if self.broadcast_rate_hz == 0 {
            return Err("broadcast_rate_hz must be > 0".to_string());
        }
        if self.broadcast_rate_hz > self.tick_rate_hz {
            return Err(format!(
                "broadcast_rate_hz ({}) must be <= tick_rate_hz ({})",
                self.broadcast_rate_hz, self.tick_rate_hz
            ));
        }
        if self.match_duration_secs == 0 {
            return Err("match_duration_secs must be > 0".to_string());
        }
        if self.match_duration_secs > MAX_MATCH_DURATION_SECS {
            return Err(format!(
                "match_duration_secs ({}) must be <= {}",
                self.match_duration_secs, MAX_MATCH_DURATION_SECS
            ));
        }
        self.roster().map_err(|e| format!("player_names: {}", e))?;
        self.tuning.validate()
    }

    pub fn match_duration_ms(&self) -> u64 {
        self.match_duration_secs.saturating_mul(1000)
    }

    /// The roster the lobby starts with.
    pub fn roster(&self) -> Result<Roster, RosterError> {
        Roster::new(self.player_names.clone())
    }
}

/// One day.
const MAX_MATCH_DURATION_SECS: u64 = 86_400;

/// Comma-separated, blanks dropped.
fn parse_names(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

fn parse_addr(name: &'static str, value: String) -> Result<String, ConfigError> {
    match value.trim().parse::<SocketAddr>() {
        Ok(addr) => Ok(addr.to_string()),
        Err(_) => Err(ConfigError::Invalid { name, value }),
    }
}
