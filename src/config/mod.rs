//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::hardware::tokens::{TokenMap, TokenMapError, DEFAULT_TOKEN_TABLE};
use crate::hardware::DEFAULT_START_BYTE;
use crate::store::SupabaseConfig;
use crate::util::time::DEFAULT_TICK_RATE_HZ;

const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8765";
const DEFAULT_HARDWARE_ADDR: &str = "0.0.0.0:12000";
const DEFAULT_SCORES_TABLE: &str = "players";

/// Coin Cascade target pickup count bounds
pub const COIN_CAPACITY_RANGE: (usize, usize) = (3, 5);

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Observer WebSocket + HTTP binding address
    pub server_addr: SocketAddr,
    /// Raw TCP address hardware controllers dial into
    pub hardware_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    pub tick_rate_hz: u32,
    pub hardware_tokens: TokenMap,
    pub hardware_start_byte: u8,
    /// Seed for the simulators' RNG; random when unset
    pub sim_seed: Option<u64>,
    pub coin_capacity: usize,
    /// Whether observers may send `reset`
    pub allow_lobby_reset: bool,

    /// Supabase project, when scores should be stored remotely
    pub supabase: Option<SupabaseConfig>,
    pub scores_table: String,

    /// Allowed client origins for CORS (any origin when empty)
    pub client_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match var("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => var("SERVER_ADDR").unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string()),
        };
        let hardware_addr = var("HARDWARE_ADDR").unwrap_or_else(|| DEFAULT_HARDWARE_ADDR.to_string());

        let tick_rate_hz = parse_or(var("TICK_RATE_HZ"), "TICK_RATE_HZ", DEFAULT_TICK_RATE_HZ)?;
        if !(1..=1000).contains(&tick_rate_hz) {
            return Err(ConfigError::Invalid {
                key: "TICK_RATE_HZ",
                value: tick_rate_hz.to_string(),
            });
        }

        let hardware_tokens = TokenMap::parse(
            var("HARDWARE_TOKENS")
                .as_deref()
                .unwrap_or(DEFAULT_TOKEN_TABLE),
        )?;

        let hardware_start_byte = match var("HARDWARE_START_BYTE") {
            Some(value) => match value.as_bytes() {
                [byte] => *byte,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "HARDWARE_START_BYTE",
                        value,
                    })
                }
            },
            None => DEFAULT_START_BYTE,
        };

        let sim_seed = var("SIM_SEED")
            .map(|v| parse_value::<u64>(&v, "SIM_SEED"))
            .transpose()?;

        let (min_coins, max_coins) = COIN_CAPACITY_RANGE;
        let coin_capacity =
            parse_or(var("COIN_CAPACITY"), "COIN_CAPACITY", min_coins)?.clamp(min_coins, max_coins);

        let allow_lobby_reset = match var("ALLOW_LOBBY_RESET") {
            Some(v) => parse_flag(&v).ok_or(ConfigError::Invalid {
                key: "ALLOW_LOBBY_RESET",
                value: v,
            })?,
            None => false,
        };

        let supabase = match (var("SUPABASE_URL"), var("SUPABASE_SERVICE_ROLE_KEY")) {
            (Some(url), Some(service_role_key)) => Some(SupabaseConfig {
                url,
                service_role_key,
            }),
            _ => None,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress("SERVER_ADDR"))?,
            hardware_addr: hardware_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress("HARDWARE_ADDR"))?,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            tick_rate_hz,
            hardware_tokens,
            hardware_start_byte,
            sim_seed,
            coin_capacity,
            allow_lobby_reset,
            supabase,
            scores_table: var("SCORES_TABLE").unwrap_or_else(|| DEFAULT_SCORES_TABLE.to_string()),
            client_origins: var("CLIENT_ORIGIN")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

fn parse_value<T: FromStr>(value: &str, key: &'static str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

fn parse_or<T: FromStr>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match value {
        Some(v) => parse_value(&v, key),
        None => Ok(default),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid address format for {0}")]
    InvalidAddress(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("Invalid HARDWARE_TOKENS: {0}")]
    Tokens(#[from] TokenMapError),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::game::Action;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config(&[]).unwrap();

        assert_eq!(config.server_addr, "0.0.0.0:8765".parse().unwrap());
        assert_eq!(config.hardware_addr, "0.0.0.0:12000".parse().unwrap());
        assert_eq!(config.tick_rate_hz, 60);
        assert_eq!(config.hardware_start_byte, b'S');
        assert_eq!(config.hardware_tokens.decode("J"), Some(Action::Jump));
        assert_eq!(config.coin_capacity, 3);
        assert!(!config.allow_lobby_reset);
        assert!(config.supabase.is_none());
        assert_eq!(config.scores_table, "players");
        assert!(config.client_origins.is_empty());
        assert!(config.sim_seed.is_none());
    }

    #[test]
    fn port_overrides_server_addr() {
        let config = config(&[("PORT", "9000"), ("SERVER_ADDR", "127.0.0.1:1")]).unwrap();
        assert_eq!(config.server_addr, "0.0.0.0:9000".parse().unwrap());
    }

    #[test]
    fn overrides_are_applied() {
        let config = config(&[
            ("TICK_RATE_HZ", "30"),
            ("HARDWARE_TOKENS", "UP=jump,FIRE=button1"),
            ("HARDWARE_START_BYTE", "G"),
            ("SIM_SEED", "42"),
            ("COIN_CAPACITY", "9"),
            ("ALLOW_LOBBY_RESET", "true"),
            ("SUPABASE_URL", "https://x.supabase.co"),
            ("SUPABASE_SERVICE_ROLE_KEY", "secret"),
            ("CLIENT_ORIGIN", "http://a.test, http://b.test"),
        ])
        .unwrap();

        assert_eq!(config.tick_rate_hz, 30);
        assert_eq!(config.hardware_tokens.decode("UP"), Some(Action::Jump));
        assert_eq!(config.hardware_tokens.decode("J"), None);
        assert_eq!(config.hardware_start_byte, b'G');
        assert_eq!(config.sim_seed, Some(42));
        assert_eq!(config.coin_capacity, 5);
        assert!(config.allow_lobby_reset);
        assert_eq!(config.supabase.unwrap().url, "https://x.supabase.co");
        assert_eq!(config.client_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn supabase_needs_both_url_and_key() {
        let config = config(&[("SUPABASE_URL", "https://x.supabase.co")]).unwrap();
        assert!(config.supabase.is_none());
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(matches!(
            config(&[("TICK_RATE_HZ", "0")]),
            Err(ConfigError::Invalid { key: "TICK_RATE_HZ", .. })
        ));
        assert!(matches!(
            config(&[("HARDWARE_START_BYTE", "GO")]),
            Err(ConfigError::Invalid { key: "HARDWARE_START_BYTE", .. })
        ));
        assert!(matches!(
            config(&[("HARDWARE_ADDR", "nowhere")]),
            Err(ConfigError::InvalidAddress("HARDWARE_ADDR"))
        ));
        assert!(matches!(
            config(&[("HARDWARE_TOKENS", "J")]),
            Err(ConfigError::Tokens(_))
        ));
        assert!(matches!(
            config(&[("ALLOW_LOBBY_RESET", "maybe")]),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
