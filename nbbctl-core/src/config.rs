//! Database endpoint and pool configuration.
//!
//! Values come from the process environment, optionally seeded from `.env`
//! files. Every required parameter is checked up front so a missing one is
//! reported by name before any connection is attempted.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{CoreError, Result};

pub const ENV_HOST: &str = "DB_HOST";
pub const ENV_DATABASE: &str = "DB_NAME";
pub const ENV_USER: &str = "DB_USER";
pub const ENV_PASSWORD: &str = "DB_PASS";
pub const ENV_PORT: &str = "DB_PORT";
pub const ENV_POOL_MIN: &str = "NBB_POOL_MIN";
pub const ENV_POOL_MAX: &str = "NBB_POOL_MAX";
pub const ENV_ACQUIRE_TIMEOUT: &str = "NBB_ACQUIRE_TIMEOUT_SECS";

pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 32;

/// Load environment variables from .env files
///
/// Priority order (highest to lowest):
/// 1. Variables already set in the environment
/// 2. Current directory .env
/// 3. ~/.nbbctl/.env
///
/// dotenvy never overwrites a variable that is already set.
pub fn load_dotenv() {
    let mut loaded_from = Vec::new();

    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded .env from current directory: {}", path.display());
        loaded_from.push(path.display().to_string());
    }

    if let Some(env_file) = config_dir().map(|dir| dir.join(".env")) {
        if env_file.exists() {
            match dotenvy::from_path(&env_file) {
                Ok(()) => {
                    debug!("Loaded .env from {}", env_file.display());
                    loaded_from.push(env_file.display().to_string());
                }
                Err(e) => debug!("Failed to load {}: {}", env_file.display(), e),
            }
        }
    }

    if loaded_from.is_empty() {
        debug!("No .env files found, using process environment only");
    } else {
        info!("Loaded configuration from: {}", loaded_from.join(", "));
    }
}

/// Get the nbbctl config directory path (~/.nbbctl)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".nbbctl"))
}

/// Bounds of the connection pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub min_connections: u32,
    pub max_connections: u32,
    /// How long `acquire` waits for a free connection; `None` keeps the
    /// driver default.
    pub acquire_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: DEFAULT_MIN_CONNECTIONS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: None,
        }
    }
}

/// Everything needed to open the connection pool.
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub port: u16,
    pub pool: PoolConfig,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("pool", &self.pool)
            .finish()
    }
}

impl DbConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String> {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| CoreError::missing_parameter(name))
        };
        let optional = |name: &'static str| -> Option<String> {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let host = required(ENV_HOST)?;
        let database = required(ENV_DATABASE)?;
        let user = required(ENV_USER)?;
        let password = required(ENV_PASSWORD)?;
        let port_raw = required(ENV_PORT)?;
        let port = port_raw.parse::<u16>().map_err(|_| {
            CoreError::invalid_parameter(ENV_PORT, &port_raw, "expected a TCP port number")
        })?;

        let mut pool = PoolConfig::default();
        if let Some(raw) = optional(ENV_POOL_MIN) {
            pool.min_connections = parse_count(ENV_POOL_MIN, &raw)?;
        }
        if let Some(raw) = optional(ENV_POOL_MAX) {
            pool.max_connections = parse_count(ENV_POOL_MAX, &raw)?;
            if pool.max_connections == 0 {
                return Err(CoreError::invalid_parameter(
                    ENV_POOL_MAX,
                    raw,
                    "pool needs at least one connection",
                ));
            }
        }
        if pool.min_connections > pool.max_connections {
            return Err(CoreError::invalid_parameter(
                ENV_POOL_MIN,
                pool.min_connections.to_string(),
                format!("exceeds {} ({})", ENV_POOL_MAX, pool.max_connections),
            ));
        }
        if let Some(raw) = optional(ENV_ACQUIRE_TIMEOUT) {
            let secs = raw.parse::<u64>().map_err(|_| {
                CoreError::invalid_parameter(ENV_ACQUIRE_TIMEOUT, &raw, "expected whole seconds")
            })?;
            pool.acquire_timeout = Some(Duration::from_secs(secs));
        }

        Ok(Self {
            host,
            database,
            user,
            password,
            port,
            pool,
        })
    }

    /// `host:port/database`, safe to log.
    pub fn endpoint(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

fn parse_count(name: &'static str, raw: &str) -> Result<u32> {
    raw.parse::<u32>()
        .map_err(|_| CoreError::invalid_parameter(name, raw, "expected a connection count"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const BASE: [(&str, &str); 5] = [
        ("DB_HOST", "localhost"),
        ("DB_NAME", "nbb"),
        ("DB_USER", "scraper"),
        ("DB_PASS", "secret"),
        ("DB_PORT", "5432"),
    ];

    #[test]
    fn test_complete_environment() {
        let config = DbConfig::from_lookup(env(&BASE)).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5432);
        assert_eq!(config.pool, PoolConfig::default());
        assert_eq!(config.endpoint(), "localhost:5432/nbb");
    }

    #[test]
    fn test_each_missing_parameter_is_named() {
        for (missing, _) in BASE {
            let pairs: Vec<_> = BASE.iter().copied().filter(|(k, _)| *k != missing).collect();
            let err = DbConfig::from_lookup(env(&pairs)).unwrap_err();
            assert!(
                matches!(err, CoreError::MissingParameter { name } if name == missing),
                "expected {missing} to be reported, got {err}"
            );
        }
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut pairs = BASE.to_vec();
        pairs[3] = ("DB_PASS", "   ");
        let err = DbConfig::from_lookup(env(&pairs)).unwrap_err();
        assert_eq!(err.to_string(), "Missing required parameter DB_PASS");
    }

    #[test]
    fn test_invalid_port() {
        let mut pairs = BASE.to_vec();
        pairs[4] = ("DB_PORT", "postgres");
        let err = DbConfig::from_lookup(env(&pairs)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidParameter { name: "DB_PORT", .. }));
    }

    #[test]
    fn test_pool_overrides() {
        let mut pairs = BASE.to_vec();
        pairs.push(("NBB_POOL_MIN", "2"));
        pairs.push(("NBB_POOL_MAX", "8"));
        pairs.push(("NBB_ACQUIRE_TIMEOUT_SECS", "30"));
        let config = DbConfig::from_lookup(env(&pairs)).unwrap();
        assert_eq!(config.pool.min_connections, 2);
        assert_eq!(config.pool.max_connections, 8);
        assert_eq!(config.pool.acquire_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_pool_min_above_max_is_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("NBB_POOL_MIN", "10"));
        pairs.push(("NBB_POOL_MAX", "4"));
        let err = DbConfig::from_lookup(env(&pairs)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidParameter { name: "NBB_POOL_MIN", .. }));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = DbConfig::from_lookup(env(&BASE)).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
