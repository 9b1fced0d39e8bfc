//! Server configuration from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::distance::{DEFAULT_BASE_URL, OsrmConfig};
use crate::store::RestStoreConfig;

/// Radius used when a request doesn't give one, in meters.
pub const DEFAULT_DISCOVERY_RADIUS_M: f64 = 500.0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("no data store configured: set STORE_URL and STORE_API_KEY, or STORE_FIXTURE")]
    MissingStore,
}

/// Where stop and route data comes from.
#[derive(Debug, Clone)]
pub enum StoreSource {
    Rest(RestStoreConfig),
    Fixture(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub routing: OsrmConfig,
    pub store: StoreSource,
    pub cache: CacheConfig,
    pub discovery_radius_m: f64,
}

impl ServerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which returns a variable's value
    /// if it is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let bind_addr = env.parse("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?;

        let routing = OsrmConfig::new(env.string("ROUTING_BASE_URL", DEFAULT_BASE_URL))
            .with_timeout(Duration::from_secs(env.parse("ROUTING_TIMEOUT_SECS", 30)?))
            .with_probe_timeout(Duration::from_secs(
                env.parse("ROUTING_PROBE_TIMEOUT_SECS", 5)?,
            ));

        let store = match (env.get("STORE_URL"), env.get("STORE_API_KEY"), env.get("STORE_FIXTURE")) {
            (Some(url), Some(key), _) => StoreSource::Rest(RestStoreConfig::new(url, key)),
            (_, _, Some(path)) => StoreSource::Fixture(PathBuf::from(path)),
            _ => return Err(ConfigError::MissingStore),
        };

        let defaults = CacheConfig::default();
        let cache = CacheConfig {
            max_capacity: env.parse("JOURNEY_CACHE_CAPACITY", defaults.max_capacity)?,
            ttl: Duration::from_secs(env.parse("JOURNEY_CACHE_TTL_SECS", defaults.ttl.as_secs())?),
        };

        let discovery_radius_m = env.parse("DISCOVERY_RADIUS_M", DEFAULT_DISCOVERY_RADIUS_M)?;
        if !(discovery_radius_m.is_finite() && discovery_radius_m > 0.0) {
            return Err(ConfigError::Invalid {
                key: "DISCOVERY_RADIUS_M",
                value: discovery_radius_m.to_string(),
            });
        }

        Ok(Self {
            bind_addr,
            routing,
            store,
            cache,
            discovery_radius_m,
        })
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Set and non-blank.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { key, value }),
        }
    }
}
