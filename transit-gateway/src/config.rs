//! Gateway configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::loader::{LoaderOptions, LoaderSettings};
use crate::service_time::DEFAULT_LOOKBEHIND;

/// Prefix shared by every environment variable the gateway reads.
pub const ENV_PREFIX: &str = "TRANSIT_GATEWAY_";

/// No root selection may return more rows than this, whatever is configured.
pub const MAX_LIMIT_SAFETY_CAP: usize = 10_000;

/// Error returned when an environment override cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value for {name}: {value:?}")]
pub struct ConfigError {
    pub name: String,
    pub value: String,
}

/// Deployment settings for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Keys per batch for ordinary loaders.
    pub loader_batch_size: usize,

    /// Keys per batch for the two stop-time loaders.
    pub stop_time_batch_size: usize,

    /// How long a batch waits for more keys.
    pub loader_wait: Duration,

    /// Rows returned when a query gives no usable limit.
    pub default_limit: usize,

    /// Largest limit honored by root selections.
    pub max_limit: usize,

    /// Largest limit for the `stops` and `trips` roots. Capped at
    /// [`MAX_LIMIT_SAFETY_CAP`].
    pub max_limit_large: usize,

    /// Largest search radius, in meters. Also bounds bounding boxes, whose
    /// approximate area must stay below its square.
    pub max_radius: f64,

    /// How far before a date's midnight the previous service day is
    /// searched, in seconds.
    pub lookbehind_secs: i32,

    /// Entries kept by the shared service-window cache.
    pub service_window_cache_capacity: u64,

    pub listen_addr: SocketAddr,

    /// Directory holding the warehouse snapshot.
    pub data_dir: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            loader_batch_size: 100,
            stop_time_batch_size: 100,
            loader_wait: Duration::from_millis(2),
            default_limit: 100,
            max_limit: 1000,
            max_limit_large: 1000,
            max_radius: 100_000.0,
            lookbehind_secs: DEFAULT_LOOKBEHIND,
            service_window_cache_capacity: 10_000,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            data_dir: None,
        }
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    let name = format!("{}{}", ENV_PREFIX, key);
    match lookup(&name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError { name, value }),
    }
}

impl GatewayConfig {
    /// Defaults overridden by `TRANSIT_GATEWAY_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    /// name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let d = Self::default();
        let wait_ms: u64 = parse(&lookup, "LOADER_WAIT_MS", 2)?;
        let data_dir: Option<String> = lookup(&format!("{}DATA_DIR", ENV_PREFIX));
        Ok(Self {
            loader_batch_size: parse(&lookup, "LOADER_BATCH_SIZE", d.loader_batch_size)?,
            stop_time_batch_size: parse(
                &lookup,
                "LOADER_STOP_TIME_BATCH_SIZE",
                d.stop_time_batch_size,
            )?,
            loader_wait: Duration::from_millis(wait_ms),
            default_limit: parse(&lookup, "DEFAULT_LIMIT", d.default_limit)?,
            max_limit: parse(&lookup, "MAX_LIMIT", d.max_limit)?,
            max_limit_large: parse(&lookup, "MAX_LIMIT_LARGE", d.max_limit_large)?,
            max_radius: parse(&lookup, "MAX_RADIUS", d.max_radius)?,
            lookbehind_secs: parse(&lookup, "LOOKBEHIND_SECS", d.lookbehind_secs)?,
            service_window_cache_capacity: parse(
                &lookup,
                "SERVICE_WINDOW_CACHE_CAPACITY",
                d.service_window_cache_capacity,
            )?,
            listen_addr: parse(&lookup, "LISTEN_ADDR", d.listen_addr)?,
            data_dir: data_dir.filter(|s| !s.trim().is_empty()).map(PathBuf::from),
        })
    }

    pub fn with_loader_batch_size(mut self, size: usize) -> Self {
        self.loader_batch_size = size;
        self
    }

    pub fn with_stop_time_batch_size(mut self, size: usize) -> Self {
        self.stop_time_batch_size = size;
        self
    }

    pub fn with_loader_wait(mut self, wait: Duration) -> Self {
        self.loader_wait = wait;
        self
    }

    pub fn with_limits(mut self, default_limit: usize, max_limit: usize) -> Self {
        self.default_limit = default_limit;
        self.max_limit = max_limit;
        self
    }

    pub fn with_max_limit_large(mut self, max_limit: usize) -> Self {
        self.max_limit_large = max_limit;
        self
    }

    pub fn with_max_radius(mut self, meters: f64) -> Self {
        self.max_radius = meters;
        self
    }

    pub fn with_lookbehind_secs(mut self, seconds: i32) -> Self {
        self.lookbehind_secs = seconds;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Batch thresholds for a request's loader set.
    pub fn loader_settings(&self) -> LoaderSettings {
        LoaderSettings {
            default: LoaderOptions::default()
                .with_wait(self.loader_wait)
                .with_capacity(self.loader_batch_size),
            stop_times: LoaderOptions::default()
                .with_wait(self.loader_wait)
                .with_capacity(self.stop_time_batch_size),
        }
    }

    /// The limit cap for the `stops` and `trips` roots.
    pub fn large_root_limit(&self) -> usize {
        self.max_limit_large.max(self.max_limit).min(MAX_LIMIT_SAFETY_CAP)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (format!("{}{}", ENV_PREFIX, k), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.loader_batch_size, 100);
        assert_eq!(config.stop_time_batch_size, 100);
        assert_eq!(config.loader_wait, Duration::from_millis(2));
        assert_eq!(config.default_limit, 100);
        assert_eq!(config.max_limit, 1000);
        assert_eq!(config.max_radius, 100_000.0);
        assert_eq!(config.lookbehind_secs, 6 * 3600);
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:8080");
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn environment_overrides() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("LOADER_BATCH_SIZE", "50"),
            ("LOADER_WAIT_MS", "10"),
            ("LOOKBEHIND_SECS", "3600"),
            ("DATA_DIR", "/srv/warehouse"),
            ("LISTEN_ADDR", "0.0.0.0:9000"),
        ]))
        .unwrap();
        assert_eq!(config.loader_batch_size, 50);
        assert_eq!(config.loader_wait, Duration::from_millis(10));
        assert_eq!(config.lookbehind_secs, 3600);
        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/warehouse")));
        assert_eq!(config.listen_addr.port(), 9000);
        assert_eq!(config.max_limit, 1000);
    }

    #[test]
    fn bad_override_names_the_variable() {
        let err = GatewayConfig::from_lookup(lookup(&[("MAX_LIMIT", "lots")])).unwrap_err();
        assert_eq!(err.name, "TRANSIT_GATEWAY_MAX_LIMIT");
        assert_eq!(err.value, "lots");
    }

    #[test]
    fn large_root_limit_is_capped() {
        let config = GatewayConfig::default().with_max_limit_large(50_000);
        assert_eq!(config.large_root_limit(), MAX_LIMIT_SAFETY_CAP);
        let config = GatewayConfig::default().with_max_limit_large(10);
        assert_eq!(config.large_root_limit(), 1000);
    }

    #[test]
    fn loader_settings_follow_batch_sizes() {
        let settings = GatewayConfig::default()
            .with_loader_batch_size(7)
            .with_stop_time_batch_size(3)
            .loader_settings();
        assert_eq!(settings.default.capacity, 7);
        assert_eq!(settings.stop_times.capacity, 3);
    }
}
