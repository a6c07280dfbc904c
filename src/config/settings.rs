/// Runtime configuration structures

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::{SentinelError, APPROX_SOL_USD, GRADUATION_MCAP_USD};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub aggregator: AggregatorConfig,
    pub resolver: ResolverConfig,
    pub feed: FeedConfig,
    pub coordinator: CoordinatorConfig,
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Trailing window for hot token detection
    pub window_secs: u64,
    pub min_signals: usize,
    /// Tokens with no event inside this horizon are dropped entirely
    pub retention_hours: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            window_secs: 300,
            min_signals: 2,
            retention_hours: 24,
        }
    }
}

impl AggregatorConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours * 3600)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub live_max_age_secs: u64,
    pub cache_ttl_secs: u64,
    pub sol_usd_rate: f64,
    pub graduation_mcap_usd: f64,
    pub pumpfun_api_url: String,
    /// Fallback tier is disabled when unset
    pub helius_rpc_url: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            live_max_age_secs: 60,
            cache_ttl_secs: 30,
            sol_usd_rate: APPROX_SOL_USD,
            graduation_mcap_usd: GRADUATION_MCAP_USD,
            pumpfun_api_url: "https://frontend-api.pump.fun".to_string(),
            helius_rpc_url: None,
            request_timeout_secs: 10,
        }
    }
}

impl ResolverConfig {
    pub fn live_max_age(&self) -> Duration {
        Duration::from_secs(self.live_max_age_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    pub enabled: bool,
    pub url: String,
    pub reconnect_delay_secs: u64,
    /// A connection silent for this long is treated as dead
    pub receive_timeout_secs: u64,
    /// Upper bound on mints with an open trade subscription
    pub max_watched: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "wss://pumpportal.fun/api/data".to_string(),
            reconnect_delay_secs: 5,
            receive_timeout_secs: 60,
            max_watched: 1_000,
        }
    }
}

impl FeedConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_secs(self.receive_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub poll_interval_secs: u64,
    pub min_conviction: u32,
    pub max_curve_percent: f64,
    pub processed_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            min_conviction: 85,
            max_curve_percent: 70.0,
            processed_capacity: 50_000,
        }
    }
}

impl CoordinatorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    pub signal_buffer: usize,
    pub alert_buffer: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            signal_buffer: 1024,
            alert_buffer: 256,
        }
    }
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, SentinelError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads the file when it exists, otherwise starts from defaults.
    /// Environment overrides are applied last.
    pub fn load(path: Option<&str>) -> Result<Self, SentinelError> {
        let mut config = match path {
            Some(path) if Path::new(path).exists() => {
                info!("📄 Loading configuration from {}", path);
                Self::load_from_file(path)?
            }
            Some(path) => {
                info!("📄 No configuration at {} - using defaults", path);
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api) = lookup("PUMPFUN_API") {
            self.resolver.pumpfun_api_url = api;
        }
        if let Some(key) = lookup("HELIUS_API_KEY").filter(|k| !k.is_empty()) {
            self.resolver.helius_rpc_url =
                Some(format!("https://mainnet.helius-rpc.com/?api-key={}", key));
        }
        if let Some(ws) = lookup("PUMPPORTAL_WS") {
            self.feed.url = ws;
        }
        if let Some(min) = lookup("SENTINEL_MIN_CONVICTION").and_then(|v| v.parse().ok()) {
            self.coordinator.min_conviction = min;
        }
        debug!("Environment overrides applied");
    }

    pub fn validate(&self) -> Result<(), SentinelError> {
        if self.aggregator.window_secs == 0 {
            return Err(SentinelError::Config("aggregator.window_secs must be > 0".into()));
        }
        if self.aggregator.min_signals == 0 {
            return Err(SentinelError::Config("aggregator.min_signals must be > 0".into()));
        }
        if self.coordinator.poll_interval_secs == 0 {
            return Err(SentinelError::Config("coordinator.poll_interval_secs must be > 0".into()));
        }
        if !(0.0..=100.0).contains(&self.coordinator.max_curve_percent) {
            return Err(SentinelError::Config(
                "coordinator.max_curve_percent must be within [0, 100]".into(),
            ));
        }
        if self.resolver.graduation_mcap_usd <= 0.0 || self.resolver.sol_usd_rate <= 0.0 {
            return Err(SentinelError::Config(
                "resolver.graduation_mcap_usd and resolver.sol_usd_rate must be positive".into(),
            ));
        }
        if self.feed.max_watched == 0 {
            return Err(SentinelError::Config("feed.max_watched must be > 0".into()));
        }
        if self.transport.signal_buffer == 0 || self.transport.alert_buffer == 0 {
            return Err(SentinelError::Config("transport buffers must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let config = Config::default();
        assert_eq!(config.aggregator.window(), Duration::from_secs(300));
        assert_eq!(config.aggregator.min_signals, 2);
        assert_eq!(config.resolver.cache_ttl(), Duration::from_secs(30));
        assert_eq!(config.resolver.live_max_age(), Duration::from_secs(60));
        assert_eq!(config.feed.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(config.coordinator.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.coordinator.min_conviction, 85);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[coordinator]\nmin_conviction = 100\n\n[resolver]\nsol_usd_rate = 150.0"
        )
        .unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.coordinator.min_conviction, 100);
        assert_eq!(config.coordinator.poll_interval_secs, 30);
        assert_eq!(config.resolver.sol_usd_rate, 150.0);
        assert_eq!(config.resolver.graduation_mcap_usd, GRADUATION_MCAP_USD);
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[coordinator\nmin_conviction = ").unwrap();
        assert!(matches!(
            Config::load_from_file(file.path()),
            Err(SentinelError::Toml(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| match key {
            "HELIUS_API_KEY" => Some("secret".to_string()),
            "SENTINEL_MIN_CONVICTION" => Some("120".to_string()),
            _ => None,
        });

        assert_eq!(
            config.resolver.helius_rpc_url.as_deref(),
            Some("https://mainnet.helius-rpc.com/?api-key=secret")
        );
        assert_eq!(config.coordinator.min_conviction, 120);
        assert_eq!(config.feed.url, "wss://pumpportal.fun/api/data");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.coordinator.max_curve_percent = 140.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.aggregator.window_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.feed.max_watched = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = Config::load(path.to_str()).unwrap();
        assert_eq!(config.aggregator.retention_hours, 24);
    }
}
