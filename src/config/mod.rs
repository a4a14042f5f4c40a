use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::interfaces::origin::Query;

pub mod graph;
pub mod loader;

pub use graph::{ModelConfig, NodeConfig};
pub use loader::AppConfig;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Period of the background refresh loop used by `pricegraph --watch`.
    pub interval_secs: u64,
    /// Upper bound for a single refresh pass; 0 disables it.
    pub timeout_secs: u64,
    pub max_concurrency: Option<usize>,
}

impl UpdaterConfig {
    /// Never shorter than a second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        UpdaterConfig {
            interval_secs: 60,
            timeout_secs: 30,
            max_concurrency: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Meta keys left out of the trace view (JSON output keeps them).
    pub hidden_meta_keys: Vec<String>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        TraceConfig {
            hidden_meta_keys: vec![
                "headers".to_string(),
                "collector_id".to_string(),
                "request_id".to_string(),
            ],
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OriginConfig {
    Static {
        name: String,
        #[serde(default)]
        prices: Vec<StaticPriceConfig>,
    },
}

impl OriginConfig {
    pub fn name(&self) -> &str {
        match self {
            OriginConfig::Static { name, .. } => name,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StaticPriceConfig {
    pub query: Query,
    pub price: f64,
    #[serde(default)]
    pub volume24h: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updater_durations() {
        let config = UpdaterConfig { interval_secs: 15, timeout_secs: 0, max_concurrency: None };
        assert_eq!(config.interval(), Duration::from_secs(15));
        assert_eq!(config.timeout(), None);

        let config = UpdaterConfig { interval_secs: 0, ..UpdaterConfig::default() };
        assert_eq!(config.interval(), Duration::from_secs(1));
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }
}
