use crate::config::{LoggingConfig, OriginConfig, TraceConfig, UpdaterConfig};
use crate::config::graph::ModelConfig;
use crate::error::{Error, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub updater: UpdaterConfig,
    #[serde(default)]
    pub trace: TraceConfig,
    #[serde(default)]
    pub origins: Vec<OriginConfig>,
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

impl AppConfig {
    /// Loads `config/default`, then `config/<env>` if present, then
    /// `PRICEGRAPH__*` environment overrides.
    pub fn load(env: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("PRICEGRAPH").separator("__"))
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))
    }

    pub fn from_toml(source: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))
    }
}
