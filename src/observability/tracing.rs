use tracing::Span;
use tracing_subscriber::{fmt, EnvFilter};
use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Installs the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::ConfigError(e.to_string()))?;

    let builder = fmt().with_env_filter(filter).with_target(false);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| Error::ConfigError(e.to_string()))
}

pub fn trace_update_pass(models: usize, origins: usize) -> Span {
    tracing::info_span!(
        "update",
        models = models,
        origins = origins,
    )
}

pub fn trace_origin_fetch(origin: &str, queries: usize) -> Span {
    tracing::info_span!(
        "fetch",
        origin = %origin,
        queries = queries,
    )
}
