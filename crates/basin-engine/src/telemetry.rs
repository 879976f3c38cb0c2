//! Tracing setup

use basin_core::{EngineConfig, Error, Result};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

/// Parse the configured log directives
pub fn log_directives(config: &EngineConfig) -> Result<Vec<Directive>> {
    config
        .log_filter
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|e| Error::Config(format!("invalid log directive '{}': {}", s, e)))
        })
        .collect()
}

/// `RUST_LOG` plus the configured directives
pub fn env_filter(config: &EngineConfig) -> Result<EnvFilter> {
    Ok(log_directives(config)?
        .into_iter()
        .fold(EnvFilter::from_default_env(), |filter, directive| filter.add_directive(directive)))
}

/// Install a fmt subscriber filtered by [`env_filter`].
///
/// If a global subscriber is already installed it is left in place.
pub fn init_tracing(config: &EngineConfig) -> Result<()> {
    let filter = env_filter(config)?;
    if let Err(e) = tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        tracing::debug!("Keeping existing tracing subscriber: {}", e);
    }
    Ok(())
}
