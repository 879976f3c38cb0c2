//! Configuration types for Basin

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on tokens per well
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Reject operations whose timestamp is older than the well's last update.
    /// When false the elapsed time is clamped to zero instead.
    #[serde(default = "default_strict_clock")]
    pub strict_clock: bool,

    /// Comma-separated tracing directives added on top of `RUST_LOG`
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_max_tokens() -> usize {
    8
}

fn default_strict_clock() -> bool {
    true
}

fn default_log_filter() -> String {
    "wells=info,basin_engine=info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            strict_clock: default_strict_clock(),
            log_filter: default_log_filter(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_tokens < 2 {
            return Err(Error::Config(format!(
                "max_tokens must be at least 2, got {}",
                self.max_tokens
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.max_tokens, 8);
        assert!(config.strict_clock);
        assert_eq!(config.log_filter, "wells=info,basin_engine=info");
    }

    #[test]
    fn test_config_serialization() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.max_tokens, config.max_tokens);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(r#"{"strict_clock": false}"#).unwrap();
        assert!(!config.strict_clock);
        assert_eq!(config.max_tokens, 8);
    }

    #[test]
    fn test_rejects_tiny_token_limit() {
        let err = EngineConfig::from_json(r#"{"max_tokens": 1}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
