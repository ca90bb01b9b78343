//! CLI configuration.

use anyhow::{Context, Result};
use edge_core::CacheConfig;
use edge_observability::LoggingConfig;
use serde::{Deserialize, Serialize};

/// CLI configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Cache settings (`[cache]` table).
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging settings (`[logging]` table).
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CliConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(path, &content)
    }

    /// Parse config content, choosing the format from the file extension.
    pub fn parse(path: &str, content: &str) -> Result<Self> {
        if path.ends_with(".json") {
            serde_json::from_str(content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            toml::from_str(content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }

    /// Config taken from the process environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            cache: CacheConfig::from_env().context("Invalid cache environment")?,
            logging: LoggingConfig::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use edge_observability::{LogFormat, LogLevel};

    use super::*;

    #[test]
    fn test_parse_toml() {
        let config = CliConfig::parse(
            "edge.toml",
            r#"
[cache]
bucket_prefix = "site"
build_id = "b1"

[logging]
level = "debug"
format = "human"
"#,
        )
        .unwrap();

        assert_eq!(config.cache.build_id.as_str(), "b1");
        assert_eq!(config.cache.cache_dir(), "site/data-cache/_next_cache");
        assert_eq!(config.cache.edge_cache_name(), "b1_nextjs-cache");
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Human);
    }

    #[test]
    fn test_parse_json() {
        let config =
            CliConfig::parse("edge.json", r#"{"cache": {"build_id": "b2"}}"#).unwrap();
        assert_eq!(config.cache.build_id.as_str(), "b2");
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config = CliConfig::parse("edge.toml", "").unwrap();
        assert_eq!(config.cache.cache_dir(), "data-cache/_next_cache");
    }

    #[test]
    fn test_parse_rejects_bad_toml() {
        assert!(CliConfig::parse("edge.toml", "[cache").is_err());
    }
}
