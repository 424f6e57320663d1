//! CLI configuration file

use anyhow::Context;
use iptv_core::{LoaderConfig, PlayerConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Contents of `--config <file.json>`. Missing sections use defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub loader: LoaderConfig,
    pub player: PlayerConfig,
}

impl CliConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.loader.validate()?;
        self.player.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: CliConfig =
            serde_json::from_str(r#"{"player": {"preload_enabled": false}}"#).unwrap();
        assert!(!config.player.preload_enabled);
        assert_eq!(config.player.failure_advance_delay_ms, 3000);
        assert_eq!(config.loader, LoaderConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = CliConfig::load(Some(Path::new("/no/such/iptv.json"))).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }
}
