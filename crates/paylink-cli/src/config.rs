use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use config::{Config, ConfigError, File};
use paylink::{Address, Asset, LinkOrigin, SplitMode};
use paylink_wallet::ExecutorConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_WORK_DIR: &str = ".paylink";
pub const DEFAULT_ORIGIN: &str = "https://pay.example.com";
/// USD stablecoin mint
pub const DEFAULT_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Origin links are served from
    pub origin: String,
}

impl Default for Link {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSettings {
    pub mint: String,
    pub decimals: u8,
    pub symbol: String,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            mint: DEFAULT_MINT.to_string(),
            decimals: 6,
            symbol: "USDC".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub mode: SplitMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub link: Link,
    pub asset: AssetSettings,
    pub split: Split,
    pub executor: ExecutorConfig,
}

impl Settings {
    #[must_use]
    pub fn new<P>(config_file_name: Option<P>) -> Self
    where
        P: Into<PathBuf>,
    {
        let default_settings = Self::default();
        // attempt to construct settings with file
        let from_file = Self::new_from_default(&default_settings, config_file_name);
        match from_file {
            Ok(f) => f,
            Err(e) => {
                tracing::error!(
                    "Error reading config file, falling back to defaults. Error: {e}"
                );
                default_settings
            }
        }
    }

    fn new_from_default<P>(
        default: &Settings,
        config_file_name: Option<P>,
    ) -> Result<Self, ConfigError>
    where
        P: Into<PathBuf>,
    {
        let config: PathBuf = match config_file_name {
            Some(value) => value.into(),
            None => home::home_dir()
                .ok_or(ConfigError::NotFound("Config Path".to_string()))?
                .join(DEFAULT_WORK_DIR)
                .join("config.toml"),
        };

        Self::from_source(default, File::from(config))
    }

    fn from_source<S>(default: &Settings, source: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config: Config = Config::builder()
            // use defaults
            .add_source(Config::try_from(default)?)
            // override with file contents
            .add_source(source)
            .build()?;

        config.try_deserialize()
    }

    pub fn origin(&self) -> Result<LinkOrigin> {
        Ok(LinkOrigin::from_str(&self.link.origin)?)
    }

    pub fn asset(&self) -> Result<Asset> {
        Ok(Asset::new(
            Address::from_str(&self.asset.mint)?,
            self.asset.decimals,
            &self.asset.symbol,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use config::FileFormat;

    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();

        assert_eq!(settings.origin().unwrap().to_string(), DEFAULT_ORIGIN);
        assert_eq!(settings.asset().unwrap().decimals, 6);
        assert_eq!(settings.split.mode, SplitMode::SharedLink);
        assert_eq!(
            settings.executor.finality_timeout(),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_missing_file_falls_back() {
        let settings = Settings::new(Some("/nonexistent/paylink/config.toml"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let toml = r#"
[link]
origin = "https://split.example.org/"

[split]
mode = "per_participant_links"

[executor]
finality_timeout_ms = 15000
"#;
        let settings =
            Settings::from_source(&Settings::default(), File::from_str(toml, FileFormat::Toml))
                .unwrap();

        assert_eq!(
            settings.origin().unwrap().to_string(),
            "https://split.example.org"
        );
        assert_eq!(settings.split.mode, SplitMode::PerParticipantLinks);
        assert_eq!(settings.executor.finality_timeout_ms, 15_000);
        assert!(!settings.executor.verify_balance);
        assert_eq!(settings.asset, AssetSettings::default());
    }
}
