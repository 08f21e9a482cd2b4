use std::env;
use std::str::FromStr;

use anyhow::Result;
use paylink::SplitMode;

use crate::config::{AssetSettings, Link, Settings};

pub const ENV_LINK_ORIGIN: &str = "PAYLINK_LINK_ORIGIN";
// Asset
pub const ENV_ASSET_MINT: &str = "PAYLINK_ASSET_MINT";
pub const ENV_ASSET_DECIMALS: &str = "PAYLINK_ASSET_DECIMALS";
pub const ENV_ASSET_SYMBOL: &str = "PAYLINK_ASSET_SYMBOL";
// Split
pub const ENV_SPLIT_MODE: &str = "PAYLINK_SPLIT_MODE";
// Executor
pub const ENV_FINALITY_TIMEOUT_MS: &str = "PAYLINK_EXECUTOR_FINALITY_TIMEOUT_MS";
pub const ENV_VERIFY_BALANCE: &str = "PAYLINK_EXECUTOR_VERIFY_BALANCE";

impl Settings {
    pub fn from_env(mut self) -> Result<Self> {
        if let Ok(mode) = env::var(ENV_SPLIT_MODE) {
            self.split.mode = SplitMode::from_str(&mode)?;
        }

        if let Ok(ms) = env::var(ENV_FINALITY_TIMEOUT_MS) {
            if let Ok(ms) = ms.parse() {
                self.executor.finality_timeout_ms = ms;
            }
        }

        if let Ok(verify) = env::var(ENV_VERIFY_BALANCE) {
            if let Ok(verify) = verify.parse() {
                self.executor.verify_balance = verify;
            }
        }

        self.link = self.link.from_env();
        self.asset = self.asset.from_env();

        Ok(self)
    }
}

impl Link {
    pub fn from_env(mut self) -> Self {
        if let Ok(origin) = env::var(ENV_LINK_ORIGIN) {
            self.origin = origin;
        }

        self
    }
}

impl AssetSettings {
    pub fn from_env(mut self) -> Self {
        if let Ok(mint) = env::var(ENV_ASSET_MINT) {
            self.mint = mint;
        }

        if let Ok(decimals) = env::var(ENV_ASSET_DECIMALS) {
            if let Ok(decimals) = decimals.parse() {
                self.decimals = decimals;
            }
        }

        if let Ok(symbol) = env::var(ENV_ASSET_SYMBOL) {
            self.symbol = symbol;
        }

        self
    }
}
