use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_DEPOSIT_POLL_INTERVAL_SECS, DEFAULT_TRANSACTION_AMOUNT_NANO, DEFAULT_WALLETS_LIST_URL,
    TONCENTER_MAINNET_URL, TONCENTER_TESTNET_URL,
};
use crate::errors::{BotError, Result};
use crate::wallet::TonAddress;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Telegram
    pub bot_token: String,
    pub bot_name: String,

    // Deposits
    pub deposit_address: String,
    pub transaction_amount_nano: u64,
    pub deposit_poll_interval_secs: u64,

    // Network Settings
    pub network: NetworkType,
    pub api_key: String,

    // TON Connect
    pub manifest_url: String,
    pub wallets_list_url: String,

    // Infrastructure
    pub redis_url: Option<String>,
    pub metrics_addr: Option<SocketAddr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkType {
    Mainnet,
    Testnet,
}

impl Config {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| BotError::config(format!("{} not set", key)))
        };

        let network = Self::parse_network(&lookup("NETWORK").unwrap_or_else(|| "testnet".to_string()));
        let api_key_var = match network {
            NetworkType::Mainnet => "MAINNET_API_KEY",
            NetworkType::Testnet => "TESTNET_API_KEY",
        };

        let metrics_addr = match lookup("METRICS_ADDR").filter(|v| !v.is_empty()) {
            Some(addr) => Some(
                SocketAddr::from_str(&addr)
                    .map_err(|e| BotError::config(format!("METRICS_ADDR is invalid: {}", e)))?,
            ),
            None => None,
        };

        Ok(Self {
            bot_token: required("BOT_TOKEN")?,
            bot_name: required("BOT_NAME")?,
            deposit_address: required("DEPOSIT_ADDRESS")?,
            transaction_amount_nano: lookup("TRANSACTION_AMOUNT_NANO")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TRANSACTION_AMOUNT_NANO),
            deposit_poll_interval_secs: lookup("DEPOSIT_POLL_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DEPOSIT_POLL_INTERVAL_SECS),

            network,
            api_key: lookup(api_key_var).unwrap_or_default(),

            manifest_url: required("TONCONNECT_MANIFEST_URL")?,
            wallets_list_url: lookup("WALLETS_LIST_URL")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_WALLETS_LIST_URL.to_string()),

            redis_url: lookup("REDIS_URL").filter(|v| !v.is_empty()),
            metrics_addr,
        })
    }

    fn parse_network(network: &str) -> NetworkType {
        match network.trim().to_lowercase().as_str() {
            "mainnet" => NetworkType::Mainnet,
            _ => NetworkType::Testnet,
        }
    }

    /// Toncenter HTTP API base URL for the selected network
    pub fn api_base_url(&self) -> &'static str {
        match self.network {
            NetworkType::Mainnet => TONCENTER_MAINNET_URL,
            NetworkType::Testnet => TONCENTER_TESTNET_URL,
        }
    }

    pub fn is_testnet(&self) -> bool {
        matches!(self.network, NetworkType::Testnet)
    }

    pub fn deposit_poll_interval(&self) -> Duration {
        Duration::from_secs(self.deposit_poll_interval_secs.max(1))
    }

    /// Link that adds the bot to a group
    pub fn share_url(&self) -> String {
        format!("https://t.me/{}?startgroup=frommenu", self.bot_name)
    }

    pub fn validate(&self) -> Result<()> {
        TonAddress::from_str(&self.deposit_address)
            .map_err(|e| BotError::config(format!("DEPOSIT_ADDRESS is invalid: {}", e)))?;

        if self.transaction_amount_nano == 0 {
            return Err(BotError::config("TRANSACTION_AMOUNT_NANO must be positive"));
        }

        if !self.manifest_url.starts_with("https://") && !self.manifest_url.starts_with("http://") {
            return Err(BotError::config("TONCONNECT_MANIFEST_URL must be an http(s) URL"));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        matches!(self.network, NetworkType::Mainnet)
    }
}
