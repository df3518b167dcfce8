use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use super::{address::TonAddress, transaction::TransactionRequest};
use crate::constants::CHAIN_TESTNET;
use crate::errors::WalletError;

/// A wallet app the user can pair with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletDescriptor {
    pub name: String,
    pub app_name: String,
    pub image: String,
    pub about_url: String,
    pub universal_url: String,
    pub bridge_url: String,
}

/// The wallet account exposed by a connected wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Raw `workchain:hex` address as reported by the wallet
    pub address: String,
    /// Chain id, `-239` for mainnet and `-3` for testnet
    pub chain: String,
    pub public_key: Option<String>,
}

impl Account {
    pub fn is_testnet(&self) -> bool {
        self.chain == CHAIN_TESTNET
    }

    /// Non-bounceable user-friendly form of the account address
    pub fn friendly_address(&self) -> Result<String, WalletError> {
        let address = TonAddress::from_str(&self.address)?;
        Ok(address.to_non_bounceable(self.is_testnet()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectorStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Wallet pairing capability for one chat session
#[async_trait]
pub trait WalletConnector: Send + Sync {
    /// Resume a persisted pairing; true when a valid session exists
    async fn restore_connection(&self) -> Result<bool, WalletError>;

    async fn list_supported_wallets(&self) -> Result<Vec<WalletDescriptor>, WalletError>;

    /// Start pairing with a wallet and return the URI to show as a QR code.
    /// Completion is observed through `status` and `account`.
    async fn connect(&self, wallet: &WalletDescriptor) -> Result<String, WalletError>;

    async fn status(&self) -> ConnectorStatus;

    /// Present only while connected
    async fn account(&self) -> Option<Account>;

    async fn disconnect(&self) -> Result<(), WalletError>;

    /// Ask the wallet to sign and send; returns the signed message BOC
    async fn send_transaction(
        &self,
        request: &TransactionRequest,
        timeout: Duration,
    ) -> Result<String, WalletError>;
}

/// Creates connectors for new sessions
pub trait ConnectorFactory: Send + Sync {
    fn create(&self, session_id: i64) -> Arc<dyn WalletConnector>;
}

/// Look up a wallet by its display name
pub fn find_wallet<'a>(
    wallets: &'a [WalletDescriptor],
    name: &str,
) -> Result<&'a WalletDescriptor, WalletError> {
    wallets
        .iter()
        .find(|w| w.name == name)
        .ok_or_else(|| WalletError::UnknownWallet(name.to_string()))
}
