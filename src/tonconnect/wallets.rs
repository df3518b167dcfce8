use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::errors::{BotError, Result};
use crate::wallet::WalletDescriptor;

/// Entry of the public wallets list
#[derive(Debug, Clone, Deserialize)]
struct WalletListEntry {
    app_name: String,
    name: String,
    #[serde(default)]
    image: String,
    #[serde(default)]
    about_url: String,
    #[serde(default)]
    universal_url: Option<String>,
    #[serde(default)]
    bridge: Vec<BridgeEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct BridgeEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    url: Option<String>,
}

/// Keep wallets reachable through an SSE bridge and a universal link
pub fn parse_wallets_list(json: &str) -> Result<Vec<WalletDescriptor>> {
    let entries: Vec<WalletListEntry> = serde_json::from_str(json)?;
    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            let universal_url = entry.universal_url?;
            let bridge_url = entry
                .bridge
                .into_iter()
                .find(|b| b.kind == "sse")
                .and_then(|b| b.url)?;
            Some(WalletDescriptor {
                name: entry.name,
                app_name: entry.app_name,
                image: entry.image,
                about_url: entry.about_url,
                universal_url,
                bridge_url,
            })
        })
        .collect())
}

/// Used when the wallets list cannot be fetched
pub fn fallback_wallets() -> Vec<WalletDescriptor> {
    vec![
        WalletDescriptor {
            name: "Tonkeeper".to_string(),
            app_name: "tonkeeper".to_string(),
            image: "https://tonkeeper.com/assets/tonconnect-icon.png".to_string(),
            about_url: "https://tonkeeper.com".to_string(),
            universal_url: "https://app.tonkeeper.com/ton-connect".to_string(),
            bridge_url: "https://bridge.tonapi.io/bridge".to_string(),
        },
        WalletDescriptor {
            name: "MyTonWallet".to_string(),
            app_name: "mytonwallet".to_string(),
            image: "https://static.mytonwallet.io/icon-256.png".to_string(),
            about_url: "https://mytonwallet.io".to_string(),
            universal_url: "https://connect.mytonwallet.org".to_string(),
            bridge_url: "https://tonconnectbridge.mytonwallet.org/bridge".to_string(),
        },
        WalletDescriptor {
            name: "Tonhub".to_string(),
            app_name: "tonhub".to_string(),
            image: "https://tonhub.com/tonconnect_logo.png".to_string(),
            about_url: "https://tonhub.com".to_string(),
            universal_url: "https://tonhub.com/ton-connect".to_string(),
            bridge_url: "https://connect.tonhubapi.com/tonconnect".to_string(),
        },
    ]
}

/// Supported wallets, fetched once and cached for the process lifetime
pub struct WalletCatalog {
    client: Client,
    url: String,
    cache: RwLock<Option<Vec<WalletDescriptor>>>,
}

impl WalletCatalog {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            cache: RwLock::new(None),
        }
    }

    /// Catalog with a fixed list and no network access
    pub fn with_wallets(wallets: Vec<WalletDescriptor>) -> Self {
        Self {
            client: Client::new(),
            url: String::new(),
            cache: RwLock::new(Some(wallets)),
        }
    }

    pub async fn wallets(&self) -> Vec<WalletDescriptor> {
        if let Some(wallets) = self.cache.read().await.as_ref() {
            return wallets.clone();
        }

        let wallets = match self.fetch().await {
            Ok(wallets) if !wallets.is_empty() => {
                info!("Loaded {} wallets from {}", wallets.len(), self.url);
                wallets
            }
            Ok(_) => {
                warn!("Wallets list at {} has no usable entries, using built-in list", self.url);
                fallback_wallets()
            }
            Err(e) => {
                // Not cached, so the next request tries the network again
                warn!("Failed to fetch wallets list: {}, using built-in list", e);
                return fallback_wallets();
            }
        };

        *self.cache.write().await = Some(wallets.clone());
        wallets
    }

    async fn fetch(&self) -> Result<Vec<WalletDescriptor>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| BotError::external_api(format!("Wallets list request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(BotError::external_api(format!(
                "Wallets list request failed with status {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        parse_wallets_list(&body)
    }
}
