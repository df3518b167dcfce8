//! JSON messages exchanged with wallets over the bridge.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::WalletError;
use crate::wallet::Account;

/// RPC error code wallets use when the user declines a request
pub const USER_REJECTS_ERROR: i64 = 300;

#[derive(Debug, Clone, Serialize)]
pub struct ConnectRequest {
    #[serde(rename = "manifestUrl")]
    pub manifest_url: String,
    pub items: Vec<ConnectItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectItem {
    pub name: String,
}

impl ConnectRequest {
    /// Request only the wallet address
    pub fn address_only(manifest_url: impl Into<String>) -> Self {
        Self {
            manifest_url: manifest_url.into(),
            items: vec![ConnectItem {
                name: "ton_addr".to_string(),
            }],
        }
    }
}

/// `data` field of a bridge server-sent event
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeMessage {
    /// Sender client id (hex public key)
    pub from: String,
    /// Base64 `nonce || ciphertext`
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    pub method: String,
    pub params: Vec<String>,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcResponse {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// Signed BOC on success, classified wallet error otherwise
    pub fn into_result(self) -> Result<String, WalletError> {
        if let Some(error) = self.error {
            return Err(if error.code == USER_REJECTS_ERROR {
                WalletError::UserRejection
            } else {
                WalletError::Protocol(format!("wallet error {}: {}", error.code, error.message))
            });
        }
        match self.result {
            Some(Value::String(boc)) => Ok(boc),
            Some(other) => Ok(other.to_string()),
            None => Err(WalletError::Protocol("empty wallet response".to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "name")]
pub enum ConnectItemReply {
    #[serde(rename = "ton_addr")]
    TonAddr {
        address: String,
        network: String,
        #[serde(rename = "publicKey", default)]
        public_key: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConnectPayload {
    pub items: Vec<ConnectItemReply>,
}

impl ConnectPayload {
    pub fn account(&self) -> Option<Account> {
        self.items.iter().find_map(|item| match item {
            ConnectItemReply::TonAddr {
                address,
                network,
                public_key,
            } => Some(Account {
                address: address.clone(),
                chain: network.clone(),
                public_key: public_key.clone(),
            }),
            ConnectItemReply::Other => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConnectErrorPayload {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WalletEvent {
    Connect { payload: ConnectPayload },
    ConnectError { payload: ConnectErrorPayload },
    Disconnect {},
}

/// Anything a wallet can send us once decrypted
#[derive(Debug, Clone, PartialEq)]
pub enum WalletMessage {
    Event(WalletEvent),
    Response(RpcResponse),
}

pub fn parse_wallet_message(text: &[u8]) -> Result<WalletMessage, WalletError> {
    let value: Value = serde_json::from_slice(text)?;
    if value.get("event").is_some() {
        Ok(WalletMessage::Event(serde_json::from_value(value)?))
    } else {
        Ok(WalletMessage::Response(serde_json::from_value(value)?))
    }
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}
