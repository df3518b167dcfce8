use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::constants::DEPOSIT_PAGE_LIMIT;
use crate::errors::{BotError, Result};
use crate::utils::Config;

/// Toncenter HTTP API v2 client
#[derive(Clone)]
pub struct ToncenterClient {
    client: Client,
    base_url: String,
    api_key: String,
}

/// Envelope every v2 endpoint answers with
#[derive(Debug, Deserialize)]
pub struct ToncenterResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub error: Option<String>,
    pub code: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionId {
    /// Logical time, sent as a decimal string
    pub lt: String,
    pub hash: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InMessage {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub destination: String,
    /// Nano-TON amount as a decimal string
    #[serde(default)]
    pub value: String,
    /// Decoded text comment, empty when the message carries none
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountTransaction {
    pub utime: i64,
    pub transaction_id: TransactionId,
    #[serde(default)]
    pub in_msg: Option<InMessage>,
}

impl AccountTransaction {
    pub fn lt(&self) -> Option<u64> {
        self.transaction_id.lt.parse().ok()
    }

    /// Incoming value in nano-TON, 0 when absent or malformed
    pub fn incoming_value(&self) -> u64 {
        self.in_msg
            .as_ref()
            .and_then(|m| m.value.parse().ok())
            .unwrap_or(0)
    }

    pub fn comment(&self) -> &str {
        self.in_msg.as_ref().map(|m| m.message.as_str()).unwrap_or("")
    }
}

impl ToncenterClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BotError::internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.api_base_url(), config.api_key.clone())
    }

    /// Latest transactions of `address`, newest first as returned by the API
    pub async fn get_transactions(&self, address: &str) -> Result<Vec<AccountTransaction>> {
        let url = format!("{}/api/v2/getTransactions", self.base_url);
        let limit = DEPOSIT_PAGE_LIMIT.to_string();

        let mut request = self.client.get(&url).query(&[
            ("address", address),
            ("limit", limit.as_str()),
            ("archival", "true"),
        ]);
        if !self.api_key.is_empty() {
            request = request.header("X-API-Key", &self.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BotError::external_api(format!("getTransactions request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(BotError::external_api(format!(
                "getTransactions failed with status {}: {}",
                status, error_text
            )));
        }

        let body: ToncenterResponse<Vec<AccountTransaction>> = response
            .json()
            .await
            .map_err(|e| BotError::external_api(format!("Failed to parse transactions: {}", e)))?;

        let transactions = Self::into_result(body)?;
        debug!("Fetched {} transactions for {}", transactions.len(), address);
        Ok(transactions)
    }

    fn into_result<T>(body: ToncenterResponse<T>) -> Result<T> {
        match (body.ok, body.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(BotError::external_api(format!(
                "Toncenter error {}: {}",
                body.code.unwrap_or_default(),
                body.error.unwrap_or_else(|| "empty result".to_string())
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "ok": true,
        "result": [
            {
                "utime": 1700000100,
                "transaction_id": {"lt": "47000000000002", "hash": "b2"},
                "in_msg": {"source": "EQsrc", "destination": "EQdst", "value": "1500000000", "message": "12345"},
                "out_msgs": []
            },
            {
                "utime": 1700000000,
                "transaction_id": {"lt": "47000000000001", "hash": "b1"},
                "in_msg": {"source": "", "destination": "EQdst", "value": "0", "message": ""},
                "out_msgs": [{"value": "100"}]
            }
        ]
    }"#;

    #[test]
    fn test_parse_transactions_page() {
        let body: ToncenterResponse<Vec<AccountTransaction>> = serde_json::from_str(PAGE).unwrap();
        let txs = ToncenterClient::into_result(body).unwrap();

        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].lt(), Some(47000000000002));
        assert_eq!(txs[0].incoming_value(), 1_500_000_000);
        assert_eq!(txs[0].comment(), "12345");
        assert_eq!(txs[1].incoming_value(), 0);
        assert_eq!(txs[1].comment(), "");
    }

    #[test]
    fn test_error_envelope() {
        let body: ToncenterResponse<Vec<AccountTransaction>> =
            serde_json::from_str(r#"{"ok": false, "error": "Incorrect address", "code": 416}"#).unwrap();
        let err = ToncenterClient::into_result(body).unwrap_err();
        assert!(err.to_string().contains("Incorrect address"));
    }

    #[test]
    fn test_missing_in_msg() {
        let tx: AccountTransaction = serde_json::from_str(
            r#"{"utime": 1, "transaction_id": {"lt": "5", "hash": "h"}}"#,
        )
        .unwrap();
        assert_eq!(tx.incoming_value(), 0);
        assert_eq!(tx.comment(), "");
    }
}
