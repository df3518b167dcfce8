use reqwest::{header::ACCEPT, Client, Response};
use std::time::Duration;
use tracing::debug;

use super::protocol::ConnectRequest;
use crate::constants::BRIDGE_MESSAGE_TTL_SECS;
use crate::errors::WalletError;

const SEND_TIMEOUT_SECS: u64 = 15;

/// Link a wallet app opens to start pairing
pub fn universal_link(
    universal_url: &str,
    client_id: &str,
    request: &ConnectRequest,
) -> Result<String, WalletError> {
    let request_json = serde_json::to_string(request)?;
    let separator = if universal_url.contains('?') { '&' } else { '?' };
    Ok(format!(
        "{}{}v=2&id={}&r={}&ret=none",
        universal_url,
        separator,
        client_id,
        urlencoding::encode(&request_json)
    ))
}

/// One server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub id: Option<String>,
    pub data: String,
}

/// Incremental parser for a `text/event-stream` body
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    id: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns events completed by it
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "id" => self.id = Some(value.to_string()),
                "data" => self.data.push(value.to_string()),
                _ => {}
            }
        }
        events
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() {
            self.id = None;
            return None;
        }
        Some(SseEvent {
            id: self.id.take(),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

/// HTTP side of the TON Connect bridge
#[derive(Clone)]
pub struct BridgeClient {
    http: Client,
}

impl BridgeClient {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Open the event stream for `client_id`
    pub async fn events(
        &self,
        bridge_url: &str,
        client_id: &str,
        last_event_id: Option<&str>,
    ) -> Result<Response, WalletError> {
        let url = format!("{}/events", bridge_url.trim_end_matches('/'));
        let mut query = vec![("client_id", client_id)];
        if let Some(id) = last_event_id {
            query.push(("last_event_id", id));
        }

        let response = self
            .http
            .get(&url)
            .query(&query)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WalletError::Bridge(format!(
                "event stream rejected with status {}",
                response.status()
            )));
        }
        debug!("Opened bridge event stream at {}", url);
        Ok(response)
    }

    /// Post an encrypted message to the wallet `to`
    pub async fn send(
        &self,
        bridge_url: &str,
        client_id: &str,
        to: &str,
        body: String,
        topic: &str,
    ) -> Result<(), WalletError> {
        let url = format!("{}/message", bridge_url.trim_end_matches('/'));
        let ttl = BRIDGE_MESSAGE_TTL_SECS.to_string();

        let response = self
            .http
            .post(&url)
            .query(&[
                ("client_id", client_id),
                ("to", to),
                ("ttl", ttl.as_str()),
                ("topic", topic),
            ])
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(WalletError::Bridge(format!(
                "message rejected with status {}: {}",
                status, text
            )));
        }
        debug!("Posted {} message to bridge {}", topic, url);
        Ok(())
    }
}
