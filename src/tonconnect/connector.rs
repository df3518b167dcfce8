use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::bridge::{universal_link, BridgeClient, SseParser};
use super::crypto::SessionCrypto;
use super::protocol::{
    parse_wallet_message, BridgeMessage, ConnectRequest, RpcRequest, RpcResponse, WalletEvent,
    WalletMessage,
};
use super::wallets::WalletCatalog;
use crate::cache::KeyValueStore;
use crate::constants::BRIDGE_RECONNECT_DELAY_SECS;
use crate::errors::WalletError;
use crate::wallet::{
    Account, ConnectorFactory, ConnectorStatus, TransactionRequest, WalletConnector,
    WalletDescriptor,
};

/// Pairing persisted so a restart can resume it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredConnection {
    pub secret_key: String,
    pub bridge_url: String,
    pub wallet_public_key: String,
    pub account: Account,
    pub last_event_id: Option<String>,
    pub next_rpc_id: u64,
}

fn storage_key(session_id: i64) -> String {
    format!("tonconnect:{}", session_id)
}

#[derive(Default)]
struct SessionState {
    crypto: Option<Arc<SessionCrypto>>,
    bridge_url: String,
    wallet_public_key: Option<String>,
    account: Option<Account>,
    status: ConnectorStatus,
    last_event_id: Option<String>,
}

struct Shared {
    session_id: i64,
    bridge: BridgeClient,
    catalog: Arc<WalletCatalog>,
    store: Arc<dyn KeyValueStore>,
    manifest_url: String,
    state: RwLock<SessionState>,
    pending: DashMap<String, oneshot::Sender<RpcResponse>>,
    next_rpc_id: AtomicU64,
}

/// TON Connect session for one chat, talking to the wallet through an SSE bridge
pub struct TonConnector {
    shared: Arc<Shared>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl TonConnector {
    pub fn new(
        session_id: i64,
        bridge: BridgeClient,
        catalog: Arc<WalletCatalog>,
        store: Arc<dyn KeyValueStore>,
        manifest_url: impl Into<String>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                session_id,
                bridge,
                catalog,
                store,
                manifest_url: manifest_url.into(),
                state: RwLock::new(SessionState::default()),
                pending: DashMap::new(),
                next_rpc_id: AtomicU64::new(0),
            }),
            listener: Mutex::new(None),
        }
    }

    fn start_listener(&self, crypto: Arc<SessionCrypto>, bridge_url: String) {
        let shared = self.shared.clone();
        let handle = tokio::spawn(async move { shared.listen(crypto, bridge_url).await });
        if let Ok(mut slot) = self.listener.lock() {
            if let Some(old) = slot.replace(handle) {
                old.abort();
            }
        }
    }

    fn stop_listener(&self) {
        if let Ok(mut slot) = self.listener.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for TonConnector {
    fn drop(&mut self) {
        self.stop_listener();
    }
}

impl Shared {
    /// Read the bridge until aborted, reconnecting after stream failures
    async fn listen(self: Arc<Self>, crypto: Arc<SessionCrypto>, bridge_url: String) {
        let client_id = crypto.client_id();
        loop {
            let last_event_id = self.state.read().await.last_event_id.clone();
            match self
                .bridge
                .events(&bridge_url, &client_id, last_event_id.as_deref())
                .await
            {
                Ok(response) => {
                    let mut parser = SseParser::new();
                    let mut stream = response.bytes_stream();
                    while let Some(chunk) = stream.next().await {
                        let chunk = match chunk {
                            Ok(chunk) => chunk,
                            Err(e) => {
                                debug!("Bridge stream for session {} broke: {}", self.session_id, e);
                                break;
                            }
                        };
                        for event in parser.feed(&chunk) {
                            if let Some(id) = event.id {
                                self.state.write().await.last_event_id = Some(id);
                            }
                            if let Err(e) = self.handle_bridge_data(&crypto, &event.data).await {
                                warn!("Dropped bridge message for session {}: {}", self.session_id, e);
                            }
                        }
                    }
                }
                Err(e) => warn!("Bridge connection for session {} failed: {}", self.session_id, e),
            }
            tokio::time::sleep(Duration::from_secs(BRIDGE_RECONNECT_DELAY_SECS)).await;
        }
    }

    async fn handle_bridge_data(&self, crypto: &SessionCrypto, data: &str) -> Result<(), WalletError> {
        let incoming: BridgeMessage = serde_json::from_str(data)?;

        let expected = self.state.read().await.wallet_public_key.clone();
        if let Some(expected) = expected {
            if expected != incoming.from {
                return Err(WalletError::Protocol(format!(
                    "message from unexpected sender {}",
                    incoming.from
                )));
            }
        }

        let plain = crypto.decrypt(&incoming.message, &incoming.from)?;
        match parse_wallet_message(&plain)? {
            WalletMessage::Event(event) => self.handle_event(crypto, incoming.from, event).await,
            WalletMessage::Response(response) => {
                match self.pending.remove(&response.id) {
                    Some((_, waiter)) => {
                        let _ = waiter.send(response);
                    }
                    None => debug!("No request waiting for wallet response {}", response.id),
                }
                Ok(())
            }
        }
    }

    async fn handle_event(
        &self,
        crypto: &SessionCrypto,
        from: String,
        event: WalletEvent,
    ) -> Result<(), WalletError> {
        match event {
            WalletEvent::Connect { payload } => {
                let account = payload
                    .account()
                    .ok_or_else(|| WalletError::Protocol("connect event without ton_addr".to_string()))?;

                let stored = {
                    let mut state = self.state.write().await;
                    state.wallet_public_key = Some(from.clone());
                    state.account = Some(account.clone());
                    state.status = ConnectorStatus::Connected;
                    StoredConnection {
                        secret_key: crypto.secret_hex(),
                        bridge_url: state.bridge_url.clone(),
                        wallet_public_key: from,
                        account,
                        last_event_id: state.last_event_id.clone(),
                        next_rpc_id: self.next_rpc_id.load(Ordering::SeqCst),
                    }
                };
                info!("Session {} paired with wallet {}", self.session_id, stored.account.address);
                self.persist(&stored).await
            }
            WalletEvent::ConnectError { payload } => {
                warn!(
                    "Wallet refused pairing for session {}: {} ({})",
                    self.session_id, payload.message, payload.code
                );
                self.reset().await;
                Ok(())
            }
            WalletEvent::Disconnect {} => {
                info!("Wallet disconnected session {}", self.session_id);
                self.reset().await;
                self.forget().await
            }
        }
    }

    async fn reset(&self) {
        *self.state.write().await = SessionState::default();
        self.pending.clear();
    }

    async fn persist(&self, stored: &StoredConnection) -> Result<(), WalletError> {
        let json = serde_json::to_string(stored)?;
        self.store.set(&storage_key(self.session_id), &json).await?;
        Ok(())
    }

    async fn forget(&self) -> Result<(), WalletError> {
        self.store.delete(&storage_key(self.session_id)).await?;
        Ok(())
    }

    async fn load(&self) -> Result<Option<StoredConnection>, WalletError> {
        match self.store.get(&storage_key(self.session_id)).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn allocate_rpc_id(&self) -> String {
        self.next_rpc_id.fetch_add(1, Ordering::SeqCst).to_string()
    }

    /// Encrypt and post an RPC call to the connected wallet
    async fn post_rpc(&self, id: &str, method: &str, params: Vec<String>) -> Result<(), WalletError> {
        let (crypto, bridge_url, wallet) = {
            let state = self.state.read().await;
            match (&state.crypto, &state.wallet_public_key, state.status) {
                (Some(crypto), Some(wallet), ConnectorStatus::Connected) => {
                    (crypto.clone(), state.bridge_url.clone(), wallet.clone())
                }
                _ => return Err(WalletError::NotConnected),
            }
        };

        let request = RpcRequest {
            method: method.to_string(),
            params,
            id: id.to_string(),
        };
        let body = crypto.encrypt(&serde_json::to_vec(&request)?, &wallet)?;
        self.bridge
            .send(&bridge_url, &crypto.client_id(), &wallet, body, method)
            .await
    }
}

/// Drops the RPC waiter when the caller stops waiting, including when cancelled
struct PendingGuard<'a> {
    pending: &'a DashMap<String, oneshot::Sender<RpcResponse>>,
    id: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(self.id);
    }
}

#[async_trait]
impl WalletConnector for TonConnector {
    async fn restore_connection(&self) -> Result<bool, WalletError> {
        match self.shared.state.read().await.status {
            ConnectorStatus::Connected => return Ok(true),
            // A pairing in progress owns the session state until it ends
            ConnectorStatus::Connecting => return Ok(false),
            ConnectorStatus::Disconnected => {}
        }

        let Some(stored) = self.shared.load().await? else {
            return Ok(false);
        };
        let crypto = Arc::new(SessionCrypto::from_secret_hex(&stored.secret_key)?);
        {
            let mut state = self.shared.state.write().await;
            *state = SessionState {
                crypto: Some(crypto.clone()),
                bridge_url: stored.bridge_url.clone(),
                wallet_public_key: Some(stored.wallet_public_key),
                account: Some(stored.account),
                status: ConnectorStatus::Connected,
                last_event_id: stored.last_event_id,
            };
        }
        self.shared.next_rpc_id.store(stored.next_rpc_id, Ordering::SeqCst);
        self.start_listener(crypto, stored.bridge_url);

        info!("Restored wallet session {}", self.shared.session_id);
        Ok(true)
    }

    async fn list_supported_wallets(&self) -> Result<Vec<WalletDescriptor>, WalletError> {
        Ok(self.shared.catalog.wallets().await)
    }

    async fn connect(&self, wallet: &WalletDescriptor) -> Result<String, WalletError> {
        let crypto = Arc::new(SessionCrypto::generate());
        let request = ConnectRequest::address_only(self.shared.manifest_url.clone());
        let link = universal_link(&wallet.universal_url, &crypto.client_id(), &request)?;

        *self.shared.state.write().await = SessionState {
            crypto: Some(crypto.clone()),
            bridge_url: wallet.bridge_url.clone(),
            status: ConnectorStatus::Connecting,
            ..SessionState::default()
        };
        self.shared.pending.clear();
        self.start_listener(crypto, wallet.bridge_url.clone());

        info!("Session {} started pairing with {}", self.shared.session_id, wallet.name);
        Ok(link)
    }

    async fn status(&self) -> ConnectorStatus {
        self.shared.state.read().await.status
    }

    async fn account(&self) -> Option<Account> {
        let state = self.shared.state.read().await;
        match state.status {
            ConnectorStatus::Connected => state.account.clone(),
            _ => None,
        }
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        if self.status().await != ConnectorStatus::Connected {
            return Err(WalletError::NotConnected);
        }

        let id = self.shared.allocate_rpc_id();
        if let Err(e) = self.shared.post_rpc(&id, "disconnect", Vec::new()).await {
            warn!("Could not notify wallet about disconnect: {}", e);
        }
        self.stop_listener();
        self.shared.reset().await;
        self.shared.forget().await?;

        info!("Session {} disconnected its wallet", self.shared.session_id);
        Ok(())
    }

    async fn send_transaction(
        &self,
        request: &TransactionRequest,
        timeout: Duration,
    ) -> Result<String, WalletError> {
        let params = vec![serde_json::to_string(request)?];
        let id = self.shared.allocate_rpc_id();

        // Register before posting so an early answer is not lost
        let (tx, rx) = oneshot::channel();
        self.shared.pending.insert(id.clone(), tx);
        let _waiter = PendingGuard {
            pending: &self.shared.pending,
            id: &id,
        };

        self.shared.post_rpc(&id, "sendTransaction", params).await?;
        debug!("Session {} sent sendTransaction #{}", self.shared.session_id, id);

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => response.into_result(),
            Ok(Err(_)) => Err(WalletError::Bridge("wallet session closed".to_string())),
            Err(_) => {
                error!("Session {} transaction #{} timed out", self.shared.session_id, id);
                Err(WalletError::Timeout)
            }
        }
    }
}

/// Builds a `TonConnector` per chat session
pub struct TonConnectorFactory {
    bridge: BridgeClient,
    catalog: Arc<WalletCatalog>,
    store: Arc<dyn KeyValueStore>,
    manifest_url: String,
}

impl TonConnectorFactory {
    pub fn new(
        bridge: BridgeClient,
        catalog: Arc<WalletCatalog>,
        store: Arc<dyn KeyValueStore>,
        manifest_url: impl Into<String>,
    ) -> Self {
        Self {
            bridge,
            catalog,
            store,
            manifest_url: manifest_url.into(),
        }
    }
}

impl ConnectorFactory for TonConnectorFactory {
    fn create(&self, session_id: i64) -> Arc<dyn WalletConnector> {
        Arc::new(TonConnector::new(
            session_id,
            self.bridge.clone(),
            self.catalog.clone(),
            self.store.clone(),
            self.manifest_url.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::tonconnect::wallets::fallback_wallets;

    fn connector(store: Arc<dyn KeyValueStore>) -> TonConnector {
        TonConnector::new(
            77,
            BridgeClient::new(reqwest::Client::new()),
            Arc::new(WalletCatalog::with_wallets(fallback_wallets())),
            store,
            "https://example.com/tonconnect-manifest.json",
        )
    }

    // Unroutable so spawned listeners never reach a real bridge
    const LOCAL_BRIDGE: &str = "http://127.0.0.1:9";

    fn local_wallet() -> WalletDescriptor {
        WalletDescriptor {
            bridge_url: LOCAL_BRIDGE.to_string(),
            ..fallback_wallets().remove(0)
        }
    }

    fn stored(crypto: &SessionCrypto) -> StoredConnection {
        StoredConnection {
            secret_key: crypto.secret_hex(),
            bridge_url: LOCAL_BRIDGE.to_string(),
            wallet_public_key: SessionCrypto::generate().client_id(),
            account: Account {
                address: "0:83dfd552e63729b472fcbcc8c45ebcc6691702558b68ec7527e1ba403a0f31a8".to_string(),
                chain: "-3".to_string(),
                public_key: None,
            },
            last_event_id: Some("12".to_string()),
            next_rpc_id: 5,
        }
    }

    #[tokio::test]
    async fn test_restore_without_session() {
        let connector = connector(Arc::new(MemoryStore::new()));
        assert!(!connector.restore_connection().await.unwrap());
        assert_eq!(connector.status().await, ConnectorStatus::Disconnected);
        assert!(connector.account().await.is_none());
    }

    #[tokio::test]
    async fn test_restore_from_store() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let crypto = SessionCrypto::generate();
        store
            .set("tonconnect:77", &serde_json::to_string(&stored(&crypto)).unwrap())
            .await
            .unwrap();

        let connector = connector(store);
        assert!(connector.restore_connection().await.unwrap());
        assert_eq!(connector.status().await, ConnectorStatus::Connected);
        assert_eq!(connector.account().await.unwrap().chain, "-3");
        assert!(connector.restore_connection().await.unwrap());
    }

    #[tokio::test]
    async fn test_restore_leaves_pairing_in_progress_alone() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store
            .set(
                "tonconnect:77",
                &serde_json::to_string(&stored(&SessionCrypto::generate())).unwrap(),
            )
            .await
            .unwrap();

        let connector = connector(store);
        connector.connect(&local_wallet()).await.unwrap();
        let pairing_key = connector.shared.state.read().await.crypto.clone().unwrap();

        assert!(!connector.restore_connection().await.unwrap());
        assert_eq!(connector.status().await, ConnectorStatus::Connecting);
        assert!(connector.account().await.is_none());
        let kept = connector.shared.state.read().await.crypto.clone().unwrap();
        assert_eq!(kept.client_id(), pairing_key.client_id());
    }

    #[tokio::test]
    async fn test_abandoned_send_drops_its_waiter() {
        // Accepts connections but never answers, so the bridge post hangs
        let silent = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let bridge_url = format!("http://{}", silent.local_addr().unwrap());

        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let session = StoredConnection {
            bridge_url,
            ..stored(&SessionCrypto::generate())
        };
        store
            .set("tonconnect:77", &serde_json::to_string(&session).unwrap())
            .await
            .unwrap();

        let connector = connector(store);
        assert!(connector.restore_connection().await.unwrap());

        let request = TransactionRequest::new(0, Vec::new());
        let abandoned = tokio::time::timeout(
            Duration::from_millis(200),
            connector.send_transaction(&request, Duration::from_secs(300)),
        )
        .await;

        assert!(abandoned.is_err());
        assert!(connector.shared.pending.is_empty());
    }

    #[tokio::test]
    async fn test_connect_returns_universal_link() {
        let connector = connector(Arc::new(MemoryStore::new()));
        let link = connector.connect(&local_wallet()).await.unwrap();
        assert!(link.starts_with("https://app.tonkeeper.com/ton-connect?v=2&id="));
        assert!(link.ends_with("&ret=none"));
        assert_eq!(connector.status().await, ConnectorStatus::Connecting);
        assert!(connector.account().await.is_none());
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let connector = connector(Arc::new(MemoryStore::new()));
        let request = TransactionRequest::new(0, Vec::new());
        assert_eq!(
            connector.send_transaction(&request, Duration::from_secs(1)).await,
            Err(WalletError::NotConnected)
        );
        assert_eq!(connector.disconnect().await, Err(WalletError::NotConnected));
    }

    #[tokio::test]
    async fn test_connect_event_persists_session() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let connector = connector(store.clone());
        let wallet = SessionCrypto::generate();

        connector.connect(&local_wallet()).await.unwrap();
        let app = connector.shared.state.read().await.crypto.clone().unwrap();

        let event = br#"{"event":"connect","id":1,"payload":{"items":[{"name":"ton_addr","address":"0:83dfd552e63729b472fcbcc8c45ebcc6691702558b68ec7527e1ba403a0f31a8","network":"-239"}]}}"#;
        let data = serde_json::json!({
            "from": wallet.client_id(),
            "message": wallet.encrypt(event, &app.client_id()).unwrap(),
        })
        .to_string();

        connector.shared.handle_bridge_data(&app, &data).await.unwrap();

        assert_eq!(connector.status().await, ConnectorStatus::Connected);
        let saved: StoredConnection =
            serde_json::from_str(&store.get("tonconnect:77").await.unwrap().unwrap()).unwrap();
        assert_eq!(saved.wallet_public_key, wallet.client_id());
        assert_eq!(saved.account.chain, "-239");
    }
}
