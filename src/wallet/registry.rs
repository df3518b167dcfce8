use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use super::connector::{find_wallet, ConnectorFactory, WalletConnector, WalletDescriptor};
use crate::errors::WalletError;

/// A pairing that has been started on a freshly installed connector
pub struct PairingStart {
    pub connector: Arc<dyn WalletConnector>,
    pub wallet: WalletDescriptor,
    /// Universal link the wallet app opens
    pub link: String,
}

/// One wallet connector per chat session, for the lifetime of the process
pub struct ConnectorRegistry {
    connectors: DashMap<i64, Arc<dyn WalletConnector>>,
    factory: Arc<dyn ConnectorFactory>,
}

impl ConnectorRegistry {
    pub fn new(factory: Arc<dyn ConnectorFactory>) -> Self {
        Self {
            connectors: DashMap::new(),
            factory,
        }
    }

    /// Return the session's connector, creating a disconnected one on first use
    pub fn get_or_create(&self, session_id: i64) -> Arc<dyn WalletConnector> {
        self.connectors
            .entry(session_id)
            .or_insert_with(|| {
                debug!("Creating wallet connector for session {}", session_id);
                self.factory.create(session_id)
            })
            .value()
            .clone()
    }

    /// Start pairing `wallet_name` on a fresh connector.
    ///
    /// The wallet is resolved through the session's current connector and the new
    /// one is installed only once its pairing link exists. On any error the current
    /// connector stays registered untouched.
    pub async fn start_pairing(
        &self,
        session_id: i64,
        wallet_name: &str,
    ) -> Result<PairingStart, WalletError> {
        let current = self.get_or_create(session_id);
        let wallets = current.list_supported_wallets().await?;
        let wallet = find_wallet(&wallets, wallet_name)?.clone();

        let connector = self.factory.create(session_id);
        let link = connector.connect(&wallet).await?;

        self.connectors.insert(session_id, connector.clone());
        debug!("Replaced wallet connector for session {}", session_id);
        Ok(PairingStart {
            connector,
            wallet,
            link,
        })
    }

    /// Whether `connector` is still the one registered for the session
    pub fn is_current(&self, session_id: i64, connector: &Arc<dyn WalletConnector>) -> bool {
        self.connectors
            .get(&session_id)
            .map(|current| Arc::ptr_eq(current.value(), connector))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::{Account, ConnectorStatus, TransactionRequest};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct IdleConnector;

    fn wallet(name: &str, bridge_url: &str) -> WalletDescriptor {
        WalletDescriptor {
            name: name.to_string(),
            app_name: name.to_lowercase(),
            image: String::new(),
            about_url: String::new(),
            universal_url: "https://app.tonkeeper.com/ton-connect".to_string(),
            bridge_url: bridge_url.to_string(),
        }
    }

    #[async_trait]
    impl WalletConnector for IdleConnector {
        async fn restore_connection(&self) -> Result<bool, WalletError> {
            Ok(false)
        }
        async fn list_supported_wallets(&self) -> Result<Vec<WalletDescriptor>, WalletError> {
            Ok(vec![wallet("Tonkeeper", "https://bridge.tonapi.io/bridge"), wallet("Offline", "")])
        }
        async fn connect(&self, wallet: &WalletDescriptor) -> Result<String, WalletError> {
            if wallet.bridge_url.is_empty() {
                return Err(WalletError::Bridge("no bridge".to_string()));
            }
            Ok(format!("{}?v=2&id=00", wallet.universal_url))
        }
        async fn status(&self) -> ConnectorStatus {
            ConnectorStatus::Disconnected
        }
        async fn account(&self) -> Option<Account> {
            None
        }
        async fn disconnect(&self) -> Result<(), WalletError> {
            Ok(())
        }
        async fn send_transaction(
            &self,
            _request: &TransactionRequest,
            _timeout: Duration,
        ) -> Result<String, WalletError> {
            Err(WalletError::NotConnected)
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        created: AtomicUsize,
    }

    impl ConnectorFactory for CountingFactory {
        fn create(&self, _session_id: i64) -> Arc<dyn WalletConnector> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Arc::new(IdleConnector)
        }
    }

    #[test]
    fn test_get_or_create_returns_same_instance() {
        let factory = Arc::new(CountingFactory::default());
        let registry = ConnectorRegistry::new(factory.clone());

        for session_id in [1_i64, -100_200_300, i64::MAX] {
            let first = registry.get_or_create(session_id);
            let second = registry.get_or_create(session_id);
            assert!(Arc::ptr_eq(&first, &second));
        }
        assert_eq!(factory.created.load(Ordering::SeqCst), 3);
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test]
    async fn test_start_pairing_installs_new_connector() {
        let registry = ConnectorRegistry::new(Arc::new(CountingFactory::default()));
        let old = registry.get_or_create(7);

        let pairing = registry.start_pairing(7, "Tonkeeper").await.unwrap();

        assert_eq!(pairing.wallet.name, "Tonkeeper");
        assert_eq!(pairing.link, "https://app.tonkeeper.com/ton-connect?v=2&id=00");
        assert!(!Arc::ptr_eq(&old, &pairing.connector));
        assert!(registry.is_current(7, &pairing.connector));
        assert!(!registry.is_current(7, &old));
        assert!(Arc::ptr_eq(&registry.get_or_create(7), &pairing.connector));
    }

    #[tokio::test]
    async fn test_unknown_wallet_keeps_current_connector() {
        let factory = Arc::new(CountingFactory::default());
        let registry = ConnectorRegistry::new(factory.clone());
        let current = registry.get_or_create(7);

        let result = registry.start_pairing(7, "Bogus").await;

        assert!(matches!(result, Err(WalletError::UnknownWallet(name)) if name == "Bogus"));
        assert!(registry.is_current(7, &current));
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_connect_keeps_current_connector() {
        let registry = ConnectorRegistry::new(Arc::new(CountingFactory::default()));
        let current = registry.get_or_create(7);

        let result = registry.start_pairing(7, "Offline").await;

        assert!(matches!(result, Err(WalletError::Bridge(_))));
        assert!(registry.is_current(7, &current));
    }

    #[tokio::test]
    async fn test_concurrent_first_use_creates_one_connector() {
        let factory = Arc::new(CountingFactory::default());
        let registry = Arc::new(ConnectorRegistry::new(factory.clone()));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.get_or_create(42) })
            })
            .collect();

        let mut connectors = Vec::new();
        for handle in handles {
            connectors.push(handle.await.unwrap());
        }

        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        assert!(connectors.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }
}
