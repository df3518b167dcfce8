use std::sync::Arc;

use crate::ledger::BalanceLedger;
use crate::monitoring::BotMetrics;
use crate::utils::Config;
use crate::wallet::{ConnectorRegistry, TransactionFlow};

/// Shared services handed to every update handler
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub registry: Arc<ConnectorRegistry>,
    pub ledger: Arc<BalanceLedger>,
    pub transactions: Arc<TransactionFlow>,
    pub metrics: Arc<BotMetrics>,
}

impl AppContext {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<ConnectorRegistry>,
        ledger: Arc<BalanceLedger>,
        metrics: Arc<BotMetrics>,
    ) -> Self {
        Self {
            config,
            registry,
            ledger,
            transactions: Arc::new(TransactionFlow::default()),
            metrics,
        }
    }
}
