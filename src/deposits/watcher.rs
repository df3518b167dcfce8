use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::api::{AccountTransaction, ToncenterClient};
use crate::cache::KeyValueStore;
use crate::errors::{BotError, Result};
use crate::ledger::BalanceLedger;
use crate::monitoring::BotMetrics;
use crate::notify::{Notice, Notifier};

const CURSOR_KEY: &str = "deposit:last_lt";

/// Where the watcher reads the deposit address history from
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn recent_transactions(&self, address: &str) -> Result<Vec<AccountTransaction>>;
}

#[async_trait]
impl TransactionSource for ToncenterClient {
    async fn recent_transactions(&self, address: &str) -> Result<Vec<AccountTransaction>> {
        self.get_transactions(address).await
    }
}

/// An incoming transfer whose comment names a user id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deposit {
    pub lt: u64,
    pub user_id: i64,
    pub amount: u64,
}

/// Deposits newer than `last_lt`, oldest first, and the advanced cursor.
/// The cursor moves past every newer transaction, credited or not.
pub fn collect_deposits(transactions: &[AccountTransaction], last_lt: u64) -> (Vec<Deposit>, u64) {
    let mut ordered: Vec<(u64, &AccountTransaction)> = transactions
        .iter()
        .filter_map(|tx| tx.lt().map(|lt| (lt, tx)))
        .filter(|(lt, _)| *lt > last_lt)
        .collect();
    ordered.sort_by_key(|(lt, _)| *lt);

    let mut cursor = last_lt;
    let mut deposits = Vec::new();
    for (lt, tx) in ordered {
        cursor = lt;

        let amount = tx.incoming_value();
        if amount == 0 {
            continue;
        }
        let comment = tx.comment().trim();
        if comment.is_empty() || !comment.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let Ok(user_id) = comment.parse::<i64>() else {
            continue;
        };

        deposits.push(Deposit { lt, user_id, amount });
    }

    (deposits, cursor)
}

/// Polls the deposit address and credits user balances
pub struct DepositWatcher {
    source: Arc<dyn TransactionSource>,
    store: Arc<dyn KeyValueStore>,
    ledger: Arc<BalanceLedger>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<BotMetrics>,
    address: String,
    interval: Duration,
}

impl DepositWatcher {
    pub fn new(
        source: Arc<dyn TransactionSource>,
        store: Arc<dyn KeyValueStore>,
        ledger: Arc<BalanceLedger>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<BotMetrics>,
        address: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            store,
            ledger,
            notifier,
            metrics,
            address: address.into(),
            interval,
        }
    }

    /// Poll forever; failures are logged and retried on the next tick
    pub async fn run(self) {
        info!("💎 Watching deposits to {} every {:?}", self.address, self.interval);

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if let Err(e) = self.poll_once().await {
                self.metrics.record_poll_error();
                warn!("Deposit poll failed: {}", e);
            }
        }
    }

    pub async fn last_lt(&self) -> Result<u64> {
        match self.store.get(CURSOR_KEY).await? {
            Some(value) => value
                .parse()
                .map_err(|_| BotError::storage(format!("corrupt deposit cursor '{}'", value))),
            None => Ok(0),
        }
    }

    /// One pass over the latest page; returns the number of credited deposits
    pub async fn poll_once(&self) -> Result<usize> {
        let last_lt = self.last_lt().await?;
        let transactions = self.source.recent_transactions(&self.address).await?;
        let (deposits, cursor) = collect_deposits(&transactions, last_lt);

        let mut credited = 0;
        for deposit in deposits {
            if !self.ledger.check_user(deposit.user_id).await? {
                debug!("Ignoring deposit at lt {} for unknown user {}", deposit.lt, deposit.user_id);
                continue;
            }

            self.ledger.add_balance(deposit.user_id, deposit.amount).await?;
            // Persist per deposit so a failure later in the page never re-credits it
            self.store.set(CURSOR_KEY, &deposit.lt.to_string()).await?;
            self.metrics.record_deposit(deposit.amount);
            credited += 1;
            info!("Credited {} nanoTON to user {}", deposit.amount, deposit.user_id);

            if let Err(e) = self
                .notifier
                .notify(deposit.user_id, Notice::DepositConfirmed { amount: deposit.amount })
                .await
            {
                error!("Failed to notify user {} about deposit: {}", deposit.user_id, e);
            }
        }

        if cursor > last_lt {
            self.store.set(CURSOR_KEY, &cursor.to_string()).await?;
        }
        Ok(credited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(lt: u64, value: &str, message: &str) -> AccountTransaction {
        serde_json::from_value(serde_json::json!({
            "utime": 1_700_000_000,
            "transaction_id": {"lt": lt.to_string(), "hash": format!("h{}", lt)},
            "in_msg": {"source": "EQsrc", "destination": "EQdst", "value": value, "message": message}
        }))
        .unwrap()
    }

    #[test]
    fn test_collects_oldest_first() {
        let page = vec![tx(30, "300", "2"), tx(20, "200", "1"), tx(10, "100", "1")];
        let (deposits, cursor) = collect_deposits(&page, 0);

        assert_eq!(cursor, 30);
        let lts: Vec<u64> = deposits.iter().map(|d| d.lt).collect();
        assert_eq!(lts, vec![10, 20, 30]);
        assert_eq!(deposits[2], Deposit { lt: 30, user_id: 2, amount: 300 });
    }

    #[test]
    fn test_skips_seen_transactions() {
        let page = vec![tx(30, "300", "2"), tx(20, "200", "1")];
        let (deposits, cursor) = collect_deposits(&page, 20);
        assert_eq!(deposits.len(), 1);
        assert_eq!(deposits[0].lt, 30);
        assert_eq!(cursor, 30);
    }

    #[test]
    fn test_cursor_advances_past_ignored_transactions() {
        let page = vec![
            tx(14, "100", "hello"),
            tx(13, "0", "12345"),
            tx(12, "100", ""),
            tx(11, "100", "12a45"),
        ];
        let (deposits, cursor) = collect_deposits(&page, 10);
        assert!(deposits.is_empty());
        assert_eq!(cursor, 14);
    }

    #[test]
    fn test_nothing_new_keeps_cursor() {
        let page = vec![tx(5, "100", "1")];
        let (deposits, cursor) = collect_deposits(&page, 9);
        assert!(deposits.is_empty());
        assert_eq!(cursor, 9);
    }
}
