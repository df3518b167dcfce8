use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tracing::debug;

use crate::errors::{BotError, Result};

/// Prometheus metrics for wallet pairing, transactions and deposits
pub struct BotMetrics {
    registry: Registry,

    // Wallet pairing
    pairing_attempts: IntCounter,
    pairing_outcomes: IntCounterVec,
    sessions: IntGauge,

    // Transactions
    transaction_outcomes: IntCounterVec,

    // Deposits
    deposits_credited: IntCounter,
    deposited_nano: IntCounter,
    deposit_poll_errors: IntCounter,

    commands_processed: IntCounterVec,
}

impl BotMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let pairing_attempts = IntCounter::new(
            "wallet_pairing_attempts_total",
            "Wallet pairings started",
        )?;
        let pairing_outcomes = IntCounterVec::new(
            Opts::new("wallet_pairing_outcomes_total", "Finished wallet pairings"),
            &["outcome"],
        )?;
        let sessions = IntGauge::new("wallet_sessions", "Chat sessions holding a wallet connector")?;
        let transaction_outcomes = IntCounterVec::new(
            Opts::new("wallet_transactions_total", "Wallet transaction requests by outcome"),
            &["outcome"],
        )?;
        let deposits_credited = IntCounter::new("deposits_credited_total", "Deposits credited to users")?;
        let deposited_nano = IntCounter::new("deposits_credited_nanoton_total", "Nano-TON credited to users")?;
        let deposit_poll_errors = IntCounter::new(
            "deposit_poll_errors_total",
            "Failed polls of the deposit address",
        )?;
        let commands_processed = IntCounterVec::new(
            Opts::new("commands_processed_total", "Bot actions handled"),
            &["action"],
        )?;

        registry.register(Box::new(pairing_attempts.clone()))?;
        registry.register(Box::new(pairing_outcomes.clone()))?;
        registry.register(Box::new(sessions.clone()))?;
        registry.register(Box::new(transaction_outcomes.clone()))?;
        registry.register(Box::new(deposits_credited.clone()))?;
        registry.register(Box::new(deposited_nano.clone()))?;
        registry.register(Box::new(deposit_poll_errors.clone()))?;
        registry.register(Box::new(commands_processed.clone()))?;

        Ok(Self {
            registry,
            pairing_attempts,
            pairing_outcomes,
            sessions,
            transaction_outcomes,
            deposits_credited,
            deposited_nano,
            deposit_poll_errors,
            commands_processed,
        })
    }

    pub fn record_pairing_started(&self) {
        self.pairing_attempts.inc();
    }

    pub fn record_pairing_outcome(&self, outcome: &str) {
        self.pairing_outcomes.with_label_values(&[outcome]).inc();
    }

    pub fn set_sessions(&self, count: usize) {
        self.sessions.set(count as i64);
    }

    pub fn record_transaction(&self, outcome: &str) {
        self.transaction_outcomes.with_label_values(&[outcome]).inc();
    }

    pub fn record_deposit(&self, amount: u64) {
        self.deposits_credited.inc();
        self.deposited_nano.inc_by(amount);
    }

    pub fn record_poll_error(&self) {
        self.deposit_poll_errors.inc();
    }

    pub fn record_command(&self, action: &str) {
        self.commands_processed.with_label_values(&[action]).inc();
    }

    /// Text exposition format for the `/metrics` endpoint
    pub fn render(&self) -> Result<String> {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        debug!("Rendered {} metric families", families.len());
        String::from_utf8(buffer).map_err(|e| BotError::internal(format!("metrics encoding: {}", e)))
    }
}
