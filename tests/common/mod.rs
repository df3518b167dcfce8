#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

use ton_deposit_bot::errors::{Result, WalletError};
use ton_deposit_bot::notify::{Notice, Notifier};
use ton_deposit_bot::wallet::{
    Account, ConnectorStatus, Ticker, TransactionRequest, WalletConnector, WalletDescriptor,
};

pub const RAW_ADDRESS: &str = "0:83dfd552e63729b472fcbcc8c45ebcc6691702558b68ec7527e1ba403a0f31a8";
pub const TESTNET_NON_BOUNCEABLE: &str = "0QCD39VS5jcptHL8vMjEXrzGaRcCVYto7HUn4bpAOg8xqPvC";

/// What the fake wallet answers to `sendTransaction`
pub enum SendBehavior {
    Sign(String),
    Fail(WalletError),
    /// Never answers on its own
    Hang,
    /// Answers once `release` is notified
    WaitFor(String),
}

pub struct FakeConnector {
    restorable: bool,
    /// `account()` starts returning the account after this many polls
    connect_after_polls: Option<u32>,
    send: SendBehavior,
    pub release: Notify,
    pub polls: AtomicU32,
    pub send_calls: AtomicUsize,
    pub last_request: Mutex<Option<TransactionRequest>>,
}

impl FakeConnector {
    fn build(restorable: bool, connect_after_polls: Option<u32>, send: SendBehavior) -> Self {
        Self {
            restorable,
            connect_after_polls,
            send,
            release: Notify::new(),
            polls: AtomicU32::new(0),
            send_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Wallet that never finishes pairing
    pub fn never_pairs() -> Self {
        Self::build(false, None, SendBehavior::Fail(WalletError::NotConnected))
    }

    pub fn pairs_after(polls: u32) -> Self {
        Self::build(false, Some(polls), SendBehavior::Fail(WalletError::NotConnected))
    }

    pub fn disconnected() -> Self {
        Self::build(false, None, SendBehavior::Sign("unused".to_string()))
    }

    pub fn connected(send: SendBehavior) -> Self {
        Self::build(true, Some(0), send)
    }

    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletConnector for FakeConnector {
    async fn restore_connection(&self) -> std::result::Result<bool, WalletError> {
        Ok(self.restorable)
    }

    async fn list_supported_wallets(&self) -> std::result::Result<Vec<WalletDescriptor>, WalletError> {
        Ok(Vec::new())
    }

    async fn connect(&self, wallet: &WalletDescriptor) -> std::result::Result<String, WalletError> {
        Ok(format!("{}?v=2&id=fake", wallet.universal_url))
    }

    async fn status(&self) -> ConnectorStatus {
        if self.account().await.is_some() {
            ConnectorStatus::Connected
        } else {
            ConnectorStatus::Connecting
        }
    }

    async fn account(&self) -> Option<Account> {
        let polls = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.connect_after_polls {
            Some(after) if polls > after => Some(Account {
                address: RAW_ADDRESS.to_string(),
                chain: "-3".to_string(),
                public_key: None,
            }),
            _ => None,
        }
    }

    async fn disconnect(&self) -> std::result::Result<(), WalletError> {
        Ok(())
    }

    async fn send_transaction(
        &self,
        request: &TransactionRequest,
        _timeout: Duration,
    ) -> std::result::Result<String, WalletError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());

        match &self.send {
            SendBehavior::Sign(boc) => Ok(boc.clone()),
            SendBehavior::Fail(err) => Err(err.clone()),
            SendBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                Err(WalletError::Bridge("hung request returned".to_string()))
            }
            SendBehavior::WaitFor(boc) => {
                self.release.notified().await;
                Ok(boc.clone())
            }
        }
    }
}

/// Collects every notice instead of sending it
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(i64, Notice)>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.sent.lock().unwrap().iter().map(|(_, n)| n.clone()).collect()
    }

    pub fn sent(&self) -> Vec<(i64, Notice)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, session_id: i64, notice: Notice) -> Result<()> {
        self.sent.lock().unwrap().push((session_id, notice));
        Ok(())
    }
}

/// Ticks immediately and counts how often it was asked
#[derive(Default)]
pub struct InstantTicker {
    pub ticks: u32,
}

#[async_trait]
impl Ticker for InstantTicker {
    async fn tick(&mut self) {
        self.ticks += 1;
    }
}
