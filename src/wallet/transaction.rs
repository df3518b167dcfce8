use chrono::Utc;
use dashmap::DashSet;
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

use super::{connector::WalletConnector, payload::comment_message};
use crate::constants::{TRANSACTION_SUBMIT_TIMEOUT_SECS, TRANSACTION_VALIDITY_SECS};
use crate::errors::{Result, WalletError};
use crate::notify::{Notice, Notifier};
use crate::utils::with_timeout;

/// One outgoing transfer inside a transaction request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionMessage {
    address: String,
    #[serde(serialize_with = "amount_as_string")]
    amount: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<String>,
}

impl TransactionMessage {
    pub fn new(address: impl Into<String>, amount: u64, payload: Option<String>) -> Self {
        Self {
            address: address.into(),
            amount,
            payload,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }
}

/// Request handed to the wallet for signing; immutable once built
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRequest {
    valid_until: i64,
    messages: Vec<TransactionMessage>,
}

impl TransactionRequest {
    pub fn new(valid_until: i64, messages: Vec<TransactionMessage>) -> Self {
        Self {
            valid_until,
            messages,
        }
    }

    /// Unix timestamp after which the wallet must refuse the request
    pub fn valid_until(&self) -> i64 {
        self.valid_until
    }

    pub fn messages(&self) -> &[TransactionMessage] {
        &self.messages
    }
}

fn amount_as_string<S: Serializer>(amount: &u64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&amount.to_string())
}

/// Terminal result of a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    Confirmed,
    Rejected,
    TimedOut,
    Failed(String),
}

impl TransactionOutcome {
    /// Map a submission result onto an outcome
    pub fn classify(result: &std::result::Result<String, WalletError>) -> Self {
        match result {
            Ok(_) => Self::Confirmed,
            Err(WalletError::UserRejection) => Self::Rejected,
            Err(WalletError::Timeout) => Self::TimedOut,
            Err(other) => Self::Failed(other.to_string()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::TimedOut => "timed_out",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for TransactionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed: {}", reason),
            other => f.write_str(other.label()),
        }
    }
}

/// What a `/transaction` action asks the wallet to send
#[derive(Debug, Clone)]
pub struct Transfer {
    pub destination: String,
    pub amount: u64,
    pub comment: String,
}

/// How an invocation of the transaction flow ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionRun {
    /// Another request for the same session is still outstanding
    AlreadyInFlight,
    /// No wallet session could be restored; nothing was submitted
    NotConnected,
    Completed(TransactionOutcome),
}

/// Builds, submits and classifies wallet transactions, one in flight per session
pub struct TransactionFlow {
    in_flight: DashSet<i64>,
    submit_timeout: Duration,
    validity_secs: i64,
}

impl Default for TransactionFlow {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(TRANSACTION_SUBMIT_TIMEOUT_SECS),
            TRANSACTION_VALIDITY_SECS,
        )
    }
}

impl TransactionFlow {
    pub fn new(submit_timeout: Duration, validity_secs: i64) -> Self {
        Self {
            in_flight: DashSet::new(),
            submit_timeout,
            validity_secs,
        }
    }

    pub fn is_in_flight(&self, session_id: i64) -> bool {
        self.in_flight.contains(&session_id)
    }

    /// Build the request for a transfer, valid for the configured window from now
    pub fn build_request(&self, transfer: &Transfer) -> TransactionRequest {
        let valid_until = Utc::now().timestamp() + self.validity_secs;
        let message = comment_message(&transfer.destination, transfer.amount, &transfer.comment);
        TransactionRequest::new(valid_until, vec![message])
    }

    /// Run one transaction attempt for a session
    pub async fn run(
        &self,
        session_id: i64,
        connector: &dyn WalletConnector,
        transfer: &Transfer,
        notifier: &dyn Notifier,
    ) -> Result<TransactionRun> {
        let Some(_guard) = self.try_begin(session_id) else {
            info!("Transaction already in flight for session {}", session_id);
            notifier.notify(session_id, Notice::TransactionInProgress).await?;
            return Ok(TransactionRun::AlreadyInFlight);
        };

        let connected = match connector.restore_connection().await {
            Ok(connected) => connected,
            Err(e) => {
                warn!("Failed to restore wallet session {}: {}", session_id, e);
                false
            }
        };
        if !connected {
            notifier.notify(session_id, Notice::ConnectWalletFirst).await?;
            return Ok(TransactionRun::NotConnected);
        }

        let request = self.build_request(transfer);
        notifier.notify(session_id, Notice::ApproveInWallet).await?;

        let result = with_timeout(
            connector.send_transaction(&request, self.submit_timeout),
            self.submit_timeout,
            "send_transaction",
        )
        .await;

        let outcome = TransactionOutcome::classify(&result);
        match &outcome {
            TransactionOutcome::Failed(reason) => {
                warn!("Transaction for session {} failed: {}", session_id, reason)
            }
            other => info!("Transaction for session {} {}", session_id, other),
        }

        notifier.notify(session_id, Notice::from_outcome(&outcome)).await?;
        Ok(TransactionRun::Completed(outcome))
    }

    fn try_begin(&self, session_id: i64) -> Option<InFlightGuard<'_>> {
        if self.in_flight.insert(session_id) {
            Some(InFlightGuard {
                set: &self.in_flight,
                session_id,
            })
        } else {
            None
        }
    }
}

/// Clears the in-flight mark when the attempt ends, however it ends
struct InFlightGuard<'a> {
    set: &'a DashSet<i64>,
    session_id: i64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(TransactionOutcome::classify(&Ok("boc".into())), TransactionOutcome::Confirmed);
        assert_eq!(
            TransactionOutcome::classify(&Err(WalletError::UserRejection)),
            TransactionOutcome::Rejected
        );
        assert_eq!(
            TransactionOutcome::classify(&Err(WalletError::Timeout)),
            TransactionOutcome::TimedOut
        );
        assert_eq!(
            TransactionOutcome::classify(&Err(WalletError::Bridge("502".into()))),
            TransactionOutcome::Failed("Bridge error: 502".into())
        );
    }

    #[test]
    fn test_request_serializes_for_wallet() {
        let request = TransactionRequest::new(
            1_700_003_600,
            vec![TransactionMessage::new("UQabc", 10_000_000, Some("te6cc".into()))],
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "valid_until": 1_700_003_600,
                "messages": [{"address": "UQabc", "amount": "10000000", "payload": "te6cc"}]
            })
        );
    }

    #[test]
    fn test_build_request_validity_window() {
        let flow = TransactionFlow::default();
        let transfer = Transfer {
            destination: "UQabc".into(),
            amount: 5,
            comment: "7".into(),
        };
        let before = Utc::now().timestamp();
        let request = flow.build_request(&transfer);
        let after = Utc::now().timestamp();

        assert!(request.valid_until() >= before + 3600 && request.valid_until() <= after + 3600);
        assert_eq!(request.messages().len(), 1);
        assert_eq!(request.messages()[0].address(), "UQabc");
        assert_eq!(request.messages()[0].amount(), 5);
    }

    #[test]
    fn test_in_flight_guard_releases() {
        let flow = TransactionFlow::default();
        {
            let guard = flow.try_begin(9);
            assert!(guard.is_some());
            assert!(flow.is_in_flight(9));
            assert!(flow.try_begin(9).is_none());
        }
        assert!(!flow.is_in_flight(9));
    }
}
