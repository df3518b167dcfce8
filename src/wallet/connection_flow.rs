use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::connector::WalletConnector;
use crate::errors::Result;
use crate::notify::{Notice, Notifier};

/// States of one connection attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingState {
    Idle,
    /// Wallet list shown, waiting for the user to pick one
    AwaitingSelection,
    /// Pairing URI issued; polls left before giving up
    Pairing { remaining_ticks: u32 },
    Connected { address: String },
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingEvent {
    ConnectRequested,
    WalletSelected { timeout_ticks: u32 },
    /// One poll of the connector; carries the formatted address once connected
    Tick { address: Option<String> },
    /// A newer attempt took over the session
    Superseded,
    Reset,
}

impl PairingState {
    /// The single transition function; unknown pairs leave the state unchanged
    pub fn next(self, event: PairingEvent) -> PairingState {
        use PairingEvent as E;
        use PairingState as S;

        match (self, event) {
            (S::Idle | S::TimedOut | S::Connected { .. }, E::ConnectRequested) => S::AwaitingSelection,
            (S::AwaitingSelection, E::WalletSelected { timeout_ticks }) => S::Pairing {
                remaining_ticks: timeout_ticks,
            },
            (S::Pairing { .. }, E::Tick { address: Some(address) }) => S::Connected { address },
            (S::Pairing { remaining_ticks }, E::Tick { address: None }) => {
                match remaining_ticks.saturating_sub(1) {
                    0 => S::TimedOut,
                    left => S::Pairing { remaining_ticks: left },
                }
            }
            (S::Pairing { .. } | S::AwaitingSelection, E::Superseded) => S::Idle,
            (S::TimedOut | S::Connected { .. }, E::Reset) => S::Idle,
            (state, _) => state,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PairingState::Connected { .. } | PairingState::TimedOut)
    }
}

/// Owns the state of a single connection attempt
#[derive(Debug)]
pub struct ConnectionFlow {
    state: PairingState,
}

impl Default for ConnectionFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionFlow {
    pub fn new() -> Self {
        Self {
            state: PairingState::Idle,
        }
    }

    pub fn state(&self) -> &PairingState {
        &self.state
    }

    pub fn handle(&mut self, event: PairingEvent) -> &PairingState {
        let current = std::mem::replace(&mut self.state, PairingState::Idle);
        self.state = current.next(event);
        &self.state
    }
}

/// Source of polling ticks
#[async_trait]
pub trait Ticker: Send {
    async fn tick(&mut self);
}

/// Real-time ticker; the first tick fires one period after creation
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn every(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// How a pairing wait ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingOutcome {
    Connected { address: String },
    TimedOut,
    Superseded,
}

impl PairingOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::TimedOut => "timed_out",
            Self::Superseded => "superseded",
        }
    }
}

/// Wait for a pairing started on `connector` to complete, polling once per tick.
/// Sends exactly one notice for a connected or timed-out attempt and none for a
/// superseded one; the flow is back at `Idle` on return.
pub async fn await_pairing<T, F>(
    session_id: i64,
    connector: &dyn WalletConnector,
    ticker: &mut T,
    timeout_ticks: u32,
    notifier: &dyn Notifier,
    is_superseded: F,
) -> Result<PairingOutcome>
where
    T: Ticker + ?Sized,
    F: Fn() -> bool + Send + Sync,
{
    let mut flow = ConnectionFlow::new();
    flow.handle(PairingEvent::ConnectRequested);
    flow.handle(PairingEvent::WalletSelected { timeout_ticks });

    let outcome = loop {
        ticker.tick().await;

        if is_superseded() {
            debug!("Pairing for session {} superseded by a newer attempt", session_id);
            flow.handle(PairingEvent::Superseded);
            return Ok(PairingOutcome::Superseded);
        }

        let address = match connector.account().await {
            Some(account) => Some(account.friendly_address().unwrap_or_else(|e| {
                warn!("Could not format wallet address {}: {}", account.address, e);
                account.address.clone()
            })),
            None => None,
        };

        match flow.handle(PairingEvent::Tick { address }) {
            PairingState::Connected { address } => {
                break PairingOutcome::Connected {
                    address: address.clone(),
                }
            }
            PairingState::TimedOut => break PairingOutcome::TimedOut,
            _ => continue,
        }
    };

    match &outcome {
        PairingOutcome::Connected { address } => {
            info!("Session {} connected wallet {}", session_id, address);
            notifier
                .notify(session_id, Notice::Connected { address: address.clone() })
                .await?;
        }
        _ => {
            info!("Session {} pairing timed out", session_id);
            notifier.notify(session_id, Notice::ConnectTimedOut).await?;
        }
    }

    flow.handle(PairingEvent::Reset);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut flow = ConnectionFlow::new();
        assert_eq!(flow.handle(PairingEvent::ConnectRequested), &PairingState::AwaitingSelection);
        assert_eq!(
            flow.handle(PairingEvent::WalletSelected { timeout_ticks: 3 }),
            &PairingState::Pairing { remaining_ticks: 3 }
        );
        assert_eq!(
            flow.handle(PairingEvent::Tick { address: None }),
            &PairingState::Pairing { remaining_ticks: 2 }
        );
        assert_eq!(
            flow.handle(PairingEvent::Tick { address: Some("UQx".into()) }),
            &PairingState::Connected { address: "UQx".into() }
        );
        assert!(flow.state().is_terminal());
        assert_eq!(flow.handle(PairingEvent::Reset), &PairingState::Idle);
    }

    #[test]
    fn test_times_out_after_budget() {
        let mut state = PairingState::AwaitingSelection.next(PairingEvent::WalletSelected { timeout_ticks: 180 });
        for _ in 0..179 {
            state = state.next(PairingEvent::Tick { address: None });
            assert!(matches!(state, PairingState::Pairing { .. }));
        }
        state = state.next(PairingEvent::Tick { address: None });
        assert_eq!(state, PairingState::TimedOut);
    }

    #[test]
    fn test_connection_on_last_tick_wins() {
        let state = PairingState::Pairing { remaining_ticks: 1 }
            .next(PairingEvent::Tick { address: Some("UQy".into()) });
        assert_eq!(state, PairingState::Connected { address: "UQy".into() });
    }

    #[test]
    fn test_terminal_states_ignore_ticks() {
        assert_eq!(
            PairingState::TimedOut.next(PairingEvent::Tick { address: Some("UQz".into()) }),
            PairingState::TimedOut
        );
        assert_eq!(
            PairingState::Idle.next(PairingEvent::Tick { address: None }),
            PairingState::Idle
        );
    }

    #[test]
    fn test_timed_out_can_retry() {
        assert_eq!(
            PairingState::TimedOut.next(PairingEvent::ConnectRequested),
            PairingState::AwaitingSelection
        );
        assert_eq!(PairingState::TimedOut.next(PairingEvent::Reset), PairingState::Idle);
    }

    #[test]
    fn test_superseded_pairing_returns_to_idle() {
        assert_eq!(
            PairingState::Pairing { remaining_ticks: 10 }.next(PairingEvent::Superseded),
            PairingState::Idle
        );
    }
}
