mod address;
mod connection_flow;
mod connector;
mod payload;
mod registry;
mod transaction;

pub use address::TonAddress;
pub use connection_flow::{
    await_pairing, ConnectionFlow, IntervalTicker, PairingEvent, PairingOutcome, PairingState,
    Ticker,
};
pub use connector::{
    find_wallet, Account, ConnectorFactory, ConnectorStatus, WalletConnector, WalletDescriptor,
};
pub use payload::{comment_cell, comment_message, comment_payload, serialize_boc, Cell};
pub use registry::{ConnectorRegistry, PairingStart};
pub use transaction::{
    Transfer, TransactionFlow, TransactionMessage, TransactionOutcome, TransactionRequest,
    TransactionRun,
};
