//! TON Connect 2.0 over the HTTP bridge: session crypto, wallet list, pairing
//! and `sendTransaction` RPC.

pub mod bridge;
pub mod connector;
pub mod crypto;
pub mod protocol;
pub mod wallets;

pub use bridge::{universal_link, BridgeClient, SseEvent, SseParser};
pub use connector::{StoredConnection, TonConnector, TonConnectorFactory};
pub use crypto::SessionCrypto;
pub use protocol::{ConnectRequest, RpcResponse, WalletEvent, WalletMessage};
pub use wallets::{fallback_wallets, parse_wallets_list, WalletCatalog};
