/// 1 TON = 1e9 nano-TON
pub const NANOTON_PER_TON: u64 = 1_000_000_000;

/// Pairing wait: one check per second for three minutes
pub const PAIRING_TICK_SECS: u64 = 1;
pub const PAIRING_TIMEOUT_TICKS: u32 = 180;

/// Outer bound for a transaction submission as seen by the user
pub const TRANSACTION_SUBMIT_TIMEOUT_SECS: u64 = 300;

/// Protocol-level validity of a transaction request, interpreted by the wallet
pub const TRANSACTION_VALIDITY_SECS: i64 = 3600;

/// Default amount for a wallet-signed deposit (0.01 TON)
pub const DEFAULT_TRANSACTION_AMOUNT_NANO: u64 = 10_000_000;

pub const DEFAULT_DEPOSIT_POLL_INTERVAL_SECS: u64 = 2;
pub const DEPOSIT_PAGE_LIMIT: u32 = 100;

pub const TONCENTER_MAINNET_URL: &str = "https://toncenter.com";
pub const TONCENTER_TESTNET_URL: &str = "https://testnet.toncenter.com";

pub const DEFAULT_WALLETS_LIST_URL: &str =
    "https://raw.githubusercontent.com/ton-blockchain/wallets-list/main/wallets-v2.json";

/// TON Connect bridge message lifetime, seconds
pub const BRIDGE_MESSAGE_TTL_SECS: u64 = 300;
pub const BRIDGE_RECONNECT_DELAY_SECS: u64 = 2;

/// TON Connect chain ids
pub const CHAIN_MAINNET: &str = "-239";
pub const CHAIN_TESTNET: &str = "-3";
