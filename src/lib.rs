//! Telegram bot that accepts TON deposits and pairs user wallets over TON Connect.

pub mod api;
pub mod bot;
pub mod cache;
pub mod constants;
pub mod context;
pub mod deposits;
pub mod errors;
pub mod ledger;
pub mod monitoring;
pub mod notify;
pub mod tonconnect;
pub mod utils;
pub mod wallet;

pub use context::AppContext;
pub use errors::{BotError, Result, WalletError};
