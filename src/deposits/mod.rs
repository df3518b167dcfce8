pub mod watcher;

pub use watcher::{collect_deposits, Deposit, DepositWatcher, TransactionSource};
