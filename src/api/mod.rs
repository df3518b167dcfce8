pub mod toncenter;

pub use toncenter::{AccountTransaction, InMessage, ToncenterClient, TransactionId};
