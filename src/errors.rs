use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, BotError>;

/// Top-level error type for the bot
#[derive(Debug, Error)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BotError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn external_api(msg: impl Into<String>) -> Self {
        Self::ExternalApi(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<redis::RedisError> for BotError {
    fn from(err: redis::RedisError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        Self::ExternalApi(err.to_string())
    }
}

impl From<prometheus::Error> for BotError {
    fn from(err: prometheus::Error) -> Self {
        Self::Internal(format!("metrics: {}", err))
    }
}

/// Failures of the wallet connection and transaction flows
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// The user declined the request in the wallet app
    #[error("User rejected the request")]
    UserRejection,

    #[error("Operation timed out")]
    Timeout,

    /// A callback named a wallet that is not in the supported list
    #[error("Unknown wallet: {0}")]
    UnknownWallet(String),

    #[error("Wallet is not connected")]
    NotConnected,

    #[error("Bridge error: {0}")]
    Bridge(String),

    #[error("Wallet protocol error: {0}")]
    Protocol(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Session storage error: {0}")]
    Storage(String),
}

impl From<tokio::time::error::Elapsed> for WalletError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Timeout
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Bridge(err.to_string())
        }
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<BotError> for WalletError {
    fn from(err: BotError) -> Self {
        match err {
            BotError::Wallet(inner) => inner,
            other => Self::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_error_round_trips_through_bot_error() {
        let err: BotError = WalletError::UserRejection.into();
        let back: WalletError = err.into();
        assert_eq!(back, WalletError::UserRejection);
    }

    #[test]
    fn test_storage_errors_map_to_wallet_storage() {
        let err: WalletError = BotError::storage("connection refused").into();
        assert!(matches!(err, WalletError::Storage(msg) if msg.contains("connection refused")));
    }
}
