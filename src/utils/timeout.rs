use std::future::Future;
use std::time::Duration;
use tokio::time::{error::Elapsed, timeout};
use tracing::warn;

/// Execute a future with a deadline, converting expiry into the caller's error type
pub async fn with_timeout<F, T, E>(
    future: F,
    duration: Duration,
    operation_name: &str,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<Elapsed>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(elapsed) => {
            warn!("Operation '{}' timed out after {:?}", operation_name, duration);
            Err(E::from(elapsed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::WalletError;

    #[tokio::test]
    async fn test_successful_operation() {
        async fn quick_operation() -> Result<String, WalletError> {
            Ok("signed".to_string())
        }

        let result = with_timeout(quick_operation(), Duration::from_secs(1), "test_operation").await;

        assert_eq!(result, Ok("signed".to_string()));
    }

    #[tokio::test]
    async fn test_inner_error_is_preserved() {
        async fn rejected() -> Result<String, WalletError> {
            Err(WalletError::UserRejection)
        }

        let result = with_timeout(rejected(), Duration::from_secs(1), "test_operation").await;

        assert_eq!(result, Err(WalletError::UserRejection));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        async fn slow_operation() -> Result<String, WalletError> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok("signed".to_string())
        }

        let result = with_timeout(slow_operation(), Duration::from_secs(300), "test_operation").await;

        assert_eq!(result, Err(WalletError::Timeout));
    }
}
