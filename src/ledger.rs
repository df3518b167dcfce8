//! Per-user deposit balances kept in nano-TON.

use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::KeyValueStore;
use crate::errors::{BotError, Result};

const USER_PREFIX: &str = "user:";
const BALANCE_PREFIX: &str = "balance:";

pub struct BalanceLedger {
    store: Arc<dyn KeyValueStore>,
}

impl BalanceLedger {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn user_key(user_id: i64) -> String {
        format!("{}{}", USER_PREFIX, user_id)
    }

    fn balance_key(user_id: i64) -> String {
        format!("{}{}", BALANCE_PREFIX, user_id)
    }

    /// True once `add_user` has registered the user
    pub async fn check_user(&self, user_id: i64) -> Result<bool> {
        self.store.exists(&Self::user_key(user_id)).await
    }

    /// Register a user with a zero balance; existing balances are kept
    pub async fn add_user(&self, user_id: i64) -> Result<()> {
        if self.check_user(user_id).await? {
            return Ok(());
        }
        self.store.set(&Self::user_key(user_id), "1").await?;
        if !self.store.exists(&Self::balance_key(user_id)).await? {
            self.store.set(&Self::balance_key(user_id), "0").await?;
        }
        info!("Registered user {}", user_id);
        Ok(())
    }

    pub async fn get_balance(&self, user_id: i64) -> Result<u64> {
        match self.store.get(&Self::balance_key(user_id)).await? {
            Some(value) => value
                .parse::<u64>()
                .map_err(|_| BotError::storage(format!("corrupt balance for user {}", user_id))),
            None => Ok(0),
        }
    }

    /// Credit `amount` nano-TON and return the new balance
    pub async fn add_balance(&self, user_id: i64, amount: u64) -> Result<u64> {
        let delta = i64::try_from(amount)
            .map_err(|_| BotError::validation(format!("deposit amount {} too large", amount)))?;
        let balance = self.store.incr_by(&Self::balance_key(user_id), delta).await?;
        debug!("User {} balance is now {}", user_id, balance);
        u64::try_from(balance)
            .map_err(|_| BotError::storage(format!("negative balance for user {}", user_id)))
    }
}
