//! User-facing notices emitted by the wallet flows and the deposit watcher.

use async_trait::async_trait;
use teloxide::{prelude::*, types::ParseMode};

use crate::errors::Result;
use crate::utils::{escape_code, escape_markdown, format_ton};
use crate::wallet::TransactionOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Connected { address: String },
    ConnectTimedOut,
    ConnectWalletFirst,
    ApproveInWallet,
    TransactionInProgress,
    TransactionSent,
    TransactionRejected,
    TransactionTimedOut,
    TransactionFailed { reason: String },
    DepositConfirmed { amount: u64 },
}

impl Notice {
    pub fn from_outcome(outcome: &TransactionOutcome) -> Self {
        match outcome {
            TransactionOutcome::Confirmed => Notice::TransactionSent,
            TransactionOutcome::Rejected => Notice::TransactionRejected,
            TransactionOutcome::TimedOut => Notice::TransactionTimedOut,
            TransactionOutcome::Failed(reason) => Notice::TransactionFailed {
                reason: reason.clone(),
            },
        }
    }

    /// MarkdownV2 text for the chat
    pub fn render(&self) -> String {
        match self {
            Notice::Connected { address } => {
                format!("✅ You are connected with address `{}`", escape_code(address))
            }
            Notice::ConnectTimedOut => escape_markdown("⌛ Timeout error! Wallet was not connected."),
            Notice::ConnectWalletFirst => escape_markdown("Connect wallet first! Use /wallet to pair one."),
            Notice::ApproveInWallet => escape_markdown("Approve transaction in your wallet app!"),
            Notice::TransactionInProgress => {
                escape_markdown("⏳ A transaction is already in progress. Finish it in your wallet app first.")
            }
            Notice::TransactionSent => escape_markdown("✅ Transaction sent!"),
            Notice::TransactionRejected => escape_markdown("❌ You rejected the transaction!"),
            Notice::TransactionTimedOut => escape_markdown("⌛ Timeout error!"),
            Notice::TransactionFailed { reason } => {
                escape_markdown(&format!("❌ Unknown error: {}", reason))
            }
            Notice::DepositConfirmed { amount } => format!(
                "💎 Deposit confirmed\\!\n*\\+{}*",
                escape_markdown(&format_ton(*amount))
            ),
        }
    }
}

/// Delivers notices to a chat session
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, session_id: i64, notice: Notice) -> Result<()>;
}

/// Sends notices as Telegram messages
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, session_id: i64, notice: Notice) -> Result<()> {
        self.bot
            .send_message(ChatId(session_id), notice.render())
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_notices() {
        assert_eq!(Notice::from_outcome(&TransactionOutcome::Confirmed), Notice::TransactionSent);
        assert_eq!(Notice::from_outcome(&TransactionOutcome::Rejected), Notice::TransactionRejected);
        assert_eq!(Notice::from_outcome(&TransactionOutcome::TimedOut), Notice::TransactionTimedOut);
        assert_eq!(
            Notice::from_outcome(&TransactionOutcome::Failed("bridge down".into())),
            Notice::TransactionFailed { reason: "bridge down".into() }
        );
    }

    #[test]
    fn test_render_texts() {
        assert_eq!(Notice::TransactionTimedOut.render(), "⌛ Timeout error\\!");
        assert_eq!(Notice::TransactionRejected.render(), "❌ You rejected the transaction\\!");
        assert!(Notice::TransactionFailed { reason: "code 1".into() }
            .render()
            .contains("code 1"));
        assert_eq!(
            Notice::Connected { address: "UQabc-_x".into() }.render(),
            "✅ You are connected with address `UQabc-_x`"
        );
    }

    #[test]
    fn test_render_deposit() {
        assert_eq!(
            Notice::DepositConfirmed { amount: 2_000_000_000 }.render(),
            "💎 Deposit confirmed\\!\n*\\+2\\.00 TON*"
        );
    }
}
