use std::time::Duration;
use teloxide::{
    prelude::*,
    types::{InputFile, ParseMode},
};
use tracing::{error, info, warn};

use super::menu::MenuCreator;
use crate::constants::{PAIRING_TICK_SECS, PAIRING_TIMEOUT_TICKS};
use crate::context::AppContext;
use crate::errors::WalletError;
use crate::notify::TelegramNotifier;
use crate::utils::{escape_markdown, format_address, render_qr_png};
use crate::wallet::{await_pairing, IntervalTicker, PairingStart, Transfer, TransactionRun};

/// Wallet pairing and signing from the chat
pub struct WalletHandler;

impl WalletHandler {
    /// Connected: transaction and disconnect buttons. Otherwise: pick a wallet.
    pub async fn show_wallet_menu(bot: &Bot, chat_id: ChatId, ctx: &AppContext) -> ResponseResult<()> {
        let connector = ctx.registry.get_or_create(chat_id.0);
        ctx.metrics.set_sessions(ctx.registry.len());

        let connected = connector.restore_connection().await.unwrap_or_else(|e| {
            warn!("Failed to restore wallet session {}: {}", chat_id, e);
            false
        });

        if connected {
            let address = match connector.account().await {
                Some(account) => account
                    .friendly_address()
                    .unwrap_or_else(|_| account.address.clone()),
                None => String::new(),
            };
            let text = if address.is_empty() {
                "✅ You are already connected!".to_string()
            } else {
                format!("✅ You are already connected! ({})", format_address(&address))
            };
            bot.send_message(chat_id, text)
                .reply_markup(MenuCreator::connected_wallet_menu())
                .await?;
            return Ok(());
        }

        let wallets = match connector.list_supported_wallets().await {
            Ok(wallets) => wallets,
            Err(e) => {
                error!("Failed to list wallets: {}", e);
                bot.send_message(chat_id, "❌ Could not load the wallet list. Try again later.")
                    .await?;
                return Ok(());
            }
        };

        bot.send_message(chat_id, "👛 Choose wallet to connect")
            .reply_markup(MenuCreator::wallet_choice_menu(&wallets))
            .await?;
        Ok(())
    }

    /// Start pairing with the named wallet and wait for it in the background
    pub async fn connect(
        bot: &Bot,
        chat_id: ChatId,
        wallet_name: &str,
        ctx: &AppContext,
    ) -> ResponseResult<()> {
        let session_id = chat_id.0;

        let PairingStart {
            connector,
            wallet,
            link,
        } = match ctx.registry.start_pairing(session_id, wallet_name).await {
            Ok(pairing) => pairing,
            Err(WalletError::UnknownWallet(name)) => {
                warn!("Session {} picked unknown wallet {}", session_id, name);
                bot.send_message(chat_id, format!("❓ Unknown wallet: {}. Use /wallet to pick again.", name))
                    .await?;
                return Ok(());
            }
            Err(e) => {
                error!("Session {} could not start pairing: {}", session_id, e);
                bot.send_message(chat_id, format!("❌ Could not connect to {}: {}", wallet_name, e))
                    .await?;
                return Ok(());
            }
        };
        ctx.metrics.set_sessions(ctx.registry.len());

        let caption = format!(
            "📱 Scan this QR code with {} or tap the button below\\. The link is valid for 3 minutes\\.",
            escape_markdown(&wallet.name)
        );
        let keyboard = match MenuCreator::open_wallet_menu(&link) {
            Ok(keyboard) => keyboard,
            Err(e) => {
                error!("Wallet {} produced an unusable link: {}", wallet.name, e);
                bot.send_message(chat_id, "❌ The wallet returned an invalid link.").await?;
                return Ok(());
            }
        };

        match render_qr_png(&link) {
            Ok(png) => {
                bot.send_photo(chat_id, InputFile::memory(png).file_name("qr.png"))
                    .caption(caption)
                    .parse_mode(ParseMode::MarkdownV2)
                    .reply_markup(keyboard)
                    .await?;
            }
            Err(e) => {
                warn!("QR rendering failed, sending the link only: {}", e);
                bot.send_message(chat_id, caption)
                    .parse_mode(ParseMode::MarkdownV2)
                    .reply_markup(keyboard)
                    .await?;
            }
        }

        ctx.metrics.record_pairing_started();
        info!("Session {} waiting for {} to pair", session_id, wallet.name);

        let registry = ctx.registry.clone();
        let metrics = ctx.metrics.clone();
        let notifier = TelegramNotifier::new(bot.clone());
        tokio::spawn(async move {
            let mut ticker = IntervalTicker::every(Duration::from_secs(PAIRING_TICK_SECS));
            let current = connector.clone();
            let superseded = move || !registry.is_current(session_id, &current);

            match await_pairing(
                session_id,
                connector.as_ref(),
                &mut ticker,
                PAIRING_TIMEOUT_TICKS,
                &notifier,
                superseded,
            )
            .await
            {
                Ok(outcome) => metrics.record_pairing_outcome(outcome.label()),
                Err(e) => error!("Pairing for session {} failed: {}", session_id, e),
            }
        });

        Ok(())
    }

    /// Ask the connected wallet to send the configured transfer to the deposit address
    pub async fn send_transaction(
        bot: &Bot,
        chat_id: ChatId,
        user_id: i64,
        ctx: &AppContext,
    ) -> ResponseResult<()> {
        let session_id = chat_id.0;
        let connector = ctx.registry.get_or_create(session_id);
        let transfer = Transfer {
            destination: ctx.config.deposit_address.clone(),
            amount: ctx.config.transaction_amount_nano,
            comment: user_id.to_string(),
        };

        let transactions = ctx.transactions.clone();
        let metrics = ctx.metrics.clone();
        let notifier = TelegramNotifier::new(bot.clone());

        // The wallet may take minutes to answer; keep the chat responsive meanwhile
        tokio::spawn(async move {
            match transactions
                .run(session_id, connector.as_ref(), &transfer, &notifier)
                .await
            {
                Ok(TransactionRun::Completed(outcome)) => metrics.record_transaction(outcome.label()),
                Ok(TransactionRun::NotConnected) => metrics.record_transaction("not_connected"),
                Ok(TransactionRun::AlreadyInFlight) => metrics.record_transaction("already_in_flight"),
                Err(e) => error!("Transaction flow for session {} failed: {}", session_id, e),
            }
        });

        Ok(())
    }

    pub async fn disconnect(bot: &Bot, chat_id: ChatId, ctx: &AppContext) -> ResponseResult<()> {
        let connector = ctx.registry.get_or_create(chat_id.0);

        let connected = connector.restore_connection().await.unwrap_or(false);
        if !connected {
            bot.send_message(chat_id, "ℹ️ You are not connected. Use /wallet to connect.")
                .await?;
            return Ok(());
        }

        match connector.disconnect().await {
            Ok(()) => {
                bot.send_message(chat_id, "🔌 Wallet disconnected.").await?;
            }
            Err(e) => {
                error!("Failed to disconnect session {}: {}", chat_id, e);
                bot.send_message(chat_id, format!("❌ Could not disconnect: {}", e))
                    .await?;
            }
        }
        Ok(())
    }
}
