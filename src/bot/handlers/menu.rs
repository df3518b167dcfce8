use reqwest::Url;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

use crate::bot::actions::Action;
use crate::errors::{BotError, Result};
use crate::wallet::WalletDescriptor;

/// Builds every keyboard the bot shows
pub struct MenuCreator;

impl MenuCreator {
    /// Persistent reply keyboard; button labels double as keywords
    pub fn main_keyboard() -> KeyboardMarkup {
        KeyboardMarkup::new(vec![
            vec![KeyboardButton::new("Deposit")],
            vec![KeyboardButton::new("Balance")],
            vec![KeyboardButton::new("Wallet")],
        ])
        .resize_keyboard()
    }

    pub fn share_menu(share_url: &str) -> Result<InlineKeyboardMarkup> {
        Ok(InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::url(
            "👥 Select a group",
            parse_url(share_url)?,
        )]]))
    }

    pub fn connected_wallet_menu() -> InlineKeyboardMarkup {
        InlineKeyboardMarkup::new(vec![
            vec![InlineKeyboardButton::callback(
                "📤 Send Transaction",
                Action::SendTransaction.callback_data(),
            )],
            vec![InlineKeyboardButton::callback(
                "🔌 Disconnect",
                Action::Disconnect.callback_data(),
            )],
        ])
    }

    /// One button per wallet
    pub fn wallet_choice_menu(wallets: &[WalletDescriptor]) -> InlineKeyboardMarkup {
        InlineKeyboardMarkup::new(
            wallets
                .iter()
                .map(|w| {
                    vec![InlineKeyboardButton::callback(
                        w.name.clone(),
                        Action::Connect(w.name.clone()).callback_data(),
                    )]
                })
                .collect::<Vec<_>>(),
        )
    }

    pub fn open_wallet_menu(link: &str) -> Result<InlineKeyboardMarkup> {
        Ok(InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::url(
            "🔗 Open wallet",
            parse_url(link)?,
        )]]))
    }

    pub fn deposit_menu(link: &str) -> Result<InlineKeyboardMarkup> {
        Ok(InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::url(
            "💎 Deposit",
            parse_url(link)?,
        )]]))
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| BotError::validation(format!("invalid button URL {}: {}", url, e)))
}
