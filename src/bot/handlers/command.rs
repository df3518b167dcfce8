use teloxide::{prelude::*, types::ParseMode};
use tracing::{error, info};

use super::{menu::MenuCreator, wallet::WalletHandler};
use crate::bot::actions::Action;
use crate::context::AppContext;
use crate::utils::{balance_message, deposit_link, deposit_message};

const WELCOME_TEXT: &str = "👋 Hi\\!\nI am a TON deposit bot\\.\n\
    Top up your balance with TonCoin, check it any time, or connect your \
    wallet with TON Connect and send a transaction right from the chat\\.\n\n\
    Use the keyboard below to get started\\.";

const SHARE_TEXT: &str = "👋 Hi\\!\nYou can share me in other groups\\!";

/// Runs user actions, whether they came from a command, a keyword or a button
pub struct CommandHandler;

impl CommandHandler {
    pub async fn run_action(
        bot: &Bot,
        chat_id: ChatId,
        user_id: i64,
        action: Action,
        ctx: &AppContext,
    ) -> ResponseResult<()> {
        info!("Processing {} for user {}", action.label(), user_id);
        ctx.metrics.record_command(action.label());

        match action {
            Action::Start | Action::Help => Self::handle_start(bot, chat_id, user_id, ctx).await,
            Action::Share => Self::handle_share(bot, chat_id, user_id, ctx).await,
            Action::Wallet => WalletHandler::show_wallet_menu(bot, chat_id, ctx).await,
            Action::Balance => Self::handle_balance(bot, chat_id, user_id, ctx).await,
            Action::Deposit => Self::handle_deposit(bot, chat_id, user_id, ctx).await,
            Action::SendTransaction => WalletHandler::send_transaction(bot, chat_id, user_id, ctx).await,
            Action::Disconnect => WalletHandler::disconnect(bot, chat_id, ctx).await,
            Action::Connect(name) => WalletHandler::connect(bot, chat_id, &name, ctx).await,
        }
    }

    async fn register(user_id: i64, ctx: &AppContext) {
        if let Err(e) = ctx.ledger.add_user(user_id).await {
            error!("Failed to register user {}: {}", user_id, e);
        }
    }

    /// Register the user and show the main keyboard
    pub async fn handle_start(bot: &Bot, chat_id: ChatId, user_id: i64, ctx: &AppContext) -> ResponseResult<()> {
        Self::register(user_id, ctx).await;

        bot.send_message(chat_id, WELCOME_TEXT)
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(MenuCreator::main_keyboard())
            .await?;
        Ok(())
    }

    pub async fn handle_share(bot: &Bot, chat_id: ChatId, user_id: i64, ctx: &AppContext) -> ResponseResult<()> {
        Self::register(user_id, ctx).await;

        let mut request = bot.send_message(chat_id, SHARE_TEXT).parse_mode(ParseMode::MarkdownV2);
        match MenuCreator::share_menu(&ctx.config.share_url()) {
            Ok(keyboard) => request = request.reply_markup(keyboard),
            Err(e) => error!("Share button unavailable: {}", e),
        }
        request.await?;
        Ok(())
    }

    pub async fn handle_balance(bot: &Bot, chat_id: ChatId, user_id: i64, ctx: &AppContext) -> ResponseResult<()> {
        let balance = match ctx.ledger.get_balance(user_id).await {
            Ok(balance) => balance,
            Err(e) => {
                error!("Failed to read balance of user {}: {}", user_id, e);
                bot.send_message(chat_id, "❌ Could not read your balance. Try again later.")
                    .await?;
                return Ok(());
            }
        };

        bot.send_message(chat_id, balance_message(balance))
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        Ok(())
    }

    pub async fn handle_deposit(bot: &Bot, chat_id: ChatId, user_id: i64, ctx: &AppContext) -> ResponseResult<()> {
        let address = &ctx.config.deposit_address;
        let mut request = bot
            .send_message(chat_id, deposit_message(address, user_id))
            .parse_mode(ParseMode::MarkdownV2);

        match MenuCreator::deposit_menu(&deposit_link(address, user_id)) {
            Ok(keyboard) => request = request.reply_markup(keyboard),
            Err(e) => error!("Deposit button unavailable: {}", e),
        }
        request.await?;
        Ok(())
    }
}
