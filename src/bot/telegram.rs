use teloxide::{prelude::*, utils::command::BotCommands};
use tracing::{info, warn};

use super::{
    commands::Command,
    handlers::{CallbackHandler, CommandHandler, TextMessageHandler},
};
use crate::context::AppContext;

/// Main Telegram bot struct
pub struct TelegramBot {
    bot: Bot,
    ctx: AppContext,
}

impl TelegramBot {
    pub fn new(bot: Bot, ctx: AppContext) -> Self {
        Self { bot, ctx }
    }

    /// Run the dispatcher until Ctrl-C
    pub async fn run(self) {
        info!("🤖 Starting Telegram bot @{}...", self.ctx.config.bot_name);

        if let Err(e) = self.bot.set_my_commands(Command::bot_commands()).await {
            warn!("Failed to register bot commands: {}", e);
        }

        let handler = dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(Self::handle_command),
            )
            .branch(
                Update::filter_message()
                    .filter_map(TextMessageHandler::keyword)
                    .endpoint(TextMessageHandler::handle),
            )
            .branch(Update::filter_callback_query().endpoint(CallbackHandler::handle));

        Dispatcher::builder(self.bot, handler)
            .dependencies(dptree::deps![self.ctx])
            .default_handler(|_| async {})
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        info!("Telegram bot stopped");
    }

    async fn handle_command(bot: Bot, msg: Message, cmd: Command, ctx: AppContext) -> ResponseResult<()> {
        let user_id = msg
            .from
            .as_ref()
            .map(|u| u.id.0 as i64)
            .unwrap_or(msg.chat.id.0);

        CommandHandler::run_action(&bot, msg.chat.id, user_id, cmd.into(), &ctx).await
    }
}
