use teloxide::prelude::*;
use tracing::warn;

use super::command::CommandHandler;
use crate::bot::actions::Action;
use crate::context::AppContext;

/// Handler for inline keyboard buttons
pub struct CallbackHandler;

impl CallbackHandler {
    pub async fn handle(bot: Bot, q: CallbackQuery, ctx: AppContext) -> ResponseResult<()> {
        bot.answer_callback_query(q.id.clone()).await?;

        let Some(data) = q.data.as_deref() else {
            return Ok(());
        };
        let Some(action) = Action::from_callback(data) else {
            warn!("Unknown callback data '{}' from user {}", data, q.from.id);
            return Ok(());
        };

        let chat_id = q
            .message
            .as_ref()
            .map(|m| m.chat().id)
            .unwrap_or(ChatId::from(q.from.id));
        let user_id = q.from.id.0 as i64;

        CommandHandler::run_action(&bot, chat_id, user_id, action, &ctx).await
    }
}
