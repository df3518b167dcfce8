use teloxide::prelude::*;

use super::command::CommandHandler;
use crate::bot::actions::Action;
use crate::context::AppContext;

/// Handler for plain-text keywords, including the reply keyboard buttons
pub struct TextMessageHandler;

impl TextMessageHandler {
    /// Only messages whose text is a known keyword reach the handler
    pub fn keyword(msg: Message) -> Option<Action> {
        msg.text().and_then(Action::from_keyword)
    }

    pub async fn handle(bot: Bot, msg: Message, action: Action, ctx: AppContext) -> ResponseResult<()> {
        let user_id = msg
            .from
            .as_ref()
            .map(|u| u.id.0 as i64)
            .unwrap_or(msg.chat.id.0);

        CommandHandler::run_action(&bot, msg.chat.id, user_id, action, &ctx).await
    }
}
