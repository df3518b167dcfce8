pub mod actions;
mod commands;
pub mod handlers;
mod telegram;

pub use actions::Action;
pub use commands::Command;
pub use telegram::TelegramBot;
