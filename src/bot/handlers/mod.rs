pub mod callback;
pub mod command;
pub mod menu;
pub mod text;
pub mod wallet;

pub use callback::CallbackHandler;
pub use command::CommandHandler;
pub use menu::MenuCreator;
pub use text::TextMessageHandler;
pub use wallet::WalletHandler;
