use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,

    #[command(description = "Get help")]
    Help,

    #[command(description = "Add the bot to a group")]
    Share,

    #[command(description = "Connect or manage your TON wallet")]
    Wallet,

    #[command(description = "View your balance")]
    Balance,

    #[command(description = "Show deposit address")]
    Deposit,

    #[command(description = "Send a test transaction from your wallet")]
    Transaction,
}
