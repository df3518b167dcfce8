use super::commands::Command;

const CONNECT_PREFIX: &str = "connect:";

/// Everything a user can ask the bot to do, whichever way they asked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Start,
    Help,
    Share,
    Wallet,
    Balance,
    Deposit,
    SendTransaction,
    Disconnect,
    Connect(String),
}

impl Action {
    /// Decode inline button data
    pub fn from_callback(data: &str) -> Option<Self> {
        if let Some(name) = data.strip_prefix(CONNECT_PREFIX) {
            return (!name.is_empty()).then(|| Action::Connect(name.to_string()));
        }
        match data {
            "send_tr" => Some(Action::SendTransaction),
            "disconnect" => Some(Action::Disconnect),
            "start" => Some(Action::Start),
            "help" => Some(Action::Help),
            "share" => Some(Action::Share),
            "wallet" => Some(Action::Wallet),
            "balance" => Some(Action::Balance),
            "deposit" => Some(Action::Deposit),
            _ => None,
        }
    }

    /// Plain-text triggers, matched case-insensitively
    pub fn from_keyword(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "start" => Some(Action::Start),
            "help" => Some(Action::Help),
            "share" => Some(Action::Share),
            "wallet" => Some(Action::Wallet),
            "balance" => Some(Action::Balance),
            "deposit" => Some(Action::Deposit),
            "transaction" => Some(Action::SendTransaction),
            _ => None,
        }
    }

    pub fn callback_data(&self) -> String {
        match self {
            Action::Connect(name) => format!("{}{}", CONNECT_PREFIX, name),
            other => other.label().to_string(),
        }
    }

    /// Stable name for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Help => "help",
            Action::Share => "share",
            Action::Wallet => "wallet",
            Action::Balance => "balance",
            Action::Deposit => "deposit",
            Action::SendTransaction => "send_tr",
            Action::Disconnect => "disconnect",
            Action::Connect(_) => "connect",
        }
    }
}

impl From<Command> for Action {
    fn from(cmd: Command) -> Self {
        match cmd {
            Command::Start => Action::Start,
            Command::Help => Action::Help,
            Command::Share => Action::Share,
            Command::Wallet => Action::Wallet,
            Command::Balance => Action::Balance,
            Command::Deposit => Action::Deposit,
            Command::Transaction => Action::SendTransaction,
        }
    }
}
