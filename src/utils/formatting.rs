/// Utility functions for formatting chat messages and amounts

use crate::constants::NANOTON_PER_TON;

/// Format a nano-TON amount as TON with two decimals, rounding half up
pub fn format_ton(nano: u64) -> String {
    const CENT: u64 = NANOTON_PER_TON / 100;
    let cents = (nano as u128 + (CENT / 2) as u128) / CENT as u128;
    format!("{}.{:02} TON", cents / 100, cents % 100)
}

/// Escape text for Telegram MarkdownV2
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '=' | '|' | '{' | '}' | '.' | '!' | '\\'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escape text placed inside a MarkdownV2 code span
pub fn escape_code(text: &str) -> String {
    text.replace('\\', "\\\\").replace('`', "\\`")
}

/// Balance reply
pub fn balance_message(nano: u64) -> String {
    format!("💰 Your balance: *{}*", escape_markdown(&format_ton(nano)))
}

/// Deposit instructions; address and user id stay verbatim inside code spans
pub fn deposit_message(deposit_address: &str, user_id: i64) -> String {
    format!(
        "It is very easy to top up your balance here\\.\n\
        Simply send any amount of TON to this address:\n\n\
        `{}`\n\n\
        And include the following comment: `{}`\n\n\
        You can also deposit by clicking the button below\\.",
        escape_code(deposit_address),
        user_id
    )
}

/// Link a wallet app opens to pre-fill a deposit with the user's comment
pub fn deposit_link(deposit_address: &str, user_id: i64) -> String {
    format!("https://app.tonkeeper.com/transfer/{}?text={}", deposit_address, user_id)
}

/// Format wallet address for display (shortened)
pub fn format_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() > 10 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        address.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ton() {
        assert_eq!(format_ton(1_500_000_000), "1.50 TON");
        assert_eq!(format_ton(0), "0.00 TON");
        assert_eq!(format_ton(10_000_000), "0.01 TON");
        assert_eq!(format_ton(123_456_789_000), "123.46 TON");
    }

    #[test]
    fn test_format_ton_rounds_half_up() {
        assert_eq!(format_ton(999_999_999), "1.00 TON");
        assert_eq!(format_ton(4_999_999), "0.00 TON");
        assert_eq!(format_ton(5_000_000), "0.01 TON");
        assert_eq!(format_ton(u64::MAX), "18446744073.71 TON");
    }

    #[test]
    fn test_balance_message_escapes_dot() {
        assert_eq!(balance_message(1_500_000_000), "💰 Your balance: *1\\.50 TON*");
    }

    #[test]
    fn test_deposit_message_keeps_address_and_id_verbatim() {
        let text = deposit_message("EQAbc...xyz", 12345);
        assert!(text.contains("`EQAbc...xyz`"));
        assert!(text.contains("`12345`"));
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("Timeout error!"), "Timeout error\\!");
        assert_eq!(escape_markdown("a_b-c.d"), "a\\_b\\-c\\.d");
        assert_eq!(escape_markdown("plain"), "plain");
    }

    #[test]
    fn test_deposit_link() {
        assert_eq!(
            deposit_link("UQabc", 42),
            "https://app.tonkeeper.com/transfer/UQabc?text=42"
        );
    }

    #[test]
    fn test_format_address() {
        let addr = "UQCD39VS5jcptHL8vMjEXrzGaRcCVYto7HUn4bpAOg8xqEBI";
        assert_eq!(format_address(addr), "UQCD...qEBI");
        assert_eq!(format_address("short"), "short");
    }

    #[test]
    fn test_format_address_multibyte() {
        assert_eq!(format_address("ééééééééééééé"), "éééé...éééé");
        assert_eq!(format_address("0:кошелёк-адрес"), "0:ко...дрес");
    }
}
