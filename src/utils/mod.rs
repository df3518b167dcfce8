mod config;
pub mod formatting;
pub mod qr;
pub mod timeout;

pub use config::{Config, NetworkType};
pub use formatting::{
    balance_message, deposit_link, deposit_message, escape_code, escape_markdown,
    format_address, format_ton,
};
pub use qr::render_qr_png;
pub use timeout::with_timeout;
