use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Runtime configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    /// The single operator; every admin action is gated on this id.
    pub admin_id: i64,
    pub database_url: String,
    /// Public channel that receives random-winner announcements.
    pub announce_channel: String,
    /// Channels a user must join before using the bot.
    pub required_channels: Vec<String>,
    pub support_url: String,
    pub card_number: String,
    pub card_holder: String,
    pub trx_wallet: String,
    pub price_api_url: String,
    pub users_file: PathBuf,
    pub registered_file: PathBuf,
    pub phones_file: PathBuf,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bot_token = env::var("BOT_TOKEN").context("BOT_TOKEN is not set")?;
        let admin_id = env::var("ADMIN_ID")
            .context("ADMIN_ID is not set")?
            .parse::<i64>()
            .context("ADMIN_ID must be a numeric Telegram id")?;

        let required_channels = var_or("REQUIRED_CHANNELS", "")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            bot_token,
            admin_id,
            database_url: var_or("DATABASE_URL", "sqlite://user_data.db"),
            announce_channel: var_or("ANNOUNCE_CHANNEL", ""),
            required_channels,
            support_url: var_or("SUPPORT_URL", ""),
            card_number: var_or("CARD_NUMBER", ""),
            card_holder: var_or("CARD_HOLDER", ""),
            trx_wallet: var_or("TRX_WALLET", ""),
            price_api_url: var_or("PRICE_API_URL", "https://api.nobitex.ir/market/stats"),
            users_file: var_or("USERS_FILE", "users.txt").into(),
            registered_file: var_or("REGISTERED_FILE", "registered_users.txt").into(),
            phones_file: var_or("PHONES_FILE", "phones.txt").into(),
        })
    }
}
