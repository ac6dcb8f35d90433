use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use codemart_db::repositories::{BanRepository, UserRepository};

mod bot;
mod config;
mod dialogue;
mod registry;
mod services;
mod state;

use crate::config::Config;
use crate::dialogue::DialogueStore;
use crate::registry::Registry;
use crate::services::admin_service::AdminService;
use crate::services::credit_service::CreditService;
use crate::services::pay_service::PayService;
use crate::services::promo_service::PromoService;
use crate::services::roster_service::RosterService;
use crate::services::stats_service::StatsService;
use crate::services::store_service::StoreService;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Codemart Bot...");

    let cfg = Config::from_env()?;
    let pool = codemart_db::connect(&cfg.database_url).await?;
    let users = UserRepository::new(pool.clone());
    let bans = BanRepository::new(pool);

    let mut registry = Registry::new();
    for account in users.load_all().await? {
        registry.accounts.insert(account.user_id, account);
    }
    for id in bans.load_all().await? {
        registry.banned.insert(id);
    }
    info!(
        "Loaded {} accounts and {} bans from the database",
        registry.accounts.len(),
        registry.banned.len()
    );
    let registry = registry.shared();

    let roster = RosterService::new(
        registry.clone(),
        cfg.users_file.clone(),
        cfg.registered_file.clone(),
        cfg.phones_file.clone(),
    );
    roster.load().await?;

    let state = AppState {
        cfg: Arc::new(cfg.clone()),
        dialogues: DialogueStore::new(),
        store: StoreService::new(registry.clone(), users.clone(), roster.clone()),
        credit: CreditService::new(registry.clone(), users.clone(), roster.clone()),
        promo: PromoService::new(registry.clone(), users, roster.clone()),
        stats: StatsService::new(registry.clone()),
        pay: PayService::new(cfg.price_api_url.clone()),
        admin: AdminService::new(registry, bans),
        roster,
    };

    let bot = Bot::new(&cfg.bot_token);
    bot::run_bot(bot, state).await;
    Ok(())
}
