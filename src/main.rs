//! floodguard - Chat flood guard for Telegram groups.
//!
//! Limits how many messages a member may send inside a sliding window and
//! mutes violators for a fixed time, lifting the mute automatically.
//!
//! ## Architecture
//!
//! - `guard` - Flood tracker, mute registry and message gate (no I/O)
//! - `config` - Environment and flood settings loading
//! - `bot` - Telegram host: dispatcher, effect queue, sweeper
//! - `events` - Chat and join handlers feeding the gate
//! - `plugins` - Commands
//! - `permissions` - Cached admin checks
//! - `i18n` - Notice texts
//! - `utils` - Helpers

mod bot;
mod config;
mod events;
mod guard;
mod i18n;
mod permissions;
mod plugins;
mod utils;

use std::sync::Arc;

use teloxide::adaptors::throttle::Limits;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bot::{AppState, MemberGuard, TelegramHost};
use config::Config;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Default to info for our crate if RUST_LOG is not set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("floodguard=info,teloxide=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting floodguard...");

    let config = Arc::new(Config::from_env());
    info!("Bot mode: {:?}", config.bot_mode);

    // A malformed settings file is fatal at startup; a missing one is not
    let settings = config.load_flood_settings()?;
    info!("Flood settings: {:?}", settings);

    i18n::init();

    let guard = Arc::new(MemberGuard::new(settings));
    let (host, effects_rx) = TelegramHost::new();

    let bot = Bot::new(&config.bot_token).throttle(Limits::default());
    let me = bot.get_me().await?;
    info!("Bot username: @{}", me.username());

    if config.owner_ids.is_empty() {
        info!("No owner IDs configured (OWNER_IDS is empty)");
    } else {
        info!("Bot owners: {:?}", config.owner_ids);
    }

    tokio::spawn(bot::run_effects(
        bot.clone(),
        effects_rx,
        host.names(),
        guard.clone(),
        config.locale.clone(),
    ));
    let sweeper = bot::spawn_sweeper(guard.clone(), host.clone(), config.sweep_interval);
    info!("Mute sweeper running every {:?}", config.sweep_interval);

    let state = AppState::new(&bot, config.clone(), guard, host);
    let reload_listener = bot::spawn_reload_listener(state.clone())?;

    let dispatcher = bot::build_dispatcher(bot.clone(), state);
    bot::run(&config, dispatcher, bot).await?;

    sweeper.abort();
    reload_listener.abort();
    info!("floodguard stopped");

    Ok(())
}
