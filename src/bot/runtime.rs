//! Bot runtime - polling/webhook runners and background tasks.

use std::sync::Arc;
use std::time::Duration;

use teloxide::prelude::*;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use super::dispatcher::{AppState, ThrottledBot};
use super::host::{MemberGuard, TelegramHost};
use super::webhook;
use crate::config::{BotMode, Config};
use crate::utils::unix_now;

/// Run the bot with the configured mode.
pub async fn run(
    config: &Config,
    mut dispatcher: Dispatcher<ThrottledBot, anyhow::Error, teloxide::dispatching::DefaultKey>,
    bot: ThrottledBot,
) -> anyhow::Result<()> {
    match config.bot_mode {
        BotMode::Polling => {
            info!("Starting bot in polling mode...");
            dispatcher.dispatch().await;
        }
        BotMode::Webhook => {
            info!("Starting bot in webhook mode...");
            webhook::start_webhook(config, dispatcher, bot).await?;
        }
    }
    Ok(())
}

/// Periodically lift expired mutes.
pub fn spawn_sweeper(
    guard: Arc<MemberGuard>,
    host: TelegramHost,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let lifted = guard.on_tick(unix_now(), &host);
            if lifted > 0 {
                debug!("Sweep lifted {} mutes", lifted);
            }
        }
    })
}

/// Reload flood settings on SIGHUP.
#[cfg(unix)]
pub fn spawn_reload_listener(state: AppState) -> anyhow::Result<JoinHandle<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup())?;

    Ok(tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!("SIGHUP received, reloading flood settings");
            // Errors are logged inside; the previous settings stay active
            let _ = state.reload_settings();
        }
    }))
}

#[cfg(not(unix))]
pub fn spawn_reload_listener(_state: AppState) -> anyhow::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async {}))
}
