//! Message dispatcher setup.
//!
//! Builds the dispatcher with the flood guard commands and event handlers.

use std::sync::Arc;

use teloxide::adaptors::Throttle;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::{info, warn};

use super::host::{MemberGuard, TelegramHost};
use crate::config::{Config, ConfigError};
use crate::events;
use crate::guard::FloodSettings;
use crate::permissions::Permissions;
use crate::plugins;

/// Bot type with Throttle adaptor for automatic rate limiting.
pub type ThrottledBot = Throttle<Bot>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Flood tracker and mute registry.
    pub guard: Arc<MemberGuard>,

    /// Effect queue the guard writes to.
    pub host: TelegramHost,

    /// Permission checker with admin caching.
    pub permissions: Permissions,
}

impl AppState {
    pub fn new(
        bot: &ThrottledBot,
        config: Arc<Config>,
        guard: Arc<MemberGuard>,
        host: TelegramHost,
    ) -> Self {
        // Permissions needs the inner Bot for API calls
        let permissions = Permissions::with_owners(bot.inner().clone(), config.owner_ids.clone());

        Self {
            config,
            guard,
            host,
            permissions,
        }
    }

    /// Re-read flood settings. On failure the active settings stay.
    pub fn reload_settings(&self) -> Result<FloodSettings, ConfigError> {
        match self.config.load_flood_settings() {
            Ok(settings) => {
                self.guard.reload(settings);
                info!("Flood settings active: {:?}", settings);
                Ok(settings)
            }
            Err(e) => {
                warn!("Flood settings reload failed: {}", e);
                Err(e)
            }
        }
    }
}

/// Build the dispatcher with all handlers.
pub fn build_dispatcher(
    bot: ThrottledBot,
    state: AppState,
) -> Dispatcher<ThrottledBot, anyhow::Error, teloxide::dispatching::DefaultKey> {
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
}

/// Build the handler schema.
fn schema() -> UpdateHandler<anyhow::Error> {
    // Gate first so commands count too, then commands, then the rest
    let message_handler = Update::filter_message()
        .branch(events::flood_gate_handler())
        .branch(plugins::command_handler())
        .branch(events::message_event_handler());

    // Joins reconcile an existing restriction
    let member_handler = Update::filter_chat_member().branch(events::event_handler());

    dptree::entry()
        .branch(message_handler)
        .branch(member_handler)
}
