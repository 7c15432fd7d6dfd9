//! Webhook listener.
//!
//! teloxide registers the URL with Telegram, serves updates through axum
//! and removes the webhook again on shutdown.

use std::net::{Ipv4Addr, SocketAddr};

use anyhow::{Context, ensure};
use teloxide::dispatching::DefaultKey;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks::{self, Options};
use tracing::info;
use url::Url;

use super::dispatcher::ThrottledBot;
use crate::config::Config;

/// Listener options for the configured public URL, local port and secret.
fn listener_options(config: &Config) -> anyhow::Result<Options> {
    let raw = config
        .webhook_url
        .as_deref()
        .context("WEBHOOK_URL is required in webhook mode")?;
    let url = Url::parse(raw).with_context(|| format!("WEBHOOK_URL {raw:?} is not a valid URL"))?;
    let address = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.webhook_port));

    let options = Options::new(address, url);
    match config.webhook_secret.as_deref() {
        Some(secret) => {
            check_secret(secret)?;
            Ok(options.secret_token(secret.to_owned()))
        }
        None => Ok(options),
    }
}

/// Telegram's rules for the secret header. teloxide panics on a bad one.
fn check_secret(secret: &str) -> anyhow::Result<()> {
    ensure!(
        (1..=256).contains(&secret.len()),
        "WEBHOOK_SECRET must be 1 to 256 characters long"
    );
    ensure!(
        secret
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-'),
        "WEBHOOK_SECRET may only contain A-Z, a-z, 0-9, '_' and '-'"
    );
    Ok(())
}

/// Serve updates through the webhook until the dispatcher shuts down.
pub async fn start_webhook(
    config: &Config,
    mut dispatcher: Dispatcher<ThrottledBot, anyhow::Error, DefaultKey>,
    bot: ThrottledBot,
) -> anyhow::Result<()> {
    let options = listener_options(config)?;
    info!(
        "Webhook {} served on {} (secret: {})",
        options.url,
        options.address,
        if options.secret_token.is_some() { "configured" } else { "generated" }
    );

    // Registration goes through the plain Bot, not the Throttle adaptor
    let listener = webhooks::axum(bot.inner().clone(), options)
        .await
        .context("Failed to register the webhook with Telegram")?;

    dispatcher
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("Webhook listener error"),
        )
        .await;

    Ok(())
}
