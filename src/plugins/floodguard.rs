//! Flood guard command handlers.

use teloxide::prelude::*;
use teloxide::types::{ParseMode, ReplyParameters};
use tracing::info;

use crate::bot::{AppState, Member, ThrottledBot};
use crate::guard::{FloodSettings, MuteRegistry, Timestamp};
use crate::i18n::get_text;
use crate::utils::{format_duration, html_escape, unix_now};

/// Handle /floodstatus - current settings and mutes in this chat.
pub async fn floodstatus_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let chat_id = msg.chat.id;
    let muted = muted_in_chat(state.guard.mutes(), chat_id, unix_now());
    let text = render_status(&state.config.locale, &state.guard.settings(), muted);

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}

/// Handle /reloadflood - owners anywhere, admins who can restrict in groups.
pub async fn reloadflood_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let chat_id = msg.chat.id;
    let user_id = match msg.from.as_ref() {
        Some(user) => user.id,
        None => return Ok(()),
    };
    let locale = state.config.locale.as_str();

    let allowed = state.permissions.is_bot_owner(user_id)
        || ((msg.chat.is_group() || msg.chat.is_supergroup())
            && state
                .permissions
                .can_restrict_members(chat_id, user_id)
                .await
                .unwrap_or(false));

    if !allowed {
        bot.send_message(chat_id, get_text(locale, "flood.no_permission"))
            .reply_parameters(ReplyParameters::new(msg.id))
            .await?;
        return Ok(());
    }

    info!("User {} requested flood settings reload in {}", user_id, chat_id);

    let reply = match state.reload_settings() {
        Ok(_) => get_text(locale, "flood.reloaded"),
        Err(e) => get_text(locale, "flood.reload_failed")
            .replace("{error}", &html_escape(&e.to_string())),
    };

    bot.send_message(chat_id, reply)
        .parse_mode(ParseMode::Html)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}

/// Members of `chat_id` whose mute is still running at `now`.
fn muted_in_chat(mutes: &MuteRegistry<Member>, chat_id: ChatId, now: Timestamp) -> usize {
    mutes.count_muted_where(now, |m| m.chat_id == chat_id)
}

fn render_status(locale: &str, settings: &FloodSettings, muted: usize) -> String {
    get_text(locale, "flood.status")
        .replace("{max}", &settings.max_messages.to_string())
        .replace("{frame}", &format_duration(settings.time_frame))
        .replace("{mute}", &format_duration(settings.mute_duration))
        .replace("{muted}", &muted.to_string())
}
