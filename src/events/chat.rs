//! Chat gate handler.
//!
//! Runs every group message through the flood guard, commands included,
//! and deletes the ones it blocks.

use teloxide::prelude::*;
use teloxide::types::Chat;
use tracing::{debug, warn};

use crate::bot::{AppState, Member, ThrottledBot};
use crate::guard::{ChannelKind, ChatAttempt, Verdict};
use crate::utils::unix_now;

/// Channel kind for a Telegram chat.
pub fn channel_kind(chat: &Chat) -> ChannelKind {
    if chat.is_private() {
        ChannelKind::Whisper
    } else if chat.is_supergroup() {
        ChannelKind::Guild
    } else if chat.is_group() {
        ChannelKind::Group
    } else {
        ChannelKind::Channel
    }
}

/// Group messages from human senders. The text plays no part, an unknown
/// `/command` counts like any other message.
pub fn is_gated_message(msg: &Message) -> bool {
    let from_human = msg.from.as_ref().is_some_and(|u| !u.is_bot);
    from_human && (msg.chat.is_group() || msg.chat.is_supergroup())
}

/// Run the message through the guard. `true` means it was blocked.
pub async fn gate_blocks(msg: Message, state: AppState) -> bool {
    let Some(user) = msg.from.as_ref() else {
        return false;
    };
    let chat_id = msg.chat.id;

    // Owners and chat admins cannot be restricted, gating them is pointless
    if state.permissions.is_bot_owner(user.id) {
        return false;
    }
    match state.permissions.rights(chat_id, user.id).await {
        Ok(rights) if rights.is_admin => {
            debug!("User {} is admin in {}, skipping gate", user.id, chat_id);
            return false;
        }
        Ok(_) => {}
        Err(e) => warn!("Admin lookup failed for {} in {}: {}", user.id, chat_id, e),
    }

    let member = Member::new(chat_id, user.id);
    state.host.remember_name(member, &user.first_name);

    let attempt = ChatAttempt::new(member, channel_kind(&msg.chat));
    state.guard.on_chat_attempt(&attempt, unix_now(), &state.host) == Verdict::Block
}

pub async fn delete_blocked(bot: ThrottledBot, msg: Message) -> anyhow::Result<()> {
    if let Err(e) = bot.delete_message(msg.chat.id, msg.id).await {
        warn!("Failed to delete blocked message {} in {}: {}", msg.id.0, msg.chat.id, e);
    }
    Ok(())
}

/// Allowed group messages that are not bot commands.
pub async fn delivered(msg: Message) -> anyhow::Result<()> {
    debug!("Message {} in {} passed the gate", msg.id.0, msg.chat.id);
    Ok(())
}
