//! Membership handlers.
//!
//! A join reconciles a restriction the member already carries; a leave
//! drops their message history.

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{ChatMember, ChatMemberKind, ChatMemberUpdated};
use tracing::debug;

use crate::bot::{AppState, Member};
use crate::utils::unix_now;

pub fn handler() -> UpdateHandler<anyhow::Error> {
    dptree::entry()
        .branch(dptree::filter(is_joining).endpoint(join_handler))
        .branch(dptree::filter(is_leaving).endpoint(leave_handler))
}

fn is_joining(update: ChatMemberUpdated) -> bool {
    joined(&update.old_chat_member, &update.new_chat_member)
}

fn is_leaving(update: ChatMemberUpdated) -> bool {
    left(&update.old_chat_member, &update.new_chat_member)
}

/// A non-bot user who was not present before and is now.
fn joined(old: &ChatMember, new: &ChatMember) -> bool {
    !old.is_present() && new.is_present() && !new.user.is_bot
}

fn left(old: &ChatMember, new: &ChatMember) -> bool {
    old.is_present() && !new.is_present()
}

/// Whether the membership carries a restriction that silences the user.
pub fn has_silence_effect(kind: &ChatMemberKind) -> bool {
    matches!(kind, ChatMemberKind::Restricted(r) if !r.can_send_messages)
}

async fn join_handler(update: ChatMemberUpdated, state: AppState) -> anyhow::Result<()> {
    let user = &update.new_chat_member.user;
    let member = Member::new(update.chat.id, user.id);
    let silenced = has_silence_effect(&update.new_chat_member.kind);

    debug!("Member {} joined {} (silenced: {})", user.id, update.chat.id, silenced);

    state.host.remember_name(member, &user.first_name);
    state.guard.on_login(&member, silenced, unix_now(), &state.host);

    Ok(())
}

async fn leave_handler(update: ChatMemberUpdated, state: AppState) -> anyhow::Result<()> {
    let user = &update.new_chat_member.user;
    debug!("Member {} left {}", user.id, update.chat.id);

    state.guard.on_logout(&Member::new(update.chat.id, user.id));
    Ok(())
}
