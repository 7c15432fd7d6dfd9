//! Telegram side of the flood guard.
//!
//! [`TelegramHost`] turns gate requests into [`HostCommand`]s on an
//! unbounded channel, so the synchronous gate never waits on the Bot API.
//! [`run_effects`] drains the channel and talks to Telegram in order.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use teloxide::prelude::*;
use teloxide::types::{ChatPermissions, ParseMode};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use super::dispatcher::ThrottledBot;
use crate::guard::{FloodGuard, Host, Notice, Timestamp};
use crate::i18n::{get_text, notice_key};
use crate::utils::{format_duration, html_escape, unix_now};

/// A user inside one chat. Mutes are per chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Member {
    pub chat_id: ChatId,
    pub user_id: UserId,
}

impl Member {
    pub fn new(chat_id: ChatId, user_id: UserId) -> Self {
        Self { chat_id, user_id }
    }
}

pub type MemberGuard = FloodGuard<Member>;

/// Work for the effect worker.
#[derive(Debug, Clone)]
pub enum HostCommand {
    Silence { member: Member, until: Timestamp },
    Unsilence { member: Member },
    Notify { member: Member, notice: Notice },
}

/// [`Host`] implementation backed by the effect queue.
#[derive(Clone)]
pub struct TelegramHost {
    tx: UnboundedSender<HostCommand>,
    names: Cache<Member, String>,
}

impl TelegramHost {
    /// Create the host and the receiving end for [`run_effects`].
    pub fn new() -> (Self, UnboundedReceiver<HostCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let names = Cache::builder()
            .max_capacity(50_000)
            .time_to_idle(Duration::from_secs(3600))
            .build();

        (Self { tx, names }, rx)
    }

    /// Remember a display name so later notices can mention the member.
    pub fn remember_name(&self, member: Member, first_name: &str) {
        self.names.insert(member, first_name.to_string());
    }

    /// Name cache shared with the effect worker.
    pub fn names(&self) -> Cache<Member, String> {
        self.names.clone()
    }

    fn send(&self, command: HostCommand) {
        if let Err(e) = self.tx.send(command) {
            warn!("Effect worker is gone, dropping {:?}", e.0);
        }
    }
}

impl Host<Member> for TelegramHost {
    fn apply_silence(&self, actor: &Member, until: Timestamp) {
        self.send(HostCommand::Silence {
            member: *actor,
            until,
        });
    }

    fn remove_silence(&self, actor: &Member) {
        self.send(HostCommand::Unsilence { member: *actor });
    }

    fn notify(&self, actor: &Member, notice: Notice) {
        self.send(HostCommand::Notify {
            member: *actor,
            notice,
        });
    }
}

/// Permissions restored when a mute is lifted.
fn unmuted_permissions() -> ChatPermissions {
    ChatPermissions::SEND_MESSAGES
        | ChatPermissions::SEND_AUDIOS
        | ChatPermissions::SEND_DOCUMENTS
        | ChatPermissions::SEND_PHOTOS
        | ChatPermissions::SEND_VIDEOS
        | ChatPermissions::SEND_VIDEO_NOTES
        | ChatPermissions::SEND_VOICE_NOTES
        | ChatPermissions::SEND_POLLS
        | ChatPermissions::SEND_OTHER_MESSAGES
        | ChatPermissions::ADD_WEB_PAGE_PREVIEWS
}

/// Drain the effect queue until every sender is dropped.
pub async fn run_effects(
    bot: ThrottledBot,
    mut rx: UnboundedReceiver<HostCommand>,
    names: Cache<Member, String>,
    guard: Arc<MemberGuard>,
    locale: String,
) {
    while let Some(command) = rx.recv().await {
        debug!("Executing {:?}", command);
        if let Err(e) = execute(&bot, &command, &names, &guard, &locale).await {
            warn!("Failed to execute {:?}: {}", command, e);
        }
    }
    debug!("Effect queue closed");
}

async fn execute(
    bot: &ThrottledBot,
    command: &HostCommand,
    names: &Cache<Member, String>,
    guard: &MemberGuard,
    locale: &str,
) -> anyhow::Result<()> {
    match *command {
        HostCommand::Silence { member, until } => {
            let request = bot.restrict_chat_member(member.chat_id, member.user_id, ChatPermissions::empty());
            // Server-side expiry as a backstop if the process dies mid-mute
            match chrono::DateTime::from_timestamp(until, 0) {
                Some(dt) => request.until_date(dt).await?,
                None => request.await?,
            };
        }
        HostCommand::Unsilence { member } => {
            bot.restrict_chat_member(member.chat_id, member.user_id, unmuted_permissions())
                .await?;
        }
        HostCommand::Notify { member, notice } => {
            let text = render_notice(notice, &display_name(names, &member), member, guard, locale);
            bot.send_message(member.chat_id, text)
                .parse_mode(ParseMode::Html)
                .await?;
        }
    }
    Ok(())
}

fn display_name(names: &Cache<Member, String>, member: &Member) -> String {
    names
        .get(member)
        .unwrap_or_else(|| member.user_id.to_string())
}

/// Remaining mute time, or the configured duration when nothing is recorded.
fn remaining_secs(guard: &MemberGuard, member: &Member, now: Timestamp) -> u64 {
    guard
        .mutes()
        .muted_until(member)
        .map(|until| until.saturating_sub(now).max(0) as u64)
        .unwrap_or_else(|| guard.settings().mute_duration)
}

fn render_notice(
    notice: Notice,
    name: &str,
    member: Member,
    guard: &MemberGuard,
    locale: &str,
) -> String {
    get_text(locale, notice_key(notice))
        .replace("{id}", &member.user_id.to_string())
        .replace("{name}", &html_escape(name))
        .replace(
            "{duration}",
            &format_duration(remaining_secs(guard, &member, unix_now())),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::FloodSettings;

    fn member() -> Member {
        Member::new(ChatId(-100), UserId(42))
    }

    #[test]
    fn test_host_queues_commands_in_order() {
        let (host, mut rx) = TelegramHost::new();

        host.apply_silence(&member(), 70);
        host.notify(&member(), Notice::MutedForSpam);
        host.remove_silence(&member());

        assert!(matches!(rx.try_recv(), Ok(HostCommand::Silence { until: 70, .. })));
        assert!(matches!(
            rx.try_recv(),
            Ok(HostCommand::Notify { notice: Notice::MutedForSpam, .. })
        ));
        assert!(matches!(rx.try_recv(), Ok(HostCommand::Unsilence { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let (host, _rx) = TelegramHost::new();
        assert_eq!(display_name(&host.names(), &member()), "42");

        host.remember_name(member(), "Ana");
        assert_eq!(display_name(&host.names(), &member()), "Ana");
    }

    #[test]
    fn test_remaining_secs() {
        let guard = MemberGuard::new(FloodSettings::new(5, 10, 60));
        assert_eq!(remaining_secs(&guard, &member(), 1000), 60);

        guard.mutes().mute(&member(), 1000, 60);
        assert_eq!(remaining_secs(&guard, &member(), 1015), 45);
        assert_eq!(remaining_secs(&guard, &member(), 2000), 0);
    }

    #[test]
    fn test_render_notice_escapes_name() {
        crate::i18n::init();
        let guard = MemberGuard::new(FloodSettings::default());
        let text = render_notice(Notice::UnmutedExpired, "<Ana>", member(), &guard, "en");

        assert!(text.contains("&lt;Ana&gt;"));
        assert!(text.contains("tg://user?id=42"));
    }
}
