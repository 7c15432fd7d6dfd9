//! Admin checks for flood guard commands.
//!
//! Lookups hit `getChatMember` once per (chat, user) and are cached with
//! Moka for a few minutes. Bot owners from `OWNER_IDS` pass every check.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use teloxide::prelude::*;
use teloxide::types::{ChatMember, ChatMemberKind};
use tracing::debug;

/// (chat_id, user_id)
type AdminCacheKey = (i64, u64);

/// What a chat member may do, as far as the flood guard cares.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdminRights {
    pub is_admin: bool,
    pub can_restrict_members: bool,
}

impl AdminRights {
    fn from_chat_member(member: &ChatMember) -> Self {
        match &member.kind {
            ChatMemberKind::Owner(_) => Self {
                is_admin: true,
                can_restrict_members: true,
            },
            ChatMemberKind::Administrator(admin) => Self {
                is_admin: true,
                can_restrict_members: admin.can_restrict_members,
            },
            _ => Self::default(),
        }
    }
}

/// Permission checker with caching support.
#[derive(Clone)]
pub struct Permissions {
    bot: Bot,
    cache: Cache<AdminCacheKey, AdminRights>,
    owner_ids: Arc<[u64]>,
}

impl Permissions {
    pub fn with_owners(bot: Bot, owner_ids: Vec<u64>) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(300))
            .time_to_idle(Duration::from_secs(120))
            .build();

        Self {
            bot,
            cache,
            owner_ids: owner_ids.into(),
        }
    }

    #[inline]
    pub fn is_bot_owner(&self, user_id: UserId) -> bool {
        self.owner_ids.contains(&user_id.0)
    }

    /// Rights of `user_id` in `chat_id`, cached.
    pub async fn rights(&self, chat_id: ChatId, user_id: UserId) -> anyhow::Result<AdminRights> {
        if self.is_bot_owner(user_id) {
            return Ok(AdminRights {
                is_admin: true,
                can_restrict_members: true,
            });
        }

        let key = (chat_id.0, user_id.0);
        if let Some(cached) = self.cache.get(&key) {
            debug!("Admin cache hit for user {} in chat {}", user_id, chat_id);
            return Ok(cached);
        }

        let member = self.bot.get_chat_member(chat_id, user_id).await?;
        let rights = AdminRights::from_chat_member(&member);
        self.cache.insert(key, rights);

        Ok(rights)
    }

    pub async fn can_restrict_members(&self, chat_id: ChatId, user_id: UserId) -> anyhow::Result<bool> {
        Ok(self.rights(chat_id, user_id).await?.can_restrict_members)
    }
}
