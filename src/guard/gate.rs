//! Message gate: sequences the mute check, the flood tracker and the
//! host-side effects for login, chat and tick events.

use std::fmt::Debug;
use std::hash::Hash;

use parking_lot::RwLock;
use tracing::{debug, info};

use super::{Decision, FloodSettings, FloodTracker, MuteRegistry, Timestamp};

/// Where a chat attempt is headed.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Say,
    Whisper,
    Group,
    Guild,
    Channel,
}

/// Whether the host should deliver the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Block,
}

/// System notices sent back to an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    AlreadyMuted,
    MutedForSpam,
    UnmutedExpired,
    MuteRefreshedOnLogin,
}

/// One outbound chat message as seen by the gate.
#[derive(Debug, Clone)]
pub struct ChatAttempt<A> {
    pub actor: A,
    pub channel: ChannelKind,
    /// Recipient holds elevated privileges (only meaningful for whispers)
    pub recipient_privileged: bool,
}

impl<A> ChatAttempt<A> {
    pub fn new(actor: A, channel: ChannelKind) -> Self {
        Self {
            actor,
            channel,
            recipient_privileged: false,
        }
    }

    #[must_use]
    #[allow(dead_code)]
    pub fn with_privileged_recipient(mut self, privileged: bool) -> Self {
        self.recipient_privileged = privileged;
        self
    }

    /// Whispers to privileged recipients are never rate limited.
    pub fn bypasses_gate(&self) -> bool {
        self.channel == ChannelKind::Whisper && self.recipient_privileged
    }
}

/// Side effects the gate asks of its host.
///
/// All requests are idempotent; the host may queue them.
pub trait Host<A> {
    fn apply_silence(&self, actor: &A, until: Timestamp);
    fn remove_silence(&self, actor: &A);
    fn notify(&self, actor: &A, notice: Notice);
}

/// Flood guard owning both registries and the active settings.
pub struct FloodGuard<A>
where
    A: Eq + Hash,
{
    tracker: FloodTracker<A>,
    mutes: MuteRegistry<A>,
    settings: RwLock<FloodSettings>,
}

impl<A> FloodGuard<A>
where
    A: Eq + Hash + Clone + Debug,
{
    pub fn new(settings: FloodSettings) -> Self {
        Self {
            tracker: FloodTracker::new(),
            mutes: MuteRegistry::new(),
            settings: RwLock::new(settings),
        }
    }

    pub fn settings(&self) -> FloodSettings {
        *self.settings.read()
    }

    /// Swap in new settings. Existing mutes keep their expiry.
    pub fn reload(&self, settings: FloodSettings) {
        let previous = std::mem::replace(&mut *self.settings.write(), settings);
        if previous != settings {
            info!("Flood settings reloaded: {:?} -> {:?}", previous, settings);
        }
    }

    #[allow(dead_code)]
    pub fn tracker(&self) -> &FloodTracker<A> {
        &self.tracker
    }

    pub fn mutes(&self) -> &MuteRegistry<A> {
        &self.mutes
    }

    /// Gate one chat attempt.
    pub fn on_chat_attempt<H>(&self, attempt: &ChatAttempt<A>, now: Timestamp, host: &H) -> Verdict
    where
        H: Host<A> + ?Sized,
    {
        if attempt.bypasses_gate() {
            return Verdict::Allow;
        }

        let actor = &attempt.actor;

        if self.mutes.is_muted(actor, now) {
            debug!("{:?} is muted, blocking {:?} message", actor, attempt.channel);
            // One reminder per mute
            if self.mutes.mark_notified(actor) {
                host.notify(actor, Notice::AlreadyMuted);
            }
            return Verdict::Block;
        }

        let settings = self.settings();

        match self.tracker.record_message(actor, now, &settings) {
            Decision::Allowed => Verdict::Allow,
            Decision::Violated => {
                let until = self.mutes.mute(actor, now, settings.mute_duration_secs());
                info!(
                    "{:?} exceeded {} messages in {}s, muted until {}",
                    actor, settings.max_messages, settings.time_frame, until
                );
                host.apply_silence(actor, until);
                host.notify(actor, Notice::MutedForSpam);
                Verdict::Block
            }
        }
    }

    /// Reconcile an actor's external silence effect at session start.
    pub fn on_login<H>(&self, actor: &A, has_silence_effect: bool, now: Timestamp, host: &H)
    where
        H: Host<A> + ?Sized,
    {
        let duration = self.settings().mute_duration_secs();

        if self.mutes.reconcile(actor, now, has_silence_effect, duration) {
            info!("{:?} logged in with an untracked mute, refreshed for {}s", actor, duration);
            host.notify(actor, Notice::MuteRefreshedOnLogin);
        }
    }

    /// Forget an actor's message history when their session ends.
    ///
    /// Mutes are kept, so leaving does not shorten one.
    pub fn on_logout(&self, actor: &A) {
        self.tracker.forget(actor);
    }

    /// Lift every mute that has expired by `now`.
    ///
    /// Returns how many actors were unmuted.
    pub fn on_tick<H>(&self, now: Timestamp, host: &H) -> usize
    where
        H: Host<A> + ?Sized,
    {
        let lifted = self.mutes.sweep(now);

        for actor in &lifted {
            info!("Mute expired for {:?}", actor);
            host.remove_silence(actor);
            host.notify(actor, Notice::UnmutedExpired);
        }

        lifted.len()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Effect {
        Apply(u64, Timestamp),
        Remove(u64),
        Notify(u64, Notice),
    }

    #[derive(Default)]
    struct RecordingHost {
        effects: Mutex<Vec<Effect>>,
    }

    impl RecordingHost {
        fn take(&self) -> Vec<Effect> {
            std::mem::take(&mut *self.effects.lock())
        }
    }

    impl Host<u64> for RecordingHost {
        fn apply_silence(&self, actor: &u64, until: Timestamp) {
            self.effects.lock().push(Effect::Apply(*actor, until));
        }

        fn remove_silence(&self, actor: &u64) {
            self.effects.lock().push(Effect::Remove(*actor));
        }

        fn notify(&self, actor: &u64, notice: Notice) {
            self.effects.lock().push(Effect::Notify(*actor, notice));
        }
    }

    fn say(actor: u64) -> ChatAttempt<u64> {
        ChatAttempt::new(actor, ChannelKind::Say)
    }

    #[test]
    fn test_end_to_end_scenario() {
        let guard = FloodGuard::new(FloodSettings::new(2, 5, 10));
        let host = RecordingHost::default();
        let attempt = say(1);

        assert_eq!(guard.on_chat_attempt(&attempt, 0, &host), Verdict::Allow);
        assert_eq!(guard.on_chat_attempt(&attempt, 1, &host), Verdict::Allow);
        assert!(host.take().is_empty());

        assert_eq!(guard.on_chat_attempt(&attempt, 2, &host), Verdict::Block);
        assert_eq!(
            host.take(),
            vec![Effect::Apply(1, 12), Effect::Notify(1, Notice::MutedForSpam)]
        );
        assert_eq!(guard.mutes().muted_until(&1), Some(12));
        assert_eq!(guard.tracker().history_len(&1), 0);

        assert_eq!(guard.on_chat_attempt(&attempt, 5, &host), Verdict::Block);
        assert_eq!(host.take(), vec![Effect::Notify(1, Notice::AlreadyMuted)]);
        // Blocked attempts are not counted
        assert_eq!(guard.tracker().history_len(&1), 0);

        assert_eq!(guard.on_chat_attempt(&attempt, 6, &host), Verdict::Block);
        assert!(host.take().is_empty());

        assert_eq!(guard.on_tick(13, &host), 1);
        assert_eq!(
            host.take(),
            vec![Effect::Remove(1), Effect::Notify(1, Notice::UnmutedExpired)]
        );

        assert_eq!(guard.on_chat_attempt(&attempt, 13, &host), Verdict::Allow);
        assert!(host.take().is_empty());
    }

    #[test]
    fn test_expired_but_unswept_mute_does_not_block() {
        let guard = FloodGuard::new(FloodSettings::new(0, 5, 10));
        let host = RecordingHost::default();

        assert_eq!(guard.on_chat_attempt(&say(1), 0, &host), Verdict::Block);
        host.take();

        // Query-detected expiry: a fresh message is tracked again
        let settings = FloodSettings::new(3, 5, 10);
        guard.reload(settings);
        assert_eq!(guard.on_chat_attempt(&say(1), 10, &host), Verdict::Allow);
    }

    #[test]
    fn test_tick_before_expiry_lifts_nothing() {
        let guard = FloodGuard::new(FloodSettings::new(0, 5, 10));
        let host = RecordingHost::default();

        guard.on_chat_attempt(&say(1), 0, &host);
        host.take();

        assert_eq!(guard.on_tick(9, &host), 0);
        assert!(host.take().is_empty());
        assert!(guard.mutes().is_muted(&1, 9));
    }

    #[test]
    fn test_whisper_with_privileged_recipient_bypasses_gate() {
        let guard = FloodGuard::new(FloodSettings::new(0, 5, 10));
        let host = RecordingHost::default();
        let whisper = ChatAttempt::new(1u64, ChannelKind::Whisper).with_privileged_recipient(true);

        assert_eq!(guard.on_chat_attempt(&whisper, 0, &host), Verdict::Allow);
        assert_eq!(guard.tracker().history_len(&1), 0);
        assert!(host.take().is_empty());
    }

    #[test]
    fn test_privileged_flag_only_applies_to_whispers() {
        let guard = FloodGuard::new(FloodSettings::new(0, 5, 10));
        let host = RecordingHost::default();
        let group = ChatAttempt::new(1u64, ChannelKind::Group).with_privileged_recipient(true);

        assert_eq!(guard.on_chat_attempt(&group, 0, &host), Verdict::Block);
    }

    #[test]
    fn test_muted_actor_whispering_admin_still_allowed() {
        let guard = FloodGuard::new(FloodSettings::new(0, 5, 10));
        let host = RecordingHost::default();

        guard.on_chat_attempt(&say(1), 0, &host);
        host.take();

        let whisper = ChatAttempt::new(1u64, ChannelKind::Whisper).with_privileged_recipient(true);
        assert_eq!(guard.on_chat_attempt(&whisper, 1, &host), Verdict::Allow);
    }

    #[test]
    fn test_login_with_orphaned_effect_refreshes_mute() {
        let guard = FloodGuard::new(FloodSettings::new(5, 10, 60));
        let host = RecordingHost::default();

        guard.on_login(&1, true, 100, &host);
        assert_eq!(host.take(), vec![Effect::Notify(1, Notice::MuteRefreshedOnLogin)]);
        assert_eq!(guard.mutes().muted_until(&1), Some(160));

        // Second login while still muted does not extend
        guard.on_login(&1, true, 120, &host);
        assert!(host.take().is_empty());
        assert_eq!(guard.mutes().muted_until(&1), Some(160));
    }

    #[test]
    fn test_logout_keeps_mute_but_drops_history() {
        let guard = FloodGuard::new(FloodSettings::new(2, 10, 60));
        let host = RecordingHost::default();

        guard.on_chat_attempt(&say(1), 0, &host);
        guard.on_chat_attempt(&say(2), 0, &host);
        guard.on_chat_attempt(&say(2), 1, &host);
        guard.on_chat_attempt(&say(2), 2, &host);

        guard.on_logout(&1);
        guard.on_logout(&2);
        assert_eq!(guard.tracker().history_len(&1), 0);
        assert!(guard.mutes().is_muted(&2, 3));
    }

    #[test]
    fn test_login_without_effect_is_noop() {
        let guard = FloodGuard::new(FloodSettings::default());
        let host = RecordingHost::default();

        guard.on_login(&1, false, 0, &host);
        assert!(host.take().is_empty());
        assert_eq!(guard.mutes().len(), 0);
    }

    #[test]
    fn test_unmuted_actor_starts_with_clean_window() {
        let guard = FloodGuard::new(FloodSettings::new(2, 100, 10));
        let host = RecordingHost::default();

        for t in 0..3 {
            guard.on_chat_attempt(&say(1), t, &host);
        }
        guard.on_tick(12, &host);
        host.take();

        assert_eq!(guard.on_chat_attempt(&say(1), 12, &host), Verdict::Allow);
        assert_eq!(guard.on_chat_attempt(&say(1), 13, &host), Verdict::Allow);
        assert_eq!(guard.on_chat_attempt(&say(1), 14, &host), Verdict::Block);
    }

    #[test]
    fn test_already_muted_notice_sent_once_per_mute() {
        let guard = FloodGuard::new(FloodSettings::new(0, 5, 10));
        let host = RecordingHost::default();

        guard.on_chat_attempt(&say(1), 0, &host);
        host.take();

        for t in 1..8 {
            assert_eq!(guard.on_chat_attempt(&say(1), t, &host), Verdict::Block);
        }
        assert_eq!(host.take(), vec![Effect::Notify(1, Notice::AlreadyMuted)]);

        // A new mute earns a new reminder
        guard.on_tick(10, &host);
        guard.on_chat_attempt(&say(1), 10, &host);
        host.take();
        guard.on_chat_attempt(&say(1), 11, &host);
        guard.on_chat_attempt(&say(1), 12, &host);
        assert_eq!(host.take(), vec![Effect::Notify(1, Notice::AlreadyMuted)]);
    }

    #[test]
    fn test_reload_applies_to_next_message() {
        let guard = FloodGuard::new(FloodSettings::new(5, 10, 60));
        let host = RecordingHost::default();

        guard.on_chat_attempt(&say(1), 0, &host);
        guard.reload(FloodSettings::new(1, 10, 30));
        assert_eq!(guard.settings().mute_duration, 30);

        assert_eq!(guard.on_chat_attempt(&say(1), 1, &host), Verdict::Block);
        assert_eq!(guard.mutes().muted_until(&1), Some(31));
    }
}
