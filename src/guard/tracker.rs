//! Sliding-window message counter.

use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;

use super::{FloodSettings, Timestamp};

/// Outcome of recording one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Violated,
}

/// Per-actor history of recent message timestamps (oldest first).
///
/// Each actor's deque sits behind its own DashMap shard lock, so
/// different actors never contend and one actor's calls are serialized.
pub struct FloodTracker<A>
where
    A: Eq + Hash,
{
    histories: Arc<DashMap<A, VecDeque<Timestamp>>>,
}

// Manual Clone: cloning only shares the map, A itself need not be Clone
impl<A> Clone for FloodTracker<A>
where
    A: Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            histories: Arc::clone(&self.histories),
        }
    }
}

impl<A> FloodTracker<A>
where
    A: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            histories: Arc::new(DashMap::new()),
        }
    }

    /// Record a message sent by `actor` at `now`.
    ///
    /// Timestamps older than `time_frame` are dropped first, then `now` is
    /// appended. More than `max_messages` left in the window is a violation,
    /// and the history is erased so the actor starts clean after the mute.
    ///
    /// A `now` earlier than stored entries purges nothing, which can only
    /// overcount.
    pub fn record_message(&self, actor: &A, now: Timestamp, settings: &FloodSettings) -> Decision {
        let window = settings.time_frame_secs();

        let violated = {
            let mut history = self.histories.entry(actor.clone()).or_default();

            while history
                .front()
                .is_some_and(|&t| now.saturating_sub(t) > window)
            {
                history.pop_front();
            }

            history.push_back(now);
            let violated = history.len() > settings.max_messages as usize;
            if violated {
                history.clear();
            }
            violated
        };

        // Entry guard must be released before touching the shard again
        if violated {
            self.histories.remove_if(actor, |_, history| history.is_empty());
            Decision::Violated
        } else {
            Decision::Allowed
        }
    }

    /// Number of timestamps currently held for `actor`.
    #[allow(dead_code)]
    pub fn history_len(&self, actor: &A) -> usize {
        self.histories.get(actor).map(|h| h.len()).unwrap_or(0)
    }

    /// Drop all history for `actor`.
    pub fn forget(&self, actor: &A) {
        self.histories.remove(actor);
    }
}

impl<A> Default for FloodTracker<A>
where
    A: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
