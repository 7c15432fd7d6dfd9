//! Mute bookkeeping: who is muted and until when.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MuteEntry {
    until: Timestamp,
    /// The actor has been told they are still muted
    notified: bool,
}

impl MuteEntry {
    fn new(until: Timestamp) -> Self {
        Self {
            until,
            notified: false,
        }
    }
}

/// Per-actor mute expiry.
///
/// An entry means "muted as of when it was written". Expired entries
/// linger until [`MuteRegistry::sweep`] removes them; [`MuteRegistry::is_muted`]
/// only compares against the expiry.
pub struct MuteRegistry<A>
where
    A: Eq + Hash,
{
    entries: Arc<DashMap<A, MuteEntry>>,
}

impl<A> Clone for MuteRegistry<A>
where
    A: Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<A> MuteRegistry<A>
where
    A: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Mute `actor` until `now + duration`, replacing any earlier expiry.
    ///
    /// Returns the new expiry.
    pub fn mute(&self, actor: &A, now: Timestamp, duration: i64) -> Timestamp {
        let until = now.saturating_add(duration);
        self.entries.insert(actor.clone(), MuteEntry::new(until));
        until
    }

    pub fn is_muted(&self, actor: &A, now: Timestamp) -> bool {
        self.entries
            .get(actor)
            .is_some_and(|entry| now < entry.until)
    }

    pub fn muted_until(&self, actor: &A) -> Option<Timestamp> {
        self.entries.get(actor).map(|entry| entry.until)
    }

    /// Record that `actor` was told about their current mute.
    ///
    /// Returns `true` the first time per mute, `false` afterwards or when
    /// there is no entry. A fresh `mute` or `reconcile` resets it.
    pub fn mark_notified(&self, actor: &A) -> bool {
        self.entries
            .get_mut(actor)
            .is_some_and(|mut entry| !std::mem::replace(&mut entry.notified, true))
    }

    /// Remove and return every actor whose mute has run out at `now`.
    ///
    /// Runs [`MuteRegistry::expired`] then [`MuteRegistry::lift`], so no
    /// shard lock spans the whole scan.
    pub fn sweep(&self, now: Timestamp) -> Vec<A> {
        let expired = self.expired(now);
        self.lift(expired, now)
    }

    /// Snapshot of actors whose mute has run out at `now`.
    pub fn expired(&self, now: Timestamp) -> Vec<A> {
        self.entries
            .iter()
            .filter(|entry| entry.until <= now)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Remove each of `actors` whose entry is still expired at `now`.
    ///
    /// An entry re-muted since the snapshot fails the check and stays.
    /// Returns the actors actually removed.
    pub fn lift(&self, actors: Vec<A>, now: Timestamp) -> Vec<A> {
        actors
            .into_iter()
            .filter(|actor| {
                self.entries
                    .remove_if(actor, |_, entry| entry.until <= now)
                    .is_some()
            })
            .collect()
    }

    /// Align bookkeeping with an externally visible silence effect at login.
    ///
    /// An effect with no matching entry is treated as a fresh violation and
    /// gets a full `duration`. Returns `true` when an entry was created.
    pub fn reconcile(
        &self,
        actor: &A,
        now: Timestamp,
        has_external_effect: bool,
        duration: i64,
    ) -> bool {
        if !has_external_effect {
            return false;
        }

        match self.entries.entry(actor.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(MuteEntry::new(now.saturating_add(duration)));
                true
            }
        }
    }

    /// Number of entries, expired ones included.
    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Actors matching `predicate` who are still muted at `now`.
    ///
    /// Expired entries the sweep has not reached yet are skipped.
    pub fn count_muted_where<F>(&self, now: Timestamp, predicate: F) -> usize
    where
        F: Fn(&A) -> bool,
    {
        self.entries
            .iter()
            .filter(|entry| now < entry.until && predicate(entry.key()))
            .count()
    }
}

impl<A> Default for MuteRegistry<A>
where
    A: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
