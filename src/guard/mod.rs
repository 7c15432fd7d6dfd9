//! Flood guard core.
//!
//! A chat attempt is checked against [`MuteRegistry`] first, then counted
//! by [`FloodTracker`]; a violation writes a new mute. A periodic tick
//! sweeps expired mutes and a login reconciles an existing silence effect.
//!
//! Nothing here reads a clock. Every operation takes `now` in Unix seconds,
//! and side effects go through the [`Host`] trait.

mod gate;
mod registry;
mod settings;
mod tracker;

pub use gate::{ChannelKind, ChatAttempt, FloodGuard, Host, Notice, Verdict};
pub use registry::MuteRegistry;
pub use settings::FloodSettings;
pub use tracker::{Decision, FloodTracker};

/// Whole seconds since the Unix epoch.
pub type Timestamp = i64;
