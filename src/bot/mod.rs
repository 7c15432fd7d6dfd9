//! Bot module - Telegram host for the flood guard.

pub mod dispatcher;
pub mod host;
mod runtime;
mod webhook;

pub use dispatcher::{AppState, ThrottledBot, build_dispatcher};
pub use host::{Member, MemberGuard, TelegramHost, run_effects};
pub use runtime::{run, spawn_reload_listener, spawn_sweeper};
