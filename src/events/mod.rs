//! Event handlers feeding the flood guard.
//!
//! - `chat` - every group message goes through the gate before commands
//! - `join` - member joins reconcile an existing restriction

pub mod chat;
pub mod join;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

/// Build the handler for chat member updates.
pub fn event_handler() -> UpdateHandler<anyhow::Error> {
    join::handler()
}

/// Gate group messages. Blocked ones are deleted and go no further.
pub fn flood_gate_handler() -> UpdateHandler<anyhow::Error> {
    dptree::filter(|msg: Message| chat::is_gated_message(&msg))
        .filter_async(chat::gate_blocks)
        .endpoint(chat::delete_blocked)
}

/// Build the message event handler for group messages that passed.
pub fn message_event_handler() -> UpdateHandler<anyhow::Error> {
    dptree::filter(|msg: Message| msg.chat.is_group() || msg.chat.is_supergroup())
        .endpoint(chat::delivered)
}
