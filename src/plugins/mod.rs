//! Command handlers.

pub mod floodguard;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::bot::ThrottledBot;

/// All bot commands.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Show this help")]
    Help,

    #[command(description = "Show flood guard settings")]
    Floodstatus,

    #[command(description = "Reload flood guard settings")]
    Reloadflood,
}

/// Build the combined command handler.
pub fn command_handler() -> UpdateHandler<anyhow::Error> {
    use dptree::case;

    teloxide::filter_command::<Command, _>()
        .branch(case![Command::Help].endpoint(handle_help))
        .branch(case![Command::Floodstatus].endpoint(floodguard::floodstatus_command))
        .branch(case![Command::Reloadflood].endpoint(floodguard::reloadflood_command))
}

async fn handle_help(bot: ThrottledBot, msg: Message) -> anyhow::Result<()> {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}
