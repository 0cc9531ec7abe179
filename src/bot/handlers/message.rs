use crate::bot::commands::{edit, info, posts, Command};
use crate::bot::handlers::{wizard, HandlerResult, WizardDialogue};
use crate::config::Config;
use crate::database::connection::DatabaseManager;
use std::sync::Arc;
use teloxide::prelude::*;

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    dialogue: WizardDialogue,
    config: Arc<Config>,
    db: Arc<DatabaseManager>,
) -> HandlerResult {
    match cmd {
        Command::Start => info::handle_start(bot, msg, &config).await?,
        Command::Help => info::handle_help(bot, msg, &config).await?,
        Command::New => wizard::start(bot, dialogue, msg).await?,
        Command::Cancel => wizard::cancel(bot, dialogue, msg).await?,
        Command::Posts => posts::handle_list(bot, msg, &db, posts::StatusFilter::All).await?,
        Command::Drafts => posts::handle_list(bot, msg, &db, posts::StatusFilter::Draft).await?,
        Command::Scheduled => {
            posts::handle_list(bot, msg, &db, posts::StatusFilter::Scheduled).await?
        }
        Command::AllPosts => posts::handle_all_posts(bot, msg, &db, &config).await?,
        Command::Edit { id } => edit::handle_edit_command(bot, msg, id, db, config).await?,
        Command::Whoami => info::handle_whoami(bot, msg, &config).await?,
        Command::ChannelInfo => info::handle_channel_info(bot, msg, &config).await?,
    }
    Ok(())
}

/// Messages outside any flow and of no recognized shape are dropped.
pub async fn ignore_message() -> HandlerResult {
    Ok(())
}
