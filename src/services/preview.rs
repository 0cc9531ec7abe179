use crate::services::publishing::{build_send_plan, execute_send_plan, PostContent};
use crate::utils::errors::BotError;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, Recipient};
use tracing::error;

/// Send a post preview to the author's own chat.
///
/// The preview goes through the same plan builder and executor as real
/// publication — only the destination differs — so what the author sees is
/// exactly what the channel will get.
pub async fn send_preview(
    bot: &Bot,
    chat_id: ChatId,
    content: &PostContent,
    prefix: Option<&str>,
) -> Result<(), BotError> {
    if let Some(prefix) = prefix {
        bot.send_message(chat_id, prefix)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(BotError::Publish)?;
    }

    let plan = build_send_plan(content)?;
    execute_send_plan(bot, Recipient::Id(chat_id), &plan)
        .await
        .map_err(|e| {
            error!("Failed to send preview to {}: {}", chat_id, e);
            BotError::Publish(e)
        })?;

    Ok(())
}
