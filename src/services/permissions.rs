use crate::config::Config;
use teloxide::prelude::*;
use teloxide::types::Chat;
use tracing::error;

/// Check that the bot is an administrator of the target channel with the
/// rights it needs to publish and edit posts.
///
/// Returns `(has_permissions, user-facing problem description)`.
pub async fn check_bot_channel_permissions(bot: &Bot, config: &Config) -> (bool, Option<String>) {
    let me = match bot.get_me().await {
        Ok(me) => me,
        Err(e) => {
            error!("Failed to fetch bot identity: {}", e);
            return (false, Some(format!("❌ Ошибка проверки прав: {e}")));
        }
    };

    let member = match bot
        .get_chat_member(config.channel.clone(), me.user.id)
        .await
    {
        Ok(member) => member,
        Err(e) => {
            error!("Failed to check bot permissions: {}", e);
            return (false, Some(format!("❌ Ошибка проверки прав: {e}")));
        }
    };

    if member.kind.is_owner() {
        return (true, None);
    }
    if !member.kind.is_administrator() {
        return (
            false,
            Some("❌ Бот не является администратором канала.".to_string()),
        );
    }
    if !member.kind.can_post_messages() {
        return (
            false,
            Some("❌ У бота нет права публиковать сообщения.".to_string()),
        );
    }
    if !member.kind.can_edit_messages() {
        return (
            false,
            Some("⚠️ У бота нет права редактировать сообщения.".to_string()),
        );
    }

    (true, None)
}

/// Fetch the target channel's chat object.
pub async fn get_channel_info(bot: &Bot, config: &Config) -> Result<Chat, teloxide::RequestError> {
    bot.get_chat(config.channel.clone()).await
}
