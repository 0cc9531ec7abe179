use crate::config::Config;
use crate::services::permissions;
use crate::utils::html::escape_html;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::info;

pub async fn handle_start(bot: Bot, msg: Message, config: &Config) -> ResponseResult<()> {
    let user_id = msg.from().map(|u| u.id.0 as i64).unwrap_or(0);
    info!("User {} started the bot", user_id);

    let admin_commands = if config.is_admin(user_id) {
        "\n\n👑 <b>Админ-команды:</b>\n/allposts — посты всех пользователей"
    } else {
        ""
    };

    bot.send_message(
        msg.chat.id,
        format!(
            "👋 <b>Привет!</b>\n\n\
             Я бот для создания и планирования публикаций в канал.\n\n\
             📝 <b>Команды:</b>\n\
             /new — создать новый пост\n\
             /posts — все мои посты\n\
             /drafts — черновики\n\
             /scheduled — запланированные посты\n\
             /edit &lt;ID&gt; — редактировать пост\n\
             /whoami — информация о вас\n\
             /channelinfo — информация о канале\n\
             /help — справка\n\
             /cancel — отмена текущего действия{admin_commands}"
        ),
    )
    .parse_mode(ParseMode::Html)
    .await?;
    Ok(())
}

pub async fn handle_help(bot: Bot, msg: Message, config: &Config) -> ResponseResult<()> {
    let user_id = msg.from().map(|u| u.id.0 as i64).unwrap_or(0);

    let admin_help = if config.is_admin(user_id) {
        "\n\n👑 <b>Админ-команды:</b>\n\
         /allposts — посты всех пользователей\n\
         Можно редактировать чужие посты через /edit &lt;ID&gt;"
    } else {
        ""
    };

    bot.send_message(
        msg.chat.id,
        format!(
            "📚 <b>Справка</b>\n\n\
             <b>Создание поста:</b>\n\
             1. Отправьте /new для создания нового поста\n\
             2. Отправьте текст или фото с подписью\n\
             3. Добавьте ещё медиа для альбома (опционально)\n\
             4. Добавьте кнопки со ссылками\n\
             5. Выберите время публикации или опубликуйте сразу\n\n\
             <b>Управление постами:</b>\n\
             /posts — все ваши посты\n\
             /drafts — только черновики\n\
             /scheduled — запланированные посты\n\
             /edit &lt;ID&gt; — редактировать пост\n\n\
             <b>Формат времени:</b>\n\
             • <code>сейчас</code> — немедленно\n\
             • <code>15:30</code> — сегодня в 15:30\n\
             • <code>завтра 15:30</code> — завтра в 15:30\n\
             • <code>25.01 15:30</code> — конкретная дата{admin_help}"
        ),
    )
    .parse_mode(ParseMode::Html)
    .await?;
    Ok(())
}

pub async fn handle_whoami(bot: Bot, msg: Message, config: &Config) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };

    let username = user
        .username
        .as_deref()
        .map(|u| format!("@{}", escape_html(u)))
        .unwrap_or_else(|| "<i>не задан</i>".to_string());
    let channel = match &config.channel {
        teloxide::types::Recipient::Id(id) => id.0.to_string(),
        teloxide::types::Recipient::ChannelUsername(name) => name.clone(),
    };

    bot.send_message(
        msg.chat.id,
        format!(
            "👤 <b>Информация о вас</b>\n\n\
             <b>User ID:</b> <code>{}</code>\n\
             <b>Username:</b> {}\n\
             <b>Полное имя:</b> {}\n\n\
             ⚙️ <b>Настройки бота</b>\n\n\
             <b>Timezone:</b> <code>{}</code>\n\
             <b>Channel:</b> <code>{}</code>",
            user.id.0,
            username,
            escape_html(&user.full_name()),
            config.timezone,
            escape_html(&channel),
        ),
    )
    .parse_mode(ParseMode::Html)
    .await?;
    info!("User {} requested /whoami", user.id.0);
    Ok(())
}

pub async fn handle_channel_info(bot: Bot, msg: Message, config: &Config) -> ResponseResult<()> {
    let chat = match permissions::get_channel_info(&bot, config).await {
        Ok(chat) => chat,
        Err(e) => {
            bot.send_message(
                msg.chat.id,
                format!(
                    "❌ <b>Ошибка получения информации о канале</b>\n\n\
                     <b>Ошибка:</b> {}\n\n\
                     💡 <b>Возможные причины:</b>\n\
                     • Неверный CHANNEL_ID в конфиге\n\
                     • Бот не добавлен в канал\n\
                     • Канал не существует",
                    escape_html(&e.to_string())
                ),
            )
            .parse_mode(ParseMode::Html)
            .await?;
            return Ok(());
        }
    };

    let username = chat
        .username()
        .map(|u| format!("@{}", escape_html(u)))
        .unwrap_or_else(|| "<i>приватный</i>".to_string());
    let title = chat.title().unwrap_or("—");

    let (has_permissions, problem) = permissions::check_bot_channel_permissions(&bot, config).await;
    let status_line = if has_permissions {
        "🤖 <b>Статус бота:</b> ✅ Права публикации и редактирования есть".to_string()
    } else {
        format!(
            "🤖 <b>Статус бота:</b> ⚠️ Проблема с правами\n\n{}",
            problem.unwrap_or_else(|| "❌ Неизвестная ошибка".to_string())
        )
    };

    bot.send_message(
        msg.chat.id,
        format!(
            "📢 <b>Информация о канале</b>\n\n\
             <b>Title:</b> {}\n\
             <b>Username:</b> {}\n\
             <b>Chat ID:</b> <code>{}</code>\n\n\
             {}",
            escape_html(title),
            username,
            chat.id.0,
            status_line,
        ),
    )
    .parse_mode(ParseMode::Html)
    .await?;
    Ok(())
}
