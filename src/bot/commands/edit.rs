use crate::bot::handlers::{HandlerResult, WizardDialogue};
use crate::bot::keyboards;
use crate::config::Config;
use crate::database::connection::DatabaseManager;
use crate::database::models::{NewButtonItem, Post, PostButton, PostStatus};
use crate::services::publishing;
use crate::utils::buttons::parse_button_lines;
use crate::utils::feedback::CommandFeedback;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{error, info};

/// Only the author or a configured admin may touch a post.
pub fn may_edit(post: &Post, user_id: i64, config: &Config) -> bool {
    post.author_id == user_id || config.is_admin(user_id)
}

/// `/edit <id>` — show the edit menu for a post.
pub async fn handle_edit_command(
    bot: Bot,
    msg: Message,
    post_id: i64,
    db: Arc<DatabaseManager>,
    config: Arc<Config>,
) -> HandlerResult {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let user_id = user.id.0 as i64;

    let post = match Post::find_by_id(&db.pool, post_id).await {
        Ok(Some(post)) => post,
        Ok(None) => {
            CommandFeedback::new(bot, msg.chat.id)
                .error(&format!("Пост #{post_id} не найден"))
                .await?;
            return Ok(());
        }
        Err(e) => {
            error!("Failed to load post {}: {}", post_id, e);
            CommandFeedback::new(bot, msg.chat.id)
                .error("Не удалось загрузить пост")
                .await?;
            return Ok(());
        }
    };

    if !may_edit(&post, user_id, &config) {
        bot.send_message(msg.chat.id, "⛔ Вы не можете редактировать этот пост.")
            .await?;
        return Ok(());
    }

    let note = if post.status() == PostStatus::Published {
        "\n\nПост уже опубликован: изменения текста и кнопок будут отправлены в канал."
    } else {
        ""
    };

    bot.send_message(
        msg.chat.id,
        format!(
            "✏️ <b>Редактирование поста #{}</b>\n\nСтатус: {} {}{}\n\nЧто изменить?",
            post.id,
            post.status().emoji(),
            post.status().title_ru(),
            note
        ),
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(keyboards::edit_menu_keyboard(post.id))
    .await?;
    Ok(())
}

/// `EditingText` state: the next text message replaces the post's text.
pub async fn receive_new_text(
    bot: Bot,
    msg: Message,
    dialogue: WizardDialogue,
    post_id: i64,
    db: Arc<DatabaseManager>,
    config: Arc<Config>,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, "Отправьте новый текст поста или /cancel.")
            .await?;
        return Ok(());
    };
    let entities = msg.entities().map(<[_]>::to_vec).unwrap_or_default();

    if let Err(e) = Post::update_text(&db.pool, post_id, Some(text), &entities).await {
        error!("Failed to update text of post {}: {}", post_id, e);
        bot.send_message(msg.chat.id, e.user_message()).await?;
        dialogue.exit().await?;
        return Ok(());
    }

    let pushed_note = push_to_channel_if_published(&bot, &db, &config, post_id, PushKind::Text).await;

    bot.send_message(
        msg.chat.id,
        format!("✅ Текст поста #{post_id} обновлён.{pushed_note}"),
    )
    .await?;
    info!(
        "User {} updated text of post {}",
        msg.from().map(|u| u.id.0).unwrap_or_default(),
        post_id
    );
    dialogue.exit().await?;
    Ok(())
}

/// `EditingButtons` state: the next text message replaces the whole button
/// set, one keyboard row per line.
pub async fn receive_new_buttons(
    bot: Bot,
    msg: Message,
    dialogue: WizardDialogue,
    post_id: i64,
    db: Arc<DatabaseManager>,
    config: Arc<Config>,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        bot.send_message(
            msg.chat.id,
            "Отправьте кнопки в формате <code>Текст - https://example.com</code> или /cancel.",
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(());
    };

    let parsed = parse_button_lines(text);
    if parsed.is_empty() {
        bot.send_message(
            msg.chat.id,
            "❌ Не удалось распознать ни одной кнопки.\n\n\
             Используйте формат: <code>Текст - https://example.com</code>\n\
             (каждая кнопка с новой строки)",
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(());
    }

    let items: Vec<NewButtonItem> = parsed
        .into_iter()
        .enumerate()
        .map(|(row, button)| NewButtonItem {
            label: button.label,
            url: button.url,
            row: row as i64,
            position: 0,
        })
        .collect();

    if let Err(e) = PostButton::replace_for_post(&db.pool, post_id, &items).await {
        error!("Failed to replace buttons of post {}: {}", post_id, e);
        CommandFeedback::new(bot, msg.chat.id)
            .error("Не удалось сохранить кнопки")
            .await?;
        dialogue.exit().await?;
        return Ok(());
    }

    let pushed_note =
        push_to_channel_if_published(&bot, &db, &config, post_id, PushKind::Keyboard).await;

    bot.send_message(
        msg.chat.id,
        format!(
            "✅ Кнопки поста #{post_id} обновлены ({} шт.).{pushed_note}",
            items.len()
        ),
    )
    .await?;
    dialogue.exit().await?;
    Ok(())
}

enum PushKind {
    Text,
    Keyboard,
}

/// For published posts, edits are also pushed to the channel message.
/// Returns a note to append to the confirmation reply.
async fn push_to_channel_if_published(
    bot: &Bot,
    db: &DatabaseManager,
    config: &Config,
    post_id: i64,
    kind: PushKind,
) -> &'static str {
    let graph = match Post::load_graph(&db.pool, post_id).await {
        Ok(Some(graph)) => graph,
        _ => return "",
    };
    if graph.post.status() != PostStatus::Published {
        return "";
    }

    let result = match kind {
        PushKind::Text => publishing::edit_published_text(bot, config, &graph).await,
        PushKind::Keyboard => publishing::edit_published_keyboard(bot, config, &graph).await,
    };

    match result {
        Ok(()) => {
            // Idempotent re-save of the published status keeps updated_at fresh
            if let Err(e) = Post::mark_published(
                &db.pool,
                post_id,
                graph.post.published_message_id.unwrap_or_default(),
                graph
                    .post
                    .published_at
                    .as_deref()
                    .and_then(|raw| chrono::DateTime::parse_from_rfc3339(raw).ok())
                    .map(|dt| dt.with_timezone(&chrono::Utc))
                    .unwrap_or_else(chrono::Utc::now),
            )
            .await
            {
                error!("Failed to re-save published post {}: {}", post_id, e);
            }
            " Изменения отправлены в канал."
        }
        Err(_) => " ⚠️ Не удалось обновить сообщение в канале.",
    }
}
