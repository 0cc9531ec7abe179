use crate::bot::commands::edit::may_edit;
use crate::bot::commands::posts::{self, StatusFilter};
use crate::bot::handlers::{wizard, HandlerResult, WizardDialogue, WizardState};
use crate::bot::keyboards;
use crate::config::Config;
use crate::database::connection::DatabaseManager;
use crate::database::models::{Post, PostStatus};
use crate::services::preview;
use crate::services::publishing;
use crate::services::scheduler::{self, PostScheduler};
use crate::utils::datetime;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{error, info};

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    config: Arc<Config>,
    db: Arc<DatabaseManager>,
    scheduler: Arc<PostScheduler>,
) -> HandlerResult {
    let Some(data) = q.data.clone() else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    info!(
        "Callback received: '{}' from user {} ({:?})",
        data, q.from.id.0, q.from.username
    );

    if data.starts_with("wizard_") {
        return wizard::handle_wizard_callback(bot, q, dialogue, data, config, db, scheduler).await;
    }

    let Some(message) = q.message.clone() else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };
    let chat_id = message.chat.id;
    let user_id = q.from.id.0 as i64;

    if data == "posts_noop" {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    }

    if data == "posts_back" {
        let reply = list_page(&db, Some(user_id), StatusFilter::All, "all", 0, false).await;
        edit_list_message(&bot, chat_id, message.id, reply).await?;
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    }

    if let Some(rest) = data.strip_prefix("posts_page_") {
        let Some((page_raw, filter_tag)) = rest.split_once('_') else {
            bot.answer_callback_query(q.id).text("Некорректные данные").await?;
            return Ok(());
        };
        let page: usize = page_raw.parse().unwrap_or(0);
        let (filter, is_admin_view) = parse_filter_tag(filter_tag);
        let author = if is_admin_view { None } else { Some(user_id) };
        let reply = list_page(&db, author, filter, filter_tag, page, is_admin_view).await;
        edit_list_message(&bot, chat_id, message.id, reply).await?;
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    }

    if let Some(filter_tag) = data.strip_prefix("posts_filter_") {
        let (filter, _) = parse_filter_tag(filter_tag);
        let reply = list_page(&db, Some(user_id), filter, filter_tag, 0, false).await;
        edit_list_message(&bot, chat_id, message.id, reply).await?;
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    }

    if let Some(post_id) = parse_id(&data, "post_view_") {
        match Post::load_graph(&db.pool, post_id).await {
            Ok(Some(graph)) => {
                let (text, keyboard) =
                    posts::render_post_detail(&graph, Utc::now(), config.timezone);
                bot.edit_message_text(chat_id, message.id, text)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(keyboard)
                    .await?;
                bot.answer_callback_query(q.id).await?;
            }
            Ok(None) => {
                bot.answer_callback_query(q.id)
                    .text("Пост не найден")
                    .show_alert(true)
                    .await?;
            }
            Err(e) => {
                error!("Failed to load post {}: {}", post_id, e);
                bot.answer_callback_query(q.id).text("Ошибка").await?;
            }
        }
        return Ok(());
    }

    if let Some(post_id) = parse_id(&data, "post_preview_") {
        bot.answer_callback_query(q.id).await?;
        match Post::load_graph(&db.pool, post_id).await {
            Ok(Some(graph)) => {
                let content = publishing::PostContent::from_graph(&graph);
                if let Err(e) = preview::send_preview(&bot, chat_id, &content, None).await {
                    bot.send_message(chat_id, e.user_message())
                        .parse_mode(ParseMode::Html)
                        .await?;
                }
            }
            Ok(None) => {
                bot.send_message(chat_id, "❌ Пост не найден.").await?;
            }
            Err(e) => {
                error!("Failed to load post {} for preview: {}", post_id, e);
            }
        }
        return Ok(());
    }

    if let Some(post_id) = parse_id(&data, "post_publish_") {
        if !check_may_edit(&bot, &q.id, &db, post_id, user_id, &config).await? {
            return Ok(());
        }
        bot.answer_callback_query(q.id).text("⏳ Публикую...").await?;
        let reply = publish_existing_post(&bot, &db, &config, &scheduler, post_id).await;
        bot.edit_message_text(chat_id, message.id, reply)
            .parse_mode(ParseMode::Html)
            .await?;
        return Ok(());
    }

    if let Some(post_id) = parse_id(&data, "post_unschedule_") {
        if !check_may_edit(&bot, &q.id, &db, post_id, user_id, &config).await? {
            return Ok(());
        }
        match Post::unschedule(&db.pool, post_id).await {
            Err(e) => {
                bot.answer_callback_query(q.id)
                    .text(e.user_message())
                    .show_alert(true)
                    .await?;
            }
            Ok(_) => {
                // Store first, then the timer: a fire that slips through
                // sees a non-scheduled post and does nothing
                scheduler.cancel_post(post_id).await;
                bot.edit_message_text(
                    chat_id,
                    message.id,
                    format!(
                        "✅ Публикация поста #{post_id} отменена.\nПост сохранён как черновик."
                    ),
                )
                .await?;
                bot.answer_callback_query(q.id).text("Отменено").await?;
                info!("User {} unscheduled post {}", user_id, post_id);
            }
        }
        return Ok(());
    }

    if let Some(post_id) = parse_id(&data, "post_delete_") {
        if !check_may_edit(&bot, &q.id, &db, post_id, user_id, &config).await? {
            return Ok(());
        }
        let post = match Post::find_by_id(&db.pool, post_id).await {
            Ok(Some(post)) => post,
            _ => {
                bot.answer_callback_query(q.id)
                    .text("Пост не найден")
                    .show_alert(true)
                    .await?;
                return Ok(());
            }
        };
        if post.status() == PostStatus::Published {
            bot.answer_callback_query(q.id)
                .text("Нельзя удалить опубликованный пост")
                .show_alert(true)
                .await?;
            return Ok(());
        }
        let was_scheduled = post.status() == PostStatus::Scheduled;
        match Post::delete(&db.pool, post_id).await {
            Ok(true) => {
                if was_scheduled {
                    scheduler.cancel_post(post_id).await;
                }
                bot.edit_message_text(chat_id, message.id, format!("🗑 Пост #{post_id} удалён."))
                    .await?;
                bot.answer_callback_query(q.id).text("Удалено").await?;
                info!("User {} deleted post {}", user_id, post_id);
            }
            Ok(false) => {
                bot.answer_callback_query(q.id)
                    .text("Пост не найден")
                    .show_alert(true)
                    .await?;
            }
            Err(e) => {
                error!("Failed to delete post {}: {}", post_id, e);
                bot.answer_callback_query(q.id).text("Ошибка").await?;
            }
        }
        return Ok(());
    }

    if let Some(post_id) = parse_id(&data, "post_retry_") {
        if !check_may_edit(&bot, &q.id, &db, post_id, user_id, &config).await? {
            return Ok(());
        }
        match Post::retry_as_draft(&db.pool, post_id).await {
            Err(e) => {
                bot.answer_callback_query(q.id)
                    .text(e.user_message())
                    .show_alert(true)
                    .await?;
            }
            Ok(_) => {
                if let Ok(Some(graph)) = Post::load_graph(&db.pool, post_id).await {
                    let (text, keyboard) =
                        posts::render_post_detail(&graph, Utc::now(), config.timezone);
                    bot.edit_message_text(chat_id, message.id, text)
                        .parse_mode(ParseMode::Html)
                        .reply_markup(keyboard)
                        .await?;
                }
                bot.answer_callback_query(q.id).text("Возвращён в черновики").await?;
            }
        }
        return Ok(());
    }

    if let Some(post_id) = parse_id(&data, "post_schedule_") {
        if !check_may_edit(&bot, &q.id, &db, post_id, user_id, &config).await? {
            return Ok(());
        }
        dialogue
            .update(WizardState::SchedulingPost { post_id })
            .await?;
        bot.edit_message_text(
            chat_id,
            message.id,
            format!("⏰ <b>Планирование поста #{post_id}</b>\n\nКогда опубликовать?\n\n\
                     • <code>15:30</code> — сегодня в 15:30\n\
                     • <code>завтра 15:30</code>\n\
                     • <code>25.01 15:30</code> — конкретная дата\n\
                     • <code>сейчас</code> — опубликовать немедленно"),
        )
        .parse_mode(ParseMode::Html)
        .await?;
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    }

    if let Some(post_id) = parse_id(&data, "post_edit_") {
        if !check_may_edit(&bot, &q.id, &db, post_id, user_id, &config).await? {
            return Ok(());
        }
        bot.edit_message_text(
            chat_id,
            message.id,
            format!("✏️ <b>Редактирование поста #{post_id}</b>\n\nЧто изменить?"),
        )
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::edit_menu_keyboard(post_id))
        .await?;
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    }

    if let Some(post_id) = parse_id(&data, "edit_text_") {
        if !check_may_edit(&bot, &q.id, &db, post_id, user_id, &config).await? {
            return Ok(());
        }
        dialogue
            .update(WizardState::EditingText { post_id })
            .await?;
        bot.send_message(
            chat_id,
            format!("📝 Отправьте новый текст поста #{post_id}.\nДля отмены используйте /cancel"),
        )
        .await?;
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    }

    if let Some(post_id) = parse_id(&data, "edit_buttons_") {
        if !check_may_edit(&bot, &q.id, &db, post_id, user_id, &config).await? {
            return Ok(());
        }
        dialogue
            .update(WizardState::EditingButtons { post_id })
            .await?;
        bot.send_message(
            chat_id,
            format!(
                "🔘 Отправьте новый набор кнопок для поста #{post_id} в формате:\n\
                 <code>Текст - https://example.com</code>\n\
                 (каждая кнопка с новой строки, старые кнопки будут заменены)\n\n\
                 Для отмены используйте /cancel"
            ),
        )
        .parse_mode(ParseMode::Html)
        .await?;
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    }

    bot.answer_callback_query(q.id)
        .text("Некорректные данные")
        .await?;
    Ok(())
}

/// Publish a stored post right now, cancelling its pending timer first if
/// it was scheduled. Returns the user-facing HTML reply.
pub async fn publish_existing_post(
    bot: &Bot,
    db: &DatabaseManager,
    config: &Config,
    scheduler: &PostScheduler,
    post_id: i64,
) -> String {
    let post = match Post::find_by_id(&db.pool, post_id).await {
        Ok(Some(post)) => post,
        Ok(None) => return "❌ Пост не найден.".to_string(),
        Err(e) => {
            error!("Failed to load post {}: {}", post_id, e);
            return "❌ Произошла ошибка. Попробуйте позже.".to_string();
        }
    };

    match post.status() {
        PostStatus::Published => return "⚠️ Пост уже опубликован.".to_string(),
        PostStatus::Failed => {
            return "⚠️ Сначала верните пост в черновики (🔁), затем публикуйте.".to_string()
        }
        PostStatus::Scheduled => {
            // Store transition first, then the timer
            if let Err(e) = Post::unschedule(&db.pool, post_id).await {
                return e.user_message();
            }
            scheduler.cancel_post(post_id).await;
        }
        PostStatus::Draft => {}
    }

    let graph = match Post::load_graph(&db.pool, post_id).await {
        Ok(Some(graph)) => graph,
        _ => return "❌ Пост не найден.".to_string(),
    };

    match publishing::publish_post(bot, config, &graph).await {
        Ok(message_id) => {
            match Post::mark_published(&db.pool, post_id, i64::from(message_id.0), Utc::now()).await
            {
                Ok(_) => format!(
                    "✅ <b>Пост #{post_id} опубликован!</b>\n\nID сообщения: <code>{}</code>",
                    message_id.0
                ),
                Err(e) => {
                    error!("Failed to mark post {} as published: {}", post_id, e);
                    e.user_message()
                }
            }
        }
        Err(_) => {
            if let Err(e) = Post::mark_failed(&db.pool, post_id).await {
                error!("Failed to mark post {} as failed: {}", post_id, e);
            }
            format!(
                "❌ <b>Ошибка публикации поста #{post_id}</b>\n\n\
                 Проверьте, что бот является администратором канала."
            )
        }
    }
}

/// Schedule a stored draft: store transition first, then the timer. If the
/// timer registration fails the store transition is reverted so the post
/// never claims "scheduled" without a live timer.
pub async fn schedule_existing_post(
    db: &DatabaseManager,
    config: &Config,
    scheduler: &PostScheduler,
    post_id: i64,
    at: DateTime<Utc>,
) -> String {
    let job_id = scheduler::job_id(post_id);
    if let Err(e) = Post::mark_scheduled(&db.pool, post_id, at, &job_id).await {
        return e.user_message();
    }

    match scheduler.schedule_post(post_id, at).await {
        Ok(_) => format!(
            "⏰ Пост #{post_id} запланирован на {}.",
            datetime::format_datetime(at, Utc::now(), config.timezone)
        ),
        Err(e) => {
            error!("Failed to register timer for post {}: {}", post_id, e);
            if let Err(revert) = Post::unschedule(&db.pool, post_id).await {
                error!(
                    "Failed to revert schedule of post {} after timer error: {}",
                    post_id, revert
                );
            }
            e.user_message()
        }
    }
}

fn parse_id(data: &str, prefix: &str) -> Option<i64> {
    data.strip_prefix(prefix)?.parse().ok()
}

/// `admin_` filter tags mark the admin-wide listing.
fn parse_filter_tag(tag: &str) -> (StatusFilter, bool) {
    let (raw, is_admin_view) = match tag.strip_prefix("admin_") {
        Some(rest) => (rest, true),
        None => (tag, false),
    };
    (
        StatusFilter::parse(raw).unwrap_or(StatusFilter::All),
        is_admin_view,
    )
}

async fn list_page(
    db: &DatabaseManager,
    author_id: Option<i64>,
    filter: StatusFilter,
    filter_tag: &str,
    page: usize,
    is_admin_view: bool,
) -> Result<(String, Option<teloxide::types::InlineKeyboardMarkup>), String> {
    match posts::fetch_posts(db, author_id, filter).await {
        Err(e) => {
            error!("Failed to fetch posts for listing: {}", e);
            Err("❌ Не удалось загрузить список постов.".to_string())
        }
        Ok(posts_list) if posts_list.is_empty() => {
            Ok((posts::empty_list_text(filter, is_admin_view), None))
        }
        Ok(posts_list) => {
            let (text, keyboard) =
                posts::render_list(&posts_list, page, filter, filter_tag, is_admin_view);
            Ok((text, Some(keyboard)))
        }
    }
}

async fn edit_list_message(
    bot: &Bot,
    chat_id: ChatId,
    message_id: teloxide::types::MessageId,
    reply: Result<(String, Option<teloxide::types::InlineKeyboardMarkup>), String>,
) -> HandlerResult {
    match reply {
        Err(text) | Ok((text, None)) => {
            bot.edit_message_text(chat_id, message_id, text)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Ok((text, Some(keyboard))) => {
            bot.edit_message_text(chat_id, message_id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard)
                .await?;
        }
    }
    Ok(())
}

/// Permission gate for post actions: author or configured admin.
async fn check_may_edit(
    bot: &Bot,
    callback_id: &str,
    db: &DatabaseManager,
    post_id: i64,
    user_id: i64,
    config: &Config,
) -> Result<bool, teloxide::RequestError> {
    let post = match Post::find_by_id(&db.pool, post_id).await {
        Ok(Some(post)) => post,
        _ => {
            bot.answer_callback_query(callback_id.to_string())
                .text("Пост не найден")
                .show_alert(true)
                .await?;
            return Ok(false);
        }
    };
    if !may_edit(&post, user_id, config) {
        bot.answer_callback_query(callback_id.to_string())
            .text("⛔ Это не ваш пост")
            .show_alert(true)
            .await?;
        return Ok(false);
    }
    Ok(true)
}
