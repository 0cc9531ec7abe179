use crate::bot::handlers::{callback, HandlerResult};
use crate::bot::keyboards;
use crate::bot::wizard_draft::{ScheduleChoice, WizardDraft, MEDIA_CAP};
use crate::config::Config;
use crate::database::connection::DatabaseManager;
use crate::database::models::{NewMediaItem, NewPost, Post};
use crate::services::media_group::{MediaGroupManager, Observed};
use crate::services::preview;
use crate::services::scheduler::PostScheduler;
use crate::utils::datetime;
use crate::utils::errors::BotError;
use chrono::Utc;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, User};
use tracing::{info, warn};

/// One composition flow per author. `/new` resets any in-progress flow;
/// cancel is accepted from every state and persists nothing.
#[derive(Debug, Clone, Default)]
pub enum WizardState {
    #[default]
    Idle,
    /// Waiting for the first content: text or a media attachment.
    AwaitingContent,
    /// Collecting additional photos/videos for an album.
    AwaitingMoreMedia { draft: WizardDraft },
    /// Collecting `label - url` button lines.
    AwaitingButtons { draft: WizardDraft },
    /// Waiting for the publication time.
    AwaitingSchedule { draft: WizardDraft },
    /// Waiting for publish-now / save / cancel.
    Confirmation { draft: WizardDraft },
    /// Scheduling an already-saved draft outside the wizard.
    SchedulingPost { post_id: i64 },
    /// Editing the text of an existing post.
    EditingText { post_id: i64 },
    /// Replacing the button set of an existing post.
    EditingButtons { post_id: i64 },
}

pub type WizardDialogue = Dialogue<WizardState, InMemStorage<WizardState>>;

const SCHEDULE_PROMPT: &str = "⏰ <b>Когда опубликовать?</b>\n\n\
     • <code>сейчас</code> — немедленно\n\
     • <code>15:30</code> — сегодня в 15:30\n\
     • <code>завтра 15:30</code>\n\
     • <code>25.01 15:30</code> — конкретная дата";

/// `/new` — start a fresh flow, dropping any previous in-progress state.
pub async fn start(bot: Bot, dialogue: WizardDialogue, msg: Message) -> HandlerResult {
    let user_id = msg.from().map(|u| u.id.0).unwrap_or_default();
    info!("User {} started new post creation", user_id);

    dialogue.update(WizardState::AwaitingContent).await?;
    bot.send_message(
        msg.chat.id,
        "📝 <b>Создание нового поста</b>\n\n\
         Отправьте текст поста или медиафайл.\n\
         Для отмены используйте /cancel",
    )
    .parse_mode(ParseMode::Html)
    .await?;
    Ok(())
}

/// `/cancel` — abort from any state, nothing is persisted.
pub async fn cancel(bot: Bot, dialogue: WizardDialogue, msg: Message) -> HandlerResult {
    let state = dialogue.get().await?.unwrap_or_default();
    if matches!(state, WizardState::Idle) {
        bot.send_message(msg.chat.id, "❌ Нет активного действия для отмены.")
            .await?;
        return Ok(());
    }

    dialogue.exit().await?;
    bot.send_message(msg.chat.id, "✅ Действие отменено.").await?;
    info!(
        "User {} cancelled the current flow",
        msg.from().map(|u| u.id.0).unwrap_or_default()
    );
    Ok(())
}

/// `AwaitingContent`: free text or the first media attachment. Other input
/// types are ignored without a transition.
pub async fn receive_content(
    bot: Bot,
    msg: Message,
    dialogue: WizardDialogue,
    media_groups: Arc<MediaGroupManager>,
) -> HandlerResult {
    if let Some(text) = msg.text() {
        let entities = msg.entities().map(<[_]>::to_vec).unwrap_or_default();
        let draft = WizardDraft::with_text(text.to_string(), entities);
        return advance_to_buttons(&bot, &dialogue, msg.chat.id, draft).await;
    }

    match media_groups.observe(&msg).await {
        Observed::NotMedia | Observed::Pending => Ok(()),
        Observed::Single(items) | Observed::Album(items) => {
            let caption_entities = msg.caption_entities().map(<[_]>::to_vec).unwrap_or_default();
            let draft = WizardDraft::with_media(items, caption_entities);

            if draft.can_extend_album() {
                send_preview_best_effort(&bot, msg.chat.id, &draft).await;
                send_media_progress(&bot, msg.chat.id, &draft).await?;
                dialogue
                    .update(WizardState::AwaitingMoreMedia { draft })
                    .await?;
                Ok(())
            } else {
                // Documents, audio and animations don't form albums
                advance_to_buttons(&bot, &dialogue, msg.chat.id, draft).await
            }
        }
    }
}

/// `AwaitingMoreMedia`: additional photos/videos, appended in arrival
/// order up to the cap; "готово" moves on.
pub async fn receive_more_media(
    bot: Bot,
    msg: Message,
    dialogue: WizardDialogue,
    draft: WizardDraft,
    media_groups: Arc<MediaGroupManager>,
) -> HandlerResult {
    if let Some(text) = msg.text() {
        let trimmed = text.trim().to_lowercase();
        if trimmed == "готово" || trimmed == "done" {
            return advance_to_buttons(&bot, &dialogue, msg.chat.id, draft).await;
        }
        bot.send_message(
            msg.chat.id,
            "Отправьте ещё фото/видео или нажмите «Готово».",
        )
        .reply_markup(keyboards::done_keyboard())
        .await?;
        return Ok(());
    }

    match media_groups.observe(&msg).await {
        Observed::Pending => Ok(()),
        Observed::NotMedia => {
            bot.send_message(
                msg.chat.id,
                "Отправьте ещё фото/видео или нажмите «Готово».",
            )
            .reply_markup(keyboards::done_keyboard())
            .await?;
            Ok(())
        }
        Observed::Single(items) | Observed::Album(items) => {
            let groupable: Vec<NewMediaItem> = items
                .into_iter()
                .filter(|item| item.kind.supports_grouping())
                .collect();
            if groupable.is_empty() {
                bot.send_message(msg.chat.id, "В альбом можно добавить только фото и видео.")
                    .await?;
                return Ok(());
            }

            let mut draft = draft;
            let added = draft.add_media(groupable);

            if added.at_cap {
                bot.send_message(
                    msg.chat.id,
                    format!("Достигнут лимит {MEDIA_CAP} медиафайлов."),
                )
                .await?;
                return advance_to_buttons(&bot, &dialogue, msg.chat.id, draft).await;
            }

            send_preview_best_effort(&bot, msg.chat.id, &draft).await;
            send_media_progress(&bot, msg.chat.id, &draft).await?;
            dialogue
                .update(WizardState::AwaitingMoreMedia { draft })
                .await?;
            Ok(())
        }
    }
}

/// `AwaitingButtons`: each submission appends the valid `label - url`
/// lines, one keyboard row per line; "пропустить"/"готово" moves on.
pub async fn receive_buttons(
    bot: Bot,
    msg: Message,
    dialogue: WizardDialogue,
    draft: WizardDraft,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        bot.send_message(
            msg.chat.id,
            "Отправьте кнопки текстом или нажмите «Пропустить».",
        )
        .reply_markup(keyboards::skip_keyboard())
        .await?;
        return Ok(());
    };

    let trimmed = text.trim().to_lowercase();
    if matches!(trimmed.as_str(), "пропустить" | "готово" | "skip" | "done") {
        return advance_to_schedule(&bot, &dialogue, msg.chat.id, draft).await;
    }

    let mut draft = draft;
    match draft.add_button_lines(text) {
        Err(e) => {
            bot.send_message(msg.chat.id, e.user_message())
                .parse_mode(ParseMode::Html)
                .await?;
            Ok(())
        }
        Ok(added) => {
            send_preview_best_effort(&bot, msg.chat.id, &draft).await;
            bot.send_message(
                msg.chat.id,
                format!(
                    "✅ Добавлено кнопок: {added} (всего: {}).\n\
                     Отправьте ещё или нажмите «Готово».",
                    draft.buttons.len()
                ),
            )
            .reply_markup(keyboards::done_keyboard())
            .await?;
            dialogue
                .update(WizardState::AwaitingButtons { draft })
                .await?;
            Ok(())
        }
    }
}

/// `AwaitingSchedule`: free text goes to the datetime resolver; parse
/// failures keep the state and surface the hint.
pub async fn receive_schedule(
    bot: Bot,
    msg: Message,
    dialogue: WizardDialogue,
    draft: WizardDraft,
    config: Arc<Config>,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, SCHEDULE_PROMPT)
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboards::cancel_keyboard())
            .await?;
        return Ok(());
    };

    let choice = if datetime::is_immediate(text) {
        ScheduleChoice::Now
    } else {
        match datetime::resolve(text, Utc::now(), config.timezone) {
            Err(e) => {
                bot.send_message(msg.chat.id, e.user_hint())
                    .parse_mode(ParseMode::Html)
                    .await?;
                return Ok(());
            }
            Ok(at) => ScheduleChoice::At(at),
        }
    };

    let mut draft = draft;
    draft.schedule = Some(choice);
    show_confirmation(&bot, &dialogue, msg.chat.id, draft, &config).await
}

/// `SchedulingPost`: datetime input for an already-saved draft.
pub async fn receive_schedule_for_post(
    bot: Bot,
    msg: Message,
    dialogue: WizardDialogue,
    post_id: i64,
    db: Arc<DatabaseManager>,
    config: Arc<Config>,
    scheduler: Arc<PostScheduler>,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, SCHEDULE_PROMPT)
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboards::cancel_keyboard())
            .await?;
        return Ok(());
    };

    let reply = if datetime::is_immediate(text) {
        callback::publish_existing_post(&bot, &db, &config, &scheduler, post_id).await
    } else {
        match datetime::resolve(text, Utc::now(), config.timezone) {
            Err(e) => {
                bot.send_message(msg.chat.id, e.user_hint())
                    .parse_mode(ParseMode::Html)
                    .await?;
                return Ok(());
            }
            Ok(at) => callback::schedule_existing_post(&db, &config, &scheduler, post_id, at).await,
        }
    };

    bot.send_message(msg.chat.id, reply)
        .parse_mode(ParseMode::Html)
        .await?;
    dialogue.exit().await?;
    Ok(())
}

/// Inline-button presses of the wizard (`wizard_*` callback data).
pub async fn handle_wizard_callback(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    data: String,
    config: Arc<Config>,
    db: Arc<DatabaseManager>,
    scheduler: Arc<PostScheduler>,
) -> HandlerResult {
    let state = dialogue.get().await?.unwrap_or_default();
    let chat_id = q.message.as_ref().map(|m| m.chat.id);

    match data.as_str() {
        "wizard_cancel" => {
            dialogue.exit().await?;
            bot.answer_callback_query(q.id).text("Отменено").await?;
            if let Some(message) = q.message {
                bot.edit_message_text(message.chat.id, message.id, "✅ Действие отменено.")
                    .await?;
            }
        }
        "wizard_done" | "wizard_skip" => {
            bot.answer_callback_query(q.id).await?;
            let Some(chat_id) = chat_id else {
                return Ok(());
            };
            match state {
                WizardState::AwaitingMoreMedia { draft } => {
                    advance_to_buttons(&bot, &dialogue, chat_id, draft).await?;
                }
                WizardState::AwaitingButtons { draft } => {
                    advance_to_schedule(&bot, &dialogue, chat_id, draft).await?;
                }
                _ => {}
            }
        }
        "wizard_publish" => {
            let WizardState::Confirmation { draft } = state else {
                bot.answer_callback_query(q.id).await?;
                return Ok(());
            };
            bot.answer_callback_query(q.id).text("⏳ Публикую...").await?;
            let Some(chat_id) = chat_id else {
                return Ok(());
            };
            match persist_draft(&db, &q.from, &draft).await {
                Err(e) => {
                    bot.send_message(chat_id, e.user_message())
                        .parse_mode(ParseMode::Html)
                        .await?;
                }
                Ok(post) => {
                    let reply =
                        callback::publish_existing_post(&bot, &db, &config, &scheduler, post.id)
                            .await;
                    bot.send_message(chat_id, reply)
                        .parse_mode(ParseMode::Html)
                        .await?;
                    dialogue.exit().await?;
                }
            }
        }
        "wizard_save" => {
            let WizardState::Confirmation { draft } = state else {
                bot.answer_callback_query(q.id).await?;
                return Ok(());
            };
            bot.answer_callback_query(q.id).await?;
            let Some(chat_id) = chat_id else {
                return Ok(());
            };
            match persist_draft(&db, &q.from, &draft).await {
                Err(e) => {
                    bot.send_message(chat_id, e.user_message())
                        .parse_mode(ParseMode::Html)
                        .await?;
                }
                Ok(post) => {
                    let reply = match draft.schedule {
                        Some(ScheduleChoice::At(at)) => {
                            callback::schedule_existing_post(&db, &config, &scheduler, post.id, at)
                                .await
                        }
                        _ => format!("💾 Пост #{} сохранён как черновик.", post.id),
                    };
                    bot.send_message(chat_id, reply)
                        .parse_mode(ParseMode::Html)
                        .await?;
                    dialogue.exit().await?;
                }
            }
        }
        _ => {
            bot.answer_callback_query(q.id).await?;
        }
    }
    Ok(())
}

pub(crate) async fn advance_to_buttons(
    bot: &Bot,
    dialogue: &WizardDialogue,
    chat_id: ChatId,
    draft: WizardDraft,
) -> HandlerResult {
    send_preview_best_effort(bot, chat_id, &draft).await;
    bot.send_message(
        chat_id,
        "🔘 Отправьте кнопки в формате:\n\
         <code>Текст - https://example.com</code>\n\
         (каждая кнопка с новой строки)\n\n\
         или нажмите «Пропустить»",
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(keyboards::skip_keyboard())
    .await?;
    dialogue
        .update(WizardState::AwaitingButtons { draft })
        .await?;
    Ok(())
}

pub(crate) async fn advance_to_schedule(
    bot: &Bot,
    dialogue: &WizardDialogue,
    chat_id: ChatId,
    draft: WizardDraft,
) -> HandlerResult {
    bot.send_message(chat_id, SCHEDULE_PROMPT)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::cancel_keyboard())
        .await?;
    dialogue
        .update(WizardState::AwaitingSchedule { draft })
        .await?;
    Ok(())
}

async fn show_confirmation(
    bot: &Bot,
    dialogue: &WizardDialogue,
    chat_id: ChatId,
    draft: WizardDraft,
    config: &Config,
) -> HandlerResult {
    send_preview_best_effort(bot, chat_id, &draft).await;

    let when = match draft.schedule {
        Some(ScheduleChoice::At(at)) => datetime::format_datetime(at, Utc::now(), config.timezone),
        _ => "сейчас".to_string(),
    };
    bot.send_message(
        chat_id,
        format!(
            "📋 <b>Проверьте пост</b>\n\n\
             Публикация: <b>{when}</b>\n\
             Медиа: {} · Кнопок: {}",
            draft.media.len(),
            draft.buttons.len()
        ),
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(keyboards::confirm_post_keyboard())
    .await?;
    dialogue
        .update(WizardState::Confirmation { draft })
        .await?;
    Ok(())
}

async fn send_media_progress(bot: &Bot, chat_id: ChatId, draft: &WizardDraft) -> HandlerResult {
    bot.send_message(
        chat_id,
        format!(
            "🖼 Медиа: {}/{MEDIA_CAP}. Отправьте ещё фото/видео или нажмите «Готово».",
            draft.media.len()
        ),
    )
    .reply_markup(keyboards::done_keyboard())
    .await?;
    Ok(())
}

/// The preview must not break the flow: failures are logged and shown,
/// the wizard continues.
async fn send_preview_best_effort(bot: &Bot, chat_id: ChatId, draft: &WizardDraft) {
    if draft.is_empty() {
        return;
    }
    if let Err(e) = preview::send_preview(
        bot,
        chat_id,
        &draft.to_content(),
        Some("👁 <b>Предпросмотр</b>"),
    )
    .await
    {
        warn!("Failed to send wizard preview to {}: {}", chat_id, e);
        if let Err(send_error) = bot.send_message(chat_id, e.user_message()).await {
            warn!("Failed to report preview error: {}", send_error);
        }
    }
}

async fn persist_draft(
    db: &DatabaseManager,
    user: &User,
    draft: &WizardDraft,
) -> Result<Post, BotError> {
    if draft.is_empty() {
        return Err(BotError::Validation(
            "❌ Пост пуст — добавьте текст или медиа.".to_string(),
        ));
    }

    let new_post = NewPost {
        author_id: user.id.0 as i64,
        author_username: user.username.clone(),
        text: draft.text.clone(),
        text_entities: draft.entities.clone(),
        disable_link_preview: true,
        disable_notification: false,
    };

    let post = Post::create_with_content(&db.pool, &new_post, &draft.media, &draft.buttons).await?;
    info!(
        "Persisted post {} for user {} ({} media, {} buttons)",
        post.id,
        user.id.0,
        draft.media.len(),
        draft.buttons.len()
    );
    Ok(post)
}
