use crate::config::Config;
use crate::database::models::{
    MediaKind, NewButtonItem, NewMediaItem, Post, PostGraph, PostStatus,
};
use crate::database::connection::DatabaseManager;
use crate::utils::errors::BotError;
use chrono::Utc;
use std::collections::BTreeMap;
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, InputFile, InputMedia, InputMediaAnimation,
    InputMediaAudio, InputMediaDocument, InputMediaPhoto, InputMediaVideo, MessageEntity,
    MessageId, Recipient,
};
use teloxide::{ApiError, RequestError};
use tracing::{error, info, warn};
use url::Url;

/// Note sent after an album when the post has buttons: grouped deliveries
/// cannot carry an inline keyboard, so it goes in a trailing message.
const ALBUM_KEYBOARD_NOTE: &str = "👆 Кнопки к посту";

/// Everything needed to render a post, whether it comes from the store or
/// from an in-progress wizard draft. Preview and publication both go
/// through this type so they cannot diverge.
#[derive(Debug, Clone)]
pub struct PostContent {
    pub text: Option<String>,
    pub entities: Vec<MessageEntity>,
    pub media: Vec<NewMediaItem>,
    pub buttons: Vec<NewButtonItem>,
    pub disable_link_preview: bool,
    pub disable_notification: bool,
}

impl PostContent {
    pub fn from_graph(graph: &PostGraph) -> Self {
        PostContent {
            text: graph.post.text.clone(),
            entities: graph.post.entities(),
            media: graph
                .media
                .iter()
                .map(|m| NewMediaItem {
                    file_id: m.file_id.clone(),
                    file_unique_id: m.file_unique_id.clone(),
                    kind: m.kind(),
                    caption: m.caption.clone(),
                })
                .collect(),
            buttons: graph.buttons.iter().map(NewButtonItem::from).collect(),
            disable_link_preview: graph.post.disable_link_preview,
            disable_notification: graph.post.disable_notification,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.as_deref().map_or(true, str::is_empty) && self.media.is_empty()
    }
}

/// The outbound calls a post renders into.
#[derive(Debug, Clone)]
pub enum SendPlan {
    /// No media: a single text message carrying the keyboard.
    Text {
        text: String,
        entities: Vec<MessageEntity>,
        keyboard: Option<InlineKeyboardMarkup>,
        disable_link_preview: bool,
        disable_notification: bool,
    },
    /// Exactly one media item: kind-appropriate send with the post text as
    /// caption and the keyboard attached to the same message.
    SingleMedia {
        media: NewMediaItem,
        caption: Option<String>,
        entities: Vec<MessageEntity>,
        keyboard: Option<InlineKeyboardMarkup>,
        disable_notification: bool,
    },
    /// Two or more items: one grouped delivery with the caption on the
    /// first item; a non-empty keyboard goes into a separate trailing
    /// message because albums cannot carry one.
    Album {
        items: Vec<NewMediaItem>,
        caption: Option<String>,
        entities: Vec<MessageEntity>,
        keyboard: Option<InlineKeyboardMarkup>,
        disable_notification: bool,
    },
}

/// Build the inline keyboard from the stored button set: same row renders
/// on one line in position order, rows top-to-bottom.
pub fn build_keyboard(buttons: &[NewButtonItem]) -> Option<InlineKeyboardMarkup> {
    if buttons.is_empty() {
        return None;
    }

    let mut rows: BTreeMap<i64, Vec<(i64, InlineKeyboardButton)>> = BTreeMap::new();
    for button in buttons {
        // URLs were validated at acceptance; skip anything unparseable
        let Ok(url) = Url::parse(&button.url) else {
            warn!("Skipping button with unparseable url: {}", button.url);
            continue;
        };
        rows.entry(button.row)
            .or_default()
            .push((button.position, InlineKeyboardButton::url(button.label.clone(), url)));
    }

    let keyboard: Vec<Vec<InlineKeyboardButton>> = rows
        .into_values()
        .map(|mut row| {
            row.sort_by_key(|(position, _)| *position);
            row.into_iter().map(|(_, button)| button).collect()
        })
        .collect();

    if keyboard.is_empty() {
        return None;
    }
    Some(InlineKeyboardMarkup::new(keyboard))
}

/// Turn post content into its outbound delivery plan. This encodes the
/// rendering rule shared by preview and publication.
pub fn build_send_plan(content: &PostContent) -> Result<SendPlan, BotError> {
    if content.is_empty() {
        return Err(BotError::Validation(
            "❌ Пост пуст — добавьте текст или медиа.".to_string(),
        ));
    }

    let keyboard = build_keyboard(&content.buttons);

    match content.media.len() {
        0 => Ok(SendPlan::Text {
            text: content.text.clone().unwrap_or_default(),
            entities: content.entities.clone(),
            keyboard,
            disable_link_preview: content.disable_link_preview,
            disable_notification: content.disable_notification,
        }),
        1 => {
            let media = content.media[0].clone();
            // The sole media item may carry its own caption when the post
            // has no text of its own
            let caption = content
                .text
                .clone()
                .filter(|t| !t.is_empty())
                .or_else(|| media.caption.clone());
            Ok(SendPlan::SingleMedia {
                media,
                caption,
                entities: content.entities.clone(),
                keyboard,
                disable_notification: content.disable_notification,
            })
        }
        _ => Ok(SendPlan::Album {
            items: content.media.clone(),
            caption: content.text.clone().filter(|t| !t.is_empty()),
            entities: content.entities.clone(),
            keyboard,
            disable_notification: content.disable_notification,
        }),
    }
}

/// Execute a plan against a destination and return the primary message id
/// (for an album, the first message's id).
pub async fn execute_send_plan(
    bot: &Bot,
    to: Recipient,
    plan: &SendPlan,
) -> Result<MessageId, RequestError> {
    match plan {
        SendPlan::Text {
            text,
            entities,
            keyboard,
            disable_link_preview,
            disable_notification,
        } => {
            let mut request = bot
                .send_message(to, text.clone())
                .disable_web_page_preview(*disable_link_preview)
                .disable_notification(*disable_notification);
            if !entities.is_empty() {
                request = request.entities(entities.clone());
            }
            if let Some(keyboard) = keyboard {
                request = request.reply_markup(keyboard.clone());
            }
            let message = request.await?;
            Ok(message.id)
        }
        SendPlan::SingleMedia {
            media,
            caption,
            entities,
            keyboard,
            disable_notification,
        } => {
            let file = InputFile::file_id(media.file_id.clone());
            let message = match media.kind {
                MediaKind::Photo => {
                    let mut request = bot
                        .send_photo(to, file)
                        .disable_notification(*disable_notification);
                    if let Some(caption) = caption {
                        request = request.caption(caption.clone());
                    }
                    if !entities.is_empty() {
                        request = request.caption_entities(entities.clone());
                    }
                    if let Some(keyboard) = keyboard {
                        request = request.reply_markup(keyboard.clone());
                    }
                    request.await?
                }
                MediaKind::Video => {
                    let mut request = bot
                        .send_video(to, file)
                        .disable_notification(*disable_notification);
                    if let Some(caption) = caption {
                        request = request.caption(caption.clone());
                    }
                    if !entities.is_empty() {
                        request = request.caption_entities(entities.clone());
                    }
                    if let Some(keyboard) = keyboard {
                        request = request.reply_markup(keyboard.clone());
                    }
                    request.await?
                }
                MediaKind::Document => {
                    let mut request = bot
                        .send_document(to, file)
                        .disable_notification(*disable_notification);
                    if let Some(caption) = caption {
                        request = request.caption(caption.clone());
                    }
                    if !entities.is_empty() {
                        request = request.caption_entities(entities.clone());
                    }
                    if let Some(keyboard) = keyboard {
                        request = request.reply_markup(keyboard.clone());
                    }
                    request.await?
                }
                MediaKind::Audio => {
                    let mut request = bot
                        .send_audio(to, file)
                        .disable_notification(*disable_notification);
                    if let Some(caption) = caption {
                        request = request.caption(caption.clone());
                    }
                    if !entities.is_empty() {
                        request = request.caption_entities(entities.clone());
                    }
                    if let Some(keyboard) = keyboard {
                        request = request.reply_markup(keyboard.clone());
                    }
                    request.await?
                }
                MediaKind::Animation => {
                    let mut request = bot
                        .send_animation(to, file)
                        .disable_notification(*disable_notification);
                    if let Some(caption) = caption {
                        request = request.caption(caption.clone());
                    }
                    if !entities.is_empty() {
                        request = request.caption_entities(entities.clone());
                    }
                    if let Some(keyboard) = keyboard {
                        request = request.reply_markup(keyboard.clone());
                    }
                    request.await?
                }
            };
            Ok(message.id)
        }
        SendPlan::Album {
            items,
            caption,
            entities,
            keyboard,
            disable_notification,
        } => {
            let group: Vec<InputMedia> = items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    let caption = if index == 0 { caption.clone() } else { None };
                    let entities = if index == 0 { entities.clone() } else { Vec::new() };
                    input_media_for(item, caption, entities)
                })
                .collect();

            let messages = bot
                .send_media_group(to.clone(), group)
                .disable_notification(*disable_notification)
                .await?;
            let first_id = messages.first().map(|m| m.id).ok_or_else(|| {
                RequestError::Api(ApiError::Unknown(
                    "empty response to media group send".to_string(),
                ))
            })?;

            if let Some(keyboard) = keyboard {
                bot.send_message(to, ALBUM_KEYBOARD_NOTE)
                    .reply_markup(keyboard.clone())
                    .disable_notification(*disable_notification)
                    .await?;
            }

            Ok(first_id)
        }
    }
}

fn input_media_for(
    item: &NewMediaItem,
    caption: Option<String>,
    entities: Vec<MessageEntity>,
) -> InputMedia {
    let file = InputFile::file_id(item.file_id.clone());
    match item.kind {
        MediaKind::Photo => {
            let mut media = InputMediaPhoto::new(file);
            if let Some(caption) = caption {
                media = media.caption(caption);
            }
            if !entities.is_empty() {
                media = media.caption_entities(entities);
            }
            InputMedia::Photo(media)
        }
        MediaKind::Video => {
            let mut media = InputMediaVideo::new(file);
            if let Some(caption) = caption {
                media = media.caption(caption);
            }
            if !entities.is_empty() {
                media = media.caption_entities(entities);
            }
            InputMedia::Video(media)
        }
        MediaKind::Document => {
            let mut media = InputMediaDocument::new(file);
            if let Some(caption) = caption {
                media = media.caption(caption);
            }
            if !entities.is_empty() {
                media = media.caption_entities(entities);
            }
            InputMedia::Document(media)
        }
        MediaKind::Audio => {
            let mut media = InputMediaAudio::new(file);
            if let Some(caption) = caption {
                media = media.caption(caption);
            }
            if !entities.is_empty() {
                media = media.caption_entities(entities);
            }
            InputMedia::Audio(media)
        }
        MediaKind::Animation => {
            let mut media = InputMediaAnimation::new(file);
            if let Some(caption) = caption {
                media = media.caption(caption);
            }
            if !entities.is_empty() {
                media = media.caption_entities(entities);
            }
            InputMedia::Animation(media)
        }
    }
}

/// Publish a stored post to the configured channel. Transport failures are
/// caught here, logged with context, and surfaced as an error; this
/// function never retries.
pub async fn publish_post(
    bot: &Bot,
    config: &Config,
    graph: &PostGraph,
) -> Result<MessageId, BotError> {
    let content = PostContent::from_graph(graph);
    let plan = build_send_plan(&content)?;

    match execute_send_plan(bot, config.channel.clone(), &plan).await {
        Ok(message_id) => {
            info!(
                "Published post {} to channel, message_id={}",
                graph.post.id, message_id.0
            );
            Ok(message_id)
        }
        Err(e) => {
            error!("Failed to publish post {}: {}", graph.post.id, e);
            Err(BotError::Publish(e))
        }
    }
}

/// Fire path for the scheduler: publishes against the *current* stored
/// state of the post and records the outcome. Errors are logged, never
/// propagated — a timer callback has nobody to report to.
pub async fn publish_scheduled_post(
    bot: &Bot,
    db: &DatabaseManager,
    config: &Config,
    post_id: i64,
) {
    info!("Publishing scheduled post {}", post_id);

    let graph = match Post::load_graph(&db.pool, post_id).await {
        Ok(Some(graph)) => graph,
        Ok(None) => {
            error!("Scheduled post {} no longer exists", post_id);
            return;
        }
        Err(e) => {
            error!("Failed to load scheduled post {}: {}", post_id, e);
            return;
        }
    };

    if graph.post.status() != PostStatus::Scheduled {
        warn!(
            "Post {} is not in scheduled status (status={}), skipping fire",
            post_id, graph.post.status
        );
        return;
    }

    // Misfire policy: a fire far beyond the stored instant is treated as
    // missed rather than published late
    if let Some(scheduled_at) = graph.post.scheduled_at_utc() {
        let overdue = Utc::now() - scheduled_at;
        if overdue.num_seconds() > config.misfire_grace_secs {
            warn!(
                "Post {} missed its slot by {}s (grace {}s), marking failed",
                post_id,
                overdue.num_seconds(),
                config.misfire_grace_secs
            );
            if let Err(e) = Post::mark_failed(&db.pool, post_id).await {
                error!("Failed to mark post {} as failed: {}", post_id, e);
            }
            return;
        }
    }

    match publish_post(bot, config, &graph).await {
        Ok(message_id) => {
            match Post::mark_published(&db.pool, post_id, i64::from(message_id.0), Utc::now()).await
            {
                Ok(_) => info!(
                    "Post {} published on schedule, message_id={}",
                    post_id, message_id.0
                ),
                Err(e) => error!("Failed to mark post {} as published: {}", post_id, e),
            }
        }
        Err(_) => {
            if let Err(e) = Post::mark_failed(&db.pool, post_id).await {
                error!("Failed to mark post {} as failed: {}", post_id, e);
            }
        }
    }
}

/// Push the current text and entities of a published post to its channel
/// message. Idempotent: re-applying the same edit is treated as success.
pub async fn edit_published_text(
    bot: &Bot,
    config: &Config,
    graph: &PostGraph,
) -> Result<(), BotError> {
    let message_id = graph
        .post
        .published_message_id
        .ok_or(BotError::NotFound("Опубликованный пост"))?;
    let message_id = MessageId(message_id as i32);
    let text = graph.post.text.clone().unwrap_or_default();
    let entities = graph.post.entities();
    let keyboard = build_keyboard(&graph.buttons.iter().map(NewButtonItem::from).collect::<Vec<_>>());

    let result = if graph.media.is_empty() {
        let mut request = bot
            .edit_message_text(config.channel.clone(), message_id, text)
            .disable_web_page_preview(graph.post.disable_link_preview);
        if !entities.is_empty() {
            request = request.entities(entities);
        }
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(keyboard);
        }
        request.await.map(|_| ())
    } else {
        let mut request = bot
            .edit_message_caption(config.channel.clone(), message_id)
            .caption(text);
        if !entities.is_empty() {
            request = request.caption_entities(entities);
        }
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(keyboard);
        }
        request.await.map(|_| ())
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if is_not_modified(&e) => Ok(()),
        Err(e) => {
            error!("Failed to edit text of post {}: {}", graph.post.id, e);
            Err(BotError::Publish(e))
        }
    }
}

/// Rebuild the keyboard from the current button set and push it to the
/// published channel message. Idempotent the same way as text edits.
pub async fn edit_published_keyboard(
    bot: &Bot,
    config: &Config,
    graph: &PostGraph,
) -> Result<(), BotError> {
    let message_id = graph
        .post
        .published_message_id
        .ok_or(BotError::NotFound("Опубликованный пост"))?;
    let message_id = MessageId(message_id as i32);
    let keyboard = build_keyboard(&graph.buttons.iter().map(NewButtonItem::from).collect::<Vec<_>>());

    let mut request = bot.edit_message_reply_markup(config.channel.clone(), message_id);
    if let Some(keyboard) = keyboard {
        request = request.reply_markup(keyboard);
    }

    match request.await {
        Ok(_) => Ok(()),
        Err(e) if is_not_modified(&e) => Ok(()),
        Err(e) => {
            error!("Failed to edit keyboard of post {}: {}", graph.post.id, e);
            Err(BotError::Publish(e))
        }
    }
}

fn is_not_modified(error: &RequestError) -> bool {
    matches!(error, RequestError::Api(ApiError::MessageNotModified))
}
