use crate::bot::keyboards;
use crate::config::Config;
use crate::database::connection::DatabaseManager;
use crate::database::models::{Post, PostGraph, PostStatus};
use crate::utils::datetime::format_datetime;
use crate::utils::feedback::CommandFeedback;
use crate::utils::html::{escape_html, truncate_text};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, ParseMode};
use tracing::{error, info};

pub const POSTS_PER_PAGE: usize = 5;

/// How many posts a listing loads at most; pages slice this in memory.
const LIST_FETCH_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Draft,
    Scheduled,
    Published,
}

impl StatusFilter {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(StatusFilter::All),
            "draft" => Some(StatusFilter::Draft),
            "scheduled" => Some(StatusFilter::Scheduled),
            "published" => Some(StatusFilter::Published),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Draft => "draft",
            StatusFilter::Scheduled => "scheduled",
            StatusFilter::Published => "published",
        }
    }

    pub fn status(&self) -> Option<PostStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Draft => Some(PostStatus::Draft),
            StatusFilter::Scheduled => Some(PostStatus::Scheduled),
            StatusFilter::Published => Some(PostStatus::Published),
        }
    }

    pub fn title_ru(&self) -> &'static str {
        match self {
            StatusFilter::All => "Все посты",
            StatusFilter::Draft => "Черновики",
            StatusFilter::Scheduled => "Запланированные",
            StatusFilter::Published => "Опубликованные",
        }
    }

    fn empty_text_ru(&self) -> &'static str {
        match self {
            StatusFilter::All => "постов",
            StatusFilter::Draft => "черновиков",
            StatusFilter::Scheduled => "запланированных постов",
            StatusFilter::Published => "опубликованных постов",
        }
    }
}

pub async fn fetch_posts(
    db: &DatabaseManager,
    author_id: Option<i64>,
    filter: StatusFilter,
) -> Result<Vec<Post>, sqlx::Error> {
    match author_id {
        Some(author_id) => {
            Post::list_by_author(&db.pool, author_id, filter.status(), LIST_FETCH_LIMIT, 0).await
        }
        None => Post::list_all(&db.pool, filter.status(), LIST_FETCH_LIMIT, 0).await,
    }
}

/// Render one page of the posts list. `filter_tag` is the raw callback
/// filter string (`draft`, `admin_all`, ...) echoed into pagination data.
pub fn render_list(
    posts: &[Post],
    page: usize,
    filter: StatusFilter,
    filter_tag: &str,
    is_admin_view: bool,
) -> (String, InlineKeyboardMarkup) {
    let total_pages = posts.len().div_ceil(POSTS_PER_PAGE).max(1);
    let page = page.min(total_pages - 1);
    let start = page * POSTS_PER_PAGE;
    let page_posts = &posts[start..(start + POSTS_PER_PAGE).min(posts.len())];

    let title = if is_admin_view {
        format!("👑 <b>Все посты (админ) — {}</b>", filter.title_ru())
    } else {
        format!("📋 <b>{}</b>", filter.title_ru())
    };
    let text = format!(
        "{} ({} шт.)\n\nВыберите пост для просмотра:",
        title,
        posts.len()
    );

    let keyboard =
        keyboards::posts_list_keyboard(page_posts, page, total_pages, filter_tag, is_admin_view);
    (text, keyboard)
}

pub fn empty_list_text(filter: StatusFilter, is_admin_view: bool) -> String {
    if is_admin_view {
        "👑 <b>Все посты (админ)</b>\n\n<i>Постов нет.</i>".to_string()
    } else {
        format!(
            "📋 <b>Ваши посты</b>\n\n<i>У вас нет {}.</i>\n\nСоздайте новый пост командой /new",
            filter.empty_text_ru()
        )
    }
}

/// Detail view of one post: status, timestamps, media/button summary and a
/// text preview, plus the status-appropriate action keyboard.
pub fn render_post_detail(
    graph: &PostGraph,
    now: DateTime<Utc>,
    tz: Tz,
) -> (String, InlineKeyboardMarkup) {
    let post = &graph.post;
    let status = post.status();

    let mut parts = vec![
        format!("📋 <b>Пост #{}</b>\n", post.id),
        format!("<b>Статус:</b> {} {}", status.emoji(), status.title_ru()),
    ];

    if let Ok(created) = DateTime::parse_from_rfc3339(&post.created_at) {
        parts.push(format!(
            "<b>Создан:</b> {}",
            format_datetime(created.with_timezone(&Utc), now, tz)
        ));
    }
    if let Some(scheduled_at) = post.scheduled_at_utc() {
        parts.push(format!(
            "<b>Запланирован:</b> {}",
            format_datetime(scheduled_at, now, tz)
        ));
    }
    if let Some(published_at) = post
        .published_at
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
    {
        parts.push(format!(
            "<b>Опубликован:</b> {}",
            format_datetime(published_at.with_timezone(&Utc), now, tz)
        ));
    }
    if let Some(message_id) = post.published_message_id {
        parts.push(format!("<b>ID сообщения:</b> <code>{message_id}</code>"));
    }

    parts.push(format!("\n<b>Медиа:</b> {} файл(ов)", graph.media.len()));
    parts.push(format!("<b>Кнопок:</b> {}", graph.buttons.len()));

    if !graph.buttons.is_empty() {
        let mut lines: Vec<String> = graph
            .buttons
            .iter()
            .take(3)
            .map(|b| format!("  • {}", escape_html(&b.label)))
            .collect();
        if graph.buttons.len() > 3 {
            lines.push(format!("  … и ещё {}", graph.buttons.len() - 3));
        }
        parts.push(format!("\n<b>Кнопки:</b>\n{}", lines.join("\n")));
    }

    let text_preview = match post.text.as_deref() {
        Some(text) if !text.is_empty() => escape_html(&truncate_text(text, 200)),
        _ => "&lt;без текста&gt;".to_string(),
    };
    parts.push(format!("\n<b>Текст:</b>\n<i>{text_preview}</i>"));

    (parts.join("\n"), keyboards::post_view_keyboard(post))
}

pub async fn handle_list(
    bot: Bot,
    msg: Message,
    db: &DatabaseManager,
    filter: StatusFilter,
) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let user_id = user.id.0 as i64;

    let posts = match fetch_posts(db, Some(user_id), filter).await {
        Ok(posts) => posts,
        Err(e) => {
            error!("Failed to list posts for user {}: {}", user_id, e);
            CommandFeedback::new(bot, msg.chat.id)
                .error("Не удалось загрузить список постов")
                .await?;
            return Ok(());
        }
    };

    if posts.is_empty() {
        bot.send_message(msg.chat.id, empty_list_text(filter, false))
            .parse_mode(ParseMode::Html)
            .await?;
        return Ok(());
    }

    let (text, keyboard) = render_list(&posts, 0, filter, filter.as_str(), false);
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;

    info!(
        "User {} requested posts list (filter: {})",
        user_id,
        filter.as_str()
    );
    Ok(())
}

pub async fn handle_all_posts(
    bot: Bot,
    msg: Message,
    db: &DatabaseManager,
    config: &Config,
) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let user_id = user.id.0 as i64;

    if !config.is_admin(user_id) {
        bot.send_message(msg.chat.id, "❌ Эта команда доступна только администраторам.")
            .await?;
        return Ok(());
    }

    let filter = StatusFilter::All;
    let posts = match fetch_posts(db, None, filter).await {
        Ok(posts) => posts,
        Err(e) => {
            error!("Failed to list all posts: {}", e);
            CommandFeedback::new(bot, msg.chat.id)
                .error("Не удалось загрузить список постов")
                .await?;
            return Ok(());
        }
    };

    if posts.is_empty() {
        bot.send_message(msg.chat.id, empty_list_text(filter, true))
            .parse_mode(ParseMode::Html)
            .await?;
        return Ok(());
    }

    let (text, keyboard) = render_list(&posts, 0, filter, "admin_all", true);
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;

    info!("Admin {} requested all posts list", user_id);
    Ok(())
}
