use crate::database::models::{Post, PostStatus};
use crate::utils::html::post_preview_text;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

pub fn cancel_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "❌ Отмена",
        "wizard_cancel",
    )]])
}

pub fn done_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("✅ Готово", "wizard_done"),
        InlineKeyboardButton::callback("❌ Отмена", "wizard_cancel"),
    ]])
}

pub fn skip_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("⏭ Пропустить", "wizard_skip"),
        InlineKeyboardButton::callback("❌ Отмена", "wizard_cancel"),
    ]])
}

pub fn confirm_post_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "📤 Опубликовать сейчас",
            "wizard_publish",
        )],
        vec![InlineKeyboardButton::callback("💾 Сохранить", "wizard_save")],
        vec![InlineKeyboardButton::callback("❌ Отмена", "wizard_cancel")],
    ])
}

/// Keyboard for a page of the posts list: one row per post, a pagination
/// row, then the status filter rows.
pub fn posts_list_keyboard(
    posts: &[Post],
    page: usize,
    total_pages: usize,
    status_filter: &str,
    show_author: bool,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();

    for post in posts {
        let author = if show_author {
            post.author_username
                .as_deref()
                .map(|u| format!("@{u} "))
                .unwrap_or_default()
        } else {
            String::new()
        };
        let preview = post_preview_text(post.text.as_deref(), 20);
        rows.push(vec![InlineKeyboardButton::callback(
            format!("{} #{} {}{}", post.status().emoji(), post.id, author, preview),
            format!("post_view_{}", post.id),
        )]);
    }

    let mut nav_row = Vec::new();
    if page > 0 {
        nav_row.push(InlineKeyboardButton::callback(
            "◀️",
            format!("posts_page_{}_{}", page - 1, status_filter),
        ));
    }
    nav_row.push(InlineKeyboardButton::callback(
        format!("{}/{}", page + 1, total_pages.max(1)),
        "posts_noop",
    ));
    if page + 1 < total_pages {
        nav_row.push(InlineKeyboardButton::callback(
            "▶️",
            format!("posts_page_{}_{}", page + 1, status_filter),
        ));
    }
    rows.push(nav_row);

    let checked = |name: &str| if status_filter == name { " ✓" } else { "" };
    rows.push(vec![
        InlineKeyboardButton::callback(
            format!("📝 Черновики{}", checked("draft")),
            "posts_filter_draft",
        ),
        InlineKeyboardButton::callback(
            format!("⏰ Запланированные{}", checked("scheduled")),
            "posts_filter_scheduled",
        ),
    ]);
    rows.push(vec![
        InlineKeyboardButton::callback(
            format!("✅ Опубликованные{}", checked("published")),
            "posts_filter_published",
        ),
        InlineKeyboardButton::callback(format!("📋 Все{}", checked("all")), "posts_filter_all"),
    ]);

    InlineKeyboardMarkup::new(rows)
}

/// Action keyboard for the post detail view, depending on status.
pub fn post_view_keyboard(post: &Post) -> InlineKeyboardMarkup {
    let id = post.id;
    let mut rows: Vec<Vec<InlineKeyboardButton>> = vec![vec![InlineKeyboardButton::callback(
        "👁 Превью",
        format!("post_preview_{id}"),
    )]];

    match post.status() {
        PostStatus::Draft => {
            rows.push(vec![
                InlineKeyboardButton::callback("📤 Опубликовать", format!("post_publish_{id}")),
                InlineKeyboardButton::callback("⏰ Запланировать", format!("post_schedule_{id}")),
            ]);
            rows.push(vec![
                InlineKeyboardButton::callback("✏️ Редактировать", format!("post_edit_{id}")),
                InlineKeyboardButton::callback("🗑 Удалить", format!("post_delete_{id}")),
            ]);
        }
        PostStatus::Scheduled => {
            rows.push(vec![
                InlineKeyboardButton::callback(
                    "📤 Опубликовать сейчас",
                    format!("post_publish_{id}"),
                ),
                InlineKeyboardButton::callback("❌ Отменить", format!("post_unschedule_{id}")),
            ]);
            rows.push(vec![InlineKeyboardButton::callback(
                "✏️ Редактировать",
                format!("post_edit_{id}"),
            )]);
        }
        PostStatus::Published => {
            rows.push(vec![InlineKeyboardButton::callback(
                "✏️ Редактировать",
                format!("post_edit_{id}"),
            )]);
        }
        PostStatus::Failed => {
            rows.push(vec![
                InlineKeyboardButton::callback(
                    "🔁 Вернуть в черновики",
                    format!("post_retry_{id}"),
                ),
                InlineKeyboardButton::callback("🗑 Удалить", format!("post_delete_{id}")),
            ]);
        }
    }

    rows.push(vec![InlineKeyboardButton::callback(
        "⬅️ Назад к списку",
        "posts_back",
    )]);

    InlineKeyboardMarkup::new(rows)
}

pub fn edit_menu_keyboard(post_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("📝 Текст", format!("edit_text_{post_id}")),
            InlineKeyboardButton::callback("🔘 Кнопки", format!("edit_buttons_{post_id}")),
        ],
        vec![InlineKeyboardButton::callback(
            "◀️ Назад",
            format!("post_view_{post_id}"),
        )],
    ])
}
