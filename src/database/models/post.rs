use crate::database::models::{NewButtonItem, NewMediaItem, PostButton, PostMedia};
use crate::utils::errors::BotError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use teloxide::types::MessageEntity;

/// Lifecycle status of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Scheduled,
    Published,
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Published => "published",
            PostStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PostStatus::Draft),
            "scheduled" => Some(PostStatus::Scheduled),
            "published" => Some(PostStatus::Published),
            "failed" => Some(PostStatus::Failed),
            _ => None,
        }
    }

    /// Allowed status transitions. Published posts only permit the
    /// idempotent published->published re-save; failed posts can only be
    /// returned to draft by an explicit user retry.
    pub fn can_transition_to(self, next: PostStatus) -> bool {
        use PostStatus::*;
        matches!(
            (self, next),
            (Draft, Scheduled)
                | (Draft, Published)
                | (Draft, Failed)
                | (Scheduled, Draft)
                | (Scheduled, Published)
                | (Scheduled, Failed)
                | (Published, Published)
                | (Failed, Draft)
        )
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            PostStatus::Draft => "📝",
            PostStatus::Scheduled => "⏰",
            PostStatus::Published => "✅",
            PostStatus::Failed => "❌",
        }
    }

    pub fn title_ru(&self) -> &'static str {
        match self {
            PostStatus::Draft => "Черновик",
            PostStatus::Scheduled => "Запланирован",
            PostStatus::Published => "Опубликован",
            PostStatus::Failed => "Ошибка публикации",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub author_username: Option<String>,
    pub text: Option<String>,
    /// JSON-encoded list of Telegram message entities over `text`.
    pub text_entities: Option<String>,
    pub status: String,
    pub scheduled_at: Option<String>,
    pub published_message_id: Option<i64>,
    pub published_at: Option<String>,
    pub scheduler_job_id: Option<String>,
    pub disable_link_preview: bool,
    pub disable_notification: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Payload for creating a new post.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub author_id: i64,
    pub author_username: Option<String>,
    pub text: Option<String>,
    pub text_entities: Vec<MessageEntity>,
    pub disable_link_preview: bool,
    pub disable_notification: bool,
}

/// A post together with its owned media and buttons, in render order.
#[derive(Debug, Clone)]
pub struct PostGraph {
    pub post: Post,
    pub media: Vec<PostMedia>,
    pub buttons: Vec<PostButton>,
}

const POST_COLUMNS: &str = "id, author_id, author_username, text, text_entities, status, \
     scheduled_at, published_message_id, published_at, scheduler_job_id, \
     disable_link_preview, disable_notification, created_at, updated_at";

impl Post {
    pub fn status(&self) -> PostStatus {
        // Unknown statuses read as drafts so a corrupted row stays editable
        PostStatus::parse(&self.status).unwrap_or(PostStatus::Draft)
    }

    pub fn entities(&self) -> Vec<MessageEntity> {
        self.text_entities
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }

    pub fn scheduled_at_utc(&self) -> Option<DateTime<Utc>> {
        self.scheduled_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub async fn create(pool: &sqlx::SqlitePool, new: &NewPost) -> Result<Self, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let entities_json = encode_entities(&new.text_entities);

        let result = sqlx::query(
            "INSERT INTO posts (author_id, author_username, text, text_entities, status, \
             disable_link_preview, disable_notification, created_at, updated_at) \
             VALUES (?, ?, ?, ?, 'draft', ?, ?, ?, ?)",
        )
        .bind(new.author_id)
        .bind(&new.author_username)
        .bind(&new.text)
        .bind(&entities_json)
        .bind(new.disable_link_preview)
        .bind(new.disable_notification)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;

        let id = result.last_insert_rowid();
        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Create a post with its media and buttons in one transaction: either
    /// the whole graph becomes visible or none of it does.
    pub async fn create_with_content(
        pool: &sqlx::SqlitePool,
        new: &NewPost,
        media: &[NewMediaItem],
        buttons: &[NewButtonItem],
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let entities_json = encode_entities(&new.text_entities);

        let mut tx = pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO posts (author_id, author_username, text, text_entities, status, \
             disable_link_preview, disable_notification, created_at, updated_at) \
             VALUES (?, ?, ?, ?, 'draft', ?, ?, ?, ?)",
        )
        .bind(new.author_id)
        .bind(&new.author_username)
        .bind(&new.text)
        .bind(&entities_json)
        .bind(new.disable_link_preview)
        .bind(new.disable_notification)
        .bind(&now)
        .bind(&now)
        .execute(&mut tx)
        .await?;

        let post_id = result.last_insert_rowid();

        for (position, item) in media.iter().enumerate() {
            sqlx::query(
                "INSERT INTO post_media (post_id, file_id, file_unique_id, kind, caption, \
                 position, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(post_id)
            .bind(&item.file_id)
            .bind(&item.file_unique_id)
            .bind(item.kind.as_str())
            .bind(&item.caption)
            .bind(position as i64)
            .bind(&now)
            .execute(&mut tx)
            .await?;
        }

        for button in buttons {
            sqlx::query(
                "INSERT INTO post_buttons (post_id, label, url, \"row\", position, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(post_id)
            .bind(&button.label)
            .bind(&button.url)
            .bind(button.row)
            .bind(button.position)
            .bind(&now)
            .execute(&mut tx)
            .await?;
        }

        tx.commit().await?;

        Self::find_by_id(pool, post_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        post_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?"))
            .bind(post_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn load_graph(
        pool: &sqlx::SqlitePool,
        post_id: i64,
    ) -> Result<Option<PostGraph>, sqlx::Error> {
        let Some(post) = Self::find_by_id(pool, post_id).await? else {
            return Ok(None);
        };
        let media = PostMedia::list_by_post(pool, post_id).await?;
        let buttons = PostButton::list_by_post(pool, post_id).await?;
        Ok(Some(PostGraph {
            post,
            media,
            buttons,
        }))
    }

    pub async fn list_by_author(
        pool: &sqlx::SqlitePool,
        author_id: i64,
        status: Option<PostStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        match status {
            Some(status) => {
                sqlx::query_as::<_, Post>(&format!(
                    "SELECT {POST_COLUMNS} FROM posts WHERE author_id = ? AND status = ? \
                     ORDER BY created_at DESC LIMIT ? OFFSET ?"
                ))
                .bind(author_id)
                .bind(status.as_str())
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Post>(&format!(
                    "SELECT {POST_COLUMNS} FROM posts WHERE author_id = ? \
                     ORDER BY created_at DESC LIMIT ? OFFSET ?"
                ))
                .bind(author_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await
            }
        }
    }

    /// Posts from every author, for the admin-wide listing.
    pub async fn list_all(
        pool: &sqlx::SqlitePool,
        status: Option<PostStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        match status {
            Some(status) => {
                sqlx::query_as::<_, Post>(&format!(
                    "SELECT {POST_COLUMNS} FROM posts WHERE status = ? \
                     ORDER BY created_at DESC LIMIT ? OFFSET ?"
                ))
                .bind(status.as_str())
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Post>(&format!(
                    "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC LIMIT ? OFFSET ?"
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await
            }
        }
    }

    /// All scheduled posts, earliest first. Used by restart recovery.
    pub async fn list_scheduled(pool: &sqlx::SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE status = 'scheduled' \
             ORDER BY scheduled_at ASC"
        ))
        .fetch_all(pool)
        .await
    }

    /// Scheduled posts whose instant has already passed, earliest first.
    pub async fn list_due(
        pool: &sqlx::SqlitePool,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE status = 'scheduled' AND scheduled_at <= ? \
             ORDER BY scheduled_at ASC"
        ))
        .bind(now.to_rfc3339())
        .fetch_all(pool)
        .await
    }

    pub async fn update_text(
        pool: &sqlx::SqlitePool,
        post_id: i64,
        text: Option<&str>,
        entities: &[MessageEntity],
    ) -> Result<Self, BotError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE posts SET text = ?, text_entities = ?, updated_at = ? WHERE id = ?")
            .bind(text)
            .bind(encode_entities(entities))
            .bind(&now)
            .bind(post_id)
            .execute(pool)
            .await?;
        Self::require(pool, post_id).await
    }

    pub async fn mark_scheduled(
        pool: &sqlx::SqlitePool,
        post_id: i64,
        at: DateTime<Utc>,
        job_id: &str,
    ) -> Result<Self, BotError> {
        let post = Self::require(pool, post_id).await?;
        let from = post.status();
        if !from.can_transition_to(PostStatus::Scheduled) {
            return Err(BotError::InvalidTransition {
                from,
                to: PostStatus::Scheduled,
            });
        }
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE posts SET status = 'scheduled', scheduled_at = ?, scheduler_job_id = ?, \
             updated_at = ? WHERE id = ?",
        )
        .bind(at.to_rfc3339())
        .bind(job_id)
        .bind(&now)
        .bind(post_id)
        .execute(pool)
        .await?;
        Self::require(pool, post_id).await
    }

    /// Revert a scheduled post to draft, clearing the schedule fields
    /// atomically with the status flip.
    pub async fn unschedule(pool: &sqlx::SqlitePool, post_id: i64) -> Result<Self, BotError> {
        let post = Self::require(pool, post_id).await?;
        let from = post.status();
        if !from.can_transition_to(PostStatus::Draft) {
            return Err(BotError::InvalidTransition {
                from,
                to: PostStatus::Draft,
            });
        }
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE posts SET status = 'draft', scheduled_at = NULL, scheduler_job_id = NULL, \
             updated_at = ? WHERE id = ?",
        )
        .bind(&now)
        .bind(post_id)
        .execute(pool)
        .await?;
        Self::require(pool, post_id).await
    }

    pub async fn mark_published(
        pool: &sqlx::SqlitePool,
        post_id: i64,
        message_id: i64,
        published_at: DateTime<Utc>,
    ) -> Result<Self, BotError> {
        let post = Self::require(pool, post_id).await?;
        let from = post.status();
        if !from.can_transition_to(PostStatus::Published) {
            return Err(BotError::InvalidTransition {
                from,
                to: PostStatus::Published,
            });
        }
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE posts SET status = 'published', published_message_id = ?, published_at = ?, \
             scheduled_at = NULL, scheduler_job_id = NULL, updated_at = ? WHERE id = ?",
        )
        .bind(message_id)
        .bind(published_at.to_rfc3339())
        .bind(&now)
        .bind(post_id)
        .execute(pool)
        .await?;
        Self::require(pool, post_id).await
    }

    pub async fn mark_failed(pool: &sqlx::SqlitePool, post_id: i64) -> Result<Self, BotError> {
        let post = Self::require(pool, post_id).await?;
        let from = post.status();
        if !from.can_transition_to(PostStatus::Failed) {
            return Err(BotError::InvalidTransition {
                from,
                to: PostStatus::Failed,
            });
        }
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE posts SET status = 'failed', scheduled_at = NULL, scheduler_job_id = NULL, \
             updated_at = ? WHERE id = ?",
        )
        .bind(&now)
        .bind(post_id)
        .execute(pool)
        .await?;
        Self::require(pool, post_id).await
    }

    /// Manual retry: failed posts go back to draft so the user can publish
    /// or schedule them again.
    pub async fn retry_as_draft(pool: &sqlx::SqlitePool, post_id: i64) -> Result<Self, BotError> {
        let post = Self::require(pool, post_id).await?;
        let from = post.status();
        if from != PostStatus::Failed || !from.can_transition_to(PostStatus::Draft) {
            return Err(BotError::InvalidTransition {
                from,
                to: PostStatus::Draft,
            });
        }
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE posts SET status = 'draft', updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(post_id)
            .execute(pool)
            .await?;
        Self::require(pool, post_id).await
    }

    /// Delete a post and everything it owns. Returns whether a row was
    /// actually removed.
    pub async fn delete(pool: &sqlx::SqlitePool, post_id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM post_buttons WHERE post_id = ?")
            .bind(post_id)
            .execute(&mut tx)
            .await?;
        sqlx::query("DELETE FROM post_media WHERE post_id = ?")
            .bind(post_id)
            .execute(&mut tx)
            .await?;
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(post_id)
            .execute(&mut tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn require(pool: &sqlx::SqlitePool, post_id: i64) -> Result<Self, BotError> {
        Self::find_by_id(pool, post_id)
            .await?
            .ok_or(BotError::NotFound("Пост"))
    }
}

fn encode_entities(entities: &[MessageEntity]) -> Option<String> {
    if entities.is_empty() {
        return None;
    }
    serde_json::to_string(entities).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            PostStatus::Draft,
            PostStatus::Scheduled,
            PostStatus::Published,
            PostStatus::Failed,
        ] {
            assert_eq!(PostStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PostStatus::parse("bogus"), None);
    }

    #[test]
    fn test_transition_table() {
        use PostStatus::*;
        assert!(Draft.can_transition_to(Scheduled));
        assert!(Draft.can_transition_to(Published));
        assert!(Draft.can_transition_to(Failed));
        assert!(Scheduled.can_transition_to(Draft));
        assert!(Scheduled.can_transition_to(Published));
        assert!(Scheduled.can_transition_to(Failed));
        assert!(Published.can_transition_to(Published));
        assert!(Failed.can_transition_to(Draft));

        assert!(!Published.can_transition_to(Draft));
        assert!(!Published.can_transition_to(Scheduled));
        assert!(!Published.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Scheduled));
        assert!(!Failed.can_transition_to(Published));
        assert!(!Draft.can_transition_to(Draft));
    }
}
