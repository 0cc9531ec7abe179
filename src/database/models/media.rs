use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Kind of a media attachment. Only photos and videos can be combined
/// into an album.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
    Document,
    Audio,
    Animation,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Document => "document",
            MediaKind::Audio => "audio",
            MediaKind::Animation => "animation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "photo" => Some(MediaKind::Photo),
            "video" => Some(MediaKind::Video),
            "document" => Some(MediaKind::Document),
            "audio" => Some(MediaKind::Audio),
            "animation" => Some(MediaKind::Animation),
            _ => None,
        }
    }

    pub fn supports_grouping(&self) -> bool {
        matches!(self, MediaKind::Photo | MediaKind::Video)
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            MediaKind::Photo => "🖼",
            MediaKind::Video => "🎬",
            MediaKind::Document => "📄",
            MediaKind::Audio => "🎵",
            MediaKind::Animation => "🎞",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PostMedia {
    pub id: i64,
    pub post_id: i64,
    /// Transient delivery handle understood by the transport.
    pub file_id: String,
    /// Stable content-identity handle.
    pub file_unique_id: String,
    pub kind: String,
    pub caption: Option<String>,
    pub position: i64,
    pub created_at: String,
}

/// A media attachment that has not been persisted yet. Also the shape the
/// media aggregator emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMediaItem {
    pub file_id: String,
    pub file_unique_id: String,
    pub kind: MediaKind,
    pub caption: Option<String>,
}

impl PostMedia {
    pub fn kind(&self) -> MediaKind {
        MediaKind::parse(&self.kind).unwrap_or(MediaKind::Photo)
    }

    pub async fn add(
        pool: &sqlx::SqlitePool,
        post_id: i64,
        item: &NewMediaItem,
        position: i64,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO post_media (post_id, file_id, file_unique_id, kind, caption, position, \
             created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(post_id)
        .bind(&item.file_id)
        .bind(&item.file_unique_id)
        .bind(item.kind.as_str())
        .bind(&item.caption)
        .bind(position)
        .bind(&now)
        .execute(pool)
        .await?;

        let id = result.last_insert_rowid();
        sqlx::query_as::<_, PostMedia>(
            "SELECT id, post_id, file_id, file_unique_id, kind, caption, position, created_at \
             FROM post_media WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn list_by_post(
        pool: &sqlx::SqlitePool,
        post_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PostMedia>(
            "SELECT id, post_id, file_id, file_unique_id, kind, caption, position, created_at \
             FROM post_media WHERE post_id = ? ORDER BY position",
        )
        .bind(post_id)
        .fetch_all(pool)
        .await
    }

    /// Remove every media item of a post. Returns how many rows went away.
    pub async fn delete_by_post(
        pool: &sqlx::SqlitePool,
        post_id: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM post_media WHERE post_id = ?")
            .bind(post_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(pool: &sqlx::SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM post_media")
            .fetch_one(pool)
            .await
    }
}
