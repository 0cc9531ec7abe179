use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Inline URL button attached to a post. Buttons with the same `row`
/// render on one keyboard line, ordered by `position`; rows render
/// top-to-bottom.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostButton {
    pub id: i64,
    pub post_id: i64,
    pub label: String,
    pub url: String,
    pub row: i64,
    pub position: i64,
    pub created_at: String,
}

// The `FromRow` derive macro binds a local named `row` per field, so a
// field literally named `row` shadows the row handle and breaks the
// generated `try_get` calls for the remaining fields. Provide the
// equivalent implementation explicitly instead.
impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for PostButton {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(PostButton {
            id: row.try_get("id")?,
            post_id: row.try_get("post_id")?,
            label: row.try_get("label")?,
            url: row.try_get("url")?,
            row: row.try_get("row")?,
            position: row.try_get("position")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// A button that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewButtonItem {
    pub label: String,
    pub url: String,
    pub row: i64,
    pub position: i64,
}

impl From<&PostButton> for NewButtonItem {
    fn from(button: &PostButton) -> Self {
        NewButtonItem {
            label: button.label.clone(),
            url: button.url.clone(),
            row: button.row,
            position: button.position,
        }
    }
}

impl PostButton {
    pub async fn add(
        pool: &sqlx::SqlitePool,
        post_id: i64,
        item: &NewButtonItem,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO post_buttons (post_id, label, url, \"row\", position, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(post_id)
        .bind(&item.label)
        .bind(&item.url)
        .bind(item.row)
        .bind(item.position)
        .bind(&now)
        .execute(pool)
        .await?;

        let id = result.last_insert_rowid();
        sqlx::query_as::<_, PostButton>(
            "SELECT id, post_id, label, url, \"row\", position, created_at \
             FROM post_buttons WHERE id = ?",
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
        sqlx::query_as::<_, PostButton>(
            "SELECT id, post_id, label, url, \"row\", position, created_at \
             FROM post_buttons WHERE post_id = ? ORDER BY \"row\", position",
        )
        .bind(post_id)
        .fetch_all(pool)
        .await
    }

    /// Replace the whole button set of a post in one transaction.
    pub async fn replace_for_post(
        pool: &sqlx::SqlitePool,
        post_id: i64,
        items: &[NewButtonItem],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM post_buttons WHERE post_id = ?")
            .bind(post_id)
            .execute(&mut tx)
            .await?;
        for item in items {
            sqlx::query(
                "INSERT INTO post_buttons (post_id, label, url, \"row\", position, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(post_id)
            .bind(&item.label)
            .bind(&item.url)
            .bind(item.row)
            .bind(item.position)
            .bind(&now)
            .execute(&mut tx)
            .await?;
        }
        tx.commit().await?;
        Self::list_by_post(pool, post_id).await
    }

    /// Remove a single button. Returns whether a row was removed.
    pub async fn delete(pool: &sqlx::SqlitePool, button_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM post_buttons WHERE id = ?")
            .bind(button_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(pool: &sqlx::SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM post_buttons")
            .fetch_one(pool)
            .await
    }
}
