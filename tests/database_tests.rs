use anyhow::Result;
use channel_post_bot::database::{connection::DatabaseManager, models::*};
use chrono::{Duration, Utc};
use tempfile::{tempdir, TempDir};
use teloxide::types::{MessageEntity, MessageEntityKind};

async fn setup_test_db() -> Result<(DatabaseManager, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    Ok((db_manager, temp_dir))
}

fn sample_post(author_id: i64, text: &str) -> NewPost {
    NewPost {
        author_id,
        author_username: Some("tester".to_string()),
        text: Some(text.to_string()),
        text_entities: Vec::new(),
        disable_link_preview: true,
        disable_notification: false,
    }
}

fn media_item(n: u32, kind: MediaKind) -> NewMediaItem {
    NewMediaItem {
        file_id: format!("file-{n}"),
        file_unique_id: format!("unique-{n}"),
        kind,
        caption: None,
    }
}

fn button_item(label: &str, row: i64) -> NewButtonItem {
    NewButtonItem {
        label: label.to_string(),
        url: format!("https://example.com/{row}"),
        row,
        position: 0,
    }
}

#[tokio::test]
async fn test_create_draft_post_defaults() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let post = Post::create(&db.pool, &sample_post(123456789, "Test post content")).await?;

    assert_eq!(post.author_id, 123456789);
    assert_eq!(post.author_username.as_deref(), Some("tester"));
    assert_eq!(post.text.as_deref(), Some("Test post content"));
    assert_eq!(post.status(), PostStatus::Draft);
    assert!(post.scheduled_at.is_none());
    assert!(post.scheduler_job_id.is_none());
    assert!(post.published_message_id.is_none());
    assert!(post.disable_link_preview);
    assert!(!post.disable_notification);
    assert!(!post.created_at.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_find_nonexistent_post() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    assert!(Post::find_by_id(&db.pool, 999999).await?.is_none());
    assert!(Post::load_graph(&db.pool, 999999).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_create_with_content_full_graph() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let media = vec![
        media_item(1, MediaKind::Photo),
        media_item(2, MediaKind::Video),
        media_item(3, MediaKind::Photo),
    ];
    let buttons = vec![button_item("Сайт", 0), button_item("Канал", 1)];

    let post = Post::create_with_content(&db.pool, &sample_post(42, "Album"), &media, &buttons)
        .await?;
    let graph = Post::load_graph(&db.pool, post.id).await?.unwrap();

    assert_eq!(graph.media.len(), 3);
    // Media positions are dense and follow array order
    for (index, item) in graph.media.iter().enumerate() {
        assert_eq!(item.position, index as i64);
        assert_eq!(item.file_id, format!("file-{}", index + 1));
    }
    assert_eq!(graph.media[1].kind(), MediaKind::Video);

    assert_eq!(graph.buttons.len(), 2);
    assert_eq!(graph.buttons[0].label, "Сайт");
    assert_eq!(graph.buttons[0].row, 0);
    assert_eq!(graph.buttons[1].row, 1);

    Ok(())
}

#[tokio::test]
async fn test_text_entities_roundtrip() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let post = Post::create(&db.pool, &sample_post(1, "bold text")).await?;
    let entities = vec![MessageEntity {
        kind: MessageEntityKind::Bold,
        offset: 0,
        length: 4,
    }];

    let updated = Post::update_text(&db.pool, post.id, Some("bold text"), &entities).await?;
    assert_eq!(updated.entities(), entities);

    // Clearing entities stores NULL
    let cleared = Post::update_text(&db.pool, post.id, Some("plain"), &[]).await?;
    assert!(cleared.text_entities.is_none());
    assert!(cleared.entities().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_list_by_author_ordering_and_filter() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let first = Post::create(&db.pool, &sample_post(7, "first")).await?;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = Post::create(&db.pool, &sample_post(7, "second")).await?;
    let foreign = Post::create(&db.pool, &sample_post(8, "other author")).await?;

    Post::mark_published(&db.pool, foreign.id, 555, Utc::now()).await?;

    let mine = Post::list_by_author(&db.pool, 7, None, 50, 0).await?;
    assert_eq!(mine.len(), 2);
    // Creation-time descending: newest first
    assert_eq!(mine[0].id, second.id);
    assert_eq!(mine[1].id, first.id);

    let drafts = Post::list_by_author(&db.pool, 7, Some(PostStatus::Draft), 50, 0).await?;
    assert_eq!(drafts.len(), 2);
    let published = Post::list_by_author(&db.pool, 8, Some(PostStatus::Published), 50, 0).await?;
    assert_eq!(published.len(), 1);

    let all = Post::list_all(&db.pool, None, 50, 0).await?;
    assert_eq!(all.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_list_scheduled_and_due_ordering() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let now = Utc::now();

    let overdue_far = Post::create(&db.pool, &sample_post(1, "overdue far")).await?;
    let overdue_near = Post::create(&db.pool, &sample_post(1, "overdue near")).await?;
    let future = Post::create(&db.pool, &sample_post(1, "future")).await?;

    Post::mark_scheduled(&db.pool, overdue_far.id, now - Duration::hours(2), "publish-post-a")
        .await?;
    Post::mark_scheduled(&db.pool, overdue_near.id, now - Duration::hours(1), "publish-post-b")
        .await?;
    Post::mark_scheduled(&db.pool, future.id, now + Duration::hours(1), "publish-post-c").await?;

    let scheduled = Post::list_scheduled(&db.pool).await?;
    assert_eq!(scheduled.len(), 3);
    assert_eq!(scheduled[0].id, overdue_far.id);
    assert_eq!(scheduled[2].id, future.id);

    let due = Post::list_due(&db.pool, now).await?;
    assert_eq!(due.len(), 2);
    // Earliest due first
    assert_eq!(due[0].id, overdue_far.id);
    assert_eq!(due[1].id, overdue_near.id);

    Ok(())
}

#[tokio::test]
async fn test_schedule_and_unschedule_transitions() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let at = Utc::now() + Duration::hours(3);

    let post = Post::create(&db.pool, &sample_post(1, "to schedule")).await?;

    let scheduled = Post::mark_scheduled(&db.pool, post.id, at, "publish-post-1").await?;
    assert_eq!(scheduled.status(), PostStatus::Scheduled);
    assert_eq!(
        scheduled.scheduled_at_utc().map(|dt| dt.timestamp()),
        Some(at.timestamp())
    );
    assert_eq!(scheduled.scheduler_job_id.as_deref(), Some("publish-post-1"));

    let draft = Post::unschedule(&db.pool, post.id).await?;
    assert_eq!(draft.status(), PostStatus::Draft);
    assert!(draft.scheduled_at.is_none());
    assert!(draft.scheduler_job_id.is_none());

    Ok(())
}

#[tokio::test]
async fn test_publish_clears_schedule_fields() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let post = Post::create(&db.pool, &sample_post(1, "scheduled then published")).await?;
    Post::mark_scheduled(&db.pool, post.id, Utc::now() + Duration::hours(1), "publish-post-x")
        .await?;

    let published = Post::mark_published(&db.pool, post.id, 777, Utc::now()).await?;
    assert_eq!(published.status(), PostStatus::Published);
    assert_eq!(published.published_message_id, Some(777));
    assert!(published.published_at.is_some());
    assert!(published.scheduled_at.is_none());
    assert!(published.scheduler_job_id.is_none());

    Ok(())
}

#[tokio::test]
async fn test_illegal_transitions_rejected() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let post = Post::create(&db.pool, &sample_post(1, "published")).await?;
    Post::mark_published(&db.pool, post.id, 10, Utc::now()).await?;

    // No way out of published except the idempotent re-save
    assert!(Post::mark_scheduled(&db.pool, post.id, Utc::now(), "j").await.is_err());
    assert!(Post::unschedule(&db.pool, post.id).await.is_err());
    assert!(Post::mark_failed(&db.pool, post.id).await.is_err());
    assert!(Post::retry_as_draft(&db.pool, post.id).await.is_err());
    assert!(Post::mark_published(&db.pool, post.id, 10, Utc::now()).await.is_ok());

    // The row is untouched by the rejected updates
    let reloaded = Post::find_by_id(&db.pool, post.id).await?.unwrap();
    assert_eq!(reloaded.status(), PostStatus::Published);
    assert_eq!(reloaded.published_message_id, Some(10));

    Ok(())
}

#[tokio::test]
async fn test_failed_retry_cycle() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let post = Post::create(&db.pool, &sample_post(1, "will fail")).await?;
    Post::mark_scheduled(&db.pool, post.id, Utc::now(), "publish-post-f").await?;

    let failed = Post::mark_failed(&db.pool, post.id).await?;
    assert_eq!(failed.status(), PostStatus::Failed);
    assert!(failed.scheduled_at.is_none());
    assert!(failed.scheduler_job_id.is_none());

    // Retry is a manual failed -> draft transition
    assert!(Post::retry_as_draft(&db.pool, post.id).await.is_ok());
    let draft = Post::find_by_id(&db.pool, post.id).await?.unwrap();
    assert_eq!(draft.status(), PostStatus::Draft);
    // A draft cannot be "retried"
    assert!(Post::retry_as_draft(&db.pool, post.id).await.is_err());

    Ok(())
}

#[tokio::test]
async fn test_delete_cascades_to_media_and_buttons() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let keep = Post::create_with_content(
        &db.pool,
        &sample_post(1, "keep"),
        &[media_item(1, MediaKind::Photo)],
        &[button_item("A", 0)],
    )
    .await?;
    let doomed = Post::create_with_content(
        &db.pool,
        &sample_post(1, "doomed"),
        &[media_item(2, MediaKind::Photo), media_item(3, MediaKind::Video)],
        &[button_item("B", 0), button_item("C", 1)],
    )
    .await?;

    assert_eq!(PostMedia::count(&db.pool).await?, 3);
    assert_eq!(PostButton::count(&db.pool).await?, 3);

    assert!(Post::delete(&db.pool, doomed.id).await?);

    // Counts drop by exactly the deleted post's share
    assert_eq!(PostMedia::count(&db.pool).await?, 1);
    assert_eq!(PostButton::count(&db.pool).await?, 1);
    assert!(PostMedia::list_by_post(&db.pool, doomed.id).await?.is_empty());
    assert!(PostButton::list_by_post(&db.pool, doomed.id).await?.is_empty());
    assert!(Post::find_by_id(&db.pool, doomed.id).await?.is_none());

    // The surviving post is intact
    let graph = Post::load_graph(&db.pool, keep.id).await?.unwrap();
    assert_eq!(graph.media.len(), 1);
    assert_eq!(graph.buttons.len(), 1);

    // Deleting again reports nothing removed
    assert!(!Post::delete(&db.pool, doomed.id).await?);

    Ok(())
}

#[tokio::test]
async fn test_relation_scoped_removal() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let post = Post::create_with_content(
        &db.pool,
        &sample_post(1, "relations"),
        &[media_item(1, MediaKind::Photo), media_item(2, MediaKind::Photo)],
        &[button_item("A", 0), button_item("B", 1)],
    )
    .await?;

    let removed_media = PostMedia::delete_by_post(&db.pool, post.id).await?;
    assert_eq!(removed_media, 2);
    assert!(PostMedia::list_by_post(&db.pool, post.id).await?.is_empty());

    let buttons = PostButton::list_by_post(&db.pool, post.id).await?;
    assert!(PostButton::delete(&db.pool, buttons[0].id).await?);
    assert!(!PostButton::delete(&db.pool, buttons[0].id).await?);
    assert_eq!(PostButton::list_by_post(&db.pool, post.id).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_replace_buttons() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let post = Post::create_with_content(
        &db.pool,
        &sample_post(1, "buttons"),
        &[],
        &[button_item("Old", 0)],
    )
    .await?;

    let replaced = PostButton::replace_for_post(
        &db.pool,
        post.id,
        &[button_item("New 1", 0), button_item("New 2", 1)],
    )
    .await?;

    assert_eq!(replaced.len(), 2);
    assert_eq!(replaced[0].label, "New 1");
    assert_eq!(PostButton::count(&db.pool).await?, 2);

    Ok(())
}
