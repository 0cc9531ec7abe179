use channel_post_bot::database::models::{MediaKind, NewButtonItem, NewMediaItem};
use channel_post_bot::services::publishing::{
    build_keyboard, build_send_plan, PostContent, SendPlan,
};
use teloxide::types::InlineKeyboardButtonKind;

fn media(n: u32, kind: MediaKind) -> NewMediaItem {
    NewMediaItem {
        file_id: format!("file-{n}"),
        file_unique_id: format!("unique-{n}"),
        kind,
        caption: None,
    }
}

fn button(label: &str, url: &str, row: i64, position: i64) -> NewButtonItem {
    NewButtonItem {
        label: label.to_string(),
        url: url.to_string(),
        row,
        position,
    }
}

fn content(
    text: Option<&str>,
    media: Vec<NewMediaItem>,
    buttons: Vec<NewButtonItem>,
) -> PostContent {
    PostContent {
        text: text.map(str::to_string),
        entities: Vec::new(),
        media,
        buttons,
        disable_link_preview: true,
        disable_notification: false,
    }
}

#[test]
fn test_empty_post_is_rejected() {
    assert!(build_send_plan(&content(None, vec![], vec![])).is_err());
    assert!(build_send_plan(&content(Some(""), vec![], vec![])).is_err());
}

#[test]
fn test_text_only_post() {
    let plan = build_send_plan(&content(
        Some("Привет"),
        vec![],
        vec![button("A", "https://example.com", 0, 0)],
    ))
    .unwrap();

    match plan {
        SendPlan::Text {
            text,
            keyboard,
            disable_link_preview,
            ..
        } => {
            assert_eq!(text, "Привет");
            assert!(keyboard.is_some());
            assert!(disable_link_preview);
        }
        other => panic!("expected Text plan, got {other:?}"),
    }
}

#[test]
fn test_single_media_uses_text_as_caption_and_keeps_keyboard() {
    let plan = build_send_plan(&content(
        Some("Подпись"),
        vec![media(1, MediaKind::Photo)],
        vec![button("A", "https://example.com", 0, 0)],
    ))
    .unwrap();

    match plan {
        SendPlan::SingleMedia {
            media,
            caption,
            keyboard,
            ..
        } => {
            assert_eq!(media.file_id, "file-1");
            assert_eq!(caption.as_deref(), Some("Подпись"));
            // One media item: the keyboard rides on the same message
            assert!(keyboard.is_some());
        }
        other => panic!("expected SingleMedia plan, got {other:?}"),
    }
}

#[test]
fn test_sole_media_own_caption_fallback() {
    let mut item = media(1, MediaKind::Document);
    item.caption = Some("своя подпись".to_string());

    let plan = build_send_plan(&content(None, vec![item], vec![])).unwrap();
    match plan {
        SendPlan::SingleMedia { caption, .. } => {
            assert_eq!(caption.as_deref(), Some("своя подпись"));
        }
        other => panic!("expected SingleMedia plan, got {other:?}"),
    }
}

#[test]
fn test_album_with_buttons_gets_trailing_keyboard() {
    // Exactly 2 media + non-empty buttons: one grouped delivery plus one
    // trailing keyboard-only message, never a keyboard on the group itself
    let plan = build_send_plan(&content(
        Some("Текст альбома"),
        vec![media(1, MediaKind::Photo), media(2, MediaKind::Video)],
        vec![button("A", "https://example.com", 0, 0)],
    ))
    .unwrap();

    match plan {
        SendPlan::Album {
            items,
            caption,
            keyboard,
            ..
        } => {
            assert_eq!(items.len(), 2);
            assert_eq!(items[0].file_id, "file-1");
            assert_eq!(items[1].file_id, "file-2");
            // Caption attaches only to the first item at execution time
            assert_eq!(caption.as_deref(), Some("Текст альбома"));
            assert!(keyboard.is_some());
        }
        other => panic!("expected Album plan, got {other:?}"),
    }
}

#[test]
fn test_album_without_buttons_has_no_trailing_message() {
    let plan = build_send_plan(&content(
        None,
        vec![media(1, MediaKind::Photo), media(2, MediaKind::Photo)],
        vec![],
    ))
    .unwrap();

    match plan {
        SendPlan::Album { keyboard, caption, .. } => {
            assert!(keyboard.is_none());
            assert!(caption.is_none());
        }
        other => panic!("expected Album plan, got {other:?}"),
    }
}

#[test]
fn test_keyboard_rows_and_positions() {
    let keyboard = build_keyboard(&[
        button("второй", "https://example.com/2", 0, 1),
        button("первый", "https://example.com/1", 0, 0),
        button("нижний", "https://example.com/3", 1, 0),
    ])
    .unwrap();

    let rows = &keyboard.inline_keyboard;
    assert_eq!(rows.len(), 2);
    // Same row renders on one line in position order
    assert_eq!(rows[0].len(), 2);
    assert_eq!(rows[0][0].text, "первый");
    assert_eq!(rows[0][1].text, "второй");
    // Rows render top-to-bottom in row order
    assert_eq!(rows[1].len(), 1);
    assert_eq!(rows[1][0].text, "нижний");

    match &rows[0][0].kind {
        InlineKeyboardButtonKind::Url(url) => {
            assert_eq!(url.as_str(), "https://example.com/1");
        }
        other => panic!("expected Url button, got {other:?}"),
    }
}

#[test]
fn test_empty_button_set_yields_no_keyboard() {
    assert!(build_keyboard(&[]).is_none());
}
