use channel_post_bot::bot::wizard_draft::{ScheduleChoice, WizardDraft, MEDIA_CAP};
use channel_post_bot::database::models::{MediaKind, NewMediaItem};
use chrono::Utc;
use teloxide::types::{MessageEntity, MessageEntityKind};

fn photo(n: u32) -> NewMediaItem {
    NewMediaItem {
        file_id: format!("photo-{n}"),
        file_unique_id: format!("unique-{n}"),
        kind: MediaKind::Photo,
        caption: None,
    }
}

fn document(n: u32) -> NewMediaItem {
    NewMediaItem {
        file_id: format!("doc-{n}"),
        file_unique_id: format!("unique-doc-{n}"),
        kind: MediaKind::Document,
        caption: None,
    }
}

#[test]
fn test_with_text() {
    let entities = vec![MessageEntity {
        kind: MessageEntityKind::Bold,
        offset: 0,
        length: 6,
    }];
    let draft = WizardDraft::with_text("Привет мир".to_string(), entities.clone());

    assert_eq!(draft.text.as_deref(), Some("Привет мир"));
    assert_eq!(draft.entities, entities);
    assert!(draft.media.is_empty());
    assert!(!draft.is_empty());
}

#[test]
fn test_with_media_promotes_first_caption_to_text() {
    let mut first = photo(1);
    first.caption = Some("Подпись альбома".to_string());
    let draft = WizardDraft::with_media(vec![first, photo(2)], Vec::new());

    assert_eq!(draft.text.as_deref(), Some("Подпись альбома"));
    assert_eq!(draft.media.len(), 2);
}

#[test]
fn test_media_cap_enforced() {
    let mut draft = WizardDraft::default();

    let added = draft.add_media((0..7).map(photo).collect());
    assert_eq!(added.accepted, 7);
    assert_eq!(added.total, 7);
    assert!(!added.at_cap);

    // Offering 5 more only accepts up to the cap
    let added = draft.add_media((7..12).map(photo).collect());
    assert_eq!(added.accepted, 3);
    assert_eq!(added.total, MEDIA_CAP);
    assert!(added.at_cap);
    assert_eq!(draft.media.len(), MEDIA_CAP);

    // Arrival order is preserved
    let ids: Vec<&str> = draft.media.iter().map(|m| m.file_id.as_str()).collect();
    assert_eq!(ids[0], "photo-0");
    assert_eq!(ids[9], "photo-9");
}

#[test]
fn test_album_extension_rules() {
    // Photos and videos can grow into an album
    let draft = WizardDraft::with_media(vec![photo(1)], Vec::new());
    assert!(draft.can_extend_album());

    // Documents never form albums
    let draft = WizardDraft::with_media(vec![document(1)], Vec::new());
    assert!(!draft.can_extend_album());

    // A full album cannot grow
    let mut draft = WizardDraft::default();
    draft.add_media((0..MEDIA_CAP as u32).map(photo).collect());
    assert!(!draft.can_extend_album());
}

#[test]
fn test_button_lines_become_rows() {
    let mut draft = WizardDraft::with_text("текст".to_string(), Vec::new());

    let added = draft
        .add_button_lines("Первая - https://example.com/1\nВторая - https://example.com/2")
        .unwrap();
    assert_eq!(added, 2);
    assert_eq!(draft.buttons[0].row, 0);
    assert_eq!(draft.buttons[1].row, 1);

    // A later submission continues the row numbering
    let added = draft
        .add_button_lines("Третья - https://example.com/3")
        .unwrap();
    assert_eq!(added, 1);
    assert_eq!(draft.buttons[2].row, 2);
    assert_eq!(draft.buttons[2].position, 0);
}

#[test]
fn test_zero_valid_button_lines_is_an_error() {
    let mut draft = WizardDraft::with_text("текст".to_string(), Vec::new());

    let result = draft.add_button_lines("просто текст\nещё мусор");
    assert!(result.is_err());
    // The draft is left unchanged
    assert!(draft.buttons.is_empty());
}

#[test]
fn test_valid_lines_survive_invalid_neighbours() {
    let mut draft = WizardDraft::with_text("текст".to_string(), Vec::new());

    let added = draft
        .add_button_lines("мусор\nХорошая - https://example.com\nПлохая - nope")
        .unwrap();
    assert_eq!(added, 1);
    assert_eq!(draft.buttons.len(), 1);
    assert_eq!(draft.buttons[0].label, "Хорошая");
}

#[test]
fn test_to_content_mirrors_draft() {
    let mut draft = WizardDraft::with_text("пост".to_string(), Vec::new());
    draft.add_media(vec![photo(1), photo(2)]);
    draft
        .add_button_lines("Кнопка - https://example.com")
        .unwrap();
    draft.schedule = Some(ScheduleChoice::At(Utc::now()));

    let content = draft.to_content();
    assert_eq!(content.text.as_deref(), Some("пост"));
    assert_eq!(content.media.len(), 2);
    assert_eq!(content.buttons.len(), 1);
    assert!(content.disable_link_preview);
}

#[test]
fn test_empty_draft_detection() {
    assert!(WizardDraft::default().is_empty());
    assert!(WizardDraft::with_text(String::new(), Vec::new()).is_empty());
    assert!(!WizardDraft::with_media(vec![photo(1)], Vec::new()).is_empty());
}
