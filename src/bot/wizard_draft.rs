use crate::database::models::{NewButtonItem, NewMediaItem};
use crate::services::publishing::PostContent;
use crate::utils::buttons::parse_button_lines;
use crate::utils::errors::BotError;
use chrono::{DateTime, Utc};
use teloxide::types::MessageEntity;

/// Maximum number of media items in one post (Telegram album limit).
pub const MEDIA_CAP: usize = 10;

/// Publication time recorded at the schedule step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleChoice {
    /// Publish immediately on save.
    Now,
    At(DateTime<Utc>),
}

/// Result of adding media to the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaAdded {
    /// How many of the offered items were actually accepted.
    pub accepted: usize,
    pub total: usize,
    /// The cap was reached, the wizard must advance.
    pub at_cap: bool,
}

/// In-memory accumulator of one composition flow. Nothing here is
/// persisted until the confirmation step; cancelling simply drops it.
#[derive(Debug, Clone, Default)]
pub struct WizardDraft {
    pub text: Option<String>,
    pub entities: Vec<MessageEntity>,
    pub media: Vec<NewMediaItem>,
    pub buttons: Vec<NewButtonItem>,
    pub schedule: Option<ScheduleChoice>,
}

impl WizardDraft {
    pub fn with_text(text: String, entities: Vec<MessageEntity>) -> Self {
        WizardDraft {
            text: Some(text),
            entities,
            ..Default::default()
        }
    }

    /// Start a draft from the first media attachment(s). The caption of the
    /// first item becomes the post text.
    pub fn with_media(items: Vec<NewMediaItem>, caption_entities: Vec<MessageEntity>) -> Self {
        let text = items.first().and_then(|item| item.caption.clone());
        let mut draft = WizardDraft {
            text,
            entities: caption_entities,
            ..Default::default()
        };
        draft.add_media(items);
        draft
    }

    /// Append media in arrival order, up to [`MEDIA_CAP`] items total.
    pub fn add_media(&mut self, items: Vec<NewMediaItem>) -> MediaAdded {
        let mut accepted = 0;
        for item in items {
            if self.media.len() >= MEDIA_CAP {
                break;
            }
            self.media.push(item);
            accepted += 1;
        }
        MediaAdded {
            accepted,
            total: self.media.len(),
            at_cap: self.media.len() >= MEDIA_CAP,
        }
    }

    /// Whether more media can be collected into an album: only photos and
    /// videos group, and only below the cap.
    pub fn can_extend_album(&self) -> bool {
        self.media.len() < MEDIA_CAP
            && self
                .media
                .first()
                .is_some_and(|item| item.kind.supports_grouping())
    }

    /// Parse `label - url` lines and append them, one keyboard row per
    /// submitted line. Returns how many buttons were added; a submission
    /// with zero valid lines is an error and leaves the draft unchanged.
    pub fn add_button_lines(&mut self, input: &str) -> Result<usize, BotError> {
        let parsed = parse_button_lines(input);
        if parsed.is_empty() {
            return Err(BotError::Validation(
                "❌ Не удалось распознать ни одной кнопки.\n\n\
                 Используйте формат: <code>Текст - https://example.com</code>\n\
                 (каждая кнопка с новой строки)"
                    .to_string(),
            ));
        }

        let added = parsed.len();
        for button in parsed {
            self.buttons.push(NewButtonItem {
                label: button.label,
                url: button.url,
                row: self.buttons.len() as i64,
                position: 0,
            });
        }
        Ok(added)
    }

    /// Render view of the accumulated draft, shared by preview and (after
    /// persistence) publication.
    pub fn to_content(&self) -> PostContent {
        PostContent {
            text: self.text.clone(),
            entities: self.entities.clone(),
            media: self.media.clone(),
            buttons: self.buttons.clone(),
            disable_link_preview: true,
            disable_notification: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.as_deref().map_or(true, str::is_empty) && self.media.is_empty()
    }
}
