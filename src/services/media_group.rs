use crate::database::models::{MediaKind, NewMediaItem};
use std::collections::HashMap;
use std::time::Duration;
use teloxide::types::Message;
use tokio::sync::Mutex;

/// Outcome of observing one inbound message.
#[derive(Debug, PartialEq, Eq)]
pub enum Observed {
    /// A single ungrouped attachment, returned immediately.
    Single(Vec<NewMediaItem>),
    /// A finished album: this caller won finalization for its group.
    Album(Vec<NewMediaItem>),
    /// The message joined an album that another caller will finalize.
    Pending,
    /// The message carried no supported media.
    NotMedia,
}

/// Collects the messages of one Telegram media group (album) into a single
/// ordered media list.
///
/// Telegram delivers an album as a burst of separate messages sharing a
/// `media_group_id`. Each observed message joins a per-group accumulator and
/// waits the debounce window; whichever caller still finds the accumulator
/// afterwards pops it and returns the full list, so finalization happens at
/// most once per group. Items are ordered by message id (arrival sequence),
/// not by receipt order.
///
/// The accumulator table sits behind a single mutex with short critical
/// sections; the lock is never held across the debounce wait.
pub struct MediaGroupManager {
    collectors: Mutex<HashMap<String, Vec<(i32, NewMediaItem)>>>,
    debounce: Duration,
}

impl MediaGroupManager {
    pub fn new(debounce: Duration) -> Self {
        Self {
            collectors: Mutex::new(HashMap::new()),
            debounce,
        }
    }

    pub async fn observe(&self, message: &Message) -> Observed {
        let Some(item) = extract_media(message) else {
            return Observed::NotMedia;
        };
        let group_id = message.media_group_id().map(|id| id.to_string());
        self.observe_item(group_id, message.id.0, item).await
    }

    /// Lower-level entry point taking the group correlation id and arrival
    /// sequence number directly.
    pub async fn observe_item(
        &self,
        group_id: Option<String>,
        sequence: i32,
        item: NewMediaItem,
    ) -> Observed {
        let Some(group_id) = group_id else {
            return Observed::Single(vec![item]);
        };

        {
            let mut collectors = self.collectors.lock().await;
            collectors
                .entry(group_id.clone())
                .or_default()
                .push((sequence, item));
        }

        tokio::time::sleep(self.debounce).await;

        let mut collectors = self.collectors.lock().await;
        match collectors.remove(&group_id) {
            Some(mut entries) => {
                entries.sort_by_key(|(sequence, _)| *sequence);
                Observed::Album(entries.into_iter().map(|(_, item)| item).collect())
            }
            // An earlier caller already finalized this group
            None => Observed::Pending,
        }
    }
}

/// Extract the media payload of a message, if any. For photos the highest
/// resolution variant is used.
pub fn extract_media(message: &Message) -> Option<NewMediaItem> {
    let caption = message.caption().map(|c| c.to_string());

    if let Some(photos) = message.photo() {
        let photo = photos.last()?;
        return Some(NewMediaItem {
            file_id: photo.file.id.clone(),
            file_unique_id: photo.file.unique_id.clone(),
            kind: MediaKind::Photo,
            caption,
        });
    }
    if let Some(video) = message.video() {
        return Some(NewMediaItem {
            file_id: video.file.id.clone(),
            file_unique_id: video.file.unique_id.clone(),
            kind: MediaKind::Video,
            caption,
        });
    }
    if let Some(document) = message.document() {
        return Some(NewMediaItem {
            file_id: document.file.id.clone(),
            file_unique_id: document.file.unique_id.clone(),
            kind: MediaKind::Document,
            caption,
        });
    }
    if let Some(audio) = message.audio() {
        return Some(NewMediaItem {
            file_id: audio.file.id.clone(),
            file_unique_id: audio.file.unique_id.clone(),
            kind: MediaKind::Audio,
            caption,
        });
    }
    if let Some(animation) = message.animation() {
        return Some(NewMediaItem {
            file_id: animation.file.id.clone(),
            file_unique_id: animation.file.unique_id.clone(),
            kind: MediaKind::Animation,
            caption,
        });
    }

    None
}
