//! Argument types for the typed command API.
//!
//! Enum values go out in lowercase (`replace_next`, `podcast_episode`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    Off,
    One,
    All,
}

/// Where `play_media` puts the new items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueOption {
    Play,
    Replace,
    Next,
    ReplaceNext,
    Add,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Artist,
    Album,
    Track,
    Playlist,
    Radio,
    Audiobook,
    Podcast,
    PodcastEpisode,
    Folder,
    Unknown,
}

/// Filters for the `music/*/library_items` queries.
///
/// Unset fields are sent as `null` and the server applies its defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryQuery {
    pub favorite: Option<bool>,
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub order_by: Option<String>,
}

impl LibraryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn favorite(mut self, favorite: bool) -> Self {
        self.favorite = Some(favorite);
        self
    }

    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Sets limit and offset.
    #[must_use]
    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }
}

/// Arguments of `player_queues/play_media`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayMedia {
    /// Media URIs or item ids.
    pub media: Vec<String>,
    pub option: Option<QueueOption>,
    pub radio_mode: Option<bool>,
    /// Item to start playback from.
    pub start_item: Option<String>,
}

impl PlayMedia {
    pub fn new<I, S>(media: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            media: media.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn option(mut self, option: QueueOption) -> Self {
        self.option = Some(option);
        self
    }

    #[must_use]
    pub fn radio_mode(mut self, radio_mode: bool) -> Self {
        self.radio_mode = Some(radio_mode);
        self
    }

    #[must_use]
    pub fn start_item(mut self, item: impl Into<String>) -> Self {
        self.start_item = Some(item.into());
        self
    }
}
