//! Event names pushed by the server.
//!
//! Not exhaustive; the server may send names not listed here and they are
//! delivered like any other.

pub const PLAYER_ADDED: &str = "player_added";
pub const PLAYER_UPDATED: &str = "player_updated";
pub const PLAYER_REMOVED: &str = "player_removed";

pub const QUEUE_ADDED: &str = "queue_added";
pub const QUEUE_UPDATED: &str = "queue_updated";
pub const QUEUE_ITEMS_UPDATED: &str = "queue_items_updated";
pub const QUEUE_TIME_UPDATED: &str = "queue_time_updated";

pub const MEDIA_ITEM_ADDED: &str = "media_item_added";
pub const MEDIA_ITEM_UPDATED: &str = "media_item_updated";
pub const MEDIA_ITEM_DELETED: &str = "media_item_deleted";

pub const SYNC_TASKS_UPDATED: &str = "sync_tasks_updated";

/// Sent right before the server goes away.
pub const SHUTDOWN: &str = "shutdown";
