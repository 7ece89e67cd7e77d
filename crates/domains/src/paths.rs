//! # Store Paths
//!
//! Slash-joined keys into the realtime store and the media store. These are
//! the exact strings an existing store population was written under, so every
//! constructor here is byte-for-byte load-bearing.

use std::fmt;

/// A path into the realtime key/value tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DbPath(String);

impl DbPath {
    /// Escape hatch for callers that already hold a raw key.
    pub fn raw(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// `bottles`, the whole discovery collection.
    pub fn bottles_root() -> Self {
        Self("bottles".to_string())
    }

    /// `bottles/{id}`
    pub fn bottle(id: &str) -> Self {
        Self(format!("bottles/{id}"))
    }

    /// `bottles/{id}/status`
    pub fn bottle_status(id: &str) -> Self {
        Self(format!("bottles/{id}/status"))
    }

    /// `bottle_openers/{bottleId}/{uid}`
    pub fn bottle_opener(bottle_id: &str, uid: &str) -> Self {
        Self(format!("bottle_openers/{bottle_id}/{uid}"))
    }

    /// `chats/{bottleId}`, a bottle's whole chat room.
    pub fn chat_room(bottle_id: &str) -> Self {
        Self(format!("chats/{bottle_id}"))
    }

    /// `chats/{bottleId}/{messageId}`
    pub fn chat_message(bottle_id: &str, message_id: &str) -> Self {
        Self(format!("chats/{bottle_id}/{message_id}"))
    }

    /// `presence/{bottleId}`, everyone currently inside a bottle.
    pub fn presence_room(bottle_id: &str) -> Self {
        Self(format!("presence/{bottle_id}"))
    }

    /// `presence/{bottleId}/{uid}`
    pub fn presence(bottle_id: &str, uid: &str) -> Self {
        Self(format!("presence/{bottle_id}/{uid}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Paths into the blob/media store.
pub mod storage {
    /// `bottles/{bottleId}/assets/{filename}`
    pub fn bottle_asset(bottle_id: &str, filename: &str) -> String {
        format!("bottles/{bottle_id}/assets/{filename}")
    }

    /// `chats/{bottleId}/media/{messageId}_{filename}`
    pub fn chat_media(bottle_id: &str, message_id: &str, filename: &str) -> String {
        format!("chats/{bottle_id}/media/{message_id}_{filename}")
    }
}
