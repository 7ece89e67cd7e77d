//! # Chat Service
//!
//! Message traffic inside an unlocked bottle's room. Media bytes never pass
//! through here: callers upload through the `MediaStore` port first and send
//! the stored path.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use domains::error::{Result, StoreError};
use domains::models::{ChatMessage, ChatMessageRecord};
use domains::paths::DbPath;
use domains::ports::{Clock, Store};
use domains::time::to_timestamp;

type ChatMap = BTreeMap<String, ChatMessage>;

/// Colors assigned to chat avatars, indexed by [`avatar_color_index`].
pub static AVATAR_PALETTE: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec!["#2f6f8f", "#8f2f6f", "#6f8f2f", "#8f5a2f", "#2f8f7a", "#5a2f8f", "#8f2f39", "#39708f"]
});

/// Stable palette index for a viewer id: SHA-256 over the UTF-8 bytes,
/// reduced modulo the palette size. Identical across runtimes and runs,
/// unlike language-level string hashing.
pub fn avatar_color_index(uid: &str, palette_len: usize) -> usize {
    debug_assert!(palette_len > 0);
    let digest = Sha256::digest(uid.as_bytes());
    let seed = u64::from_be_bytes(digest[..8].try_into().expect("digest is 32 bytes"));
    (seed % palette_len as u64) as usize
}

pub struct ChatService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl ChatService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Stream of a bottle's whole room. Use [`collate`] to order a delivery.
    pub fn observe_messages(&self, bottle_id: &str) -> crate::snapshot::SnapshotStream<ChatMap> {
        crate::snapshot::SnapshotStream::open(self.store.as_ref(), &DbPath::chat_room(bottle_id))
    }

    pub async fn send_text(
        &self,
        bottle_id: &str,
        uid: &str,
        text: &str,
        distance_category: &str,
    ) -> Result<String> {
        self.send(
            bottle_id,
            ChatMessage {
                uid: uid.to_string(),
                text: Some(text.to_string()),
                image_path: None,
                audio_path: None,
                timestamp: to_timestamp(self.clock.now()),
                distance_category: distance_category.to_string(),
                translation_memory: None,
            },
        )
        .await
    }

    /// Sends a message referencing media already uploaded through the
    /// `MediaStore` port.
    pub async fn send_media(
        &self,
        bottle_id: &str,
        uid: &str,
        image_path: Option<String>,
        audio_path: Option<String>,
        distance_category: &str,
    ) -> Result<String> {
        self.send(
            bottle_id,
            ChatMessage {
                uid: uid.to_string(),
                text: None,
                image_path,
                audio_path,
                timestamp: to_timestamp(self.clock.now()),
                distance_category: distance_category.to_string(),
                translation_memory: None,
            },
        )
        .await
    }

    /// Removes a single message node. Media cleanup is the worker's job.
    pub async fn delete_message(&self, bottle_id: &str, message_id: &str) -> Result<()> {
        self.store.delete(&DbPath::chat_message(bottle_id, message_id)).await?;
        Ok(())
    }

    async fn send(&self, bottle_id: &str, message: ChatMessage) -> Result<String> {
        let message_id = Uuid::now_v7().to_string();
        let path = DbPath::chat_message(bottle_id, &message_id);

        let payload = serde_json::to_value(&message)
            .map_err(|source| StoreError::Encode { path: path.as_str().to_string(), source })?;
        self.store.set(&path, payload).await?;

        debug!(bottle_id, message_id, "chat message sent");
        Ok(message_id)
    }
}

/// Orders a room snapshot by timestamp, ties broken by message id.
pub fn collate(map: ChatMap) -> Vec<ChatMessageRecord> {
    let mut records: Vec<ChatMessageRecord> =
        map.into_iter().map(|(id, message)| ChatMessageRecord { id, message }).collect();
    records.sort_by(|a, b| {
        a.message
            .timestamp
            .partial_cmp(&b.message.timestamp)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_index_is_stable_and_in_range() {
        let palette_len = AVATAR_PALETTE.len();
        for uid in ["alice", "bob", "言葉", ""] {
            let first = avatar_color_index(uid, palette_len);
            assert_eq!(first, avatar_color_index(uid, palette_len));
            assert!(first < palette_len);
        }
    }

    #[test]
    fn avatar_index_matches_known_digest() {
        // SHA-256("alice") begins 0x2bd806c9..., fixed forever; the index
        // must never drift between releases.
        let expected =
            (0x2bd8_06c9_7f0e_00afu64 % AVATAR_PALETTE.len() as u64) as usize;
        assert_eq!(avatar_color_index("alice", AVATAR_PALETTE.len()), expected);
    }

    #[test]
    fn collate_orders_by_timestamp_then_id() {
        let mut map = ChatMap::new();
        for (id, ts) in [("m3", 30.0), ("m1", 10.0), ("m2", 10.0)] {
            map.insert(
                id.to_string(),
                ChatMessage {
                    uid: "u".into(),
                    text: Some(id.to_string()),
                    image_path: None,
                    audio_path: None,
                    timestamp: ts,
                    distance_category: "near".into(),
                    translation_memory: None,
                },
            );
        }

        let ids: Vec<_> = collate(map).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["m1", "m2", "m3"]);
    }
}
