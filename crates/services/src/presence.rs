//! # Presence
//!
//! Who is currently inside a bottle's chat, kept alive by a fixed-interval
//! heartbeat. The heartbeat runs independently of every other subscription,
//! is individually cancellable, and a failed beat is logged and forgotten
//! until the next scheduled tick; it is never escalated or retried early.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use domains::error::{Result, StoreError};
use domains::models::PresenceEntry;
use domains::paths::DbPath;
use domains::ports::{Clock, Store};
use domains::time::to_timestamp;

use crate::snapshot::SnapshotStream;

pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(8);

type PresenceMap = BTreeMap<String, PresenceEntry>;

#[derive(Clone)]
pub struct PresenceService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl PresenceService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Stream of everyone present in a bottle, keyed by uid.
    pub fn observe_room(&self, bottle_id: &str) -> SnapshotStream<PresenceMap> {
        SnapshotStream::open(self.store.as_ref(), &DbPath::presence_room(bottle_id))
    }

    pub async fn set_present(&self, bottle_id: &str, uid: &str) -> Result<()> {
        let entry = PresenceEntry { last_seen: to_timestamp(self.clock.now()) };
        let path = DbPath::presence(bottle_id, uid);
        let payload = serde_json::to_value(&entry)
            .map_err(|source| StoreError::Encode { path: path.as_str().to_string(), source })?;
        self.store.set(&path, payload).await?;
        Ok(())
    }

    pub async fn clear_presence(&self, bottle_id: &str, uid: &str) -> Result<()> {
        self.store.delete(&DbPath::presence(bottle_id, uid)).await?;
        Ok(())
    }

    /// Spawns the heartbeat. The first beat fires immediately, then every
    /// `interval` until the handle is stopped or dropped.
    pub fn start_heartbeat(&self, bottle_id: &str, uid: &str, interval: Duration) -> Heartbeat {
        let service = self.clone();
        let bottle_id = bottle_id.to_string();
        let uid = uid.to_string();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match service.set_present(&bottle_id, &uid).await {
                    Ok(()) => debug!(bottle_id, uid, "presence heartbeat"),
                    Err(err) => {
                        warn!(bottle_id, uid, error = %err, "presence heartbeat failed")
                    }
                }
            }
        });

        Heartbeat { task }
    }
}

/// Handle to a running heartbeat; aborting it is the only way it ends.
pub struct Heartbeat {
    task: JoinHandle<()>,
}

impl Heartbeat {
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.task.abort();
    }
}
