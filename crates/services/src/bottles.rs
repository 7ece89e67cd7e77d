//! # Bottle Service
//!
//! Store-facing operations on bottles: the discovery collection stream, a
//! single bottle's stream, creation, opener registration, and the unlock
//! write. Session lifecycle on top of these lives in [`crate::session`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use domains::error::{AppError, Result, StoreError};
use domains::models::{Bottle, BottleOpener};
use domains::paths::DbPath;
use domains::ports::{Clock, IdentityProvider, Store};
use domains::time::{to_timestamp, Timestamp};

use crate::creation::BottleDraft;
use crate::session::BottleSession;
use crate::snapshot::SnapshotStream;

/// The raw shape of the `bottles` collection: a full snapshot keyed by id,
/// replaced wholesale on every delivery.
pub type BottleMap = BTreeMap<String, Bottle>;

#[derive(Clone)]
pub struct BottleService {
    store: Arc<dyn Store>,
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
}

impl BottleService {
    pub fn new(
        store: Arc<dyn Store>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, identity, clock }
    }

    /// Stream of the whole discovery collection. Each delivery is the
    /// complete current set, not a diff.
    pub fn observe_all(&self) -> SnapshotStream<BottleMap> {
        SnapshotStream::open(self.store.as_ref(), &DbPath::bottles_root())
    }

    /// Stream of one bottle.
    pub fn observe_bottle(&self, bottle_id: &str) -> SnapshotStream<Bottle> {
        SnapshotStream::open(self.store.as_ref(), &DbPath::bottle(bottle_id))
    }

    /// Opens a viewing session for one bottle. `distance_km` is the viewer's
    /// precomputed distance to the drop point.
    pub fn open_session(&self, bottle_id: &str, distance_km: f64) -> BottleSession {
        BottleSession::open(
            self.clone(),
            self.store.clone(),
            self.identity.clone(),
            self.clock.clone(),
            bottle_id,
            distance_km,
        )
    }

    /// Persists a sealed draft under `bottles/{id}`. Requires an identity.
    pub async fn create_bottle(
        &self,
        bottle_id: &str,
        draft: &BottleDraft,
        image_path: Option<String>,
        audio_path: Option<String>,
    ) -> Result<String> {
        let owner_uid = self
            .identity
            .current_viewer_id()
            .ok_or_else(|| AppError::Unauthorized("bottle creation requires a signed-in user".into()))?;

        draft.validate_for_submission()?;

        let bottle = draft.to_bottle(&owner_uid, image_path, audio_path);
        let path = DbPath::bottle(bottle_id);
        let payload = serde_json::to_value(&bottle)
            .map_err(|source| StoreError::Encode { path: path.as_str().to_string(), source })?;

        self.store.set(&path, payload).await?;
        info!(bottle_id, owner_uid, "bottle created");
        Ok(bottle_id.to_string())
    }

    /// Records that `uid` opened a bottle, at `bottle_openers/{id}/{uid}`.
    pub async fn register_opener(
        &self,
        bottle_id: &str,
        uid: &str,
        distance_km: f64,
    ) -> Result<()> {
        let opener = BottleOpener {
            opened_at: to_timestamp(self.clock.now()),
            distance_from_drop_km: distance_km,
        };

        let path = DbPath::bottle_opener(bottle_id, uid);
        let payload = serde_json::to_value(&opener)
            .map_err(|source| StoreError::Encode { path: path.as_str().to_string(), source })?;

        self.store.set(&path, payload).await?;
        debug!(bottle_id, uid, distance_km, "opener registered");
        Ok(())
    }

    /// Minimal unlock: flip `status/locked` and stamp `opened_at`, both
    /// addressed as nested fields under the bottle root.
    pub async fn unlock(&self, bottle_id: &str, opened_at: Timestamp) -> Result<()> {
        self.store
            .update(
                &DbPath::bottle(bottle_id),
                vec![
                    ("status/locked".to_string(), json!(false)),
                    ("opened_at".to_string(), json!(opened_at)),
                ],
            )
            .await?;
        info!(bottle_id, "bottle unlocked");
        Ok(())
    }
}
