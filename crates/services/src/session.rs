//! # Bottle Session
//!
//! The lifecycle of viewing a single bottle: one live bottle stream, access
//! re-resolution on every delivery, and a chat subscription that exists only
//! while the bottle is unlocked with chat enabled. The session is
//! pull-driven: every state transition happens synchronously inside
//! `next_event`, `set_password`, or `attempt_unlock`. Dropping the session
//! detaches both listeners.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use domains::access::{AccessState, LockReason, ViewerContext};
use domains::error::{AppError, Result};
use domains::models::{Bottle, ChatMessage, ChatMessageRecord};
use domains::paths::DbPath;
use domains::ports::{Clock, IdentityProvider, Store};
use domains::time::to_timestamp;

use crate::bottles::BottleService;
use crate::chat;
use crate::resolver::resolve;
use crate::snapshot::{Snapshot, SnapshotStream};

type ChatMap = BTreeMap<String, ChatMessage>;

/// One delivery from the session. Bottle and chat streams carry no ordering
/// guarantee relative to each other; consumers treat them independently.
#[derive(Debug)]
pub enum SessionEvent {
    State(AccessState),
    Chat(Vec<ChatMessageRecord>),
}

/// Outcome of an unlock attempt.
#[derive(Debug, PartialEq)]
pub enum UnlockOutcome {
    /// The unlock write was issued and the opener registered.
    Unlocked,
    /// The persisted flag was already clear; nothing was written.
    AlreadyUnlocked,
    /// A gating reason other than `Unknown` is active. Not an error, and no
    /// network call was made.
    Refused(AccessState),
}

pub struct BottleSession {
    bottle_id: String,
    distance_km: f64,
    supplied_password: String,

    bottles: BottleService,
    store: Arc<dyn Store>,
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,

    bottle_stream: SnapshotStream<Bottle>,
    chat_stream: Option<SnapshotStream<ChatMap>>,

    latest: Option<Bottle>,
    state: AccessState,
}

enum Incoming {
    Bottle(Option<Snapshot<Bottle>>),
    Chat(Option<Snapshot<ChatMap>>),
}

impl BottleSession {
    pub(crate) fn open(
        bottles: BottleService,
        store: Arc<dyn Store>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
        bottle_id: &str,
        distance_km: f64,
    ) -> Self {
        info!(bottle_id, distance_km, "bottle session opened");
        let bottle_stream = SnapshotStream::open(store.as_ref(), &DbPath::bottle(bottle_id));
        Self {
            bottle_id: bottle_id.to_string(),
            distance_km,
            supplied_password: String::new(),
            bottles,
            store,
            identity,
            clock,
            bottle_stream,
            chat_stream: None,
            latest: None,
            state: AccessState::Loading,
        }
    }

    pub fn bottle_id(&self) -> &str {
        &self.bottle_id
    }

    pub fn state(&self) -> &AccessState {
        &self.state
    }

    /// The latest bottle snapshot, if one has arrived.
    pub fn bottle(&self) -> Option<&Bottle> {
        self.latest.as_ref()
    }

    fn context(&self) -> ViewerContext {
        ViewerContext {
            now: to_timestamp(self.clock.now()),
            distance_km: self.distance_km,
            supplied_password: self.supplied_password.clone(),
        }
    }

    /// Updates the candidate password and re-resolves synchronously against
    /// the latest snapshot.
    pub fn set_password(&mut self, password: impl Into<String>) -> &AccessState {
        self.supplied_password = password.into();
        if let Some(bottle) = self.latest.clone() {
            self.apply_bottle(&bottle);
        }
        &self.state
    }

    /// Next session delivery. Returns `None` once the bottle listener is
    /// detached (the session is over).
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            let incoming = match self.chat_stream.as_mut() {
                Some(chat) => {
                    let bottle_stream = &mut self.bottle_stream;
                    tokio::select! {
                        biased;
                        snap = bottle_stream.next() => Incoming::Bottle(snap),
                        snap = chat.next() => Incoming::Chat(snap),
                    }
                }
                None => Incoming::Bottle(self.bottle_stream.next().await),
            };

            match incoming {
                Incoming::Bottle(None) => return None,
                Incoming::Bottle(Some(snapshot)) => {
                    return Some(self.apply_snapshot(snapshot));
                }
                Incoming::Chat(None) => {
                    // Listener was claimed elsewhere; drop our side and
                    // keep serving bottle deliveries.
                    self.chat_stream = None;
                }
                Incoming::Chat(Some(snapshot)) => {
                    // Absent or undecodable rooms collapse to an empty list.
                    let room = snapshot.into_value().unwrap_or_default();
                    return Some(SessionEvent::Chat(chat::collate(room)));
                }
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot<Bottle>) -> SessionEvent {
        match snapshot.into_value() {
            Some(bottle) => {
                self.latest = Some(bottle.clone());
                self.apply_bottle(&bottle);
            }
            // Missing and undecodable payloads both degrade to absence.
            None => {
                self.latest = None;
                self.state = AccessState::Error("bottle not found".to_string());
                self.close_chat();
            }
        }
        SessionEvent::State(self.state.clone())
    }

    fn apply_bottle(&mut self, bottle: &Bottle) {
        self.state = resolve(bottle, &self.context());
        debug!(bottle_id = %self.bottle_id, state = ?self.state, "access state resolved");

        if self.state == AccessState::Unlocked && bottle.chat_enabled {
            self.open_chat();
        } else {
            self.close_chat();
        }
    }

    fn open_chat(&mut self) {
        if self.chat_stream.is_none() {
            debug!(bottle_id = %self.bottle_id, "chat subscription opened");
            self.chat_stream = Some(SnapshotStream::open(
                self.store.as_ref(),
                &DbPath::chat_room(&self.bottle_id),
            ));
        }
    }

    fn close_chat(&mut self) {
        if self.chat_stream.take().is_some() {
            debug!(bottle_id = %self.bottle_id, "chat subscription closed");
        }
    }

    /// Re-resolves synchronously from the latest snapshot and, only when the
    /// resolution is `Locked(Unknown)`, issues the remote unlock together
    /// with the opener registration. Any other gating reason refuses without
    /// touching the network.
    pub async fn attempt_unlock(&mut self) -> Result<UnlockOutcome> {
        let bottle = self
            .latest
            .clone()
            .ok_or_else(|| AppError::Validation("no bottle snapshot yet".into()))?;
        let uid = self
            .identity
            .current_viewer_id()
            .ok_or_else(|| AppError::Unauthorized("unlock requires a signed-in user".into()))?;

        let resolved = resolve(&bottle, &self.context());
        match resolved {
            AccessState::Locked(LockReason::Unknown) => {
                let opened_at = to_timestamp(self.clock.now());
                self.bottles.register_opener(&self.bottle_id, &uid, self.distance_km).await?;
                self.bottles.unlock(&self.bottle_id, opened_at).await?;
                Ok(UnlockOutcome::Unlocked)
            }
            AccessState::Unlocked => Ok(UnlockOutcome::AlreadyUnlocked),
            refused => {
                warn!(bottle_id = %self.bottle_id, state = ?refused, "unlock refused");
                self.state = refused.clone();
                Ok(UnlockOutcome::Refused(refused))
            }
        }
    }

    /// Ends the session, detaching both listeners. Dropping the session has
    /// the same effect; this just makes the intent explicit at call sites.
    pub fn stop(self) {
        info!(bottle_id = %self.bottle_id, "bottle session stopped");
    }
}
