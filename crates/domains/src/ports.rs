//! # Core Traits (Ports)
//!
//! Any adapter must implement these traits to be used by the services layer.
//! Every component receives its collaborators (store, clock, identity)
//! explicitly, never through a globally reachable singleton, so tests can
//! inject fakes.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::StoreError;
use crate::models::UserLocation;
use crate::paths::DbPath;

/// A live listener on one store path.
///
/// Deliveries are strictly ordered as received from the store; `None` means
/// the path does not exist. Dropping the subscription detaches the remote
/// listener. The store guarantees at most one live listener per path:
/// subscribing again to the same path ends the previous subscription
/// (`recv` returns `None`).
#[derive(Debug)]
pub struct Subscription {
    path: String,
    rx: mpsc::UnboundedReceiver<Option<Value>>,
}

impl Subscription {
    pub fn new(path: impl Into<String>, rx: mpsc::UnboundedReceiver<Option<Value>>) -> Self {
        Self { path: path.into(), rx }
    }

    /// Next raw delivery, or `None` once the listener is detached.
    pub async fn recv(&mut self) -> Option<Option<Value>> {
        self.rx.recv().await
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Data access contract for the external push-based key/value tree.
///
/// `update` addresses nested fields by slash path relative to `path`
/// (e.g. `status/locked`).
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, path: &DbPath) -> std::result::Result<Option<Value>, StoreError>;
    async fn set(&self, path: &DbPath, value: Value) -> std::result::Result<(), StoreError>;
    async fn update(
        &self,
        path: &DbPath,
        changes: Vec<(String, Value)>,
    ) -> std::result::Result<(), StoreError>;
    async fn delete(&self, path: &DbPath) -> std::result::Result<(), StoreError>;

    /// Attach a live listener. Implementations must emit the current value
    /// immediately, then every change, and must detach any prior listener
    /// registered on the same path.
    fn subscribe(&self, path: &DbPath) -> Subscription;
}

/// Authorization state reported by the platform location services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationState {
    NotDetermined,
    Denied,
    Restricted,
    AuthorizedForeground,
    AuthorizedAlways,
}

impl AuthorizationState {
    pub fn is_authorized(self) -> bool {
        matches!(self, Self::AuthorizedForeground | Self::AuthorizedAlways)
    }
}

/// A stream of location fixes. Ends when the provider stops updates or
/// authorization is revoked; it is never restarted implicitly.
#[derive(Debug)]
pub struct LocationUpdates {
    rx: mpsc::UnboundedReceiver<UserLocation>,
}

impl LocationUpdates {
    pub fn new(rx: mpsc::UnboundedReceiver<UserLocation>) -> Self {
        Self { rx }
    }

    pub async fn recv(&mut self) -> Option<UserLocation> {
        self.rx.recv().await
    }
}

/// Geolocation contract, implemented by a platform adapter.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait LocationProvider: Send + Sync {
    fn authorization_state(&self) -> AuthorizationState;
    fn request_authorization(&self);
    fn start_updates(&self) -> LocationUpdates;
    fn stop_updates(&self);
}

/// Identity contract. Absence of a viewer id means unauthenticated.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait IdentityProvider: Send + Sync {
    fn current_viewer_id(&self) -> Option<String>;
}

/// Wall clock, injected so state resolution is deterministic under test.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Blob storage contract for media handled outside the realtime tree.
/// Upload/download byte mechanics live entirely behind this port.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Stores raw bytes at `path` and returns the stored path.
    async fn upload(&self, data: Bytes, path: &str, content_type: &str)
        -> anyhow::Result<String>;

    /// Returns a fetchable URL for a stored path.
    async fn download_url(&self, path: &str) -> anyhow::Result<String>;
}
