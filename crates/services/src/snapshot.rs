//! # Snapshot Streams
//!
//! Typed decode layer over a raw store [`Subscription`]. A malformed remote
//! payload must never crash a consumer, so decode failures degrade to an
//! [`Snapshot::Invalid`] delivery that callers treat as missing; the failure
//! is logged here and never surfaced as an error upstream. Keeping `Invalid`
//! distinct from `Missing` lets tests tell "no data" and "bad data" apart.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use tracing::warn;

use domains::error::DecodeError;
use domains::paths::DbPath;
use domains::ports::{Store, Subscription};

/// One typed delivery from a live path.
#[derive(Debug)]
pub enum Snapshot<T> {
    /// The path does not exist.
    Missing,
    /// The path exists but its payload did not decode into `T`.
    Invalid(DecodeError),
    Value(T),
}

impl<T> Snapshot<T> {
    /// Collapses `Invalid` into absence, the availability-over-visibility
    /// stance consumers take.
    pub fn into_value(self) -> Option<T> {
        match self {
            Snapshot::Value(value) => Some(value),
            Snapshot::Missing | Snapshot::Invalid(_) => None,
        }
    }
}

/// A cancellable sequence of typed snapshots for one logical path.
///
/// Deliveries arrive strictly in store order, uncoalesced. The stream ends
/// (`next` returns `None`) when the listener is detached, either by dropping
/// the stream or by another subscription claiming the same path.
#[derive(Debug)]
pub struct SnapshotStream<T> {
    subscription: Subscription,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> SnapshotStream<T> {
    /// Attaches a listener at `path`. Any prior listener on that path is
    /// detached by the store.
    pub fn open(store: &dyn Store, path: &DbPath) -> Self {
        Self { subscription: store.subscribe(path), _marker: PhantomData }
    }

    /// Wraps an already-attached subscription.
    pub fn from_subscription(subscription: Subscription) -> Self {
        Self { subscription, _marker: PhantomData }
    }

    pub fn path(&self) -> &str {
        self.subscription.path()
    }

    /// Next delivery, decoded. `None` once the listener is detached.
    pub async fn next(&mut self) -> Option<Snapshot<T>> {
        let raw = self.subscription.recv().await?;
        Some(match raw {
            None => Snapshot::Missing,
            Some(value) => match serde_json::from_value::<T>(value) {
                Ok(decoded) => Snapshot::Value(decoded),
                Err(source) => {
                    let error =
                        DecodeError { path: self.subscription.path().to_string(), source };
                    warn!(path = %error.path, error = %error.source, "snapshot decode failure");
                    Snapshot::Invalid(error)
                }
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tokio::sync::mpsc;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        n: i64,
    }

    fn stream() -> (mpsc::UnboundedSender<Option<serde_json::Value>>, SnapshotStream<Payload>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, SnapshotStream::from_subscription(Subscription::new("bottles/x", rx)))
    }

    #[tokio::test]
    async fn decodes_in_delivery_order() {
        let (tx, mut stream) = stream();
        tx.send(Some(serde_json::json!({ "n": 1 }))).unwrap();
        tx.send(Some(serde_json::json!({ "n": 2 }))).unwrap();

        assert!(matches!(stream.next().await, Some(Snapshot::Value(Payload { n: 1 }))));
        assert!(matches!(stream.next().await, Some(Snapshot::Value(Payload { n: 2 }))));
    }

    #[tokio::test]
    async fn absent_path_is_missing_and_bad_payload_is_invalid() {
        let (tx, mut stream) = stream();
        tx.send(None).unwrap();
        tx.send(Some(serde_json::json!("not an object"))).unwrap();

        assert!(matches!(stream.next().await, Some(Snapshot::Missing)));
        match stream.next().await {
            Some(Snapshot::Invalid(err)) => assert_eq!(err.path, "bottles/x"),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn ends_when_listener_detaches() {
        let (tx, mut stream) = stream();
        drop(tx);
        assert!(stream.next().await.is_none());
    }
}
