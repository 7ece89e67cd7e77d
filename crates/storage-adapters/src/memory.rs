//! In-memory implementation of the `Store` port.
//!
//! A JSON tree behind a lock plus a listener registry. Faithful to the
//! remote store's observable contract: subscribers get the current value
//! immediately, then every change affecting their path, strictly in write
//! order; registering a second listener on a path detaches the first.
//! Used as the primary test double and for embedded/offline runs.

use std::sync::RwLock;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::debug;

use domains::error::StoreError;
use domains::paths::DbPath;
use domains::ports::{Store, Subscription};

#[derive(Default)]
pub struct MemoryStore {
    tree: RwLock<Value>,
    listeners: DashMap<String, mpsc::UnboundedSender<Option<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { tree: RwLock::new(Value::Object(Map::new())), listeners: DashMap::new() }
    }

    fn lookup(root: &Value, path: &str) -> Option<Value> {
        let mut node = root;
        for segment in path.split('/') {
            node = node.as_object()?.get(segment)?;
        }
        Some(node.clone())
    }

    fn write(root: &mut Value, path: &str, value: Option<Value>) {
        let segments: Vec<&str> = path.split('/').collect();
        let (leaf, parents) = segments.split_last().expect("path has at least one segment");

        let mut node = root;
        for segment in parents {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            node = node
                .as_object_mut()
                .expect("just ensured object")
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let object = node.as_object_mut().expect("just ensured object");
        match value {
            Some(value) => {
                object.insert(leaf.to_string(), value);
            }
            None => {
                object.remove(*leaf);
            }
        }
    }

    /// Two paths affect each other when one is an ancestor of the other.
    fn related(a: &str, b: &str) -> bool {
        let mut a_segments = a.split('/');
        let mut b_segments = b.split('/');
        loop {
            match (a_segments.next(), b_segments.next()) {
                (Some(x), Some(y)) if x == y => continue,
                (Some(_), Some(_)) => return false,
                _ => return true,
            }
        }
    }

    /// Pushes the current value at every listener whose path is related to
    /// the written one. Listeners whose receiver is gone are pruned on every
    /// write, related or not; that is the detach point for dropped
    /// subscriptions.
    fn notify(&self, written: &str) {
        let tree = self.tree.read().expect("store lock poisoned");
        let mut dead = Vec::new();

        for entry in self.listeners.iter() {
            let listener_path = entry.key();
            if !Self::related(listener_path, written) {
                if entry.value().is_closed() {
                    dead.push(listener_path.clone());
                }
                continue;
            }
            let current = Self::lookup(&tree, listener_path);
            if entry.value().send(current).is_err() {
                dead.push(listener_path.clone());
            }
        }
        drop(tree);

        for path in dead {
            self.listeners.remove(&path);
            debug!(path, "listener detached");
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, path: &DbPath) -> Result<Option<Value>, StoreError> {
        let tree = self.tree.read().expect("store lock poisoned");
        Ok(Self::lookup(&tree, path.as_str()))
    }

    async fn set(&self, path: &DbPath, value: Value) -> Result<(), StoreError> {
        {
            let mut tree = self.tree.write().expect("store lock poisoned");
            Self::write(&mut tree, path.as_str(), Some(value));
        }
        self.notify(path.as_str());
        Ok(())
    }

    async fn update(
        &self,
        path: &DbPath,
        changes: Vec<(String, Value)>,
    ) -> Result<(), StoreError> {
        {
            let mut tree = self.tree.write().expect("store lock poisoned");
            for (field_path, value) in changes {
                let full = format!("{}/{}", path.as_str(), field_path);
                Self::write(&mut tree, &full, Some(value));
            }
        }
        self.notify(path.as_str());
        Ok(())
    }

    async fn delete(&self, path: &DbPath) -> Result<(), StoreError> {
        {
            let mut tree = self.tree.write().expect("store lock poisoned");
            Self::write(&mut tree, path.as_str(), None);
        }
        self.notify(path.as_str());
        Ok(())
    }

    fn subscribe(&self, path: &DbPath) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();

        let initial = {
            let tree = self.tree.read().expect("store lock poisoned");
            Self::lookup(&tree, path.as_str())
        };
        // The channel is fresh; this send cannot fail.
        let _ = tx.send(initial);

        // Replacing the sender closes the previous listener's channel,
        // enforcing one live listener per path.
        if self.listeners.insert(path.as_str().to_string(), tx).is_some() {
            debug!(path = path.as_str(), "previous listener replaced");
        }

        Subscription::new(path.as_str(), rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_get_delete_round_trip() {
        let store = MemoryStore::new();
        let path = DbPath::bottle("b1");

        store.set(&path, json!({ "owner_uid": "u1" })).await.unwrap();
        assert_eq!(store.get(&path).await.unwrap(), Some(json!({ "owner_uid": "u1" })));

        store.delete(&path).await.unwrap();
        assert_eq!(store.get(&path).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_addresses_nested_fields() {
        let store = MemoryStore::new();
        let path = DbPath::bottle("b1");
        store.set(&path, json!({ "status": { "locked": true }, "opened_at": null })).await.unwrap();

        store
            .update(
                &path,
                vec![
                    ("status/locked".to_string(), json!(false)),
                    ("opened_at".to_string(), json!(123.0)),
                ],
            )
            .await
            .unwrap();

        let value = store.get(&path).await.unwrap().unwrap();
        assert_eq!(value["status"]["locked"], json!(false));
        assert_eq!(value["opened_at"], json!(123.0));
    }

    #[tokio::test]
    async fn subscribe_emits_initial_then_changes_in_order() {
        let store = MemoryStore::new();
        let path = DbPath::bottle("b1");

        let mut sub = store.subscribe(&path);
        assert_eq!(sub.recv().await, Some(None));

        store.set(&path, json!({ "n": 1 })).await.unwrap();
        store.set(&path, json!({ "n": 2 })).await.unwrap();
        assert_eq!(sub.recv().await, Some(Some(json!({ "n": 1 }))));
        assert_eq!(sub.recv().await, Some(Some(json!({ "n": 2 }))));
    }

    #[tokio::test]
    async fn child_write_notifies_parent_listener() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe(&DbPath::bottles_root());
        assert_eq!(sub.recv().await, Some(None));

        store.set(&DbPath::bottle("b1"), json!({ "n": 1 })).await.unwrap();
        assert_eq!(sub.recv().await, Some(Some(json!({ "b1": { "n": 1 } }))));
    }

    #[tokio::test]
    async fn sibling_write_does_not_notify() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe(&DbPath::bottle("b1"));
        assert_eq!(sub.recv().await, Some(None));

        store.set(&DbPath::bottle("b2"), json!({ "n": 1 })).await.unwrap();
        store.set(&DbPath::bottle("b1"), json!({ "n": 2 })).await.unwrap();
        // The b2 write never shows up on b1's stream.
        assert_eq!(sub.recv().await, Some(Some(json!({ "n": 2 }))));
    }

    #[tokio::test]
    async fn dropped_listener_is_pruned_by_unrelated_writes() {
        let store = MemoryStore::new();

        let sub = store.subscribe(&DbPath::bottle("b1"));
        assert_eq!(store.listeners.len(), 1);
        drop(sub);

        // b1 is never written again; the sweep still reclaims its slot.
        store.set(&DbPath::presence("x", "u1"), json!({ "last_seen": 1.0 })).await.unwrap();
        assert_eq!(store.listeners.len(), 0);
    }

    #[tokio::test]
    async fn second_subscription_detaches_the_first() {
        let store = MemoryStore::new();
        let path = DbPath::bottle("b1");

        let mut first = store.subscribe(&path);
        assert_eq!(first.recv().await, Some(None));

        let mut second = store.subscribe(&path);
        assert_eq!(first.recv().await, None, "first listener must end");

        store.set(&path, json!({ "n": 1 })).await.unwrap();
        assert_eq!(second.recv().await, Some(None));
        assert_eq!(second.recv().await, Some(Some(json!({ "n": 1 }))));
    }
}
