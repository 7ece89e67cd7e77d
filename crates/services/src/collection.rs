//! Keyed, diffable view of the discovery collection.
//!
//! The store pushes the whole `bottles` tree on every change. Rather than
//! rebuilding downstream state each time, the discovery layer keeps the set
//! keyed by bottle id and diffs consecutive snapshots structurally, skipping
//! recomputation when nothing actually changed.

use std::collections::BTreeMap;

use domains::models::{AnnotationItem, Bottle};

/// The discovery set, keyed by bottle id.
pub type AnnotationMap = BTreeMap<String, AnnotationItem>;

/// Projects a raw collection snapshot into map annotations.
pub fn project(bottles: &BTreeMap<String, Bottle>) -> AnnotationMap {
    bottles
        .iter()
        .map(|(id, bottle)| {
            (
                id.clone(),
                AnnotationItem {
                    id: id.clone(),
                    owner_uid: Some(bottle.owner_uid.clone()),
                    latitude: bottle.location.lat,
                    longitude: bottle.location.lng,
                    status: bottle.status.clone(),
                    expires_at: bottle.expires_at,
                },
            )
        })
        .collect()
}

/// Structural difference between two consecutive snapshots.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Delta {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

pub fn diff(old: &AnnotationMap, new: &AnnotationMap) -> Delta {
    let mut delta = Delta::default();

    for (id, item) in new {
        match old.get(id) {
            None => delta.added.push(id.clone()),
            Some(previous) if previous != item => delta.changed.push(id.clone()),
            Some(_) => {}
        }
    }
    for id in old.keys() {
        if !new.contains_key(id) {
            delta.removed.push(id.clone());
        }
    }

    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::models::BottleStatus;

    fn annotation(id: &str, latitude: f64) -> AnnotationItem {
        AnnotationItem {
            id: id.to_string(),
            owner_uid: Some("u1".into()),
            latitude,
            longitude: -73.5,
            status: BottleStatus {
                locked: true,
                dead: false,
                alive_until: f64::MAX,
                active_users_count: 0,
            },
            expires_at: None,
        }
    }

    fn map(items: &[AnnotationItem]) -> AnnotationMap {
        items.iter().map(|i| (i.id.clone(), i.clone())).collect()
    }

    #[test]
    fn identical_snapshots_produce_an_empty_delta() {
        let a = map(&[annotation("a", 45.0), annotation("b", 46.0)]);
        assert!(diff(&a, &a.clone()).is_empty());
    }

    #[test]
    fn add_remove_change_are_reported_separately() {
        let old = map(&[annotation("a", 45.0), annotation("b", 46.0)]);
        let new = map(&[annotation("b", 46.5), annotation("c", 47.0)]);

        let delta = diff(&old, &new);
        assert_eq!(delta.added, ["c"]);
        assert_eq!(delta.removed, ["a"]);
        assert_eq!(delta.changed, ["b"]);
    }
}
