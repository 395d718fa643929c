// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room state store.
//!
//! Holds the latest snapshot of every room anchor the sensor has reported,
//! keyed by identity. Added and updated events both upsert; the caller
//! decides which pipeline steps follow. Which anchor counts as "the current
//! room" is not decided here but by a [`CurrentRoomPolicy`] supplied by the
//! sensing side.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::anchor::{AnchorId, RoomAnchor};

/// Picks the current room among the stored anchors.
pub trait CurrentRoomPolicy: Send + fmt::Debug {
    fn select<'a>(&self, store: &'a RoomStore) -> Option<&'a RoomAnchor>;
}

/// Trusts the sensor's `is_current_room` flag.
///
/// If several anchors carry the flag, the most recently upserted one wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorFlagged;

impl CurrentRoomPolicy for SensorFlagged {
    fn select<'a>(&self, store: &'a RoomStore) -> Option<&'a RoomAnchor> {
        store
            .anchors
            .values()
            .filter(|entry| entry.anchor.is_current_room)
            .max_by_key(|entry| entry.last_upsert)
            .map(|entry| &entry.anchor)
    }
}

/// Always reports one fixed anchor, if it is still stored.
#[derive(Debug, Clone, Copy)]
pub struct Pinned(pub AnchorId);

impl CurrentRoomPolicy for Pinned {
    fn select<'a>(&self, store: &'a RoomStore) -> Option<&'a RoomAnchor> {
        store.get(self.0)
    }
}

#[derive(Debug, Clone)]
struct StoredAnchor {
    anchor: RoomAnchor,
    first_seen: u64,
    last_upsert: u64,
}

/// Latest anchor snapshots keyed by identity.
pub struct RoomStore {
    anchors: FxHashMap<AnchorId, StoredAnchor>,
    policy: Box<dyn CurrentRoomPolicy>,
    clock: u64,
}

impl RoomStore {
    /// Empty store using the [`SensorFlagged`] policy.
    pub fn new() -> Self {
        Self::with_policy(Box::new(SensorFlagged))
    }

    pub fn with_policy(policy: Box<dyn CurrentRoomPolicy>) -> Self {
        Self {
            anchors: FxHashMap::default(),
            policy,
            clock: 0,
        }
    }

    /// Swap the current-room policy.
    pub fn set_policy(&mut self, policy: Box<dyn CurrentRoomPolicy>) {
        self.policy = policy;
    }

    /// Insert or replace the snapshot for `anchor.id`.
    pub fn on_added(&mut self, anchor: RoomAnchor) {
        self.upsert(anchor);
    }

    /// Insert or replace the snapshot for `anchor.id`. No field-level merge.
    pub fn on_updated(&mut self, anchor: RoomAnchor) {
        self.upsert(anchor);
    }

    /// Forget an anchor. Returns the last snapshot, if any.
    pub fn on_removed(&mut self, id: AnchorId) -> Option<RoomAnchor> {
        self.anchors.remove(&id).map(|entry| entry.anchor)
    }

    fn upsert(&mut self, anchor: RoomAnchor) {
        self.clock += 1;
        let now = self.clock;
        match self.anchors.get_mut(&anchor.id) {
            Some(entry) => {
                entry.anchor = anchor;
                entry.last_upsert = now;
            }
            None => {
                self.anchors.insert(
                    anchor.id,
                    StoredAnchor {
                        anchor,
                        first_seen: now,
                        last_upsert: now,
                    },
                );
            }
        }
    }

    pub fn get(&self, id: AnchorId) -> Option<&RoomAnchor> {
        self.anchors.get(&id).map(|entry| &entry.anchor)
    }

    /// The current room as chosen by the policy.
    pub fn current(&self) -> Option<&RoomAnchor> {
        self.policy.select(self)
    }

    /// Earliest-added anchor still stored.
    pub fn first(&self) -> Option<&RoomAnchor> {
        self.anchors
            .values()
            .min_by_key(|entry| entry.first_seen)
            .map(|entry| &entry.anchor)
    }

    pub fn contains(&self, id: AnchorId) -> bool {
        self.anchors.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// All stored anchors, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &RoomAnchor> {
        self.anchors.values().map(|entry| &entry.anchor)
    }
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RoomStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomStore")
            .field("anchors", &self.anchors.len())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use room_designer_geometry::{Pose, RoomBoundary};

    fn anchor(current: bool) -> RoomAnchor {
        RoomAnchor::new(AnchorId::new(), Pose::identity(), RoomBoundary::rectangle(3.0, 3.0, 2.5))
            .with_current(current)
    }

    #[test]
    fn added_then_get_returns_snapshot() {
        let mut store = RoomStore::new();
        let a = anchor(true);
        store.on_added(a.clone());
        assert_eq!(store.get(a.id), Some(&a));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_replaces_whole_snapshot() {
        let mut store = RoomStore::new();
        let a = anchor(true);
        store.on_added(a.clone());

        let replacement = RoomAnchor::new(a.id, Pose::from_translation(1.0, 0.0, 0.0), RoomBoundary::empty());
        store.on_updated(replacement.clone());

        let stored = store.get(a.id).unwrap();
        assert_eq!(stored, &replacement);
        assert!(!stored.is_current_room);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn removed_anchor_is_gone() {
        let mut store = RoomStore::new();
        let a = anchor(true);
        store.on_added(a.clone());
        assert!(store.on_removed(a.id).is_some());
        assert!(store.get(a.id).is_none());
        assert!(store.current().is_none());
        assert!(store.on_removed(a.id).is_none());
    }

    #[test]
    fn sensor_flag_picks_latest_flagged() {
        let mut store = RoomStore::new();
        let a = anchor(true);
        let b = anchor(false);
        let c = anchor(true);
        store.on_added(a.clone());
        store.on_added(b.clone());
        store.on_added(c.clone());
        assert_eq!(store.current().map(|r| r.id), Some(c.id));

        store.on_updated(a.clone());
        assert_eq!(store.current().map(|r| r.id), Some(a.id));
    }

    #[test]
    fn no_flag_means_no_current_room() {
        let mut store = RoomStore::new();
        store.on_added(anchor(false));
        assert!(store.current().is_none());
    }

    #[test]
    fn pinned_policy() {
        let mut store = RoomStore::new();
        let a = anchor(false);
        let b = anchor(true);
        store.on_added(a.clone());
        store.on_added(b.clone());
        store.set_policy(Box::new(Pinned(a.id)));
        assert_eq!(store.current().map(|r| r.id), Some(a.id));
    }

    #[test]
    fn first_survives_updates_of_later_anchors() {
        let mut store = RoomStore::new();
        let a = anchor(false);
        let b = anchor(false);
        store.on_added(a.clone());
        store.on_added(b.clone());
        store.on_updated(b.clone());
        assert_eq!(store.first().map(|r| r.id), Some(a.id));
        store.on_removed(a.id);
        assert_eq!(store.first().map(|r| r.id), Some(b.id));
    }
}
