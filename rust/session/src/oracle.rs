// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial containment oracle: is a point inside the current room?

use room_designer_geometry::Point3;

use crate::store::RoomStore;

/// Answers containment queries against the store's current room.
#[derive(Debug, Clone, Copy)]
pub struct ContainmentOracle<'a> {
    store: &'a RoomStore,
}

impl<'a> ContainmentOracle<'a> {
    pub fn new(store: &'a RoomStore) -> Self {
        Self { store }
    }

    /// `false` when no room is current; "outside" is the conservative answer.
    pub fn contains(&self, point: &Point3<f32>) -> bool {
        match self.store.current() {
            Some(room) => room.contains(point),
            None => {
                tracing::debug!(x = point.x, y = point.y, z = point.z, "No current room, treating point as outside");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::{AnchorId, RoomAnchor};
    use room_designer_geometry::{Pose, RoomBoundary};

    #[test]
    fn empty_store_contains_nothing() {
        let store = RoomStore::new();
        let oracle = ContainmentOracle::new(&store);
        for p in [Point3::origin(), Point3::new(1.0, 1.0, 1.0), Point3::new(-50.0, 2.0, 7.0)] {
            assert!(!oracle.contains(&p));
        }
    }

    #[test]
    fn delegates_to_current_room() {
        let mut store = RoomStore::new();
        store.on_added(
            RoomAnchor::new(AnchorId::new(), Pose::identity(), RoomBoundary::rectangle(4.0, 4.0, 2.5))
                .with_current(true),
        );
        let oracle = ContainmentOracle::new(&store);
        assert!(oracle.contains(&Point3::new(0.5, 1.0, 0.5)));
        assert!(!oracle.contains(&Point3::new(5.0, 1.0, 0.5)));
    }

    #[test]
    fn non_current_rooms_are_ignored() {
        let mut store = RoomStore::new();
        store.on_added(RoomAnchor::new(
            AnchorId::new(),
            Pose::identity(),
            RoomBoundary::rectangle(4.0, 4.0, 2.5),
        ));
        assert!(!ContainmentOracle::new(&store).contains(&Point3::new(0.0, 1.0, 0.0)));
    }
}
