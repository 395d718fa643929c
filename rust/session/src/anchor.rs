// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room anchors and the sensor events that carry them.

use std::fmt;

use room_designer_geometry::{IndexElement, Point3, Pose, RoomBoundary, VertexSource};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identity of a room anchor, stable across updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnchorId(pub Uuid);

impl AnchorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AnchorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Semantic class the sensor assigned to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceClass {
    Wall,
    Floor,
    Ceiling,
    Door,
    Window,
    Unknown,
}

impl SurfaceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceClass::Wall => "wall",
            SurfaceClass::Floor => "floor",
            SurfaceClass::Ceiling => "ceiling",
            SurfaceClass::Door => "door",
            SurfaceClass::Window => "window",
            SurfaceClass::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SurfaceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified surface with its raw geometry buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedSurface {
    pub class: SurfaceClass,
    pub vertices: VertexSource,
    pub indices: IndexElement,
}

impl ClassifiedSurface {
    pub fn new(class: SurfaceClass, vertices: VertexSource, indices: IndexElement) -> Self {
        Self {
            class,
            vertices,
            indices,
        }
    }
}

/// Snapshot of a tracked room as last reported by the sensor.
///
/// Snapshots are immutable once stored: an update replaces the whole value.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomAnchor {
    pub id: AnchorId,
    /// Anchor-local to world transform
    pub pose: Pose,
    pub surfaces: Vec<ClassifiedSurface>,
    /// Room volume in anchor-local space
    pub boundary: RoomBoundary,
    /// Sensor's own "user is in this room" flag
    pub is_current_room: bool,
}

impl RoomAnchor {
    pub fn new(id: AnchorId, pose: Pose, boundary: RoomBoundary) -> Self {
        Self {
            id,
            pose,
            surfaces: Vec::new(),
            boundary,
            is_current_room: false,
        }
    }

    pub fn with_surface(mut self, surface: ClassifiedSurface) -> Self {
        self.surfaces.push(surface);
        self
    }

    pub fn with_current(mut self, is_current_room: bool) -> Self {
        self.is_current_room = is_current_room;
        self
    }

    /// Surfaces of one class, numbered in enumeration order within that class.
    pub fn surfaces_of(&self, class: SurfaceClass) -> impl Iterator<Item = (usize, &ClassifiedSurface)> {
        self.surfaces
            .iter()
            .filter(move |s| s.class == class)
            .enumerate()
    }

    /// Volumetric containment of a world-space point.
    ///
    /// A pose that cannot be inverted contains nothing.
    pub fn contains(&self, world: &Point3<f32>) -> bool {
        match self.pose.inverse_transform_point(world) {
            Some(local) => self.boundary.contains_local(&local),
            None => false,
        }
    }
}

/// One event from the room sensor feed.
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorUpdate {
    Added(RoomAnchor),
    Updated(RoomAnchor),
    Removed(AnchorId),
}

impl AnchorUpdate {
    pub fn anchor_id(&self) -> AnchorId {
        match self {
            AnchorUpdate::Added(a) | AnchorUpdate::Updated(a) => a.id,
            AnchorUpdate::Removed(id) => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AnchorUpdate::Added(_) => "added",
            AnchorUpdate::Updated(_) => "updated",
            AnchorUpdate::Removed(_) => "removed",
        }
    }
}
