// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room volumes
//!
//! A tracked room is bounded by its floor outline (anchor-local XZ plane,
//! Y up) extruded between the floor and ceiling heights. Containment is a
//! height check followed by a 2D ray-casting test on the outline.

use nalgebra::{Point2, Point3};

/// Extruded floor outline of a tracked room, in anchor-local space
#[derive(Debug, Clone, PartialEq)]
pub struct RoomBoundary {
    /// Floor outline, (x, z) pairs, either winding
    pub floor: Vec<Point2<f32>>,
    pub floor_y: f32,
    pub ceiling_y: f32,
}

impl RoomBoundary {
    pub fn new(floor: Vec<Point2<f32>>, floor_y: f32, ceiling_y: f32) -> Self {
        Self {
            floor,
            floor_y,
            ceiling_y,
        }
    }

    /// Axis-aligned rectangular room centred on the anchor origin
    pub fn rectangle(width: f32, depth: f32, height: f32) -> Self {
        let (hw, hd) = (width / 2.0, depth / 2.0);
        Self::new(
            vec![
                Point2::new(-hw, -hd),
                Point2::new(hw, -hd),
                Point2::new(hw, hd),
                Point2::new(-hw, hd),
            ],
            0.0,
            height,
        )
    }

    /// Boundary with no volume; contains nothing
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0.0, 0.0)
    }

    /// Whether the outline encloses any area
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.floor.len() < 3 || self.ceiling_y <= self.floor_y
    }

    /// Test an anchor-local point against the room volume
    pub fn contains_local(&self, point: &Point3<f32>) -> bool {
        if self.is_degenerate() {
            return false;
        }
        if point.y < self.floor_y || point.y > self.ceiling_y {
            return false;
        }
        point_in_polygon_2d(&Point2::new(point.x, point.z), &self.floor)
    }
}

/// 2D ray-casting point-in-polygon test.
fn point_in_polygon_2d(point: &Point2<f32>, polygon: &[Point2<f32>]) -> bool {
    let n = polygon.len();
    let mut inside = false;

    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (polygon[i].x, polygon[i].y);
        let (xj, yj) = (polygon[j].x, polygon[j].y);

        if ((yi > point.y) != (yj > point.y))
            && (point.x < (xj - xi) * (point.y - yi) / (yj - yi) + xi)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}
