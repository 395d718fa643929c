// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Anchor poses
//!
//! A pose is the 4x4 affine transform from an anchor's local space to world
//! space. Sensors report it column-major, matching nalgebra's storage.

use nalgebra::{Matrix4, Point3, Translation3};

/// Anchor-local to world transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub matrix: Matrix4<f32>,
}

impl Pose {
    /// Identity pose (anchor space equals world space)
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Wrap an existing matrix
    pub fn from_matrix(matrix: Matrix4<f32>) -> Self {
        Self { matrix }
    }

    /// Build from 16 column-major floats
    pub fn from_column_slice(values: &[f32; 16]) -> Self {
        Self {
            matrix: Matrix4::from_column_slice(values),
        }
    }

    /// Pure translation
    pub fn from_translation(x: f32, y: f32, z: f32) -> Self {
        Self {
            matrix: Translation3::new(x, y, z).to_homogeneous(),
        }
    }

    /// World-space position of the anchor origin
    #[inline]
    pub fn origin(&self) -> Point3<f32> {
        Point3::new(self.matrix[(0, 3)], self.matrix[(1, 3)], self.matrix[(2, 3)])
    }

    /// Map an anchor-local point into world space
    #[inline]
    pub fn transform_point(&self, local: &Point3<f32>) -> Point3<f32> {
        self.matrix.transform_point(local)
    }

    /// Map a world point into anchor-local space
    ///
    /// Returns `None` when the pose is singular.
    pub fn inverse_transform_point(&self, world: &Point3<f32>) -> Option<Point3<f32>> {
        let inverse = self.matrix.try_inverse()?;
        Some(inverse.transform_point(world))
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Rotation3, Vector3};
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_translation_round_trip() {
        let pose = Pose::from_translation(1.0, 2.0, 3.0);
        let world = pose.transform_point(&Point3::new(1.0, 1.0, 1.0));
        assert_eq!(world, Point3::new(2.0, 3.0, 4.0));
        let local = pose.inverse_transform_point(&world).unwrap();
        assert_relative_eq!(local, Point3::new(1.0, 1.0, 1.0), epsilon = 1e-6);
        assert_eq!(pose.origin(), Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_rotated_pose_round_trip() {
        let rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2).to_homogeneous();
        let pose = Pose::from_matrix(Translation3::new(0.0, 0.0, 2.0).to_homogeneous() * rotation);
        let world = pose.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(world, Point3::new(0.0, 0.0, 1.0), epsilon = 1e-6);
        let local = pose.inverse_transform_point(&world).unwrap();
        assert_relative_eq!(local, Point3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_singular_pose_has_no_inverse() {
        let pose = Pose::from_matrix(Matrix4::zeros());
        assert!(pose.inverse_transform_point(&Point3::origin()).is_none());
    }
}
