// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use nalgebra::Point3;

use crate::error::{ConversionError, Result};

/// Triangle mesh
///
/// Produced fresh for every extraction and never edited afterwards, so the
/// only way to build a validated one from foreign data is [`Mesh::from_parts`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    positions: Vec<f32>,
    indices: Vec<u32>,
}

impl Mesh {
    /// Build a mesh from assembled position and index arrays
    ///
    /// Rejects ragged arrays, non-finite positions and indices that do not
    /// address a position.
    pub fn from_parts(positions: Vec<f32>, indices: Vec<u32>) -> Result<Self> {
        if positions.len() % 3 != 0 {
            return Err(ConversionError::generation(format!(
                "position array length {} is not a multiple of 3",
                positions.len()
            )));
        }
        if indices.len() % 3 != 0 {
            return Err(ConversionError::generation(format!(
                "index array length {} is not a triangle list",
                indices.len()
            )));
        }
        if let Some(i) = positions.iter().position(|v| !v.is_finite()) {
            return Err(ConversionError::generation(format!(
                "vertex {} has a non-finite component",
                i / 3
            )));
        }

        let vertex_count = positions.len() / 3;
        if let Some((slot, &index)) = indices
            .iter()
            .enumerate()
            .find(|&(_, &idx)| idx as usize >= vertex_count)
        {
            return Err(ConversionError::generation(format!(
                "triangle {} references vertex {} but mesh has {} vertices",
                slot / 3,
                index,
                vertex_count
            )));
        }

        Ok(Self { positions, indices })
    }

    /// Vertex positions (x, y, z)
    #[inline]
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    /// Triangle indices (i0, i1, i2)
    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if mesh is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Position of vertex `i`
    #[inline]
    pub fn position(&self, i: usize) -> Option<Point3<f32>> {
        let chunk = self.positions.get(i * 3..i * 3 + 3)?;
        Some(Point3::new(chunk[0], chunk[1], chunk[2]))
    }

    /// Iterate over triangles as index triples
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Calculate bounds (min, max)
    #[inline]
    pub fn bounds(&self) -> (Point3<f32>, Point3<f32>) {
        if self.is_empty() {
            return (Point3::origin(), Point3::origin());
        }

        let mut min = Point3::new(f32::MAX, f32::MAX, f32::MAX);
        let mut max = Point3::new(f32::MIN, f32::MIN, f32::MIN);

        self.positions.chunks_exact(3).for_each(|chunk| {
            let (x, y, z) = (chunk[0], chunk[1], chunk[2]);
            min.x = min.x.min(x);
            min.y = min.y.min(y);
            min.z = min.z.min(z);
            max.x = max.x.max(x);
            max.y = max.y.max(y);
            max.z = max.z.max(z);
        });

        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_creation() {
        let mesh = Mesh::default();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.triangle_count(), 0);
    }

    #[test]
    fn test_accessors() {
        let mesh = Mesh::from_parts(vec![1.0, 2.0, 3.0], vec![0, 0, 0]).unwrap();
        assert_eq!(mesh.vertex_count(), 1);
        assert_eq!(mesh.positions(), &[1.0, 2.0, 3.0]);
        assert_eq!(mesh.indices(), &[0, 0, 0]);
        assert_eq!(mesh.position(0), Some(Point3::new(1.0, 2.0, 3.0)));
        assert_eq!(mesh.position(1), None);
    }

    #[test]
    fn test_from_parts_rejects_out_of_range_index() {
        let err = Mesh::from_parts(vec![0.0; 9], vec![0, 1, 3]).unwrap_err();
        assert!(matches!(err, ConversionError::GenerationFailed(_)));
        let err = Mesh::from_parts(vec![0.0; 3], vec![0, 7, 9]).unwrap_err();
        assert!(matches!(err, ConversionError::GenerationFailed(_)));
    }

    #[test]
    fn test_from_parts_rejects_ragged_indices() {
        assert!(Mesh::from_parts(vec![0.0; 9], vec![0, 1]).is_err());
        assert!(Mesh::from_parts(vec![0.0; 8], vec![0, 1, 2]).is_err());
    }

    #[test]
    fn test_from_parts_rejects_nan() {
        let mut positions = vec![0.0; 9];
        positions[4] = f32::NAN;
        assert!(Mesh::from_parts(positions, vec![0, 1, 2]).is_err());
    }

    #[test]
    fn test_bounds_and_triangles() {
        let mesh = Mesh::from_parts(
            vec![
                0.0, 0.0, 0.0,
                2.0, 0.0, 0.0,
                0.0, 3.0, -1.0,
            ],
            vec![0, 1, 2],
        )
        .unwrap();

        let (min, max) = mesh.bounds();
        assert_eq!(min, Point3::new(0.0, 0.0, -1.0));
        assert_eq!(max, Point3::new(2.0, 3.0, 0.0));
        assert_eq!(mesh.triangles().collect::<Vec<_>>(), vec![[0, 1, 2]]);
    }
}
