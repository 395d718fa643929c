// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh conversion - raw sensor buffers to an engine-agnostic [`Mesh`]
//!
//! Everything referenced by the vertex source and index element is copied
//! into owned arrays before returning; the caller may drop or recycle the
//! sensor buffers right after the call.

use crate::buffer::{IndexElement, PrimitiveKind, VertexSource};
use crate::error::{ConversionError, Result};
use crate::mesh::Mesh;

/// Convert one classified surface into a mesh
///
/// The index element must encode a triangle list. Fails with
/// [`ConversionError::EmptyGeometry`] when either buffer is empty and with
/// [`ConversionError::GenerationFailed`] when the assembled arrays do not
/// form a valid triangle mesh.
pub fn convert(vertices: &VertexSource, indices: &IndexElement) -> Result<Mesh> {
    if vertices.is_empty() || indices.is_empty() {
        return Err(ConversionError::EmptyGeometry);
    }
    if indices.primitive != PrimitiveKind::Triangle {
        return Err(ConversionError::UnsupportedFormat(format!(
            "primitive {:?}, expected Triangle",
            indices.primitive
        )));
    }

    // Probe the last element of each buffer before allocating anything sized
    // by the sensor-reported counts.
    vertices.read_float3(vertices.count - 1)?;
    let index_count = indices.index_count().ok_or_else(|| {
        ConversionError::generation(format!("primitive count {} overflows", indices.count))
    })?;
    indices.read_index(index_count - 1)?;

    let float_count = vertices
        .count
        .checked_mul(3)
        .ok_or_else(|| ConversionError::generation(format!("vertex count {} overflows", vertices.count)))?;
    let mut positions = Vec::with_capacity(float_count);
    for i in 0..vertices.count {
        positions.extend_from_slice(&vertices.read_float3(i)?);
    }

    let mut triangle_indices = Vec::with_capacity(index_count);
    for i in 0..index_count {
        triangle_indices.push(indices.read_index(i)?);
    }

    Mesh::from_parts(positions, triangle_indices)
}
