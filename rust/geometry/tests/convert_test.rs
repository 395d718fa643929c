// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion of sensor-shaped wall buffers.

use room_designer_geometry::{
    convert, ConversionError, IndexElement, IndexWidth, Mesh, PrimitiveKind, VertexSource,
};

/// Vertical wall strip subdivided into `columns` quads, as a room sensor
/// reports a wall face.
fn wall_strip(columns: u32, width: f32, height: f32) -> (Vec<[f32; 3]>, Vec<[u32; 3]>) {
    let mut positions = Vec::new();
    for c in 0..=columns {
        let x = width * c as f32 / columns as f32;
        positions.push([x, 0.0, 0.0]);
        positions.push([x, height, 0.0]);
    }
    let mut triangles = Vec::new();
    for c in 0..columns {
        let b = c * 2;
        triangles.push([b, b + 2, b + 1]);
        triangles.push([b + 1, b + 2, b + 3]);
    }
    (positions, triangles)
}

fn analyze(mesh: &Mesh) -> (usize, usize) {
    assert!(mesh.indices().iter().all(|&i| (i as usize) < mesh.vertex_count()));
    (mesh.vertex_count(), mesh.triangle_count())
}

#[test]
fn counts_survive_conversion_for_many_shapes() {
    for columns in 1..24 {
        let (positions, triangles) = wall_strip(columns, 3.2, 2.6);
        for stride in [12usize, 16, 24] {
            let vertices = VertexSource::from_positions_with_stride(&positions, stride).unwrap();
            let indices = IndexElement::from_triangles(&triangles);
            let mesh = convert(&vertices, &indices).expect("valid wall converts");
            assert_eq!(analyze(&mesh), (positions.len(), triangles.len()));
        }
    }
}

#[test]
fn sixteen_bit_indices_match_thirty_two_bit() {
    let (positions, triangles) = wall_strip(6, 2.0, 2.4);
    let narrow: Vec<[u16; 3]> = triangles
        .iter()
        .map(|t| [t[0] as u16, t[1] as u16, t[2] as u16])
        .collect();

    let vertices = VertexSource::from_positions(&positions);
    let wide = convert(&vertices, &IndexElement::from_triangles(&triangles)).unwrap();
    let narrow = convert(&vertices, &IndexElement::from_triangles_u16(&narrow)).unwrap();
    assert_eq!(wide, narrow);
}

#[test]
fn empty_vertex_buffer_fails_with_empty_geometry() {
    let (_, triangles) = wall_strip(2, 1.0, 1.0);
    let result = convert(
        &VertexSource::from_positions(&[]),
        &IndexElement::from_triangles(&triangles),
    );
    assert_eq!(result, Err(ConversionError::EmptyGeometry));
}

#[test]
fn truncated_index_buffer_is_a_conversion_error() {
    let (positions, triangles) = wall_strip(4, 1.0, 1.0);
    let full = IndexElement::from_triangles(&triangles);
    // Sensor claims all triangles but the buffer was cut short mid-index.
    let truncated = IndexElement::new(
        full.buffer.slice(..full.buffer.len() - 2),
        full.count,
        IndexWidth::U32,
        PrimitiveKind::Triangle,
    );
    let err = convert(&VertexSource::from_positions(&positions), &truncated).unwrap_err();
    assert!(matches!(err, ConversionError::BufferOverrun { source_kind: "index", .. }));
}
