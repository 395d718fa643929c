// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Recorded sensor captures.
//!
//! A capture is a JSON document listing anchor events in arrival order,
//! marker positions and an optional visualization mode. Surfaces are stored
//! as plain position and triangle lists; [`CapturedSurface::pack`] turns them
//! back into raw sensor-style buffers so a replay exercises the same
//! conversion path as live data.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use room_designer_geometry::{IndexElement, Point2, Point3, Pose, RoomBoundary, VertexSource, FLOAT3_SIZE, MAX_STRIDE};
use room_designer_session::{AnchorId, AnchorUpdate, ClassifiedSurface, RoomAnchor, SurfaceClass, VisualizationMode};
use rustc_hash::FxHashSet;
use serde::Deserialize;

use crate::error::CaptureError;

#[derive(Debug, Clone, Deserialize)]
pub struct Capture {
    #[serde(default)]
    pub events: Vec<CaptureEvent>,
    #[serde(default)]
    pub markers: Vec<[f32; 3]>,
    #[serde(default)]
    pub mode: Option<VisualizationMode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureEvent {
    Added(CapturedAnchor),
    Updated(CapturedAnchor),
    Removed(AnchorId),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CapturedAnchor {
    pub id: AnchorId,
    /// Column-major anchor-to-world matrix; identity when absent
    #[serde(default)]
    pub pose: Option<[f32; 16]>,
    #[serde(default)]
    pub is_current_room: bool,
    pub boundary: CapturedBoundary,
    #[serde(default)]
    pub surfaces: Vec<CapturedSurface>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CapturedBoundary {
    /// Floor outline as (x, z) pairs in anchor space
    pub floor: Vec<[f32; 2]>,
    pub floor_y: f32,
    pub ceiling_y: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CapturedSurface {
    pub class: SurfaceClass,
    pub positions: Vec<[f32; 3]>,
    pub triangles: Vec<[u32; 3]>,
    /// Vertex stride in bytes; tightly packed when absent
    #[serde(default)]
    pub stride: Option<usize>,
}

impl Capture {
    pub fn load(path: &Path) -> Result<Self, CaptureError> {
        let file = File::open(path).map_err(|source| CaptureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let capture: Self = serde_json::from_reader(BufReader::new(file))?;
        capture.validate()?;
        Ok(capture)
    }

    pub fn from_json(json: &str) -> Result<Self, CaptureError> {
        let capture: Self = serde_json::from_str(json)?;
        capture.validate()?;
        Ok(capture)
    }

    fn validate(&self) -> Result<(), CaptureError> {
        for event in &self.events {
            let anchor = match event {
                CaptureEvent::Added(a) | CaptureEvent::Updated(a) => a,
                CaptureEvent::Removed(_) => continue,
            };
            for (surface, captured) in anchor.surfaces.iter().enumerate() {
                if let Some(stride) = captured.stride.filter(|&s| s > MAX_STRIDE) {
                    return Err(CaptureError::InvalidSurface {
                        anchor: anchor.id,
                        surface,
                        reason: format!("stride {} exceeds {} bytes", stride, MAX_STRIDE),
                    });
                }
            }
        }
        Ok(())
    }

    /// Anchors still present after every event has been applied.
    pub fn final_room_count(&self) -> usize {
        let mut live = FxHashSet::default();
        for event in &self.events {
            match event {
                CaptureEvent::Added(a) | CaptureEvent::Updated(a) => {
                    live.insert(a.id);
                }
                CaptureEvent::Removed(id) => {
                    live.remove(id);
                }
            }
        }
        live.len()
    }

    pub fn marker_points(&self) -> impl Iterator<Item = Point3<f32>> + '_ {
        self.markers.iter().map(|&p| Point3::from(p))
    }
}

impl CaptureEvent {
    pub fn into_update(self) -> Result<AnchorUpdate, CaptureError> {
        Ok(match self {
            CaptureEvent::Added(anchor) => AnchorUpdate::Added(anchor.into_anchor()?),
            CaptureEvent::Updated(anchor) => AnchorUpdate::Updated(anchor.into_anchor()?),
            CaptureEvent::Removed(id) => AnchorUpdate::Removed(id),
        })
    }
}

impl CapturedAnchor {
    pub fn into_anchor(self) -> Result<RoomAnchor, CaptureError> {
        let pose = self
            .pose
            .as_ref()
            .map(Pose::from_column_slice)
            .unwrap_or_default();
        let boundary = RoomBoundary::new(
            self.boundary.floor.iter().map(|&[x, z]| Point2::new(x, z)).collect(),
            self.boundary.floor_y,
            self.boundary.ceiling_y,
        );
        let mut anchor = RoomAnchor::new(self.id, pose, boundary).with_current(self.is_current_room);
        anchor.surfaces = self
            .surfaces
            .iter()
            .enumerate()
            .map(|(surface, captured)| {
                captured.pack().map_err(|err| CaptureError::InvalidSurface {
                    anchor: self.id,
                    surface,
                    reason: err.to_string(),
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(anchor)
    }
}

impl CapturedSurface {
    /// Encode as raw buffers. Indices use 16 bits when every value fits.
    pub fn pack(&self) -> room_designer_geometry::Result<ClassifiedSurface> {
        let vertices = VertexSource::from_positions_with_stride(&self.positions, self.stride.unwrap_or(FLOAT3_SIZE))?;

        let narrow: Option<Vec<[u16; 3]>> = self
            .triangles
            .iter()
            .map(|t| Some([u16::try_from(t[0]).ok()?, u16::try_from(t[1]).ok()?, u16::try_from(t[2]).ok()?]))
            .collect();
        let indices = match narrow {
            Some(triangles) => IndexElement::from_triangles_u16(&triangles),
            None => IndexElement::from_triangles(&self.triangles),
        };

        Ok(ClassifiedSurface::new(self.class, vertices, indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use room_designer_geometry::{convert, IndexWidth};

    const CAPTURE: &str = r#"{
        "events": [
            {"added": {
                "id": "8a5d2c1e-0000-4000-8000-000000000001",
                "is_current_room": true,
                "boundary": {"floor": [[-2,-2],[2,-2],[2,2],[-2,2]], "floor_y": 0, "ceiling_y": 2.5},
                "surfaces": [
                    {"class": "wall", "stride": 16,
                     "positions": [[-2,0,-2],[2,0,-2],[2,2.5,-2],[-2,2.5,-2]],
                     "triangles": [[0,1,2],[0,2,3]]},
                    {"class": "floor",
                     "positions": [[-2,0,-2],[2,0,-2],[2,0,2]],
                     "triangles": [[0,1,2]]}
                ]
            }},
            {"removed": "8a5d2c1e-0000-4000-8000-000000000001"}
        ],
        "markers": [[0, 1, 0], [5, 1, 0]],
        "mode": "walls"
    }"#;

    #[test]
    fn parses_events_markers_and_mode() {
        let capture = Capture::from_json(CAPTURE).unwrap();
        assert_eq!(capture.events.len(), 2);
        assert_eq!(capture.marker_points().count(), 2);
        assert_eq!(capture.mode, Some(VisualizationMode::Walls));
        assert_eq!(capture.final_room_count(), 0);
    }

    #[test]
    fn packed_surfaces_convert() {
        let capture = Capture::from_json(CAPTURE).unwrap();
        let anchor = match capture.events[0].clone().into_update().unwrap() {
            AnchorUpdate::Added(anchor) => anchor,
            other => panic!("unexpected event {:?}", other),
        };
        assert!(anchor.is_current_room);
        assert!(anchor.contains(&Point3::new(0.0, 1.0, 0.0)));

        let wall = &anchor.surfaces[0];
        assert_eq!(wall.indices.width, IndexWidth::U16);
        let mesh = convert(&wall.vertices, &wall.indices).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn wide_indices_fall_back_to_u32() {
        let surface = CapturedSurface {
            class: SurfaceClass::Wall,
            positions: vec![[0.0; 3]; 3],
            triangles: vec![[0, 1, 70_000]],
            stride: None,
        };
        assert_eq!(surface.pack().unwrap().indices.width, IndexWidth::U32);
    }

    #[test]
    fn rejects_unknown_event_kind() {
        let err = Capture::from_json(r#"{"events": [{"teleported": {}}]}"#).unwrap_err();
        assert!(matches!(err, CaptureError::Parse(_)));
    }

    #[test]
    fn oversized_stride_is_rejected_at_load() {
        let json = CAPTURE.replace(r#""stride": 16"#, r#""stride": 4294967296"#);
        match Capture::from_json(&json).unwrap_err() {
            CaptureError::InvalidSurface { surface, .. } => assert_eq!(surface, 0),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn oversized_stride_fails_to_pack() {
        let surface = CapturedSurface {
            class: SurfaceClass::Wall,
            positions: vec![[0.0; 3]; 3],
            triangles: vec![[0, 1, 2]],
            stride: Some(usize::MAX),
        };
        assert!(surface.pack().is_err());

        let anchor = CapturedAnchor {
            id: AnchorId::new(),
            pose: None,
            is_current_room: false,
            boundary: CapturedBoundary {
                floor: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]],
                floor_y: 0.0,
                ceiling_y: 2.0,
            },
            surfaces: vec![surface],
        };
        assert!(matches!(anchor.into_anchor(), Err(CaptureError::InvalidSurface { .. })));
    }
}
