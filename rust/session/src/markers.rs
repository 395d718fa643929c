// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! User-placed markers colored by room containment.

use std::fmt;

use room_designer_geometry::{Point3, Pose};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::oracle::ContainmentOracle;
use crate::scene::{Color, EntityKey, Material, Scene, SurfaceEntity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerId(pub Uuid);

impl MarkerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MarkerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerColor {
    Inside,
    Outside,
}

impl MarkerColor {
    pub fn classify(inside: bool) -> Self {
        if inside {
            MarkerColor::Inside
        } else {
            MarkerColor::Outside
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub id: MarkerId,
    pub position: Point3<f32>,
    pub color: MarkerColor,
    pub entity: EntityKey,
}

/// Markers in placement order, each backed by a sphere entity.
#[derive(Debug)]
pub struct MarkerRegistry {
    root: EntityKey,
    order: Vec<MarkerId>,
    markers: FxHashMap<MarkerId, Marker>,
    radius: f32,
    inside: Color,
    outside: Color,
}

impl MarkerRegistry {
    /// Attach the (enabled) markers group under the scene root.
    pub fn new(scene: &mut Scene, radius: f32, inside: Color, outside: Color) -> Self {
        let root = scene.attach(scene.root(), SurfaceEntity::group("Markers"));
        Self {
            root,
            order: Vec::new(),
            markers: FxHashMap::default(),
            radius,
            inside,
            outside,
        }
    }

    pub fn root(&self) -> EntityKey {
        self.root
    }

    pub fn place(&mut self, scene: &mut Scene, oracle: &ContainmentOracle<'_>, position: Point3<f32>) -> MarkerId {
        let id = MarkerId::new();
        self.place_with_id(scene, oracle, id, position);
        id
    }

    /// Place under a caller-chosen id. Re-using a live id replaces that marker.
    pub fn place_with_id(
        &mut self,
        scene: &mut Scene,
        oracle: &ContainmentOracle<'_>,
        id: MarkerId,
        position: Point3<f32>,
    ) {
        if let Some(old) = self.markers.remove(&id) {
            scene.detach(old.entity);
            self.order.retain(|&m| m != id);
        }

        let color = MarkerColor::classify(oracle.contains(&position));
        let entity = scene.attach(
            self.root,
            SurfaceEntity::sphere(
                format!("Marker_{}", id),
                self.radius,
                self.material(color),
                Pose::from_translation(position.x, position.y, position.z),
            ),
        );

        tracing::debug!(marker = %id, ?color, "Placed marker");
        self.order.push(id);
        self.markers.insert(
            id,
            Marker {
                id,
                position,
                color,
                entity,
            },
        );
    }

    /// Detach every marker entity and empty the registry.
    pub fn clear_all(&mut self, scene: &mut Scene) -> usize {
        let count = self.order.len();
        for id in self.order.drain(..) {
            if let Some(marker) = self.markers.remove(&id) {
                scene.detach(marker.entity);
            }
        }
        tracing::debug!(count, "Cleared markers");
        count
    }

    /// Re-classify every marker and recolor those whose answer changed.
    ///
    /// Entities are updated in place; ids and count never change. Returns the
    /// number of markers that flipped.
    pub fn refresh_colors(&mut self, scene: &mut Scene, oracle: &ContainmentOracle<'_>) -> usize {
        let mut flipped = 0;
        for id in &self.order {
            let Some(marker) = self.markers.get_mut(id) else {
                continue;
            };
            let color = MarkerColor::classify(oracle.contains(&marker.position));
            if color != marker.color {
                marker.color = color;
                let material = Material::Unlit {
                    color: match color {
                        MarkerColor::Inside => self.inside,
                        MarkerColor::Outside => self.outside,
                    },
                };
                scene.set_material(marker.entity, material);
                flipped += 1;
            }
        }
        if flipped > 0 {
            tracing::debug!(flipped, total = self.order.len(), "Recolored markers");
        }
        flipped
    }

    pub fn get(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Markers in placement order.
    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.order.iter().filter_map(|id| self.markers.get(id))
    }

    fn material(&self, color: MarkerColor) -> Material {
        Material::Unlit {
            color: match color {
                MarkerColor::Inside => self.inside,
                MarkerColor::Outside => self.outside,
            },
        }
    }
}
