// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surface extraction pipeline.
//!
//! Re-derives renderable wall and occlusion surfaces from a room anchor's
//! classified geometry. The walls group is rebuilt from scratch on every
//! room add/update and on manual reload. Occlusion surfaces are built on
//! "added" only, following the configured [`OcclusionPolicy`].
//!
//! Conversion of a batch may fan out over the rayon pool; all results are
//! collected before the first entity is attached, and attachment happens on
//! the caller's (owner) thread only.

use std::collections::BTreeMap;

use rayon::prelude::*;
use room_designer_geometry::{convert, ConversionError, Mesh};

use crate::anchor::{AnchorId, ClassifiedSurface, RoomAnchor, SurfaceClass};
use crate::options::{OcclusionPolicy, SessionOptions};
use crate::scene::{EntityKey, Material, Scene, SurfaceEntity};

pub const WALL_PREFIX: &str = "Wall";
pub const OCCLUSION_PREFIX: &str = "Occlusion";

/// Stable identity of a derived surface: source anchor plus index within class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceKey {
    pub anchor: AnchorId,
    pub index: usize,
}

/// Outcome of one extraction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionReport {
    pub anchor: AnchorId,
    pub built: usize,
    pub skipped: usize,
}

/// A named collection of derived entities hanging under one group node.
///
/// The group node carries the collection's enabled flag.
#[derive(Debug)]
pub struct SurfaceGroup {
    prefix: &'static str,
    root: EntityKey,
    members: BTreeMap<SurfaceKey, EntityKey>,
}

impl SurfaceGroup {
    /// Attach a disabled, empty group under the scene root.
    pub fn new(scene: &mut Scene, prefix: &'static str) -> Self {
        let root = scene.attach(scene.root(), SurfaceEntity::group(format!("{}s", prefix)));
        scene.set_enabled(root, false);
        Self {
            prefix,
            root,
            members: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> EntityKey {
        self.root
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, key: &SurfaceKey) -> Option<EntityKey> {
        self.members.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &SurfaceKey> {
        self.members.keys()
    }

    pub fn entities(&self) -> impl Iterator<Item = EntityKey> + '_ {
        self.members.values().copied()
    }

    /// Entity names, ordered by (anchor, index).
    pub fn names(&self, scene: &Scene) -> Vec<String> {
        self.members
            .values()
            .filter_map(|&key| scene.get(key).map(|e| e.name.clone()))
            .collect()
    }

    /// Whether any member was derived from `anchor`.
    pub fn holds_anchor(&self, anchor: AnchorId) -> bool {
        self.members.keys().any(|k| k.anchor == anchor)
    }

    pub fn is_enabled(&self, scene: &Scene) -> bool {
        scene.get(self.root).map(|e| e.enabled).unwrap_or(false)
    }

    pub(crate) fn set_enabled(&self, scene: &mut Scene, enabled: bool) {
        scene.set_enabled(self.root, enabled);
    }

    fn entity_name(&self, index: usize) -> String {
        format!("{}_{}", self.prefix, index)
    }

    /// Insert, replacing (and detaching) any entity already under `key`.
    fn insert(&mut self, scene: &mut Scene, key: SurfaceKey, entity: SurfaceEntity) -> EntityKey {
        if let Some(old) = self.members.remove(&key) {
            scene.detach(old);
        }
        let entity_key = scene.attach(self.root, entity);
        self.members.insert(key, entity_key);
        entity_key
    }

    /// Detach every member. Returns how many were dropped.
    fn clear(&mut self, scene: &mut Scene) -> usize {
        let members = std::mem::take(&mut self.members);
        for &key in members.values() {
            scene.detach(key);
        }
        members.len()
    }

    /// Detach the members derived from one anchor.
    fn clear_anchor(&mut self, scene: &mut Scene, anchor: AnchorId) -> usize {
        let doomed: Vec<SurfaceKey> = self
            .members
            .keys()
            .filter(|k| k.anchor == anchor)
            .copied()
            .collect();
        for key in &doomed {
            if let Some(entity) = self.members.remove(key) {
                scene.detach(entity);
            }
        }
        doomed.len()
    }
}

/// Sole writer of the wall and occlusion groups.
#[derive(Debug)]
pub struct SurfaceExtractor {
    walls: SurfaceGroup,
    occlusion: SurfaceGroup,
    policy: OcclusionPolicy,
    parallel_threshold: usize,
    wall_material: Material,
    /// Next free surface index for accumulated occlusion sets
    occlusion_slot: usize,
}

impl SurfaceExtractor {
    pub fn new(scene: &mut Scene, options: &SessionOptions) -> Self {
        Self {
            walls: SurfaceGroup::new(scene, WALL_PREFIX),
            occlusion: SurfaceGroup::new(scene, OCCLUSION_PREFIX),
            policy: options.occlusion_policy,
            parallel_threshold: options.parallel_threshold.max(1),
            wall_material: Material::Unlit {
                color: options.wall_color,
            },
            occlusion_slot: 0,
        }
    }

    pub fn walls(&self) -> &SurfaceGroup {
        &self.walls
    }

    pub fn occlusion(&self) -> &SurfaceGroup {
        &self.occlusion
    }

    pub fn policy(&self) -> OcclusionPolicy {
        self.policy
    }

    /// Replace the wall group with walls freshly derived from `anchor`.
    ///
    /// Surfaces that fail to convert are logged and skipped.
    pub fn rebuild_walls(&mut self, scene: &mut Scene, anchor: &RoomAnchor) -> ExtractionReport {
        let cleared = self.walls.clear(scene);
        let converted = self.convert_class(anchor, SurfaceClass::Wall);

        let mut report = ExtractionReport {
            anchor: anchor.id,
            built: 0,
            skipped: 0,
        };
        for (index, result) in converted {
            match result {
                Ok(mesh) => {
                    let entity = SurfaceEntity::mesh(
                        self.walls.entity_name(index),
                        mesh,
                        self.wall_material,
                        anchor.pose,
                    );
                    self.walls.insert(
                        scene,
                        SurfaceKey {
                            anchor: anchor.id,
                            index,
                        },
                        entity,
                    );
                    report.built += 1;
                }
                Err(err) => {
                    log_skipped(anchor.id, SurfaceClass::Wall, index, &err);
                    report.skipped += 1;
                }
            }
        }

        tracing::info!(
            anchor = %anchor.id,
            cleared,
            built = report.built,
            skipped = report.skipped,
            "Rebuilt wall surfaces"
        );
        report
    }

    /// Build depth-only occlusion surfaces for a newly added anchor.
    pub fn build_occlusion(&mut self, scene: &mut Scene, anchor: &RoomAnchor) -> ExtractionReport {
        let converted = self.convert_class(anchor, SurfaceClass::Wall);
        let base = match self.policy {
            OcclusionPolicy::ReplacePerAnchor => {
                self.occlusion.clear_anchor(scene, anchor.id);
                0
            }
            // Offset indices so a re-added anchor does not overwrite its
            // earlier set.
            OcclusionPolicy::Accumulate => {
                let base = self.occlusion_slot;
                self.occlusion_slot += converted.len();
                base
            }
        };
        let mut report = ExtractionReport {
            anchor: anchor.id,
            built: 0,
            skipped: 0,
        };
        for (index, result) in converted {
            match result {
                Ok(mesh) => {
                    let entity = SurfaceEntity::mesh(
                        self.occlusion.entity_name(base + index),
                        mesh,
                        Material::Occlusion,
                        anchor.pose,
                    );
                    self.occlusion.insert(
                        scene,
                        SurfaceKey {
                            anchor: anchor.id,
                            index: base + index,
                        },
                        entity,
                    );
                    report.built += 1;
                }
                Err(err) => {
                    log_skipped(anchor.id, SurfaceClass::Wall, index, &err);
                    report.skipped += 1;
                }
            }
        }

        tracing::info!(
            anchor = %anchor.id,
            policy = %self.policy,
            built = report.built,
            skipped = report.skipped,
            total = self.occlusion.len(),
            "Built occlusion surfaces"
        );
        report
    }

    /// Drop derived geometry belonging to a removed anchor.
    pub fn forget_anchor(&mut self, scene: &mut Scene, anchor: AnchorId) {
        let walls = self.walls.clear_anchor(scene, anchor);
        let occlusion = match self.policy {
            OcclusionPolicy::ReplacePerAnchor => self.occlusion.clear_anchor(scene, anchor),
            OcclusionPolicy::Accumulate => 0,
        };
        tracing::debug!(anchor = %anchor, walls, occlusion, "Dropped derived surfaces of removed anchor");
    }

    /// Apply a visualization mode to the two groups.
    pub(crate) fn set_group_flags(&self, scene: &mut Scene, walls: bool, occlusion: bool) {
        self.walls.set_enabled(scene, walls);
        self.occlusion.set_enabled(scene, occlusion);
    }

    /// Convert every surface of `class`, in enumeration order.
    ///
    /// The returned vector is complete before anything touches the scene.
    fn convert_class(&self, anchor: &RoomAnchor, class: SurfaceClass) -> Vec<(usize, Result<Mesh, ConversionError>)> {
        let surfaces: Vec<(usize, &ClassifiedSurface)> = anchor.surfaces_of(class).collect();
        let convert_one =
            |&(index, surface): &(usize, &ClassifiedSurface)| (index, convert(&surface.vertices, &surface.indices));

        if surfaces.len() >= self.parallel_threshold {
            surfaces.par_iter().map(convert_one).collect()
        } else {
            surfaces.iter().map(convert_one).collect()
        }
    }
}

fn log_skipped(anchor: AnchorId, class: SurfaceClass, index: usize, err: &ConversionError) {
    tracing::warn!(
        anchor = %anchor,
        class = %class,
        surface = index,
        error = %err,
        "Skipping surface that failed to convert"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::ClassifiedSurface;
    use crate::scene::SceneLog;
    use room_designer_geometry::{IndexElement, Pose, RoomBoundary, VertexSource};

    fn wall(valid: bool) -> ClassifiedSurface {
        let far = if valid { 3 } else { 42 };
        ClassifiedSurface::new(
            SurfaceClass::Wall,
            VertexSource::from_positions(&[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 2.0, 0.0],
                [0.0, 2.0, 0.0],
            ]),
            IndexElement::from_triangles(&[[0, 1, 2], [0, 2, far]]),
        )
    }

    fn room(walls: &[bool]) -> RoomAnchor {
        walls.iter().fold(
            RoomAnchor::new(AnchorId::new(), Pose::identity(), RoomBoundary::rectangle(4.0, 4.0, 2.5)),
            |a, &ok| a.with_surface(wall(ok)),
        )
    }

    fn setup(options: &SessionOptions) -> (Scene, SurfaceExtractor, SceneLog) {
        let mut scene = Scene::new();
        let log = SceneLog::new();
        scene.set_observer(Box::new(log.clone()));
        let extractor = SurfaceExtractor::new(&mut scene, options);
        (scene, extractor, log)
    }

    #[test]
    fn groups_start_disabled_and_empty() {
        let (scene, extractor, _) = setup(&SessionOptions::default());
        assert!(extractor.walls().is_empty());
        assert!(!extractor.walls().is_enabled(&scene));
        assert!(!extractor.occlusion().is_enabled(&scene));
    }

    #[test]
    fn failed_wall_is_skipped() {
        let (mut scene, mut extractor, _) = setup(&SessionOptions::default());
        let anchor = room(&[true, false, true]);
        let report = extractor.rebuild_walls(&mut scene, &anchor);
        assert_eq!((report.built, report.skipped), (2, 1));
        assert_eq!(extractor.walls().names(&scene), vec!["Wall_0", "Wall_2"]);
    }

    #[test]
    fn rebuild_detaches_previous_walls() {
        let (mut scene, mut extractor, log) = setup(&SessionOptions::default());
        let anchor = room(&[true, true]);
        extractor.rebuild_walls(&mut scene, &anchor);
        let before: Vec<EntityKey> = extractor.walls().entities().collect();

        extractor.rebuild_walls(&mut scene, &anchor);
        assert_eq!(extractor.walls().len(), 2);
        for key in before {
            assert!(!scene.contains(key));
            assert_eq!(log.detach_count(key), 1);
        }
    }

    #[test]
    fn walls_follow_latest_anchor_only() {
        let (mut scene, mut extractor, _) = setup(&SessionOptions::default());
        let a = room(&[true, true, true]);
        let b = room(&[true]);
        extractor.rebuild_walls(&mut scene, &a);
        extractor.rebuild_walls(&mut scene, &b);
        assert_eq!(extractor.walls().len(), 1);
        assert!(extractor.walls().holds_anchor(b.id));
        assert!(!extractor.walls().holds_anchor(a.id));
    }

    #[test]
    fn parallel_conversion_matches_sequential() {
        let options = SessionOptions {
            parallel_threshold: 1,
            ..SessionOptions::default()
        };
        let (mut scene, mut extractor, _) = setup(&options);
        let anchor = room(&[true, false, true, true, false, true]);
        let report = extractor.rebuild_walls(&mut scene, &anchor);
        assert_eq!((report.built, report.skipped), (4, 2));
        assert_eq!(
            extractor.walls().names(&scene),
            vec!["Wall_0", "Wall_2", "Wall_3", "Wall_5"]
        );
    }

    #[test]
    fn occlusion_replaced_per_anchor() {
        let (mut scene, mut extractor, _) = setup(&SessionOptions::default());
        let a = room(&[true, true]);
        let b = room(&[true]);
        extractor.build_occlusion(&mut scene, &a);
        extractor.build_occlusion(&mut scene, &b);
        extractor.build_occlusion(&mut scene, &a);
        assert_eq!(extractor.occlusion().len(), 3);

        extractor.forget_anchor(&mut scene, a.id);
        assert_eq!(extractor.occlusion().len(), 1);
        assert!(extractor.occlusion().holds_anchor(b.id));
    }

    #[test]
    fn occlusion_accumulates_when_asked() {
        let options = SessionOptions {
            occlusion_policy: OcclusionPolicy::Accumulate,
            ..SessionOptions::default()
        };
        let (mut scene, mut extractor, _) = setup(&options);
        let a = room(&[true, true]);
        extractor.build_occlusion(&mut scene, &a);
        extractor.build_occlusion(&mut scene, &a);
        assert_eq!(extractor.occlusion().len(), 4);

        let mut names = extractor.occlusion().names(&scene);
        names.sort();
        assert_eq!(names, vec!["Occlusion_0", "Occlusion_1", "Occlusion_2", "Occlusion_3"]);

        extractor.forget_anchor(&mut scene, a.id);
        assert_eq!(extractor.occlusion().len(), 4);
    }

    #[test]
    fn occlusion_uses_depth_material() {
        let (mut scene, mut extractor, _) = setup(&SessionOptions::default());
        extractor.build_occlusion(&mut scene, &room(&[true]));
        let key = extractor.occlusion().entities().next().unwrap();
        let entity = scene.get(key).unwrap();
        assert_eq!(entity.material, Some(Material::Occlusion));
        assert_eq!(entity.name, "Occlusion_0");
    }

    #[test]
    fn walls_are_translucent_and_posed() {
        let (mut scene, mut extractor, _) = setup(&SessionOptions::default());
        let mut anchor = room(&[true]);
        anchor.pose = Pose::from_translation(0.0, 0.0, -2.0);
        extractor.rebuild_walls(&mut scene, &anchor);

        let key = extractor.walls().entities().next().unwrap();
        let entity = scene.get(key).unwrap();
        assert_eq!(entity.pose, anchor.pose);
        match entity.material {
            Some(Material::Unlit { color }) => assert!(color.a < 1.0),
            other => panic!("unexpected wall material {:?}", other),
        }
    }
}
