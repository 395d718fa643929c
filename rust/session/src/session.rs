// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The room session: one owner for the store, the derived scene and markers.
//!
//! Every mutation goes through `&mut RoomSession`, so the single-writer
//! discipline is enforced by the borrow checker. The async runtime in
//! [`crate::runtime`] wraps a session in a task; tests drive it directly.

use room_designer_geometry::Point3;
use serde::{Deserialize, Serialize};

use crate::anchor::{AnchorId, AnchorUpdate};
use crate::error::SessionError;
use crate::extraction::{ExtractionReport, SurfaceExtractor};
use crate::markers::{MarkerId, MarkerRegistry};
use crate::mode::VisualizationMode;
use crate::options::SessionOptions;
use crate::oracle::ContainmentOracle;
use crate::scene::{Scene, SceneObserver};
use crate::store::{CurrentRoomPolicy, RoomStore};

/// Observable snapshot of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub is_initializing: bool,
    pub is_immersive: bool,
    pub error: Option<SessionError>,
    pub visualization_mode: VisualizationMode,
    pub marker_count: usize,
    pub room_count: usize,
    /// Sensor updates applied since the session was created
    pub updates_applied: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Initializing,
    Running,
    Failed,
    Ended,
}

#[derive(Debug)]
pub struct RoomSession {
    options: SessionOptions,
    scene: Scene,
    store: RoomStore,
    extractor: SurfaceExtractor,
    markers: MarkerRegistry,
    mode: VisualizationMode,
    phase: Phase,
    error: Option<SessionError>,
    applied: u64,
}

impl RoomSession {
    pub fn new(options: SessionOptions) -> Self {
        let mut scene = Scene::new();
        let extractor = SurfaceExtractor::new(&mut scene, &options);
        let markers = MarkerRegistry::new(
            &mut scene,
            options.marker_radius,
            options.inside_color,
            options.outside_color,
        );
        Self {
            options,
            scene,
            store: RoomStore::new(),
            extractor,
            markers,
            mode: VisualizationMode::None,
            phase: Phase::Idle,
            error: None,
            applied: 0,
        }
    }

    /// Route scene changes to a render backend (or a recorder in tests).
    pub fn set_scene_observer(&mut self, observer: Box<dyn SceneObserver>) {
        self.scene.set_observer(observer);
    }

    pub fn set_room_policy(&mut self, policy: Box<dyn CurrentRoomPolicy>) {
        self.store.set_policy(policy);
        self.refresh_markers();
    }

    /// Apply one sensor event: store, then extraction, then marker recolor.
    pub fn apply(&mut self, update: AnchorUpdate) {
        let id = update.anchor_id();
        let kind = update.kind();
        tracing::debug!(anchor = %id, kind, "Applying anchor update");

        match update {
            AnchorUpdate::Added(anchor) => {
                self.store.on_added(anchor);
                if let Some(anchor) = self.store.get(id) {
                    self.extractor.rebuild_walls(&mut self.scene, anchor);
                    self.extractor.build_occlusion(&mut self.scene, anchor);
                }
            }
            AnchorUpdate::Updated(anchor) => {
                self.store.on_updated(anchor);
                if let Some(anchor) = self.store.get(id) {
                    self.extractor.rebuild_walls(&mut self.scene, anchor);
                }
            }
            AnchorUpdate::Removed(id) => {
                if self.store.on_removed(id).is_none() {
                    tracing::debug!(anchor = %id, "Removal of unknown anchor");
                }
                self.extractor.forget_anchor(&mut self.scene, id);
            }
        }

        self.applied += 1;
        self.refresh_markers();
    }

    pub fn place(&mut self, position: Point3<f32>) -> MarkerId {
        let oracle = ContainmentOracle::new(&self.store);
        self.markers.place(&mut self.scene, &oracle, position)
    }

    /// Place with an id chosen by the caller, e.g. handed out before the
    /// command reached the session.
    pub fn place_with_id(&mut self, id: MarkerId, position: Point3<f32>) {
        let oracle = ContainmentOracle::new(&self.store);
        self.markers.place_with_id(&mut self.scene, &oracle, id, position);
    }

    pub fn clear_all(&mut self) -> usize {
        self.markers.clear_all(&mut self.scene)
    }

    /// Enable exactly the group the mode names. Calling twice is a no-op.
    pub fn set_mode(&mut self, mode: VisualizationMode) {
        if self.mode != mode {
            tracing::info!(from = %self.mode, to = %mode, "Visualization mode changed");
        }
        self.mode = mode;
        self.extractor
            .set_group_flags(&mut self.scene, mode.walls_enabled(), mode.occlusion_enabled());
    }

    /// Rebuild walls from the earliest known anchor.
    pub fn reload(&mut self) -> Option<ExtractionReport> {
        match self.store.first().map(|a| a.id) {
            Some(id) => self.reload_anchor(id),
            None => {
                tracing::debug!("Reload requested with no known room");
                None
            }
        }
    }

    pub fn reload_anchor(&mut self, id: AnchorId) -> Option<ExtractionReport> {
        match self.store.get(id) {
            Some(anchor) => Some(self.extractor.rebuild_walls(&mut self.scene, anchor)),
            None => {
                tracing::debug!(anchor = %id, "Reload requested for unknown anchor");
                None
            }
        }
    }

    pub fn contains(&self, point: &Point3<f32>) -> bool {
        ContainmentOracle::new(&self.store).contains(point)
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            is_initializing: self.phase == Phase::Initializing,
            is_immersive: self.phase == Phase::Running,
            error: self.error.clone(),
            visualization_mode: self.mode,
            marker_count: self.markers.len(),
            room_count: self.store.len(),
            updates_applied: self.applied,
        }
    }

    pub fn begin_initializing(&mut self) {
        self.phase = Phase::Initializing;
        self.error = None;
    }

    pub fn mark_running(&mut self) {
        self.phase = Phase::Running;
        self.error = None;
    }

    pub fn fail(&mut self, error: SessionError) {
        tracing::error!(error = %error, "Room session failed");
        self.phase = Phase::Failed;
        self.error = Some(error);
    }

    /// Leave the immersive state. Derived entities stay until the session drops.
    pub fn end(&mut self) {
        if self.phase != Phase::Failed {
            self.phase = Phase::Ended;
        }
    }

    pub fn mode(&self) -> VisualizationMode {
        self.mode
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn store(&self) -> &RoomStore {
        &self.store
    }

    pub fn extractor(&self) -> &SurfaceExtractor {
        &self.extractor
    }

    pub fn markers(&self) -> &MarkerRegistry {
        &self.markers
    }

    fn refresh_markers(&mut self) {
        let oracle = ContainmentOracle::new(&self.store);
        self.markers.refresh_colors(&mut self.scene, &oracle);
    }
}

impl Default for RoomSession {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::RoomAnchor;
    use room_designer_geometry::{Pose, RoomBoundary};

    #[test]
    fn fresh_session_status() {
        let session = RoomSession::default();
        assert_eq!(session.status(), SessionStatus::default());
    }

    #[test]
    fn lifecycle_flags() {
        let mut session = RoomSession::default();
        session.begin_initializing();
        assert!(session.status().is_initializing);

        session.mark_running();
        let status = session.status();
        assert!(status.is_immersive && !status.is_initializing);

        session.fail(SessionError::SessionFailed("tracking lost".into()));
        let status = session.status();
        assert!(!status.is_immersive);
        assert_eq!(status.error, Some(SessionError::SessionFailed("tracking lost".into())));

        session.end();
        assert!(session.status().error.is_some());
    }

    #[test]
    fn mode_toggles_group_roots() {
        let mut session = RoomSession::default();
        session.set_mode(VisualizationMode::Walls);
        let walls = session.extractor().walls().root();
        let occlusion = session.extractor().occlusion().root();
        assert!(session.scene().get(walls).unwrap().enabled);
        assert!(!session.scene().get(occlusion).unwrap().enabled);

        session.set_mode(VisualizationMode::None);
        assert!(!session.scene().get(walls).unwrap().enabled);
        assert!(!session.scene().get(occlusion).unwrap().enabled);
    }

    #[test]
    fn removal_updates_room_count_and_containment() {
        let mut session = RoomSession::default();
        let anchor = RoomAnchor::new(AnchorId::new(), Pose::identity(), RoomBoundary::rectangle(4.0, 4.0, 2.5))
            .with_current(true);
        let id = anchor.id;
        session.apply(AnchorUpdate::Added(anchor));
        assert_eq!(session.status().room_count, 1);
        assert!(session.contains(&Point3::new(0.0, 1.0, 0.0)));

        session.apply(AnchorUpdate::Removed(id));
        assert_eq!(session.status().room_count, 0);
        assert_eq!(session.status().updates_applied, 2);
        assert!(!session.contains(&Point3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn reload_without_rooms_is_a_no_op() {
        let mut session = RoomSession::default();
        assert!(session.reload().is_none());
        assert!(session.reload_anchor(AnchorId::new()).is_none());
    }
}
