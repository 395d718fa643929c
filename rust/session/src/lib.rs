// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room Designer Session
//!
//! Keeps a live view of the rooms a scanning sensor reports and derives what
//! the renderer shows from it:
//!
//! - [`RoomStore`]: latest snapshot per room anchor, plus the current-room policy
//! - [`ContainmentOracle`]: is a point inside the current room
//! - [`SurfaceExtractor`]: wall and occlusion surfaces rebuilt per update
//! - [`MarkerRegistry`]: user markers colored inside/outside
//! - [`VisualizationMode`]: which derived group is enabled
//!
//! [`RoomSession`] owns all of them. [`spawn_session`] runs a session as a
//! single-writer tokio task fed by a [`RoomSensor`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use room_designer_session::{spawn_session, ChannelSensor, RoomSession, SessionOptions};
//!
//! # async fn demo() {
//! let (sensor, _feed) = ChannelSensor::new();
//! let handle = spawn_session(RoomSession::new(SessionOptions::default()), Arc::new(sensor));
//! handle.place([0.0, 1.0, 0.0].into());
//! let session = handle.shutdown().await;
//! # }
//! ```

pub mod anchor;
pub mod error;
pub mod extraction;
pub mod markers;
pub mod mode;
pub mod options;
pub mod oracle;
pub mod runtime;
pub mod scene;
pub mod session;
pub mod store;

pub use anchor::{AnchorId, AnchorUpdate, ClassifiedSurface, RoomAnchor, SurfaceClass};
pub use error::{Result, SensorError, SessionError};
pub use extraction::{ExtractionReport, SurfaceExtractor, SurfaceGroup, SurfaceKey};
pub use markers::{Marker, MarkerColor, MarkerId, MarkerRegistry};
pub use mode::VisualizationMode;
pub use options::{OcclusionPolicy, SessionOptions};
pub use oracle::ContainmentOracle;
pub use runtime::{spawn_session, Authorization, ChannelSensor, RoomSensor, SessionHandle};
pub use scene::{Color, EntityKey, Material, Scene, SceneEvent, SceneLog, SceneObserver, Shape, SurfaceEntity};
pub use session::{RoomSession, SessionStatus};
pub use store::{CurrentRoomPolicy, Pinned, RoomStore, SensorFlagged};
