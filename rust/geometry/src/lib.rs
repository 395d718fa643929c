// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room Designer Geometry
//!
//! Bounds-checked access to raw room-sensor geometry buffers, conversion of
//! classified surfaces into triangle meshes, anchor poses and room volumes.

pub mod boundary;
pub mod buffer;
pub mod convert;
pub mod error;
pub mod mesh;
pub mod pose;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point2, Point3, Vector3};

pub use boundary::RoomBoundary;
pub use buffer::{IndexElement, IndexWidth, PrimitiveKind, VertexFormat, VertexSource, FLOAT3_SIZE, MAX_STRIDE};
pub use convert::convert;
pub use error::{ConversionError, Result};
pub use mesh::Mesh;
pub use pose::Pose;
