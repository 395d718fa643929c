// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for mesh conversion
pub type Result<T> = std::result::Result<T, ConversionError>;

/// Errors that can occur while turning raw sensor buffers into a [`Mesh`](crate::Mesh).
///
/// Every variant is a recoverable, per-surface failure. Callers log it and
/// skip the surface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Empty geometry: vertex or index buffer has no elements")]
    EmptyGeometry,

    #[error("Mesh generation failed: {0}")]
    GenerationFailed(String),

    #[error("{source_kind} buffer overrun: element {element} needs bytes up to {needed}, buffer holds {available}")]
    BufferOverrun {
        source_kind: &'static str,
        element: usize,
        needed: usize,
        available: usize,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl ConversionError {
    /// Create a generation failure from any message
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::GenerationFailed(msg.into())
    }
}
