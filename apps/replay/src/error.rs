// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Capture loading errors.

use std::path::PathBuf;

use room_designer_session::AnchorId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Failed to read capture {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed capture: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid surface {surface} of anchor {anchor}: {reason}")]
    InvalidSurface {
        anchor: AnchorId,
        surface: usize,
        reason: String,
    },
}
