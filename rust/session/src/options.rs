// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session tunables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::scene::Color;

/// What happens to occlusion surfaces when an anchor is added again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcclusionPolicy {
    /// Drop the anchor's previous occlusion surfaces before building new
    /// ones; other anchors keep theirs. Removal of the anchor drops them.
    #[default]
    ReplacePerAnchor,
    /// Never clear occlusion surfaces during extraction; every "added"
    /// event contributes another set.
    Accumulate,
}

impl fmt::Display for OcclusionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OcclusionPolicy::ReplacePerAnchor => f.write_str("replace"),
            OcclusionPolicy::Accumulate => f.write_str("accumulate"),
        }
    }
}

impl FromStr for OcclusionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "replace" | "replace_per_anchor" => Ok(OcclusionPolicy::ReplacePerAnchor),
            "accumulate" => Ok(OcclusionPolicy::Accumulate),
            other => Err(format!("unknown occlusion policy '{}'", other)),
        }
    }
}

/// Options for a [`RoomSession`](crate::RoomSession).
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub occlusion_policy: OcclusionPolicy,
    /// Surface batches at least this large are converted on the rayon pool
    pub parallel_threshold: usize,
    pub marker_radius: f32,
    /// Wall tint; alpha below 1 makes walls translucent
    pub wall_color: Color,
    pub inside_color: Color,
    pub outside_color: Color,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            occlusion_policy: OcclusionPolicy::default(),
            parallel_threshold: 8,
            marker_radius: 0.1,
            wall_color: Color::BLUE.with_alpha(0.3),
            inside_color: Color::GREEN,
            outside_color: Color::RED,
        }
    }
}
