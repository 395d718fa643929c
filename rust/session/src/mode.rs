// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Visualization mode: which derived geometry group is shown.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualizationMode {
    #[default]
    None,
    Walls,
    Occlusion,
}

impl VisualizationMode {
    pub const ALL: [VisualizationMode; 3] = [
        VisualizationMode::None,
        VisualizationMode::Walls,
        VisualizationMode::Occlusion,
    ];

    #[inline]
    pub fn walls_enabled(self) -> bool {
        self == VisualizationMode::Walls
    }

    #[inline]
    pub fn occlusion_enabled(self) -> bool {
        self == VisualizationMode::Occlusion
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VisualizationMode::None => "none",
            VisualizationMode::Walls => "walls",
            VisualizationMode::Occlusion => "occlusion",
        }
    }
}

impl fmt::Display for VisualizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisualizationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(VisualizationMode::None),
            "walls" | "wall" => Ok(VisualizationMode::Walls),
            "occlusion" => Ok(VisualizationMode::Occlusion),
            other => Err(format!("unknown visualization mode '{}'", other)),
        }
    }
}
