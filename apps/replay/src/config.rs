// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Replay configuration loaded from environment variables.

use room_designer_session::{OcclusionPolicy, SessionOptions};

#[derive(Debug, Clone)]
pub struct Config {
    /// Threads in the global rayon pool used for surface conversion.
    pub worker_threads: usize,
    /// Smallest surface batch converted in parallel.
    pub parallel_threshold: usize,
    pub occlusion_policy: OcclusionPolicy,
    /// Marker sphere radius in meters.
    pub marker_radius: f32,
    /// Emit logs as JSON lines instead of pretty text.
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = SessionOptions::default();
        Self {
            worker_threads: std::env::var("REPLAY_WORKER_THREADS")
                .unwrap_or_else(|_| num_cpus::get().to_string())
                .parse()
                .unwrap_or_else(|_| num_cpus::get()),
            parallel_threshold: std::env::var("REPLAY_PARALLEL_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.parallel_threshold),
            occlusion_policy: std::env::var("REPLAY_OCCLUSION_POLICY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.occlusion_policy),
            marker_radius: std::env::var("REPLAY_MARKER_RADIUS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|r: &f32| r.is_finite() && *r > 0.0)
                .unwrap_or(defaults.marker_radius),
            log_json: std::env::var("REPLAY_LOG_JSON")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            occlusion_policy: self.occlusion_policy,
            parallel_threshold: self.parallel_threshold,
            marker_radius: self.marker_radius,
            ..SessionOptions::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
