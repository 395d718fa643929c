// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room Replay - drive a room session from a recorded capture.
//!
//! The capture's anchor events are pushed through an in-process sensor, so
//! they take the same path as a live feed: authorization gate, ingestion
//! task, session actor. Markers are placed first, so every room event
//! recolors them. When the feed has been applied the session is shut down
//! and a summary is printed.
//!
//! # Environment
//!
//! - `RUST_LOG` - log filter (default `info,room_designer_session=debug`)
//! - `REPLAY_LOG_JSON` - JSON log lines
//! - `REPLAY_WORKER_THREADS`, `REPLAY_PARALLEL_THRESHOLD`,
//!   `REPLAY_OCCLUSION_POLICY`, `REPLAY_MARKER_RADIUS`

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use room_designer_session::{
    spawn_session, ChannelSensor, MarkerColor, MarkerId, RoomSession, SessionStatus, VisualizationMode,
};
use serde::Serialize;

mod capture;
mod config;
mod error;

use capture::Capture;
use config::Config;

/// Replay a recorded room capture through a live session
#[derive(Parser, Debug)]
#[command(name = "room-replay", version)]
struct Args {
    /// Capture file (JSON)
    capture: PathBuf,

    /// Visualization mode to apply; overrides the capture's own
    #[arg(long, short = 'm', env = "REPLAY_MODE")]
    mode: Option<VisualizationMode>,

    /// Pause between sensor events, in milliseconds
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Print the final summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct MarkerSummary {
    id: MarkerId,
    position: [f32; 3],
    color: MarkerColor,
}

#[derive(Debug, Serialize)]
struct ReplaySummary {
    status: SessionStatus,
    walls: Vec<String>,
    occlusion_surfaces: usize,
    markers: Vec<MarkerSummary>,
}

fn init_tracing(json: bool) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,room_designer_session=debug".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::from_env();
    init_tracing(config.log_json);

    tracing::info!(
        capture = %args.capture.display(),
        worker_threads = config.worker_threads,
        parallel_threshold = config.parallel_threshold,
        occlusion_policy = %config.occlusion_policy,
        "Starting room replay"
    );

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads)
        .build_global()
        .context("Failed to initialize rayon thread pool")?;

    let capture = Capture::load(&args.capture)
        .with_context(|| format!("Failed to load capture {}", args.capture.display()))?;
    let expected_rooms = capture.final_room_count();
    let expected_markers = capture.markers.len();
    let event_count = capture.events.len() as u64;
    let mode = args.mode.or(capture.mode).unwrap_or_default();

    let (sensor, feed) = ChannelSensor::new();
    let handle = spawn_session(RoomSession::new(config.session_options()), Arc::new(sensor));

    let started = handle
        .wait_for(|s| s.is_immersive || s.error.is_some())
        .await
        .context("Session stopped during startup")?;
    if let Some(err) = started.error {
        bail!("Session failed to start: {}", err);
    }

    handle.set_mode(mode);
    for point in capture.marker_points() {
        handle.place(point);
    }

    let delay = Duration::from_millis(args.delay_ms);
    for event in capture.events {
        let update = event.into_update().context("Failed to rebuild captured anchor")?;
        if feed.send(update).is_err() {
            bail!("Sensor feed closed before the capture was fully replayed");
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    let status = handle
        .wait_for(|s| s.updates_applied == event_count && s.marker_count == expected_markers)
        .await
        .context("Session stopped before the capture was applied")?;
    if status.room_count != expected_rooms {
        tracing::warn!(expected = expected_rooms, actual = status.room_count, "Room count differs from capture");
    }

    let session = handle
        .shutdown()
        .await
        .context("Session actor failed during shutdown")?;

    let summary = ReplaySummary {
        status: session.status(),
        walls: session.extractor().walls().names(session.scene()),
        occlusion_surfaces: session.extractor().occlusion().len(),
        markers: session
            .markers()
            .iter()
            .map(|m| MarkerSummary {
                id: m.id,
                position: [m.position.x, m.position.y, m.position.z],
                color: m.color,
            })
            .collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let inside = summary
            .markers
            .iter()
            .filter(|m| m.color == MarkerColor::Inside)
            .count();
        tracing::info!(
            rooms = summary.status.room_count,
            walls = summary.walls.len(),
            occlusion = summary.occlusion_surfaces,
            markers = summary.markers.len(),
            inside,
            mode = %summary.status.visualization_mode,
            "Replay complete"
        );
    }

    Ok(())
}
