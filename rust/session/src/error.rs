// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Session-level failure, surfaced to the observer through
/// [`SessionStatus::error`](crate::SessionStatus).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SessionError {
    #[error("Room tracking is not supported on this device")]
    NotSupported,

    #[error("Room tracking authorization was not granted")]
    NotAuthorized,

    #[error("Session failed: {0}")]
    SessionFailed(String),
}

/// Failure reported by a [`RoomSensor`](crate::RoomSensor).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    #[error("Sensor failed to start: {0}")]
    StartFailed(String),

    #[error("Sensor feed already taken")]
    AlreadyStarted,
}

impl From<SensorError> for SessionError {
    fn from(err: SensorError) -> Self {
        SessionError::SessionFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
