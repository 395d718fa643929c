// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Async session runtime.
//!
//! A [`RoomSession`] is moved into a single actor task and is only ever
//! touched there. Two unbounded channels feed the actor:
//!
//! - user commands from a [`SessionHandle`]
//! - sensor updates forwarded by a separate ingestion task that drains the
//!   sensor's stream
//!
//! Startup runs the capability and authorization gate before any update is
//! consumed. On failure the session enters the error state and keeps serving
//! commands, but no ingestion task is started.
//!
//! Shutdown stops the ingestion task first (watch signal, checked on every
//! iteration), waits for it, then stops the actor and hands the session back.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use room_designer_geometry::Point3;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::anchor::AnchorUpdate;
use crate::error::{SensorError, SessionError};
use crate::markers::MarkerId;
use crate::mode::VisualizationMode;
use crate::session::{RoomSession, SessionStatus};

/// Outcome of the sensor's authorization prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Allowed,
    Denied,
    NotDetermined,
}

/// The room-scanning sensor as seen by the session.
#[async_trait]
pub trait RoomSensor: Send + Sync + 'static {
    /// Whether room tracking exists on this device at all.
    fn is_supported(&self) -> bool;

    async fn request_authorization(&self) -> Authorization;

    /// Begin delivering anchor updates. The stream ends when the sensor stops.
    async fn start(&self) -> Result<BoxStream<'static, AnchorUpdate>, SensorError>;
}

/// Sensor fed by an in-process channel, for replays and tests.
#[derive(Debug)]
pub struct ChannelSensor {
    receiver: Mutex<Option<mpsc::UnboundedReceiver<AnchorUpdate>>>,
    supported: bool,
    authorization: Authorization,
    start_error: Option<String>,
}

impl ChannelSensor {
    /// A supported, authorized sensor and the sender that drives it.
    pub fn new() -> (Self, mpsc::UnboundedSender<AnchorUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sensor = Self {
            receiver: Mutex::new(Some(rx)),
            supported: true,
            authorization: Authorization::Allowed,
            start_error: None,
        };
        (sensor, tx)
    }

    pub fn with_authorization(mut self, authorization: Authorization) -> Self {
        self.authorization = authorization;
        self
    }

    pub fn with_support(mut self, supported: bool) -> Self {
        self.supported = supported;
        self
    }

    /// Make `start` fail with the given message.
    pub fn with_start_error(mut self, message: impl Into<String>) -> Self {
        self.start_error = Some(message.into());
        self
    }
}

#[async_trait]
impl RoomSensor for ChannelSensor {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn request_authorization(&self) -> Authorization {
        self.authorization
    }

    async fn start(&self) -> Result<BoxStream<'static, AnchorUpdate>, SensorError> {
        if let Some(message) = &self.start_error {
            return Err(SensorError::StartFailed(message.clone()));
        }
        let receiver = self
            .receiver
            .lock()
            .map_err(|_| SensorError::StartFailed("sensor state poisoned".to_string()))?
            .take()
            .ok_or(SensorError::AlreadyStarted)?;
        Ok(UnboundedReceiverStream::new(receiver).boxed())
    }
}

#[derive(Debug)]
enum SessionCommand {
    Place { id: MarkerId, position: Point3<f32> },
    ClearAll,
    SetMode(VisualizationMode),
    Reload,
    Contains { point: Point3<f32>, reply: oneshot::Sender<bool> },
    Shutdown,
}

/// Caller side of a running session.
///
/// Every command method is fire-and-forget: it never blocks and never fails
/// for the caller. Commands sent after the actor stopped are dropped with a
/// debug log.
#[derive(Debug)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    status: watch::Receiver<SessionStatus>,
    actor: JoinHandle<RoomSession>,
}

impl SessionHandle {
    /// Place a marker. The id is assigned up front and stays valid once the
    /// command is applied.
    pub fn place(&self, position: Point3<f32>) -> MarkerId {
        let id = MarkerId::new();
        self.send(SessionCommand::Place { id, position });
        id
    }

    pub fn clear_all(&self) {
        self.send(SessionCommand::ClearAll);
    }

    pub fn set_mode(&self, mode: VisualizationMode) {
        self.send(SessionCommand::SetMode(mode));
    }

    pub fn reload(&self) {
        self.send(SessionCommand::Reload);
    }

    /// Containment query answered by the actor. `false` once it has stopped.
    pub async fn contains(&self, point: Point3<f32>) -> bool {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Contains { point, reply });
        rx.await.unwrap_or(false)
    }

    /// Latest published status.
    pub fn status(&self) -> SessionStatus {
        (*self.status.borrow()).clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Wait until the published status satisfies `predicate`.
    ///
    /// Returns `None` if the actor stops first.
    pub async fn wait_for(&self, mut predicate: impl FnMut(&SessionStatus) -> bool) -> Option<SessionStatus> {
        let mut rx = self.status.clone();
        let status = rx.wait_for(|status| predicate(status)).await.ok()?;
        Some(status.clone())
    }

    /// Stop ingestion, stop the actor and take the session back.
    pub async fn shutdown(self) -> Option<RoomSession> {
        self.send(SessionCommand::Shutdown);
        match self.actor.await {
            Ok(session) => Some(session),
            Err(err) => {
                tracing::error!(error = %err, "Session actor did not shut down cleanly");
                None
            }
        }
    }

    fn send(&self, command: SessionCommand) {
        if let Err(err) = self.commands.send(command) {
            tracing::debug!(command = ?err.0, "Session actor stopped, dropping command");
        }
    }
}

/// Move `session` into an actor task and start the sensor.
///
/// Must be called within a tokio runtime.
pub fn spawn_session(session: RoomSession, sensor: Arc<dyn RoomSensor>) -> SessionHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = watch::channel(session.status());

    let actor = tokio::spawn(run_actor(session, sensor, command_rx, status_tx));

    SessionHandle {
        commands: command_tx,
        status: status_rx,
        actor,
    }
}

struct Ingestion {
    cancel: watch::Sender<bool>,
    task: JoinHandle<usize>,
}

impl Ingestion {
    async fn stop(self) {
        // Receiver may already be gone if the stream ended.
        let _ = self.cancel.send(true);
        match self.task.await {
            Ok(forwarded) => tracing::debug!(forwarded, "Ingestion stopped"),
            Err(err) => tracing::warn!(error = %err, "Ingestion task ended abnormally"),
        }
    }
}

async fn run_actor(
    mut session: RoomSession,
    sensor: Arc<dyn RoomSensor>,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    status: watch::Sender<SessionStatus>,
) -> RoomSession {
    session.begin_initializing();
    publish(&status, &session);

    let (update_tx, mut updates) = mpsc::unbounded_channel();
    let ingestion = match start_sensor(sensor.as_ref()).await {
        Ok(stream) => {
            let (cancel, cancel_rx) = watch::channel(false);
            let task = tokio::spawn(forward_updates(stream, update_tx, cancel_rx));
            session.mark_running();
            tracing::info!("Room session running");
            Some(Ingestion { cancel, task })
        }
        Err(err) => {
            drop(update_tx);
            session.fail(err);
            None
        }
    };
    publish(&status, &session);

    let mut updates_open = ingestion.is_some();
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(SessionCommand::Shutdown) | None => break,
                Some(command) => handle_command(&mut session, command),
            },
            update = updates.recv(), if updates_open => match update {
                Some(update) => session.apply(update),
                None => {
                    tracing::info!("Sensor feed ended");
                    updates_open = false;
                }
            },
        }
        publish(&status, &session);
    }

    if let Some(ingestion) = ingestion {
        ingestion.stop().await;
    }
    session.end();
    publish(&status, &session);
    tracing::info!("Room session ended");
    session
}

/// Capability gate, authorization, then the sensor's stream.
async fn start_sensor(sensor: &dyn RoomSensor) -> Result<BoxStream<'static, AnchorUpdate>, SessionError> {
    if !sensor.is_supported() {
        return Err(SessionError::NotSupported);
    }
    match sensor.request_authorization().await {
        Authorization::Allowed => {}
        other => {
            tracing::warn!(authorization = ?other, "Room tracking not authorized");
            return Err(SessionError::NotAuthorized);
        }
    }
    Ok(sensor.start().await?)
}

fn handle_command(session: &mut RoomSession, command: SessionCommand) {
    match command {
        SessionCommand::Place { id, position } => session.place_with_id(id, position),
        SessionCommand::ClearAll => {
            session.clear_all();
        }
        SessionCommand::SetMode(mode) => session.set_mode(mode),
        SessionCommand::Reload => {
            session.reload();
        }
        SessionCommand::Contains { point, reply } => {
            let _ = reply.send(session.contains(&point));
        }
        SessionCommand::Shutdown => {}
    }
}

/// Drain the sensor stream into the actor's update channel until the stream
/// ends, the actor goes away, or cancellation is signalled.
async fn forward_updates(
    mut stream: BoxStream<'static, AnchorUpdate>,
    updates: mpsc::UnboundedSender<AnchorUpdate>,
    mut cancel: watch::Receiver<bool>,
) -> usize {
    let mut forwarded = 0;
    loop {
        if *cancel.borrow() {
            break;
        }
        tokio::select! {
            biased;
            changed = cancel.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            next = stream.next() => match next {
                Some(update) => {
                    if updates.send(update).is_err() {
                        break;
                    }
                    forwarded += 1;
                }
                None => break,
            },
        }
    }
    forwarded
}

fn publish(status: &watch::Sender<SessionStatus>, session: &RoomSession) {
    let next = session.status();
    status.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}
