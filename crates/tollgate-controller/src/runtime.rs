//! Async runtime around [`GateController`].
//!
//! The controller runs in a single tokio task. Commands reach it through a
//! [`GateHandle`] (mpsc request, oneshot reply) and are applied between
//! ticks; events leave through a broadcast channel. A due tick is always
//! served before queued commands, so command traffic cannot hold the lights
//! back.
//!
//! ```text
//! GateHandle ── mpsc ──►┌────────────────────┐
//!                       │  tick loop task     │── broadcast ──► subscribers
//! GateHandle ◄─ oneshot ┤  (GateController)   │
//!                       └────────────────────┘
//! ```

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use tollgate_core::GateEvent;
use tollgate_storage::MetadataStore;

use crate::commands::{Command, CommandError, CommandReply};
use crate::config::GateConfig;
use crate::controller::{GateController, Peripherals};
use crate::sink::{BroadcastSink, EVENT_CHANNEL_CAPACITY};

/// Capacity of the command channel.
const COMMAND_CHANNEL_CAPACITY: usize = 16;

enum Request {
    Command {
        command: Command,
        reply: oneshot::Sender<Result<CommandReply, CommandError>>,
    },
    Shutdown,
}

/// Cloneable handle to a running gate.
#[derive(Debug, Clone)]
pub struct GateHandle {
    requests: mpsc::Sender<Request>,
    events: broadcast::Sender<GateEvent>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Request::Command { command, .. } => f.debug_tuple("Command").field(command).finish(),
            Request::Shutdown => f.write_str("Shutdown"),
        }
    }
}

impl GateHandle {
    /// Send a command and wait for its reply.
    ///
    /// # Errors
    ///
    /// Returns the command's own error, or [`CommandError::Closed`] if the
    /// runtime has stopped.
    pub async fn command(&self, command: Command) -> Result<CommandReply, CommandError> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(Request::Command { command, reply })
            .await
            .map_err(|_| CommandError::Closed)?;
        rx.await.map_err(|_| CommandError::Closed)?
    }

    pub async fn start_enrollment(&self, slot: i64) -> Result<CommandReply, CommandError> {
        self.command(Command::StartEnrollment { slot }).await
    }

    pub async fn delete_slot(&self, slot: i64) -> Result<CommandReply, CommandError> {
        self.command(Command::DeleteSlot { slot }).await
    }

    pub async fn delete_all(&self) -> Result<CommandReply, CommandError> {
        self.command(Command::DeleteAll).await
    }

    pub async fn list_slots(&self) -> Result<CommandReply, CommandError> {
        self.command(Command::ListSlots).await
    }

    pub async fn save_owner(
        &self,
        slot: i64,
        owner: impl Into<String>,
        role: impl Into<String>,
    ) -> Result<CommandReply, CommandError> {
        self.command(Command::SaveOwner {
            slot,
            owner: owner.into(),
            role: role.into(),
        })
        .await
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<GateEvent> {
        self.events.subscribe()
    }

    /// Ask the tick loop to stop. Does nothing if it already stopped.
    pub async fn shutdown(&self) {
        let _ = self.requests.send(Request::Shutdown).await;
    }
}

/// A running gate: the tick loop task plus a handle to it.
#[derive(Debug)]
pub struct GateRuntime {
    handle: GateHandle,
    task: JoinHandle<GateController>,
}

impl GateRuntime {
    /// Build the controller and spawn its tick loop on the current tokio
    /// runtime. The first tick runs immediately.
    pub fn start(
        config: &GateConfig,
        peripherals: Peripherals,
        store: Box<dyn MetadataStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (requests, request_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        let sink = BroadcastSink::new(events.clone());
        let controller = GateController::new(
            config,
            peripherals,
            store,
            Box::new(sink),
            Instant::now().into_std(),
        );

        let tick = config.runtime.tick();
        info!(tick_ms = tick.as_millis() as u64, "Starting gate runtime");
        let task = tokio::spawn(run(controller, request_rx, tick));

        Self {
            handle: GateHandle { requests, events },
            task,
        }
    }

    pub fn handle(&self) -> GateHandle {
        self.handle.clone()
    }

    /// Stop the tick loop and wait for it to finish.
    ///
    /// # Errors
    ///
    /// Returns the join error if the loop task panicked or was cancelled.
    pub async fn stop(self) -> Result<GateController, JoinError> {
        self.handle.shutdown().await;
        self.task.await
    }
}

async fn run(
    mut controller: GateController,
    mut requests: mpsc::Receiver<Request>,
    tick: Duration,
) -> GateController {
    let mut interval = time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            at = interval.tick() => {
                controller.tick(at.into_std());
            }

            request = requests.recv() => match request {
                Some(Request::Command { command, reply }) => {
                    debug!(?command, "Executing command");
                    let result = controller.execute(command, Instant::now().into_std());
                    let _ = reply.send(result);
                }
                Some(Request::Shutdown) | None => break,
            },
        }
    }

    info!("Gate runtime stopped");
    controller
}
