//! Startup orchestration.
//!
//! # Responsibilities
//! - Carry the "network is up" trigger from whoever owns connectivity to the
//!   responder task
//! - Spawn and own the responder task
//! - Expose the task's state (waiting, running, terminated)
//!
//! # Design Decisions
//! - Fail fast: any setup error terminates the task; nothing restarts it
//! - The identity is loaded inside the task, after the network is ready
//! - The launching component owns the task handle; there is no global

use std::net::{IpAddr, SocketAddr};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::config::ResponderConfig;
use crate::error::ResponderError;
use crate::identity::ServerIdentity;
use crate::lifecycle::shutdown::Shutdown;
use crate::responder::{Responder, SessionEvent, EVENT_CAPACITY};

/// Create a connected readiness trigger pair.
pub fn network_channel() -> (NetworkMonitor, NetworkReady) {
    let (tx, rx) = watch::channel(None);
    (NetworkMonitor { tx }, NetworkReady { rx })
}

/// Sending half of the readiness trigger, held by the network owner.
#[derive(Debug)]
pub struct NetworkMonitor {
    tx: watch::Sender<Option<IpAddr>>,
}

impl NetworkMonitor {
    /// Report that the station acquired an address.
    pub fn station_got_ip(&self, addr: IpAddr) {
        tracing::info!(ip = %addr, "Station got IP");
        self.tx.send_replace(Some(addr));
    }
}

/// Receiving half of the readiness trigger.
#[derive(Debug)]
pub struct NetworkReady {
    rx: watch::Receiver<Option<IpAddr>>,
}

impl NetworkReady {
    /// Wait until an address has been reported.
    ///
    /// Returns `None` if the monitor is dropped without ever reporting one.
    pub async fn wait(&mut self) -> Option<IpAddr> {
        self.rx.wait_for(Option::is_some).await.ok().and_then(|addr| *addr)
    }
}

/// Lifecycle of the responder task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    WaitingForNetwork,
    Running(SocketAddr),
    Terminated,
}

/// Handle to the spawned responder task.
pub struct ResponderTask {
    handle: JoinHandle<Result<(), ResponderError>>,
    state: watch::Receiver<TaskState>,
    events: broadcast::Sender<SessionEvent>,
}

impl ResponderTask {
    /// Spawn the task. It idles until `ready` fires, then runs setup and
    /// serves until `shutdown` triggers or setup fails.
    pub fn launch(ready: NetworkReady, config: ResponderConfig, shutdown: &Shutdown) -> Self {
        let (state_tx, state) = watch::channel(TaskState::WaitingForNetwork);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shutdown_rx = shutdown.subscribe();
        let task_events = events.clone();

        let handle = tokio::spawn(async move {
            let result = run_task(ready, config, shutdown_rx, task_events, &state_tx).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "Responder task terminated");
            }
            state_tx.send_replace(TaskState::Terminated);
            result
        });

        Self {
            handle,
            state,
            events,
        }
    }

    /// Current task state.
    pub fn state(&self) -> TaskState {
        *self.state.borrow()
    }

    /// Wait until the task leaves `WaitingForNetwork`.
    ///
    /// Returns the bound address if it is serving, `None` if it terminated.
    pub async fn wait_running(&mut self) -> Option<SocketAddr> {
        let state = self
            .state
            .wait_for(|state| *state != TaskState::WaitingForNetwork)
            .await
            .map(|state| *state)
            .unwrap_or(TaskState::Terminated);
        match state {
            TaskState::Running(addr) => Some(addr),
            _ => None,
        }
    }

    /// Receive session events once the responder is serving.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Wait for the task to finish and return its exit status.
    pub async fn join(self) -> Result<(), ResponderError> {
        self.handle
            .await
            .map_err(|e| ResponderError::Aborted(e.to_string()))?
    }
}

async fn run_task(
    mut ready: NetworkReady,
    config: ResponderConfig,
    mut shutdown: broadcast::Receiver<()>,
    events: broadcast::Sender<SessionEvent>,
    state: &watch::Sender<TaskState>,
) -> Result<(), ResponderError> {
    let ip = tokio::select! {
        _ = shutdown.recv() => return Ok(()),
        ip = ready.wait() => ip,
    };
    let Some(ip) = ip else {
        tracing::warn!("Network monitor dropped before the network came up");
        return Ok(());
    };
    tracing::info!(ip = %ip, "Network ready, starting responder");

    let identity = ServerIdentity::from_config(&config.tls)?;
    let responder = Responder::bind(&config, &identity)?.with_event_sender(events);
    let local_addr = responder.local_addr().map_err(ResponderError::Listen)?;
    state.send_replace(TaskState::Running(local_addr));

    responder.run(shutdown).await
}
