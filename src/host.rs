//! Host-side wiring around one sandbox session.
//!
//! [`HostController`] owns the session handle and a pump task that drains the
//! bridge: inventories land in a watch channel any number of consumers can
//! follow, visual-edit picks land in another, and a small mpsc funnel lets
//! the orchestrator dispatch actions while the pump keeps the receiving half
//! of the endpoint busy. Only one run (drive or improve) may hold the
//! controller at a time; [`HostController::begin_run`] hands out a guard that
//! frees the slot on drop.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use cursor_orchestrator::{ActionPort, PortError};
use page_model::DocumentSpec;
use pagepilot_core_types::{ActionCommand, Inventory};
use sandbox_bridge::{BridgeError, HostEndpoint, SandboxConfig, SandboxHandle, SandboxEvent};

const ACTION_FUNNEL_CAPACITY: usize = 16;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("a {0} run is already active")]
    RunActive(RunKind),
}

/// What currently holds the controller.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RunKind {
    Drive,
    Improve,
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunKind::Drive => "drive",
            RunKind::Improve => "improve",
        };
        write!(f, "{label}")
    }
}

/// One embedded sandbox plus the host bookkeeping around it.
pub struct HostController {
    session: SandboxHandle,
    actions: mpsc::Sender<ActionCommand>,
    inventory: watch::Receiver<Inventory>,
    selection: watch::Receiver<Option<String>>,
    run_slot: Arc<Mutex<Option<RunKind>>>,
    pump: JoinHandle<()>,
}

impl HostController {
    /// Spawn a session and the pump that mirrors its events into watch state.
    pub fn start(config: SandboxConfig) -> Self {
        let (session, endpoint) = sandbox_bridge::spawn_session(config);
        let (action_tx, action_rx) = mpsc::channel(ACTION_FUNNEL_CAPACITY);
        let (inventory_tx, inventory_rx) = watch::channel(Inventory::default());
        let (selection_tx, selection_rx) = watch::channel(None);
        let pump = tokio::spawn(pump_bridge(endpoint, action_rx, inventory_tx, selection_tx));

        Self {
            session,
            actions: action_tx,
            inventory: inventory_rx,
            selection: selection_rx,
            run_slot: Arc::new(Mutex::new(None)),
            pump,
        }
    }

    pub fn session(&self) -> &SandboxHandle {
        &self.session
    }

    pub async fn load(&self, spec: DocumentSpec) -> Result<(), BridgeError> {
        self.session.load(spec).await
    }

    /// Follow inventory arrivals. `seq` distinguishes fresh snapshots.
    pub fn inventory_stream(&self) -> watch::Receiver<Inventory> {
        self.inventory.clone()
    }

    pub fn latest_inventory(&self) -> Inventory {
        self.inventory.borrow().clone()
    }

    /// Follow visual-edit selector picks.
    pub fn selection_stream(&self) -> watch::Receiver<Option<String>> {
        self.selection.clone()
    }

    /// An [`ActionPort`] that feeds this controller's sandbox.
    pub fn action_port(&self) -> Arc<dyn ActionPort> {
        Arc::new(BridgeActionPort {
            actions: self.actions.clone(),
        })
    }

    /// Claim the single run slot, or report what already holds it.
    pub fn begin_run(&self, kind: RunKind) -> Result<RunGuard, HostError> {
        let mut slot = self.run_slot.lock();
        if let Some(active) = *slot {
            return Err(HostError::RunActive(active));
        }
        *slot = Some(kind);
        debug!(target: "host.bridge", run = %kind, "run slot claimed");
        Ok(RunGuard {
            slot: self.run_slot.clone(),
        })
    }

    /// Tear the session down and wait for the pump to drain.
    pub async fn shutdown(self) {
        let HostController {
            session,
            actions,
            pump,
            ..
        } = self;
        drop(actions);
        session.shutdown().await;
        let _ = pump.await;
    }
}

/// Releases the run slot when dropped.
#[derive(Debug)]
pub struct RunGuard {
    slot: Arc<Mutex<Option<RunKind>>>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        *self.slot.lock() = None;
    }
}

struct BridgeActionPort {
    actions: mpsc::Sender<ActionCommand>,
}

#[async_trait]
impl ActionPort for BridgeActionPort {
    async fn dispatch(&self, command: ActionCommand) -> Result<(), PortError> {
        self.actions
            .send(command)
            .await
            .map_err(|_| PortError::Closed)
    }
}

async fn pump_bridge(
    mut endpoint: HostEndpoint,
    mut actions: mpsc::Receiver<ActionCommand>,
    inventory: watch::Sender<Inventory>,
    selection: watch::Sender<Option<String>>,
) {
    let mut seq = 0u64;
    let mut actions_open = true;
    loop {
        tokio::select! {
            event = endpoint.recv() => match event {
                Some(SandboxEvent::Elements(elements)) => {
                    seq += 1;
                    debug!(
                        target: "host.bridge",
                        seq,
                        count = elements.len(),
                        "inventory.updated"
                    );
                    inventory.send_replace(Inventory::new(seq, elements));
                }
                Some(SandboxEvent::Select { selector }) => {
                    debug!(target: "host.bridge", %selector, "selector.picked");
                    selection.send_replace(Some(selector));
                }
                None => break,
            },
            command = actions.recv(), if actions_open => match command {
                Some(command) => {
                    if endpoint.send_action(command).await.is_err() {
                        break;
                    }
                }
                None => actions_open = false,
            },
        }
    }
    debug!(target: "host.bridge", "bridge pump stopped");
}
