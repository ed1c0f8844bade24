use std::time::Duration;

use action_executor::{execute, TypingTempo};
use element_scanner::scan;
use page_model::{DocumentSpec, PageDocument};
use pagepilot_core_types::{Point, SessionId};
use selector_engine::compute_selector;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::channel::{bridge_pair, HostEndpoint, SandboxEndpoint, DEFAULT_BRIDGE_CAPACITY};
use crate::errors::BridgeError;

pub const DEFAULT_SETTLE_MS: u64 = 400;

/// Session tuning. The settle delay is the one-shot pause between a content
/// load (or mutation) and the scan that reports on it, giving the rendered
/// app time to finish painting.
#[derive(Clone, Copy, Debug)]
pub struct SandboxConfig {
    pub settle: Duration,
    pub typing: TypingTempo,
    pub channel_capacity: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
            typing: TypingTempo::default(),
            channel_capacity: DEFAULT_BRIDGE_CAPACITY,
        }
    }
}

enum Command {
    Load(Box<DocumentSpec>),
    SetVisualEdit(bool),
    Hover(Point),
    Pick(Point),
    Probe(oneshot::Sender<Option<PageDocument>>),
}

/// Host-held control surface for one sandbox session: the embedding seam
/// (loading content, forwarding user gestures, teardown), deliberately
/// separate from the bridge protocol itself.
pub struct SandboxHandle {
    session_id: SessionId,
    control: mpsc::Sender<Command>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

/// Start a session task and hand back its control handle plus the host end
/// of the bridge.
pub fn spawn_session(config: SandboxConfig) -> (SandboxHandle, HostEndpoint) {
    let (host_endpoint, sandbox_endpoint) = bridge_pair(config.channel_capacity);
    let (control_tx, control_rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();
    let session_id = SessionId::new();

    let session = SandboxSession {
        session_id: session_id.clone(),
        document: None,
        visual_edit: false,
        generation: 0,
        settle: config.settle,
        typing: config.typing,
        endpoint: sandbox_endpoint,
        control_rx,
        cancel: cancel.clone(),
    };
    let task = tokio::spawn(session.run());

    (
        SandboxHandle {
            session_id,
            control: control_tx,
            cancel,
            task: Some(task),
        },
        host_endpoint,
    )
}

impl SandboxHandle {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Replace the rendered document. A scan follows after the settle delay;
    /// a spec the model rejects degrades to an immediate empty inventory.
    pub async fn load(&self, spec: DocumentSpec) -> Result<(), BridgeError> {
        self.send(Command::Load(Box::new(spec))).await
    }

    pub async fn set_visual_edit(&self, enabled: bool) -> Result<(), BridgeError> {
        self.send(Command::SetVisualEdit(enabled)).await
    }

    /// Forward a pointer hover. Only meaningful in visual-edit mode, where
    /// it refreshes the inventory.
    pub async fn hover(&self, point: Point) -> Result<(), BridgeError> {
        self.send(Command::Hover(point)).await
    }

    /// Forward a visual pick gesture; the session answers with a `SELECT`
    /// frame when something selectable is under the point.
    pub async fn pick(&self, point: Point) -> Result<(), BridgeError> {
        self.send(Command::Pick(point)).await
    }

    /// Clone of the current document state, for tests and diagnostics.
    pub async fn document(&self) -> Result<Option<PageDocument>, BridgeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Probe(tx)).await?;
        rx.await.map_err(|_| BridgeError::Closed)
    }

    async fn send(&self, command: Command) -> Result<(), BridgeError> {
        self.control
            .send(command)
            .await
            .map_err(|_| BridgeError::Closed)
    }

    /// Stop the session and wait for the task to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SandboxHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct SandboxSession {
    session_id: SessionId,
    document: Option<PageDocument>,
    visual_edit: bool,
    generation: u64,
    settle: Duration,
    typing: TypingTempo,
    endpoint: SandboxEndpoint,
    control_rx: mpsc::Receiver<Command>,
    cancel: CancellationToken,
}

impl SandboxSession {
    async fn run(self) {
        let SandboxSession {
            session_id,
            mut document,
            mut visual_edit,
            mut generation,
            settle,
            typing,
            mut endpoint,
            mut control_rx,
            cancel,
        } = self;

        debug!(target: "sandbox.session", session = %session_id, "session started");
        let mut settle_at: Option<Instant> = None;

        loop {
            let deadline = settle_at.unwrap_or_else(far_future);
            tokio::select! {
                _ = cancel.cancelled() => break,

                command = control_rx.recv() => {
                    let Some(command) = command else { break };
                    match command {
                        Command::Load(spec) => match PageDocument::from_spec(&spec) {
                            Ok(built) => {
                                debug!(
                                    target: "sandbox.session",
                                    session = %session_id,
                                    nodes = built.len(),
                                    "document loaded"
                                );
                                document = Some(built);
                                settle_at = Some(Instant::now() + settle);
                            }
                            Err(error) => {
                                warn!(
                                    target: "sandbox.session",
                                    session = %session_id,
                                    %error,
                                    "document rejected"
                                );
                                document = None;
                                settle_at = None;
                                if endpoint.post_elements(Vec::new()).await.is_err() {
                                    break;
                                }
                            }
                        },
                        Command::SetVisualEdit(enabled) => visual_edit = enabled,
                        Command::Hover(_) => {
                            if visual_edit
                                && scan_and_post(&mut document, &endpoint, &mut generation)
                                    .await
                                    .is_err()
                            {
                                break;
                            }
                        }
                        Command::Pick(point) => {
                            if visual_edit
                                && post_pick(&document, &endpoint, point).await.is_err()
                            {
                                break;
                            }
                        }
                        Command::Probe(responder) => {
                            let _ = responder.send(document.clone());
                        }
                    }
                }

                action = endpoint.recv() => {
                    let Some(action) = action else { break };
                    match document.as_mut() {
                        Some(doc) => {
                            tokio::select! {
                                _ = cancel.cancelled() => break,
                                report = execute(doc, &action, typing) => {
                                    debug!(
                                        target: "sandbox.session",
                                        session = %session_id,
                                        verb = %report.verb,
                                        performed = report.performed,
                                        "action handled"
                                    );
                                }
                            }
                            // The app may have reacted; report fresh state
                            // after the settle delay.
                            settle_at = Some(Instant::now() + settle);
                        }
                        None => {
                            debug!(
                                target: "sandbox.session",
                                session = %session_id,
                                "action ignored, no document"
                            );
                        }
                    }
                }

                _ = tokio::time::sleep_until(deadline), if settle_at.is_some() => {
                    settle_at = None;
                    if scan_and_post(&mut document, &endpoint, &mut generation)
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
        }
        debug!(target: "sandbox.session", session = %session_id, "session stopped");
    }
}

/// Scan the current document and post the inventory. Scan failures and a
/// missing document both degrade to an empty inventory; only a dead bridge
/// is an error, and that just ends the session.
async fn scan_and_post(
    document: &mut Option<PageDocument>,
    endpoint: &SandboxEndpoint,
    generation: &mut u64,
) -> Result<(), BridgeError> {
    let elements = match document.as_mut() {
        Some(doc) => match scan(doc) {
            Ok(elements) => elements,
            Err(error) => {
                warn!(
                    target: "sandbox.session",
                    %error,
                    "scan failed, reporting empty inventory"
                );
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    *generation += 1;
    debug!(
        target: "sandbox.session",
        generation = *generation,
        elements = elements.len(),
        "inventory posted"
    );
    endpoint.post_elements(elements).await
}

async fn post_pick(
    document: &Option<PageDocument>,
    endpoint: &SandboxEndpoint,
    point: Point,
) -> Result<(), BridgeError> {
    let Some(doc) = document else {
        return Ok(());
    };
    let Some(node) = doc.hit_test(point) else {
        return Ok(());
    };
    match compute_selector(doc, node) {
        Some(selector) => endpoint.post_select(selector).await,
        None => Ok(()),
    }
}

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86_400)
}
