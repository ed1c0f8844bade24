use pagepilot_core_types::{ActionCommand, InteractiveElement};
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::BridgeError;
use crate::messages::BridgeMessage;
use crate::metrics;

pub const DEFAULT_BRIDGE_CAPACITY: usize = 64;

/// Build the two ends of one boundary. Frames travel as serialized JSON in
/// both directions; each endpoint re-validates what it receives and drops
/// what it cannot trust.
pub fn bridge_pair(capacity: usize) -> (HostEndpoint, SandboxEndpoint) {
    let (to_sandbox_tx, to_sandbox_rx) = mpsc::channel(capacity);
    let (to_host_tx, to_host_rx) = mpsc::channel(capacity);
    (
        HostEndpoint {
            tx: to_sandbox_tx,
            rx: to_host_rx,
        },
        SandboxEndpoint {
            tx: to_host_tx,
            rx: to_sandbox_rx,
        },
    )
}

/// What the host may observe from the sandbox.
#[derive(Clone, Debug, PartialEq)]
pub enum SandboxEvent {
    Elements(Vec<InteractiveElement>),
    Select { selector: String },
}

/// Host side of the boundary. The host is the only party permitted to
/// initiate an `ACTION`; inbound `ACTION` frames are therefore dropped here.
pub struct HostEndpoint {
    pub(crate) tx: mpsc::Sender<String>,
    pub(crate) rx: mpsc::Receiver<String>,
}

impl HostEndpoint {
    pub async fn send_action(&self, command: ActionCommand) -> Result<(), BridgeError> {
        let frame = BridgeMessage::Action {
            action: command.verb,
            payload: command.payload,
        }
        .encode()?;
        self.tx.send(frame).await.map_err(|_| BridgeError::Closed)?;
        metrics::record_action_sent();
        Ok(())
    }

    /// Next validated sandbox event, or `None` once the sandbox is gone.
    pub async fn recv(&mut self) -> Option<SandboxEvent> {
        while let Some(frame) = self.rx.recv().await {
            match BridgeMessage::decode(&frame) {
                Ok(BridgeMessage::Elements { elements }) => {
                    return Some(SandboxEvent::Elements(elements));
                }
                Ok(BridgeMessage::Select { selector }) => {
                    return Some(SandboxEvent::Select { selector });
                }
                Ok(BridgeMessage::Action { .. }) => {
                    metrics::record_frame_dropped();
                    debug!(target: "bridge.events", "frame.dropped.illegal_direction");
                }
                Err(error) => {
                    metrics::record_frame_dropped();
                    debug!(target: "bridge.events", %error, "frame.dropped.malformed");
                }
            }
        }
        None
    }
}

/// Sandbox side of the boundary. Only `ELEMENTS` and `SELECT` may leave it;
/// only `ACTION` frames are accepted from the host.
pub struct SandboxEndpoint {
    pub(crate) tx: mpsc::Sender<String>,
    pub(crate) rx: mpsc::Receiver<String>,
}

impl SandboxEndpoint {
    pub async fn post_elements(
        &self,
        elements: Vec<InteractiveElement>,
    ) -> Result<(), BridgeError> {
        self.post(BridgeMessage::Elements { elements }).await
    }

    pub async fn post_select(&self, selector: impl Into<String>) -> Result<(), BridgeError> {
        self.post(BridgeMessage::Select {
            selector: selector.into(),
        })
        .await
    }

    async fn post(&self, message: BridgeMessage) -> Result<(), BridgeError> {
        let frame = message.encode()?;
        self.tx.send(frame).await.map_err(|_| BridgeError::Closed)?;
        metrics::record_event_posted();
        Ok(())
    }

    /// Next validated action from the host, or `None` once the host is gone.
    pub async fn recv(&mut self) -> Option<ActionCommand> {
        while let Some(frame) = self.rx.recv().await {
            match BridgeMessage::decode(&frame) {
                Ok(BridgeMessage::Action { action, payload }) => {
                    return Some(ActionCommand {
                        verb: action,
                        payload,
                    });
                }
                Ok(_) => {
                    metrics::record_frame_dropped();
                    debug!(target: "bridge.events", "frame.dropped.illegal_direction");
                }
                Err(error) => {
                    metrics::record_frame_dropped();
                    debug!(target: "bridge.events", %error, "frame.dropped.malformed");
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagepilot_core_types::{ActionType, ElementId, Rect};

    fn sample_element() -> InteractiveElement {
        InteractiveElement {
            id: ElementId(0),
            geometry: Rect::new(0.0, 0.0, 10.0, 10.0),
            tag: "BUTTON".to_string(),
            text: "go".to_string(),
            action_type: ActionType::Click,
            href: None,
        }
    }

    #[tokio::test]
    async fn actions_reach_the_sandbox_side() {
        let (host, mut sandbox) = bridge_pair(8);
        host.send_action(ActionCommand::click(ElementId(2)))
            .await
            .unwrap();
        let command = sandbox.recv().await.unwrap();
        assert_eq!(command, ActionCommand::click(ElementId(2)));
    }

    #[tokio::test]
    async fn inventories_reach_the_host_side() {
        let (mut host, sandbox) = bridge_pair(8);
        sandbox.post_elements(vec![sample_element()]).await.unwrap();
        match host.recv().await.unwrap() {
            SandboxEvent::Elements(elements) => assert_eq!(elements.len(), 1),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_and_unknown_frames_are_dropped() {
        let (mut host, sandbox) = bridge_pair(8);
        sandbox.tx.send("not json".to_string()).await.unwrap();
        sandbox
            .tx
            .send(r#"{"type":"EVAL","code":"1"}"#.to_string())
            .await
            .unwrap();
        sandbox.post_select("#target").await.unwrap();

        // Both bad frames are skipped without surfacing anywhere.
        match host.recv().await.unwrap() {
            SandboxEvent::Select { selector } => assert_eq!(selector, "#target"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn hosts_ignore_reflected_actions() {
        let (mut host, sandbox) = bridge_pair(8);
        // A compromised sandbox tries to speak the host's verb.
        sandbox
            .tx
            .send(r#"{"type":"ACTION","action":"click","payload":{"id":0}}"#.to_string())
            .await
            .unwrap();
        sandbox.post_elements(vec![]).await.unwrap();

        match host.recv().await.unwrap() {
            SandboxEvent::Elements(elements) => assert!(elements.is_empty()),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn sandboxes_ignore_reflected_events() {
        let (host, mut sandbox) = bridge_pair(8);
        host.tx
            .send(r#"{"type":"ELEMENTS","elements":[]}"#.to_string())
            .await
            .unwrap();
        host.send_action(ActionCommand::scroll(10.0)).await.unwrap();

        let command = sandbox.recv().await.unwrap();
        assert_eq!(command.verb, pagepilot_core_types::ActionVerb::Scroll);
    }

    #[tokio::test]
    async fn recv_ends_when_the_peer_is_dropped() {
        let (mut host, sandbox) = bridge_pair(8);
        drop(sandbox);
        assert!(host.recv().await.is_none());
    }
}
