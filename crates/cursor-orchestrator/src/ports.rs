use async_trait::async_trait;
use pagepilot_core_types::ActionCommand;
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortError {
    /// The far side of the bridge is gone; the run cannot continue.
    #[error("action port closed")]
    Closed,
}

/// Where dispatched actions go. Production wires this to the host end of a
/// sandbox bridge; tests record in memory.
#[async_trait]
pub trait ActionPort: Send + Sync {
    async fn dispatch(&self, command: ActionCommand) -> Result<(), PortError>;
}

/// In-memory port for offline runs and tests.
#[derive(Debug, Default)]
pub struct RecordingPort {
    dispatched: Mutex<Vec<ActionCommand>>,
}

impl RecordingPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatched(&self) -> Vec<ActionCommand> {
        self.dispatched.lock().clone()
    }
}

#[async_trait]
impl ActionPort for RecordingPort {
    async fn dispatch(&self, command: ActionCommand) -> Result<(), PortError> {
        self.dispatched.lock().push(command);
        Ok(())
    }
}
