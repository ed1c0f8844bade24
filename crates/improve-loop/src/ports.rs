//! Seams to the loop's external collaborators.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{GeneratedFile, PromptRecord};

/// Failure from the generation service. The display text reaches the
/// operator untouched, so variants format without decoration.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0}")]
    Service(String),
    #[error("generation service exhausted")]
    Exhausted,
}

/// Produces the next natural-language change request.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn next_change(
        &self,
        files: &[GeneratedFile],
        history: &[PromptRecord],
    ) -> Result<String, GenerationError>;
}

/// Present/absent lookup by service key.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn present(&self, service: &str) -> bool;
}

/// The host views the loop can switch between during a review pass.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HostView {
    Preview,
    Source,
}

/// The host's own prompt field and controls. This is the one surface the
/// loop drives directly rather than through the sandbox bridge.
#[async_trait]
pub trait PromptSurface: Send + Sync {
    async fn switch_view(&self, view: HostView);
    async fn append_char(&self, ch: char);
    async fn submit(&self);
}
