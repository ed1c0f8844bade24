use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to encode bridge frame: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode bridge frame: {0}")]
    Decode(#[source] serde_json::Error),
    /// The other side of the boundary is gone.
    #[error("bridge channel closed")]
    Closed,
}
