use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    /// A sealed subtree (cross-origin frame) refused inspection. The session
    /// reports an empty inventory instead of propagating this further.
    #[error("sealed subtree denies inspection")]
    AccessDenied,
}
