use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("element with empty tag name")]
    EmptyTag,
    #[error("viewport must have positive dimensions")]
    InvalidViewport,
}
