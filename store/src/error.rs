//! Errors from conversation store operations.

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("message not found: {0}")]
    NotFound(String),
    #[error("message {0} has children; use the recursive delete or pass --cascade")]
    HasChildren(String),
    #[error("operation canceled")]
    Canceled,
}
