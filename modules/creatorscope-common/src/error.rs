use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Unknown session: {0}")]
    UnknownSession(String),
}
