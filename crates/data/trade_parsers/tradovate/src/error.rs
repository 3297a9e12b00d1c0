use store::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("No active account: select an account before importing")]
    NoActiveAccount,

    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
