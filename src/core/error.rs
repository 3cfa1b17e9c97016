use thiserror::Error;

#[derive(Error, Debug)]
pub enum TxError {
    #[error("Illegal transaction state: {0}")]
    IllegalState(String),

    #[error("Transaction silently rolled back because an inner participant marked it rollback-only")]
    UnexpectedRollback,

    #[error("Resource error: {0}")]
    Resource(String),
}

pub type Result<T> = std::result::Result<T, TxError>;
