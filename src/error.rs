use thiserror::Error;

#[derive(Error, Debug)]
pub enum DrillDownError {
    #[error("Invalid root depth {0}: must be 2, 4 or 6")]
    InvalidRootDepth(u8),

    #[error("Invalid top-N limit {0}: must be at least 1")]
    InvalidTopN(usize),

    #[error("Invalid amount in row {row}: {details}")]
    InvalidAmount { row: usize, details: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DrillDownError>;
