use thiserror::Error;

/// Errors surfaced by loading data, writing artifacts and running exported models.
#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("protobuf error: {0}")]
    Protobuf(#[from] protobuf::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("invalid raw dump: {0}")]
    InvalidDump(String),

    #[error("unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
