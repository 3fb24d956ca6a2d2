use thiserror::Error;

#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("Input not time-ordered at interval {index}: {reason}")]
    InputOrder { index: usize, reason: String },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Merge did not converge after {rounds} rounds")]
    MergeDidNotConverge { rounds: usize },

    #[error("Audio read failed: {0}")]
    AudioRead(String),

    #[error("Audio write failed: {0}")]
    AudioWrite(String),

    #[error("Worker failed: {0}")]
    Worker(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SegmentError>;
