use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrightDataError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("trigger response did not include a snapshot id")]
    MissingSnapshotId,
}

pub type Result<T> = std::result::Result<T, BrightDataError>;
