//! Typed errors for the scan engine.
//!
//! Errors are layered by how far they are allowed to travel:
//! - [`ScanError`] aborts a whole scan (store failures, unknown company)
//! - [`SourceError`] fails one sub-source, which the orchestrator degrades
//!   to an empty result
//! - everything below is local to a component and usually logged and skipped

use thiserror::Error;

/// Errors that abort a scan or a record deletion.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Reading or writing the roster failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The account has no company with this id
    #[error("company not found: {company_id}")]
    CompanyNotFound { company_id: String },
}

/// Errors from a single sub-source (website or LinkedIn).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("AI error: {0}")]
    Ai(#[from] AiError),

    #[error("snapshot API error: {0}")]
    Snapshot(#[from] brightdata_client::BrightDataError),

    /// A remote snapshot did not become ready within the retry budget
    #[error("snapshot {snapshot_id} not ready after {attempts} attempts")]
    SnapshotTimeout { snapshot_id: String, attempts: u32 },

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("web search failed: {0}")]
    Search(String),
}

/// Errors raised while driving a browser page.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// A page script threw or returned something unexpected
    #[error("script error: {0}")]
    Script(String),

    /// A frame could not be read in place (usually cross-origin)
    #[error("frame {index} is not accessible")]
    FrameInaccessible { index: usize },

    #[error("browser protocol error: {0}")]
    Protocol(String),
}

/// Errors from LLM calls.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI not configured: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("empty completion")]
    EmptyResponse,
}

/// Errors from the roster store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("roster is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from key-value caches.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache file is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from notification delivery.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Result type alias for sub-source operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Result type alias for browser operations.
pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

/// Result type alias for AI operations.
pub type AiResult<T> = std::result::Result<T, AiError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;
