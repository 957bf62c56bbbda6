//! Error types for the banking assistant

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

/// Failures raised by a record store adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Invalid stored value: {0}")]
    Invalid(String),
}

impl StoreError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

/// Failures raised by a generation adapter before an outcome could be read.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generation API key not configured")]
    MissingApiKey,

    #[error("HTTP client error: {0}")]
    Http(reqwest::Error),

    #[error("Generation API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Generation timed out after {0}s")]
    Timeout(u64),

    #[error("Generation response could not be parsed: {0}")]
    Parse(String),
}

// Request URLs can carry credentials (the Bot API token is part of the path),
// so they are stripped before a reqwest error is stored or displayed.
impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}

#[derive(Error, Debug)]
pub enum AssistantError {

    // =============================
    // Adapter Errors
    // =============================

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Transport error: {0}")]
    Transport(String),

    // =============================
    // Boot Errors
    // =============================

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<reqwest::Error> for AssistantError {
    fn from(e: reqwest::Error) -> Self {
        Self::HttpError(e.without_url())
    }
}
