use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("API request failed with status {status} after {retries} retries")]
    ApiErrorAfterRetries { status: u16, retries: u32 },

    /// GraphQL-level failure. `data` carries whatever partial data the API
    /// returned next to the errors.
    #[error("GraphQL errors: {}", messages.join(", "))]
    GraphQL {
        messages: Vec<String>,
        data: Option<serde_json::Value>,
    },

    #[error("GraphQL response contained no data")]
    NoResponseData,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cannot encode an empty record set")]
    EmptyInput,

    #[error("No data collected")]
    NoData,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AuditError>;
