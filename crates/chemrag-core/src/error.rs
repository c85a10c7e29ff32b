use reqwest::StatusCode;
use thiserror::Error;

/// Why an `/ask` round trip failed.
///
/// The variants only exist for logging. Callers collapse every one of them
/// into the same fallback answer before anything reaches the user.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request to backend failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}
