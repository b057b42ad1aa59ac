use thiserror::Error;

#[derive(Error, Debug)]
pub enum RorError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[cfg(feature = "http")]
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("not a ROR id: {0}")]
    InvalidId(String),
    #[error("ROR id not found in registry: {0}")]
    NotFound(String),
}
