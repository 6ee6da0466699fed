// Moodbench Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MoodBenchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Response from {url} exceeds {limit} bytes")]
    ResponseTooLarge { url: String, limit: u64 },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Worker pool error: {0}")]
    Pool(String),

    #[error("Annotation error: {0}")]
    Annotation(String),

    #[error("{0}")]
    Other(String),
}

impl From<chromiumoxide::error::CdpError> for MoodBenchError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        MoodBenchError::Browser(err.to_string())
    }
}

impl From<anyhow::Error> for MoodBenchError {
    fn from(err: anyhow::Error) -> Self {
        MoodBenchError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MoodBenchError>;
