use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("failed to create HTTP client: {0}")]
    HttpClient(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("no matching source found, request: {url}")]
    NoMatchFound { url: String },

    #[error("download of {url} failed with HTTP status {status}")]
    Download { url: String, status: u16 },

    #[error("invalid light curve file: {0}")]
    FileFormat(String),

    #[error("plot error: {0}")]
    Plot(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
