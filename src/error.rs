use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployFreqError {
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream rate limit hit: {0}")]
    UpstreamRateLimited(String),

    #[error("Unexpected upstream response: {0}")]
    UpstreamBadResponse(String),

    #[error("Invalid tier: {0}")]
    InvalidTier(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for DeployFreqError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::UpstreamBadResponse(e.to_string())
        } else {
            Self::UpstreamUnavailable(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, DeployFreqError>;
