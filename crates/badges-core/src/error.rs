use thiserror::Error;

pub type Result<T> = std::result::Result<T, BadgeError>;

#[derive(Debug, Error)]
pub enum BadgeError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Registry returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}
