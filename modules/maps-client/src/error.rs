use thiserror::Error;

pub type Result<T> = std::result::Result<T, MapsError>;

#[derive(Debug, Error)]
pub enum MapsError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl From<reqwest::Error> for MapsError {
    fn from(err: reqwest::Error) -> Self {
        MapsError::Network(err.to_string())
    }
}
