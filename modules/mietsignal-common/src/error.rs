use thiserror::Error;

#[derive(Error, Debug)]
pub enum MietsignalError {
    #[error("Database error: {0}")]
    Database(String),
}
