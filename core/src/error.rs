use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReceiverError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Capture failure: {0}")]
    Capture(String),

    #[error("FFT error: {0}")]
    FftError(String),
}

pub type Result<T> = std::result::Result<T, ReceiverError>;
