use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioModemError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    #[error("Payload of {len} bytes exceeds packet size of {max} bytes")]
    PayloadTooLarge { len: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, AudioModemError>;
