use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("scale disconnected")]
    Disconnected,
    #[error("notification timeout")]
    Timeout,
    #[error("adapter error: {0}")]
    Adapter(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
