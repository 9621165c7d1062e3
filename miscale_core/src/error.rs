use thiserror::Error;

/// Caller-level and transport failures of a weighing session.
///
/// Data-quality problems (short frames, out-of-range weights) are never errors;
/// the decoder drops them and logs at `debug`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScaleError {
    #[error("a weighing session is already collecting")]
    SessionInProgress,
    #[error("invalid height: {0} cm (expected 50..=250)")]
    InvalidHeight(f32),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("scale disconnected")]
    Disconnected,
    #[error("timeout waiting for notification")]
    Timeout,
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
