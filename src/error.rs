use thiserror::Error;

/// Errors raised anywhere between decoding an image and returning the
/// annotated result. Every stage fails fast with the first one it hits.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Unsupported format: expected 3 interleaved channels, got {channels}")]
    UnsupportedFormat { channels: u8 },

    #[error("Detection model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
