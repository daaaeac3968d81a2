use thiserror::Error;

/// Error types for the sealkit-keys crate
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("strong random source unavailable: {0}")]
    RandomUnavailable(String),

    #[error("keystore error: {0}")]
    KeystoreError(String),

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("ephemeral key already destroyed")]
    KeyDestroyed,

    #[error("authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("partial I/O not supported: {0}")]
    UnsupportedPartialIo(String),

    #[error("stream closed")]
    StreamClosed,

    #[error("crypto error: {0}")]
    CryptoError(String),

    #[error("invalid key length")]
    InvalidKeyLength,

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for sealkit-keys operations
pub type Result<T> = std::result::Result<T, KeyError>;
