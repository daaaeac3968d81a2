use thiserror::Error;

/// Error types for the sealkit-trust crate.
///
/// These cover malformed input only; a chain that parses but fails a trust
/// check yields a negative `TrustDecision` instead.
#[derive(Error, Debug)]
pub enum TrustError {
    #[error("certificate parse error: {0}")]
    CertificateParse(String),

    #[error("invalid trust input: {0}")]
    InvalidInput(String),
}

/// Result type for sealkit-trust operations
pub type Result<T> = std::result::Result<T, TrustError>;
