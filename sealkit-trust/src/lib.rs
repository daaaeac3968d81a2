//! Sealkit trust – transport trust decisions.
//!
//! Validates an outbound connection's certificate chain: PKIX-style path
//! validation against configured anchors, revocation (OCSP preferred, CRL
//! fallback by policy), TLS hostname verification and a deliberate extra
//! check rejecting certificates whose SAN list names a bare public suffix.
//! Failed trust is an expected outcome the caller branches on, so failures
//! come back as a [`TrustDecision`] with a reason code, not as errors.

pub mod error;
pub mod staple;
pub mod suffix;
pub mod validator;

pub use error::{Result, TrustError};

pub use validator::{
    RevocationChecker, RevocationPolicy, RevocationStatus, StaticRevocationChecker, TrustDecision,
    TrustPolicy, TrustReason, TrustValidator,
};
