//! Minimal inspection of a stapled OCSP response.
//!
//! The handshake hands us the raw DER of an `OCSPResponse`:
//!
//! ```text
//! OCSPResponse ::= SEQUENCE {
//!     responseStatus  OCSPResponseStatus,        -- ENUMERATED
//!     responseBytes   [0] EXPLICIT ResponseBytes OPTIONAL }
//! ```
//!
//! The stapling policy needs two facts: the responder answered
//! `successful(0)`, and it actually attached response bytes. Full
//! `BasicOCSPResponse` verification (responder signature, nonce) belongs to
//! the revocation checker behind the validator seam.

use asn1_rs::{Enumerated, FromDer, Sequence};

/// `OCSPResponseStatus` value for a usable answer.
pub const RESPONSE_STATUS_SUCCESSFUL: u32 = 0;

/// Context tag [0] wrapping `responseBytes`.
const RESPONSE_BYTES_TAG: u8 = 0xa0;

/// Whether the stapled DER is a successful OCSP response carrying response
/// bytes. Undecodable input is simply not good; the caller maps that to its
/// reason code.
pub fn response_is_good(der: &[u8]) -> bool {
    let Ok((_, outer)) = Sequence::from_der(der) else {
        return false;
    };
    let content: &[u8] = outer.content.as_ref();

    let Ok((rest, status)) = Enumerated::from_der(content) else {
        return false;
    };
    if status.0 != RESPONSE_STATUS_SUCCESSFUL {
        return false;
    }

    // A successful status without responseBytes carries no proof.
    !rest.is_empty() && rest[0] == RESPONSE_BYTES_TAG
}

#[cfg(test)]
mod tests {
    use super::*;

    // SEQUENCE { ENUMERATED 0, [0] { SEQUENCE {} } }
    const GOOD: &[u8] = &[0x30, 0x07, 0x0a, 0x01, 0x00, 0xa0, 0x02, 0x30, 0x00];
    // SEQUENCE { ENUMERATED 3 }  -- tryLater, no bytes
    const TRY_LATER: &[u8] = &[0x30, 0x03, 0x0a, 0x01, 0x03];
    // SEQUENCE { ENUMERATED 0 }  -- successful but empty
    const EMPTY_SUCCESS: &[u8] = &[0x30, 0x03, 0x0a, 0x01, 0x00];

    #[test]
    fn successful_response_with_bytes_is_good() {
        assert!(response_is_good(GOOD));
    }

    #[test]
    fn non_successful_status_is_not_good() {
        assert!(!response_is_good(TRY_LATER));
    }

    #[test]
    fn successful_without_response_bytes_is_not_good() {
        assert!(!response_is_good(EMPTY_SUCCESS));
    }

    #[test]
    fn garbage_is_not_good() {
        assert!(!response_is_good(&[]));
        assert!(!response_is_good(&[0xde, 0xad, 0xbe, 0xef]));
    }
}
