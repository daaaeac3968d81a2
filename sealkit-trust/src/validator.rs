//! Trust validation for outbound connection certificate chains.

use std::collections::HashSet;
use std::sync::Arc;

use rustls_pki_types::CertificateDer;
use serde::{Deserialize, Serialize};
use x509_parser::prelude::*;

use sealkit_common::logging::Logger;

use crate::error::{Result, TrustError};
use crate::staple;
use crate::suffix;

/// Why a chain was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrustReason {
    Valid,
    PathInvalid,
    RevokedOrUnknown,
    HostnameMismatch,
    BareTldSan,
    MissingOcspStaple,
}

/// Outcome of validating one chain for one hostname.
///
/// Computed fresh per connection attempt and never cached: a certificate may
/// be revoked between two connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustDecision {
    pub trusted: bool,
    pub hostname: String,
    pub reason: TrustReason,
}

impl TrustDecision {
    fn valid(hostname: &str) -> Self {
        Self {
            trusted: true,
            hostname: hostname.to_string(),
            reason: TrustReason::Valid,
        }
    }

    fn rejected(hostname: &str, reason: TrustReason) -> Self {
        Self {
            trusted: false,
            hostname: hostname.to_string(),
            reason,
        }
    }
}

/// How revocation is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevocationPolicy {
    /// OCSP answers only; an unknown OCSP status rejects the chain.
    OcspOnly,
    /// Prefer OCSP, consult CRLs when OCSP has no answer.
    OcspWithCrlFallback,
}

/// Policy knobs for the validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustPolicy {
    pub revocation: RevocationPolicy,
    /// Treat an absent stapled OCSP response as a hard failure during
    /// handshake validation.
    pub require_stapling: bool,
    /// Deployment-specific additions to the embedded public-suffix table.
    pub extra_public_suffixes: Vec<String>,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self {
            revocation: RevocationPolicy::OcspWithCrlFallback,
            require_stapling: false,
            extra_public_suffixes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationStatus {
    Good,
    Revoked,
    Unknown,
}

/// Revocation source seam. Live OCSP/CRL fetching is transport work owned by
/// the embedding application; the validator only consumes statuses.
pub trait RevocationChecker: Send + Sync {
    fn ocsp_status(&self, cert: &X509Certificate<'_>) -> RevocationStatus;
    fn crl_status(&self, cert: &X509Certificate<'_>) -> RevocationStatus;
}

/// Table-driven checker keyed by certificate serial, for offline use and
/// tests. Unlisted certificates are good.
#[derive(Default)]
pub struct StaticRevocationChecker {
    revoked: HashSet<String>,
    ocsp_unknown: HashSet<String>,
}

impl StaticRevocationChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a serial (as `raw_serial_as_string`) revoked in both sources.
    pub fn with_revoked(mut self, serial: &str) -> Self {
        self.revoked.insert(serial.to_string());
        self
    }

    /// Mark a serial as having no OCSP answer; CRL still reports it good.
    pub fn with_ocsp_unknown(mut self, serial: &str) -> Self {
        self.ocsp_unknown.insert(serial.to_string());
        self
    }
}

impl RevocationChecker for StaticRevocationChecker {
    fn ocsp_status(&self, cert: &X509Certificate<'_>) -> RevocationStatus {
        let serial = cert.raw_serial_as_string();
        if self.revoked.contains(&serial) {
            RevocationStatus::Revoked
        } else if self.ocsp_unknown.contains(&serial) {
            RevocationStatus::Unknown
        } else {
            RevocationStatus::Good
        }
    }

    fn crl_status(&self, cert: &X509Certificate<'_>) -> RevocationStatus {
        if self.revoked.contains(&cert.raw_serial_as_string()) {
            RevocationStatus::Revoked
        } else {
            RevocationStatus::Good
        }
    }
}

/// Validates certificate chains for outbound connections.
///
/// Anchors come from the platform trust store at construction; presented
/// self-issued roots are stripped before path building, so a chain validates
/// identically whether or not the server included its root.
pub struct TrustValidator {
    roots: Vec<CertificateDer<'static>>,
    policy: TrustPolicy,
    revocation: Arc<dyn RevocationChecker>,
    logger: Arc<Logger>,
}

impl TrustValidator {
    pub fn new(
        roots: Vec<CertificateDer<'static>>,
        policy: TrustPolicy,
        revocation: Arc<dyn RevocationChecker>,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            roots,
            policy,
            revocation,
            logger,
        }
    }

    /// Validate a leaf-first chain for `hostname`.
    pub fn validate(&self, chain: &[CertificateDer<'_>], hostname: &str) -> Result<TrustDecision> {
        self.validate_inner(chain, hostname, None, false)
    }

    /// Handshake variant: additionally apply the stapled-OCSP policy.
    pub fn validate_stapled(
        &self,
        chain: &[CertificateDer<'_>],
        hostname: &str,
        stapled_ocsp: Option<&[u8]>,
    ) -> Result<TrustDecision> {
        self.validate_inner(chain, hostname, stapled_ocsp, true)
    }

    fn validate_inner(
        &self,
        chain: &[CertificateDer<'_>],
        hostname: &str,
        stapled_ocsp: Option<&[u8]>,
        handshake: bool,
    ) -> Result<TrustDecision> {
        if chain.is_empty() {
            return Err(TrustError::InvalidInput(
                "empty certificate chain".to_string(),
            ));
        }

        let parsed = chain
            .iter()
            .map(|der| parse_certificate(der.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        // Self-issued roots in the presented chain carry no information: the
        // anchor always comes from the configured trust store.
        let path: Vec<&X509Certificate<'_>> =
            parsed.iter().filter(|c| !is_self_issued(c)).collect();

        let Some(leaf) = path.first().copied() else {
            return Ok(self.reject(hostname, TrustReason::PathInvalid));
        };

        if !self.path_is_valid(&path)? {
            return Ok(self.reject(hostname, TrustReason::PathInvalid));
        }

        if !self.revocation_clean(&path) {
            return Ok(self.reject(hostname, TrustReason::RevokedOrUnknown));
        }

        if handshake && self.policy.require_stapling {
            match stapled_ocsp {
                None => return Ok(self.reject(hostname, TrustReason::MissingOcspStaple)),
                Some(der) if der.is_empty() => {
                    return Ok(self.reject(hostname, TrustReason::MissingOcspStaple))
                }
                Some(der) => {
                    if !staple::response_is_good(der) {
                        return Ok(self.reject(hostname, TrustReason::RevokedOrUnknown));
                    }
                }
            }
        }

        if !self.hostname_matches_leaf(leaf, hostname) {
            return Ok(self.reject(hostname, TrustReason::HostnameMismatch));
        }

        if self.path_has_bare_tld_san(&path) {
            return Ok(self.reject(hostname, TrustReason::BareTldSan));
        }

        self.logger
            .info(format!("chain for '{hostname}' accepted"));
        Ok(TrustDecision::valid(hostname))
    }

    fn reject(&self, hostname: &str, reason: TrustReason) -> TrustDecision {
        // Host and reason only; never certificate or key material.
        self.logger
            .warn(format!("chain for '{hostname}' rejected: {reason:?}"));
        TrustDecision::rejected(hostname, reason)
    }

    /// Walk leaf → intermediates → configured anchor, verifying signatures,
    /// validity windows and CA constraints on every issuer.
    fn path_is_valid(&self, path: &[&X509Certificate<'_>]) -> Result<bool> {
        let anchors = self
            .roots
            .iter()
            .map(|der| parse_certificate(der.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut used = vec![false; path.len()];
        used[0] = true;
        let mut current = path[0];

        loop {
            if !current.validity().is_valid() {
                return Ok(false);
            }

            // Anchor reached?
            if let Some(anchor) = anchors
                .iter()
                .find(|a| a.subject().as_raw() == current.issuer().as_raw())
            {
                if !anchor.validity().is_valid() {
                    return Ok(false);
                }
                return Ok(current.verify_signature(Some(anchor.public_key())).is_ok());
            }

            // Otherwise the issuer must be among the presented intermediates.
            let next = path.iter().enumerate().find(|(i, candidate)| {
                !used[*i] && candidate.subject().as_raw() == current.issuer().as_raw()
            });

            match next {
                Some((i, issuer)) => {
                    if !is_ca(issuer) {
                        return Ok(false);
                    }
                    if current.verify_signature(Some(issuer.public_key())).is_err() {
                        return Ok(false);
                    }
                    used[i] = true;
                    current = *issuer;
                }
                None => return Ok(false),
            }
        }
    }

    fn revocation_clean(&self, path: &[&X509Certificate<'_>]) -> bool {
        path.iter().all(|cert| {
            match self.revocation.ocsp_status(cert) {
                RevocationStatus::Good => true,
                RevocationStatus::Revoked => false,
                RevocationStatus::Unknown => match self.policy.revocation {
                    RevocationPolicy::OcspOnly => false,
                    RevocationPolicy::OcspWithCrlFallback => {
                        self.revocation.crl_status(cert) == RevocationStatus::Good
                    }
                },
            }
        })
    }

    fn hostname_matches_leaf(&self, leaf: &X509Certificate<'_>, hostname: &str) -> bool {
        let host = suffix::normalize(hostname);
        if host.is_empty() {
            return false;
        }

        match san_dns_names(leaf) {
            // A present SAN extension is authoritative even when it carries
            // no dNSName entries at all.
            Some(names) => names
                .iter()
                .any(|name| self.presented_name_matches(name, &host)),
            // No SAN extension: fall back to the subject CN.
            None => leaf
                .subject()
                .iter_common_name()
                .next()
                .and_then(|cn| cn.as_str().ok())
                .map(|cn| self.presented_name_matches(cn, &host))
                .unwrap_or(false),
        }
    }

    /// RFC 6125 matching: case-insensitive, wildcard only as the complete
    /// left-most label, never matching a bare label or a registry suffix.
    fn presented_name_matches(&self, presented: &str, host: &str) -> bool {
        let presented = suffix::normalize(presented);

        if let Some(base) = presented.strip_prefix("*.") {
            if base.is_empty() || !base.contains('.') {
                return false;
            }
            if suffix::is_public_suffix(base, &self.policy.extra_public_suffixes) {
                return false;
            }
            return match host.split_once('.') {
                Some((first_label, rest)) => {
                    !first_label.is_empty() && !first_label.contains('*') && rest == base
                }
                None => false,
            };
        }

        presented == host
    }

    /// Whether any certificate in the path, not just the leaf, claims a bare
    /// registry suffix among its SAN dNSNames.
    fn path_has_bare_tld_san(&self, path: &[&X509Certificate<'_>]) -> bool {
        path.iter().any(|cert| {
            san_dns_names(cert).unwrap_or_default().iter().any(|name| {
                suffix::is_public_suffix(name, &self.policy.extra_public_suffixes)
            })
        })
    }
}

fn parse_certificate(der: &[u8]) -> Result<X509Certificate<'_>> {
    X509Certificate::from_der(der)
        .map(|(_, cert)| cert)
        .map_err(|e| TrustError::CertificateParse(e.to_string()))
}

fn is_self_issued(cert: &X509Certificate<'_>) -> bool {
    cert.subject().as_raw() == cert.issuer().as_raw()
}

fn is_ca(cert: &X509Certificate<'_>) -> bool {
    match cert.basic_constraints() {
        Ok(Some(ext)) => ext.value.ca,
        _ => false,
    }
}

/// SAN dNSNames, or `None` when the certificate has no SAN extension. The
/// distinction matters: a SAN extension listing only IP addresses still
/// disables the CN fallback.
fn san_dns_names(cert: &X509Certificate<'_>) -> Option<Vec<String>> {
    match cert.subject_alternative_name() {
        Ok(Some(ext)) => Some(
            ext.value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some(suffix::normalize(dns)),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}
