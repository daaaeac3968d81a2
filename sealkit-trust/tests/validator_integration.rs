use std::sync::Arc;

use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, IsCa, KeyUsagePurpose, SanType,
};
use rustls_pki_types::CertificateDer;
use x509_parser::prelude::{FromDer, X509Certificate};

use sealkit_common::logging::{Component, Logger};
use sealkit_trust::*;

fn logger() -> Arc<Logger> {
    Arc::new(Logger::new_root(Component::Trust, "test"))
}

fn ca_params(common_name: &str) -> CertificateParams {
    let mut params = CertificateParams::new(vec![]);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
    params
        .distinguished_name
        .push(DnType::CommonName, common_name);
    params
}

fn leaf_params(common_name: &str, san_dns: Vec<String>) -> CertificateParams {
    let mut params = CertificateParams::new(san_dns);
    params
        .distinguished_name
        .push(DnType::CommonName, common_name);
    params
}

struct TestPki {
    root: Certificate,
    root_der: Vec<u8>,
}

impl TestPki {
    fn new(root_cn: &str) -> Self {
        let root = Certificate::from_params(ca_params(root_cn)).expect("root generation failed");
        let root_der = root.serialize_der().expect("root serialization failed");
        Self { root, root_der }
    }

    fn issue_leaf(&self, cn: &str, san_dns: Vec<String>) -> Vec<u8> {
        let leaf = Certificate::from_params(leaf_params(cn, san_dns))
            .expect("leaf generation failed");
        leaf.serialize_der_with_signer(&self.root)
            .expect("leaf signing failed")
    }

    fn root_der(&self) -> CertificateDer<'static> {
        CertificateDer::from(self.root_der.clone())
    }
}

fn serial_of(der: &[u8]) -> String {
    let (_, cert) = X509Certificate::from_der(der).expect("certificate should parse");
    cert.raw_serial_as_string()
}

fn validator(pki: &TestPki, policy: TrustPolicy, revocation: StaticRevocationChecker) -> TrustValidator {
    TrustValidator::new(vec![pki.root_der()], policy, Arc::new(revocation), logger())
}

#[test]
fn valid_chain_is_trusted() {
    let pki = TestPki::new("Sealkit Test Root");
    let leaf = pki.issue_leaf("app.example.test", vec!["app.example.test".to_string()]);
    let v = validator(&pki, TrustPolicy::default(), StaticRevocationChecker::new());

    let decision = v
        .validate(&[CertificateDer::from(leaf)], "app.example.test")
        .expect("validate failed");
    assert!(decision.trusted);
    assert_eq!(decision.reason, TrustReason::Valid);
    assert_eq!(decision.hostname, "app.example.test");
}

#[test]
fn self_signed_root_in_chain_changes_nothing() {
    let pki = TestPki::new("Sealkit Test Root");
    let leaf = pki.issue_leaf("app.example.test", vec!["app.example.test".to_string()]);
    let v = validator(&pki, TrustPolicy::default(), StaticRevocationChecker::new());

    let without_root = v
        .validate(&[CertificateDer::from(leaf.clone())], "app.example.test")
        .expect("validate failed");
    let with_root = v
        .validate(
            &[CertificateDer::from(leaf), pki.root_der()],
            "app.example.test",
        )
        .expect("validate failed");

    assert_eq!(without_root, with_root);
    assert!(with_root.trusted);
}

#[test]
fn chain_of_three_with_intermediate_is_trusted() {
    let pki = TestPki::new("Sealkit Test Root");

    let intermediate =
        Certificate::from_params(ca_params("Sealkit Test Intermediate"))
            .expect("intermediate generation failed");
    let intermediate_der = intermediate
        .serialize_der_with_signer(&pki.root)
        .expect("intermediate signing failed");

    let leaf = Certificate::from_params(leaf_params(
        "deep.example.test",
        vec!["deep.example.test".to_string()],
    ))
    .expect("leaf generation failed");
    let leaf_der = leaf
        .serialize_der_with_signer(&intermediate)
        .expect("leaf signing failed");

    let v = validator(&pki, TrustPolicy::default(), StaticRevocationChecker::new());
    let decision = v
        .validate(
            &[
                CertificateDer::from(leaf_der),
                CertificateDer::from(intermediate_der),
            ],
            "deep.example.test",
        )
        .expect("validate failed");
    assert!(decision.trusted);
}

#[test]
fn chain_anchored_elsewhere_is_path_invalid() {
    let pki = TestPki::new("Sealkit Test Root");
    let other = TestPki::new("Unrelated Root");
    let leaf = other.issue_leaf("app.example.test", vec!["app.example.test".to_string()]);

    // Validator only trusts `pki`, the leaf chains to `other`.
    let v = validator(&pki, TrustPolicy::default(), StaticRevocationChecker::new());
    let decision = v
        .validate(&[CertificateDer::from(leaf)], "app.example.test")
        .expect("validate failed");
    assert!(!decision.trusted);
    assert_eq!(decision.reason, TrustReason::PathInvalid);
}

#[test]
fn revoked_leaf_is_rejected() {
    let pki = TestPki::new("Sealkit Test Root");
    let leaf = pki.issue_leaf("app.example.test", vec!["app.example.test".to_string()]);
    let revocation = StaticRevocationChecker::new().with_revoked(&serial_of(&leaf));

    let v = validator(&pki, TrustPolicy::default(), revocation);
    let decision = v
        .validate(&[CertificateDer::from(leaf)], "app.example.test")
        .expect("validate failed");
    assert!(!decision.trusted);
    assert_eq!(decision.reason, TrustReason::RevokedOrUnknown);
}

#[test]
fn ocsp_unknown_honors_crl_fallback_policy() {
    let pki = TestPki::new("Sealkit Test Root");
    let leaf = pki.issue_leaf("app.example.test", vec!["app.example.test".to_string()]);
    let serial = serial_of(&leaf);

    // With CRL fallback the clean CRL answer rescues the chain.
    let v = validator(
        &pki,
        TrustPolicy::default(),
        StaticRevocationChecker::new().with_ocsp_unknown(&serial),
    );
    let decision = v
        .validate(&[CertificateDer::from(leaf.clone())], "app.example.test")
        .expect("validate failed");
    assert!(decision.trusted);

    // OCSP-only treats the unknown answer as failure.
    let v = validator(
        &pki,
        TrustPolicy {
            revocation: RevocationPolicy::OcspOnly,
            ..TrustPolicy::default()
        },
        StaticRevocationChecker::new().with_ocsp_unknown(&serial),
    );
    let decision = v
        .validate(&[CertificateDer::from(leaf)], "app.example.test")
        .expect("validate failed");
    assert!(!decision.trusted);
    assert_eq!(decision.reason, TrustReason::RevokedOrUnknown);
}

#[test]
fn hostname_mismatch_is_rejected() {
    let pki = TestPki::new("Sealkit Test Root");
    let leaf = pki.issue_leaf("app.example.test", vec!["app.example.test".to_string()]);
    let v = validator(&pki, TrustPolicy::default(), StaticRevocationChecker::new());

    let decision = v
        .validate(&[CertificateDer::from(leaf)], "other.example.test")
        .expect("validate failed");
    assert!(!decision.trusted);
    assert_eq!(decision.reason, TrustReason::HostnameMismatch);
}

#[test]
fn bare_tld_san_is_rejected_despite_valid_signatures() {
    let pki = TestPki::new("Sealkit Test Root");
    // Otherwise-valid leaf that also claims the bare suffix "COM".
    let leaf = pki.issue_leaf(
        "app.example.test",
        vec!["app.example.test".to_string(), "COM".to_string()],
    );
    let v = validator(&pki, TrustPolicy::default(), StaticRevocationChecker::new());

    let decision = v
        .validate(&[CertificateDer::from(leaf)], "app.example.test")
        .expect("validate failed");
    assert!(!decision.trusted);
    assert_eq!(decision.reason, TrustReason::BareTldSan);
}

#[test]
fn bare_tld_san_on_intermediate_is_rejected() {
    let pki = TestPki::new("Sealkit Test Root");

    // Issuing CA that also claims the bare suffix "com".
    let mut params = ca_params("Sealkit Test Intermediate");
    params
        .subject_alt_names
        .push(SanType::DnsName("com".to_string()));
    let intermediate =
        Certificate::from_params(params).expect("intermediate generation failed");
    let intermediate_der = intermediate
        .serialize_der_with_signer(&pki.root)
        .expect("intermediate signing failed");

    let leaf = Certificate::from_params(leaf_params(
        "app.example.test",
        vec!["app.example.test".to_string()],
    ))
    .expect("leaf generation failed");
    let leaf_der = leaf
        .serialize_der_with_signer(&intermediate)
        .expect("leaf signing failed");

    let v = validator(&pki, TrustPolicy::default(), StaticRevocationChecker::new());
    let decision = v
        .validate(
            &[
                CertificateDer::from(leaf_der),
                CertificateDer::from(intermediate_der),
            ],
            "app.example.test",
        )
        .expect("validate failed");
    assert!(!decision.trusted);
    assert_eq!(decision.reason, TrustReason::BareTldSan);
}

#[test]
fn cn_fallback_applies_only_without_san_extension() {
    let pki = TestPki::new("Sealkit Test Root");
    let v = validator(&pki, TrustPolicy::default(), StaticRevocationChecker::new());

    // No SAN extension at all: the subject CN is consulted.
    let no_san = pki.issue_leaf("app.example.test", vec![]);
    let decision = v
        .validate(&[CertificateDer::from(no_san)], "app.example.test")
        .expect("validate failed");
    assert!(decision.trusted);

    // SAN extension present but carrying only an IP address: the CN must
    // not be consulted even though it matches.
    let mut params = leaf_params("app.example.test", vec![]);
    params
        .subject_alt_names
        .push(SanType::IpAddress("10.0.0.1".parse().expect("ip")));
    let ip_only = Certificate::from_params(params).expect("leaf generation failed");
    let ip_only_der = ip_only
        .serialize_der_with_signer(&pki.root)
        .expect("leaf signing failed");

    let decision = v
        .validate(&[CertificateDer::from(ip_only_der)], "app.example.test")
        .expect("validate failed");
    assert!(!decision.trusted);
    assert_eq!(decision.reason, TrustReason::HostnameMismatch);
}

#[test]
fn missing_staple_is_rejected_when_required() {
    let pki = TestPki::new("Sealkit Test Root");
    let leaf = pki.issue_leaf("app.example.test", vec!["app.example.test".to_string()]);
    let v = validator(
        &pki,
        TrustPolicy {
            require_stapling: true,
            ..TrustPolicy::default()
        },
        StaticRevocationChecker::new(),
    );
    let chain = [CertificateDer::from(leaf)];

    let absent = v
        .validate_stapled(&chain, "app.example.test", None)
        .expect("validate failed");
    assert_eq!(absent.reason, TrustReason::MissingOcspStaple);

    let empty = v
        .validate_stapled(&chain, "app.example.test", Some(&[]))
        .expect("validate failed");
    assert_eq!(empty.reason, TrustReason::MissingOcspStaple);

    // Minimal successful OCSPResponse with response bytes attached.
    let good_staple: &[u8] = &[0x30, 0x07, 0x0a, 0x01, 0x00, 0xa0, 0x02, 0x30, 0x00];
    let stapled = v
        .validate_stapled(&chain, "app.example.test", Some(good_staple))
        .expect("validate failed");
    assert!(stapled.trusted);

    // Responder said tryLater: present but unusable.
    let try_later: &[u8] = &[0x30, 0x03, 0x0a, 0x01, 0x03];
    let unusable = v
        .validate_stapled(&chain, "app.example.test", Some(try_later))
        .expect("validate failed");
    assert_eq!(unusable.reason, TrustReason::RevokedOrUnknown);
}

#[test]
fn staple_is_optional_without_the_policy() {
    let pki = TestPki::new("Sealkit Test Root");
    let leaf = pki.issue_leaf("app.example.test", vec!["app.example.test".to_string()]);
    let v = validator(&pki, TrustPolicy::default(), StaticRevocationChecker::new());

    let decision = v
        .validate_stapled(&[CertificateDer::from(leaf)], "app.example.test", None)
        .expect("validate failed");
    assert!(decision.trusted);
}

#[test]
fn wildcard_leaf_matches_subdomain() {
    let pki = TestPki::new("Sealkit Test Root");
    let leaf = pki.issue_leaf("*.example.test", vec!["*.example.test".to_string()]);
    let v = validator(&pki, TrustPolicy::default(), StaticRevocationChecker::new());
    let chain = [CertificateDer::from(leaf)];

    let matching = v
        .validate(&chain, "app.example.test")
        .expect("validate failed");
    assert!(matching.trusted);

    let base = v.validate(&chain, "example.test").expect("validate failed");
    assert_eq!(base.reason, TrustReason::HostnameMismatch);
}
