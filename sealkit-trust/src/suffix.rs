//! Public-suffix table for the bare-TLD SAN check.
//!
//! A legitimately issued certificate never carries a bare registry suffix
//! (`com`, `co.uk`, ...) as a SAN entry, and a wildcard whose base is such a
//! suffix would match every domain under it. The embedded table covers the
//! common generic and country-code suffixes; deployments can extend it
//! through `TrustPolicy::extra_public_suffixes`.

/// Bare registry suffixes that must never appear as a sole SAN entry or as
/// the base of a wildcard.
static PUBLIC_SUFFIXES: &[&str] = &[
    // generic
    "com", "net", "org", "edu", "gov", "mil", "int", "info", "biz", "name", "mobi", "app", "dev",
    "io", "co", "ai", "xyz", "online", "site", "top", "shop", "cloud",
    // country code
    "us", "uk", "de", "fr", "jp", "cn", "au", "ca", "ru", "ch", "it", "nl", "se", "no", "es",
    "br", "in", "kr", "mx", "pl", "at", "be", "dk", "fi", "ie", "nz", "pt", "tr", "za",
    // common second-level registry suffixes
    "co.uk", "org.uk", "ac.uk", "gov.uk", "com.au", "net.au", "org.au", "co.nz", "co.jp",
    "or.jp", "ne.jp", "com.br", "com.cn", "com.mx", "co.kr", "co.za", "co.in",
];

/// Normalize a DNS label for suffix comparison: lowercase, no trailing dot.
pub fn normalize(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

/// Whether `name` is exactly a public suffix (case-insensitive, trailing dot
/// ignored).
pub fn is_public_suffix(name: &str, extra: &[String]) -> bool {
    let name = normalize(name);
    if name.is_empty() {
        return false;
    }
    PUBLIC_SUFFIXES.iter().any(|s| *s == name)
        || extra.iter().any(|s| normalize(s) == name)
}
