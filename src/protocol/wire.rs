//! Text format of the verification protocol.

use crate::auth::{canonical_query, SignatureParams};

/// Path of the verification endpoint on every validation server.
pub const VERIFY_PATH: &str = "/wsapi/2.0/verify";

/// Validation servers used when no custom host list is configured.
pub const DEFAULT_HOSTS: &[&str] = &[
    "api.yubico.com",
    "api2.yubico.com",
    "api3.yubico.com",
    "api4.yubico.com",
    "api5.yubico.com",
];

/// Split a reply body into `(key, value)` pairs.
///
/// Lines without `=` or with an empty value are skipped. Keys and values are
/// trimmed; everything after the first `=` belongs to the value so base64
/// padding survives.
pub fn parse_body(body: &str) -> Vec<(&str, &str)> {
    body.split('\n')
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || value.is_empty() {
                return None;
            }
            Some((key, value))
        })
        .collect()
}

/// Build the signed query string: the canonical parameters plus `h`.
///
/// `signature` is expected to carry the protocol's `%2B` escaping already.
pub fn request_query(params: &SignatureParams, signature: &str) -> String {
    format!("{}&h={}", canonical_query(params), signature)
}

/// Build the absolute verification URL for one host.
pub fn verify_url(secure: bool, host: &str, query: &str) -> String {
    let scheme = if secure { "https" } else { "http" };
    format!("{}://{}{}?{}", scheme, host, VERIFY_PATH, query)
}
