//! HMAC-SHA1 signing for the verification protocol.
//!
//! Both request and response signatures are computed over the same canonical
//! form: parameters sorted by key, form-urlencoded, with `%3A` turned back
//! into `:`. The base64 digest has every `+` escaped as `%2B`.

use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ring::hmac;

use crate::error::{ValidateError, ValidateResult};

/// Parameters to sign. `BTreeMap` keeps keys in byte-wise ascending order.
pub type SignatureParams = BTreeMap<String, String>;

/// Build the canonical string that gets signed.
pub fn canonical_query(params: &SignatureParams) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish()
        .replace("%3A", ":")
}

/// Apply the protocol's `+` escaping to a base64 string.
pub fn escape_plus(encoded: &str) -> String {
    encoded.replace('+', "%2B")
}

/// Request/response signer keyed with the shared API secret.
#[derive(Clone)]
pub struct Signer {
    key: hmac::Key,
}

impl Signer {
    /// Create a signer from raw secret bytes.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, secret),
        }
    }

    /// Create a signer from a base64-encoded API key.
    ///
    /// Fails with a configuration error when the key does not decode or
    /// decodes to nothing.
    pub fn from_api_key(api_key: &str) -> ValidateResult<Self> {
        let secret = decode_api_key(api_key)?;
        Ok(Self::new(&secret))
    }

    /// Sign `params`, returning the escaped base64 signature.
    pub fn sign(&self, params: &SignatureParams) -> String {
        let message = canonical_query(params);
        let tag = hmac::sign(&self.key, message.as_bytes());
        escape_plus(&STANDARD.encode(tag.as_ref()))
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}

/// Decode a base64 API key into the raw HMAC secret.
pub fn decode_api_key(api_key: &str) -> ValidateResult<Vec<u8>> {
    let secret = STANDARD
        .decode(api_key.trim())
        .map_err(|e| ValidateError::config(format!("Invalid API key: {}", e)))?;

    if secret.is_empty() {
        return Err(ValidateError::config("Invalid API key: decodes to an empty secret"));
    }

    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> SignatureParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_canonical_query_sorted() {
        let p = params(&[("otp", "abc"), ("id", "1"), ("nonce", "xyz"), ("timestamp", "1")]);
        assert_eq!(canonical_query(&p), "id=1&nonce=xyz&otp=abc&timestamp=1");
    }

    #[test]
    fn test_canonical_query_keeps_colons() {
        let p = params(&[("t", "2024-01-01T12:30:00Z0123")]);
        assert_eq!(canonical_query(&p), "t=2024-01-01T12:30:00Z0123");
    }

    #[test]
    fn test_known_vector() {
        // HMAC-SHA1("key", "The quick brown fox jumps over the lazy dog")
        // is de7c9b85b8b78aa6bc8a7a36f70a90701c9db4d9.
        let signer = Signer::new(b"key");
        let tag = hmac::sign(&signer.key, b"The quick brown fox jumps over the lazy dog");
        assert_eq!(hex::encode(tag.as_ref()), "de7c9b85b8b78aa6bc8a7a36f70a90701c9db4d9");
    }

    #[test]
    fn test_sign_deterministic() {
        let signer = Signer::new(b"secret");
        let p = params(&[("id", "1"), ("nonce", "n"), ("otp", "o"), ("timestamp", "1")]);
        assert_eq!(signer.sign(&p), signer.sign(&p));
    }

    #[test]
    fn test_sign_changes_with_params_and_secret() {
        let signer = Signer::new(b"secret");
        let base = params(&[("id", "1"), ("otp", "cccccc")]);
        let changed = params(&[("id", "1"), ("otp", "cccccd")]);
        assert_ne!(signer.sign(&base), signer.sign(&changed));
        assert_ne!(signer.sign(&base), Signer::new(b"secreu").sign(&base));
    }

    #[test]
    fn test_sign_never_contains_plus() {
        let signer = Signer::new(b"secret");
        for i in 0..200 {
            let p = params(&[("nonce", &i.to_string())]);
            let sig = signer.sign(&p);
            assert!(!sig.contains('+'));
        }
    }

    #[test]
    fn test_escape_plus() {
        assert_eq!(escape_plus("a+b+c="), "a%2Bb%2Bc=");
    }

    #[test]
    fn test_decode_api_key() {
        assert_eq!(decode_api_key("c2VjcmV0").unwrap(), b"secret");
        assert!(matches!(
            decode_api_key("not base64!"),
            Err(ValidateError::Config { .. })
        ));
        assert!(matches!(decode_api_key(""), Err(ValidateError::Config { .. })));
    }

    #[test]
    fn test_signer_debug_hides_key() {
        let signer = Signer::new(b"secret");
        assert!(!format!("{:?}", signer).contains("secret"));
    }
}
