//! Response signature verification.

use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::protocol::{ResponseBatch, ValidationResponse};

use super::Signer;

/// Verifies that replies were signed with the shared API secret.
#[derive(Debug, Clone)]
pub struct ResponseAuthenticator {
    signer: Signer,
}

impl ResponseAuthenticator {
    pub fn new(signer: Signer) -> Self {
        Self { signer }
    }

    /// Check a single reply.
    ///
    /// The expected signature is recomputed over the present signed fields
    /// and compared in constant time against the escaped reply hash.
    pub fn authenticate(&self, response: &ValidationResponse) -> bool {
        let Some(received) = response.hash(true) else {
            return false;
        };

        let expected = self.signer.sign(&response.signature_params());
        expected.as_bytes().ct_eq(received.as_bytes()).into()
    }

    /// Drop every reply that fails authentication.
    ///
    /// Returns the number of replies removed.
    pub fn retain_authentic(&self, responses: &mut ResponseBatch) -> usize {
        let before = responses.len();
        responses.retain(|response| {
            let ok = self.authenticate(response);
            if ok {
                debug!(host = response.host().unwrap_or("-"), "Response signature verified");
            } else {
                warn!(
                    host = response.host().unwrap_or("-"),
                    "Dropping response with invalid signature"
                );
            }
            ok
        });
        before - responses.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SignatureParams;

    fn signed_body(signer: &Signer, fields: &[(&str, &str)]) -> String {
        let params: SignatureParams = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let hash = signer.sign(&params).replace("%2B", "+");

        let mut body = format!("h={}\r\n", hash);
        for (k, v) in fields {
            body.push_str(&format!("{}={}\r\n", k, v));
        }
        body
    }

    const FIELDS: &[(&str, &str)] = &[
        ("t", "2024-01-01T12:30:00Z0123"),
        ("otp", "cccccckdvvulethkhtvkrtbeukiettuurfhddbfjnnhf"),
        ("nonce", "aef3a7f6d1b84c9bb3f3c1c4e2e0a8f1"),
        ("sl", "100"),
        ("status", "OK"),
    ];

    #[test]
    fn test_valid_signature() {
        let signer = Signer::new(b"secret");
        let response = ValidationResponse::parse(&signed_body(&signer, FIELDS));
        assert!(ResponseAuthenticator::new(signer).authenticate(&response));
    }

    #[test]
    fn test_hash_with_plus_accepted() {
        // Signature of these fields under "secret" is u1HWO2rY9RcdPK7XZxS+IFMbw+U=
        let body = "h=u1HWO2rY9RcdPK7XZxS+IFMbw+U=\r\n\
            t=2024-01-01T12:30:00Z0123\r\n\
            otp=cccccckdvvulethkhtvkrtbeukiettuurfhddbfjnnhf\r\n\
            nonce=00000000000000000000000000000000\r\n\
            sl=100\r\n\
            status=OK\r\n";
        let response = ValidationResponse::parse(body);
        assert_eq!(
            response.hash(true).as_deref(),
            Some("u1HWO2rY9RcdPK7XZxS%2BIFMbw%2BU=")
        );

        let authenticator = ResponseAuthenticator::new(Signer::new(b"secret"));
        assert!(authenticator.authenticate(&response));

        let flipped = ValidationResponse::parse(&body.replace("S+I", "S/I"));
        assert!(!authenticator.authenticate(&flipped));
    }

    #[test]
    fn test_unpadded_hash_accepted() {
        let signer = Signer::new(b"secret");
        let body = signed_body(&signer, FIELDS).replacen("=\r\n", "\r\n", 1);
        let response = ValidationResponse::parse(&body);
        assert!(ResponseAuthenticator::new(signer).authenticate(&response));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let response = ValidationResponse::parse(&signed_body(&Signer::new(b"secret"), FIELDS));
        assert!(!ResponseAuthenticator::new(Signer::new(b"other")).authenticate(&response));
    }

    #[test]
    fn test_tampered_field_rejected() {
        let signer = Signer::new(b"secret");
        let body = signed_body(&signer, FIELDS).replace("status=OK", "status=BAD_OTP");
        let response = ValidationResponse::parse(&body);
        assert!(!ResponseAuthenticator::new(signer).authenticate(&response));
    }

    #[test]
    fn test_missing_hash_rejected() {
        let response = ValidationResponse::parse("status=OK\r\n");
        assert!(!ResponseAuthenticator::new(Signer::new(b"secret")).authenticate(&response));
    }

    #[test]
    fn test_retain_authentic() {
        let signer = Signer::new(b"secret");
        let mut batch = ResponseBatch::new();
        batch.push(ValidationResponse::parse(&signed_body(&signer, FIELDS)));
        batch.push(ValidationResponse::parse("h=forged=\r\nstatus=OK\r\n"));

        let dropped = ResponseAuthenticator::new(signer).retain_authentic(&mut batch);
        assert_eq!(dropped, 1);
        assert_eq!(batch.len(), 1);
    }
}
