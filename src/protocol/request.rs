//! Request types for the verification protocol.

use std::ops::Index;

use url::Url;

use crate::error::{InputErrorKind, ValidateError, ValidateResult};

/// A single outbound verification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRequest {
    url: Url,
}

impl ValidationRequest {
    /// HTTP verb used for every request.
    pub const VERB: &'static str = "GET";

    /// Create a request for an absolute `http(s)` URL.
    pub fn new(url: &str) -> ValidateResult<Self> {
        let invalid = || ValidateError::Input {
            kind: InputErrorKind::InvalidUrl {
                url: url.to_string(),
            },
        };

        let parsed = Url::parse(url).map_err(|_| invalid())?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(invalid());
        }

        Ok(Self { url: parsed })
    }

    /// The HTTP verb.
    pub fn verb(&self) -> &'static str {
        Self::VERB
    }

    /// The target URL.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Ordered set of requests for one check.
#[derive(Debug, Clone, Default)]
pub struct RequestBatch {
    requests: Vec<ValidationRequest>,
}

impl RequestBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: ValidationRequest) {
        self.requests.push(request);
    }

    pub fn get(&self, index: usize) -> Option<&ValidationRequest> {
        self.requests.get(index)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationRequest> {
        self.requests.iter()
    }
}

impl Index<usize> for RequestBatch {
    type Output = ValidationRequest;

    fn index(&self, index: usize) -> &Self::Output {
        &self.requests[index]
    }
}

impl FromIterator<ValidationRequest> for RequestBatch {
    fn from_iter<I: IntoIterator<Item = ValidationRequest>>(iter: I) -> Self {
        Self {
            requests: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for RequestBatch {
    type Item = ValidationRequest;
    type IntoIter = std::vec::IntoIter<ValidationRequest>;

    fn into_iter(self) -> Self::IntoIter {
        self.requests.into_iter()
    }
}

impl<'a> IntoIterator for &'a RequestBatch {
    type Item = &'a ValidationRequest;
    type IntoIter = std::slice::Iter<'a, ValidationRequest>;

    fn into_iter(self) -> Self::IntoIter {
        self.requests.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_url() {
        let request = ValidationRequest::new("https://api.yubico.com/wsapi/2.0/verify?id=1").unwrap();
        assert_eq!(request.verb(), "GET");
        assert_eq!(request.url().host_str(), Some("api.yubico.com"));
    }

    #[test]
    fn test_invalid_urls_rejected() {
        for url in ["", "api.yubico.com/verify", "/wsapi/2.0/verify", "mailto:a@b.c"] {
            assert!(
                matches!(
                    ValidationRequest::new(url),
                    Err(ValidateError::Input {
                        kind: InputErrorKind::InvalidUrl { .. }
                    })
                ),
                "accepted {url:?}"
            );
        }
    }

    #[test]
    fn test_batch_preserves_order() {
        let mut batch = RequestBatch::new();
        batch.push(ValidationRequest::new("https://a.example/").unwrap());
        batch.push(ValidationRequest::new("https://b.example/").unwrap());

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].url().host_str(), Some("a.example"));
        assert_eq!(batch.get(1).unwrap().url().host_str(), Some("b.example"));
        assert!(batch.get(2).is_none());
    }
}
