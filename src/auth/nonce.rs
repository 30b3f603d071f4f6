//! Per-request nonce generation.

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::warn;

/// Number of random bytes behind each nonce (32 hex characters).
const NONCE_BYTES: usize = 16;

/// Generates single-use request nonces.
///
/// Draws from the operating system CSPRNG and falls back to the thread-local
/// generator (itself seeded from the OS) if that source errors.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonceGenerator;

impl NonceGenerator {
    /// Create a new nonce generator.
    pub fn new() -> Self {
        Self
    }

    /// Produce a fresh hex-encoded nonce.
    pub fn generate(&self) -> String {
        let mut bytes = [0u8; NONCE_BYTES];
        if let Err(e) = OsRng.try_fill_bytes(&mut bytes) {
            warn!(error = %e, "OS random source unavailable, using thread RNG for nonce");
            rand::thread_rng().fill_bytes(&mut bytes);
        }
        hex::encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_nonce_shape() {
        let nonce = NonceGenerator::new().generate();
        assert_eq!(nonce.len(), 32);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_nonces_do_not_repeat() {
        let generator = NonceGenerator::new();
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(generator.generate()));
        }
    }
}
