//! Authentication module.
//!
//! Handles request signing, response signature verification, and nonce
//! generation.

mod authenticator;
mod nonce;
mod signer;

pub use authenticator::ResponseAuthenticator;
pub use nonce::NonceGenerator;
pub use signer::{canonical_query, decode_api_key, escape_plus, SignatureParams, Signer};
