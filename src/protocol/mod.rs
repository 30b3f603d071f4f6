//! Wire protocol module.
//!
//! Defines the outbound request and inbound response types of the
//! verification protocol, and the text format they travel in.
//!
//! ## Wire Format
//!
//! Requests are plain `GET`s against `/wsapi/2.0/verify`. Replies are
//! `text/plain`, one `key=value` pair per line:
//! ```text
//! h=vjhFxZrNHB5CjI6vhuSeF2n46a8=
//! t=2024-01-01T12:30:00Z0123
//! otp=cccccckdvvulethkhtvkrtbeukiettuurfhddbfjnnhf
//! nonce=aef3a7f6d1b84c9bb3f3c1c4e2e0a8f1
//! status=OK
//! ```

mod request;
mod response;
mod wire;

pub use request::{RequestBatch, ValidationRequest};
pub use response::{ProtocolStatus, ResponseBatch, ValidationResponse, SIGNED_FIELDS};
pub use wire::{parse_body, request_query, verify_url, DEFAULT_HOSTS, VERIFY_PATH};
