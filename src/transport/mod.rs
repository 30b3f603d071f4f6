//! Transport capability.
//!
//! The dispatcher only needs "perform a GET, tell me the final URL and the
//! body". [`HttpTransport`] does this over HTTPS; tests plug in their own.

mod http;
mod traits;

pub use http::{HttpTransport, DEFAULT_USER_AGENT};
pub use traits::{Transport, TransportReply};
