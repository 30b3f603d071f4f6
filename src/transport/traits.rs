//! Transport trait definition.

use async_trait::async_trait;
use url::Url;

use crate::error::ValidateError;

/// A completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct TransportReply {
    /// URL of the final response, after any redirects.
    pub final_url: Url,
    /// Response body.
    pub body: String,
}

/// Something that can perform many outstanding `GET` requests at once.
///
/// Implementations must be safe to call concurrently from spawned tasks.
/// Any `Err` is treated by the dispatcher as a failure of that host alone.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<TransportReply, ValidateError>;
}
