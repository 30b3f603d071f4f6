//! HTTP(S) transport built on reqwest.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::error::{TransportErrorKind, ValidateError, ValidateResult};

use super::{Transport, TransportReply};

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Transport that talks to validation servers over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport whose requests give up after `timeout`.
    pub fn new(timeout: Duration, user_agent: &str) -> ValidateResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ValidateError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<TransportReply, ValidateError> {
        // reqwest errors embed the request URL, which carries the OTP
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            let e = e.without_url();
            if e.is_timeout() {
                ValidateError::transport(format!("timed out: {}", e))
            } else {
                ValidateError::transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ValidateError::Transport {
                kind: TransportErrorKind::HttpStatus {
                    status: status.as_u16(),
                },
            });
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| {
                ValidateError::transport(format!("Failed to read body: {}", e.without_url()))
            })?;

        debug!(
            host = final_url.host_str().unwrap_or("-"),
            bytes = body.len(),
            "HTTP exchange complete"
        );

        Ok(TransportReply { final_url, body })
    }
}
