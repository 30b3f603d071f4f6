//! Fan-out/fan-in over a [`Transport`].
//!
//! Every request runs in its own task. Tasks report back through a single
//! channel, so the response batch is only ever touched by the coordinator.
//! A failed or timed-out request contributes nothing but a failure count.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;

use crate::error::{TransportErrorKind, ValidateError};
use crate::protocol::{RequestBatch, ResponseBatch, ValidationResponse};
use crate::transport::{Transport, TransportReply};

/// Result of one dispatch round.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// Parsed replies in completion order.
    pub responses: ResponseBatch,
    /// Requests that produced no reply.
    pub failures: usize,
}

/// One finished request, as reported by its task.
struct Completion {
    url: Url,
    result: Result<TransportReply, ValidateError>,
    elapsed: Duration,
}

/// Sends request batches through a transport concurrently.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    request_timeout: Option<Duration>,
}

impl Dispatcher {
    /// Create a dispatcher. With `request_timeout` set, a request that takes
    /// longer counts as a transport failure.
    pub fn new(transport: Arc<dyn Transport>, request_timeout: Option<Duration>) -> Self {
        Self {
            transport,
            request_timeout,
        }
    }

    /// Issue every request at once and collect replies as they complete.
    ///
    /// Returns when all requests have either replied or failed.
    pub async fn dispatch(&self, batch: RequestBatch) -> DispatchOutcome {
        let submitted = batch.len();
        let started = Instant::now();
        let (tx, mut rx) = mpsc::channel::<Completion>(submitted.max(1));

        for request in batch {
            let tx = tx.clone();
            let transport = Arc::clone(&self.transport);
            let deadline = self.request_timeout;

            tokio::spawn(async move {
                let url = request.url().clone();
                let result = match deadline {
                    Some(limit) => match timeout(limit, transport.get(&url)).await {
                        Ok(result) => result,
                        Err(_) => Err(ValidateError::Transport {
                            kind: TransportErrorKind::Timeout {
                                timeout_ms: limit.as_millis() as u64,
                            },
                        }),
                    },
                    None => transport.get(&url).await,
                };

                // Receiver only goes away if the coordinator was dropped
                let _ = tx
                    .send(Completion {
                        url,
                        result,
                        elapsed: started.elapsed(),
                    })
                    .await;
            });
        }
        drop(tx);

        let mut responses = ResponseBatch::new();
        while let Some(completion) = rx.recv().await {
            match completion.result {
                Ok(reply) => {
                    let host = reply.final_url.host_str().map(str::to_string);
                    debug!(
                        host = host.as_deref().unwrap_or("-"),
                        latency_ms = completion.elapsed.as_millis() as u64,
                        "Response received"
                    );

                    let mut response = ValidationResponse::parse(&reply.body);
                    response.set_origin(host, completion.elapsed);
                    responses.push(response);
                }
                Err(e) => {
                    warn!(
                        host = completion.url.host_str().unwrap_or("-"),
                        error = %e,
                        "Dropping host after transport failure"
                    );
                }
            }
        }

        // Counted by difference so a panicked task is still a failure
        let failures = submitted - responses.len();
        DispatchOutcome {
            responses,
            failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ValidationRequest;
    use async_trait::async_trait;

    /// Replies after a per-host delay; hosts starting with "down" fail.
    struct DelayTransport;

    #[async_trait]
    impl Transport for DelayTransport {
        async fn get(&self, url: &Url) -> Result<TransportReply, ValidateError> {
            let host = url.host_str().unwrap_or_default().to_string();
            let delay: u64 = url
                .query_pairs()
                .find(|(k, _)| k == "delay")
                .and_then(|(_, v)| v.parse().ok())
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            if host.starts_with("down") {
                return Err(ValidateError::transport("connection refused"));
            }

            Ok(TransportReply {
                final_url: url.clone(),
                body: format!("status=OK\r\notp={}\r\n", host),
            })
        }
    }

    fn batch(targets: &[(&str, u64)]) -> RequestBatch {
        targets
            .iter()
            .map(|(host, delay)| {
                ValidationRequest::new(&format!("https://{}/wsapi/2.0/verify?delay={}", host, delay))
                    .unwrap()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_completion_order() {
        let dispatcher = Dispatcher::new(Arc::new(DelayTransport), None);
        let outcome = dispatcher
            .dispatch(batch(&[("slow.example", 150), ("fast.example", 0)]))
            .await;

        assert_eq!(outcome.failures, 0);
        assert_eq!(outcome.responses.len(), 2);
        assert_eq!(outcome.responses[0].host(), Some("fast.example"));
        assert_eq!(outcome.responses[1].host(), Some("slow.example"));
        assert!(outcome.responses[0].latency() <= outcome.responses[1].latency());
    }

    #[tokio::test]
    async fn test_failures_are_dropped_and_counted() {
        let dispatcher = Dispatcher::new(Arc::new(DelayTransport), None);
        let outcome = dispatcher
            .dispatch(batch(&[("up.example", 0), ("down.example", 0)]))
            .await;

        assert_eq!(outcome.failures, 1);
        assert_eq!(outcome.responses.len(), 1);
        assert_eq!(outcome.responses[0].otp(), Some("up.example"));
    }

    #[tokio::test]
    async fn test_deadline_counts_as_failure() {
        let dispatcher = Dispatcher::new(Arc::new(DelayTransport), Some(Duration::from_millis(50)));
        let outcome = dispatcher
            .dispatch(batch(&[("hung.example", 5_000), ("up.example", 0)]))
            .await;

        assert_eq!(outcome.failures, 1);
        assert_eq!(outcome.responses.len(), 1);
        assert_eq!(outcome.responses[0].host(), Some("up.example"));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let dispatcher = Dispatcher::new(Arc::new(DelayTransport), None);
        let outcome = dispatcher.dispatch(RequestBatch::new()).await;
        assert!(outcome.responses.is_empty());
        assert_eq!(outcome.failures, 0);
    }
}
