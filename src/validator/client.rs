//! The validation client.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::auth::{NonceGenerator, ResponseAuthenticator, SignatureParams, Signer};
use crate::config::Settings;
use crate::consensus::{evaluate, ConsensusPolicy};
use crate::dispatch::Dispatcher;
use crate::error::{InputErrorKind, ValidateError, ValidateResult};
use crate::protocol::{
    request_query, verify_url, RequestBatch, ResponseBatch, ValidationRequest, ValidationResponse,
    DEFAULT_HOSTS,
};
use crate::transport::{HttpTransport, Transport};
use crate::validation::{public_id, validate_otp};

use super::hosts::{HostSelector, RandomSelector};

/// Outcome of one check.
#[derive(Debug, Serialize)]
pub struct Verdict {
    /// Whether the OTP was accepted.
    pub success: bool,
    /// Public identifier of the token that produced the OTP.
    pub yubikey_id: String,
    /// Hosts that produced no reply.
    pub failures: usize,
    /// Replies dropped for a bad signature.
    pub rejected: usize,
    /// Authenticated replies, in arrival order.
    pub responses: ResponseBatch,
}

/// Client for the OTP verification protocol.
pub struct Validator {
    signer: Signer,
    authenticator: ResponseAuthenticator,
    client_id: Option<u64>,
    hosts: Vec<String>,
    secure: bool,
    multi: bool,
    policy: ConsensusPolicy,
    selector: Box<dyn HostSelector>,
    dispatcher: Dispatcher,
    nonces: NonceGenerator,
}

impl Validator {
    /// Start building a validator for the given base64 API key.
    pub fn builder(api_key: impl Into<String>) -> ValidatorBuilder {
        ValidatorBuilder::new(api_key)
    }

    /// Build a validator from loaded settings, talking HTTP(S).
    pub fn from_settings(settings: &Settings) -> ValidateResult<Self> {
        let timeout = Duration::from_millis(settings.transport.request_timeout_ms);
        let transport = HttpTransport::new(timeout, &settings.transport.user_agent)?;
        let client = &settings.client;

        let mut builder = Self::builder(client.api_key.clone())
            .hosts(client.hosts.clone())
            .secure(client.secure)
            .multi(client.multi)
            .policy(client.policy)
            .host_selector(client.host_selection.selector())
            .transport(Arc::new(transport))
            .request_timeout(timeout);
        if let Some(client_id) = client.client_id {
            builder = builder.client_id(client_id);
        }

        builder.build()
    }

    pub fn client_id(&self) -> Option<u64> {
        self.client_id
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn policy(&self) -> ConsensusPolicy {
        self.policy
    }

    /// Check an OTP using the configured single/multi host mode.
    pub async fn check(&self, otp: &str) -> ValidateResult<Verdict> {
        self.check_with(otp, self.multi).await
    }

    /// Check an OTP against one selected host, or every host when `multi`.
    ///
    /// Only input and configuration problems are returned as errors. Host
    /// failures, forged replies and rejections all end up in the verdict.
    pub async fn check_with(&self, otp: &str, multi: bool) -> ValidateResult<Verdict> {
        let otp = validate_otp(otp)?;
        let client_id = self.client_id.ok_or(ValidateError::Input {
            kind: InputErrorKind::MissingClientId,
        })?;

        let yubikey_id = public_id(otp).to_string();
        let span = info_span!(
            "check",
            check_id = %Uuid::new_v4(),
            yubikey_id = %yubikey_id,
            multi
        );

        self.run_check(otp, client_id, multi, yubikey_id)
            .instrument(span)
            .await
    }

    async fn run_check(
        &self,
        otp: &str,
        client_id: u64,
        multi: bool,
        yubikey_id: String,
    ) -> ValidateResult<Verdict> {
        let nonce = self.nonces.generate();

        let mut params = SignatureParams::new();
        params.insert("id".to_string(), client_id.to_string());
        params.insert("otp".to_string(), otp.to_string());
        params.insert("nonce".to_string(), nonce.clone());
        params.insert("timestamp".to_string(), "1".to_string());
        let query = request_query(&params, &self.signer.sign(&params));

        let mut batch = RequestBatch::new();
        for host in self.target_hosts(multi) {
            batch.push(ValidationRequest::new(&verify_url(self.secure, &host, &query))?);
        }
        debug!(requests = batch.len(), "Dispatching verification requests");

        let outcome = self.dispatcher.dispatch(batch).await;
        let mut responses = outcome.responses;
        for response in responses.iter_mut() {
            response.set_input(otp, nonce.as_str());
        }

        let rejected = self.authenticator.retain_authentic(&mut responses);
        let success = evaluate(&responses, self.policy);

        info!(
            success,
            responses = responses.len(),
            failures = outcome.failures,
            rejected,
            policy = %self.policy,
            "Check complete"
        );

        Ok(Verdict {
            success,
            yubikey_id,
            failures: outcome.failures,
            rejected,
            responses,
        })
    }

    /// Hosts for this check, taken from a per-call copy of the host list.
    fn target_hosts(&self, multi: bool) -> Vec<String> {
        if multi || self.hosts.len() <= 1 {
            return self.hosts.clone();
        }

        let mut working = self.hosts.clone();
        let index = self.selector.pick(working.len()).min(working.len() - 1);
        vec![working.remove(index)]
    }

    /// Sign `params` with the configured secret, or with raw `key` bytes.
    pub fn generate_signature(&self, params: &SignatureParams, key: Option<&[u8]>) -> String {
        match key {
            Some(key) => Signer::new(key).sign(params),
            None => self.signer.sign(params),
        }
    }

    /// Whether `response` carries a valid signature under the configured secret.
    pub fn validate_response_signature(&self, response: &ValidationResponse) -> bool {
        self.authenticator.authenticate(response)
    }

    /// Public identifier of the token that produced `otp`.
    pub fn yubikey_id(otp: &str) -> &str {
        public_id(otp)
    }
}

/// Builder for [`Validator`].
pub struct ValidatorBuilder {
    api_key: String,
    client_id: Option<u64>,
    hosts: Vec<String>,
    secure: bool,
    multi: bool,
    policy: ConsensusPolicy,
    selector: Option<Box<dyn HostSelector>>,
    transport: Option<Arc<dyn Transport>>,
    request_timeout: Option<Duration>,
}

impl ValidatorBuilder {
    fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client_id: None,
            hosts: Vec::new(),
            secure: true,
            multi: false,
            policy: ConsensusPolicy::default(),
            selector: None,
            transport: None,
            request_timeout: None,
        }
    }

    pub fn client_id(mut self, client_id: u64) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Replace the default validation hosts. An empty list keeps the defaults.
    pub fn hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Use `https` (default) or plain `http`.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Query every host by default instead of one.
    pub fn multi(mut self, multi: bool) -> Self {
        self.multi = multi;
        self
    }

    pub fn policy(mut self, policy: ConsensusPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn host_selector(mut self, selector: Box<dyn HostSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Per-request deadline; expiry counts as a transport failure.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Finish building.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the API key does not decode, no
    /// transport was supplied, or a host does not form a valid URL.
    pub fn build(self) -> ValidateResult<Validator> {
        let signer = Signer::from_api_key(&self.api_key)?;
        let transport = self
            .transport
            .ok_or_else(|| ValidateError::config("No transport configured"))?;

        let hosts = if self.hosts.is_empty() {
            DEFAULT_HOSTS.iter().map(|h| h.to_string()).collect()
        } else {
            self.hosts
        };
        for host in &hosts {
            ValidationRequest::new(&verify_url(self.secure, host, ""))
                .map_err(|_| ValidateError::config(format!("Invalid validation host '{}'", host)))?;
        }

        Ok(Validator {
            authenticator: ResponseAuthenticator::new(signer.clone()),
            signer,
            client_id: self.client_id,
            hosts,
            secure: self.secure,
            multi: self.multi,
            policy: self.policy,
            selector: self
                .selector
                .unwrap_or_else(|| Box::new(RandomSelector::new())),
            dispatcher: Dispatcher::new(transport, self.request_timeout),
            nonces: NonceGenerator::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportReply;
    use crate::validator::FixedSelector;
    use async_trait::async_trait;
    use url::Url;

    struct NeverCalled;

    #[async_trait]
    impl Transport for NeverCalled {
        async fn get(&self, _url: &Url) -> Result<TransportReply, ValidateError> {
            panic!("transport must not be called");
        }
    }

    fn validator() -> Validator {
        Validator::builder("c2VjcmV0")
            .client_id(1)
            .transport(Arc::new(NeverCalled))
            .build()
            .unwrap()
    }

    #[test]
    fn test_invalid_api_key() {
        let result = Validator::builder("%%%")
            .transport(Arc::new(NeverCalled))
            .build();
        assert!(matches!(result, Err(ValidateError::Config { .. })));
    }

    #[test]
    fn test_missing_transport() {
        let result = Validator::builder("c2VjcmV0").client_id(1).build();
        assert!(matches!(result, Err(ValidateError::Config { .. })));
    }

    #[test]
    fn test_invalid_host() {
        let result = Validator::builder("c2VjcmV0")
            .hosts(["bad host/"])
            .transport(Arc::new(NeverCalled))
            .build();
        assert!(matches!(result, Err(ValidateError::Config { .. })));
    }

    #[test]
    fn test_default_hosts() {
        let v = validator();
        assert_eq!(v.hosts().len(), 5);
        assert_eq!(v.hosts()[0], "api.yubico.com");
        assert!(v.secure());
    }

    #[tokio::test]
    async fn test_short_otp_rejected_before_dispatch() {
        let result = validator().check(&"c".repeat(31)).await;
        assert!(matches!(
            result,
            Err(ValidateError::Input {
                kind: InputErrorKind::InvalidOtpLength { length: 31 }
            })
        ));
    }

    #[tokio::test]
    async fn test_long_otp_rejected_before_dispatch() {
        assert!(validator().check(&"c".repeat(49)).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_client_id() {
        let v = Validator::builder("c2VjcmV0")
            .transport(Arc::new(NeverCalled))
            .build()
            .unwrap();
        let result = v.check(&"c".repeat(44)).await;
        assert!(matches!(
            result,
            Err(ValidateError::Input {
                kind: InputErrorKind::MissingClientId
            })
        ));
    }

    #[test]
    fn test_single_host_selection() {
        let v = Validator::builder("c2VjcmV0")
            .hosts(["a.example", "b.example", "c.example"])
            .host_selector(Box::new(FixedSelector::new(1)))
            .transport(Arc::new(NeverCalled))
            .build()
            .unwrap();

        assert_eq!(v.target_hosts(false), vec!["b.example".to_string()]);
        assert_eq!(v.target_hosts(true).len(), 3);
        // The configured list is never consumed
        assert_eq!(v.hosts().len(), 3);
    }

    #[test]
    fn test_generate_signature_with_explicit_key() {
        let v = validator();
        let mut params = SignatureParams::new();
        params.insert("id".to_string(), "1".to_string());

        assert_eq!(
            v.generate_signature(&params, None),
            v.generate_signature(&params, Some(b"secret"))
        );
        assert_ne!(
            v.generate_signature(&params, None),
            v.generate_signature(&params, Some(b"other"))
        );
    }

    #[test]
    fn test_yubikey_id() {
        assert_eq!(
            Validator::yubikey_id("cccccckdvvulethkhtvkrtbeukiettuurfhddbfjnnhf"),
            "cccccckdvvul"
        );
    }
}
