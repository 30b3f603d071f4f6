//! Response types for the verification protocol.

use std::fmt;
use std::ops::Index;
use std::str::FromStr;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::auth::{escape_plus, SignatureParams};

use super::wire::parse_body;

/// Reply fields covered by the server's signature, in canonical order.
pub const SIGNED_FIELDS: [&str; 8] = [
    "t",
    "otp",
    "nonce",
    "sl",
    "status",
    "timestamp",
    "sessioncounter",
    "sessionuse",
];

/// Status values a validation server can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtocolStatus {
    Ok,
    ReplayedOtp,
    ReplayedRequest,
    MissingParameter,
    NoSuchClient,
    BadOtp,
    BadSignature,
    OperationNotAllowed,
    BackendError,
    NotEnoughAnswers,
}

impl ProtocolStatus {
    /// The status string as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::ReplayedOtp => "REPLAYED_OTP",
            Self::ReplayedRequest => "REPLAYED_REQUEST",
            Self::MissingParameter => "MISSING_PARAMETER",
            Self::NoSuchClient => "NO_SUCH_CLIENT",
            Self::BadOtp => "BAD_OTP",
            Self::BadSignature => "BAD_SIGNATURE",
            Self::OperationNotAllowed => "OPERATION_NOT_ALLOWED",
            Self::BackendError => "BACKEND_ERROR",
            Self::NotEnoughAnswers => "NOT_ENOUGH_ANSWERS",
        }
    }
}

impl fmt::Display for ProtocolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(Self::Ok),
            "REPLAYED_OTP" => Ok(Self::ReplayedOtp),
            "REPLAYED_REQUEST" => Ok(Self::ReplayedRequest),
            "MISSING_PARAMETER" => Ok(Self::MissingParameter),
            "NO_SUCH_CLIENT" => Ok(Self::NoSuchClient),
            "BAD_OTP" => Ok(Self::BadOtp),
            "BAD_SIGNATURE" => Ok(Self::BadSignature),
            "OPERATION_NOT_ALLOWED" => Ok(Self::OperationNotAllowed),
            "BACKEND_ERROR" => Ok(Self::BackendError),
            "NOT_ENOUGH_ANSWERS" => Ok(Self::NotEnoughAnswers),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

fn serialize_latency<S: Serializer>(latency: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(latency.as_secs_f64() * 1000.0)
}

/// One parsed reply from a validation server.
///
/// Wire fields are stored exactly as received (trimmed) so the signature can
/// be recomputed byte for byte. Only [`ValidationResponse::parse`] writes them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResponse {
    #[serde(skip)]
    hash: Option<String>,
    #[serde(rename = "t")]
    time: Option<String>,
    otp: Option<String>,
    nonce: Option<String>,
    #[serde(rename = "sl")]
    success_level: Option<String>,
    status: Option<String>,
    timestamp: Option<String>,
    #[serde(rename = "sessioncounter")]
    session_counter: Option<String>,
    #[serde(rename = "sessionuse")]
    session_use: Option<String>,

    host: Option<String>,
    #[serde(rename = "latency_ms", serialize_with = "serialize_latency")]
    latency: Duration,

    #[serde(skip)]
    input_otp: Option<String>,
    #[serde(skip)]
    input_nonce: Option<String>,
}

impl ValidationResponse {
    /// Parse a reply body. Unknown keys are ignored.
    pub fn parse(body: &str) -> Self {
        let mut response = Self::default();
        for (key, value) in parse_body(body) {
            let value = Some(value.to_string());
            match key {
                "h" => response.hash = value,
                "t" => response.time = value,
                "otp" => response.otp = value,
                "nonce" => response.nonce = value,
                "sl" => response.success_level = value,
                "status" => response.status = value,
                "timestamp" => response.timestamp = value,
                "sessioncounter" => response.session_counter = value,
                "sessionuse" => response.session_use = value,
                _ => {}
            }
        }
        response
    }

    /// Look up a signed field by its wire name.
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "t" => &self.time,
            "otp" => &self.otp,
            "nonce" => &self.nonce,
            "sl" => &self.success_level,
            "status" => &self.status,
            "timestamp" => &self.timestamp,
            "sessioncounter" => &self.session_counter,
            "sessionuse" => &self.session_use,
            _ => return None,
        };
        value.as_deref()
    }

    /// The parameters the server signed: every present field of [`SIGNED_FIELDS`].
    pub fn signature_params(&self) -> SignatureParams {
        SIGNED_FIELDS
            .iter()
            .filter_map(|&name| self.field(name).map(|v| (name.to_string(), v.to_string())))
            .collect()
    }

    /// The server's signature, re-padded with `=` if the server dropped it.
    ///
    /// With `escaped`, `+` becomes `%2B` to match [`crate::auth::Signer::sign`].
    pub fn hash(&self, escaped: bool) -> Option<String> {
        let mut hash = self.hash.clone()?;
        if !hash.ends_with('=') {
            hash.push('=');
        }
        if escaped {
            hash = escape_plus(&hash);
        }
        Some(hash)
    }

    /// Server timestamp (`t`), e.g. `2024-01-01T12:30:00Z0123`.
    pub fn time(&self) -> Option<&str> {
        self.time.as_deref()
    }

    pub fn otp(&self) -> Option<&str> {
        self.otp.as_deref()
    }

    pub fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    /// Parsed status; `None` if absent or not a known status.
    pub fn status(&self) -> Option<ProtocolStatus> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }

    /// Percentage of servers that agreed (0-100).
    pub fn success_level(&self) -> Option<u8> {
        self.success_level
            .as_deref()
            .and_then(|s| s.parse().ok())
            .filter(|level| *level <= 100)
    }

    /// Internal token counter.
    pub fn timestamp(&self) -> Option<u64> {
        self.timestamp.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn session_counter(&self) -> Option<u64> {
        self.session_counter.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn session_use(&self) -> Option<u64> {
        self.session_use.as_deref().and_then(|s| s.parse().ok())
    }

    /// Host that produced this reply.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Time from dispatch start until this reply arrived.
    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn latency_seconds(&self) -> f64 {
        self.latency.as_secs_f64()
    }

    pub(crate) fn set_origin(&mut self, host: Option<String>, latency: Duration) {
        self.host = host;
        self.latency = latency;
    }

    /// Record the otp and nonce that were sent, for local comparison.
    pub fn set_input(&mut self, otp: impl Into<String>, nonce: impl Into<String>) {
        self.input_otp = Some(otp.into());
        self.input_nonce = Some(nonce.into());
    }

    pub fn input_otp(&self) -> Option<&str> {
        self.input_otp.as_deref()
    }

    pub fn input_nonce(&self) -> Option<&str> {
        self.input_nonce.as_deref()
    }

    /// Whether this reply says the OTP is valid for our request.
    ///
    /// Requires status `OK` and the echoed otp and nonce to equal what was
    /// sent. False if the sent values were never recorded.
    pub fn success(&self) -> bool {
        let (Some(input_otp), Some(input_nonce)) = (self.input_otp(), self.input_nonce()) else {
            return false;
        };

        self.otp() == Some(input_otp)
            && self.nonce() == Some(input_nonce)
            && self.status() == Some(ProtocolStatus::Ok)
    }
}

/// Replies collected for one check, in arrival order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ResponseBatch {
    responses: Vec<ValidationResponse>,
}

impl ResponseBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, response: ValidationResponse) {
        self.responses.push(response);
    }

    pub fn get(&self, index: usize) -> Option<&ValidationResponse> {
        self.responses.get(index)
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationResponse> {
        self.responses.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, ValidationResponse> {
        self.responses.iter_mut()
    }

    /// Keep only the replies matching `keep`.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&ValidationResponse) -> bool,
    {
        self.responses.retain(keep);
    }
}

impl Index<usize> for ResponseBatch {
    type Output = ValidationResponse;

    fn index(&self, index: usize) -> &Self::Output {
        &self.responses[index]
    }
}

impl FromIterator<ValidationResponse> for ResponseBatch {
    fn from_iter<I: IntoIterator<Item = ValidationResponse>>(iter: I) -> Self {
        Self {
            responses: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ResponseBatch {
    type Item = ValidationResponse;
    type IntoIter = std::vec::IntoIter<ValidationResponse>;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResponseBatch {
    type Item = &'a ValidationResponse;
    type IntoIter = std::slice::Iter<'a, ValidationResponse>;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.iter()
    }
}
