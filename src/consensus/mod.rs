//! Turning a batch of authenticated replies into one verdict.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::protocol::{ProtocolStatus, ResponseBatch};

/// How replies from several servers are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusPolicy {
    /// Any genuine rejection fails the check; at least one success is needed.
    /// `REPLAYED_REQUEST` replies are ignored.
    #[default]
    #[serde(alias = "all")]
    AllMustAgree,
    /// Only the lowest-latency reply counts.
    #[serde(alias = "first")]
    FirstResponder,
}

impl FromStr for ConsensusPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" | "all_must_agree" => Ok(Self::AllMustAgree),
            "first" | "first_responder" => Ok(Self::FirstResponder),
            other => Err(format!("unknown consensus policy '{}'", other)),
        }
    }
}

impl fmt::Display for ConsensusPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllMustAgree => f.write_str("all_must_agree"),
            Self::FirstResponder => f.write_str("first_responder"),
        }
    }
}

/// Evaluate `responses` under `policy`. An empty batch is always a failure.
pub fn evaluate(responses: &ResponseBatch, policy: ConsensusPolicy) -> bool {
    match policy {
        ConsensusPolicy::FirstResponder => first_responder(responses),
        ConsensusPolicy::AllMustAgree => all_must_agree(responses),
    }
}

fn first_responder(responses: &ResponseBatch) -> bool {
    // min_by_key keeps the earliest-arrived reply on equal latency
    responses
        .iter()
        .min_by_key(|response| response.latency())
        .map(|response| response.success())
        .unwrap_or(false)
}

fn all_must_agree(responses: &ResponseBatch) -> bool {
    let mut verdict = false;
    for response in responses {
        if response.success() {
            verdict = true;
        } else if response.status() != Some(ProtocolStatus::ReplayedRequest) {
            return false;
        }
    }
    verdict
}

impl ResponseBatch {
    /// Shorthand for [`evaluate`].
    pub fn success(&self, policy: ConsensusPolicy) -> bool {
        evaluate(self, policy)
    }
}
