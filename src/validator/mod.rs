//! Protocol orchestration.
//!
//! [`Validator`] owns the client configuration and drives one check from
//! OTP validation through dispatch, authentication and consensus.

mod client;
mod hosts;

pub use client::{Validator, ValidatorBuilder, Verdict};
pub use hosts::{FixedSelector, HostSelection, HostSelector, RandomSelector, RoundRobinSelector};
