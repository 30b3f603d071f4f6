//! Input validation module.
//!
//! Provides OTP shape checks and public identifier extraction.

mod otp;

pub use otp::{public_id, validate_otp, MAX_OTP_LENGTH, MIN_OTP_LENGTH, OTP_SUFFIX_LENGTH};
