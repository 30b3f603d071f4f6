//! One-time password validation.
//!
//! An OTP is the token's public identifier (0 to 16 characters) followed by
//! a 32-character encrypted one-time part.

use crate::error::{InputErrorKind, ValidateError};

/// Shortest accepted OTP.
pub const MIN_OTP_LENGTH: usize = 32;

/// Longest accepted OTP.
pub const MAX_OTP_LENGTH: usize = 48;

/// Length of the one-time part at the end of every OTP.
pub const OTP_SUFFIX_LENGTH: usize = 32;

/// Validate an OTP's shape.
///
/// Surrounding whitespace is trimmed; the trimmed OTP must be 32 to 48
/// characters long.
///
/// # Returns
///
/// The trimmed OTP.
///
/// # Errors
///
/// Returns an input error if the length is out of range.
pub fn validate_otp(otp: &str) -> Result<&str, ValidateError> {
    let otp = otp.trim();
    let length = otp.chars().count();

    if !(MIN_OTP_LENGTH..=MAX_OTP_LENGTH).contains(&length) {
        return Err(ValidateError::Input {
            kind: InputErrorKind::InvalidOtpLength { length },
        });
    }

    Ok(otp)
}

/// Extract the token's public identifier: the OTP minus its last 32
/// characters. Shorter input yields an empty identifier.
pub fn public_id(otp: &str) -> &str {
    let otp = otp.trim();
    match otp.char_indices().rev().nth(OTP_SUFFIX_LENGTH - 1) {
        Some((index, _)) => &otp[..index],
        None => "",
    }
}
