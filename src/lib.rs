//! YubiKey OTP validation client.
//!
//! Signs a verification request, sends it to one or more validation
//! servers concurrently, authenticates every reply and reduces them to a
//! single verdict.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use yubikey_validate::transport::HttpTransport;
//! use yubikey_validate::validator::Validator;
//!
//! # async fn run() -> Result<(), yubikey_validate::error::ValidateError> {
//! let transport = HttpTransport::new(Duration::from_secs(10), "example/1.0")?;
//! let validator = Validator::builder("c2VjcmV0")
//!     .client_id(1)
//!     .transport(Arc::new(transport))
//!     .build()?;
//!
//! let verdict = validator.check("cccccckdvvulethkhtvkrtbeukiettuurfhddbfjnnhf").await?;
//! println!("accepted: {}", verdict.success);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod consensus;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod validation;
pub mod validator;
