//! Error types for the validation client.
//!
//! Provides a unified error handling system using thiserror.

mod types;

pub use types::*;
