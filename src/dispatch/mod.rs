//! Concurrent fan-out of verification requests.

mod dispatcher;

pub use dispatcher::{DispatchOutcome, Dispatcher};
