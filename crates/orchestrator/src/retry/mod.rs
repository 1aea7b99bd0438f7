//! Retry-classified verification.
//!
//! - [`ErrorClassifier`] - maps a [`SuiteError`](crate::SuiteError) to a [`Disposition`]
//! - [`RetryDriver`] - runs one verification under a [`RetryPolicy`]

mod classifier;
mod driver;

pub use classifier::{Disposition, ErrorClassifier};
pub use driver::{FailedAttempt, RetryDriver, RetryError, RetryPolicy, RetryState, RetryStats};
