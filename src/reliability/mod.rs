pub mod failure;
pub mod retry;

pub use failure::{FailureRecord, FailureSink, SinkError};
pub use retry::{DispatchOutcome, RetryConfig, RetryController, RetryState};
