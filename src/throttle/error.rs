use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ThrottleError {
    /// Raised only by hard-ceiling limiters; the default throttle waits instead.
    #[error("Quota of {limit} calls per {window:?} exceeded, retry in {retry_after:?}")]
    QuotaExceeded {
        limit: u32,
        window: Duration,
        retry_after: Duration,
    },

    // The processing loop went away (runtime shutdown or a panicking task)
    // before the task delivered its result.
    #[error("Throttled task was dropped before it completed")]
    Dropped,

    #[error("Throttled task submitted outside a tokio runtime")]
    NoRuntime,
}
