use std::fmt::Display;

use super::{RequestInfo, RetryDecision, RetryPolicy, RetrySession};

/// How many times a request may be resent after a transient failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Retries {
    /// At most this many retries, so at most `n + 1` attempts in total.
    Bounded(u64),
    /// Retry for as long as the failures stay transient.
    Unbounded,
}

impl Default for Retries {
    fn default() -> Self {
        Retries::Bounded(0)
    }
}

impl From<i64> for Retries {
    /// Negative counts mean unbounded.
    fn from(count: i64) -> Self {
        match u64::try_from(count) {
            Ok(n) => Retries::Bounded(n),
            Err(_) => Retries::Unbounded,
        }
    }
}

impl Display for Retries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Retries::Bounded(n) => write!(f, "{}", n),
            Retries::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// Default retry policy - resends a request which failed with a write
/// timeout, a read timeout or an overload report, as long as the retry
/// budget allows it. Every other failure is returned to the caller at once.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRetryPolicy {
    retries: Retries,
}

impl DefaultRetryPolicy {
    /// Creates a new instance of [DefaultRetryPolicy].
    pub fn new(retries: Retries) -> DefaultRetryPolicy {
        DefaultRetryPolicy { retries }
    }

    /// The retry budget of each request.
    pub fn retries(&self) -> Retries {
        self.retries
    }
}

impl RetryPolicy for DefaultRetryPolicy {
    fn new_session(&self) -> Box<dyn RetrySession> {
        Box::new(DefaultRetrySession::new(self.retries))
    }
}

/// Implementation of [RetrySession] for [DefaultRetryPolicy].
pub struct DefaultRetrySession {
    retries: Retries,
    retried: u64,
}

impl DefaultRetrySession {
    /// Creates a new instance of [DefaultRetrySession].
    pub fn new(retries: Retries) -> DefaultRetrySession {
        DefaultRetrySession {
            retries,
            retried: 0,
        }
    }
}

impl RetrySession for DefaultRetrySession {
    fn decide_should_retry(&mut self, request_info: RequestInfo) -> RetryDecision {
        if !request_info.error.is_retryable() {
            return RetryDecision::DontRetry;
        }
        match self.retries {
            Retries::Bounded(max) if self.retried >= max => RetryDecision::DontRetry,
            _ => {
                self.retried = self.retried.saturating_add(1);
                RetryDecision::Retry
            }
        }
    }

    fn reset(&mut self) {
        *self = DefaultRetrySession::new(self.retries);
    }
}
