//! Request retries configurations\
//! To decide when to retry a request the [`Connection`](crate::Connection) can use
//! any object which implements the `RetryPolicy` trait

use crate::errors::QueryError;

/// Information about a failed request
pub struct RequestInfo<'a> {
    /// The error with which the request failed
    pub error: &'a QueryError,
    /// How many times the request was sent so far, the failed attempt included
    pub attempts: usize,
}

/// What to do after a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Send the same frame again on the same connection, with no delay.
    Retry,
    /// Return the error to the caller.
    DontRetry,
}

/// Specifies a policy used to decide when to retry a request
pub trait RetryPolicy: std::fmt::Debug + Send + Sync {
    /// Called for each new request, starts a session of deciding about retries
    fn new_session(&self) -> Box<dyn RetrySession>;
}

/// Used throughout a single request to decide when to retry it
/// After this request is finished it is destroyed or reset
pub trait RetrySession: Send + Sync {
    /// Called after the request failed - decide what to do next
    fn decide_should_retry(&mut self, request_info: RequestInfo) -> RetryDecision;

    /// Reset before using for a new request
    fn reset(&mut self);
}
