//! Deciding whether a failed request is sent again.

mod attempts;
mod default;
mod retry_policy;

pub use attempts::{send_with_retries, AttemptOutcome, FrameTransport};
pub use default::{DefaultRetryPolicy, DefaultRetrySession, Retries};
pub use retry_policy::{RequestInfo, RetryDecision, RetryPolicy, RetrySession};
