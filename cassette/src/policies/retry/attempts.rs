use async_trait::async_trait;
use bytes::Bytes;
use cassette_cql::frame::{Opcode, SerializedRequest};
use tracing::{debug, trace};

use super::{RequestInfo, RetryDecision, RetryPolicy};
use crate::errors::QueryError;

/// The two halves of a request/response exchange over one connection.
///
/// Server error frames must be reported by `recv_response` as
/// [QueryError::DbError], this is what retry decisions are based on.
#[async_trait]
pub trait FrameTransport: Send {
    /// Writes one request frame.
    async fn send_request(&mut self, request: &SerializedRequest) -> Result<(), QueryError>;

    /// Reads the response to the last request.
    async fn recv_response(&mut self) -> Result<(Opcode, Bytes), QueryError>;
}

/// What happened to a single attempt.
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    /// A response other than an error frame arrived.
    Success(T),
    /// The server answered with an error frame. The request reached the
    /// server and the stream is still in sync, so the retry policy decides
    /// whether to send it again.
    Retryable(QueryError),
    /// The request could not be sent or its response could not be read.
    Fatal(QueryError),
}

async fn attempt<T: FrameTransport + ?Sized>(
    transport: &mut T,
    request: &SerializedRequest,
) -> AttemptOutcome<(Opcode, Bytes)> {
    if let Err(err) = transport.send_request(request).await {
        return AttemptOutcome::Fatal(err);
    }
    match transport.recv_response().await {
        Ok(response) => AttemptOutcome::Success(response),
        Err(err @ QueryError::DbError(..)) => AttemptOutcome::Retryable(err),
        Err(err) => AttemptOutcome::Fatal(err),
    }
}

/// Sends the request and waits for its response, resending the very same
/// frame for as long as the policy asks for it.
///
/// A failed send ends the loop at once, as does a broken stream. Server
/// errors are handed to the policy, which declines anything it does not
/// want to retry. There is no delay between attempts.
pub async fn send_with_retries<T: FrameTransport + ?Sized>(
    transport: &mut T,
    request: &SerializedRequest,
    policy: &dyn RetryPolicy,
) -> Result<(Opcode, Bytes), QueryError> {
    let mut retry_session = policy.new_session();
    let mut attempts = 0;
    loop {
        attempts += 1;
        trace!(opcode = %request.opcode(), attempts, "Sending request");
        let error = match attempt(transport, request).await {
            AttemptOutcome::Success(response) => return Ok(response),
            AttemptOutcome::Fatal(err) => return Err(err),
            AttemptOutcome::Retryable(err) => err,
        };

        let request_info = RequestInfo {
            error: &error,
            attempts,
        };
        match retry_session.decide_should_retry(request_info) {
            RetryDecision::Retry => {
                debug!(
                    opcode = %request.opcode(),
                    attempts,
                    error = %error,
                    "Retrying request"
                );
            }
            RetryDecision::DontRetry => return Err(error),
        }
    }
}
