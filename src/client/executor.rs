//! Request execution abstraction for the shared client.

use async_trait::async_trait;

use crate::error::Result;

/// HTTP request handed to an executor.
pub type Request = http::Request<Vec<u8>>;

/// HTTP response produced by an executor.
pub type Response = http::Response<Vec<u8>>;

/// Result of one request attempt issued through the client.
///
/// `Dropped` is a first-class outcome, not an error: it signals that admission
/// was denied and no network attempt was made. A transport failure surfaces as
/// an `Err` instead, so callers can tell the three cases apart.
#[derive(Debug)]
pub enum Outcome {
    /// The transport was invoked and produced a response
    Response(Response),
    /// The attempt was refused before reaching the network
    Dropped,
}

impl Outcome {
    /// Whether this attempt was refused without a network call.
    pub fn is_dropped(&self) -> bool {
        matches!(self, Outcome::Dropped)
    }

    /// Borrow the response, if one was produced.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Outcome::Response(response) => Some(response),
            Outcome::Dropped => None,
        }
    }

    /// Consume the outcome, yielding the response if one was produced.
    pub fn into_response(self) -> Option<Response> {
        match self {
            Outcome::Response(response) => Some(response),
            Outcome::Dropped => None,
        }
    }
}

/// Trait for request executors.
///
/// This is the composable middleware seam of the client: an executor either
/// performs the request against a real transport or wraps another executor
/// and decides whether to delegate. The gated executor installed during a
/// scope activation is one such wrapper.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Execute one request attempt.
    async fn execute(&self, request: Request) -> Result<Outcome>;
}
