//! Error classification.

use strum::Display;

/// Broad error category used to decide how a failure surfaces to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    /// Input rejected before any request was made.
    Validation,
    /// Non-2xx status, network failure or client-side timeout.
    Transport,
    /// Failure after part of a streamed reply was received.
    Stream,
    /// Caller cancelled an in-flight request.
    Cancelled,
    Configuration,
    Serialization,
    Io,
}
