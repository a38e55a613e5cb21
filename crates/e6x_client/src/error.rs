//! Error taxonomy for the client.
//!
//! Only the invoker recovers from errors; everything else propagates. The
//! two retryable classes are recognized by distinguished tokens in the RPC
//! status: "Access denied" for an expired or rejected session, and the
//! "456" marker the engine emits when a request carries the wrong
//! deployment strategy.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the client.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration. Fatal at construction time.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The engine accepted the call but returned an empty session id.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Authentication kept failing after the retry budget was spent.
    #[error("access denied by engine: {0}")]
    AuthDenied(String),

    /// Both deployment tags were rejected during discovery, or the retry
    /// budget ran out while chasing a strategy change.
    #[error("deployment strategy mismatch: {0}")]
    StrategyMismatch(String),

    /// Any RPC failure the invoker does not handle, including transport
    /// failures such as a closed channel or an exceeded deadline.
    #[error("rpc failed: {0}")]
    Rpc(#[from] tonic::Status),

    /// Building the transport channel failed.
    #[error("transport setup failed: {0}")]
    Transport(String),

    /// No channel became available within the acquire timeout.
    #[error("connection pool exhausted after {0:?}")]
    PoolExhausted(Duration),

    #[error("connection pool is closed")]
    PoolClosed,

    #[error("connection is closed")]
    ConnectionClosed,

    /// Cursor was asked for results before a statement was executed.
    #[error("no statement has been executed on this cursor")]
    NoActiveQuery,

    #[error(transparent)]
    Decode(#[from] e6x_vector::DecodeError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Classification of an RPC status, decided from its distinguished tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ErrorClass {
    AuthDenied,
    WrongStrategy,
    Other,
}

/// Marker the engine embeds when the session is no longer authenticated.
pub(crate) const ACCESS_DENIED_TOKEN: &str = "Access denied";
/// Marker the engine embeds when the request carried the wrong tag.
pub(crate) const WRONG_STRATEGY_TOKEN: &str = "456";

pub(crate) fn classify_status(status: &tonic::Status) -> ErrorClass {
    let details = String::from_utf8_lossy(status.details());
    if status.message().contains(ACCESS_DENIED_TOKEN) || details.contains(ACCESS_DENIED_TOKEN) {
        ErrorClass::AuthDenied
    } else if status.message().contains(WRONG_STRATEGY_TOKEN)
        || details.contains(WRONG_STRATEGY_TOKEN)
    {
        ErrorClass::WrongStrategy
    } else {
        ErrorClass::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::{Code, Status};

    #[test]
    fn access_denied_is_recognized_in_the_message() {
        let status = Status::new(Code::Unauthenticated, "Access denied: token expired");
        assert_eq!(classify_status(&status), ErrorClass::AuthDenied);
    }

    #[test]
    fn wrong_strategy_marker_is_recognized_in_either_field() {
        let status = Status::new(Code::Internal, "Wrong strategy. Status: 456.");
        assert_eq!(classify_status(&status), ErrorClass::WrongStrategy);

        let status = Status::with_details(Code::Internal, "rejected", "status: 456".into());
        assert_eq!(classify_status(&status), ErrorClass::WrongStrategy);
    }

    #[test]
    fn anything_else_is_not_retried() {
        let status = Status::new(Code::Unavailable, "channel closed");
        assert_eq!(classify_status(&status), ErrorClass::Other);
    }
}
