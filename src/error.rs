//! Unified error type.

use crate::decode::DecodeError;

/// The error type returned by strand's fallible operations.
///
/// Application-level failures (404, 400, etc.) are expressed as HTTP
/// responses written through the [`Context`](crate::Context), not as
/// `Error`s. This type surfaces infrastructure failures and chain
/// misconfiguration caught by [`Builder::build`](crate::Builder::build).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Binding a port or accepting a connection failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded as a JSON response body.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// Request data could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// More than one panic-recovery middleware was added to a chain.
    #[error("{count} panic-recovery middlewares registered, at most one is allowed")]
    DuplicateRecovery { count: usize },

    /// A panic-recovery middleware was not added last, so it would not wrap
    /// every other middleware.
    #[error(
        "panic-recovery middleware `{name}` added at position {position} of {len}, it must be added last"
    )]
    RecoveryNotOutermost {
        name: String,
        position: usize,
        len: usize,
    },
}
