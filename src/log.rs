//! Logging helpers.
//!
//! strand logs through [`tracing`]. The built-in middlewares take an optional
//! [`Dispatch`] so a chain can send its records to a dedicated subscriber
//! instead of the ambient one.

use std::fmt::Display;

use tracing::Dispatch;

/// Logs `err` at ERROR if `result` is an `Err`, then returns `result`
/// unchanged.
///
/// ```rust
/// # fn write() -> Result<(), std::io::Error> { Ok(()) }
/// let _ = strand::log::log_if_err(write());
/// ```
pub fn log_if_err<T, E: Display>(result: Result<T, E>) -> Result<T, E> {
    if let Err(err) = &result {
        tracing::error!(err = %err);
    }
    result
}

/// Runs `emit` with `dispatch` as the default subscriber, or with the ambient
/// one when `dispatch` is `None`.
pub(crate) fn scoped(dispatch: Option<&Dispatch>, emit: impl FnOnce()) {
    match dispatch {
        Some(dispatch) => tracing::dispatcher::with_default(dispatch, emit),
        None => emit(),
    }
}
