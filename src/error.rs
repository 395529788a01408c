use thiserror::Error;

/// Error raised when a [`Pool`] cannot be constructed.
///
/// These are programmer errors. [`Builder::build`] and [`Pool::new`] panic
/// with the message of this error, while [`Builder::try_build`] hands it back
/// to the caller.
///
/// [`Pool`]: crate::Pool
/// [`Pool::new`]: crate::Pool::new
/// [`Builder::build`]: crate::Builder::build
/// [`Builder::try_build`]: crate::Builder::try_build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// The configured capacity was zero.
    #[error("pool capacity must be greater than zero")]
    ZeroCapacity,
    /// The configured refill interval was zero.
    #[error("refill interval must be greater than zero")]
    ZeroInterval,
    /// There is no Tokio runtime to spawn the refill task on.
    #[error("pool must be constructed within a Tokio runtime")]
    NoRuntime,
}
