//! Error type for the middleware path.
//!
//! Over-quota rejections only become errors at the middleware boundary; the
//! core [`check`](crate::Throttle::check) reports them as an ordinary
//! [`Verdict`](crate::Verdict) that callers must inspect.

/// Error returned by [`ThrottleService`](crate::middleware::ThrottleService).
#[derive(thiserror::Error, Debug)]
pub enum ThrottleError<E> {
    /// The request exceeded its quota.
    #[error("{message}")]
    Denied {
        /// Classification-specific rejection text.
        message: &'static str,
    },
    /// The wrapped service failed.
    #[error(transparent)]
    Inner(#[from] E),
}

impl<E> ThrottleError<E> {
    /// Check if this error is a quota rejection.
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied { .. })
    }

    /// Get the inner error if this is an Inner variant.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Denied { .. } => None,
        }
    }
}
