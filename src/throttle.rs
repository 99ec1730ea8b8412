//! Sliding-window admission checks for protected operations.

use crate::clock::{Clock, SystemClock};
use crate::counter::WindowCounter;
use crate::policy::{Classification, FailureMode};
use std::sync::Arc;

/// Default segment prepended to every counter key.
const DEFAULT_NAMESPACE: &str = "tollgate";

/// The decision returned by a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The request is admitted and has been counted against the window.
    Allowed {
        /// Quota left in the window. `None` only when the counter store
        /// failed and the policy admitted the request without a count.
        remaining: Option<u32>,
    },
    /// The request exceeded its quota.
    Denied {
        /// Classification-specific rejection text, suitable for surfacing
        /// to the end user as-is.
        message: &'static str,
    },
}

impl Verdict {
    /// Helper to check if allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed { .. })
    }

    /// The rejection text, if denied.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Verdict::Denied { message } => Some(message),
            Verdict::Allowed { .. } => None,
        }
    }
}

/// Sliding-window rate limiter over an atomic [`WindowCounter`].
///
/// One instance serves both fixed policies; counters are partitioned by
/// policy and identifier, so exhausting `Auth` quota for an identifier
/// leaves its `General` quota untouched. Clones share state.
#[derive(Debug)]
pub struct Throttle<S, C = SystemClock> {
    counter: Arc<S>,
    clock: C,
    namespace: String,
}

impl<S, C: Clone> Clone for Throttle<S, C> {
    fn clone(&self) -> Self {
        Self {
            counter: self.counter.clone(),
            clock: self.clock.clone(),
            namespace: self.namespace.clone(),
        }
    }
}

impl<S> Throttle<S>
where
    S: WindowCounter + Send + Sync + 'static,
{
    /// Create a limiter backed by `counter`, using the system clock.
    pub fn new(counter: S) -> Self {
        Self { counter: Arc::new(counter), clock: SystemClock, namespace: DEFAULT_NAMESPACE.into() }
    }
}

impl<S, C> Throttle<S, C>
where
    S: WindowCounter + Send + Sync + 'static,
    C: Clock,
{
    /// Replace the clock. Tests use a manually advanced one.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Throttle<S, C2> {
        Throttle { counter: self.counter, clock, namespace: self.namespace }
    }

    /// Replace the key namespace (default `tollgate`), letting several
    /// deployments share one store without mixing counters.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Check and consume quota for one request.
    ///
    /// Admission and recording are one atomic act: when `Allowed` comes
    /// back the request has already been counted, and an immediately
    /// following call observes the incremented count. A denied request
    /// records nothing. Denial is an ordinary outcome, not an error;
    /// callers surface [`Verdict::message`] to the end user.
    ///
    /// Counter store failures never escape: they are resolved by the
    /// policy's [`FailureMode`] — admit-and-log for `General`, deny for
    /// `Auth`.
    pub async fn check(&self, classification: Classification, identifier: &str) -> Verdict {
        let policy = classification.policy();
        let key = format!("{}:{}:{}", self.namespace, policy.key_prefix, identifier);
        let now = self.clock.now_millis();

        match self.counter.try_record(&key, policy.window, policy.max_requests, now).await {
            Ok(occupancy) if occupancy.admitted => Verdict::Allowed {
                remaining: Some(policy.max_requests.saturating_sub(occupancy.used)),
            },
            Ok(_) => {
                tracing::debug!(
                    target: "tollgate",
                    key = %key,
                    limit = policy.max_requests,
                    "request denied: window full"
                );
                Verdict::Denied { message: policy.denial_message }
            }
            Err(e) => match policy.failure_mode {
                FailureMode::Open => {
                    tracing::warn!(
                        target: "tollgate",
                        key = %key,
                        error = %e,
                        "window counter unreachable; admitting request unchecked"
                    );
                    Verdict::Allowed { remaining: None }
                }
                FailureMode::Closed => {
                    tracing::warn!(
                        target: "tollgate",
                        key = %key,
                        error = %e,
                        "window counter unreachable; denying request"
                    );
                    Verdict::Denied { message: policy.denial_message }
                }
            },
        }
    }
}
