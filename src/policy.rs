//! Admission policies for protected operations.
//!
//! Two fixed policies exist, keyed by [`Classification`]: a strict one for
//! authentication flows and a general one for everything else. Policies are
//! constants, not runtime configuration.

use std::time::Duration;

/// Category of a protected operation, selecting which quota applies.
///
/// A closed enum: an unrecognized category is a compile error, not a silent
/// fallback to the general policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Sensitive flows (login, password reset): 5 requests per minute.
    Auth,
    /// Ordinary operations: 10 requests per 10 seconds.
    General,
}

impl Classification {
    /// The fixed policy for this classification.
    pub const fn policy(self) -> Policy {
        match self {
            Classification::Auth => AUTH,
            Classification::General => GENERAL,
        }
    }
}

/// What a check does when the window counter cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Admit the request and log the store error.
    Open,
    /// Deny the request.
    Closed,
}

/// Immutable quota configuration for one classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// The classification this policy serves.
    pub classification: Classification,
    /// Length of the sliding window.
    pub window: Duration,
    /// Maximum requests admitted per identifier within the window.
    pub max_requests: u32,
    /// Behavior when the counter store is unreachable.
    pub failure_mode: FailureMode,
    /// Segment that partitions this policy's keys in a shared store.
    pub key_prefix: &'static str,
    /// Text returned to callers on denial.
    pub denial_message: &'static str,
}

/// Strict policy for authentication flows. Fails closed: when the counter
/// store is down, brute-force protection wins over availability.
pub const AUTH: Policy = Policy {
    classification: Classification::Auth,
    window: Duration::from_secs(60),
    max_requests: 5,
    failure_mode: FailureMode::Closed,
    key_prefix: "auth",
    denial_message: "Too many attempts. Please try again in a minute.",
};

/// Policy for ordinary operations. Fails open: when the counter store is
/// down, the protected operation stays available and the error is logged.
pub const GENERAL: Policy = Policy {
    classification: Classification::General,
    window: Duration::from_secs(10),
    max_requests: 10,
    failure_mode: FailureMode::Open,
    key_prefix: "general",
    denial_message: "Too many requests. Please slow down.",
};
