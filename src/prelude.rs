//! Convenient re-exports for common tollgate types.
pub use crate::{
    clock::{Clock, ManualClock, SystemClock},
    counter::{InMemoryCounter, Occupancy, WindowCounter},
    error::ThrottleError,
    identity::{client_identifier, UNKNOWN_CLIENT},
    middleware::{ThrottleLayer, ThrottleService},
    policy::{Classification, FailureMode, Policy, AUTH, GENERAL},
    throttle::{Throttle, Verdict},
};
