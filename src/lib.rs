#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # Tollgate
//!
//! Sliding-window rate limiting for async Rust: fixed admission policies,
//! pluggable atomic window counters, and tower middleware.
//!
//! ## Features
//!
//! - **Two fixed policies** selected by [`Classification`]: `Auth`
//!   (5 requests / 60 s, fail-closed) for login and password-reset flows,
//!   `General` (10 requests / 10 s, fail-open) for everything else
//! - **True sliding windows** with no fixed-bucket burst at boundaries
//! - **Pluggable storage** via [`WindowCounter`]: in-memory for tests and
//!   single-process use, Redis (`tollgate-redis`) for multi-instance
//!   deployments
//! - **Atomic check-and-record**, so concurrent callers on one identifier
//!   never overshoot the limit
//! - **Tower middleware** for mounting a policy in front of a service
//!
//! ## Quick Start
//!
//! ```rust
//! use tollgate::{Classification, InMemoryCounter, Throttle, Verdict};
//!
//! #[tokio::main]
//! async fn main() {
//!     let throttle = Throttle::new(InMemoryCounter::new());
//!
//!     match throttle.check(Classification::General, "203.0.113.7").await {
//!         Verdict::Allowed { .. } => { /* proceed with the operation */ }
//!         Verdict::Denied { message } => println!("{message}"),
//!     }
//! }
//! ```

pub mod clock;
pub mod counter;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod policy;
pub mod prelude;
pub mod throttle;

// Re-exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use counter::{InMemoryCounter, Occupancy, WindowCounter};
pub use error::ThrottleError;
pub use middleware::{ThrottleLayer, ThrottleService};
pub use policy::{Classification, FailureMode, Policy};
pub use throttle::{Throttle, Verdict};
