//! Abstract storage for sliding-window state.
//!
//! [`WindowCounter`] is the single collaborator the limiter depends on. It
//! assumes a key-value model where the value is the set of event timestamps
//! inside one window, and it requires the count-and-record step to be
//! atomic, enabling in-memory or distributed backends (e.g. Redis).

use async_trait::async_trait;
use std::time::Duration;

/// Outcome of one atomic record-and-count call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
    /// Whether the event was recorded (the window had room).
    pub admitted: bool,
    /// Events inside the window after this call, including the one just
    /// recorded when `admitted` is true.
    pub used: u32,
}

/// Abstract counting store for sliding-window rate limit state.
#[async_trait]
pub trait WindowCounter: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Count events for `key` in the trailing `window` ending at
    /// `now_millis` and, if the count is below `limit`, record a new event
    /// at `now_millis`.
    ///
    /// The count and the conditional record must be one atomic step with
    /// respect to concurrent callers of the same key: two simultaneous
    /// calls arriving with one slot left must not both be admitted.
    /// Events older than `now_millis - window` are excluded from the count
    /// and may be discarded.
    async fn try_record(
        &self,
        key: &str,
        window: Duration,
        limit: u32,
        now_millis: u64,
    ) -> Result<Occupancy, Self::Error>;
}

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// In-memory window counter.
///
/// Atomic by construction (one mutex around the map), so it satisfies the
/// [`WindowCounter`] contract for any number of tasks in one process. State
/// neither survives the process nor is shared across processes; use a
/// distributed backend for multi-instance deployments.
#[derive(Default, Clone, Debug)]
pub struct InMemoryCounter {
    // Map key -> event timestamps in millis, oldest first.
    events: Arc<Mutex<HashMap<String, VecDeque<u64>>>>,
}

impl InMemoryCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WindowCounter for InMemoryCounter {
    type Error = std::convert::Infallible;

    async fn try_record(
        &self,
        key: &str,
        window: Duration,
        limit: u32,
        now_millis: u64,
    ) -> Result<Occupancy, Self::Error> {
        let window_millis = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        let floor = now_millis.saturating_sub(window_millis);

        let mut guard = self.events.lock().unwrap();
        let queue = guard.entry(key.to_string()).or_default();

        // Expire events that slid out of the window. Events at exactly
        // `floor` still count: a slot frees up only strictly after one
        // window has elapsed since the event.
        while queue.front().is_some_and(|&ts| ts < floor) {
            queue.pop_front();
        }

        let used = u32::try_from(queue.len()).unwrap_or(u32::MAX);
        if used < limit {
            queue.push_back(now_millis);
            return Ok(Occupancy { admitted: true, used: used + 1 });
        }

        if queue.is_empty() {
            // Only reachable with limit == 0; don't let such keys pile up.
            guard.remove(key);
        }
        Ok(Occupancy { admitted: false, used })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn admits_until_limit_then_denies() {
        let counter = InMemoryCounter::new();

        for n in 1..=3 {
            let occ = counter.try_record("k", WINDOW, 3, 1_000).await.unwrap();
            assert!(occ.admitted);
            assert_eq!(occ.used, n);
        }

        let occ = counter.try_record("k", WINDOW, 3, 1_000).await.unwrap();
        assert!(!occ.admitted);
        assert_eq!(occ.used, 3);
    }

    #[tokio::test]
    async fn denied_calls_record_nothing() {
        let counter = InMemoryCounter::new();
        for _ in 0..5 {
            counter.try_record("k", WINDOW, 2, 1_000).await.unwrap();
        }
        // Still exactly 2 events in the window, not 5.
        let occ = counter.try_record("k", WINDOW, 2, 1_000).await.unwrap();
        assert_eq!(occ.used, 2);
    }

    #[tokio::test]
    async fn events_expire_strictly_after_one_window() {
        let counter = InMemoryCounter::new();
        let occ = counter.try_record("k", WINDOW, 1, 1_000).await.unwrap();
        assert!(occ.admitted);

        // One window later to the millisecond: the event still counts.
        let occ = counter.try_record("k", WINDOW, 1, 11_000).await.unwrap();
        assert!(!occ.admitted);

        // One millisecond past the window: expired.
        let occ = counter.try_record("k", WINDOW, 1, 11_001).await.unwrap();
        assert!(occ.admitted);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let counter = InMemoryCounter::new();
        let occ = counter.try_record("a", WINDOW, 1, 1_000).await.unwrap();
        assert!(occ.admitted);
        let occ = counter.try_record("a", WINDOW, 1, 1_000).await.unwrap();
        assert!(!occ.admitted);

        let occ = counter.try_record("b", WINDOW, 1, 1_000).await.unwrap();
        assert!(occ.admitted);
    }

    #[tokio::test]
    async fn sliding_window_is_not_a_fixed_bucket() {
        let counter = InMemoryCounter::new();
        // Two events late in a would-be bucket, one early in the next; a
        // fixed-window reset would admit all of a second burst at 10_500.
        counter.try_record("k", WINDOW, 3, 9_000).await.unwrap();
        counter.try_record("k", WINDOW, 3, 9_500).await.unwrap();
        counter.try_record("k", WINDOW, 3, 10_500).await.unwrap();

        let occ = counter.try_record("k", WINDOW, 3, 10_600).await.unwrap();
        assert!(!occ.admitted, "trailing window still holds three events");

        // 9_000 expires at 19_001.
        let occ = counter.try_record("k", WINDOW, 3, 19_001).await.unwrap();
        assert!(occ.admitted);
    }
}
