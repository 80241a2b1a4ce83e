use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::sync::RwLock;

/// Per-user record of recent message timestamps, arrival order preserved.
#[derive(Debug, Default)]
struct UserWindow {
    timestamps: VecDeque<u64>,
    last_seen_secs: u64,
}

impl UserWindow {
    /// Append one timestamp, then trim the stale prefix.
    ///
    /// Entries are time-ordered apart from clock skew, so pruning is a prefix
    /// trim from the oldest end. `saturating_sub` keeps an out-of-order older
    /// timestamp from ever producing a negative age: entries newer than the
    /// arrival compare as age zero and are retained.
    fn record(&mut self, timestamp_secs: u64, window: Duration) -> usize {
        self.timestamps.push_back(timestamp_secs);
        self.last_seen_secs = self.last_seen_secs.max(timestamp_secs);

        let window_secs = window.as_secs();
        while let Some(&oldest) = self.timestamps.front() {
            if timestamp_secs.saturating_sub(oldest) > window_secs {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }

        self.timestamps.len()
    }
}

/// Sliding-window burst tracker. Sole owner of all per-user windows; windows
/// are created lazily on first message and swept once idle.
#[derive(Debug, Default)]
pub struct SlidingWindowTracker {
    windows: RwLock<HashMap<u64, UserWindow>>,
}

impl SlidingWindowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one message and report whether the user is over threshold.
    ///
    /// Returns `(over_threshold, current_count)`. Equality at the boundary
    /// counts as over threshold.
    pub async fn record_and_check(
        &self,
        user_id: u64,
        timestamp_secs: u64,
        threshold: u64,
        window: Duration,
    ) -> (bool, usize) {
        let mut windows = self.windows.write().await;
        let count = windows
            .entry(user_id)
            .or_default()
            .record(timestamp_secs, window);

        (count as u64 >= threshold, count)
    }

    /// Evict windows whose newest entry is older than `idle_after`.
    /// Returns the number of evicted users.
    pub async fn sweep_idle(&self, now_secs: u64, idle_after: Duration) -> usize {
        let idle_secs = idle_after.as_secs();
        let mut windows = self.windows.write().await;
        let before = windows.len();
        windows.retain(|_, window| now_secs.saturating_sub(window.last_seen_secs) <= idle_secs);
        before - windows.len()
    }

    /// Number of users currently holding a window.
    pub async fn tracked_users(&self) -> usize {
        self.windows.read().await.len()
    }
}
