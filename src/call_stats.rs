//! Immutable per-bucket call statistics
//!
//! Adding a call never mutates a `CallStats`: it returns a new value, so a
//! copy handed out earlier (e.g. inside a snapshot) keeps its numbers.

use crate::statistics::Statistics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Number and cumulative duration of calls sharing one (layer, path) bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallStats {
    calls: u64,
    total_nanos: u64,
    /// Snapshots of delegated work from other contexts, in attach order
    #[serde(default, skip_serializing_if = "no_sub_statistics")]
    sub_statistics: Arc<Vec<Statistics>>,
}

fn no_sub_statistics(subs: &Arc<Vec<Statistics>>) -> bool {
    subs.is_empty()
}

impl CallStats {
    /// An empty bucket: zero calls, zero nanos
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more call
    ///
    /// # Example
    /// ```
    /// use ctprofiler::call_stats::CallStats;
    ///
    /// let first = CallStats::new().add(40, None);
    /// let second = first.add(60, None);
    /// assert_eq!(first.calls(), 1);
    /// assert_eq!(second.calls(), 2);
    /// assert_eq!(second.total_nanos(), 100);
    /// ```
    pub fn add(&self, duration_nanos: u64, sub_statistics: Option<Statistics>) -> CallStats {
        let subs = match sub_statistics {
            None => Arc::clone(&self.sub_statistics),
            Some(sub) => {
                let mut subs = Vec::with_capacity(self.sub_statistics.len() + 1);
                subs.extend(self.sub_statistics.iter().cloned());
                subs.push(sub);
                Arc::new(subs)
            }
        };
        CallStats {
            calls: self.calls + 1,
            total_nanos: self.total_nanos.saturating_add(duration_nanos),
            sub_statistics: subs,
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }

    pub fn total_nanos(&self) -> u64 {
        self.total_nanos
    }

    pub fn total(&self) -> Duration {
        Duration::from_nanos(self.total_nanos)
    }

    pub fn average_nanos(&self) -> u64 {
        if self.calls == 0 {
            0
        } else {
            self.total_nanos / self.calls
        }
    }

    pub fn sub_statistics(&self) -> &[Statistics] {
        &self.sub_statistics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let stats = CallStats::new();
        assert_eq!(stats.calls(), 0);
        assert_eq!(stats.total_nanos(), 0);
        assert!(stats.sub_statistics().is_empty());
        assert_eq!(stats.average_nanos(), 0);
    }

    #[test]
    fn test_add_accumulates() {
        let stats = CallStats::new().add(100, None).add(300, None);
        assert_eq!(stats.calls(), 2);
        assert_eq!(stats.total_nanos(), 400);
        assert_eq!(stats.average_nanos(), 200);
        assert_eq!(stats.total(), Duration::from_nanos(400));
    }

    #[test]
    fn test_add_leaves_original_untouched() {
        let before = CallStats::new().add(10, None);
        let sub = Statistics::empty(7, "worker-7");
        let after = before.add(5, Some(sub));

        assert_eq!(before.calls(), 1);
        assert_eq!(before.total_nanos(), 10);
        assert!(before.sub_statistics().is_empty());

        assert_eq!(after.calls(), 2);
        assert_eq!(after.total_nanos(), 15);
        assert_eq!(after.sub_statistics().len(), 1);
        assert_eq!(after.sub_statistics()[0].context_id(), 7);
    }

    #[test]
    fn test_sub_statistics_keep_attach_order() {
        let stats = CallStats::new()
            .add(1, Some(Statistics::empty(1, "a")))
            .add(1, None)
            .add(1, Some(Statistics::empty(2, "b")));
        let ids: Vec<u64> = stats.sub_statistics().iter().map(|s| s.context_id()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_total_saturates() {
        let stats = CallStats::new().add(u64::MAX, None).add(10, None);
        assert_eq!(stats.total_nanos(), u64::MAX);
    }
}
