//! Flat (layer, path) → call statistics map
//!
//! Buckets keep the order in which they were first created, which is the
//! "semi-sequential" order renderers fall back to when no comparator is set.

use crate::call_stats::CallStats;
use crate::layer::Layer;
use crate::path::TimerPath;
use crate::statistics::Statistics;
use fnv::FnvHashMap;
use std::fmt;

/// Identifies one aggregation bucket
///
/// Layer participates in equality, so the same nesting measured under two
/// explicit layers accumulates separately.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeasurementKey {
    pub layer: Layer,
    pub path: TimerPath,
}

impl MeasurementKey {
    pub fn new(layer: Layer, path: TimerPath) -> Self {
        Self { layer, path }
    }
}

impl fmt::Display for MeasurementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.path, self.layer)
    }
}

#[derive(Debug, Default, Clone)]
pub struct AggregationMap {
    /// Buckets in creation order
    entries: Vec<(MeasurementKey, CallStats)>,
    /// Position of each key in `entries`
    index: FnvHashMap<MeasurementKey, usize>,
}

impl AggregationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one call to the bucket for `key`, creating it on first use
    ///
    /// The stored `CallStats` is replaced by a new value; clones handed out
    /// earlier are unaffected.
    pub fn record(&mut self, key: MeasurementKey, duration_nanos: u64, sub: Option<Statistics>) {
        match self.index.get(&key) {
            Some(&slot) => {
                let bucket = &mut self.entries[slot].1;
                *bucket = bucket.add(duration_nanos, sub);
            }
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries
                    .push((key, CallStats::new().add(duration_nanos, sub)));
            }
        }
    }

    pub fn get(&self, key: &MeasurementKey) -> Option<&CallStats> {
        self.index.get(key).map(|&slot| &self.entries[slot].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MeasurementKey, &CallStats)> {
        self.entries.iter().map(|(key, stats)| (key, stats))
    }

    pub fn keys(&self) -> impl Iterator<Item = &MeasurementKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(layer: Layer, names: &[&str]) -> MeasurementKey {
        MeasurementKey::new(layer, TimerPath::new(names.iter().copied()))
    }

    #[test]
    fn test_record_accumulates_same_key() {
        let mut map = AggregationMap::new();
        map.record(key(Layer::inherit(), &["X"]), 30, None);
        map.record(key(Layer::inherit(), &["X"]), 12, None);

        assert_eq!(map.len(), 1);
        let stats = map.get(&key(Layer::inherit(), &["X"])).unwrap();
        assert_eq!(stats.calls(), 2);
        assert_eq!(stats.total_nanos(), 42);
    }

    #[test]
    fn test_distinct_layers_are_distinct_buckets() {
        let mut map = AggregationMap::new();
        map.record(key(Layer::business(), &["A", "B"]), 5, None);
        map.record(key(Layer::integration(), &["A", "B"]), 7, None);

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&key(Layer::business(), &["A", "B"])).unwrap().total_nanos(), 5);
        assert_eq!(map.get(&key(Layer::integration(), &["A", "B"])).unwrap().total_nanos(), 7);
    }

    #[test]
    fn test_replaced_bucket_does_not_mutate_old_value() {
        let mut map = AggregationMap::new();
        map.record(key(Layer::inherit(), &["X"]), 10, None);
        let observed = map.get(&key(Layer::inherit(), &["X"])).unwrap().clone();

        map.record(key(Layer::inherit(), &["X"]), 10, None);

        assert_eq!(observed.calls(), 1);
        assert_eq!(map.get(&key(Layer::inherit(), &["X"])).unwrap().calls(), 2);
    }

    #[test]
    fn test_iteration_follows_creation_order() {
        let mut map = AggregationMap::new();
        map.record(key(Layer::inherit(), &["A", "B"]), 1, None);
        map.record(key(Layer::inherit(), &["A", "C"]), 1, None);
        map.record(key(Layer::inherit(), &["A"]), 1, None);
        map.record(key(Layer::inherit(), &["A", "B"]), 1, None);

        let leaves: Vec<&str> = map.iter().map(|(k, _)| k.path.leaf_name()).collect();
        assert_eq!(leaves, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_clear_empties() {
        let mut map = AggregationMap::new();
        map.record(key(Layer::inherit(), &["A"]), 1, None);
        map.clear();
        assert!(map.is_empty());
    }
}
