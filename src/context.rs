//! Explicit per-execution-context profiling state
//!
//! A `ProfilerContext` owns one timer stack and one aggregation map. Nothing
//! in it is shared with other contexts, so recording needs no locking; the
//! only cross-context traffic is an immutable [`Statistics`] value attached
//! through [`ProfilerContext::end_with_statistics`].

use crate::aggregation::{AggregationMap, MeasurementKey};
use crate::error::Result;
use crate::layer::Layer;
use crate::statistics::Statistics;
use crate::timer_stack::TimerStack;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique context id; ids are never handed out twice
pub fn next_context_id() -> u64 {
    NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug)]
pub struct ProfilerContext {
    id: u64,
    name: String,
    enabled: bool,
    stack: TimerStack,
    calls: AggregationMap,
}

impl ProfilerContext {
    /// Create an enabled context with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(next_context_id(), name)
    }

    pub fn with_id(id: u64, name: impl Into<String>) -> Self {
        let name = name.into();
        tracing::debug!("creating profiler context {} ({})", id, name);
        Self {
            id,
            name,
            enabled: true,
            stack: TimerStack::new(),
            calls: AggregationMap::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Toggle recording; a disabled context ignores begin/end entirely
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Drop all open timers and aggregated calls, keeping identity
    pub fn clear(&mut self) {
        self.stack.clear();
        self.calls.clear();
    }

    /// Open a timer that inherits its layer from the enclosing call
    pub fn begin(&mut self, name: &str, start_nanos: u64) {
        self.begin_in(Layer::inherit(), name, start_nanos);
    }

    pub fn begin_in(&mut self, layer: Layer, name: &str, start_nanos: u64) {
        if !self.enabled {
            return;
        }
        self.stack.push(layer, name, start_nanos);
    }

    pub fn end(&mut self, name: &str, end_nanos: u64) -> Result<()> {
        self.end_measurement(&Layer::inherit(), name, end_nanos, None)
    }

    pub fn end_in(&mut self, layer: &Layer, name: &str, end_nanos: u64) -> Result<()> {
        self.end_measurement(layer, name, end_nanos, None)
    }

    /// Close a timer and attach the snapshot of work delegated to another context
    pub fn end_with_statistics(
        &mut self,
        name: &str,
        end_nanos: u64,
        sub: Option<Statistics>,
    ) -> Result<()> {
        self.end_measurement(&Layer::inherit(), name, end_nanos, sub)
    }

    /// Close the top timer and add its duration to the (layer, path) bucket
    ///
    /// Ending with nothing open is ignored. On a mismatch the top frame is
    /// still closed and recorded under its own layer and path, so calls
    /// already recorded beneath it stay reachable, and `StackMismatch` is
    /// returned afterwards.
    pub fn end_measurement(
        &mut self,
        layer: &Layer,
        name: &str,
        end_nanos: u64,
        sub: Option<Statistics>,
    ) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let Some((closed, nesting)) = self.stack.pop(layer, name, end_nanos) else {
            return Ok(());
        };
        let key = MeasurementKey::new(closed.layer, closed.path);
        self.calls.record(key, closed.duration_nanos, sub);
        nesting
    }

    /// Build the current call tree as an immutable snapshot
    pub fn statistics(&self) -> Result<Statistics> {
        Statistics::from_map(self.id, self.name.clone(), &self.calls)
    }

    pub fn open_timers(&self) -> usize {
        self.stack.depth()
    }

    pub fn aggregation(&self) -> &AggregationMap {
        &self.calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProfilerError;
    use crate::path::TimerPath;

    #[test]
    fn test_nested_scenario() {
        let mut ctx = ProfilerContext::new("main");
        ctx.begin("A", 0);
        ctx.begin("B", 10);
        ctx.end("B", 50).unwrap();
        ctx.end("A", 100).unwrap();

        let stats = ctx.statistics().unwrap();
        assert_eq!(stats.roots().len(), 1);
        let a = &stats.roots()[0];
        assert_eq!(a.leaf_name(), "A");
        assert_eq!(a.stats().calls(), 1);
        assert_eq!(a.total_nanos(), 100);
        assert_eq!(a.children().len(), 1);
        let b = &a.children()[0];
        assert_eq!(b.leaf_name(), "B");
        assert_eq!(b.stats().calls(), 1);
        assert_eq!(b.total_nanos(), 40);
    }

    #[test]
    fn test_repeated_call_accumulates_into_one_bucket() {
        let mut ctx = ProfilerContext::new("main");
        ctx.begin("P", 0);
        ctx.begin("X", 10);
        ctx.end("X", 15).unwrap();
        ctx.begin("X", 20);
        ctx.end("X", 32).unwrap();
        ctx.end("P", 40).unwrap();

        let stats = ctx.statistics().unwrap();
        let p = &stats.roots()[0];
        assert_eq!(p.children().len(), 1);
        let x = &p.children()[0];
        assert_eq!(x.stats().calls(), 2);
        assert_eq!(x.total_nanos(), 5 + 12);
    }

    #[test]
    fn test_end_on_empty_stack_is_ignored() {
        let mut ctx = ProfilerContext::new("main");
        ctx.end("ghost", 10).unwrap();
        assert!(ctx.aggregation().is_empty());
    }

    #[test]
    fn test_mismatch_still_records_top_frame() {
        let mut ctx = ProfilerContext::new("main");
        ctx.begin("outer", 0);
        let err = ctx.end("inner", 5).unwrap_err();
        assert!(matches!(err, ProfilerError::StackMismatch { .. }));
        assert_eq!(ctx.open_timers(), 0);

        let stats = ctx.statistics().unwrap();
        let outer = stats.find(&TimerPath::new(["outer"])).unwrap();
        assert_eq!(outer.total_nanos(), 5);
    }

    #[test]
    fn test_mismatch_keeps_recorded_children_reachable() {
        let mut ctx = ProfilerContext::new("main");
        ctx.begin("A", 0);
        ctx.begin("B", 10);
        ctx.end("B", 50).unwrap();
        let err = ctx.end("X", 100).unwrap_err();
        assert!(matches!(err, ProfilerError::StackMismatch { .. }));

        let stats = ctx.statistics().unwrap();
        assert_eq!(stats.roots().len(), 1);
        let a = &stats.roots()[0];
        assert_eq!(a.leaf_name(), "A");
        assert_eq!(a.total_nanos(), 100);
        let b = stats.find(&TimerPath::new(["A", "B"])).unwrap();
        assert_eq!(b.total_nanos(), 40);
        assert_eq!(ctx.aggregation().len(), 2);
    }

    #[test]
    fn test_layered_calls_stay_separate() {
        let mut ctx = ProfilerContext::new("main");
        ctx.begin_in(Layer::business(), "work", 0);
        ctx.end_in(&Layer::business(), "work", 10).unwrap();
        ctx.begin_in(Layer::integration(), "work", 10);
        ctx.end_in(&Layer::integration(), "work", 30).unwrap();

        assert_eq!(ctx.aggregation().len(), 2);
        let stats = ctx.statistics().unwrap();
        assert_eq!(stats.roots().len(), 2);
        assert_eq!(stats.total_nanos(), 30);
    }

    #[test]
    fn test_disabled_context_records_nothing() {
        let mut ctx = ProfilerContext::new("main");
        ctx.set_enabled(false);
        ctx.begin("A", 0);
        ctx.end("B", 10).unwrap();
        assert_eq!(ctx.open_timers(), 0);
        assert!(ctx.statistics().unwrap().is_empty());
    }

    #[test]
    fn test_clear_resets_but_keeps_identity() {
        let mut ctx = ProfilerContext::new("pooled");
        let id = ctx.id();
        ctx.begin("A", 0);
        ctx.begin("B", 1);
        ctx.end("B", 2).unwrap();
        ctx.clear();

        assert_eq!(ctx.open_timers(), 0);
        assert!(ctx.aggregation().is_empty());
        assert_eq!(ctx.id(), id);
    }

    #[test]
    fn test_sub_statistics_attached_to_bucket() {
        let mut worker = ProfilerContext::new("worker");
        worker.begin("compute", 0);
        worker.end("compute", 70).unwrap();
        let delegated = worker.statistics().unwrap();

        let mut ctx = ProfilerContext::new("main");
        ctx.begin("await", 0);
        ctx.end_with_statistics("await", 100, Some(delegated)).unwrap();

        let stats = ctx.statistics().unwrap();
        let node = stats.find(&TimerPath::new(["await"])).unwrap();
        assert_eq!(node.stats().sub_statistics().len(), 1);
        assert_eq!(node.stats().sub_statistics()[0].context_name(), "worker");
        assert_eq!(node.stats().sub_statistics()[0].total_nanos(), 70);
    }

    #[test]
    fn test_context_ids_are_unique() {
        let a = ProfilerContext::new("a");
        let b = ProfilerContext::new("b");
        assert_ne!(a.id(), b.id());
    }
}
