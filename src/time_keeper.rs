//! Instrumentation façade
//!
//! [`TimeKeeper`] reads the clock and forwards to a [`CallTreeProfiler`].
//! Nesting errors are logged and swallowed here: instrumentation must never
//! change the behavior of the code it measures.
//!
//! # Example
//! ```
//! use ctprofiler::profiler::ThreadLocalProfiler;
//! use ctprofiler::time_keeper::TimeKeeper;
//! use std::sync::Arc;
//!
//! let keeper = TimeKeeper::new(Arc::new(ThreadLocalProfiler::default()));
//! let sum = keeper.measure("sum", || (1..=10).sum::<u32>());
//! assert_eq!(sum, 55);
//! assert_eq!(keeper.profiler().statistics().unwrap().roots()[0].leaf_name(), "sum");
//! ```

use crate::layer::Layer;
use crate::profiler::{global_profiler, SharedProfiler};
use crate::statistics::Statistics;
use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Clock-reading front end of a profiler
#[derive(Clone)]
pub struct TimeKeeper {
    profiler: SharedProfiler,
}

impl TimeKeeper {
    pub fn new(profiler: SharedProfiler) -> Self {
        Self { profiler }
    }

    /// Monotonic nanoseconds since the first call in this process
    pub fn now_nanos() -> u64 {
        let elapsed = EPOCH.get_or_init(Instant::now).elapsed().as_nanos();
        u64::try_from(elapsed).unwrap_or(u64::MAX)
    }

    pub fn profiler(&self) -> &SharedProfiler {
        &self.profiler
    }

    pub fn is_enabled(&self) -> bool {
        self.profiler.is_enabled()
    }

    pub fn begin(&self, name: &str) {
        self.begin_in(Layer::inherit(), name);
    }

    pub fn begin_in(&self, layer: Layer, name: &str) {
        self.profiler.begin_in(layer, name, Self::now_nanos());
    }

    pub fn end(&self, name: &str) {
        self.end_measurement(&Layer::inherit(), name, None);
    }

    pub fn end_in(&self, layer: &Layer, name: &str) {
        self.end_measurement(layer, name, None);
    }

    /// End `name` and attach the snapshot of work handed to another thread
    pub fn end_with_statistics(&self, name: &str, sub: Statistics) {
        self.end_measurement(&Layer::inherit(), name, Some(sub));
    }

    fn end_measurement(&self, layer: &Layer, name: &str, sub: Option<Statistics>) {
        let now = Self::now_nanos();
        if let Err(err) = self.profiler.end_measurement(layer, name, now, sub) {
            tracing::warn!("call tree timer '{}' not closed cleanly: {}", name, err);
        }
    }

    /// Start a timer that ends when the guard is dropped
    pub fn guard(&self, name: &str) -> TimerGuard<'_> {
        self.guard_in(Layer::inherit(), name)
    }

    pub fn guard_in(&self, layer: Layer, name: &str) -> TimerGuard<'_> {
        self.begin_in(layer.clone(), name);
        TimerGuard {
            keeper: self,
            layer,
            name: name.to_string(),
            sub: None,
        }
    }

    /// Time `f` as `name`; the timer is closed even if `f` panics
    pub fn measure<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        let _guard = self.guard(name);
        f()
    }

    pub fn measure_in<T>(&self, layer: Layer, name: &str, f: impl FnOnce() -> T) -> T {
        let _guard = self.guard_in(layer, name);
        f()
    }

    /// Wrap `value` so each delegated call is timed as `<Type>.<method>`
    pub fn instrument<T>(&self, value: T) -> Instrumented<T> {
        self.instrument_in(Layer::inherit(), value)
    }

    /// Like [`TimeKeeper::instrument`], in `layer`
    ///
    /// Whether calls are timed is decided here, once: a wrapper built while
    /// the profiler is disabled is a plain passthrough for its whole life.
    pub fn instrument_in<T>(&self, layer: Layer, value: T) -> Instrumented<T> {
        Instrumented {
            keeper: self.is_enabled().then(|| self.clone()),
            layer,
            type_name: simple_type_name::<T>(),
            inner: value,
        }
    }
}

/// Process-wide keeper over [`global_profiler`]
pub fn global_time_keeper() -> &'static TimeKeeper {
    static KEEPER: OnceLock<TimeKeeper> = OnceLock::new();
    KEEPER.get_or_init(|| TimeKeeper::new(global_profiler()))
}

/// Open timer, closed on drop
#[must_use = "the timer ends as soon as the guard is dropped"]
pub struct TimerGuard<'a> {
    keeper: &'a TimeKeeper,
    layer: Layer,
    name: String,
    sub: Option<Statistics>,
}

impl TimerGuard<'_> {
    /// Attach a sub-task snapshot to be recorded when the timer ends
    pub fn attach(&mut self, sub: Statistics) {
        self.sub = Some(sub);
    }
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        let sub = self.sub.take();
        self.keeper.end_measurement(&self.layer, &self.name, sub);
    }
}

/// A value whose calls are timed by a [`TimeKeeper`]
///
/// To instrument a trait, implement it for `Instrumented<YourType>` and
/// route each method through [`Instrumented::call`].
pub struct Instrumented<T> {
    keeper: Option<TimeKeeper>,
    layer: Layer,
    type_name: &'static str,
    inner: T,
}

impl<T> Instrumented<T> {
    pub fn call<R>(&self, method: &str, f: impl FnOnce(&T) -> R) -> R {
        let Some(keeper) = &self.keeper else {
            return f(&self.inner);
        };
        let name = timer_name(self.type_name, method);
        let _guard = keeper.guard_in(self.layer.clone(), &name);
        f(&self.inner)
    }

    pub fn call_mut<R>(&mut self, method: &str, f: impl FnOnce(&mut T) -> R) -> R {
        let Some(keeper) = &self.keeper else {
            return f(&mut self.inner);
        };
        let name = timer_name(self.type_name, method);
        let _guard = keeper.guard_in(self.layer.clone(), &name);
        f(&mut self.inner)
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Whether calls through this wrapper are being recorded
    pub fn is_instrumented(&self) -> bool {
        self.keeper.is_some()
    }
}

fn timer_name(type_name: &str, method: &str) -> String {
    format!("{}.{}", type_name, method)
}

/// `my_crate::orders::OrderService<u32>` -> `OrderService`
fn simple_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
