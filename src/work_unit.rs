//! Whole-unit profiling for request/job handlers
//!
//! Wraps one unit of work (a request, a job, a batch) in a top-level timer
//! and logs the resulting call tree when the unit was slow enough to be
//! interesting.

use crate::config::ProfilerConfig;
use crate::profiler::SharedProfiler;
use crate::rendering::text::{self, TextOptions};
use crate::statistics::Statistics;
use crate::time_keeper::TimeKeeper;

pub struct WorkUnitProfiler {
    keeper: TimeKeeper,
    config: ProfilerConfig,
}

impl WorkUnitProfiler {
    pub fn new(profiler: SharedProfiler, config: ProfilerConfig) -> Self {
        Self {
            keeper: TimeKeeper::new(profiler),
            config,
        }
    }

    pub fn time_keeper(&self) -> &TimeKeeper {
        &self.keeper
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Run `f` as the unit `unit`, then log its call tree and reset
    ///
    /// The calling thread's context is cleared before and after, also when
    /// `f` panics.
    pub fn run<T>(&self, unit: &str, f: impl FnOnce() -> T) -> T {
        self.keeper.profiler().clear();
        let _finish = UnitScope { owner: self, unit };
        let _timer = self.keeper.guard_in(self.config.layer(), unit);
        f()
    }

    /// Text rendering of `statistics` with every configured threshold
    pub fn report(&self, statistics: &Statistics) -> String {
        let options = TextOptions::from(&self.config);
        match text::render_to_string(statistics, options, self.config.ordering.comparator()) {
            Ok(report) => report,
            Err(err) => {
                tracing::debug!("ignoring call tree rendering failure: {}", err);
                String::new()
            }
        }
    }

    fn log_report(&self, unit: &str) {
        let profiler = self.keeper.profiler();
        if !profiler.is_enabled() {
            return;
        }
        let statistics = match profiler.statistics() {
            Ok(statistics) => statistics,
            Err(err) => {
                tracing::debug!("no call tree for {}: {}", unit, err);
                return;
            }
        };

        tracing::info!("{}", self.summary(unit, &statistics));
    }

    /// Log line for a finished unit
    ///
    /// Only units slower than `request_duration_threshold_nanos` get their
    /// call tree; the rest are reported by total duration.
    pub fn summary(&self, unit: &str, statistics: &Statistics) -> String {
        let total = statistics.total_nanos();
        if total > self.config.request_duration_threshold_nanos {
            format!("call tree for {}:\n{}", unit, self.report(statistics))
        } else {
            format!("too fast for call tree logging: {}nanos {}", total, unit)
        }
    }
}

/// Reports and clears when the unit's scope is left
struct UnitScope<'a> {
    owner: &'a WorkUnitProfiler,
    unit: &'a str,
}

impl Drop for UnitScope<'_> {
    fn drop(&mut self) {
        self.owner.log_report(self.unit);
        self.owner.keeper.profiler().clear();
    }
}
