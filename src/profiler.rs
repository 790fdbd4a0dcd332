//! Profiler handles shared across threads
//!
//! [`CallTreeProfiler`] is what instrumented code talks to. The
//! [`ThreadLocalProfiler`] keeps one [`ProfilerContext`] per OS thread, so
//! begin/end never contend; [`DisabledProfiler`] turns every call into a
//! no-op. [`global_profiler`] picks one of the two from the environment.

use crate::config::{self, ProfilerConfig};
use crate::context::{next_context_id, ProfilerContext};
use crate::error::Result;
use crate::layer::Layer;
use crate::rendering::text::{TextOptions, TextRenderer};
use crate::rendering::xml::XmlRenderer;
use crate::rendering::{self, Renderer};
use crate::statistics::Statistics;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

/// Capability surface of a call-tree profiler
///
/// Unlayered `begin`/`end` inherit the layer of the enclosing call.
pub trait CallTreeProfiler: Send + Sync {
    fn is_enabled(&self) -> bool;

    /// Drop everything the calling thread's context has recorded
    fn clear(&self);

    fn begin(&self, name: &str, start_nanos: u64) {
        self.begin_in(Layer::inherit(), name, start_nanos);
    }

    fn begin_in(&self, layer: Layer, name: &str, start_nanos: u64);

    fn end(&self, name: &str, end_nanos: u64) -> Result<()> {
        self.end_in(&Layer::inherit(), name, end_nanos)
    }

    fn end_in(&self, layer: &Layer, name: &str, end_nanos: u64) -> Result<()> {
        self.end_measurement(layer, name, end_nanos, None)
    }

    /// Close a timer and attach the snapshot of work done by another context
    fn end_with_statistics(&self, name: &str, end_nanos: u64, sub: Option<Statistics>) -> Result<()> {
        self.end_measurement(&Layer::inherit(), name, end_nanos, sub)
    }

    /// Close the top timer, which must be `name` opened in `layer`
    fn end_measurement(
        &self,
        layer: &Layer,
        name: &str,
        end_nanos: u64,
        sub: Option<Statistics>,
    ) -> Result<()>;

    /// Snapshot of the calling thread's context
    fn statistics(&self) -> Result<Statistics>;

    fn render_text(&self, out: &mut dyn Write) -> Result<()>;

    fn render_xml(&self, out: &mut dyn Write) -> Result<()>;
}

pub type SharedProfiler = Arc<dyn CallTreeProfiler>;

static NEXT_PROFILER_ID: AtomicU64 = AtomicU64::new(1);

/// A thread's context for one profiler, alive while the profiler is
struct ContextSlot {
    owner: Weak<()>,
    context: ProfilerContext,
}

thread_local! {
    /// Contexts of the current thread, keyed by profiler instance
    static CONTEXTS: RefCell<HashMap<u64, ContextSlot>> = RefCell::new(HashMap::new());

    /// Context id reported by the disabled profiler on this thread
    static IDLE_CONTEXT_ID: u64 = next_context_id();
}

/// Per-thread recording profiler
///
/// Each thread that touches the profiler gets its own context lazily, named
/// after the thread (or `thread-<context id>` for unnamed threads).
///
/// Dropping the profiler frees the dropping thread's context at once. Contexts
/// it left on other threads are freed when that thread next creates a context
/// for any profiler, or when the thread exits.
#[derive(Debug)]
pub struct ThreadLocalProfiler {
    id: u64,
    enabled: AtomicBool,
    config: ProfilerConfig,
    alive: Arc<()>,
}

impl ThreadLocalProfiler {
    pub fn new(config: ProfilerConfig) -> Self {
        Self {
            id: NEXT_PROFILER_ID.fetch_add(1, Ordering::Relaxed),
            enabled: AtomicBool::new(config.enabled),
            config,
            alive: Arc::new(()),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    fn with_context<R>(&self, f: impl FnOnce(&mut ProfilerContext) -> R) -> R {
        CONTEXTS.with(|contexts| {
            let mut contexts = contexts.borrow_mut();
            if !contexts.contains_key(&self.id) {
                contexts.retain(|_, slot| slot.owner.strong_count() > 0);
            }
            let slot = contexts.entry(self.id).or_insert_with(|| {
                let id = next_context_id();
                ContextSlot {
                    owner: Arc::downgrade(&self.alive),
                    context: ProfilerContext::with_id(id, thread_name(id)),
                }
            });
            f(&mut slot.context)
        })
    }

    fn render_with<R: Renderer>(&self, renderer: &mut R) -> Result<()> {
        let statistics = self.statistics()?;
        rendering::render(renderer, &statistics, self.config.ordering.comparator())?;
        Ok(())
    }
}

impl Default for ThreadLocalProfiler {
    fn default() -> Self {
        Self::new(ProfilerConfig::default())
    }
}

impl Drop for ThreadLocalProfiler {
    fn drop(&mut self) {
        // other threads' contexts go away with their thread
        let _ = CONTEXTS.try_with(|contexts| contexts.borrow_mut().remove(&self.id));
    }
}

impl CallTreeProfiler for ThreadLocalProfiler {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn clear(&self) {
        self.with_context(|context| {
            tracing::debug!("clearing profiler context {} ({})", context.id(), context.name());
            context.clear();
        });
    }

    fn begin_in(&self, layer: Layer, name: &str, start_nanos: u64) {
        if self.is_enabled() {
            self.with_context(|context| context.begin_in(layer, name, start_nanos));
        }
    }

    fn end_measurement(
        &self,
        layer: &Layer,
        name: &str,
        end_nanos: u64,
        sub: Option<Statistics>,
    ) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        self.with_context(|context| context.end_measurement(layer, name, end_nanos, sub))
    }

    fn statistics(&self) -> Result<Statistics> {
        self.with_context(|context| context.statistics())
    }

    fn render_text(&self, out: &mut dyn Write) -> Result<()> {
        let mut renderer = TextRenderer::with_options(out, TextOptions::from(&self.config));
        self.render_with(&mut renderer)
    }

    fn render_xml(&self, out: &mut dyn Write) -> Result<()> {
        let mut renderer = XmlRenderer::new(out);
        self.render_with(&mut renderer)
    }
}

/// Profiler that records nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledProfiler;

impl CallTreeProfiler for DisabledProfiler {
    fn is_enabled(&self) -> bool {
        false
    }

    fn clear(&self) {}

    fn begin_in(&self, _layer: Layer, _name: &str, _start_nanos: u64) {}

    fn end_measurement(
        &self,
        _layer: &Layer,
        _name: &str,
        _end_nanos: u64,
        _sub: Option<Statistics>,
    ) -> Result<()> {
        Ok(())
    }

    fn statistics(&self) -> Result<Statistics> {
        let id = IDLE_CONTEXT_ID.with(|id| *id);
        Ok(Statistics::empty(id, thread_name(id)))
    }

    fn render_text(&self, _out: &mut dyn Write) -> Result<()> {
        Ok(())
    }

    fn render_xml(&self, _out: &mut dyn Write) -> Result<()> {
        Ok(())
    }
}

/// Recording profiler when `config.enabled`, otherwise the no-op one
pub fn from_config(config: ProfilerConfig) -> SharedProfiler {
    if config.enabled {
        Arc::new(ThreadLocalProfiler::new(config))
    } else {
        Arc::new(DisabledProfiler)
    }
}

/// Process-wide profiler, enabled unless `CTPROFILER_ENABLED` says otherwise
///
/// The environment is read once, on first use.
pub fn global_profiler() -> SharedProfiler {
    static GLOBAL: OnceLock<SharedProfiler> = OnceLock::new();
    GLOBAL
        .get_or_init(|| {
            let config = ProfilerConfig {
                enabled: config::enabled_from_env(),
                ..ProfilerConfig::default()
            };
            tracing::debug!("global call tree profiler enabled: {}", config.enabled);
            from_config(config)
        })
        .clone()
}

fn thread_name(context_id: u64) -> String {
    std::thread::current()
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("thread-{}", context_id))
}
