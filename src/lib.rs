//! ctprofiler - hierarchical call-tree profiling
//!
//! Instrumented code opens and closes named timers; each execution context
//! aggregates the durations by call path and can hand an immutable
//! [`statistics::Statistics`] snapshot to another context, where it shows up
//! as a sub-task of the call that awaited it. Snapshots are rendered as an
//! indented text tree, as XML, or exported as JSON.
//!
//! # Example
//! ```
//! use ctprofiler::context::ProfilerContext;
//! use ctprofiler::rendering::text::{self, TextOptions};
//!
//! let mut ctx = ProfilerContext::new("main");
//! ctx.begin("A", 0);
//! ctx.begin("B", 10);
//! ctx.end("B", 50).unwrap();
//! ctx.end("A", 100).unwrap();
//!
//! let stats = ctx.statistics().unwrap();
//! let out = text::render_to_string(&stats, TextOptions::unfiltered(), None).unwrap();
//! assert!(out.contains("+ A"));
//! assert!(out.contains(". + B"));
//! ```

pub mod aggregation;
pub mod call_stats;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod layer;
pub mod path;
pub mod profiler;
pub mod rendering;
pub mod statistics;
pub mod time_keeper;
pub mod timer_stack;
pub mod tree;
pub mod work_unit;

pub use error::{ProfilerError, Result};
