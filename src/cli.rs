//! CLI argument parsing for ctprofiler

use crate::config::{CallOrdering, ProfilerConfig};
use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for a rendered snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented call tree for humans (default)
    Text,
    /// Nested `<measure>` elements
    Xml,
    /// Pretty-printed snapshot, every node kept
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "ctprofiler")]
#[command(version)]
#[command(about = "Render call tree profiler snapshots", long_about = None)]
pub struct Cli {
    /// JSON snapshot dump to render ("-" reads stdin)
    #[arg(value_name = "SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Profiler configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Sibling order, overrides the config file
    #[arg(long = "ordering", value_enum)]
    pub ordering: Option<CallOrdering>,

    /// Hide calls faster than this many nanoseconds
    #[arg(long = "call-threshold", value_name = "NANOS")]
    pub call_threshold: Option<u64>,

    /// Childless calls faster than this count as leaf statistics
    #[arg(long = "leaf-threshold", value_name = "NANOS")]
    pub leaf_threshold: Option<u64>,

    /// Leaf statistics printed per parent before folding the rest
    #[arg(long = "leaf-max-items", value_name = "N")]
    pub leaf_max_items: Option<usize>,

    /// Print every call, ignoring all thresholds
    #[arg(short = 'a', long = "all")]
    pub all: bool,

    /// Indentation repeated once per nesting level
    #[arg(long = "indent", value_name = "STR")]
    pub indent: Option<String>,

    /// Prefix written before each call name
    #[arg(long = "leaf-prefix", value_name = "STR")]
    pub leaf_prefix: Option<String>,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Layer command-line overrides on top of the config file (or defaults)
    pub fn resolve_config(&self) -> anyhow::Result<ProfilerConfig> {
        let mut config = match &self.config {
            Some(path) => ProfilerConfig::from_toml(path)?,
            None => ProfilerConfig::default(),
        };

        if self.all {
            config = ProfilerConfig {
                call_duration_threshold_nanos: 0,
                leaf_statistics_threshold_nanos: 0,
                leaf_statistics_max_items: usize::MAX,
                ..config
            };
        }
        if let Some(ordering) = self.ordering {
            config.ordering = ordering;
        }
        if let Some(nanos) = self.call_threshold {
            config.call_duration_threshold_nanos = nanos;
        }
        if let Some(nanos) = self.leaf_threshold {
            config.leaf_statistics_threshold_nanos = nanos;
        }
        if let Some(items) = self.leaf_max_items {
            config.leaf_statistics_max_items = items;
        }
        if let Some(indent) = &self.indent {
            config.call_indentation = indent.clone();
        }
        if let Some(prefix) = &self.leaf_prefix {
            config.leaf_name_prefix = prefix.clone();
        }

        config
            .validate()
            .context("Invalid profiler configuration")?;
        Ok(config)
    }
}
