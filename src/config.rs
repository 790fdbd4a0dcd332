//! Profiler and renderer configuration
//!
//! Settings can come from code (`ProfilerConfig::default()` plus struct
//! update syntax), from a TOML file, and the global on/off switch from the
//! `CTPROFILER_ENABLED` environment variable.
//!
//! # Example TOML
//! ```toml
//! layer = "presentation"
//! callDurationThresholdNanos = 1000000
//! leafStatisticsThresholdNanos = 10000000
//! leafStatisticsMaxItems = 20
//! requestDurationThresholdNanos = 200000000
//! ordering = "duration"
//! callIndentation = ". "
//! leafNamePrefix = "+ "
//! ```

use crate::error::{ProfilerError, Result};
use crate::layer::Layer;
use crate::tree::{self, NodeComparator};
use anyhow::Context;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable controlling the global profiler
///
/// Unset or blank means enabled; anything else enables profiling only if it
/// reads `true` (case-insensitive).
pub const ENV_ENABLED: &str = "CTPROFILER_ENABLED";

const MILLI: u64 = 1_000_000;

/// Sibling order used when rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CallOrdering {
    /// Earlier calls first; calls sharing name and parent are still merged
    /// into one node regardless of what happened in between
    #[default]
    #[serde(alias = "chronological")]
    #[value(alias = "chronological")]
    SemiSequential,
    /// Slowest calls first
    #[serde(alias = "by-duration")]
    #[value(alias = "by-duration")]
    Duration,
}

impl CallOrdering {
    pub fn comparator(self) -> Option<NodeComparator> {
        match self {
            CallOrdering::SemiSequential => None,
            CallOrdering::Duration => Some(tree::by_duration),
        }
    }
}

/// Configuration consumed by the façade, work-unit profiling and renderers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfilerConfig {
    pub enabled: bool,
    /// Layer assigned to the outermost work-unit timer
    pub layer: String,
    /// Nodes faster than this are left out of text output
    pub call_duration_threshold_nanos: u64,
    /// Childless nodes faster than this are "leaf statistics"...
    pub leaf_statistics_threshold_nanos: u64,
    /// ...of which at most this many are printed per parent
    pub leaf_statistics_max_items: usize,
    /// Work units faster than this are not rendered at all
    pub request_duration_threshold_nanos: u64,
    pub ordering: CallOrdering,
    pub call_indentation: String,
    pub leaf_name_prefix: String,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            layer: "presentation".to_string(),
            call_duration_threshold_nanos: MILLI,
            leaf_statistics_threshold_nanos: 10 * MILLI,
            leaf_statistics_max_items: 20,
            request_duration_threshold_nanos: 200 * MILLI,
            ordering: CallOrdering::SemiSequential,
            call_indentation: ". ".to_string(),
            leaf_name_prefix: "+ ".to_string(),
        }
    }
}

impl ProfilerConfig {
    /// Render every call, however fast
    pub fn verbose() -> Self {
        Self {
            call_duration_threshold_nanos: 0,
            leaf_statistics_threshold_nanos: 0,
            leaf_statistics_max_items: usize::MAX,
            request_duration_threshold_nanos: 0,
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read, is not valid TOML, or fails
    /// validation.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read profiler config: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: ProfilerConfig =
            toml::from_str(content).context("Failed to parse TOML profiler config")?;
        config.validate()?;
        Ok(config)
    }

    /// Override `enabled` from `CTPROFILER_ENABLED`, if set
    pub fn apply_env(mut self) -> Self {
        if let Ok(value) = std::env::var(ENV_ENABLED) {
            self.enabled = parse_enabled(&value);
        }
        self
    }

    pub fn layer(&self) -> Layer {
        Layer::for_name(&self.layer)
    }

    pub fn validate(&self) -> Result<()> {
        if self.layer.trim().is_empty() {
            return Err(ProfilerError::InvalidConfig(
                "layer must not be empty".to_string(),
            ));
        }
        if Layer::for_name(&self.layer).is_inherit() {
            return Err(ProfilerError::InvalidConfig(format!(
                "layer '{}' is reserved",
                self.layer
            )));
        }
        Ok(())
    }
}

/// Whether the global profiler should be enabled according to the environment
pub fn enabled_from_env() -> bool {
    std::env::var(ENV_ENABLED)
        .map(|value| parse_enabled(&value))
        .unwrap_or(true)
}

fn parse_enabled(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("true")
}
