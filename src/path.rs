//! Nested timer paths
//!
//! A path is the chain of timer names from the implicit root down to one
//! call site. Its parent drops the last element; the root is the empty path.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The full chain of nested timer names leading to one measurement
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerPath {
    segments: Vec<String>,
}

impl TimerPath {
    /// The distinguished zero-length path all top-level calls hang off
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Name of the innermost timer, empty for the root
    pub fn leaf_name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// Number of nested timer names, useful for indentation
    pub fn level(&self) -> usize {
        self.segments.len()
    }

    /// The enclosing path, or `None` for the root
    pub fn parent(&self) -> Option<TimerPath> {
        let (_, init) = self.segments.split_last()?;
        Some(TimerPath {
            segments: init.to_vec(),
        })
    }

    pub fn child(&self, name: impl Into<String>) -> TimerPath {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        TimerPath { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for TimerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.segments.join(", "))
    }
}
