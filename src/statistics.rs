//! Immutable statistics snapshot of one execution context
//!
//! A snapshot is the value handed across contexts when delegated work
//! finishes: it is cheap to clone and never changes after construction.

use crate::aggregation::AggregationMap;
use crate::error::Result;
use crate::path::TimerPath;
use crate::tree::{self, Node};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Completed call tree of one context plus the context's identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    context_id: u64,
    context_name: String,
    roots: Arc<Vec<Node>>,
}

impl Statistics {
    /// Build a snapshot from a context's aggregation map
    pub fn from_map(context_id: u64, context_name: impl Into<String>, map: &AggregationMap) -> Result<Self> {
        Ok(Self {
            context_id,
            context_name: context_name.into(),
            roots: Arc::new(tree::build_roots(map)?),
        })
    }

    /// A snapshot with no recorded calls
    pub fn empty(context_id: u64, context_name: impl Into<String>) -> Self {
        Self {
            context_id,
            context_name: context_name.into(),
            roots: Arc::new(Vec::new()),
        }
    }

    pub fn context_id(&self) -> u64 {
        self.context_id
    }

    pub fn context_name(&self) -> &str {
        &self.context_name
    }

    /// Nodes whose path's parent is the tree root
    pub fn roots(&self) -> &[Node] {
        &self.roots
    }

    /// Sum of the root nodes' own durations
    ///
    /// Children are not added: strict nesting means their time is already
    /// inside their ancestors' measured intervals.
    pub fn total_nanos(&self) -> u64 {
        self.roots
            .iter()
            .fold(0u64, |acc, node| acc.saturating_add(node.total_nanos()))
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Locate the first node recorded at `path`
    pub fn find(&self, path: &TimerPath) -> Option<&Node> {
        self.roots.iter().find_map(|root| root.find(path))
    }
}
