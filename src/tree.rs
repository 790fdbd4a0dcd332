//! Call tree reconstruction
//!
//! Turns the flat aggregation map of one context into a tree of [`Node`]s.
//! Entries are grouped by parent path first; nodes are then built top-down
//! from the root group so that each entry recorded with the `inherit` layer
//! can take the layer its parent already resolved to. Inheritance therefore
//! follows path order, not the order calls happened in.

use crate::aggregation::{AggregationMap, MeasurementKey};
use crate::call_stats::CallStats;
use crate::error::{ProfilerError, Result};
use crate::layer::Layer;
use crate::path::TimerPath;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// One call site in the tree, with its resolved layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    layer: Layer,
    path: TimerPath,
    stats: CallStats,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<Node>,
}

impl Node {
    /// Never the inherit sentinel
    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    pub fn path(&self) -> &TimerPath {
        &self.path
    }

    pub fn stats(&self) -> &CallStats {
        &self.stats
    }

    /// Child nodes in discovery order
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn leaf_name(&self) -> &str {
        self.path.leaf_name()
    }

    pub fn total_nanos(&self) -> u64 {
        self.stats.total_nanos()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Depth-first search for the node at `path` below (and including) self
    pub fn find(&self, path: &TimerPath) -> Option<&Node> {
        if self.path == *path {
            return Some(self);
        }
        if !path.segments().starts_with(self.path.segments()) {
            return None;
        }
        self.children.iter().find_map(|child| child.find(path))
    }

    /// Number of nodes in this subtree, self included
    pub fn subtree_size(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_size).sum::<usize>()
    }
}

/// Ordering applied to siblings before rendering
pub type NodeComparator = fn(&Node, &Node) -> Ordering;

/// Slowest first; equal durations keep their discovery order
pub fn by_duration(a: &Node, b: &Node) -> Ordering {
    b.total_nanos().cmp(&a.total_nanos())
}

/// Build the root nodes for every entry in `map`
///
/// # Errors
/// `MissingStatistics` if a grouped path has no bucket, which can only mean
/// the map was mutated while the tree was being built.
pub fn build_roots(map: &AggregationMap) -> Result<Vec<Node>> {
    let mut by_parent: HashMap<TimerPath, Vec<&MeasurementKey>> = HashMap::new();
    for key in map.keys() {
        if let Some(parent) = key.path.parent() {
            by_parent.entry(parent).or_default().push(key);
        }
    }

    let Some(roots) = by_parent.get(&TimerPath::root()) else {
        return Ok(Vec::new());
    };

    let fallback = Layer::default();
    roots
        .iter()
        .map(|key| to_node(map, &by_parent, resolve(&key.layer, &fallback), key))
        .collect()
}

fn resolve(own: &Layer, enclosing: &Layer) -> Layer {
    if own.is_inherit() {
        enclosing.clone()
    } else {
        own.clone()
    }
}

fn to_node(
    map: &AggregationMap,
    by_parent: &HashMap<TimerPath, Vec<&MeasurementKey>>,
    layer: Layer,
    key: &MeasurementKey,
) -> Result<Node> {
    let stats = map
        .get(key)
        .ok_or_else(|| ProfilerError::MissingStatistics {
            path: key.path.to_string(),
        })?;

    let mut children = Vec::new();
    if let Some(child_keys) = by_parent.get(&key.path) {
        for child in child_keys {
            let child_layer = resolve(&child.layer, &layer);
            children.push(to_node(map, by_parent, child_layer, child)?);
        }
    }

    Ok(Node {
        layer,
        path: key.path.clone(),
        stats: stats.clone(),
        children,
    })
}
