//! Rendering of statistics snapshots
//!
//! [`render`] walks a snapshot depth-first and drives a [`Renderer`]
//! (pre/post visitor). Foreign snapshots attached to a node are rendered as
//! nested sub-task blocks right after the node itself and before its
//! children. Snapshots from the same context as the one being rendered are
//! skipped there: their calls are already part of the local tree.
//!
//! Two renderers ship with the crate: [`text::TextRenderer`] for log output
//! and [`xml::XmlRenderer`] for tag-based output. [`json`] exports the whole
//! snapshot for tooling.

pub mod json;
pub mod text;
pub mod xml;

use crate::statistics::Statistics;
use crate::tree::{Node, NodeComparator};
use std::io;

/// Visitor callbacks invoked by [`render`]
///
/// Every method has a no-op default so renderers only implement what they
/// need.
pub trait Renderer {
    fn begin(&mut self, _statistics: &Statistics) -> io::Result<()> {
        Ok(())
    }

    /// Return `false` to skip this node's sub-tasks and children;
    /// `end_path` is still called.
    fn begin_path(&mut self, _node: &Node) -> io::Result<bool> {
        Ok(true)
    }

    fn end_path(&mut self, _node: &Node) -> io::Result<()> {
        Ok(())
    }

    fn begin_subtasks(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn begin_subtask(&mut self, _sub: &Statistics) -> io::Result<()> {
        Ok(())
    }

    fn end_subtask(&mut self, _sub: &Statistics) -> io::Result<()> {
        Ok(())
    }

    fn end_subtasks(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn end(&mut self, _statistics: &Statistics) -> io::Result<()> {
        Ok(())
    }
}

/// Walk `statistics` and drive `renderer`
///
/// Siblings are visited in discovery order unless `comparator` is given, in
/// which case they are stably sorted with it first.
///
/// # Errors
/// Whatever the renderer's output fails with; nothing is retried.
pub fn render<R: Renderer + ?Sized>(
    renderer: &mut R,
    statistics: &Statistics,
    comparator: Option<NodeComparator>,
) -> io::Result<()> {
    renderer.begin(statistics)?;
    for node in sorted(statistics.roots(), comparator) {
        render_node(renderer, statistics, comparator, node)?;
    }
    renderer.end(statistics)
}

fn render_node<R: Renderer + ?Sized>(
    renderer: &mut R,
    statistics: &Statistics,
    comparator: Option<NodeComparator>,
    node: &Node,
) -> io::Result<()> {
    if renderer.begin_path(node)? {
        let foreign: Vec<&Statistics> = node
            .stats()
            .sub_statistics()
            .iter()
            .filter(|sub| sub.context_id() != statistics.context_id())
            .collect();

        if !foreign.is_empty() {
            renderer.begin_subtasks()?;
            for sub in foreign {
                renderer.begin_subtask(sub)?;
                render(renderer, sub, comparator)?;
                renderer.end_subtask(sub)?;
            }
            renderer.end_subtasks()?;
        }

        for child in sorted(node.children(), comparator) {
            render_node(renderer, statistics, comparator, child)?;
        }
    }
    renderer.end_path(node)
}

fn sorted(nodes: &[Node], comparator: Option<NodeComparator>) -> Vec<&Node> {
    let mut nodes: Vec<&Node> = nodes.iter().collect();
    if let Some(cmp) = comparator {
        nodes.sort_by(|a, b| cmp(a, b));
    }
    nodes
}

/// A nanosecond total split into display units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationParts {
    pub seconds: u64,
    pub millis: u64,
    pub micros: u64,
    pub nanos: u64,
}

impl DurationParts {
    pub fn from_nanos(total: u64) -> Self {
        Self {
            seconds: total / 1_000_000_000,
            millis: total % 1_000_000_000 / 1_000_000,
            micros: total % 1_000_000 / 1_000,
            nanos: total % 1_000,
        }
    }
}
