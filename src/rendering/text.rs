//! Indented plain-text rendering for logs
//!
//! ```text
//! [      1]   0,100MS 000us 000ns + GET /orders
//! [      1]   0,040MS 000us 000ns . + OrderService.load
//! ```

use super::{DurationParts, Renderer};
use crate::config::ProfilerConfig;
use crate::statistics::Statistics;
use crate::tree::{Node, NodeComparator};
use std::io::{self, Write};

const BEGIN_SUBTASK: &str = "----------- BEGIN SUBTASK ----------";
const END_SUBTASK: &str = "----------- END   SUBTASK ----------";

/// Layout and suppression settings of the text renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOptions {
    pub call_indentation: String,
    pub leaf_name_prefix: String,
    /// Nodes faster than this are not printed, nor is anything below them
    pub call_duration_threshold_nanos: u64,
    /// Childless nodes faster than this count as small leaves
    pub leaf_statistics_threshold_nanos: u64,
    /// Small leaves printed per parent before the rest is folded
    pub leaf_statistics_max_items: usize,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self::from(&ProfilerConfig::default())
    }
}

impl TextOptions {
    /// Print everything, no thresholds
    pub fn unfiltered() -> Self {
        Self {
            call_duration_threshold_nanos: 0,
            leaf_statistics_threshold_nanos: 0,
            leaf_statistics_max_items: usize::MAX,
            ..Self::default()
        }
    }
}

impl From<&ProfilerConfig> for TextOptions {
    fn from(config: &ProfilerConfig) -> Self {
        Self {
            call_indentation: config.call_indentation.clone(),
            leaf_name_prefix: config.leaf_name_prefix.clone(),
            call_duration_threshold_nanos: config.call_duration_threshold_nanos,
            leaf_statistics_threshold_nanos: config.leaf_statistics_threshold_nanos,
            leaf_statistics_max_items: config.leaf_statistics_max_items,
        }
    }
}

/// Small leaves seen below one parent
#[derive(Debug, Default)]
struct LeafScope {
    /// Absolute level of the children in this scope
    level: usize,
    small_leaves: usize,
    folded_nodes: usize,
    folded_calls: u64,
    folded_nanos: u64,
}

pub struct TextRenderer<W: Write> {
    out: W,
    options: TextOptions,
    /// Indentation base of each snapshot being rendered (nested for sub-tasks)
    bases: Vec<usize>,
    scopes: Vec<LeafScope>,
    /// Whether each entered path was printed (and opened a scope)
    entered: Vec<bool>,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self::with_options(out, TextOptions::default())
    }

    pub fn with_options(out: W, options: TextOptions) -> Self {
        Self {
            out,
            options,
            bases: Vec::new(),
            scopes: Vec::new(),
            entered: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn base(&self) -> usize {
        self.bases.last().copied().unwrap_or(0)
    }

    /// Level of the innermost printed path, 0 at the top
    fn current_level(&self) -> usize {
        self.scopes.last().map_or(0, |scope| scope.level.saturating_sub(1))
    }

    fn indent(&self, level: usize) -> String {
        self.options.call_indentation.repeat(level.saturating_sub(1))
    }

    fn write_line(&mut self, calls: u64, nanos: u64, level: usize, name: &str) -> io::Result<()> {
        let indent = self.indent(level);
        writeln!(
            self.out,
            "[{:>7}] {} {}{}{}",
            calls,
            format_duration(nanos),
            indent,
            self.options.leaf_name_prefix,
            name
        )
    }

    fn close_scope(&mut self) -> io::Result<()> {
        let Some(scope) = self.scopes.pop() else {
            return Ok(());
        };
        if scope.folded_nodes > 0 {
            let label = format!("... {} more", scope.folded_nodes);
            self.write_line(scope.folded_calls, scope.folded_nanos, scope.level, &label)?;
        }
        Ok(())
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn begin(&mut self, _statistics: &Statistics) -> io::Result<()> {
        let base = self.base();
        self.scopes.push(LeafScope {
            level: base + 1,
            ..LeafScope::default()
        });
        Ok(())
    }

    fn begin_path(&mut self, node: &Node) -> io::Result<bool> {
        let total = node.total_nanos();
        if total < self.options.call_duration_threshold_nanos {
            self.entered.push(false);
            return Ok(false);
        }

        // a leaf with sub-task snapshots is never folded into "... n more"
        let foldable = node.is_leaf() && node.stats().sub_statistics().is_empty();
        if foldable && total < self.options.leaf_statistics_threshold_nanos {
            let max = self.options.leaf_statistics_max_items;
            if let Some(scope) = self.scopes.last_mut() {
                scope.small_leaves += 1;
                if scope.small_leaves > max {
                    scope.folded_nodes += 1;
                    scope.folded_calls += node.stats().calls();
                    scope.folded_nanos = scope.folded_nanos.saturating_add(total);
                    self.entered.push(false);
                    return Ok(false);
                }
            }
        }

        let level = self.base() + node.path().level();
        self.write_line(node.stats().calls(), total, level, node.leaf_name())?;
        self.scopes.push(LeafScope {
            level: level + 1,
            ..LeafScope::default()
        });
        self.entered.push(true);
        Ok(true)
    }

    fn end_path(&mut self, _node: &Node) -> io::Result<()> {
        if self.entered.pop().unwrap_or(false) {
            self.close_scope()?;
        }
        Ok(())
    }

    fn begin_subtask(&mut self, sub: &Statistics) -> io::Result<()> {
        let level = self.current_level();
        let indent = self.options.call_indentation.repeat(level);
        writeln!(self.out, "{}{}", indent, BEGIN_SUBTASK)?;
        writeln!(
            self.out,
            "{}Context {} ({})",
            indent,
            sub.context_id(),
            sub.context_name()
        )?;
        self.bases.push(level);
        Ok(())
    }

    fn end_subtask(&mut self, _sub: &Statistics) -> io::Result<()> {
        self.bases.pop();
        let indent = self.options.call_indentation.repeat(self.current_level());
        writeln!(self.out, "{}{}", indent, END_SUBTASK)
    }

    fn end(&mut self, _statistics: &Statistics) -> io::Result<()> {
        self.close_scope()?;
        self.out.flush()
    }
}

/// `S,mmmMS uuuus nnnns` breakdown of a nanosecond total
pub fn format_duration(nanos: u64) -> String {
    let parts = DurationParts::from_nanos(nanos);
    format!(
        "{:>3},{:03}MS {:03}us {:03}ns",
        parts.seconds, parts.millis, parts.micros, parts.nanos
    )
}

/// Render `statistics` to a `String` with the given options
pub fn render_to_string(
    statistics: &Statistics,
    options: TextOptions,
    comparator: Option<NodeComparator>,
) -> io::Result<String> {
    let mut renderer = TextRenderer::with_options(Vec::new(), options);
    super::render(&mut renderer, statistics, comparator)?;
    Ok(String::from_utf8_lossy(&renderer.into_inner()).into_owned())
}
