//! Tag-based rendering, one `<measure>` element per path

use super::{DurationParts, Renderer};
use crate::statistics::Statistics;
use crate::tree::{Node, NodeComparator};
use std::io::{self, Write};

pub struct XmlRenderer<W: Write> {
    out: W,
    /// Element depth, including enclosing sub-task wrappers
    depth: usize,
}

impl<W: Write> XmlRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, depth: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn indent(&self) -> String {
        "  ".repeat(self.depth)
    }
}

impl<W: Write> Renderer for XmlRenderer<W> {
    fn begin_path(&mut self, node: &Node) -> io::Result<bool> {
        let stats = node.stats();
        let parts = DurationParts::from_nanos(stats.total_nanos());
        let indent = self.indent();
        writeln!(
            self.out,
            "{}<measure name=\"{}\" calls=\"{}\" seconds=\"{}\" millis=\"{}\" micros=\"{}\" nanos=\"{}\">",
            indent,
            escape_attr(node.leaf_name()),
            stats.calls(),
            parts.seconds,
            parts.millis,
            parts.micros,
            parts.nanos
        )?;
        self.depth += 1;
        Ok(true)
    }

    fn end_path(&mut self, _node: &Node) -> io::Result<()> {
        self.depth = self.depth.saturating_sub(1);
        let indent = self.indent();
        writeln!(self.out, "{}</measure>", indent)
    }

    fn begin_subtasks(&mut self) -> io::Result<()> {
        let indent = self.indent();
        writeln!(self.out, "{}<subtasks>", indent)?;
        self.depth += 1;
        Ok(())
    }

    fn begin_subtask(&mut self, sub: &Statistics) -> io::Result<()> {
        let indent = self.indent();
        writeln!(
            self.out,
            "{}<subtask context-id=\"{}\" context-name=\"{}\">",
            indent,
            sub.context_id(),
            escape_attr(sub.context_name())
        )?;
        self.depth += 1;
        Ok(())
    }

    fn end_subtask(&mut self, _sub: &Statistics) -> io::Result<()> {
        self.depth = self.depth.saturating_sub(1);
        let indent = self.indent();
        writeln!(self.out, "{}</subtask>", indent)
    }

    fn end_subtasks(&mut self) -> io::Result<()> {
        self.depth = self.depth.saturating_sub(1);
        let indent = self.indent();
        writeln!(self.out, "{}</subtasks>", indent)
    }

    fn end(&mut self, _statistics: &Statistics) -> io::Result<()> {
        self.out.flush()
    }
}

fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

pub fn render_to_string(statistics: &Statistics, comparator: Option<NodeComparator>) -> io::Result<String> {
    let mut renderer = XmlRenderer::new(Vec::new());
    super::render(&mut renderer, statistics, comparator)?;
    Ok(String::from_utf8_lossy(&renderer.into_inner()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
        assert_eq!(escape_attr("plain"), "plain");
    }
}
