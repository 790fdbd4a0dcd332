//! Per-context stack of open timers
//!
//! Timers must nest strictly: `pop` expects the (layer, name) that is
//! currently on top. Timestamps are supplied by the caller in nanoseconds.

use crate::error::{ProfilerError, Result};
use crate::layer::Layer;
use crate::path::TimerPath;
use std::fmt;

/// One open measurement
#[derive(Debug, Clone)]
pub struct Frame {
    layer: Layer,
    name: String,
    start_nanos: u64,
}

impl Frame {
    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_nanos(&self) -> u64 {
        self.start_nanos
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.layer)
    }
}

/// A measurement that was just closed by `TimerStack::pop`
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTimer {
    /// Layer of the frame that was on top
    pub layer: Layer,
    /// All open names, root to the closed frame inclusive
    pub path: TimerPath,
    pub duration_nanos: u64,
}

#[derive(Debug, Default)]
pub struct TimerStack {
    frames: Vec<Frame>,
}

impl TimerStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, layer: Layer, name: impl Into<String>, start_nanos: u64) {
        self.frames.push(Frame {
            layer,
            name: name.into(),
            start_nanos,
        });
    }

    /// Close the top frame
    ///
    /// Returns `None` when nothing is open. Otherwise the top frame is always
    /// removed and returned, measured under its own layer and path, together
    /// with the nesting check: a (layer, name) that does not match the top
    /// frame is a caller bug reported as `StackMismatch` naming both frames.
    pub fn pop(
        &mut self,
        layer: &Layer,
        name: &str,
        end_nanos: u64,
    ) -> Option<(ClosedTimer, Result<()>)> {
        let top = self.frames.last()?;

        let nesting = if top.layer != *layer || top.name != name {
            Err(ProfilerError::StackMismatch {
                expected: format!("{}[{}]", name, layer),
                actual: top.to_string(),
            })
        } else {
            Ok(())
        };

        let closed = ClosedTimer {
            layer: top.layer.clone(),
            path: self.current_path(),
            duration_nanos: end_nanos.saturating_sub(top.start_nanos),
        };
        self.frames.pop();
        Some((closed, nesting))
    }

    /// Path made of every open frame's name, bottom of the stack first
    pub fn current_path(&self) -> TimerPath {
        TimerPath::new(self.frames.iter().map(|f| f.name.as_str()))
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl fmt::Display for TimerStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frames: Vec<String> = self.frames.iter().map(Frame::to_string).collect();
        write!(f, "[{}]", frames.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_computes_duration_and_path() {
        let mut stack = TimerStack::new();
        stack.push(Layer::inherit(), "A", 0);
        stack.push(Layer::inherit(), "B", 10);

        let (closed, nesting) = stack.pop(&Layer::inherit(), "B", 50).unwrap();
        assert!(nesting.is_ok());
        assert_eq!(closed.duration_nanos, 40);
        assert_eq!(closed.path, TimerPath::new(["A", "B"]));
        assert_eq!(stack.depth(), 1);

        let (closed, _) = stack.pop(&Layer::inherit(), "A", 100).unwrap();
        assert_eq!(closed.duration_nanos, 100);
        assert_eq!(closed.path, TimerPath::new(["A"]));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_pop_on_empty_stack_is_noop() {
        let mut stack = TimerStack::new();
        assert!(stack.pop(&Layer::inherit(), "nothing", 5).is_none());
    }

    #[test]
    fn test_mismatched_name_reports_both_frames() {
        let mut stack = TimerStack::new();
        stack.push(Layer::business(), "load", 0);

        stack.push(Layer::inherit(), "read", 2);

        let (closed, nesting) = stack.pop(&Layer::business(), "save", 10).unwrap();
        assert_eq!(closed.path, TimerPath::new(["load", "read"]));
        assert_eq!(closed.layer, Layer::inherit());
        assert_eq!(closed.duration_nanos, 8);
        match nesting.unwrap_err() {
            ProfilerError::StackMismatch { expected, actual } => {
                assert_eq!(expected, "save[business]");
                assert_eq!(actual, "read[__inherit]");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_mismatched_layer_is_rejected() {
        let mut stack = TimerStack::new();
        stack.push(Layer::business(), "load", 0);
        let (_, nesting) = stack.pop(&Layer::integration(), "load", 10).unwrap();
        assert!(nesting.is_err());
    }

    #[test]
    fn test_end_before_start_saturates_to_zero() {
        let mut stack = TimerStack::new();
        stack.push(Layer::inherit(), "skewed", 100);
        let (closed, _) = stack.pop(&Layer::inherit(), "skewed", 90).unwrap();
        assert_eq!(closed.duration_nanos, 0);
    }

    #[test]
    fn test_display_lists_frames() {
        let mut stack = TimerStack::new();
        stack.push(Layer::business(), "a", 0);
        stack.push(Layer::integration(), "b", 0);
        assert_eq!(stack.to_string(), "[a[business], b[integration]]");
        stack.clear();
        assert_eq!(stack.to_string(), "[]");
    }
}
