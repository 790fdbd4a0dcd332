//! JSON export of whole snapshots
//!
//! Unlike the visitor-based renderers this keeps every node, including the
//! ones text output would suppress, so a dump can be re-rendered later with
//! different thresholds.

use crate::error::Result;
use crate::statistics::Statistics;
use std::io::Write;

pub fn to_json_string(statistics: &Statistics) -> Result<String> {
    Ok(serde_json::to_string_pretty(statistics)?)
}

pub fn write_json<W: Write>(statistics: &Statistics, out: W) -> Result<()> {
    serde_json::to_writer_pretty(out, statistics)?;
    Ok(())
}

/// Read a snapshot back; layer names are re-interned
pub fn from_json_str(input: &str) -> Result<Statistics> {
    Ok(serde_json::from_str(input)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ProfilerContext;
    use crate::layer::Layer;
    use crate::path::TimerPath;

    #[test]
    fn test_dump_keeps_layers_and_sub_statistics() {
        let mut worker = ProfilerContext::new("worker-1");
        worker.begin("index", 0);
        worker.end("index", 30).unwrap();

        let mut ctx = ProfilerContext::new("main");
        ctx.begin_in(Layer::business(), "search", 0);
        ctx.begin("fanout", 5);
        ctx.end_with_statistics("fanout", 50, Some(worker.statistics().unwrap()))
            .unwrap();
        ctx.end_in(&Layer::business(), "search", 80).unwrap();
        let stats = ctx.statistics().unwrap();

        let json = to_json_string(&stats).unwrap();
        assert!(json.contains("\"business\""));
        assert!(json.contains("worker-1"));

        let back = from_json_str(&json).unwrap();
        let fanout = back.find(&TimerPath::new(["search", "fanout"])).unwrap();
        assert_eq!(fanout.layer(), &Layer::business());
        assert_eq!(fanout.stats().sub_statistics()[0].total_nanos(), 30);
        assert_eq!(back.total_nanos(), 80);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(from_json_str("{ not json").is_err());
    }
}
