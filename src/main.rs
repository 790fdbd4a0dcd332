use anyhow::{Context, Result};
use clap::Parser;
use ctprofiler::cli::{Cli, OutputFormat};
use ctprofiler::config::ProfilerConfig;
use ctprofiler::rendering::text::{TextOptions, TextRenderer};
use ctprofiler::rendering::xml::XmlRenderer;
use ctprofiler::rendering::{self, json};
use ctprofiler::statistics::Statistics;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn read_snapshot(path: &Path) -> Result<Statistics> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read snapshot from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?
    };
    json::from_json_str(&content)
        .with_context(|| format!("Invalid snapshot: {}", path.display()))
}

fn write_snapshot(
    statistics: &Statistics,
    format: OutputFormat,
    config: &ProfilerConfig,
    out: &mut dyn Write,
) -> Result<()> {
    let comparator = config.ordering.comparator();
    match format {
        OutputFormat::Text => {
            let mut renderer = TextRenderer::with_options(out, TextOptions::from(config));
            rendering::render(&mut renderer, statistics, comparator)?;
        }
        OutputFormat::Xml => {
            let mut renderer = XmlRenderer::new(out);
            rendering::render(&mut renderer, statistics, comparator)?;
        }
        OutputFormat::Json => {
            json::write_json(statistics, &mut *out)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = args.resolve_config()?;
    let statistics = read_snapshot(&args.snapshot)?;
    tracing::debug!(
        "rendering context {} ({}) with {} root calls",
        statistics.context_id(),
        statistics.context_name(),
        statistics.roots().len()
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_snapshot(&statistics, args.format, &config, &mut out)?;

    Ok(())
}
