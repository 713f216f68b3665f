// crates/fmtrace-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use anyhow::{Context, Result};
use clap::Parser;
use fmtrace_trace::io::write_summary_json;
use fmtrace_trace::run::{run_trace, RunConfig, DEFAULT_SEGMENT_PREFIX};
use fmtrace_trace::strings::DEFAULT_STRING_MARKER;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "fmtrace",
    about = "Rebuild segments and decode strings from a decompiler trace",
    long_about = "Rebuild segments and decode strings from a decompiler trace.\n\n\
                  Reassembled segments are written as <out-dir>/<prefix>.<n>; decoded \
                  strings are printed to stdout as `path: text`.",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Trace file, one record per line
    trace: PathBuf,

    /// Directory for segment files
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Segment file name prefix
    #[arg(long, default_value = DEFAULT_SEGMENT_PREFIX)]
    prefix: String,

    /// Reference value marking string chunks
    #[arg(long, default_value = DEFAULT_STRING_MARKER)]
    string_marker: String,

    /// Skip segment reassembly
    #[arg(long, default_value_t = false)]
    no_segments: bool,

    /// Skip string decoding
    #[arg(long, default_value_t = false)]
    no_strings: bool,

    /// Write a JSON run summary here
    #[arg(long)]
    summary: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let cfg = RunConfig {
        out_dir: cli.out_dir,
        segment_prefix: cli.prefix,
        string_marker: cli.string_marker,
        segments: !cli.no_segments,
        strings: !cli.no_strings,
        ..RunConfig::default()
    };

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let summary = run_trace(&cli.trace, &cfg, &mut out)
        .with_context(|| format!("reconstructing from {}", cli.trace.display()))?;
    out.flush()?;

    info!(
        records = summary.records,
        segments = summary.segments,
        strings = summary.strings,
        truncated_chunks = summary.truncated_chunks,
        "done"
    );

    if let Some(path) = cli.summary {
        write_summary_json(&path, &summary)
            .with_context(|| format!("writing summary to {}", path.display()))?;
    }
    Ok(())
}

/// Initialize tracing on stderr with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
