//! Streaming trace reader and segment file writer.
//!
//! - **Reader**: an iterator that owns its buffered reader and yields one
//!   parsed line at a time with its 1-based line number, so a malformed line
//!   surfaces as `Err` naming the line.
//! - **Writer**: each segment goes to its own file, opened, written, flushed
//!   and closed before the next one.
//! - **Summary**: the end-of-run counters as pretty JSON.

use crate::assemble::Segment;
use crate::format::{parse_line, ParsedLine};
use crate::run::RunSummary;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Owning line iterator over a trace.
pub struct TraceLines<R> {
    rdr: R,
    buf: String,
    line_no: usize,
}

impl<R: BufRead> TraceLines<R> {
    /// Wrap an already-buffered reader.
    pub fn new(rdr: R) -> Self {
        Self {
            rdr,
            buf: String::with_capacity(1 << 10),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for TraceLines<R> {
    type Item = Result<(usize, ParsedLine)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.rdr.read_line(&mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                self.line_no += 1;
                let line_no = self.line_no;
                let parsed = parse_line(&self.buf)
                    .with_context(|| format!("parse trace line {line_no}"))
                    .map(|p| (line_no, p));
                Some(parsed)
            }
            Err(e) => Some(Err(e).with_context(|| format!("read line {}", self.line_no + 1))),
        }
    }
}

/// Open `path` for streaming.
pub fn open_trace<P: AsRef<Path>>(path: P) -> Result<TraceLines<BufReader<File>>> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    Ok(TraceLines::new(BufReader::new(f)))
}

/// File name of segment `index`: `<dir>/<prefix>.<index>`.
#[must_use]
pub fn segment_path(dir: &Path, prefix: &str, index: u64) -> PathBuf {
    dir.join(format!("{prefix}.{index}"))
}

/// Write one segment's bytes to its own file and return the path.
pub fn write_segment(dir: &Path, prefix: &str, segment: &Segment) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let path = segment_path(dir, prefix, segment.index);
    let f = File::create(&path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    w.write_all(&segment.bytes)
        .with_context(|| format!("write {}", path.display()))?;
    w.flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(path)
}

/// Write the run summary as pretty JSON, creating parent directories.
pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<()> {
    if let Some(dir) = path.parent() {
        ensure_dir(dir)?;
    }
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, summary).context("serialize run summary")?;
    w.write_all(b"\n").context("write newline")?;
    w.flush().context("flush summary writer")?;
    Ok(())
}

/// Create `dir` if it does not exist (no-op for the empty path).
fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.as_os_str().is_empty() {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
    }
    Ok(())
}
