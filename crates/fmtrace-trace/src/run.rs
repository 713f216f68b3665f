//! One sequential pass over a trace.
//!
//! Records are read lazily and handed, in file order, to the
//! [`SegmentAssembler`] (segments are written the moment they close) and to
//! the [`StringExtractor`] (decoded strings go to the caller's writer as
//! `path: text` lines). The first error of any kind ends the run.

use crate::assemble::{OpcodeTable, SegmentAssembler};
use crate::format::ParsedLine;
use crate::io::{open_trace, write_segment, TraceLines};
use crate::strings::{StringExtractor, DEFAULT_STRING_MARKER};
use anyhow::{Context, Result};
use fmtrace_core::StringCipher;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{info, trace, warn};

/// Default prefix of segment files.
pub const DEFAULT_SEGMENT_PREFIX: &str = "segment";

/// Knobs for a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    /// Directory receiving segment files.
    pub out_dir: PathBuf,
    /// Segment files are named `<prefix>.<index>`.
    pub segment_prefix: String,
    /// Reference value selecting string chunks.
    pub string_marker: String,
    /// Reassemble and write segments.
    pub segments: bool,
    /// Decode string chunks.
    pub strings: bool,
    /// Opcode roles driving segment reassembly.
    pub opcodes: OpcodeTable,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("."),
            segment_prefix: DEFAULT_SEGMENT_PREFIX.to_owned(),
            string_marker: DEFAULT_STRING_MARKER.to_owned(),
            segments: true,
            strings: true,
            opcodes: OpcodeTable::standard(),
        }
    }
}

/// Counters reported at the end of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Data records processed.
    pub records: u64,
    /// Header lines skipped.
    pub skipped: u64,
    /// Segment files written.
    pub segments: u64,
    /// Strings decoded.
    pub strings: u64,
    /// Chunks of a segment still open at end of input (not written).
    pub truncated_chunks: usize,
}

/// Run over the trace file at `path`, writing decoded strings to `out`.
pub fn run_trace<P: AsRef<Path>, W: Write>(
    path: P,
    cfg: &RunConfig,
    out: &mut W,
) -> Result<RunSummary> {
    let path = path.as_ref();
    info!(trace = %path.display(), out_dir = %cfg.out_dir.display(), "processing trace");
    let lines = open_trace(path)?;
    run_lines(lines, cfg, out).with_context(|| format!("processing {}", path.display()))
}

/// Run over an already-open line stream.
pub fn run_lines<R: BufRead, W: Write>(
    lines: TraceLines<R>,
    cfg: &RunConfig,
    out: &mut W,
) -> Result<RunSummary> {
    let mut assembler = SegmentAssembler::new(cfg.opcodes.clone());
    let extractor = StringExtractor::new(StringCipher::standard(), cfg.string_marker.clone());
    let mut summary = RunSummary::default();

    for item in lines {
        let (line_no, parsed) = item?;
        let rec = match parsed {
            ParsedLine::Skip => {
                summary.skipped += 1;
                continue;
            }
            ParsedLine::Record(rec) => rec,
        };
        summary.records += 1;
        trace!(line_no, opcode = rec.opcode, reference = %rec.reference, "record");

        if cfg.segments {
            let closed = assembler
                .feed(&rec)
                .with_context(|| format!("size announcement on line {line_no}"))?;
            if let Some(seg) = closed {
                let file = write_segment(&cfg.out_dir, &cfg.segment_prefix, &seg)?;
                if seg.size_mismatch() {
                    warn!(
                        index = seg.index,
                        size = seg.current_size,
                        projected = seg.projected_size,
                        "segment size differs from announcement"
                    );
                }
                info!(
                    index = seg.index,
                    path = %seg.path,
                    size = seg.current_size,
                    projected = seg.projected_size,
                    chunks = seg.chunk_count,
                    bytes = seg.bytes.len(),
                    file = %file.display(),
                    "segment written"
                );
                summary.segments += 1;
            }
        }

        if cfg.strings {
            if let Some(decoded) = extractor.extract(&rec) {
                writeln!(out, "{decoded}").context("write decoded string")?;
                summary.strings += 1;
            }
        }
    }

    if let Some(open) = assembler.finish() {
        warn!(
            path = %open.path,
            chunks = open.chunk_count,
            size = open.current_size,
            "input ended inside a segment; trailing segment not written"
        );
        summary.truncated_chunks = open.chunk_count;
    }
    out.flush().context("flush decoded strings")?;
    Ok(summary)
}
