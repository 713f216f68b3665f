//! Opcode-driven segment reassembly.
//!
//! The assembler sees records one at a time, in file order, and is in one of
//! two modes:
//!
//! - **Idle**: no segment open.
//! - **Collecting**: keyed payload chunks are accumulating.
//!
//! Transitions by opcode class (see [`OpcodeTable`]):
//!
//! | class        | effect |
//! |--------------|--------|
//! | boundary     | sizes reset, mode → Idle; with reference `"0"` the payload announces the projected size and the path |
//! | chunk write  | store `chunks[reference] = payload`; a path change drops the projected size; mode → Collecting |
//! | pass-through | nothing |
//! | anything else| if Collecting: flush the segment, mode → Idle |
//!
//! A flush concatenates chunks ordered by the **string** order of their
//! references, so `"10"` sorts before `"2"`. Numeric references with more
//! than one digit therefore come out of numeric order; this mirrors the
//! segment files the format's own tooling produced and is kept as is.
//!
//! Chunks survive a boundary record; only a flush empties them. A segment
//! still open at end of input is never flushed (see
//! [`SegmentAssembler::finish`]).

use crate::format::TraceRecord;
use fmtrace_core::{decode_int, DecodeError};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Reference value under which a boundary record announces a size.
pub const SIZE_ANNOUNCEMENT_REF: &str = "0";

/// How each opcode drives the assembler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpcodeTable {
    /// Segment boundary marker.
    pub boundary: u16,
    /// Keyed chunk write.
    pub chunk_write: u16,
    /// Opcodes that neither open, close nor contribute to a segment.
    pub passthrough: Vec<u16>,
}

impl OpcodeTable {
    /// The opcode assignments of the decompiler's traces.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            boundary: 0x03,
            chunk_write: 0x07,
            passthrough: vec![0x20, 0x38, 0x40, 0x80],
        }
    }

    /// Class of `opcode` under this table.
    #[must_use]
    pub fn classify(&self, opcode: u16) -> OpcodeClass {
        if opcode == self.boundary {
            OpcodeClass::Boundary
        } else if opcode == self.chunk_write {
            OpcodeClass::ChunkWrite
        } else if self.passthrough.contains(&opcode) {
            OpcodeClass::PassThrough
        } else {
            OpcodeClass::Terminator
        }
    }
}

impl Default for OpcodeTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Role of an opcode in segment reassembly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpcodeClass {
    /// Resets sizes and closes collection without flushing.
    Boundary,
    /// Contributes a chunk.
    ChunkWrite,
    /// Ignored.
    PassThrough,
    /// Flushes an open segment.
    Terminator,
}

/// Assembler phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// No segment open.
    #[default]
    Idle,
    /// Chunks accumulating.
    Collecting,
}

/// A completed segment, moved out of the assembler on flush.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    /// Sequence number; the first flushed segment is 0.
    pub index: u64,
    /// Path of the last chunk write.
    pub path: String,
    /// Sum of the declared sizes of the chunk writes.
    pub current_size: u64,
    /// Announced total size (0 if none, or dropped by a path change).
    pub projected_size: u64,
    /// Distinct references concatenated.
    pub chunk_count: usize,
    /// Concatenated chunk bytes.
    pub bytes: Vec<u8>,
}

impl Segment {
    /// Whether an announced size exists and disagrees with the accumulated one.
    #[must_use]
    pub const fn size_mismatch(&self) -> bool {
        self.projected_size != 0 && self.projected_size != self.current_size
    }
}

/// What was left open when input ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unflushed {
    /// Path of the last chunk write.
    pub path: String,
    /// Chunks that will not be written.
    pub chunk_count: usize,
    /// Their accumulated declared size.
    pub current_size: u64,
}

/// Per-segment accumulator; replaced wholesale on every flush.
#[derive(Debug, Default)]
struct Accumulator {
    path: String,
    current_size: u64,
    projected_size: u64,
    chunks: BTreeMap<String, Vec<u8>>,
}

impl Accumulator {
    fn into_segment(self, index: u64) -> Segment {
        let chunk_count = self.chunks.len();
        Segment {
            index,
            path: self.path,
            current_size: self.current_size,
            projected_size: self.projected_size,
            chunk_count,
            bytes: self.chunks.into_values().flatten().collect(),
        }
    }
}

/// State machine rebuilding segments from chunk-write records.
#[derive(Debug)]
pub struct SegmentAssembler {
    opcodes: OpcodeTable,
    mode: Mode,
    acc: Accumulator,
    segment_counter: u64,
}

impl SegmentAssembler {
    /// Assembler driven by `opcodes`, starting Idle with no segments flushed.
    #[must_use]
    pub fn new(opcodes: OpcodeTable) -> Self {
        Self {
            opcodes,
            mode: Mode::Idle,
            acc: Accumulator::default(),
            segment_counter: 0,
        }
    }

    /// Assembler over [`OpcodeTable::standard`].
    #[must_use]
    pub fn standard() -> Self {
        Self::new(OpcodeTable::standard())
    }

    /// Current phase.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Path of the open segment (empty when none).
    #[must_use]
    pub fn current_path(&self) -> &str {
        &self.acc.path
    }

    /// Declared bytes accumulated so far.
    #[must_use]
    pub const fn current_size(&self) -> u64 {
        self.acc.current_size
    }

    /// Announced size of the open segment.
    #[must_use]
    pub const fn projected_size(&self) -> u64 {
        self.acc.projected_size
    }

    /// Chunks held for the open segment.
    #[must_use]
    pub fn pending_chunks(&self) -> usize {
        self.acc.chunks.len()
    }

    /// Segments flushed so far; also the index of the next one.
    #[must_use]
    pub const fn segments_flushed(&self) -> u64 {
        self.segment_counter
    }

    /// Advance by one record, returning the segment it closed, if any.
    ///
    /// # Errors
    /// [`DecodeError`] if a size announcement carries a payload of unsupported length.
    pub fn feed(&mut self, rec: &TraceRecord) -> Result<Option<Segment>, DecodeError> {
        match self.opcodes.classify(rec.opcode) {
            OpcodeClass::Boundary => {
                self.boundary(rec)?;
                Ok(None)
            }
            OpcodeClass::ChunkWrite => {
                self.chunk_write(rec);
                Ok(None)
            }
            OpcodeClass::PassThrough => Ok(None),
            OpcodeClass::Terminator => Ok(self.flush()),
        }
    }

    /// End of input. Returns the segment left open, which is not flushed.
    #[must_use]
    pub fn finish(self) -> Option<Unflushed> {
        match self.mode {
            Mode::Idle => None,
            Mode::Collecting => Some(Unflushed {
                path: self.acc.path,
                chunk_count: self.acc.chunks.len(),
                current_size: self.acc.current_size,
            }),
        }
    }

    fn boundary(&mut self, rec: &TraceRecord) -> Result<(), DecodeError> {
        if self.mode == Mode::Collecting {
            debug!(
                path = %self.acc.path,
                chunks = self.acc.chunks.len(),
                "boundary inside open segment; chunks kept"
            );
        }
        self.acc.current_size = 0;
        self.acc.projected_size = 0;
        self.mode = Mode::Idle;

        if rec.reference == SIZE_ANNOUNCEMENT_REF {
            self.acc.projected_size = u64::from(decode_int(&rec.payload_bytes)?);
            self.acc.path.clone_from(&rec.path);
            debug!(path = %rec.path, projected = self.acc.projected_size, "size announced");
        }
        Ok(())
    }

    fn chunk_write(&mut self, rec: &TraceRecord) {
        if rec.path != self.acc.path {
            if self.acc.projected_size != 0 {
                warn!(
                    from = %self.acc.path,
                    to = %rec.path,
                    projected = self.acc.projected_size,
                    "path changed; announced size dropped"
                );
            }
            self.acc.projected_size = 0;
            self.acc.path.clone_from(&rec.path);
        }
        self.acc
            .chunks
            .insert(rec.reference.clone(), rec.payload_bytes.clone());
        self.acc.current_size = self.acc.current_size.saturating_add(rec.declared_size);
        self.mode = Mode::Collecting;
    }

    fn flush(&mut self) -> Option<Segment> {
        if self.mode == Mode::Idle {
            return None;
        }
        let index = self.segment_counter;
        self.segment_counter += 1;
        self.mode = Mode::Idle;
        Some(std::mem::take(&mut self.acc).into_segment(index))
    }
}

impl Default for SegmentAssembler {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(path: &str, opcode: u16, reference: &str, bytes: &[u8], size: u64) -> TraceRecord {
        TraceRecord::new(path, opcode, reference, bytes.to_vec(), size)
    }

    #[test]
    fn classifies_standard_opcodes() {
        let t = OpcodeTable::standard();
        assert_eq!(t.classify(0x03), OpcodeClass::Boundary);
        assert_eq!(t.classify(0x07), OpcodeClass::ChunkWrite);
        for op in [0x20, 0x38, 0x40, 0x80] {
            assert_eq!(t.classify(op), OpcodeClass::PassThrough);
        }
        assert_eq!(t.classify(0x01), OpcodeClass::Terminator);
        assert_eq!(t.classify(0x100), OpcodeClass::Terminator);
    }

    #[test]
    fn flushes_in_string_order_of_references() {
        let mut a = SegmentAssembler::standard();
        assert!(a.feed(&rec("p", 0x03, "0", &[0, 4], 2)).unwrap().is_none());
        assert_eq!(a.projected_size(), 4);
        assert!(a.feed(&rec("p", 0x07, "2", &[0x41, 0x42], 2)).unwrap().is_none());
        assert!(a.feed(&rec("p", 0x07, "10", &[0x43, 0x44], 2)).unwrap().is_none());
        assert_eq!(a.mode(), Mode::Collecting);

        let seg = a.feed(&rec("p", 0x01, "x", &[], 0)).unwrap().unwrap();
        assert_eq!(seg.index, 0);
        assert_eq!(seg.bytes, vec![0x43, 0x44, 0x41, 0x42]);
        assert_eq!(seg.current_size, 4);
        assert_eq!(seg.projected_size, 4);
        assert_eq!(seg.chunk_count, 2);
        assert!(!seg.size_mismatch());

        assert_eq!(a.mode(), Mode::Idle);
        assert_eq!(a.current_path(), "");
        assert_eq!(a.current_size(), 0);
        assert_eq!(a.pending_chunks(), 0);
        assert_eq!(a.segments_flushed(), 1);
    }

    #[test]
    fn last_write_for_a_reference_wins() {
        let mut a = SegmentAssembler::standard();
        a.feed(&rec("p", 0x07, "1", &[1], 1)).unwrap();
        a.feed(&rec("p", 0x07, "1", &[2], 1)).unwrap();
        let seg = a.feed(&rec("p", 0x05, "", &[], 0)).unwrap().unwrap();
        assert_eq!(seg.bytes, vec![2]);
        assert_eq!(seg.current_size, 2);
    }

    #[test]
    fn passthrough_and_idle_terminators_do_nothing() {
        let mut a = SegmentAssembler::standard();
        assert!(a.feed(&rec("p", 0x01, "", &[], 0)).unwrap().is_none());
        a.feed(&rec("p", 0x07, "1", &[1], 1)).unwrap();
        for op in [0x20, 0x38, 0x40, 0x80] {
            assert!(a.feed(&rec("q", op, "1", &[9], 9)).unwrap().is_none());
        }
        assert_eq!(a.mode(), Mode::Collecting);
        assert_eq!(a.current_size(), 1);
        assert_eq!(a.current_path(), "p");
    }

    #[test]
    fn path_change_drops_projected_size() {
        let mut a = SegmentAssembler::standard();
        a.feed(&rec("p", 0x03, "0", &[0, 0, 0, 8], 4)).unwrap();
        a.feed(&rec("p", 0x07, "1", &[1], 1)).unwrap();
        assert_eq!(a.projected_size(), 8);
        a.feed(&rec("q", 0x07, "2", &[2], 1)).unwrap();
        assert_eq!(a.projected_size(), 0);
        assert_eq!(a.mode(), Mode::Collecting);
        assert_eq!(a.current_path(), "q");
        let seg = a.feed(&rec("q", 0x02, "", &[], 0)).unwrap().unwrap();
        assert_eq!(seg.bytes, vec![1, 2]);
    }

    #[test]
    fn boundary_without_announcement_keeps_path_and_chunks() {
        let mut a = SegmentAssembler::standard();
        a.feed(&rec("p", 0x07, "1", &[1], 1)).unwrap();
        a.feed(&rec("other", 0x03, "5", &[1, 2, 3], 3)).unwrap();
        assert_eq!(a.mode(), Mode::Idle);
        assert_eq!(a.current_size(), 0);
        assert_eq!(a.current_path(), "p");
        assert_eq!(a.pending_chunks(), 1);
        // Idle: a terminator does not flush.
        assert!(a.feed(&rec("p", 0x01, "", &[], 0)).unwrap().is_none());
        a.feed(&rec("p", 0x07, "2", &[2], 1)).unwrap();
        let seg = a.feed(&rec("p", 0x01, "", &[], 0)).unwrap().unwrap();
        assert_eq!(seg.bytes, vec![1, 2]);
        assert_eq!(seg.current_size, 1);
    }

    #[test]
    fn announcement_with_bad_length_fails() {
        let mut a = SegmentAssembler::standard();
        assert_eq!(
            a.feed(&rec("p", 0x03, "0", &[1, 2, 3], 3)),
            Err(DecodeError::UnsupportedLength(3))
        );
    }

    #[test]
    fn finish_reports_open_segment() {
        let mut a = SegmentAssembler::standard();
        a.feed(&rec("p", 0x07, "1", &[1, 2], 2)).unwrap();
        assert_eq!(
            a.finish(),
            Some(Unflushed {
                path: "p".into(),
                chunk_count: 1,
                current_size: 2
            })
        );
        assert_eq!(SegmentAssembler::standard().finish(), None);
    }

    #[test]
    fn custom_opcode_table() {
        let table = OpcodeTable {
            boundary: 0x10,
            chunk_write: 0x11,
            passthrough: vec![0x07],
        };
        let mut a = SegmentAssembler::new(table);
        a.feed(&rec("p", 0x11, "a", &[5], 1)).unwrap();
        assert!(a.feed(&rec("p", 0x07, "b", &[6], 1)).unwrap().is_none());
        let seg = a.feed(&rec("p", 0x03, "", &[], 0)).unwrap().unwrap();
        assert_eq!(seg.bytes, vec![5]);
    }
}
