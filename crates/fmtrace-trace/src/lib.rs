//! Decompiler trace records and the passes that run over them.
//!
//! A trace is a text file with one opcode execution per line. This crate
//! turns it back into data:
//!
//! - `format`: the record schema and the single validating line parser.
//! - `io`: a streaming line reader and the segment file writer.
//! - `assemble`: the opcode-driven state machine that rebuilds segments.
//! - `strings`: selection and decryption of string chunks.
//! - `run`: one sequential pass feeding both consumers.
//!
//! As in the rest of the workspace there are no broad re-exports; callers use
//! module paths such as `fmtrace_trace::assemble::SegmentAssembler`.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

/// Opcode-driven segment reassembly.
pub mod assemble;
/// Trace record schema and line parser.
pub mod format;
/// Streaming trace reader and segment writer.
pub mod io;
/// Sequential pass over a trace file.
pub mod run;
/// String chunk extraction.
pub mod strings;
