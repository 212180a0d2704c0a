//! DM (Data Matrix) code parsing and quality-grade semantics shared by the
//! printer-role and emitter-role listeners in `line-core`.
//!
//! This crate is the pure, I/O-free counterpart to `ipico_core` in the
//! rusty-timer stack: string-in, string/enum-out parsing that the TCP
//! fabric calls once per payload.

pub mod parser;
pub mod quality;

pub use parser::{ControlRequest, extract_code, finalize_code, match_control_request};
pub use quality::QualityTag;
