//! Compiled pattern programs for the motif engine.
//!
//! This crate contains:
//! - `captures` - capture metadata derived from a syntax tree
//! - `registers` - register-file sizing (`RegisterInfo`)
//! - `instr` - the instruction set and its typed indices
//! - `tables` - static data tables and host-closure tables
//! - `program` - the immutable program and its builder
//! - `wire` - JSON wire format (encode/decode)
//! - `dump` - human-readable program listings
//! - `cell` - lock-free publish-once slot
//! - `lazy` - compile-on-demand cache around a [`Compiler`]

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod captures;
pub mod cell;
pub mod dump;
pub mod instr;
pub mod lazy;
pub mod program;
pub mod registers;
pub mod tables;
pub mod wire;

#[cfg(test)]
mod dump_tests;
#[cfg(test)]
mod wire_tests;

// Re-export commonly used items at crate root
pub use captures::{Capture, CaptureList, CaptureShape, OptionalNesting, ReferenceId};
pub use cell::RaceCell;
pub use dump::dump;
pub use instr::{
    BitsetId, BoolReg, CaptureReg, ConsumeFnId, ElementId, Instr, InstrAddr, IntReg, MatcherFnId,
    PositionReg, SequenceId, TransformFnId,
};
pub use lazy::{CompileError, CompileOptions, Compiler, LazyProgram};
pub use program::{Program, ProgramBuilder};
pub use registers::RegisterInfo;
pub use tables::{CharBitset, ClosureKind, ClosureTables, ConsumeFn, MatcherFn, TransformFn};
pub use wire::{DecodeError, EncodeError, decode, encode};
