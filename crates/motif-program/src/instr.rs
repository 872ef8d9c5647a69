//! Instruction model: index newtypes and the instruction enum.
//!
//! Every index is dense and meaningful only within the program that
//! assigned it. Addresses are instruction positions, not byte offsets.

use std::fmt;

use motif_syntax::Assertion;
use serde::{Deserialize, Serialize};

macro_rules! index_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[repr(transparent)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

index_type! {
    /// Position of an instruction within a program's stream.
    InstrAddr
}
index_type! {
    /// Slot in the static element table.
    ElementId
}
index_type! {
    /// Slot in the static sequence table.
    SequenceId
}
index_type! {
    /// Slot in the static bitset table.
    BitsetId
}
index_type! {
    /// Slot in the consume-function table.
    ConsumeFnId
}
index_type! {
    /// Slot in the transform-function table.
    TransformFnId
}
index_type! {
    /// Slot in the matcher-function table.
    MatcherFnId
}
index_type! {
    /// Capture register; equals the capture's list position.
    CaptureReg
}
index_type! {
    /// Integer register, loop counters and the like.
    IntReg
}
index_type! {
    /// Boolean register.
    BoolReg
}
index_type! {
    /// Input-position register.
    PositionReg
}

impl fmt::Display for InstrAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// One step of a compiled program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Instr {
    /// Match one constant scalar from the element table.
    MatchElement { element: ElementId },
    /// Match a constant string from the sequence table.
    MatchSequence { sequence: SequenceId },
    /// Match one scalar against a class bitset.
    MatchBitset { bitset: BitsetId },
    /// Hand the current position to a registered consume function.
    ConsumeBy { fun: ConsumeFnId },
    /// Hand the current position to a registered matcher; bind its value
    /// to `capture`.
    MatchBy { fun: MatcherFnId, capture: CaptureReg },
    /// Zero-width test on the current position.
    Assert { assertion: Assertion },
    /// Advance the current position by a fixed number of scalars.
    Advance { by: u32 },
    /// Unconditional jump.
    Branch { to: InstrAddr },
    /// Loop header: jump to `to` when the counter is zero, otherwise
    /// decrement it and fall through.
    BranchIfZeroElseDecrement { register: IntReg, to: InstrAddr },
    MoveImmediate { value: i64, into: IntReg },
    MoveBoolean { value: bool, into: BoolReg },
    MoveCurrentPosition { into: PositionReg },
    /// Push a save point resuming at `to` with the position restored.
    Save { to: InstrAddr },
    /// Push a save point resuming at `to` without restoring the position.
    SaveAddress { to: InstrAddr },
    /// Discard the most recent save point.
    ClearSavePoint,
    BeginCapture { capture: CaptureReg },
    EndCapture { capture: CaptureReg },
    /// Rewrite a finished capture through a registered transform.
    TransformCapture { capture: CaptureReg, fun: TransformFnId },
    /// Match the text a finished capture currently holds.
    Backreference { capture: CaptureReg },
    /// Whole match succeeded.
    Accept,
    /// Dead end; backtrack to the most recent save point.
    Fail,
}

impl Instr {
    /// Embedded jump target, for instruction kinds carrying one.
    pub fn jump_target(&self) -> Option<InstrAddr> {
        match self {
            Instr::Branch { to }
            | Instr::BranchIfZeroElseDecrement { to, .. }
            | Instr::Save { to }
            | Instr::SaveAddress { to } => Some(*to),
            _ => None,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instr::MatchElement { .. } => "match-element",
            Instr::MatchSequence { .. } => "match-sequence",
            Instr::MatchBitset { .. } => "match-bitset",
            Instr::ConsumeBy { .. } => "consume-by",
            Instr::MatchBy { .. } => "match-by",
            Instr::Assert { .. } => "assert",
            Instr::Advance { .. } => "advance",
            Instr::Branch { .. } => "branch",
            Instr::BranchIfZeroElseDecrement { .. } => "branch-zero-dec",
            Instr::MoveImmediate { .. } => "move-imm",
            Instr::MoveBoolean { .. } => "move-bool",
            Instr::MoveCurrentPosition { .. } => "move-pos",
            Instr::Save { .. } => "save",
            Instr::SaveAddress { .. } => "save-addr",
            Instr::ClearSavePoint => "clear-save",
            Instr::BeginCapture { .. } => "begin-capture",
            Instr::EndCapture { .. } => "end-capture",
            Instr::TransformCapture { .. } => "transform-capture",
            Instr::Backreference { .. } => "backref",
            Instr::Accept => "accept",
            Instr::Fail => "fail",
        }
    }
}
