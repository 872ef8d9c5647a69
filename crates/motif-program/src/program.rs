//! The compiled program and its builder.
//!
//! A [`Program`] is immutable once built. The only ways to obtain one are
//! [`ProgramBuilder::finish`], which validates, and wire decode, which
//! defers validation to first use. The function tables are the one part
//! with a second lifecycle stage: decode installs placeholders and the
//! host swaps in real closures through the attach methods.

use std::collections::HashMap;

use indexmap::IndexMap;
use motif_syntax::MatchOptions;

use crate::captures::{CaptureList, CaptureShape, ReferenceId};
use crate::instr::{
    BitsetId, BoolReg, ConsumeFnId, ElementId, Instr, InstrAddr, IntReg, MatcherFnId, PositionReg,
    SequenceId, TransformFnId,
};
use crate::registers::RegisterInfo;
use crate::tables::{CharBitset, ClosureKind, ClosureTables, ConsumeFn, MatcherFn, TransformFn};

/// An executable pattern program.
///
/// Instruction addresses and table indices are dense and meaningful only
/// within the program that assigned them; nothing transfers across
/// programs.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub(crate) instructions: Vec<Instr>,
    pub(crate) static_elements: Vec<char>,
    pub(crate) static_sequences: Vec<String>,
    pub(crate) static_bitsets: Vec<CharBitset>,
    pub(crate) closures: ClosureTables,
    pub(crate) registers: RegisterInfo,
    pub(crate) enable_tracing: bool,
    pub(crate) enable_metrics: bool,
    pub(crate) captures: CaptureList,
    pub(crate) referenced_capture_offsets: IndexMap<ReferenceId, u32>,
    pub(crate) initial_options: MatchOptions,
}

impl Program {
    pub fn instructions(&self) -> &[Instr] {
        &self.instructions
    }

    pub fn instruction(&self, at: InstrAddr) -> Option<&Instr> {
        self.instructions.get(at.index())
    }

    pub fn static_elements(&self) -> &[char] {
        &self.static_elements
    }

    pub fn static_sequences(&self) -> &[String] {
        &self.static_sequences
    }

    pub fn static_bitsets(&self) -> &[CharBitset] {
        &self.static_bitsets
    }

    pub fn registers(&self) -> RegisterInfo {
        self.registers
    }

    pub fn enable_tracing(&self) -> bool {
        self.enable_tracing
    }

    pub fn enable_metrics(&self) -> bool {
        self.enable_metrics
    }

    pub fn captures(&self) -> &CaptureList {
        &self.captures
    }

    pub fn referenced_capture_offsets(&self) -> &IndexMap<ReferenceId, u32> {
        &self.referenced_capture_offsets
    }

    pub fn initial_options(&self) -> MatchOptions {
        self.initial_options
    }

    pub fn consume_functions(&self) -> &[ConsumeFn] {
        &self.closures.consume
    }

    pub fn transform_functions(&self) -> &[TransformFn] {
        &self.closures.transform
    }

    pub fn matcher_functions(&self) -> &[MatcherFn] {
        &self.closures.matcher
    }

    /// Replace the consume-function table with real closures.
    ///
    /// Panics unless `funs` has exactly the register-declared length.
    pub fn attach_consume_functions(&mut self, funs: Vec<ConsumeFn>) {
        assert_eq!(
            funs.len() as u32,
            self.registers.consume_functions,
            "consume function table must hold {} entries, got {}",
            self.registers.consume_functions,
            funs.len()
        );
        self.closures.consume = funs;
    }

    /// Replace the transform-function table with real closures.
    ///
    /// Panics unless `funs` has exactly the register-declared length.
    pub fn attach_transform_functions(&mut self, funs: Vec<TransformFn>) {
        assert_eq!(
            funs.len() as u32,
            self.registers.transform_functions,
            "transform function table must hold {} entries, got {}",
            self.registers.transform_functions,
            funs.len()
        );
        self.closures.transform = funs;
    }

    /// Replace the matcher-function table with real closures.
    ///
    /// Panics unless `funs` has exactly the register-declared length.
    pub fn attach_matcher_functions(&mut self, funs: Vec<MatcherFn>) {
        assert_eq!(
            funs.len() as u32,
            self.registers.matcher_functions,
            "matcher function table must hold {} entries, got {}",
            self.registers.matcher_functions,
            funs.len()
        );
        self.closures.matcher = funs;
    }

    /// Re-check the construction invariants.
    ///
    /// Panics on violation. A program failing here was assembled outside
    /// the documented contract; executing it would corrupt a match, so
    /// the interpreter calls this before its first step.
    pub fn validate(&self) {
        fn bump(slot: &mut u32, index: usize) {
            *slot = (*slot).max(index as u32 + 1);
        }

        let len = self.instructions.len();
        let mut need = RegisterInfo::zeroed();

        for (at, instr) in self.instructions.iter().enumerate() {
            if let Some(target) = instr.jump_target() {
                assert!(
                    target.index() < len,
                    "instruction @{at} jumps to {target}, beyond the stream of {len}"
                );
            }
            match instr {
                Instr::MatchElement { element } => assert!(
                    element.index() < self.static_elements.len(),
                    "instruction @{at} reads element {} of a table of {}",
                    element.0,
                    self.static_elements.len()
                ),
                Instr::MatchSequence { sequence } => assert!(
                    sequence.index() < self.static_sequences.len(),
                    "instruction @{at} reads sequence {} of a table of {}",
                    sequence.0,
                    self.static_sequences.len()
                ),
                Instr::MatchBitset { bitset } => assert!(
                    bitset.index() < self.static_bitsets.len(),
                    "instruction @{at} reads bitset {} of a table of {}",
                    bitset.0,
                    self.static_bitsets.len()
                ),
                Instr::ConsumeBy { fun } => bump(&mut need.consume_functions, fun.index()),
                Instr::MatchBy { fun, capture } => {
                    bump(&mut need.matcher_functions, fun.index());
                    bump(&mut need.captures, capture.index());
                }
                Instr::BranchIfZeroElseDecrement { register, .. } => {
                    bump(&mut need.ints, register.index());
                }
                Instr::MoveImmediate { into, .. } => bump(&mut need.ints, into.index()),
                Instr::MoveBoolean { into, .. } => bump(&mut need.bools, into.index()),
                Instr::MoveCurrentPosition { into } => bump(&mut need.positions, into.index()),
                Instr::BeginCapture { capture }
                | Instr::EndCapture { capture }
                | Instr::Backreference { capture } => bump(&mut need.captures, capture.index()),
                Instr::TransformCapture { capture, fun } => {
                    bump(&mut need.captures, capture.index());
                    bump(&mut need.transform_functions, fun.index());
                }
                _ => {}
            }
        }

        // Every capture in the list owns a register, touched or not.
        need.captures = need.captures.max(self.captures.len() as u32);
        assert!(
            self.registers.covers(&need),
            "register info undercounts instruction usage: have {:?}, need {:?}",
            self.registers,
            need
        );

        for kind in [ClosureKind::Consume, ClosureKind::Transform, ClosureKind::Matcher] {
            assert_eq!(
                self.closures.len_of(kind) as u32,
                self.registers.function_count(kind),
                "{kind} function table length must equal its register count"
            );
        }

        // Shapes other than the raw slice are produced by transform or
        // matcher functions; with neither table populated no capture can
        // hold one.
        if self.closures.len_of(ClosureKind::Transform) == 0
            && self.closures.len_of(ClosureKind::Matcher) == 0
        {
            for (offset, capture) in self.captures.iter().enumerate() {
                assert!(
                    matches!(capture.shape(), CaptureShape::Slice),
                    "capture {offset} is shaped {}, but no transform or matcher \
                     function is registered",
                    capture.shape()
                );
            }
        }

        for (id, offset) in &self.referenced_capture_offsets {
            assert!(
                (*offset as usize) < self.captures.len(),
                "capture reference {id} points at offset {offset}, beyond the capture list"
            );
        }
    }
}

/// Assembles a [`Program`].
///
/// The compiler drives this while lowering a tree: intern constants,
/// allocate registers, emit instructions, then [`finish`](Self::finish).
/// Interning deduplicates, so emitting the same constant twice costs one
/// table slot.
pub struct ProgramBuilder {
    instructions: Vec<Instr>,
    elements: Vec<char>,
    element_ids: HashMap<char, ElementId>,
    sequences: Vec<String>,
    sequence_ids: HashMap<String, SequenceId>,
    bitsets: Vec<CharBitset>,
    bitset_ids: HashMap<CharBitset, BitsetId>,
    closures: ClosureTables,
    registers: RegisterInfo,
    enable_tracing: bool,
    enable_metrics: bool,
    captures: CaptureList,
    referenced: IndexMap<ReferenceId, u32>,
    options: MatchOptions,
}

impl ProgramBuilder {
    pub fn new(captures: CaptureList, options: MatchOptions) -> Self {
        let registers = RegisterInfo {
            captures: captures.len() as u32,
            ..RegisterInfo::zeroed()
        };
        Self {
            instructions: Vec::new(),
            elements: Vec::new(),
            element_ids: HashMap::new(),
            sequences: Vec::new(),
            sequence_ids: HashMap::new(),
            bitsets: Vec::new(),
            bitset_ids: HashMap::new(),
            closures: ClosureTables::default(),
            registers,
            enable_tracing: false,
            enable_metrics: false,
            captures,
            referenced: IndexMap::new(),
            options,
        }
    }

    pub fn intern_element(&mut self, element: char) -> ElementId {
        if let Some(&id) = self.element_ids.get(&element) {
            return id;
        }
        let id = ElementId::new(self.elements.len() as u32);
        self.elements.push(element);
        self.element_ids.insert(element, id);
        id
    }

    pub fn intern_sequence(&mut self, sequence: &str) -> SequenceId {
        if let Some(&id) = self.sequence_ids.get(sequence) {
            return id;
        }
        let id = SequenceId::new(self.sequences.len() as u32);
        self.sequences.push(sequence.to_owned());
        self.sequence_ids.insert(sequence.to_owned(), id);
        id
    }

    pub fn intern_bitset(&mut self, bitset: CharBitset) -> BitsetId {
        if let Some(&id) = self.bitset_ids.get(&bitset) {
            return id;
        }
        let id = BitsetId::new(self.bitsets.len() as u32);
        self.bitsets.push(bitset);
        self.bitset_ids.insert(bitset, id);
        id
    }

    pub fn register_consume(&mut self, fun: ConsumeFn) -> ConsumeFnId {
        let id = ConsumeFnId::new(self.closures.consume.len() as u32);
        self.closures.consume.push(fun);
        self.registers.consume_functions += 1;
        id
    }

    pub fn register_transform(&mut self, fun: TransformFn) -> TransformFnId {
        let id = TransformFnId::new(self.closures.transform.len() as u32);
        self.closures.transform.push(fun);
        self.registers.transform_functions += 1;
        id
    }

    pub fn register_matcher(&mut self, fun: MatcherFn) -> MatcherFnId {
        let id = MatcherFnId::new(self.closures.matcher.len() as u32);
        self.closures.matcher.push(fun);
        self.registers.matcher_functions += 1;
        id
    }

    pub fn alloc_int(&mut self) -> IntReg {
        let id = IntReg::new(self.registers.ints);
        self.registers.ints += 1;
        id
    }

    pub fn alloc_bool(&mut self) -> BoolReg {
        let id = BoolReg::new(self.registers.bools);
        self.registers.bools += 1;
        id
    }

    pub fn alloc_position(&mut self) -> PositionReg {
        let id = PositionReg::new(self.registers.positions);
        self.registers.positions += 1;
        id
    }

    /// Address the next pushed instruction will land at.
    pub fn next_address(&self) -> InstrAddr {
        InstrAddr::new(self.instructions.len() as u32)
    }

    pub fn push(&mut self, instr: Instr) -> InstrAddr {
        let at = self.next_address();
        self.instructions.push(instr);
        at
    }

    /// Reserve a slot for a forward jump. The placeholder is a dead end,
    /// so leaving a reservation unpatched shows up immediately in tests.
    pub fn reserve(&mut self) -> InstrAddr {
        self.push(Instr::Fail)
    }

    pub fn patch(&mut self, at: InstrAddr, instr: Instr) {
        assert!(
            at.index() < self.instructions.len(),
            "patch target {at} is outside the emitted stream"
        );
        self.instructions[at.index()] = instr;
    }

    /// Record under which external id a capture offset is referenced.
    pub fn record_reference(&mut self, id: ReferenceId, offset: u32) {
        assert!(
            (offset as usize) < self.captures.len(),
            "capture reference {id} points at offset {offset}, beyond the capture list"
        );
        self.referenced.insert(id, offset);
    }

    /// Declare that capture `index` holds transformed values of `type_name`.
    ///
    /// [`finish`](Self::finish) rejects a shaped capture unless a
    /// transform or matcher function is registered to produce its values.
    pub fn mark_transformed(&mut self, index: usize, type_name: &'static str) {
        assert!(
            index < self.captures.len(),
            "capture {index} is beyond the capture list"
        );
        self.captures
            .set_shape(index, CaptureShape::Transformed { type_name });
    }

    pub fn set_tracing(&mut self, on: bool) {
        self.enable_tracing = on;
    }

    pub fn set_metrics(&mut self, on: bool) {
        self.enable_metrics = on;
    }

    /// Seal the program, validating every construction invariant.
    pub fn finish(self) -> Program {
        let program = Program {
            instructions: self.instructions,
            static_elements: self.elements,
            static_sequences: self.sequences,
            static_bitsets: self.bitsets,
            closures: self.closures,
            registers: self.registers,
            enable_tracing: self.enable_tracing,
            enable_metrics: self.enable_metrics,
            captures: self.captures,
            referenced_capture_offsets: self.referenced,
            initial_options: self.options,
        };
        program.validate();
        program
    }
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new(CaptureList::whole_match_only(), MatchOptions::default())
    }
}
