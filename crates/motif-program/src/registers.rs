//! Register-file sizing.

use serde::{Deserialize, Serialize};

use crate::tables::ClosureKind;

/// How many working-storage slots of each class one match attempt needs.
///
/// The interpreter allocates its register file from these counts before
/// executing a single instruction; an undercount relative to what the
/// instruction stream touches is a program-construction bug, checked by
/// [`Program::validate`](crate::Program::validate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterInfo {
    /// Capture slots; index equals the capture's list position.
    pub captures: u32,
    /// String and sequence scratch slots.
    pub sequences: u32,
    pub ints: u32,
    pub bools: u32,
    pub positions: u32,
    pub position_stacks: u32,
    pub class_stacks: u32,
    pub consume_functions: u32,
    pub transform_functions: u32,
    pub matcher_functions: u32,
    pub instruction_addresses: u32,
    pub save_point_addresses: u32,
}

impl RegisterInfo {
    /// Table length the program must carry for `kind` closures.
    pub fn function_count(&self, kind: ClosureKind) -> u32 {
        match kind {
            ClosureKind::Consume => self.consume_functions,
            ClosureKind::Transform => self.transform_functions,
            ClosureKind::Matcher => self.matcher_functions,
        }
    }

    /// True when every class in `self` is at least as large as in `needed`.
    pub fn covers(&self, needed: &RegisterInfo) -> bool {
        self.captures >= needed.captures
            && self.sequences >= needed.sequences
            && self.ints >= needed.ints
            && self.bools >= needed.bools
            && self.positions >= needed.positions
            && self.position_stacks >= needed.position_stacks
            && self.class_stacks >= needed.class_stacks
            && self.consume_functions >= needed.consume_functions
            && self.transform_functions >= needed.transform_functions
            && self.matcher_functions >= needed.matcher_functions
            && self.instruction_addresses >= needed.instruction_addresses
            && self.save_point_addresses >= needed.save_point_addresses
    }

    pub(crate) const fn zeroed() -> Self {
        Self {
            captures: 0,
            sequences: 0,
            ints: 0,
            bools: 0,
            positions: 0,
            position_stacks: 0,
            class_stacks: 0,
            consume_functions: 0,
            transform_functions: 0,
            matcher_functions: 0,
            instruction_addresses: 0,
            save_point_addresses: 0,
        }
    }
}

impl Default for RegisterInfo {
    /// The smallest legal file: one capture slot for the whole match,
    /// nothing else.
    fn default() -> Self {
        Self {
            captures: 1,
            ..Self::zeroed()
        }
    }
}
