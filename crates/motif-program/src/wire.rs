//! Serialized form of a compiled program.
//!
//! The format is named-field and order-independent: fields may appear in
//! any order, unknown fields are ignored, and an absent field takes its
//! documented default, so older payloads stay readable as the format
//! grows. The three function tables are never part of the format; decode
//! installs panicking placeholders sized from the register info and the
//! host reattaches real closures afterwards.
//!
//! Decode applies no invariant checking beyond the data contract itself;
//! run [`Program::validate`] before handing a decoded program to the
//! interpreter.

use indexmap::IndexMap;
use motif_syntax::{MatchOptions, Span};
use serde::{Deserialize, Serialize};

use crate::captures::{Capture, CaptureList, CaptureShape, ReferenceId};
use crate::instr::Instr;
use crate::program::Program;
use crate::registers::RegisterInfo;
use crate::tables::{CharBitset, ClosureKind, ClosureTables};

/// Why a program could not be written out.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The format carries no closures; a populated table cannot be
    /// represented at all.
    #[error("cannot encode program: {kind} function table holds {len} attached closures")]
    ClosureTable { kind: ClosureKind, len: usize },
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Why serialized data could not be turned back into a program.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed program data: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Present-but-empty capture list. Only an absent field defaults;
    /// explicit emptiness is corrupt data.
    #[error("capture list is explicitly empty; a program always carries the whole-match capture")]
    EmptyCaptureList,
    #[error(
        "capture reference {reference} points at offset {offset}, \
         but the capture list holds {len} entries"
    )]
    ReferenceOutOfRange {
        reference: ReferenceId,
        offset: u32,
        len: usize,
    },
}

/// Write `program` out as self-describing text.
///
/// Fails before producing any output when a function table is populated;
/// strip or rebuild the program first.
pub fn encode(program: &Program) -> Result<String, EncodeError> {
    for kind in [
        ClosureKind::Consume,
        ClosureKind::Transform,
        ClosureKind::Matcher,
    ] {
        let len = program.closures.len_of(kind);
        if len > 0 {
            return Err(EncodeError::ClosureTable { kind, len });
        }
    }
    Ok(serde_json::to_string(&WireProgram::from_program(program))?)
}

/// Rebuild a program from [`encode`]d text.
///
/// Function tables come back as placeholders sized from the register
/// info; invoking one before reattachment is fatal.
pub fn decode(text: &str) -> Result<Program, DecodeError> {
    let wire: WireProgram = serde_json::from_str(text)?;
    wire.into_program()
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WireProgram {
    instructions: Vec<Instr>,
    static_elements: Vec<char>,
    static_sequences: Vec<String>,
    static_bitsets: Vec<CharBitset>,
    register_info: RegisterInfo,
    enable_tracing: bool,
    enable_metrics: bool,
    capture_list: Vec<WireCapture>,
    referenced_capture_offsets: IndexMap<ReferenceId, u32>,
    initial_options: MatchOptions,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCapture {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    optional_depth: u32,
    #[serde(default)]
    location: Span,
}

impl Default for WireProgram {
    /// Field defaults for absent wire fields: an empty program around
    /// the one-capture register file and the whole-match capture list.
    fn default() -> Self {
        Self {
            instructions: Vec::new(),
            static_elements: Vec::new(),
            static_sequences: Vec::new(),
            static_bitsets: Vec::new(),
            register_info: RegisterInfo::default(),
            enable_tracing: false,
            enable_metrics: false,
            capture_list: vec![WireCapture {
                name: None,
                optional_depth: 0,
                location: Span::default(),
            }],
            referenced_capture_offsets: IndexMap::new(),
            initial_options: MatchOptions::default(),
        }
    }
}

impl WireProgram {
    fn from_program(program: &Program) -> Self {
        Self {
            instructions: program.instructions.clone(),
            static_elements: program.static_elements.clone(),
            static_sequences: program.static_sequences.clone(),
            static_bitsets: program.static_bitsets.clone(),
            register_info: program.registers,
            enable_tracing: program.enable_tracing,
            enable_metrics: program.enable_metrics,
            capture_list: program
                .captures
                .iter()
                .map(|c| WireCapture {
                    name: c.name().map(str::to_owned),
                    optional_depth: c.optional_depth(),
                    location: c.span(),
                })
                .collect(),
            referenced_capture_offsets: program.referenced_capture_offsets.clone(),
            initial_options: program.initial_options,
        }
    }

    fn into_program(self) -> Result<Program, DecodeError> {
        if self.capture_list.is_empty() {
            return Err(DecodeError::EmptyCaptureList);
        }
        let len = self.capture_list.len();
        for (&reference, &offset) in &self.referenced_capture_offsets {
            if offset as usize >= len {
                return Err(DecodeError::ReferenceOutOfRange {
                    reference,
                    offset,
                    len,
                });
            }
        }
        // Shapes are not part of the format; a decoded capture is always
        // a raw slice. Shaped programs carry the closure that produces
        // their values and so never encode in the first place.
        let captures = CaptureList::from_captures(
            self.capture_list
                .into_iter()
                .map(|c| Capture::new(c.name, CaptureShape::Slice, c.optional_depth, c.location))
                .collect(),
        );
        Ok(Program {
            instructions: self.instructions,
            static_elements: self.static_elements,
            static_sequences: self.static_sequences,
            static_bitsets: self.static_bitsets,
            closures: ClosureTables::placeholders(&self.register_info),
            registers: self.register_info,
            enable_tracing: self.enable_tracing,
            enable_metrics: self.enable_metrics,
            captures,
            referenced_capture_offsets: self.referenced_capture_offsets,
            initial_options: self.initial_options,
        })
    }
}
