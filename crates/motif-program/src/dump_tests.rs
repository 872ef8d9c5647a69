use std::any::Any;
use std::sync::Arc;

use indexmap::IndexMap;
use insta::assert_snapshot;
use motif_syntax::{Assertion, GroupKind, MatchOptions, Span, Syntax};

use crate::captures::CaptureList;
use crate::dump::dump;
use crate::instr::{BitsetId, CaptureReg, ElementId, Instr, InstrAddr, SequenceId};
use crate::program::{Program, ProgramBuilder};
use crate::program_tests::two_number_program;
use crate::registers::RegisterInfo;
use crate::tables::{ClosureTables, TransformFn};

#[test]
fn listing_of_a_two_capture_program() {
    assert_snapshot!(dump(&two_number_program()), @r#"
    [elements]
      0: '+'

    [bitsets]
      0: ['0'-'9']

    [captures]
      0: <whole match> slice
      1: _ slice
      2: _ slice

    [registers]
      captures: 3

    [instructions]
       0  begin-capture %1
       1  match-bitset 0 ['0'-'9']
       2  save @5                   ; @5: end-capture %1
       3  match-bitset 0 ['0'-'9']
       4  branch @2                 ; @2: save @5
       5  end-capture %1
       6  match-element 0 '+'
       7  begin-capture %2
       8  match-bitset 0 ['0'-'9']
       9  save @12                  ; @12: end-capture %2
      10  match-bitset 0 ['0'-'9']
      11  branch @9                 ; @9: save @12
      12  end-capture %2
      13  accept
    "#);
}

#[test]
fn listing_covers_every_operand_form() {
    let mut b = ProgramBuilder::default();
    let seq = b.intern_sequence("ab");
    let counter = b.alloc_int();
    let flag = b.alloc_bool();
    let mark = b.alloc_position();
    b.push(Instr::Assert {
        assertion: Assertion::StartOfLine,
    });
    b.push(Instr::MoveImmediate {
        value: 3,
        into: counter,
    });
    b.push(Instr::BranchIfZeroElseDecrement {
        register: counter,
        to: InstrAddr::new(6),
    });
    b.push(Instr::MatchSequence { sequence: seq });
    b.push(Instr::Branch {
        to: InstrAddr::new(2),
    });
    b.push(Instr::Fail);
    b.push(Instr::MoveBoolean {
        value: true,
        into: flag,
    });
    b.push(Instr::MoveCurrentPosition { into: mark });
    b.push(Instr::SaveAddress {
        to: InstrAddr::new(11),
    });
    b.push(Instr::Advance { by: 2 });
    b.push(Instr::ClearSavePoint);
    b.push(Instr::Backreference {
        capture: CaptureReg::new(0),
    });
    b.push(Instr::Accept);

    assert_snapshot!(dump(&b.finish()), @r#"
    [sequences]
      0: "ab"

    [captures]
      0: <whole match> slice

    [registers]
      captures: 1
      ints: 1
      bools: 1
      positions: 1

    [instructions]
       0  assert start-of-line
       1  move-imm 3 -> i0
       2  branch-zero-dec i0 @6     ; @6: move-bool true -> b0
       3  match-sequence 0 "ab"
       4  branch @2                 ; @2: branch-zero-dec i0 @6
       5  fail
       6  move-bool true -> b0
       7  move-pos -> p0
       8  save-addr @11             ; @11: backref %0
       9  advance 2
      10  clear-save
      11  backref %0
      12  accept
    "#);
}

#[test]
fn capture_lines_show_names_shapes_and_spans() {
    let tree = Syntax::concat([
        Syntax::group(
            GroupKind::NamedCapture("year".into()),
            Syntax::literal("y"),
            Span::new(1, 7),
        ),
        Syntax::optional(Syntax::capture(Syntax::literal("-"))),
    ]);
    let mut b = ProgramBuilder::new(CaptureList::from_syntax(&tree), MatchOptions::default());
    let fun: TransformFn =
        Arc::new(|text: &str| Some(Box::new(text.to_owned()) as Box<dyn Any + Send + Sync>));
    b.register_transform(fun);
    b.mark_transformed(1, "Year");
    b.push(Instr::Accept);

    assert_snapshot!(dump(&b.finish()), @r#"
    [captures]
      0: <whole match> slice
      1: year value<Year> (1..7)
      2: _ optional<slice>

    [registers]
      captures: 3
      transform_functions: 1

    [instructions]
      0  accept
    "#);
}

#[test]
fn listing_survives_dangling_references() {
    // Assembled by hand so every table reference dangles and the jump
    // leaves the stream; dump renders placeholders where validate would
    // panic.
    let p = Program {
        instructions: vec![
            Instr::MatchElement {
                element: ElementId::new(3),
            },
            Instr::Branch {
                to: InstrAddr::new(7),
            },
            Instr::MatchSequence {
                sequence: SequenceId::new(2),
            },
            Instr::MatchBitset {
                bitset: BitsetId::new(1),
            },
        ],
        static_elements: Vec::new(),
        static_sequences: Vec::new(),
        static_bitsets: Vec::new(),
        closures: ClosureTables::default(),
        registers: RegisterInfo::default(),
        enable_tracing: false,
        enable_metrics: false,
        captures: CaptureList::whole_match_only(),
        referenced_capture_offsets: IndexMap::new(),
        initial_options: MatchOptions::default(),
    };

    assert_snapshot!(dump(&p), @r#"
    [captures]
      0: <whole match> slice

    [registers]
      captures: 1

    [instructions]
      0  match-element 3 ??
      1  branch @7                 ; @7: <out of range>
      2  match-sequence 2 ??
      3  match-bitset 1 ??
    "#);
}
