//! Human-readable program listing.

use std::fmt::Write;

use motif_syntax::Assertion;

use crate::instr::Instr;
use crate::program::Program;

/// Render `program` as a plain-text listing: static tables, then the
/// capture list and register file, then every instruction by index.
/// Instructions carrying a jump target show the target rendered inline.
pub fn dump(program: &Program) -> String {
    let mut out = String::new();

    if !program.static_elements().is_empty() {
        writeln!(out, "[elements]").unwrap();
        let w = width_for_count(program.static_elements().len());
        for (i, element) in program.static_elements().iter().enumerate() {
            writeln!(out, "  {i:>w$}: {element:?}").unwrap();
        }
        writeln!(out).unwrap();
    }

    if !program.static_sequences().is_empty() {
        writeln!(out, "[sequences]").unwrap();
        let w = width_for_count(program.static_sequences().len());
        for (i, sequence) in program.static_sequences().iter().enumerate() {
            writeln!(out, "  {i:>w$}: {sequence:?}").unwrap();
        }
        writeln!(out).unwrap();
    }

    if !program.static_bitsets().is_empty() {
        writeln!(out, "[bitsets]").unwrap();
        let w = width_for_count(program.static_bitsets().len());
        for (i, bitset) in program.static_bitsets().iter().enumerate() {
            writeln!(out, "  {i:>w$}: {bitset}").unwrap();
        }
        writeln!(out).unwrap();
    }

    writeln!(out, "[captures]").unwrap();
    let w = width_for_count(program.captures().len());
    for (i, capture) in program.captures().iter().enumerate() {
        let name = match capture.name() {
            Some(name) => name,
            None if i == 0 => "<whole match>",
            None => "_",
        };
        write!(out, "  {i:>w$}: {name} {}", capture.value_shape()).unwrap();
        let span = capture.span();
        if !span.is_empty() {
            write!(out, " ({}..{})", span.start, span.end).unwrap();
        }
        writeln!(out).unwrap();
    }
    writeln!(out).unwrap();

    writeln!(out, "[registers]").unwrap();
    let registers = program.registers();
    for (name, count) in [
        ("captures", registers.captures),
        ("sequences", registers.sequences),
        ("ints", registers.ints),
        ("bools", registers.bools),
        ("positions", registers.positions),
        ("position_stacks", registers.position_stacks),
        ("class_stacks", registers.class_stacks),
        ("consume_functions", registers.consume_functions),
        ("transform_functions", registers.transform_functions),
        ("matcher_functions", registers.matcher_functions),
        ("instruction_addresses", registers.instruction_addresses),
        ("save_point_addresses", registers.save_point_addresses),
    ] {
        if count != 0 {
            writeln!(out, "  {name}: {count}").unwrap();
        }
    }
    writeln!(out).unwrap();

    writeln!(out, "[instructions]").unwrap();
    let aw = width_for_count(program.instructions().len());
    for (at, instr) in program.instructions().iter().enumerate() {
        let code = render(program, instr);
        match instr.jump_target() {
            Some(target) => {
                let annotation = match program.instruction(target) {
                    Some(t) => render(program, t),
                    None => "<out of range>".to_owned(),
                };
                writeln!(out, "  {at:>aw$}  {code:<26}; {target}: {annotation}").unwrap();
            }
            None => writeln!(out, "  {at:>aw$}  {code}").unwrap(),
        }
    }
    out
}

fn width_for_count(count: usize) -> usize {
    if count <= 1 {
        1
    } else {
        (count - 1).to_string().len()
    }
}

fn render(program: &Program, instr: &Instr) -> String {
    let m = instr.mnemonic();
    match instr {
        Instr::MatchElement { element } => match program.static_elements().get(element.index()) {
            Some(c) => format!("{m} {} {c:?}", element.0),
            None => format!("{m} {} ??", element.0),
        },
        Instr::MatchSequence { sequence } => {
            match program.static_sequences().get(sequence.index()) {
                Some(s) => format!("{m} {} {s:?}", sequence.0),
                None => format!("{m} {} ??", sequence.0),
            }
        }
        Instr::MatchBitset { bitset } => match program.static_bitsets().get(bitset.index()) {
            Some(set) => format!("{m} {} {set}", bitset.0),
            None => format!("{m} {} ??", bitset.0),
        },
        Instr::ConsumeBy { fun } => format!("{m} fn{}", fun.0),
        Instr::MatchBy { fun, capture } => format!("{m} fn{} -> %{}", fun.0, capture.0),
        Instr::Assert { assertion } => format!("{m} {}", assertion_name(*assertion)),
        Instr::Advance { by } => format!("{m} {by}"),
        Instr::Branch { to } | Instr::Save { to } | Instr::SaveAddress { to } => {
            format!("{m} {to}")
        }
        Instr::BranchIfZeroElseDecrement { register, to } => {
            format!("{m} i{} {to}", register.0)
        }
        Instr::MoveImmediate { value, into } => format!("{m} {value} -> i{}", into.0),
        Instr::MoveBoolean { value, into } => format!("{m} {value} -> b{}", into.0),
        Instr::MoveCurrentPosition { into } => format!("{m} -> p{}", into.0),
        Instr::BeginCapture { capture }
        | Instr::EndCapture { capture }
        | Instr::Backreference { capture } => format!("{m} %{}", capture.0),
        Instr::TransformCapture { capture, fun } => {
            format!("{m} %{} fn{}", capture.0, fun.0)
        }
        Instr::ClearSavePoint | Instr::Accept | Instr::Fail => m.to_owned(),
    }
}

fn assertion_name(assertion: Assertion) -> &'static str {
    match assertion {
        Assertion::StartOfInput => "start-of-input",
        Assertion::EndOfInput => "end-of-input",
        Assertion::StartOfLine => "start-of-line",
        Assertion::EndOfLine => "end-of-line",
        Assertion::WordBoundary => "word-boundary",
        Assertion::NotWordBoundary => "not-word-boundary",
    }
}
