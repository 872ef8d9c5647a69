use std::any::Any;
use std::sync::Arc;

use indoc::indoc;
use motif_syntax::{GroupKind, MatchOptions, Span, Syntax};

use crate::captures::{CaptureList, ReferenceId};
use crate::instr::{CaptureReg, Instr};
use crate::program::{Program, ProgramBuilder};
use crate::program_tests::two_number_program;
use crate::tables::{ClosureKind, ConsumeFn, TransformFn};
use crate::wire::{DecodeError, EncodeError, decode, encode};

/// Closure-free program touching every serialized field.
fn annotated_program() -> Program {
    let tree = Syntax::concat([
        Syntax::group(
            GroupKind::NamedCapture("year".into()),
            Syntax::literal("2024"),
            Span::new(0, 6),
        ),
        Syntax::optional(Syntax::capture(Syntax::literal("-"))),
    ]);
    let mut b = ProgramBuilder::new(
        CaptureList::from_syntax(&tree),
        MatchOptions {
            case_insensitive: true,
            ..MatchOptions::default()
        },
    );
    let year = b.intern_sequence("2024");
    b.push(Instr::BeginCapture {
        capture: CaptureReg::new(1),
    });
    b.push(Instr::MatchSequence { sequence: year });
    b.push(Instr::EndCapture {
        capture: CaptureReg::new(1),
    });
    b.push(Instr::Accept);
    b.record_reference(ReferenceId(7), 1);
    b.set_tracing(true);
    b.set_metrics(true);
    b.finish()
}

#[test]
fn round_trip_preserves_every_field() {
    let original = annotated_program();
    let text = encode(&original).unwrap();
    let decoded = decode(&text).unwrap();
    assert_eq!(decoded, original);

    assert!(decoded.enable_tracing());
    assert!(decoded.enable_metrics());
    assert!(decoded.initial_options().case_insensitive);
    assert_eq!(
        decoded.referenced_capture_offsets().get(&ReferenceId(7)),
        Some(&1)
    );
    assert_eq!(decoded.captures().get(1).unwrap().name(), Some("year"));
    assert_eq!(decoded.captures().get(1).unwrap().span(), Span::new(0, 6));
    assert_eq!(decoded.captures().get(2).unwrap().optional_depth(), 1);
}

#[test]
fn round_trip_preserves_instruction_streams() {
    let original = two_number_program();
    let decoded = decode(&encode(&original).unwrap()).unwrap();
    assert_eq!(decoded, original);
    decoded.validate();
}

#[test]
fn wire_field_names_are_stable() {
    let text = encode(&annotated_program()).unwrap();
    for field in [
        "\"instructions\"",
        "\"staticElements\"",
        "\"staticSequences\"",
        "\"staticBitsets\"",
        "\"registerInfo\"",
        "\"enableTracing\"",
        "\"enableMetrics\"",
        "\"captureList\"",
        "\"optionalDepth\"",
        "\"location\"",
        "\"referencedCaptureOffsets\"",
        "\"initialOptions\"",
    ] {
        assert!(text.contains(field), "missing {field} in {text}");
    }
    // Integer reference ids become string object keys.
    assert!(text.contains(r#""referencedCaptureOffsets":{"7":1}"#));
}

#[test]
fn fields_decode_in_any_order() {
    let a = decode(
        r#"{"enableTracing":true,"registerInfo":{"captures":2},"captureList":[{"optionalDepth":0},{"name":"x","optionalDepth":1}]}"#,
    )
    .unwrap();
    let b = decode(
        r#"{"captureList":[{"optionalDepth":0},{"optionalDepth":1,"name":"x"}],"registerInfo":{"captures":2},"enableTracing":true}"#,
    )
    .unwrap();
    assert_eq!(a, b);
    assert_eq!(a.captures().position_of_name("x"), Some(1));
}

#[test]
fn absent_fields_take_defaults() {
    let p = decode("{}").unwrap();
    assert!(p.instructions().is_empty());
    assert_eq!(p.registers().captures, 1);
    assert_eq!(p.captures().len(), 1);
    assert_eq!(p.captures().get(0).unwrap().name(), None);
    assert!(!p.enable_tracing());
    assert_eq!(p.initial_options(), MatchOptions::default());

    // Defaults also apply within a partially present register file.
    let p = decode(r#"{"registerInfo":{"ints":3}}"#).unwrap();
    assert_eq!(p.registers().ints, 3);
    assert_eq!(p.registers().captures, 1);
}

#[test]
fn unknown_fields_are_ignored() {
    let p = decode(r#"{"futureExtension":[1,2,3]}"#).unwrap();
    assert_eq!(p.captures().len(), 1);
}

#[test]
fn a_handwritten_payload_decodes() {
    let text = indoc! {r#"
        {
          "instructions": [
            {"matchSequence": {"sequence": 0}},
            "accept"
          ],
          "staticSequences": ["abc"],
          "captureList": [{"optionalDepth": 0}],
          "enableMetrics": true
        }
    "#};
    let p = decode(text).unwrap();
    assert_eq!(p.instructions().len(), 2);
    assert_eq!(p.static_sequences(), &["abc".to_owned()]);
    assert!(p.enable_metrics());
    p.validate();
}

#[test]
fn explicitly_empty_capture_list_is_rejected() {
    let err = decode(r#"{"captureList":[]}"#).unwrap_err();
    assert!(matches!(err, DecodeError::EmptyCaptureList));
    assert_eq!(
        err.to_string(),
        "capture list is explicitly empty; a program always carries the whole-match capture"
    );
}

#[test]
fn reference_offsets_are_checked_against_the_list() {
    let err = decode(r#"{"referencedCaptureOffsets":{"3":9}}"#).unwrap_err();
    assert_eq!(
        err.to_string(),
        "capture reference #3 points at offset 9, but the capture list holds 1 entries"
    );
}

#[test]
fn type_mismatches_surface_as_malformed() {
    let err = decode(r#"{"instructions":5}"#).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed(_)));

    let err = decode("not json at all").unwrap_err();
    assert!(matches!(err, DecodeError::Malformed(_)));
}

#[test]
fn populated_closure_tables_refuse_to_encode() {
    let mut b = ProgramBuilder::default();
    let fun: ConsumeFn = Arc::new(|_: &str, at: usize| Some(at));
    let id = b.register_consume(fun);
    b.push(Instr::ConsumeBy { fun: id });
    let program = b.finish();

    let err = encode(&program).unwrap_err();
    assert!(matches!(
        err,
        EncodeError::ClosureTable {
            kind: ClosureKind::Consume,
            len: 1
        }
    ));
    assert_eq!(
        err.to_string(),
        "cannot encode program: consume function table holds 1 attached closures"
    );
}

#[test]
fn shaped_captures_never_reach_the_wire() {
    let tree = Syntax::capture(Syntax::literal("2024"));
    let mut b = ProgramBuilder::new(CaptureList::from_syntax(&tree), MatchOptions::default());
    let fun: TransformFn =
        Arc::new(|text: &str| Some(Box::new(text.len()) as Box<dyn Any + Send + Sync>));
    let id = b.register_transform(fun);
    b.mark_transformed(1, "Year");
    b.push(Instr::TransformCapture {
        capture: CaptureReg::new(1),
        fun: id,
    });
    b.push(Instr::Accept);
    let program = b.finish();

    // The closure that produces the shaped values blocks encoding, so
    // every program that does encode is all-slice and decodes back equal
    // in every field, shapes included.
    let err = encode(&program).unwrap_err();
    assert!(matches!(
        err,
        EncodeError::ClosureTable {
            kind: ClosureKind::Transform,
            len: 1
        }
    ));
}

#[test]
fn decode_sizes_placeholder_tables_from_register_info() {
    let p = decode(r#"{"registerInfo":{"transformFunctions":2}}"#).unwrap();
    assert_eq!(p.transform_functions().len(), 2);
    assert_eq!(p.consume_functions().len(), 0);
}

#[test]
#[should_panic(expected = "uninitialized transform function 1")]
fn decoded_placeholders_panic_when_invoked() {
    let p = decode(r#"{"registerInfo":{"transformFunctions":2}}"#).unwrap();
    let _ = (p.transform_functions()[1])("slice");
}
