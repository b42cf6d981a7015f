//! The diff contract: canonical JSON equality modulo line numbers.

use anyhow::Result;
use maroonlang::canon;
use maroonlang::ir::Program;
use maroonlang::Builder;
use pretty_assertions::assert_eq;

fn build(base_line: u32, greeting: &str) -> Result<Program> {
    let mut b = Builder::new();
    b.set_source("diffable.mrn");
    b.enter_namespace("demo", base_line)?;
    b.enter_fiber("global", base_line + 1)?;
    b.enter_fn("main", None, base_line + 2)?;
    b.var("x", "OPTIONAL<U64>", "U64(1)", base_line + 3)?;
    b.stmt(&format!(r#"DEBUG("{greeting}")"#), base_line + 4)?;
    b.stmt("RETURN()", base_line + 5)?;
    b.leave_fn()?;
    b.leave_fiber()?;
    b.leave_namespace()?;
    b.test_run_fiber("demo", "global", &[greeting], base_line + 6);
    b.finalize()
}

#[test]
fn reparse_of_the_canonical_form_is_lossless() {
    let p = build(1, "hi").unwrap();
    let json = canon::canonical_json(&p).unwrap();
    let reparsed = canon::parse_json(&json).unwrap();
    assert_eq!(canon::canonical_json(&reparsed).unwrap(), json);
}

#[test]
fn line_numbers_never_participate_in_equality() {
    let a = build(1, "hi").unwrap();
    let b = build(500, "hi").unwrap();
    assert!(canon::eq_modulo_lines(&a, &b).unwrap());
    assert_ne!(
        canon::canonical_json(&a).unwrap(),
        canon::canonical_json(&b).unwrap()
    );
}

#[test]
fn semantic_differences_are_detected() {
    let a = build(1, "hi").unwrap();
    let b = build(1, "bye").unwrap();
    assert!(!canon::eq_modulo_lines(&a, &b).unwrap());
}

#[test]
fn building_the_same_events_twice_is_byte_identical() {
    let a = build(1, "hi").unwrap();
    let b = build(1, "hi").unwrap();
    assert_eq!(
        canon::canonical_json(&a).unwrap(),
        canon::canonical_json(&b).unwrap()
    );
}

#[test]
fn erased_form_round_trips_through_parse() {
    let p = build(7, "hi").unwrap();
    let erased = canon::canonical_json_no_lines(&p).unwrap();
    let reparsed = canon::parse_json(&erased).unwrap();
    // Erasure is idempotent: scrubbing a scrubbed tree changes nothing.
    assert_eq!(canon::canonical_json_no_lines(&reparsed).unwrap(), erased);
    assert_eq!(canon::canonical_json(&reparsed).unwrap(), erased);
}
