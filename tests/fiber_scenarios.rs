//! End-to-end: build programs through the event surface, register the
//! expected transcripts, and let the harness compare.

use anyhow::Result;
use maroon::run_all_tests;
use maroonlang::ir::Program;
use maroonlang::Builder;

fn scenarios() -> Result<Program> {
    let mut b = Builder::new();
    b.set_source("scenarios.mrn");
    b.enter_namespace("demo", 1)?;

    // Hello, twice.
    b.enter_fiber("hello", 10)?;
    b.enter_fn("main", None, 11)?;
    b.stmt(r#"DEBUG("hi")"#, 12)?;
    b.stmt(r#"DEBUG("hi")"#, 13)?;
    b.stmt("RETURN()", 14)?;
    b.leave_fn()?;
    b.leave_fiber()?;

    // Arithmetic & comparison.
    b.enter_fiber("arith", 20)?;
    b.enter_fn("main", None, 21)?;
    b.var("a", "U64", "2", 22)?;
    b.var("b", "U64", "3", 23)?;
    b.stmt("DEBUG_EXPR(a + b)", 24)?;
    b.stmt("RETURN()", 25)?;
    b.leave_fn()?;
    b.leave_fiber()?;

    // Conditional.
    b.enter_fiber("cond", 30)?;
    b.enter_fn("main", None, 31)?;
    b.var("a", "U64", "2", 32)?;
    b.var("b", "U64", "3", 33)?;
    b.if_stmt(
        "a < b",
        34,
        |b| b.stmt(r#"DEBUG("lt")"#, 35),
        |b| b.stmt(r#"DEBUG("ge")"#, 36),
    )?;
    b.stmt("RETURN()", 37)?;
    b.leave_fn()?;
    b.leave_fiber()?;

    // Optional match, both ways.
    b.enter_fiber("opt_some", 40)?;
    b.enter_fn("main", None, 41)?;
    b.var("x", "OPTIONAL<U64>", "U64(7)", 42)?;
    b.match_enum("x", 43, |m| {
        m.arm_capture("U64", "v", 44, |b| b.stmt("DEBUG_EXPR(v)", 44))?;
        m.default_arm(45, |b| b.stmt(r#"DEBUG("none")"#, 45))
    })?;
    b.stmt("RETURN()", 46)?;
    b.leave_fn()?;
    b.leave_fiber()?;

    b.enter_fiber("opt_none", 50)?;
    b.enter_fn("main", None, 51)?;
    b.var("x", "OPTIONAL<U64>", "NONE", 52)?;
    b.match_enum("x", 53, |m| {
        m.arm_capture("U64", "v", 54, |b| b.stmt("DEBUG_EXPR(v)", 54))?;
        m.default_arm(55, |b| b.stmt(r#"DEBUG("none")"#, 55))
    })?;
    b.stmt("RETURN()", 56)?;
    b.leave_fn()?;
    b.leave_fiber()?;

    // Call with a captured return value.
    b.enter_fiber("calls", 60)?;
    b.enter_fn("add", Some("U64"), 61)?;
    b.arg("a", "U64", 62)?;
    b.arg("b", "U64", 63)?;
    b.stmt("RETURN(a + b)", 64)?;
    b.leave_fn()?;
    b.enter_fn("main", None, 65)?;
    b.var("r", "U64", "0", 66)?;
    b.stmt("CALL(r, add, (U64(2), U64(3)))", 67)?;
    b.stmt("DEBUG_EXPR(r)", 68)?;
    b.stmt("RETURN()", 69)?;
    b.leave_fn()?;
    b.leave_fiber()?;

    // The required fiber.
    b.enter_fiber("global", 70)?;
    b.enter_fn("main", None, 71)?;
    b.stmt("RETURN()", 72)?;
    b.leave_fn()?;
    b.leave_fiber()?;

    b.leave_namespace()?;

    b.test_run_fiber("demo", "hello", &["hi", "hi"], 80);
    b.test_run_fiber("demo", "arith", &["a + b=5"], 81);
    b.test_run_fiber("demo", "cond", &["lt"], 82);
    b.test_run_fiber("demo", "opt_some", &["v=7"], 83);
    b.test_run_fiber("demo", "opt_none", &["none"], 84);
    b.test_run_fiber("demo", "calls", &["r=5"], 85);
    b.test_run_fiber("demo", "global", &[], 86);

    b.finalize()
}

#[test]
fn all_scenarios_match_their_goldens() {
    let p = scenarios().unwrap();
    maroonlang::check::check_program(&p).unwrap();
    run_all_tests(&p).unwrap();
}

#[test]
fn a_wrong_golden_is_reported() {
    let mut b = Builder::new();
    b.enter_namespace("demo", 1).unwrap();
    b.enter_fiber("global", 2).unwrap();
    b.enter_fn("main", None, 3).unwrap();
    b.stmt(r#"DEBUG("hi")"#, 4).unwrap();
    b.stmt("RETURN()", 5).unwrap();
    b.leave_fn().unwrap();
    b.leave_fiber().unwrap();
    b.leave_namespace().unwrap();
    b.test_run_fiber("demo", "global", &["bye"], 6);
    let p = b.finalize().unwrap();
    let err = run_all_tests(&p).unwrap_err();
    assert!(format!("{err:#}").contains("transcript mismatch"), "{err:#}");
}

#[test]
fn run_fiber_returns_the_transcript() {
    let p = scenarios().unwrap();
    let lines = maroon::run_fiber(&p, "demo", "arith").unwrap();
    assert_eq!(lines, vec!["a + b=5".to_string()]);
}
