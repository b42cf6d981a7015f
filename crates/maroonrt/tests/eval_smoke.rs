use maroonlang::Builder;
use maroonrt::Interpreter;
use pretty_assertions::assert_eq;

fn run_main(body: impl FnOnce(&mut Builder) -> anyhow::Result<()>) -> Vec<String> {
    let mut b = Builder::new();
    b.enter_namespace("demo", 1).unwrap();
    b.enter_fiber("global", 2).unwrap();
    b.enter_fn("main", None, 3).unwrap();
    body(&mut b).unwrap();
    b.leave_fn().unwrap();
    b.leave_fiber().unwrap();
    b.leave_namespace().unwrap();
    let p = b.finalize().unwrap();
    Interpreter::new(&p, "demo", "global").unwrap().run().unwrap()
}

#[test]
fn hello_twice() {
    let out = run_main(|b| {
        b.stmt(r#"DEBUG("hi")"#, 4)?;
        b.stmt(r#"DEBUG("hi")"#, 5)?;
        b.stmt("RETURN()", 6)
    });
    assert_eq!(out, vec!["hi".to_string(), "hi".to_string()]);
}

#[test]
fn arithmetic_and_debug_expr() {
    let out = run_main(|b| {
        b.var("a", "U64", "2", 4)?;
        b.var("b", "U64", "3", 5)?;
        b.stmt("DEBUG_EXPR(a + b)", 6)?;
        b.stmt("DEBUG_EXPR(a * b)", 7)?;
        b.stmt("DEBUG_EXPR(b - a)", 8)?;
        b.stmt("RETURN()", 9)
    });
    assert_eq!(out, vec!["a + b=5", "a * b=6", "b - a=1"]);
}

#[test]
fn comparison_selects_the_then_branch() {
    let out = run_main(|b| {
        b.var("a", "U64", "2", 4)?;
        b.var("b", "U64", "3", 5)?;
        b.if_stmt(
            "a < b",
            6,
            |b| b.stmt(r#"DEBUG("lt")"#, 7),
            |b| b.stmt(r#"DEBUG("ge")"#, 8),
        )?;
        b.stmt("RETURN()", 9)
    });
    assert_eq!(out, vec!["lt"]);
}

#[test]
fn comparison_selects_the_else_branch() {
    let out = run_main(|b| {
        b.var("a", "U64", "3", 4)?;
        b.var("b", "U64", "3", 5)?;
        b.if_stmt(
            "a < b",
            6,
            |b| b.stmt(r#"DEBUG("lt")"#, 7),
            |b| b.stmt(r#"DEBUG("ge")"#, 8),
        )?;
        b.stmt("RETURN()", 9)
    });
    assert_eq!(out, vec!["ge"]);
}

#[test]
fn assignment_forms() {
    let out = run_main(|b| {
        b.var("x", "U64", "10", 4)?;
        b.stmt("x += 5", 5)?;
        b.stmt("DEBUG_EXPR(x)", 6)?;
        b.stmt("x -= 3", 7)?;
        b.stmt("DEBUG_EXPR(x)", 8)?;
        b.stmt("x *= 2", 9)?;
        b.stmt("DEBUG_EXPR(x)", 10)?;
        b.stmt("x = 1", 11)?;
        b.stmt("DEBUG_EXPR(x)", 12)?;
        b.stmt("RETURN()", 13)
    });
    assert_eq!(out, vec!["x=15", "x=12", "x=24", "x=1"]);
}

#[test]
fn debug_prints_values_and_booleans() {
    let out = run_main(|b| {
        b.var("flag", "BOOL", "true", 4)?;
        b.stmt("DEBUG_EXPR(flag)", 5)?;
        b.stmt("DEBUG(7 + 1)", 6)?;
        b.stmt("RETURN()", 7)
    });
    assert_eq!(out, vec!["flag=true", "8"]);
}

#[test]
fn scope_release_truncates_block_vars() {
    let out = run_main(|b| {
        b.var("a", "U64", "1", 4)?;
        b.enter_block(5)?;
        b.var("c", "U64", "2", 6)?;
        b.stmt("DEBUG_DUMP_VARS()", 7)?;
        b.leave_block()?;
        b.stmt("DEBUG_DUMP_VARS()", 8)?;
        b.stmt("RETURN()", 9)
    });
    assert_eq!(out, vec!["[a:1,c:2]", "[a:1]"]);
}

#[test]
fn transcript_is_deterministic() {
    let build = || {
        let mut b = Builder::new();
        b.enter_namespace("demo", 1).unwrap();
        b.enter_fiber("global", 2).unwrap();
        b.enter_fn("main", None, 3).unwrap();
        b.var("a", "U64", "2", 4).unwrap();
        b.stmt("DEBUG_EXPR(a * a)", 5).unwrap();
        b.stmt("RETURN()", 6).unwrap();
        b.leave_fn().unwrap();
        b.leave_fiber().unwrap();
        b.leave_namespace().unwrap();
        b.finalize().unwrap()
    };
    let p = build();
    let a = Interpreter::new(&p, "demo", "global").unwrap().run().unwrap();
    let b = Interpreter::new(&p, "demo", "global").unwrap().run().unwrap();
    assert_eq!(a, b);
}
