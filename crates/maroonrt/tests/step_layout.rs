use maroonlang::Builder;
use maroonrt::step::{compile_fiber, StepCode};
use pretty_assertions::assert_eq;

fn compile(build: impl FnOnce(&mut Builder) -> anyhow::Result<()>) -> maroonrt::step::CompiledFiber {
    let mut b = Builder::new();
    b.enter_namespace("demo", 1).unwrap();
    b.enter_fiber("global", 2).unwrap();
    build(&mut b).unwrap();
    b.leave_fiber().unwrap();
    b.leave_namespace().unwrap();
    let p = b.finalize().unwrap();
    compile_fiber(&p.maroon["demo"].fibers["global"]).unwrap()
}

#[test]
fn body_vars_hoist_onto_the_first_step() {
    let fiber = compile(|b| {
        b.enter_fn("main", None, 3)?;
        b.var("a", "U64", "1", 4)?;
        b.var("b", "U64", "2", 5)?;
        b.stmt("DEBUG_EXPR(a + b)", 6)?;
        b.stmt("RETURN()", 7)?;
        b.leave_fn()
    });
    let main = &fiber.fns["main"];
    assert_eq!(main.steps.len(), 2);
    assert_eq!(main.steps[0].vars_before, 0);
    assert_eq!(main.steps[0].decls.len(), 2);
    assert_eq!(main.steps[1].vars_before, 2);
    assert_eq!(main.steps[1].decls.len(), 0);
}

#[test]
fn nested_block_vars_are_declared_inside_and_released_after() {
    let fiber = compile(|b| {
        b.enter_fn("main", None, 3)?;
        b.var("a", "U64", "1", 4)?;
        b.stmt("DEBUG_EXPR(a)", 5)?;
        b.enter_block(6)?;
        b.var("c", "U64", "2", 7)?;
        b.stmt("DEBUG_EXPR(c)", 8)?;
        b.leave_block()?;
        b.stmt("RETURN()", 9)?;
        b.leave_fn()
    });
    let steps = &fiber.fns["main"].steps;
    assert_eq!(steps.len(), 3);
    // Inside the block: one outer var visible, one declared here.
    assert_eq!(steps[1].vars_before, 1);
    assert_eq!(steps[1].decls.len(), 1);
    // After the block: back to the outer count; truncation releases `c`.
    assert_eq!(steps[2].vars_before, 1);
    assert_eq!(steps[2].decls.len(), 0);
}

#[test]
fn every_step_declares_a_consistent_var_count() {
    let fiber = compile(|b| {
        b.enter_fn("main", None, 3)?;
        b.var("a", "U64", "1", 4)?;
        b.if_stmt(
            "a < 2",
            5,
            |b| {
                b.enter_block(6)?;
                b.var("x", "U64", "10", 7)?;
                b.stmt("DEBUG_EXPR(x)", 8)?;
                b.leave_block()
            },
            |b| b.stmt(r#"DEBUG("ge")"#, 9),
        )?;
        b.stmt("RETURN()", 10)?;
        b.leave_fn()
    });
    for step in &fiber.fns["main"].steps {
        // vars_before never exceeds what the declarations so far allow.
        assert!(step.vars_before + step.decls.len() <= 3);
    }
}

#[test]
fn conditional_lowers_to_branch_and_jump() {
    let fiber = compile(|b| {
        b.enter_fn("main", None, 3)?;
        b.if_stmt(
            "1 < 2",
            4,
            |b| b.stmt(r#"DEBUG("yes")"#, 5),
            |b| b.stmt(r#"DEBUG("no")"#, 6),
        )?;
        b.stmt("RETURN()", 7)?;
        b.leave_fn()
    });
    let steps = &fiber.fns["main"].steps;
    // cond, then, jump-over-else, else, return
    assert_eq!(steps.len(), 5);
    let StepCode::If { else_target, .. } = &steps[0].code else {
        panic!("expected the conditional step");
    };
    assert_eq!(*else_target, 3);
    let StepCode::Jump(join) = &steps[2].code else {
        panic!("expected the jump over the else-branch");
    };
    assert_eq!(*join, 4);
}

#[test]
fn match_lowers_to_a_dispatch_with_arm_targets() {
    let fiber = compile(|b| {
        b.enter_fn("main", None, 3)?;
        b.var("x", "OPTIONAL<U64>", "U64(1)", 4)?;
        b.match_enum("x", 5, |m| {
            m.arm_capture("U64", "v", 6, |b| b.stmt("DEBUG_EXPR(v)", 6))?;
            m.default_arm(7, |b| b.stmt(r#"DEBUG("none")"#, 7))
        })?;
        b.stmt("RETURN()", 8)?;
        b.leave_fn()
    });
    let steps = &fiber.fns["main"].steps;
    let StepCode::Match { arms, default, .. } = &steps[0].code else {
        panic!("expected the match step");
    };
    assert_eq!(arms.len(), 1);
    assert_eq!(arms[0].0, "U64");
    // The default arm's body starts right after the typed arm's jump.
    assert_eq!(*default, 3);
    // Join: both arms jump past the last arm.
    let StepCode::Jump(join) = &steps[2].code else {
        panic!("expected the first arm's jump");
    };
    assert_eq!(*join, 5);
}

#[test]
fn functions_lower_independently() {
    let fiber = compile(|b| {
        b.enter_fn("helper", None, 3)?;
        b.stmt("RETURN()", 4)?;
        b.leave_fn()?;
        b.enter_fn("main", None, 5)?;
        b.stmt("CALL(helper, ())", 6)?;
        b.stmt("RETURN()", 7)?;
        b.leave_fn()
    });
    assert_eq!(fiber.fns["helper"].steps.len(), 1);
    assert_eq!(fiber.fns["main"].steps.len(), 2);
    let StepCode::Call { f, ret_slot, .. } = &fiber.fns["main"].steps[0].code else {
        panic!("expected the call step");
    };
    assert_eq!(f, "helper");
    assert!(ret_slot.is_none());
}
