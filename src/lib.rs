//! The test-case harness: runs a built program's registered expectations
//! against the interpreter and reports the first mismatch.

pub mod cli;

use anyhow::{bail, Context, Result};
use maroonlang::ir::{Program, TestCase};
use maroonrt::Interpreter;

/// Runs `fiber` of namespace `ns` and returns the transcript lines.
pub fn run_fiber(program: &Program, ns: &str, fiber: &str) -> Result<Vec<String>> {
    let interp = Interpreter::new(program, ns, fiber)?;
    interp
        .run()
        .map_err(|e| anyhow::anyhow!("fiber `{ns}.{fiber}` failed: {e}"))
}

pub fn run_test_case(program: &Program, case: &TestCase) -> Result<()> {
    match case {
        TestCase::RunFiber(t) => {
            let interp = Interpreter::new(program, &t.maroon, &t.fiber)?;
            let lines = interp
                .run()
                .map_err(|e| anyhow::anyhow!("fiber `{}.{}` failed: {e}", t.maroon, t.fiber))?;
            if lines != t.golden_output {
                bail!(
                    "transcript mismatch for `{}.{}`:\n  expected: {:?}\n  actual:   {:?}",
                    t.maroon,
                    t.fiber,
                    t.golden_output,
                    lines
                );
            }
            Ok(())
        }
        TestCase::FiberShouldThrow(t) => {
            let interp = Interpreter::new(program, &t.maroon, &t.fiber)?;
            match interp.run() {
                Ok(lines) => bail!(
                    "fiber `{}.{}` was expected to fail with `{}` but produced {:?}",
                    t.maroon,
                    t.fiber,
                    t.error,
                    lines
                ),
                Err(e) => {
                    let actual = e.to_string();
                    if actual != t.error {
                        bail!(
                            "error mismatch for `{}.{}`:\n  expected: {}\n  actual:   {}",
                            t.maroon,
                            t.fiber,
                            t.error,
                            actual
                        );
                    }
                    Ok(())
                }
            }
        }
    }
}

/// Runs every registered test case in order; the first failure aborts.
pub fn run_all_tests(program: &Program) -> Result<()> {
    for (i, case) in program.tests.iter().enumerate() {
        run_test_case(program, case).with_context(|| format!("test case #{i}"))?;
    }
    Ok(())
}
