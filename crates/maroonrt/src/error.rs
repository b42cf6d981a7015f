//! Structured runtime errors. A raised error terminates the run with an
//! empty transcript; the test harness matches the rendered message against
//! `FiberShouldThrow` expectations.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    /// The step index overran the function without a `RETURN()`.
    #[error("Need `RETURN()` at least at the last `STMT()` of the `FN()`.")]
    MissingReturn,

    /// A non-unit function returned without a value while the caller
    /// captured it.
    #[error("A return value must have been provided.")]
    MissingReturnValue,

    #[error("Attempted to call `{f}` with {got} args, expected {expected}.")]
    Arity {
        f: String,
        expected: usize,
        got: usize,
    },

    /// A variable or argument was used at the wrong runtime type.
    #[error("Attempted to use `{name}` of type `{actual}` as `{expected}`.")]
    TypeMismatch {
        name: String,
        actual: String,
        expected: String,
    },

    /// More than one control outcome was recorded in a single step.
    #[error("Attempted to record more than one control outcome in a single step.")]
    MisplacedControl,

    /// A corrupted-stack style assertion, surfaced as an error instead of
    /// aborting the process.
    #[error("Internal invariant failed: {0}.")]
    Internal(String),
}

impl RunError {
    pub fn internal(msg: impl Into<String>) -> RunError {
        RunError::Internal(msg.into())
    }
}
