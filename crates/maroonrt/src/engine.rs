//! The step-indexed interpreter: a call stack of activation frames walking
//! the compiled step tables of one fiber.

use crate::error::RunError;
use crate::expr::{AssignOp, BinOp, Expr, StmtOp};
use crate::step::{compile_fiber, CompiledFiber, StepCode, VarCtor};
use anyhow::{bail, Context, Result};
use maroonlang::ir::Program;
use maroonval::{u64_add, u64_cmp, u64_mul, u64_sub, Value};
use std::cmp::Ordering;

#[derive(Debug)]
pub struct Interpreter {
    compiled: CompiledFiber,
}

struct Slot {
    name: String,
    value: Value,
}

struct Frame {
    /// Function whose step table this frame walks.
    f: String,
    /// Display name in stack dumps; empty for the entry frame.
    label: String,
    idx: usize,
    /// Caller-frame slot that captures the return value, if any.
    ret_slot: Option<(usize, String)>,
    vars: Vec<Slot>,
    args: Vec<Value>,
    args_used: usize,
}

impl Frame {
    fn entry() -> Frame {
        Frame {
            f: "main".to_string(),
            label: String::new(),
            idx: 0,
            ret_slot: None,
            vars: Vec::new(),
            args: Vec::new(),
            args_used: 0,
        }
    }

    fn call(f: String, args: Vec<Value>, ret_slot: Option<(usize, String)>) -> Frame {
        Frame {
            label: f.clone(),
            f,
            idx: 0,
            ret_slot,
            vars: Vec::new(),
            args,
            args_used: 0,
        }
    }
}

enum Outcome {
    Branch(usize),
    Call {
        f: String,
        args: Vec<Value>,
        ret_slot: Option<(usize, String)>,
    },
    Return(Option<Value>),
}

/// Collects the step's single control outcome; a second deposit is the
/// `MisplacedControl` misuse.
struct Collector {
    out: Option<Outcome>,
}

impl Collector {
    fn new() -> Collector {
        Collector { out: None }
    }

    fn set(&mut self, o: Outcome) -> Result<(), RunError> {
        if self.out.is_some() {
            return Err(RunError::MisplacedControl);
        }
        self.out = Some(o);
        Ok(())
    }
}

impl Interpreter {
    /// Selects `fiber` of namespace `ns` and lowers it. The fiber must
    /// carry a zero-argument `main`.
    pub fn new(program: &Program, ns: &str, fiber: &str) -> Result<Interpreter> {
        let Some(namespace) = program.maroon.get(ns) else {
            bail!("unknown namespace `{ns}`");
        };
        let Some(fiber_ir) = namespace.fibers.get(fiber) else {
            bail!("unknown fiber `{fiber}` in namespace `{ns}`");
        };
        let compiled =
            compile_fiber(fiber_ir).with_context(|| format!("compile fiber `{ns}.{fiber}`"))?;
        let Some(main) = compiled.fns.get("main") else {
            bail!("fiber `{ns}.{fiber}` has no `main`");
        };
        if !main.arg_types.is_empty() {
            bail!("`main` of fiber `{ns}.{fiber}` must take no arguments");
        }
        Ok(Interpreter { compiled })
    }

    /// Runs the fiber's `main` to completion. On success the transcript is
    /// returned intact; on failure the transcript is dropped and the error
    /// alone describes the run.
    pub fn run(&self) -> Result<Vec<String>, RunError> {
        let mut stack = vec![Frame::entry()];
        let mut transcript: Vec<String> = Vec::new();

        while !stack.is_empty() {
            let top = stack.len() - 1;
            let (fname, idx) = (stack[top].f.clone(), stack[top].idx);
            let func = self
                .compiled
                .fns
                .get(&fname)
                .ok_or_else(|| RunError::internal(format!("no step table for `{fname}`")))?;
            if idx >= func.steps.len() {
                return Err(RunError::MissingReturn);
            }
            let step = &func.steps[idx];

            // Scope exit releases slots: truncate to the step's entry count.
            if stack[top].vars.len() < step.vars_before {
                return Err(RunError::internal("pre-step vars count mismatch"));
            }
            stack[top].vars.truncate(step.vars_before);
            for ctor in &step.decls {
                declare(&mut stack[top], ctor)?;
            }
            if stack[top].vars.len() != step.vars_before + step.decls.len() {
                return Err(RunError::internal("intra-step vars count mismatch"));
            }

            let mut result = Collector::new();
            match &step.code {
                StepCode::Exec(op) => exec(op, &mut stack, top, &mut transcript)?,
                StepCode::If { cond, else_target } => {
                    if !eval_bool(cond, &stack[top])? {
                        result.set(Outcome::Branch(*else_target))?;
                    }
                }
                StepCode::Jump(target) => result.set(Outcome::Branch(*target))?,
                StepCode::Match { var, arms, default } => {
                    let value = read_var(&stack[top], var)?;
                    let key = match &value {
                        Value::OptU64(Some(_)) => Some("U64"),
                        Value::OptBool(Some(_)) => Some("BOOL"),
                        Value::OptU64(None) | Value::OptBool(None) => None,
                        other => Some(other.type_name()),
                    };
                    let target = key
                        .and_then(|k| arms.iter().find(|(ak, _)| ak == k).map(|(_, t)| *t))
                        .unwrap_or(*default);
                    result.set(Outcome::Branch(target))?;
                }
                StepCode::Call { f, args, ret_slot } => {
                    let callee = self
                        .compiled
                        .fns
                        .get(f)
                        .ok_or_else(|| RunError::internal(format!("no step table for `{f}`")))?;
                    let mut packed = Vec::with_capacity(args.len());
                    for a in args {
                        packed.push(eval(a, &stack[top])?);
                    }
                    if packed.len() != callee.arg_types.len() {
                        return Err(RunError::Arity {
                            f: f.clone(),
                            expected: callee.arg_types.len(),
                            got: packed.len(),
                        });
                    }
                    for ((value, want), arg) in
                        packed.iter().zip(&callee.arg_types).zip(args)
                    {
                        if value.type_name() != want.as_str() {
                            return Err(RunError::TypeMismatch {
                                name: arg.describe(),
                                actual: value.type_name().to_string(),
                                expected: want.clone(),
                            });
                        }
                    }
                    result.set(Outcome::Call {
                        f: f.clone(),
                        args: packed,
                        ret_slot: ret_slot.clone(),
                    })?;
                }
                StepCode::Return(e) => {
                    let value = match e {
                        None => None,
                        Some(e) => {
                            let v = eval(e, &stack[top])?;
                            if let Some(want) = &func.ret {
                                if v.type_name() != want.as_str() {
                                    return Err(RunError::TypeMismatch {
                                        name: e.describe(),
                                        actual: v.type_name().to_string(),
                                        expected: want.clone(),
                                    });
                                }
                            }
                            Some(v)
                        }
                    };
                    result.set(Outcome::Return(value))?;
                }
            }

            match result.out {
                None => stack[top].idx += 1,
                Some(Outcome::Branch(target)) => stack[top].idx = target,
                Some(Outcome::Call { f, args, ret_slot }) => {
                    stack[top].idx += 1;
                    stack.push(Frame::call(f, args, ret_slot));
                }
                Some(Outcome::Return(value)) => {
                    let finished = stack.pop().expect("the stack is non-empty");
                    match (value, finished.ret_slot) {
                        (Some(value), slot) => {
                            let Some(caller) = stack.last_mut() else {
                                return Err(RunError::internal(
                                    "returning from the top level of the fiber should have no value",
                                ));
                            };
                            if let Some((idx, name)) = slot {
                                let Some(target) = caller.vars.get_mut(idx) else {
                                    return Err(RunError::internal(
                                        "return slot is out of the caller's stack",
                                    ));
                                };
                                if target.name != name {
                                    return Err(RunError::internal(format!(
                                        "corrupted stack: return slot {idx} holds `{}`, expected `{name}`",
                                        target.name
                                    )));
                                }
                                target.value = value;
                            }
                            // Dropping an uncaptured return value is fine.
                        }
                        (None, Some(_)) => return Err(RunError::MissingReturnValue),
                        (None, None) => {}
                    }
                }
            }
        }

        Ok(transcript)
    }
}

fn declare(frame: &mut Frame, ctor: &VarCtor) -> Result<(), RunError> {
    match ctor {
        VarCtor::Regular { name, ty, init } => {
            let value = eval_init(init, ty, name, frame)?;
            frame.vars.push(Slot {
                name: name.clone(),
                value,
            });
        }
        VarCtor::Argument { name, ty } => {
            if frame.args_used >= frame.args.len() {
                return Err(RunError::internal("not enough packed args"));
            }
            let value = frame.args[frame.args_used].clone();
            frame.args_used += 1;
            if value.type_name() != ty.as_str() {
                return Err(RunError::internal(format!(
                    "packed argument for `{name}` has type `{}`, declared `{ty}`",
                    value.type_name()
                )));
            }
            frame.vars.push(Slot {
                name: name.clone(),
                value,
            });
        }
        VarCtor::Capture { name, src } => {
            let value = read_var(frame, src)?;
            let Some(inner) = value.unwrap_some() else {
                return Err(RunError::internal(format!(
                    "capture `{name}` from the empty optional `{src}`"
                )));
            };
            frame.vars.push(Slot {
                name: name.clone(),
                value: inner,
            });
        }
    }
    Ok(())
}

fn exec(
    op: &StmtOp,
    stack: &mut [Frame],
    top: usize,
    transcript: &mut Vec<String>,
) -> Result<(), RunError> {
    match op {
        StmtOp::Debug(e) => {
            let line = match e {
                Expr::StrLit(s) => s.clone(),
                _ => eval(e, &stack[top])?.to_string(),
            };
            transcript.push(line);
        }
        StmtOp::DebugExpr { text, expr } => {
            let value = eval(expr, &stack[top])?;
            transcript.push(format!("{text}={value}"));
        }
        StmtOp::DebugDumpVars => {
            transcript.push(dump_vars(&stack[top]));
        }
        StmtOp::DebugDumpStack => {
            let mut out = String::from("<");
            for (i, frame) in stack.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                if !frame.label.is_empty() {
                    out.push_str(&frame.label);
                    out.push('@');
                }
                out.push_str(&dump_vars(frame));
            }
            out.push('>');
            transcript.push(out);
        }
        StmtOp::Assign { name, op, expr } => assign(&mut stack[top], name, *op, expr)?,
        StmtOp::Expr(e) => {
            eval(e, &stack[top])?;
        }
        StmtOp::Return(_) | StmtOp::Call { .. } => {
            return Err(RunError::internal(
                "control statement routed through plain execution",
            ));
        }
    }
    Ok(())
}

fn dump_vars(frame: &Frame) -> String {
    let mut out = String::from("[");
    for (i, slot) in frame.vars.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&slot.name);
        out.push(':');
        out.push_str(&slot.value.to_string());
    }
    out.push(']');
    out
}

fn assign(frame: &mut Frame, name: &str, op: AssignOp, expr: &Expr) -> Result<(), RunError> {
    let Some(idx) = frame.vars.iter().rposition(|s| s.name == name) else {
        return Err(RunError::internal(format!(
            "assignment to `{name}` which is not on the stack"
        )));
    };
    match op {
        AssignOp::Set => {
            let slot_ty = frame.vars[idx].value.type_name().to_string();
            let value = eval_init(expr, &slot_ty, name, frame)?;
            frame.vars[idx].value = value;
        }
        AssignOp::Add | AssignOp::Sub | AssignOp::Mul => {
            let current = frame.vars[idx].value.clone();
            if current.as_u64().is_none() {
                return Err(RunError::TypeMismatch {
                    name: name.to_string(),
                    actual: current.type_name().to_string(),
                    expected: "U64".to_string(),
                });
            }
            let rhs = expect_u64(expr, frame)?;
            let result = match op {
                AssignOp::Add => u64_add(&current, &rhs),
                AssignOp::Sub => u64_sub(&current, &rhs),
                AssignOp::Mul => u64_mul(&current, &rhs),
                AssignOp::Set => unreachable!(),
            }
            .expect("both operands are U64");
            frame.vars[idx].value = result;
        }
    }
    Ok(())
}

fn read_var(frame: &Frame, name: &str) -> Result<Value, RunError> {
    frame
        .vars
        .iter()
        .rev()
        .find(|s| s.name == name)
        .map(|s| s.value.clone())
        .ok_or_else(|| RunError::internal(format!("variable `{name}` is not on the stack")))
}

/// Evaluates an initializer or assignment source against the target type:
/// `NONE` and bare base values may fill an optional slot.
fn eval_init(expr: &Expr, ty: &str, name: &str, frame: &Frame) -> Result<Value, RunError> {
    if matches!(expr, Expr::NoneLit) {
        return Value::none_of(ty).ok_or_else(|| RunError::TypeMismatch {
            name: name.to_string(),
            actual: "NONE".to_string(),
            expected: ty.to_string(),
        });
    }
    let value = eval(expr, frame)?;
    if value.type_name() == ty {
        return Ok(value);
    }
    if let Some(inner) = ty.strip_prefix("OPTIONAL_") {
        if value.type_name() == inner {
            return Ok(Value::some_of(&value).expect("base values wrap"));
        }
    }
    Err(RunError::TypeMismatch {
        name: name.to_string(),
        actual: value.type_name().to_string(),
        expected: ty.to_string(),
    })
}

fn eval(expr: &Expr, frame: &Frame) -> Result<Value, RunError> {
    match expr {
        Expr::U64Lit(v) => Ok(Value::U64(*v)),
        Expr::BoolLit(v) => Ok(Value::Bool(*v)),
        Expr::StrLit(_) => Err(RunError::internal("string literal used as a value")),
        Expr::NoneLit => Err(RunError::internal(
            "`NONE` used outside of an initializer or assignment",
        )),
        Expr::Var(name) => read_var(frame, name),
        Expr::CtorU64(e) => {
            let value = eval(e, frame)?;
            match value {
                Value::U64(_) => Ok(value),
                other => Err(RunError::TypeMismatch {
                    name: e.describe(),
                    actual: other.type_name().to_string(),
                    expected: "U64".to_string(),
                }),
            }
        }
        Expr::CtorBool(e) => {
            let value = eval(e, frame)?;
            match value {
                Value::Bool(_) => Ok(value),
                other => Err(RunError::TypeMismatch {
                    name: e.describe(),
                    actual: other.type_name().to_string(),
                    expected: "BOOL".to_string(),
                }),
            }
        }
        Expr::Bin(op, a, b) => {
            let lhs = expect_u64(a, frame)?;
            let rhs = expect_u64(b, frame)?;
            let result = match op {
                BinOp::Add => u64_add(&lhs, &rhs).expect("both operands are U64"),
                BinOp::Sub => u64_sub(&lhs, &rhs).expect("both operands are U64"),
                BinOp::Mul => u64_mul(&lhs, &rhs).expect("both operands are U64"),
                BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                    let ord = u64_cmp(&lhs, &rhs).expect("both operands are U64");
                    Value::Bool(match op {
                        BinOp::Eq => ord == Ordering::Equal,
                        BinOp::Ne => ord != Ordering::Equal,
                        BinOp::Lt => ord == Ordering::Less,
                        BinOp::Le => ord != Ordering::Greater,
                        BinOp::Gt => ord == Ordering::Greater,
                        BinOp::Ge => ord != Ordering::Less,
                        _ => unreachable!(),
                    })
                }
            };
            Ok(result)
        }
    }
}

fn expect_u64(expr: &Expr, frame: &Frame) -> Result<Value, RunError> {
    let value = eval(expr, frame)?;
    match value {
        Value::U64(_) => Ok(value),
        other => Err(RunError::TypeMismatch {
            name: expr.describe(),
            actual: other.type_name().to_string(),
            expected: "U64".to_string(),
        }),
    }
}

fn eval_bool(expr: &Expr, frame: &Frame) -> Result<bool, RunError> {
    let value = eval(expr, frame)?;
    value.as_bool().ok_or_else(|| RunError::TypeMismatch {
        name: expr.describe(),
        actual: value.type_name().to_string(),
        expected: "BOOL".to_string(),
    })
}
