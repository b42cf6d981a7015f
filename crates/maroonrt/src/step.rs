//! Lowering: flattens a fiber's function bodies into step tables.
//!
//! Each step records how many variables are visible at entry and which new
//! variables it declares; the run loop releases scopes by truncating the
//! frame's variable list to `vars_before` before the step runs. Nested
//! blocks disappear into explicit branch targets.

use crate::expr::{parse_expr, parse_stmt, Expr, StmtOp};
use anyhow::{bail, Context, Result};
use maroonlang::ir::*;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct CompiledFiber {
    pub fns: BTreeMap<String, CompiledFn>,
}

#[derive(Debug)]
pub struct CompiledFn {
    pub ret: Option<String>,
    pub arg_types: Vec<String>,
    pub steps: Vec<Step>,
}

#[derive(Debug)]
pub struct Step {
    /// Number of variables visible at step entry; the frame is truncated
    /// to this prefix before the step runs.
    pub vars_before: usize,
    /// Constructors for the variables this step declares.
    pub decls: Vec<VarCtor>,
    pub code: StepCode,
    pub line: u32,
}

#[derive(Debug)]
pub enum VarCtor {
    Regular {
        name: String,
        ty: String,
        init: Expr,
    },
    /// Binds the next packed argument value.
    Argument { name: String, ty: String },
    /// Aliases the payload of the matched optional `src`.
    Capture { name: String, src: String },
}

#[derive(Debug)]
pub enum StepCode {
    Exec(StmtOp),
    /// Falls through on a true condition, branches to `else_target`
    /// otherwise.
    If { cond: Expr, else_target: usize },
    Jump(usize),
    /// Dispatches on the runtime case of `var`: a matching key branches to
    /// its arm, anything else to `default`.
    Match {
        var: String,
        arms: Vec<(String, usize)>,
        default: usize,
    },
    Call {
        f: String,
        args: Vec<Expr>,
        /// Caller-frame slot that captures the return value, if any.
        ret_slot: Option<(usize, String)>,
    },
    Return(Option<Expr>),
}

pub fn compile_fiber(fiber: &Fiber) -> Result<CompiledFiber> {
    let mut fns = BTreeMap::new();
    for (name, f) in &fiber.functions {
        let compiled = Lowerer::new(fiber, f)
            .lower()
            .with_context(|| format!("lower function `{name}`"))?;
        fns.insert(name.clone(), compiled);
    }
    Ok(CompiledFiber { fns })
}

struct Lowerer<'a> {
    fiber: &'a Fiber,
    f: &'a Function,
    steps: Vec<Step>,
    /// Static mirror of the frame's variable layout: (name, type name).
    scope: Vec<(String, String)>,
    /// Declarations accumulated since the last emitted step; the next step
    /// materializes them (block vars hoist to the block's first step).
    pending: Vec<VarCtor>,
    pending_base: usize,
}

impl<'a> Lowerer<'a> {
    fn new(fiber: &'a Fiber, f: &'a Function) -> Self {
        Lowerer {
            fiber,
            f,
            steps: Vec::new(),
            scope: Vec::new(),
            pending: Vec::new(),
            pending_base: 0,
        }
    }

    fn lower(mut self) -> Result<CompiledFn> {
        let f = self.f;
        self.lower_block(&f.body)?;
        Ok(CompiledFn {
            ret: self.f.ret.clone(),
            arg_types: self.f.args.clone(),
            steps: self.steps,
        })
    }

    fn emit(&mut self, code: StepCode, line: u32) -> usize {
        let (vars_before, decls) = if self.pending.is_empty() {
            (self.scope.len(), Vec::new())
        } else {
            (self.pending_base, std::mem::take(&mut self.pending))
        };
        self.steps.push(Step {
            vars_before,
            decls,
            code,
            line,
        });
        self.steps.len() - 1
    }

    fn next_idx(&self) -> usize {
        self.steps.len()
    }

    fn lower_block(&mut self, b: &Block) -> Result<()> {
        let scope_mark = self.scope.len();
        let pending_mark = self.pending.len();
        if self.pending.is_empty() {
            self.pending_base = self.scope.len();
        }
        for v in &b.vars {
            let ctor = self.lower_var(v)?;
            self.pending.push(ctor);
        }
        for item in &b.code {
            self.lower_item(item)?;
        }
        self.scope.truncate(scope_mark);
        self.pending.truncate(pending_mark);
        Ok(())
    }

    fn lower_var(&mut self, v: &Var) -> Result<VarCtor> {
        let ctor = match v {
            Var::Regular(v) => VarCtor::Regular {
                name: v.name.clone(),
                ty: v.ty.clone(),
                init: parse_expr(&v.init)
                    .with_context(|| format!("parse initializer of `{}`", v.name))?,
            },
            Var::Argument(v) => VarCtor::Argument {
                name: v.name.clone(),
                ty: v.ty.clone(),
            },
            Var::CaptureAlias(v) => {
                let Some((_, src_ty)) = self.lookup(&v.src) else {
                    bail!("capture `{}` aliases unknown variable `{}`", v.name, v.src);
                };
                let inner = src_ty
                    .strip_prefix("OPTIONAL_")
                    .unwrap_or(v.key.as_str())
                    .to_string();
                self.scope.push((v.name.clone(), inner));
                return Ok(VarCtor::Capture {
                    name: v.name.clone(),
                    src: v.src.clone(),
                });
            }
        };
        let (name, ty) = match &ctor {
            VarCtor::Regular { name, ty, .. } | VarCtor::Argument { name, ty } => {
                (name.clone(), ty.clone())
            }
            VarCtor::Capture { .. } => unreachable!(),
        };
        self.scope.push((name, ty));
        Ok(ctor)
    }

    fn lookup(&self, name: &str) -> Option<(usize, String)> {
        self.scope
            .iter()
            .rposition(|(n, _)| n == name)
            .map(|i| (i, self.scope[i].1.clone()))
    }

    fn lower_item(&mut self, item: &StmtOrBlock) -> Result<()> {
        match item {
            StmtOrBlock::Stmt(s) => self.lower_stmt(s),
            StmtOrBlock::Block(b) => self.lower_block(b),
            StmtOrBlock::If(i) => self.lower_if(i),
            StmtOrBlock::MatchEnum(m) => self.lower_match(m),
            StmtOrBlock::BlockPlaceholder(p) => {
                bail!("block placeholder {} reached lowering", p.idx)
            }
        }
    }

    fn lower_stmt(&mut self, s: &Stmt) -> Result<()> {
        let op = parse_stmt(&s.stmt).with_context(|| format!("parse statement `{}`", s.stmt))?;
        let code = match op {
            StmtOp::Return(e) => {
                if e.is_some() && self.f.ret.is_none() {
                    bail!("`RETURN(...)` with a value in a unit function");
                }
                StepCode::Return(e)
            }
            StmtOp::Call { ret, f, args } => {
                let Some(callee) = self.fiber.functions.get(&f) else {
                    bail!("call to unknown function `{f}`");
                };
                let ret_slot = match ret {
                    None => None,
                    Some(name) => {
                        let Some((idx, slot_ty)) = self.lookup(&name) else {
                            bail!("call captures into unknown variable `{name}`");
                        };
                        let Some(callee_ret) = &callee.ret else {
                            bail!("call captures the return of unit function `{f}`");
                        };
                        if &slot_ty != callee_ret {
                            bail!(
                                "call captures `{f}`'s `{callee_ret}` return into `{name}` of type `{slot_ty}`"
                            );
                        }
                        Some((idx, name))
                    }
                };
                StepCode::Call { f, args, ret_slot }
            }
            other => StepCode::Exec(other),
        };
        self.emit(code, s.line);
        Ok(())
    }

    fn lower_if(&mut self, i: &If) -> Result<()> {
        let cond = parse_expr(&i.cond).with_context(|| format!("parse condition `{}`", i.cond))?;
        let cond_idx = self.emit(
            StepCode::If {
                cond,
                else_target: usize::MAX,
            },
            i.line,
        );
        self.lower_item(&i.yes)?;
        let jump_idx = self.emit(StepCode::Jump(usize::MAX), i.line);
        let else_start = self.next_idx();
        self.patch_if(cond_idx, else_start);
        self.lower_item(&i.no)?;
        let join = self.next_idx();
        self.patch_jump(jump_idx, join);
        Ok(())
    }

    fn lower_match(&mut self, m: &MatchEnum) -> Result<()> {
        if self.lookup(&m.var).is_none() {
            bail!("match on unknown variable `{}`", m.var);
        }
        let match_idx = self.emit(
            StepCode::Match {
                var: m.var.clone(),
                arms: Vec::new(),
                default: usize::MAX,
            },
            m.line,
        );
        let mut arm_targets: Vec<(Option<String>, usize)> = Vec::new();
        let mut jumps = Vec::new();
        for arm in &m.arms {
            arm_targets.push((arm.key.clone(), self.next_idx()));
            self.lower_block(&arm.code)?;
            jumps.push(self.emit(StepCode::Jump(usize::MAX), arm.line));
        }
        let join = self.next_idx();
        for j in jumps {
            self.patch_jump(j, join);
        }
        let mut arms = Vec::new();
        let mut default = join;
        for (key, target) in arm_targets {
            match key {
                Some(key) => arms.push((key, target)),
                None => default = target,
            }
        }
        let StepCode::Match {
            arms: slot_arms,
            default: slot_default,
            ..
        } = &mut self.steps[match_idx].code
        else {
            unreachable!("match step was just emitted");
        };
        *slot_arms = arms;
        *slot_default = default;
        Ok(())
    }

    fn patch_if(&mut self, idx: usize, target: usize) {
        if let StepCode::If { else_target, .. } = &mut self.steps[idx].code {
            *else_target = target;
        }
    }

    fn patch_jump(&mut self, idx: usize, target: usize) {
        if let StepCode::Jump(t) = &mut self.steps[idx].code {
            *t = target;
        }
    }
}
