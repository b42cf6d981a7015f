//! Post-build validation of the global IR invariants. The builder cannot
//! produce most of these violations through its own event surface; the
//! validator proves it, and guards IR that arrived as JSON.

use crate::ir::*;
use anyhow::{bail, Result};
use std::collections::BTreeSet;

pub fn check_program(p: &Program) -> Result<()> {
    for (ns_name, ns) in &p.maroon {
        check_namespace(ns_name, ns)?;
    }
    for t in &p.tests {
        let (ns, fiber) = match t {
            TestCase::RunFiber(t) => (&t.maroon, &t.fiber),
            TestCase::FiberShouldThrow(t) => (&t.maroon, &t.fiber),
        };
        let Some(n) = p.maroon.get(ns) else {
            bail!("test case references unknown namespace `{ns}`");
        };
        if !n.fibers.contains_key(fiber) {
            bail!("test case references unknown fiber `{ns}.{fiber}`");
        }
    }
    Ok(())
}

fn check_namespace(ns_name: &str, ns: &Namespace) -> Result<()> {
    if !ns.fibers.contains_key("global") {
        bail!("namespace `{ns_name}` has no `global` fiber");
    }

    for (type_name, decl) in &ns.types {
        match &decl.def {
            TypeDef::Struct(s) => {
                let mut seen = BTreeSet::new();
                for f in &s.fields {
                    if !seen.insert(&f.name) {
                        bail!("struct `{ns_name}.{type_name}` declares field `{}` twice", f.name);
                    }
                    check_type_name(ns_name, ns, &f.ty)?;
                }
            }
            TypeDef::Enum(e) => {
                let mut seen = BTreeSet::new();
                for c in &e.cases {
                    if !seen.insert(&c.key) {
                        bail!("enum `{ns_name}.{type_name}` declares case `{}` twice", c.key);
                    }
                    check_type_name(ns_name, ns, &c.ty)?;
                }
            }
            TypeDef::Optional(o) => {
                if type_name != &format!("OPTIONAL_{}", o.ty) {
                    bail!(
                        "optional type `{ns_name}.{type_name}` does not wrap its own inner type `{}`",
                        o.ty
                    );
                }
                check_type_name(ns_name, ns, &o.ty)?;
            }
        }
    }

    for (fiber_name, fiber) in &ns.fibers {
        for (fn_name, f) in &fiber.functions {
            let at = format!("{ns_name}.{fiber_name}.{fn_name}");
            if let Some(ret) = &f.ret {
                check_type_name(ns_name, ns, ret)?;
            }
            for ty in &f.args {
                check_type_name(ns_name, ns, ty)?;
            }
            let leading_args = f
                .body
                .vars
                .iter()
                .take_while(|v| matches!(v, Var::Argument(_)))
                .count();
            if leading_args < f.args.len() {
                bail!("function `{at}` declares {} arg types but only {leading_args} leading argument vars", f.args.len());
            }
            check_block(ns_name, ns, &at, &f.body)?;
        }
    }
    Ok(())
}

fn check_type_name(ns_name: &str, ns: &Namespace, ty: &str) -> Result<()> {
    if is_base_type(ty) || ns.types.contains_key(ty) {
        return Ok(());
    }
    bail!("type `{ty}` is neither a base type nor declared in namespace `{ns_name}`");
}

fn check_block(ns_name: &str, ns: &Namespace, at: &str, b: &Block) -> Result<()> {
    for v in &b.vars {
        match v {
            Var::Regular(v) => check_type_name(ns_name, ns, &v.ty)?,
            Var::Argument(v) => check_type_name(ns_name, ns, &v.ty)?,
            Var::CaptureAlias(_) => {}
        }
    }
    for item in &b.code {
        check_item(ns_name, ns, at, item)?;
    }
    Ok(())
}

fn check_item(ns_name: &str, ns: &Namespace, at: &str, item: &StmtOrBlock) -> Result<()> {
    match item {
        StmtOrBlock::Stmt(_) => Ok(()),
        StmtOrBlock::If(i) => {
            check_item(ns_name, ns, at, &i.yes)?;
            check_item(ns_name, ns, at, &i.no)
        }
        StmtOrBlock::Block(b) => check_block(ns_name, ns, at, b),
        StmtOrBlock::MatchEnum(m) => {
            let mut default_seen = false;
            let mut keys = BTreeSet::new();
            for arm in &m.arms {
                match &arm.key {
                    None => {
                        if default_seen {
                            bail!("match on `{}` in `{at}` has more than one default arm", m.var);
                        }
                        default_seen = true;
                        if arm.capture.is_some() {
                            bail!("default arm of match on `{}` in `{at}` cannot capture", m.var);
                        }
                    }
                    Some(key) => {
                        if !keys.insert(key) {
                            bail!("match on `{}` in `{at}` repeats arm key `{key}`", m.var);
                        }
                    }
                }
                check_block(ns_name, ns, at, &arm.code)?;
            }
            Ok(())
        }
        StmtOrBlock::BlockPlaceholder(p) => {
            bail!("block placeholder {} survived construction in `{at}`", p.idx)
        }
    }
}
