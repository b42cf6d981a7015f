//! Canonical serialization and equality modulo line numbers.
//!
//! Line numbers are diagnostics metadata; two programs are semantically
//! equal when their canonical JSON forms match after every `line` is
//! erased to `0`. Erasure is idempotent.

use crate::ir::*;
use anyhow::{Context, Result};

pub fn canonical_json(p: &Program) -> Result<String> {
    serde_json::to_string(p).context("serialize IR to canonical JSON")
}

pub fn canonical_json_no_lines(p: &Program) -> Result<String> {
    let mut scrubbed = p.clone();
    scrub_lines(&mut scrubbed);
    canonical_json(&scrubbed)
}

pub fn parse_json(s: &str) -> Result<Program> {
    serde_json::from_str(s).context("parse IR from JSON")
}

pub fn eq_modulo_lines(a: &Program, b: &Program) -> Result<bool> {
    Ok(canonical_json_no_lines(a)? == canonical_json_no_lines(b)?)
}

/// Erases every `line` field in the tree.
pub fn scrub_lines(p: &mut Program) {
    for ns in p.maroon.values_mut() {
        ns.line = 0;
        for t in ns.types.values_mut() {
            t.line = 0;
        }
        for fiber in ns.fibers.values_mut() {
            fiber.line = 0;
            for f in fiber.functions.values_mut() {
                f.line = 0;
                scrub_block(&mut f.body);
            }
        }
    }
    for t in &mut p.tests {
        match t {
            TestCase::RunFiber(t) => t.line = 0,
            TestCase::FiberShouldThrow(t) => t.line = 0,
        }
    }
}

fn scrub_block(b: &mut Block) {
    b.line = 0;
    for v in &mut b.vars {
        match v {
            Var::Regular(v) => v.line = 0,
            Var::Argument(v) => v.line = 0,
            Var::CaptureAlias(_) => {}
        }
    }
    for item in &mut b.code {
        scrub_item(item);
    }
}

fn scrub_item(item: &mut StmtOrBlock) {
    match item {
        StmtOrBlock::Stmt(s) => s.line = 0,
        StmtOrBlock::If(i) => {
            i.line = 0;
            scrub_item(&mut i.yes);
            scrub_item(&mut i.no);
        }
        StmtOrBlock::Block(b) => scrub_block(b),
        StmtOrBlock::MatchEnum(m) => {
            m.line = 0;
            for arm in &mut m.arms {
                arm.line = 0;
                scrub_block(&mut arm.code);
            }
        }
        StmtOrBlock::BlockPlaceholder(p) => p.line = 0,
    }
}
