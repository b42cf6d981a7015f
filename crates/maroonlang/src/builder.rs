//! The stateful IR construction engine.
//!
//! The builder consumes an ordered stream of declaration events matching
//! the lexical nesting of the source: explicit `enter_*` / `leave_*` pairs
//! for the scoped constructs, plain methods for the leaves, and delimited
//! sub-builder closures for `if_stmt` and `match_enum` arms. Any scope or
//! ordering violation aborts the build with an error.

use crate::ir::*;
use anyhow::{bail, Result};
use std::collections::BTreeMap;

#[derive(Default)]
pub struct Builder {
    program: Program,

    cur_ns: Option<String>,
    cur_type: Option<String>,
    cur_fiber: Option<String>,
    cur_fn: Option<String>,

    /// Blocks of the current function still under construction, innermost
    /// last.
    fn_blocks: Vec<Block>,
    /// For each open nested block: its placeholder id and the index of the
    /// placeholder in the parent block's code list.
    placeholders: Vec<(u32, usize)>,
    next_placeholder: u32,

    /// namespace -> inner type -> first line that required the optional
    /// wrapper.
    optionals: BTreeMap<String, BTreeMap<String, u32>>,
}

impl Builder {
    pub fn new() -> Self {
        Builder::default()
    }

    pub fn set_source(&mut self, src: &str) {
        self.program.src = Some(src.to_string());
    }

    // --- namespaces ---

    pub fn enter_namespace(&mut self, name: &str, line: u32) -> Result<()> {
        if self.cur_ns.is_some() {
            bail!("namespace `{name}` opened while another namespace is still open");
        }
        if self.program.maroon.contains_key(name) {
            bail!("namespace `{name}` is defined more than once");
        }
        self.program.maroon.insert(
            name.to_string(),
            Namespace {
                line,
                fibers: BTreeMap::new(),
                types: BTreeMap::new(),
            },
        );
        self.cur_ns = Some(name.to_string());
        Ok(())
    }

    pub fn leave_namespace(&mut self) -> Result<()> {
        if self.cur_type.is_some() || self.cur_fiber.is_some() {
            bail!("namespace closed while a type or fiber is still open");
        }
        if self.cur_ns.take().is_none() {
            bail!("namespace closed without a matching open");
        }
        Ok(())
    }

    // --- types ---

    pub fn enter_type(&mut self, name: &str, line: u32) -> Result<()> {
        self.open_type_decl(name, line, TypeDef::Struct(StructDef { fields: Vec::new() }))
    }

    pub fn enter_enum(&mut self, name: &str, line: u32) -> Result<()> {
        self.open_type_decl(name, line, TypeDef::Enum(EnumDef { cases: Vec::new() }))
    }

    fn open_type_decl(&mut self, name: &str, line: u32, def: TypeDef) -> Result<()> {
        let Some(ns) = self.cur_ns.clone() else {
            bail!("type `{name}` should be defined within some namespace");
        };
        if self.cur_type.is_some() {
            bail!("type `{name}` opened while another type is still open");
        }
        let types = &mut self.program.maroon.get_mut(&ns).unwrap().types;
        if types.contains_key(name) {
            bail!("type `{name}` is defined more than once in namespace `{ns}`");
        }
        types.insert(name.to_string(), TypeDecl { line, def });
        self.cur_type = Some(name.to_string());
        Ok(())
    }

    pub fn leave_type(&mut self) -> Result<()> {
        if self.cur_type.take().is_none() {
            bail!("type closed without a matching open");
        }
        Ok(())
    }

    pub fn field(&mut self, name: &str, ty: &str, line: u32) -> Result<()> {
        let ty = self.rewrite_optional_type(ty, line)?;
        let decl = self.cur_type_decl("field", name)?;
        match &mut decl.def {
            TypeDef::Struct(s) => {
                s.fields.push(StructField {
                    name: name.to_string(),
                    ty,
                });
                Ok(())
            }
            _ => bail!("field `{name}` is only legal inside a struct type"),
        }
    }

    pub fn case(&mut self, key: &str, ty: &str, line: u32) -> Result<()> {
        let ty = self.rewrite_optional_type(ty, line)?;
        let decl = self.cur_type_decl("case", key)?;
        match &mut decl.def {
            TypeDef::Enum(e) => {
                e.cases.push(EnumCase {
                    key: key.to_string(),
                    ty,
                });
                Ok(())
            }
            _ => bail!("case `{key}` is only legal inside an enum type"),
        }
    }

    fn cur_type_decl(&mut self, what: &str, name: &str) -> Result<&mut TypeDecl> {
        let (Some(ns), Some(ty)) = (self.cur_ns.clone(), self.cur_type.clone()) else {
            bail!("{what} `{name}` is only legal inside an open type");
        };
        Ok(self
            .program
            .maroon
            .get_mut(&ns)
            .unwrap()
            .types
            .get_mut(&ty)
            .unwrap())
    }

    // --- fibers & functions ---

    pub fn enter_fiber(&mut self, name: &str, line: u32) -> Result<()> {
        let Some(ns) = self.cur_ns.clone() else {
            bail!("fiber `{name}` should be defined within some namespace");
        };
        if self.cur_fiber.is_some() {
            bail!("fiber `{name}` opened while another fiber is still open");
        }
        let fibers = &mut self.program.maroon.get_mut(&ns).unwrap().fibers;
        if fibers.contains_key(name) {
            bail!("fiber `{name}` is defined more than once in namespace `{ns}`");
        }
        fibers.insert(
            name.to_string(),
            Fiber {
                line,
                functions: BTreeMap::new(),
            },
        );
        self.cur_fiber = Some(name.to_string());
        Ok(())
    }

    pub fn leave_fiber(&mut self) -> Result<()> {
        if self.cur_fn.is_some() {
            bail!("fiber closed while a function is still open");
        }
        if self.cur_fiber.take().is_none() {
            bail!("fiber closed without a matching open");
        }
        Ok(())
    }

    pub fn enter_fn(&mut self, name: &str, ret: Option<&str>, line: u32) -> Result<()> {
        let (Some(ns), Some(fiber)) = (self.cur_ns.clone(), self.cur_fiber.clone()) else {
            bail!("function `{name}` should be defined within some fiber");
        };
        if !self.fn_blocks.is_empty() || self.cur_fn.is_some() {
            bail!("function `{name}` opened while another function is still open");
        }
        let functions = &mut self
            .program
            .maroon
            .get_mut(&ns)
            .unwrap()
            .fibers
            .get_mut(&fiber)
            .unwrap()
            .functions;
        if functions.contains_key(name) {
            bail!("function `{name}` is defined more than once in fiber `{fiber}` of namespace `{ns}`");
        }
        functions.insert(
            name.to_string(),
            Function {
                line,
                ret: ret.map(str::to_string),
                args: Vec::new(),
                body: Block::default(),
            },
        );
        self.cur_fn = Some(name.to_string());
        self.fn_blocks.push(Block {
            line,
            ..Block::default()
        });
        Ok(())
    }

    pub fn leave_fn(&mut self) -> Result<()> {
        let Some(name) = self.cur_fn.take() else {
            bail!("function closed without a matching open");
        };
        if self.fn_blocks.len() != 1 {
            bail!("should be at exactly one block depth at the end of function `{name}`");
        }
        let body = self.fn_blocks.pop().unwrap();
        self.cur_function_mut(&name)?.body = body;
        Ok(())
    }

    fn cur_function_mut(&mut self, name: &str) -> Result<&mut Function> {
        let (Some(ns), Some(fiber)) = (self.cur_ns.clone(), self.cur_fiber.clone()) else {
            bail!("no function is open");
        };
        Ok(self
            .program
            .maroon
            .get_mut(&ns)
            .unwrap()
            .fibers
            .get_mut(&fiber)
            .unwrap()
            .functions
            .get_mut(name)
            .unwrap())
    }

    fn in_function(&self) -> bool {
        !self.fn_blocks.is_empty()
    }

    // --- function-body leaves ---

    pub fn stmt(&mut self, stmt: &str, line: u32) -> Result<()> {
        if !self.in_function() {
            bail!("a statement is only legal inside a function");
        }
        self.add_to_block(StmtOrBlock::Stmt(Stmt {
            line,
            stmt: stmt.to_string(),
        }));
        Ok(())
    }

    pub fn var(&mut self, name: &str, ty: &str, init: &str, line: u32) -> Result<()> {
        if !self.in_function() {
            bail!("var `{name}` is only legal inside a function");
        }
        let ty = self.rewrite_optional_type(ty, line)?;
        // `VAR(x, T, (a + b))` carries one protective parenthesis layer.
        let init = if init.len() >= 2 && init.starts_with('(') && init.ends_with(')') {
            &init[1..init.len() - 1]
        } else {
            init
        };
        self.fn_blocks.last_mut().unwrap().vars.push(Var::Regular(RegularVar {
            line,
            name: name.to_string(),
            ty,
            init: init.to_string(),
        }));
        Ok(())
    }

    pub fn arg(&mut self, name: &str, ty: &str, line: u32) -> Result<()> {
        if !self.in_function() {
            bail!("argument `{name}` is only legal inside a function");
        }
        let f = self.cur_fn.clone().unwrap();
        self.cur_function_mut(&f)?.args.push(ty.to_string());
        self.fn_blocks
            .last_mut()
            .unwrap()
            .vars
            .push(Var::Argument(ArgumentVar {
                line,
                name: name.to_string(),
                ty: ty.to_string(),
            }));
        Ok(())
    }

    // --- nested blocks ---

    pub fn enter_block(&mut self, line: u32) -> Result<()> {
        if !self.in_function() {
            bail!("a block is only legal inside a function");
        }
        self.next_placeholder += 1;
        let key = self.next_placeholder;
        let idx = self.add_to_block(StmtOrBlock::BlockPlaceholder(BlockPlaceholder {
            line,
            idx: key,
        }));
        self.placeholders.push((key, idx));
        self.fn_blocks.push(Block::default());
        Ok(())
    }

    pub fn leave_block(&mut self) -> Result<()> {
        let Some((key, idx)) = self.placeholders.pop() else {
            bail!("block closed with no block open");
        };
        if self.fn_blocks.len() < 2 {
            bail!("block close would pop the function body itself");
        }
        let mut block = self.fn_blocks.pop().unwrap();
        let parent = self.fn_blocks.last_mut().unwrap();
        if idx >= parent.code.len() {
            bail!("completed block's placeholder slot is out of range");
        }
        match &parent.code[idx] {
            StmtOrBlock::BlockPlaceholder(p) if p.idx == key => {
                block.line = p.line;
            }
            StmtOrBlock::BlockPlaceholder(_) => {
                bail!("completed block does not match its placeholder id");
            }
            _ => bail!("completed block's slot no longer holds a placeholder"),
        }
        parent.code[idx] = StmtOrBlock::Block(block);
        Ok(())
    }

    fn add_to_block(&mut self, item: StmtOrBlock) -> usize {
        let code = &mut self.fn_blocks.last_mut().unwrap().code;
        code.push(item);
        code.len() - 1
    }

    fn extract_last(&mut self) -> StmtOrBlock {
        self.fn_blocks.last_mut().unwrap().code.pop().unwrap()
    }

    /// Runs a delimited sub-builder and verifies it appended exactly one
    /// statement-like unit to the current block.
    fn one_unit(
        &mut self,
        what: &str,
        f: impl FnOnce(&mut Builder) -> Result<()>,
    ) -> Result<StmtOrBlock> {
        let before = self.fn_blocks.last().unwrap().code.len();
        let depth = self.fn_blocks.len();
        f(self)?;
        if self.fn_blocks.len() != depth {
            bail!("{what} left a block open");
        }
        let after = self.fn_blocks.last().unwrap().code.len();
        if after != before + 1 {
            bail!(
                "{what} must emit exactly one statement or block, emitted {}",
                after as i64 - before as i64
            );
        }
        Ok(self.extract_last())
    }

    // --- conditionals ---

    pub fn if_stmt(
        &mut self,
        cond: &str,
        line: u32,
        yes: impl FnOnce(&mut Builder) -> Result<()>,
        no: impl FnOnce(&mut Builder) -> Result<()>,
    ) -> Result<()> {
        if !self.in_function() {
            bail!("a conditional is only legal inside a function");
        }
        let yes = self.one_unit("the then-branch of a conditional", yes)?;
        let no = self.one_unit("the else-branch of a conditional", no)?;
        self.add_to_block(StmtOrBlock::If(If {
            line,
            cond: cond.to_string(),
            yes: Box::new(yes),
            no: Box::new(no),
        }));
        Ok(())
    }

    // --- enum matches ---

    pub fn match_enum(
        &mut self,
        var: &str,
        line: u32,
        build: impl FnOnce(&mut ArmsBuilder<'_>) -> Result<()>,
    ) -> Result<()> {
        if !self.in_function() {
            bail!("a match is only legal inside a function");
        }
        // Arm bodies are built in a scratch block so they cannot disturb
        // the surrounding code list.
        self.fn_blocks.push(Block::default());
        let mut arms = ArmsBuilder {
            builder: self,
            var: var.to_string(),
            arms: Vec::new(),
        };
        let result = build(&mut arms);
        let ArmsBuilder {
            arms: arms_list, ..
        } = arms;
        let scratch = self.fn_blocks.pop().unwrap();
        result?;
        if !scratch.code.is_empty() {
            bail!("match arms left {} unconsumed statement(s) behind", scratch.code.len());
        }
        self.add_to_block(StmtOrBlock::MatchEnum(MatchEnum {
            line,
            var: var.to_string(),
            arms: arms_list,
        }));
        Ok(())
    }

    // --- test cases ---

    pub fn test_run_fiber(&mut self, maroon: &str, fiber: &str, golden: &[&str], line: u32) {
        self.program.tests.push(TestCase::RunFiber(RunFiber {
            line,
            maroon: maroon.to_string(),
            fiber: fiber.to_string(),
            golden_output: golden.iter().map(|s| s.to_string()).collect(),
        }));
    }

    pub fn test_fiber_should_throw(&mut self, maroon: &str, fiber: &str, error: &str, line: u32) {
        self.program.tests.push(TestCase::FiberShouldThrow(FiberShouldThrow {
            line,
            maroon: maroon.to_string(),
            fiber: fiber.to_string(),
            error: error.to_string(),
        }));
    }

    // --- optional-type synthesis ---

    fn rewrite_optional_type(&mut self, ty: &str, line: u32) -> Result<String> {
        let Some(inner) = ty.strip_prefix("OPTIONAL<").and_then(|t| t.strip_suffix('>')) else {
            return Ok(ty.to_string());
        };
        let Some(ns) = self.cur_ns.clone() else {
            bail!("optional type `{ty}` used outside of any namespace");
        };
        self.optionals
            .entry(ns)
            .or_default()
            .entry(inner.to_string())
            .or_insert(line);
        Ok(format!("OPTIONAL_{inner}"))
    }

    /// Installs the derived optional types and hands the finished IR out.
    /// Consuming the builder is what makes "finalize at most once" hold.
    pub fn finalize(mut self) -> Result<Program> {
        if self.cur_ns.is_some()
            || self.cur_type.is_some()
            || self.cur_fiber.is_some()
            || self.cur_fn.is_some()
            || !self.fn_blocks.is_empty()
            || !self.placeholders.is_empty()
        {
            bail!("finalize called with unclosed scopes");
        }
        for (ns, inners) in std::mem::take(&mut self.optionals) {
            let types = &mut self.program.maroon.get_mut(&ns).unwrap().types;
            for (inner, line) in inners {
                let name = format!("OPTIONAL_{inner}");
                if types.contains_key(&name) {
                    bail!("type `{name}` should not be defined explicitly");
                }
                types.insert(
                    name,
                    TypeDecl {
                        line,
                        def: TypeDef::Optional(OptionalDef { ty: inner }),
                    },
                );
            }
        }
        Ok(self.program)
    }
}

/// Delimited builder for the arms of one `match_enum`.
pub struct ArmsBuilder<'a> {
    builder: &'a mut Builder,
    var: String,
    arms: Vec<Arm>,
}

impl ArmsBuilder<'_> {
    pub fn arm(
        &mut self,
        key: &str,
        line: u32,
        body: impl FnOnce(&mut Builder) -> Result<()>,
    ) -> Result<()> {
        self.push_arm(Some(key), None, line, body)
    }

    pub fn arm_capture(
        &mut self,
        key: &str,
        capture: &str,
        line: u32,
        body: impl FnOnce(&mut Builder) -> Result<()>,
    ) -> Result<()> {
        self.push_arm(Some(key), Some(capture), line, body)
    }

    pub fn default_arm(
        &mut self,
        line: u32,
        body: impl FnOnce(&mut Builder) -> Result<()>,
    ) -> Result<()> {
        self.push_arm(None, None, line, body)
    }

    fn push_arm(
        &mut self,
        key: Option<&str>,
        capture: Option<&str>,
        line: u32,
        body: impl FnOnce(&mut Builder) -> Result<()>,
    ) -> Result<()> {
        let unit = self.builder.one_unit("a match arm", body)?;
        let mut code = match unit {
            StmtOrBlock::Block(b) => b,
            other => Block {
                line,
                vars: Vec::new(),
                code: vec![other],
            },
        };
        if let Some(capture) = capture {
            let key = key.expect("capture arms always carry a key");
            code.vars.push(Var::CaptureAlias(CaptureAliasVar {
                name: capture.to_string(),
                key: key.to_string(),
                src: self.var.clone(),
            }));
        }
        self.arms.push(Arm {
            line,
            key: key.map(str::to_string),
            capture: capture.map(str::to_string),
            code,
        });
        Ok(())
    }
}
