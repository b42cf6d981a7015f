//! The IR schema: the contract between the builder front-end and the
//! back-ends (interpreter, diff tool, schema describers).
//!
//! Every structural node carries a `line` for diagnostics; semantic
//! equality ignores it (see `canon`). Maps are `BTreeMap` so the canonical
//! JSON form is deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level: one built program, its namespaces, and its declared tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Program {
    /// The source tag (the originating `.mrn` file, when known).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub src: Option<String>,
    pub maroon: BTreeMap<String, Namespace>,
    pub tests: Vec<TestCase>,
}

/// A namespace: fibers plus the types they share. The `global` fiber is
/// required; others are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    pub line: u32,
    pub fibers: BTreeMap<String, Fiber>,
    pub types: BTreeMap<String, TypeDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fiber {
    pub line: u32,
    pub functions: BTreeMap<String, Function>,
}

/// A function. `ret` absent means unit. `args` lists the argument type
/// names in order; the first `args.len()` vars of `body` are the
/// `Argument` vars carrying the argument names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ret: Option<String>,
    pub args: Vec<String>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub line: u32,
    pub def: TypeDef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeDef {
    Struct(StructDef),
    Enum(EnumDef),
    /// Derived, never user-written: synthesized by the builder for every
    /// `OPTIONAL<T>` usage at `finalize()` time.
    Optional(OptionalDef),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    pub fields: Vec<StructField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDef {
    pub cases: Vec<EnumCase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumCase {
    pub key: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionalDef {
    #[serde(rename = "type")]
    pub ty: String,
}

/// A lexical scope: the vars it owns plus the ordered code list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Block {
    pub line: u32,
    pub vars: Vec<Var>,
    pub code: Vec<StmtOrBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Var {
    Regular(RegularVar),
    Argument(ArgumentVar),
    CaptureAlias(CaptureAliasVar),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegularVar {
    pub line: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub init: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentVar {
    pub line: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// A match-arm capture: `name` aliases the payload of case `key` of the
/// discriminant variable `src`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureAliasVar {
    pub name: String,
    pub key: String,
    pub src: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtOrBlock {
    Stmt(Stmt),
    If(If),
    Block(Block),
    MatchEnum(MatchEnum),
    /// Transient construction marker; never present in a finalized IR.
    BlockPlaceholder(BlockPlaceholder),
}

/// One opaque "O(1)" unit of code to execute. The text is preserved
/// verbatim; downstream evaluators parse it themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub line: u32,
    pub stmt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct If {
    pub line: u32,
    pub cond: String,
    pub yes: Box<StmtOrBlock>,
    pub no: Box<StmtOrBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEnum {
    pub line: u32,
    pub var: String,
    pub arms: Vec<Arm>,
}

/// `key` absent means the default arm. `capture` may only be present when
/// `key` is; the capture name must reappear as a `CaptureAlias` var of
/// `code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arm {
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub capture: Option<String>,
    pub code: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockPlaceholder {
    pub line: u32,
    pub idx: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TestCase {
    RunFiber(RunFiber),
    FiberShouldThrow(FiberShouldThrow),
}

/// Running fiber `fiber` of namespace `maroon` must produce exactly these
/// transcript lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFiber {
    pub line: u32,
    pub maroon: String,
    pub fiber: String,
    pub golden_output: Vec<String>,
}

/// Running the fiber must fail with exactly this error message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiberShouldThrow {
    pub line: u32,
    pub maroon: String,
    pub fiber: String,
    pub error: String,
}

/// The base-type universe; everything else is declared or derived.
pub const BASE_TYPES: &[&str] = &["U64", "BOOL"];

pub fn is_base_type(name: &str) -> bool {
    BASE_TYPES.contains(&name)
}
