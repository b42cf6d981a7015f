//! The micro expression grammar behind the IR's opaque statement strings.
//!
//! The IR preserves statement and condition texts verbatim; this module is
//! the downstream evaluator's view of them. Parsing happens once, at
//! lowering time, so a malformed statement fails the compile step rather
//! than the run.

use anyhow::{bail, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    U64Lit(u64),
    BoolLit(bool),
    /// Double-quoted literal; only meaningful as the argument of `DEBUG`.
    StrLit(String),
    /// The empty optional; only meaningful where a target type is known.
    NoneLit,
    Var(String),
    CtorU64(Box<Expr>),
    CtorBool(Box<Expr>),
    Bin(BinOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        }
    }
}

impl Expr {
    /// An approximate source rendition, used to name non-variable operands
    /// in type-mismatch diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Expr::U64Lit(v) => v.to_string(),
            Expr::BoolLit(v) => v.to_string(),
            Expr::StrLit(s) => format!("{s:?}"),
            Expr::NoneLit => "NONE".to_string(),
            Expr::Var(name) => name.clone(),
            Expr::CtorU64(e) => format!("U64({})", e.describe()),
            Expr::CtorBool(e) => format!("BOOL({})", e.describe()),
            Expr::Bin(op, a, b) => format!("{} {} {}", a.describe(), op.symbol(), b.describe()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
}

/// One parsed statement-string.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtOp {
    Debug(Expr),
    DebugExpr { text: String, expr: Expr },
    DebugDumpVars,
    DebugDumpStack,
    Return(Option<Expr>),
    Call {
        ret: Option<String>,
        f: String,
        args: Vec<Expr>,
    },
    Assign {
        name: String,
        op: AssignOp,
        expr: Expr,
    },
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Num(u64),
    Str(String),
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Star,
    EqEq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    Eof,
}

fn lex(src: &str) -> Result<Vec<Tok>> {
    let s = src.as_bytes();
    let mut toks = Vec::new();
    let mut i = 0usize;
    while i < s.len() {
        let b = s[i];
        match b {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'(' => {
                toks.push(Tok::LParen);
                i += 1;
            }
            b')' => {
                toks.push(Tok::RParen);
                i += 1;
            }
            b',' => {
                toks.push(Tok::Comma);
                i += 1;
            }
            b'+' => {
                if s.get(i + 1) == Some(&b'=') {
                    toks.push(Tok::PlusAssign);
                    i += 2;
                } else {
                    toks.push(Tok::Plus);
                    i += 1;
                }
            }
            b'-' => {
                if s.get(i + 1) == Some(&b'=') {
                    toks.push(Tok::MinusAssign);
                    i += 2;
                } else {
                    toks.push(Tok::Minus);
                    i += 1;
                }
            }
            b'*' => {
                if s.get(i + 1) == Some(&b'=') {
                    toks.push(Tok::StarAssign);
                    i += 2;
                } else {
                    toks.push(Tok::Star);
                    i += 1;
                }
            }
            b'=' => {
                if s.get(i + 1) == Some(&b'=') {
                    toks.push(Tok::EqEq);
                    i += 2;
                } else {
                    toks.push(Tok::Assign);
                    i += 1;
                }
            }
            b'!' => {
                if s.get(i + 1) == Some(&b'=') {
                    toks.push(Tok::Ne);
                    i += 2;
                } else {
                    bail!("unexpected `!` in `{src}`");
                }
            }
            b'<' => {
                if s.get(i + 1) == Some(&b'=') {
                    toks.push(Tok::Le);
                    i += 2;
                } else {
                    toks.push(Tok::Lt);
                    i += 1;
                }
            }
            b'>' => {
                if s.get(i + 1) == Some(&b'=') {
                    toks.push(Tok::Ge);
                    i += 2;
                } else {
                    toks.push(Tok::Gt);
                    i += 1;
                }
            }
            b'"' => {
                i += 1;
                let mut out = String::new();
                loop {
                    match s.get(i) {
                        None => bail!("unterminated string literal in `{src}`"),
                        Some(b'"') => {
                            i += 1;
                            break;
                        }
                        Some(b'\\') => {
                            match s.get(i + 1) {
                                Some(b'"') => out.push('"'),
                                Some(b'\\') => out.push('\\'),
                                Some(b'n') => out.push('\n'),
                                other => bail!("unsupported escape {other:?} in `{src}`"),
                            }
                            i += 2;
                        }
                        Some(&c) => {
                            out.push(c as char);
                            i += 1;
                        }
                    }
                }
                toks.push(Tok::Str(out));
            }
            b'0'..=b'9' => {
                let start = i;
                while matches!(s.get(i), Some(b'0'..=b'9')) {
                    i += 1;
                }
                let text = &src[start..i];
                match text.parse::<u64>() {
                    Ok(v) => toks.push(Tok::Num(v)),
                    Err(_) => bail!("integer literal `{text}` does not fit in 64 bits"),
                }
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                let start = i;
                while matches!(s.get(i), Some(b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_')) {
                    i += 1;
                }
                toks.push(Tok::Ident(src[start..i].to_string()));
            }
            other => bail!("unexpected byte `{}` in `{src}`", other as char),
        }
    }
    toks.push(Tok::Eof);
    Ok(toks)
}

struct Parser {
    toks: Vec<Tok>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Tok {
        &self.toks[self.pos]
    }

    fn peek2(&self) -> &Tok {
        self.toks.get(self.pos + 1).unwrap_or(&Tok::Eof)
    }

    fn bump(&mut self) -> Tok {
        let t = self.toks[self.pos].clone();
        if self.pos + 1 < self.toks.len() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, t: Tok) -> Result<()> {
        let got = self.bump();
        if got != t {
            bail!("expected {t:?}, got {got:?}");
        }
        Ok(())
    }

    fn expect_eof(&mut self) -> Result<()> {
        self.expect(Tok::Eof)
    }

    fn expr(&mut self) -> Result<Expr> {
        let lhs = self.additive()?;
        let op = match self.peek() {
            Tok::EqEq => BinOp::Eq,
            Tok::Ne => BinOp::Ne,
            Tok::Lt => BinOp::Lt,
            Tok::Le => BinOp::Le,
            Tok::Gt => BinOp::Gt,
            Tok::Ge => BinOp::Ge,
            _ => return Ok(lhs),
        };
        self.bump();
        let rhs = self.additive()?;
        Ok(Expr::Bin(op, Box::new(lhs), Box::new(rhs)))
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Tok::Plus => BinOp::Add,
                Tok::Minus => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.multiplicative()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.atom()?;
        while self.peek() == &Tok::Star {
            self.bump();
            let rhs = self.atom()?;
            lhs = Expr::Bin(BinOp::Mul, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn atom(&mut self) -> Result<Expr> {
        match self.bump() {
            Tok::Num(v) => Ok(Expr::U64Lit(v)),
            Tok::Str(s) => Ok(Expr::StrLit(s)),
            Tok::LParen => {
                let e = self.expr()?;
                self.expect(Tok::RParen)?;
                Ok(e)
            }
            Tok::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::BoolLit(true)),
                "false" => Ok(Expr::BoolLit(false)),
                "NONE" => Ok(Expr::NoneLit),
                "U64" | "BOOL" if self.peek() == &Tok::LParen => {
                    self.bump();
                    let inner = self.expr()?;
                    self.expect(Tok::RParen)?;
                    if name == "U64" {
                        Ok(Expr::CtorU64(Box::new(inner)))
                    } else {
                        Ok(Expr::CtorBool(Box::new(inner)))
                    }
                }
                _ => {
                    if self.peek() == &Tok::LParen {
                        bail!("`{name}` is not callable inside an expression");
                    }
                    Ok(Expr::Var(name))
                }
            },
            other => bail!("unexpected token {other:?} in expression"),
        }
    }

    fn call_args(&mut self) -> Result<Vec<Expr>> {
        self.expect(Tok::LParen)?;
        let mut args = Vec::new();
        if self.peek() == &Tok::RParen {
            self.bump();
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            match self.bump() {
                Tok::Comma => {}
                Tok::RParen => return Ok(args),
                other => bail!("expected `,` or `)` in argument list, got {other:?}"),
            }
        }
    }
}

pub fn parse_expr(src: &str) -> Result<Expr> {
    let mut p = Parser {
        toks: lex(src)?,
        pos: 0,
    };
    let e = p.expr()?;
    p.expect_eof()?;
    Ok(e)
}

pub fn parse_stmt(src: &str) -> Result<StmtOp> {
    let trimmed = src.trim();

    // `DEBUG_EXPR` keeps the verbatim inner text for the transcript, so it
    // is sliced out of the raw string before tokenization.
    if let Some(rest) = trimmed.strip_prefix("DEBUG_EXPR") {
        let rest = rest.trim_start();
        let Some(inner) = rest.strip_prefix('(').and_then(|r| r.strip_suffix(')')) else {
            bail!("malformed `DEBUG_EXPR` in `{src}`");
        };
        let text = inner.trim().to_string();
        let expr = parse_expr(&text)?;
        return Ok(StmtOp::DebugExpr { text, expr });
    }

    let mut p = Parser {
        toks: lex(trimmed)?,
        pos: 0,
    };

    if let Tok::Ident(head) = p.peek().clone() {
        match head.as_str() {
            "DEBUG" => {
                p.bump();
                p.expect(Tok::LParen)?;
                let e = p.expr()?;
                p.expect(Tok::RParen)?;
                p.expect_eof()?;
                return Ok(StmtOp::Debug(e));
            }
            "DEBUG_DUMP_VARS" => {
                p.bump();
                p.expect(Tok::LParen)?;
                p.expect(Tok::RParen)?;
                p.expect_eof()?;
                return Ok(StmtOp::DebugDumpVars);
            }
            "DEBUG_DUMP_STACK" => {
                p.bump();
                p.expect(Tok::LParen)?;
                p.expect(Tok::RParen)?;
                p.expect_eof()?;
                return Ok(StmtOp::DebugDumpStack);
            }
            "RETURN" => {
                p.bump();
                p.expect(Tok::LParen)?;
                if p.peek() == &Tok::RParen {
                    p.bump();
                    p.expect_eof()?;
                    return Ok(StmtOp::Return(None));
                }
                let e = p.expr()?;
                p.expect(Tok::RParen)?;
                p.expect_eof()?;
                return Ok(StmtOp::Return(Some(e)));
            }
            "CALL" => {
                p.bump();
                p.expect(Tok::LParen)?;
                let Tok::Ident(first) = p.bump() else {
                    bail!("`CALL` expects a function or variable name first in `{src}`");
                };
                p.expect(Tok::Comma)?;
                let (ret, f) = if p.peek() == &Tok::LParen {
                    (None, first)
                } else {
                    let Tok::Ident(f) = p.bump() else {
                        bail!("`CALL` expects a function name second in `{src}`");
                    };
                    p.expect(Tok::Comma)?;
                    (Some(first), f)
                };
                let args = p.call_args()?;
                p.expect(Tok::RParen)?;
                p.expect_eof()?;
                return Ok(StmtOp::Call { ret, f, args });
            }
            _ => {
                let op = match p.peek2() {
                    Tok::Assign => Some(AssignOp::Set),
                    Tok::PlusAssign => Some(AssignOp::Add),
                    Tok::MinusAssign => Some(AssignOp::Sub),
                    Tok::StarAssign => Some(AssignOp::Mul),
                    _ => None,
                };
                if let Some(op) = op {
                    p.bump();
                    p.bump();
                    let e = p.expr()?;
                    p.expect_eof()?;
                    return Ok(StmtOp::Assign { name: head, op, expr: e });
                }
            }
        }
    }

    let e = p.expr()?;
    p.expect_eof()?;
    Ok(StmtOp::Expr(e))
}
