//! Gating conditions: a tiny, fixed expression language.
//!
//! ```text
//! expr    := "true" | "false" | call | ".VAR"
//! call    := fname "(" arg {"," arg} ")"
//! arg     := call | ".VAR" | "." | literal
//! literal := "true" | "false" | integer | "quoted string"
//! fname   := "eq" | "ne" | "and" | "or" | "not"
//! ```
//!
//! A bare `.VAR` at top level must resolve to a bool. `.` is the current
//! `{{range}}` element and only resolves inside a template loop.
//!
//! Blank conditions evaluate to `true`.

use std::fmt;

use crate::context::GenerationContext;
use crate::error::ConditionError;
use crate::types::Value;

// ---------------------------------------------------------------------------
// Lookup seam
// ---------------------------------------------------------------------------

/// Source of variable values for evaluation.
///
/// [`GenerationContext`] implements it directly; the template renderer wraps
/// the context to add the current loop element.
pub trait VariableLookup {
    fn lookup(&self, name: &str) -> Option<&Value>;

    /// The value `.` refers to, if any.
    fn dot(&self) -> Option<&Value> {
        None
    }
}

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

/// Built-in condition functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Eq,
    Ne,
    And,
    Or,
    Not,
}

impl Func {
    fn from_name(name: &str) -> Option<Func> {
        match name {
            "eq" => Some(Func::Eq),
            "ne" => Some(Func::Ne),
            "and" => Some(Func::And),
            "or" => Some(Func::Or),
            "not" => Some(Func::Not),
            _ => None,
        }
    }

    fn arity_ok(self, n: usize) -> bool {
        match self {
            Func::Eq | Func::Ne => n == 2,
            Func::And | Func::Or => n >= 2,
            Func::Not => n == 1,
        }
    }

    fn arity_desc(self) -> &'static str {
        match self {
            Func::Eq | Func::Ne => "exactly 2 arguments",
            Func::And | Func::Or => "at least 2 arguments",
            Func::Not => "exactly 1 argument",
        }
    }
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Func::Eq => "eq",
            Func::Ne => "ne",
            Func::And => "and",
            Func::Or => "or",
            Func::Not => "not",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    Dot,
    Call { func: Func, args: Vec<Expr> },
}

/// A parsed condition, keeping its source text for error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    source: String,
    root: Expr,
}

impl Condition {
    /// Parse a condition. Blank input yields a condition that is always true.
    pub fn parse(source: &str) -> Result<Condition, ConditionError> {
        if source.trim().is_empty() {
            return Ok(Condition::always());
        }
        let tokens = lex(source)?;
        let mut parser = Parser {
            source,
            tokens,
            pos: 0,
            depth: 0,
        };
        let root = parser.parse_arg()?;
        if let Some(tok) = parser.peek() {
            return Err(parser.error_at(tok.column, "unexpected trailing input"));
        }
        if let Expr::Literal(value) = &root {
            if value.as_bool().is_none() {
                return Err(parser.error_at(1, "a condition must be boolean"));
            }
        }
        Ok(Condition {
            source: source.to_string(),
            root,
        })
    }

    pub fn always() -> Condition {
        Condition {
            source: "true".to_string(),
            root: Expr::Literal(Value::Bool(true)),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.root
    }

    /// Variable names referenced anywhere in the expression, in first-seen order.
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_vars(&self.root, &mut out);
        out
    }

    /// Evaluate against `scope`. Pure: no I/O, no clock, no randomness.
    pub fn evaluate<L: VariableLookup + ?Sized>(&self, scope: &L) -> Result<bool, ConditionError> {
        let eval = Evaluator {
            source: &self.source,
            scope,
        };
        eval.eval_bool(&self.root)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn collect_vars<'a>(expr: &'a Expr, out: &mut Vec<&'a str>) {
    match expr {
        Expr::Var(name) => {
            if !out.contains(&name.as_str()) {
                out.push(name);
            }
        }
        Expr::Call { args, .. } => args.iter().for_each(|a| collect_vars(a, out)),
        Expr::Literal(_) | Expr::Dot => {}
    }
}

/// Parse and evaluate `expr` against `ctx` in one step.
pub fn evaluate(expr: &str, ctx: &GenerationContext) -> Result<bool, ConditionError> {
    Condition::parse(expr)?.evaluate(ctx)
}

/// Evaluate an entry's optional condition; absent means included.
pub fn evaluate_optional(
    expr: Option<&str>,
    ctx: &GenerationContext,
) -> Result<bool, ConditionError> {
    match expr {
        Some(expr) => evaluate(expr, ctx),
        None => Ok(true),
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Ident(String),
    Var(String),
    Dot,
    Str(String),
    Int(i64),
    LParen,
    RParen,
    Comma,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    /// 1-based character column.
    column: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn lex(source: &str) -> Result<Vec<Token>, ConditionError> {
    let malformed = |column: usize, message: String| ConditionError::Malformed {
        expr: source.to_string(),
        column,
        message,
    };

    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let column = i + 1;
        match c {
            c if c.is_whitespace() => {
                i += 1;
            }
            '(' | ')' | ',' => {
                let kind = match c {
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    _ => TokenKind::Comma,
                };
                tokens.push(Token { kind, column });
                i += 1;
            }
            '.' => {
                let start = i + 1;
                let mut end = start;
                if end < chars.len() && is_ident_start(chars[end]) {
                    while end < chars.len() && is_ident_char(chars[end]) {
                        end += 1;
                    }
                    let name: String = chars[start..end].iter().collect();
                    tokens.push(Token {
                        kind: TokenKind::Var(name),
                        column,
                    });
                } else {
                    tokens.push(Token {
                        kind: TokenKind::Dot,
                        column,
                    });
                }
                i = end;
            }
            '"' => {
                let mut value = String::new();
                let mut j = i + 1;
                let mut closed = false;
                while j < chars.len() {
                    match chars[j] {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => {
                            let escaped = match chars.get(j + 1) {
                                Some('"') => '"',
                                Some('\\') => '\\',
                                Some('n') => '\n',
                                Some('t') => '\t',
                                other => {
                                    return Err(malformed(
                                        j + 1,
                                        format!("invalid escape sequence {other:?}"),
                                    ))
                                }
                            };
                            value.push(escaped);
                            j += 2;
                        }
                        ch => {
                            value.push(ch);
                            j += 1;
                        }
                    }
                }
                if !closed {
                    return Err(malformed(column, "unterminated string literal".into()));
                }
                tokens.push(Token {
                    kind: TokenKind::Str(value),
                    column,
                });
                i = j + 1;
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_ascii_digit() {
                    j += 1;
                }
                let text: String = chars[i..j].iter().collect();
                let n = text
                    .parse::<i64>()
                    .map_err(|_| malformed(column, format!("invalid integer '{text}'")))?;
                tokens.push(Token {
                    kind: TokenKind::Int(n),
                    column,
                });
                i = j;
            }
            c if is_ident_start(c) => {
                let mut j = i;
                while j < chars.len() && is_ident_char(chars[j]) {
                    j += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(chars[i..j].iter().collect()),
                    column,
                });
                i = j;
            }
            other => return Err(malformed(column, format!("unexpected character '{other}'"))),
        }
    }
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Deepest call nesting a condition may use.
pub const MAX_NESTING: usize = 64;

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn end_column(&self) -> usize {
        self.source.chars().count() + 1
    }

    fn error_at(&self, column: usize, message: impl Into<String>) -> ConditionError {
        ConditionError::Malformed {
            expr: self.source.to_string(),
            column,
            message: message.into(),
        }
    }

    fn parse_arg(&mut self) -> Result<Expr, ConditionError> {
        let Some(tok) = self.next() else {
            return Err(self.error_at(self.end_column(), "unexpected end of condition"));
        };
        match tok.kind {
            TokenKind::Var(name) => Ok(Expr::Var(name)),
            TokenKind::Dot => Ok(Expr::Dot),
            TokenKind::Str(s) => Ok(Expr::Literal(Value::String(s))),
            TokenKind::Int(n) => Ok(Expr::Literal(Value::Int(n))),
            TokenKind::Ident(name) if name == "true" => Ok(Expr::Literal(Value::Bool(true))),
            TokenKind::Ident(name) if name == "false" => Ok(Expr::Literal(Value::Bool(false))),
            TokenKind::Ident(name) => {
                let func = Func::from_name(&name).ok_or_else(|| {
                    self.error_at(tok.column, format!("unknown function '{name}'"))
                })?;
                if self.depth >= MAX_NESTING {
                    return Err(self.error_at(
                        tok.column,
                        format!("calls nested deeper than {MAX_NESTING} levels"),
                    ));
                }
                self.depth += 1;
                let call = self.parse_call(func, tok.column);
                self.depth -= 1;
                call
            }
            TokenKind::LParen | TokenKind::RParen | TokenKind::Comma => {
                Err(self.error_at(tok.column, "expected a value or function call"))
            }
        }
    }

    fn parse_call(&mut self, func: Func, column: usize) -> Result<Expr, ConditionError> {
        match self.next() {
            Some(Token {
                kind: TokenKind::LParen,
                ..
            }) => {}
            Some(tok) => {
                return Err(self.error_at(tok.column, format!("expected '(' after '{func}'")))
            }
            None => {
                return Err(
                    self.error_at(self.end_column(), format!("expected '(' after '{func}'"))
                )
            }
        }

        let mut args = vec![self.parse_arg()?];
        loop {
            match self.next() {
                Some(Token {
                    kind: TokenKind::Comma,
                    ..
                }) => args.push(self.parse_arg()?),
                Some(Token {
                    kind: TokenKind::RParen,
                    ..
                }) => break,
                Some(tok) => return Err(self.error_at(tok.column, "expected ',' or ')'")),
                None => return Err(self.error_at(self.end_column(), "unclosed '('")),
            }
        }

        if !func.arity_ok(args.len()) {
            return Err(self.error_at(
                column,
                format!("'{func}' takes {}, got {}", func.arity_desc(), args.len()),
            ));
        }
        Ok(Expr::Call { func, args })
    }
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

struct Evaluator<'a, L: ?Sized> {
    source: &'a str,
    scope: &'a L,
}

impl<L: VariableLookup + ?Sized> Evaluator<'_, L> {
    fn eval_value(&self, expr: &Expr) -> Result<Value, ConditionError> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Var(name) => self.scope.lookup(name).cloned().ok_or_else(|| {
                ConditionError::UnknownVariable {
                    name: name.clone(),
                    expr: self.source.to_string(),
                }
            }),
            Expr::Dot => self
                .scope
                .dot()
                .cloned()
                .ok_or_else(|| ConditionError::UnknownVariable {
                    name: String::new(),
                    expr: self.source.to_string(),
                }),
            Expr::Call { func, args } => self.eval_call(*func, args).map(Value::Bool),
        }
    }

    fn eval_bool(&self, expr: &Expr) -> Result<bool, ConditionError> {
        let value = self.eval_value(expr)?;
        value.as_bool().ok_or_else(|| ConditionError::NotBoolean {
            expr: self.source.to_string(),
            message: format!("expected a bool, got {} '{value}'", value.var_type()),
        })
    }

    fn eval_call(&self, func: Func, args: &[Expr]) -> Result<bool, ConditionError> {
        match func {
            // Values of different types are simply unequal.
            Func::Eq => Ok(self.eval_value(&args[0])? == self.eval_value(&args[1])?),
            Func::Ne => Ok(self.eval_value(&args[0])? != self.eval_value(&args[1])?),
            Func::And => {
                for arg in args {
                    if !self.eval_bool(arg)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Func::Or => {
                for arg in args {
                    if self.eval_bool(arg)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Func::Not => Ok(!self.eval_bool(&args[0])?),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
