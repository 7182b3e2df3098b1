//! The abstract syntax tree produced by the parser and consumed by the
//! translator.
//!
//! The original implementation uses a single node record with an integer
//! `kind` tag and two generic children `a`/`b`; every node kind reuses `a`
//! and `b` for whatever it needs, which means the translator's dispatch
//! can never be checked for exhaustiveness and a node kind can easily be
//! asked for a child it doesn't have. This crate uses a tagged `enum` per
//! node shape instead, carrying only the fields that shape needs, so the
//! translator becomes ordinary exhaustive pattern matching.
//!
//! Everything is arena-allocated (see [`crate::arena`]); nodes borrow
//! `'a` from the arena and are never individually freed.

use crate::diag::Span;
use crate::symbol::Symbol;

/// A node together with the source location it came from.
#[derive(Debug, Clone, Copy)]
pub struct Spanned<T> {
  pub span: Span,
  pub k: T,
}

/// A type-expression, as written in source (`int`, `*T`, `func(args): ret`,
/// or a bare struct name). Resolved to a canonical [`crate::types::Type`]
/// by the prototype resolver; see §4.3.
#[derive(Debug, Clone)]
pub enum TypeExpr<'a> {
  /// A bare identifier: `int`, `byte`, `func`, or a struct name.
  Name(Symbol),
  /// `*T`
  Ptr(&'a TypeExpr<'a>),
  /// `func(args): ret`
  Func { args: &'a [TypeExpr<'a>], ret: &'a TypeExpr<'a> },
  /// Synthesized by the parser when a function declaration omits `: ret`.
  /// There is no spellable `void` keyword in source; this is the only
  /// way a `TypeExpr` denotes it.
  Void,
}

/// A formal parameter or struct member, as written in source: a name paired
/// with its type-expression.
#[derive(Debug, Clone, Copy)]
pub struct NamedTypeExpr<'a> {
  pub name: Symbol,
  pub name_span: Span,
  pub ty: &'a TypeExpr<'a>,
}

/// One arm of an enum declaration: `NAME` or `NAME = expr`.
#[derive(Debug, Clone, Copy)]
pub struct EnumConst<'a> {
  pub name: Symbol,
  pub span: Span,
  pub value: Option<&'a Expr<'a>>,
}

pub type Expr<'a> = Spanned<ExprKind<'a>>;

/// §4.5, expression translator dispatch table.
#[derive(Debug, Clone)]
pub enum ExprKind<'a> {
  Num(i64),
  Char(i64),
  Str(&'a [u8]),
  Ident(Symbol),
  Assign(&'a Expr<'a>, &'a Expr<'a>),
  Ref(&'a Expr<'a>),
  Deref(&'a Expr<'a>),
  Index(&'a Expr<'a>, &'a Expr<'a>),
  Dot(&'a Expr<'a>, Symbol),
  /// Callee plus actual arguments, in source (left-to-right) order. The
  /// original represents the argument list as a right-leaning cons cell
  /// (`N_EXPRLIST`) compiled tail-first; this crate keeps that evaluation
  /// order (last argument evaluated first, first argument ends on top of
  /// the operand stack) but represents the list itself as an ordinary
  /// slice rather than reifying the cons cell as its own AST node.
  Call(&'a Expr<'a>, &'a [Expr<'a>]),
  Sizeof(&'a Expr<'a>),
  Cast(&'a Expr<'a>, &'a TypeExpr<'a>),
  Pos(&'a Expr<'a>),
  Neg(&'a Expr<'a>),
  /// Bitwise complement (`~x`): a single opcode, no branching.
  BitNot(&'a Expr<'a>),
  /// Logical not (`!x`): synthesizes 0/1 from zero/nonzero via a branch,
  /// since there is no dedicated boolean-not opcode.
  LogicalNot(&'a Expr<'a>),
  Add(&'a Expr<'a>, &'a Expr<'a>),
  Sub(&'a Expr<'a>, &'a Expr<'a>),
  Mul(&'a Expr<'a>, &'a Expr<'a>),
  Div(&'a Expr<'a>, &'a Expr<'a>),
  Mod(&'a Expr<'a>, &'a Expr<'a>),
  Lsh(&'a Expr<'a>, &'a Expr<'a>),
  Rsh(&'a Expr<'a>, &'a Expr<'a>),
  BitAnd(&'a Expr<'a>, &'a Expr<'a>),
  BitOr(&'a Expr<'a>, &'a Expr<'a>),
  Xor(&'a Expr<'a>, &'a Expr<'a>),
  Lt(&'a Expr<'a>, &'a Expr<'a>),
  Gt(&'a Expr<'a>, &'a Expr<'a>),
  Le(&'a Expr<'a>, &'a Expr<'a>),
  Ge(&'a Expr<'a>, &'a Expr<'a>),
  Eq(&'a Expr<'a>, &'a Expr<'a>),
  Ne(&'a Expr<'a>, &'a Expr<'a>),
  /// `&&`, short-circuit.
  LogicalAnd(&'a Expr<'a>, &'a Expr<'a>),
  /// `||`, short-circuit.
  LogicalOr(&'a Expr<'a>, &'a Expr<'a>),
}

pub type Stmt<'a> = Spanned<StmtKind<'a>>;

/// One `if`/`else if`/`else` clause: an optional condition (absent only on
/// a trailing `else`) and the body to run when it is taken.
#[derive(Debug, Clone, Copy)]
pub struct CondArm<'a> {
  pub cond: Option<&'a Expr<'a>>,
  pub body: &'a Stmt<'a>,
}

/// §4.5, statement translator dispatch table.
#[derive(Debug, Clone)]
pub enum StmtKind<'a> {
  Block(&'a [Stmt<'a>]),
  /// An `if`/`else if`/`else` chain. §4.5: each arm's condition is tested
  /// in order; the first that is absent or true runs, then control jumps
  /// past the remaining arms.
  Cond(&'a [CondArm<'a>]),
  Loop(&'a Stmt<'a>),
  Break,
  Continue,
  Return(Option<&'a Expr<'a>>),
  Label(Symbol),
  Goto(Symbol),
  /// `var name: T;`. A no-op at statement-translation time: the hoister
  /// pre-pass (§4.4) already registered the variable and assigned its
  /// frame offset before any code was emitted.
  VarDecl(Symbol, &'a TypeExpr<'a>),
  /// Any other expression used as a statement: compiled for effect, then
  /// its result is popped and discarded.
  Expr(&'a Expr<'a>),
}

/// A function's formal parameters and, if it has one, its body.
#[derive(Debug, Clone, Copy)]
pub struct FuncDecl<'a> {
  pub name: Symbol,
  pub name_span: Span,
  pub params: &'a [NamedTypeExpr<'a>],
  pub ret: &'a TypeExpr<'a>,
  pub body: Option<&'a Stmt<'a>>,
}

/// `struct name { members }`.
#[derive(Debug, Clone, Copy)]
pub struct StructDecl<'a> {
  pub name: Symbol,
  pub name_span: Span,
  pub members: &'a [NamedTypeExpr<'a>],
}

/// `enum { NAME = expr, ... }`.
#[derive(Debug, Clone, Copy)]
pub struct EnumDecl<'a> {
  pub consts: &'a [EnumConst<'a>],
}

/// One top-level declaration.
#[derive(Debug, Clone, Copy)]
pub enum TopLevel<'a> {
  Struct(StructDecl<'a>),
  Enum(EnumDecl<'a>),
  Func(FuncDecl<'a>),
}

/// A whole program: every top-level declaration from every source file
/// given on the command line, in the order they were parsed (files are
/// read in argument order; declarations within a file keep source order).
pub struct Program<'a> {
  pub decls: Vec<TopLevel<'a>>,
}
