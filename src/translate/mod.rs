//! §4.5 Translator: the core's expression and statement walkers.
//!
//! Split into [`expr`] and [`stmt`] exactly as the original splits
//! `compile_expr`/`compile_stmt` — the two walkers call into each other
//! (an `if` condition is an expression, a block is a list of statements)
//! but are conceptually distinct passes over disjoint node kinds.

pub mod expr;
pub mod stmt;

use crate::asm::Label;
use crate::symbol::Symbol;
use crate::types::Type;

/// Per-function translation state threaded through both walkers: which
/// function we're compiling (for variable/goto lookups, keyed by this
/// name) and its return type (for `return` checking). `top`/`out` are
/// threaded separately by [`stmt`] since they change per-loop-nesting,
/// not per-function.
pub struct FnCtx {
  pub name: Symbol,
  pub ret: Type,
}

/// The innermost enclosing loop's labels, if any. `None` outside any loop
/// (so `break`/`continue` there is an error).
#[derive(Clone, Copy)]
pub struct LoopLabels {
  pub top: Label,
  pub out: Label,
}
