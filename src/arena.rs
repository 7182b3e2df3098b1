//! Arena allocation for AST nodes and declaration-table entries.
//!
//! §5: all allocation is arena-based, one compiler-wide arena; nothing is
//! individually freed, and every cross-reference (an `&'a Expr<'a>`, a
//! `&'a [NamedTypeExpr<'a>]`, ...) stays valid for as long as the arena
//! does. `bumpalo` is the teacher crate's own bump allocator; this module
//! is a thin wrapper that gives call sites the handful of allocation
//! shapes the parser actually needs instead of exposing `Bump` directly.

use bumpalo::Bump;
use bumpalo::collections::Vec as BumpVec;

/// Owns every AST node and type-expression node for one compilation.
pub struct Arena {
  bump: Bump,
}

impl Arena {
  #[must_use] pub fn new() -> Self { Self { bump: Bump::new() } }

  /// Allocate a single value, returning a reference with the arena's
  /// lifetime.
  pub fn alloc<T>(&self, val: T) -> &T { self.bump.alloc(val) }

  /// Allocate a slice by copying an iterator's worth of values in.
  pub fn alloc_slice<T>(&self, items: impl IntoIterator<Item = T>) -> &[T] {
    let mut v = BumpVec::new_in(&self.bump);
    v.extend(items);
    v.into_bump_slice()
  }
}

impl Default for Arena {
  fn default() -> Self { Self::new() }
}
