//! §4.2 Type system: construction, structural equality ("unification"),
//! primitiveness/integerness tests, and sizes.

use crate::decl::Decls;
use crate::diag::{CResult, Span};
use crate::symbol::Symbol;

/// A type value. Equality is structural (`#[derive(PartialEq)]`): two
/// `Type`s compare equal exactly when they describe the same shape, which
/// is all [`unify`] needs — no interning, no canonicalization pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
  Void,
  Byte,
  Int,
  Ptr(Box<Type>),
  /// Pinned to a struct name; resolved against the declaration table only
  /// when its size or members are needed, not at construction time.
  Struct(Symbol),
  Func { ret: Box<Type>, args: Option<Box<Type>> },
  /// A right-leaning cons cell over an argument list: `Arg(this, rest)`.
  /// `rest` is `None` at the last argument.
  Arg(Box<Type>, Option<Box<Type>>),
}

impl Type {
  #[must_use] pub fn ptr(inner: Type) -> Type { Type::Ptr(Box::new(inner)) }

  /// Build the right-leaning `Arg` chain for a list of argument types, in
  /// left-to-right (declaration) order. `None` for an empty list.
  #[must_use] pub fn arg_chain(tys: &[Type]) -> Option<Box<Type>> {
    let mut chain = None;
    for ty in tys.iter().rev() {
      chain = Some(Box::new(Type::Arg(Box::new(ty.clone()), chain)));
    }
    chain
  }

  /// `type_isprim`: true for `byte` and `int`.
  #[must_use] pub fn is_prim(&self) -> bool { matches!(self, Type::Byte | Type::Int) }

  /// `type_isint`: true for `byte`, `int`, and any pointer (pointers
  /// participate in integer arithmetic, e.g. `p + 1`).
  #[must_use] pub fn is_int(&self) -> bool { matches!(self, Type::Byte | Type::Int | Type::Ptr(_)) }

  /// `type_sizeof`. On a struct, demands that struct has completed layout
  /// (layout always runs, for every registered struct, before any
  /// function body is compiled — see [`crate::compile::compile_program`]).
  pub fn sizeof(&self, decls: &Decls) -> CResult<u64> {
    Ok(match self {
      Type::Void => 0,
      Type::Byte => 1,
      Type::Int | Type::Ptr(_) | Type::Func { .. } => 8,
      Type::Struct(name) => decls.struct_size(*name)?,
      Type::Arg(..) => return Err(crate::diag::CompileError::fatal(
        "sizeof applied to an argument-list pseudo-type")),
    })
  }
}

/// `unify` for a required (non-nullable) type. Mismatch is fatal, reported
/// at `span`.
pub fn unify(span: &Span, a: &Type, b: &Type) -> CResult<()> {
  let ok = match (a, b) {
    (Type::Void, Type::Void) | (Type::Byte, Type::Byte) | (Type::Int, Type::Int) => true,
    (Type::Ptr(pa), Type::Ptr(pb)) => return unify(span, pa, pb),
    (Type::Struct(sa), Type::Struct(sb)) => sa == sb,
    (Type::Func { ret: ra, args: aa }, Type::Func { ret: rb, args: ab }) => {
      unify(span, ra, rb)?;
      return unify_args(span, aa.as_deref(), ab.as_deref());
    }
    (Type::Arg(ha, ta), Type::Arg(hb, tb)) => {
      unify(span, ha, hb)?;
      return unify_args(span, ta.as_deref(), tb.as_deref());
    }
    _ => false,
  };
  if ok { Ok(()) } else {
    Err(crate::diag::CompileError::at(span.clone(), format!("type error: {a:?} vs {b:?}")))
  }
}

/// `unify` specialized to a (possibly absent) argument-chain: `None`
/// unifies only with `None` ("no arguments" on both sides).
pub fn unify_args(span: &Span, a: Option<&Type>, b: Option<&Type>) -> CResult<()> {
  match (a, b) {
    (None, None) => Ok(()),
    (Some(a), Some(b)) => unify(span, a, b),
    _ => Err(crate::diag::CompileError::at(span.clone(), "wrong number of arguments")),
  }
}

/// Walk an `Arg` chain's type list, counting its elements. Used by the
/// translator to pass an argument count down to `emit_call`/`emit_lcall`.
#[must_use] pub fn count_args(mut chain: Option<&Type>) -> u32 {
  let mut n = 0;
  while let Some(Type::Arg(_, rest)) = chain {
    n += 1;
    chain = rest.as_deref();
  }
  n
}

#[cfg(test)]
mod tests {
  use super::*;

  fn span() -> Span {
    Span { file: std::sync::Arc::new("<test>".into()), line: 1, col: 1 }
  }

  #[test]
  fn unify_is_reflexive_on_primitives() {
    assert!(unify(&span(), &Type::Int, &Type::Int).is_ok());
    assert!(unify(&span(), &Type::Byte, &Type::Byte).is_ok());
  }

  #[test]
  fn unify_rejects_mismatched_kinds() {
    assert!(unify(&span(), &Type::Int, &Type::Byte).is_err());
  }

  #[test]
  fn unify_recurses_through_pointers() {
    let a = Type::ptr(Type::Int);
    let b = Type::ptr(Type::Int);
    assert!(unify(&span(), &a, &b).is_ok());
    let c = Type::ptr(Type::Byte);
    assert!(unify(&span(), &a, &c).is_err());
  }

  #[test]
  fn empty_arg_chains_unify_but_not_against_nonempty() {
    assert!(unify_args(&span(), None, None).is_ok());
    let chain = Type::arg_chain(&[Type::Int]);
    assert!(unify_args(&span(), None, chain.as_deref()).is_err());
  }

  #[test]
  fn arg_chain_preserves_order_and_count() {
    let chain = Type::arg_chain(&[Type::Int, Type::Byte, Type::ptr(Type::Int)]);
    assert_eq!(count_args(chain.as_deref()), 3);
    match chain.as_deref() {
      Some(Type::Arg(h, rest)) => {
        assert_eq!(**h, Type::Int);
        match rest.as_deref() {
          Some(Type::Arg(h2, _)) => assert_eq!(**h2, Type::Byte),
          _ => panic!("expected second arg"),
        }
      }
      _ => panic!("expected arg chain"),
    }
  }
}
