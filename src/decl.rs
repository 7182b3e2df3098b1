//! §3/§4.1 Declaration table: the single source of truth for name
//! resolution.
//!
//! The original is a hand-rolled binary search tree with parent pointers,
//! so that in-order traversal (`first`/`next`) doesn't need recursion or
//! an explicit stack. A `BTreeMap` gives the same deterministic,
//! allocation-free ordered iteration for free, so that's what this is
//! (§9, "Declaration polymorphism" / §11 design notes).
//!
//! Each key's entry can independently hold any subset of six roles
//! (function, struct, member, enum constant, variable, goto label) at
//! once — see [`DeclEntry`] — because identifier and call resolution (§4.5)
//! probe roles in a fixed priority order rather than assuming a name
//! plays at most one part.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::ast::{FuncDecl, StructDecl};
use crate::asm::{Assembler, Label};
use crate::diag::{CResult, CompileError, Span};
use crate::symbol::Symbol;
use crate::types::Type;

/// A declaration-table key: the owning name, and (only for struct
/// members) the member name.
pub type Key = (Symbol, Option<Symbol>);

/// Tri-state cycle-detection flag for struct layout (§4.1 invariant (c)).
/// The standard white/grey/black DFS coloring.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum LayoutState {
  #[default]
  Unstarted,
  InProgress,
  Done,
}

#[derive(Clone)]
pub struct FunctionRole<'a> {
  /// The declaration as parsed: parameter list and (if present) body.
  pub def: FuncDecl<'a>,
  pub ty: Type,
}

#[derive(Clone, Copy)]
pub struct StructRole<'a> {
  pub def: StructDecl<'a>,
  pub size: u64,
  pub layout: LayoutState,
}

#[derive(Clone)]
pub struct MemberRole {
  pub ty: Type,
  pub offset: u64,
}

#[derive(Clone, Copy)]
pub struct EnumRole {
  pub value: i64,
}

#[derive(Clone)]
pub struct VariableRole {
  pub ty: Type,
  /// Negative for a local, `>= 16` for a parameter (§4.1 invariant (d)).
  pub offset: i32,
}

/// One entry in the declaration table: everything that could be known
/// about the name (and, for member-keyed entries, the member) at this
/// key. `func_label`/`goto_label` are always present — pre-allocated the
/// moment the entry is created — independent of whether the function or
/// goto role ever actually gets occupied, mirroring the original's "cheap:
/// labels are just integer ids" rationale.
#[derive(Clone)]
pub struct DeclEntry<'a> {
  pub func_label: Label,
  pub goto_label: Label,
  pub function: Option<FunctionRole<'a>>,
  pub struct_: Option<StructRole<'a>>,
  pub member: Option<MemberRole>,
  pub enum_const: Option<EnumRole>,
  pub variable: Option<VariableRole>,
  pub goto_defined: bool,
}

impl<'a> DeclEntry<'a> {
  fn new(asm: &mut impl Assembler) -> Self {
    DeclEntry {
      func_label: asm.mklabel(),
      goto_label: asm.mklabel(),
      function: None,
      struct_: None,
      member: None,
      enum_const: None,
      variable: None,
      goto_defined: false,
    }
  }
}

/// The whole-program declaration table.
#[derive(Default)]
pub struct Decls<'a> {
  map: BTreeMap<Key, DeclEntry<'a>>,
}

impl<'a> Decls<'a> {
  #[must_use] pub fn new() -> Self { Self { map: BTreeMap::new() } }

  /// `find(..., make=false)`: look up without creating.
  #[must_use] pub fn get(&self, name: Symbol, member: Option<Symbol>) -> Option<&DeclEntry<'a>> {
    self.map.get(&(name, member))
  }

  #[must_use] pub fn get_mut(&mut self, name: Symbol, member: Option<Symbol>) -> Option<&mut DeclEntry<'a>> {
    self.map.get_mut(&(name, member))
  }

  /// `find(..., make=true)`: look up, inserting a fresh entry (with
  /// freshly minted, unfixed labels) if the key is absent.
  pub fn find_or_insert(
    &mut self, asm: &mut impl Assembler, name: Symbol, member: Option<Symbol>,
  ) -> &mut DeclEntry<'a> {
    self.map.entry((name, member)).or_insert_with(|| DeclEntry::new(asm))
  }

  /// Ordered iteration, used to visit every struct for layout and every
  /// function for emission (invariant #2: strictly increasing key order).
  pub fn iter(&self) -> impl Iterator<Item = (&Key, &DeclEntry<'a>)> { self.map.iter() }

  /// `first_decl`: the least key, if any.
  #[must_use] pub fn first(&self) -> Option<(&Key, &DeclEntry<'a>)> { self.map.iter().next() }

  /// `next_decl`: the least key strictly greater than `after`.
  #[must_use] pub fn next_after(&self, after: &Key) -> Option<(&Key, &DeclEntry<'a>)> {
    self.map.range((Bound::Excluded(after.clone()), Bound::Unbounded)).next()
  }

  /// The completed size of struct `name`. Fatal if layout hasn't reached
  /// `Done` (the driver always lays out every struct before compiling any
  /// function body, so this only fires on an internal ordering bug or an
  /// unresolved struct name slipping through the prototype resolver).
  pub fn struct_size(&self, name: Symbol) -> CResult<u64> {
    match self.get(name, None).and_then(|e| e.struct_.as_ref()) {
      Some(s) if s.layout == LayoutState::Done => Ok(s.size),
      _ => Err(CompileError::fatal(format!("struct {name} has not been laid out"))),
    }
  }
}

/// §4.1: register a function prototype (or definition, if `def.body` is
/// `Some`). Fatal if the function role is already occupied (duplicate
/// function/extern).
pub fn defextern<'a>(
  decls: &mut Decls<'a>, asm: &mut impl Assembler, def: FuncDecl<'a>, ty: Type,
) -> CResult<()> {
  let entry = decls.find_or_insert(asm, def.name, None);
  if entry.function.is_some() {
    return Err(CompileError::at(def.name_span.clone(), "duplicate function"));
  }
  entry.function = Some(FunctionRole { def, ty });
  Ok(())
}

/// §4.1: register a struct name (no members yet — those are filled in by
/// [`crate::hoist`]'s sibling, struct layout, in [`crate::compile`]).
/// `int`, `byte`, and `func` are reserved and may not be redefined.
pub fn defstruct<'a>(
  decls: &mut Decls<'a>, asm: &mut impl Assembler, def: StructDecl<'a>,
) -> CResult<()> {
  let reserved = ["int", "byte", "func"];
  if reserved.contains(&def.name.as_str()) {
    return Err(CompileError::at(def.name_span.clone(), "reserved word"));
  }
  let entry = decls.find_or_insert(asm, def.name, None);
  if entry.struct_.is_some() {
    return Err(CompileError::at(def.name_span.clone(), "duplicate struct"));
  }
  entry.struct_ = Some(StructRole { def, size: 0, layout: LayoutState::Unstarted });
  Ok(())
}

/// §4.1: register every constant of an `enum { ... }` block, with implicit
/// auto-increment from the previous constant's value (or the explicit
/// initializer when given), matching the original's single left-to-right
/// pass.
pub fn defenum<'a>(
  decls: &mut Decls<'a>, asm: &mut impl Assembler,
  consts: &[crate::ast::EnumConst<'a>],
  mut eval_const: impl FnMut(&crate::ast::Expr<'a>) -> CResult<i64>,
) -> CResult<()> {
  let mut next = 0i64;
  for c in consts {
    let entry = decls.find_or_insert(asm, c.name, None);
    if entry.enum_const.is_some() {
      return Err(CompileError::at(c.span.clone(), "duplicate enum"));
    }
    let value = match c.value {
      Some(e) => eval_const(e)?,
      None => next,
    };
    entry.enum_const = Some(EnumRole { value });
    next = value + 1;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::symbol::intern;
  use crate::backend::RecordingAssembler;

  fn span() -> Span {
    Span { file: std::sync::Arc::new("<test>".into()), line: 1, col: 1 }
  }

  fn func(name: Symbol) -> FuncDecl<'static> {
    FuncDecl { name, name_span: span(), params: &[], ret: &crate::ast::TypeExpr::Void, body: None }
  }

  #[test]
  fn duplicate_function_is_an_error() {
    let mut decls = Decls::new();
    let mut asm = RecordingAssembler::new();
    let name = intern("f");
    defextern(&mut decls, &mut asm, func(name), Type::Void).unwrap();
    let err = defextern(&mut decls, &mut asm, func(name), Type::Void).unwrap_err();
    assert!(err.to_string().contains("duplicate function"));
  }

  #[test]
  fn reserved_struct_names_are_rejected() {
    let mut decls = Decls::new();
    let mut asm = RecordingAssembler::new();
    let def = StructDecl { name: intern("int"), name_span: span(), members: &[] };
    assert!(defstruct(&mut decls, &mut asm, def).is_err());
  }

  #[test]
  fn iteration_order_is_sorted_by_key() {
    let mut decls = Decls::new();
    let mut asm = RecordingAssembler::new();
    for n in ["zeta", "alpha", "mu"] {
      defextern(&mut decls, &mut asm, func(intern(n)), Type::Void).unwrap();
    }
    let names: Vec<_> = decls.iter().map(|(k, _)| k.0.as_str()).collect();
    assert_eq!(names, vec!["alpha", "mu", "zeta"]);
  }

  #[test]
  fn enum_constants_auto_increment() {
    let mut decls = Decls::new();
    let mut asm = RecordingAssembler::new();
    let consts = [
      crate::ast::EnumConst { name: intern("A"), span: span(), value: None },
      crate::ast::EnumConst { name: intern("B"), span: span(), value: None },
    ];
    defenum(&mut decls, &mut asm, &consts, |_| unreachable!()).unwrap();
    assert_eq!(decls.get(intern("A"), None).unwrap().enum_const.unwrap().value, 0);
    assert_eq!(decls.get(intern("B"), None).unwrap().enum_const.unwrap().value, 1);
  }
}
