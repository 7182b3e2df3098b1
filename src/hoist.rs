//! §4.4 Local hoister.
//!
//! A pre-pass over a function body, run before any code is emitted, that
//! discovers every local variable declaration and goto label and assigns
//! each local a negative frame offset.
//!
//! §4.4/§9 (resolved open question #1): conditional arms are walked for
//! their locals and labels, but the running offset does **not** carry
//! across arms, and does not advance the offset of the statement
//! sequence the `if` itself sits in — each arm restarts from the offset
//! the `if` was entered with. This is a deliberate language rule, not a
//! bug: **all locals in a function share one flat scope**, so two locals
//! with the same name anywhere in the function — including in sibling
//! `if`/`else` arms — collide as a duplicate-variable error, while
//! same-named locals in *disjoint* arms simply alias the same memory.
//! `loop` bodies are different: a loop's own hoist result *is* the
//! continuing offset, so locals declared inside a loop body do extend the
//! frame for whatever follows the loop.

use crate::ast::{Stmt, StmtKind};
use crate::asm::Assembler;
use crate::decl::{Decls, VariableRole};
use crate::diag::{CResult, CompileError};
use crate::prototype;
use crate::symbol::Symbol;

/// Walk `body`, registering locals and labels under `func_name`, and
/// return the total frame size (in bytes) consumed by locals.
pub fn hoist_locals<'a>(
  decls: &mut Decls<'a>, asm: &mut impl Assembler, func_name: Symbol,
  body: &'a Stmt<'a>, offset: u32,
) -> CResult<u32> {
  match &body.k {
    StmtKind::Cond(arms) => {
      for arm in *arms {
        hoist_locals(decls, asm, func_name, arm.body, offset)?;
      }
      Ok(offset)
    }
    StmtKind::Block(stmts) => {
      let mut offset = offset;
      for s in *stmts {
        offset = hoist_locals(decls, asm, func_name, s, offset)?;
      }
      Ok(offset)
    }
    StmtKind::Loop(inner) => hoist_locals(decls, asm, func_name, inner, offset),
    StmtKind::Label(name) => {
      let entry = decls.find_or_insert(asm, func_name, Some(*name));
      if entry.goto_defined {
        return Err(CompileError::at(body.span.clone(), "duplicate goto"));
      }
      entry.goto_defined = true;
      Ok(offset)
    }
    StmtKind::VarDecl(name, texpr) => {
      let ty = prototype::resolve(decls, &body.span, texpr)?;
      let size = ty.sizeof(decls)?;
      let entry = decls.find_or_insert(asm, func_name, Some(*name));
      if entry.variable.is_some() {
        return Err(CompileError::at(body.span.clone(), "duplicate variable"));
      }
      let offset = offset + u32::try_from(size).map_err(|_| CompileError::fatal("frame too large"))?;
      entry.variable = Some(VariableRole { ty, offset: -i32::try_from(offset).unwrap() });
      Ok(offset)
    }
    _ => Ok(offset),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::{Spanned, TypeExpr};
  use crate::backend::RecordingAssembler;
  use crate::diag::Span;
  use crate::symbol::intern;

  fn span() -> Span { Span { file: std::sync::Arc::new("<test>".into()), line: 1, col: 1 } }
  fn stmt(k: StmtKind<'static>) -> Stmt<'static> { Spanned { span: span(), k } }

  #[test]
  fn sequential_locals_accumulate() {
    let mut decls = Decls::new();
    let mut asm = RecordingAssembler::new();
    let f = intern("f");
    let x = stmt(StmtKind::VarDecl(intern("x"), &TypeExpr::Name(intern("int")))); // 8 bytes
    let y = stmt(StmtKind::VarDecl(intern("y"), &TypeExpr::Name(intern("byte")))); // 1 byte
    let block = stmt(StmtKind::Block(&[x, y]));
    let total = hoist_locals(&mut decls, &mut asm, f, &block, 0).unwrap();
    assert_eq!(total, 9);
    assert_eq!(decls.get(f, Some(intern("x"))).unwrap().variable.as_ref().unwrap().offset, -8);
    assert_eq!(decls.get(f, Some(intern("y"))).unwrap().variable.as_ref().unwrap().offset, -9);
  }

  #[test]
  fn sibling_if_arms_share_the_same_frame_region() {
    let mut decls = Decls::new();
    let mut asm = RecordingAssembler::new();
    let f = intern("f");
    let a = stmt(StmtKind::VarDecl(intern("a"), &TypeExpr::Name(intern("int"))));
    let b = stmt(StmtKind::VarDecl(intern("b"), &TypeExpr::Name(intern("int"))));
    let arm1 = crate::ast::CondArm { cond: None, body: &a };
    let arm2 = crate::ast::CondArm { cond: None, body: &b };
    let cond = stmt(StmtKind::Cond(&[arm1, arm2]));
    let total = hoist_locals(&mut decls, &mut asm, f, &cond, 0).unwrap();
    // Neither arm's declaration grows the enclosing offset.
    assert_eq!(total, 0);
    // Both land at the same offset: they alias.
    assert_eq!(decls.get(f, Some(intern("a"))).unwrap().variable.as_ref().unwrap().offset, -8);
    assert_eq!(decls.get(f, Some(intern("b"))).unwrap().variable.as_ref().unwrap().offset, -8);
  }

  #[test]
  fn loop_body_locals_extend_the_continuing_frame() {
    let mut decls = Decls::new();
    let mut asm = RecordingAssembler::new();
    let f = intern("f");
    let v = stmt(StmtKind::VarDecl(intern("v"), &TypeExpr::Name(intern("int"))));
    let lp = stmt(StmtKind::Loop(&v));
    let total = hoist_locals(&mut decls, &mut asm, f, &lp, 0).unwrap();
    assert_eq!(total, 8);
  }

  #[test]
  fn duplicate_label_is_an_error() {
    let mut decls = Decls::new();
    let mut asm = RecordingAssembler::new();
    let f = intern("f");
    let l1 = stmt(StmtKind::Label(intern("top")));
    let l2 = stmt(StmtKind::Label(intern("top")));
    let block = stmt(StmtKind::Block(&[l1, l2]));
    assert!(hoist_locals(&mut decls, &mut asm, f, &block, 0).is_err());
  }
}
