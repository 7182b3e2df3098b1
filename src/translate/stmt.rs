//! §4.5 statement translator.
//!
//! Unlike expressions, a statement leaves nothing on the operand stack:
//! an expression used as a statement is compiled then immediately popped.

use crate::asm::Assembler;
use crate::ast::{Stmt, StmtKind};
use crate::decl::Decls;
use crate::diag::{CResult, CompileError};
use crate::types;

use super::expr::compile_expr;
use super::{FnCtx, LoopLabels};

/// Compile `stmt`. `loop_labels` is the innermost enclosing loop's
/// break/continue targets, or `None` outside any loop.
pub fn compile_stmt<'a>(
  decls: &Decls<'a>, asm: &mut impl Assembler, fctx: &FnCtx, loop_labels: Option<LoopLabels>,
  stmt: &Stmt<'a>,
) -> CResult<()> {
  let span = &stmt.span;
  match &stmt.k {
    StmtKind::Block(stmts) => {
      for s in *stmts {
        compile_stmt(decls, asm, fctx, loop_labels, s)?;
      }
      Ok(())
    }
    StmtKind::Cond(arms) => {
      // Each arm with a condition branches past its body when false; a
      // trailing `else` (condition `None`) always runs. Every arm's body,
      // once entered, jumps past the rest of the chain.
      let out = asm.mklabel();
      for (i, arm) in arms.iter().enumerate() {
        let next = if i + 1 < arms.len() { Some(asm.mklabel()) } else { None };
        if let Some(cond) = arm.cond {
          let cty = compile_expr(decls, asm, fctx, cond, true)?;
          if !cty.is_prim() {
            return Err(CompileError::at(cond.span.clone(), "cond: not an int"));
          }
          let skip = next.unwrap_or(out);
          asm.emit_jz(skip);
        }
        compile_stmt(decls, asm, fctx, loop_labels, arm.body)?;
        asm.emit_jmp(out);
        if let Some(next) = next {
          asm.fixup_label(next);
        }
      }
      asm.fixup_label(out);
      Ok(())
    }
    StmtKind::Loop(body) => {
      let top = asm.mklabel();
      let out = asm.mklabel();
      asm.fixup_label(top);
      let labels = LoopLabels { top, out };
      compile_stmt(decls, asm, fctx, Some(labels), body)?;
      asm.emit_jmp(top);
      asm.fixup_label(out);
      Ok(())
    }
    StmtKind::Break => match loop_labels {
      Some(l) => { asm.emit_jmp(l.out); Ok(()) }
      None => Err(CompileError::at(span.clone(), "break outside loop")),
    },
    StmtKind::Continue => match loop_labels {
      Some(l) => { asm.emit_jmp(l.top); Ok(()) }
      None => Err(CompileError::at(span.clone(), "continue outside loop")),
    },
    StmtKind::Return(value) => {
      match (value, &fctx.ret) {
        (None, crate::types::Type::Void) => asm.emit_num(0),
        (None, _) => return Err(CompileError::at(span.clone(), "return: missing value")),
        // Checked before the expression is even compiled, matching the
        // original, which dies on a void function's `return e;` outright
        // rather than letting `unify` discover it after the fact.
        (Some(_), crate::types::Type::Void) =>
          return Err(CompileError::at(span.clone(), "returning a value in a void function")),
        (Some(e), ret) => {
          let ety = compile_expr(decls, asm, fctx, e, true)?;
          types::unify(span, ret, &ety)?;
        }
      }
      asm.emit_ret();
      Ok(())
    }
    StmtKind::Label(name) => {
      let entry = decls.get(fctx.name, Some(*name))
        .ok_or_else(|| CompileError::fatal("label missing from hoist pass"))?;
      asm.fixup_label(entry.goto_label);
      Ok(())
    }
    StmtKind::Goto(name) => {
      let entry = decls.get(fctx.name, Some(*name))
        .filter(|e| e.goto_defined)
        .ok_or_else(|| CompileError::at(span.clone(), "no such label"))?;
      asm.emit_jmp(entry.goto_label);
      Ok(())
    }
    // §4.4 already hoisted and allocated the frame slot; nothing to emit.
    StmtKind::VarDecl(..) => Ok(()),
    StmtKind::Expr(e) => {
      compile_expr(decls, asm, fctx, e, true)?;
      asm.emit_pop(1);
      Ok(())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::{CondArm, Expr, ExprKind, Spanned};
  use crate::backend::RecordingAssembler;
  use crate::diag::Span;
  use crate::symbol::intern;
  use crate::types::Type;

  fn span() -> Span { Span { file: std::sync::Arc::new("<test>".into()), line: 1, col: 1 } }
  fn stmt(k: StmtKind<'static>) -> Stmt<'static> { Spanned { span: span(), k } }
  fn num(n: i64) -> Expr<'static> { Spanned { span: span(), k: ExprKind::Num(n) } }
  fn fctx(ret: Type) -> FnCtx { FnCtx { name: intern("f"), ret } }

  #[test]
  fn return_void_rejects_a_value() {
    let decls = Decls::new();
    let mut asm = RecordingAssembler::new();
    let n = num(1);
    let s = stmt(StmtKind::Return(Some(&n)));
    assert!(compile_stmt(&decls, &mut asm, &fctx(Type::Void), None, &s).is_err());
  }

  #[test]
  fn return_void_with_no_value_is_ok() {
    let decls = Decls::new();
    let mut asm = RecordingAssembler::new();
    let s = stmt(StmtKind::Return(None));
    assert!(compile_stmt(&decls, &mut asm, &fctx(Type::Void), None, &s).is_ok());
  }

  #[test]
  fn break_outside_loop_is_an_error() {
    let decls = Decls::new();
    let mut asm = RecordingAssembler::new();
    let s = stmt(StmtKind::Break);
    assert!(compile_stmt(&decls, &mut asm, &fctx(Type::Void), None, &s).is_err());
  }

  #[test]
  fn continue_inside_loop_targets_the_top_label() {
    let decls = Decls::new();
    let mut asm = RecordingAssembler::new();
    let body = stmt(StmtKind::Continue);
    let lp = stmt(StmtKind::Loop(&body));
    assert!(compile_stmt(&decls, &mut asm, &fctx(Type::Void), None, &lp).is_ok());
  }

  #[test]
  fn cond_chain_with_trailing_else_compiles() {
    let decls = Decls::new();
    let mut asm = RecordingAssembler::new();
    let cond = num(1);
    let body1 = stmt(StmtKind::Break);
    let body2 = stmt(StmtKind::Continue);
    let arm1 = CondArm { cond: Some(&cond), body: &body1 };
    let arm2 = CondArm { cond: None, body: &body2 };
    let chain = stmt(StmtKind::Cond(&[arm1, arm2]));
    let lp = stmt(StmtKind::Loop(&chain));
    assert!(compile_stmt(&decls, &mut asm, &fctx(Type::Void), None, &lp).is_ok());
  }
}
