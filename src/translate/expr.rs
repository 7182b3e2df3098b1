//! §4.5 expression translator.
//!
//! Every expression leaves exactly one value on the operand stack.
//! `rhs=true` is value context (rexpr); `rhs=false` is address context
//! (lexpr) — a node kind that cannot produce an address returns an error
//! when asked for one in lexpr position. The synthesized type is this
//! function's return value rather than a mutable field stamped onto the
//! AST node (the original's `n.t`): Rust's AST nodes are plain,
//! arena-owned data with no interior mutability, and the recursive
//! walker already has the type in hand the moment it's computed.

use crate::asm::{Assembler, BinOp};
use crate::ast::{Expr, ExprKind};
use crate::decl::Decls;
use crate::diag::{CResult, CompileError, Span};
use crate::types::{self, Type};

use super::FnCtx;

/// Compile `expr`. Returns the expression's synthesized type.
pub fn compile_expr<'a>(
  decls: &Decls<'a>, asm: &mut impl Assembler, fctx: &FnCtx, expr: &Expr<'a>, rhs: bool,
) -> CResult<Type> {
  let span = &expr.span;
  match &expr.k {
    ExprKind::Num(n) | ExprKind::Char(n) => {
      require_rhs(span, rhs, "num/char")?;
      asm.emit_num(*n);
      Ok(Type::Int)
    }
    ExprKind::Str(bytes) => {
      require_rhs(span, rhs, "str")?;
      asm.emit_str(bytes);
      Ok(Type::ptr(Type::Byte))
    }
    ExprKind::Ident(name) => compile_ident(decls, asm, fctx, span, *name, rhs),
    ExprKind::Assign(lhs, rhs_expr) => {
      require_rhs(span, rhs, "assign")?;
      let rty = compile_expr(decls, asm, fctx, rhs_expr, true)?;
      let lty = compile_expr(decls, asm, fctx, lhs, false)?;
      types::unify(span, &lty, &rty)?;
      asm.emit_store(&lty);
      Ok(lty)
    }
    ExprKind::Ref(inner) => {
      require_rhs(span, rhs, "ref")?;
      let ity = compile_expr(decls, asm, fctx, inner, false)?;
      Ok(Type::ptr(ity))
    }
    ExprKind::Deref(inner) => {
      let ity = compile_expr(decls, asm, fctx, inner, true)?;
      let Type::Ptr(pointee) = ity else {
        return Err(CompileError::at(span.clone(), "deref not a pointer"));
      };
      if rhs { asm.emit_load(&pointee) }
      Ok(*pointee)
    }
    ExprKind::Index(base, idx) => {
      let bty = compile_expr(decls, asm, fctx, base, true)?;
      let ity = compile_expr(decls, asm, fctx, idx, true)?;
      let Type::Ptr(pointee) = bty else {
        return Err(CompileError::at(span.clone(), "not a pointer"));
      };
      if !ity.is_int() {
        return Err(CompileError::at(span.clone(), "index: not an int"));
      }
      let elem_size = if *pointee == Type::Byte { 1 } else { pointee.sizeof(decls)? };
      asm.emit_num(elem_size as i64);
      asm.emit_binop(BinOp::Mul);
      asm.emit_binop(BinOp::Add);
      if rhs { asm.emit_load(&pointee) }
      Ok(*pointee)
    }
    ExprKind::Dot(base, member) => {
      // §4.5: the base is always compiled in address context; if it
      // turns out to be a pointer-to-struct, its *value* (the pointer) is
      // then loaded before the member offset is added, whereas a
      // struct-by-value base's address is used directly.
      let bty = compile_expr(decls, asm, fctx, base, false)?;
      let struct_name = match &bty {
        Type::Ptr(pointee) => {
          let Type::Struct(name) = **pointee else {
            return Err(CompileError::at(span.clone(), "dot not a struct"));
          };
          asm.emit_load(&bty);
          name
        }
        Type::Struct(name) => *name,
        _ => return Err(CompileError::at(span.clone(), "dot not a struct")),
      };
      let entry = decls.get(struct_name, Some(*member))
        .filter(|e| e.member.is_some())
        .ok_or_else(|| CompileError::at(span.clone(), "no such member"))?;
      let m = entry.member.clone().unwrap();
      asm.emit_num(m.offset as i64);
      asm.emit_binop(BinOp::Add);
      if rhs { asm.emit_load(&m.ty) }
      Ok(m.ty)
    }
    ExprKind::Call(callee, args) => compile_call(decls, asm, fctx, span, callee, args, rhs),
    ExprKind::Sizeof(inner) => {
      require_rhs(span, rhs, "sizeof")?;
      // The operand is compiled but jumped over, so it has no runtime
      // effect: `sizeof` can be applied to an expression with side
      // effects without ever running them (invariant #8).
      let out = asm.mklabel();
      asm.emit_jmp(out);
      let ity = compile_expr(decls, asm, fctx, inner, false)?;
      asm.fixup_label(out);
      let size = if ity == Type::Byte { 1 } else { ity.sizeof(decls)? };
      asm.emit_num(size as i64);
      Ok(Type::Int)
    }
    ExprKind::Cast(inner, texpr) => {
      require_rhs(span, rhs, "cast")?;
      let ity = compile_expr(decls, asm, fctx, inner, true)?;
      if !ity.is_prim() {
        return Err(CompileError::at(span.clone(), "not a primitive"));
      }
      crate::prototype::resolve(decls, span, texpr)
    }
    ExprKind::Pos(inner) => {
      require_rhs(span, rhs, "pos")?;
      let ity = compile_expr(decls, asm, fctx, inner, true)?;
      if !ity.is_int() {
        return Err(CompileError::at(span.clone(), "pos: not an int"));
      }
      Ok(ity)
    }
    ExprKind::Neg(inner) => {
      require_rhs(span, rhs, "neg")?;
      let ity = compile_expr(decls, asm, fctx, inner, true)?;
      asm.emit_neg();
      if !ity.is_int() {
        return Err(CompileError::at(span.clone(), "neg: not an int"));
      }
      Ok(ity)
    }
    ExprKind::BitNot(inner) => {
      require_rhs(span, rhs, "bitwise not")?;
      let ity = compile_expr(decls, asm, fctx, inner, true)?;
      asm.emit_not();
      if !ity.is_int() {
        return Err(CompileError::at(span.clone(), "not: not an int"));
      }
      Ok(ity)
    }
    ExprKind::LogicalNot(inner) => {
      require_rhs(span, rhs, "logical not")?;
      let no = asm.mklabel();
      let out = asm.mklabel();
      let ity = compile_expr(decls, asm, fctx, inner, true)?;
      asm.emit_jz(no);
      asm.emit_num(0);
      asm.emit_jmp(out);
      asm.fixup_label(no);
      asm.emit_num(1);
      asm.fixup_label(out);
      if !ity.is_prim() {
        return Err(CompileError::at(span.clone(), "not a prim"));
      }
      Ok(Type::Int)
    }
    ExprKind::LogicalOr(lhs, rhs_expr) => {
      require_rhs(span, rhs, "logical or")?;
      let no1 = asm.mklabel();
      let out = asm.mklabel();
      let lty = compile_expr(decls, asm, fctx, lhs, true)?;
      asm.emit_jz(no1);
      asm.emit_num(1);
      asm.emit_jmp(out);
      asm.fixup_label(no1);
      let no2 = asm.mklabel();
      let rty = compile_expr(decls, asm, fctx, rhs_expr, true)?;
      asm.emit_jz(no2);
      asm.emit_num(1);
      asm.emit_jmp(out);
      asm.fixup_label(no2);
      asm.emit_num(0);
      asm.fixup_label(out);
      require_both_prim(span, &lty, &rty)?;
      Ok(Type::Int)
    }
    ExprKind::LogicalAnd(lhs, rhs_expr) => {
      require_rhs(span, rhs, "logical and")?;
      let no = asm.mklabel();
      let out = asm.mklabel();
      let lty = compile_expr(decls, asm, fctx, lhs, true)?;
      asm.emit_jz(no);
      let rty = compile_expr(decls, asm, fctx, rhs_expr, true)?;
      asm.emit_jz(no);
      asm.emit_num(1);
      asm.emit_jmp(out);
      asm.fixup_label(no);
      asm.emit_num(0);
      asm.fixup_label(out);
      require_both_prim(span, &lty, &rty)?;
      Ok(Type::Int)
    }
    ExprKind::Add(l, r) => binop(decls, asm, fctx, span, l, r, rhs, BinOp::Add, Check::Int, "add"),
    ExprKind::Sub(l, r) => binop(decls, asm, fctx, span, l, r, rhs, BinOp::Sub, Check::Int, "sub"),
    ExprKind::Mul(l, r) => binop(decls, asm, fctx, span, l, r, rhs, BinOp::Mul, Check::Int, "mul"),
    ExprKind::Div(l, r) => binop(decls, asm, fctx, span, l, r, rhs, BinOp::Div, Check::Int, "div"),
    ExprKind::Mod(l, r) => binop(decls, asm, fctx, span, l, r, rhs, BinOp::Mod, Check::Int, "mod"),
    ExprKind::Lsh(l, r) => binop(decls, asm, fctx, span, l, r, rhs, BinOp::Lsh, Check::Int, "lsh"),
    ExprKind::Rsh(l, r) => binop(decls, asm, fctx, span, l, r, rhs, BinOp::Rsh, Check::Int, "rsh"),
    ExprKind::BitAnd(l, r) => binop(decls, asm, fctx, span, l, r, rhs, BinOp::BitAnd, Check::Int, "and"),
    ExprKind::BitOr(l, r) => binop(decls, asm, fctx, span, l, r, rhs, BinOp::BitOr, Check::Int, "or"),
    ExprKind::Xor(l, r) => binop(decls, asm, fctx, span, l, r, rhs, BinOp::Xor, Check::Int, "xor"),
    ExprKind::Lt(l, r) => binop(decls, asm, fctx, span, l, r, rhs, BinOp::Lt, Check::Prim, "lt"),
    ExprKind::Gt(l, r) => binop(decls, asm, fctx, span, l, r, rhs, BinOp::Gt, Check::Prim, "gt"),
    ExprKind::Le(l, r) => binop(decls, asm, fctx, span, l, r, rhs, BinOp::Le, Check::Prim, "le"),
    ExprKind::Ge(l, r) => binop(decls, asm, fctx, span, l, r, rhs, BinOp::Ge, Check::Prim, "ge"),
    ExprKind::Eq(l, r) => binop(decls, asm, fctx, span, l, r, rhs, BinOp::Eq, Check::Prim, "eq"),
    ExprKind::Ne(l, r) => binop(decls, asm, fctx, span, l, r, rhs, BinOp::Ne, Check::Prim, "ne"),
  }
}

fn require_rhs(span: &Span, rhs: bool, what: &str) -> CResult<()> {
  if rhs { Ok(()) } else { Err(CompileError::at(span.clone(), format!("{what} is not an lexpr"))) }
}

fn require_both_prim(span: &Span, a: &Type, b: &Type) -> CResult<()> {
  if !a.is_prim() || !b.is_prim() {
    return Err(CompileError::at(span.clone(), "not an prim"));
  }
  Ok(())
}

enum Check { Int, Prim }

#[allow(clippy::too_many_arguments)]
fn binop<'a>(
  decls: &Decls<'a>, asm: &mut impl Assembler, fctx: &FnCtx, span: &Span,
  lhs: &Expr<'a>, rhs_expr: &Expr<'a>, rhs: bool, op: BinOp, check: Check, name: &str,
) -> CResult<Type> {
  require_rhs(span, rhs, "not lexpr")?;
  // §4.5 evaluation order: the right operand is compiled first, then the
  // left, so the left ends up on top of the operand stack.
  let rty = compile_expr(decls, asm, fctx, rhs_expr, true)?;
  let lty = compile_expr(decls, asm, fctx, lhs, true)?;
  asm.emit_binop(op);
  types::unify(span, &lty, &rty)?;
  let ok = match check {
    Check::Int => lty.is_int(),
    Check::Prim => lty.is_prim(),
  };
  if !ok {
    return Err(CompileError::at(span.clone(), format!("{name}: not an int")));
  }
  Ok(lty)
}

fn compile_ident<'a>(
  decls: &Decls<'a>, asm: &mut impl Assembler, fctx: &FnCtx, span: &Span, name: crate::symbol::Symbol,
  rhs: bool,
) -> CResult<Type> {
  if let Some(e) = decls.get(name, None).and_then(|e| e.enum_const) {
    asm.emit_num(e.value);
    return Ok(Type::Int);
  }
  if let Some(v) = decls.get(fctx.name, Some(name)).and_then(|e| e.variable.clone()) {
    asm.emit_lea(v.offset);
    if rhs { asm.emit_load(&v.ty) }
    return Ok(v.ty);
  }
  if let Some(f) = decls.get(name, None).and_then(|e| e.function.as_ref().map(|f| f.ty.clone())) {
    asm.emit_ptr(decls.get(name, None).unwrap().func_label);
    return Ok(f);
  }
  Err(CompileError::at(span.clone(), "no such variable"))
}

#[allow(clippy::too_many_arguments)]
fn compile_call<'a>(
  decls: &Decls<'a>, asm: &mut impl Assembler, fctx: &FnCtx, span: &Span,
  callee: &Expr<'a>, args: &[Expr<'a>], rhs: bool,
) -> CResult<Type> {
  require_rhs(span, rhs, "call")?;

  // §4.5: arguments are compiled before the callee, in reverse order
  // (last argument first), so the first argument ends up on top of the
  // stack. This is the Rust-native replacement for the original's
  // tail-first recursion over a right-leaning `EXPRLIST` cons cell.
  let mut arg_tys = Vec::with_capacity(args.len());
  for a in args.iter().rev() {
    arg_tys.push(compile_expr(decls, asm, fctx, a, true)?);
  }
  arg_tys.reverse();

  let callee_ty = if let ExprKind::Ident(name) = &callee.k {
    if decls.get(*name, None).is_some_and(|e| e.enum_const.is_some()) {
      return Err(CompileError::at(span.clone(), "type error"));
    }
    if let Some(v) = decls.get(fctx.name, Some(*name)).and_then(|e| e.variable.clone()) {
      asm.emit_lea(v.offset);
      asm.emit_load(&v.ty);
      let argc = types::count_args(match &v.ty {
        Type::Func { args, .. } => args.as_deref(),
        _ => None,
      });
      asm.emit_call(argc);
      v.ty
    } else {
      let entry = decls.get(*name, None)
        .filter(|e| e.function.is_some())
        .ok_or_else(|| CompileError::at(span.clone(), "no such function"))?;
      let ty = entry.function.as_ref().unwrap().ty.clone();
      let argc = types::count_args(match &ty {
        Type::Func { args, .. } => args.as_deref(),
        _ => None,
      });
      asm.emit_lcall(entry.func_label, argc);
      ty
    }
  } else {
    let ty = compile_expr(decls, asm, fctx, callee, true)?;
    let argc = types::count_args(match &ty {
      Type::Func { args, .. } => args.as_deref(),
      _ => None,
    });
    asm.emit_call(argc);
    ty
  };

  let Type::Func { ret, args: formal } = callee_ty else {
    return Err(CompileError::at(span.clone(), "calling not a function"));
  };
  types::unify_args(span, formal.as_deref(), Type::arg_chain(&arg_tys).as_deref())?;
  Ok(*ret)
}
