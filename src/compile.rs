//! §2/§4.5 "Whole-program finalization": the driver that turns a parsed
//! [`Program`] into a linked ELF image.
//!
//! Four passes over the program, in this fixed order:
//! 1. Register every top-level declaration (structs and enums, then
//!    functions) — two passes so a function's signature can reference a
//!    struct declared later in the same file.
//! 2. Lay out every struct (§4.1 invariant (c), cycle detection).
//! 3. Compile every function body.
//! 4. Synthesize `syscall` if referenced but undefined, require `_start`,
//!    and hand its label to the back-end.

use log::{debug, info};

use crate::arena::Arena;
use crate::ast::{Program, TopLevel};
use crate::asm::Assembler;
use crate::decl::{self, Decls, LayoutState};
use crate::diag::{CResult, CompileError};
use crate::hoist::hoist_locals;
use crate::prototype;
use crate::symbol::{intern, Symbol};
use crate::translate::stmt::compile_stmt;
use crate::translate::FnCtx;
use crate::types::Type;

/// Run the whole pipeline, returning the linked ELF bytes.
pub fn compile_program<'a>(
  arena: &'a Arena, asm: &mut impl Assembler, program: &Program<'a>,
) -> CResult<Vec<u8>> {
  let mut decls = Decls::new();

  info!("registering top-level declarations");
  register_structs_and_enums(arena, &mut decls, asm, program)?;
  register_functions(&mut decls, asm, program)?;

  info!("laying out structs");
  layout_all_structs(&mut decls, asm, program)?;

  info!("compiling function bodies");
  compile_all_functions(&mut decls, asm, program)?;

  info!("finalizing");
  let entry = finalize(&mut decls, asm)?;

  debug!("writing out ELF image");
  Ok(asm.writeout(entry))
}

fn register_structs_and_enums<'a>(
  arena: &'a Arena, decls: &mut Decls<'a>, asm: &mut impl Assembler, program: &Program<'a>,
) -> CResult<()> {
  for top in &program.decls {
    match top {
      TopLevel::Struct(def) => decl::defstruct(decls, asm, *def)?,
      TopLevel::Enum(def) => {
        // Enum constant initializers are constant expressions; only
        // numeric literals and references to already-registered enum
        // constants are supported (no function calls, no variables — none
        // exist yet at this point in the pipeline anyway).
        decl::defenum(decls, asm, def.consts, |e| eval_const(decls, e))?;
      }
      TopLevel::Func(_) => {}
    }
  }
  let _ = arena;
  Ok(())
}

fn eval_const(decls: &Decls, e: &crate::ast::Expr) -> CResult<i64> {
  match &e.k {
    crate::ast::ExprKind::Num(n) | crate::ast::ExprKind::Char(n) => Ok(*n),
    crate::ast::ExprKind::Ident(name) => decls.get(*name, None)
      .and_then(|entry| entry.enum_const.as_ref())
      .map(|r| r.value)
      .ok_or_else(|| CompileError::at(e.span.clone(), "not a constant")),
    crate::ast::ExprKind::Neg(inner) => Ok(-eval_const(decls, inner)?),
    _ => Err(CompileError::at(e.span.clone(), "not a constant expression")),
  }
}

fn register_functions<'a>(
  decls: &mut Decls<'a>, asm: &mut impl Assembler, program: &Program<'a>,
) -> CResult<()> {
  for top in &program.decls {
    if let TopLevel::Func(def) = top {
      let ty = prototype::resolve(decls, &def.name_span, def.ret)?;
      let arg_tys: Vec<Type> = def.params.iter()
        .map(|p| prototype::resolve(decls, &p.name_span, p.ty))
        .collect::<CResult<_>>()?;
      let func_ty = Type::Func { ret: Box::new(ty), args: Type::arg_chain(&arg_tys) };
      decl::defextern(decls, asm, *def, func_ty)?;
    }
  }
  Ok(())
}

/// §4.1 invariant (c): lay out every struct, detecting cycles with the
/// standard white/grey/black DFS coloring.
fn layout_all_structs(decls: &mut Decls, asm: &mut impl Assembler, program: &Program) -> CResult<()> {
  let names: Vec<Symbol> = program.decls.iter()
    .filter_map(|t| if let TopLevel::Struct(d) = t { Some(d.name) } else { None })
    .collect();
  for name in names {
    layout_struct(decls, asm, name)?;
  }
  Ok(())
}

fn layout_struct(decls: &mut Decls, asm: &mut impl Assembler, name: Symbol) -> CResult<u64> {
  let (span, layout, members) = {
    let entry = decls.get(name, None).and_then(|e| e.struct_.as_ref())
      .ok_or_else(|| CompileError::fatal(format!("struct {name} not registered")))?;
    (entry.def.name_span.clone(), entry.layout, entry.def.members)
  };
  match layout {
    LayoutState::Done => return decls.struct_size(name),
    LayoutState::InProgress =>
      return Err(CompileError::at(span, "circular struct definition")),
    LayoutState::Unstarted => {}
  }
  decls.get_mut(name, None).unwrap().struct_.as_mut().unwrap().layout = LayoutState::InProgress;

  let mut offset = 0u64;
  for m in members {
    let ty = prototype::resolve(decls, &m.name_span, m.ty)?;
    if let Type::Struct(inner) = &ty {
      layout_struct(decls, asm, *inner)?;
    }
    let size = ty.sizeof(decls)?;
    let member_entry = decls.find_or_insert(asm, name, Some(m.name));
    if member_entry.member.is_some() {
      return Err(CompileError::at(m.name_span.clone(), "duplicate member"));
    }
    member_entry.member = Some(crate::decl::MemberRole { ty, offset });
    offset += size;
  }

  let entry = decls.get_mut(name, None).unwrap();
  let s = entry.struct_.as_mut().unwrap();
  s.size = offset;
  s.layout = LayoutState::Done;
  Ok(offset)
}

fn compile_all_functions<'a>(decls: &mut Decls<'a>, asm: &mut impl Assembler, program: &Program<'a>) -> CResult<()> {
  for top in &program.decls {
    let TopLevel::Func(def) = top else { continue };
    let Some(body) = def.body else { continue };
    debug!(target: "stackc::compile", "compiling function {}", def.name);

    let mut offset = 16u32;
    for p in def.params {
      let ty = prototype::resolve(decls, &p.name_span, p.ty)?;
      let entry = decls.find_or_insert(asm, def.name, Some(p.name));
      if entry.variable.is_some() {
        return Err(CompileError::at(p.name_span.clone(), "duplicate variable"));
      }
      entry.variable = Some(crate::decl::VariableRole { ty, offset: offset as i32 });
      offset += 8;
    }

    let frame_bytes = hoist_locals(decls, asm, def.name, body, 0)?;

    let entry = decls.get(def.name, None).unwrap();
    let func_label = entry.func_label;
    let is_entry = def.name.as_str() == "_start";
    let ret = entry.function.as_ref().unwrap().ty.clone();
    let ret = match ret {
      Type::Func { ret, .. } => *ret,
      _ => unreachable!("function role always holds a Func type"),
    };

    asm.emit_str(def.name.as_str().as_bytes());
    asm.fixup_label(func_label);
    asm.emit_preamble(frame_bytes, is_entry);

    let fctx = FnCtx { name: def.name, ret };
    compile_stmt(decls, asm, &fctx, None, body)?;

    asm.emit_num(0);
    asm.emit_ret();
  }
  Ok(())
}

/// §4.5: synthesize a trivial `syscall` wrapper if the program referenced
/// it but never supplied a body, then require `_start`.
fn finalize(decls: &mut Decls, asm: &mut impl Assembler) -> CResult<crate::asm::Label> {
  let syscall = intern("syscall");
  if let Some(entry) = decls.get(syscall, None) {
    let defined = entry.function.as_ref().is_some_and(|f| f.def.body.is_some());
    if !defined && !asm.is_fixed(entry.func_label) {
      let label = entry.func_label;
      asm.fixup_label(label);
      asm.emit_preamble(0, false);
      asm.emit_syscall();
      asm.emit_ret();
    }
  }

  let start = intern("_start");
  decls.get(start, None)
    .filter(|e| e.function.as_ref().is_some_and(|f| f.def.body.is_some()))
    .map(|e| e.func_label)
    .ok_or_else(|| CompileError::fatal("missing _start"))
}

