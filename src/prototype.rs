//! §4.3 Prototype resolver: turns a [`TypeExpr`] as written in source into
//! a canonical [`Type`], resolving struct names through the declaration
//! table.

use crate::ast::TypeExpr;
use crate::decl::Decls;
use crate::diag::{CResult, CompileError, Span};
use crate::types::Type;

/// Resolve a type-expression. `span` is used for diagnostics and should
/// point at the type-expression itself (or the enclosing declaration, for
/// the synthesized `Void` case).
pub fn resolve(decls: &Decls, span: &Span, texpr: &TypeExpr) -> CResult<Type> {
  match texpr {
    TypeExpr::Void => Ok(Type::Void),
    TypeExpr::Ptr(inner) => Ok(Type::ptr(resolve(decls, span, inner)?)),
    TypeExpr::Func { args, ret } => {
      let arg_tys: Vec<Type> =
        args.iter().map(|a| resolve(decls, span, a)).collect::<CResult<_>>()?;
      let ret_ty = resolve(decls, span, ret)?;
      Ok(Type::Func { ret: Box::new(ret_ty), args: Type::arg_chain(&arg_tys) })
    }
    TypeExpr::Name(name) => match name.as_str() {
      "int" => Ok(Type::Int),
      "byte" => Ok(Type::Byte),
      "func" => Err(CompileError::at(span.clone(), "incomplete function type")),
      _ => {
        if decls.get(*name, None).is_some_and(|e| e.struct_.is_some()) {
          Ok(Type::Struct(*name))
        } else {
          Err(CompileError::at(span.clone(), format!("unknown type {name}")))
        }
      }
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::RecordingAssembler;
  use crate::decl::defstruct;
  use crate::symbol::intern;

  fn span() -> Span { Span { file: std::sync::Arc::new("<test>".into()), line: 1, col: 1 } }

  #[test]
  fn builtins_resolve_without_a_declaration_table_entry() {
    let decls = Decls::new();
    assert_eq!(resolve(&decls, &span(), &TypeExpr::Name(intern("int"))).unwrap(), Type::Int);
    assert_eq!(resolve(&decls, &span(), &TypeExpr::Name(intern("byte"))).unwrap(), Type::Byte);
  }

  #[test]
  fn unknown_identifier_is_fatal() {
    let decls = Decls::new();
    assert!(resolve(&decls, &span(), &TypeExpr::Name(intern("nope"))).is_err());
  }

  #[test]
  fn struct_name_resolves_once_registered() {
    let mut decls = Decls::new();
    let mut asm = RecordingAssembler::new();
    let name = intern("pt");
    defstruct(&mut decls, &mut asm, crate::ast::StructDecl { name, name_span: span(), members: &[] }).unwrap();
    assert_eq!(resolve(&decls, &span(), &TypeExpr::Name(name)).unwrap(), Type::Struct(name));
  }

  #[test]
  fn pointer_and_func_types_recurse() {
    let decls = Decls::new();
    let ptr = TypeExpr::Ptr(&TypeExpr::Name(intern("byte")));
    assert_eq!(resolve(&decls, &span(), &ptr).unwrap(), Type::ptr(Type::Byte));

    let args = [TypeExpr::Name(intern("int"))];
    let func = TypeExpr::Func { args: &args, ret: &TypeExpr::Void };
    let ty = resolve(&decls, &span(), &func).unwrap();
    match ty {
      Type::Func { ret, args } => {
        assert_eq!(*ret, Type::Void);
        assert_eq!(crate::types::count_args(args.as_deref()), 1);
      }
      _ => panic!("expected func type"),
    }
  }
}
