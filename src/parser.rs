//! Recursive-descent parser producing an [`ast::Program`].
//!
//! One token of lookahead throughout; no Pratt table, just one function
//! per precedence level, lowest to highest: assignment, `||`, `&&`, `|`,
//! `^`, `&`, equality, relational, shift, additive, multiplicative, cast,
//! unary, postfix, primary.

use std::sync::Arc;

use crate::arena::Arena;
use crate::ast::{
  CondArm, EnumConst, EnumDecl, Expr, ExprKind, FuncDecl, NamedTypeExpr, Spanned, Stmt, StmtKind,
  StructDecl, TopLevel, TypeExpr,
};
use crate::diag::{CResult, CompileError, Span};
use crate::lexer::{Lexer, TokKind, Token};
use crate::symbol::Symbol;

pub struct Parser<'s, 'a> {
  lexer: Lexer<'s>,
  cur: Token,
  arena: &'a Arena,
}

impl<'s, 'a> Parser<'s, 'a> {
  fn new(arena: &'a Arena, mut lexer: Lexer<'s>) -> CResult<Self> {
    let cur = lexer.next()?;
    Ok(Parser { lexer, cur, arena })
  }

  fn bump(&mut self) -> CResult<Token> {
    let next = self.lexer.next()?;
    Ok(std::mem::replace(&mut self.cur, next))
  }

  fn at(&self, kind: TokKind) -> bool { self.cur.kind == kind }

  fn expect(&mut self, kind: TokKind, what: &str) -> CResult<Token> {
    if self.cur.kind != kind {
      return Err(CompileError::at(self.cur.span.clone(), format!("expected {what}")));
    }
    self.bump()
  }

  fn eat(&mut self, kind: TokKind) -> CResult<bool> {
    if self.cur.kind == kind { self.bump()?; Ok(true) } else { Ok(false) }
  }

  fn ident(&mut self, what: &str) -> CResult<(Symbol, Span)> {
    if self.cur.kind != TokKind::Ident {
      return Err(CompileError::at(self.cur.span.clone(), format!("expected {what}")));
    }
    let t = self.bump()?;
    Ok((t.sym.unwrap(), t.span))
  }

  /// True if the current identifier's text equals `kw` (a keyword is just
  /// an ordinary identifier token the parser recognizes contextually).
  fn at_kw(&self, kw: &str) -> bool {
    self.cur.kind == TokKind::Ident && self.cur.sym.is_some_and(|s| s.as_str() == kw)
  }

  fn eat_kw(&mut self, kw: &str) -> CResult<bool> {
    if self.at_kw(kw) { self.bump()?; Ok(true) } else { Ok(false) }
  }

  // ---- top level ----

  fn parse_program(&mut self, out: &mut Vec<TopLevel<'a>>) -> CResult<()> {
    while !self.at(TokKind::Eof) {
      out.push(self.parse_top_level()?);
    }
    Ok(())
  }

  fn parse_top_level(&mut self) -> CResult<TopLevel<'a>> {
    if self.eat_kw("struct")? {
      return self.parse_struct();
    }
    if self.eat_kw("enum")? {
      return self.parse_enum();
    }
    self.parse_func()
  }

  fn parse_struct(&mut self) -> CResult<TopLevel<'a>> {
    let (name, name_span) = self.ident("struct name")?;
    self.expect(TokKind::LBrace, "'{'")?;
    let mut members = Vec::new();
    while !self.at(TokKind::RBrace) {
      members.push(self.parse_named_type_expr()?);
      self.expect(TokKind::Semi, "';'")?;
    }
    self.expect(TokKind::RBrace, "'}'")?;
    let members = self.arena.alloc_slice(members);
    Ok(TopLevel::Struct(StructDecl { name, name_span, members }))
  }

  fn parse_enum(&mut self) -> CResult<TopLevel<'a>> {
    self.expect(TokKind::LBrace, "'{'")?;
    let mut consts = Vec::new();
    while !self.at(TokKind::RBrace) {
      let (name, span) = self.ident("enum constant name")?;
      let value = if self.eat(TokKind::Assign)? {
        let v = self.parse_expr()?;
        Some(&*self.arena.alloc(v))
      } else {
        None
      };
      consts.push(EnumConst { name, span, value });
      if !self.eat(TokKind::Comma)? { break; }
    }
    self.expect(TokKind::RBrace, "'}'")?;
    let consts = self.arena.alloc_slice(consts);
    Ok(TopLevel::Enum(EnumDecl { consts }))
  }

  fn parse_func(&mut self) -> CResult<TopLevel<'a>> {
    let (name, name_span) = self.ident("declaration name")?;
    self.expect(TokKind::LParen, "'('")?;
    let mut params = Vec::new();
    while !self.at(TokKind::RParen) {
      params.push(self.parse_named_type_expr()?);
      if !self.eat(TokKind::Comma)? { break; }
    }
    self.expect(TokKind::RParen, "')'")?;
    let params = self.arena.alloc_slice(params);

    let ret = if self.eat(TokKind::Colon)? {
      let ty = self.parse_type_expr()?;
      self.arena.alloc(ty) as &TypeExpr<'a>
    } else {
      self.arena.alloc(TypeExpr::Void) as &TypeExpr<'a>
    };

    let body = if self.eat(TokKind::Semi)? {
      None
    } else {
      let b = self.parse_block()?;
      Some(&*self.arena.alloc(b))
    };

    Ok(TopLevel::Func(FuncDecl { name, name_span, params, ret, body }))
  }

  fn parse_named_type_expr(&mut self) -> CResult<NamedTypeExpr<'a>> {
    let (name, name_span) = self.ident("parameter or member name")?;
    self.expect(TokKind::Colon, "':'")?;
    let ty = self.parse_type_expr()?;
    let ty = self.arena.alloc(ty);
    Ok(NamedTypeExpr { name, name_span, ty })
  }

  fn parse_type_expr(&mut self) -> CResult<TypeExpr<'a>> {
    if self.eat(TokKind::Star)? {
      let inner = self.parse_type_expr()?;
      return Ok(TypeExpr::Ptr(self.arena.alloc(inner)));
    }
    if self.at_kw("func") {
      self.bump()?;
      self.expect(TokKind::LParen, "'('")?;
      let mut args = Vec::new();
      while !self.at(TokKind::RParen) {
        args.push(self.parse_type_expr()?);
        if !self.eat(TokKind::Comma)? { break; }
      }
      self.expect(TokKind::RParen, "')'")?;
      self.expect(TokKind::Colon, "':'")?;
      let ret = self.parse_type_expr()?;
      let ret = self.arena.alloc(ret);
      let args = self.arena.alloc_slice(args);
      return Ok(TypeExpr::Func { args, ret });
    }
    let (name, _) = self.ident("type name")?;
    Ok(TypeExpr::Name(name))
  }

  // ---- statements ----

  fn parse_block(&mut self) -> CResult<Stmt<'a>> {
    let span = self.expect(TokKind::LBrace, "'{'")?.span;
    let mut stmts = Vec::new();
    while !self.at(TokKind::RBrace) {
      stmts.push(self.parse_stmt()?);
    }
    self.expect(TokKind::RBrace, "'}'")?;
    let stmts = self.arena.alloc_slice(stmts);
    Ok(Spanned { span, k: StmtKind::Block(stmts) })
  }

  fn parse_stmt(&mut self) -> CResult<Stmt<'a>> {
    let span = self.cur.span.clone();

    if self.at(TokKind::LBrace) {
      return self.parse_block();
    }
    if self.eat_kw("var")? {
      let (name, _) = self.ident("variable name")?;
      self.expect(TokKind::Colon, "':'")?;
      let ty = self.parse_type_expr()?;
      let ty = self.arena.alloc(ty);
      self.expect(TokKind::Semi, "';'")?;
      return Ok(Spanned { span, k: StmtKind::VarDecl(name, ty) });
    }
    if self.eat_kw("if")? {
      return self.parse_cond(span);
    }
    if self.eat_kw("loop")? {
      let body = self.parse_block()?;
      let body = self.arena.alloc(body);
      return Ok(Spanned { span, k: StmtKind::Loop(body) });
    }
    if self.eat_kw("break")? {
      self.expect(TokKind::Semi, "';'")?;
      return Ok(Spanned { span, k: StmtKind::Break });
    }
    if self.eat_kw("continue")? {
      self.expect(TokKind::Semi, "';'")?;
      return Ok(Spanned { span, k: StmtKind::Continue });
    }
    if self.eat_kw("return")? {
      let value = if self.at(TokKind::Semi) {
        None
      } else {
        let v = self.parse_expr()?;
        Some(&*self.arena.alloc(v))
      };
      self.expect(TokKind::Semi, "';'")?;
      return Ok(Spanned { span, k: StmtKind::Return(value) });
    }
    if self.eat_kw("goto")? {
      let (name, _) = self.ident("goto target")?;
      self.expect(TokKind::Semi, "';'")?;
      return Ok(Spanned { span, k: StmtKind::Goto(name) });
    }
    // A label is a bare identifier immediately followed by ':' — the only
    // statement-starting construct that looks like the start of an
    // expression but isn't one.
    if self.cur.kind == TokKind::Ident {
      let save_sym = self.cur.sym;
      let t = self.bump()?;
      if self.at(TokKind::Colon) {
        self.bump()?;
        return Ok(Spanned { span, k: StmtKind::Label(save_sym.unwrap()) });
      }
      // Not a label after all: re-synthesize the identifier as the start
      // of an expression statement and continue parsing from there.
      let ident_expr = Spanned { span: t.span.clone(), k: ExprKind::Ident(save_sym.unwrap()) };
      let e = self.parse_expr_from(ident_expr)?;
      self.expect(TokKind::Semi, "';'")?;
      return Ok(Spanned { span, k: StmtKind::Expr(self.arena.alloc(e)) });
    }

    let e = self.parse_expr()?;
    let e = self.arena.alloc(e);
    self.expect(TokKind::Semi, "';'")?;
    Ok(Spanned { span, k: StmtKind::Expr(e) })
  }

  fn parse_cond(&mut self, span: Span) -> CResult<Stmt<'a>> {
    let mut arms = Vec::new();
    loop {
      let cond = self.parse_expr()?;
      let cond = self.arena.alloc(cond);
      let body = self.parse_block()?;
      let body = self.arena.alloc(body);
      arms.push(CondArm { cond: Some(cond), body });
      if self.eat_kw("else")? {
        if self.eat_kw("if")? {
          continue;
        }
        let body = self.parse_block()?;
        let body = self.arena.alloc(body);
        arms.push(CondArm { cond: None, body });
      }
      break;
    }
    let arms = self.arena.alloc_slice(arms);
    Ok(Spanned { span, k: StmtKind::Cond(arms) })
  }

  // ---- expressions ----
  //
  // `parse_expr_from` lets the statement parser hand back an identifier
  // it spent one token of lookahead disambiguating from a label, without
  // duplicating the precedence chain.

  fn parse_expr(&mut self) -> CResult<Expr<'a>> {
    let lhs = self.parse_postfix_from_primary()?;
    self.parse_expr_from(lhs)
  }

  fn parse_expr_from(&mut self, primary: Expr<'a>) -> CResult<Expr<'a>> {
    let lhs = self.parse_postfix_from(primary)?;
    let lhs = self.parse_cast_from(lhs)?;
    let lhs = self.parse_mul_from(lhs)?;
    let lhs = self.parse_additive_from(lhs)?;
    let lhs = self.parse_shift_from(lhs)?;
    let lhs = self.parse_relational_from(lhs)?;
    let lhs = self.parse_equality_from(lhs)?;
    let lhs = self.parse_bitand_from(lhs)?;
    let lhs = self.parse_bitxor_from(lhs)?;
    let lhs = self.parse_bitor_from(lhs)?;
    let lhs = self.parse_logical_and_from(lhs)?;
    let lhs = self.parse_logical_or_from(lhs)?;
    self.parse_assign_from(lhs)
  }

  fn parse_assign_from(&mut self, lhs: Expr<'a>) -> CResult<Expr<'a>> {
    if self.at(TokKind::Assign) {
      let span = self.bump()?.span;
      let rhs = self.parse_expr()?; // right-associative
      let lhs = self.arena.alloc(lhs);
      let rhs = self.arena.alloc(rhs);
      return Ok(Spanned { span, k: ExprKind::Assign(lhs, rhs) });
    }
    Ok(lhs)
  }

  fn parse_logical_or_from(&mut self, mut lhs: Expr<'a>) -> CResult<Expr<'a>> {
    while self.at(TokKind::PipePipe) {
      let span = self.bump()?.span;
      let rhs = self.parse_full_through_logical_and()?;
      lhs = Spanned { span, k: ExprKind::LogicalOr(self.arena.alloc(lhs), self.arena.alloc(rhs)) };
    }
    Ok(lhs)
  }

  fn parse_logical_and_from(&mut self, mut lhs: Expr<'a>) -> CResult<Expr<'a>> {
    while self.at(TokKind::AmpAmp) {
      let span = self.bump()?.span;
      let rhs = self.parse_full_through_bitor()?;
      lhs = Spanned { span, k: ExprKind::LogicalAnd(self.arena.alloc(lhs), self.arena.alloc(rhs)) };
    }
    Ok(lhs)
  }

  fn parse_bitor_from(&mut self, mut lhs: Expr<'a>) -> CResult<Expr<'a>> {
    while self.at(TokKind::Pipe) {
      let span = self.bump()?.span;
      let rhs = self.parse_full_through_bitxor()?;
      lhs = Spanned { span, k: ExprKind::BitOr(self.arena.alloc(lhs), self.arena.alloc(rhs)) };
    }
    Ok(lhs)
  }

  fn parse_bitxor_from(&mut self, mut lhs: Expr<'a>) -> CResult<Expr<'a>> {
    while self.at(TokKind::Caret) {
      let span = self.bump()?.span;
      let rhs = self.parse_full_through_bitand()?;
      lhs = Spanned { span, k: ExprKind::Xor(self.arena.alloc(lhs), self.arena.alloc(rhs)) };
    }
    Ok(lhs)
  }

  fn parse_bitand_from(&mut self, mut lhs: Expr<'a>) -> CResult<Expr<'a>> {
    while self.at(TokKind::Amp) {
      let span = self.bump()?.span;
      let rhs = self.parse_full_through_equality()?;
      lhs = Spanned { span, k: ExprKind::BitAnd(self.arena.alloc(lhs), self.arena.alloc(rhs)) };
    }
    Ok(lhs)
  }

  fn parse_equality_from(&mut self, mut lhs: Expr<'a>) -> CResult<Expr<'a>> {
    loop {
      let (span, mk): (Span, fn(&'a Expr<'a>, &'a Expr<'a>) -> ExprKind<'a>) = match self.cur.kind {
        TokKind::EqEq => (self.cur.span.clone(), ExprKind::Eq),
        TokKind::Ne => (self.cur.span.clone(), ExprKind::Ne),
        _ => return Ok(lhs),
      };
      self.bump()?;
      let rhs = self.parse_full_through_relational()?;
      lhs = Spanned { span, k: mk(self.arena.alloc(lhs), self.arena.alloc(rhs)) };
    }
  }

  fn parse_relational_from(&mut self, mut lhs: Expr<'a>) -> CResult<Expr<'a>> {
    loop {
      let (span, mk): (Span, fn(&'a Expr<'a>, &'a Expr<'a>) -> ExprKind<'a>) = match self.cur.kind {
        TokKind::Lt => (self.cur.span.clone(), ExprKind::Lt),
        TokKind::Gt => (self.cur.span.clone(), ExprKind::Gt),
        TokKind::Le => (self.cur.span.clone(), ExprKind::Le),
        TokKind::Ge => (self.cur.span.clone(), ExprKind::Ge),
        _ => return Ok(lhs),
      };
      self.bump()?;
      let rhs = self.parse_full_through_shift()?;
      lhs = Spanned { span, k: mk(self.arena.alloc(lhs), self.arena.alloc(rhs)) };
    }
  }

  fn parse_shift_from(&mut self, mut lhs: Expr<'a>) -> CResult<Expr<'a>> {
    loop {
      let (span, mk): (Span, fn(&'a Expr<'a>, &'a Expr<'a>) -> ExprKind<'a>) = match self.cur.kind {
        TokKind::Shl => (self.cur.span.clone(), ExprKind::Lsh),
        TokKind::Shr => (self.cur.span.clone(), ExprKind::Rsh),
        _ => return Ok(lhs),
      };
      self.bump()?;
      let rhs = self.parse_full_through_additive()?;
      lhs = Spanned { span, k: mk(self.arena.alloc(lhs), self.arena.alloc(rhs)) };
    }
  }

  fn parse_additive_from(&mut self, mut lhs: Expr<'a>) -> CResult<Expr<'a>> {
    loop {
      let (span, mk): (Span, fn(&'a Expr<'a>, &'a Expr<'a>) -> ExprKind<'a>) = match self.cur.kind {
        TokKind::Plus => (self.cur.span.clone(), ExprKind::Add),
        TokKind::Minus => (self.cur.span.clone(), ExprKind::Sub),
        _ => return Ok(lhs),
      };
      self.bump()?;
      let rhs = self.parse_full_through_mul()?;
      lhs = Spanned { span, k: mk(self.arena.alloc(lhs), self.arena.alloc(rhs)) };
    }
  }

  fn parse_mul_from(&mut self, mut lhs: Expr<'a>) -> CResult<Expr<'a>> {
    loop {
      let (span, mk): (Span, fn(&'a Expr<'a>, &'a Expr<'a>) -> ExprKind<'a>) = match self.cur.kind {
        TokKind::Star => (self.cur.span.clone(), ExprKind::Mul),
        TokKind::Slash => (self.cur.span.clone(), ExprKind::Div),
        TokKind::Percent => (self.cur.span.clone(), ExprKind::Mod),
        _ => return Ok(lhs),
      };
      self.bump()?;
      let rhs = self.parse_full_through_cast()?;
      lhs = Spanned { span, k: mk(self.arena.alloc(lhs), self.arena.alloc(rhs)) };
    }
  }

  fn parse_cast_from(&mut self, mut lhs: Expr<'a>) -> CResult<Expr<'a>> {
    while self.at(TokKind::Colon) {
      let span = self.bump()?.span;
      let ty = self.parse_type_expr()?;
      let ty = self.arena.alloc(ty);
      lhs = Spanned { span, k: ExprKind::Cast(self.arena.alloc(lhs), ty) };
    }
    Ok(lhs)
  }

  // Each `parse_full_through_X` parses one fresh operand starting at the
  // highest precedence (postfix) and folding every tighter-binding level
  // up through `X`, so a right-hand operand captures everything that
  // binds tighter than the operator that asked for it.
  fn parse_full_through_cast(&mut self) -> CResult<Expr<'a>> {
    let e = self.parse_postfix_from_primary()?;
    self.parse_cast_from(e)
  }
  fn parse_full_through_mul(&mut self) -> CResult<Expr<'a>> {
    let e = self.parse_full_through_cast()?;
    self.parse_mul_from(e)
  }
  fn parse_full_through_additive(&mut self) -> CResult<Expr<'a>> {
    let e = self.parse_full_through_mul()?;
    self.parse_additive_from(e)
  }
  fn parse_full_through_shift(&mut self) -> CResult<Expr<'a>> {
    let e = self.parse_full_through_additive()?;
    self.parse_shift_from(e)
  }
  fn parse_full_through_relational(&mut self) -> CResult<Expr<'a>> {
    let e = self.parse_full_through_shift()?;
    self.parse_relational_from(e)
  }
  fn parse_full_through_equality(&mut self) -> CResult<Expr<'a>> {
    let e = self.parse_full_through_relational()?;
    self.parse_equality_from(e)
  }
  fn parse_full_through_bitand(&mut self) -> CResult<Expr<'a>> {
    let e = self.parse_full_through_equality()?;
    self.parse_bitand_from(e)
  }
  fn parse_full_through_bitxor(&mut self) -> CResult<Expr<'a>> {
    let e = self.parse_full_through_bitand()?;
    self.parse_bitxor_from(e)
  }
  fn parse_full_through_bitor(&mut self) -> CResult<Expr<'a>> {
    let e = self.parse_full_through_bitxor()?;
    self.parse_bitor_from(e)
  }
  fn parse_full_through_logical_and(&mut self) -> CResult<Expr<'a>> {
    let e = self.parse_full_through_bitor()?;
    self.parse_logical_and_from(e)
  }

  /// Entry point for "start a fresh operand here": prefix unary operators
  /// if present, otherwise a primary with postfix (`()`/`[]`/`.`) applied.
  /// The non-prefix base case must go through [`Self::parse_postfix`]
  /// rather than a bare primary, or `&buf.x` would parse as `(&buf).x`.
  fn parse_postfix_from_primary(&mut self) -> CResult<Expr<'a>> {
    self.parse_unary()
  }

  fn parse_unary(&mut self) -> CResult<Expr<'a>> {
    let span = self.cur.span.clone();
    let wrap = |arena: &'a Arena, mk: fn(&'a Expr<'a>) -> ExprKind<'a>, inner: Expr<'a>| {
      Spanned { span: span.clone(), k: mk(arena.alloc(inner)) }
    };
    match self.cur.kind {
      TokKind::Plus => { self.bump()?; let e = self.parse_unary()?; Ok(wrap(self.arena, ExprKind::Pos, e)) }
      TokKind::Minus => { self.bump()?; let e = self.parse_unary()?; Ok(wrap(self.arena, ExprKind::Neg, e)) }
      TokKind::Bang => { self.bump()?; let e = self.parse_unary()?; Ok(wrap(self.arena, ExprKind::LogicalNot, e)) }
      TokKind::Tilde => { self.bump()?; let e = self.parse_unary()?; Ok(wrap(self.arena, ExprKind::BitNot, e)) }
      TokKind::Amp => { self.bump()?; let e = self.parse_unary()?; Ok(wrap(self.arena, ExprKind::Ref, e)) }
      TokKind::Star => { self.bump()?; let e = self.parse_unary()?; Ok(wrap(self.arena, ExprKind::Deref, e)) }
      _ => self.parse_postfix(),
    }
  }

  fn parse_postfix(&mut self) -> CResult<Expr<'a>> {
    let p = self.parse_primary()?;
    self.parse_postfix_from(p)
  }

  fn parse_primary(&mut self) -> CResult<Expr<'a>> {
    let span = self.cur.span.clone();
    if self.at_kw("sizeof") {
      self.bump()?;
      self.expect(TokKind::LParen, "'('")?;
      let e = self.parse_expr()?;
      self.expect(TokKind::RParen, "')'")?;
      return Ok(Spanned { span, k: ExprKind::Sizeof(self.arena.alloc(e)) });
    }
    match self.cur.kind {
      TokKind::Num => { let t = self.bump()?; Ok(Spanned { span, k: ExprKind::Num(t.num) }) }
      TokKind::Char => { let t = self.bump()?; Ok(Spanned { span, k: ExprKind::Char(t.num) }) }
      TokKind::Str => {
        let t = self.bump()?;
        let bytes = self.arena.alloc_slice(t.text);
        Ok(Spanned { span, k: ExprKind::Str(bytes) })
      }
      TokKind::Ident => { let t = self.bump()?; Ok(Spanned { span, k: ExprKind::Ident(t.sym.unwrap()) }) }
      TokKind::LParen => {
        self.bump()?;
        let e = self.parse_expr()?;
        self.expect(TokKind::RParen, "')'")?;
        Ok(e)
      }
      _ => Err(CompileError::at(span, "expected an expression")),
    }
  }

  fn parse_postfix_from(&mut self, mut e: Expr<'a>) -> CResult<Expr<'a>> {
    loop {
      match self.cur.kind {
        TokKind::LParen => {
          let span = self.bump()?.span;
          let mut args = Vec::new();
          while !self.at(TokKind::RParen) {
            args.push(self.parse_expr()?);
            if !self.eat(TokKind::Comma)? { break; }
          }
          self.expect(TokKind::RParen, "')'")?;
          let args = self.arena.alloc_slice(args);
          e = Spanned { span, k: ExprKind::Call(self.arena.alloc(e), args) };
        }
        TokKind::LBracket => {
          let span = self.bump()?.span;
          let idx = self.parse_expr()?;
          self.expect(TokKind::RBracket, "']'")?;
          e = Spanned { span, k: ExprKind::Index(self.arena.alloc(e), self.arena.alloc(idx)) };
        }
        TokKind::Dot => {
          let span = self.bump()?.span;
          let (name, _) = self.ident("member name")?;
          e = Spanned { span, k: ExprKind::Dot(self.arena.alloc(e), name) };
        }
        _ => return Ok(e),
      }
    }
  }
}

/// Parse one source file's top-level declarations, appending them to
/// `out` in source order — the caller accumulates every file given on
/// the command line into a single [`crate::ast::Program`].
pub fn parse_file<'a>(
  arena: &'a Arena, file: Arc<std::path::PathBuf>, src: &[u8], out: &mut Vec<TopLevel<'a>>,
) -> CResult<()> {
  let lexer = Lexer::new(file, src);
  let mut p = Parser::new(arena, lexer)?;
  p.parse_program(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(src: &str) -> CResult<Vec<TopLevel<'static>>> {
    let arena = Box::leak(Box::new(Arena::new()));
    let mut out = Vec::new();
    parse_file(arena, Arc::new(std::path::PathBuf::from("<test>")), src.as_bytes(), &mut out)?;
    Ok(out)
  }

  #[test]
  fn parses_a_function_with_implicit_void_return() {
    let decls = parse("f(x: int) { return; }").unwrap();
    assert_eq!(decls.len(), 1);
    match decls[0] {
      TopLevel::Func(def) => {
        assert_eq!(def.params.len(), 1);
        assert!(matches!(def.ret, TypeExpr::Void));
        assert!(def.body.is_some());
      }
      _ => panic!("expected a function"),
    }
  }

  #[test]
  fn parses_struct_and_member_access() {
    let decls = parse("struct pt { x: int; y: int; } f() { return; }").unwrap();
    match decls[0] {
      TopLevel::Struct(s) => assert_eq!(s.members.len(), 2),
      _ => panic!("expected a struct"),
    }
  }

  #[test]
  fn parses_enum_with_trailing_comma() {
    let decls = parse("enum { A = 0, B, C, }").unwrap();
    match decls[0] {
      TopLevel::Enum(e) => {
        assert_eq!(e.consts.len(), 3);
        assert!(e.consts[0].value.is_some());
        assert!(e.consts[1].value.is_none());
      }
      _ => panic!("expected an enum"),
    }
  }

  #[test]
  fn cast_binds_tighter_than_comparison() {
    let decls = parse("f() { return 'A':int == 65; }").unwrap();
    match decls[0] {
      TopLevel::Func(def) => match def.body.unwrap().k {
        StmtKind::Block(stmts) => match stmts[0].k {
          StmtKind::Return(Some(e)) => assert!(matches!(e.k, ExprKind::Eq(..))),
          _ => panic!("expected return"),
        },
        _ => panic!("expected block"),
      },
      _ => panic!("expected function"),
    }
  }

  #[test]
  fn label_is_distinguished_from_an_expression_statement() {
    let decls = parse("f() { top: goto top; }").unwrap();
    match decls[0] {
      TopLevel::Func(def) => match def.body.unwrap().k {
        StmtKind::Block(stmts) => {
          assert!(matches!(stmts[0].k, StmtKind::Label(_)));
          assert!(matches!(stmts[1].k, StmtKind::Goto(_)));
        }
        _ => panic!("expected block"),
      },
      _ => panic!("expected function"),
    }
  }

  #[test]
  fn if_else_if_else_chain() {
    let decls = parse("f() { if 1 { return; } else if 2 { return; } else { return; } }").unwrap();
    match decls[0] {
      TopLevel::Func(def) => match def.body.unwrap().k {
        StmtKind::Block(stmts) => match stmts[0].k {
          StmtKind::Cond(arms) => {
            assert_eq!(arms.len(), 3);
            assert!(arms[2].cond.is_none());
          }
          _ => panic!("expected cond"),
        },
        _ => panic!("expected block"),
      },
      _ => panic!("expected function"),
    }
  }
}
