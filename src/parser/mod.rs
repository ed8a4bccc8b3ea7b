pub mod ast;

use crate::diagnostics::SyntaxError;
use crate::lexer::{self, token::Token};
use crate::span::{Span, Spanned};
use ast::*;

/// Lex and parse one source file. Identifier ids start at `first_id`; the
/// returned counter is the first id left unused.
pub fn parse_source(source: &str, first_id: u32) -> Result<(SourceFile, u32), SyntaxError> {
    let tokens = lexer::lex(source)?;
    let mut parser = Parser::new(&tokens, source).with_first_id(first_id);
    let file = parser.parse_file()?;
    Ok((file, parser.next_id))
}

enum ParamEntry {
    Bare(Ident),
    Named(Ident, Spanned<TypeExpr>),
    Type(Spanned<TypeExpr>),
}

/// A simple statement, or the header of a `for ... range` clause.
enum Simple {
    Stmt(Spanned<Stmt>),
    Range {
        lhs: Vec<Spanned<Expr>>,
        define: bool,
        iter: Spanned<Expr>,
    },
}

pub struct Parser<'a> {
    tokens: &'a [Spanned<Token>],
    source: &'a str,
    pos: usize,
    /// End offset of the last consumed token.
    last_end: usize,
    /// Inside `if`/`for`/`switch` headers `T {` opens a block, not a literal.
    restrict_composite_lit: bool,
    next_id: u32,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Spanned<Token>], source: &'a str) -> Self {
        Self { tokens, source, pos: 0, last_end: 0, restrict_composite_lit: false, next_id: 0 }
    }

    pub fn with_first_id(mut self, first_id: u32) -> Self {
        self.next_id = first_id;
        self
    }

    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    // ── Token cursor ─────────────────────────────────────────────────

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|t| t.node)
    }

    fn peek_at(&self, offset: usize) -> Option<Token> {
        self.tokens.get(self.pos + offset).map(|t| t.node)
    }

    fn peek_is(&self, tok: Token) -> bool {
        self.peek() == Some(tok)
    }

    fn current_span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some(t) => t.span,
            None => self.eof_span(),
        }
    }

    fn eof_span(&self) -> Span {
        Span::new(self.source.len(), self.source.len())
    }

    fn advance(&mut self) {
        if let Some(tok) = self.tokens.get(self.pos) {
            if !tok.span.is_empty() {
                self.last_end = tok.span.end;
            }
            self.pos += 1;
        }
    }

    fn eat(&mut self, tok: Token) -> bool {
        if self.peek_is(tok) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error_here(&self, expected: &str) -> SyntaxError {
        match self.tokens.get(self.pos) {
            Some(tok) if tok.node == Token::Semi && tok.span.is_empty() => {
                SyntaxError::new(format!("expected {expected}, found newline"), tok.span)
            }
            Some(tok) => SyntaxError::new(format!("expected {expected}, found {}", tok.node), tok.span),
            None => SyntaxError::new(format!("expected {expected}, found end of file"), self.eof_span()),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<Span, SyntaxError> {
        if self.peek_is(expected) {
            let span = self.current_span();
            self.advance();
            Ok(span)
        } else {
            Err(self.error_here(&expected.to_string()))
        }
    }

    /// `;` is optional before a closing `)` or `}`.
    fn expect_semi_or_close(&mut self, close: Token) -> Result<(), SyntaxError> {
        if self.eat(Token::Semi) || self.peek_is(close) {
            Ok(())
        } else {
            Err(self.error_here("';' or newline"))
        }
    }

    fn make_ident(&mut self, name: String, span: Span) -> Ident {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        Ident { id, name, span }
    }

    fn expect_ident(&mut self) -> Result<Ident, SyntaxError> {
        if self.peek_is(Token::Ident) {
            let span = self.current_span();
            self.advance();
            let name = self.source[span.start..span.end].to_string();
            Ok(self.make_ident(name, span))
        } else {
            Err(self.error_here("identifier"))
        }
    }

    fn spanned<T>(&self, node: T, start: usize) -> Spanned<T> {
        Spanned::new(node, Span::new(start, self.last_end.max(start)))
    }

    fn with_unrestricted<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        let saved = self.restrict_composite_lit;
        self.restrict_composite_lit = false;
        let result = f(self);
        self.restrict_composite_lit = saved;
        result
    }

    fn with_restricted<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        let saved = self.restrict_composite_lit;
        self.restrict_composite_lit = true;
        let result = f(self);
        self.restrict_composite_lit = saved;
        result
    }

    // ── File ─────────────────────────────────────────────────────────

    pub fn parse_file(&mut self) -> Result<SourceFile, SyntaxError> {
        self.expect(Token::Package)?;
        let package = self.expect_ident()?;
        self.expect_semi_or_eof()?;

        let mut imports = Vec::new();
        while self.peek_is(Token::Import) {
            imports.push(self.parse_import_decl()?);
            self.expect_semi_or_eof()?;
        }

        let mut decls = Vec::new();
        while let Some(tok) = self.peek() {
            match tok {
                Token::Semi => {
                    self.advance();
                }
                Token::Import => {
                    return Err(SyntaxError::new(
                        "imports must appear before other declarations",
                        self.current_span(),
                    ));
                }
                _ => {
                    decls.push(self.parse_top_decl()?);
                    self.expect_semi_or_eof()?;
                }
            }
        }

        Ok(SourceFile { package, imports, decls })
    }

    fn expect_semi_or_eof(&mut self) -> Result<(), SyntaxError> {
        if self.eat(Token::Semi) || self.peek().is_none() {
            Ok(())
        } else {
            Err(self.error_here("';' or newline"))
        }
    }

    fn parse_import_decl(&mut self) -> Result<Spanned<ImportDecl>, SyntaxError> {
        let start = self.expect(Token::Import)?.start;
        let mut specs = Vec::new();
        let grouped = self.eat(Token::LParen);
        if grouped {
            while !self.peek_is(Token::RParen) {
                if self.eat(Token::Semi) {
                    continue;
                }
                specs.push(self.parse_import_spec()?);
                self.expect_semi_or_close(Token::RParen)?;
            }
            self.expect(Token::RParen)?;
        } else {
            specs.push(self.parse_import_spec()?);
        }
        Ok(self.spanned(ImportDecl { specs, grouped }, start))
    }

    fn parse_import_spec(&mut self) -> Result<Spanned<ImportSpec>, SyntaxError> {
        let start = self.current_span().start;
        let name = match self.peek() {
            Some(Token::Ident) => Some(self.expect_ident()?),
            Some(Token::Dot) => {
                let span = self.current_span();
                self.advance();
                Some(self.make_ident(".".to_string(), span))
            }
            _ => None,
        };
        let path = match self.peek() {
            Some(Token::String | Token::RawString) => {
                let span = self.current_span();
                self.advance();
                let raw = &self.source[span.start..span.end];
                raw[1..raw.len() - 1].to_string()
            }
            _ => return Err(self.error_here("import path")),
        };
        if path.is_empty() {
            return Err(SyntaxError::new("empty import path", Span::new(start, self.last_end)));
        }
        Ok(self.spanned(ImportSpec { name, path }, start))
    }

    // ── Declarations ─────────────────────────────────────────────────

    fn parse_top_decl(&mut self) -> Result<Spanned<Decl>, SyntaxError> {
        let start = self.current_span().start;
        let decl = match self.peek() {
            Some(Token::Func) => Decl::Func(self.parse_func_decl()?),
            Some(Token::Type) => Decl::Type(self.parse_type_decl()?),
            Some(Token::Var) => {
                self.advance();
                Decl::Var(self.parse_value_specs(false)?)
            }
            Some(Token::Const) => {
                self.advance();
                Decl::Const(self.parse_value_specs(true)?)
            }
            _ => return Err(self.error_here("declaration")),
        };
        Ok(self.spanned(decl, start))
    }

    fn parse_func_decl(&mut self) -> Result<FuncDecl, SyntaxError> {
        self.expect(Token::Func)?;
        let recv = if self.peek_is(Token::LParen) {
            let open = self.current_span();
            let mut params = self.parse_params()?;
            if params.len() != 1 || params[0].names.len() > 1 {
                return Err(SyntaxError::new("method has multiple receivers", open));
            }
            let param = params.remove(0);
            Some(Receiver { name: param.names.into_iter().next(), ty: param.ty })
        } else {
            None
        };
        let name = self.expect_ident()?;
        let tparams = if self.peek_is(Token::LBracket) { self.parse_type_params()? } else { Vec::new() };
        let sig = self.parse_signature()?;
        let body = if self.peek_is(Token::LBrace) {
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(FuncDecl { recv, name, tparams, sig, body })
    }

    fn parse_type_decl(&mut self) -> Result<Vec<TypeSpec>, SyntaxError> {
        self.expect(Token::Type)?;
        let mut specs = Vec::new();
        if self.eat(Token::LParen) {
            while !self.peek_is(Token::RParen) {
                if self.eat(Token::Semi) {
                    continue;
                }
                specs.push(self.parse_type_spec()?);
                self.expect_semi_or_close(Token::RParen)?;
            }
            self.expect(Token::RParen)?;
        } else {
            specs.push(self.parse_type_spec()?);
        }
        Ok(specs)
    }

    fn parse_type_spec(&mut self) -> Result<TypeSpec, SyntaxError> {
        let name = self.expect_ident()?;
        let tparams = if self.at_type_params() { self.parse_type_params()? } else { Vec::new() };
        let alias = self.eat(Token::Eq);
        let ty = self.parse_type()?;
        Ok(TypeSpec { name, tparams, alias, ty })
    }

    /// `type T[P C]` against the array type `type T [N]int`. A parameter name
    /// is followed by another name, a comma, or the start of a constraint; an
    /// array length is not.
    fn at_type_params(&self) -> bool {
        self.peek_is(Token::LBracket)
            && self.peek_at(1) == Some(Token::Ident)
            && matches!(
                self.peek_at(2),
                Some(
                    Token::Ident
                        | Token::Comma
                        | Token::Tilde
                        | Token::Interface
                        | Token::Map
                        | Token::Chan
                        | Token::Func
                        | Token::Struct
                )
            )
    }

    /// `[K comparable, V any]` or `[K, V any]`.
    fn parse_type_params(&mut self) -> Result<Vec<Param>, SyntaxError> {
        self.expect(Token::LBracket)?;
        let params = self.with_unrestricted(|p| {
            let mut params = Vec::new();
            loop {
                let mut names = vec![p.expect_ident()?];
                while p.eat(Token::Comma) {
                    names.push(p.expect_ident()?);
                }
                let ty = p.parse_constraint()?;
                params.push(Param { names, ty });
                if !p.eat(Token::Comma) || p.peek_is(Token::RBracket) {
                    break;
                }
            }
            Ok(params)
        })?;
        self.expect(Token::RBracket)?;
        Ok(params)
    }

    /// A type, or a union of `~T` and `T` terms.
    fn parse_constraint(&mut self) -> Result<Spanned<TypeExpr>, SyntaxError> {
        let start = self.current_span().start;
        let mut terms = vec![self.parse_constraint_term()?];
        while self.eat(Token::Pipe) {
            terms.push(self.parse_constraint_term()?);
        }
        if terms.len() == 1 {
            return Ok(terms.remove(0));
        }
        Ok(self.spanned(TypeExpr::Union(terms), start))
    }

    fn parse_constraint_term(&mut self) -> Result<Spanned<TypeExpr>, SyntaxError> {
        let start = self.current_span().start;
        if self.eat(Token::Tilde) {
            let inner = self.parse_type()?;
            return Ok(self.spanned(TypeExpr::Approx(Box::new(inner)), start));
        }
        self.parse_type()
    }

    /// Specs after a `var` or `const` keyword, single or grouped.
    fn parse_value_specs(&mut self, is_const: bool) -> Result<Vec<ValueSpec>, SyntaxError> {
        let mut specs = Vec::new();
        if self.eat(Token::LParen) {
            while !self.peek_is(Token::RParen) {
                if self.eat(Token::Semi) {
                    continue;
                }
                specs.push(self.parse_value_spec(is_const)?);
                self.expect_semi_or_close(Token::RParen)?;
            }
            self.expect(Token::RParen)?;
        } else {
            specs.push(self.parse_value_spec(is_const)?);
        }
        Ok(specs)
    }

    fn parse_value_spec(&mut self, is_const: bool) -> Result<ValueSpec, SyntaxError> {
        let mut names = vec![self.expect_ident()?];
        while self.eat(Token::Comma) {
            names.push(self.expect_ident()?);
        }
        let ty = match self.peek() {
            Some(Token::Eq | Token::Semi | Token::RParen) | None => None,
            _ => Some(self.parse_type()?),
        };
        let values = if self.eat(Token::Eq) {
            self.parse_expr_list()?
        } else {
            Vec::new()
        };
        if !is_const && ty.is_none() && values.is_empty() {
            return Err(self.error_here("type or initializer"));
        }
        Ok(ValueSpec { names, ty, values })
    }

    // ── Signatures ───────────────────────────────────────────────────

    fn parse_signature(&mut self) -> Result<FuncType, SyntaxError> {
        let params = self.parse_params()?;
        let results = if self.peek_is(Token::LParen) {
            self.parse_params()?
        } else if self.at_type_start() {
            let ty = self.parse_type()?;
            vec![Param { names: Vec::new(), ty }]
        } else {
            Vec::new()
        };
        Ok(FuncType { params, results })
    }

    fn at_type_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Ident
                    | Token::Star
                    | Token::LBracket
                    | Token::Map
                    | Token::Chan
                    | Token::Func
                    | Token::Struct
                    | Token::Interface
                    | Token::LParen
                    | Token::Ellipsis
            )
        )
    }

    /// `(a, b int, c string)` or `(int, string)`; names that precede a type
    /// share it.
    fn parse_params(&mut self) -> Result<Vec<Param>, SyntaxError> {
        self.expect(Token::LParen)?;
        let mut entries = Vec::new();
        self.with_unrestricted(|p| {
            while !p.peek_is(Token::RParen) {
                entries.push(p.parse_param_entry()?);
                if !p.eat(Token::Comma) {
                    break;
                }
            }
            Ok(())
        })?;
        self.expect(Token::RParen)?;

        let any_named = entries.iter().any(|e| matches!(e, ParamEntry::Named(..)));
        let mut params = Vec::new();
        let mut pending = Vec::new();
        for entry in entries {
            match entry {
                ParamEntry::Bare(ident) if any_named => pending.push(ident),
                ParamEntry::Bare(ident) => {
                    let span = ident.span;
                    params.push(Param { names: Vec::new(), ty: Spanned::new(TypeExpr::Name(ident), span) });
                }
                ParamEntry::Named(ident, ty) => {
                    pending.push(ident);
                    params.push(Param { names: std::mem::take(&mut pending), ty });
                }
                ParamEntry::Type(ty) if any_named => {
                    return Err(SyntaxError::new("mixed named and unnamed parameters", ty.span));
                }
                ParamEntry::Type(ty) => params.push(Param { names: Vec::new(), ty }),
            }
        }
        if let Some(stray) = pending.first() {
            return Err(SyntaxError::new("mixed named and unnamed parameters", stray.span));
        }
        Ok(params)
    }

    fn parse_param_entry(&mut self) -> Result<ParamEntry, SyntaxError> {
        if !self.peek_is(Token::Ident) {
            return Ok(ParamEntry::Type(self.parse_type()?));
        }
        match self.peek_at(1) {
            Some(Token::Comma | Token::RParen) => Ok(ParamEntry::Bare(self.expect_ident()?)),
            Some(Token::Dot) => Ok(ParamEntry::Type(self.parse_type()?)),
            _ => {
                let name = self.expect_ident()?;
                let ty = self.parse_type()?;
                Ok(ParamEntry::Named(name, ty))
            }
        }
    }

    // ── Types ────────────────────────────────────────────────────────

    pub fn parse_type(&mut self) -> Result<Spanned<TypeExpr>, SyntaxError> {
        let start = self.current_span().start;
        let ty = match self.peek() {
            Some(Token::Ident) => {
                let first = self.expect_ident()?;
                let named = if self.peek_is(Token::Dot) && self.peek_at(1) == Some(Token::Ident) {
                    self.advance();
                    let name = self.expect_ident()?;
                    TypeExpr::Qualified { pkg: first, name }
                } else {
                    TypeExpr::Name(first)
                };
                if self.peek_is(Token::LBracket) && self.peek_at(1) != Some(Token::RBracket) {
                    let base = self.spanned(named, start);
                    let args = self.parse_type_args()?;
                    TypeExpr::Generic { base: Box::new(base), args }
                } else {
                    named
                }
            }
            Some(Token::Star) => {
                self.advance();
                TypeExpr::Pointer(Box::new(self.parse_type()?))
            }
            Some(Token::LBracket) => {
                self.advance();
                if self.eat(Token::RBracket) {
                    TypeExpr::Slice(Box::new(self.parse_type()?))
                } else if self.peek_is(Token::Ellipsis) && self.peek_at(1) == Some(Token::RBracket) {
                    self.advance();
                    self.advance();
                    TypeExpr::Array { len: None, elem: Box::new(self.parse_type()?) }
                } else {
                    let len = self.with_unrestricted(|p| p.parse_expr())?;
                    self.expect(Token::RBracket)?;
                    TypeExpr::Array { len: Some(Box::new(len)), elem: Box::new(self.parse_type()?) }
                }
            }
            Some(Token::Map) => {
                self.advance();
                self.expect(Token::LBracket)?;
                let key = self.parse_type()?;
                self.expect(Token::RBracket)?;
                let value = self.parse_type()?;
                TypeExpr::Map { key: Box::new(key), value: Box::new(value) }
            }
            Some(Token::Chan) => {
                self.advance();
                self.eat(Token::Arrow);
                TypeExpr::Chan(Box::new(self.parse_type()?))
            }
            Some(Token::Arrow) if self.peek_at(1) == Some(Token::Chan) => {
                self.advance();
                self.advance();
                TypeExpr::Chan(Box::new(self.parse_type()?))
            }
            Some(Token::Func) => {
                self.advance();
                TypeExpr::Func(self.parse_signature()?)
            }
            Some(Token::Struct) => {
                self.advance();
                TypeExpr::Struct(self.parse_struct_fields()?)
            }
            Some(Token::Interface) => {
                self.advance();
                TypeExpr::Interface(self.parse_interface_elems()?)
            }
            Some(Token::Ellipsis) => {
                self.advance();
                TypeExpr::Variadic(Box::new(self.parse_type()?))
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_type()?;
                self.expect(Token::RParen)?;
                TypeExpr::Paren(Box::new(inner))
            }
            _ => return Err(self.error_here("type")),
        };
        Ok(self.spanned(ty, start))
    }

    fn parse_type_args(&mut self) -> Result<Vec<Spanned<TypeExpr>>, SyntaxError> {
        self.expect(Token::LBracket)?;
        let args = self.with_unrestricted(|p| {
            let mut args = vec![p.parse_type()?];
            while p.eat(Token::Comma) && !p.peek_is(Token::RBracket) {
                args.push(p.parse_type()?);
            }
            Ok(args)
        })?;
        self.expect(Token::RBracket)?;
        Ok(args)
    }

    fn parse_struct_fields(&mut self) -> Result<Vec<FieldDecl>, SyntaxError> {
        self.expect(Token::LBrace)?;
        let mut fields = Vec::new();
        while !self.peek_is(Token::RBrace) {
            if self.eat(Token::Semi) {
                continue;
            }
            fields.push(self.parse_field_decl()?);
            self.expect_semi_or_close(Token::RBrace)?;
        }
        self.expect(Token::RBrace)?;
        Ok(fields)
    }

    fn parse_field_decl(&mut self) -> Result<FieldDecl, SyntaxError> {
        let embedded = match self.peek() {
            Some(Token::Star) => true,
            Some(Token::Ident) => matches!(
                self.peek_at(1),
                Some(Token::Dot | Token::Semi | Token::RBrace | Token::String | Token::RawString)
            ),
            _ => false,
        };
        let (names, ty) = if embedded {
            (Vec::new(), self.parse_type()?)
        } else {
            let mut names = vec![self.expect_ident()?];
            while self.eat(Token::Comma) {
                names.push(self.expect_ident()?);
            }
            (names, self.parse_type()?)
        };
        let tag = match self.peek() {
            Some(Token::String | Token::RawString) => {
                let span = self.current_span();
                self.advance();
                Some(self.source[span.start..span.end].to_string())
            }
            _ => None,
        };
        Ok(FieldDecl { names, ty, tag })
    }

    fn parse_interface_elems(&mut self) -> Result<Vec<InterfaceElem>, SyntaxError> {
        self.expect(Token::LBrace)?;
        let mut elems = Vec::new();
        while !self.peek_is(Token::RBrace) {
            if self.eat(Token::Semi) {
                continue;
            }
            if self.peek_is(Token::Ident) && self.peek_at(1) == Some(Token::LParen) {
                let name = self.expect_ident()?;
                let sig = self.parse_signature()?;
                elems.push(InterfaceElem::Method { name, sig });
            } else {
                elems.push(InterfaceElem::Embedded(self.parse_constraint()?));
            }
            self.expect_semi_or_close(Token::RBrace)?;
        }
        self.expect(Token::RBrace)?;
        Ok(elems)
    }

    // ── Statements ───────────────────────────────────────────────────

    fn parse_block(&mut self) -> Result<Spanned<Block>, SyntaxError> {
        let start = self.expect(Token::LBrace)?.start;
        let stmts = self.with_unrestricted(|p| p.parse_stmt_list())?;
        self.expect(Token::RBrace)?;
        Ok(self.spanned(Block { stmts }, start))
    }

    fn parse_stmt_list(&mut self) -> Result<Vec<Spanned<Stmt>>, SyntaxError> {
        let mut stmts = Vec::new();
        loop {
            match self.peek() {
                None | Some(Token::RBrace | Token::Case | Token::Default) => break,
                Some(Token::Semi) => {
                    self.advance();
                }
                Some(_) => {
                    stmts.push(self.parse_stmt()?);
                    if !matches!(self.peek(), Some(Token::RBrace | Token::Case | Token::Default))
                        && !self.eat(Token::Semi)
                    {
                        return Err(self.error_here("';' or newline"));
                    }
                }
            }
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Spanned<Stmt>, SyntaxError> {
        let start = self.current_span().start;
        let stmt = match self.peek() {
            Some(Token::Ident) if self.peek_at(1) == Some(Token::Colon) => {
                let label = self.expect_ident()?;
                self.advance();
                let stmt = match self.peek() {
                    None | Some(Token::Semi | Token::RBrace | Token::Case | Token::Default) => None,
                    Some(_) => Some(Box::new(self.parse_stmt()?)),
                };
                Stmt::Labeled { label, stmt }
            }
            Some(Token::Var) => {
                self.advance();
                Stmt::Var(self.parse_value_specs(false)?)
            }
            Some(Token::Const) => {
                self.advance();
                Stmt::Const(self.parse_value_specs(true)?)
            }
            Some(Token::Type) => Stmt::Type(self.parse_type_decl()?),
            Some(Token::Return) => {
                self.advance();
                if matches!(self.peek(), Some(Token::Semi | Token::RBrace) | None) {
                    Stmt::Return(Vec::new())
                } else {
                    Stmt::Return(self.parse_expr_list()?)
                }
            }
            Some(Token::If) => return self.parse_if(),
            Some(Token::For) => return self.parse_for(),
            Some(Token::Switch) => return self.parse_switch(),
            Some(Token::Select) => return self.parse_select(),
            Some(Token::LBrace) => Stmt::Block(self.parse_block()?.node),
            Some(Token::Go) => {
                self.advance();
                Stmt::Go(self.parse_expr()?)
            }
            Some(Token::Defer) => {
                self.advance();
                Stmt::Defer(self.parse_expr()?)
            }
            Some(Token::Break) => {
                self.advance();
                Stmt::Break(self.parse_label_ref()?)
            }
            Some(Token::Continue) => {
                self.advance();
                Stmt::Continue(self.parse_label_ref()?)
            }
            Some(Token::Goto) => {
                self.advance();
                Stmt::Goto(self.expect_ident()?)
            }
            Some(Token::Fallthrough) => {
                self.advance();
                Stmt::Fallthrough
            }
            _ => return self.parse_simple_stmt(),
        };
        Ok(self.spanned(stmt, start))
    }

    fn parse_label_ref(&mut self) -> Result<Option<Ident>, SyntaxError> {
        if self.peek_is(Token::Ident) { Ok(Some(self.expect_ident()?)) } else { Ok(None) }
    }

    fn parse_simple_stmt(&mut self) -> Result<Spanned<Stmt>, SyntaxError> {
        match self.parse_simple_or_range(false)? {
            Simple::Stmt(stmt) => Ok(stmt),
            Simple::Range { iter, .. } => Err(SyntaxError::new("unexpected range clause", iter.span)),
        }
    }

    fn parse_simple_or_range(&mut self, range_ok: bool) -> Result<Simple, SyntaxError> {
        let start = self.current_span().start;
        let lhs = self.parse_expr_list()?;
        let stmt = match self.peek() {
            Some(Token::Define) => {
                self.advance();
                if range_ok && self.eat(Token::Range) {
                    let iter = self.parse_expr()?;
                    return Ok(Simple::Range { lhs, define: true, iter });
                }
                let mut names = Vec::with_capacity(lhs.len());
                for expr in lhs {
                    match expr.node {
                        Expr::Ident(ident) => names.push(ident),
                        _ => return Err(SyntaxError::new("non-name on left side of :=", expr.span)),
                    }
                }
                let values = self.parse_expr_list()?;
                Stmt::ShortVar { names, values }
            }
            Some(tok) if tok.is_assign_op() => {
                self.advance();
                if range_ok && tok == Token::Eq && self.eat(Token::Range) {
                    let iter = self.parse_expr()?;
                    return Ok(Simple::Range { lhs, define: false, iter });
                }
                let rhs = self.parse_expr_list()?;
                Stmt::Assign { lhs, op: assign_op(tok), rhs }
            }
            Some(tok @ (Token::PlusPlus | Token::MinusMinus)) => {
                self.advance();
                Stmt::IncDec { target: single(lhs)?, inc: tok == Token::PlusPlus }
            }
            Some(Token::Arrow) => {
                self.advance();
                let chan = single(lhs)?;
                let value = self.parse_expr()?;
                Stmt::Send { chan, value }
            }
            _ => Stmt::Expr(single(lhs)?),
        };
        Ok(Simple::Stmt(self.spanned(stmt, start)))
    }

    fn parse_if(&mut self) -> Result<Spanned<Stmt>, SyntaxError> {
        let start = self.expect(Token::If)?.start;
        let (init, cond) = self.with_restricted(|p| {
            let first = p.parse_simple_stmt()?;
            if p.eat(Token::Semi) {
                let cond = p.parse_expr()?;
                Ok((Some(Box::new(first)), cond))
            } else {
                Ok((None, stmt_as_expr(first)?))
            }
        })?;
        let then_block = self.parse_block()?;
        let else_branch = if self.eat(Token::Else) {
            match self.peek() {
                Some(Token::If) => Some(Box::new(self.parse_if()?)),
                Some(Token::LBrace) => {
                    let block = self.parse_block()?;
                    Some(Box::new(Spanned::new(Stmt::Block(block.node), block.span)))
                }
                _ => return Err(self.error_here("'if' or block after 'else'")),
            }
        } else {
            None
        };
        Ok(self.spanned(Stmt::If { init, cond, then_block, else_branch }, start))
    }

    fn parse_for(&mut self) -> Result<Spanned<Stmt>, SyntaxError> {
        let start = self.expect(Token::For)?.start;
        if self.peek_is(Token::LBrace) {
            let body = self.parse_block()?;
            return Ok(self.spanned(Stmt::For { init: None, cond: None, post: None, body }, start));
        }
        if self.eat(Token::Range) {
            let iter = self.with_restricted(|p| p.parse_expr())?;
            let body = self.parse_block()?;
            let stmt = Stmt::Range { key: None, value: None, define: false, iter, body };
            return Ok(self.spanned(stmt, start));
        }

        enum Header {
            Cond(Spanned<Expr>),
            Clauses(Option<Box<Spanned<Stmt>>>, Option<Spanned<Expr>>, Option<Box<Spanned<Stmt>>>),
            Range(Vec<Spanned<Expr>>, bool, Spanned<Expr>),
        }

        let header = self.with_restricted(|p| {
            let init = if p.peek_is(Token::Semi) {
                None
            } else {
                match p.parse_simple_or_range(true)? {
                    Simple::Range { lhs, define, iter } => return Ok(Header::Range(lhs, define, iter)),
                    Simple::Stmt(stmt) if !p.peek_is(Token::Semi) => {
                        return Ok(Header::Cond(stmt_as_expr(stmt)?));
                    }
                    Simple::Stmt(stmt) => Some(Box::new(stmt)),
                }
            };
            p.expect(Token::Semi)?;
            let cond = if p.peek_is(Token::Semi) { None } else { Some(p.parse_expr()?) };
            p.expect(Token::Semi)?;
            let post = if p.peek_is(Token::LBrace) {
                None
            } else {
                Some(Box::new(p.parse_simple_stmt()?))
            };
            Ok(Header::Clauses(init, cond, post))
        })?;

        let body = self.parse_block()?;
        let stmt = match header {
            Header::Cond(cond) => Stmt::For { init: None, cond: Some(cond), post: None, body },
            Header::Clauses(init, cond, post) => Stmt::For { init, cond, post, body },
            Header::Range(lhs, define, iter) => {
                let mut lhs = lhs.into_iter();
                let key = lhs.next();
                let value = lhs.next();
                if let Some(extra) = lhs.next() {
                    return Err(SyntaxError::new(
                        "range clause permits at most two iteration variables",
                        extra.span,
                    ));
                }
                Stmt::Range { key, value, define, iter, body }
            }
        };
        Ok(self.spanned(stmt, start))
    }

    fn parse_switch(&mut self) -> Result<Spanned<Stmt>, SyntaxError> {
        let start = self.expect(Token::Switch)?.start;
        let (init, tag) = self.with_restricted(|p| {
            if p.peek_is(Token::LBrace) {
                return Ok((None, None));
            }
            let first = if p.peek_is(Token::Semi) { None } else { Some(p.parse_simple_stmt()?) };
            if p.eat(Token::Semi) {
                let tag = if p.peek_is(Token::LBrace) { None } else { Some(p.parse_expr()?) };
                return Ok((first.map(Box::new), tag));
            }
            match first {
                Some(stmt) if is_type_switch_binding(&stmt.node) => Ok((Some(Box::new(stmt)), None)),
                Some(stmt) => Ok((None, Some(stmt_as_expr(stmt)?))),
                None => Ok((None, None)),
            }
        })?;

        self.expect(Token::LBrace)?;
        let clauses = self.with_unrestricted(|p| {
            let mut clauses = Vec::new();
            loop {
                let clause_start = p.current_span().start;
                let (exprs, is_default) = match p.peek() {
                    Some(Token::Case) => {
                        p.advance();
                        (p.parse_expr_list()?, false)
                    }
                    Some(Token::Default) => {
                        p.advance();
                        (Vec::new(), true)
                    }
                    Some(Token::Semi) => {
                        p.advance();
                        continue;
                    }
                    _ => break,
                };
                p.expect(Token::Colon)?;
                let body = p.parse_stmt_list()?;
                clauses.push(p.spanned(CaseClause { exprs, is_default, body }, clause_start));
            }
            Ok(clauses)
        })?;
        self.expect(Token::RBrace)?;
        Ok(self.spanned(Stmt::Switch { init, tag, clauses }, start))
    }

    fn parse_select(&mut self) -> Result<Spanned<Stmt>, SyntaxError> {
        let start = self.expect(Token::Select)?.start;
        self.expect(Token::LBrace)?;
        let clauses = self.with_unrestricted(|p| {
            let mut clauses = Vec::new();
            loop {
                let clause_start = p.current_span().start;
                let comm = match p.peek() {
                    Some(Token::Case) => {
                        p.advance();
                        let comm = p.parse_simple_stmt()?;
                        if !is_comm(&comm.node) {
                            return Err(SyntaxError::new("select case must be a send or receive", comm.span));
                        }
                        Some(Box::new(comm))
                    }
                    Some(Token::Default) => {
                        p.advance();
                        None
                    }
                    Some(Token::Semi) => {
                        p.advance();
                        continue;
                    }
                    _ => break,
                };
                p.expect(Token::Colon)?;
                let body = p.parse_stmt_list()?;
                clauses.push(p.spanned(CommClause { comm, body }, clause_start));
            }
            Ok(clauses)
        })?;
        self.expect(Token::RBrace)?;
        Ok(self.spanned(Stmt::Select { clauses }, start))
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn parse_expr_list(&mut self) -> Result<Vec<Spanned<Expr>>, SyntaxError> {
        let mut exprs = vec![self.parse_expr()?];
        while self.eat(Token::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    pub fn parse_expr(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        self.parse_binary(1)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Spanned<Expr>, SyntaxError> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = self.peek().and_then(binary_op) {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(prec + 1)?;
            let span = lhs.span.to(rhs.span);
            lhs = Spanned::new(Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }, span);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        let op = match self.peek() {
            Some(Token::Plus) => UnaryOp::Pos,
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Caret) => UnaryOp::BitNot,
            Some(Token::Star) => UnaryOp::Deref,
            Some(Token::Amp) => UnaryOp::Addr,
            Some(Token::Arrow) => UnaryOp::Recv,
            _ => return self.parse_postfix(),
        };
        let start = self.current_span().start;
        self.advance();
        let operand = self.parse_unary()?;
        Ok(self.spanned(Expr::Unary { op, operand: Box::new(operand) }, start))
    }

    fn parse_postfix(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        let mut expr = self.parse_primary()?;
        let start = expr.span.start;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.advance();
                    if self.eat(Token::LParen) {
                        let ty = if self.eat(Token::Type) {
                            None
                        } else {
                            Some(Box::new(self.parse_type()?))
                        };
                        self.expect(Token::RParen)?;
                        expr = self.spanned(Expr::TypeAssert { x: Box::new(expr), ty }, start);
                    } else {
                        let sel = self.expect_ident()?;
                        expr = self.spanned(Expr::Selector { x: Box::new(expr), sel }, start);
                    }
                }
                Some(Token::LParen) => {
                    self.advance();
                    let (args, ellipsis) = self.with_unrestricted(|p| {
                        let mut args = Vec::new();
                        let mut ellipsis = false;
                        while !p.peek_is(Token::RParen) {
                            args.push(p.parse_expr()?);
                            if p.eat(Token::Ellipsis) {
                                ellipsis = true;
                            }
                            if !p.eat(Token::Comma) {
                                break;
                            }
                        }
                        Ok((args, ellipsis))
                    })?;
                    self.expect(Token::RParen)?;
                    expr = self.spanned(Expr::Call { func: Box::new(expr), args, ellipsis }, start);
                }
                Some(Token::LBracket) => {
                    self.advance();
                    expr = self.with_unrestricted(|p| p.parse_index_or_slice(expr, start))?;
                }
                Some(Token::LBrace) if !self.restrict_composite_lit => match expr_into_type(expr) {
                    Ok(ty) => {
                        let elems = self.parse_composite_elems()?;
                        expr = self.spanned(Expr::CompositeLit { ty: Some(Box::new(ty)), elems }, start);
                    }
                    Err(not_a_type) => {
                        expr = not_a_type;
                        break;
                    }
                },
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_index_or_slice(&mut self, x: Spanned<Expr>, start: usize) -> Result<Spanned<Expr>, SyntaxError> {
        let lo = if self.peek_is(Token::Colon) { None } else { Some(Box::new(self.parse_expr()?)) };
        if lo.is_some() && self.peek_is(Token::Comma) {
            let mut indices: Vec<Spanned<Expr>> = lo.into_iter().map(|first| *first).collect();
            while self.eat(Token::Comma) && !self.peek_is(Token::RBracket) {
                indices.push(self.parse_expr()?);
            }
            self.expect(Token::RBracket)?;
            return Ok(self.spanned(Expr::IndexList { x: Box::new(x), indices }, start));
        }
        if !self.eat(Token::Colon) {
            self.expect(Token::RBracket)?;
            let index = lo.ok_or_else(|| self.error_here("index expression"))?;
            return Ok(self.spanned(Expr::Index { x: Box::new(x), index }, start));
        }
        let hi = if matches!(self.peek(), Some(Token::RBracket | Token::Colon)) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        let max = if self.eat(Token::Colon) { Some(Box::new(self.parse_expr()?)) } else { None };
        self.expect(Token::RBracket)?;
        Ok(self.spanned(Expr::Slice { x: Box::new(x), lo, hi, max }, start))
    }

    fn parse_composite_elems(&mut self) -> Result<Vec<Element>, SyntaxError> {
        self.expect(Token::LBrace)?;
        let elems = self.with_unrestricted(|p| {
            let mut elems = Vec::new();
            while !p.peek_is(Token::RBrace) {
                let first = p.parse_element_value()?;
                let elem = if p.eat(Token::Colon) {
                    Element { key: Some(first), value: p.parse_element_value()? }
                } else {
                    Element { key: None, value: first }
                };
                elems.push(elem);
                if !p.eat(Token::Comma) {
                    break;
                }
            }
            Ok(elems)
        })?;
        self.expect(Token::RBrace)?;
        Ok(elems)
    }

    fn parse_element_value(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        if self.peek_is(Token::LBrace) {
            let start = self.current_span().start;
            let elems = self.parse_composite_elems()?;
            Ok(self.spanned(Expr::CompositeLit { ty: None, elems }, start))
        } else {
            self.parse_expr()
        }
    }

    fn parse_primary(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        let start = self.current_span().start;
        let kind = match self.peek() {
            Some(Token::Int) => Some(LitKind::Int),
            Some(Token::Float) => Some(LitKind::Float),
            Some(Token::Imag) => Some(LitKind::Imag),
            Some(Token::Char) => Some(LitKind::Char),
            Some(Token::String | Token::RawString) => Some(LitKind::String),
            _ => None,
        };
        if let Some(kind) = kind {
            let span = self.current_span();
            self.advance();
            let raw = self.source[span.start..span.end].to_string();
            return Ok(Spanned::new(Expr::BasicLit { kind, raw }, span));
        }

        match self.peek() {
            Some(Token::Ident) => {
                let ident = self.expect_ident()?;
                let span = ident.span;
                Ok(Spanned::new(Expr::Ident(ident), span))
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.with_unrestricted(|p| p.parse_expr())?;
                self.expect(Token::RParen)?;
                Ok(self.spanned(Expr::Paren(Box::new(inner)), start))
            }
            Some(Token::Func) => {
                self.advance();
                let sig = self.parse_signature()?;
                if self.peek_is(Token::LBrace) {
                    let body = self.parse_block()?;
                    Ok(self.spanned(Expr::FuncLit { sig, body }, start))
                } else {
                    let ty = self.spanned(TypeExpr::Func(sig), start);
                    Ok(self.spanned(Expr::Type(Box::new(ty)), start))
                }
            }
            Some(Token::LBracket | Token::Map | Token::Chan | Token::Struct | Token::Interface) => {
                let ty = self.parse_type()?;
                if self.peek_is(Token::LBrace) {
                    let elems = self.parse_composite_elems()?;
                    Ok(self.spanned(Expr::CompositeLit { ty: Some(Box::new(ty)), elems }, start))
                } else {
                    let span = ty.span;
                    Ok(Spanned::new(Expr::Type(Box::new(ty)), span))
                }
            }
            _ => Err(self.error_here("expression")),
        }
    }
}

fn single(mut exprs: Vec<Spanned<Expr>>) -> Result<Spanned<Expr>, SyntaxError> {
    if exprs.len() == 1 {
        Ok(exprs.remove(0))
    } else {
        let span = exprs[1].span;
        Err(SyntaxError::new("expected 1 expression", span))
    }
}

fn is_type_switch_binding(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::ShortVar { names, values } => {
            names.len() == 1
                && values.len() == 1
                && matches!(values[0].node, Expr::TypeAssert { ty: None, .. })
        }
        _ => false,
    }
}

/// A receive, possibly assigned, or a send.
fn is_comm(stmt: &Stmt) -> bool {
    let is_recv = |e: &Spanned<Expr>| matches!(e.node, Expr::Unary { op: UnaryOp::Recv, .. });
    match stmt {
        Stmt::Send { .. } => true,
        Stmt::Expr(expr) => is_recv(expr),
        Stmt::ShortVar { values, .. } => values.len() == 1 && is_recv(&values[0]),
        Stmt::Assign { op: AssignOp::Assign, rhs, .. } => rhs.len() == 1 && is_recv(&rhs[0]),
        _ => false,
    }
}

fn stmt_as_expr(stmt: Spanned<Stmt>) -> Result<Spanned<Expr>, SyntaxError> {
    match stmt.node {
        Stmt::Expr(expr) => Ok(expr),
        _ => Err(SyntaxError::new("expected boolean expression, found simple statement", stmt.span)),
    }
}

/// The literal type of `T{...}`, `pkg.T{...}` or `List[int]{...}`; any other
/// expression is handed back unchanged.
fn expr_into_type(expr: Spanned<Expr>) -> Result<Spanned<TypeExpr>, Spanned<Expr>> {
    literal_type(&expr).ok_or(expr)
}

fn literal_type(expr: &Spanned<Expr>) -> Option<Spanned<TypeExpr>> {
    let ty = match &expr.node {
        Expr::Ident(ident) => TypeExpr::Name(ident.clone()),
        Expr::Selector { x, sel } => match &x.node {
            Expr::Ident(pkg) => TypeExpr::Qualified { pkg: pkg.clone(), name: sel.clone() },
            _ => return None,
        },
        Expr::Index { x, index } => instantiation(x, std::slice::from_ref(&**index))?,
        Expr::IndexList { x, indices } => instantiation(x, indices)?,
        _ => return None,
    };
    Some(Spanned::new(ty, expr.span))
}

fn instantiation(base: &Spanned<Expr>, args: &[Spanned<Expr>]) -> Option<TypeExpr> {
    if !matches!(base.node, Expr::Ident(_) | Expr::Selector { .. }) {
        return None;
    }
    let base = literal_type(base)?;
    let args = args.iter().map(type_arg).collect::<Option<Vec<_>>>()?;
    Some(TypeExpr::Generic { base: Box::new(base), args })
}

/// A type argument parsed as an expression: `int`, `*T`, `[]byte`.
fn type_arg(expr: &Spanned<Expr>) -> Option<Spanned<TypeExpr>> {
    let ty = match &expr.node {
        Expr::Type(ty) => return Some((**ty).clone()),
        Expr::Unary { op: UnaryOp::Deref, operand } => TypeExpr::Pointer(Box::new(type_arg(operand)?)),
        Expr::Paren(inner) => TypeExpr::Paren(Box::new(type_arg(inner)?)),
        _ => return literal_type(expr),
    };
    Some(Spanned::new(ty, expr.span))
}

fn binary_op(tok: Token) -> Option<BinOp> {
    Some(match tok {
        Token::PipePipe => BinOp::LogOr,
        Token::AmpAmp => BinOp::LogAnd,
        Token::EqEq => BinOp::Eq,
        Token::BangEq => BinOp::Ne,
        Token::Lt => BinOp::Lt,
        Token::LtEq => BinOp::Le,
        Token::Gt => BinOp::Gt,
        Token::GtEq => BinOp::Ge,
        Token::Plus => BinOp::Add,
        Token::Minus => BinOp::Sub,
        Token::Pipe => BinOp::BitOr,
        Token::Caret => BinOp::BitXor,
        Token::Star => BinOp::Mul,
        Token::Slash => BinOp::Div,
        Token::Percent => BinOp::Rem,
        Token::Shl => BinOp::Shl,
        Token::Shr => BinOp::Shr,
        Token::Amp => BinOp::BitAnd,
        Token::AmpCaret => BinOp::AndNot,
        _ => return None,
    })
}

fn assign_op(tok: Token) -> AssignOp {
    match tok {
        Token::PlusEq => AssignOp::Add,
        Token::MinusEq => AssignOp::Sub,
        Token::StarEq => AssignOp::Mul,
        Token::SlashEq => AssignOp::Div,
        Token::PercentEq => AssignOp::Rem,
        Token::AmpEq => AssignOp::BitAnd,
        Token::PipeEq => AssignOp::BitOr,
        Token::CaretEq => AssignOp::BitXor,
        Token::ShlEq => AssignOp::Shl,
        Token::ShrEq => AssignOp::Shr,
        Token::AmpCaretEq => AssignOp::AndNot,
        _ => AssignOp::Assign,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> SourceFile {
        parse_source(src, 0).unwrap().0
    }

    fn parse_err(src: &str) -> SyntaxError {
        parse_source(src, 0).unwrap_err()
    }

    fn func_body(file: &SourceFile, index: usize) -> &[Spanned<Stmt>] {
        match &file.decls[index].node {
            Decl::Func(f) => &f.body.as_ref().unwrap().node.stmts,
            other => panic!("expected func, got {other:?}"),
        }
    }

    #[test]
    fn package_and_imports() {
        let file = parse("package main\n\nimport (\n\t\"fmt\"\n\tp2 \"example.com/pkg2\"\n\t_ \"embed\"\n)\n");
        assert_eq!(file.package.name, "main");
        assert_eq!(file.imports.len(), 1);
        let decl = &file.imports[0].node;
        assert!(decl.grouped);
        assert_eq!(decl.specs.len(), 3);
        assert_eq!(decl.specs[0].node.path, "fmt");
        assert_eq!(decl.specs[1].node.name.as_ref().unwrap().name, "p2");
        assert!(decl.specs[2].node.is_blank());
    }

    #[test]
    fn single_import_span_covers_path() {
        let src = "package a\nimport . \"strings\"\n";
        let file = parse(src);
        let spec = &file.imports[0].node.specs[0];
        assert!(spec.node.is_dot());
        assert_eq!(&src[spec.span.start..spec.span.end], ". \"strings\"");
    }

    #[test]
    fn type_decl_and_methods() {
        let file = parse(
            "package pkg1\ntype T1 int\nfunc (t *T1) Method1() {}\nfunc (t T1) Method2() int { return 1 }\n",
        );
        assert_eq!(file.decls.len(), 3);
        match &file.decls[1].node {
            Decl::Func(f) => {
                let recv = f.recv.as_ref().unwrap();
                assert_eq!(recv.name.as_ref().unwrap().name, "t");
                assert_eq!(recv.base_type().unwrap().name, "T1");
                assert_eq!(f.name.name, "Method1");
            }
            other => panic!("expected func, got {other:?}"),
        }
        match &file.decls[2].node {
            Decl::Func(f) => assert_eq!(f.sig.results.len(), 1),
            other => panic!("expected func, got {other:?}"),
        }
    }

    #[test]
    fn qualified_types_in_var_decls() {
        let file = parse("package p\nvar t2 pkg2.T2\nvar xs []*pkg2.T2\n");
        match &file.decls[0].node {
            Decl::Var(specs) => match &specs[0].ty.as_ref().unwrap().node {
                TypeExpr::Qualified { pkg, name } => {
                    assert_eq!(pkg.name, "pkg2");
                    assert_eq!(name.name, "T2");
                }
                other => panic!("expected qualified type, got {other:?}"),
            },
            other => panic!("expected var, got {other:?}"),
        }
    }

    #[test]
    fn grouped_params_share_type() {
        let file = parse("package p\nfunc f(a, b int, c ...string) (n int, err error) { return }\n");
        match &file.decls[0].node {
            Decl::Func(f) => {
                assert_eq!(f.sig.params.len(), 2);
                assert_eq!(f.sig.params[0].names.len(), 2);
                assert!(matches!(f.sig.params[1].ty.node, TypeExpr::Variadic(_)));
                assert_eq!(f.sig.results.len(), 2);
            }
            other => panic!("expected func, got {other:?}"),
        }
    }

    #[test]
    fn unnamed_params() {
        let file = parse("package p\nvar f func(int, pkg.T) bool\n");
        match &file.decls[0].node {
            Decl::Var(specs) => match &specs[0].ty.as_ref().unwrap().node {
                TypeExpr::Func(sig) => {
                    assert_eq!(sig.params.len(), 2);
                    assert!(sig.params.iter().all(|p| p.names.is_empty()));
                }
                other => panic!("expected func type, got {other:?}"),
            },
            other => panic!("expected var, got {other:?}"),
        }
    }

    #[test]
    fn mixed_params_rejected() {
        let err = parse_err("package p\nfunc f(a int, string) {}\n");
        assert!(err.msg.contains("mixed named and unnamed"));
    }

    #[test]
    fn ids_are_unique_and_sequential() {
        let (file, next) = parse_source("package p\nvar a, b = c, d\n", 10).unwrap();
        assert_eq!(file.package.id, NodeId(10));
        assert_eq!(next, 15);
    }

    #[test]
    fn composite_literal_restricted_in_if_header() {
        let file = parse("package p\nfunc f() {\n\tif x == T {\n\t}\n\ty := T{1}\n}\n");
        let body = func_body(&file, 0);
        assert!(matches!(body[0].node, Stmt::If { .. }));
        match &body[1].node {
            Stmt::ShortVar { values, .. } => {
                assert!(matches!(values[0].node, Expr::CompositeLit { .. }));
            }
            other => panic!("expected short var, got {other:?}"),
        }
    }

    #[test]
    fn composite_literal_allowed_in_parens_inside_header() {
        let file = parse("package p\nfunc f() {\n\tif x == (T{}) {\n\t}\n}\n");
        assert!(matches!(func_body(&file, 0)[0].node, Stmt::If { .. }));
    }

    #[test]
    fn qualified_composite_literal() {
        let file = parse("package p\nvar v = pkg2.T2{A: 1, B: []int{2}}\n");
        match &file.decls[0].node {
            Decl::Var(specs) => match &specs[0].values[0].node {
                Expr::CompositeLit { ty, elems } => {
                    assert!(matches!(ty.as_ref().unwrap().node, TypeExpr::Qualified { .. }));
                    assert_eq!(elems.len(), 2);
                    assert!(elems[0].key.is_some());
                }
                other => panic!("expected composite literal, got {other:?}"),
            },
            other => panic!("expected var, got {other:?}"),
        }
    }

    #[test]
    fn for_forms() {
        let file = parse(
            "package p\nfunc f() {\n\tfor {\n\t}\n\tfor i := 0; i < 3; i++ {\n\t}\n\tfor k, v := range m {\n\t}\n\tfor ok {\n\t}\n}\n",
        );
        let body = func_body(&file, 0);
        assert!(matches!(body[0].node, Stmt::For { cond: None, .. }));
        assert!(matches!(body[1].node, Stmt::For { init: Some(_), cond: Some(_), post: Some(_), .. }));
        assert!(matches!(body[2].node, Stmt::Range { define: true, key: Some(_), value: Some(_), .. }));
        assert!(matches!(body[3].node, Stmt::For { init: None, cond: Some(_), .. }));
    }

    #[test]
    fn switch_forms() {
        let file = parse(
            "package p\nfunc f() {\n\tswitch x := y.(type) {\n\tcase *T, int:\n\t\tfallthrough\n\tdefault:\n\t}\n\tswitch {\n\tcase a > b:\n\t}\n}\n",
        );
        let body = func_body(&file, 0);
        match &body[0].node {
            Stmt::Switch { init, tag, clauses } => {
                assert!(init.is_some());
                assert!(tag.is_none());
                assert_eq!(clauses.len(), 2);
                assert_eq!(clauses[0].node.exprs.len(), 2);
                assert!(clauses[1].node.is_default);
            }
            other => panic!("expected switch, got {other:?}"),
        }
        assert!(matches!(body[1].node, Stmt::Switch { tag: None, .. }));
    }

    #[test]
    fn func_literal_and_conversion() {
        let file = parse("package p\nfunc f() {\n\tg := func(x int) int { return x }\n\tb := []byte(s)\n\tch <- 1\n}\n");
        let body = func_body(&file, 0);
        match &body[0].node {
            Stmt::ShortVar { values, .. } => assert!(matches!(values[0].node, Expr::FuncLit { .. })),
            other => panic!("expected short var, got {other:?}"),
        }
        match &body[1].node {
            Stmt::ShortVar { values, .. } => match &values[0].node {
                Expr::Call { func, .. } => assert!(matches!(func.node, Expr::Type(_))),
                other => panic!("expected call, got {other:?}"),
            },
            other => panic!("expected short var, got {other:?}"),
        }
        assert!(matches!(body[2].node, Stmt::Send { .. }));
    }

    #[test]
    fn binary_precedence() {
        let file = parse("package p\nvar x = a + b*c == d || e\n");
        match &file.decls[0].node {
            Decl::Var(specs) => match &specs[0].values[0].node {
                Expr::Binary { op, lhs, .. } => {
                    assert_eq!(*op, BinOp::LogOr);
                    assert!(matches!(lhs.node, Expr::Binary { op: BinOp::Eq, .. }));
                }
                other => panic!("expected binary, got {other:?}"),
            },
            other => panic!("expected var, got {other:?}"),
        }
    }

    #[test]
    fn struct_and_interface_types() {
        let file = parse(
            "package p\ntype S struct {\n\ta, b int\n\t*Base\n\tpkg.Mixin\n\tName string `json:\"name\"`\n}\ntype I interface {\n\tfmt.Stringer\n\tDo(x int) error\n}\n",
        );
        match &file.decls[0].node {
            Decl::Type(specs) => match &specs[0].ty.node {
                TypeExpr::Struct(fields) => {
                    assert_eq!(fields.len(), 4);
                    assert_eq!(fields[0].names.len(), 2);
                    assert!(fields[1].names.is_empty());
                    assert!(fields[2].names.is_empty());
                    assert!(fields[3].tag.is_some());
                }
                other => panic!("expected struct, got {other:?}"),
            },
            other => panic!("expected type, got {other:?}"),
        }
        match &file.decls[1].node {
            Decl::Type(specs) => match &specs[0].ty.node {
                TypeExpr::Interface(elems) => {
                    assert!(matches!(elems[0], InterfaceElem::Embedded(_)));
                    assert!(matches!(elems[1], InterfaceElem::Method { .. }));
                }
                other => panic!("expected interface, got {other:?}"),
            },
            other => panic!("expected type, got {other:?}"),
        }
    }

    #[test]
    fn grouped_const_with_iota() {
        let file = parse("package p\nconst (\n\tA = iota\n\tB\n\tC\n)\n");
        match &file.decls[0].node {
            Decl::Const(specs) => {
                assert_eq!(specs.len(), 3);
                assert!(specs[1].values.is_empty());
            }
            other => panic!("expected const, got {other:?}"),
        }
    }

    #[test]
    fn decl_spans_cover_source() {
        let src = "package p\n\nfunc main() {\n\tx := 1\n}\n";
        let file = parse(src);
        let span = file.decls[0].span;
        assert_eq!(&src[span.start..span.end], "func main() {\n\tx := 1\n}");
    }

    #[test]
    fn labels_and_jumps() {
        let file = parse(
            "package p\nfunc f() {\nouter:\n\tfor {\n\t\tfor {\n\t\t\tcontinue outer\n\t\t}\n\t\tbreak outer\n\t}\n\tgoto done\ndone:\n}\n",
        );
        let body = func_body(&file, 0);
        assert_eq!(body.len(), 3);
        match &body[0].node {
            Stmt::Labeled { label, stmt: Some(inner) } => {
                assert_eq!(label.name, "outer");
                match &inner.node {
                    Stmt::For { body, .. } => {
                        assert!(matches!(&body.node.stmts[1].node, Stmt::Break(Some(l)) if l.name == "outer"));
                    }
                    other => panic!("expected for, got {other:?}"),
                }
            }
            other => panic!("expected labeled statement, got {other:?}"),
        }
        assert!(matches!(&body[1].node, Stmt::Goto(l) if l.name == "done"));
        assert!(matches!(&body[2].node, Stmt::Labeled { stmt: None, .. }));
    }

    #[test]
    fn select_clauses() {
        let file = parse(
            "package p\nfunc f() {\n\tselect {\n\tcase v, ok := <-in:\n\t\t_ = v\n\tcase out <- 1:\n\tcase <-done:\n\t\treturn\n\tdefault:\n\t}\n}\n",
        );
        match &func_body(&file, 0)[0].node {
            Stmt::Select { clauses } => {
                assert_eq!(clauses.len(), 4);
                assert!(matches!(clauses[0].node.comm.as_deref().map(|c| &c.node), Some(Stmt::ShortVar { .. })));
                assert!(matches!(clauses[1].node.comm.as_deref().map(|c| &c.node), Some(Stmt::Send { .. })));
                assert!(matches!(clauses[2].node.comm.as_deref().map(|c| &c.node), Some(Stmt::Expr(_))));
                assert!(clauses[3].node.comm.is_none());
                assert_eq!(clauses[2].node.body.len(), 1);
            }
            other => panic!("expected select, got {other:?}"),
        }
    }

    #[test]
    fn select_case_must_communicate() {
        let err = parse_err("package p\nfunc f() {\n\tselect {\n\tcase x + 1:\n\t}\n}\n");
        assert!(err.msg.contains("send or receive"));
    }

    #[test]
    fn generic_declarations() {
        let file = parse(
            "package p\ntype List[T any] struct{ items []T }\ntype Num interface {\n\t~int | ~float64\n}\ntype Arr [N]int\nfunc (l *List[T]) Push(v T) {}\nfunc Map[K comparable, V any](m map[K]V) []V { return nil }\n",
        );
        match &file.decls[0].node {
            Decl::Type(specs) => {
                assert_eq!(specs[0].tparams.len(), 1);
                assert_eq!(specs[0].tparams[0].names[0].name, "T");
            }
            other => panic!("expected type, got {other:?}"),
        }
        match &file.decls[1].node {
            Decl::Type(specs) => match &specs[0].ty.node {
                TypeExpr::Interface(elems) => match &elems[0] {
                    InterfaceElem::Embedded(ty) => match &ty.node {
                        TypeExpr::Union(terms) => {
                            assert_eq!(terms.len(), 2);
                            assert!(matches!(terms[0].node, TypeExpr::Approx(_)));
                        }
                        other => panic!("expected union, got {other:?}"),
                    },
                    other => panic!("expected embedded element, got {other:?}"),
                },
                other => panic!("expected interface, got {other:?}"),
            },
            other => panic!("expected type, got {other:?}"),
        }
        match &file.decls[2].node {
            Decl::Type(specs) => {
                assert!(specs[0].tparams.is_empty());
                assert!(matches!(specs[0].ty.node, TypeExpr::Array { .. }));
            }
            other => panic!("expected type, got {other:?}"),
        }
        match &file.decls[3].node {
            Decl::Func(f) => {
                let recv = f.recv.as_ref().unwrap();
                assert_eq!(recv.base_type().unwrap().name, "List");
                let params: Vec<&str> = recv.type_params().iter().map(|i| i.name.as_str()).collect();
                assert_eq!(params, vec!["T"]);
            }
            other => panic!("expected func, got {other:?}"),
        }
        match &file.decls[4].node {
            Decl::Func(f) => {
                assert_eq!(f.tparams.len(), 2);
                assert_eq!(f.sig.params.len(), 1);
            }
            other => panic!("expected func, got {other:?}"),
        }
    }

    #[test]
    fn instantiations_in_types_and_expressions() {
        let file = parse(
            "package p\nvar a pkg.Map[string, []int]\nvar b = List[int]{}\nvar c = Pair[K, *V]{}\nvar d = Sum[float64](xs)\n",
        );
        let values = |i: usize| match &file.decls[i].node {
            Decl::Var(specs) => specs[0].clone(),
            other => panic!("expected var, got {other:?}"),
        };
        match &values(0).ty.unwrap().node {
            TypeExpr::Generic { base, args } => {
                assert!(matches!(base.node, TypeExpr::Qualified { .. }));
                assert_eq!(args.len(), 2);
                assert!(matches!(args[1].node, TypeExpr::Slice(_)));
            }
            other => panic!("expected instantiation, got {other:?}"),
        }
        match &values(1).values[0].node {
            Expr::CompositeLit { ty: Some(ty), .. } => {
                assert!(matches!(&ty.node, TypeExpr::Generic { args, .. } if args.len() == 1));
            }
            other => panic!("expected composite literal, got {other:?}"),
        }
        match &values(2).values[0].node {
            Expr::CompositeLit { ty: Some(ty), .. } => match &ty.node {
                TypeExpr::Generic { args, .. } => assert!(matches!(args[1].node, TypeExpr::Pointer(_))),
                other => panic!("expected instantiation, got {other:?}"),
            },
            other => panic!("expected composite literal, got {other:?}"),
        }
        match &values(3).values[0].node {
            Expr::Call { func, .. } => assert!(matches!(func.node, Expr::Index { .. })),
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn multi_index_needs_a_closing_bracket() {
        let err = parse_err("package p\nvar x = F[int, string(y)\n");
        assert!(err.msg.contains("expected ']'"), "{}", err.msg);
    }

    #[test]
    fn missing_package_clause() {
        let err = parse_err("func main() {}\n");
        assert!(err.msg.contains("expected package"));
    }

    #[test]
    fn import_after_decl_rejected() {
        let err = parse_err("package p\nvar x int\nimport \"fmt\"\n");
        assert!(err.msg.contains("imports must appear"));
    }
}
