//! AST visitor pattern infrastructure
//!
//! Two visitor traits and their walk functions:
//!
//! - `Visitor` — immutable traversal (classification, qualifier collection)
//! - `VisitMut` — mutable traversal (reference substitution)
//!
//! Implement the trait, override only the methods you need, and call the
//! matching `walk_*` function inside the override to keep the default
//! recursion. Omitting the walk call prunes traversal at that node.
//!
//! Declaring identifiers (package-level names, parameters, fields, short
//! variable names) are not expressions and are never offered to
//! `visit_expr`/`visit_type_expr`; a pass that needs them reads them off the
//! declaration it is handed.
//!
//! Use these traits for passes where most arms are pure recursion. Scope-aware
//! passes such as name resolution match on the tree by hand.

pub mod scope_tracker;

use crate::parser::ast::*;
use crate::span::Spanned;

// ============================================================================
// Visitor Trait (Read-Only)
// ============================================================================

/// Read-only AST visitor. Default implementations recurse into all children.
pub trait Visitor: Sized {
    fn visit_file(&mut self, file: &SourceFile) {
        walk_file(self, file);
    }

    fn visit_decl(&mut self, decl: &Spanned<Decl>) {
        walk_decl(self, decl);
    }

    fn visit_func_decl(&mut self, func: &FuncDecl) {
        walk_func_decl(self, func);
    }

    fn visit_func_type(&mut self, sig: &FuncType) {
        walk_func_type(self, sig);
    }

    fn visit_block(&mut self, block: &Spanned<Block>) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &Spanned<Stmt>) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Spanned<Expr>) {
        walk_expr(self, expr);
    }

    fn visit_type_expr(&mut self, te: &Spanned<TypeExpr>) {
        walk_type_expr(self, te);
    }
}

// ============================================================================
// Walk Functions (Read-Only)
// ============================================================================

pub fn walk_file<V: Visitor>(v: &mut V, file: &SourceFile) {
    // Import specs hold no expressions.
    for decl in &file.decls {
        v.visit_decl(decl);
    }
}

pub fn walk_decl<V: Visitor>(v: &mut V, decl: &Spanned<Decl>) {
    match &decl.node {
        Decl::Func(func) => v.visit_func_decl(func),
        Decl::Type(specs) => walk_type_specs(v, specs),
        Decl::Var(specs) | Decl::Const(specs) => walk_value_specs(v, specs),
    }
}

fn walk_type_specs<V: Visitor>(v: &mut V, specs: &[TypeSpec]) {
    for spec in specs {
        for param in &spec.tparams {
            v.visit_type_expr(&param.ty);
        }
        v.visit_type_expr(&spec.ty);
    }
}

fn walk_value_specs<V: Visitor>(v: &mut V, specs: &[ValueSpec]) {
    for spec in specs {
        if let Some(ty) = &spec.ty {
            v.visit_type_expr(ty);
        }
        for value in &spec.values {
            v.visit_expr(value);
        }
    }
}

pub fn walk_func_decl<V: Visitor>(v: &mut V, func: &FuncDecl) {
    if let Some(recv) = &func.recv {
        v.visit_type_expr(&recv.ty);
    }
    for param in &func.tparams {
        v.visit_type_expr(&param.ty);
    }
    v.visit_func_type(&func.sig);
    if let Some(body) = &func.body {
        v.visit_block(body);
    }
}

pub fn walk_func_type<V: Visitor>(v: &mut V, sig: &FuncType) {
    for param in sig.params.iter().chain(&sig.results) {
        v.visit_type_expr(&param.ty);
    }
}

pub fn walk_block<V: Visitor>(v: &mut V, block: &Spanned<Block>) {
    for stmt in &block.node.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visitor>(v: &mut V, stmt: &Spanned<Stmt>) {
    match &stmt.node {
        Stmt::Var(specs) | Stmt::Const(specs) => walk_value_specs(v, specs),
        Stmt::Type(specs) => walk_type_specs(v, specs),
        Stmt::ShortVar { values, .. } => {
            for value in values {
                v.visit_expr(value);
            }
        }
        Stmt::Assign { lhs, rhs, .. } => {
            for expr in lhs.iter().chain(rhs) {
                v.visit_expr(expr);
            }
        }
        Stmt::IncDec { target, .. } => v.visit_expr(target),
        Stmt::Send { chan, value } => {
            v.visit_expr(chan);
            v.visit_expr(value);
        }
        Stmt::Expr(expr) | Stmt::Go(expr) | Stmt::Defer(expr) => v.visit_expr(expr),
        Stmt::Return(values) => {
            for value in values {
                v.visit_expr(value);
            }
        }
        Stmt::If { init, cond, then_block, else_branch } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            v.visit_expr(cond);
            v.visit_block(then_block);
            if let Some(else_branch) = else_branch {
                v.visit_stmt(else_branch);
            }
        }
        Stmt::For { init, cond, post, body } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            if let Some(cond) = cond {
                v.visit_expr(cond);
            }
            if let Some(post) = post {
                v.visit_stmt(post);
            }
            v.visit_block(body);
        }
        Stmt::Range { key, value, iter, body, .. } => {
            for target in key.iter().chain(value) {
                v.visit_expr(target);
            }
            v.visit_expr(iter);
            v.visit_block(body);
        }
        Stmt::Switch { init, tag, clauses } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            if let Some(tag) = tag {
                v.visit_expr(tag);
            }
            for clause in clauses {
                for expr in &clause.node.exprs {
                    v.visit_expr(expr);
                }
                for stmt in &clause.node.body {
                    v.visit_stmt(stmt);
                }
            }
        }
        Stmt::Select { clauses } => {
            for clause in clauses {
                if let Some(comm) = &clause.node.comm {
                    v.visit_stmt(comm);
                }
                for stmt in &clause.node.body {
                    v.visit_stmt(stmt);
                }
            }
        }
        Stmt::Labeled { stmt, .. } => {
            if let Some(stmt) = stmt {
                v.visit_stmt(stmt);
            }
        }
        Stmt::Block(block) => {
            for stmt in &block.stmts {
                v.visit_stmt(stmt);
            }
        }
        // Labels are not expressions.
        Stmt::Goto(_) | Stmt::Break(_) | Stmt::Continue(_) | Stmt::Fallthrough => {}
    }
}

pub fn walk_expr<V: Visitor>(v: &mut V, expr: &Spanned<Expr>) {
    match &expr.node {
        // Leaves
        Expr::Ident(_) | Expr::BasicLit { .. } => {}

        Expr::Unary { operand, .. } => v.visit_expr(operand),
        Expr::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        Expr::Paren(inner) => v.visit_expr(inner),
        // The member is not an expression of its own.
        Expr::Selector { x, .. } => v.visit_expr(x),
        Expr::Call { func, args, .. } => {
            v.visit_expr(func);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Expr::Index { x, index } => {
            v.visit_expr(x);
            v.visit_expr(index);
        }
        Expr::IndexList { x, indices } => {
            v.visit_expr(x);
            for index in indices {
                v.visit_expr(index);
            }
        }
        Expr::Slice { x, lo, hi, max } => {
            v.visit_expr(x);
            for bound in [lo, hi, max].into_iter().flatten() {
                v.visit_expr(bound);
            }
        }
        Expr::TypeAssert { x, ty } => {
            v.visit_expr(x);
            if let Some(ty) = ty {
                v.visit_type_expr(ty);
            }
        }
        Expr::CompositeLit { ty, elems } => {
            if let Some(ty) = ty {
                v.visit_type_expr(ty);
            }
            for elem in elems {
                if let Some(key) = &elem.key {
                    v.visit_expr(key);
                }
                v.visit_expr(&elem.value);
            }
        }
        Expr::FuncLit { sig, body } => {
            v.visit_func_type(sig);
            v.visit_block(body);
        }
        Expr::Type(ty) => v.visit_type_expr(ty),
    }
}

pub fn walk_type_expr<V: Visitor>(v: &mut V, te: &Spanned<TypeExpr>) {
    match &te.node {
        TypeExpr::Name(_) | TypeExpr::Qualified { .. } => {}
        TypeExpr::Pointer(inner)
        | TypeExpr::Slice(inner)
        | TypeExpr::Chan(inner)
        | TypeExpr::Variadic(inner)
        | TypeExpr::Paren(inner)
        | TypeExpr::Approx(inner) => v.visit_type_expr(inner),
        TypeExpr::Generic { base, args } => {
            v.visit_type_expr(base);
            for arg in args {
                v.visit_type_expr(arg);
            }
        }
        TypeExpr::Union(terms) => {
            for term in terms {
                v.visit_type_expr(term);
            }
        }
        TypeExpr::Array { len, elem } => {
            if let Some(len) = len {
                v.visit_expr(len);
            }
            v.visit_type_expr(elem);
        }
        TypeExpr::Map { key, value } => {
            v.visit_type_expr(key);
            v.visit_type_expr(value);
        }
        TypeExpr::Func(sig) => v.visit_func_type(sig),
        TypeExpr::Struct(fields) => {
            for field in fields {
                v.visit_type_expr(&field.ty);
            }
        }
        TypeExpr::Interface(elems) => {
            for elem in elems {
                match elem {
                    InterfaceElem::Method { sig, .. } => v.visit_func_type(sig),
                    InterfaceElem::Embedded(ty) => v.visit_type_expr(ty),
                }
            }
        }
    }
}

// ============================================================================
// VisitMut Trait (In-Place Mutation)
// ============================================================================

/// Mutable AST visitor for in-place transformation passes.
/// Structurally identical to `Visitor` but takes `&mut` references.
pub trait VisitMut: Sized {
    fn visit_file_mut(&mut self, file: &mut SourceFile) {
        walk_file_mut(self, file);
    }

    fn visit_decl_mut(&mut self, decl: &mut Spanned<Decl>) {
        walk_decl_mut(self, decl);
    }

    fn visit_func_decl_mut(&mut self, func: &mut FuncDecl) {
        walk_func_decl_mut(self, func);
    }

    fn visit_func_type_mut(&mut self, sig: &mut FuncType) {
        walk_func_type_mut(self, sig);
    }

    fn visit_block_mut(&mut self, block: &mut Spanned<Block>) {
        walk_block_mut(self, block);
    }

    fn visit_stmt_mut(&mut self, stmt: &mut Spanned<Stmt>) {
        walk_stmt_mut(self, stmt);
    }

    fn visit_expr_mut(&mut self, expr: &mut Spanned<Expr>) {
        walk_expr_mut(self, expr);
    }

    fn visit_type_expr_mut(&mut self, te: &mut Spanned<TypeExpr>) {
        walk_type_expr_mut(self, te);
    }
}

// ============================================================================
// Walk Functions (Mutable) — structurally identical to Visitor versions
// ============================================================================

pub fn walk_file_mut<V: VisitMut>(v: &mut V, file: &mut SourceFile) {
    for decl in &mut file.decls {
        v.visit_decl_mut(decl);
    }
}

pub fn walk_decl_mut<V: VisitMut>(v: &mut V, decl: &mut Spanned<Decl>) {
    match &mut decl.node {
        Decl::Func(func) => v.visit_func_decl_mut(func),
        Decl::Type(specs) => walk_type_specs_mut(v, specs),
        Decl::Var(specs) | Decl::Const(specs) => walk_value_specs_mut(v, specs),
    }
}

fn walk_type_specs_mut<V: VisitMut>(v: &mut V, specs: &mut [TypeSpec]) {
    for spec in specs {
        for param in &mut spec.tparams {
            v.visit_type_expr_mut(&mut param.ty);
        }
        v.visit_type_expr_mut(&mut spec.ty);
    }
}

fn walk_value_specs_mut<V: VisitMut>(v: &mut V, specs: &mut [ValueSpec]) {
    for spec in specs {
        if let Some(ty) = &mut spec.ty {
            v.visit_type_expr_mut(ty);
        }
        for value in &mut spec.values {
            v.visit_expr_mut(value);
        }
    }
}

pub fn walk_func_decl_mut<V: VisitMut>(v: &mut V, func: &mut FuncDecl) {
    if let Some(recv) = &mut func.recv {
        v.visit_type_expr_mut(&mut recv.ty);
    }
    for param in &mut func.tparams {
        v.visit_type_expr_mut(&mut param.ty);
    }
    v.visit_func_type_mut(&mut func.sig);
    if let Some(body) = &mut func.body {
        v.visit_block_mut(body);
    }
}

pub fn walk_func_type_mut<V: VisitMut>(v: &mut V, sig: &mut FuncType) {
    for param in sig.params.iter_mut().chain(&mut sig.results) {
        v.visit_type_expr_mut(&mut param.ty);
    }
}

pub fn walk_block_mut<V: VisitMut>(v: &mut V, block: &mut Spanned<Block>) {
    for stmt in &mut block.node.stmts {
        v.visit_stmt_mut(stmt);
    }
}

pub fn walk_stmt_mut<V: VisitMut>(v: &mut V, stmt: &mut Spanned<Stmt>) {
    match &mut stmt.node {
        Stmt::Var(specs) | Stmt::Const(specs) => walk_value_specs_mut(v, specs),
        Stmt::Type(specs) => walk_type_specs_mut(v, specs),
        Stmt::ShortVar { values, .. } => {
            for value in values {
                v.visit_expr_mut(value);
            }
        }
        Stmt::Assign { lhs, rhs, .. } => {
            for expr in lhs.iter_mut().chain(rhs) {
                v.visit_expr_mut(expr);
            }
        }
        Stmt::IncDec { target, .. } => v.visit_expr_mut(target),
        Stmt::Send { chan, value } => {
            v.visit_expr_mut(chan);
            v.visit_expr_mut(value);
        }
        Stmt::Expr(expr) | Stmt::Go(expr) | Stmt::Defer(expr) => v.visit_expr_mut(expr),
        Stmt::Return(values) => {
            for value in values {
                v.visit_expr_mut(value);
            }
        }
        Stmt::If { init, cond, then_block, else_branch } => {
            if let Some(init) = init {
                v.visit_stmt_mut(init);
            }
            v.visit_expr_mut(cond);
            v.visit_block_mut(then_block);
            if let Some(else_branch) = else_branch {
                v.visit_stmt_mut(else_branch);
            }
        }
        Stmt::For { init, cond, post, body } => {
            if let Some(init) = init {
                v.visit_stmt_mut(init);
            }
            if let Some(cond) = cond {
                v.visit_expr_mut(cond);
            }
            if let Some(post) = post {
                v.visit_stmt_mut(post);
            }
            v.visit_block_mut(body);
        }
        Stmt::Range { key, value, iter, body, .. } => {
            for target in key.iter_mut().chain(value) {
                v.visit_expr_mut(target);
            }
            v.visit_expr_mut(iter);
            v.visit_block_mut(body);
        }
        Stmt::Switch { init, tag, clauses } => {
            if let Some(init) = init {
                v.visit_stmt_mut(init);
            }
            if let Some(tag) = tag {
                v.visit_expr_mut(tag);
            }
            for clause in clauses {
                for expr in &mut clause.node.exprs {
                    v.visit_expr_mut(expr);
                }
                for stmt in &mut clause.node.body {
                    v.visit_stmt_mut(stmt);
                }
            }
        }
        Stmt::Select { clauses } => {
            for clause in clauses {
                if let Some(comm) = &mut clause.node.comm {
                    v.visit_stmt_mut(comm);
                }
                for stmt in &mut clause.node.body {
                    v.visit_stmt_mut(stmt);
                }
            }
        }
        Stmt::Labeled { stmt, .. } => {
            if let Some(stmt) = stmt {
                v.visit_stmt_mut(stmt);
            }
        }
        Stmt::Block(block) => {
            for stmt in &mut block.stmts {
                v.visit_stmt_mut(stmt);
            }
        }
        Stmt::Goto(_) | Stmt::Break(_) | Stmt::Continue(_) | Stmt::Fallthrough => {}
    }
}

pub fn walk_expr_mut<V: VisitMut>(v: &mut V, expr: &mut Spanned<Expr>) {
    match &mut expr.node {
        Expr::Ident(_) | Expr::BasicLit { .. } => {}

        Expr::Unary { operand, .. } => v.visit_expr_mut(operand),
        Expr::Binary { lhs, rhs, .. } => {
            v.visit_expr_mut(lhs);
            v.visit_expr_mut(rhs);
        }
        Expr::Paren(inner) => v.visit_expr_mut(inner),
        Expr::Selector { x, .. } => v.visit_expr_mut(x),
        Expr::Call { func, args, .. } => {
            v.visit_expr_mut(func);
            for arg in args {
                v.visit_expr_mut(arg);
            }
        }
        Expr::Index { x, index } => {
            v.visit_expr_mut(x);
            v.visit_expr_mut(index);
        }
        Expr::IndexList { x, indices } => {
            v.visit_expr_mut(x);
            for index in indices {
                v.visit_expr_mut(index);
            }
        }
        Expr::Slice { x, lo, hi, max } => {
            v.visit_expr_mut(x);
            for bound in [lo, hi, max].into_iter().flatten() {
                v.visit_expr_mut(bound);
            }
        }
        Expr::TypeAssert { x, ty } => {
            v.visit_expr_mut(x);
            if let Some(ty) = ty {
                v.visit_type_expr_mut(ty);
            }
        }
        Expr::CompositeLit { ty, elems } => {
            if let Some(ty) = ty {
                v.visit_type_expr_mut(ty);
            }
            for elem in elems {
                if let Some(key) = &mut elem.key {
                    v.visit_expr_mut(key);
                }
                v.visit_expr_mut(&mut elem.value);
            }
        }
        Expr::FuncLit { sig, body } => {
            v.visit_func_type_mut(sig);
            v.visit_block_mut(body);
        }
        Expr::Type(ty) => v.visit_type_expr_mut(ty),
    }
}

pub fn walk_type_expr_mut<V: VisitMut>(v: &mut V, te: &mut Spanned<TypeExpr>) {
    match &mut te.node {
        TypeExpr::Name(_) | TypeExpr::Qualified { .. } => {}
        TypeExpr::Pointer(inner)
        | TypeExpr::Slice(inner)
        | TypeExpr::Chan(inner)
        | TypeExpr::Variadic(inner)
        | TypeExpr::Paren(inner)
        | TypeExpr::Approx(inner) => v.visit_type_expr_mut(inner),
        TypeExpr::Generic { base, args } => {
            v.visit_type_expr_mut(base);
            for arg in args {
                v.visit_type_expr_mut(arg);
            }
        }
        TypeExpr::Union(terms) => {
            for term in terms {
                v.visit_type_expr_mut(term);
            }
        }
        TypeExpr::Array { len, elem } => {
            if let Some(len) = len {
                v.visit_expr_mut(len);
            }
            v.visit_type_expr_mut(elem);
        }
        TypeExpr::Map { key, value } => {
            v.visit_type_expr_mut(key);
            v.visit_type_expr_mut(value);
        }
        TypeExpr::Func(sig) => v.visit_func_type_mut(sig),
        TypeExpr::Struct(fields) => {
            for field in fields {
                v.visit_type_expr_mut(&mut field.ty);
            }
        }
        TypeExpr::Interface(elems) => {
            for elem in elems {
                match elem {
                    InterfaceElem::Method { sig, .. } => v.visit_func_type_mut(sig),
                    InterfaceElem::Embedded(ty) => v.visit_type_expr_mut(ty),
                }
            }
        }
    }
}
