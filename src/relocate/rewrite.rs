//! Structural substitution of matched references.

use std::collections::HashSet;

use crate::parser::ast::*;
use crate::span::{Span, Spanned};
use crate::visit::{VisitMut, walk_expr_mut, walk_type_expr_mut};

use super::classify::{Reference, Replacement};

impl Replacement {
    fn expr(&self, span: Span) -> Expr {
        match self {
            Replacement::Bare { name } => Expr::Ident(Ident::synthetic(name.clone(), span)),
            Replacement::Qualified { alias, name } => Expr::Selector {
                x: Box::new(Spanned::new(Expr::Ident(Ident::synthetic(alias.clone(), span)), span)),
                sel: Ident::synthetic(name.clone(), span),
            },
        }
    }

    fn type_expr(&self, span: Span) -> TypeExpr {
        match self {
            Replacement::Bare { name } => TypeExpr::Name(Ident::synthetic(name.clone(), span)),
            Replacement::Qualified { alias, name } => TypeExpr::Qualified {
                pkg: Ident::synthetic(alias.clone(), span),
                name: Ident::synthetic(name.clone(), span),
            },
        }
    }
}

struct Rewriter<'a> {
    targets: HashSet<NodeId>,
    replacement: &'a Replacement,
    replaced: Vec<Span>,
}

impl VisitMut for Rewriter<'_> {
    fn visit_expr_mut(&mut self, expr: &mut Spanned<Expr>) {
        let hit = match &expr.node {
            Expr::Ident(ident) => self.targets.contains(&ident.id),
            Expr::Selector { sel, .. } => self.targets.contains(&sel.id),
            _ => false,
        };
        if hit {
            expr.node = self.replacement.expr(expr.span);
            self.replaced.push(expr.span);
            return;
        }
        walk_expr_mut(self, expr);
    }

    fn visit_type_expr_mut(&mut self, te: &mut Spanned<TypeExpr>) {
        let hit = match &te.node {
            TypeExpr::Name(ident) => self.targets.contains(&ident.id),
            TypeExpr::Qualified { name, .. } => self.targets.contains(&name.id),
            _ => false,
        };
        if hit {
            te.node = self.replacement.type_expr(te.span);
            self.replaced.push(te.span);
            return;
        }
        walk_type_expr_mut(self, te);
    }
}

/// Replace every reference in `refs` with `replacement`, one traversal per
/// top-level declaration. Returns the spans replaced, in source order.
pub fn rewrite(file: &mut SourceFile, refs: &[Reference], replacement: &Replacement) -> Vec<Span> {
    let mut rewriter =
        Rewriter { targets: refs.iter().map(|r| r.id()).collect(), replacement, replaced: Vec::new() };
    for decl in &mut file.decls {
        rewriter.visit_decl_mut(decl);
    }
    rewriter.replaced
}
