//! Picking out the identifier occurrences that refer to the target.
//!
//! Identity matching reads the unit's use table and is the normal mode.
//! Name matching is the fallback for modules whose analysis is incomplete:
//! it only ever considers identifiers the analysis left unbound, and only in
//! the syntactic shape the target would take (bare when local, qualified by
//! the `from` import when remote).

use std::collections::HashSet;

use crate::loader::{Module, SourceUnit, assumed_name};
use crate::parser::ast::*;
use crate::resolve::{SymbolId, SymbolKind, SymbolTable};
use crate::span::Spanned;
use crate::visit::{Visitor, walk_expr, walk_type_expr};

use super::imports::ImportTable;
use super::locate::Locate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    ByIdentity { symbol: SymbolId, local: bool },
    ByName { name: String, local: bool },
}

impl Strategy {
    /// `None` when the module is not applicable.
    pub fn for_outcome(outcome: Locate, name: &str) -> Option<Self> {
        match outcome {
            Locate::Resolved { symbol, local } => Some(Strategy::ByIdentity { symbol, local }),
            Locate::Unresolved { local } => Some(Strategy::ByName { name: name.to_string(), local }),
            Locate::NotApplicable => None,
        }
    }

    pub fn is_local(&self) -> bool {
        match self {
            Strategy::ByIdentity { local, .. } | Strategy::ByName { local, .. } => *local,
        }
    }
}

/// A matched occurrence: the bare identifier, or the member identifier of a
/// selector or qualified type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reference {
    Bare(NodeId),
    Qualified(NodeId),
}

impl Reference {
    pub fn id(self) -> NodeId {
        match self {
            Reference::Bare(id) | Reference::Qualified(id) => id,
        }
    }
}

/// The shape every matched reference takes after the rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    Bare { name: String },
    Qualified { alias: String, name: String },
}

/// Receiver base-type identifiers of every method in the module. These name
/// the type a method is bound to and are never relocated.
pub fn receiver_idents(module: &Module) -> HashSet<NodeId> {
    module
        .units
        .iter()
        .flat_map(|unit| &unit.file.decls)
        .filter_map(|decl| match &decl.node {
            Decl::Func(func) => func.recv.as_ref().and_then(|r| r.base_type()).map(|ident| ident.id),
            _ => None,
        })
        .collect()
}

/// Everything `classify` needs besides the unit itself.
pub struct Context<'a> {
    pub strategy: &'a Strategy,
    pub symbols: &'a SymbolTable,
    pub receivers: &'a HashSet<NodeId>,
    /// Import path of the `from` module.
    pub from_path: &'a str,
    pub imports: &'a ImportTable,
}

/// References to the target in `unit`, in source order.
pub fn classify(unit: &SourceUnit, cx: &Context<'_>) -> Vec<Reference> {
    let qualifier = match cx.strategy {
        Strategy::ByName { local: false, .. } => Some(
            cx.imports.alias_of(cx.from_path).map(str::to_string).unwrap_or_else(|| assumed_name(cx.from_path).to_string()),
        ),
        _ => None,
    };
    let mut matcher = Matcher { unit, cx, qualifier, found: Vec::new() };
    for decl in &unit.file.decls {
        matcher.visit_decl(decl);
    }
    let mut found = matcher.found;
    if cx.strategy.is_local() {
        found.retain(|r| !cx.receivers.contains(&r.id()));
    }
    found
}

struct Matcher<'a> {
    unit: &'a SourceUnit,
    cx: &'a Context<'a>,
    /// Qualifier expected by remote name matching.
    qualifier: Option<String>,
    found: Vec<Reference>,
}

impl Matcher<'_> {
    fn bound(&self, id: NodeId) -> bool {
        self.unit.uses.contains_key(&id) || self.unit.defs.contains_key(&id)
    }

    fn bare(&mut self, ident: &Ident) {
        let hit = match self.cx.strategy {
            Strategy::ByIdentity { symbol, local: true } => self.unit.uses.get(&ident.id) == Some(symbol),
            Strategy::ByName { name, local: true } => ident.name == *name && !self.bound(ident.id),
            _ => false,
        };
        if hit {
            self.found.push(Reference::Bare(ident.id));
        }
    }

    fn qualified(&mut self, pkg: &Ident, member: &Ident) {
        let hit = match self.cx.strategy {
            Strategy::ByIdentity { symbol, local: false } => self.unit.uses.get(&member.id) == Some(symbol),
            Strategy::ByName { name, local: false } => {
                member.name == *name
                    && !self.unit.uses.contains_key(&member.id)
                    && self.qualifier.as_deref() == Some(pkg.name.as_str())
                    && self.qualifier_is_import(pkg)
            }
            _ => false,
        };
        if hit {
            self.found.push(Reference::Qualified(member.id));
        }
    }

    /// The qualifier is not bound to a local or package-level name.
    fn qualifier_is_import(&self, pkg: &Ident) -> bool {
        match self.unit.uses.get(&pkg.id) {
            Some(id) => matches!(self.cx.symbols.get(*id).kind, SymbolKind::Import { .. }),
            None => true,
        }
    }
}

impl Visitor for Matcher<'_> {
    fn visit_expr(&mut self, expr: &Spanned<Expr>) {
        match &expr.node {
            Expr::Ident(ident) => self.bare(ident),
            Expr::Selector { x, sel } => match &x.node {
                Expr::Ident(pkg) => {
                    // The left side of `v.M` is a bare use when it resolves to
                    // the target. Unbound names there are taken as qualifiers.
                    if matches!(self.cx.strategy, Strategy::ByIdentity { .. }) {
                        self.bare(pkg);
                    }
                    self.qualified(pkg, sel);
                }
                _ => walk_expr(self, expr),
            },
            _ => walk_expr(self, expr),
        }
    }

    fn visit_type_expr(&mut self, te: &Spanned<TypeExpr>) {
        match &te.node {
            TypeExpr::Name(ident) => self.bare(ident),
            TypeExpr::Qualified { pkg, name } => self.qualified(pkg, name),
            _ => walk_type_expr(self, te),
        }
    }
}
