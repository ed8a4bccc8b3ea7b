//! Final text of a rewritten unit.
//!
//! Replacement nodes (those built by a rewrite, carrying synthetic ids) are
//! rendered with `PrettyPrinter` and spliced into the original text at the
//! spans of the nodes they replaced. Everything else is kept byte-for-byte.
//! Imports no longer referenced are pruned; when the import set changes the
//! import section is regenerated, standard library first. The result must
//! parse again.

use std::collections::HashSet;

use tracing::debug;

use crate::diagnostics::FormatError;
use crate::loader::{SourceUnit, assumed_name};
use crate::parser::ast::*;
use crate::parser::parse_source;
use crate::resolve::{SymbolKind, SymbolTable};
use crate::span::{LineIndex, Span, Spanned};
use crate::visit::{Visitor, walk_expr, walk_type_expr};

/// Produce the final text of `unit`, whose tree has been rewritten in place.
/// `added` are imports to register; `package_name` gives the package clause
/// name of an import path when it is known.
pub fn normalize(
    unit: &SourceUnit,
    symbols: &SymbolTable,
    added: &[ImportSpec],
    package_name: impl Fn(&str) -> Option<String>,
) -> Result<String, FormatError> {
    let mut collector = Splices::default();
    collector.visit_file(&unit.file);
    let mut splices = collector.splices;

    let used = used_qualifiers(unit, symbols);
    let referenced = referenced_imports(unit, symbols);
    let implicit = |path: &str| package_name(path).unwrap_or_else(|| assumed_name(path).to_string());

    let existing: Vec<&ImportSpec> = unit.file.imports.iter().flat_map(|d| &d.node.specs).map(|s| &s.node).collect();
    let mut kept: Vec<ImportSpec> = Vec::new();
    let mut pruned = 0;
    for (i, spec) in existing.iter().copied().chain(added).enumerate() {
        // An existing import nothing was bound to is left alone: its name is
        // only a guess, so an absent qualifier says nothing.
        let unbound = i < existing.len() && !referenced.contains(spec.path.as_str());
        let keep = spec.is_blank() || spec.is_dot() || unbound || {
            let name = spec.name.as_ref().map(|n| n.name.clone()).unwrap_or_else(|| implicit(&spec.path));
            used.contains(&name)
        };
        let duplicate = kept.iter().any(|k| k.path == spec.path && same_name(k, spec));
        if keep && !duplicate {
            kept.push(spec.clone());
        } else if !duplicate {
            debug!(path = %spec.path, file = %unit.path.display(), "pruning unused import");
            pruned += 1;
        }
    }

    if pruned > 0 || !added.is_empty() {
        splices.push(import_section_splice(unit, &kept));
    }

    let text = apply_splices(unit, splices)?;
    validate(unit, &text)?;
    Ok(text)
}

fn same_name(a: &ImportSpec, b: &ImportSpec) -> bool {
    a.name.as_ref().map(|n| &n.name) == b.name.as_ref().map(|n| &n.name)
}

// ---- Replacement discovery ----

#[derive(Default)]
struct Splices {
    splices: Vec<(Span, String)>,
}

fn is_replacement_expr(expr: &Expr) -> bool {
    match expr {
        Expr::Ident(ident) => ident.id.is_synthetic(),
        Expr::Selector { sel, .. } => sel.id.is_synthetic(),
        _ => false,
    }
}

fn is_replacement_type(te: &TypeExpr) -> bool {
    match te {
        TypeExpr::Name(ident) => ident.id.is_synthetic(),
        TypeExpr::Qualified { name, .. } => name.id.is_synthetic(),
        _ => false,
    }
}

impl Visitor for Splices {
    fn visit_expr(&mut self, expr: &Spanned<Expr>) {
        if is_replacement_expr(&expr.node) {
            self.splices.push((expr.span, render_expr(expr)));
            return;
        }
        walk_expr(self, expr);
    }

    fn visit_type_expr(&mut self, te: &Spanned<TypeExpr>) {
        if is_replacement_type(&te.node) {
            self.splices.push((te.span, render_type(te)));
            return;
        }
        walk_type_expr(self, te);
    }
}

/// Import paths that at least one identifier of the unit resolved to before
/// the rewrite.
fn referenced_imports<'a>(unit: &SourceUnit, symbols: &'a SymbolTable) -> HashSet<&'a str> {
    unit.uses
        .values()
        .filter_map(|id| match &symbols.get(*id).kind {
            SymbolKind::Import { path } => Some(path.as_str()),
            _ => None,
        })
        .collect()
}

/// Names used as package qualifiers in the unit. A qualifier bound to
/// something other than an import (a local that shadows it) does not count.
fn used_qualifiers(unit: &SourceUnit, symbols: &SymbolTable) -> HashSet<String> {
    struct Qualifiers<'a> {
        unit: &'a SourceUnit,
        symbols: &'a SymbolTable,
        names: HashSet<String>,
    }

    impl Qualifiers<'_> {
        fn note(&mut self, qualifier: &Ident) {
            let is_import = match self.unit.uses.get(&qualifier.id) {
                Some(id) => matches!(self.symbols.get(*id).kind, SymbolKind::Import { .. }),
                None => true,
            };
            if is_import {
                self.names.insert(qualifier.name.clone());
            }
        }
    }

    impl Visitor for Qualifiers<'_> {
        fn visit_expr(&mut self, expr: &Spanned<Expr>) {
            if let Expr::Selector { x, .. } = &expr.node {
                if let Expr::Ident(qualifier) = &x.node {
                    self.note(qualifier);
                }
            }
            walk_expr(self, expr);
        }

        fn visit_type_expr(&mut self, te: &Spanned<TypeExpr>) {
            if let TypeExpr::Qualified { pkg, .. } = &te.node {
                self.note(pkg);
            }
            walk_type_expr(self, te);
        }
    }

    let mut collector = Qualifiers { unit, symbols, names: HashSet::new() };
    collector.visit_file(&unit.file);
    collector.names
}

// ---- Import section ----

fn is_std_path(path: &str) -> bool {
    !path.split('/').next().unwrap_or(path).contains('.')
}

fn import_line(spec: &ImportSpec) -> String {
    match &spec.name {
        Some(name) => format!("{} \"{}\"", name.name, spec.path),
        None => format!("\"{}\"", spec.path),
    }
}

/// goimports layout: a group with the standard library first and a blank
/// line before the rest. A lone import stays on one line unless `grouped`.
pub fn render_imports(specs: &[ImportSpec], grouped: bool) -> String {
    match specs {
        [] => String::new(),
        [only] if !grouped => format!("import {}", import_line(only)),
        _ => {
            let (mut std, mut rest): (Vec<&ImportSpec>, Vec<&ImportSpec>) =
                specs.iter().partition(|s| is_std_path(&s.path));
            std.sort_by(|a, b| a.path.cmp(&b.path));
            rest.sort_by(|a, b| a.path.cmp(&b.path));
            let mut out = String::from("import (\n");
            for spec in &std {
                out.push_str(&format!("\t{}\n", import_line(spec)));
            }
            if !std.is_empty() && !rest.is_empty() {
                out.push('\n');
            }
            for spec in &rest {
                out.push_str(&format!("\t{}\n", import_line(spec)));
            }
            out.push(')');
            out
        }
    }
}

fn import_section_splice(unit: &SourceUnit, kept: &[ImportSpec]) -> (Span, String) {
    let grouped = unit.file.imports.iter().any(|d| d.node.grouped);
    let text = render_imports(kept, grouped);
    let source = &unit.source;
    match (unit.file.imports.first(), unit.file.imports.last()) {
        (Some(first), Some(last)) if kept.is_empty() => {
            // Drop the section and the line breaks after it.
            let trailing = source[last.span.end..].bytes().take_while(|b| matches!(b, b'\n' | b'\r')).count();
            (Span::new(first.span.start, last.span.end + trailing), String::new())
        }
        (Some(first), Some(last)) => (Span::new(first.span.start, last.span.end), text),
        _ => {
            // No imports yet: open a section after the package clause line.
            let clause_end = unit.file.package.span.end;
            match source[clause_end..].find('\n') {
                Some(offset) => {
                    let at = clause_end + offset + 1;
                    (Span::new(at, at), format!("\n{text}\n"))
                }
                None => (Span::new(source.len(), source.len()), format!("\n\n{text}\n")),
            }
        }
    }
}

// ---- Splicing & validation ----

fn apply_splices(unit: &SourceUnit, mut splices: Vec<(Span, String)>) -> Result<String, FormatError> {
    splices.sort_by_key(|(span, _)| (span.start, span.end));
    let mut out = String::with_capacity(unit.source.len());
    let mut cursor = 0;
    for (span, text) in splices {
        if span.start < cursor {
            return Err(FormatError::Overlap { path: unit.path.clone(), at: span.start });
        }
        out.push_str(&unit.source[cursor..span.start]);
        out.push_str(&text);
        cursor = span.end;
    }
    out.push_str(&unit.source[cursor..]);
    Ok(out)
}

fn validate(unit: &SourceUnit, text: &str) -> Result<(), FormatError> {
    match parse_source(text, 0) {
        Ok(_) => Ok(()),
        Err(err) => {
            let pos = LineIndex::new(text).position(err.span.start);
            Err(FormatError::Invalid { path: unit.path.clone(), line: pos.line, column: pos.column, msg: err.msg })
        }
    }
}

// ---- Printer ----

pub fn render_expr(expr: &Spanned<Expr>) -> String {
    let mut pp = PrettyPrinter::new();
    pp.emit_expr(&expr.node);
    pp.buf
}

pub fn render_type(te: &Spanned<TypeExpr>) -> String {
    let mut pp = PrettyPrinter::new();
    pp.emit_type(&te.node);
    pp.buf
}

struct PrettyPrinter {
    buf: String,
    indent: usize,
}

impl PrettyPrinter {
    fn new() -> Self {
        Self { buf: String::new(), indent: 0 }
    }

    fn write(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    fn newline(&mut self) {
        self.buf.push('\n');
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.buf.push('\t');
        }
    }

    fn comma_separated<T>(&mut self, items: &[T], mut emit: impl FnMut(&mut Self, &T)) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            emit(self, item);
        }
    }

    fn emit_names(&mut self, names: &[Ident]) {
        self.comma_separated(names, |pp, n| pp.write(&n.name));
    }

    // ── Types ────────────────────────────────────────────────────────

    fn emit_type(&mut self, te: &TypeExpr) {
        match te {
            TypeExpr::Name(ident) => self.write(&ident.name),
            TypeExpr::Qualified { pkg, name } => {
                self.write(&pkg.name);
                self.write(".");
                self.write(&name.name);
            }
            TypeExpr::Pointer(inner) => {
                self.write("*");
                self.emit_type(&inner.node);
            }
            TypeExpr::Slice(inner) => {
                self.write("[]");
                self.emit_type(&inner.node);
            }
            TypeExpr::Array { len, elem } => {
                self.write("[");
                match len {
                    Some(len) => self.emit_expr(&len.node),
                    None => self.write("..."),
                }
                self.write("]");
                self.emit_type(&elem.node);
            }
            TypeExpr::Map { key, value } => {
                self.write("map[");
                self.emit_type(&key.node);
                self.write("]");
                self.emit_type(&value.node);
            }
            TypeExpr::Chan(inner) => {
                self.write("chan ");
                self.emit_type(&inner.node);
            }
            TypeExpr::Func(sig) => {
                self.write("func");
                self.emit_signature(sig);
            }
            TypeExpr::Struct(fields) => self.emit_struct(fields),
            TypeExpr::Interface(elems) => self.emit_interface(elems),
            TypeExpr::Variadic(inner) => {
                self.write("...");
                self.emit_type(&inner.node);
            }
            TypeExpr::Paren(inner) => {
                self.write("(");
                self.emit_type(&inner.node);
                self.write(")");
            }
            TypeExpr::Generic { base, args } => {
                self.emit_type(&base.node);
                self.write("[");
                self.comma_separated(args, |pp, arg| pp.emit_type(&arg.node));
                self.write("]");
            }
            TypeExpr::Approx(inner) => {
                self.write("~");
                self.emit_type(&inner.node);
            }
            TypeExpr::Union(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        self.write(" | ");
                    }
                    self.emit_type(&term.node);
                }
            }
        }
    }

    fn emit_type_params(&mut self, tparams: &[Param]) {
        if !tparams.is_empty() {
            self.write("[");
            self.emit_params(tparams);
            self.write("]");
        }
    }

    fn emit_params(&mut self, params: &[Param]) {
        self.comma_separated(params, |pp, param| {
            if !param.names.is_empty() {
                pp.emit_names(&param.names);
                pp.write(" ");
            }
            pp.emit_type(&param.ty.node);
        });
    }

    fn emit_signature(&mut self, sig: &FuncType) {
        self.write("(");
        self.emit_params(&sig.params);
        self.write(")");
        match sig.results.as_slice() {
            [] => {}
            [single] if single.names.is_empty() => {
                self.write(" ");
                self.emit_type(&single.ty.node);
            }
            results => {
                self.write(" (");
                self.emit_params(results);
                self.write(")");
            }
        }
    }

    fn emit_struct(&mut self, fields: &[FieldDecl]) {
        if fields.is_empty() {
            self.write("struct{}");
            return;
        }
        self.write("struct {");
        self.newline();
        self.indent += 1;
        for field in fields {
            self.write_indent();
            if !field.names.is_empty() {
                self.emit_names(&field.names);
                self.write(" ");
            }
            self.emit_type(&field.ty.node);
            if let Some(tag) = &field.tag {
                self.write(" ");
                self.write(tag);
            }
            self.newline();
        }
        self.indent -= 1;
        self.write_indent();
        self.write("}");
    }

    fn emit_interface(&mut self, elems: &[InterfaceElem]) {
        if elems.is_empty() {
            self.write("interface{}");
            return;
        }
        self.write("interface {");
        self.newline();
        self.indent += 1;
        for elem in elems {
            self.write_indent();
            match elem {
                InterfaceElem::Method { name, sig } => {
                    self.write(&name.name);
                    self.emit_signature(sig);
                }
                InterfaceElem::Embedded(ty) => self.emit_type(&ty.node),
            }
            self.newline();
        }
        self.indent -= 1;
        self.write_indent();
        self.write("}");
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn emit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(ident) => self.write(&ident.name),
            Expr::BasicLit { raw, .. } => self.write(raw),
            Expr::Unary { op, operand } => {
                self.write(op.as_str());
                self.emit_expr(&operand.node);
            }
            Expr::Binary { op, lhs, rhs } => {
                self.emit_expr(&lhs.node);
                self.write(" ");
                self.write(op.as_str());
                self.write(" ");
                self.emit_expr(&rhs.node);
            }
            Expr::Paren(inner) => {
                self.write("(");
                self.emit_expr(&inner.node);
                self.write(")");
            }
            Expr::Selector { x, sel } => {
                self.emit_expr(&x.node);
                self.write(".");
                self.write(&sel.name);
            }
            Expr::Call { func, args, ellipsis } => {
                self.emit_expr(&func.node);
                self.write("(");
                self.comma_separated(args, |pp, arg| pp.emit_expr(&arg.node));
                if *ellipsis {
                    self.write("...");
                }
                self.write(")");
            }
            Expr::Index { x, index } => {
                self.emit_expr(&x.node);
                self.write("[");
                self.emit_expr(&index.node);
                self.write("]");
            }
            Expr::IndexList { x, indices } => {
                self.emit_expr(&x.node);
                self.write("[");
                self.emit_exprs(indices);
                self.write("]");
            }
            Expr::Slice { x, lo, hi, max } => {
                self.emit_expr(&x.node);
                self.write("[");
                if let Some(lo) = lo {
                    self.emit_expr(&lo.node);
                }
                self.write(":");
                if let Some(hi) = hi {
                    self.emit_expr(&hi.node);
                }
                if let Some(max) = max {
                    self.write(":");
                    self.emit_expr(&max.node);
                }
                self.write("]");
            }
            Expr::TypeAssert { x, ty } => {
                self.emit_expr(&x.node);
                self.write(".(");
                match ty {
                    Some(ty) => self.emit_type(&ty.node),
                    None => self.write("type"),
                }
                self.write(")");
            }
            Expr::CompositeLit { ty, elems } => {
                if let Some(ty) = ty {
                    self.emit_type(&ty.node);
                }
                self.write("{");
                self.comma_separated(elems, |pp, elem| {
                    if let Some(key) = &elem.key {
                        pp.emit_expr(&key.node);
                        pp.write(": ");
                    }
                    pp.emit_expr(&elem.value.node);
                });
                self.write("}");
            }
            Expr::FuncLit { sig, body } => {
                self.write("func");
                self.emit_signature(sig);
                self.write(" ");
                self.emit_block(&body.node);
            }
            Expr::Type(ty) => self.emit_type(&ty.node),
        }
    }

    // ── Statements (function literal bodies) ─────────────────────────

    fn emit_block(&mut self, block: &Block) {
        self.write("{");
        self.newline();
        self.indent += 1;
        for stmt in &block.stmts {
            self.write_indent();
            self.emit_stmt(&stmt.node);
            self.newline();
        }
        self.indent -= 1;
        self.write_indent();
        self.write("}");
    }

    fn emit_value_spec(&mut self, spec: &ValueSpec) {
        self.emit_names(&spec.names);
        if let Some(ty) = &spec.ty {
            self.write(" ");
            self.emit_type(&ty.node);
        }
        if !spec.values.is_empty() {
            self.write(" = ");
            self.comma_separated(&spec.values, |pp, v| pp.emit_expr(&v.node));
        }
    }

    fn emit_specs(&mut self, keyword: &str, specs: &[ValueSpec]) {
        self.write(keyword);
        self.write(" ");
        match specs {
            [single] => self.emit_value_spec(single),
            _ => {
                self.write("(");
                self.newline();
                self.indent += 1;
                for spec in specs {
                    self.write_indent();
                    self.emit_value_spec(spec);
                    self.newline();
                }
                self.indent -= 1;
                self.write_indent();
                self.write(")");
            }
        }
    }

    fn emit_type_spec(&mut self, spec: &TypeSpec) {
        self.write(&spec.name.name);
        self.emit_type_params(&spec.tparams);
        self.write(if spec.alias { " = " } else { " " });
        self.emit_type(&spec.ty.node);
    }

    fn emit_jump(&mut self, keyword: &str, label: Option<&Ident>) {
        self.write(keyword);
        if let Some(label) = label {
            self.write(" ");
            self.write(&label.name);
        }
    }

    fn emit_exprs(&mut self, exprs: &[Spanned<Expr>]) {
        self.comma_separated(exprs, |pp, e| pp.emit_expr(&e.node));
    }

    fn emit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Var(specs) => self.emit_specs("var", specs),
            Stmt::Const(specs) => self.emit_specs("const", specs),
            Stmt::Type(specs) => {
                self.write("type ");
                match specs.as_slice() {
                    [single] => self.emit_type_spec(single),
                    _ => {
                        self.write("(");
                        self.newline();
                        self.indent += 1;
                        for spec in specs {
                            self.write_indent();
                            self.emit_type_spec(spec);
                            self.newline();
                        }
                        self.indent -= 1;
                        self.write_indent();
                        self.write(")");
                    }
                }
            }
            Stmt::ShortVar { names, values } => {
                self.emit_names(names);
                self.write(" := ");
                self.emit_exprs(values);
            }
            Stmt::Assign { lhs, op, rhs } => {
                self.emit_exprs(lhs);
                self.write(" ");
                self.write(op.as_str());
                self.write(" ");
                self.emit_exprs(rhs);
            }
            Stmt::IncDec { target, inc } => {
                self.emit_expr(&target.node);
                self.write(if *inc { "++" } else { "--" });
            }
            Stmt::Send { chan, value } => {
                self.emit_expr(&chan.node);
                self.write(" <- ");
                self.emit_expr(&value.node);
            }
            Stmt::Expr(expr) => self.emit_expr(&expr.node),
            Stmt::Return(values) => {
                self.write("return");
                if !values.is_empty() {
                    self.write(" ");
                    self.emit_exprs(values);
                }
            }
            Stmt::If { init, cond, then_block, else_branch } => {
                self.write("if ");
                if let Some(init) = init {
                    self.emit_stmt(&init.node);
                    self.write("; ");
                }
                self.emit_expr(&cond.node);
                self.write(" ");
                self.emit_block(&then_block.node);
                if let Some(else_branch) = else_branch {
                    self.write(" else ");
                    self.emit_stmt(&else_branch.node);
                }
            }
            Stmt::For { init, cond, post, body } => {
                self.write("for ");
                if init.is_some() || post.is_some() {
                    if let Some(init) = init {
                        self.emit_stmt(&init.node);
                    }
                    self.write("; ");
                    if let Some(cond) = cond {
                        self.emit_expr(&cond.node);
                    }
                    self.write("; ");
                    if let Some(post) = post {
                        self.emit_stmt(&post.node);
                    }
                    self.write(" ");
                } else if let Some(cond) = cond {
                    self.emit_expr(&cond.node);
                    self.write(" ");
                }
                self.emit_block(&body.node);
            }
            Stmt::Range { key, value, define, iter, body } => {
                self.write("for ");
                if let Some(key) = key {
                    self.emit_expr(&key.node);
                    if let Some(value) = value {
                        self.write(", ");
                        self.emit_expr(&value.node);
                    }
                    self.write(if *define { " := " } else { " = " });
                }
                self.write("range ");
                self.emit_expr(&iter.node);
                self.write(" ");
                self.emit_block(&body.node);
            }
            Stmt::Switch { init, tag, clauses } => {
                self.write("switch ");
                if let Some(init) = init {
                    self.emit_stmt(&init.node);
                    // A type switch binding is the whole header.
                    if tag.is_some() {
                        self.write("; ");
                    } else {
                        self.write(" ");
                    }
                }
                if let Some(tag) = tag {
                    self.emit_expr(&tag.node);
                    self.write(" ");
                }
                self.write("{");
                self.newline();
                for clause in clauses {
                    self.write_indent();
                    if clause.node.is_default {
                        self.write("default:");
                    } else {
                        self.write("case ");
                        self.emit_exprs(&clause.node.exprs);
                        self.write(":");
                    }
                    self.newline();
                    self.indent += 1;
                    for stmt in &clause.node.body {
                        self.write_indent();
                        self.emit_stmt(&stmt.node);
                        self.newline();
                    }
                    self.indent -= 1;
                }
                self.write_indent();
                self.write("}");
            }
            Stmt::Block(block) => self.emit_block(block),
            Stmt::Go(expr) => {
                self.write("go ");
                self.emit_expr(&expr.node);
            }
            Stmt::Defer(expr) => {
                self.write("defer ");
                self.emit_expr(&expr.node);
            }
            Stmt::Select { clauses } => {
                self.write("select {");
                self.newline();
                for clause in clauses {
                    self.write_indent();
                    match &clause.node.comm {
                        Some(comm) => {
                            self.write("case ");
                            self.emit_stmt(&comm.node);
                            self.write(":");
                        }
                        None => self.write("default:"),
                    }
                    self.newline();
                    self.indent += 1;
                    for stmt in &clause.node.body {
                        self.write_indent();
                        self.emit_stmt(&stmt.node);
                        self.newline();
                    }
                    self.indent -= 1;
                }
                self.write_indent();
                self.write("}");
            }
            Stmt::Labeled { label, stmt } => {
                self.write(&label.name);
                self.write(":");
                if let Some(stmt) = stmt {
                    self.newline();
                    self.write_indent();
                    self.emit_stmt(&stmt.node);
                }
            }
            Stmt::Goto(label) => {
                self.write("goto ");
                self.write(&label.name);
            }
            Stmt::Break(label) => self.emit_jump("break", label.as_ref()),
            Stmt::Continue(label) => self.emit_jump("continue", label.as_ref()),
            Stmt::Fallthrough => self.write("fallthrough"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::lexer;
    use crate::resolve::resolve_project;
    use crate::loader::Module;
    use crate::visit::{VisitMut, walk_expr_mut, walk_type_expr_mut};
    use std::path::PathBuf;

    fn parse_expr(src: &str) -> Spanned<Expr> {
        let tokens = lexer::lex(src).unwrap();
        Parser::new(&tokens, src).parse_expr().unwrap()
    }

    fn unit(src: &str) -> (SourceUnit, SymbolTable) {
        let (file, _) = parse_source(src, 0).unwrap();
        let unit = SourceUnit::new(PathBuf::from("a.go"), src.to_string(), file);
        let mut modules = vec![Module::new("ex/a".into(), "a".into(), PathBuf::from("a"), vec![unit])];
        let mut symbols = SymbolTable::new();
        resolve_project(&mut modules, &mut symbols);
        let module = modules.pop().unwrap();
        (module.units.into_iter().next().unwrap(), symbols)
    }

    /// Replaces every `Old` name with `alias.New` (or `New` with no alias).
    struct Replace<'a> {
        alias: Option<&'a str>,
    }

    impl Replace<'_> {
        fn ident(&self, name: &str, span: Span) -> Ident {
            Ident::synthetic(name, span)
        }
    }

    impl VisitMut for Replace<'_> {
        fn visit_expr_mut(&mut self, expr: &mut Spanned<Expr>) {
            if matches!(&expr.node, Expr::Ident(i) if i.name == "Old") {
                let span = expr.span;
                expr.node = match self.alias {
                    Some(alias) => Expr::Selector {
                        x: Box::new(Spanned::new(Expr::Ident(self.ident(alias, span)), span)),
                        sel: self.ident("New", span),
                    },
                    None => Expr::Ident(self.ident("New", span)),
                };
                return;
            }
            walk_expr_mut(self, expr);
        }

        fn visit_type_expr_mut(&mut self, te: &mut Spanned<TypeExpr>) {
            if matches!(&te.node, TypeExpr::Name(i) if i.name == "Old") {
                let span = te.span;
                te.node = match self.alias {
                    Some(alias) => TypeExpr::Qualified { pkg: self.ident(alias, span), name: self.ident("New", span) },
                    None => TypeExpr::Name(self.ident("New", span)),
                };
                return;
            }
            walk_type_expr_mut(self, te);
        }
    }

    fn rewrite(unit: &mut SourceUnit, alias: Option<&str>) {
        let mut replace = Replace { alias };
        replace.visit_file_mut(&mut unit.file);
    }

    fn no_names(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn render_round_trips_expressions() {
        for src in [
            "a.b(c, d...)",
            "x[1:2:3]",
            "[]int{1, 2}",
            "map[string]T{\"a\": {X: 1}}",
            "-x + y * z",
            "v.(type)",
            "func(a int) (int, error) {\n\treturn a, nil\n}",
            "struct{}{}",
            "List[int]{}",
            "Map[string, *T](m)",
            "func() {\n\tselect {\n\tcase v := <-c:\n\t\tuse(v)\n\tdefault:\n\t}\n}",
            "func() {\n\tL:\n\tfor {\n\t\tbreak L\n\t}\n}",
        ] {
            assert_eq!(render_expr(&parse_expr(src)), src);
        }
    }

    #[test]
    fn render_types() {
        let src = "var x map[pkg.K][]*[4]chan func(int) bool\n";
        let (file, _) = parse_source(&format!("package p\n{src}"), 0).unwrap();
        let Decl::Var(specs) = &file.decls[0].node else { panic!("expected var") };
        let ty = specs[0].ty.as_ref().unwrap();
        assert_eq!(render_type(ty), "map[pkg.K][]*[4]chan func(int) bool");
    }

    #[test]
    fn splice_keeps_untouched_text() {
        let src = "package p\n\n// Old stays in comments.\nvar x Old   // trailing\nvar y = Old{}\n\ntype Old int\n";
        let (mut u, symbols) = unit(src);
        rewrite(&mut u, None);
        let out = normalize(&u, &symbols, &[], no_names).unwrap();
        assert_eq!(
            out,
            "package p\n\n// Old stays in comments.\nvar x New   // trailing\nvar y = New{}\n\ntype Old int\n"
        );
    }

    #[test]
    fn added_import_opens_section() {
        let src = "package p\n\nvar x Old\n";
        let (mut u, symbols) = unit(src);
        rewrite(&mut u, Some("lib"));
        let added = ImportSpec { name: None, path: "example.com/lib".to_string() };
        let out = normalize(&u, &symbols, &[added], no_names).unwrap();
        assert_eq!(out, "package p\n\nimport \"example.com/lib\"\n\nvar x lib.New\n");
    }

    #[test]
    fn unused_import_is_pruned_and_section_regrouped() {
        let src = "package p\n\nimport (\n\t\"example.com/old\"\n\t\"fmt\"\n)\n\nfunc f() { fmt.Println(old.Old) }\n";
        let (mut u, symbols) = unit(src);
        // old.Old -> New: the selector root stays; rewrite the whole selector by hand.
        struct Local;
        impl VisitMut for Local {
            fn visit_expr_mut(&mut self, expr: &mut Spanned<Expr>) {
                if matches!(&expr.node, Expr::Selector { sel, .. } if sel.name == "Old") {
                    expr.node = Expr::Ident(Ident::synthetic("New", expr.span));
                    return;
                }
                walk_expr_mut(self, expr);
            }
        }
        Local.visit_file_mut(&mut u.file);
        let out = normalize(&u, &symbols, &[], no_names).unwrap();
        assert_eq!(out, "package p\n\nimport (\n\t\"fmt\"\n)\n\nfunc f() { fmt.Println(New) }\n");
    }

    #[test]
    fn pruning_every_import_removes_section() {
        let src = "package p\n\nimport \"example.com/old\"\n\nvar x = old.Old\n";
        let (mut u, symbols) = unit(src);
        struct Local;
        impl VisitMut for Local {
            fn visit_expr_mut(&mut self, expr: &mut Spanned<Expr>) {
                if matches!(&expr.node, Expr::Selector { .. }) {
                    expr.node = Expr::Ident(Ident::synthetic("New", expr.span));
                    return;
                }
                walk_expr_mut(self, expr);
            }
        }
        Local.visit_file_mut(&mut u.file);
        let out = normalize(&u, &symbols, &[], no_names).unwrap();
        assert_eq!(out, "package p\n\nvar x = New\n");
    }

    /// Collapses every `pkg.Old` selector into a bare `New`.
    struct Collapse;

    impl VisitMut for Collapse {
        fn visit_expr_mut(&mut self, expr: &mut Spanned<Expr>) {
            if matches!(&expr.node, Expr::Selector { sel, .. } if sel.name == "Old") {
                expr.node = Expr::Ident(Ident::synthetic("New", expr.span));
                return;
            }
            walk_expr_mut(self, expr);
        }
    }

    #[test]
    fn blank_and_dot_imports_survive_pruning() {
        let src = "package p\n\nimport (\n\t_ \"example.com/side\"\n\t. \"example.com/dot\"\n\t\"example.com/gone\"\n)\n\nvar x = gone.Old\n";
        let (mut u, symbols) = unit(src);
        Collapse.visit_file_mut(&mut u.file);
        let out = normalize(&u, &symbols, &[], no_names).unwrap();
        assert_eq!(
            out,
            "package p\n\nimport (\n\t. \"example.com/dot\"\n\t_ \"example.com/side\"\n)\n\nvar x = New\n"
        );
    }

    #[test]
    fn imports_with_unconventional_paths_are_kept_while_used() {
        let src = "package p\n\nimport (\n\t\"example.com/gen/go.proto\"\n\t\"example.com/old\"\n\t\"github.com/mattn/go-isatty\"\n\t\"gopkg.in/yaml.v2\"\n)\n\nvar a = old.Old\nvar b = isatty.IsTerminal\nvar c = yaml.Marshal\nvar d = proto.Message\n";
        let (mut u, symbols) = unit(src);
        Collapse.visit_file_mut(&mut u.file);
        let out = normalize(&u, &symbols, &[], no_names).unwrap();
        assert!(!out.contains("\"example.com/old\""), "got:\n{out}");
        for path in ["example.com/gen/go.proto", "github.com/mattn/go-isatty", "gopkg.in/yaml.v2"] {
            assert!(out.contains(&format!("\t\"{path}\"\n")), "{path} was dropped:\n{out}");
        }
        assert!(out.ends_with("var a = New\nvar b = isatty.IsTerminal\nvar c = yaml.Marshal\nvar d = proto.Message\n"));
    }

    #[test]
    fn never_referenced_import_is_left_alone() {
        let src = "package p\n\nimport \"example.com/unused\"\n\nvar x Old\n";
        let (mut u, symbols) = unit(src);
        rewrite(&mut u, None);
        let out = normalize(&u, &symbols, &[], no_names).unwrap();
        assert_eq!(out, "package p\n\nimport \"example.com/unused\"\n\nvar x New\n");
    }

    #[test]
    fn std_imports_group_first() {
        let specs = vec![
            ImportSpec { name: None, path: "example.com/z".into() },
            ImportSpec { name: Some(Ident::synthetic("y", Span::dummy())), path: "example.com/a".into() },
            ImportSpec { name: None, path: "strings".into() },
            ImportSpec { name: None, path: "fmt".into() },
        ];
        insta::assert_snapshot!(render_imports(&specs, false), @r#"
        import (
        	"fmt"
        	"strings"

        	y "example.com/a"
        	"example.com/z"
        )
        "#);
    }

    #[test]
    fn lone_import_line() {
        let specs = vec![ImportSpec { name: None, path: "fmt".into() }];
        assert_eq!(render_imports(&specs, false), "import \"fmt\"");
        assert_eq!(render_imports(&specs, true), "import (\n\t\"fmt\"\n)");
    }

    #[test]
    fn package_name_decides_implicit_alias() {
        // The import's package clause says `realname`, so `realname.X` keeps it.
        let src = "package p\n\nimport \"example.com/v2\"\n\nvar x = realname.X\nvar y Old\n";
        let (mut u, symbols) = unit(src);
        rewrite(&mut u, None);
        let out = normalize(&u, &symbols, &[], |path: &str| {
            (path == "example.com/v2").then(|| "realname".to_string())
        })
        .unwrap();
        assert!(out.contains("import \"example.com/v2\""));
        assert!(out.ends_with("var y New\n"));
    }

    #[test]
    fn overlapping_splices_are_rejected() {
        let (u, _) = unit("package p\nvar x int\n");
        let err = apply_splices(&u, vec![(Span::new(10, 15), "a".into()), (Span::new(12, 14), "b".into())]).unwrap_err();
        assert!(matches!(err, FormatError::Overlap { at: 12, .. }));
    }

    #[test]
    fn invalid_result_is_reported() {
        let (u, _) = unit("package p\nvar x int\n");
        let err = validate(&u, "package p\nvar x = \n").unwrap_err();
        assert!(matches!(err, FormatError::Invalid { line: 2, .. }));
    }
}
