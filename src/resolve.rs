//! Name resolution over a loaded project.
//!
//! Resolution runs in two phases. The first declares every package-level
//! name of every module, so the second can bind references across files and
//! across modules regardless of declaration order. The second phase walks
//! each source unit with a lexical scope stack and records, per identifier
//! occurrence, the symbol it declares (`defs`) or denotes (`uses`).
//!
//! Lookup order for a bare name: block scopes, package scope, the unit's
//! imports (including dot imports), then the universe of predeclared names.
//! Selector members are bound only when the qualifier is an import of a
//! module loaded in the project; field and method selectors on values are
//! left unbound since no types are computed.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::loader::{Module, SourceUnit, assumed_name};
use crate::parser::ast::*;
use crate::span::Spanned;
use crate::visit::scope_tracker::ScopeTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Type,
    Func,
    Var,
    Const,
    Method,
    Field,
    Local,
    Import { path: String },
    Builtin,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    /// Path of the declaring module; `None` for predeclared names.
    pub module: Option<String>,
    pub kind: SymbolKind,
}

/// Arena of every symbol in a project. Identity is the `SymbolId`.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, module: Option<&str>, kind: SymbolKind) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol { name: name.into(), module: module.map(str::to_string), kind });
        id
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

const PREDECLARED_TYPES: &[&str] = &[
    "any", "bool", "byte", "comparable", "complex64", "complex128", "error", "float32", "float64",
    "int", "int8", "int16", "int32", "int64", "rune", "string", "uint", "uint8", "uint16",
    "uint32", "uint64", "uintptr",
];

const PREDECLARED_VALUES: &[&str] = &["true", "false", "iota", "nil"];

const PREDECLARED_FUNCS: &[&str] = &[
    "append", "cap", "clear", "close", "complex", "copy", "delete", "imag", "len", "make", "max",
    "min", "new", "panic", "print", "println", "real", "recover",
];

fn universe(symbols: &mut SymbolTable) -> HashMap<String, SymbolId> {
    PREDECLARED_TYPES
        .iter()
        .chain(PREDECLARED_VALUES)
        .chain(PREDECLARED_FUNCS)
        .map(|name| (name.to_string(), symbols.add(*name, None, SymbolKind::Builtin)))
        .collect()
}

/// Package name and top-level scope of every loaded module, keyed by path.
struct PackageIndex {
    packages: HashMap<String, (String, HashMap<String, SymbolId>)>,
}

impl PackageIndex {
    fn new(modules: &[Module]) -> Self {
        let packages = modules
            .iter()
            .map(|m| (m.path.clone(), (m.name.clone(), m.scope.clone())))
            .collect();
        Self { packages }
    }

    fn name(&self, path: &str) -> Option<&str> {
        self.packages.get(path).map(|(name, _)| name.as_str())
    }

    fn scope(&self, path: &str) -> Option<&HashMap<String, SymbolId>> {
        self.packages.get(path).map(|(_, scope)| scope)
    }
}

/// Resolve every module of a project in place: fills each module's scope and
/// `complete` flag and each unit's use/def tables.
pub fn resolve_project(modules: &mut [Module], symbols: &mut SymbolTable) {
    let universe = universe(symbols);

    for module in modules.iter_mut() {
        declare_package(module, symbols);
    }

    let index = PackageIndex::new(modules);
    for module in modules.iter_mut() {
        let mut unresolved = BTreeSet::new();
        for unit in &mut module.units {
            let mut resolver = Resolver {
                symbols: &mut *symbols,
                module: &module.path,
                package: &module.scope,
                universe: &universe,
                index: &index,
                imports: HashMap::new(),
                dot_imports: Vec::new(),
                locals: ScopeTracker::new(),
                uses: &mut unit.uses,
                defs: &mut unit.defs,
                unresolved: &mut unresolved,
            };
            resolver.resolve_file(&unit.file);
        }
        if !unresolved.is_empty() {
            debug!(module = %module.path, names = ?unresolved, "unresolved names");
            module.complete = false;
        }
    }
}

/// Phase one: bind package-level names of one module.
fn declare_package(module: &mut Module, symbols: &mut SymbolTable) {
    for unit in &mut module.units {
        let SourceUnit { file, defs, .. } = unit;
        for (ident, kind) in package_level_names(file) {
            let id = symbols.add(&ident.name, Some(&module.path), kind.clone());
            defs.insert(ident.id, id);
            if kind == SymbolKind::Method || ident.is_blank() || ident.name == "init" {
                continue;
            }
            if module.scope.insert(ident.name.clone(), id).is_some() {
                warn!(module = %module.path, name = %ident.name, "duplicate package-level declaration");
                module.complete = false;
            }
        }
    }
}

fn package_level_names(file: &SourceFile) -> Vec<(&Ident, SymbolKind)> {
    let mut names = Vec::new();
    for decl in &file.decls {
        match &decl.node {
            Decl::Func(func) if func.recv.is_some() => names.push((&func.name, SymbolKind::Method)),
            Decl::Func(func) => names.push((&func.name, SymbolKind::Func)),
            Decl::Type(specs) => names.extend(specs.iter().map(|s| (&s.name, SymbolKind::Type))),
            Decl::Var(specs) => {
                names.extend(specs.iter().flat_map(|s| &s.names).map(|n| (n, SymbolKind::Var)));
            }
            Decl::Const(specs) => {
                names.extend(specs.iter().flat_map(|s| &s.names).map(|n| (n, SymbolKind::Const)));
            }
        }
    }
    names
}

struct Resolver<'a> {
    symbols: &'a mut SymbolTable,
    module: &'a str,
    package: &'a HashMap<String, SymbolId>,
    universe: &'a HashMap<String, SymbolId>,
    index: &'a PackageIndex,
    /// Import names visible in the current unit.
    imports: HashMap<String, SymbolId>,
    /// Scopes merged into the unit by `import . "path"`.
    dot_imports: Vec<&'a HashMap<String, SymbolId>>,
    locals: ScopeTracker<SymbolId>,
    uses: &'a mut HashMap<NodeId, SymbolId>,
    defs: &'a mut HashMap<NodeId, SymbolId>,
    unresolved: &'a mut BTreeSet<String>,
}

impl<'a> Resolver<'a> {
    fn resolve_file(&mut self, file: &SourceFile) {
        for spec in file.imports.iter().flat_map(|d| &d.node.specs) {
            self.declare_import(&spec.node);
        }
        for decl in &file.decls {
            self.resolve_decl(decl);
        }
    }

    fn declare_import(&mut self, spec: &ImportSpec) {
        if spec.is_blank() {
            return;
        }
        if spec.is_dot() {
            match self.index.scope(&spec.path) {
                Some(scope) => self.dot_imports.push(scope),
                None => debug!(path = %spec.path, "dot import of a package outside the project"),
            }
            return;
        }
        let name = match &spec.name {
            Some(ident) => ident.name.clone(),
            None => self.index.name(&spec.path).unwrap_or_else(|| assumed_name(&spec.path)).to_string(),
        };
        let id = self.symbols.add(&name, Some(self.module), SymbolKind::Import { path: spec.path.clone() });
        if let Some(ident) = &spec.name {
            self.defs.insert(ident.id, id);
        }
        if self.imports.contains_key(&name) {
            warn!(name = %name, path = %spec.path, "import name declared twice in one file");
            return;
        }
        self.imports.insert(name, id);
    }

    // ── Lookup ───────────────────────────────────────────────────────

    fn lookup(&self, name: &str) -> Option<SymbolId> {
        if let Some(id) = self.locals.lookup(name) {
            return Some(*id);
        }
        if let Some(id) = self.package.get(name) {
            return Some(*id);
        }
        if let Some(id) = self.imports.get(name) {
            return Some(*id);
        }
        if let Some(id) = self.dot_imports.iter().find_map(|scope| scope.get(name)) {
            return Some(*id);
        }
        self.universe.get(name).copied()
    }

    fn use_ident(&mut self, ident: &Ident) {
        if ident.is_blank() {
            return;
        }
        match self.lookup(&ident.name) {
            Some(id) => {
                self.uses.insert(ident.id, id);
            }
            None => {
                self.unresolved.insert(ident.name.clone());
            }
        }
    }

    /// `pkg.Name` where `pkg` might be an import.
    fn use_qualified(&mut self, pkg: &Ident, member: &Ident) -> bool {
        let Some(id) = self.lookup(&pkg.name) else {
            self.unresolved.insert(pkg.name.clone());
            return false;
        };
        self.uses.insert(pkg.id, id);
        let SymbolKind::Import { path } = &self.symbols.get(id).kind else {
            return false;
        };
        if let Some(target) = self.index.scope(path).and_then(|scope| scope.get(&member.name)) {
            self.uses.insert(member.id, *target);
        }
        true
    }

    fn declare_local(&mut self, ident: &Ident, kind: SymbolKind) {
        let id = self.symbols.add(&ident.name, Some(self.module), kind);
        self.defs.insert(ident.id, id);
        if !ident.is_blank() {
            self.locals.declare(ident.name.clone(), id);
        }
    }

    /// `a, b := ...`: names already bound in the innermost block are assigned,
    /// not redeclared.
    fn short_var_name(&mut self, ident: &Ident) {
        if !ident.is_blank() && self.locals.declared_in_current(&ident.name) {
            self.use_ident(ident);
        } else {
            self.declare_local(ident, SymbolKind::Local);
        }
    }

    fn fresh_def(&mut self, ident: &Ident, kind: SymbolKind) {
        let id = self.symbols.add(&ident.name, Some(self.module), kind);
        self.defs.insert(ident.id, id);
    }

    // ── Declarations ─────────────────────────────────────────────────

    fn resolve_decl(&mut self, decl: &Spanned<Decl>) {
        match &decl.node {
            Decl::Func(func) => self.resolve_func_decl(func),
            Decl::Type(specs) => {
                for spec in specs {
                    self.resolve_type_spec(spec);
                }
            }
            Decl::Var(specs) | Decl::Const(specs) => {
                for spec in specs {
                    if let Some(ty) = &spec.ty {
                        self.resolve_type(ty);
                    }
                    for value in &spec.values {
                        self.resolve_expr(value);
                    }
                }
            }
        }
    }

    fn resolve_type_spec(&mut self, spec: &TypeSpec) {
        self.locals.push_scope();
        self.declare_type_params(&spec.tparams);
        self.resolve_type(&spec.ty);
        self.locals.pop_scope();
    }

    /// Type parameters are in scope in their own constraints.
    fn declare_type_params(&mut self, tparams: &[Param]) {
        for name in tparams.iter().flat_map(|p| &p.names) {
            self.declare_local(name, SymbolKind::Type);
        }
        for param in tparams {
            self.resolve_type(&param.ty);
        }
    }

    /// The receiver's base type is a use; the type arguments of a generic
    /// receiver declare parameters.
    fn resolve_receiver(&mut self, recv: &Receiver) {
        for param in recv.type_params() {
            self.declare_local(param, SymbolKind::Type);
        }
        let mut ty = &recv.ty;
        loop {
            match &ty.node {
                TypeExpr::Pointer(inner) | TypeExpr::Paren(inner) => ty = &**inner,
                TypeExpr::Generic { base, .. } => return self.resolve_type(base),
                _ => return self.resolve_type(ty),
            }
        }
    }

    fn resolve_func_decl(&mut self, func: &FuncDecl) {
        self.locals.push_scope();
        self.declare_type_params(&func.tparams);
        if let Some(recv) = &func.recv {
            self.resolve_receiver(recv);
            if let Some(name) = &recv.name {
                self.declare_local(name, SymbolKind::Local);
            }
        }
        self.resolve_signature(&func.sig);
        if let Some(body) = &func.body {
            for stmt in &body.node.stmts {
                self.resolve_stmt(stmt);
            }
        }
        self.locals.pop_scope();
    }

    /// Parameter types first, then parameter names into the current frame.
    fn resolve_signature(&mut self, sig: &FuncType) {
        for param in sig.params.iter().chain(&sig.results) {
            self.resolve_type(&param.ty);
        }
        for name in sig.params.iter().chain(&sig.results).flat_map(|p| &p.names) {
            self.declare_local(name, SymbolKind::Local);
        }
    }

    fn resolve_value_specs(&mut self, specs: &[ValueSpec], kind: SymbolKind) {
        for spec in specs {
            if let Some(ty) = &spec.ty {
                self.resolve_type(ty);
            }
            for value in &spec.values {
                self.resolve_expr(value);
            }
            for name in &spec.names {
                self.declare_local(name, kind.clone());
            }
        }
    }

    fn resolve_local_types(&mut self, specs: &[TypeSpec]) {
        for spec in specs {
            self.declare_local(&spec.name, SymbolKind::Type);
            self.resolve_type_spec(spec);
        }
    }

    // ── Types ────────────────────────────────────────────────────────

    fn resolve_type(&mut self, te: &Spanned<TypeExpr>) {
        match &te.node {
            TypeExpr::Name(ident) => self.use_ident(ident),
            TypeExpr::Qualified { pkg, name } => {
                self.use_qualified(pkg, name);
            }
            TypeExpr::Pointer(inner)
            | TypeExpr::Slice(inner)
            | TypeExpr::Chan(inner)
            | TypeExpr::Variadic(inner)
            | TypeExpr::Paren(inner)
            | TypeExpr::Approx(inner) => self.resolve_type(inner),
            TypeExpr::Generic { base, args } => {
                self.resolve_type(base);
                for arg in args {
                    self.resolve_type(arg);
                }
            }
            TypeExpr::Union(terms) => {
                for term in terms {
                    self.resolve_type(term);
                }
            }
            TypeExpr::Array { len, elem } => {
                if let Some(len) = len {
                    self.resolve_expr(len);
                }
                self.resolve_type(elem);
            }
            TypeExpr::Map { key, value } => {
                self.resolve_type(key);
                self.resolve_type(value);
            }
            TypeExpr::Func(sig) => {
                for param in sig.params.iter().chain(&sig.results) {
                    self.resolve_type(&param.ty);
                }
                for name in sig.params.iter().chain(&sig.results).flat_map(|p| &p.names) {
                    self.fresh_def(name, SymbolKind::Local);
                }
            }
            TypeExpr::Struct(fields) => {
                for field in fields {
                    self.resolve_type(&field.ty);
                    for name in &field.names {
                        self.fresh_def(name, SymbolKind::Field);
                    }
                }
            }
            TypeExpr::Interface(elems) => {
                for elem in elems {
                    match elem {
                        InterfaceElem::Method { name, sig } => {
                            self.fresh_def(name, SymbolKind::Method);
                            for param in sig.params.iter().chain(&sig.results) {
                                self.resolve_type(&param.ty);
                            }
                            for name in sig.params.iter().chain(&sig.results).flat_map(|p| &p.names) {
                                self.fresh_def(name, SymbolKind::Local);
                            }
                        }
                        InterfaceElem::Embedded(ty) => self.resolve_type(ty),
                    }
                }
            }
        }
    }

    // ── Statements ───────────────────────────────────────────────────

    fn resolve_block(&mut self, block: &Block) {
        self.locals.push_scope();
        for stmt in &block.stmts {
            self.resolve_stmt(stmt);
        }
        self.locals.pop_scope();
    }

    fn resolve_stmt(&mut self, stmt: &Spanned<Stmt>) {
        match &stmt.node {
            Stmt::Var(specs) => self.resolve_value_specs(specs, SymbolKind::Local),
            Stmt::Const(specs) => self.resolve_value_specs(specs, SymbolKind::Const),
            Stmt::Type(specs) => self.resolve_local_types(specs),
            Stmt::ShortVar { names, values } => {
                for value in values {
                    self.resolve_expr(value);
                }
                for name in names {
                    self.short_var_name(name);
                }
            }
            Stmt::Assign { lhs, rhs, .. } => {
                for expr in lhs.iter().chain(rhs) {
                    self.resolve_expr(expr);
                }
            }
            Stmt::IncDec { target, .. } => self.resolve_expr(target),
            Stmt::Send { chan, value } => {
                self.resolve_expr(chan);
                self.resolve_expr(value);
            }
            Stmt::Expr(expr) | Stmt::Go(expr) | Stmt::Defer(expr) => self.resolve_expr(expr),
            Stmt::Return(values) => {
                for value in values {
                    self.resolve_expr(value);
                }
            }
            Stmt::If { init, cond, then_block, else_branch } => {
                self.locals.push_scope();
                if let Some(init) = init {
                    self.resolve_stmt(init);
                }
                self.resolve_expr(cond);
                self.resolve_block(&then_block.node);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
                self.locals.pop_scope();
            }
            Stmt::For { init, cond, post, body } => {
                self.locals.push_scope();
                if let Some(init) = init {
                    self.resolve_stmt(init);
                }
                if let Some(cond) = cond {
                    self.resolve_expr(cond);
                }
                if let Some(post) = post {
                    self.resolve_stmt(post);
                }
                self.resolve_block(&body.node);
                self.locals.pop_scope();
            }
            Stmt::Range { key, value, define, iter, body } => {
                self.locals.push_scope();
                self.resolve_expr(iter);
                for target in key.iter().chain(value) {
                    match (&target.node, *define) {
                        (Expr::Ident(ident), true) => self.declare_local(ident, SymbolKind::Local),
                        _ => self.resolve_expr(target),
                    }
                }
                self.resolve_block(&body.node);
                self.locals.pop_scope();
            }
            Stmt::Switch { init, tag, clauses } => {
                self.locals.push_scope();
                if let Some(init) = init {
                    self.resolve_stmt(init);
                }
                if let Some(tag) = tag {
                    self.resolve_expr(tag);
                }
                for clause in clauses {
                    self.locals.push_scope();
                    for expr in &clause.node.exprs {
                        self.resolve_expr(expr);
                    }
                    for stmt in &clause.node.body {
                        self.resolve_stmt(stmt);
                    }
                    self.locals.pop_scope();
                }
                self.locals.pop_scope();
            }
            Stmt::Select { clauses } => {
                for clause in clauses {
                    self.locals.push_scope();
                    if let Some(comm) = &clause.node.comm {
                        self.resolve_stmt(comm);
                    }
                    for stmt in &clause.node.body {
                        self.resolve_stmt(stmt);
                    }
                    self.locals.pop_scope();
                }
            }
            Stmt::Labeled { stmt, .. } => {
                if let Some(stmt) = stmt {
                    self.resolve_stmt(stmt);
                }
            }
            Stmt::Block(block) => self.resolve_block(block),
            // Labels live in their own namespace and are never relocated.
            Stmt::Goto(_) | Stmt::Break(_) | Stmt::Continue(_) | Stmt::Fallthrough => {}
        }
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Spanned<Expr>) {
        match &expr.node {
            Expr::Ident(ident) => self.use_ident(ident),
            Expr::BasicLit { .. } => {}
            Expr::Unary { operand, .. } => self.resolve_expr(operand),
            Expr::Binary { lhs, rhs, .. } => {
                self.resolve_expr(lhs);
                self.resolve_expr(rhs);
            }
            Expr::Paren(inner) => self.resolve_expr(inner),
            Expr::Selector { x, sel } => match &x.node {
                Expr::Ident(pkg) => {
                    self.use_qualified(pkg, sel);
                }
                _ => self.resolve_expr(x),
            },
            Expr::Call { func, args, .. } => {
                self.resolve_expr(func);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            Expr::Index { x, index } => {
                self.resolve_expr(x);
                self.resolve_expr(index);
            }
            Expr::IndexList { x, indices } => {
                self.resolve_expr(x);
                for index in indices {
                    self.resolve_expr(index);
                }
            }
            Expr::Slice { x, lo, hi, max } => {
                self.resolve_expr(x);
                for bound in [lo, hi, max].into_iter().flatten() {
                    self.resolve_expr(bound);
                }
            }
            Expr::TypeAssert { x, ty } => {
                self.resolve_expr(x);
                if let Some(ty) = ty {
                    self.resolve_type(ty);
                }
            }
            Expr::CompositeLit { ty, elems } => {
                if let Some(ty) = ty {
                    self.resolve_type(ty);
                }
                self.resolve_elements(ty.as_deref().map(|t| &t.node), elems);
            }
            Expr::FuncLit { sig, body } => {
                self.locals.push_scope();
                self.resolve_signature(sig);
                for stmt in &body.node.stmts {
                    self.resolve_stmt(stmt);
                }
                self.locals.pop_scope();
            }
            Expr::Type(ty) => self.resolve_type(ty),
        }
    }

    /// Elements of a composite literal whose (possibly elided) type is `ty`.
    fn resolve_elements(&mut self, ty: Option<&TypeExpr>, elems: &[Element]) {
        let keys_are_fields = ty.is_none_or(literal_keys_are_fields);
        let inner_ty = ty.and_then(element_type);
        for elem in elems {
            if let Some(key) = &elem.key {
                match &key.node {
                    Expr::Ident(ident) if keys_are_fields => self.fresh_use(ident, SymbolKind::Field),
                    Expr::CompositeLit { ty: None, elems } => self.resolve_elements(ty.and_then(key_type), elems),
                    _ => self.resolve_expr(key),
                }
            }
            match &elem.value.node {
                Expr::CompositeLit { ty: None, elems } => self.resolve_elements(inner_ty, elems),
                _ => self.resolve_expr(&elem.value),
            }
        }
    }

    /// Struct literal keys name fields that have no declaration we can see.
    fn fresh_use(&mut self, ident: &Ident, kind: SymbolKind) {
        let id = self.symbols.add(&ident.name, Some(self.module), kind);
        self.uses.insert(ident.id, id);
    }
}

/// Keys of slice, array and map literals are expressions; keys of anything
/// else (named or struct types) are field names.
fn literal_keys_are_fields(ty: &TypeExpr) -> bool {
    match ty {
        TypeExpr::Map { .. } | TypeExpr::Slice(_) | TypeExpr::Array { .. } => false,
        TypeExpr::Pointer(inner) | TypeExpr::Paren(inner) => literal_keys_are_fields(&inner.node),
        _ => true,
    }
}

/// Type of an elided element literal inside a literal of type `ty`.
fn element_type(ty: &TypeExpr) -> Option<&TypeExpr> {
    match ty {
        TypeExpr::Map { value, .. } => Some(&value.node),
        TypeExpr::Slice(elem) | TypeExpr::Array { elem, .. } => Some(&elem.node),
        TypeExpr::Paren(inner) => element_type(&inner.node),
        _ => None,
    }
}

/// Type of an elided key literal inside a map literal.
fn key_type(ty: &TypeExpr) -> Option<&TypeExpr> {
    match ty {
        TypeExpr::Map { key, .. } => Some(&key.node),
        TypeExpr::Paren(inner) => key_type(&inner.node),
        _ => None,
    }
}
