use crate::span::{Span, Spanned};

/// Identity of an identifier occurrence. Unique across a loaded project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Id carried by identifiers built by a rewrite rather than parsed from source.
    pub const SYNTHETIC: NodeId = NodeId(u32::MAX);

    pub fn is_synthetic(self) -> bool {
        self == Self::SYNTHETIC
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub id: NodeId,
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn synthetic(name: impl Into<String>, span: Span) -> Self {
        Self { id: NodeId::SYNTHETIC, name: name.into(), span }
    }

    pub fn is_blank(&self) -> bool {
        self.name == "_"
    }
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub package: Ident,
    pub imports: Vec<Spanned<ImportDecl>>,
    pub decls: Vec<Spanned<Decl>>,
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub specs: Vec<Spanned<ImportSpec>>,
    /// Written as `import ( ... )`.
    pub grouped: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpec {
    /// Explicit name: an alias, `_`, or `.`.
    pub name: Option<Ident>,
    pub path: String,
}

impl ImportSpec {
    pub fn is_blank(&self) -> bool {
        self.name.as_ref().is_some_and(|n| n.name == "_")
    }

    pub fn is_dot(&self) -> bool {
        self.name.as_ref().is_some_and(|n| n.name == ".")
    }
}

#[derive(Debug, Clone)]
pub enum Decl {
    Func(FuncDecl),
    Type(Vec<TypeSpec>),
    Var(Vec<ValueSpec>),
    Const(Vec<ValueSpec>),
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub recv: Option<Receiver>,
    pub name: Ident,
    /// `[K comparable, V any]`; each param's type is its constraint.
    pub tparams: Vec<Param>,
    pub sig: FuncType,
    pub body: Option<Spanned<Block>>,
}

/// The `(r *T)` clause binding a method to its type.
#[derive(Debug, Clone)]
pub struct Receiver {
    pub name: Option<Ident>,
    pub ty: Spanned<TypeExpr>,
}

impl Receiver {
    /// The identifier naming the receiver's base type, with any pointer stripped.
    pub fn base_type(&self) -> Option<&Ident> {
        let mut ty = &self.ty.node;
        loop {
            match ty {
                TypeExpr::Pointer(inner) | TypeExpr::Paren(inner) => ty = &inner.node,
                TypeExpr::Generic { base, .. } => ty = &base.node,
                TypeExpr::Name(ident) => return Some(ident),
                _ => return None,
            }
        }
    }

    /// Type parameters a generic receiver introduces: the `K, V` of
    /// `(m *Map[K, V])`.
    pub fn type_params(&self) -> Vec<&Ident> {
        let mut ty = &self.ty.node;
        loop {
            match ty {
                TypeExpr::Pointer(inner) | TypeExpr::Paren(inner) => ty = &inner.node,
                TypeExpr::Generic { args, .. } => {
                    return args
                        .iter()
                        .filter_map(|arg| match &arg.node {
                            TypeExpr::Name(ident) => Some(ident),
                            _ => None,
                        })
                        .collect();
                }
                _ => return Vec::new(),
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeSpec {
    pub name: Ident,
    pub tparams: Vec<Param>,
    /// `type A = B`
    pub alias: bool,
    pub ty: Spanned<TypeExpr>,
}

#[derive(Debug, Clone)]
pub struct ValueSpec {
    pub names: Vec<Ident>,
    pub ty: Option<Spanned<TypeExpr>>,
    pub values: Vec<Spanned<Expr>>,
}

#[derive(Debug, Clone)]
pub struct FuncType {
    pub params: Vec<Param>,
    pub results: Vec<Param>,
}

/// One parameter group: `a, b int` has two names and one type.
#[derive(Debug, Clone)]
pub struct Param {
    pub names: Vec<Ident>,
    pub ty: Spanned<TypeExpr>,
}

#[derive(Debug, Clone)]
pub enum TypeExpr {
    Name(Ident),
    Qualified { pkg: Ident, name: Ident },
    Pointer(Box<Spanned<TypeExpr>>),
    Slice(Box<Spanned<TypeExpr>>),
    /// `len` is `None` for `[...]T`.
    Array {
        len: Option<Box<Spanned<Expr>>>,
        elem: Box<Spanned<TypeExpr>>,
    },
    Map {
        key: Box<Spanned<TypeExpr>>,
        value: Box<Spanned<TypeExpr>>,
    },
    Chan(Box<Spanned<TypeExpr>>),
    Func(FuncType),
    Struct(Vec<FieldDecl>),
    Interface(Vec<InterfaceElem>),
    Variadic(Box<Spanned<TypeExpr>>),
    Paren(Box<Spanned<TypeExpr>>),
    /// An instantiation: `List[int]`, `pkg.Map[K, V]`.
    Generic {
        base: Box<Spanned<TypeExpr>>,
        args: Vec<Spanned<TypeExpr>>,
    },
    /// `~T` in a constraint.
    Approx(Box<Spanned<TypeExpr>>),
    /// `A | B` in a constraint.
    Union(Vec<Spanned<TypeExpr>>),
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// Empty for an embedded field.
    pub names: Vec<Ident>,
    pub ty: Spanned<TypeExpr>,
    pub tag: Option<String>,
}

#[derive(Debug, Clone)]
pub enum InterfaceElem {
    Method { name: Ident, sig: FuncType },
    Embedded(Spanned<TypeExpr>),
}

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Var(Vec<ValueSpec>),
    Const(Vec<ValueSpec>),
    Type(Vec<TypeSpec>),
    ShortVar {
        names: Vec<Ident>,
        values: Vec<Spanned<Expr>>,
    },
    Assign {
        lhs: Vec<Spanned<Expr>>,
        op: AssignOp,
        rhs: Vec<Spanned<Expr>>,
    },
    IncDec {
        target: Spanned<Expr>,
        inc: bool,
    },
    /// `ch <- value`
    Send {
        chan: Spanned<Expr>,
        value: Spanned<Expr>,
    },
    Expr(Spanned<Expr>),
    Return(Vec<Spanned<Expr>>),
    If {
        init: Option<Box<Spanned<Stmt>>>,
        cond: Spanned<Expr>,
        then_block: Spanned<Block>,
        /// Either `Stmt::If` or `Stmt::Block`.
        else_branch: Option<Box<Spanned<Stmt>>>,
    },
    For {
        init: Option<Box<Spanned<Stmt>>>,
        cond: Option<Spanned<Expr>>,
        post: Option<Box<Spanned<Stmt>>>,
        body: Spanned<Block>,
    },
    Range {
        key: Option<Spanned<Expr>>,
        value: Option<Spanned<Expr>>,
        /// `:=` rather than `=`.
        define: bool,
        iter: Spanned<Expr>,
        body: Spanned<Block>,
    },
    /// A type switch binding `switch v := x.(type)` is kept as an `init`
    /// short variable declaration with no tag.
    Switch {
        init: Option<Box<Spanned<Stmt>>>,
        tag: Option<Spanned<Expr>>,
        clauses: Vec<Spanned<CaseClause>>,
    },
    Block(Block),
    Go(Spanned<Expr>),
    Defer(Spanned<Expr>),
    Select {
        clauses: Vec<Spanned<CommClause>>,
    },
    /// `L: stmt`. `stmt` is `None` for a label right before `}`.
    Labeled {
        label: Ident,
        stmt: Option<Box<Spanned<Stmt>>>,
    },
    Goto(Ident),
    Break(Option<Ident>),
    Continue(Option<Ident>),
    Fallthrough,
}

#[derive(Debug, Clone)]
pub struct CaseClause {
    /// Empty for `default`.
    pub exprs: Vec<Spanned<Expr>>,
    pub is_default: bool,
    pub body: Vec<Spanned<Stmt>>,
}

/// One arm of a `select`.
#[derive(Debug, Clone)]
pub struct CommClause {
    /// A send, a receive, or a receive assigned with `=` or `:=`. `None` for
    /// `default`.
    pub comm: Option<Box<Spanned<Stmt>>>,
    pub body: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    AndNot,
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Rem => "%=",
            AssignOp::BitAnd => "&=",
            AssignOp::BitOr => "|=",
            AssignOp::BitXor => "^=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
            AssignOp::AndNot => "&^=",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Ident(Ident),
    BasicLit { kind: LitKind, raw: String },
    Unary {
        op: UnaryOp,
        operand: Box<Spanned<Expr>>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    Paren(Box<Spanned<Expr>>),
    Selector {
        x: Box<Spanned<Expr>>,
        sel: Ident,
    },
    Call {
        func: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
        ellipsis: bool,
    },
    Index {
        x: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },
    /// `F[A, B]`: an instantiation with more than one argument.
    IndexList {
        x: Box<Spanned<Expr>>,
        indices: Vec<Spanned<Expr>>,
    },
    Slice {
        x: Box<Spanned<Expr>>,
        lo: Option<Box<Spanned<Expr>>>,
        hi: Option<Box<Spanned<Expr>>>,
        max: Option<Box<Spanned<Expr>>>,
    },
    /// `ty` is `None` for `x.(type)`.
    TypeAssert {
        x: Box<Spanned<Expr>>,
        ty: Option<Box<Spanned<TypeExpr>>>,
    },
    /// `ty` is `None` for an elided inner literal such as the `{1, 2}` in `[]P{{1, 2}}`.
    CompositeLit {
        ty: Option<Box<Spanned<TypeExpr>>>,
        elems: Vec<Element>,
    },
    FuncLit {
        sig: FuncType,
        body: Spanned<Block>,
    },
    /// A type used in expression position, e.g. `[]byte` in `[]byte(s)`.
    Type(Box<Spanned<TypeExpr>>),
}

#[derive(Debug, Clone)]
pub struct Element {
    pub key: Option<Spanned<Expr>>,
    pub value: Spanned<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Float,
    Imag,
    Char,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Pos,
    Neg,
    Not,
    BitNot,
    Deref,
    Addr,
    Recv,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Pos => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "^",
            UnaryOp::Deref => "*",
            UnaryOp::Addr => "&",
            UnaryOp::Recv => "<-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    LogOr,
    LogAnd,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    BitOr,
    BitXor,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    AndNot,
}

impl BinOp {
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::LogOr => 1,
            BinOp::LogAnd => 2,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 3,
            BinOp::Add | BinOp::Sub | BinOp::BitOr | BinOp::BitXor => 4,
            BinOp::Mul
            | BinOp::Div
            | BinOp::Rem
            | BinOp::Shl
            | BinOp::Shr
            | BinOp::BitAnd
            | BinOp::AndNot => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::LogOr => "||",
            BinOp::LogAnd => "&&",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::BitAnd => "&",
            BinOp::AndNot => "&^",
        }
    }
}
