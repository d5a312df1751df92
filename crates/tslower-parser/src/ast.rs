//! AST node types for JavaScript with the TypeScript declarations that
//! survive type erasure.
//!
//! Design principle: everything is an Expression, Binding, or Statement.
//! Types are never stored; the parser skips them. What remains of TypeScript
//! are the constructs that produce runtime code (`enum`, `namespace`,
//! `import x = ...`, parameter properties) and a no-op marker for erased
//! declarations.
//!
//! Binding identifiers carry the [`Ref`] of the symbol they declare, and
//! every node that opens a scope carries its [`ScopeId`], so the lowering
//! pass can resolve names without re-deriving the scope tree.

use crate::span::Span;
use crate::symbols::{NamespaceTables, Ref, ScopeId, ScopeTree, SymbolTable};
use rustc_hash::FxHashSet;

/// The root AST for a parsed module, together with the symbol and scope
/// tables the parser built for it.
#[derive(Debug)]
pub struct Ast {
    pub stmts: Vec<Stmt>,
    pub symbols: SymbolTable,
    pub scopes: ScopeTree,
    pub module_scope: ScopeId,
    pub namespaces: NamespaceTables,
    /// Names of top-level types (interfaces, type aliases, erased
    /// namespaces), used to drop `export {T}` of a type.
    pub local_type_names: FxHashSet<String>,
}

// =============================================================================
// Expressions
// =============================================================================

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn ident(name: impl Into<String>, span: Span) -> Self {
        Self::new(ExprKind::Ident(name.into()), span)
    }

    /// `object.name`
    pub fn dot(object: Expr, name: impl Into<String>, span: Span) -> Self {
        Self::new(
            ExprKind::Member {
                object: Box::new(object),
                property: Box::new(Expr::ident(name, span)),
                computed: false,
            },
            span,
        )
    }

    /// `object[index]`
    pub fn index(object: Expr, index: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::Member {
                object: Box::new(object),
                property: Box::new(index),
                computed: true,
            },
            span,
        )
    }

    /// `left = right`
    pub fn assign(left: Expr, right: Expr) -> Self {
        let span = left.span.to(right.span);
        Self::new(
            ExprKind::Assign {
                op: AssignOp::Assign,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        let span = left.span.to(right.span);
        Self::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }
}

/// Expression kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // === Literals ===
    Null,
    /// Produced by lowering only; prints as `void 0`.
    Undefined,
    Bool(bool),
    Number(f64),
    /// BigInt literal, stored with its source spelling minus the `n`.
    BigInt(String),
    /// String literal (cooked value).
    String(String),
    /// Regular expression, stored as written.
    Regex(String),
    /// Template literal. Quasis keep their raw text so they print back
    /// unchanged.
    Template {
        quasis: Vec<String>,
        exprs: Vec<Expr>,
    },

    // === Identifiers ===
    /// Identifier reference, resolved by the lowering pass.
    Ident(String),
    This,
    Super,

    // === Compound Expressions ===
    /// Array literal. `None` is a hole.
    Array(Vec<Option<Expr>>),
    Object(Vec<Property>),
    Function(Box<Function>),
    Arrow(Box<ArrowFunction>),
    Class(Box<Class>),

    // === Operations ===
    Unary { op: UnaryOp, arg: Box<Expr> },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        arg: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Sequence(Vec<Expr>),

    // === Member Access ===
    /// `a.b` or `a[b]`. A non-computed property is an `Ident` (or a
    /// `#private` name spelled as an `Ident`).
    Member {
        object: Box<Expr>,
        property: Box<Expr>,
        computed: bool,
    },
    /// `a?.b` or `a?.[b]`
    OptionalMember {
        object: Box<Expr>,
        property: Box<Expr>,
        computed: bool,
    },

    // === Calls ===
    Call { callee: Box<Expr>, args: Vec<Expr> },
    OptionalCall { callee: Box<Expr>, args: Vec<Expr> },
    New { callee: Box<Expr>, args: Vec<Expr> },
    TaggedTemplate { tag: Box<Expr>, quasi: Box<Expr> },

    // === Special ===
    Spread(Box<Expr>),
    Yield {
        arg: Option<Box<Expr>>,
        delegate: bool,
    },
    Await(Box<Expr>),
    /// `import(x)` or `import(x, options)`
    Import(Box<Expr>, Option<Box<Expr>>),
    /// `new.target`, `import.meta`
    MetaProperty { meta: String, property: String },
    /// `#x in obj`
    PrivateName(String),
}

// =============================================================================
// Statements
// =============================================================================

/// A statement node.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn expr(expr: Expr) -> Self {
        let span = expr.span;
        Self::new(StmtKind::Expr(expr), span)
    }

    /// The erased-declaration marker.
    pub fn typescript(span: Span) -> Self {
        Self::new(StmtKind::TypeScript { was_declare_class: false }, span)
    }

    pub fn is_typescript(&self) -> bool {
        matches!(self.kind, StmtKind::TypeScript { .. })
    }
}

/// Statement kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    // === Declarations ===
    Var(VarDecl),
    Function(Box<Function>),
    Class(Box<Class>),

    // === Control Flow ===
    Block(Block),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
        scope: ScopeId,
    },
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
        scope: ScopeId,
    },
    ForIn {
        left: ForInit,
        right: Expr,
        body: Box<Stmt>,
        scope: ScopeId,
    },
    ForOf {
        left: ForInit,
        right: Expr,
        body: Box<Stmt>,
        is_await: bool,
        scope: ScopeId,
    },
    While { test: Expr, body: Box<Stmt> },
    DoWhile { body: Box<Stmt>, test: Expr },
    Break { label: Option<String> },
    Continue { label: Option<String> },
    Return { arg: Option<Expr> },
    Throw { arg: Expr },
    Try {
        block: Block,
        handler: Option<CatchClause>,
        finalizer: Option<Block>,
    },
    Labeled { label: String, body: Box<Stmt> },

    // === Expressions ===
    Expr(Expr),
    Empty,
    Debugger,
    With {
        object: Expr,
        body: Box<Stmt>,
        scope: ScopeId,
    },

    // === Modules ===
    Import(Box<ImportDecl>),
    Export(Box<ExportDecl>),

    // === TypeScript ===
    Enum(Box<EnumDecl>),
    Namespace(Box<NamespaceDecl>),
    /// A declaration with no runtime effect (interface, type alias,
    /// `declare ...`, an erased namespace). Dropped by lowering.
    TypeScript { was_declare_class: bool },
}

/// A braced statement list with its own scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub scope: ScopeId,
}

// =============================================================================
// Bindings (Patterns)
// =============================================================================

/// An identifier that declares a symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingIdent {
    pub name: String,
    pub symbol: Ref,
    pub span: Span,
}

/// A binding pattern (used in variable declarations, parameters, etc.)
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub kind: BindingKind,
    pub span: Span,
}

impl Binding {
    pub fn new(kind: BindingKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Visit every identifier this pattern declares.
    pub fn for_each_ident(&self, f: &mut impl FnMut(&BindingIdent)) {
        match &self.kind {
            BindingKind::Ident(ident) => f(ident),
            BindingKind::Array { elements } => {
                for element in elements.iter().flatten() {
                    element.binding.for_each_ident(f);
                }
            }
            BindingKind::Object { properties } => {
                for prop in properties {
                    prop.value.for_each_ident(f);
                }
            }
        }
    }

    pub fn for_each_ident_mut(&mut self, f: &mut impl FnMut(&mut BindingIdent)) {
        match &mut self.kind {
            BindingKind::Ident(ident) => f(ident),
            BindingKind::Array { elements } => {
                for element in elements.iter_mut().flatten() {
                    element.binding.for_each_ident_mut(f);
                }
            }
            BindingKind::Object { properties } => {
                for prop in properties {
                    prop.value.for_each_ident_mut(f);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BindingKind {
    Ident(BindingIdent),
    /// `[a, , b = 1, ...rest]`
    Array {
        elements: Vec<Option<ArrayPatternElement>>,
    },
    /// `{a, b: c, ...rest}`
    Object {
        properties: Vec<ObjectPatternProperty>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayPatternElement {
    pub binding: Binding,
    pub default: Option<Expr>,
    pub rest: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPatternProperty {
    pub key: PropertyKey,
    pub value: Binding,
    pub default: Option<Expr>,
    pub shorthand: bool,
    pub rest: bool,
}

// =============================================================================
// Supporting Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,  // -
    Plus,   // +
    Not,    // !
    BitNot, // ~
    Typeof, // typeof
    Void,   // void
    Delete, // delete
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add, // +
    Sub, // -
    Mul, // *
    Div, // /
    Mod, // %
    Pow, // **

    // Comparison
    Eq,          // ==
    NotEq,       // !=
    StrictEq,    // ===
    StrictNotEq, // !==
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=

    // Bitwise
    BitOr,  // |
    BitXor, // ^
    BitAnd, // &
    Shl,    // <<
    Shr,    // >>
    UShr,   // >>>

    // Logical
    And,             // &&
    Or,              // ||
    NullishCoalesce, // ??

    // Other
    In,         // in
    Instanceof, // instanceof
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,        // =
    AddAssign,     // +=
    SubAssign,     // -=
    MulAssign,     // *=
    DivAssign,     // /=
    ModAssign,     // %=
    PowAssign,     // **=
    ShlAssign,     // <<=
    ShrAssign,     // >>=
    UShrAssign,    // >>>=
    BitOrAssign,   // |=
    BitXorAssign,  // ^=
    BitAndAssign,  // &=
    AndAssign,     // &&=
    OrAssign,      // ||=
    NullishAssign, // ??=
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment, // ++
    Decrement, // --
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub kind: VarKind,
    pub decls: Vec<VarDeclarator>,
    /// Came from `import x = ...`; such aliases do not keep a namespace
    /// alive on their own.
    pub was_import_equals: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclarator {
    pub binding: Binding,
    pub init: Option<Expr>,
    pub span: Span,
}

/// Object literal property.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: PropertyKey,
    pub value: Expr,
    pub kind: PropertyKind,
    pub shorthand: bool,
    /// `{a = 1}`, only valid when the object becomes an assignment pattern.
    pub initializer: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    Ident(String),
    Private(String),
    String(String),
    Number(f64),
    BigInt(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Init,
    Get,
    Set,
    Method,
    Spread,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub test: Option<Expr>,
    pub consequent: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub param: Option<Binding>,
    pub body: Block,
    /// Scope holding the catch parameter; `body.scope` is its child.
    pub scope: ScopeId,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Var(VarDecl),
    Expr(Expr),
}

// =============================================================================
// Functions and Classes
// =============================================================================

/// Function node (used for declarations, expressions, methods).
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: Option<BindingIdent>,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub is_async: bool,
    pub is_generator: bool,
    pub args_scope: ScopeId,
    pub body_scope: ScopeId,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFunction {
    pub params: Vec<Param>,
    pub body: ArrowBody,
    pub is_async: bool,
    pub args_scope: ScopeId,
    pub body_scope: ScopeId,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub binding: Binding,
    pub default: Option<Expr>,
    pub rest: bool,
    pub decorators: Vec<Decorator>,
    /// `constructor(public x)`: also assigns `this.x = x`.
    pub is_parameter_property: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decorator {
    pub expr: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub name: Option<BindingIdent>,
    pub super_class: Option<Box<Expr>>,
    pub body: Vec<ClassMember>,
    pub decorators: Vec<Decorator>,
    /// Class body scope (also holds the inner class name binding).
    pub scope: ScopeId,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMember {
    pub kind: ClassMemberKind,
    pub decorators: Vec<Decorator>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassMemberKind {
    /// `foo() {}`, `get foo() {}`, `constructor() {}`
    Method {
        key: PropertyKey,
        value: Function,
        kind: MethodKind,
        is_static: bool,
    },
    /// `foo = 1`, `static accessor foo`
    Property {
        key: PropertyKey,
        value: Option<Expr>,
        is_static: bool,
        is_accessor: bool,
    },
    /// `static { ... }`
    StaticBlock(Block),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Get,
    Set,
    Constructor,
}

// =============================================================================
// Modules
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub default: Option<BindingIdent>,
    pub namespace: Option<BindingIdent>,
    pub named: Vec<ImportSpecifier>,
    /// `import "x"` has no clause and is always kept.
    pub has_clause: bool,
    pub source: String,
    /// `with { type: "json" }`
    pub attributes: Option<Expr>,
    pub span: Span,
}

/// `import { imported as local }`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpecifier {
    pub imported: String,
    pub local: BindingIdent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportDecl {
    /// `export { foo, bar as baz }`, optionally `from "mod"`
    Named {
        specifiers: Vec<ExportSpecifier>,
        source: Option<String>,
    },
    /// `export default expr`, `export default function f() {}`
    Default { expr: Expr },
    /// `export function foo() {}`, `export enum E {}`, ...
    Decl { decl: Stmt },
    /// `export * from "mod"`, `export * as ns from "mod"`
    All {
        exported: Option<String>,
        source: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSpecifier {
    pub local: String,
    pub exported: String,
    pub span: Span,
}

// =============================================================================
// TypeScript runtime declarations
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: BindingIdent,
    /// Parameter of the generated closure.
    pub arg: Ref,
    pub values: Vec<EnumValue>,
    pub scope: ScopeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub name: String,
    /// Symbol for members whose name is a valid identifier, so later
    /// initializers can refer to them by bare name.
    pub symbol: Option<Ref>,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceDecl {
    pub name: BindingIdent,
    /// Parameter of the generated closure.
    pub arg: Ref,
    pub stmts: Vec<Stmt>,
    pub scope: ScopeId,
}
