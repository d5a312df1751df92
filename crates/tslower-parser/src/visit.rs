//! Lowering pass: turns the parsed AST into plain JavaScript.
//!
//! Runs once over the tree the parser produced, walking the same scope ids
//! the parser recorded. Along the way it
//!
//! - resolves identifier reads (scope members first, then the exported
//!   members of an enclosing namespace) and counts symbol uses,
//! - rewrites reads of names exported from a namespace into property
//!   accesses on the namespace closure's parameter,
//! - turns `namespace` and `enum` declarations into closures invoked with
//!   `Name || (Name = {})`, declaring the backing variable once per merged
//!   symbol,
//! - folds enum initializers and numbers implicit members,
//! - assigns constructor parameter properties,
//! - drops unused imports and `export {T}` of type-only names.

use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::ast::*;
use crate::fold::{fold_constant, ConstValue};
use crate::span::Span;
use crate::symbols::{
    NamespaceMemberData, NamespaceTables, Ref, ScopeId, ScopeTree, SymbolKind, SymbolTable,
};

/// Lower `ast` in place. `typescript` enables import elision.
pub fn lower(ast: &mut Ast, typescript: bool) {
    let stmts = std::mem::take(&mut ast.stmts);
    let mut lowering = Lowering {
        symbols: &mut ast.symbols,
        scopes: &ast.scopes,
        namespaces: &mut ast.namespaces,
        local_type_names: &ast.local_type_names,
        typescript,
        module_scope: ast.module_scope,
        current_scope: ast.module_scope,
        namespace_arg: None,
        emitted_namespace_vars: FxHashSet::default(),
        in_enum_initializer: false,
    };
    let lowered = lowering.lower_stmts(stmts);
    ast.stmts = lowering.elide_unused(lowered);
    debug!(statements = ast.stmts.len(), "lowered module");
}

/// What an identifier read refers to.
enum Resolved {
    Unbound,
    /// A symbol declared in `scope`.
    Symbol { symbol: Ref, scope: ScopeId },
    /// A member exported by another block of a merged namespace or enum;
    /// only reachable as a property of `arg`.
    Sibling { arg: Ref, data: NamespaceMemberData },
}

struct Lowering<'a> {
    symbols: &'a mut SymbolTable,
    scopes: &'a ScopeTree,
    namespaces: &'a mut NamespaceTables,
    local_type_names: &'a FxHashSet<String>,
    typescript: bool,
    module_scope: ScopeId,
    current_scope: ScopeId,
    /// Closure parameter of the namespace whose body is being lowered.
    namespace_arg: Option<Ref>,
    /// Canonical symbols whose `var`/`let` has been written.
    emitted_namespace_vars: FxHashSet<Ref>,
    in_enum_initializer: bool,
}

impl Lowering<'_> {
    // =========================================================================
    // Name Resolution
    // =========================================================================

    fn resolve(&self, name: &str) -> Resolved {
        let mut id = self.current_scope;
        loop {
            let scope = self.scopes.get(id);
            if let Some(member) = scope.members.get(name) {
                return Resolved::Symbol {
                    symbol: member.symbol,
                    scope: id,
                };
            }
            if let Some(ns) = &scope.ts_namespace {
                if let (Some(arg), Some(member)) =
                    (ns.arg, self.namespaces.members(ns.exported_members).get(name))
                {
                    if member.is_enum_value == ns.is_enum_scope {
                        return Resolved::Sibling {
                            arg,
                            data: member.data.clone(),
                        };
                    }
                }
            }
            match scope.parent {
                Some(parent) => id = parent,
                None => return Resolved::Unbound,
            }
        }
    }

    fn arg_ident(&mut self, arg: Ref, span: Span) -> Expr {
        self.symbols.record_use(arg);
        Expr::ident(self.symbols.get(arg).name.clone(), span)
    }

    fn lower_ident(&mut self, name: String, span: Span) -> Expr {
        match self.resolve(&name) {
            Resolved::Unbound => Expr::ident(name, span),
            Resolved::Symbol { symbol, scope } => {
                self.symbols.record_use(symbol);
                match self.namespace_member_read(symbol, scope, &name, span) {
                    Some(expr) => expr,
                    None => Expr::ident(name, span),
                }
            }
            Resolved::Sibling { arg, data } => match data {
                NamespaceMemberData::EnumNumber(n) => Expr::new(ExprKind::Number(n), span),
                NamespaceMemberData::EnumString(s) => Expr::new(ExprKind::String(s), span),
                NamespaceMemberData::Property | NamespaceMemberData::Namespace(_) => {
                    let object = self.arg_ident(arg, span);
                    Expr::dot(object, name, span)
                }
            },
        }
    }

    /// A read of `symbol`, declared directly in a namespace or enum body,
    /// that has no local binding after lowering.
    fn namespace_member_read(&mut self, symbol: Ref, scope: ScopeId, name: &str, span: Span) -> Option<Expr> {
        let ns = self.scopes.get(scope).ts_namespace.as_ref()?;
        let arg = ns.arg?;
        if symbol == arg {
            return None;
        }

        match self.namespaces.member_data(symbol) {
            Some(NamespaceMemberData::EnumNumber(n)) => return Some(Expr::new(ExprKind::Number(*n), span)),
            Some(NamespaceMemberData::EnumString(s)) => return Some(Expr::new(ExprKind::String(s.clone()), span)),
            _ => {}
        }

        // Enum bodies declare nothing but their members. Exported functions
        // and classes keep a local binding; exported variables do not.
        let is_property = ns.is_enum_scope
            || (self.namespaces.member_data(symbol) == Some(&NamespaceMemberData::Property)
                && matches!(
                    self.symbols.get(symbol).kind,
                    SymbolKind::Hoisted | SymbolKind::Other | SymbolKind::Const
                ));
        if !is_property {
            return None;
        }
        let object = self.arg_ident(arg, span);
        Some(Expr::dot(object, name, span))
    }

    /// `E.A` inside an enum initializer, where `E` names an enum whose
    /// member `A` already has a constant value.
    fn inline_enum_member(&self, object: &Expr, property: &str) -> Option<Expr> {
        let ExprKind::Ident(name) = &object.kind else {
            return None;
        };
        let Resolved::Symbol { symbol, .. } = self.resolve(name) else {
            return None;
        };
        let members = self
            .namespaces
            .namespace_members(symbol)
            .or_else(|| self.namespaces.namespace_members(self.symbols.canonical(symbol)))?;
        let member = self.namespaces.members(members).get(property)?;
        match &member.data {
            NamespaceMemberData::EnumNumber(n) => Some(Expr::new(ExprKind::Number(*n), object.span)),
            NamespaceMemberData::EnumString(s) => Some(Expr::new(ExprKind::String(s.clone()), object.span)),
            _ => None,
        }
    }

    fn with_scope<T>(&mut self, scope: ScopeId, f: impl FnOnce(&mut Self) -> T) -> T {
        let old = std::mem::replace(&mut self.current_scope, scope);
        let result = f(self);
        self.current_scope = old;
        result
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn lower_stmts(&mut self, stmts: Vec<Stmt>) -> Vec<Stmt> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            self.lower_stmt(stmt, &mut out);
        }
        out
    }

    /// A statement in a position that takes exactly one statement.
    fn lower_single(&mut self, stmt: Stmt) -> Box<Stmt> {
        let span = stmt.span;
        let mut out = Vec::new();
        self.lower_stmt(stmt, &mut out);
        let stmt = match out.len() {
            0 => Stmt::new(StmtKind::Empty, span),
            1 => out.remove(0),
            _ => Stmt::new(
                StmtKind::Block(Block {
                    stmts: out,
                    scope: self.current_scope,
                }),
                span,
            ),
        };
        Box::new(stmt)
    }

    fn lower_block(&mut self, block: Block) -> Block {
        let stmts = self.with_scope(block.scope, |this| this.lower_stmts(block.stmts));
        Block {
            stmts,
            scope: block.scope,
        }
    }

    fn lower_stmt(&mut self, stmt: Stmt, out: &mut Vec<Stmt>) {
        let span = stmt.span;
        let kind = match stmt.kind {
            StmtKind::TypeScript { .. } => return,
            StmtKind::Enum(decl) => return self.lower_enum(*decl, None, span, out),
            StmtKind::Namespace(decl) => return self.lower_namespace(*decl, None, span, out),
            StmtKind::Export(export) => return self.lower_export(*export, span, out),

            StmtKind::Var(var) => StmtKind::Var(self.lower_var(var)),
            StmtKind::Function(func) => StmtKind::Function(Box::new(self.lower_function(*func))),
            StmtKind::Class(class) => StmtKind::Class(Box::new(self.lower_class(*class))),
            StmtKind::Expr(expr) => StmtKind::Expr(self.lower_expr(expr)),
            StmtKind::Block(block) => StmtKind::Block(self.lower_block(block)),
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => StmtKind::If {
                test: self.lower_expr(test),
                consequent: self.lower_single(*consequent),
                alternate: alternate.map(|alt| self.lower_single(*alt)),
            },
            StmtKind::Switch {
                discriminant,
                cases,
                scope,
            } => {
                let discriminant = self.lower_expr(discriminant);
                let cases = self.with_scope(scope, |this| {
                    cases
                        .into_iter()
                        .map(|case| SwitchCase {
                            test: case.test.map(|test| this.lower_expr(test)),
                            consequent: this.lower_stmts(case.consequent),
                            span: case.span,
                        })
                        .collect()
                });
                StmtKind::Switch {
                    discriminant,
                    cases,
                    scope,
                }
            }
            StmtKind::For {
                init,
                test,
                update,
                body,
                scope,
            } => self.with_scope(scope, |this| StmtKind::For {
                init: init.map(|init| this.lower_for_init(init)),
                test: test.map(|test| this.lower_expr(test)),
                update: update.map(|update| this.lower_expr(update)),
                body: this.lower_single(*body),
                scope,
            }),
            StmtKind::ForIn {
                left,
                right,
                body,
                scope,
            } => self.with_scope(scope, |this| StmtKind::ForIn {
                left: this.lower_for_init(left),
                right: this.lower_expr(right),
                body: this.lower_single(*body),
                scope,
            }),
            StmtKind::ForOf {
                left,
                right,
                body,
                is_await,
                scope,
            } => self.with_scope(scope, |this| StmtKind::ForOf {
                left: this.lower_for_init(left),
                right: this.lower_expr(right),
                body: this.lower_single(*body),
                is_await,
                scope,
            }),
            StmtKind::While { test, body } => StmtKind::While {
                test: self.lower_expr(test),
                body: self.lower_single(*body),
            },
            StmtKind::DoWhile { body, test } => StmtKind::DoWhile {
                body: self.lower_single(*body),
                test: self.lower_expr(test),
            },
            StmtKind::Return { arg } => StmtKind::Return {
                arg: arg.map(|arg| self.lower_expr(arg)),
            },
            StmtKind::Throw { arg } => StmtKind::Throw {
                arg: self.lower_expr(arg),
            },
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => StmtKind::Try {
                block: self.lower_block(block),
                handler: handler.map(|handler| self.lower_catch(handler)),
                finalizer: finalizer.map(|block| self.lower_block(block)),
            },
            StmtKind::Labeled { label, body } => StmtKind::Labeled {
                label,
                body: self.lower_single(*body),
            },
            StmtKind::With {
                object,
                body,
                scope,
            } => {
                let object = self.lower_expr(object);
                let body = self.with_scope(scope, |this| this.lower_single(*body));
                StmtKind::With {
                    object,
                    body,
                    scope,
                }
            }
            kind @ (StmtKind::Empty
            | StmtKind::Debugger
            | StmtKind::Break { .. }
            | StmtKind::Continue { .. }
            | StmtKind::Import(_)) => kind,
        };
        out.push(Stmt::new(kind, span));
    }

    fn lower_catch(&mut self, handler: CatchClause) -> CatchClause {
        self.with_scope(handler.scope, |this| CatchClause {
            param: handler.param.map(|param| this.lower_binding(param)),
            body: this.lower_block(handler.body),
            scope: handler.scope,
            span: handler.span,
        })
    }

    fn lower_for_init(&mut self, init: ForInit) -> ForInit {
        match init {
            ForInit::Var(var) => ForInit::Var(self.lower_var(var)),
            ForInit::Expr(expr) => ForInit::Expr(self.lower_expr(expr)),
        }
    }

    fn lower_var(&mut self, var: VarDecl) -> VarDecl {
        let decls = var
            .decls
            .into_iter()
            .map(|decl| VarDeclarator {
                binding: self.lower_binding(decl.binding),
                init: decl.init.map(|init| self.lower_expr(init)),
                span: decl.span,
            })
            .collect();
        VarDecl { decls, ..var }
    }

    /// Binding patterns keep their identifiers; only defaults and computed
    /// keys contain reads.
    fn lower_binding(&mut self, binding: Binding) -> Binding {
        let kind = match binding.kind {
            BindingKind::Ident(ident) => BindingKind::Ident(ident),
            BindingKind::Array { elements } => BindingKind::Array {
                elements: elements
                    .into_iter()
                    .map(|element| {
                        element.map(|element| ArrayPatternElement {
                            binding: self.lower_binding(element.binding),
                            default: element.default.map(|default| self.lower_expr(default)),
                            rest: element.rest,
                        })
                    })
                    .collect(),
            },
            BindingKind::Object { properties } => BindingKind::Object {
                properties: properties
                    .into_iter()
                    .map(|prop| ObjectPatternProperty {
                        key: self.lower_property_key(prop.key),
                        value: self.lower_binding(prop.value),
                        default: prop.default.map(|default| self.lower_expr(default)),
                        shorthand: prop.shorthand,
                        rest: prop.rest,
                    })
                    .collect(),
            },
        };
        Binding::new(kind, binding.span)
    }

    // =========================================================================
    // Exports
    // =========================================================================

    fn lower_export(&mut self, export: ExportDecl, span: Span, out: &mut Vec<Stmt>) {
        let export = match export {
            ExportDecl::Decl { decl } => {
                if let Some(arg) = self.namespace_arg {
                    return self.lower_namespace_export(decl, arg, out);
                }
                return self.lower_exported_decl(decl, span, out);
            }
            ExportDecl::Named {
                specifiers,
                source: None,
            } => {
                let was_empty = specifiers.is_empty();
                let mut kept = Vec::with_capacity(specifiers.len());
                for spec in specifiers {
                    match self.resolve(&spec.local) {
                        Resolved::Symbol { symbol, .. } => {
                            self.symbols.record_use(symbol);
                            kept.push(spec);
                        }
                        // "export {T}" where T is only a type
                        _ if self.typescript && self.local_type_names.contains(&spec.local) => {
                            trace!(name = %spec.local, "dropped type-only export");
                        }
                        _ => kept.push(spec),
                    }
                }
                if kept.is_empty() && !was_empty {
                    return;
                }
                ExportDecl::Named {
                    specifiers: kept,
                    source: None,
                }
            }
            ExportDecl::Default { expr } => ExportDecl::Default {
                expr: self.lower_expr(expr),
            },
            other @ (ExportDecl::Named { .. } | ExportDecl::All { .. }) => other,
        };
        out.push(Stmt::new(StmtKind::Export(Box::new(export)), span));
    }

    /// `export <decl>` at module level.
    fn lower_exported_decl(&mut self, decl: Stmt, span: Span, out: &mut Vec<Stmt>) {
        let decl_span = decl.span;
        match decl.kind {
            StmtKind::Enum(decl) => self.lower_enum(*decl, Some(ExportTarget::Module), span, out),
            StmtKind::Namespace(decl) => {
                self.lower_namespace(*decl, Some(ExportTarget::Module), span, out)
            }
            kind => {
                let mut lowered = Vec::new();
                self.lower_stmt(Stmt::new(kind, decl_span), &mut lowered);
                for decl in lowered {
                    out.push(Stmt::new(
                        StmtKind::Export(Box::new(ExportDecl::Decl { decl })),
                        span,
                    ));
                }
            }
        }
    }

    /// `export <decl>` inside a namespace body: the declaration becomes a
    /// property of the namespace object.
    fn lower_namespace_export(&mut self, decl: Stmt, arg: Ref, out: &mut Vec<Stmt>) {
        let span = decl.span;
        match decl.kind {
            StmtKind::Function(func) => {
                let func = self.lower_function(*func);
                let name = func.name.as_ref().map(|name| (name.name.clone(), name.span));
                out.push(Stmt::new(StmtKind::Function(Box::new(func)), span));
                if let Some((name, name_span)) = name {
                    out.push(self.export_assignment(arg, &name, name_span));
                }
            }
            StmtKind::Class(class) => {
                let class = self.lower_class(*class);
                let name = class.name.as_ref().map(|name| (name.name.clone(), name.span));
                out.push(Stmt::new(StmtKind::Class(Box::new(class)), span));
                if let Some((name, name_span)) = name {
                    out.push(self.export_assignment(arg, &name, name_span));
                }
            }
            StmtKind::Var(var) => {
                for decl in var.decls {
                    let Some(init) = decl.init else {
                        continue;
                    };
                    let value = self.lower_expr(init);
                    let target = self.binding_to_target(decl.binding, arg);
                    out.push(Stmt::expr(Expr::assign(target, value)));
                }
            }
            StmtKind::Enum(decl) => {
                self.lower_enum(*decl, Some(ExportTarget::Namespace(arg)), span, out)
            }
            StmtKind::Namespace(decl) => {
                self.lower_namespace(*decl, Some(ExportTarget::Namespace(arg)), span, out)
            }
            kind => self.lower_stmt(Stmt::new(kind, span), out),
        }
    }

    /// `arg.name = name;`
    fn export_assignment(&mut self, arg: Ref, name: &str, span: Span) -> Stmt {
        let object = self.arg_ident(arg, span);
        Stmt::expr(Expr::assign(
            Expr::dot(object, name, span),
            Expr::ident(name, span),
        ))
    }

    /// Turn the binding of an exported namespace variable into an
    /// assignment target writing to properties of `arg`.
    fn binding_to_target(&mut self, binding: Binding, arg: Ref) -> Expr {
        let span = binding.span;
        match binding.kind {
            BindingKind::Ident(ident) => {
                let object = self.arg_ident(arg, ident.span);
                Expr::dot(object, ident.name, ident.span)
            }
            BindingKind::Array { elements } => {
                let items = elements
                    .into_iter()
                    .map(|element| {
                        element.map(|element| {
                            let target = self.binding_to_target(element.binding, arg);
                            let target = match element.default {
                                Some(default) => Expr::assign(target, self.lower_expr(default)),
                                None => target,
                            };
                            if element.rest {
                                let span = target.span;
                                Expr::new(ExprKind::Spread(Box::new(target)), span)
                            } else {
                                target
                            }
                        })
                    })
                    .collect();
                Expr::new(ExprKind::Array(items), span)
            }
            BindingKind::Object { properties } => {
                let props = properties
                    .into_iter()
                    .map(|prop| {
                        let key = self.lower_property_key(prop.key);
                        let target = self.binding_to_target(prop.value, arg);
                        let value = match prop.default {
                            Some(default) => Expr::assign(target, self.lower_expr(default)),
                            None => target,
                        };
                        let span = value.span;
                        Property {
                            key,
                            value,
                            kind: if prop.rest {
                                PropertyKind::Spread
                            } else {
                                PropertyKind::Init
                            },
                            shorthand: false,
                            initializer: None,
                            span,
                        }
                    })
                    .collect();
                Expr::new(ExprKind::Object(props), span)
            }
        }
    }

    // =========================================================================
    // Namespaces and Enums
    // =========================================================================

    /// Write `var Name;` (module level) or `let Name;` once per merged
    /// namespace or enum. Functions and classes already have a binding.
    fn declare_namespace_var(&mut self, name: &BindingIdent, export: Option<ExportTarget>, out: &mut Vec<Stmt>) {
        let canonical = self.symbols.canonical(name.symbol);
        let kind = self.symbols.get(canonical).kind;
        if !matches!(kind, SymbolKind::TSNamespace | SymbolKind::TSEnum) {
            return;
        }
        if !self.emitted_namespace_vars.insert(canonical) {
            trace!(name = %name.name, "namespace variable already declared");
            return;
        }

        let var_kind = if self.current_scope == self.module_scope {
            VarKind::Var
        } else {
            VarKind::Let
        };
        let binding = Binding::new(
            BindingKind::Ident(BindingIdent {
                name: name.name.clone(),
                symbol: canonical,
                span: name.span,
            }),
            name.span,
        );
        let var = Stmt::new(
            StmtKind::Var(VarDecl {
                kind: var_kind,
                decls: vec![VarDeclarator {
                    binding,
                    init: None,
                    span: name.span,
                }],
                was_import_equals: false,
            }),
            name.span,
        );
        if export == Some(ExportTarget::Module) {
            out.push(Stmt::new(
                StmtKind::Export(Box::new(ExportDecl::Decl { decl: var })),
                name.span,
            ));
        } else {
            out.push(var);
        }
    }

    /// `Name || (Name = {})`, or `Name = Parent.Name || (Parent.Name = {})`
    /// when exported from a parent namespace.
    fn closure_target(&mut self, name: &BindingIdent, export: Option<ExportTarget>) -> Expr {
        let span = name.span;
        let ident = || Expr::ident(name.name.clone(), span);
        let empty = || Expr::new(ExprKind::Object(Vec::new()), span);
        match export {
            Some(ExportTarget::Namespace(parent)) => {
                let read = Expr::dot(self.arg_ident(parent, span), name.name.clone(), span);
                let write = Expr::dot(self.arg_ident(parent, span), name.name.clone(), span);
                let fallback = Expr::binary(BinaryOp::Or, read, Expr::assign(write, empty()));
                Expr::assign(ident(), fallback)
            }
            _ => Expr::binary(BinaryOp::Or, ident(), Expr::assign(ident(), empty())),
        }
    }

    /// `((arg) => { body })(target);`
    fn closure_call(&mut self, arg: Ref, scope: ScopeId, body: Vec<Stmt>, target: Expr, span: Span) -> Stmt {
        let arg_span = Span::new(span.start, span.start);
        let param = Param {
            binding: Binding::new(
                BindingKind::Ident(BindingIdent {
                    name: self.symbols.get(arg).name.clone(),
                    symbol: arg,
                    span: arg_span,
                }),
                arg_span,
            ),
            default: None,
            rest: false,
            decorators: Vec::new(),
            is_parameter_property: false,
            span: arg_span,
        };
        let closure = ArrowFunction {
            params: vec![param],
            body: ArrowBody::Block(body),
            is_async: false,
            args_scope: scope,
            body_scope: scope,
            span,
        };
        Stmt::new(
            StmtKind::Expr(Expr::new(
                ExprKind::Call {
                    callee: Box::new(Expr::new(ExprKind::Arrow(Box::new(closure)), span)),
                    args: vec![target],
                },
                span,
            )),
            span,
        )
    }

    fn lower_namespace(
        &mut self,
        decl: NamespaceDecl,
        export: Option<ExportTarget>,
        span: Span,
        out: &mut Vec<Stmt>,
    ) {
        self.declare_namespace_var(&decl.name, export, out);

        let old_arg = self.namespace_arg.replace(decl.arg);
        let body = self.with_scope(decl.scope, |this| this.lower_stmts(decl.stmts));
        self.namespace_arg = old_arg;
        let body = self.elide_unused(body);
        trace!(name = %decl.name.name, statements = body.len(), "lowered namespace");

        let target = self.closure_target(&decl.name, export);
        let call = self.closure_call(decl.arg, decl.scope, body, target, span);
        out.push(call);
    }

    fn lower_enum(&mut self, decl: EnumDecl, export: Option<ExportTarget>, span: Span, out: &mut Vec<Stmt>) {
        self.declare_namespace_var(&decl.name, export, out);

        let members = self.namespaces.namespace_members(decl.name.symbol);
        let old_arg = self.namespace_arg.take();
        let old_scope = std::mem::replace(&mut self.current_scope, decl.scope);

        let mut body = Vec::with_capacity(decl.values.len());
        let mut next_value = Some(0.0);
        for value in decl.values {
            let value_span = value.span;
            let (expr, constant) = match value.init {
                Some(init) => {
                    let old = std::mem::replace(&mut self.in_enum_initializer, true);
                    let init = self.lower_expr(init);
                    self.in_enum_initializer = old;
                    match fold_constant(&init) {
                        Some(constant) => (constant.clone().into_expr(init.span), Some(constant)),
                        None => (init, None),
                    }
                }
                None => match next_value {
                    Some(n) => (
                        Expr::new(ExprKind::Number(n), value_span),
                        Some(ConstValue::Number(n)),
                    ),
                    None => (Expr::new(ExprKind::Undefined, value_span), None),
                },
            };

            next_value = match &constant {
                Some(ConstValue::Number(n)) => Some(n + 1.0),
                _ => None,
            };
            let data = match &constant {
                Some(ConstValue::Number(n)) => NamespaceMemberData::EnumNumber(*n),
                Some(ConstValue::String(s)) => NamespaceMemberData::EnumString(s.clone()),
                None => NamespaceMemberData::Property,
            };
            if let Some(symbol) = value.symbol {
                self.namespaces.set_member_data(symbol, data.clone());
            }
            if let Some(id) = members {
                if let Some(member) = self.namespaces.members_mut(id).get_mut(&value.name) {
                    member.data = data;
                }
            }

            // String members get no reverse mapping
            let is_string = matches!(constant, Some(ConstValue::String(_)))
                || matches!(expr.kind, ExprKind::Template { .. });
            let key = Expr::new(ExprKind::String(value.name.clone()), value_span);
            let object = self.arg_ident(decl.arg, value_span);
            let forward = Expr::assign(Expr::index(object, key, value_span), expr);
            let stmt = if is_string {
                forward
            } else {
                let object = self.arg_ident(decl.arg, value_span);
                Expr::assign(
                    Expr::index(object, forward, value_span),
                    Expr::new(ExprKind::String(value.name), value_span),
                )
            };
            body.push(Stmt::expr(stmt));
        }

        self.current_scope = old_scope;
        self.namespace_arg = old_arg;
        debug!(name = %decl.name.name, members = body.len(), "lowered enum");

        let target = self.closure_target(&decl.name, export);
        let call = self.closure_call(decl.arg, decl.scope, body, target, span);
        out.push(call);
    }

    /// Drop imports whose bindings are never read, and unused
    /// `import x = ...` aliases.
    fn elide_unused(&self, stmts: Vec<Stmt>) -> Vec<Stmt> {
        if !self.typescript {
            return stmts;
        }
        let is_used = |ident: &BindingIdent| {
            !ident.symbol.is_valid() || self.symbols.get(self.symbols.canonical(ident.symbol)).use_count > 0
        };

        stmts
            .into_iter()
            .filter_map(|stmt| match stmt.kind {
                StmtKind::Import(mut decl) if decl.has_clause => {
                    let had_bindings =
                        decl.default.is_some() || decl.namespace.is_some() || !decl.named.is_empty();
                    decl.default = decl.default.filter(|ident| is_used(ident));
                    decl.namespace = decl.namespace.filter(|ident| is_used(ident));
                    decl.named.retain(|spec| is_used(&spec.local));
                    let has_bindings =
                        decl.default.is_some() || decl.namespace.is_some() || !decl.named.is_empty();
                    if had_bindings && !has_bindings {
                        trace!(source = %decl.source, "elided unused import");
                        return None;
                    }
                    Some(Stmt::new(StmtKind::Import(decl), stmt.span))
                }
                StmtKind::Var(var) if var.was_import_equals => {
                    let mut used = false;
                    for decl in &var.decls {
                        decl.binding.for_each_ident(&mut |ident| used |= is_used(ident));
                    }
                    used.then(|| Stmt::new(StmtKind::Var(var), stmt.span))
                }
                kind => Some(Stmt::new(kind, stmt.span)),
            })
            .collect()
    }

    // =========================================================================
    // Functions and Classes
    // =========================================================================

    fn lower_params(&mut self, params: Vec<Param>) -> Vec<Param> {
        params
            .into_iter()
            .map(|param| Param {
                binding: self.lower_binding(param.binding),
                default: param.default.map(|default| self.lower_expr(default)),
                decorators: self.lower_decorators(param.decorators),
                ..param
            })
            .collect()
    }

    fn lower_decorators(&mut self, decorators: Vec<Decorator>) -> Vec<Decorator> {
        decorators
            .into_iter()
            .map(|decorator| Decorator {
                expr: self.lower_expr(decorator.expr),
                span: decorator.span,
            })
            .collect()
    }

    fn lower_function(&mut self, func: Function) -> Function {
        let old_arg = self.namespace_arg.take();
        let old_scope = std::mem::replace(&mut self.current_scope, func.args_scope);
        let params = self.lower_params(func.params);
        self.current_scope = func.body_scope;
        let body = self.lower_stmts(func.body);
        self.current_scope = old_scope;
        self.namespace_arg = old_arg;
        Function { params, body, ..func }
    }

    fn lower_arrow(&mut self, arrow: ArrowFunction) -> ArrowFunction {
        let old_arg = self.namespace_arg.take();
        let old_scope = std::mem::replace(&mut self.current_scope, arrow.args_scope);
        let params = self.lower_params(arrow.params);
        self.current_scope = arrow.body_scope;
        let body = match arrow.body {
            ArrowBody::Expr(expr) => ArrowBody::Expr(Box::new(self.lower_expr(*expr))),
            ArrowBody::Block(stmts) => ArrowBody::Block(self.lower_stmts(stmts)),
        };
        self.current_scope = old_scope;
        self.namespace_arg = old_arg;
        ArrowFunction { params, body, ..arrow }
    }

    fn lower_class(&mut self, class: Class) -> Class {
        let decorators = self.lower_decorators(class.decorators);
        self.with_scope(class.scope, |this| {
            let super_class = class.super_class.map(|expr| Box::new(this.lower_expr(*expr)));
            let body = class
                .body
                .into_iter()
                .map(|member| this.lower_class_member(member))
                .collect();
            Class {
                name: class.name,
                super_class,
                body,
                decorators,
                scope: class.scope,
                span: class.span,
            }
        })
    }

    fn lower_class_member(&mut self, member: ClassMember) -> ClassMember {
        let decorators = self.lower_decorators(member.decorators);
        let kind = match member.kind {
            ClassMemberKind::Method {
                key,
                value,
                kind,
                is_static,
            } => {
                let key = self.lower_property_key(key);
                let mut value = self.lower_function(value);
                if kind == MethodKind::Constructor {
                    assign_parameter_properties(&mut value);
                }
                ClassMemberKind::Method {
                    key,
                    value,
                    kind,
                    is_static,
                }
            }
            ClassMemberKind::Property {
                key,
                value,
                is_static,
                is_accessor,
            } => ClassMemberKind::Property {
                key: self.lower_property_key(key),
                value: value.map(|value| self.lower_expr(value)),
                is_static,
                is_accessor,
            },
            ClassMemberKind::StaticBlock(block) => ClassMemberKind::StaticBlock(self.lower_block(block)),
        };
        ClassMember {
            kind,
            decorators,
            span: member.span,
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn lower_property_key(&mut self, key: PropertyKey) -> PropertyKey {
        match key {
            PropertyKey::Computed(expr) => PropertyKey::Computed(Box::new(self.lower_expr(*expr))),
            key => key,
        }
    }

    fn lower_boxed(&mut self, expr: Box<Expr>) -> Box<Expr> {
        Box::new(self.lower_expr(*expr))
    }

    fn lower_exprs(&mut self, exprs: Vec<Expr>) -> Vec<Expr> {
        exprs.into_iter().map(|expr| self.lower_expr(expr)).collect()
    }

    fn lower_expr(&mut self, expr: Expr) -> Expr {
        let span = expr.span;
        let kind = match expr.kind {
            ExprKind::Ident(name) => return self.lower_ident(name, span),

            ExprKind::Member {
                object,
                property,
                computed,
            } => {
                if self.in_enum_initializer {
                    let name = match &property.kind {
                        ExprKind::Ident(name) if !computed => Some(name.as_str()),
                        ExprKind::String(name) if computed => Some(name.as_str()),
                        _ => None,
                    };
                    if let Some(value) = name.and_then(|name| self.inline_enum_member(&object, name)) {
                        return Expr::new(value.kind, span);
                    }
                }
                ExprKind::Member {
                    object: self.lower_boxed(object),
                    property: if computed {
                        self.lower_boxed(property)
                    } else {
                        property
                    },
                    computed,
                }
            }
            ExprKind::OptionalMember {
                object,
                property,
                computed,
            } => ExprKind::OptionalMember {
                object: self.lower_boxed(object),
                property: if computed {
                    self.lower_boxed(property)
                } else {
                    property
                },
                computed,
            },

            ExprKind::Template { quasis, exprs } => ExprKind::Template {
                quasis,
                exprs: self.lower_exprs(exprs),
            },
            ExprKind::Array(items) => ExprKind::Array(
                items
                    .into_iter()
                    .map(|item| item.map(|item| self.lower_expr(item)))
                    .collect(),
            ),
            ExprKind::Object(props) => ExprKind::Object(
                props
                    .into_iter()
                    .map(|prop| self.lower_object_property(prop))
                    .collect(),
            ),
            ExprKind::Function(func) => ExprKind::Function(Box::new(self.lower_function(*func))),
            ExprKind::Arrow(arrow) => ExprKind::Arrow(Box::new(self.lower_arrow(*arrow))),
            ExprKind::Class(class) => ExprKind::Class(Box::new(self.lower_class(*class))),

            ExprKind::Unary { op, arg } => ExprKind::Unary {
                op,
                arg: self.lower_boxed(arg),
            },
            ExprKind::Binary { op, left, right } => ExprKind::Binary {
                op,
                left: self.lower_boxed(left),
                right: self.lower_boxed(right),
            },
            ExprKind::Assign { op, left, right } => ExprKind::Assign {
                op,
                left: self.lower_boxed(left),
                right: self.lower_boxed(right),
            },
            ExprKind::Update { op, prefix, arg } => ExprKind::Update {
                op,
                prefix,
                arg: self.lower_boxed(arg),
            },
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => ExprKind::Conditional {
                test: self.lower_boxed(test),
                consequent: self.lower_boxed(consequent),
                alternate: self.lower_boxed(alternate),
            },
            ExprKind::Sequence(exprs) => ExprKind::Sequence(self.lower_exprs(exprs)),

            ExprKind::Call { callee, args } => ExprKind::Call {
                callee: self.lower_boxed(callee),
                args: self.lower_exprs(args),
            },
            ExprKind::OptionalCall { callee, args } => ExprKind::OptionalCall {
                callee: self.lower_boxed(callee),
                args: self.lower_exprs(args),
            },
            ExprKind::New { callee, args } => ExprKind::New {
                callee: self.lower_boxed(callee),
                args: self.lower_exprs(args),
            },
            ExprKind::TaggedTemplate { tag, quasi } => ExprKind::TaggedTemplate {
                tag: self.lower_boxed(tag),
                quasi: self.lower_boxed(quasi),
            },

            ExprKind::Spread(arg) => ExprKind::Spread(self.lower_boxed(arg)),
            ExprKind::Yield { arg, delegate } => ExprKind::Yield {
                arg: arg.map(|arg| self.lower_boxed(arg)),
                delegate,
            },
            ExprKind::Await(arg) => ExprKind::Await(self.lower_boxed(arg)),
            ExprKind::Import(source, options) => {
                ExprKind::Import(self.lower_boxed(source), options.map(|options| self.lower_boxed(options)))
            }

            kind @ (ExprKind::Null
            | ExprKind::Undefined
            | ExprKind::Bool(_)
            | ExprKind::Number(_)
            | ExprKind::BigInt(_)
            | ExprKind::String(_)
            | ExprKind::Regex(_)
            | ExprKind::This
            | ExprKind::Super
            | ExprKind::MetaProperty { .. }
            | ExprKind::PrivateName(_)) => kind,
        };
        Expr::new(kind, span)
    }

    fn lower_object_property(&mut self, prop: Property) -> Property {
        let key = self.lower_property_key(prop.key);
        let value = self.lower_expr(prop.value);
        // "{x}" stays shorthand only while the value is still the bare name
        let shorthand = prop.shorthand
            && matches!((&key, &value.kind), (PropertyKey::Ident(k), ExprKind::Ident(v)) if k == v);
        Property {
            key,
            value,
            shorthand,
            initializer: prop.initializer.map(|init| self.lower_expr(init)),
            ..prop
        }
    }
}

/// Where an exported namespace or enum is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportTarget {
    /// `export` at module level.
    Module,
    /// `export` inside the namespace whose closure parameter is given.
    Namespace(Ref),
}

/// `constructor(public x) {}` assigns `this.x = x`, after the `super()`
/// call when there is one.
fn assign_parameter_properties(ctor: &mut Function) {
    let assignments: Vec<Stmt> = ctor
        .params
        .iter()
        .filter(|param| param.is_parameter_property)
        .filter_map(|param| match &param.binding.kind {
            BindingKind::Ident(ident) => {
                let span = ident.span;
                let this = Expr::new(ExprKind::This, span);
                Some(Stmt::expr(Expr::assign(
                    Expr::dot(this, ident.name.clone(), span),
                    Expr::ident(ident.name.clone(), span),
                )))
            }
            _ => None,
        })
        .collect();
    if assignments.is_empty() {
        return;
    }

    let is_super_call = |stmt: &Stmt| {
        matches!(
            &stmt.kind,
            StmtKind::Expr(Expr { kind: ExprKind::Call { callee, .. }, .. })
                if matches!(callee.kind, ExprKind::Super)
        )
    };
    let at = ctor
        .body
        .iter()
        .position(is_super_call)
        .map_or(0, |index| index + 1);
    ctor.body.splice(at..at, assignments);
}

#[cfg(test)]
mod tests {
    use super::lower;
    use crate::ast::*;
    use crate::options::ParserOptions;
    use crate::parser::Parser;
    use crate::symbols::NamespaceMemberData;

    fn lowered(source: &str) -> Ast {
        let (ast, log) = Parser::new(source, ParserOptions::default()).parse();
        assert!(!log.has_errors(), "unexpected errors for {source:?}: {log:?}");
        let mut ast = ast.expect("ast");
        lower(&mut ast, true);
        ast
    }

    fn var_count(stmts: &[Stmt]) -> usize {
        stmts
            .iter()
            .filter(|stmt| match &stmt.kind {
                StmtKind::Var(_) => true,
                StmtKind::Export(export) => {
                    matches!(export.as_ref(), ExportDecl::Decl { decl } if matches!(decl.kind, StmtKind::Var(_)))
                }
                _ => false,
            })
            .count()
    }

    fn closure_body(stmt: &Stmt) -> &[Stmt] {
        let StmtKind::Expr(Expr {
            kind: ExprKind::Call { callee, .. },
            ..
        }) = &stmt.kind
        else {
            panic!("expected a closure call, got {stmt:?}");
        };
        let ExprKind::Arrow(arrow) = &callee.kind else {
            panic!("expected an arrow callee");
        };
        let ArrowBody::Block(body) = &arrow.body else {
            panic!("expected a block body");
        };
        body
    }

    #[test]
    fn test_merged_namespaces_declare_one_var() {
        let ast = lowered("namespace A { export let x = 1 } namespace A { export let y = x }");
        assert_eq!(var_count(&ast.stmts), 1);
        assert_eq!(ast.stmts.len(), 3);
    }

    #[test]
    fn test_interleaved_enum_and_namespaces_declare_one_var() {
        let ast = lowered("namespace A { 0 } enum A { X } namespace A { 0 }");
        assert_eq!(var_count(&ast.stmts), 1);
        assert!(matches!(ast.stmts[0].kind, StmtKind::Var(_)));
        assert_eq!(ast.stmts.len(), 4);
    }

    #[test]
    fn test_function_merge_declares_no_var() {
        let ast = lowered("function foo() {} namespace foo { 0 }");
        assert_eq!(var_count(&ast.stmts), 0);
        assert_eq!(ast.stmts.len(), 2);
    }

    #[test]
    fn test_exported_var_becomes_property_assignment() {
        let ast = lowered("namespace A { export let x = 1; x++; }");
        let body = closure_body(&ast.stmts[1]);
        let StmtKind::Expr(Expr {
            kind: ExprKind::Assign { left, .. },
            ..
        }) = &body[0].kind
        else {
            panic!("expected an assignment, got {:?}", body[0]);
        };
        assert!(matches!(left.kind, ExprKind::Member { computed: false, .. }));
        let StmtKind::Expr(Expr {
            kind: ExprKind::Update { arg, .. },
            ..
        }) = &body[1].kind
        else {
            panic!("expected an update");
        };
        assert!(matches!(arg.kind, ExprKind::Member { .. }));
    }

    #[test]
    fn test_enum_values_are_folded() {
        let ast = lowered("enum Foo { A, B, C = 3.3, D, E = C * 2, F = 'f', G = D }");
        let foo = ast.scopes.get(ast.module_scope).members["Foo"].symbol;
        let members = ast.namespaces.namespace_members(foo).expect("members");
        let value = |name: &str| ast.namespaces.members(members)[name].data.clone();
        assert_eq!(value("A"), NamespaceMemberData::EnumNumber(0.0));
        assert_eq!(value("B"), NamespaceMemberData::EnumNumber(1.0));
        assert_eq!(value("D"), NamespaceMemberData::EnumNumber(4.3));
        assert_eq!(value("E"), NamespaceMemberData::EnumNumber(6.6));
        assert_eq!(value("F"), NamespaceMemberData::EnumString("f".into()));
        assert_eq!(value("G"), NamespaceMemberData::EnumNumber(4.3));
    }

    #[test]
    fn test_implicit_member_after_non_constant_is_undefined() {
        let ast = lowered("declare let x: number; enum E { A = x, B }");
        let body = closure_body(&ast.stmts[1]);
        let StmtKind::Expr(Expr {
            kind: ExprKind::Assign { left, .. },
            ..
        }) = &body[1].kind
        else {
            panic!("expected an assignment");
        };
        let ExprKind::Member { property, .. } = &left.kind else {
            panic!("expected a member target");
        };
        let ExprKind::Assign { right, .. } = &property.kind else {
            panic!("expected the forward mapping");
        };
        assert_eq!(right.kind, ExprKind::Undefined);
    }

    #[test]
    fn test_unused_imports_are_elided() {
        let ast = lowered(
            "import a from 'a'; import { b, c } from 'b'; import * as d from 'd'; import 'e'; \
             import f = require('f'); let x: a = c;",
        );
        assert_eq!(ast.stmts.len(), 3);
        let StmtKind::Import(import) = &ast.stmts[0].kind else {
            panic!("expected import");
        };
        assert_eq!(import.named.len(), 1);
        assert_eq!(import.named[0].local.name, "c");
    }

    #[test]
    fn test_type_only_export_is_dropped() {
        let ast = lowered("interface T {} const v = 1; export { T, v }; export { T as U };");
        let StmtKind::Export(export) = &ast.stmts[1].kind else {
            panic!("expected export");
        };
        let ExportDecl::Named { specifiers, .. } = export.as_ref() else {
            panic!("expected named export");
        };
        assert_eq!(specifiers.len(), 1);
        assert_eq!(ast.stmts.len(), 2);
    }

    #[test]
    fn test_parameter_properties_follow_super() {
        let ast = lowered("class A extends B { constructor(public x, private y) { super(); go(); } }");
        let StmtKind::Class(class) = &ast.stmts[0].kind else {
            panic!("expected class");
        };
        let ClassMemberKind::Method { value, .. } = &class.body[0].kind else {
            panic!("expected constructor");
        };
        assert_eq!(value.body.len(), 4);
        assert!(matches!(
            &value.body[1].kind,
            StmtKind::Expr(Expr { kind: ExprKind::Assign { .. }, .. })
        ));
    }

    #[test]
    fn test_use_counts() {
        let ast = lowered("let a = 1; a; a; function f() { return a }");
        let a = ast.scopes.get(ast.module_scope).members["a"].symbol;
        assert_eq!(ast.symbols.get(a).use_count, 3);
    }
}
