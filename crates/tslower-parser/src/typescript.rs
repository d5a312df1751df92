//! TypeScript declarations that either produce runtime code or have to be
//! recognized so they can be erased.
//!
//! `namespace` and `enum` compile to closures over a shared object, so
//! every body gets an `Entry` scope tagged with a [`NamespaceScope`] whose
//! exported-member table is shared between all declarations that merge.
//! `declare`, `interface`, `type` and friends parse to a no-op statement.
//! Decorators are parsed here too, since where they may appear depends on
//! the statement that follows them.

use tracing::{debug, trace};

use crate::ast::*;
use crate::error::ParseError;
use crate::expr::Level;
use crate::parser::{FnContext, LexicalDecl, Parser, StmtOpts};
use crate::span::Span;
use crate::symbols::{
    MembersId, NamespaceMember, NamespaceMemberData, NamespaceScope, Ref, ScopeId, ScopeKind,
    SymbolKind,
};
use crate::token::TokenKind;
use crate::ts_types::TypeParameterFlags;

/// Decorators parsed in front of a statement, waiting for the class they
/// belong to.
#[derive(Debug)]
pub(crate) struct DeferredDecorators {
    pub decorators: Vec<Decorator>,
    /// Scope count before the decorators were parsed.
    pub scope_mark: usize,
    pub first_span: Span,
}

impl<'a> Parser<'a> {
    // =========================================================================
    // Decorators
    // =========================================================================

    /// Parse a run of `@expr` decorators. Their expressions are parsed in
    /// `scope`, which for class members is the scope enclosing the class.
    pub(crate) fn parse_decorators(&mut self, scope: ScopeId) -> Result<Vec<Decorator>, ParseError> {
        let old_scope = std::mem::replace(&mut self.current_scope, scope);
        let mut decorators = Vec::new();
        let result = loop {
            if !self.check(TokenKind::At) {
                break Ok(());
            }
            let start = self.lexer.loc();
            if let Err(err) = self.next() {
                break Err(err);
            }
            match self.parse_decorator_expr() {
                Ok(expr) => decorators.push(Decorator {
                    expr,
                    span: self.span_from(start),
                }),
                Err(err) => break Err(err),
            }
        };
        self.current_scope = old_scope;
        result.map(|()| decorators)
    }

    /// `@(expr)`, `@a.b.c`, `@a.b<T>(args)`
    fn parse_decorator_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.lexer.loc();
        if self.check(TokenKind::LParen) {
            self.next()?;
            let old_allow_in = std::mem::replace(&mut self.allow_in, true);
            let value = self.parse_expr(Level::Lowest);
            self.allow_in = old_allow_in;
            let value = value?;
            self.expect(TokenKind::RParen)?;
            return Ok(value);
        }

        let (name, span) = self.expect_identifier()?;
        let mut expr = Expr::ident(name, span);
        while self.eat(TokenKind::Dot)? {
            let property = if self.check(TokenKind::PrivateIdentifier) {
                let name = self.lexer.raw().to_string();
                self.next()?;
                name
            } else {
                self.expect_identifier_or_keyword()?.0
            };
            expr = Expr::dot(expr, property, self.span_from(start));
        }

        if self.options.typescript && self.check(TokenKind::Lt) {
            self.skip_type_script_type_arguments(false)?;
        }
        if self.check(TokenKind::LParen) {
            let args = self.parse_call_args()?;
            expr = Expr::new(
                ExprKind::Call {
                    callee: Box::new(expr),
                    args,
                },
                self.span_from(start),
            );
        }
        Ok(expr)
    }

    /// A statement starting with `@`. Only class declarations may carry
    /// decorators; anything else gets a single error and is dropped.
    pub(crate) fn parse_decorated_stmt(&mut self, start: u32, opts: StmtOpts) -> Result<Stmt, ParseError> {
        if !self.options.allow_decorators {
            return Err(self.lexer.unexpected());
        }

        let scope_mark = self.scopes.len();
        let scope = self.current_scope;
        let decorators = self.parse_decorators(scope)?;
        let first_span = decorators
            .first()
            .map(|decorator| decorator.span)
            .unwrap_or_else(|| self.span_from(start));

        // "@a export @b class Foo {}"
        if self.deferred_decorators.is_some() {
            self.add_error(first_span, "Decorators are not valid here");
            self.scopes.discard_from(scope_mark);
            return self.parse_stmt(opts);
        }

        let following = if self.check(TokenKind::Eof) {
            "end of file".to_string()
        } else {
            self.lexer.raw().to_string()
        };
        self.deferred_decorators = Some(DeferredDecorators {
            decorators,
            scope_mark,
            first_span,
        });
        let stmt = self.parse_stmt(opts)?;
        let Some(unused) = self.deferred_decorators.take() else {
            return Ok(stmt);
        };

        if let StmtKind::TypeScript {
            was_declare_class: true,
        } = stmt.kind
        {
            self.scopes.discard_from(unused.scope_mark);
            return Ok(stmt);
        }

        let first = self.lexer.text(unused.first_span).to_string();
        debug!(decorator = %first, following = %following, "misplaced decorators");
        self.add_error(
            unused.first_span,
            format!("Decorators are not valid here: \"{first}\" cannot be applied to \"{following}\""),
        );
        self.scopes.discard_from(unused.scope_mark);
        Ok(Stmt::typescript(self.span_from(start)))
    }

    // =========================================================================
    // Contextual Declarations
    // =========================================================================

    /// Statements introduced by a contextual keyword: `type`, `interface`,
    /// `namespace`, `module`, `abstract`, `global` and `declare`. Returns
    /// `None` when the identifier is just an identifier.
    pub(crate) fn parse_typescript_contextual_stmt(
        &mut self,
        start: u32,
        opts: StmtOpts,
    ) -> Result<Option<Stmt>, ParseError> {
        let word = self.lexer.raw();
        let next = self.peek_token();
        if next.has_newline_before {
            return Ok(None);
        }

        match word {
            "type" if next.kind == TokenKind::Identifier => {
                self.next()?;
                self.skip_type_script_type_stmt(opts)?;
                Ok(Some(Stmt::typescript(self.span_from(start))))
            }

            "interface" if next.kind == TokenKind::Identifier => {
                self.next()?;
                self.skip_type_script_interface_stmt(opts)?;
                Ok(Some(Stmt::typescript(self.span_from(start))))
            }

            "namespace" | "module"
                if (opts.is_module_scope || opts.is_namespace_scope)
                    && (next.kind == TokenKind::Identifier
                        || (next.kind == TokenKind::String && opts.is_typescript_declare)) =>
            {
                self.next()?;
                if self.check(TokenKind::String) {
                    return self.parse_ambient_module_stmt(start).map(Some);
                }
                self.parse_namespace_stmt(start, opts).map(Some)
            }

            "abstract" if next.kind == TokenKind::Class => {
                self.next()?;
                self.parse_class_stmt(start, opts).map(Some)
            }

            // "declare module 'fs' { global { namespace NodeJS {} } }"
            "global"
                if opts.is_namespace_scope
                    && opts.is_typescript_declare
                    && next.kind == TokenKind::LBrace =>
            {
                self.next()?;
                self.parse_ambient_block()?;
                Ok(Some(Stmt::typescript(self.span_from(start))))
            }

            "declare"
                if matches!(
                    next.kind,
                    TokenKind::Identifier
                        | TokenKind::Var
                        | TokenKind::Const
                        | TokenKind::Class
                        | TokenKind::Enum
                        | TokenKind::Function
                ) =>
            {
                self.next()?;
                self.parse_declare_stmt(start, opts).map(Some)
            }

            _ => Ok(None),
        }
    }

    /// Everything after `declare`.
    fn parse_declare_stmt(&mut self, start: u32, opts: StmtOpts) -> Result<Stmt, ParseError> {
        let declare_opts = StmtOpts {
            lexical_decl: LexicalDecl::AllowAll,
            is_typescript_declare: true,
            ..opts
        };

        // "declare global { ... }"
        if self.lexer.is_contextual_keyword("global") && self.peek_token().kind == TokenKind::LBrace {
            self.next()?;
            self.parse_ambient_block()?;
            return Ok(Stmt::typescript(self.span_from(start)));
        }

        let stmt_start = self.lexer.span();
        let scope_mark = self.scopes.len();
        let stmt = self.parse_stmt(declare_opts)?;
        self.scopes.discard_from(scope_mark);

        let in_exported_namespace = opts.is_namespace_scope && opts.is_export;
        if in_exported_namespace {
            self.has_non_local_export_declare_inside_namespace = true;
        }

        match stmt.kind {
            StmtKind::TypeScript { .. } => Ok(stmt),
            // "export declare let x: number" inside a namespace still turns
            // into a property of the namespace object
            StmtKind::Var(var) => {
                if in_exported_namespace {
                    let mut decls = Vec::new();
                    for decl in &var.decls {
                        decl.binding.for_each_ident(&mut |ident| {
                            decls.push(VarDeclarator {
                                binding: Binding::new(BindingKind::Ident(ident.clone()), ident.span),
                                init: None,
                                span: ident.span,
                            });
                        });
                    }
                    if !decls.is_empty() {
                        return Ok(Stmt::new(
                            StmtKind::Var(VarDecl {
                                kind: VarKind::Var,
                                decls,
                                was_import_equals: false,
                            }),
                            self.span_from(start),
                        ));
                    }
                }
                Ok(Stmt::typescript(self.span_from(start)))
            }
            _ => Err(ParseError::new(
                format!("Unexpected \"{}\"", self.lexer.text(stmt_start)),
                stmt_start,
            )),
        }
    }

    /// A braced list of ambient statements whose scopes are thrown away.
    fn parse_ambient_block(&mut self) -> Result<(), ParseError> {
        let scope_mark = self.scopes.len();
        self.expect(TokenKind::LBrace)?;
        let body_opts = StmtOpts {
            is_module_scope: false,
            is_namespace_scope: true,
            is_typescript_declare: true,
            is_export: false,
            is_name_optional: false,
            lexical_decl: LexicalDecl::AllowAll,
        };
        let scope = self.push_scope(ScopeKind::Entry);
        self.parse_stmts_up_to(TokenKind::RBrace, body_opts)?;
        self.next()?;
        self.pop_and_discard_scope(scope);
        self.scopes.discard_from(scope_mark);
        Ok(())
    }

    /// `declare module "fs" { ... }` or `declare module "fs";`
    fn parse_ambient_module_stmt(&mut self, start: u32) -> Result<Stmt, ParseError> {
        self.expect_string()?;
        if self.check(TokenKind::LBrace) {
            self.parse_ambient_block()?;
        } else {
            self.expect_semicolon()?;
        }
        Ok(Stmt::typescript(self.span_from(start)))
    }

    /// `type Foo<T> = ...;` after `type`.
    fn skip_type_script_type_stmt(&mut self, opts: StmtOpts) -> Result<(), ParseError> {
        let (name, _) = self.expect_identifier()?;
        if opts.is_module_scope {
            self.local_type_names.insert(name);
        }
        self.skip_type_script_type_parameters(
            TypeParameterFlags::ALLOW_IN_OUT_VARIANCE | TypeParameterFlags::ALLOW_EMPTY_LIST,
        )?;
        self.expect(TokenKind::Eq)?;
        self.skip_type_script_type(Level::Lowest)?;
        self.expect_semicolon()
    }

    /// `interface Foo<T> extends A, B { ... }` after `interface`.
    pub(crate) fn skip_type_script_interface_stmt(&mut self, opts: StmtOpts) -> Result<(), ParseError> {
        let (name, _) = self.expect_identifier()?;
        if opts.is_module_scope {
            self.local_type_names.insert(name);
        }
        self.skip_type_script_type_parameters(
            TypeParameterFlags::ALLOW_IN_OUT_VARIANCE | TypeParameterFlags::ALLOW_EMPTY_LIST,
        )?;

        if self.eat(TokenKind::Extends)? {
            self.skip_type_list()?;
        }
        if self.lexer.is_contextual_keyword("implements") {
            self.next()?;
            self.skip_type_list()?;
        }
        self.skip_type_script_object_type()
    }

    fn skip_type_list(&mut self) -> Result<(), ParseError> {
        loop {
            self.skip_type_script_type(Level::Lowest)?;
            if !self.eat(TokenKind::Comma)? {
                return Ok(());
            }
        }
    }

    // =========================================================================
    // import x = ...
    // =========================================================================

    /// `import name = require("path")` or `import name = a.b.c`, with the
    /// current token at `=`.
    pub(crate) fn parse_import_equals_stmt(
        &mut self,
        start: u32,
        name: String,
        span: Span,
        opts: StmtOpts,
    ) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Eq)?;

        let (target, target_span) = self.expect_identifier()?;
        let mut value = Expr::ident(target.clone(), target_span);
        if target == "require" && self.check(TokenKind::LParen) {
            self.next()?;
            let path_span = self.lexer.span();
            let path = self.expect_string()?;
            self.expect(TokenKind::RParen)?;
            value = Expr::new(
                ExprKind::Call {
                    callee: Box::new(value),
                    args: vec![Expr::new(ExprKind::String(path), path_span)],
                },
                Span::new(target_span.start, self.prev_end),
            );
        } else {
            while self.eat(TokenKind::Dot)? {
                let (property, _) = self.expect_identifier()?;
                value = Expr::dot(value, property, Span::new(target_span.start, self.prev_end));
            }
        }
        self.expect_semicolon()?;

        // "import type foo = require('bar')"
        if opts.is_typescript_declare {
            return Ok(Stmt::typescript(self.span_from(start)));
        }

        let symbol = self.declare_symbol(SymbolKind::Const, span, &name);
        let binding = Binding::new(BindingKind::Ident(BindingIdent { name, symbol, span }), span);
        Ok(Stmt::new(
            StmtKind::Var(VarDecl {
                kind: VarKind::Const,
                decls: vec![VarDeclarator {
                    binding,
                    init: Some(value),
                    span: self.span_from(span.start),
                }],
                was_import_equals: true,
            }),
            self.span_from(start),
        ))
    }

    // =========================================================================
    // Namespaces
    // =========================================================================

    /// The members table for a namespace or enum called `name` in the
    /// current scope. Declarations of the same name share one table, and so
    /// does an exported nested namespace re-opened inside a merged parent.
    pub(crate) fn get_or_create_exported_namespace_members(
        &mut self,
        name: &str,
        is_export: bool,
    ) -> MembersId {
        let scope = self.scopes.get(self.current_scope);
        if let Some(existing) = scope.members.get(name) {
            if let Some(id) = self.namespaces.namespace_members(existing.symbol) {
                debug!(name, "merging with existing namespace members");
                return id;
            }
        }

        if is_export {
            if let Some(ns) = &scope.ts_namespace {
                if let Some(NamespaceMember {
                    data: NamespaceMemberData::Namespace(id),
                    ..
                }) = self.namespaces.members(ns.exported_members).get(name)
                {
                    debug!(name, "merging with exported namespace members");
                    return *id;
                }
            }
        }

        self.namespaces.create()
    }

    /// The closure parameter for a namespace or enum body. It shares the
    /// namespace's name unless a member of the body already uses it.
    fn declare_closure_arg(&mut self, name: &str, span: Span) -> Ref {
        let scope = self.current_scope;
        if self.scopes.get(scope).members.contains_key(name) {
            let arg = self.symbols.add(SymbolKind::Hoisted, format!("_{name}"));
            self.scopes.get_mut(scope).generated.push(arg);
            trace!(name, "renamed closure argument");
            arg
        } else {
            self.declare_symbol(SymbolKind::Hoisted, span, name)
        }
    }

    /// `namespace A.B { ... }` after `namespace` or `module`.
    fn parse_namespace_stmt(&mut self, start: u32, opts: StmtOpts) -> Result<Stmt, ParseError> {
        let (name, name_span) = self.expect_identifier()?;

        let members = self.get_or_create_exported_namespace_members(&name, opts.is_export);
        let scope = self.push_scope(ScopeKind::Entry);
        self.scopes.get_mut(scope).ts_namespace = Some(NamespaceScope {
            exported_members: members,
            arg: None,
            is_enum_scope: false,
        });
        trace!(name = %name, scope = scope.index(), "entered namespace");

        let old_has_non_local = std::mem::take(&mut self.has_non_local_export_declare_inside_namespace);
        let old_fn_ctx = std::mem::replace(&mut self.fn_ctx, FnContext::default());
        let body = self.parse_namespace_body(start, opts);
        self.fn_ctx = old_fn_ctx;
        let stmts = body?;

        self.record_exported_members(members, &stmts);

        // Namespaces holding only types (and aliases of types) vanish
        let import_equals_count = stmts
            .iter()
            .filter(|stmt| {
                matches!(
                    &stmt.kind,
                    StmtKind::Var(VarDecl {
                        was_import_equals: true,
                        ..
                    })
                )
            })
            .count();
        let is_erased = (stmts.len() == import_equals_count
            && !self.has_non_local_export_declare_inside_namespace)
            || opts.is_typescript_declare;
        self.has_non_local_export_declare_inside_namespace = old_has_non_local;

        if is_erased {
            self.pop_and_discard_scope(scope);
            if opts.is_module_scope {
                self.local_type_names.insert(name.clone());
            }
            debug!(name = %name, "erased type-only namespace");
            return Ok(Stmt::typescript(self.span_from(start)));
        }

        let arg = self.declare_closure_arg(&name, name_span);
        self.namespaces
            .set_member_data(arg, NamespaceMemberData::Namespace(members));
        if let Some(ns) = self.scopes.get_mut(scope).ts_namespace.as_mut() {
            ns.arg = Some(arg);
        }
        self.pop_scope();

        let symbol = self.declare_symbol(SymbolKind::TSNamespace, name_span, &name);
        self.namespaces
            .set_member_data(symbol, NamespaceMemberData::Namespace(members));

        Ok(Stmt::new(
            StmtKind::Namespace(Box::new(NamespaceDecl {
                name: BindingIdent {
                    name,
                    symbol,
                    span: name_span,
                },
                arg,
                stmts,
                scope,
            })),
            self.span_from(start),
        ))
    }

    fn parse_namespace_body(&mut self, start: u32, opts: StmtOpts) -> Result<Vec<Stmt>, ParseError> {
        // "namespace A.B {}" is "namespace A { export namespace B {} }"
        if self.eat(TokenKind::Dot)? {
            let inner_start = self.lexer.loc();
            let inner = self.parse_namespace_stmt(
                inner_start,
                StmtOpts {
                    is_export: true,
                    is_namespace_scope: true,
                    is_module_scope: false,
                    is_typescript_declare: opts.is_typescript_declare,
                    ..StmtOpts::default()
                },
            )?;
            if inner.is_typescript() {
                return Ok(Vec::new());
            }
            let span = Span::new(inner_start, inner.span.end);
            return Ok(vec![Stmt::new(
                StmtKind::Export(Box::new(ExportDecl::Decl { decl: inner })),
                span,
            )]);
        }

        // "declare module Foo" with no body
        if opts.is_typescript_declare && !self.check(TokenKind::LBrace) {
            self.expect_semicolon()?;
            return Ok(Vec::new());
        }

        self.expect(TokenKind::LBrace)?;
        let stmts = self.parse_stmts_up_to(
            TokenKind::RBrace,
            StmtOpts {
                is_namespace_scope: true,
                is_typescript_declare: opts.is_typescript_declare,
                ..StmtOpts::default()
            },
        )?;
        self.next()?;
        trace!(start, statements = stmts.len(), "parsed namespace body");
        Ok(stmts)
    }

    /// Add the names a namespace body exports to its shared members table,
    /// so later declarations (and later merged bodies) can refer to them.
    fn record_exported_members(&mut self, members: MembersId, stmts: &[Stmt]) {
        for stmt in stmts {
            let StmtKind::Export(export) = &stmt.kind else {
                continue;
            };
            let ExportDecl::Decl { decl } = export.as_ref() else {
                continue;
            };
            match &decl.kind {
                StmtKind::Function(func) => {
                    if let Some(name) = &func.name {
                        self.record_property_member(members, name);
                    }
                }
                StmtKind::Class(class) => {
                    if let Some(name) = &class.name {
                        self.record_property_member(members, name);
                    }
                }
                StmtKind::Var(var) => {
                    for decl in &var.decls {
                        decl.binding.for_each_ident(&mut |ident| {
                            self.record_property_member(members, ident);
                        });
                    }
                }
                StmtKind::Namespace(ns) => self.record_nested_member(members, &ns.name),
                StmtKind::Enum(decl) => self.record_nested_member(members, &decl.name),
                _ => {}
            }
        }
    }

    fn record_property_member(&mut self, members: MembersId, ident: &BindingIdent) {
        if !ident.symbol.is_valid() {
            return;
        }
        self.namespaces.members_mut(members).insert(
            ident.name.clone(),
            NamespaceMember {
                loc: ident.span.start,
                data: NamespaceMemberData::Property,
                is_enum_value: false,
            },
        );
        self.namespaces
            .set_member_data(ident.symbol, NamespaceMemberData::Property);
    }

    fn record_nested_member(&mut self, members: MembersId, ident: &BindingIdent) {
        if let Some(data) = self.namespaces.member_data(ident.symbol).cloned() {
            self.namespaces.members_mut(members).insert(
                ident.name.clone(),
                NamespaceMember {
                    loc: ident.span.start,
                    data,
                    is_enum_value: false,
                },
            );
        }
    }

    // =========================================================================
    // Enums
    // =========================================================================

    /// `enum E { A, B = 2 }`, with the current token at `enum`.
    pub(crate) fn parse_enum_stmt(&mut self, start: u32, opts: StmtOpts) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Enum)?;
        let (name, name_span) = self.expect_identifier()?;
        let is_declare = opts.is_typescript_declare;

        let mut symbol = Ref::INVALID;
        let mut members = None;
        let mut scope = None;
        if !is_declare {
            // Look up the table first: merging with a namespace replaces the
            // scope member with the new enum symbol
            let id = self.get_or_create_exported_namespace_members(&name, opts.is_export);
            symbol = self.declare_symbol(SymbolKind::TSEnum, name_span, &name);
            self.namespaces
                .set_member_data(symbol, NamespaceMemberData::Namespace(id));
            let id_scope = self.push_scope(ScopeKind::Entry);
            self.scopes.get_mut(id_scope).ts_namespace = Some(NamespaceScope {
                exported_members: id,
                arg: None,
                is_enum_scope: true,
            });
            members = Some(id);
            scope = Some(id_scope);
        }

        let values = self.parse_enum_body(members, is_declare);

        let (Some(members), Some(scope)) = (members, scope) else {
            values?;
            self.expect(TokenKind::RBrace)?;
            if opts.is_namespace_scope && opts.is_export {
                self.has_non_local_export_declare_inside_namespace = true;
            }
            return Ok(Stmt::typescript(self.span_from(start)));
        };
        let values = values?;

        let arg = self.declare_closure_arg(&name, name_span);
        self.namespaces
            .set_member_data(arg, NamespaceMemberData::Namespace(members));
        if let Some(ns) = self.scopes.get_mut(scope).ts_namespace.as_mut() {
            ns.arg = Some(arg);
        }
        self.pop_scope();
        self.expect(TokenKind::RBrace)?;
        debug!(name = %name, values = values.len(), "parsed enum");

        Ok(Stmt::new(
            StmtKind::Enum(Box::new(EnumDecl {
                name: BindingIdent {
                    name,
                    symbol,
                    span: name_span,
                },
                arg,
                values,
                scope,
            })),
            self.span_from(start),
        ))
    }

    /// Members up to (not including) the closing brace.
    fn parse_enum_body(
        &mut self,
        members: Option<MembersId>,
        is_declare: bool,
    ) -> Result<Vec<EnumValue>, ParseError> {
        self.expect(TokenKind::LBrace)?;
        let mut values = Vec::new();
        while !self.check(TokenKind::RBrace) {
            let span = self.lexer.span();
            let name = if self.check(TokenKind::String) {
                self.lexer.string_value()
            } else if self.lexer.is_identifier_or_keyword() {
                self.lexer.identifier().into_owned()
            } else {
                return Err(self.lexer.expected("identifier"));
            };
            self.next()?;

            // Identifier-shaped names are in scope for later initializers
            let symbol = if !is_declare && is_identifier_name(&name) {
                Some(self.declare_symbol(SymbolKind::Other, span, &name))
            } else {
                None
            };

            let init = if self.eat(TokenKind::Eq)? {
                Some(self.parse_expr(Level::Comma)?)
            } else {
                None
            };

            if let Some(members) = members {
                self.namespaces.members_mut(members).insert(
                    name.clone(),
                    NamespaceMember {
                        loc: span.start,
                        data: NamespaceMemberData::Property,
                        is_enum_value: true,
                    },
                );
            }
            values.push(EnumValue {
                name,
                symbol,
                init,
                span: self.span_from(span.start),
            });

            if self.check(TokenKind::RBrace) {
                break;
            }
            if !self.check(TokenKind::Comma) {
                return Err(self.missing_enum_comma(&values));
            }
            self.next()?;
        }
        Ok(values)
    }

    /// Log the missing separator, naming whichever side of the gap is on
    /// the line the user is looking at.
    fn missing_enum_comma(&mut self, values: &[EnumValue]) -> ParseError {
        let after = values.last().map(|value| (value.name.as_str(), value.span));
        let (span, text) = match after {
            Some((name, span)) if self.lexer.has_newline_before() => (
                Span::new(span.end, span.end),
                format!("Expected \",\" after \"{name}\" in enum"),
            ),
            _ => {
                let span = self.lexer.span();
                (
                    span,
                    format!("Expected \",\" before \"{}\" in enum", self.lexer.raw()),
                )
            }
        };
        self.add_error(span, text);
        ParseError::logged(span)
    }
}

/// Whether an enum member name can also be written as a bare identifier.
pub(crate) fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c == '$' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c == '$' || c == '\u{200c}' || c == '\u{200d}' || c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::is_identifier_name;
    use crate::ast::*;
    use crate::error::Log;
    use crate::options::ParserOptions;
    use crate::parser::Parser;
    use crate::symbols::{NamespaceMemberData, Ref};

    fn parse(source: &str) -> (Option<Ast>, Log) {
        Parser::new(source, ParserOptions::default()).parse()
    }

    fn parse_ok(source: &str) -> Ast {
        let (ast, log) = parse(source);
        assert!(!log.has_errors(), "unexpected errors for {source:?}: {log:?}");
        ast.expect("ast")
    }

    fn namespace(stmt: &Stmt) -> &NamespaceDecl {
        match &stmt.kind {
            StmtKind::Namespace(ns) => ns,
            StmtKind::Export(export) => match export.as_ref() {
                ExportDecl::Decl { decl } => namespace(decl),
                other => panic!("expected namespace, got {other:?}"),
            },
            other => panic!("expected namespace, got {other:?}"),
        }
    }

    fn module_symbol(ast: &Ast, name: &str) -> Ref {
        ast.scopes.get(ast.module_scope).members[name].symbol
    }

    #[test]
    fn test_namespace_merges_with_function() {
        let ast = parse_ok("function foo() {} namespace foo { 0 }");
        let foo = module_symbol(&ast, "foo");
        assert!(matches!(
            ast.namespaces.member_data(foo),
            Some(NamespaceMemberData::Namespace(_))
        ));
        assert_eq!(ast.stmts.len(), 2);
    }

    #[test]
    fn test_enum_between_namespaces_shares_members() {
        let ast = parse_ok("namespace A { export const x = 1 } enum A { Y } namespace A { 0 }");
        let last = namespace(&ast.stmts[2]);
        let members = ast.scopes.get(last.scope).ts_namespace.as_ref().expect("namespace scope").exported_members;
        let names = ast.namespaces.members(members);
        assert!(names.contains_key("x"));
        assert!(names.contains_key("Y"));
        assert!(matches!(
            ast.namespaces.member_data(module_symbol(&ast, "A")),
            Some(NamespaceMemberData::Namespace(id)) if *id == members
        ));
    }

    #[test]
    fn test_namespace_after_let_is_redeclaration() {
        let (_, log) = parse("let foo; namespace foo { 0 }");
        let errors: Vec<_> = log.errors().collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].text.contains("has already been declared"));
    }

    #[test]
    fn test_type_only_namespaces_are_erased() {
        let ast = parse_ok("namespace A {} namespace B { interface I {} import X = A.Y; }");
        assert!(ast.stmts.is_empty());
        assert!(ast.local_type_names.contains("A"));
        assert!(ast.local_type_names.contains("B"));
    }

    #[test]
    fn test_export_declare_keeps_namespace() {
        let ast = parse_ok("namespace A { export declare function f(): void; }");
        assert_eq!(ast.stmts.len(), 1);
        assert!(namespace(&ast.stmts[0]).stmts.is_empty());
    }

    #[test]
    fn test_export_declare_var_becomes_plain_var() {
        let ast = parse_ok("namespace A { export declare const x: number, y: string; }");
        let ns = namespace(&ast.stmts[0]);
        let StmtKind::Export(export) = &ns.stmts[0].kind else {
            panic!("expected export");
        };
        let ExportDecl::Decl { decl } = export.as_ref() else {
            panic!("expected declaration");
        };
        let StmtKind::Var(var) = &decl.kind else {
            panic!("expected var");
        };
        assert_eq!(var.kind, VarKind::Var);
        assert_eq!(var.decls.len(), 2);
        assert!(var.decls.iter().all(|decl| decl.init.is_none()));
    }

    #[test]
    fn test_merged_namespaces_share_members() {
        let ast = parse_ok("namespace A { export let x = 1 } namespace A { export function y() {} }");
        let first = namespace(&ast.stmts[0]);
        let second = namespace(&ast.stmts[1]);
        let members = |ns: &NamespaceDecl| {
            ast.scopes
                .get(ns.scope)
                .ts_namespace
                .as_ref()
                .map(|data| data.exported_members)
        };
        assert_eq!(members(first), members(second));
        let table = ast.namespaces.members(members(first).unwrap());
        assert!(table.contains_key("x"));
        assert!(table.contains_key("y"));
    }

    #[test]
    fn test_dotted_namespace_nests_exported() {
        let ast = parse_ok("namespace A.B.C { export const x = 1 }");
        let a = namespace(&ast.stmts[0]);
        let b = namespace(&a.stmts[0]);
        let c = namespace(&b.stmts[0]);
        assert_eq!(c.name.name, "C");
        assert!(matches!(a.stmts[0].kind, StmtKind::Export(_)));
    }

    #[test]
    fn test_closure_arg_is_renamed_on_collision() {
        let ast = parse_ok("namespace foo { let foo = 1 }");
        let ns = namespace(&ast.stmts[0]);
        assert_eq!(ast.symbols.get(ns.arg).name, "_foo");

        let ast = parse_ok("namespace bar { export let x = 1 }");
        let ns = namespace(&ast.stmts[0]);
        assert_eq!(ast.symbols.get(ns.arg).name, "bar");
        assert_ne!(ns.arg, ns.name.symbol);
    }

    #[test]
    fn test_enum_members() {
        let ast = parse_ok("enum E { A, B = 2, 'c-d', if }");
        let StmtKind::Enum(decl) = &ast.stmts[0].kind else {
            panic!("expected enum");
        };
        let names: Vec<_> = decl.values.iter().map(|value| value.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "c-d", "if"]);
        assert!(decl.values[0].symbol.is_some());
        assert!(decl.values[1].init.is_some());
        assert!(decl.values[2].symbol.is_none());

        let members = ast.namespaces.namespace_members(decl.name.symbol).unwrap();
        let table = ast.namespaces.members(members);
        assert!(table.values().all(|member| member.is_enum_value));
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_enum_arg_renamed_when_member_shares_name() {
        let ast = parse_ok("enum E { E, F }");
        let StmtKind::Enum(decl) = &ast.stmts[0].kind else {
            panic!("expected enum");
        };
        assert_eq!(ast.symbols.get(decl.arg).name, "_E");
    }

    #[test]
    fn test_enum_missing_comma() {
        let (ast, log) = parse("enum E { A B }");
        assert!(ast.is_none());
        let errors: Vec<_> = log.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].text, "Expected \",\" before \"B\" in enum");

        let (_, log) = parse("enum E {\n  A\n  B\n}");
        let errors: Vec<_> = log.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].text, "Expected \",\" after \"A\" in enum");
    }

    #[test]
    fn test_declare_enum_and_const_enum() {
        let ast = parse_ok("declare enum A { X } const enum B { Y }");
        assert_eq!(ast.stmts.len(), 1);
        assert!(matches!(ast.stmts[0].kind, StmtKind::Enum(_)));
    }

    #[test]
    fn test_misplaced_decorator_reports_once() {
        let (ast, log) = parse("@dec function foo() {}");
        let errors: Vec<_> = log.errors().collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].text.contains("\"@dec\""));
        assert!(errors[0].text.contains("\"function\""));
        assert!(ast.unwrap().stmts.is_empty());
    }

    #[test]
    fn test_decorators_do_not_reach_nested_classes() {
        let (_, log) = parse("@dec function foo() { class A {} }");
        assert_eq!(log.errors().count(), 1);
    }

    #[test]
    fn test_decorated_classes() {
        let ast = parse_ok("@a.b(1) @c class A {} @d export class B {} @e export default class {}");
        let StmtKind::Class(class) = &ast.stmts[0].kind else {
            panic!("expected class");
        };
        assert_eq!(class.decorators.len(), 2);
        assert!(matches!(class.decorators[0].expr.kind, ExprKind::Call { .. }));
        assert_eq!(ast.stmts.len(), 3);

        let ast = parse_ok("@dec declare class C {}");
        assert!(ast.stmts.is_empty());
    }

    #[test]
    fn test_type_declarations_are_erased() {
        let ast = parse_ok(
            "type A<in out T> = T[]; interface B<T> extends C<T>, D { x: T } \
             declare global { interface Window {} } declare module 'x' { export const y: number; } \
             abstract class E {}",
        );
        assert_eq!(ast.stmts.len(), 1);
        assert!(ast.local_type_names.contains("A"));
        assert!(ast.local_type_names.contains("B"));
    }

    #[test]
    fn test_contextual_words_stay_identifiers() {
        let ast = parse_ok("declare = 1; type = 2; namespace\nfoo; module\nbar");
        assert_eq!(ast.stmts.len(), 6);
    }

    #[test]
    fn test_import_equals() {
        let ast = parse_ok("import fs = require('fs'); import X = A.B.C; import type T = require('t');");
        assert_eq!(ast.stmts.len(), 2);
        let StmtKind::Var(var) = &ast.stmts[0].kind else {
            panic!("expected var");
        };
        assert!(var.was_import_equals);
        assert_eq!(var.kind, VarKind::Const);
        assert!(matches!(
            var.decls[0].init.as_ref().map(|init| &init.kind),
            Some(ExprKind::Call { .. })
        ));
        assert!(!ast.scopes.get(ast.module_scope).members.contains_key("T"));
    }

    #[test]
    fn test_identifier_names() {
        assert!(is_identifier_name("abc"));
        assert!(is_identifier_name("$_1"));
        assert!(!is_identifier_name("1a"));
        assert!(!is_identifier_name("a-b"));
        assert!(!is_identifier_name(""));
    }
}
