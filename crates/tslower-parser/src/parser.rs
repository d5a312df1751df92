//! JavaScript/TypeScript statement parser.
//!
//! Recursive descent in one pass that parses, declares
//! symbols and builds the scope tree. Expressions are in `expr.rs`, type
//! skipping in `ts_types.rs`, TypeScript declarations in `typescript.rs`
//! and backtracking in `speculate.rs`; all of them extend [`Parser`].

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::ast::*;
use crate::error::{AmbientClassError, Diagnostic, DiagnosticKind, Log, ParseError};
use crate::expr::Level;
use crate::lexer::Lexer;
use crate::options::ParserOptions;
use crate::span::Span;
use crate::symbols::{
    can_merge_symbols, MergeResult, NamespaceTables, Ref, ScopeId, ScopeKind, ScopeMember,
    ScopeTree, SymbolKind, SymbolTable,
};
use crate::token::{Token, TokenKind};
use crate::ts_types::TypeParameterFlags;
use crate::typescript::DeferredDecorators;

/// Where a declaration is allowed to appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum LexicalDecl {
    #[default]
    AllowAll,
    /// Body of `while`, `for`, `else` and friends.
    Forbid,
    /// `if (x) function f() {}` is legal sloppy-mode JavaScript.
    AllowFnInsideIf,
    AllowFnInsideLabel,
}

/// Context threaded through statement parsing.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StmtOpts {
    pub is_module_scope: bool,
    pub is_namespace_scope: bool,
    pub is_export: bool,
    /// `export default function() {}` may omit the name.
    pub is_name_optional: bool,
    pub is_typescript_declare: bool,
    pub lexical_decl: LexicalDecl,
}

/// What the enclosing function allows.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FnContext {
    /// `await` is an operator rather than an identifier.
    pub allow_await: bool,
    /// `yield` is an operator rather than an identifier.
    pub allow_yield: bool,
    pub allow_return: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FnOpts {
    pub is_async: bool,
    pub is_generator: bool,
    pub is_constructor: bool,
    /// Overloads, abstract members and ambient functions have no body.
    pub allow_missing_body: bool,
    pub is_declare: bool,
}

/// How a class gets its name binding.
pub(crate) enum ClassName {
    Anonymous,
    /// Already declared in the enclosing scope (class statements).
    Outer(BindingIdent),
    /// Declared inside the class body scope (class expressions).
    Inner(String, Span),
}

/// The parser.
pub struct Parser<'a> {
    pub(crate) lexer: Lexer<'a>,
    pub(crate) options: ParserOptions,
    pub(crate) log: Log,
    pub(crate) symbols: SymbolTable,
    pub(crate) scopes: ScopeTree,
    pub(crate) namespaces: NamespaceTables,
    pub(crate) module_scope: ScopeId,
    pub(crate) current_scope: ScopeId,
    /// Scope that decorators are parsed in: the one enclosing the class.
    pub(crate) decorator_scope: ScopeId,
    pub(crate) local_type_names: FxHashSet<String>,
    /// End of the previous token, for node spans.
    pub(crate) prev_end: u32,
    /// When false, `in` is not parsed as a binary operator (for-in init).
    pub(crate) allow_in: bool,
    pub(crate) fn_ctx: FnContext,
    /// An `export declare` statement was seen in the current namespace body.
    pub(crate) has_non_local_export_declare_inside_namespace: bool,
    pub(crate) deferred_decorators: Option<DeferredDecorators>,
    /// Start of the item currently being parsed inside `( ... )`, which may
    /// still turn out to be an arrow function parameter.
    pub(crate) latest_arrow_arg_loc: Option<u32>,
    /// Set when `x?` inside parentheses only makes sense as an optional
    /// arrow parameter.
    pub(crate) invalid_expr_after_question: Option<Span>,
    /// A suffix right after `x as T` that must not be treated as part of
    /// the cast.
    pub(crate) forbid_suffix_after_as_loc: Option<u32>,
}

impl<'a> Parser<'a> {
    /// Create a new parser.
    pub fn new(source: &'a str, options: ParserOptions) -> Self {
        let mut scopes = ScopeTree::new();
        let module_scope = scopes.push(ScopeKind::Entry, None);
        Self {
            lexer: Lexer::new(source),
            options,
            log: Log::new(),
            symbols: SymbolTable::new(),
            scopes,
            namespaces: NamespaceTables::new(),
            module_scope,
            current_scope: module_scope,
            decorator_scope: module_scope,
            local_type_names: FxHashSet::default(),
            prev_end: 0,
            allow_in: true,
            fn_ctx: FnContext {
                allow_await: options.module,
                allow_yield: false,
                allow_return: !options.module,
            },
            has_non_local_export_declare_inside_namespace: false,
            deferred_decorators: None,
            latest_arrow_arg_loc: None,
            invalid_expr_after_question: None,
            forbid_suffix_after_as_loc: None,
        }
    }

    /// Parse the entire source. A fatal syntax error yields `None` plus the
    /// log, which then holds that error and everything queued before it.
    pub fn parse(mut self) -> (Option<Ast>, Log) {
        match self.parse_program() {
            Ok(stmts) => {
                debug!(
                    statements = stmts.len(),
                    symbols = self.symbols.len(),
                    scopes = self.scopes.len(),
                    "parsed module"
                );
                let ast = Ast {
                    stmts,
                    symbols: self.symbols,
                    scopes: self.scopes,
                    module_scope: self.module_scope,
                    namespaces: self.namespaces,
                    local_type_names: self.local_type_names,
                };
                (Some(ast), self.log)
            }
            Err(err) => {
                debug!(error = %err, logged = err.is_logged(), "parse failed");
                if !err.is_logged() {
                    self.log.add(err.into());
                }
                (None, self.log)
            }
        }
    }

    fn parse_program(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.lexer.next()?;
        let opts = StmtOpts {
            is_module_scope: true,
            ..StmtOpts::default()
        };
        self.parse_stmts_up_to(TokenKind::Eof, opts)
    }

    // =========================================================================
    // Token Handling
    // =========================================================================

    pub(crate) fn next(&mut self) -> Result<(), ParseError> {
        self.prev_end = self.lexer.span().end;
        self.lexer.next()
    }

    #[inline]
    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.lexer.kind() == kind
    }

    /// Consume a token if it matches, returning true if consumed.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> Result<bool, ParseError> {
        if self.check(kind) {
            self.next()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if !self.check(kind) {
            return Err(self.lexer.expected(kind.as_str()));
        }
        self.next()
    }

    /// Consume a semicolon (with ASI support).
    pub(crate) fn expect_semicolon(&mut self) -> Result<(), ParseError> {
        match self.lexer.kind() {
            TokenKind::Semicolon => self.next(),
            // ASI before `}`, at end of file, and after a line break
            TokenKind::RBrace | TokenKind::Eof => Ok(()),
            _ if self.lexer.has_newline_before() => Ok(()),
            _ => Err(self.lexer.expected(";")),
        }
    }

    /// Look at the token after the current one without consuming anything.
    pub(crate) fn peek_token(&mut self) -> Token {
        let snapshot = self.lexer.snapshot();
        let token = match self.lexer.next() {
            Ok(()) => self.lexer.token(),
            Err(_) => Token::default(),
        };
        self.lexer.restore(snapshot);
        token
    }

    /// Consume an identifier and return its decoded name.
    pub(crate) fn expect_identifier(&mut self) -> Result<(String, Span), ParseError> {
        if !self.check(TokenKind::Identifier) {
            return Err(self.lexer.expected("identifier"));
        }
        let name = self.lexer.identifier().into_owned();
        let span = self.lexer.span();
        self.next()?;
        Ok((name, span))
    }

    /// Consume an identifier or a reserved word (property names, import
    /// and export specifiers).
    pub(crate) fn expect_identifier_or_keyword(&mut self) -> Result<(String, Span), ParseError> {
        if !self.lexer.is_identifier_or_keyword() {
            return Err(self.lexer.expected("identifier"));
        }
        let name = self.lexer.identifier().into_owned();
        let span = self.lexer.span();
        self.next()?;
        Ok((name, span))
    }

    pub(crate) fn expect_string(&mut self) -> Result<String, ParseError> {
        if !self.check(TokenKind::String) {
            return Err(self.lexer.expected("string"));
        }
        let value = self.lexer.string_value();
        self.next()?;
        Ok(value)
    }

    #[inline]
    pub(crate) fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.prev_end.max(start))
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Queue a recoverable error. Dropped while speculating.
    pub(crate) fn add_error(&mut self, span: Span, text: impl Into<String>) {
        if !self.lexer.diagnostics_suppressed() {
            self.log.add_error(span, text);
        }
    }

    pub(crate) fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        if !self.lexer.diagnostics_suppressed() {
            self.log.add(diagnostic);
        }
    }

    fn forbid_lexical_decl(&mut self, span: Span) {
        self.add_error(span, "Cannot use a declaration in a single-statement context");
    }

    // =========================================================================
    // Scopes and Symbols
    // =========================================================================

    pub(crate) fn push_scope(&mut self, kind: ScopeKind) -> ScopeId {
        let id = self.scopes.push(kind, Some(self.current_scope));
        self.current_scope = id;
        id
    }

    pub(crate) fn pop_scope(&mut self) {
        if let Some(parent) = self.scopes.get(self.current_scope).parent {
            self.current_scope = parent;
        }
    }

    /// Leave `scope` and mark it and everything created after it as
    /// discarded.
    pub(crate) fn pop_and_discard_scope(&mut self, scope: ScopeId) {
        if let Some(parent) = self.scopes.get(scope).parent {
            self.current_scope = parent;
        }
        self.scopes.discard_from(scope.index());
    }

    /// Declare `name` in the current scope, merging with an existing
    /// declaration where the rules allow it.
    pub(crate) fn declare_symbol(&mut self, kind: SymbolKind, span: Span, name: &str) -> Ref {
        if kind == SymbolKind::Hoisted {
            return self.declare_hoisted(span, name);
        }

        let scope = self.scopes.get(self.current_scope);
        let scope_kind = scope.kind;
        let mut linked_from = None;
        if let Some(existing) = scope.members.get(name).copied() {
            let existing_kind = self.symbols.get(existing.symbol).kind;
            match can_merge_symbols(scope_kind, existing_kind, kind, self.options.typescript) {
                MergeResult::Forbidden => {
                    self.report_redeclaration(name, span, existing.loc);
                    return existing.symbol;
                }
                MergeResult::KeepExisting => {
                    self.scopes.get_mut(self.current_scope).members.insert(
                        name.to_string(),
                        ScopeMember {
                            symbol: existing.symbol,
                            loc: span.start,
                        },
                    );
                    return existing.symbol;
                }
                MergeResult::ReplaceWithNew => linked_from = Some(existing.symbol),
                MergeResult::OverwriteWithNew => {}
            }
        }

        let r = self.symbols.add(kind, name);
        if let Some(old) = linked_from {
            self.symbols.get_mut(old).link = Some(r);
        }
        self.scopes.get_mut(self.current_scope).members.insert(
            name.to_string(),
            ScopeMember {
                symbol: r,
                loc: span.start,
            },
        );
        r
    }

    /// `var` declarations belong to the nearest function-level scope but are
    /// also visible (and can conflict) in every block on the way up.
    fn declare_hoisted(&mut self, span: Span, name: &str) -> Ref {
        let mut chain = Vec::new();
        let mut id = self.current_scope;
        loop {
            chain.push(id);
            let scope = self.scopes.get(id);
            match scope.parent {
                Some(parent) if !scope.kind.stops_hoisting() => id = parent,
                _ => break,
            }
        }

        let mut reuse = None;
        let mut replaced = Vec::new();
        for &id in &chain {
            let scope = self.scopes.get(id);
            let Some(existing) = scope.members.get(name).copied() else {
                continue;
            };
            let existing_kind = self.symbols.get(existing.symbol).kind;
            match can_merge_symbols(
                scope.kind,
                existing_kind,
                SymbolKind::Hoisted,
                self.options.typescript,
            ) {
                MergeResult::Forbidden => {
                    self.report_redeclaration(name, span, existing.loc);
                    return existing.symbol;
                }
                MergeResult::KeepExisting => reuse = Some(existing.symbol),
                MergeResult::ReplaceWithNew => replaced.push(existing.symbol),
                MergeResult::OverwriteWithNew => {}
            }
        }

        let r = match reuse {
            Some(r) => r,
            None => self.symbols.add(SymbolKind::Hoisted, name),
        };
        for old in replaced {
            if old != r && self.symbols.get(old).link.is_none() {
                self.symbols.get_mut(old).link = Some(r);
            }
        }
        for id in chain {
            self.scopes.get_mut(id).members.insert(
                name.to_string(),
                ScopeMember {
                    symbol: r,
                    loc: span.start,
                },
            );
        }
        r
    }

    fn report_redeclaration(&mut self, name: &str, span: Span, existing_loc: u32) {
        let original = Span::new(existing_loc, existing_loc + name.len() as u32);
        self.add_diagnostic(
            Diagnostic::error(span, format!("The symbol \"{name}\" has already been declared"))
                .with_note(
                    original,
                    format!("The symbol \"{name}\" was originally declared here:"),
                ),
        );
    }

    /// Declare every identifier in a binding pattern. Ambient declarations
    /// only declare names when they are exported from a namespace, because
    /// those names turn into property accesses.
    pub(crate) fn declare_binding(&mut self, kind: SymbolKind, binding: &mut Binding, opts: StmtOpts) {
        if opts.is_typescript_declare && !(opts.is_namespace_scope && opts.is_export) {
            return;
        }
        binding.for_each_ident_mut(&mut |ident| {
            let name = ident.name.clone();
            ident.symbol = self.declare_symbol(kind, ident.span, &name);
        });
    }

    // =========================================================================
    // Statement Lists
    // =========================================================================

    /// Parse statements until `end`, which is left unconsumed. Erased
    /// TypeScript declarations are dropped from the list.
    pub(crate) fn parse_stmts_up_to(
        &mut self,
        end: TokenKind,
        opts: StmtOpts,
    ) -> Result<Vec<Stmt>, ParseError> {
        // Decorators waiting for a class never reach into a nested body.
        let outer_decorators = self.deferred_decorators.take();
        let mut stmts = Vec::new();
        while !self.check(end) {
            if self.check(TokenKind::Eof) {
                return Err(self.lexer.expected(end.as_str()));
            }
            let stmt = self.parse_stmt(opts)?;
            if self.options.typescript && stmt.is_typescript() {
                continue;
            }
            stmts.push(stmt);
        }
        self.deferred_decorators = outer_decorators;
        Ok(stmts)
    }

    /// Parse a braced block with its own scope.
    pub(crate) fn parse_block(&mut self) -> Result<Block, ParseError> {
        self.expect(TokenKind::LBrace)?;
        let scope = self.push_scope(ScopeKind::Block);
        let stmts = self.parse_stmts_up_to(TokenKind::RBrace, StmtOpts::default())?;
        self.next()?;
        self.pop_scope();
        Ok(Block { stmts, scope })
    }

    // =========================================================================
    // Statement Parsing
    // =========================================================================

    /// Parse a statement.
    pub(crate) fn parse_stmt(&mut self, opts: StmtOpts) -> Result<Stmt, ParseError> {
        let start = self.lexer.loc();

        match self.lexer.kind() {
            TokenKind::Semicolon => {
                self.next()?;
                Ok(Stmt::new(StmtKind::Empty, self.span_from(start)))
            }
            TokenKind::LBrace => {
                let block = self.parse_block()?;
                Ok(Stmt::new(StmtKind::Block(block), self.span_from(start)))
            }
            TokenKind::Export => self.parse_export_stmt(start, opts),
            TokenKind::Import => self.parse_import_stmt(start, opts),
            TokenKind::At => self.parse_decorated_stmt(start, opts),

            // Declarations
            TokenKind::Var => {
                self.next()?;
                let decls = self.parse_and_declare_decls(SymbolKind::Hoisted, opts)?;
                self.expect_semicolon()?;
                Ok(self.var_stmt(VarKind::Var, decls, start))
            }
            TokenKind::Const => {
                self.next()?;
                if self.options.typescript && self.check(TokenKind::Enum) {
                    return self.parse_enum_stmt(start, opts);
                }
                if opts.lexical_decl != LexicalDecl::AllowAll {
                    self.forbid_lexical_decl(Span::new(start, start + 5));
                }
                let decls = self.parse_and_declare_decls(SymbolKind::Const, opts)?;
                self.expect_semicolon()?;
                Ok(self.var_stmt(VarKind::Const, decls, start))
            }
            TokenKind::Enum if self.options.typescript => self.parse_enum_stmt(start, opts),
            TokenKind::Function => {
                self.next()?;
                self.parse_fn_stmt(start, opts, false)
            }
            TokenKind::Class => self.parse_class_stmt(start, opts),

            // Control flow
            TokenKind::If => self.parse_if_stmt(start),
            TokenKind::Switch => self.parse_switch_stmt(start),
            TokenKind::For => self.parse_for_stmt(start),
            TokenKind::While => self.parse_while_stmt(start),
            TokenKind::Do => self.parse_do_while_stmt(start),
            TokenKind::Break | TokenKind::Continue => self.parse_jump_stmt(start),
            TokenKind::Return => self.parse_return_stmt(start),
            TokenKind::Throw => self.parse_throw_stmt(start),
            TokenKind::Try => self.parse_try_stmt(start),
            TokenKind::With => self.parse_with_stmt(start),
            TokenKind::Debugger => {
                self.next()?;
                self.expect_semicolon()?;
                Ok(Stmt::new(StmtKind::Debugger, self.span_from(start)))
            }

            TokenKind::Identifier => self.parse_identifier_stmt(start, opts),
            _ => self.parse_expr_stmt(start),
        }
    }

    fn var_stmt(&self, kind: VarKind, decls: Vec<VarDeclarator>, start: u32) -> Stmt {
        Stmt::new(
            StmtKind::Var(VarDecl {
                kind,
                decls,
                was_import_equals: false,
            }),
            self.span_from(start),
        )
    }

    /// Statements that start with an identifier: `async function`, `let`,
    /// TypeScript's contextual declarations, labels and plain expressions.
    fn parse_identifier_stmt(&mut self, start: u32, opts: StmtOpts) -> Result<Stmt, ParseError> {
        if self.lexer.is_contextual_keyword("async") {
            let next = self.peek_token();
            if next.kind == TokenKind::Function && !next.has_newline_before {
                self.next()?;
                self.next()?;
                return self.parse_fn_stmt(start, opts, true);
            }
        }

        if self.lexer.is_contextual_keyword("let") {
            let next = self.peek_token();
            if matches!(
                next.kind,
                TokenKind::Identifier | TokenKind::LBracket | TokenKind::LBrace
            ) {
                self.next()?;
                if opts.lexical_decl != LexicalDecl::AllowAll {
                    self.forbid_lexical_decl(Span::new(start, start + 3));
                }
                let decls = self.parse_and_declare_decls(SymbolKind::Other, opts)?;
                self.expect_semicolon()?;
                return Ok(self.var_stmt(VarKind::Let, decls, start));
            }
        }

        if self.options.typescript {
            if let Some(stmt) = self.parse_typescript_contextual_stmt(start, opts)? {
                return Ok(stmt);
            }
        }

        self.parse_expr_stmt(start)
    }

    /// Expression statement, or a labeled statement when the expression is
    /// a bare identifier followed by `:`.
    fn parse_expr_stmt(&mut self, start: u32) -> Result<Stmt, ParseError> {
        let was_identifier = self.check(TokenKind::Identifier);
        let expr = self.parse_expr(Level::Lowest)?;

        if was_identifier && self.check(TokenKind::Colon) {
            if let ExprKind::Ident(label) = expr.kind {
                self.next()?;
                let body = self.parse_stmt(StmtOpts {
                    lexical_decl: LexicalDecl::AllowFnInsideLabel,
                    ..StmtOpts::default()
                })?;
                return Ok(Stmt::new(
                    StmtKind::Labeled {
                        label,
                        body: Box::new(body),
                    },
                    self.span_from(start),
                ));
            }
        }

        self.expect_semicolon()?;
        Ok(Stmt::new(StmtKind::Expr(expr), self.span_from(start)))
    }

    // =========================================================================
    // Variable Declarations and Bindings
    // =========================================================================

    /// Parse `a = 1, [b] = c` after `var`/`let`/`const` and declare every
    /// name before its initializer is parsed.
    pub(crate) fn parse_and_declare_decls(
        &mut self,
        kind: SymbolKind,
        opts: StmtOpts,
    ) -> Result<Vec<VarDeclarator>, ParseError> {
        let mut decls = Vec::new();
        loop {
            let start = self.lexer.loc();
            if kind != SymbolKind::Hoisted && self.lexer.is_contextual_keyword("let") {
                self.add_error(self.lexer.span(), "Cannot use \"let\" as an identifier here:");
            }
            let mut binding = self.parse_binding()?;
            self.declare_binding(kind, &mut binding, opts);

            if self.options.typescript {
                // "let foo!: number"
                let definite = self.check(TokenKind::Bang) && !self.lexer.has_newline_before();
                if definite {
                    self.next()?;
                }
                if definite || self.check(TokenKind::Colon) {
                    self.expect(TokenKind::Colon)?;
                    self.skip_type_script_type(Level::Lowest)?;
                }
            }

            let init = if self.eat(TokenKind::Eq)? {
                Some(self.parse_expr(Level::Comma)?)
            } else {
                None
            };
            decls.push(VarDeclarator {
                binding,
                init,
                span: self.span_from(start),
            });

            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        Ok(decls)
    }

    /// Parse a binding pattern. Identifiers are left undeclared.
    pub(crate) fn parse_binding(&mut self) -> Result<Binding, ParseError> {
        let start = self.lexer.loc();
        match self.lexer.kind() {
            TokenKind::Identifier => {
                let (name, span) = self.expect_identifier()?;
                Ok(Binding::new(
                    BindingKind::Ident(BindingIdent {
                        name,
                        symbol: Ref::INVALID,
                        span,
                    }),
                    span,
                ))
            }
            TokenKind::LBracket => {
                self.next()?;
                let mut elements = Vec::new();
                while !self.check(TokenKind::RBracket) {
                    if self.eat(TokenKind::Comma)? {
                        elements.push(None);
                        continue;
                    }
                    let rest = self.eat(TokenKind::Spread)?;
                    let binding = self.parse_binding()?;
                    let default = if !rest && self.eat(TokenKind::Eq)? {
                        Some(self.parse_expr(Level::Comma)?)
                    } else {
                        None
                    };
                    elements.push(Some(ArrayPatternElement {
                        binding,
                        default,
                        rest,
                    }));
                    if rest || !self.eat(TokenKind::Comma)? {
                        break;
                    }
                }
                self.expect(TokenKind::RBracket)?;
                Ok(Binding::new(
                    BindingKind::Array { elements },
                    self.span_from(start),
                ))
            }
            TokenKind::LBrace => {
                self.next()?;
                let mut properties = Vec::new();
                while !self.check(TokenKind::RBrace) {
                    if self.eat(TokenKind::Spread)? {
                        let (name, span) = self.expect_identifier()?;
                        properties.push(ObjectPatternProperty {
                            key: PropertyKey::Ident(name.clone()),
                            value: Binding::new(
                                BindingKind::Ident(BindingIdent {
                                    name,
                                    symbol: Ref::INVALID,
                                    span,
                                }),
                                span,
                            ),
                            default: None,
                            shorthand: false,
                            rest: true,
                        });
                        break;
                    }

                    let is_identifier = self.check(TokenKind::Identifier);
                    let key_span = self.lexer.span();
                    let key = self.parse_property_key()?;
                    let (value, shorthand) = if self.eat(TokenKind::Colon)? {
                        (self.parse_binding()?, false)
                    } else {
                        let PropertyKey::Ident(name) = &key else {
                            return Err(self.lexer.expected(":"));
                        };
                        if !is_identifier {
                            return Err(ParseError::new(
                                format!("Cannot use \"{name}\" as an identifier here:"),
                                key_span,
                            ));
                        }
                        let ident = BindingIdent {
                            name: name.clone(),
                            symbol: Ref::INVALID,
                            span: key_span,
                        };
                        (Binding::new(BindingKind::Ident(ident), key_span), true)
                    };
                    let default = if self.eat(TokenKind::Eq)? {
                        Some(self.parse_expr(Level::Comma)?)
                    } else {
                        None
                    };
                    properties.push(ObjectPatternProperty {
                        key,
                        value,
                        default,
                        shorthand,
                        rest: false,
                    });
                    if !self.eat(TokenKind::Comma)? {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace)?;
                Ok(Binding::new(
                    BindingKind::Object { properties },
                    self.span_from(start),
                ))
            }
            _ => Err(self.lexer.expected("identifier")),
        }
    }

    // =========================================================================
    // Functions
    // =========================================================================

    /// Parse a function statement after `function` (and `async`).
    pub(crate) fn parse_fn_stmt(
        &mut self,
        start: u32,
        opts: StmtOpts,
        is_async: bool,
    ) -> Result<Stmt, ParseError> {
        let is_generator = self.eat(TokenKind::Star)?;
        match opts.lexical_decl {
            LexicalDecl::Forbid => self.forbid_lexical_decl(Span::new(start, start + 8)),
            LexicalDecl::AllowFnInsideIf | LexicalDecl::AllowFnInsideLabel
                if opts.is_typescript_declare || is_generator || is_async =>
            {
                self.forbid_lexical_decl(Span::new(start, start + 8))
            }
            _ => {}
        }

        let name = if !opts.is_name_optional || self.check(TokenKind::Identifier) {
            Some(self.expect_identifier()?)
        } else {
            None
        };

        // Even anonymous functions can have type parameters
        if self.options.typescript {
            self.skip_type_script_type_parameters(TypeParameterFlags::ALLOW_CONST_MODIFIER)?;
        }

        self.push_scope(ScopeKind::FunctionArgs);
        let func = self.parse_fn(
            start,
            None,
            FnOpts {
                is_async,
                is_generator,
                allow_missing_body: self.options.typescript,
                is_declare: opts.is_typescript_declare,
                ..FnOpts::default()
            },
        )?;

        // Forward declarations and ambient functions produce nothing. The
        // name is declared only after the body is seen, so an overload
        // followed by its implementation declares it once.
        let Some(mut func) = func else {
            if opts.is_typescript_declare && opts.is_namespace_scope && opts.is_export {
                self.has_non_local_export_declare_inside_namespace = true;
            }
            return Ok(Stmt::typescript(self.span_from(start)));
        };

        if let Some((text, span)) = name {
            let kind = if is_generator || is_async {
                SymbolKind::GeneratorOrAsyncFunction
            } else {
                SymbolKind::HoistedFunction
            };
            let symbol = self.declare_symbol(kind, span, &text);
            func.name = Some(BindingIdent {
                name: text,
                symbol,
                span,
            });
        }
        Ok(Stmt::new(
            StmtKind::Function(Box::new(func)),
            self.span_from(start),
        ))
    }

    /// Parse parameters, return type and body. The caller has already
    /// pushed the `FunctionArgs` scope; it is popped here, or discarded if
    /// the function turns out to have no runtime presence.
    pub(crate) fn parse_fn(
        &mut self,
        start: u32,
        name: Option<BindingIdent>,
        opts: FnOpts,
    ) -> Result<Option<Function>, ParseError> {
        let args_scope = self.current_scope;
        let old_ctx = self.fn_ctx;
        self.fn_ctx = FnContext {
            allow_await: opts.is_async,
            allow_yield: opts.is_generator,
            allow_return: true,
        };

        self.expect(TokenKind::LParen)?;
        let params = self.parse_fn_args(opts.is_constructor)?;

        if self.options.typescript && self.eat(TokenKind::Colon)? {
            self.skip_type_script_return_type()?;
        }

        if opts.allow_missing_body && !self.check(TokenKind::LBrace) {
            self.expect_semicolon()?;
            self.fn_ctx = old_ctx;
            self.pop_and_discard_scope(args_scope);
            return Ok(None);
        }

        let (body, body_scope) = self.parse_fn_body()?;
        self.fn_ctx = old_ctx;

        if opts.is_declare {
            self.pop_and_discard_scope(args_scope);
            return Ok(None);
        }
        self.pop_scope();

        Ok(Some(Function {
            name,
            params,
            body,
            is_async: opts.is_async,
            is_generator: opts.is_generator,
            args_scope,
            body_scope,
            span: self.span_from(start),
        }))
    }

    /// `{ ... }` of a function, in a new `FunctionBody` scope.
    pub(crate) fn parse_fn_body(&mut self) -> Result<(Vec<Stmt>, ScopeId), ParseError> {
        self.expect(TokenKind::LBrace)?;
        let scope = self.push_scope(ScopeKind::FunctionBody);
        let stmts = self.parse_stmts_up_to(TokenKind::RBrace, StmtOpts::default())?;
        self.next()?;
        self.pop_scope();
        Ok((stmts, scope))
    }

    /// Parse the parameter list after `(`, including the closing `)`.
    fn parse_fn_args(&mut self, allow_parameter_properties: bool) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();
        while !self.check(TokenKind::RParen) {
            let start = self.lexer.loc();

            let decorators = if self.check(TokenKind::At) {
                if !self.options.typescript || !self.options.allow_decorators {
                    return Err(self.lexer.unexpected());
                }
                let scope = self.decorator_scope;
                self.parse_decorators(scope)?
            } else {
                Vec::new()
            };

            let mut is_parameter_property = false;
            if self.options.typescript {
                // "constructor(public readonly x)"
                while self.check(TokenKind::Identifier)
                    && matches!(
                        self.lexer.raw(),
                        "public" | "private" | "protected" | "readonly" | "override"
                    )
                {
                    let next = self.peek_token();
                    if !matches!(
                        next.kind,
                        TokenKind::Identifier | TokenKind::LBrace | TokenKind::LBracket
                    ) {
                        break;
                    }
                    if !allow_parameter_properties {
                        self.add_error(
                            self.lexer.span(),
                            "A parameter property is only allowed in a constructor implementation",
                        );
                    }
                    self.next()?;
                    is_parameter_property = true;
                }

                // "function f(this: Foo)" declares the type of `this` only
                if self.check(TokenKind::This) {
                    self.next()?;
                    if self.eat(TokenKind::Colon)? {
                        self.skip_type_script_type(Level::Lowest)?;
                    }
                    if !self.eat(TokenKind::Comma)? {
                        break;
                    }
                    continue;
                }
            }

            let rest = self.eat(TokenKind::Spread)?;
            let mut binding = self.parse_binding()?;

            if self.options.typescript {
                if self.check(TokenKind::Question) {
                    self.next()?;
                }
                if self.eat(TokenKind::Colon)? {
                    self.skip_type_script_type(Level::Lowest)?;
                }
            }

            let default = if self.eat(TokenKind::Eq)? {
                Some(self.parse_expr(Level::Comma)?)
            } else {
                None
            };

            self.declare_binding(SymbolKind::Hoisted, &mut binding, StmtOpts::default());
            params.push(Param {
                binding,
                default,
                rest,
                decorators,
                is_parameter_property: is_parameter_property && allow_parameter_properties,
                span: self.span_from(start),
            });

            if !self.eat(TokenKind::Comma)? {
                break;
            }
            if rest {
                return Err(ParseError::new(
                    "Unexpected \",\" after rest pattern",
                    self.span_from(start),
                ));
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    // =========================================================================
    // Classes
    // =========================================================================

    /// Parse a class statement starting at `class`.
    pub(crate) fn parse_class_stmt(&mut self, start: u32, opts: StmtOpts) -> Result<Stmt, ParseError> {
        let decorators = self
            .deferred_decorators
            .take()
            .map(|deferred| deferred.decorators)
            .unwrap_or_default();

        let class_span = self.lexer.span();
        self.expect(TokenKind::Class)?;
        if opts.lexical_decl != LexicalDecl::AllowAll {
            self.forbid_lexical_decl(class_span);
        }

        let name = if self.check(TokenKind::Identifier)
            && !(self.options.typescript && self.lexer.is_contextual_keyword("implements"))
        {
            let (text, span) = self.expect_identifier()?;
            let symbol = if opts.is_typescript_declare {
                Ref::INVALID
            } else {
                self.declare_symbol(SymbolKind::Class, span, &text)
            };
            ClassName::Outer(BindingIdent {
                name: text,
                symbol,
                span,
            })
        } else if opts.is_name_optional {
            ClassName::Anonymous
        } else {
            return Err(self.lexer.expected("identifier"));
        };

        let class = self.parse_class(start, name, decorators, opts.is_typescript_declare)?;

        if opts.is_typescript_declare {
            self.scopes.discard_from(class.scope.index());
            if opts.is_namespace_scope && opts.is_export {
                self.has_non_local_export_declare_inside_namespace = true;
            }
            return Ok(Stmt::new(
                StmtKind::TypeScript {
                    was_declare_class: true,
                },
                self.span_from(start),
            ));
        }
        Ok(Stmt::new(
            StmtKind::Class(Box::new(class)),
            self.span_from(start),
        ))
    }

    /// Parse everything after the class name.
    pub(crate) fn parse_class(
        &mut self,
        start: u32,
        name: ClassName,
        decorators: Vec<Decorator>,
        is_declare: bool,
    ) -> Result<Class, ParseError> {
        if self.options.typescript {
            self.skip_type_script_type_parameters(
                TypeParameterFlags::ALLOW_IN_OUT_VARIANCE | TypeParameterFlags::ALLOW_CONST_MODIFIER,
            )?;
        }

        let super_class = if self.eat(TokenKind::Extends)? {
            let expr = self.parse_expr(Level::New)?;
            // Type arguments after the base class backtrack inside the
            // expression parser because `{` follows them, so skip them here
            if self.options.typescript {
                self.skip_type_script_type_arguments(false)?;
            }
            Some(Box::new(expr))
        } else {
            None
        };

        if self.options.typescript && self.lexer.is_contextual_keyword("implements") {
            self.next()?;
            loop {
                self.skip_type_script_type(Level::Lowest)?;
                if !self.eat(TokenKind::Comma)? {
                    break;
                }
            }
        }

        self.expect(TokenKind::LBrace)?;
        let enclosing = self.current_scope;
        let scope = self.push_scope(ScopeKind::ClassBody);
        let name = match name {
            ClassName::Anonymous => None,
            ClassName::Outer(ident) => Some(ident),
            ClassName::Inner(text, span) => {
                let symbol = self.declare_symbol(SymbolKind::Class, span, &text);
                Some(BindingIdent {
                    name: text,
                    symbol,
                    span,
                })
            }
        };

        let old_decorator_scope = std::mem::replace(&mut self.decorator_scope, enclosing);
        let old_ctx = std::mem::take(&mut self.fn_ctx);
        let old_allow_in = std::mem::replace(&mut self.allow_in, true);

        let mut body = Vec::new();
        while !self.check(TokenKind::RBrace) {
            if self.eat(TokenKind::Semicolon)? {
                continue;
            }
            if let Some(member) = self.parse_class_member(is_declare)? {
                body.push(member);
            }
        }
        self.next()?;

        self.allow_in = old_allow_in;
        self.fn_ctx = old_ctx;
        self.decorator_scope = old_decorator_scope;
        self.pop_scope();

        Ok(Class {
            name,
            super_class,
            body,
            decorators,
            scope,
            span: self.span_from(start),
        })
    }

    /// Parse one class member. Members with no runtime presence (index
    /// signatures, overloads, abstract and `declare` members) yield `None`.
    fn parse_class_member(&mut self, is_declare_class: bool) -> Result<Option<ClassMember>, ParseError> {
        let start = self.lexer.loc();
        let decorators = if self.check(TokenKind::At) {
            if !self.options.allow_decorators {
                return Err(self.lexer.unexpected());
            }
            let scope = self.decorator_scope;
            self.parse_decorators(scope)?
        } else {
            Vec::new()
        };

        // "static { ... }"
        if self.lexer.is_contextual_keyword("static") && self.peek_token().kind == TokenKind::LBrace {
            self.next()?;
            self.expect(TokenKind::LBrace)?;
            let scope = self.push_scope(ScopeKind::FunctionBody);
            let stmts = self.parse_stmts_up_to(TokenKind::RBrace, StmtOpts::default())?;
            self.next()?;
            self.pop_scope();
            return Ok(Some(ClassMember {
                kind: ClassMemberKind::StaticBlock(Block { stmts, scope }),
                decorators,
                span: self.span_from(start),
            }));
        }

        let mut is_static = false;
        let mut is_async = false;
        let mut is_abstract = false;
        let mut is_accessor = false;
        let mut declare_span = None;
        let mut method_kind = MethodKind::Method;

        while self.check(TokenKind::Identifier) {
            let word = self.lexer.raw();
            let is_ts_modifier = matches!(
                word,
                "public" | "private" | "protected" | "readonly" | "abstract" | "declare" | "override"
            );
            if !is_ts_modifier
                && !matches!(word, "static" | "get" | "set" | "async" | "accessor")
            {
                break;
            }
            if is_ts_modifier && !self.options.typescript {
                break;
            }
            let next = self.peek_token();
            let can_follow = next.kind.is_keyword()
                || matches!(
                    next.kind,
                    TokenKind::Identifier
                        | TokenKind::String
                        | TokenKind::Number
                        | TokenKind::BigInt
                        | TokenKind::PrivateIdentifier
                        | TokenKind::LBracket
                        | TokenKind::Star
                );
            let same_line_required = !matches!(word, "static" | "get" | "set");
            if !can_follow || (same_line_required && next.has_newline_before) {
                break;
            }
            match word {
                "static" => is_static = true,
                "async" => is_async = true,
                "get" => method_kind = MethodKind::Get,
                "set" => method_kind = MethodKind::Set,
                "abstract" => is_abstract = true,
                "accessor" => is_accessor = true,
                "declare" => declare_span = Some(self.lexer.span()),
                _ => {}
            }
            self.next()?;
        }

        let is_generator = self.eat(TokenKind::Star)?;
        let key_span = self.lexer.span();
        let is_ambient = is_declare_class || declare_span.is_some();

        // "[key: string]: any;"
        if self.options.typescript && self.check(TokenKind::LBracket) && self.is_index_signature() {
            if let Some(span) = declare_span {
                self.add_ambient_class_error(span, AmbientClassError::IndexSignature);
            }
            self.next()?;
            self.next()?;
            self.expect(TokenKind::Colon)?;
            self.skip_type_script_type(Level::Lowest)?;
            self.expect(TokenKind::RBracket)?;
            if self.check(TokenKind::Question) {
                self.next()?;
            }
            self.expect(TokenKind::Colon)?;
            self.skip_type_script_type(Level::Lowest)?;
            self.expect_semicolon()?;
            return Ok(None);
        }

        if self.check(TokenKind::PrivateIdentifier) && is_ambient {
            self.add_ambient_class_error(
                declare_span.unwrap_or(key_span),
                AmbientClassError::PrivateIdentifier,
            );
        }

        let key = self.parse_property_key()?;
        let is_constructor = !is_static
            && matches!(&key, PropertyKey::Ident(n) | PropertyKey::String(n) if n == "constructor");

        // "foo?()" and "foo!: T"
        if self.options.typescript
            && matches!(self.lexer.kind(), TokenKind::Question | TokenKind::Bang)
            && !self.lexer.has_newline_before()
        {
            self.next()?;
        }

        if self.check(TokenKind::LParen) || self.check(TokenKind::Lt) {
            self.push_scope(ScopeKind::FunctionArgs);
            if self.options.typescript {
                self.skip_type_script_type_parameters(TypeParameterFlags::ALLOW_CONST_MODIFIER)?;
            }
            let body_start = self.lexer.loc();
            let func = self.parse_fn(
                start,
                None,
                FnOpts {
                    is_async,
                    is_generator,
                    is_constructor,
                    allow_missing_body: self.options.typescript,
                    is_declare: false,
                },
            )?;
            let Some(func) = func else {
                return Ok(None);
            };
            if is_ambient {
                self.add_ambient_class_error(
                    Span::new(body_start, self.prev_end),
                    AmbientClassError::MemberBody,
                );
            }
            if is_abstract {
                return Ok(None);
            }
            let kind = if is_constructor {
                MethodKind::Constructor
            } else {
                method_kind
            };
            return Ok(Some(ClassMember {
                kind: ClassMemberKind::Method {
                    key,
                    value: func,
                    kind,
                    is_static,
                },
                decorators,
                span: self.span_from(start),
            }));
        }

        // Field
        if self.options.typescript && self.eat(TokenKind::Colon)? {
            self.skip_type_script_type(Level::Lowest)?;
        }
        let value = if self.eat(TokenKind::Eq)? {
            Some(self.parse_expr(Level::Comma)?)
        } else {
            None
        };
        self.expect_semicolon()?;

        if is_ambient || is_abstract {
            return Ok(None);
        }
        Ok(Some(ClassMember {
            kind: ClassMemberKind::Property {
                key,
                value,
                is_static,
                is_accessor,
            },
            decorators,
            span: self.span_from(start),
        }))
    }

    /// At `[`: is this `[name: Type]` rather than a computed key?
    fn is_index_signature(&mut self) -> bool {
        let snapshot = self.lexer.snapshot();
        let result = (|| -> Result<bool, ParseError> {
            self.lexer.next()?;
            if !self.lexer.is_identifier_or_keyword() {
                return Ok(false);
            }
            self.lexer.next()?;
            Ok(self.lexer.kind() == TokenKind::Colon)
        })()
        .unwrap_or(false);
        self.lexer.restore(snapshot);
        result
    }

    fn add_ambient_class_error(&mut self, span: Span, kind: AmbientClassError) {
        self.add_diagnostic(
            Diagnostic::error(span, kind.to_string()).with_kind(DiagnosticKind::AmbientClass(kind)),
        );
    }

    // =========================================================================
    // Control Flow
    // =========================================================================

    fn parse_paren_test(&mut self) -> Result<Expr, ParseError> {
        self.expect(TokenKind::LParen)?;
        let test = self.parse_expr(Level::Lowest)?;
        self.expect(TokenKind::RParen)?;
        Ok(test)
    }

    fn parse_body_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.parse_stmt(StmtOpts {
            lexical_decl: LexicalDecl::Forbid,
            ..StmtOpts::default()
        })
    }

    fn parse_if_stmt(&mut self, start: u32) -> Result<Stmt, ParseError> {
        self.next()?;
        let test = self.parse_paren_test()?;
        let if_opts = StmtOpts {
            lexical_decl: LexicalDecl::AllowFnInsideIf,
            ..StmtOpts::default()
        };
        let consequent = Box::new(self.parse_stmt(if_opts)?);
        let alternate = if self.eat(TokenKind::Else)? {
            Some(Box::new(self.parse_stmt(if_opts)?))
        } else {
            None
        };
        Ok(Stmt::new(
            StmtKind::If {
                test,
                consequent,
                alternate,
            },
            self.span_from(start),
        ))
    }

    fn parse_switch_stmt(&mut self, start: u32) -> Result<Stmt, ParseError> {
        self.next()?;
        let discriminant = self.parse_paren_test()?;
        self.expect(TokenKind::LBrace)?;
        let scope = self.push_scope(ScopeKind::Block);

        let mut cases = Vec::new();
        let mut found_default = false;
        while !self.check(TokenKind::RBrace) {
            let case_start = self.lexer.loc();
            let test = if self.eat(TokenKind::Default)? {
                if found_default {
                    self.add_error(
                        Span::new(case_start, self.prev_end),
                        "Multiple default clauses are not allowed",
                    );
                }
                found_default = true;
                None
            } else {
                self.expect(TokenKind::Case)?;
                Some(self.parse_expr(Level::Lowest)?)
            };
            self.expect(TokenKind::Colon)?;

            let mut consequent = Vec::new();
            while !matches!(
                self.lexer.kind(),
                TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof
            ) {
                let stmt = self.parse_stmt(StmtOpts::default())?;
                if !(self.options.typescript && stmt.is_typescript()) {
                    consequent.push(stmt);
                }
            }
            cases.push(SwitchCase {
                test,
                consequent,
                span: self.span_from(case_start),
            });
        }
        self.expect(TokenKind::RBrace)?;
        self.pop_scope();

        Ok(Stmt::new(
            StmtKind::Switch {
                discriminant,
                cases,
                scope,
            },
            self.span_from(start),
        ))
    }

    fn parse_for_stmt(&mut self, start: u32) -> Result<Stmt, ParseError> {
        self.next()?;
        let is_await = if self.lexer.is_contextual_keyword("await") {
            if !self.fn_ctx.allow_await {
                self.add_error(self.lexer.span(), "Cannot use \"await\" outside an async function");
            }
            self.next()?;
            true
        } else {
            false
        };
        self.expect(TokenKind::LParen)?;
        let scope = self.push_scope(ScopeKind::Block);

        // The initializer must not treat `in` as an operator
        let old_allow_in = std::mem::replace(&mut self.allow_in, false);
        let decl_kind = match self.lexer.kind() {
            TokenKind::Var => Some((VarKind::Var, SymbolKind::Hoisted)),
            TokenKind::Const => Some((VarKind::Const, SymbolKind::Const)),
            TokenKind::Identifier if self.lexer.is_contextual_keyword("let") => {
                let next = self.peek_token();
                matches!(
                    next.kind,
                    TokenKind::Identifier | TokenKind::LBracket | TokenKind::LBrace
                )
                .then_some((VarKind::Let, SymbolKind::Other))
            }
            _ => None,
        };
        let init = if self.check(TokenKind::Semicolon) {
            None
        } else if let Some((kind, symbol_kind)) = decl_kind {
            self.next()?;
            let decls = self.parse_and_declare_decls(symbol_kind, StmtOpts::default())?;
            Some(ForInit::Var(VarDecl {
                kind,
                decls,
                was_import_equals: false,
            }))
        } else {
            Some(ForInit::Expr(self.parse_expr(Level::Lowest)?))
        };
        self.allow_in = old_allow_in;

        // for (x of y) / for (x in y)
        if let Some(left) = init {
            if self.lexer.is_contextual_keyword("of") {
                self.next()?;
                let right = self.parse_expr(Level::Comma)?;
                self.expect(TokenKind::RParen)?;
                let body = Box::new(self.parse_body_stmt()?);
                self.pop_scope();
                return Ok(Stmt::new(
                    StmtKind::ForOf {
                        left,
                        right,
                        body,
                        is_await,
                        scope,
                    },
                    self.span_from(start),
                ));
            }
            if self.eat(TokenKind::In)? {
                let right = self.parse_expr(Level::Lowest)?;
                self.expect(TokenKind::RParen)?;
                let body = Box::new(self.parse_body_stmt()?);
                self.pop_scope();
                return Ok(Stmt::new(
                    StmtKind::ForIn {
                        left,
                        right,
                        body,
                        scope,
                    },
                    self.span_from(start),
                ));
            }
            return self.finish_for_stmt(start, Some(left), scope);
        }
        self.finish_for_stmt(start, None, scope)
    }

    fn finish_for_stmt(
        &mut self,
        start: u32,
        init: Option<ForInit>,
        scope: ScopeId,
    ) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Semicolon)?;
        let test = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr(Level::Lowest)?)
        };
        self.expect(TokenKind::Semicolon)?;
        let update = if self.check(TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expr(Level::Lowest)?)
        };
        self.expect(TokenKind::RParen)?;
        let body = Box::new(self.parse_body_stmt()?);
        self.pop_scope();
        Ok(Stmt::new(
            StmtKind::For {
                init,
                test,
                update,
                body,
                scope,
            },
            self.span_from(start),
        ))
    }

    fn parse_while_stmt(&mut self, start: u32) -> Result<Stmt, ParseError> {
        self.next()?;
        let test = self.parse_paren_test()?;
        let body = Box::new(self.parse_body_stmt()?);
        Ok(Stmt::new(StmtKind::While { test, body }, self.span_from(start)))
    }

    fn parse_do_while_stmt(&mut self, start: u32) -> Result<Stmt, ParseError> {
        self.next()?;
        let body = Box::new(self.parse_body_stmt()?);
        self.expect(TokenKind::While)?;
        let test = self.parse_paren_test()?;
        // A semicolon is always inserted after "do-while"
        self.eat(TokenKind::Semicolon)?;
        Ok(Stmt::new(StmtKind::DoWhile { body, test }, self.span_from(start)))
    }

    fn parse_jump_stmt(&mut self, start: u32) -> Result<Stmt, ParseError> {
        let is_break = self.check(TokenKind::Break);
        self.next()?;
        let label = if self.check(TokenKind::Identifier) && !self.lexer.has_newline_before() {
            Some(self.expect_identifier()?.0)
        } else {
            None
        };
        self.expect_semicolon()?;
        let kind = if is_break {
            StmtKind::Break { label }
        } else {
            StmtKind::Continue { label }
        };
        Ok(Stmt::new(kind, self.span_from(start)))
    }

    fn parse_return_stmt(&mut self, start: u32) -> Result<Stmt, ParseError> {
        let span = self.lexer.span();
        self.next()?;
        if !self.fn_ctx.allow_return {
            self.add_error(span, "A return statement cannot be used here:");
        }
        let arg = if matches!(
            self.lexer.kind(),
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
        ) || self.lexer.has_newline_before()
        {
            None
        } else {
            Some(self.parse_expr(Level::Lowest)?)
        };
        self.expect_semicolon()?;
        Ok(Stmt::new(StmtKind::Return { arg }, self.span_from(start)))
    }

    fn parse_throw_stmt(&mut self, start: u32) -> Result<Stmt, ParseError> {
        self.next()?;
        if self.lexer.has_newline_before() {
            return Err(ParseError::new(
                "Unexpected newline after \"throw\"",
                Span::new(start, self.lexer.loc()),
            ));
        }
        let arg = self.parse_expr(Level::Lowest)?;
        self.expect_semicolon()?;
        Ok(Stmt::new(StmtKind::Throw { arg }, self.span_from(start)))
    }

    fn parse_try_stmt(&mut self, start: u32) -> Result<Stmt, ParseError> {
        self.next()?;
        let block = self.parse_block()?;

        let handler = if self.check(TokenKind::Catch) {
            let catch_start = self.lexer.loc();
            self.next()?;
            let scope = self.push_scope(ScopeKind::CatchBinding);
            let param = if self.eat(TokenKind::LParen)? {
                let mut binding = self.parse_binding()?;
                if self.options.typescript && self.eat(TokenKind::Colon)? {
                    self.skip_type_script_type(Level::Lowest)?;
                }
                self.expect(TokenKind::RParen)?;
                let kind = match binding.kind {
                    BindingKind::Ident(_) => SymbolKind::CatchIdentifier,
                    _ => SymbolKind::Other,
                };
                self.declare_binding(kind, &mut binding, StmtOpts::default());
                Some(binding)
            } else {
                None
            };
            let body = self.parse_block()?;
            self.pop_scope();
            Some(CatchClause {
                param,
                body,
                scope,
                span: self.span_from(catch_start),
            })
        } else {
            None
        };

        let finalizer = if self.eat(TokenKind::Finally)? {
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.lexer.expected("finally"));
        }
        Ok(Stmt::new(
            StmtKind::Try {
                block,
                handler,
                finalizer,
            },
            self.span_from(start),
        ))
    }

    fn parse_with_stmt(&mut self, start: u32) -> Result<Stmt, ParseError> {
        self.next()?;
        let object = self.parse_paren_test()?;
        let scope = self.push_scope(ScopeKind::With);
        let body = Box::new(self.parse_body_stmt()?);
        self.pop_scope();
        Ok(Stmt::new(
            StmtKind::With {
                object,
                body,
                scope,
            },
            self.span_from(start),
        ))
    }

    // =========================================================================
    // Modules
    // =========================================================================

    fn parse_import_stmt(&mut self, start: u32, opts: StmtOpts) -> Result<Stmt, ParseError> {
        // "import(...)" and "import.meta" are expressions
        if matches!(self.peek_token().kind, TokenKind::LParen | TokenKind::Dot) {
            return self.parse_expr_stmt(start);
        }
        let import_span = self.lexer.span();
        self.next()?;

        if !opts.is_module_scope && !opts.is_namespace_scope {
            return Err(ParseError::new("Unexpected \"import\"", import_span));
        }

        // "import type X from 'y'", "import type { X } from 'y'"
        if self.options.typescript && self.lexer.is_contextual_keyword("type") {
            let next = self.peek_token();
            let next_text = self.lexer.text(next.span);
            let is_type_only = match next.kind {
                TokenKind::LBrace | TokenKind::Star => true,
                TokenKind::Identifier => next_text != "from",
                _ => false,
            };
            if is_type_only {
                self.next()?;
                if self.check(TokenKind::Identifier) && self.peek_token().kind == TokenKind::Eq {
                    // "import type A = require('b')"
                    let (name, span) = self.expect_identifier()?;
                    let type_opts = StmtOpts {
                        is_typescript_declare: true,
                        ..opts
                    };
                    self.parse_import_equals_stmt(start, name, span, type_opts)?;
                } else {
                    self.parse_import_clause(start, false)?;
                }
                return Ok(Stmt::typescript(self.span_from(start)));
            }
        }

        if self.options.typescript && self.check(TokenKind::Identifier) {
            let next = self.peek_token();
            if next.kind == TokenKind::Eq {
                let (name, span) = self.expect_identifier()?;
                return self.parse_import_equals_stmt(start, name, span, opts);
            }
        }

        if opts.is_namespace_scope {
            return Err(ParseError::new("Unexpected \"import\"", import_span));
        }
        let decl = self.parse_import_clause(start, true)?;
        Ok(Stmt::new(
            StmtKind::Import(Box::new(decl)),
            self.span_from(start),
        ))
    }

    /// Parse everything after `import` (and `type`), declaring the imported
    /// names when `declare` is set.
    fn parse_import_clause(&mut self, start: u32, declare: bool) -> Result<ImportDecl, ParseError> {
        let mut decl = ImportDecl {
            default: None,
            namespace: None,
            named: Vec::new(),
            has_clause: false,
            source: String::new(),
            attributes: None,
            span: Span::at(start),
        };

        if !self.check(TokenKind::String) {
            decl.has_clause = true;
            if self.check(TokenKind::Identifier) {
                let (name, span) = self.expect_identifier()?;
                decl.default = Some(self.import_binding(name, span, declare));
                if !self.eat(TokenKind::Comma)? {
                    return self.finish_import_clause(decl, start);
                }
            }

            if self.eat(TokenKind::Star)? {
                self.expect_contextual_keyword("as")?;
                let (name, span) = self.expect_identifier()?;
                decl.namespace = Some(self.import_binding(name, span, declare));
            } else if self.eat(TokenKind::LBrace)? {
                while !self.check(TokenKind::RBrace) {
                    let is_type_only = self.options.typescript && self.is_inline_type_specifier();
                    if is_type_only {
                        self.next()?;
                    }
                    let (imported, imported_span) = if self.check(TokenKind::String) {
                        let span = self.lexer.span();
                        (self.expect_string()?, span)
                    } else {
                        self.expect_identifier_or_keyword()?
                    };
                    let (local, local_span) = if self.lexer.is_contextual_keyword("as") {
                        self.next()?;
                        self.expect_identifier()?
                    } else {
                        (imported.clone(), imported_span)
                    };
                    if !is_type_only {
                        let local = self.import_binding(local, local_span, declare);
                        decl.named.push(ImportSpecifier { imported, local });
                    }
                    if !self.eat(TokenKind::Comma)? {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace)?;
            } else if decl.default.is_none() {
                return Err(self.lexer.unexpected());
            }
        }

        self.finish_import_clause(decl, start)
    }

    fn finish_import_clause(&mut self, mut decl: ImportDecl, start: u32) -> Result<ImportDecl, ParseError> {
        if decl.has_clause {
            self.expect_contextual_keyword("from")?;
        }
        decl.source = self.expect_string()?;
        decl.attributes = self.parse_import_attributes()?;
        self.expect_semicolon()?;
        decl.span = self.span_from(start);
        Ok(decl)
    }

    /// `with { type: "json" }` or the older `assert { ... }`.
    fn parse_import_attributes(&mut self) -> Result<Option<Expr>, ParseError> {
        let is_attributes = self.check(TokenKind::With)
            || (self.lexer.is_contextual_keyword("assert") && !self.lexer.has_newline_before());
        if !is_attributes {
            return Ok(None);
        }
        self.next()?;
        if !self.check(TokenKind::LBrace) {
            return Err(self.lexer.expected("{"));
        }
        Ok(Some(self.parse_expr(Level::Comma)?))
    }

    /// `{ type X }` inside an import or export list.
    fn is_inline_type_specifier(&mut self) -> bool {
        if !self.lexer.is_contextual_keyword("type") {
            return false;
        }
        let next = self.peek_token();
        let text = self.lexer.text(next.span);
        (next.kind == TokenKind::Identifier && text != "as")
            || next.kind.is_keyword()
            || next.kind == TokenKind::String
    }

    fn expect_contextual_keyword(&mut self, word: &str) -> Result<(), ParseError> {
        if !self.lexer.is_contextual_keyword(word) {
            return Err(self.lexer.expected(word));
        }
        self.next()
    }

    fn import_binding(&mut self, name: String, span: Span, declare: bool) -> BindingIdent {
        let symbol = if declare {
            self.declare_symbol(SymbolKind::Import, span, &name)
        } else {
            Ref::INVALID
        };
        BindingIdent { name, symbol, span }
    }

    fn parse_export_stmt(&mut self, start: u32, opts: StmtOpts) -> Result<Stmt, ParseError> {
        let export_span = self.lexer.span();
        self.next()?;
        if !opts.is_module_scope && !(opts.is_namespace_scope || opts.is_typescript_declare) {
            return Err(ParseError::new("Unexpected \"export\"", export_span));
        }

        match self.lexer.kind() {
            TokenKind::Default => {
                if !opts.is_module_scope {
                    return Err(self.lexer.unexpected());
                }
                self.parse_export_default(start, opts)
            }

            // "export * from 'x'", "export * as ns from 'x'"
            TokenKind::Star => {
                self.next()?;
                let exported = if self.lexer.is_contextual_keyword("as") {
                    self.next()?;
                    if self.check(TokenKind::String) {
                        Some(self.expect_string()?)
                    } else {
                        Some(self.expect_identifier_or_keyword()?.0)
                    }
                } else {
                    None
                };
                self.expect_contextual_keyword("from")?;
                let source = self.expect_string()?;
                self.parse_import_attributes()?;
                self.expect_semicolon()?;
                Ok(self.export_stmt(ExportDecl::All { exported, source }, start))
            }

            TokenKind::LBrace => {
                let (specifiers, source) = self.parse_export_clause()?;
                Ok(self.export_stmt(ExportDecl::Named { specifiers, source }, start))
            }

            // "export = value" is CommonJS `module.exports = value`
            TokenKind::Eq if self.options.typescript => {
                self.next()?;
                let value = self.parse_expr(Level::Lowest)?;
                self.expect_semicolon()?;
                let span = self.span_from(start);
                let target = Expr::dot(Expr::ident("module", span), "exports", span);
                Ok(Stmt::expr(Expr::assign(target, value)))
            }

            // "export import A = B.C"
            TokenKind::Import if self.options.typescript => {
                self.next()?;
                let (name, span) = self.expect_identifier()?;
                let stmt = self.parse_import_equals_stmt(
                    start,
                    name,
                    span,
                    StmtOpts {
                        is_export: true,
                        ..opts
                    },
                )?;
                if stmt.is_typescript() {
                    return Ok(stmt);
                }
                Ok(self.export_stmt(ExportDecl::Decl { decl: stmt }, start))
            }

            TokenKind::Identifier if self.options.typescript => {
                // "export as namespace ns;"
                if self.lexer.is_contextual_keyword("as") {
                    self.next()?;
                    self.expect_contextual_keyword("namespace")?;
                    self.expect_identifier()?;
                    self.expect_semicolon()?;
                    return Ok(Stmt::typescript(self.span_from(start)));
                }
                // "export type { T }", "export type * from 'x'"
                if self.lexer.is_contextual_keyword("type")
                    && matches!(self.peek_token().kind, TokenKind::LBrace | TokenKind::Star)
                {
                    self.next()?;
                    if self.eat(TokenKind::Star)? {
                        if self.lexer.is_contextual_keyword("as") {
                            self.next()?;
                            self.expect_identifier_or_keyword()?;
                        }
                        self.expect_contextual_keyword("from")?;
                        self.expect_string()?;
                        self.expect_semicolon()?;
                    } else {
                        self.parse_export_clause()?;
                    }
                    return Ok(Stmt::typescript(self.span_from(start)));
                }
                self.parse_export_decl(start, opts)
            }

            _ => self.parse_export_decl(start, opts),
        }
    }

    fn parse_export_decl(&mut self, start: u32, opts: StmtOpts) -> Result<Stmt, ParseError> {
        let stmt = self.parse_stmt(StmtOpts {
            is_export: true,
            lexical_decl: LexicalDecl::AllowAll,
            ..opts
        })?;
        match stmt.kind {
            StmtKind::TypeScript { .. } => Ok(stmt),
            StmtKind::Var(_)
            | StmtKind::Function(_)
            | StmtKind::Class(_)
            | StmtKind::Enum(_)
            | StmtKind::Namespace(_) => Ok(self.export_stmt(ExportDecl::Decl { decl: stmt }, start)),
            _ => Err(ParseError::new("Unexpected \"export\"", Span::new(start, start + 6))),
        }
    }

    fn export_stmt(&self, decl: ExportDecl, start: u32) -> Stmt {
        Stmt::new(StmtKind::Export(Box::new(decl)), self.span_from(start))
    }

    /// `{ a, b as c } [from "x"]`
    fn parse_export_clause(&mut self) -> Result<(Vec<ExportSpecifier>, Option<String>), ParseError> {
        self.expect(TokenKind::LBrace)?;
        let mut specifiers = Vec::new();
        while !self.check(TokenKind::RBrace) {
            let is_type_only = self.options.typescript && self.is_inline_type_specifier();
            if is_type_only {
                self.next()?;
            }
            let spec_start = self.lexer.loc();
            let local = if self.check(TokenKind::String) {
                self.expect_string()?
            } else {
                self.expect_identifier_or_keyword()?.0
            };
            let exported = if self.lexer.is_contextual_keyword("as") {
                self.next()?;
                if self.check(TokenKind::String) {
                    self.expect_string()?
                } else {
                    self.expect_identifier_or_keyword()?.0
                }
            } else {
                local.clone()
            };
            if !is_type_only {
                specifiers.push(ExportSpecifier {
                    local,
                    exported,
                    span: self.span_from(spec_start),
                });
            }
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;

        let source = if self.lexer.is_contextual_keyword("from") {
            self.next()?;
            let source = self.expect_string()?;
            self.parse_import_attributes()?;
            Some(source)
        } else {
            None
        };
        self.expect_semicolon()?;
        Ok((specifiers, source))
    }

    fn parse_export_default(&mut self, start: u32, opts: StmtOpts) -> Result<Stmt, ParseError> {
        self.next()?;
        let decl_opts = StmtOpts {
            is_name_optional: true,
            is_module_scope: opts.is_module_scope,
            ..StmtOpts::default()
        };
        let decl_start = self.lexer.loc();

        let stmt = match self.lexer.kind() {
            TokenKind::Function => {
                self.next()?;
                Some(self.parse_fn_stmt(decl_start, decl_opts, false)?)
            }
            TokenKind::Class => Some(self.parse_class_stmt(decl_start, decl_opts)?),
            TokenKind::Identifier if self.lexer.is_contextual_keyword("async") => {
                let next = self.peek_token();
                if next.kind == TokenKind::Function && !next.has_newline_before {
                    self.next()?;
                    self.next()?;
                    Some(self.parse_fn_stmt(decl_start, decl_opts, true)?)
                } else {
                    None
                }
            }
            TokenKind::Identifier
                if self.options.typescript
                    && (self.lexer.is_contextual_keyword("abstract")
                        || self.lexer.is_contextual_keyword("interface")) =>
            {
                let next = self.peek_token();
                if self.lexer.is_contextual_keyword("abstract") && next.kind == TokenKind::Class {
                    self.next()?;
                    Some(self.parse_class_stmt(decl_start, decl_opts)?)
                } else if self.lexer.is_contextual_keyword("interface")
                    && next.kind == TokenKind::Identifier
                {
                    self.next()?;
                    self.skip_type_script_interface_stmt(decl_opts)?;
                    Some(Stmt::typescript(self.span_from(decl_start)))
                } else {
                    None
                }
            }
            _ => None,
        };

        let expr = match stmt.map(|s| s.kind) {
            Some(StmtKind::Function(func)) => {
                let span = func.span;
                Expr::new(ExprKind::Function(func), span)
            }
            Some(StmtKind::Class(class)) => {
                let span = class.span;
                Expr::new(ExprKind::Class(class), span)
            }
            Some(_) => return Ok(Stmt::typescript(self.span_from(start))),
            None => {
                let expr = self.parse_expr(Level::Comma)?;
                self.expect_semicolon()?;
                expr
            }
        };
        Ok(self.export_stmt(ExportDecl::Default { expr }, start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolKind;

    fn parse(source: &str) -> (Option<Ast>, Log) {
        Parser::new(source, ParserOptions::default()).parse()
    }

    fn parse_ok(source: &str) -> Ast {
        let (ast, log) = parse(source);
        assert!(log.is_empty(), "unexpected diagnostics for {source:?}: {log:?}");
        ast.expect("parse failed")
    }

    fn module_symbol(ast: &Ast, name: &str) -> Ref {
        ast.scopes.get(ast.module_scope).members[name].symbol
    }

    #[test]
    fn test_variable_declaration() {
        let ast = parse_ok("let x = 1;");
        assert_eq!(ast.stmts.len(), 1);
        let x = module_symbol(&ast, "x");
        assert_eq!(ast.symbols.get(x).kind, SymbolKind::Other);
    }

    #[test]
    fn test_function_declaration() {
        let ast = parse_ok("function foo(a, b) { return a + b; }");
        let StmtKind::Function(func) = &ast.stmts[0].kind else {
            panic!("expected function");
        };
        assert_eq!(func.params.len(), 2);
        let a = ast.scopes.get(func.args_scope).members["a"].symbol;
        assert_eq!(ast.symbols.get(a).kind, SymbolKind::Hoisted);
    }

    #[test]
    fn test_var_is_hoisted_out_of_blocks() {
        let ast = parse_ok("{ var x = 1; } x;");
        assert!(ast.scopes.get(ast.module_scope).members.contains_key("x"));
    }

    #[test]
    fn test_let_conflict_is_reported() {
        let (ast, log) = parse("let a; let a;");
        assert!(ast.is_some());
        assert_eq!(log.errors().count(), 1);
        let error = log.errors().next().unwrap();
        assert_eq!(error.text, "The symbol \"a\" has already been declared");
        assert_eq!(error.notes.len(), 1);
    }

    #[test]
    fn test_overloads_declare_once() {
        let ast = parse_ok("function f(): void; function f(x?: number) {}");
        assert_eq!(ast.stmts.len(), 1);
    }

    #[test]
    fn test_class_declaration() {
        let ast = parse_ok("class Foo { constructor() {} bar() {} static x = 1; #y; }");
        let StmtKind::Class(class) = &ast.stmts[0].kind else {
            panic!("expected class");
        };
        assert_eq!(class.body.len(), 4);
    }

    #[test]
    fn test_class_type_members_are_dropped() {
        let ast = parse_ok(
            "abstract class A<T> implements B { [key: string]: any; abstract f(): void; declare x: number; g(): void; g() {} }",
        );
        let StmtKind::Class(class) = &ast.stmts[0].kind else {
            panic!("expected class");
        };
        assert_eq!(class.body.len(), 1);
    }

    #[test]
    fn test_parameter_properties() {
        let ast = parse_ok("class A { constructor(public x: number, y) {} }");
        let StmtKind::Class(class) = &ast.stmts[0].kind else {
            panic!("expected class");
        };
        let ClassMemberKind::Method { value, kind, .. } = &class.body[0].kind else {
            panic!("expected constructor");
        };
        assert_eq!(*kind, MethodKind::Constructor);
        assert!(value.params[0].is_parameter_property);
        assert!(!value.params[1].is_parameter_property);
    }

    #[test]
    fn test_declare_class_member_errors() {
        let (_, log) = parse("declare class A { #x; m() {} }");
        let kinds: Vec<_> = log.errors().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::AmbientClass(AmbientClassError::PrivateIdentifier),
                DiagnosticKind::AmbientClass(AmbientClassError::MemberBody),
            ]
        );

        let (_, log) = parse("class A { declare [key: string]: any }");
        assert_eq!(
            log.errors().next().map(|d| d.kind),
            Some(DiagnosticKind::AmbientClass(AmbientClassError::IndexSignature))
        );
    }

    #[test]
    fn test_imports_and_exports() {
        let ast = parse_ok(
            "import a, { b as c, type D } from 'x'; import type { E } from 'y'; export { a }; export default c;",
        );
        assert_eq!(ast.stmts.len(), 3);
        let StmtKind::Import(import) = &ast.stmts[0].kind else {
            panic!("expected import");
        };
        assert_eq!(import.named.len(), 1);
        assert_eq!(import.named[0].local.name, "c");
    }

    #[test]
    fn test_fatal_error_returns_no_ast() {
        let (ast, log) = parse("let = ;");
        assert!(ast.is_none());
        assert_eq!(log.errors().count(), 1);
    }

    #[test]
    fn test_for_loops() {
        parse_ok("for (let i = 0; i < 10; i++) {} for (const k in o) {} for (const v of a) {}");
        parse_ok("for (var x = ('a' in o); ;) break;");
    }

    #[test]
    fn test_labels_and_asi() {
        let ast = parse_ok("outer: for (;;) { break outer }\nlet a = 1\nlet b = 2");
        assert_eq!(ast.stmts.len(), 3);
    }
}
