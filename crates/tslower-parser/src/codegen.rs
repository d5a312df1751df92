//! JavaScript code generator.
//!
//! Prints a lowered AST back to JavaScript. Parentheses are derived from
//! operator precedence rather than remembered from the source, so
//! `a<b>c` comes back as `a < b > c` and erased type arguments leave no
//! trace. With `minify` set, optional whitespace and the semicolon before a
//! closing brace are dropped.

use crate::ast::*;
use crate::options::CodegenOptions;
use crate::typescript::is_identifier_name;

/// Binding power of an expression position, lowest first.
mod prec {
    pub const LOWEST: u8 = 0;
    pub const COMMA: u8 = 1;
    pub const YIELD: u8 = 3;
    pub const ASSIGN: u8 = 4;
    pub const CONDITIONAL: u8 = 5;
    pub const NULLISH: u8 = 6;
    pub const LOGICAL_OR: u8 = 7;
    pub const LOGICAL_AND: u8 = 8;
    pub const BITWISE_OR: u8 = 9;
    pub const BITWISE_XOR: u8 = 10;
    pub const BITWISE_AND: u8 = 11;
    pub const EQUALS: u8 = 12;
    pub const COMPARE: u8 = 13;
    pub const SHIFT: u8 = 14;
    pub const ADD: u8 = 15;
    pub const MULTIPLY: u8 = 16;
    pub const EXPONENT: u8 = 17;
    pub const PREFIX: u8 = 18;
    pub const POSTFIX: u8 = 19;
    pub const CALL: u8 = 21;
    pub const MEMBER: u8 = 22;
}

/// The code generator.
pub struct Codegen<'a> {
    ast: &'a Ast,
    options: CodegenOptions,
    output: String,
    indent_level: usize,
    /// Insert a space if the next token starts with an identifier character.
    needs_space: bool,
    /// A `;` owed to the previous statement (minify only).
    needs_semicolon: bool,
    /// Output offset where the current expression statement begins. An
    /// object, function or class printed here needs parentheses.
    stmt_start: Option<usize>,
    /// Output offset where a concise arrow body begins.
    arrow_body_start: Option<usize>,
}

impl<'a> Codegen<'a> {
    pub fn new(ast: &'a Ast, options: CodegenOptions) -> Self {
        Self {
            ast,
            options,
            output: String::new(),
            indent_level: 0,
            needs_space: false,
            needs_semicolon: false,
            stmt_start: None,
            arrow_body_start: None,
        }
    }

    /// Generate JavaScript source code.
    pub fn generate(mut self) -> String {
        for stmt in &self.ast.stmts {
            if is_removed(stmt) {
                continue;
            }
            self.emit_stmt(stmt);
            if !self.options.minify {
                self.output.push('\n');
            }
        }
        self.output
    }

    // =========================================================================
    // Output Helpers
    // =========================================================================

    fn emit(&mut self, s: &str) {
        self.flush_semicolon();
        let Some(first) = s.chars().next() else {
            return;
        };
        if self.needs_space {
            if first.is_alphanumeric() || matches!(first, '_' | '$' | '\\' | '#') {
                self.output.push(' ');
            }
            self.needs_space = false;
        }
        // "a - -b", "a + +b" and "a / /re/" must not fuse into one token
        if matches!(first, '+' | '-' | '/') && self.output.ends_with(first) {
            self.output.push(' ');
        }
        self.output.push_str(s);
    }

    fn flush_semicolon(&mut self) {
        if self.needs_semicolon {
            self.output.push(';');
            self.needs_semicolon = false;
        }
    }

    /// Optional whitespace.
    fn emit_space(&mut self) {
        if !self.options.minify {
            self.output.push(' ');
        }
    }

    /// Whitespace that separates a keyword from whatever follows it.
    fn emit_keyword_gap(&mut self) {
        if self.options.minify {
            self.needs_space = true;
        } else {
            self.output.push(' ');
        }
    }

    fn emit_newline(&mut self) {
        if self.options.minify {
            return;
        }
        self.output.push('\n');
        for _ in 0..self.indent_level {
            self.output.push_str(&self.options.indent);
        }
    }

    fn emit_semicolon(&mut self) {
        if self.options.minify {
            self.needs_semicolon = true;
        } else {
            self.output.push(';');
        }
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    fn emit_comma(&mut self) {
        self.emit(",");
        self.emit_space();
    }

    // =========================================================================
    // Statement Emission
    // =========================================================================

    fn emit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Var(var) => {
                self.emit_var_decl(var);
                self.emit_semicolon();
            }
            StmtKind::Function(func) => self.emit_function(func),
            StmtKind::Class(class) => self.emit_class(class),
            StmtKind::Block(block) => self.emit_block(&block.stmts),
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => self.emit_if(test, consequent, alternate.as_deref()),
            StmtKind::Switch {
                discriminant, cases, ..
            } => {
                self.emit("switch");
                self.emit_space();
                self.emit("(");
                self.emit_expr(discriminant);
                self.emit(")");
                self.emit_space();
                self.emit("{");
                self.indent();
                for case in cases {
                    self.emit_newline();
                    if let Some(test) = &case.test {
                        self.emit("case");
                        self.emit_keyword_gap();
                        self.emit_expr(test);
                        self.emit(":");
                    } else {
                        self.emit("default:");
                    }
                    self.indent();
                    for stmt in case.consequent.iter().filter(|stmt| !is_removed(stmt)) {
                        self.emit_newline();
                        self.emit_stmt(stmt);
                    }
                    self.dedent();
                }
                self.dedent();
                self.emit_newline();
                self.close_brace();
            }
            StmtKind::For {
                init,
                test,
                update,
                body,
                ..
            } => {
                self.emit("for");
                self.emit_space();
                self.emit("(");
                if let Some(init) = init {
                    self.emit_for_init(init);
                }
                self.emit(";");
                if let Some(test) = test {
                    self.emit_space();
                    self.emit_expr(test);
                }
                self.emit(";");
                if let Some(update) = update {
                    self.emit_space();
                    self.emit_expr(update);
                }
                self.emit(")");
                self.emit_body(body);
            }
            StmtKind::ForIn { left, right, body, .. } => {
                self.emit("for");
                self.emit_space();
                self.emit("(");
                self.emit_for_init(left);
                self.emit(" in ");
                self.emit_expr(right);
                self.emit(")");
                self.emit_body(body);
            }
            StmtKind::ForOf {
                left,
                right,
                body,
                is_await,
                ..
            } => {
                self.emit("for");
                if *is_await {
                    self.emit(" await");
                }
                self.emit_space();
                self.emit("(");
                self.emit_for_init(left);
                self.emit(" of ");
                self.emit_expr_with_prec(right, prec::COMMA + 1);
                self.emit(")");
                self.emit_body(body);
            }
            StmtKind::While { test, body } => {
                self.emit("while");
                self.emit_space();
                self.emit("(");
                self.emit_expr(test);
                self.emit(")");
                self.emit_body(body);
            }
            StmtKind::DoWhile { body, test } => {
                self.emit("do");
                self.emit_body(body);
                self.emit_space();
                self.emit("while");
                self.emit_space();
                self.emit("(");
                self.emit_expr(test);
                self.emit(")");
                self.emit_semicolon();
            }
            StmtKind::Break { label } => {
                self.emit("break");
                if let Some(label) = label {
                    self.emit(" ");
                    self.emit(label);
                }
                self.emit_semicolon();
            }
            StmtKind::Continue { label } => {
                self.emit("continue");
                if let Some(label) = label {
                    self.emit(" ");
                    self.emit(label);
                }
                self.emit_semicolon();
            }
            StmtKind::Return { arg } => {
                self.emit("return");
                if let Some(arg) = arg {
                    self.emit_keyword_gap();
                    self.emit_expr(arg);
                }
                self.emit_semicolon();
            }
            StmtKind::Throw { arg } => {
                self.emit("throw");
                self.emit_keyword_gap();
                self.emit_expr(arg);
                self.emit_semicolon();
            }
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                self.emit("try");
                self.emit_space();
                self.emit_block(&block.stmts);
                if let Some(catch) = handler {
                    self.emit_space();
                    self.emit("catch");
                    if let Some(param) = &catch.param {
                        self.emit_space();
                        self.emit("(");
                        self.emit_binding(param);
                        self.emit(")");
                    }
                    self.emit_space();
                    self.emit_block(&catch.body.stmts);
                }
                if let Some(finally) = finalizer {
                    self.emit_space();
                    self.emit("finally");
                    self.emit_space();
                    self.emit_block(&finally.stmts);
                }
            }
            StmtKind::Labeled { label, body } => {
                self.emit(label);
                self.emit(":");
                self.emit_body(body);
            }
            StmtKind::Expr(expr) => self.emit_expr_stmt(expr),
            StmtKind::Empty => self.emit(";"),
            StmtKind::Debugger => {
                self.emit("debugger");
                self.emit_semicolon();
            }
            StmtKind::With { object, body, .. } => {
                self.emit("with");
                self.emit_space();
                self.emit("(");
                self.emit_expr(object);
                self.emit(")");
                self.emit_body(body);
            }
            StmtKind::Import(decl) => self.emit_import(decl),
            StmtKind::Export(decl) => self.emit_export(decl),
            // Lowering replaces these
            StmtKind::Enum(_) | StmtKind::Namespace(_) | StmtKind::TypeScript { .. } => {}
        }
    }

    fn emit_expr_stmt(&mut self, expr: &Expr) {
        self.flush_semicolon();
        // "({ a } = b)" has to wrap the whole assignment
        let wrap_all = matches!(
            &expr.kind,
            ExprKind::Assign { left, .. } if matches!(left.kind, ExprKind::Object(_))
        );
        if wrap_all {
            self.emit("(");
            self.emit_expr(expr);
            self.emit(")");
        } else {
            let old = self.stmt_start.replace(self.output.len());
            self.emit_expr(expr);
            self.stmt_start = old;
        }
        self.emit_semicolon();
    }

    fn emit_if(&mut self, test: &Expr, consequent: &Stmt, alternate: Option<&Stmt>) {
        self.emit("if");
        self.emit_space();
        self.emit("(");
        self.emit_expr(test);
        self.emit(")");

        // "if (a) { if (b) c; } else d;" keeps its braces
        let dangling = alternate.is_some()
            && matches!(&consequent.kind, StmtKind::If { alternate: None, .. });
        if dangling {
            self.emit_space();
            self.emit_block(std::slice::from_ref(consequent));
        } else {
            self.emit_body(consequent);
        }

        if let Some(alternate) = alternate {
            if matches!(consequent.kind, StmtKind::Block(_)) || dangling {
                self.emit_space();
            } else {
                self.emit_newline();
            }
            self.emit("else");
            match &alternate.kind {
                StmtKind::If {
                    test,
                    consequent,
                    alternate,
                } => {
                    self.emit(" ");
                    self.emit_if(test, consequent, alternate.as_deref());
                }
                _ => self.emit_body(alternate),
            }
        }
    }

    /// The body of a loop, `if` or label: a block on the same line, any
    /// other statement indented on the next.
    fn emit_body(&mut self, body: &Stmt) {
        match &body.kind {
            StmtKind::Block(block) => {
                self.emit_space();
                self.emit_block(&block.stmts);
            }
            StmtKind::Empty => self.emit(";"),
            _ => {
                self.indent();
                if self.options.minify {
                    self.needs_space = true;
                } else {
                    self.emit_newline();
                }
                self.emit_stmt(body);
                self.dedent();
            }
        }
    }

    fn emit_block(&mut self, stmts: &[Stmt]) {
        self.emit("{");
        let mut printed = false;
        self.indent();
        for stmt in stmts.iter().filter(|stmt| !is_removed(stmt)) {
            self.emit_newline();
            self.emit_stmt(stmt);
            printed = true;
        }
        self.dedent();
        if printed {
            self.emit_newline();
        }
        self.close_brace();
    }

    fn close_brace(&mut self) {
        self.needs_semicolon = false;
        self.emit("}");
    }

    fn emit_var_decl(&mut self, var: &VarDecl) {
        self.emit(match var.kind {
            VarKind::Var => "var",
            VarKind::Let => "let",
            VarKind::Const => "const",
        });
        self.emit_keyword_gap();
        for (i, decl) in var.decls.iter().enumerate() {
            if i > 0 {
                self.emit_comma();
            }
            self.emit_binding(&decl.binding);
            if let Some(init) = &decl.init {
                self.emit_space();
                self.emit("=");
                self.emit_space();
                self.emit_expr_with_prec(init, prec::COMMA + 1);
            }
        }
    }

    fn emit_for_init(&mut self, init: &ForInit) {
        match init {
            ForInit::Var(var) => self.emit_var_decl(var),
            ForInit::Expr(expr) => self.emit_expr(expr),
        }
    }

    fn emit_binding(&mut self, binding: &Binding) {
        match &binding.kind {
            BindingKind::Ident(ident) => self.emit(&ident.name),
            BindingKind::Array { elements } => {
                self.emit("[");
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.emit_comma();
                    }
                    if let Some(element) = element {
                        if element.rest {
                            self.emit("...");
                        }
                        self.emit_binding(&element.binding);
                        self.emit_default(element.default.as_ref());
                    }
                }
                if matches!(elements.last(), Some(None)) {
                    self.emit(",");
                }
                self.emit("]");
            }
            BindingKind::Object { properties } => {
                if properties.is_empty() {
                    self.emit("{}");
                    return;
                }
                self.emit("{");
                self.emit_space();
                for (i, prop) in properties.iter().enumerate() {
                    if i > 0 {
                        self.emit_comma();
                    }
                    if prop.rest {
                        self.emit("...");
                        self.emit_binding(&prop.value);
                        continue;
                    }
                    let is_shorthand = match (&prop.key, &prop.value.kind) {
                        (PropertyKey::Ident(key), BindingKind::Ident(value)) => {
                            prop.shorthand && *key == value.name
                        }
                        _ => false,
                    };
                    if !is_shorthand {
                        self.emit_property_key(&prop.key);
                        self.emit(":");
                        self.emit_space();
                    }
                    self.emit_binding(&prop.value);
                    self.emit_default(prop.default.as_ref());
                }
                self.emit_space();
                self.emit("}");
            }
        }
    }

    fn emit_default(&mut self, default: Option<&Expr>) {
        if let Some(default) = default {
            self.emit_space();
            self.emit("=");
            self.emit_space();
            self.emit_expr_with_prec(default, prec::COMMA + 1);
        }
    }

    // =========================================================================
    // Functions and Classes
    // =========================================================================

    fn emit_function(&mut self, func: &Function) {
        if func.is_async {
            self.emit("async ");
        }
        self.emit("function");
        if func.is_generator {
            self.emit("*");
        }
        if let Some(name) = &func.name {
            if !func.is_generator {
                self.emit(" ");
            } else {
                self.emit_space();
            }
            self.emit(&name.name);
        }
        self.emit_params(&func.params);
        self.emit_space();
        self.emit_block(&func.body);
    }

    fn emit_arrow(&mut self, arrow: &ArrowFunction) {
        if arrow.is_async {
            self.emit("async");
            self.emit_space();
        }
        self.emit_params(&arrow.params);
        self.emit_space();
        self.emit("=>");
        self.emit_space();
        match &arrow.body {
            ArrowBody::Block(stmts) => self.emit_block(stmts),
            ArrowBody::Expr(expr) => {
                let old = self.arrow_body_start.replace(self.output.len());
                self.emit_expr_with_prec(expr, prec::COMMA + 1);
                self.arrow_body_start = old;
            }
        }
    }

    fn emit_params(&mut self, params: &[Param]) {
        self.emit("(");
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.emit_comma();
            }
            if param.rest {
                self.emit("...");
            }
            self.emit_binding(&param.binding);
            self.emit_default(param.default.as_ref());
        }
        self.emit(")");
    }

    fn emit_decorators(&mut self, decorators: &[Decorator], on_own_line: bool) {
        for decorator in decorators {
            self.emit("@");
            let is_simple = matches!(
                decorator.expr.kind,
                ExprKind::Ident(_) | ExprKind::Member { computed: false, .. } | ExprKind::Call { .. }
            );
            if is_simple {
                self.emit_expr_with_prec(&decorator.expr, prec::CALL);
            } else {
                self.emit("(");
                self.emit_expr(&decorator.expr);
                self.emit(")");
            }
            if on_own_line && !self.options.minify {
                self.emit_newline();
            } else {
                self.output.push(' ');
            }
        }
    }

    fn emit_class(&mut self, class: &Class) {
        self.emit_decorators(&class.decorators, true);
        self.emit("class");
        if let Some(name) = &class.name {
            self.emit(" ");
            self.emit(&name.name);
        }
        if let Some(super_class) = &class.super_class {
            self.emit(" extends ");
            self.emit_expr_with_prec(super_class, prec::CALL);
        }
        self.emit_space();
        self.emit("{");
        self.indent();
        for member in &class.body {
            self.emit_newline();
            self.emit_class_member(member);
        }
        self.dedent();
        if !class.body.is_empty() {
            self.emit_newline();
        }
        self.close_brace();
    }

    fn emit_class_member(&mut self, member: &ClassMember) {
        self.emit_decorators(&member.decorators, true);
        match &member.kind {
            ClassMemberKind::Method {
                key,
                value,
                kind,
                is_static,
            } => {
                if *is_static {
                    self.emit("static ");
                }
                match kind {
                    MethodKind::Get => self.emit("get "),
                    MethodKind::Set => self.emit("set "),
                    MethodKind::Method | MethodKind::Constructor => {}
                }
                self.emit_method(key, value);
            }
            ClassMemberKind::Property {
                key,
                value,
                is_static,
                is_accessor,
            } => {
                if *is_static {
                    self.emit("static ");
                }
                if *is_accessor {
                    self.emit("accessor ");
                }
                self.emit_property_key(key);
                self.emit_default(value.as_ref());
                self.emit_semicolon();
            }
            ClassMemberKind::StaticBlock(block) => {
                self.emit("static");
                self.emit_space();
                self.emit_block(&block.stmts);
            }
        }
    }

    /// `async *key(params) { body }` for object and class methods.
    fn emit_method(&mut self, key: &PropertyKey, func: &Function) {
        if func.is_async {
            self.emit("async ");
        }
        if func.is_generator {
            self.emit("*");
        }
        self.emit_property_key(key);
        self.emit_params(&func.params);
        self.emit_space();
        self.emit_block(&func.body);
    }

    // =========================================================================
    // Modules
    // =========================================================================

    fn emit_import(&mut self, decl: &ImportDecl) {
        self.emit("import");
        if decl.has_clause {
            let mut wrote_binding = false;
            if let Some(default) = &decl.default {
                self.emit(" ");
                self.emit(&default.name);
                wrote_binding = true;
            }
            if let Some(namespace) = &decl.namespace {
                if wrote_binding {
                    self.emit(",");
                }
                self.emit_space();
                self.emit("* as ");
                self.emit(&namespace.name);
                wrote_binding = true;
            }
            if !decl.named.is_empty() || !wrote_binding {
                if wrote_binding {
                    self.emit(",");
                }
                self.emit_space();
                self.emit("{");
                for (i, spec) in decl.named.iter().enumerate() {
                    self.emit(if i > 0 { "," } else { "" });
                    self.emit_space();
                    if spec.imported != spec.local.name {
                        self.emit_module_export_name(&spec.imported);
                        self.emit(" as ");
                    }
                    self.emit(&spec.local.name);
                }
                if !decl.named.is_empty() {
                    self.emit_space();
                }
                self.emit("}");
            }
            self.emit_space();
            self.emit("from");
        }
        self.emit_space();
        self.emit_string(&decl.source);
        if let Some(attributes) = &decl.attributes {
            self.emit(" with ");
            self.emit_expr(attributes);
        }
        self.emit_semicolon();
    }

    fn emit_export(&mut self, decl: &ExportDecl) {
        self.emit("export");
        match decl {
            ExportDecl::Named { specifiers, source } => {
                self.emit_space();
                self.emit("{");
                for (i, spec) in specifiers.iter().enumerate() {
                    self.emit(if i > 0 { "," } else { "" });
                    self.emit_space();
                    self.emit_module_export_name(&spec.local);
                    if spec.exported != spec.local {
                        self.emit(" as ");
                        self.emit_module_export_name(&spec.exported);
                    }
                }
                if !specifiers.is_empty() {
                    self.emit_space();
                }
                self.emit("}");
                if let Some(source) = source {
                    self.emit_space();
                    self.emit("from");
                    self.emit_space();
                    self.emit_string(source);
                }
                self.emit_semicolon();
            }
            ExportDecl::Default { expr } => {
                self.emit(" default");
                self.emit_keyword_gap();
                match &expr.kind {
                    ExprKind::Function(func) => self.emit_function(func),
                    ExprKind::Class(class) => self.emit_class(class),
                    _ => {
                        self.emit_expr_with_prec(expr, prec::COMMA + 1);
                        self.emit_semicolon();
                    }
                }
            }
            ExportDecl::Decl { decl } => {
                self.emit(" ");
                self.emit_stmt(decl);
            }
            ExportDecl::All { exported, source } => {
                self.emit_space();
                self.emit("*");
                if let Some(exported) = exported {
                    self.emit(" as ");
                    self.emit_module_export_name(exported);
                }
                self.emit_space();
                self.emit("from");
                self.emit_space();
                self.emit_string(source);
                self.emit_semicolon();
            }
        }
    }

    /// `export { "a b" as c }` allows string names.
    fn emit_module_export_name(&mut self, name: &str) {
        if is_identifier_name(name) {
            self.emit(name);
        } else {
            self.emit_string(name);
        }
    }

    // =========================================================================
    // Expression Emission
    // =========================================================================

    fn emit_expr(&mut self, expr: &Expr) {
        self.emit_expr_with_prec(expr, prec::LOWEST);
    }

    /// Whether the next character written starts an expression statement or
    /// a concise arrow body.
    fn at_ambiguous_start(&self) -> bool {
        let at = self.output.len() + usize::from(self.needs_semicolon);
        self.stmt_start == Some(at) || self.arrow_body_start == Some(at)
    }

    fn emit_args(&mut self, args: &[Expr]) {
        self.emit("(");
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.emit_comma();
            }
            self.emit_expr_with_prec(arg, prec::COMMA + 1);
        }
        self.emit(")");
    }

    fn open_paren_if(&mut self, wrap: bool) {
        if wrap {
            self.emit("(");
        }
    }

    fn close_paren_if(&mut self, wrap: bool) {
        if wrap {
            self.emit(")");
        }
    }

    fn emit_expr_with_prec(&mut self, expr: &Expr, min_prec: u8) {
        match &expr.kind {
            ExprKind::Null => self.emit("null"),
            ExprKind::Undefined => {
                let wrap = min_prec > prec::PREFIX;
                self.open_paren_if(wrap);
                self.emit("void 0");
                self.close_paren_if(wrap);
            }
            ExprKind::Bool(b) => self.emit(if *b { "true" } else { "false" }),
            ExprKind::Number(n) => {
                let wrap = n.is_sign_negative() && !n.is_nan() && min_prec > prec::PREFIX;
                self.open_paren_if(wrap);
                self.emit(&format_number(*n));
                self.close_paren_if(wrap);
            }
            ExprKind::BigInt(digits) => {
                self.emit(digits);
                self.emit("n");
            }
            ExprKind::String(s) => self.emit_string(s),
            ExprKind::Regex(raw) => self.emit(raw),
            ExprKind::Template { quasis, exprs } => {
                // Quasis hold raw source text
                self.emit("`");
                for (i, quasi) in quasis.iter().enumerate() {
                    self.output.push_str(quasi);
                    if let Some(expr) = exprs.get(i) {
                        self.output.push_str("${");
                        self.emit_expr(expr);
                        self.emit("}");
                    }
                }
                self.emit("`");
            }
            ExprKind::Ident(name) => self.emit(name),
            ExprKind::This => self.emit("this"),
            ExprKind::Super => self.emit("super"),
            ExprKind::PrivateName(name) => {
                self.emit("#");
                self.output.push_str(name);
            }
            ExprKind::MetaProperty { meta, property } => {
                self.emit(meta);
                self.emit(".");
                self.emit(property);
            }

            ExprKind::Array(elements) => {
                self.emit("[");
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.emit_comma();
                    }
                    if let Some(element) = element {
                        self.emit_expr_with_prec(element, prec::COMMA + 1);
                    }
                }
                if matches!(elements.last(), Some(None)) {
                    self.emit(",");
                }
                self.emit("]");
            }
            ExprKind::Object(properties) => {
                let wrap = self.at_ambiguous_start();
                self.open_paren_if(wrap);
                if properties.is_empty() {
                    self.emit("{}");
                } else {
                    self.emit("{");
                    self.emit_space();
                    for (i, prop) in properties.iter().enumerate() {
                        if i > 0 {
                            self.emit_comma();
                        }
                        self.emit_object_property(prop);
                    }
                    self.emit_space();
                    self.emit("}");
                }
                self.close_paren_if(wrap);
            }
            ExprKind::Function(func) => {
                let wrap = self.at_ambiguous_start();
                self.open_paren_if(wrap);
                self.emit_function(func);
                self.close_paren_if(wrap);
            }
            ExprKind::Class(class) => {
                let wrap = self.at_ambiguous_start();
                self.open_paren_if(wrap);
                self.emit_class(class);
                self.close_paren_if(wrap);
            }
            ExprKind::Arrow(arrow) => {
                let wrap = min_prec > prec::ASSIGN;
                self.open_paren_if(wrap);
                self.emit_arrow(arrow);
                self.close_paren_if(wrap);
            }

            ExprKind::Unary { op, arg } => {
                let wrap = min_prec > prec::PREFIX;
                self.open_paren_if(wrap);
                match op {
                    UnaryOp::Minus => self.emit("-"),
                    UnaryOp::Plus => self.emit("+"),
                    UnaryOp::Not => self.emit("!"),
                    UnaryOp::BitNot => self.emit("~"),
                    UnaryOp::Typeof => self.emit_word_prefix("typeof"),
                    UnaryOp::Void => self.emit_word_prefix("void"),
                    UnaryOp::Delete => self.emit_word_prefix("delete"),
                }
                self.emit_expr_with_prec(arg, prec::PREFIX);
                self.close_paren_if(wrap);
            }
            ExprKind::Update { op, prefix, arg } => {
                let op_str = match op {
                    UpdateOp::Increment => "++",
                    UpdateOp::Decrement => "--",
                };
                if *prefix {
                    let wrap = min_prec > prec::PREFIX;
                    self.open_paren_if(wrap);
                    self.emit(op_str);
                    self.emit_expr_with_prec(arg, prec::PREFIX);
                    self.close_paren_if(wrap);
                } else {
                    let wrap = min_prec > prec::POSTFIX;
                    self.open_paren_if(wrap);
                    self.emit_expr_with_prec(arg, prec::POSTFIX);
                    self.emit(op_str);
                    self.close_paren_if(wrap);
                }
            }
            ExprKind::Binary { op, left, right } => {
                let (op_prec, op_str) = binary_op_info(*op);
                let wrap = min_prec > op_prec;
                self.open_paren_if(wrap);

                let (left_prec, right_prec) = match op {
                    // "??" cannot mix with "||" or "&&" without parentheses
                    BinaryOp::NullishCoalesce => (prec::BITWISE_OR, prec::BITWISE_OR),
                    // "-a ** b" is a syntax error
                    BinaryOp::Pow => (prec::POSTFIX, op_prec),
                    _ => (op_prec, op_prec + 1),
                };
                self.emit_expr_with_prec(left, left_prec);
                if op_str.starts_with(|c: char| c.is_ascii_alphabetic()) {
                    self.emit(" ");
                    self.emit(op_str);
                    self.emit(" ");
                } else {
                    self.emit_space();
                    self.emit(op_str);
                    self.emit_space();
                }
                self.emit_expr_with_prec(right, right_prec);
                self.close_paren_if(wrap);
            }
            ExprKind::Assign { op, left, right } => {
                let wrap = min_prec > prec::ASSIGN;
                self.open_paren_if(wrap);
                self.emit_expr_with_prec(left, prec::POSTFIX);
                self.emit_space();
                self.emit(assign_op_str(*op));
                self.emit_space();
                self.emit_expr_with_prec(right, prec::ASSIGN);
                self.close_paren_if(wrap);
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let wrap = min_prec > prec::CONDITIONAL;
                self.open_paren_if(wrap);
                self.emit_expr_with_prec(test, prec::NULLISH);
                self.emit_space();
                self.emit("?");
                self.emit_space();
                self.emit_expr_with_prec(consequent, prec::YIELD);
                self.emit_space();
                self.emit(":");
                self.emit_space();
                self.emit_expr_with_prec(alternate, prec::YIELD);
                self.close_paren_if(wrap);
            }
            ExprKind::Sequence(exprs) => {
                let wrap = min_prec > prec::COMMA;
                self.open_paren_if(wrap);
                for (i, expr) in exprs.iter().enumerate() {
                    if i > 0 {
                        self.emit_comma();
                    }
                    self.emit_expr_with_prec(expr, prec::COMMA + 1);
                }
                self.close_paren_if(wrap);
            }

            ExprKind::Member {
                object,
                property,
                computed,
            } => self.emit_member(object, property, *computed, false),
            ExprKind::OptionalMember {
                object,
                property,
                computed,
            } => self.emit_member(object, property, *computed, true),
            ExprKind::Call { callee, args } => {
                let wrap = min_prec > prec::CALL;
                self.open_paren_if(wrap);
                self.emit_expr_with_prec(callee, prec::CALL);
                self.emit_args(args);
                self.close_paren_if(wrap);
            }
            ExprKind::OptionalCall { callee, args } => {
                let wrap = min_prec > prec::CALL;
                self.open_paren_if(wrap);
                self.emit_expr_with_prec(callee, prec::CALL);
                self.emit("?.");
                self.emit_args(args);
                self.close_paren_if(wrap);
            }
            ExprKind::New { callee, args } => {
                let wrap = min_prec > prec::CALL;
                self.open_paren_if(wrap);
                self.emit("new ");
                self.emit_expr_with_prec(callee, prec::MEMBER);
                self.emit_args(args);
                self.close_paren_if(wrap);
            }
            ExprKind::TaggedTemplate { tag, quasi } => {
                self.emit_expr_with_prec(tag, prec::CALL);
                self.emit_expr(quasi);
            }
            ExprKind::Import(source, options) => {
                self.emit("import(");
                self.emit_expr_with_prec(source, prec::COMMA + 1);
                if let Some(options) = options {
                    self.emit_comma();
                    self.emit_expr_with_prec(options, prec::COMMA + 1);
                }
                self.emit(")");
            }

            ExprKind::Spread(arg) => {
                self.emit("...");
                self.emit_expr_with_prec(arg, prec::COMMA + 1);
            }
            ExprKind::Yield { arg, delegate } => {
                let wrap = min_prec > prec::YIELD;
                self.open_paren_if(wrap);
                self.emit("yield");
                if *delegate {
                    self.emit("*");
                }
                if let Some(arg) = arg {
                    self.emit_keyword_gap();
                    self.emit_expr_with_prec(arg, prec::YIELD);
                }
                self.close_paren_if(wrap);
            }
            ExprKind::Await(arg) => {
                let wrap = min_prec > prec::PREFIX;
                self.open_paren_if(wrap);
                self.emit("await");
                self.emit_keyword_gap();
                self.emit_expr_with_prec(arg, prec::PREFIX);
                self.close_paren_if(wrap);
            }
        }
    }

    fn emit_word_prefix(&mut self, word: &str) {
        self.emit(word);
        self.emit_keyword_gap();
    }

    fn emit_member(&mut self, object: &Expr, property: &Expr, computed: bool, optional: bool) {
        // "1.x" would read as a malformed number
        let wrap_object = matches!(object.kind, ExprKind::Number(_));
        self.open_paren_if(wrap_object);
        self.emit_expr_with_prec(object, if wrap_object { prec::LOWEST } else { prec::CALL });
        self.close_paren_if(wrap_object);

        if optional {
            self.emit("?.");
        }
        if computed {
            self.emit("[");
            self.emit_expr(property);
            self.emit("]");
        } else {
            if !optional {
                self.emit(".");
            }
            match &property.kind {
                ExprKind::Ident(name) => self.output.push_str(name),
                _ => self.emit_expr_with_prec(property, prec::MEMBER),
            }
        }
    }

    fn emit_object_property(&mut self, prop: &Property) {
        match prop.kind {
            PropertyKind::Spread => {
                self.emit("...");
                self.emit_expr_with_prec(&prop.value, prec::COMMA + 1);
            }
            PropertyKind::Init => {
                let is_shorthand = prop.shorthand
                    && matches!((&prop.key, &prop.value.kind), (PropertyKey::Ident(k), ExprKind::Ident(v)) if k == v);
                if is_shorthand {
                    self.emit_expr(&prop.value);
                } else {
                    self.emit_property_key(&prop.key);
                    self.emit(":");
                    self.emit_space();
                    self.emit_expr_with_prec(&prop.value, prec::COMMA + 1);
                }
            }
            PropertyKind::Method | PropertyKind::Get | PropertyKind::Set => {
                match prop.kind {
                    PropertyKind::Get => self.emit("get "),
                    PropertyKind::Set => self.emit("set "),
                    _ => {}
                }
                if let ExprKind::Function(func) = &prop.value.kind {
                    self.emit_method(&prop.key, func);
                } else {
                    self.emit_property_key(&prop.key);
                    self.emit(":");
                    self.emit_space();
                    self.emit_expr_with_prec(&prop.value, prec::COMMA + 1);
                }
            }
        }
    }

    fn emit_property_key(&mut self, key: &PropertyKey) {
        match key {
            PropertyKey::Ident(name) => self.emit(name),
            PropertyKey::Private(name) => {
                self.emit("#");
                self.output.push_str(name);
            }
            PropertyKey::String(s) => self.emit_string(s),
            PropertyKey::Number(n) => self.emit(&format_number(*n)),
            PropertyKey::BigInt(digits) => {
                self.emit(digits);
                self.emit("n");
            }
            PropertyKey::Computed(expr) => {
                self.emit("[");
                self.emit_expr_with_prec(expr, prec::COMMA + 1);
                self.emit("]");
            }
        }
    }

    fn emit_string(&mut self, s: &str) {
        self.emit("\"");
        self.output.push_str(&escape_string(s));
        self.output.push('"');
    }
}

/// Statements that print as nothing.
fn is_removed(stmt: &Stmt) -> bool {
    matches!(
        stmt.kind,
        StmtKind::TypeScript { .. } | StmtKind::Enum(_) | StmtKind::Namespace(_)
    )
}

// =============================================================================
// Helper Functions
// =============================================================================

/// `Number.prototype.toString()` for finite and non-finite values.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let sign = if n < 0.0 { "-" } else { "" };
    // `{:e}` yields the shortest digits that round-trip
    let scientific = format!("{:e}", n.abs());
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let point = exponent + 1;

    let body = if k <= point && point <= 21 {
        format!("{digits}{}", "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{int}.{frac}")
    } else if -6 < point && point <= 0 {
        format!("0.{}{digits}", "0".repeat((-point) as usize))
    } else {
        let (first, rest) = digits.split_at(1);
        let exp_sign = if point > 0 { '+' } else { '-' };
        if rest.is_empty() {
            format!("{first}e{exp_sign}{}", (point - 1).abs())
        } else {
            format!("{first}.{rest}e{exp_sign}{}", (point - 1).abs())
        }
    };
    format!("{sign}{body}")
}

fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\u{8}' => result.push_str("\\b"),
            '\u{b}' => result.push_str("\\v"),
            '\u{c}' => result.push_str("\\f"),
            // "\01" would be an octal escape
            '\0' if chars.peek().is_some_and(|next| next.is_ascii_digit()) => result.push_str("\\x00"),
            '\0' => result.push_str("\\0"),
            '\u{2028}' => result.push_str("\\u2028"),
            '\u{2029}' => result.push_str("\\u2029"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                result.push_str(&format!("\\x{:02X}", c as u32));
            }
            c => result.push(c),
        }
    }
    result
}

fn binary_op_info(op: BinaryOp) -> (u8, &'static str) {
    match op {
        BinaryOp::NullishCoalesce => (prec::NULLISH, "??"),
        BinaryOp::Or => (prec::LOGICAL_OR, "||"),
        BinaryOp::And => (prec::LOGICAL_AND, "&&"),
        BinaryOp::BitOr => (prec::BITWISE_OR, "|"),
        BinaryOp::BitXor => (prec::BITWISE_XOR, "^"),
        BinaryOp::BitAnd => (prec::BITWISE_AND, "&"),
        BinaryOp::Eq => (prec::EQUALS, "=="),
        BinaryOp::NotEq => (prec::EQUALS, "!="),
        BinaryOp::StrictEq => (prec::EQUALS, "==="),
        BinaryOp::StrictNotEq => (prec::EQUALS, "!=="),
        BinaryOp::Lt => (prec::COMPARE, "<"),
        BinaryOp::LtEq => (prec::COMPARE, "<="),
        BinaryOp::Gt => (prec::COMPARE, ">"),
        BinaryOp::GtEq => (prec::COMPARE, ">="),
        BinaryOp::In => (prec::COMPARE, "in"),
        BinaryOp::Instanceof => (prec::COMPARE, "instanceof"),
        BinaryOp::Shl => (prec::SHIFT, "<<"),
        BinaryOp::Shr => (prec::SHIFT, ">>"),
        BinaryOp::UShr => (prec::SHIFT, ">>>"),
        BinaryOp::Add => (prec::ADD, "+"),
        BinaryOp::Sub => (prec::ADD, "-"),
        BinaryOp::Mul => (prec::MULTIPLY, "*"),
        BinaryOp::Div => (prec::MULTIPLY, "/"),
        BinaryOp::Mod => (prec::MULTIPLY, "%"),
        BinaryOp::Pow => (prec::EXPONENT, "**"),
    }
}

fn assign_op_str(op: AssignOp) -> &'static str {
    match op {
        AssignOp::Assign => "=",
        AssignOp::AddAssign => "+=",
        AssignOp::SubAssign => "-=",
        AssignOp::MulAssign => "*=",
        AssignOp::DivAssign => "/=",
        AssignOp::ModAssign => "%=",
        AssignOp::PowAssign => "**=",
        AssignOp::ShlAssign => "<<=",
        AssignOp::ShrAssign => ">>=",
        AssignOp::UShrAssign => ">>>=",
        AssignOp::BitOrAssign => "|=",
        AssignOp::BitXorAssign => "^=",
        AssignOp::BitAndAssign => "&=",
        AssignOp::AndAssign => "&&=",
        AssignOp::OrAssign => "||=",
        AssignOp::NullishAssign => "??=",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParserOptions;
    use crate::parser::Parser;
    use crate::visit::lower;

    fn print(source: &str, options: CodegenOptions) -> String {
        let (ast, log) = Parser::new(source, ParserOptions::default()).parse();
        assert!(!log.has_errors(), "unexpected errors for {source:?}: {log:?}");
        let mut ast = ast.unwrap();
        lower(&mut ast, true);
        Codegen::new(&ast, options).generate()
    }

    fn roundtrip(source: &str) -> String {
        print(source, CodegenOptions::default())
    }

    #[test]
    fn test_variable_declaration() {
        assert_eq!(roundtrip("let x: number = 1;"), "let x = 1;\n");
        assert_eq!(roundtrip("const [a, , ...b] = c, { d, e: f = 1 } = g;"), "const [a, , ...b] = c, { d, e: f = 1 } = g;\n");
    }

    #[test]
    fn test_function_declaration() {
        let output = roundtrip("function foo(a: T, b?: U): V { return a + b; }");
        assert_eq!(output, "function foo(a, b) {\n  return a + b;\n}\n");
    }

    #[test]
    fn test_precedence() {
        assert_eq!(roundtrip("(a + b) * c;"), "(a + b) * c;\n");
        assert_eq!(roundtrip("a + (b * c);"), "a + b * c;\n");
        assert_eq!(roundtrip("a - (b - c);"), "a - (b - c);\n");
        assert_eq!(roundtrip("(-1) ** 2;"), "(-1) ** 2;\n");
        assert_eq!(roundtrip("(a ?? b) || c;"), "(a ?? b) || c;\n");
        assert_eq!(roundtrip("f((a, b));"), "f((a, b));\n");
        assert_eq!(roundtrip("(a = b).c;"), "(a = b).c;\n");
        assert_eq!(roundtrip("new (a())();"), "new (a())();\n");
        assert_eq!(roundtrip("(() => 1)();"), "(() => 1)();\n");
        assert_eq!(roundtrip("a < b > c;"), "a < b > c;\n");
        assert_eq!(roundtrip("- -a;"), "- -a;\n");
    }

    #[test]
    fn test_statement_start_parens() {
        assert_eq!(roundtrip("({}).x;"), "({}).x;\n");
        assert_eq!(roundtrip("(function () {})();"), "(function() {})();\n");
        assert_eq!(roundtrip("(class {});"), "(class {});\n");
        assert_eq!(roundtrip("({ a } = b);"), "({ a } = b);\n");
        assert_eq!(roundtrip("x = () => ({});"), "x = () => ({});\n");
    }

    #[test]
    fn test_type_arguments_are_erased() {
        assert_eq!(roundtrip("f<number>(x);"), "f(x);\n");
        assert_eq!(roundtrip("new Map<string, number>();"), "new Map();\n");
        assert_eq!(roundtrip("let y = <T>x as any;"), "let y = x;\n");
    }

    #[test]
    fn test_member_on_number() {
        assert_eq!(roundtrip("(1).toString();"), "(1).toString();\n");
    }

    #[test]
    fn test_if_else() {
        assert_eq!(roundtrip("if (a) b(); else c();"), "if (a)\n  b();\nelse\n  c();\n");
        assert_eq!(roundtrip("if (a) { b(); } else if (c) { d(); }"), "if (a) {\n  b();\n} else if (c) {\n  d();\n}\n");
    }

    #[test]
    fn test_minify() {
        let output = print("let x = 1;\nlet y = 2;\nif (x) { y = x + +y; }", CodegenOptions::default().with_minify(true));
        assert_eq!(output, "let x=1;let y=2;if(x){y=x+ +y}");
    }

    #[test]
    fn test_minify_keyword_spacing() {
        let output = print("function f() { return typeof x; }", CodegenOptions::default().with_minify(true));
        assert_eq!(output, "function f(){return typeof x}");
    }

    #[test]
    fn test_modules() {
        assert_eq!(roundtrip("import a, { b as c } from 'x'; c(a);"), "import a, { b as c } from \"x\";\nc(a);\n");
        assert_eq!(roundtrip("import * as ns from 'y'; ns();"), "import * as ns from \"y\";\nns();\n");
        assert_eq!(roundtrip("export * as z from 'z';"), "export * as z from \"z\";\n");
        assert_eq!(roundtrip("export default 1;"), "export default 1;\n");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(-0.0), "-0");
        assert_eq!(format_number(4.3), "4.3");
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(-2.5), "-2.5");
        assert_eq!(format_number(123456789012345680000.0), "123456789012345680000");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("a\"b\\c\n"), "a\\\"b\\\\c\\n");
        assert_eq!(escape_string("\u{0}1"), "\\x001");
        assert_eq!(escape_string("\u{0}"), "\\0");
        assert_eq!(escape_string("\u{1}"), "\\x01");
        assert_eq!(escape_string("\u{2028}"), "\\u2028");
    }
}
