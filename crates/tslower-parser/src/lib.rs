//! tslower-parser: TypeScript-to-JavaScript lowering in a single parse.
//!
//! The parser accepts TypeScript syntax and discards types as it goes,
//! using bounded speculation to tell type arguments and arrow functions
//! apart from ordinary expressions. A lowering pass then rewrites what
//! survives into plain JavaScript:
//!
//! - `namespace` and `enum` become closures over a shared object, with
//!   merged declarations sharing one variable and enum members folded to
//!   constants where possible.
//! - Unused imports (which may only have been used as types) are dropped.
//! - Parameter properties become assignments in the constructor.
//!
//! # Example
//!
//! ```
//! use tslower_parser::{transform, TransformOptions};
//!
//! let result = transform("let x: number = f<string>(1);", TransformOptions::default());
//! assert_eq!(result.code.as_deref(), Some("let x = f(1);\n"));
//! ```
//!
//! Diagnostics never panic out of the API: every entry point returns a
//! [`Log`] alongside its result.

mod ast;
mod codegen;
mod error;
mod expr;
mod fold;
mod lexer;
mod options;
mod parser;
mod span;
mod speculate;
mod symbols;
mod token;
mod ts_types;
mod typescript;
mod visit;

pub mod json;
pub mod sourcemap;

use tracing::debug;

pub use ast::*;
pub use codegen::{format_number, Codegen};
pub use error::{Diagnostic, DiagnosticKind, Log, Note, ParseError, Severity};
pub use fold::{fold_constant, ConstValue};
pub use lexer::Lexer;
pub use options::{CodegenOptions, ParserOptions, TransformOptions};
pub use parser::Parser;
pub use span::{LineIndex, Span};
pub use symbols::{NamespaceTables, Ref, Scope, ScopeId, ScopeKind, ScopeTree, Symbol, SymbolKind, SymbolTable};
pub use token::{Token, TokenKind};
pub use visit::lower;

/// The outcome of [`parse`]. `ast` is `None` when a syntax error stopped
/// the parse; the log always holds everything reported up to that point.
#[derive(Debug)]
pub struct ParseResult {
    pub ast: Option<Ast>,
    pub log: Log,
}

/// The outcome of [`transform`]. `code` is `None` whenever the log holds an
/// error, including errors that did not stop the parse.
#[derive(Debug)]
pub struct TransformResult {
    pub code: Option<String>,
    pub log: Log,
}

/// Parse source code into an AST with scopes and symbols attached.
/// Types are already gone from the result.
pub fn parse(source: &str, options: ParserOptions) -> ParseResult {
    let (ast, log) = Parser::new(source, options).parse();
    ParseResult { ast, log }
}

/// Parse, lower and print source code as JavaScript.
pub fn transform(source: &str, options: TransformOptions) -> TransformResult {
    let (ast, log) = Parser::new(source, options.parser).parse();
    let Some(mut ast) = ast else {
        return TransformResult { code: None, log };
    };
    if log.has_errors() {
        debug!(errors = log.errors().count(), "skipping code generation");
        return TransformResult { code: None, log };
    }

    lower(&mut ast, options.parser.typescript);
    let code = Codegen::new(&ast, options.codegen).generate();
    debug!(
        input_len = source.len(),
        output_len = code.len(),
        warnings = log.warnings().count(),
        "transformed"
    );
    TransformResult { code: Some(code), log }
}
