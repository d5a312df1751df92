//! Parser, printer and transform configuration.

use serde::{Deserialize, Serialize};

/// Parser configuration options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParserOptions {
    /// Enable TypeScript syntax.
    pub typescript: bool,
    /// Parse as ECMAScript module (enables import/export and top-level await).
    pub module: bool,
    /// Accept `@decorator` syntax on classes and class members.
    pub allow_decorators: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            typescript: true,
            module: true,
            allow_decorators: true,
        }
    }
}

impl ParserOptions {
    /// Plain JavaScript: no TypeScript syntax, still a module.
    pub fn javascript() -> Self {
        Self {
            typescript: false,
            ..Self::default()
        }
    }

    pub fn with_typescript(mut self, typescript: bool) -> Self {
        self.typescript = typescript;
        self
    }

    pub fn with_module(mut self, module: bool) -> Self {
        self.module = module;
        self
    }

    pub fn with_decorators(mut self, allow: bool) -> Self {
        self.allow_decorators = allow;
        self
    }
}

/// Code generation options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CodegenOptions {
    /// Minify output (no unnecessary whitespace).
    pub minify: bool,
    /// Indentation string.
    pub indent: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            minify: false,
            indent: "  ".to_string(),
        }
    }
}

impl CodegenOptions {
    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }
}

/// Everything [`crate::transform`] needs. This is also the shape of the
/// `tslower.json` config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    pub parser: ParserOptions,
    pub codegen: CodegenOptions,
}

impl TransformOptions {
    pub fn with_parser(mut self, parser: ParserOptions) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_codegen(mut self, codegen: CodegenOptions) -> Self {
        self.codegen = codegen;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = TransformOptions::default();
        assert!(options.parser.typescript);
        assert!(options.parser.module);
        assert!(!options.codegen.minify);
        assert_eq!(options.codegen.indent, "  ");
    }

    #[test]
    fn test_builders() {
        let parser = ParserOptions::javascript().with_module(false);
        assert!(!parser.typescript);
        assert!(!parser.module);
        let codegen = CodegenOptions::default().with_minify(true).with_indent("\t");
        assert!(codegen.minify);
        assert_eq!(codegen.indent, "\t");
    }
}
