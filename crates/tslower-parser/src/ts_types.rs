//! TypeScript type syntax.
//!
//! Types are never turned into AST nodes. The skippers here consume a type
//! and leave the lexer on the first token after it, failing with a
//! [`ParseError`] if the type is malformed. Callers that aren't sure they
//! are looking at a type run the skipper under
//! [`Parser::try_speculative`].

use bitflags::bitflags;

use crate::error::ParseError;
use crate::expr::{binary_op, Level};
use crate::parser::Parser;
use crate::token::TokenKind;

bitflags! {
    /// Context for one call of the type skipper. Passed down by value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub(crate) struct TypeSkipFlags: u8 {
        /// Allow `asserts x` and `asserts x is T`.
        const IS_RETURN_TYPE = 1 << 0;
        /// Inside `[...]` of an object type, where `keyof` and `infer` may be
        /// key names.
        const IS_INDEX_SIGNATURE = 1 << 1;
        /// Tuple element position, where any word may be a `label:`.
        const ALLOW_TUPLE_LABELS = 1 << 2;
        /// Right after `extends` in a conditional type.
        const DISALLOW_CONDITIONAL_TYPES = 1 << 3;
    }
}

bitflags! {
    /// Which modifiers a type parameter list accepts before each name.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub(crate) struct TypeParameterFlags: u8 {
        /// `in` and `out` (classes, interfaces, type aliases).
        const ALLOW_IN_OUT_VARIANCE = 1 << 0;
        /// `const` (functions, methods, classes, arrows).
        const ALLOW_CONST_MODIFIER = 1 << 1;
        /// `<>` with no parameters.
        const ALLOW_EMPTY_LIST = 1 << 2;
    }
}

/// How sure the type parameter skipper is that `<...>` was generics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TypeParamResult {
    /// There was no `<`.
    NoMatch,
    /// `<T>` could still be the start of a `<T>x` cast.
    AmbiguousCouldBeCast,
    /// Something that can only appear in a parameter list was seen.
    DefinitelyTypeParameters,
}

/// Classifies identifiers that start a type.
enum TypeWord {
    /// `keyof`, `readonly`
    Prefix,
    Infer,
    Unique,
    Abstract,
    Asserts,
    /// Never followed by type arguments.
    Primitive,
    Other,
}

fn classify_type_word(word: &str) -> TypeWord {
    match word {
        "keyof" | "readonly" => TypeWord::Prefix,
        "infer" => TypeWord::Infer,
        "unique" => TypeWord::Unique,
        "abstract" => TypeWord::Abstract,
        "asserts" => TypeWord::Asserts,
        "any" | "never" | "unknown" | "undefined" | "object" | "number" | "string" | "boolean"
        | "bigint" | "symbol" => TypeWord::Primitive,
        _ => TypeWord::Other,
    }
}

impl<'a> Parser<'a> {
    pub(crate) fn skip_type_script_type(&mut self, level: Level) -> Result<(), ParseError> {
        self.skip_type_script_type_with_flags(level, TypeSkipFlags::empty())
    }

    pub(crate) fn skip_type_script_return_type(&mut self) -> Result<(), ParseError> {
        self.skip_type_script_type_with_flags(Level::Lowest, TypeSkipFlags::IS_RETURN_TYPE)
    }

    /// `keyof` and `infer` are key names rather than operators in
    /// `{ [keyof: string]: T }` and `[infer: T]`.
    fn is_type_word_used_as_label(&self, flags: TypeSkipFlags) -> bool {
        matches!(self.lexer.kind(), TokenKind::Colon | TokenKind::In)
            && flags.intersects(TypeSkipFlags::IS_INDEX_SIGNATURE | TypeSkipFlags::ALLOW_TUPLE_LABELS)
    }

    fn is_tuple_label_colon(&self, flags: TypeSkipFlags) -> bool {
        flags.contains(TypeSkipFlags::ALLOW_TUPLE_LABELS) && self.check(TokenKind::Colon)
    }

    pub(crate) fn skip_type_script_type_with_flags(
        &mut self,
        level: Level,
        flags: TypeSkipFlags,
    ) -> Result<(), ParseError> {
        loop {
            match self.lexer.kind() {
                TokenKind::Number
                | TokenKind::BigInt
                | TokenKind::String
                | TokenKind::TemplateNoSub
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::Void => self.next()?,

                TokenKind::Const => {
                    let span = self.lexer.span();
                    self.next()?;
                    // "[const: number]"
                    if self.is_tuple_label_colon(flags) {
                        self.add_error(span, "Unexpected \"const\"");
                    }
                }

                TokenKind::This => {
                    self.next()?;
                    // "function check(): this is boolean"
                    if self.lexer.is_contextual_keyword("is") && !self.lexer.has_newline_before() {
                        self.next()?;
                        return self.skip_type_script_type(Level::Lowest);
                    }
                }

                // "-123" or "-123n"
                TokenKind::Minus => {
                    self.next()?;
                    if self.check(TokenKind::BigInt) {
                        self.next()?;
                    } else {
                        self.expect(TokenKind::Number)?;
                    }
                }

                // A leading "&" or "|"
                TokenKind::Amp | TokenKind::Pipe => {
                    self.next()?;
                    continue;
                }

                // "import('fs')"
                TokenKind::Import => {
                    self.next()?;
                    if self.is_tuple_label_colon(flags) {
                        return Ok(());
                    }
                    self.expect(TokenKind::LParen)?;
                    self.expect(TokenKind::String)?;
                    // "import('./foo.json', { with: { type: 'json' } })"
                    if self.eat(TokenKind::Comma)? {
                        self.skip_type_script_object_type()?;
                        self.eat(TokenKind::Comma)?;
                    }
                    self.expect(TokenKind::RParen)?;
                }

                // "new () => Foo" or "new <T>() => Foo<T>"
                TokenKind::New => {
                    self.next()?;
                    if self.is_tuple_label_colon(flags) {
                        return Ok(());
                    }
                    self.skip_type_script_type_parameters(TypeParameterFlags::empty())?;
                    self.skip_type_script_paren_or_fn_type()?;
                }

                // "<T>() => Foo<T>"
                TokenKind::Lt => {
                    self.skip_type_script_type_parameters(TypeParameterFlags::empty())?;
                    self.skip_type_script_paren_or_fn_type()?;
                }

                TokenKind::LParen => self.skip_type_script_paren_or_fn_type()?,

                TokenKind::Identifier => {
                    let word = self.lexer.identifier();
                    let mut check_type_arguments = true;

                    match classify_type_word(&word) {
                        TypeWord::Prefix => {
                            self.next()?;
                            if !self.is_type_word_used_as_label(flags) {
                                self.skip_type_script_type(Level::Prefix)?;
                            }
                            break;
                        }
                        TypeWord::Infer => {
                            self.next()?;
                            // "Bar extends [infer T extends string] ? T : null"
                            if !self.is_type_word_used_as_label(flags) {
                                self.expect(TokenKind::Identifier)?;
                                if self.check(TokenKind::Extends) {
                                    self.try_skip_type_script_constraint_of_infer_type_with_backtracking(flags);
                                }
                            }
                            break;
                        }
                        TypeWord::Unique => {
                            self.next()?;
                            // "let foo: unique symbol"
                            if self.lexer.is_contextual_keyword("symbol") {
                                self.next()?;
                                break;
                            }
                        }
                        TypeWord::Abstract => {
                            self.next()?;
                            // "let foo: abstract new () => {}"
                            if self.check(TokenKind::New) {
                                continue;
                            }
                        }
                        TypeWord::Asserts => {
                            self.next()?;
                            // "function assert(x: boolean): asserts x"
                            if flags.contains(TypeSkipFlags::IS_RETURN_TYPE)
                                && !self.lexer.has_newline_before()
                                && matches!(self.lexer.kind(), TokenKind::Identifier | TokenKind::This)
                            {
                                self.next()?;
                            }
                        }
                        TypeWord::Primitive => {
                            self.next()?;
                            check_type_arguments = false;
                        }
                        TypeWord::Other => self.next()?,
                    }

                    // "function assert(x: any): x is boolean"
                    if self.lexer.is_contextual_keyword("is") && !self.lexer.has_newline_before() {
                        self.next()?;
                        return self.skip_type_script_type(Level::Lowest);
                    }

                    // "let foo: any \n <number>foo" must not become a single type
                    if check_type_arguments && !self.lexer.has_newline_before() {
                        self.skip_type_script_type_arguments(false)?;
                    }
                }

                TokenKind::Typeof => {
                    self.next()?;
                    if self.is_tuple_label_colon(flags) {
                        return Ok(());
                    }
                    // "typeof import('fs')"
                    if self.check(TokenKind::Import) {
                        continue;
                    }
                    // "typeof x.y" or "typeof x.#y"
                    if !self.lexer.is_identifier_or_keyword() {
                        return Err(self.lexer.expected("identifier"));
                    }
                    self.next()?;
                    while self.eat(TokenKind::Dot)? {
                        if !self.lexer.is_identifier_or_keyword() && !self.check(TokenKind::PrivateIdentifier) {
                            return Err(self.lexer.expected("identifier"));
                        }
                        self.next()?;
                    }
                    if !self.lexer.has_newline_before() {
                        self.skip_type_script_type_arguments(false)?;
                    }
                }

                // "[number, string]" or "[first: number, second?: string]"
                TokenKind::LBracket => {
                    self.next()?;
                    while !self.check(TokenKind::RBracket) {
                        self.eat(TokenKind::Spread)?;
                        self.skip_type_script_type_with_flags(Level::Lowest, TypeSkipFlags::ALLOW_TUPLE_LABELS)?;
                        self.eat(TokenKind::Question)?;
                        if self.eat(TokenKind::Colon)? {
                            self.skip_type_script_type(Level::Lowest)?;
                        }
                        if !self.eat(TokenKind::Comma)? {
                            break;
                        }
                    }
                    self.expect(TokenKind::RBracket)?;
                }

                TokenKind::LBrace => self.skip_type_script_object_type()?,

                // "`${'a' | 'b'}-${'c' | 'd'}`"
                TokenKind::TemplateHead => loop {
                    self.next()?;
                    self.skip_type_script_type(Level::Lowest)?;
                    self.lexer.rescan_close_brace_as_template_token()?;
                    if self.check(TokenKind::TemplateTail) {
                        self.next()?;
                        break;
                    }
                },

                _ => {
                    // "[function: number]"
                    if flags.contains(TypeSkipFlags::ALLOW_TUPLE_LABELS) && self.lexer.is_identifier_or_keyword() {
                        if !self.check(TokenKind::Function) {
                            let raw = self.lexer.raw();
                            self.add_error(self.lexer.span(), format!("Unexpected \"{raw}\""));
                        }
                        self.next()?;
                        if !self.check(TokenKind::Colon) {
                            return Err(self.lexer.expected(":"));
                        }
                        return Ok(());
                    }
                    return Err(self.lexer.unexpected());
                }
            }
            break;
        }

        self.skip_type_script_type_suffix(level, flags)
    }

    /// Unions, intersections, `!`, member access, indexed access and
    /// conditional types after a primary type.
    fn skip_type_script_type_suffix(&mut self, level: Level, flags: TypeSkipFlags) -> Result<(), ParseError> {
        loop {
            match self.lexer.kind() {
                TokenKind::Pipe => {
                    if level >= Level::BitwiseOr {
                        return Ok(());
                    }
                    self.next()?;
                    self.skip_type_script_type_with_flags(Level::BitwiseOr, flags)?;
                }

                TokenKind::Amp => {
                    if level >= Level::BitwiseAnd {
                        return Ok(());
                    }
                    self.next()?;
                    self.skip_type_script_type_with_flags(Level::BitwiseAnd, flags)?;
                }

                // A JSDoc-style postfix "!". It must still be consumed after
                // "as" casts.
                TokenKind::Bang => {
                    if self.lexer.has_newline_before() {
                        return Ok(());
                    }
                    self.next()?;
                }

                TokenKind::Dot => {
                    self.next()?;
                    if !self.lexer.is_identifier_or_keyword() {
                        return Err(self.lexer.expected("identifier"));
                    }
                    self.next()?;
                    if !self.lexer.has_newline_before() {
                        self.skip_type_script_type_arguments(false)?;
                    }
                }

                // "{ ['x']: string \n ['y']: string }" must not become a single type
                TokenKind::LBracket => {
                    if self.lexer.has_newline_before() {
                        return Ok(());
                    }
                    self.next()?;
                    if !self.check(TokenKind::RBracket) {
                        self.skip_type_script_type(Level::Lowest)?;
                    }
                    self.expect(TokenKind::RBracket)?;
                }

                // "{ x: number \n extends: boolean }" must not become a single type
                TokenKind::Extends => {
                    if self.lexer.has_newline_before() || flags.contains(TypeSkipFlags::DISALLOW_CONDITIONAL_TYPES) {
                        return Ok(());
                    }
                    self.next()?;
                    self.skip_type_script_type_with_flags(Level::Lowest, TypeSkipFlags::DISALLOW_CONDITIONAL_TYPES)?;
                    self.expect(TokenKind::Question)?;
                    self.skip_type_script_type(Level::Lowest)?;
                    self.expect(TokenKind::Colon)?;
                    self.skip_type_script_type(Level::Lowest)?;
                }

                _ => return Ok(()),
            }
        }
    }

    /// "(number | string)" or "(a: number) => string"
    fn skip_type_script_paren_or_fn_type(&mut self) -> Result<(), ParseError> {
        let is_fn_type = self
            .try_speculative(|p| {
                p.skip_type_script_fn_args()?;
                p.expect(TokenKind::Arrow)
            })
            .is_some();
        if is_fn_type {
            self.skip_type_script_return_type()
        } else {
            self.expect(TokenKind::LParen)?;
            self.skip_type_script_type(Level::Lowest)?;
            self.expect(TokenKind::RParen)
        }
    }

    pub(crate) fn skip_type_script_fn_args(&mut self) -> Result<(), ParseError> {
        self.expect(TokenKind::LParen)?;
        while !self.check(TokenKind::RParen) {
            // "(...a)"
            self.eat(TokenKind::Spread)?;
            self.skip_type_script_binding()?;
            // "(a?)"
            self.eat(TokenKind::Question)?;
            // "(a: any)"
            if self.eat(TokenKind::Colon)? {
                self.skip_type_script_type(Level::Lowest)?;
            }
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RParen)
    }

    /// A parameter binding inside a function type. Only its shape matters.
    fn skip_type_script_binding(&mut self) -> Result<(), ParseError> {
        match self.lexer.kind() {
            TokenKind::Identifier | TokenKind::This => self.next(),

            TokenKind::LBracket => {
                self.next()?;
                // "[, , a]"
                while self.eat(TokenKind::Comma)? {}
                while !self.check(TokenKind::RBracket) {
                    self.eat(TokenKind::Spread)?;
                    self.skip_type_script_binding()?;
                    if !self.eat(TokenKind::Comma)? {
                        break;
                    }
                }
                self.expect(TokenKind::RBracket)
            }

            TokenKind::LBrace => {
                self.next()?;
                while !self.check(TokenKind::RBrace) {
                    let mut found_identifier = false;
                    match self.lexer.kind() {
                        // "{...x}"
                        TokenKind::Spread => {
                            self.next()?;
                            if !self.check(TokenKind::Identifier) {
                                return Err(self.lexer.unexpected());
                            }
                            found_identifier = true;
                            self.next()?;
                        }
                        // "{x}" or "{x: y}"
                        TokenKind::Identifier => {
                            found_identifier = true;
                            self.next()?;
                        }
                        // "{1: y}" or "{'x': y}"
                        TokenKind::String | TokenKind::Number => self.next()?,
                        // "{if: x}"
                        _ if self.lexer.is_identifier_or_keyword() => self.next()?,
                        _ => return Err(self.lexer.unexpected()),
                    }
                    if self.check(TokenKind::Colon) || !found_identifier {
                        self.expect(TokenKind::Colon)?;
                        self.skip_type_script_binding()?;
                    }
                    if !self.eat(TokenKind::Comma)? {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace)
            }

            _ => Err(self.lexer.unexpected()),
        }
    }

    /// `{ ... }` object and mapped types, also the body of an interface.
    pub(crate) fn skip_type_script_object_type(&mut self) -> Result<(), ParseError> {
        self.expect(TokenKind::LBrace)?;

        while !self.check(TokenKind::RBrace) {
            // "{ -readonly [K in keyof T]: T[K] }"
            if matches!(self.lexer.kind(), TokenKind::Plus | TokenKind::Minus) {
                self.next()?;
            }

            // Modifiers and the property name
            let mut found_key = false;
            while self.lexer.is_identifier_or_keyword()
                || matches!(self.lexer.kind(), TokenKind::String | TokenKind::Number)
            {
                self.next()?;
                found_key = true;
            }

            if self.eat(TokenKind::LBracket)? {
                // "{ [key: string]: number }" or "{ readonly [K in keyof T]: T[K] }"
                self.skip_type_script_type_with_flags(Level::Lowest, TypeSkipFlags::IS_INDEX_SIGNATURE)?;
                if self.eat(TokenKind::Colon)? {
                    self.skip_type_script_type(Level::Lowest)?;
                } else if self.eat(TokenKind::In)? {
                    self.skip_type_script_type(Level::Lowest)?;
                    // "{ [K in keyof T as `get-${K}`]: T[K] }"
                    if self.lexer.is_contextual_keyword("as") {
                        self.next()?;
                        self.skip_type_script_type(Level::Lowest)?;
                    }
                }
                self.expect(TokenKind::RBracket)?;

                // "{ [K in keyof T]+?: T[K] }"
                if matches!(self.lexer.kind(), TokenKind::Plus | TokenKind::Minus) {
                    self.next()?;
                }
                found_key = true;
            }

            // "?" marks an optional property, "!" a definite one
            if found_key && matches!(self.lexer.kind(), TokenKind::Question | TokenKind::Bang) {
                self.next()?;
            }

            self.skip_type_script_type_parameters(TypeParameterFlags::empty())?;

            match self.lexer.kind() {
                TokenKind::Colon => {
                    if !found_key {
                        return Err(self.lexer.expected("identifier"));
                    }
                    self.next()?;
                    self.skip_type_script_type(Level::Lowest)?;
                }
                // Method and call signatures
                TokenKind::LParen => {
                    self.skip_type_script_fn_args()?;
                    if self.eat(TokenKind::Colon)? {
                        self.skip_type_script_return_type()?;
                    }
                }
                _ if !found_key => return Err(self.lexer.unexpected()),
                _ => {}
            }

            match self.lexer.kind() {
                TokenKind::RBrace => {}
                TokenKind::Comma | TokenKind::Semicolon => self.next()?,
                _ if self.lexer.has_newline_before() => {}
                _ => return Err(self.lexer.unexpected()),
            }
        }

        self.expect(TokenKind::RBrace)
    }

    /// Skip `<T extends U = V, ...>`. Only the first invalid modifier is
    /// reported.
    pub(crate) fn skip_type_script_type_parameters(
        &mut self,
        flags: TypeParameterFlags,
    ) -> Result<TypeParamResult, ParseError> {
        if !self.check(TokenKind::Lt) {
            return Ok(TypeParamResult::NoMatch);
        }
        self.next()?;

        let mut result = TypeParamResult::AmbiguousCouldBeCast;
        if flags.contains(TypeParameterFlags::ALLOW_EMPTY_LIST) && self.check(TokenKind::Gt) {
            self.next()?;
            return Ok(TypeParamResult::DefinitelyTypeParameters);
        }

        loop {
            let mut has_in = false;
            let mut has_out = false;
            let mut expect_identifier = true;
            let mut invalid_modifier = None;

            loop {
                if self.check(TokenKind::Const) {
                    // "class Foo<const T> {}" but not "interface Foo<const T> {}"
                    if invalid_modifier.is_none() && !flags.contains(TypeParameterFlags::ALLOW_CONST_MODIFIER) {
                        invalid_modifier = Some(self.lexer.span());
                    }
                    result = TypeParamResult::DefinitelyTypeParameters;
                    self.next()?;
                    expect_identifier = true;
                    continue;
                }

                if self.check(TokenKind::In) {
                    // "type Foo<in T> = T" but not "type Foo<out in T> = T"
                    if invalid_modifier.is_none()
                        && (!flags.contains(TypeParameterFlags::ALLOW_IN_OUT_VARIANCE) || has_in || has_out)
                    {
                        invalid_modifier = Some(self.lexer.span());
                    }
                    self.next()?;
                    has_in = true;
                    expect_identifier = true;
                    continue;
                }

                if self.lexer.is_contextual_keyword("out") {
                    let span = self.lexer.span();
                    if invalid_modifier.is_none() && !flags.contains(TypeParameterFlags::ALLOW_IN_OUT_VARIANCE) {
                        invalid_modifier = Some(span);
                    }
                    self.next()?;
                    // "type Foo<out out> = T" names a parameter "out", but
                    // "type Foo<out out T> = T" repeats the modifier
                    if invalid_modifier.is_none()
                        && has_out
                        && matches!(self.lexer.kind(), TokenKind::In | TokenKind::Identifier)
                    {
                        invalid_modifier = Some(span);
                    }
                    has_out = true;
                    expect_identifier = false;
                    continue;
                }

                break;
            }

            if let Some(span) = invalid_modifier {
                let text = self.lexer.text(span);
                self.add_error(span, format!("The modifier \"{text}\" is not valid here:"));
            }

            // After "out" the name is optional since "out" may be the name
            if expect_identifier || self.check(TokenKind::Identifier) {
                self.expect(TokenKind::Identifier)?;
            }

            // "class Foo<T extends number> {}"
            if self.eat(TokenKind::Extends)? {
                result = TypeParamResult::DefinitelyTypeParameters;
                self.skip_type_script_type(Level::Lowest)?;
            }

            // "class Foo<T = void> {}"
            if self.eat(TokenKind::Eq)? {
                result = TypeParamResult::DefinitelyTypeParameters;
                self.skip_type_script_type(Level::Lowest)?;
            }

            if !self.eat(TokenKind::Comma)? {
                break;
            }
            if self.check(TokenKind::Gt) {
                result = TypeParamResult::DefinitelyTypeParameters;
                break;
            }
        }

        self.lexer.expect_greater_than()?;
        Ok(result)
    }

    /// Skip `<T, U>` if present. Inside an expression the list must end with
    /// a standalone `>` so that `x < y >= z` stays a comparison; elsewhere
    /// `>>` is split so `Array<Array<number>>` works.
    pub(crate) fn skip_type_script_type_arguments(&mut self, in_expression: bool) -> Result<bool, ParseError> {
        match self.lexer.kind() {
            TokenKind::Lt | TokenKind::LtEq | TokenKind::LtLt | TokenKind::LtLtEq => {}
            _ => return Ok(false),
        }
        self.lexer.expect_less_than()?;

        loop {
            self.skip_type_script_type(Level::Lowest)?;
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }

        if in_expression {
            self.expect(TokenKind::Gt)?;
        } else {
            self.lexer.expect_greater_than()?;
        }
        Ok(true)
    }

    /// `f<T>(x)` is a call with type arguments, `a < b > c` is not.
    pub(crate) fn try_skip_type_script_type_arguments_with_backtracking(&mut self) -> bool {
        self.try_speculative_then(
            |p| p.skip_type_script_type_arguments(true),
            |p| p.can_follow_type_arguments_in_expression(),
        )
        .unwrap_or(false)
    }

    /// `<T>(` for a generic arrow. Leaves the lexer on the `(`.
    pub(crate) fn try_skip_type_script_type_parameters_then_open_paren_with_backtracking(
        &mut self,
    ) -> TypeParamResult {
        self.try_speculative_then(
            |p| p.skip_type_script_type_parameters(TypeParameterFlags::ALLOW_CONST_MODIFIER),
            |p| p.check(TokenKind::LParen),
        )
        .unwrap_or(TypeParamResult::NoMatch)
    }

    /// `: T =>` after an arrow parameter list. Leaves the lexer on the `=>`.
    pub(crate) fn try_skip_type_script_arrow_return_type_with_backtracking(&mut self) -> bool {
        self.try_speculative_then(
            |p| {
                p.expect(TokenKind::Colon)?;
                p.skip_type_script_return_type()
            },
            |p| p.check(TokenKind::Arrow),
        )
        .is_some()
    }

    /// `infer T extends U` inside a conditional type, where `extends` may
    /// instead belong to an enclosing conditional.
    fn try_skip_type_script_constraint_of_infer_type_with_backtracking(&mut self, flags: TypeSkipFlags) -> bool {
        self.try_speculative_then(
            |p| {
                p.expect(TokenKind::Extends)?;
                p.skip_type_script_type_with_flags(Level::Prefix, TypeSkipFlags::DISALLOW_CONDITIONAL_TYPES)
            },
            |p| flags.contains(TypeSkipFlags::DISALLOW_CONDITIONAL_TYPES) || !p.check(TokenKind::Question),
        )
        .is_some()
    }

    /// Decide whether the token after a `<...>` list in expression position
    /// means the list was type arguments.
    pub(crate) fn can_follow_type_arguments_in_expression(&mut self) -> bool {
        match self.lexer.kind() {
            // "f<T>(x)" and "f<T>`tpl`"
            TokenKind::LParen | TokenKind::TemplateNoSub | TokenKind::TemplateHead => true,

            // "a<b>c" and friends: these also continue a comparison chain
            TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::GtEq
            | TokenKind::GtGt
            | TokenKind::GtGtEq
            | TokenKind::GtGtGt
            | TokenKind::GtGtGtEq => false,

            // "f<T>;" and "f<T>\nnext" are instantiation expressions
            _ => {
                self.lexer.has_newline_before()
                    || self.is_binary_operator()
                    || !self.is_start_of_expression()
            }
        }
    }

    fn is_binary_operator(&self) -> bool {
        match self.lexer.kind() {
            TokenKind::In => self.allow_in,
            TokenKind::Identifier => {
                self.lexer.is_contextual_keyword("as") || self.lexer.is_contextual_keyword("satisfies")
            }
            kind => binary_op(kind).is_some(),
        }
    }

    fn is_start_of_expression(&mut self) -> bool {
        match self.lexer.kind() {
            TokenKind::This
            | TokenKind::Super
            | TokenKind::Null
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Number
            | TokenKind::BigInt
            | TokenKind::String
            | TokenKind::TemplateNoSub
            | TokenKind::TemplateHead
            | TokenKind::LParen
            | TokenKind::LBracket
            | TokenKind::LBrace
            | TokenKind::Function
            | TokenKind::Class
            | TokenKind::New
            | TokenKind::Slash
            | TokenKind::SlashEq
            | TokenKind::Identifier
            | TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Tilde
            | TokenKind::Bang
            | TokenKind::Delete
            | TokenKind::Typeof
            | TokenKind::Void
            | TokenKind::PlusPlus
            | TokenKind::MinusMinus
            | TokenKind::Lt
            | TokenKind::PrivateIdentifier
            | TokenKind::At => true,
            // "import(x)", "import.meta" and "import<T>"
            TokenKind::Import => matches!(
                self.peek_token().kind,
                TokenKind::LParen | TokenKind::Lt | TokenKind::Dot
            ),
            _ => self.is_binary_operator(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParserOptions;

    fn parser(source: &str) -> Parser<'_> {
        let mut parser = Parser::new(source, ParserOptions::default());
        parser.next().unwrap();
        parser
    }

    /// Skip one type and return the text of the token the skipper stopped on.
    fn skip(source: &str) -> String {
        let mut p = parser(source);
        p.skip_type_script_type(Level::Lowest).unwrap();
        assert!(p.log.is_empty(), "unexpected diagnostics for {source:?}: {:?}", p.log);
        p.lexer.raw().to_string()
    }

    fn skip_fails(source: &str) -> bool {
        let mut p = parser(source);
        p.skip_type_script_type(Level::Lowest).is_err()
    }

    #[test]
    fn test_primary_types() {
        for ty in [
            "number", "string", "any", "unknown", "never", "void", "null", "undefined", "object",
            "symbol", "bigint", "boolean", "true", "false", "42", "-1", "-1n", "'x'", "`lit`",
        ] {
            assert_eq!(skip(&format!("{ty};")), ";", "{ty}");
        }
    }

    #[test]
    fn test_composite_types() {
        for ty in [
            "Array<number>",
            "Array<Array<number>>",
            "Map<string, Set<number>>",
            "A.B.C<D>",
            "string | number",
            "| 'a' | 'b'",
            "A & B",
            "string[]",
            "T[K]",
            "(string | number)[]",
            "[number, string?, ...boolean[]]",
            "[first: number, second?: string]",
            "{ a: number; b?: string, c(): void; [key: string]: any }",
            "{ readonly [K in keyof T as `get${K}`]-?: T[K] }",
            "typeof x.y",
            "typeof import('fs')",
            "import('fs').Stats",
            "keyof T",
            "readonly string[]",
            "unique symbol",
            "`${'a' | 'b'}-${number}`",
            "T extends string ? 'yes' : 'no'",
            "T extends [infer U extends string] ? U : never",
            "new () => Foo",
            "abstract new () => Foo",
            "<T>(x: T) => T",
            "({ a, b: [c] }: Props, ...rest: any[]) => void",
        ] {
            assert_eq!(skip(&format!("{ty};")), ";", "{ty}");
        }
    }

    #[test]
    fn test_type_predicates() {
        let mut p = parser("x is string;");
        p.skip_type_script_return_type().unwrap();
        assert!(p.check(TokenKind::Semicolon));

        let mut p = parser("asserts x is string;");
        p.skip_type_script_return_type().unwrap();
        assert!(p.check(TokenKind::Semicolon));

        let mut p = parser("this is Foo;");
        p.skip_type_script_return_type().unwrap();
        assert!(p.check(TokenKind::Semicolon));
    }

    #[test]
    fn test_newline_ends_type() {
        assert_eq!(skip("Foo\n[0]"), "[");
        assert_eq!(skip("Foo\n!x"), "!");
        assert_eq!(skip("any\n<number>foo"), "<");
        assert_eq!(skip("number\nextends"), "extends");
    }

    #[test]
    fn test_malformed_types_fail() {
        assert!(skip_fails(";"));
        assert!(skip_fails("Array<number"));
        assert!(skip_fails("{ a: }"));
        assert!(skip_fails("T extends U ? V"));
    }

    #[test]
    fn test_conditional_type_after_extends_is_not_nested() {
        let mut p = parser("A extends B ? C : D;");
        p.skip_type_script_type_with_flags(Level::Lowest, TypeSkipFlags::DISALLOW_CONDITIONAL_TYPES)
            .unwrap();
        assert!(p.check(TokenKind::Extends));
    }

    #[test]
    fn test_type_parameter_results() {
        let mut p = parser("<T>(");
        assert_eq!(
            p.skip_type_script_type_parameters(TypeParameterFlags::empty()).unwrap(),
            TypeParamResult::AmbiguousCouldBeCast
        );
        let mut p = parser("<T extends U>(");
        assert_eq!(
            p.skip_type_script_type_parameters(TypeParameterFlags::empty()).unwrap(),
            TypeParamResult::DefinitelyTypeParameters
        );
        let mut p = parser("<T,>(");
        assert_eq!(
            p.skip_type_script_type_parameters(TypeParameterFlags::empty()).unwrap(),
            TypeParamResult::DefinitelyTypeParameters
        );
        let mut p = parser("x");
        assert_eq!(
            p.skip_type_script_type_parameters(TypeParameterFlags::empty()).unwrap(),
            TypeParamResult::NoMatch
        );
    }

    #[test]
    fn test_empty_type_parameter_list() {
        let mut p = parser("<>");
        assert!(p.skip_type_script_type_parameters(TypeParameterFlags::empty()).is_err());
        let mut p = parser("<>");
        assert_eq!(
            p.skip_type_script_type_parameters(TypeParameterFlags::ALLOW_EMPTY_LIST).unwrap(),
            TypeParamResult::DefinitelyTypeParameters
        );
    }

    #[test]
    fn test_only_first_invalid_modifier_is_reported() {
        let mut p = parser("<const in T>");
        p.skip_type_script_type_parameters(TypeParameterFlags::empty()).unwrap();
        let errors: Vec<_> = p.log.errors().map(|d| d.text.clone()).collect();
        assert_eq!(errors, ["The modifier \"const\" is not valid here:"]);
    }

    #[test]
    fn test_variance_modifiers() {
        let mut p = parser("<in out T, out>");
        p.skip_type_script_type_parameters(TypeParameterFlags::ALLOW_IN_OUT_VARIANCE).unwrap();
        assert!(p.log.is_empty());

        let mut p = parser("<out in T>");
        p.skip_type_script_type_parameters(TypeParameterFlags::ALLOW_IN_OUT_VARIANCE).unwrap();
        assert_eq!(p.log.len(), 1);

        let mut p = parser("<in T>");
        p.skip_type_script_type_parameters(TypeParameterFlags::ALLOW_CONST_MODIFIER).unwrap();
        assert_eq!(p.log.len(), 1);
    }

    #[test]
    fn test_type_arguments_in_expression_need_plain_gt() {
        let mut p = parser("<y>= z");
        assert!(!p.try_skip_type_script_type_arguments_with_backtracking());
        assert!(p.check(TokenKind::Lt));

        let mut p = parser("<Array<number>>(x)");
        assert!(p.try_skip_type_script_type_arguments_with_backtracking());
        assert!(p.check(TokenKind::LParen));
    }

    #[test]
    fn test_can_follow_type_arguments() {
        let cases = [
            ("<T>(x)", true),
            ("<T>`x`", true),
            ("<T>;", true),
            ("<T>\nfoo", true),
            ("<T> && y", true),
            ("<T> as U", true),
            ("<b>c", false),
            ("<b>-1", false),
            ("<b>(c)", true),
            ("<b>[0]", false),
        ];
        for (source, expected) in cases {
            let mut p = parser(source);
            assert_eq!(p.try_skip_type_script_type_arguments_with_backtracking(), expected, "{source}");
            assert!(p.log.is_empty());
        }
    }

    #[test]
    fn test_arrow_return_type_backtracking() {
        let mut p = parser(": string => x");
        assert!(p.try_skip_type_script_arrow_return_type_with_backtracking());
        assert!(p.check(TokenKind::Arrow));

        let mut p = parser(": (y) => {};");
        assert!(!p.try_skip_type_script_arrow_return_type_with_backtracking());
        assert!(p.check(TokenKind::Colon));
        assert!(p.log.is_empty());
    }
}
