//! Expression parsing.
//!
//! A precedence-climbing parser: [`Parser::parse_prefix`] reads one operand
//! and [`Parser::parse_suffix`] folds operators onto it for as long as their
//! precedence is above the caller's [`Level`].

use crate::ast::*;
use crate::error::ParseError;
use crate::parser::{ClassName, FnOpts, Parser};
use crate::span::Span;
use crate::symbols::{Ref, ScopeId, ScopeKind, SymbolKind};
use crate::token::TokenKind;
use crate::ts_types::{TypeParamResult, TypeParameterFlags};

/// Operator precedence, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Level {
    Lowest,
    Comma,
    Yield,
    Assign,
    Conditional,
    NullishCoalescing,
    LogicalOr,
    LogicalAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseAnd,
    Equals,
    Compare,
    Shift,
    Add,
    Multiply,
    Exponentiation,
    Prefix,
    Postfix,
    New,
    Call,
    Member,
}

impl Level {
    fn below(self) -> Level {
        match self {
            Level::Exponentiation => Level::Multiply,
            Level::Assign => Level::Yield,
            other => other,
        }
    }
}

pub(crate) fn binary_op(kind: TokenKind) -> Option<(BinaryOp, Level)> {
    use TokenKind as T;
    let entry = match kind {
        T::QuestionQuestion => (BinaryOp::NullishCoalesce, Level::NullishCoalescing),
        T::PipePipe => (BinaryOp::Or, Level::LogicalOr),
        T::AmpAmp => (BinaryOp::And, Level::LogicalAnd),
        T::Pipe => (BinaryOp::BitOr, Level::BitwiseOr),
        T::Caret => (BinaryOp::BitXor, Level::BitwiseXor),
        T::Amp => (BinaryOp::BitAnd, Level::BitwiseAnd),
        T::EqEq => (BinaryOp::Eq, Level::Equals),
        T::BangEq => (BinaryOp::NotEq, Level::Equals),
        T::EqEqEq => (BinaryOp::StrictEq, Level::Equals),
        T::BangEqEq => (BinaryOp::StrictNotEq, Level::Equals),
        T::Lt => (BinaryOp::Lt, Level::Compare),
        T::LtEq => (BinaryOp::LtEq, Level::Compare),
        T::Gt => (BinaryOp::Gt, Level::Compare),
        T::GtEq => (BinaryOp::GtEq, Level::Compare),
        T::In => (BinaryOp::In, Level::Compare),
        T::Instanceof => (BinaryOp::Instanceof, Level::Compare),
        T::LtLt => (BinaryOp::Shl, Level::Shift),
        T::GtGt => (BinaryOp::Shr, Level::Shift),
        T::GtGtGt => (BinaryOp::UShr, Level::Shift),
        T::Plus => (BinaryOp::Add, Level::Add),
        T::Minus => (BinaryOp::Sub, Level::Add),
        T::Star => (BinaryOp::Mul, Level::Multiply),
        T::Slash => (BinaryOp::Div, Level::Multiply),
        T::Percent => (BinaryOp::Mod, Level::Multiply),
        T::StarStar => (BinaryOp::Pow, Level::Exponentiation),
        _ => return None,
    };
    Some(entry)
}

pub(crate) fn assign_op(kind: TokenKind) -> Option<AssignOp> {
    use TokenKind as T;
    Some(match kind {
        T::Eq => AssignOp::Assign,
        T::PlusEq => AssignOp::AddAssign,
        T::MinusEq => AssignOp::SubAssign,
        T::StarEq => AssignOp::MulAssign,
        T::SlashEq => AssignOp::DivAssign,
        T::PercentEq => AssignOp::ModAssign,
        T::StarStarEq => AssignOp::PowAssign,
        T::LtLtEq => AssignOp::ShlAssign,
        T::GtGtEq => AssignOp::ShrAssign,
        T::GtGtGtEq => AssignOp::UShrAssign,
        T::PipeEq => AssignOp::BitOrAssign,
        T::CaretEq => AssignOp::BitXorAssign,
        T::AmpEq => AssignOp::BitAndAssign,
        T::AmpAmpEq => AssignOp::AndAssign,
        T::PipePipeEq => AssignOp::OrAssign,
        T::QuestionQuestionEq => AssignOp::NullishAssign,
        _ => return None,
    })
}

impl<'a> Parser<'a> {
    // =========================================================================
    // Expression Parsing
    // =========================================================================

    /// Parse an expression whose operators all bind tighter than `level`.
    pub(crate) fn parse_expr(&mut self, level: Level) -> Result<Expr, ParseError> {
        let left = self.parse_prefix(level)?;
        self.parse_suffix(left, level)
    }

    /// Parse with `in` allowed again, as inside brackets and parentheses.
    fn parse_expr_allow_in(&mut self, level: Level) -> Result<Expr, ParseError> {
        let old = std::mem::replace(&mut self.allow_in, true);
        let result = self.parse_expr(level);
        self.allow_in = old;
        result
    }

    fn parse_prefix(&mut self, level: Level) -> Result<Expr, ParseError> {
        let start = self.lexer.loc();
        let span = self.lexer.span();

        match self.lexer.kind() {
            TokenKind::Super => {
                self.next()?;
                Ok(Expr::new(ExprKind::Super, span))
            }
            TokenKind::This => {
                self.next()?;
                Ok(Expr::new(ExprKind::This, span))
            }
            TokenKind::Null => {
                self.next()?;
                Ok(Expr::new(ExprKind::Null, span))
            }
            TokenKind::True | TokenKind::False => {
                let value = self.check(TokenKind::True);
                self.next()?;
                Ok(Expr::new(ExprKind::Bool(value), span))
            }
            TokenKind::Number => {
                let value = self.lexer.number();
                self.next()?;
                Ok(Expr::new(ExprKind::Number(value), span))
            }
            TokenKind::BigInt => {
                let raw = self.lexer.raw();
                let digits = raw.strip_suffix('n').unwrap_or(raw).to_string();
                self.next()?;
                Ok(Expr::new(ExprKind::BigInt(digits), span))
            }
            TokenKind::String => {
                let value = self.lexer.string_value();
                self.next()?;
                Ok(Expr::new(ExprKind::String(value), span))
            }
            TokenKind::TemplateNoSub | TokenKind::TemplateHead => self.parse_template(),
            TokenKind::Slash | TokenKind::SlashEq => {
                self.lexer.scan_regexp()?;
                let raw = self.lexer.raw().to_string();
                self.next()?;
                Ok(Expr::new(ExprKind::Regex(raw), self.span_from(start)))
            }
            TokenKind::PrivateIdentifier => {
                // Only valid as "#x in y"
                let name = self.lexer.identifier().into_owned();
                self.next()?;
                if !self.check(TokenKind::In) {
                    return Err(ParseError::new(format!("Unexpected \"#{name}\""), span));
                }
                Ok(Expr::new(ExprKind::PrivateName(name), span))
            }

            // Arrow functions can't appear in the middle of an expression
            TokenKind::LParen if level > Level::Assign => {
                self.next()?;
                let old_allow_in = std::mem::replace(&mut self.allow_in, true);
                let value = self.parse_expr(Level::Lowest)?;
                self.allow_in = old_allow_in;
                self.expect(TokenKind::RParen)?;
                Ok(value)
            }
            TokenKind::LParen => self.parse_paren_expr(start, level, false, false),
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_object_literal(),
            TokenKind::Function => {
                self.next()?;
                self.parse_fn_expr(start, false)
            }
            TokenKind::Class => {
                self.next()?;
                self.parse_class_expr(start, Vec::new())
            }
            TokenKind::At if self.options.allow_decorators => {
                let scope = self.current_scope;
                let decorators = self.parse_decorators(scope)?;
                if !self.check(TokenKind::Class) {
                    return Err(self.lexer.expected("class"));
                }
                self.next()?;
                self.parse_class_expr(start, decorators)
            }
            TokenKind::New => self.parse_new_expr(start),
            TokenKind::Import => self.parse_import_expr(start),

            // Unary operators
            TokenKind::Minus
            | TokenKind::Plus
            | TokenKind::Bang
            | TokenKind::Tilde
            | TokenKind::Typeof
            | TokenKind::Void
            | TokenKind::Delete => {
                let op = match self.lexer.kind() {
                    TokenKind::Minus => UnaryOp::Minus,
                    TokenKind::Plus => UnaryOp::Plus,
                    TokenKind::Bang => UnaryOp::Not,
                    TokenKind::Tilde => UnaryOp::BitNot,
                    TokenKind::Typeof => UnaryOp::Typeof,
                    TokenKind::Void => UnaryOp::Void,
                    _ => UnaryOp::Delete,
                };
                self.next()?;
                let arg = self.parse_expr(Level::Prefix)?;
                if self.check(TokenKind::StarStar) {
                    return Err(self.lexer.unexpected());
                }
                Ok(Expr::new(
                    ExprKind::Unary {
                        op,
                        arg: Box::new(arg),
                    },
                    self.span_from(start),
                ))
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = if self.check(TokenKind::PlusPlus) {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                self.next()?;
                let arg = self.parse_expr(Level::Prefix)?;
                Ok(Expr::new(
                    ExprKind::Update {
                        op,
                        prefix: true,
                        arg: Box::new(arg),
                    },
                    self.span_from(start),
                ))
            }

            // "<T>(x) => x" or "<T>x"
            TokenKind::Lt if self.options.typescript => {
                if level <= Level::Assign {
                    let result = self.try_skip_type_script_type_parameters_then_open_paren_with_backtracking();
                    if result != TypeParamResult::NoMatch {
                        let force_arrow = result == TypeParamResult::DefinitelyTypeParameters;
                        return self.parse_paren_expr(start, level, false, force_arrow);
                    }
                }
                self.next()?;
                self.skip_type_script_type(Level::Lowest)?;
                self.lexer.expect_greater_than()?;
                self.parse_prefix(level)
            }

            TokenKind::Identifier => self.parse_identifier_prefix(start, level),

            _ => Err(self.lexer.unexpected()),
        }
    }

    /// `async`, `await`, `yield` and plain identifiers, including the
    /// single-parameter arrow `x => ...`.
    fn parse_identifier_prefix(&mut self, start: u32, level: Level) -> Result<Expr, ParseError> {
        let span = self.lexer.span();

        if self.lexer.is_contextual_keyword("async") {
            let next = self.peek_token();
            if !next.has_newline_before {
                match next.kind {
                    TokenKind::Function => {
                        self.next()?;
                        self.next()?;
                        return self.parse_fn_expr(start, true);
                    }
                    TokenKind::Identifier if level <= Level::Assign => {
                        // "async x => y"
                        let snapshot = self.lexer.snapshot();
                        self.next()?;
                        let (name, name_span) = self.expect_identifier()?;
                        if self.check(TokenKind::Arrow) {
                            return self.parse_single_param_arrow(start, name, name_span, true);
                        }
                        self.lexer.restore(snapshot);
                    }
                    TokenKind::LParen => {
                        self.next()?;
                        return self.parse_paren_expr(start, level, true, false);
                    }
                    TokenKind::Lt if self.options.typescript && level <= Level::Assign => {
                        // "async <T>(x) => x"
                        self.next()?;
                        let result =
                            self.try_skip_type_script_type_parameters_then_open_paren_with_backtracking();
                        if result != TypeParamResult::NoMatch {
                            return self.parse_paren_expr(start, level, true, true);
                        }
                        return Ok(Expr::ident("async", span));
                    }
                    _ => {}
                }
            }
        }

        if self.lexer.is_contextual_keyword("await") && self.fn_ctx.allow_await {
            self.next()?;
            let arg = self.parse_expr(Level::Prefix)?;
            return Ok(Expr::new(
                ExprKind::Await(Box::new(arg)),
                self.span_from(start),
            ));
        }

        if self.lexer.is_contextual_keyword("yield") && self.fn_ctx.allow_yield {
            if level > Level::Assign {
                return Err(ParseError::new("Cannot use a \"yield\" expression here without parentheses", span));
            }
            self.next()?;
            let delegate = self.check(TokenKind::Star) && !self.lexer.has_newline_before();
            if delegate {
                self.next()?;
            }
            let has_arg = delegate
                || !(self.lexer.has_newline_before()
                    || matches!(
                        self.lexer.kind(),
                        TokenKind::RParen
                            | TokenKind::RBracket
                            | TokenKind::RBrace
                            | TokenKind::Comma
                            | TokenKind::Colon
                            | TokenKind::Semicolon
                            | TokenKind::Eof
                    ));
            let arg = if has_arg {
                Some(Box::new(self.parse_expr(Level::Yield)?))
            } else {
                None
            };
            return Ok(Expr::new(
                ExprKind::Yield { arg, delegate },
                self.span_from(start),
            ));
        }

        let (name, name_span) = self.expect_identifier()?;
        if self.check(TokenKind::Arrow) && level <= Level::Assign {
            return self.parse_single_param_arrow(start, name, name_span, false);
        }
        Ok(Expr::ident(name, name_span))
    }

    /// Fold operators onto `left` while they bind tighter than `level`.
    pub(crate) fn parse_suffix(&mut self, mut left: Expr, level: Level) -> Result<Expr, ParseError> {
        loop {
            if self.forbid_suffix_after_as_loc == Some(self.lexer.loc()) {
                return Ok(left);
            }

            let start = left.span.start;
            let kind = self.lexer.kind();
            match kind {
                TokenKind::Dot => {
                    self.next()?;
                    let property = self.parse_member_name()?;
                    left = Expr::new(
                        ExprKind::Member {
                            object: Box::new(left),
                            property: Box::new(property),
                            computed: false,
                        },
                        self.span_from(start),
                    );
                }

                TokenKind::QuestionDot => {
                    self.next()?;
                    left = match self.lexer.kind() {
                        TokenKind::LBracket => {
                            self.next()?;
                            let index = self.parse_expr_allow_in(Level::Lowest)?;
                            self.expect(TokenKind::RBracket)?;
                            Expr::new(
                                ExprKind::OptionalMember {
                                    object: Box::new(left),
                                    property: Box::new(index),
                                    computed: true,
                                },
                                self.span_from(start),
                            )
                        }
                        TokenKind::LParen | TokenKind::Lt => {
                            if level >= Level::Call {
                                return Ok(left);
                            }
                            // "a?.<T>()"
                            if self.check(TokenKind::Lt) {
                                if !self.options.typescript {
                                    return Err(self.lexer.unexpected());
                                }
                                self.skip_type_script_type_arguments(false)?;
                            }
                            let args = self.parse_call_args()?;
                            Expr::new(
                                ExprKind::OptionalCall {
                                    callee: Box::new(left),
                                    args,
                                },
                                self.span_from(start),
                            )
                        }
                        _ => {
                            let property = self.parse_member_name()?;
                            Expr::new(
                                ExprKind::OptionalMember {
                                    object: Box::new(left),
                                    property: Box::new(property),
                                    computed: false,
                                },
                                self.span_from(start),
                            )
                        }
                    };
                }

                TokenKind::TemplateNoSub | TokenKind::TemplateHead => {
                    let quasi = self.parse_template()?;
                    left = Expr::new(
                        ExprKind::TaggedTemplate {
                            tag: Box::new(left),
                            quasi: Box::new(quasi),
                        },
                        self.span_from(start),
                    );
                }

                TokenKind::LBracket => {
                    self.next()?;
                    let index = self.parse_expr_allow_in(Level::Lowest)?;
                    self.expect(TokenKind::RBracket)?;
                    left = Expr::index(left, index, self.span_from(start));
                }

                TokenKind::LParen => {
                    if level >= Level::Call {
                        return Ok(left);
                    }
                    let args = self.parse_call_args()?;
                    left = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(left),
                            args,
                        },
                        self.span_from(start),
                    );
                }

                TokenKind::Question => {
                    if level >= Level::Conditional {
                        return Ok(left);
                    }
                    self.next()?;

                    // "(a?) => {}", "(a?: b) => {}", "(a?, b?) => {}"
                    if self.options.typescript
                        && self.latest_arrow_arg_loc == Some(left.span.start)
                        && matches!(
                            self.lexer.kind(),
                            TokenKind::Colon | TokenKind::RParen | TokenKind::Comma
                        )
                    {
                        self.invalid_expr_after_question = Some(self.lexer.span());
                        return Ok(left);
                    }

                    let consequent = self.parse_expr_allow_in(Level::Comma)?;
                    self.expect(TokenKind::Colon)?;
                    let alternate = self.parse_expr(Level::Comma)?;
                    left = Expr::new(
                        ExprKind::Conditional {
                            test: Box::new(left),
                            consequent: Box::new(consequent),
                            alternate: Box::new(alternate),
                        },
                        self.span_from(start),
                    );
                }

                // "x!" asserts non-null and erases to "x"
                TokenKind::Bang if self.options.typescript => {
                    if self.lexer.has_newline_before() {
                        return Ok(left);
                    }
                    self.next()?;
                }

                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    if self.lexer.has_newline_before() || level >= Level::Postfix {
                        return Ok(left);
                    }
                    let op = if kind == TokenKind::PlusPlus {
                        UpdateOp::Increment
                    } else {
                        UpdateOp::Decrement
                    };
                    self.next()?;
                    left = Expr::new(
                        ExprKind::Update {
                            op,
                            prefix: false,
                            arg: Box::new(left),
                        },
                        self.span_from(start),
                    );
                }

                TokenKind::Comma => {
                    if level >= Level::Comma {
                        return Ok(left);
                    }
                    self.next()?;
                    let right = self.parse_expr(Level::Comma)?;
                    let span = left.span.to(right.span);
                    left = match left.kind {
                        ExprKind::Sequence(mut exprs) => {
                            exprs.push(right);
                            Expr::new(ExprKind::Sequence(exprs), span)
                        }
                        _ => Expr::new(ExprKind::Sequence(vec![left, right]), span),
                    };
                }

                TokenKind::Lt
                    if self.options.typescript
                        && self.try_skip_type_script_type_arguments_with_backtracking() =>
                {
                    // "f<T>(x)", "new Foo<T>()", "f<T>"
                }

                TokenKind::In if !self.allow_in => return Ok(left),

                TokenKind::Identifier if self.options.typescript => {
                    let is_cast = (self.lexer.is_contextual_keyword("as")
                        || self.lexer.is_contextual_keyword("satisfies"))
                        && !self.lexer.has_newline_before()
                        && level < Level::Compare;
                    if !is_cast {
                        return Ok(left);
                    }
                    self.next()?;
                    if self.check(TokenKind::Const) {
                        // "x as const"
                        self.next()?;
                    } else {
                        self.skip_type_script_type(Level::Lowest)?;
                    }

                    // These tokens cannot follow a cast: "x as T++" is an error
                    let forbidden = matches!(
                        self.lexer.kind(),
                        TokenKind::PlusPlus
                            | TokenKind::MinusMinus
                            | TokenKind::TemplateNoSub
                            | TokenKind::TemplateHead
                            | TokenKind::LParen
                            | TokenKind::LBracket
                            | TokenKind::QuestionDot
                    ) || assign_op(self.lexer.kind()).is_some();
                    if forbidden {
                        self.forbid_suffix_after_as_loc = Some(self.lexer.loc());
                        return Ok(left);
                    }
                }

                _ => {
                    if let Some(op) = assign_op(kind) {
                        if level >= Level::Assign {
                            return Ok(left);
                        }
                        self.next()?;
                        let right = self.parse_expr(Level::Assign.below())?;
                        let span = left.span.to(right.span);
                        left = Expr::new(
                            ExprKind::Assign {
                                op,
                                left: Box::new(left),
                                right: Box::new(right),
                            },
                            span,
                        );
                        continue;
                    }

                    let Some((op, op_level)) = binary_op(kind) else {
                        return Ok(left);
                    };
                    // "**" is right-associative
                    let right_level = if op == BinaryOp::Pow {
                        if level >= op_level {
                            return Ok(left);
                        }
                        op_level.below()
                    } else {
                        if level >= op_level {
                            return Ok(left);
                        }
                        op_level
                    };
                    self.next()?;
                    let right = self.parse_expr(right_level)?;
                    left = Expr::binary(op, left, right);
                }
            }
        }
    }

    /// Property name after `.` or `?.`.
    fn parse_member_name(&mut self) -> Result<Expr, ParseError> {
        let span = self.lexer.span();
        if self.check(TokenKind::PrivateIdentifier) {
            let name = format!("#{}", self.lexer.identifier());
            self.next()?;
            return Ok(Expr::ident(name, span));
        }
        let (name, span) = self.expect_identifier_or_keyword()?;
        Ok(Expr::ident(name, span))
    }

    /// `( args )`
    pub(crate) fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(TokenKind::LParen)?;
        let old_allow_in = std::mem::replace(&mut self.allow_in, true);
        let mut args = Vec::new();
        while !self.check(TokenKind::RParen) {
            let start = self.lexer.loc();
            let arg = if self.eat(TokenKind::Spread)? {
                let inner = self.parse_expr(Level::Comma)?;
                Expr::new(ExprKind::Spread(Box::new(inner)), self.span_from(start))
            } else {
                self.parse_expr(Level::Comma)?
            };
            args.push(arg);
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.allow_in = old_allow_in;
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    // =========================================================================
    // Primary Expressions
    // =========================================================================

    fn parse_template(&mut self) -> Result<Expr, ParseError> {
        let start = self.lexer.loc();
        let mut quasis = vec![self.lexer.template_raw().to_string()];
        let mut exprs = Vec::new();

        if self.check(TokenKind::TemplateHead) {
            self.next()?;
            loop {
                exprs.push(self.parse_expr_allow_in(Level::Lowest)?);
                self.lexer.rescan_close_brace_as_template_token()?;
                quasis.push(self.lexer.template_raw().to_string());
                if self.check(TokenKind::TemplateTail) {
                    break;
                }
                self.next()?;
            }
        }
        self.next()?;

        Ok(Expr::new(
            ExprKind::Template { quasis, exprs },
            self.span_from(start),
        ))
    }

    fn parse_array_literal(&mut self) -> Result<Expr, ParseError> {
        let start = self.lexer.loc();
        self.expect(TokenKind::LBracket)?;
        let old_allow_in = std::mem::replace(&mut self.allow_in, true);

        let mut elements = Vec::new();
        while !self.check(TokenKind::RBracket) {
            if self.eat(TokenKind::Comma)? {
                elements.push(None);
                continue;
            }
            let item_start = self.lexer.loc();
            let item = if self.eat(TokenKind::Spread)? {
                let inner = self.parse_expr(Level::Comma)?;
                Expr::new(ExprKind::Spread(Box::new(inner)), self.span_from(item_start))
            } else {
                self.parse_expr(Level::Comma)?
            };
            elements.push(Some(item));
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }

        self.allow_in = old_allow_in;
        self.expect(TokenKind::RBracket)?;
        Ok(Expr::new(ExprKind::Array(elements), self.span_from(start)))
    }

    fn parse_object_literal(&mut self) -> Result<Expr, ParseError> {
        let start = self.lexer.loc();
        self.expect(TokenKind::LBrace)?;
        let old_allow_in = std::mem::replace(&mut self.allow_in, true);

        let mut properties = Vec::new();
        while !self.check(TokenKind::RBrace) {
            properties.push(self.parse_property()?);
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }

        self.allow_in = old_allow_in;
        self.expect(TokenKind::RBrace)?;
        Ok(Expr::new(ExprKind::Object(properties), self.span_from(start)))
    }

    fn parse_property(&mut self) -> Result<Property, ParseError> {
        let start = self.lexer.loc();

        if self.eat(TokenKind::Spread)? {
            let value = self.parse_expr(Level::Comma)?;
            return Ok(Property {
                key: PropertyKey::Ident(String::new()),
                value,
                kind: PropertyKind::Spread,
                shorthand: false,
                initializer: None,
                span: self.span_from(start),
            });
        }

        // "async foo() {}", "get foo() {}", "set foo(v) {}"
        let mut is_async = false;
        let mut kind = PropertyKind::Init;
        if self.check(TokenKind::Identifier) && matches!(self.lexer.raw(), "async" | "get" | "set") {
            let next = self.peek_token();
            let starts_key = next.kind.is_keyword()
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
            let is_async_word = self.lexer.raw() == "async";
            if starts_key && !(is_async_word && next.has_newline_before) {
                match self.lexer.raw() {
                    "async" => is_async = true,
                    "get" => kind = PropertyKind::Get,
                    _ => kind = PropertyKind::Set,
                }
                self.next()?;
            }
        }
        let is_generator = self.eat(TokenKind::Star)?;

        let is_identifier = self.check(TokenKind::Identifier);
        let key_span = self.lexer.span();
        let key = self.parse_property_key()?;

        let is_method = is_async
            || is_generator
            || kind != PropertyKind::Init
            || self.check(TokenKind::LParen)
            || (self.options.typescript && self.check(TokenKind::Lt));
        if is_method {
            self.push_scope(ScopeKind::FunctionArgs);
            if self.options.typescript {
                self.skip_type_script_type_parameters(TypeParameterFlags::ALLOW_CONST_MODIFIER)?;
            }
            let func = self.parse_fn_required(
                start,
                None,
                FnOpts {
                    is_async,
                    is_generator,
                    ..FnOpts::default()
                },
            )?;
            let span = func.span;
            return Ok(Property {
                key,
                value: Expr::new(ExprKind::Function(Box::new(func)), span),
                kind: if kind == PropertyKind::Init {
                    PropertyKind::Method
                } else {
                    kind
                },
                shorthand: false,
                initializer: None,
                span: self.span_from(start),
            });
        }

        if self.eat(TokenKind::Colon)? {
            let value = self.parse_expr(Level::Comma)?;
            return Ok(Property {
                key,
                value,
                kind: PropertyKind::Init,
                shorthand: false,
                initializer: None,
                span: self.span_from(start),
            });
        }

        // Shorthand "{ a }" or "{ a = 1 }" (the latter only in patterns)
        let name = match &key {
            PropertyKey::Ident(name) if is_identifier => name.clone(),
            _ => return Err(self.lexer.expected(":")),
        };
        let initializer = if self.eat(TokenKind::Eq)? {
            Some(self.parse_expr(Level::Comma)?)
        } else {
            None
        };
        Ok(Property {
            key,
            value: Expr::ident(name, key_span),
            kind: PropertyKind::Init,
            shorthand: true,
            initializer,
            span: self.span_from(start),
        })
    }

    /// Object literal and class member keys.
    pub(crate) fn parse_property_key(&mut self) -> Result<PropertyKey, ParseError> {
        let key = match self.lexer.kind() {
            TokenKind::String => PropertyKey::String(self.lexer.string_value()),
            TokenKind::Number => PropertyKey::Number(self.lexer.number()),
            TokenKind::BigInt => {
                let raw = self.lexer.raw();
                PropertyKey::BigInt(raw.strip_suffix('n').unwrap_or(raw).to_string())
            }
            TokenKind::PrivateIdentifier => PropertyKey::Private(self.lexer.identifier().into_owned()),
            TokenKind::LBracket => {
                self.next()?;
                let expr = self.parse_expr_allow_in(Level::Comma)?;
                self.expect(TokenKind::RBracket)?;
                return Ok(PropertyKey::Computed(Box::new(expr)));
            }
            _ if self.lexer.is_identifier_or_keyword() => {
                PropertyKey::Ident(self.lexer.identifier().into_owned())
            }
            _ => return Err(self.lexer.unexpected()),
        };
        self.next()?;
        Ok(key)
    }

    fn parse_fn_expr(&mut self, start: u32, is_async: bool) -> Result<Expr, ParseError> {
        let is_generator = self.eat(TokenKind::Star)?;
        self.push_scope(ScopeKind::FunctionArgs);

        // The name of a function expression is only visible inside it
        let name = if self.check(TokenKind::Identifier) {
            let (text, span) = self.expect_identifier()?;
            let kind = if is_async || is_generator {
                SymbolKind::GeneratorOrAsyncFunction
            } else {
                SymbolKind::HoistedFunction
            };
            let symbol = self.declare_symbol(kind, span, &text);
            Some(BindingIdent {
                name: text,
                symbol,
                span,
            })
        } else {
            None
        };

        if self.options.typescript {
            self.skip_type_script_type_parameters(TypeParameterFlags::ALLOW_CONST_MODIFIER)?;
        }
        let func = self.parse_fn_required(
            start,
            name,
            FnOpts {
                is_async,
                is_generator,
                ..FnOpts::default()
            },
        )?;
        Ok(Expr::new(
            ExprKind::Function(Box::new(func)),
            self.span_from(start),
        ))
    }

    /// [`Parser::parse_fn`] for functions that must have a body.
    fn parse_fn_required(
        &mut self,
        start: u32,
        name: Option<BindingIdent>,
        opts: FnOpts,
    ) -> Result<Function, ParseError> {
        match self.parse_fn(start, name, opts)? {
            Some(func) => Ok(func),
            None => Err(self.lexer.expected("{")),
        }
    }

    fn parse_class_expr(&mut self, start: u32, decorators: Vec<Decorator>) -> Result<Expr, ParseError> {
        let name = if self.check(TokenKind::Identifier)
            && !(self.options.typescript && self.lexer.is_contextual_keyword("implements"))
        {
            let (text, span) = self.expect_identifier()?;
            ClassName::Inner(text, span)
        } else {
            ClassName::Anonymous
        };
        let class = self.parse_class(start, name, decorators, false)?;
        Ok(Expr::new(
            ExprKind::Class(Box::new(class)),
            self.span_from(start),
        ))
    }

    fn parse_new_expr(&mut self, start: u32) -> Result<Expr, ParseError> {
        self.next()?;

        // "new.target"
        if self.eat(TokenKind::Dot)? {
            let (property, _) = self.expect_identifier()?;
            if property != "target" {
                return Err(ParseError::new(
                    format!("Unexpected \"{property}\""),
                    self.span_from(start),
                ));
            }
            return Ok(Expr::new(
                ExprKind::MetaProperty {
                    meta: "new".to_string(),
                    property,
                },
                self.span_from(start),
            ));
        }

        let callee = self.parse_expr(Level::Member)?;
        let args = if self.check(TokenKind::LParen) {
            self.parse_call_args()?
        } else {
            Vec::new()
        };
        Ok(Expr::new(
            ExprKind::New {
                callee: Box::new(callee),
                args,
            },
            self.span_from(start),
        ))
    }

    fn parse_import_expr(&mut self, start: u32) -> Result<Expr, ParseError> {
        self.next()?;

        // "import.meta"
        if self.eat(TokenKind::Dot)? {
            let (property, _) = self.expect_identifier()?;
            return Ok(Expr::new(
                ExprKind::MetaProperty {
                    meta: "import".to_string(),
                    property,
                },
                self.span_from(start),
            ));
        }

        self.expect(TokenKind::LParen)?;
        let old_allow_in = std::mem::replace(&mut self.allow_in, true);
        let source = self.parse_expr(Level::Comma)?;
        let options = if self.eat(TokenKind::Comma)? && !self.check(TokenKind::RParen) {
            let options = self.parse_expr(Level::Comma)?;
            self.eat(TokenKind::Comma)?;
            Some(Box::new(options))
        } else {
            None
        };
        self.allow_in = old_allow_in;
        self.expect(TokenKind::RParen)?;
        Ok(Expr::new(
            ExprKind::Import(Box::new(source), options),
            self.span_from(start),
        ))
    }

    // =========================================================================
    // Parentheses and Arrow Functions
    // =========================================================================

    /// Parse `( ... )` as a parenthesized expression, an arrow function's
    /// parameter list, or (after `async`) a call to a function named
    /// `async`. Nothing is declared until the arrow decision is made.
    fn parse_paren_expr(
        &mut self,
        start: u32,
        level: Level,
        is_async: bool,
        force_arrow: bool,
    ) -> Result<Expr, ParseError> {
        let scope_mark = self.scopes.len();
        let outer_scope = self.current_scope;
        self.expect(TokenKind::LParen)?;

        let old_allow_in = std::mem::replace(&mut self.allow_in, true);
        let old_arrow_arg_loc = self.latest_arrow_arg_loc;
        let old_invalid_question = self.invalid_expr_after_question.take();

        let mut items = Vec::new();
        let mut spread_span = None;
        let mut type_colon_span = None;
        while !self.check(TokenKind::RParen) {
            let item_start = self.lexer.loc();
            self.latest_arrow_arg_loc = Some(item_start);

            let mut item = if self.check(TokenKind::Spread) {
                spread_span = Some(self.lexer.span());
                self.next()?;
                let inner = self.parse_expr(Level::Comma)?;
                Expr::new(ExprKind::Spread(Box::new(inner)), self.span_from(item_start))
            } else {
                self.parse_expr(Level::Comma)?
            };

            // "(x: T) => x"
            if self.options.typescript && self.check(TokenKind::Colon) {
                type_colon_span = Some(self.lexer.span());
                self.next()?;
                self.skip_type_script_type(Level::Lowest)?;
            }

            // "(x: T = 1) => x", but not "(x as T = 1)"
            if self.options.typescript
                && self.check(TokenKind::Eq)
                && self.forbid_suffix_after_as_loc != Some(self.lexer.loc())
            {
                self.next()?;
                let value = self.parse_expr(Level::Comma)?;
                item = Expr::assign(item, value);
            }

            items.push(item);
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        let close_span = self.lexer.span();
        self.expect(TokenKind::RParen)?;

        self.allow_in = old_allow_in;
        self.latest_arrow_arg_loc = old_arrow_arg_loc;
        let invalid_question = std::mem::replace(&mut self.invalid_expr_after_question, old_invalid_question);

        let may_be_arrow = force_arrow
            || self.check(TokenKind::Arrow)
            || (self.options.typescript && self.check(TokenKind::Colon));
        if may_be_arrow {
            if level > Level::Assign {
                return Err(self.lexer.unexpected());
            }

            let mut invalid = None;
            let mut params = Vec::with_capacity(items.len());
            for item in &items {
                match self.expr_to_param(item.clone()) {
                    Ok(param) => params.push(param),
                    Err(span) => {
                        invalid.get_or_insert(span);
                    }
                }
            }

            // "a ? (b) : c" must not become an arrow with a return type, so
            // only take the ":" path when every item converted cleanly
            let is_arrow = self.check(TokenKind::Arrow)
                || (invalid.is_none()
                    && self.options.typescript
                    && self.check(TokenKind::Colon)
                    && self.try_skip_type_script_arrow_return_type_with_backtracking())
                || force_arrow;
            if is_arrow {
                if let Some(span) = invalid {
                    self.add_error(span, "Invalid binding pattern");
                }
                if spread_span.is_some() && items.last().is_some_and(|item| !matches!(item.kind, ExprKind::Spread(_))) {
                    self.add_error(close_span, "Unexpected \",\" after rest pattern");
                }

                let args_scope = self.push_scope(ScopeKind::FunctionArgs);
                self.scopes.reparent_from(scope_mark, outer_scope, args_scope);
                for param in &mut params {
                    self.declare_binding(SymbolKind::Hoisted, &mut param.binding, Default::default());
                }
                return self.parse_arrow_body(start, params, is_async, args_scope);
            }
        }

        if let Some(span) = type_colon_span {
            self.add_error(span, "Unexpected \":\"");
            return Err(ParseError::logged(span));
        }

        if is_async {
            let callee = Expr::ident("async", Span::new(start, start + 5));
            return Ok(Expr::new(
                ExprKind::Call {
                    callee: Box::new(callee),
                    args: items,
                },
                self.span_from(start),
            ));
        }

        if let Some(span) = invalid_question {
            let text = self.lexer.text(span).to_string();
            self.add_error(span, format!("Unexpected \"{text}\""));
        }

        let mut items = items.into_iter();
        let Some(first) = items.next() else {
            return Err(self.lexer.expected("=>"));
        };
        if let Some(spread) = spread_span {
            return Err(ParseError::new("Unexpected \"...\"", spread));
        }
        let rest: Vec<Expr> = items.collect();
        if rest.is_empty() {
            return Ok(first);
        }
        let mut exprs = Vec::with_capacity(rest.len() + 1);
        exprs.push(first);
        exprs.extend(rest);
        Ok(Expr::new(ExprKind::Sequence(exprs), Span::new(start, close_span.end)))
    }

    /// `x => ...` once `x` and the arrow are known.
    fn parse_single_param_arrow(
        &mut self,
        start: u32,
        name: String,
        span: Span,
        is_async: bool,
    ) -> Result<Expr, ParseError> {
        let args_scope = self.push_scope(ScopeKind::FunctionArgs);
        let symbol = self.declare_symbol(SymbolKind::Hoisted, span, &name);
        let param = Param {
            binding: Binding::new(BindingKind::Ident(BindingIdent { name, symbol, span }), span),
            default: None,
            rest: false,
            decorators: Vec::new(),
            is_parameter_property: false,
            span,
        };
        self.parse_arrow_body(start, vec![param], is_async, args_scope)
    }

    /// Parse `=> body` and pop the arrow's `FunctionArgs` scope.
    fn parse_arrow_body(
        &mut self,
        start: u32,
        params: Vec<Param>,
        is_async: bool,
        args_scope: ScopeId,
    ) -> Result<Expr, ParseError> {
        if self.lexer.has_newline_before() {
            self.add_error(self.lexer.span(), "Unexpected newline before \"=>\"");
        }
        self.expect(TokenKind::Arrow)?;

        let old_ctx = self.fn_ctx;
        self.fn_ctx.allow_await = is_async;
        self.fn_ctx.allow_yield = false;
        self.fn_ctx.allow_return = true;

        let (body, body_scope) = if self.check(TokenKind::LBrace) {
            let (stmts, scope) = self.parse_fn_body()?;
            (ArrowBody::Block(stmts), scope)
        } else {
            let scope = self.push_scope(ScopeKind::FunctionBody);
            let expr = self.parse_expr(Level::Comma)?;
            self.pop_scope();
            (ArrowBody::Expr(Box::new(expr)), scope)
        };

        self.fn_ctx = old_ctx;
        self.pop_scope();

        let span = self.span_from(start);
        Ok(Expr::new(
            ExprKind::Arrow(Box::new(ArrowFunction {
                params,
                body,
                is_async,
                args_scope,
                body_scope,
                span,
            })),
            span,
        ))
    }

    fn expr_to_param(&self, expr: Expr) -> Result<Param, Span> {
        let span = expr.span;
        let (binding, default, rest) = match expr.kind {
            ExprKind::Spread(inner) => (self.expr_to_binding(*inner)?, None, true),
            ExprKind::Assign {
                op: AssignOp::Assign,
                left,
                right,
            } => (self.expr_to_binding(*left)?, Some(*right), false),
            kind => (self.expr_to_binding(Expr::new(kind, span))?, None, false),
        };
        Ok(Param {
            binding,
            default,
            rest,
            decorators: Vec::new(),
            is_parameter_property: false,
            span,
        })
    }

    /// Reinterpret an expression as a binding pattern, returning the span
    /// of the first piece that cannot be one.
    pub(crate) fn expr_to_binding(&self, expr: Expr) -> Result<Binding, Span> {
        let span = expr.span;
        match expr.kind {
            ExprKind::Ident(name) => Ok(Binding::new(
                BindingKind::Ident(BindingIdent {
                    name,
                    symbol: Ref::INVALID,
                    span,
                }),
                span,
            )),
            ExprKind::Array(items) => {
                let mut elements = Vec::with_capacity(items.len());
                for item in items {
                    let Some(item) = item else {
                        elements.push(None);
                        continue;
                    };
                    let item_span = item.span;
                    let element = match item.kind {
                        ExprKind::Spread(inner) => ArrayPatternElement {
                            binding: self.expr_to_binding(*inner)?,
                            default: None,
                            rest: true,
                        },
                        ExprKind::Assign {
                            op: AssignOp::Assign,
                            left,
                            right,
                        } => ArrayPatternElement {
                            binding: self.expr_to_binding(*left)?,
                            default: Some(*right),
                            rest: false,
                        },
                        kind => ArrayPatternElement {
                            binding: self.expr_to_binding(Expr::new(kind, item_span))?,
                            default: None,
                            rest: false,
                        },
                    };
                    elements.push(Some(element));
                }
                Ok(Binding::new(BindingKind::Array { elements }, span))
            }
            ExprKind::Object(props) => {
                let mut properties = Vec::with_capacity(props.len());
                for prop in props {
                    match prop.kind {
                        PropertyKind::Spread => properties.push(ObjectPatternProperty {
                            key: PropertyKey::Ident(String::new()),
                            value: self.expr_to_binding(prop.value)?,
                            default: None,
                            shorthand: false,
                            rest: true,
                        }),
                        PropertyKind::Init => {
                            let (value, default) = match prop.value.kind {
                                ExprKind::Assign {
                                    op: AssignOp::Assign,
                                    left,
                                    right,
                                } if !prop.shorthand => (self.expr_to_binding(*left)?, Some(*right)),
                                _ => (self.expr_to_binding(prop.value)?, prop.initializer),
                            };
                            properties.push(ObjectPatternProperty {
                                key: prop.key,
                                value,
                                default,
                                shorthand: prop.shorthand,
                                rest: false,
                            });
                        }
                        _ => return Err(prop.span),
                    }
                }
                Ok(Binding::new(BindingKind::Object { properties }, span))
            }
            _ => Err(span),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::options::ParserOptions;
    use crate::parser::Parser;

    fn parse_expr_stmt(source: &str) -> Expr {
        let (ast, log) = Parser::new(source, ParserOptions::default()).parse();
        assert!(log.is_empty(), "unexpected diagnostics: {log:?}");
        let mut ast = ast.expect("parse failed");
        match ast.stmts.remove(0).kind {
            StmtKind::Expr(expr) => expr,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn test_binary_expression() {
        let expr = parse_expr_stmt("1 + 2 * 3;");
        let ExprKind::Binary { op, right, .. } = expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_exponent_is_right_associative() {
        let expr = parse_expr_stmt("a ** b ** c;");
        let ExprKind::Binary { left, right, .. } = expr.kind else {
            panic!("expected binary");
        };
        assert!(matches!(left.kind, ExprKind::Ident(_)));
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Pow, .. }));
    }

    #[test]
    fn test_arrow_function() {
        let expr = parse_expr_stmt("(a, { b }, ...c) => a;");
        let ExprKind::Arrow(arrow) = expr.kind else {
            panic!("expected arrow");
        };
        assert_eq!(arrow.params.len(), 3);
        assert!(arrow.params[2].rest);
    }

    #[test]
    fn test_type_arguments_on_call_are_skipped() {
        let expr = parse_expr_stmt("f<number>(x);");
        let ExprKind::Call { callee, args } = expr.kind else {
            panic!("expected call");
        };
        assert_eq!(callee.kind, ExprKind::Ident("f".into()));
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_less_than_chain_is_comparison() {
        let expr = parse_expr_stmt("a < b > c;");
        let ExprKind::Binary { op, left, .. } = expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Gt);
        assert!(matches!(left.kind, ExprKind::Binary { op: BinaryOp::Lt, .. }));
    }

    #[test]
    fn test_casts_are_erased() {
        let expr = parse_expr_stmt("(x as any).y satisfies T;");
        assert!(matches!(expr.kind, ExprKind::Member { .. }));
        let expr = parse_expr_stmt("<T>x;");
        assert_eq!(expr.kind, ExprKind::Ident("x".into()));
        let expr = parse_expr_stmt("x!.y;");
        assert!(matches!(expr.kind, ExprKind::Member { .. }));
    }

    #[test]
    fn test_typed_arrow_parameters() {
        let expr = parse_expr_stmt("(a?: number, b: string = 'x'): void => {};");
        let ExprKind::Arrow(arrow) = expr.kind else {
            panic!("expected arrow");
        };
        assert_eq!(arrow.params.len(), 2);
        assert!(arrow.params[1].default.is_some());
    }

    #[test]
    fn test_generic_arrow() {
        let expr = parse_expr_stmt("<T,>(x: T) => x;");
        assert!(matches!(expr.kind, ExprKind::Arrow(_)));
    }

    #[test]
    fn test_conditional_with_parens_is_not_an_arrow() {
        let expr = parse_expr_stmt("a ? (b) : c;");
        assert!(matches!(expr.kind, ExprKind::Conditional { .. }));
    }

    #[test]
    fn test_template_literal() {
        let expr = parse_expr_stmt("`a${b}c${d}e`;");
        let ExprKind::Template { quasis, exprs } = expr.kind else {
            panic!("expected template");
        };
        assert_eq!(quasis, vec!["a", "c", "e"]);
        assert_eq!(exprs.len(), 2);
    }

    #[test]
    fn test_regex_after_operator() {
        let expr = parse_expr_stmt("x = /ab+c/g;");
        let ExprKind::Assign { right, .. } = expr.kind else {
            panic!("expected assignment");
        };
        assert_eq!(right.kind, ExprKind::Regex("/ab+c/g".into()));
    }

    #[test]
    fn test_object_literal_forms() {
        let expr = parse_expr_stmt("({ a, b: 1, [c]: 2, d() {}, get e() { return 1; }, ...f });");
        let ExprKind::Object(props) = expr.kind else {
            panic!("expected object");
        };
        assert_eq!(props.len(), 6);
        assert_eq!(props[4].kind, PropertyKind::Get);
        assert_eq!(props[5].kind, PropertyKind::Spread);
    }
}
