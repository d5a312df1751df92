//! Lexer (tokenizer) for JavaScript/TypeScript.
//!
//! The lexer is driven by the parser one token at a time and always holds the
//! current token. That lets the parser make the context-sensitive calls the
//! grammar needs: rescanning `/` as a regular expression, rescanning `}` as a
//! template continuation, and splitting `>>` when a type argument list
//! closes.
//!
//! All mutable state lives in a `Copy` struct, so a [`LexerSnapshot`] is just
//! a copy of it and restoring is a single assignment.

use std::borrow::Cow;

use crate::error::ParseError;
use crate::span::Span;
use crate::token::{keyword_from_str, Token, TokenKind};

/// Saved lexer state for speculative parsing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexerSnapshot {
    state: LexerState,
}

impl LexerSnapshot {
    /// The token that was current when the snapshot was taken.
    pub fn token(&self) -> Token {
        self.state.token
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LexerState {
    /// Cursor just past the current token.
    pos: usize,
    token: Token,
    /// While set, the parser must not queue diagnostics.
    suppress_diagnostics: bool,
}

/// The lexer state.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    state: LexerState,
}

impl<'a> Lexer<'a> {
    /// Create a lexer positioned before the first token. Call [`Lexer::next`]
    /// to scan it.
    pub fn new(source: &'a str) -> Self {
        let mut pos = 0;
        if source.starts_with("#!") {
            pos = source.find('\n').unwrap_or(source.len());
        }
        Self {
            source,
            bytes: source.as_bytes(),
            state: LexerState {
                pos,
                token: Token::new(TokenKind::Eof, Span::at(0)),
                suppress_diagnostics: false,
            },
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    // === Current token ===

    #[inline]
    pub fn token(&self) -> Token {
        self.state.token
    }

    #[inline]
    pub fn kind(&self) -> TokenKind {
        self.state.token.kind
    }

    #[inline]
    pub fn span(&self) -> Span {
        self.state.token.span
    }

    #[inline]
    pub fn loc(&self) -> u32 {
        self.state.token.span.start
    }

    #[inline]
    pub fn has_newline_before(&self) -> bool {
        self.state.token.has_newline_before
    }

    #[inline]
    pub fn number(&self) -> f64 {
        self.state.token.number
    }

    /// Raw source text of the current token.
    pub fn raw(&self) -> &'a str {
        self.text(self.state.token.span)
    }

    pub fn text(&self, span: Span) -> &'a str {
        self.source
            .get(span.start as usize..span.end as usize)
            .unwrap_or("")
    }

    /// The current identifier's name with escapes decoded.
    pub fn identifier(&self) -> Cow<'a, str> {
        let raw = self.raw();
        let raw = raw.strip_prefix('#').unwrap_or(raw);
        if raw.contains('\\') {
            Cow::Owned(decode_escapes(raw))
        } else {
            Cow::Borrowed(raw)
        }
    }

    /// The cooked value of the current string literal.
    pub fn string_value(&self) -> String {
        let raw = self.raw();
        if raw.len() < 2 {
            return String::new();
        }
        decode_escapes(&raw[1..raw.len() - 1])
    }

    /// The cooked text of the current template token, without delimiters.
    pub fn template_text(&self) -> String {
        decode_escapes(self.template_raw())
    }

    /// The raw text of the current template token, without delimiters.
    pub fn template_raw(&self) -> &'a str {
        let raw = self.raw();
        let start = 1;
        let end = match self.kind() {
            TokenKind::TemplateHead | TokenKind::TemplateMiddle => raw.len().saturating_sub(2),
            _ => raw.len().saturating_sub(1),
        };
        raw.get(start..end.max(start)).unwrap_or("")
    }

    /// `true` when the current token is the identifier `word` spelled
    /// without escapes.
    pub fn is_contextual_keyword(&self, word: &str) -> bool {
        self.kind() == TokenKind::Identifier && self.raw() == word
    }

    pub fn is_identifier_or_keyword(&self) -> bool {
        self.kind() == TokenKind::Identifier || self.kind().is_keyword()
    }

    // === Snapshots ===

    pub fn snapshot(&self) -> LexerSnapshot {
        LexerSnapshot { state: self.state }
    }

    pub fn restore(&mut self, snapshot: LexerSnapshot) {
        self.state = snapshot.state;
    }

    pub fn diagnostics_suppressed(&self) -> bool {
        self.state.suppress_diagnostics
    }

    pub fn set_diagnostics_suppressed(&mut self, suppressed: bool) {
        self.state.suppress_diagnostics = suppressed;
    }

    // === Expectations ===

    pub fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.kind() != kind {
            return Err(self.expected(kind.as_str()));
        }
        self.next()
    }

    pub fn expect_contextual_keyword(&mut self, word: &str) -> Result<(), ParseError> {
        if !self.is_contextual_keyword(word) {
            return Err(self.expected(word));
        }
        self.next()
    }

    /// Consume `;`, or accept automatic semicolon insertion before `}`, end
    /// of file, or a line break.
    pub fn expect_or_insert_semicolon(&mut self) -> Result<(), ParseError> {
        match self.kind() {
            TokenKind::Semicolon => self.next(),
            TokenKind::RBrace | TokenKind::Eof => Ok(()),
            _ if self.has_newline_before() => Ok(()),
            _ => Err(self.expected(";")),
        }
    }

    /// Error for a missing token.
    pub fn expected(&self, what: &str) -> ParseError {
        let found = match self.kind() {
            TokenKind::Eof => "end of file".to_string(),
            _ => format!("\"{}\"", self.raw()),
        };
        ParseError::new(format!("Expected \"{what}\" but found {found}"), self.span())
    }

    /// Error for a token that cannot appear here.
    pub fn unexpected(&self) -> ParseError {
        match self.kind() {
            TokenKind::Eof => ParseError::new("Unexpected end of file", self.span()),
            _ => ParseError::new(format!("Unexpected \"{}\"", self.raw()), self.span()),
        }
    }

    /// Consume one `>`, splitting a longer token that starts with `>`.
    pub fn expect_greater_than(&mut self) -> Result<(), ParseError> {
        let rest = match self.kind() {
            TokenKind::Gt => return self.next(),
            TokenKind::GtEq => TokenKind::Eq,
            TokenKind::GtGt => TokenKind::Gt,
            TokenKind::GtGtEq => TokenKind::GtEq,
            TokenKind::GtGtGt => TokenKind::GtGt,
            TokenKind::GtGtGtEq => TokenKind::GtGtEq,
            _ => return Err(self.expected(">")),
        };
        self.split_first_char(rest);
        Ok(())
    }

    /// Consume one `<`, splitting a longer token that starts with `<`.
    pub fn expect_less_than(&mut self) -> Result<(), ParseError> {
        let rest = match self.kind() {
            TokenKind::Lt => return self.next(),
            TokenKind::LtEq => TokenKind::Eq,
            TokenKind::LtLt => TokenKind::Lt,
            TokenKind::LtLtEq => TokenKind::LtEq,
            _ => return Err(self.expected("<")),
        };
        self.split_first_char(rest);
        Ok(())
    }

    fn split_first_char(&mut self, rest: TokenKind) {
        let token = &mut self.state.token;
        token.kind = rest;
        token.span.start += 1;
        token.has_newline_before = false;
    }

    // === Rescans ===

    /// Rescan the current `/` or `/=` token as a regular expression literal.
    pub fn scan_regexp(&mut self) -> Result<(), ParseError> {
        let start = self.loc() as usize;
        let mut pos = start + 1;
        let mut in_class = false;
        loop {
            match self.bytes.get(pos).copied() {
                None | Some(b'\n') | Some(b'\r') => {
                    return Err(ParseError::new(
                        "Unterminated regular expression",
                        Span::new(start as u32, pos as u32),
                    ));
                }
                Some(b'/') if !in_class => break,
                Some(b'[') => in_class = true,
                Some(b']') => in_class = false,
                Some(b'\\') => pos += 1,
                _ => {}
            }
            pos += 1;
        }
        pos += 1;
        while pos < self.bytes.len() && is_id_continue_byte(self.bytes[pos]) {
            pos += 1;
        }
        self.state.pos = pos;
        self.state.token.kind = TokenKind::RegExp;
        self.state.token.span = Span::new(start as u32, pos as u32);
        Ok(())
    }

    /// Rescan the current `}` as the continuation of a template literal.
    pub fn rescan_close_brace_as_template_token(&mut self) -> Result<(), ParseError> {
        if self.kind() != TokenKind::RBrace {
            return Err(self.expected("}"));
        }
        let start = self.loc() as usize;
        let (kind, end) = self.scan_template_body(start + 1)?;
        self.state.token.kind = match kind {
            TokenKind::TemplateNoSub => TokenKind::TemplateTail,
            _ => TokenKind::TemplateMiddle,
        };
        self.state.token.span = Span::new(start as u32, end as u32);
        self.state.pos = end;
        Ok(())
    }

    // === Scanning ===

    /// Advance to the next token.
    pub fn next(&mut self) -> Result<(), ParseError> {
        let mut pos = self.state.pos;
        let mut has_newline_before = pos == 0;

        // Whitespace and comments
        loop {
            match self.bytes.get(pos).copied() {
                Some(b' ' | b'\t' | b'\x0b' | b'\x0c') => pos += 1,
                Some(b'\n' | b'\r') => {
                    has_newline_before = true;
                    pos += 1;
                }
                Some(b'/') if self.bytes.get(pos + 1) == Some(&b'/') => {
                    while let Some(&b) = self.bytes.get(pos) {
                        if b == b'\n' || b == b'\r' {
                            break;
                        }
                        pos += 1;
                    }
                }
                Some(b'/') if self.bytes.get(pos + 1) == Some(&b'*') => {
                    let body = &self.source[pos + 2..];
                    match body.find("*/") {
                        Some(end) => {
                            if body[..end].contains(['\n', '\r', '\u{2028}', '\u{2029}']) {
                                has_newline_before = true;
                            }
                            pos += end + 4;
                        }
                        None => {
                            return Err(ParseError::new(
                                "Expected \"*/\" to terminate multi-line comment",
                                Span::at(self.source.len() as u32),
                            ));
                        }
                    }
                }
                Some(b) if b >= 0x80 => {
                    let c = self.char_at(pos);
                    match c {
                        '\u{2028}' | '\u{2029}' => has_newline_before = true,
                        '\u{a0}' | '\u{feff}' | '\u{1680}' | '\u{2000}'..='\u{200a}'
                        | '\u{202f}' | '\u{205f}' | '\u{3000}' => {}
                        _ => break,
                    }
                    pos += c.len_utf8();
                }
                _ => break,
            }
        }

        let start = pos;
        let mut number = 0.0;
        let kind = match self.bytes.get(pos).copied() {
            None => TokenKind::Eof,
            Some(b) => {
                let (kind, end, value) = self.scan_token(start, b)?;
                pos = end;
                number = value;
                kind
            }
        };

        self.state.pos = pos;
        self.state.token = Token {
            kind,
            span: Span::new(start as u32, pos as u32),
            has_newline_before,
            number,
        };
        Ok(())
    }

    fn scan_token(&self, start: usize, b: u8) -> Result<(TokenKind, usize, f64), ParseError> {
        use TokenKind::*;

        let at = |offset: usize| self.bytes.get(start + offset).copied().unwrap_or(0);
        let op = |kind: TokenKind, len: usize| Ok((kind, start + len, 0.0));

        match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'$' | b'\\' => {
                let end = self.scan_identifier_end(start)?;
                let text = &self.source[start..end];
                let kind = match keyword_from_str(text) {
                    Some(kw) => kw,
                    None => Identifier,
                };
                Ok((kind, end, 0.0))
            }
            b'#' => {
                if start + 1 < self.bytes.len() && is_id_start_at(self.source, start + 1) {
                    let end = self.scan_identifier_end(start + 1)?;
                    Ok((PrivateIdentifier, end, 0.0))
                } else {
                    Err(ParseError::new("Invalid character \"#\"", Span::new(start as u32, start as u32 + 1)))
                }
            }
            b'0'..=b'9' => self.scan_number(start),
            b'.' if at(1).is_ascii_digit() => self.scan_number(start),
            b'"' | b'\'' => self.scan_string(start, b),
            b'`' => {
                let (kind, end) = self.scan_template_body(start + 1)?;
                Ok((kind, end, 0.0))
            }
            b'(' => op(LParen, 1),
            b')' => op(RParen, 1),
            b'{' => op(LBrace, 1),
            b'}' => op(RBrace, 1),
            b'[' => op(LBracket, 1),
            b']' => op(RBracket, 1),
            b';' => op(Semicolon, 1),
            b',' => op(Comma, 1),
            b':' => op(Colon, 1),
            b'@' => op(At, 1),
            b'~' => op(Tilde, 1),
            b'.' => {
                if at(1) == b'.' && at(2) == b'.' {
                    op(Spread, 3)
                } else {
                    op(Dot, 1)
                }
            }
            b'?' => match (at(1), at(2)) {
                (b'?', b'=') => op(QuestionQuestionEq, 3),
                (b'?', _) => op(QuestionQuestion, 2),
                (b'.', next) if !next.is_ascii_digit() => op(QuestionDot, 2),
                _ => op(Question, 1),
            },
            b'+' => match at(1) {
                b'+' => op(PlusPlus, 2),
                b'=' => op(PlusEq, 2),
                _ => op(Plus, 1),
            },
            b'-' => match at(1) {
                b'-' => op(MinusMinus, 2),
                b'=' => op(MinusEq, 2),
                _ => op(Minus, 1),
            },
            b'*' => match (at(1), at(2)) {
                (b'*', b'=') => op(StarStarEq, 3),
                (b'*', _) => op(StarStar, 2),
                (b'=', _) => op(StarEq, 2),
                _ => op(Star, 1),
            },
            b'/' => match at(1) {
                b'=' => op(SlashEq, 2),
                _ => op(Slash, 1),
            },
            b'%' => match at(1) {
                b'=' => op(PercentEq, 2),
                _ => op(Percent, 1),
            },
            b'=' => match (at(1), at(2)) {
                (b'=', b'=') => op(EqEqEq, 3),
                (b'=', _) => op(EqEq, 2),
                (b'>', _) => op(Arrow, 2),
                _ => op(Eq, 1),
            },
            b'!' => match (at(1), at(2)) {
                (b'=', b'=') => op(BangEqEq, 3),
                (b'=', _) => op(BangEq, 2),
                _ => op(Bang, 1),
            },
            b'<' => match (at(1), at(2)) {
                (b'<', b'=') => op(LtLtEq, 3),
                (b'<', _) => op(LtLt, 2),
                (b'=', _) => op(LtEq, 2),
                _ => op(Lt, 1),
            },
            b'>' => match (at(1), at(2), at(3)) {
                (b'>', b'>', b'=') => op(GtGtGtEq, 4),
                (b'>', b'>', _) => op(GtGtGt, 3),
                (b'>', b'=', _) => op(GtGtEq, 3),
                (b'>', _, _) => op(GtGt, 2),
                (b'=', _, _) => op(GtEq, 2),
                _ => op(Gt, 1),
            },
            b'&' => match (at(1), at(2)) {
                (b'&', b'=') => op(AmpAmpEq, 3),
                (b'&', _) => op(AmpAmp, 2),
                (b'=', _) => op(AmpEq, 2),
                _ => op(Amp, 1),
            },
            b'|' => match (at(1), at(2)) {
                (b'|', b'=') => op(PipePipeEq, 3),
                (b'|', _) => op(PipePipe, 2),
                (b'=', _) => op(PipeEq, 2),
                _ => op(Pipe, 1),
            },
            b'^' => match at(1) {
                b'=' => op(CaretEq, 2),
                _ => op(Caret, 1),
            },
            _ if b >= 0x80 && is_id_start_at(self.source, start) => {
                let end = self.scan_identifier_end(start)?;
                Ok((Identifier, end, 0.0))
            }
            _ => {
                let c = self.char_at(start);
                Err(ParseError::new(
                    format!("Syntax error \"{c}\""),
                    Span::new(start as u32, (start + c.len_utf8()) as u32),
                ))
            }
        }
    }

    fn char_at(&self, pos: usize) -> char {
        self.source[pos..].chars().next().unwrap_or('\0')
    }

    fn scan_identifier_end(&self, start: usize) -> Result<usize, ParseError> {
        let mut pos = start;
        while pos < self.bytes.len() {
            let b = self.bytes[pos];
            if is_id_continue_byte(b) {
                pos += 1;
            } else if b == b'\\' {
                // Only `\u` escapes are valid in identifiers
                if self.bytes.get(pos + 1) != Some(&b'u') {
                    return Err(ParseError::new(
                        "Syntax error \"\\\"",
                        Span::new(pos as u32, pos as u32 + 1),
                    ));
                }
                pos += 2;
                if self.bytes.get(pos) == Some(&b'{') {
                    while pos < self.bytes.len() && self.bytes[pos] != b'}' {
                        pos += 1;
                    }
                    pos += 1;
                } else {
                    pos += 4;
                }
            } else if b >= 0x80 {
                let c = self.char_at(pos);
                if c.is_alphanumeric() || c == '\u{200c}' || c == '\u{200d}' {
                    pos += c.len_utf8();
                } else {
                    break;
                }
            } else {
                break;
            }
        }
        Ok(pos.min(self.bytes.len()))
    }

    fn scan_number(&self, start: usize) -> Result<(TokenKind, usize, f64), ParseError> {
        let bytes = self.bytes;
        let mut pos = start;

        let radix = if bytes[pos] == b'0' {
            match bytes.get(pos + 1).copied() {
                Some(b'x' | b'X') => 16,
                Some(b'b' | b'B') => 2,
                Some(b'o' | b'O') => 8,
                _ => 10,
            }
        } else {
            10
        };

        if radix != 10 {
            pos += 2;
            let mut value = 0.0f64;
            let digits_start = pos;
            while let Some(&b) = bytes.get(pos) {
                if b == b'_' {
                    pos += 1;
                    continue;
                }
                match (b as char).to_digit(radix) {
                    Some(d) => value = value * f64::from(radix) + f64::from(d),
                    None => break,
                }
                pos += 1;
            }
            if pos == digits_start {
                return Err(ParseError::new(
                    "Expected digits after number prefix",
                    Span::new(start as u32, pos as u32),
                ));
            }
            if bytes.get(pos) == Some(&b'n') {
                return Ok((TokenKind::BigInt, pos + 1, 0.0));
            }
            return self.finish_number(start, pos, value);
        }

        // Legacy octal: 0777
        if bytes[pos] == b'0'
            && bytes.get(pos + 1).is_some_and(|b| (b'0'..=b'7').contains(b))
            && bytes[pos + 1..]
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .all(|b| *b < b'8')
        {
            pos += 1;
            let mut value = 0.0f64;
            while let Some(&b) = bytes.get(pos) {
                if !(b'0'..=b'7').contains(&b) {
                    break;
                }
                value = value * 8.0 + f64::from(b - b'0');
                pos += 1;
            }
            return self.finish_number(start, pos, value);
        }

        let mut is_integer = true;
        while bytes.get(pos).is_some_and(|b| b.is_ascii_digit() || *b == b'_') {
            pos += 1;
        }
        if bytes.get(pos) == Some(&b'.') {
            is_integer = false;
            pos += 1;
            while bytes.get(pos).is_some_and(|b| b.is_ascii_digit() || *b == b'_') {
                pos += 1;
            }
        }
        if matches!(bytes.get(pos), Some(b'e' | b'E')) {
            is_integer = false;
            pos += 1;
            if matches!(bytes.get(pos), Some(b'+' | b'-')) {
                pos += 1;
            }
            let exponent_start = pos;
            while bytes.get(pos).is_some_and(|b| b.is_ascii_digit() || *b == b'_') {
                pos += 1;
            }
            if pos == exponent_start {
                return Err(ParseError::new(
                    "Invalid number",
                    Span::new(start as u32, pos as u32),
                ));
            }
        }
        if is_integer && bytes.get(pos) == Some(&b'n') {
            return Ok((TokenKind::BigInt, pos + 1, 0.0));
        }

        let text: String = self.source[start..pos].chars().filter(|c| *c != '_').collect();
        let value = text.parse::<f64>().unwrap_or(f64::NAN);
        self.finish_number(start, pos, value)
    }

    fn finish_number(&self, start: usize, end: usize, value: f64) -> Result<(TokenKind, usize, f64), ParseError> {
        // "1in x" is fine but "3x" is not
        if end < self.bytes.len() && is_id_start_at(self.source, end) {
            return Err(ParseError::new(
                "Invalid number",
                Span::new(start as u32, end as u32 + 1),
            ));
        }
        Ok((TokenKind::Number, end, value))
    }

    fn scan_string(&self, start: usize, quote: u8) -> Result<(TokenKind, usize, f64), ParseError> {
        let mut pos = start + 1;
        loop {
            match self.bytes.get(pos).copied() {
                None | Some(b'\n') | Some(b'\r') => {
                    return Err(ParseError::new(
                        "Unterminated string literal",
                        Span::new(start as u32, pos as u32),
                    ));
                }
                Some(b'\\') => {
                    pos += 2;
                    // "\r\n" continues the line as a unit
                    if self.bytes.get(pos - 1) == Some(&b'\r') && self.bytes.get(pos) == Some(&b'\n') {
                        pos += 1;
                    }
                }
                Some(b) if b == quote => return Ok((TokenKind::String, pos + 1, 0.0)),
                _ => pos += 1,
            }
        }
    }

    /// Scan template text starting just after "`" or "}". Returns
    /// `TemplateNoSub` when it ends with "`" and `TemplateHead` when it ends
    /// with "${".
    fn scan_template_body(&self, mut pos: usize) -> Result<(TokenKind, usize), ParseError> {
        let start = pos.saturating_sub(1);
        loop {
            match self.bytes.get(pos).copied() {
                None => {
                    return Err(ParseError::new(
                        "Unterminated template literal",
                        Span::new(start as u32, pos as u32),
                    ));
                }
                Some(b'`') => return Ok((TokenKind::TemplateNoSub, pos + 1)),
                Some(b'$') if self.bytes.get(pos + 1) == Some(&b'{') => {
                    return Ok((TokenKind::TemplateHead, pos + 2));
                }
                Some(b'\\') => pos += 2,
                _ => pos += 1,
            }
        }
    }
}

#[inline]
fn is_id_continue_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn is_id_start_at(source: &str, pos: usize) -> bool {
    match source[pos..].chars().next() {
        Some(c) if c.is_ascii() => c.is_ascii_alphabetic() || c == '_' || c == '$' || c == '\\',
        Some(c) => c.is_alphabetic(),
        None => false,
    }
}

/// Decode JavaScript escape sequences in string or template text.
pub fn decode_escapes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut pending_high: Option<u32> = None;

    let push_code = |out: &mut String, pending: &mut Option<u32>, code: u32| {
        if (0xD800..0xDC00).contains(&code) {
            if pending.is_some() {
                out.push('\u{FFFD}');
            }
            *pending = Some(code);
            return;
        }
        if (0xDC00..0xE000).contains(&code) {
            if let Some(high) = pending.take() {
                let combined = 0x10000 + ((high - 0xD800) << 10) + (code - 0xDC00);
                out.push(char::from_u32(combined).unwrap_or('\u{FFFD}'));
            } else {
                out.push('\u{FFFD}');
            }
            return;
        }
        if pending.take().is_some() {
            out.push('\u{FFFD}');
        }
        out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
    };

    while let Some(c) = chars.next() {
        if c != '\\' {
            push_code(&mut out, &mut pending_high, c as u32);
            continue;
        }
        let Some(e) = chars.next() else { break };
        let code = match e {
            'n' => '\n' as u32,
            'r' => '\r' as u32,
            't' => '\t' as u32,
            'b' => 0x08,
            'f' => 0x0c,
            'v' => 0x0b,
            '0' if !chars.peek().is_some_and(char::is_ascii_digit) => 0,
            'x' => read_hex(&mut chars, 2),
            'u' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    let mut value = 0u32;
                    for d in chars.by_ref() {
                        if d == '}' {
                            break;
                        }
                        value = value.saturating_mul(16).saturating_add(d.to_digit(16).unwrap_or(0));
                    }
                    value
                } else {
                    read_hex(&mut chars, 4)
                }
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                continue;
            }
            '\n' | '\u{2028}' | '\u{2029}' => continue,
            other => other as u32,
        };
        push_code(&mut out, &mut pending_high, code);
    }
    if pending_high.is_some() {
        out.push('\u{FFFD}');
    }
    out
}

fn read_hex(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, len: usize) -> u32 {
    let mut value = 0;
    for _ in 0..len {
        match chars.peek().and_then(|c| c.to_digit(16)) {
            Some(d) => {
                value = value * 16 + d;
                chars.next();
            }
            None => break,
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            lexer.next().unwrap();
            if lexer.kind() == TokenKind::Eof {
                break;
            }
            tokens.push(lexer.kind());
        }
        tokens
    }

    #[test]
    fn test_identifiers_and_contextual_keywords() {
        use TokenKind::*;
        assert_eq!(
            tokenize("namespace foo enum declare"),
            vec![Identifier, Identifier, Enum, Identifier]
        );

        let mut lexer = Lexer::new("namespace");
        lexer.next().unwrap();
        assert!(lexer.is_contextual_keyword("namespace"));
        assert!(!lexer.is_contextual_keyword("module"));
    }

    #[test]
    fn test_numbers() {
        let mut lexer = Lexer::new("1_000 0x1F 0b101 .5 3.3e1 017");
        let mut values = Vec::new();
        loop {
            lexer.next().unwrap();
            if lexer.kind() == TokenKind::Eof {
                break;
            }
            values.push(lexer.number());
        }
        assert_eq!(values, vec![1000.0, 31.0, 5.0, 0.5, 33.0, 15.0]);
        assert_eq!(tokenize("10n"), vec![TokenKind::BigInt]);
    }

    #[test]
    fn test_string_value() {
        let mut lexer = Lexer::new(r#"'a\nb' "\u{41}\x42" "😀""#);
        lexer.next().unwrap();
        assert_eq!(lexer.string_value(), "a\nb");
        lexer.next().unwrap();
        assert_eq!(lexer.string_value(), "AB");
        lexer.next().unwrap();
        assert_eq!(lexer.string_value(), "\u{1F600}");
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Lexer::new("'abc\n'");
        let err = lexer.next().unwrap_err();
        assert_eq!(err.message, "Unterminated string literal");
    }

    #[test]
    fn test_newline_flag() {
        let mut lexer = Lexer::new("a /* \n */ b\nc");
        lexer.next().unwrap();
        lexer.next().unwrap();
        assert!(lexer.has_newline_before());
        lexer.next().unwrap();
        assert!(lexer.has_newline_before());
    }

    #[test]
    fn test_split_greater_than() {
        let mut lexer = Lexer::new(">>= 1");
        lexer.next().unwrap();
        assert_eq!(lexer.kind(), TokenKind::GtGtEq);
        lexer.expect_greater_than().unwrap();
        assert_eq!(lexer.kind(), TokenKind::GtEq);
        assert_eq!(lexer.raw(), ">=");
        lexer.expect_greater_than().unwrap();
        assert_eq!(lexer.kind(), TokenKind::Eq);
        lexer.next().unwrap();
        assert_eq!(lexer.kind(), TokenKind::Number);
    }

    #[test]
    fn test_split_less_than() {
        let mut lexer = Lexer::new("<<T>() => T>");
        lexer.next().unwrap();
        lexer.expect_less_than().unwrap();
        assert_eq!(lexer.kind(), TokenKind::Lt);
        lexer.expect_less_than().unwrap();
        assert_eq!(lexer.raw(), "T");
    }

    #[test]
    fn test_regexp_rescan() {
        let mut lexer = Lexer::new("/[/]+/gi.source");
        lexer.next().unwrap();
        assert_eq!(lexer.kind(), TokenKind::Slash);
        lexer.scan_regexp().unwrap();
        assert_eq!(lexer.kind(), TokenKind::RegExp);
        assert_eq!(lexer.raw(), "/[/]+/gi");
        lexer.next().unwrap();
        assert_eq!(lexer.kind(), TokenKind::Dot);
    }

    #[test]
    fn test_template_rescan() {
        let mut lexer = Lexer::new("`a${x}b${y}c`");
        lexer.next().unwrap();
        assert_eq!(lexer.kind(), TokenKind::TemplateHead);
        assert_eq!(lexer.template_text(), "a");
        lexer.next().unwrap();
        lexer.next().unwrap();
        lexer.rescan_close_brace_as_template_token().unwrap();
        assert_eq!(lexer.kind(), TokenKind::TemplateMiddle);
        assert_eq!(lexer.template_text(), "b");
        lexer.next().unwrap();
        lexer.next().unwrap();
        lexer.rescan_close_brace_as_template_token().unwrap();
        assert_eq!(lexer.kind(), TokenKind::TemplateTail);
        assert_eq!(lexer.template_text(), "c");
    }

    #[test]
    fn test_snapshot_restore() {
        let mut lexer = Lexer::new("a < b > c");
        lexer.next().unwrap();
        let snapshot = lexer.snapshot();
        lexer.set_diagnostics_suppressed(true);
        lexer.next().unwrap();
        lexer.next().unwrap();
        assert_eq!(lexer.raw(), "b");
        lexer.restore(snapshot);
        assert_eq!(lexer.raw(), "a");
        assert!(!lexer.diagnostics_suppressed());
    }

    #[test]
    fn test_expected_message() {
        let mut lexer = Lexer::new("let x");
        lexer.next().unwrap();
        let err = lexer.expect(TokenKind::Semicolon).unwrap_err();
        assert_eq!(err.message, "Expected \";\" but found \"let\"");
    }
}
