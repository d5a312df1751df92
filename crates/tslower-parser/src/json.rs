//! Strict JSON parser.
//!
//! Runs on the JavaScript lexer and rejects everything JSON does not allow:
//! single-quoted strings, JavaScript-only escapes, non-decimal numbers and,
//! unless enabled in [`JsonOptions`], comments and trailing commas. Those are
//! queued as errors and parsing continues; anything else is fatal and
//! yields no value. A key repeated within one object is a warning that
//! points back at the first occurrence.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Diagnostic, Log, ParseError};
use crate::lexer::Lexer;
use crate::span::Span;
use crate::token::TokenKind;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JsonOptions {
    pub allow_comments: bool,
    pub allow_trailing_commas: bool,
}

impl JsonOptions {
    /// The dialect of `tsconfig.json`: comments and trailing commas.
    pub fn relaxed() -> Self {
        Self {
            allow_comments: true,
            allow_trailing_commas: true,
        }
    }
}

/// A parsed JSON value. Objects keep every entry in source order,
/// duplicates included.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<JsonValue>),
    Object(Vec<JsonProperty>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsonProperty {
    pub key: String,
    pub key_span: Span,
    pub value: JsonValue,
    pub value_span: Span,
}

impl JsonValue {
    /// The value of `key`, the last one if it is repeated.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.property(key).map(|prop| &prop.value)
    }

    /// The entry for `key`, with its location.
    pub fn property(&self, key: &str) -> Option<&JsonProperty> {
        match self {
            JsonValue::Object(entries) => entries.iter().rev().find(|prop| prop.key == key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            JsonValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            JsonValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[JsonValue]> {
        match self {
            JsonValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }
}

/// Parse `source` as a single JSON value.
pub fn parse(source: &str, options: JsonOptions) -> (Option<JsonValue>, Log) {
    let mut parser = JsonParser {
        lexer: Lexer::new(source),
        options,
        log: Log::new(),
        prev_end: 0,
    };
    match parser.parse_root() {
        Ok(value) => (Some(value), parser.log),
        Err(err) => {
            debug!(at = err.span.start, reason = %err.message, "JSON parse failed");
            if !err.is_logged() {
                parser.log.add(err.into());
            }
            (None, parser.log)
        }
    }
}

struct JsonParser<'a> {
    lexer: Lexer<'a>,
    options: JsonOptions,
    log: Log,
    /// End of the previous token; the gap up to the current token is
    /// whitespace or comments.
    prev_end: u32,
}

impl JsonParser<'_> {
    fn parse_root(&mut self) -> Result<JsonValue, ParseError> {
        self.next()?;
        let value = self.parse_value()?;
        if self.lexer.kind() != TokenKind::Eof {
            return Err(self.lexer.expected("end of file"));
        }
        Ok(value)
    }

    fn next(&mut self) -> Result<(), ParseError> {
        self.prev_end = self.lexer.span().end;
        self.lexer.next()?;
        if !self.options.allow_comments {
            self.check_for_comment();
        }
        Ok(())
    }

    fn check_for_comment(&mut self) {
        let gap = self.lexer.text(Span::new(self.prev_end, self.lexer.loc()));
        if let Some(offset) = gap.find('/') {
            let start = self.prev_end + offset as u32;
            self.log.add_error(
                Span::new(start, start + 2),
                "Comments are not allowed in JSON files",
            );
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.lexer.kind() != kind {
            return Err(self.lexer.expected(kind.as_str()));
        }
        self.next()
    }

    fn parse_value(&mut self) -> Result<JsonValue, ParseError> {
        match self.lexer.kind() {
            TokenKind::Null => {
                self.next()?;
                Ok(JsonValue::Null)
            }
            TokenKind::True => {
                self.next()?;
                Ok(JsonValue::Bool(true))
            }
            TokenKind::False => {
                self.next()?;
                Ok(JsonValue::Bool(false))
            }
            TokenKind::String => Ok(JsonValue::String(self.parse_string()?)),
            TokenKind::Number => Ok(JsonValue::Number(self.parse_number()?)),
            TokenKind::Minus => {
                let minus = self.lexer.span();
                self.next()?;
                if self.lexer.kind() != TokenKind::Number || self.lexer.loc() != minus.end {
                    return Err(self.lexer.expected("number"));
                }
                Ok(JsonValue::Number(-self.parse_number()?))
            }
            TokenKind::LBracket => self.parse_array(),
            TokenKind::LBrace => self.parse_object(),
            _ => Err(self.lexer.unexpected()),
        }
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        let span = self.lexer.span();
        let raw = self.lexer.raw();
        if raw.starts_with('\'') {
            self.log.add_error(span, "JSON strings must use double quotes");
        }
        self.check_escapes(raw, span.start);
        let value = self.lexer.string_value();
        self.next()?;
        Ok(value)
    }

    /// JSON allows `\" \\ \/ \b \f \n \r \t \uXXXX` and no raw control
    /// characters.
    fn check_escapes(&mut self, raw: &str, start: u32) {
        let body = raw.get(1..raw.len().saturating_sub(1)).unwrap_or("");
        let mut chars = body.char_indices();
        while let Some((i, c)) = chars.next() {
            let at = start + 1 + i as u32;
            if (c as u32) < 0x20 {
                self.log.add_error(Span::new(at, at + 1), "Control characters must be escaped in JSON strings");
                continue;
            }
            if c != '\\' {
                continue;
            }
            let Some((_, escape)) = chars.next() else {
                break;
            };
            let is_valid = match escape {
                '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' => true,
                'u' => (0..4).all(|_| chars.next().is_some_and(|(_, h)| h.is_ascii_hexdigit())),
                _ => false,
            };
            if !is_valid {
                self.log.add_error(
                    Span::new(at, at + 1 + escape.len_utf8() as u32),
                    format!("Invalid escape sequence \"\\{escape}\" in JSON string"),
                );
            }
        }
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        let span = self.lexer.span();
        let raw = self.lexer.raw();
        if !is_json_number(raw) {
            self.log.add_error(span, format!("Invalid number \"{raw}\" in JSON"));
        }
        let value = self.lexer.number();
        self.next()?;
        Ok(value)
    }

    /// After a `,`: report the comma when the list closes right away.
    fn check_trailing_comma(&mut self, comma: Span, close: TokenKind) {
        if self.lexer.kind() == close && !self.options.allow_trailing_commas {
            self.log.add_error(comma, "JSON does not support trailing commas");
        }
    }

    fn parse_array(&mut self) -> Result<JsonValue, ParseError> {
        self.next()?;
        let mut items = Vec::new();
        while self.lexer.kind() != TokenKind::RBracket {
            items.push(self.parse_value()?);
            if self.lexer.kind() != TokenKind::Comma {
                break;
            }
            let comma = self.lexer.span();
            self.next()?;
            self.check_trailing_comma(comma, TokenKind::RBracket);
        }
        self.expect(TokenKind::RBracket)?;
        Ok(JsonValue::Array(items))
    }

    fn parse_object(&mut self) -> Result<JsonValue, ParseError> {
        self.next()?;
        let mut entries = Vec::new();
        let mut first_seen: FxHashMap<String, Span> = FxHashMap::default();
        while self.lexer.kind() != TokenKind::RBrace {
            if self.lexer.kind() != TokenKind::String {
                return Err(self.lexer.expected("string"));
            }
            let key_span = self.lexer.span();
            let key = self.parse_string()?;
            match first_seen.get(&key) {
                Some(&original) => self.log.add(
                    Diagnostic::warning(key_span, format!("Duplicate key \"{key}\" in object literal"))
                        .with_note(original, format!("The original key \"{key}\" is here:")),
                ),
                None => {
                    first_seen.insert(key.clone(), key_span);
                }
            }

            self.expect(TokenKind::Colon)?;
            let value_start = self.lexer.loc();
            let value = self.parse_value()?;
            entries.push(JsonProperty {
                key,
                key_span,
                value,
                value_span: Span::new(value_start, self.prev_end),
            });

            if self.lexer.kind() != TokenKind::Comma {
                break;
            }
            let comma = self.lexer.span();
            self.next()?;
            self.check_trailing_comma(comma, TokenKind::RBrace);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(JsonValue::Object(entries))
    }
}

/// `0 | [1-9][0-9]*`, then an optional fraction and exponent.
fn is_json_number(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let mut i = 0;
    let digits = |i: &mut usize| {
        let start = *i;
        while bytes.get(*i).is_some_and(u8::is_ascii_digit) {
            *i += 1;
        }
        *i > start
    };

    match bytes.first() {
        Some(b'0') => i = 1,
        Some(b'1'..=b'9') => {
            digits(&mut i);
        }
        _ => return false,
    }
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        if !digits(&mut i) {
            return false;
        }
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        if !digits(&mut i) {
            return false;
        }
    }
    i == bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Severity;

    fn strict(source: &str) -> (Option<JsonValue>, Log) {
        parse(source, JsonOptions::default())
    }

    fn messages(log: &Log) -> Vec<&str> {
        log.iter().map(|d| d.text.as_str()).collect()
    }

    #[test]
    fn test_values() {
        let (value, log) = strict(r#"{"a": [1, -2.5e3, true, false, null], "b": {"c": "d\n\u0041"}}"#);
        assert!(log.is_empty(), "{log:?}");
        let value = value.unwrap();
        let a = value.get("a").and_then(JsonValue::as_array).unwrap();
        assert_eq!(a[0].as_f64(), Some(1.0));
        assert_eq!(a[1].as_f64(), Some(-2500.0));
        assert_eq!(a[2].as_bool(), Some(true));
        assert!(a[4].is_null());
        let c = value.get("b").and_then(|b| b.get("c")).and_then(JsonValue::as_str);
        assert_eq!(c, Some("d\nA"));
    }

    #[test]
    fn test_duplicate_key_warns_once_with_note() {
        let source = r#"{"a": 1, "b": 2, "a": 3}"#;
        let (value, log) = strict(source);
        assert_eq!(log.len(), 1);
        let warning = log.iter().next().unwrap();
        assert_eq!(warning.severity, Severity::Warning);
        assert_eq!(warning.text, "Duplicate key \"a\" in object literal");
        assert_eq!(warning.span.text(source), "\"a\"");
        assert_eq!(warning.span.start, 17);
        assert_eq!(warning.notes.len(), 1);
        assert_eq!(warning.notes[0].span.start, 1);
        // Later entries win on lookup
        assert_eq!(value.unwrap().get("a").and_then(JsonValue::as_f64), Some(3.0));
    }

    #[test]
    fn test_trailing_commas() {
        let (value, log) = strict("[1,]");
        assert!(value.is_some());
        assert_eq!(messages(&log), ["JSON does not support trailing commas"]);
        assert_eq!(log.iter().next().unwrap().span, Span::new(2, 3));

        let options = JsonOptions {
            allow_trailing_commas: true,
            ..JsonOptions::default()
        };
        let (value, log) = parse(r#"{"a": [1,],}"#, options);
        assert!(log.is_empty());
        assert_eq!(value.unwrap().get("a").and_then(JsonValue::as_array).map(<[_]>::len), Some(1));
    }

    #[test]
    fn test_comments() {
        let source = "// header\n[1 /* one */]";
        let (value, log) = strict(source);
        assert!(value.is_some());
        assert_eq!(log.errors().count(), 2);
        assert!(messages(&log).iter().all(|m| *m == "Comments are not allowed in JSON files"));

        let (value, log) = parse(source, JsonOptions::relaxed());
        assert!(log.is_empty());
        assert_eq!(value, Some(JsonValue::Array(vec![JsonValue::Number(1.0)])));
    }

    #[test]
    fn test_string_rules() {
        let (_, log) = strict("['a']");
        assert_eq!(messages(&log), ["JSON strings must use double quotes"]);

        let (_, log) = strict(r#"["\x41", "\v", "\u00e9", "\/"]"#);
        assert_eq!(
            messages(&log),
            [
                "Invalid escape sequence \"\\x\" in JSON string",
                "Invalid escape sequence \"\\v\" in JSON string",
            ]
        );

        let (_, log) = strict("\"a\tb\"");
        assert_eq!(messages(&log), ["Control characters must be escaped in JSON strings"]);
    }

    #[test]
    fn test_numbers() {
        assert!(is_json_number("0"));
        assert!(is_json_number("10.25e-3"));
        assert!(!is_json_number("01"));
        assert!(!is_json_number("0x10"));
        assert!(!is_json_number(".5"));
        assert!(!is_json_number("1."));

        let (_, log) = strict("[0x10]");
        assert_eq!(messages(&log), ["Invalid number \"0x10\" in JSON"]);
    }

    #[test]
    fn test_fatal_errors_yield_no_value() {
        for source in ["", "{a: 1}", "[1 2]", "1 2", "[,]", "- 1", "{\"a\" 1}"] {
            let (value, log) = strict(source);
            assert!(value.is_none(), "{source:?} should fail");
            assert_eq!(log.errors().count(), 1, "{source:?}: {log:?}");
        }
    }
}
