//! Diagnostics and the fatal parse error.
//!
//! There are two error channels:
//!
//! - [`ParseError`] is a fatal syntax error. It unwinds the parser through
//!   `?` until either a speculative attempt catches it (and rolls back), or
//!   the top-level `parse` turns it into a failed result.
//! - [`Diagnostic`]s are queued in a [`Log`] and never abort parsing.

use crate::span::Span;
use serde::Serialize;
use thiserror::Error;

/// A fatal syntax error.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    /// A diagnostic for this failure has already been queued, so the
    /// top-level conversion must not add a second one.
    pub(crate) logged: bool,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            logged: false,
        }
    }

    /// An abort whose message was already written to the log.
    pub(crate) fn logged(span: Span) -> Self {
        Self {
            message: String::new(),
            span,
            logged: true,
        }
    }

    pub fn is_logged(&self) -> bool {
        self.logged
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Class members that cannot be ambient, either because the class is a
/// `declare class` or because the member itself carries `declare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum AmbientClassError {
    #[error("\"declare\" cannot be used with a private identifier")]
    PrivateIdentifier,
    #[error("\"declare\" cannot be used with an index signature")]
    IndexSignature,
    #[error("An implementation cannot be declared in ambient contexts")]
    MemberBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The error that aborted parsing.
    Syntax,
    /// A recoverable error that does not stop the parse.
    Context,
    AmbientClass(AmbientClassError),
    Warning,
}

/// Extra location attached to a diagnostic, e.g. "originally declared here".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    pub span: Span,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub span: Span,
    pub text: String,
    pub notes: Vec<Note>,
}

impl Diagnostic {
    pub fn error(span: Span, text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind: DiagnosticKind::Context,
            span,
            text: text.into(),
            notes: Vec::new(),
        }
    }

    pub fn warning(span: Span, text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind: DiagnosticKind::Warning,
            span,
            text: text.into(),
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, span: Span, text: impl Into<String>) -> Self {
        self.notes.push(Note {
            span,
            text: text.into(),
        });
        self
    }

    pub fn with_kind(mut self, kind: DiagnosticKind) -> Self {
        self.kind = kind;
        self
    }
}

impl From<ParseError> for Diagnostic {
    fn from(err: ParseError) -> Self {
        Diagnostic::error(err.span, err.message).with_kind(DiagnosticKind::Syntax)
    }
}

/// An ordered sink of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Log {
    entries: Vec<Diagnostic>,
}

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn add_error(&mut self, span: Span, text: impl Into<String>) {
        self.add(Diagnostic::error(span, text));
    }

    pub fn add_warning(&mut self, span: Span, text: impl Into<String>) {
        self.add(Diagnostic::warning(span, text));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop everything queued after `len`. Used when speculation rolls back.
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a Log {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_truncate() {
        let mut log = Log::new();
        log.add_error(Span::new(0, 1), "first");
        let mark = log.len();
        log.add_warning(Span::new(1, 2), "second");
        log.add_error(Span::new(2, 3), "third");
        log.truncate(mark);
        assert_eq!(log.len(), 1);
        assert_eq!(log.errors().count(), 1);
        assert_eq!(log.warnings().count(), 0);
    }

    #[test]
    fn test_parse_error_into_diagnostic() {
        let diagnostic: Diagnostic = ParseError::new("Unexpected \"}\"", Span::new(4, 5)).into();
        assert_eq!(diagnostic.kind, DiagnosticKind::Syntax);
        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(diagnostic.text, "Unexpected \"}\"");
    }

    #[test]
    fn test_ambient_class_error_messages_are_distinct() {
        let all = [
            AmbientClassError::PrivateIdentifier,
            AmbientClassError::IndexSignature,
            AmbientClassError::MemberBody,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.to_string(), b.to_string());
            }
        }
    }
}
