//! Bounded speculative parsing.
//!
//! A few TypeScript constructs can only be told apart by trying one reading
//! and looking at where it ends up: `f<T>(x)` vs `a < b > c`, `(x): T => x`
//! vs a parenthesized expression followed by `:`, and `<T>(x) => x` vs a
//! `<T>x` cast. Each attempt runs under [`Parser::try_speculative`], which
//! checkpoints everything the attempt can touch and restores it if the
//! attempt fails.
//!
//! Only use this for grammar with bounded lookahead. Nested attempts are
//! fine, but nothing here guards against exponential re-parsing.

use tracing::debug;

use crate::error::ParseError;
use crate::lexer::LexerSnapshot;
use crate::parser::Parser;

/// Everything a failed attempt has to put back.
#[derive(Clone, Copy)]
struct Checkpoint {
    lexer: LexerSnapshot,
    log_len: usize,
    prev_end: u32,
    was_suppressed: bool,
    /// Speculative bodies never push scopes or declare symbols.
    scope_count: usize,
}

impl<'a> Parser<'a> {
    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            lexer: self.lexer.snapshot(),
            log_len: self.log.len(),
            prev_end: self.prev_end,
            was_suppressed: self.lexer.diagnostics_suppressed(),
            scope_count: self.scopes.len(),
        }
    }

    fn rollback(&mut self, checkpoint: Checkpoint, err: &ParseError) {
        debug!(
            at = checkpoint.lexer.token().span.start,
            failed_at = err.span.start,
            reason = %err.message,
            "speculative parse rolled back"
        );
        self.lexer.restore(checkpoint.lexer);
        self.log.truncate(checkpoint.log_len);
        self.prev_end = checkpoint.prev_end;
        self.lexer.set_diagnostics_suppressed(checkpoint.was_suppressed);
        debug_assert_eq!(self.scopes.len(), checkpoint.scope_count, "speculation created scopes");
    }

    /// Run `body` with diagnostics suppressed. On success the consumed
    /// tokens are kept and `Some` is returned; on failure the lexer, the log
    /// and `prev_end` are restored and `None` is returned.
    pub(crate) fn try_speculative<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Option<T> {
        self.try_speculative_then(body, |_| true)
    }

    /// Like [`Parser::try_speculative`], but the attempt also fails unless
    /// `lookahead` accepts the parser state right after `body` returns.
    pub(crate) fn try_speculative_then<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<T, ParseError>,
        lookahead: impl FnOnce(&mut Self) -> bool,
    ) -> Option<T> {
        let checkpoint = self.checkpoint();
        self.lexer.set_diagnostics_suppressed(true);

        let outcome = body(self).and_then(|value| {
            if lookahead(self) {
                Ok(value)
            } else {
                Err(self.lexer.unexpected())
            }
        });

        match outcome {
            Ok(value) => {
                self.lexer.set_diagnostics_suppressed(checkpoint.was_suppressed);
                Some(value)
            }
            Err(err) => {
                self.rollback(checkpoint, &err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::options::ParserOptions;
    use crate::parser::Parser;
    use crate::span::Span;
    use crate::token::TokenKind;

    fn parser(source: &str) -> Parser<'_> {
        let mut parser = Parser::new(source, ParserOptions::default());
        parser.next().unwrap();
        parser
    }

    #[test]
    fn test_failure_restores_lexer_and_log() {
        let mut p = parser("a b c");
        let result: Option<()> = p.try_speculative(|p| {
            p.next()?;
            p.add_error(Span::new(0, 1), "hidden");
            p.next()?;
            Err(p.lexer.unexpected())
        });
        assert!(result.is_none());
        assert_eq!(p.lexer.raw(), "a");
        assert!(p.log.is_empty());
        assert!(!p.lexer.diagnostics_suppressed());
    }

    #[test]
    fn test_success_keeps_tokens() {
        let mut p = parser("a b c");
        let result = p.try_speculative(|p| {
            p.next()?;
            Ok(p.lexer.raw().to_string())
        });
        assert_eq!(result.as_deref(), Some("b"));
        assert_eq!(p.lexer.raw(), "b");
        assert!(!p.lexer.diagnostics_suppressed());
    }

    #[test]
    fn test_errors_are_suppressed_during_attempt() {
        let mut p = parser("a");
        let kept = p.try_speculative(|p| {
            p.add_error(Span::new(0, 1), "never logged");
            Ok(())
        });
        assert!(kept.is_some());
        assert!(p.log.is_empty());
    }

    #[test]
    fn test_lookahead_rejection_rolls_back() {
        let mut p = parser("a ( b");
        let result = p.try_speculative_then(|p| p.next(), |p| p.check(TokenKind::Semicolon));
        assert!(result.is_none());
        assert_eq!(p.lexer.raw(), "a");
    }

    #[test]
    fn test_nested_attempts_restore_outer_suppression() {
        let mut p = parser("a b");
        let outer = p.try_speculative(|p| {
            let inner: Option<()> = p.try_speculative(|p| Err(p.lexer.unexpected()));
            assert!(inner.is_none());
            assert!(p.lexer.diagnostics_suppressed());
            p.next()
        });
        assert!(outer.is_some());
        assert!(!p.lexer.diagnostics_suppressed());
    }
}
