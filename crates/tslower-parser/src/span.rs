//! Source location tracking.
//!
//! Diagnostics, AST nodes and lexer snapshots all refer back into the source
//! text through byte-offset spans.

use serde::Serialize;

/// A byte range in the source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize)]
pub struct Span {
    /// Byte offset of the start.
    pub start: u32,
    /// Byte offset of the end (exclusive).
    pub end: u32,
}

impl Span {
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// An empty span at a position, used for "insert here" diagnostics.
    #[inline]
    pub const fn at(pos: u32) -> Self {
        Self { start: pos, end: pos }
    }

    #[inline]
    pub const fn len(&self) -> u32 {
        self.end - self.start
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Extend this span to the end of `other`.
    #[inline]
    pub const fn to(self, other: Span) -> Span {
        Span {
            start: if self.start < other.start { self.start } else { other.start },
            end: if self.end > other.end { self.end } else { other.end },
        }
    }

    /// The source text covered by this span. Out-of-range spans yield "".
    pub fn text(self, source: &str) -> &str {
        source
            .get(self.start as usize..self.end as usize)
            .unwrap_or("")
    }
}

/// Converts byte offsets into line/column pairs for display.
#[derive(Debug)]
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self { line_starts }
    }

    /// Line and column, both 0-indexed. Columns count bytes.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line = self
            .line_starts
            .binary_search(&offset)
            .unwrap_or_else(|i| i.saturating_sub(1));
        (line as u32, offset - self.line_starts[line])
    }

    /// Human-facing `line:column`, both 1-indexed.
    pub fn display(&self, offset: u32) -> String {
        let (line, col) = self.line_col(offset);
        format!("{}:{}", line + 1, col + 1)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_to() {
        let a = Span::new(5, 10);
        let b = Span::new(8, 15);
        assert_eq!(a.to(b), Span::new(5, 15));
        assert_eq!(Span::new(2, 6).text("let x = 1"), "x = ");
        assert_eq!(Span::new(20, 30).text("short"), "");
    }

    #[test]
    fn test_line_index() {
        let index = LineIndex::new("line1\nline2\nline3");

        assert_eq!(index.line_col(0), (0, 0));
        assert_eq!(index.line_col(5), (0, 5));
        assert_eq!(index.line_col(6), (1, 0));
        assert_eq!(index.line_col(12), (2, 0));
        assert_eq!(index.display(7), "2:2");
        assert_eq!(index.line_count(), 3);
    }
}
