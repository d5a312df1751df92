//! Token types for JavaScript/TypeScript.
//!
//! Only ECMAScript reserved words get their own kinds. Everything else that
//! acts like a keyword in some position (`let`, `async`, `type`, `namespace`,
//! `declare`, `abstract`, ...) is lexed as an [`TokenKind::Identifier`] and
//! checked with `Lexer::is_contextual_keyword`, because TypeScript allows all
//! of them as ordinary names.
//!
//! Tokens carry no heap data so the lexer state can be copied freely when the
//! parser speculates. Identifier and string payloads are decoded from the
//! source span on demand.

use crate::span::Span;

/// A token with its kind and source location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line terminator appeared between the previous token and this one.
    pub has_newline_before: bool,
    /// Numeric value for [`TokenKind::Number`] tokens.
    pub number: f64,
}

impl Token {
    #[inline]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self {
            kind,
            span,
            has_newline_before: false,
            number: 0.0,
        }
    }
}

impl Default for Token {
    fn default() -> Self {
        Token::new(TokenKind::Eof, Span::default())
    }
}

/// The kind of token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // === Literals ===
    Identifier,
    /// `#name`
    PrivateIdentifier,
    String,
    Number,
    BigInt,
    /// Only produced by `Lexer::scan_regexp`.
    RegExp,
    /// `` `text` ``
    TemplateNoSub,
    /// `` `text${ ``
    TemplateHead,
    /// `` }text${ ``, only produced by a template rescan
    TemplateMiddle,
    /// `` }text` ``, only produced by a template rescan
    TemplateTail,

    // === Reserved words ===
    Break,
    Case,
    Catch,
    Class,
    Const,
    Continue,
    Debugger,
    Default,
    Delete,
    Do,
    Else,
    Enum,
    Export,
    Extends,
    False,
    Finally,
    For,
    Function,
    If,
    Import,
    In,
    Instanceof,
    New,
    Null,
    Return,
    Super,
    Switch,
    This,
    Throw,
    True,
    Try,
    Typeof,
    Var,
    Void,
    While,
    With,

    // === Punctuation ===
    LParen,     // (
    RParen,     // )
    LBrace,     // {
    RBrace,     // }
    LBracket,   // [
    RBracket,   // ]
    Semicolon,  // ;
    Comma,      // ,
    Colon,      // :
    Dot,        // .
    Question,   // ?
    QuestionDot, // ?.
    At,         // @
    Arrow,      // =>
    Spread,     // ...

    // === Assignment ===
    Eq,         // =
    PlusEq,     // +=
    MinusEq,    // -=
    StarEq,     // *=
    SlashEq,    // /=
    PercentEq,  // %=
    StarStarEq, // **=
    AmpEq,      // &=
    PipeEq,     // |=
    CaretEq,    // ^=
    LtLtEq,     // <<=
    GtGtEq,     // >>=
    GtGtGtEq,   // >>>=
    AmpAmpEq,   // &&=
    PipePipeEq, // ||=
    QuestionQuestionEq, // ??=

    // === Comparison ===
    EqEq,       // ==
    EqEqEq,     // ===
    BangEq,     // !=
    BangEqEq,   // !==
    Lt,         // <
    LtEq,       // <=
    Gt,         // >
    GtEq,       // >=

    // === Arithmetic ===
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    StarStar,
    PlusPlus,
    MinusMinus,

    // === Bitwise ===
    Amp,
    Pipe,
    Caret,
    Tilde,
    LtLt,
    GtGt,
    GtGtGt,

    // === Logical ===
    AmpAmp,
    PipePipe,
    Bang,
    QuestionQuestion,

    Eof,
}

impl TokenKind {
    /// True for every reserved word, which may still be used as a property
    /// name or an enum member name.
    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Break | Case | Catch | Class | Const | Continue | Debugger | Default | Delete
                | Do | Else | Enum | Export | Extends | False | Finally | For | Function
                | If | Import | In | Instanceof | New | Null | Return | Super | Switch
                | This | Throw | True | Try | Typeof | Var | Void | While | With
        )
    }

    /// Source spelling for punctuation and keywords, used in "Expected"
    /// messages. Literal kinds return a description instead.
    pub fn as_str(self) -> &'static str {
        use TokenKind::*;
        match self {
            Identifier => "identifier",
            PrivateIdentifier => "private identifier",
            String => "string",
            Number => "number",
            BigInt => "bigint",
            RegExp => "regular expression",
            TemplateNoSub | TemplateHead | TemplateMiddle | TemplateTail => "template literal",
            Break => "break",
            Case => "case",
            Catch => "catch",
            Class => "class",
            Const => "const",
            Continue => "continue",
            Debugger => "debugger",
            Default => "default",
            Delete => "delete",
            Do => "do",
            Else => "else",
            Enum => "enum",
            Export => "export",
            Extends => "extends",
            False => "false",
            Finally => "finally",
            For => "for",
            Function => "function",
            If => "if",
            Import => "import",
            In => "in",
            Instanceof => "instanceof",
            New => "new",
            Null => "null",
            Return => "return",
            Super => "super",
            Switch => "switch",
            This => "this",
            Throw => "throw",
            True => "true",
            Try => "try",
            Typeof => "typeof",
            Var => "var",
            Void => "void",
            While => "while",
            With => "with",
            LParen => "(",
            RParen => ")",
            LBrace => "{",
            RBrace => "}",
            LBracket => "[",
            RBracket => "]",
            Semicolon => ";",
            Comma => ",",
            Colon => ":",
            Dot => ".",
            Question => "?",
            QuestionDot => "?.",
            At => "@",
            Arrow => "=>",
            Spread => "...",
            Eq => "=",
            PlusEq => "+=",
            MinusEq => "-=",
            StarEq => "*=",
            SlashEq => "/=",
            PercentEq => "%=",
            StarStarEq => "**=",
            AmpEq => "&=",
            PipeEq => "|=",
            CaretEq => "^=",
            LtLtEq => "<<=",
            GtGtEq => ">>=",
            GtGtGtEq => ">>>=",
            AmpAmpEq => "&&=",
            PipePipeEq => "||=",
            QuestionQuestionEq => "??=",
            EqEq => "==",
            EqEqEq => "===",
            BangEq => "!=",
            BangEqEq => "!==",
            Lt => "<",
            LtEq => "<=",
            Gt => ">",
            GtEq => ">=",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            StarStar => "**",
            PlusPlus => "++",
            MinusMinus => "--",
            Amp => "&",
            Pipe => "|",
            Caret => "^",
            Tilde => "~",
            LtLt => "<<",
            GtGt => ">>",
            GtGtGt => ">>>",
            AmpAmp => "&&",
            PipePipe => "||",
            Bang => "!",
            QuestionQuestion => "??",
            Eof => "end of file",
        }
    }
}

/// Look up a reserved word.
pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match s {
        "break" => Break,
        "case" => Case,
        "catch" => Catch,
        "class" => Class,
        "const" => Const,
        "continue" => Continue,
        "debugger" => Debugger,
        "default" => Default,
        "delete" => Delete,
        "do" => Do,
        "else" => Else,
        "enum" => Enum,
        "export" => Export,
        "extends" => Extends,
        "false" => False,
        "finally" => Finally,
        "for" => For,
        "function" => Function,
        "if" => If,
        "import" => Import,
        "in" => In,
        "instanceof" => Instanceof,
        "new" => New,
        "null" => Null,
        "return" => Return,
        "super" => Super,
        "switch" => Switch,
        "this" => This,
        "throw" => Throw,
        "true" => True,
        "try" => Try,
        "typeof" => Typeof,
        "var" => Var,
        "void" => Void,
        "while" => While,
        "with" => With,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(keyword_from_str("enum"), Some(TokenKind::Enum));
        assert_eq!(keyword_from_str("namespace"), None);
        assert_eq!(keyword_from_str("let"), None);
        assert!(TokenKind::Typeof.is_keyword());
        assert!(!TokenKind::Identifier.is_keyword());
    }

    #[test]
    fn test_token_is_copy() {
        let a = Token::new(TokenKind::GtGt, Span::new(3, 5));
        let b = a;
        assert_eq!(a, b);
        assert_eq!(b.kind.as_str(), ">>");
    }
}
