// Copyright (c) psxc contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Tokens produced by the lexer.
//!
//! A [`Token`] is a closed-enum kind, the exact source lexeme, an
//! optional decoded literal value, and a [`Span`]. Tokens are produced
//! once per file, consumed by the parser, and then discarded (§3
//! Lifecycle).

use crate::span::Span;

/// Numeric radix, preserved alongside the decoded value so the parser
/// (and any later formatting) can tell `0x10` from `16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Radix {
    Decimal,
    Hex,
    Octal,
    Binary,
}

/// A decoded literal value. Strings have their escapes resolved; numbers
/// retain their original radix.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum LiteralValue {
    Bool(bool),
    Int { value: i128, radix: Radix },
    /// Arbitrary-precision decimal text, for integers too large for `i128`.
    BigInt { digits: String, radix: Radix },
    Float(f64),
    Complex(f64),
    Str(String),
    Bytes(Vec<u8>),
    None,
    Ellipsis,
}

/// The closed set of token kinds the lexer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum TokenKind {
    // Structural
    Newline,
    Indent,
    Dedent,
    Eof,

    // Identifiers and literals
    Name,
    Int,
    Float,
    Complex,
    Str,
    Bytes,
    FStringStart,
    FStringMiddle,
    FStringEnd,

    // Keywords
    KwFalse,
    KwNone,
    KwTrue,
    KwAnd,
    KwAs,
    KwAssert,
    KwAsync,
    KwAwait,
    KwBreak,
    KwClass,
    KwContinue,
    KwDef,
    KwDel,
    KwElif,
    KwElse,
    KwExcept,
    KwFinally,
    KwFor,
    KwFrom,
    KwGlobal,
    KwIf,
    KwImport,
    KwIn,
    KwIs,
    KwLambda,
    KwNonlocal,
    KwNot,
    KwOr,
    KwPass,
    KwRaise,
    KwReturn,
    KwTry,
    KwWhile,
    KwWith,
    KwYield,
    KwMatch,
    KwCase,
    KwType,
    /// PSX's `view` keyword, contextual (only a keyword at statement head).
    KwView,

    // Operators
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    At,
    Amper,
    Pipe,
    Caret,
    Tilde,
    LShift,
    RShift,
    Lt,
    Gt,
    LtEq,
    GtEq,
    EqEq,
    NotEq,
    ColonEq,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Ellipsis,
    Semicolon,
    Arrow,
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    DoubleSlashEq,
    PercentEq,
    AtEq,
    AmperEq,
    PipeEq,
    CaretEq,
    LShiftEq,
    RShiftEq,
    DoubleStarEq,

    // PSX extensions
    /// `<tag` / `<tag ...>` opening angle bracket of an HTML literal.
    HtmlOpen,
    /// `</tag>` closing tag.
    HtmlClose,
    /// `/>` self-closing marker.
    HtmlSelfClose,
    /// The literal text run between HTML tags.
    HtmlText,
    /// `{` introducing a template interpolation inside HTML content.
    InterpolationOpen,
    /// `}` closing a template interpolation.
    InterpolationClose,
}

impl TokenKind {
    /// Name used in `.tok` emit output and `.ast` debug dumps.
    pub fn as_str(self) -> &'static str {
        use TokenKind::*;
        match self {
            Newline => "NEWLINE",
            Indent => "INDENT",
            Dedent => "DEDENT",
            Eof => "EOF",
            Name => "NAME",
            Int => "INT",
            Float => "FLOAT",
            Complex => "COMPLEX",
            Str => "STR",
            Bytes => "BYTES",
            FStringStart => "FSTRING_START",
            FStringMiddle => "FSTRING_MIDDLE",
            FStringEnd => "FSTRING_END",
            KwFalse => "KW_FALSE",
            KwNone => "KW_NONE",
            KwTrue => "KW_TRUE",
            KwAnd => "KW_AND",
            KwAs => "KW_AS",
            KwAssert => "KW_ASSERT",
            KwAsync => "KW_ASYNC",
            KwAwait => "KW_AWAIT",
            KwBreak => "KW_BREAK",
            KwClass => "KW_CLASS",
            KwContinue => "KW_CONTINUE",
            KwDef => "KW_DEF",
            KwDel => "KW_DEL",
            KwElif => "KW_ELIF",
            KwElse => "KW_ELSE",
            KwExcept => "KW_EXCEPT",
            KwFinally => "KW_FINALLY",
            KwFor => "KW_FOR",
            KwFrom => "KW_FROM",
            KwGlobal => "KW_GLOBAL",
            KwIf => "KW_IF",
            KwImport => "KW_IMPORT",
            KwIn => "KW_IN",
            KwIs => "KW_IS",
            KwLambda => "KW_LAMBDA",
            KwNonlocal => "KW_NONLOCAL",
            KwNot => "KW_NOT",
            KwOr => "KW_OR",
            KwPass => "KW_PASS",
            KwRaise => "KW_RAISE",
            KwReturn => "KW_RETURN",
            KwTry => "KW_TRY",
            KwWhile => "KW_WHILE",
            KwWith => "KW_WITH",
            KwYield => "KW_YIELD",
            KwMatch => "KW_MATCH",
            KwCase => "KW_CASE",
            KwType => "KW_TYPE",
            KwView => "KW_VIEW",
            Plus => "PLUS",
            Minus => "MINUS",
            Star => "STAR",
            DoubleStar => "DOUBLE_STAR",
            Slash => "SLASH",
            DoubleSlash => "DOUBLE_SLASH",
            Percent => "PERCENT",
            At => "AT",
            Amper => "AMPER",
            Pipe => "PIPE",
            Caret => "CARET",
            Tilde => "TILDE",
            LShift => "LSHIFT",
            RShift => "RSHIFT",
            Lt => "LT",
            Gt => "GT",
            LtEq => "LTEQ",
            GtEq => "GTEQ",
            EqEq => "EQEQ",
            NotEq => "NOTEQ",
            ColonEq => "COLONEQ",
            LParen => "LPAREN",
            RParen => "RPAREN",
            LBracket => "LBRACKET",
            RBracket => "RBRACKET",
            LBrace => "LBRACE",
            RBrace => "RBRACE",
            Comma => "COMMA",
            Colon => "COLON",
            Dot => "DOT",
            Ellipsis => "ELLIPSIS",
            Semicolon => "SEMICOLON",
            Arrow => "ARROW",
            Eq => "EQ",
            PlusEq => "PLUSEQ",
            MinusEq => "MINUSEQ",
            StarEq => "STAREQ",
            SlashEq => "SLASHEQ",
            DoubleSlashEq => "DOUBLE_SLASHEQ",
            PercentEq => "PERCENTEQ",
            AtEq => "ATEQ",
            AmperEq => "AMPEREQ",
            PipeEq => "PIPEEQ",
            CaretEq => "CARETEQ",
            LShiftEq => "LSHIFTEQ",
            RShiftEq => "RSHIFTEQ",
            DoubleStarEq => "DOUBLE_STAREQ",
            HtmlOpen => "HTML_OPEN",
            HtmlClose => "HTML_CLOSE",
            HtmlSelfClose => "HTML_SELF_CLOSE",
            HtmlText => "HTML_TEXT",
            InterpolationOpen => "INTERP_OPEN",
            InterpolationClose => "INTERP_CLOSE",
        }
    }

    /// Numeric discriminant, stable for the lifetime of one compiler
    /// version, used by the `.tok` emit format's `<kind-number>` field.
    pub fn as_u16(self) -> u16 {
        // Safety-free: TokenKind is a fieldless enum, so discriminant
        // extraction via `as` is the normal idiom.
        self as u16
    }
}

/// One lexeme with its kind, exact source text, optional decoded value,
/// and span.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub value: Option<LiteralValue>,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            value: None,
            span,
        }
    }

    pub fn with_value(mut self, value: LiteralValue) -> Self {
        self.value = Some(value);
        self
    }
}
