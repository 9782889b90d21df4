// Copyright (c) psxc contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Converts a UTF-8 source buffer into a token stream.
//!
//! The lexer tracks significant indentation (emitting `INDENT`/`DEDENT`),
//! decodes string/f-string/numeric literals, and recognizes PSX's HTML
//! literal syntax contextually: `<` immediately followed by an
//! identifier character opens an element only when the previous
//! significant token could end an expression-starting position (start of
//! statement, after `(`, `,`, `=`, `return`, and so on) — the same
//! "previous token disambiguates a lexically ambiguous character" trick
//! used for e.g. regex-vs-divide in JS lexers.

pub mod errors;

use std::str::Chars;

pub use errors::LexError;

use crate::diagnostics::Diagnostics;
use crate::span::{Position, Span};
use crate::token::{LiteralValue, Radix, Token, TokenKind};

const TAB_WIDTH: u32 = 8;

/// Result of [`scan`]: a complete, `EOF`-terminated token sequence plus
/// any errors encountered. Scanning never aborts early (§4.1).
pub struct ScanResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

/// Tokenizes `source`. Restartable per file; never suspends.
pub fn scan(source: &str) -> ScanResult {
    let mut lexer = Lexer::new(source);
    lexer.run();
    ScanResult {
        tokens: lexer.tokens,
        errors: lexer.errors,
    }
}

/// Tokenizes `source`, collecting errors into `diagnostics` (keyed by
/// `file`) instead of returning them separately — the shape the
/// project-level coordinator wants when folding a file's scan errors
/// into its running diagnostic set.
pub fn scan_into(source: &str, file: &std::path::Path, diagnostics: &mut Diagnostics) -> Vec<Token> {
    let ScanResult { tokens, errors } = scan(source);
    for err in errors {
        diagnostics.push(crate::diagnostics::Diagnostic::error(
            file.to_path_buf(),
            err.span(),
            err.code(),
            err.to_string(),
        ));
    }
    tokens
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExprContext {
    /// The previous significant token means a `<` here can only be a
    /// comparison operator (e.g. after a `Name` or literal).
    Operator,
    /// The previous significant token means a `<` here may open an HTML
    /// literal (start of statement, after `(`, `,`, `=`, `return`, ...).
    ExpressionStart,
}

struct HtmlFrame {
    tag: String,
    open_span: Span,
}

struct Lexer<'a> {
    src: &'a str,
    rest: Chars<'a>,
    byte_offset: u32,
    line: u32,
    column: u32,
    paren_depth: u32,
    indent_stack: Vec<u32>,
    at_line_start: bool,
    expr_context: ExprContext,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
    html_stack: Vec<HtmlFrame>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            rest: src.chars(),
            byte_offset: 0,
            line: 1,
            column: 1,
            paren_depth: 0,
            indent_stack: vec![0],
            at_line_start: true,
            expr_context: ExprContext::ExpressionStart,
            tokens: Vec::new(),
            errors: Vec::new(),
            html_stack: Vec::new(),
        }
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.column, self.byte_offset)
    }

    fn peek(&self) -> Option<char> {
        self.rest.clone().next()
    }

    fn peek2(&self) -> Option<char> {
        let mut it = self.rest.clone();
        it.next();
        it.next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.rest.next()?;
        self.byte_offset += ch.len_utf8() as u32;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn slice_from(&self, start: u32) -> &'a str {
        &self.src[start as usize..self.byte_offset as usize]
    }

    fn push(&mut self, kind: TokenKind, lexeme: &str, span: Span) {
        self.set_context_for(kind);
        self.tokens.push(Token::new(kind, lexeme, span));
    }

    fn set_context_for(&mut self, kind: TokenKind) {
        use TokenKind::*;
        self.expr_context = match kind {
            Name | Int | Float | Complex | Str | Bytes | RParen | RBracket | RBrace
            | KwNone | KwTrue | KwFalse | Ellipsis | HtmlSelfClose => ExprContext::Operator,
            _ => ExprContext::ExpressionStart,
        };
    }

    fn run(&mut self) {
        loop {
            if self.at_line_start && self.paren_depth == 0 {
                if self.handle_indentation() {
                    continue;
                }
            }
            self.at_line_start = false;
            match self.peek() {
                None => break,
                Some(ch) => self.scan_token(ch),
            }
        }
        self.finish();
    }

    /// Measures leading whitespace of a new logical line and emits
    /// INDENT/DEDENT as needed. Returns `true` if the line was blank or
    /// comment-only (and was fully consumed), meaning the caller should
    /// loop back to measure the next line instead of scanning a token.
    fn handle_indentation(&mut self) -> bool {
        let line_start = self.byte_offset;
        let mut width = 0u32;
        loop {
            match self.peek() {
                Some(' ') => {
                    width += 1;
                    self.bump();
                }
                Some('\t') => {
                    width += TAB_WIDTH - (width % TAB_WIDTH);
                    self.bump();
                }
                _ => break,
            }
        }
        match self.peek() {
            None => {
                self.at_line_start = false;
                return false;
            }
            Some('\n') | Some('\r') => {
                self.consume_newline_raw();
                return true;
            }
            Some('#') => {
                self.skip_comment();
                if matches!(self.peek(), Some('\n') | Some('\r')) {
                    self.consume_newline_raw();
                }
                return true;
            }
            _ => {}
        }
        let _ = line_start;
        let current = *self.indent_stack.last().unwrap();
        if width > current {
            self.indent_stack.push(width);
            let span = Span::empty_at(self.pos());
            self.push(TokenKind::Indent, "", span);
        } else if width < current {
            while *self.indent_stack.last().unwrap() > width {
                self.indent_stack.pop();
                let span = Span::empty_at(self.pos());
                self.push(TokenKind::Dedent, "", span);
            }
            if *self.indent_stack.last().unwrap() != width {
                self.errors.push(LexError::InconsistentDedent {
                    column: width,
                    span: Span::empty_at(self.pos()),
                });
                self.indent_stack.push(width);
            }
        }
        self.at_line_start = false;
        false
    }

    fn consume_newline_raw(&mut self) {
        if self.peek() == Some('\r') {
            self.bump();
        }
        if self.peek() == Some('\n') {
            self.bump();
        }
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' || ch == '\r' {
                break;
            }
            self.bump();
        }
    }

    fn scan_token(&mut self, ch: char) {
        if ch == ' ' || ch == '\t' {
            self.bump();
            return;
        }
        if ch == '\\' && matches!(self.peek2_raw_after_backslash(), Some('\n') | Some('\r') | None)
        {
            // Explicit line continuation: consume backslash and the
            // newline, suppress NEWLINE emission.
            self.bump();
            self.consume_newline_raw();
            return;
        }
        if ch == '#' {
            self.skip_comment();
            return;
        }
        if ch == '\n' || ch == '\r' {
            let start = self.pos();
            self.consume_newline_raw();
            if self.paren_depth == 0 {
                let span = Span::new(start, self.pos());
                self.push(TokenKind::Newline, "\n", span);
                self.at_line_start = true;
            }
            return;
        }
        if ch == '<' && self.can_start_html() {
            self.scan_html_element();
            return;
        }
        if is_ident_start(ch) {
            self.scan_name_or_string_prefix();
            return;
        }
        if ch.is_ascii_digit() {
            self.scan_number();
            return;
        }
        if ch == '"' || ch == '\'' {
            self.scan_string(String::new());
            return;
        }
        self.scan_operator();
    }

    fn peek2_raw_after_backslash(&self) -> Option<char> {
        let mut it = self.rest.clone();
        it.next();
        it.next()
    }

    fn can_start_html(&self) -> bool {
        if self.expr_context != ExprContext::ExpressionStart {
            return false;
        }
        matches!(self.peek2(), Some(c) if is_ident_start(c))
    }

    // ------------------------------------------------------------------
    // Names, keywords, string prefixes
    // ------------------------------------------------------------------

    fn scan_name_or_string_prefix(&mut self) {
        let start = self.pos();
        let start_byte = self.byte_offset;
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            self.bump();
        }
        let text = self.slice_from(start_byte);
        if is_string_prefix(text) && matches!(self.peek(), Some('"') | Some('\'')) {
            self.scan_string(text.to_string());
            return;
        }
        let span = Span::new(start, self.pos());
        match keyword_kind(text) {
            Some(kind) => self.push(kind, text, span),
            None => self.push(TokenKind::Name, text, span),
        }
    }

    // ------------------------------------------------------------------
    // Numbers
    // ------------------------------------------------------------------

    fn scan_number(&mut self) {
        let start = self.pos();
        let start_byte = self.byte_offset;
        let mut radix = Radix::Decimal;
        if self.peek() == Some('0') && matches!(self.peek2(), Some('x') | Some('X')) {
            radix = Radix::Hex;
            self.bump();
            self.bump();
            self.consume_digits(|c| c.is_ascii_hexdigit());
        } else if self.peek() == Some('0') && matches!(self.peek2(), Some('o') | Some('O')) {
            radix = Radix::Octal;
            self.bump();
            self.bump();
            self.consume_digits(|c| ('0'..='7').contains(&c));
        } else if self.peek() == Some('0') && matches!(self.peek2(), Some('b') | Some('B')) {
            radix = Radix::Binary;
            self.bump();
            self.bump();
            self.consume_digits(|c| c == '0' || c == '1');
        } else {
            self.consume_digits(|c| c.is_ascii_digit());
            let mut is_float = false;
            if self.peek() == Some('.') && matches!(self.peek2(), Some(c) if c.is_ascii_digit()) {
                is_float = true;
                self.bump();
                self.consume_digits(|c| c.is_ascii_digit());
            } else if self.peek() == Some('.') && !matches!(self.peek2(), Some(c) if is_ident_start(c))
            {
                is_float = true;
                self.bump();
            }
            if matches!(self.peek(), Some('e') | Some('E')) {
                let mut lookahead = self.rest.clone();
                lookahead.next();
                let sign = matches!(lookahead.next(), Some('+') | Some('-'));
                let mut check = self.rest.clone();
                check.next();
                if sign {
                    check.next();
                }
                if matches!(check.next(), Some(c) if c.is_ascii_digit()) {
                    is_float = true;
                    self.bump();
                    if matches!(self.peek(), Some('+') | Some('-')) {
                        self.bump();
                    }
                    self.consume_digits(|c| c.is_ascii_digit());
                }
            }
            let imaginary = self.peek() == Some('j') || self.peek() == Some('J');
            if imaginary {
                self.bump();
            }
            let text = self.slice_from(start_byte);
            let span = Span::new(start, self.pos());
            let clean: String = text.trim_end_matches(['j', 'J']).chars().filter(|c| *c != '_').collect();
            if imaginary {
                match clean.parse::<f64>() {
                    Ok(v) => self.push_literal(TokenKind::Complex, text, span, LiteralValue::Complex(v)),
                    Err(_) => self.invalid_number(text, span),
                }
            } else if is_float {
                match clean.parse::<f64>() {
                    Ok(v) => self.push_literal(TokenKind::Float, text, span, LiteralValue::Float(v)),
                    Err(_) => self.invalid_number(text, span),
                }
            } else {
                match clean.parse::<i128>() {
                    Ok(v) => self.push_literal(
                        TokenKind::Int,
                        text,
                        span,
                        LiteralValue::Int { value: v, radix },
                    ),
                    Err(_) => self.push_literal(
                        TokenKind::Int,
                        text,
                        span,
                        LiteralValue::BigInt { digits: clean, radix },
                    ),
                }
            }
            return;
        }
        let text = self.slice_from(start_byte);
        let span = Span::new(start, self.pos());
        let digits_start = match radix {
            Radix::Hex | Radix::Octal | Radix::Binary => 2,
            Radix::Decimal => 0,
        };
        let clean: String = text[digits_start..].chars().filter(|c| *c != '_').collect();
        let parsed = i128::from_str_radix(
            &clean,
            match radix {
                Radix::Hex => 16,
                Radix::Octal => 8,
                Radix::Binary => 2,
                Radix::Decimal => 10,
            },
        );
        match parsed {
            Ok(v) => self.push_literal(TokenKind::Int, text, span, LiteralValue::Int { value: v, radix }),
            Err(_) => self.push_literal(
                TokenKind::Int,
                text,
                span,
                LiteralValue::BigInt { digits: clean, radix },
            ),
        }
    }

    fn consume_digits(&mut self, pred: impl Fn(char) -> bool) {
        loop {
            match self.peek() {
                Some(c) if pred(c) || c == '_' => {
                    self.bump();
                }
                _ => break,
            }
        }
    }

    fn invalid_number(&mut self, text: &str, span: Span) {
        self.errors.push(LexError::InvalidNumericLiteral {
            lexeme: text.to_string(),
            span,
        });
        self.push(TokenKind::Int, text, span);
    }

    fn push_literal(&mut self, kind: TokenKind, lexeme: &str, span: Span, value: LiteralValue) {
        self.set_context_for(kind);
        self.tokens.push(Token::new(kind, lexeme, span).with_value(value));
    }

    // ------------------------------------------------------------------
    // Strings and f-strings
    // ------------------------------------------------------------------

    fn scan_string(&mut self, prefix: String) {
        let start = self.pos();
        let start_byte = self.byte_offset;
        let lower_prefix = prefix.to_lowercase();
        let is_raw = lower_prefix.contains('r');
        let is_bytes = lower_prefix.contains('b');
        let is_fstring = lower_prefix.contains('f');

        let quote = self.bump().expect("caller checked a quote is next");
        let triple = self.peek() == Some(quote) && self.peek2() == Some(quote);
        if triple {
            self.bump();
            self.bump();
        }
        if is_fstring {
            self.push(TokenKind::FStringStart, "", Span::empty_at(self.pos()));
        }

        let mut decoded = String::new();
        let mut bytes_decoded = Vec::new();
        loop {
            match self.peek() {
                None => {
                    let span = Span::new(start, self.pos());
                    self.errors.push(LexError::UnterminatedString { span });
                    break;
                }
                Some(c) if c == quote => {
                    if triple {
                        if self.peek2() == Some(quote) {
                            let mut lookahead = self.rest.clone();
                            lookahead.next();
                            lookahead.next();
                            if lookahead.next() == Some(quote) {
                                self.bump();
                                self.bump();
                                self.bump();
                                break;
                            }
                        }
                        self.bump();
                        decoded.push(c);
                        bytes_decoded.push(c as u8);
                    } else {
                        self.bump();
                        break;
                    }
                }
                Some('\n') if !triple => {
                    let span = Span::new(start, self.pos());
                    self.errors.push(LexError::UnterminatedString { span });
                    break;
                }
                Some('\\') if !is_raw => {
                    self.bump();
                    match self.decode_escape() {
                        Some(decoded_char) => {
                            decoded.push(decoded_char);
                            let mut buf = [0u8; 4];
                            bytes_decoded.extend_from_slice(decoded_char.encode_utf8(&mut buf).as_bytes());
                        }
                        None => {}
                    }
                }
                Some('{') if is_fstring => {
                    if self.peek2() == Some('{') {
                        self.bump();
                        self.bump();
                        decoded.push('{');
                    } else {
                        self.emit_fstring_middle(start, &decoded);
                        self.scan_fstring_replacement_field();
                        decoded.clear();
                        continue;
                    }
                }
                Some('}') if is_fstring => {
                    if self.peek2() == Some('}') {
                        self.bump();
                        self.bump();
                        decoded.push('}');
                    } else {
                        self.bump();
                        decoded.push('}');
                    }
                }
                Some(c) => {
                    self.bump();
                    decoded.push(c);
                    if is_bytes {
                        bytes_decoded.push(c as u8);
                    }
                }
            }
        }

        let text = self.slice_from(start_byte);
        let span = Span::new(start, self.pos());
        if is_fstring {
            self.emit_fstring_middle(start, &decoded);
            self.push(TokenKind::FStringEnd, "", Span::empty_at(self.pos()));
            let _ = span;
        } else if is_bytes {
            self.push_literal(TokenKind::Bytes, text, span, LiteralValue::Bytes(bytes_decoded));
        } else {
            self.push_literal(TokenKind::Str, text, span, LiteralValue::Str(decoded));
        }
    }

    fn emit_fstring_middle(&mut self, _start: Position, text: &str) {
        if text.is_empty() {
            return;
        }
        let span = Span::empty_at(self.pos());
        self.tokens.push(
            Token::new(TokenKind::FStringMiddle, text, span)
                .with_value(LiteralValue::Str(text.to_string())),
        );
    }

    /// Tokenizes the body of an f-string replacement field `{expr[:spec]}`
    /// as ordinary tokens, recursively re-entering number/name/string/
    /// operator scanning until the matching (unescaped) `}`.
    fn scan_fstring_replacement_field(&mut self) {
        let open_span = Span::empty_at(self.pos());
        self.bump(); // consume '{'
        self.push(TokenKind::InterpolationOpen, "{", open_span);
        let mut depth = 1u32;
        loop {
            match self.peek() {
                None => {
                    self.errors.push(LexError::UnterminatedFStringExpr {
                        span: Span::empty_at(self.pos()),
                    });
                    break;
                }
                Some('{') => {
                    depth += 1;
                    self.scan_operator();
                }
                Some('}') if depth == 1 => {
                    let span = Span::empty_at(self.pos());
                    self.bump();
                    self.push(TokenKind::InterpolationClose, "}", span);
                    break;
                }
                Some('}') => {
                    depth -= 1;
                    self.scan_operator();
                }
                Some(':') => {
                    // Format spec: tokenize as nested mini f-string middle text
                    // up to the closing (depth-1) brace.
                    self.bump();
                    let mut spec = String::new();
                    while let Some(c) = self.peek() {
                        if c == '}' && depth == 1 {
                            break;
                        }
                        self.bump();
                        spec.push(c);
                    }
                    self.emit_fstring_middle(self.pos(), &spec);
                }
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some(c) if is_ident_start(c) => self.scan_name_or_string_prefix(),
                Some(c) if c.is_ascii_digit() => self.scan_number(),
                Some('"') | Some('\'') => self.scan_string(String::new()),
                Some(_) => self.scan_operator(),
            }
        }
    }

    fn decode_escape(&mut self) -> Option<char> {
        let ch = self.bump()?;
        Some(match ch {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            'a' => '\u{7}',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '\n' => return None,
            'x' => {
                let mut value = 0u32;
                for _ in 0..2 {
                    if let Some(c) = self.peek().filter(|c| c.is_ascii_hexdigit()) {
                        self.bump();
                        value = value * 16 + c.to_digit(16).unwrap();
                    }
                }
                char::from_u32(value).unwrap_or('\u{fffd}')
            }
            other => other,
        })
    }

    // ------------------------------------------------------------------
    // HTML literals (PSX extension)
    // ------------------------------------------------------------------

    fn scan_html_element(&mut self) {
        let open_span_start = self.pos();
        self.bump(); // '<'
        let tag_start = self.pos();
        let tag_start_byte = self.byte_offset;
        while matches!(self.peek(), Some(c) if is_ident_continue(c) || c == '.' || c == '-') {
            self.bump();
        }
        let tag = self.slice_from(tag_start_byte).to_string();
        let open_span = Span::new(open_span_start, self.pos());
        self.push(TokenKind::HtmlOpen, "<", open_span);
        self.push(TokenKind::Name, &tag.clone(), Span::new(tag_start, self.pos()));

        // Attributes: identifier[=value] or {...spread}, until '>' or '/>'.
        loop {
            self.skip_html_whitespace();
            match self.peek() {
                Some('/') if self.peek2() == Some('>') => {
                    self.bump();
                    let span = Span::new(self.pos(), self.pos());
                    self.bump();
                    self.push(TokenKind::HtmlSelfClose, "/>", span);
                    return;
                }
                Some('>') => {
                    self.bump();
                    self.html_stack.push(HtmlFrame {
                        tag: tag.clone(),
                        open_span,
                    });
                    self.scan_html_children();
                    return;
                }
                Some('{') => {
                    self.scan_fstring_replacement_field();
                }
                Some(c) if is_ident_start(c) => {
                    let name_start = self.pos();
                    let name_start_byte = self.byte_offset;
                    while matches!(self.peek(), Some(c) if is_ident_continue(c) || c == '-') {
                        self.bump();
                    }
                    let name = self.slice_from(name_start_byte);
                    self.push(TokenKind::Name, name, Span::new(name_start, self.pos()));
                    self.skip_html_whitespace();
                    if self.peek() == Some('=') {
                        let eq_span = Span::empty_at(self.pos());
                        self.bump();
                        self.push(TokenKind::Eq, "=", eq_span);
                        self.skip_html_whitespace();
                        match self.peek() {
                            Some('"') | Some('\'') => self.scan_string(String::new()),
                            Some('{') => self.scan_fstring_replacement_field(),
                            _ => {}
                        }
                    }
                }
                None => {
                    self.errors.push(LexError::UnterminatedFStringExpr {
                        span: open_span,
                    });
                    return;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn skip_html_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn scan_html_children(&mut self) {
        let mut text_start_byte = self.byte_offset;
        loop {
            match self.peek() {
                None => {
                    if let Some(frame) = self.html_stack.pop() {
                        self.errors.push(LexError::UnterminatedString { span: frame.open_span });
                    }
                    return;
                }
                Some('{') => {
                    self.flush_html_text(text_start_byte);
                    self.scan_fstring_replacement_field();
                    text_start_byte = self.byte_offset;
                }
                Some('<') if self.peek2() == Some('/') => {
                    self.flush_html_text(text_start_byte);
                    let close_start = self.pos();
                    self.bump();
                    self.bump();
                    let name_start = self.byte_offset;
                    while matches!(self.peek(), Some(c) if is_ident_continue(c) || c == '.' || c == '-')
                    {
                        self.bump();
                    }
                    let closing_name = self.slice_from(name_start).to_string();
                    self.skip_html_whitespace();
                    if self.peek() == Some('>') {
                        self.bump();
                    }
                    let close_span = Span::new(close_start, self.pos());
                    match self.html_stack.pop() {
                        Some(frame) if frame.tag == closing_name => {
                            self.push(TokenKind::HtmlClose, &closing_name, close_span);
                            if self.html_stack.is_empty() {
                                return;
                            }
                            text_start_byte = self.byte_offset;
                        }
                        Some(frame) => {
                            self.errors.push(LexError::UnterminatedString { span: frame.open_span });
                            self.push(TokenKind::HtmlClose, &closing_name, close_span);
                            return;
                        }
                        None => return,
                    }
                }
                Some('<') if matches!(self.peek2(), Some(c) if is_ident_start(c)) => {
                    self.flush_html_text(text_start_byte);
                    self.scan_html_element();
                    text_start_byte = self.byte_offset;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn flush_html_text(&mut self, start_byte: u32) {
        if start_byte == self.byte_offset {
            return;
        }
        let text = self.src[start_byte as usize..self.byte_offset as usize].to_string();
        let span = Span::empty_at(self.pos());
        self.push(TokenKind::HtmlText, &text, span);
    }

    // ------------------------------------------------------------------
    // Operators and delimiters
    // ------------------------------------------------------------------

    fn scan_operator(&mut self) {
        let start = self.pos();
        let ch = self.bump().expect("caller checked a char is next");
        macro_rules! two {
            ($second:expr, $two_kind:expr, $one_kind:expr, $one_lex:expr) => {
                if self.peek() == Some($second) {
                    self.bump();
                    let span = Span::new(start, self.pos());
                    self.push($two_kind, self.slice_from(start.byte_offset), span);
                } else {
                    let span = Span::new(start, self.pos());
                    self.push($one_kind, $one_lex, span);
                }
            };
        }
        match ch {
            '(' => {
                self.paren_depth += 1;
                self.push(TokenKind::LParen, "(", Span::new(start, self.pos()));
            }
            ')' => {
                self.paren_depth = self.paren_depth.saturating_sub(1);
                self.push(TokenKind::RParen, ")", Span::new(start, self.pos()));
            }
            '[' => {
                self.paren_depth += 1;
                self.push(TokenKind::LBracket, "[", Span::new(start, self.pos()));
            }
            ']' => {
                self.paren_depth = self.paren_depth.saturating_sub(1);
                self.push(TokenKind::RBracket, "]", Span::new(start, self.pos()));
            }
            '{' => {
                self.paren_depth += 1;
                self.push(TokenKind::LBrace, "{", Span::new(start, self.pos()));
            }
            '}' => {
                self.paren_depth = self.paren_depth.saturating_sub(1);
                self.push(TokenKind::RBrace, "}", Span::new(start, self.pos()));
            }
            ',' => self.push(TokenKind::Comma, ",", Span::new(start, self.pos())),
            ':' => two!('=', TokenKind::ColonEq, TokenKind::Colon, ":"),
            ';' => self.push(TokenKind::Semicolon, ";", Span::new(start, self.pos())),
            '.' => {
                if self.peek() == Some('.') && self.peek2() == Some('.') {
                    self.bump();
                    self.bump();
                    self.push(TokenKind::Ellipsis, "...", Span::new(start, self.pos()));
                } else {
                    self.push(TokenKind::Dot, ".", Span::new(start, self.pos()));
                }
            }
            '+' => two!('=', TokenKind::PlusEq, TokenKind::Plus, "+"),
            '-' => {
                if self.peek() == Some('>') {
                    self.bump();
                    self.push(TokenKind::Arrow, "->", Span::new(start, self.pos()));
                } else {
                    two!('=', TokenKind::MinusEq, TokenKind::Minus, "-")
                }
            }
            '*' => {
                if self.peek() == Some('*') {
                    self.bump();
                    two!('=', TokenKind::DoubleStarEq, TokenKind::DoubleStar, "**")
                } else {
                    two!('=', TokenKind::StarEq, TokenKind::Star, "*")
                }
            }
            '/' => {
                if self.peek() == Some('/') {
                    self.bump();
                    two!('=', TokenKind::DoubleSlashEq, TokenKind::DoubleSlash, "//")
                } else {
                    two!('=', TokenKind::SlashEq, TokenKind::Slash, "/")
                }
            }
            '%' => two!('=', TokenKind::PercentEq, TokenKind::Percent, "%"),
            '@' => two!('=', TokenKind::AtEq, TokenKind::At, "@"),
            '&' => two!('=', TokenKind::AmperEq, TokenKind::Amper, "&"),
            '|' => two!('=', TokenKind::PipeEq, TokenKind::Pipe, "|"),
            '^' => two!('=', TokenKind::CaretEq, TokenKind::Caret, "^"),
            '~' => self.push(TokenKind::Tilde, "~", Span::new(start, self.pos())),
            '<' => {
                if self.peek() == Some('<') {
                    self.bump();
                    two!('=', TokenKind::LShiftEq, TokenKind::LShift, "<<")
                } else {
                    two!('=', TokenKind::LtEq, TokenKind::Lt, "<")
                }
            }
            '>' => {
                if self.peek() == Some('>') {
                    self.bump();
                    two!('=', TokenKind::RShiftEq, TokenKind::RShift, ">>")
                } else {
                    two!('=', TokenKind::GtEq, TokenKind::Gt, ">")
                }
            }
            '=' => two!('=', TokenKind::EqEq, TokenKind::Eq, "="),
            '!' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.push(TokenKind::NotEq, "!=", Span::new(start, self.pos()));
                } else {
                    let span = Span::new(start, self.pos());
                    self.errors.push(LexError::InvalidCharacter { found: '!', span });
                }
            }
            other => {
                let span = Span::new(start, self.pos());
                self.errors.push(LexError::InvalidCharacter { found: other, span });
            }
        }
    }

    fn finish(&mut self) {
        if self.tokens.last().map(|t| t.kind) != Some(TokenKind::Newline) && !self.tokens.is_empty() {
            let span = Span::empty_at(self.pos());
            self.tokens.push(Token::new(TokenKind::Newline, "", span));
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            let span = Span::empty_at(self.pos());
            self.tokens.push(Token::new(TokenKind::Dedent, "", span));
        }
        let span = Span::empty_at(self.pos());
        self.tokens.push(Token::new(TokenKind::Eof, "", span));
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn is_string_prefix(text: &str) -> bool {
    matches!(
        text.to_lowercase().as_str(),
        "r" | "b" | "f" | "rb" | "br" | "rf" | "fr" | "u"
    )
}

fn keyword_kind(text: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match text {
        "False" => KwFalse,
        "None" => KwNone,
        "True" => KwTrue,
        "and" => KwAnd,
        "as" => KwAs,
        "assert" => KwAssert,
        "async" => KwAsync,
        "await" => KwAwait,
        "break" => KwBreak,
        "class" => KwClass,
        "continue" => KwContinue,
        "def" => KwDef,
        "del" => KwDel,
        "elif" => KwElif,
        "else" => KwElse,
        "except" => KwExcept,
        "finally" => KwFinally,
        "for" => KwFor,
        "from" => KwFrom,
        "global" => KwGlobal,
        "if" => KwIf,
        "import" => KwImport,
        "in" => KwIn,
        "is" => KwIs,
        "lambda" => KwLambda,
        "nonlocal" => KwNonlocal,
        "not" => KwNot,
        "or" => KwOr,
        "pass" => KwPass,
        "raise" => KwRaise,
        "return" => KwReturn,
        "try" => KwTry,
        "while" => KwWhile,
        "with" => KwWith,
        "yield" => KwYield,
        "match" => KwMatch,
        "case" => KwCase,
        "type" => KwType,
        "view" => KwView,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        scan(src).tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scans_simple_assignment() {
        let k = kinds("x = 1\n");
        assert_eq!(
            k,
            vec![
                TokenKind::Name,
                TokenKind::Eq,
                TokenKind::Int,
                TokenKind::Newline,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn tracks_indent_and_dedent() {
        let k = kinds("if x:\n    pass\ny = 1\n");
        assert!(k.contains(&TokenKind::Indent));
        assert!(k.contains(&TokenKind::Dedent));
    }

    #[test]
    fn blank_and_comment_lines_do_not_affect_indentation() {
        let src = "if x:\n    pass\n\n    # comment\n    pass\n";
        let result = scan(src);
        assert!(result.errors.is_empty());
        let dedents = result
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Dedent)
            .count();
        assert_eq!(dedents, 1);
    }

    #[test]
    fn inconsistent_dedent_is_an_error() {
        let src = "if x:\n  pass\n if y:\n";
        let result = scan(src);
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn decodes_fstring_replacement_fields() {
        let k = kinds("f\"hi {name}\"\n");
        assert!(k.contains(&TokenKind::InterpolationOpen));
        assert!(k.contains(&TokenKind::Name));
        assert!(k.contains(&TokenKind::InterpolationClose));
    }

    #[test]
    fn scans_hex_octal_binary_and_float_literals() {
        let result = scan("0x1F + 0o17 + 0b101 + 1.5e3\n");
        assert!(result.errors.is_empty());
        let ints: Vec<_> = result
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Int)
            .collect();
        assert_eq!(ints.len(), 3);
    }

    #[test]
    fn parenthesized_continuation_suppresses_newline() {
        let src = "x = (\n    1,\n    2,\n)\n";
        let k = kinds(src);
        let newline_count = k.iter().filter(|t| **t == TokenKind::Newline).count();
        assert_eq!(newline_count, 1);
    }

    #[test]
    fn backslash_continuation_suppresses_newline() {
        let src = "x = 1 + \\\n    2\n";
        let k = kinds(src);
        let newline_count = k.iter().filter(|t| **t == TokenKind::Newline).count();
        assert_eq!(newline_count, 1);
    }

    #[test]
    fn scans_html_element_after_return() {
        let src = "def f():\n    return <div id=\"x\">{value}</div>\n";
        let result = scan(src);
        assert!(result.errors.is_empty());
        let k: Vec<_> = result.tokens.iter().map(|t| t.kind).collect();
        assert!(k.contains(&TokenKind::HtmlOpen));
        assert!(k.contains(&TokenKind::HtmlClose));
        assert!(k.contains(&TokenKind::InterpolationOpen));
    }

    #[test]
    fn less_than_after_name_is_comparison_not_html() {
        let src = "if a < b:\n    pass\n";
        let result = scan(src);
        assert!(result.errors.is_empty());
        assert!(!result.tokens.iter().any(|t| t.kind == TokenKind::HtmlOpen));
        assert!(result.tokens.iter().any(|t| t.kind == TokenKind::Lt));
    }

    #[test]
    fn token_lexeme_matches_source_span() {
        let src = "value = 42\n";
        let result = scan(src);
        for tok in &result.tokens {
            if matches!(tok.kind, TokenKind::Name | TokenKind::Int) {
                let start = tok.span.start.byte_offset as usize;
                let end = tok.span.end.byte_offset as usize;
                assert_eq!(&src[start..end], tok.lexeme);
            }
        }
    }
}
