// Copyright (c) psxc contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Recursive-descent parser with Pratt-style precedence climbing for
//! expressions (§4.2).
//!
//! The parser never aborts on a syntax error: it records a
//! [`ParseError`] and synchronizes to the next statement boundary
//! (panic-mode recovery), then keeps going, so one bad line never loses
//! the rest of the file's diagnostics.

pub mod errors;
mod html;

pub use errors::ParseError;

use crate::ast::*;
use crate::span::{NodeId, NodeIdGenerator, Span, Spanned};
use crate::token::{LiteralValue, Token, TokenKind};

/// Parses a complete token stream (as produced by [`crate::lexer::scan`])
/// into a [`Module`] plus any parse errors. Always returns a module, even
/// if it is partial.
pub fn parse(tokens: &[Token]) -> (Module, Vec<ParseError>) {
    let mut parser = Parser::new(tokens);
    let module = parser.parse_module();
    (module, parser.errors)
}

const STATEMENT_START: &[TokenKind] = &[
    TokenKind::KwIf,
    TokenKind::KwWhile,
    TokenKind::KwFor,
    TokenKind::KwWith,
    TokenKind::KwTry,
    TokenKind::KwDef,
    TokenKind::KwClass,
    TokenKind::KwReturn,
    TokenKind::KwRaise,
    TokenKind::KwPass,
    TokenKind::KwBreak,
    TokenKind::KwContinue,
    TokenKind::KwImport,
    TokenKind::KwFrom,
    TokenKind::KwGlobal,
    TokenKind::KwNonlocal,
    TokenKind::KwAssert,
    TokenKind::KwMatch,
    TokenKind::KwType,
    TokenKind::KwView,
    TokenKind::KwAsync,
];

pub(crate) struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    pub(crate) errors: Vec<ParseError>,
    ids: NodeIdGenerator,
    func_depth: u32,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
            ids: NodeIdGenerator::new(),
            func_depth: 0,
        }
    }

    // ------------------------------------------------------------------
    // Token stream primitives
    // ------------------------------------------------------------------

    pub(crate) fn next_id(&mut self) -> NodeId {
        self.ids.next_id()
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> TokenKind {
        self.current().kind
    }

    fn peek_kind_at(&self, offset: usize) -> TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        self.tokens[idx].kind
    }

    fn span(&self) -> Span {
        self.current().span
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    pub(crate) fn peek_kind(&self) -> TokenKind {
        self.kind()
    }

    pub(crate) fn peek_span(&self) -> Span {
        self.span()
    }

    /// Span of the most recently consumed token.
    pub(crate) fn last_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }

    pub(crate) fn push_error(&mut self, err: ParseError) {
        self.errors.push(err);
    }

    fn at_eof(&self) -> bool {
        self.kind() == TokenKind::Eof
    }

    pub(crate) fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if !self.at_eof() {
            self.pos += 1;
        }
        tok
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, what: &'static str) -> Token {
        if self.check(kind) {
            self.advance()
        } else {
            let span = self.span();
            self.errors.push(ParseError::Expected {
                expected: what,
                found: self.kind(),
                span,
            });
            Token::new(kind, "", span)
        }
    }

    fn error_here(&mut self, err: ParseError) {
        self.errors.push(err);
    }

    /// Panic-mode recovery: advance to the next `NEWLINE`, `DEDENT`, a
    /// statement-starting keyword, or `EOF` (§4.2).
    fn synchronize(&mut self) {
        while !self.at_eof() {
            match self.kind() {
                TokenKind::Newline => {
                    self.advance();
                    return;
                }
                TokenKind::Dedent => return,
                k if STATEMENT_START.contains(&k) => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn skip_blank_lines(&mut self) {
        while self.check(TokenKind::Newline) {
            self.advance();
        }
    }

    // ------------------------------------------------------------------
    // Module / statements
    // ------------------------------------------------------------------

    fn parse_module(&mut self) -> Module {
        let start = self.span();
        let mut body = Vec::new();
        self.skip_blank_lines();
        while !self.at_eof() {
            body.push(self.parse_statement());
            self.skip_blank_lines();
        }
        let end = self.span();
        Module {
            id: self.next_id(),
            span: Span::new(start.start, end.start),
            body,
        }
    }

    fn parse_statement(&mut self) -> Stmt {
        let result = self.parse_statement_inner();
        match result {
            Ok(stmt) => stmt,
            Err(()) => {
                let span = self.span();
                self.synchronize();
                Stmt::Pass(PassStmt {
                    span,
                    id: self.next_id(),
                })
            }
        }
    }

    fn parse_statement_inner(&mut self) -> Result<Stmt, ()> {
        match self.kind() {
            TokenKind::At => Ok(self.parse_decorated()),
            TokenKind::KwIf => Ok(self.parse_if()),
            TokenKind::KwWhile => Ok(self.parse_while()),
            TokenKind::KwFor => Ok(self.parse_for(false)),
            TokenKind::KwWith => Ok(self.parse_with(false)),
            TokenKind::KwTry => Ok(self.parse_try()),
            TokenKind::KwDef => Ok(self.parse_function(false)),
            TokenKind::KwClass => Ok(self.parse_class()),
            TokenKind::KwView => Ok(self.parse_view()),
            TokenKind::KwMatch => Ok(self.parse_match()),
            TokenKind::KwType => Ok(self.parse_type_alias()),
            TokenKind::KwAsync => Ok(self.parse_async_statement()),
            _ => {
                if self.starts_statement() {
                    Ok(self.parse_simple_statement_line())
                } else {
                    let span = self.span();
                    self.error_here(ParseError::UnexpectedToken {
                        found: self.kind(),
                        span,
                    });
                    Err(())
                }
            }
        }
    }

    /// Whether the current token can plausibly begin a simple statement —
    /// used to tell a genuinely misplaced token (a stray `)`, a dangling
    /// operator) from the start of a real expression statement, so only
    /// the former triggers panic-mode recovery.
    fn starts_statement(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Name
                | TokenKind::Int
                | TokenKind::Float
                | TokenKind::Complex
                | TokenKind::Str
                | TokenKind::Bytes
                | TokenKind::FStringStart
                | TokenKind::KwTrue
                | TokenKind::KwFalse
                | TokenKind::KwNone
                | TokenKind::Ellipsis
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Tilde
                | TokenKind::Star
                | TokenKind::DoubleStar
                | TokenKind::KwNot
                | TokenKind::KwAwait
                | TokenKind::KwLambda
                | TokenKind::KwYield
                | TokenKind::KwDel
                | TokenKind::HtmlOpen
        )
    }

    fn parse_async_statement(&mut self) -> Stmt {
        self.advance(); // 'async'
        match self.kind() {
            TokenKind::KwDef => self.parse_function(true),
            TokenKind::KwFor => self.parse_for(true),
            TokenKind::KwWith => self.parse_with(true),
            _ => {
                let span = self.span();
                self.error_here(ParseError::UnexpectedToken {
                    found: self.kind(),
                    span,
                });
                Stmt::Pass(PassStmt {
                    span,
                    id: self.next_id(),
                })
            }
        }
    }

    /// One or more `;`-joined simple statements terminated by `NEWLINE`
    /// (or `EOF`), wrapped in [`MultiStmt`] when more than one is present.
    fn parse_simple_statement_line(&mut self) -> Stmt {
        let start = self.span();
        let mut stmts = vec![self.parse_simple_statement()];
        while self.eat(TokenKind::Semicolon) {
            if self.check(TokenKind::Newline) || self.at_eof() {
                break;
            }
            stmts.push(self.parse_simple_statement());
        }
        if !self.at_eof() {
            self.expect(TokenKind::Newline, "end of statement");
        }
        if stmts.len() == 1 {
            stmts.pop().unwrap()
        } else {
            let end = self.span();
            Stmt::Multi(MultiStmt {
                span: Span::new(start.start, end.start),
                id: self.next_id(),
                statements: stmts,
            })
        }
    }

    /// Simple-statement list used as a compound statement's one-line
    /// body (`if x: pass`), where there is no trailing `NEWLINE` to
    /// require — the caller's `parse_suite` already arranged that.
    fn parse_simple_statement_line_body(&mut self) -> Vec<Stmt> {
        let mut stmts = vec![self.parse_simple_statement()];
        while self.eat(TokenKind::Semicolon) {
            if self.check(TokenKind::Newline) || self.at_eof() {
                break;
            }
            stmts.push(self.parse_simple_statement());
        }
        self.eat(TokenKind::Newline);
        stmts
    }

    fn parse_simple_statement(&mut self) -> Stmt {
        match self.kind() {
            TokenKind::KwPass => {
                let span = self.advance().span;
                Stmt::Pass(PassStmt { span, id: self.next_id() })
            }
            TokenKind::KwBreak => {
                let span = self.advance().span;
                Stmt::Break(BreakStmt { span, id: self.next_id() })
            }
            TokenKind::KwContinue => {
                let span = self.advance().span;
                Stmt::Continue(ContinueStmt { span, id: self.next_id() })
            }
            TokenKind::KwReturn => self.parse_return(),
            TokenKind::KwRaise => self.parse_raise(),
            TokenKind::KwAssert => self.parse_assert(),
            TokenKind::KwGlobal => self.parse_global(),
            TokenKind::KwNonlocal => self.parse_nonlocal(),
            TokenKind::KwImport => self.parse_import(),
            TokenKind::KwFrom => self.parse_import_from(),
            TokenKind::KwYield => self.parse_yield_statement(),
            TokenKind::KwDel => self.parse_del(),
            _ => self.parse_expr_or_assign_statement(),
        }
    }

    fn parse_return(&mut self) -> Stmt {
        let start = self.advance().span;
        let value = if self.check(TokenKind::Newline)
            || self.check(TokenKind::Semicolon)
            || self.at_eof()
        {
            None
        } else {
            Some(self.parse_expr_list())
        };
        let end = value.as_ref().map(|e| e.span()).unwrap_or(start);
        Stmt::Return(ReturnStmt {
            span: start.merge(end),
            id: self.next_id(),
            value,
        })
    }

    fn parse_raise(&mut self) -> Stmt {
        let start = self.advance().span;
        let mut exception = None;
        let mut from = None;
        if !self.check(TokenKind::Newline) && !self.at_eof() {
            exception = Some(self.parse_expr());
            if self.eat(TokenKind::KwFrom) {
                from = Some(self.parse_expr());
            }
        }
        let end = from
            .as_ref()
            .map(|e| e.span())
            .or_else(|| exception.as_ref().map(|e| e.span()))
            .unwrap_or(start);
        Stmt::Raise(RaiseStmt {
            span: start.merge(end),
            id: self.next_id(),
            exception,
            from,
        })
    }

    fn parse_assert(&mut self) -> Stmt {
        let start = self.advance().span;
        let test = self.parse_expr();
        let message = if self.eat(TokenKind::Comma) {
            Some(self.parse_expr())
        } else {
            None
        };
        let end = message.as_ref().map(|e| e.span()).unwrap_or(test.span());
        Stmt::Assert(AssertStmt {
            span: start.merge(end),
            id: self.next_id(),
            test,
            message,
        })
    }

    fn parse_global(&mut self) -> Stmt {
        let start = self.advance().span;
        let names = self.parse_name_list();
        Stmt::Global(GlobalStmt {
            span: start,
            id: self.next_id(),
            names,
        })
    }

    fn parse_nonlocal(&mut self) -> Stmt {
        let start = self.advance().span;
        let names = self.parse_name_list();
        Stmt::Nonlocal(NonlocalStmt {
            span: start,
            id: self.next_id(),
            names,
        })
    }

    fn parse_name_list(&mut self) -> Vec<String> {
        let mut names = vec![self.expect_name()];
        while self.eat(TokenKind::Comma) {
            names.push(self.expect_name());
        }
        names
    }

    fn expect_name(&mut self) -> String {
        if self.check(TokenKind::Name) {
            self.advance().lexeme
        } else {
            let span = self.span();
            self.error_here(ParseError::Expected {
                expected: "name",
                found: self.kind(),
                span,
            });
            String::new()
        }
    }

    fn parse_del(&mut self) -> Stmt {
        let start = self.advance().span;
        let value = self.parse_expr_list();
        Stmt::Expr(ExprStmt {
            span: start.merge(value.span()),
            id: self.next_id(),
            value,
        })
    }

    fn parse_yield_statement(&mut self) -> Stmt {
        let expr = self.parse_yield_expr();
        Stmt::YieldStmt(YieldStmtStmt {
            span: expr.span(),
            id: self.next_id(),
            value: expr,
        })
    }

    fn parse_import(&mut self) -> Stmt {
        let start = self.advance().span;
        let mut names = vec![self.parse_import_alias()];
        while self.eat(TokenKind::Comma) {
            names.push(self.parse_import_alias());
        }
        let end = names.last().map(|a| a.span).unwrap_or(start);
        Stmt::Import(ImportStmt {
            span: start.merge(end),
            id: self.next_id(),
            names,
        })
    }

    fn parse_import_alias(&mut self) -> ImportAlias {
        let start = self.span();
        let mut name = self.expect_name();
        while self.eat(TokenKind::Dot) {
            name.push('.');
            name.push_str(&self.expect_name());
        }
        let alias = if self.eat(TokenKind::KwAs) {
            Some(self.expect_name())
        } else {
            None
        };
        ImportAlias {
            name,
            alias,
            span: start.merge(self.tokens[self.pos.saturating_sub(1)].span),
        }
    }

    fn parse_import_from(&mut self) -> Stmt {
        let start = self.advance().span;
        let mut dots = 0u32;
        loop {
            if self.eat(TokenKind::Dot) {
                dots += 1;
            } else if self.eat(TokenKind::Ellipsis) {
                dots += 3;
            } else {
                break;
            }
        }
        let module = if self.check(TokenKind::Name) {
            let mut name = self.expect_name();
            while self.eat(TokenKind::Dot) {
                name.push('.');
                name.push_str(&self.expect_name());
            }
            Some(name)
        } else {
            None
        };
        self.expect(TokenKind::KwImport, "'import'");
        let mut wildcard = false;
        let mut names = Vec::new();
        if self.eat(TokenKind::Star) {
            wildcard = true;
        } else {
            let paren = self.eat(TokenKind::LParen);
            names.push(self.parse_import_alias());
            while self.eat(TokenKind::Comma) {
                if paren && self.check(TokenKind::RParen) {
                    break;
                }
                names.push(self.parse_import_alias());
            }
            if paren {
                self.expect(TokenKind::RParen, "')'");
            }
        }
        Stmt::ImportFrom(ImportFromStmt {
            span: start,
            id: self.next_id(),
            dots,
            module,
            names,
            wildcard,
        })
    }

    fn parse_expr_or_assign_statement(&mut self) -> Stmt {
        let start = self.span();
        let first = self.parse_expr_list();
        if self.check(TokenKind::Colon) && !matches!(first, Expr::Tuple(_)) {
            self.advance();
            let annotation = self.parse_expr();
            let value = if self.eat(TokenKind::Eq) {
                Some(self.parse_expr_list())
            } else {
                None
            };
            let end = value.as_ref().map(|v| v.span()).unwrap_or(annotation.span());
            return Stmt::AnnotatedAssign(AnnotatedAssignStmt {
                span: start.merge(end),
                id: self.next_id(),
                target: first,
                annotation,
                value,
            });
        }
        if self.check(TokenKind::Eq) {
            let mut targets = vec![first];
            let mut value = None;
            while self.eat(TokenKind::Eq) {
                let next = self.parse_expr_list();
                value = Some(next);
                if self.check(TokenKind::Eq) {
                    targets.push(value.take().unwrap());
                }
            }
            let value = value.expect("assignment requires a value after '='");
            return Stmt::Assign(AssignStmt {
                span: start.merge(value.span()),
                id: self.next_id(),
                targets,
                value,
            });
        }
        if let Some(op) = augmented_assign_op(self.kind()) {
            self.advance();
            let value = self.parse_expr_list();
            let assign_span = start.merge(value.span());
            let rhs = Expr::Binary(BinaryExpr {
                span: assign_span,
                id: self.next_id(),
                op,
                left: Box::new(self.duplicate_expr(&first)),
                right: Box::new(value),
            });
            return Stmt::Assign(AssignStmt {
                span: assign_span,
                id: self.next_id(),
                targets: vec![first],
                value: rhs,
            });
        }
        Stmt::Expr(ExprStmt {
            span: first.span(),
            id: self.next_id(),
            value: first,
        })
    }

    // ------------------------------------------------------------------
    // Compound statements
    // ------------------------------------------------------------------

    fn parse_suite(&mut self) -> Vec<Stmt> {
        self.expect(TokenKind::Colon, "':'");
        if self.eat(TokenKind::Newline) {
            self.expect(TokenKind::Indent, "indented block");
            let mut body = Vec::new();
            self.skip_blank_lines();
            while !self.check(TokenKind::Dedent) && !self.at_eof() {
                body.push(self.parse_statement());
                self.skip_blank_lines();
            }
            self.expect(TokenKind::Dedent, "dedent");
            body
        } else {
            self.parse_simple_statement_line_body()
        }
    }

    fn parse_if(&mut self) -> Stmt {
        let start = self.advance().span;
        let test = self.parse_named_expr_or_expr();
        let body = self.parse_suite();
        // `elif` is parsed by recursing into `parse_if` itself: its first
        // action is to consume the current token (here `elif` rather than
        // `if`) as the statement's leading keyword, so one nested `If`
        // naturally represents the rest of the chain as `orelse`.
        let orelse = if self.check(TokenKind::KwElif) {
            vec![self.parse_if()]
        } else if self.eat(TokenKind::KwElse) {
            self.parse_suite()
        } else {
            Vec::new()
        };
        Stmt::If(IfStmt {
            span: start,
            id: self.next_id(),
            test,
            body,
            orelse,
        })
    }

    fn parse_while(&mut self) -> Stmt {
        let start = self.advance().span;
        let test = self.parse_named_expr_or_expr();
        let body = self.parse_suite();
        let orelse = if self.eat(TokenKind::KwElse) {
            self.parse_suite()
        } else {
            Vec::new()
        };
        Stmt::While(WhileStmt {
            span: start,
            id: self.next_id(),
            test,
            body,
            orelse,
        })
    }

    fn parse_for(&mut self, is_async: bool) -> Stmt {
        let start = self.advance().span;
        let target = self.parse_target_list();
        self.expect(TokenKind::KwIn, "'in'");
        let iter = self.parse_expr_list();
        let body = self.parse_suite();
        let orelse = if self.eat(TokenKind::KwElse) {
            self.parse_suite()
        } else {
            Vec::new()
        };
        Stmt::For(ForStmt {
            span: start,
            id: self.next_id(),
            is_async,
            target,
            iter,
            body,
            orelse,
        })
    }

    fn parse_with(&mut self, is_async: bool) -> Stmt {
        let start = self.advance().span;
        let paren = self.eat(TokenKind::LParen);
        let mut items = vec![self.parse_with_item()];
        while self.eat(TokenKind::Comma) {
            if paren && self.check(TokenKind::RParen) {
                break;
            }
            items.push(self.parse_with_item());
        }
        if paren {
            self.expect(TokenKind::RParen, "')'");
        }
        let body = self.parse_suite();
        Stmt::With(WithStmt {
            span: start,
            id: self.next_id(),
            is_async,
            items,
            body,
        })
    }

    fn parse_with_item(&mut self) -> WithItem {
        let context = self.parse_expr();
        let target = if self.eat(TokenKind::KwAs) {
            Some(self.parse_target())
        } else {
            None
        };
        WithItem { context, target }
    }

    fn parse_try(&mut self) -> Stmt {
        let start = self.advance().span;
        let body = self.parse_suite();
        let mut handlers = Vec::new();
        let mut seen_plain = false;
        let mut seen_star = false;
        while self.check(TokenKind::KwExcept) {
            let except_span = self.advance().span;
            let is_star = self.eat(TokenKind::Star);
            if is_star {
                seen_star = true;
            } else {
                seen_plain = true;
            }
            if seen_star && seen_plain {
                self.error_here(ParseError::MixedExceptStar { span: except_span });
            }
            let exception_type = if self.check(TokenKind::Colon) {
                None
            } else {
                Some(self.parse_expr())
            };
            let target = if self.eat(TokenKind::KwAs) {
                Some(self.expect_name())
            } else {
                None
            };
            let handler_body = self.parse_suite();
            handlers.push(ExceptHandler {
                span: except_span,
                exception_type,
                target,
                body: handler_body,
                is_star,
            });
        }
        let orelse = if self.eat(TokenKind::KwElse) {
            self.parse_suite()
        } else {
            Vec::new()
        };
        let finally = if self.eat(TokenKind::KwFinally) {
            self.parse_suite()
        } else {
            Vec::new()
        };
        Stmt::Try(TryStmt {
            span: start,
            id: self.next_id(),
            body,
            handlers,
            orelse,
            finally,
        })
    }

    fn parse_type_params(&mut self) -> Vec<TypeParamExpr> {
        if !self.eat(TokenKind::LBracket) {
            return Vec::new();
        }
        let mut params = Vec::new();
        while !self.check(TokenKind::RBracket) && !self.at_eof() {
            let start = self.span();
            let kind = if self.eat(TokenKind::Star) {
                TypeParamKind::TypeVarTuple
            } else if self.eat(TokenKind::DoubleStar) {
                TypeParamKind::ParamSpec
            } else {
                TypeParamKind::TypeVar
            };
            let name = self.expect_name();
            let bound = if self.eat(TokenKind::Colon) {
                Some(Box::new(self.parse_expr()))
            } else {
                None
            };
            params.push(TypeParamExpr {
                span: start,
                id: self.next_id(),
                kind,
                name,
                bound,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBracket, "']'");
        params
    }

    fn parse_function(&mut self, is_async: bool) -> Stmt {
        let start = self.advance().span;
        let name = self.expect_name();
        let type_params = self.parse_type_params();
        self.expect(TokenKind::LParen, "'('");
        let params = self.parse_param_list();
        self.expect(TokenKind::RParen, "')'");
        let return_type = if self.eat(TokenKind::Arrow) {
            Some(self.parse_expr())
        } else {
            None
        };
        self.func_depth += 1;
        let body = self.parse_suite();
        self.func_depth -= 1;
        Stmt::Function(FunctionStmt {
            span: start,
            id: self.next_id(),
            is_async,
            name,
            type_params,
            params,
            return_type,
            body,
        })
    }

    fn parse_view(&mut self) -> Stmt {
        let start = self.advance().span;
        let name = self.expect_name();
        let type_params = self.parse_type_params();
        self.expect(TokenKind::LParen, "'('");
        let params = self.parse_param_list();
        self.expect(TokenKind::RParen, "')'");
        self.func_depth += 1;
        let body = self.parse_suite();
        self.func_depth -= 1;
        Stmt::View(ViewStmt {
            span: start,
            id: self.next_id(),
            name,
            type_params,
            params,
            body,
        })
    }

    /// Parses a parameter list honoring the positional-only `/` marker,
    /// `*`/`*args`, keyword-only parameters, and `**kwargs` ordering
    /// (§4.2 edge-case policies).
    fn parse_param_list(&mut self) -> ParamList {
        let mut list = ParamList::default();
        let mut seen_slash = false;
        let mut seen_star = false;
        let mut pending_positional = Vec::new();

        while !self.check(TokenKind::RParen) && !self.at_eof() {
            if self.check(TokenKind::Slash) {
                let span = self.advance().span;
                if seen_slash || seen_star {
                    self.error_here(ParseError::IllegalParameterOrder {
                        reason: "'/' may appear at most once and before any keyword-only marker",
                        span,
                    });
                }
                seen_slash = true;
                list.positional_only.append(&mut pending_positional);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
                continue;
            }
            if self.check(TokenKind::DoubleStar) {
                self.advance();
                list.kwarg = Some(self.parse_param());
                self.eat(TokenKind::Comma);
                break;
            }
            if self.check(TokenKind::Star) {
                let span = self.advance().span;
                if seen_star {
                    self.error_here(ParseError::IllegalParameterOrder {
                        reason: "only one '*' or '*args' marker is allowed",
                        span,
                    });
                }
                seen_star = true;
                list.positional_or_keyword.append(&mut pending_positional);
                if self.check(TokenKind::Comma) || self.check(TokenKind::RParen) {
                    // bare '*' marker: everything after is keyword-only
                } else {
                    list.vararg = Some(self.parse_param());
                }
                if !self.eat(TokenKind::Comma) {
                    break;
                }
                continue;
            }
            let param = self.parse_param();
            if seen_star {
                list.keyword_only.push(param);
            } else {
                pending_positional.push(param);
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        list.positional_or_keyword.append(&mut pending_positional);
        list
    }

    fn parse_param(&mut self) -> Param {
        let start = self.span();
        let name = self.expect_name();
        let annotation = if self.eat(TokenKind::Colon) {
            Some(self.parse_expr())
        } else {
            None
        };
        let default = if self.eat(TokenKind::Eq) {
            Some(self.parse_expr())
        } else {
            None
        };
        Param {
            name,
            annotation,
            default,
            span: start,
        }
    }

    fn parse_decorated(&mut self) -> Stmt {
        let start = self.span();
        let mut decorators = Vec::new();
        while self.check(TokenKind::At) {
            self.advance();
            decorators.push(self.parse_expr());
            self.eat(TokenKind::Newline);
        }
        let target = Box::new(self.parse_statement());
        Stmt::Decorated(DecoratedStmt {
            span: start.merge(target.span()),
            id: self.next_id(),
            decorators,
            target,
        })
    }

    fn parse_class(&mut self) -> Stmt {
        let start = self.advance().span;
        let name = self.expect_name();
        let type_params = self.parse_type_params();
        let mut bases = Vec::new();
        let mut keywords = Vec::new();
        if self.eat(TokenKind::LParen) {
            while !self.check(TokenKind::RParen) && !self.at_eof() {
                if self.check(TokenKind::Name) && self.peek_kind_at(1) == TokenKind::Eq {
                    let key = self.expect_name();
                    self.advance();
                    keywords.push((key, self.parse_expr()));
                } else {
                    bases.push(self.parse_expr());
                }
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "')'");
        }
        let body = self.parse_suite();
        Stmt::Class(ClassStmt {
            span: start,
            id: self.next_id(),
            name,
            type_params,
            bases,
            keywords,
            body,
        })
    }

    fn parse_type_alias(&mut self) -> Stmt {
        let start = self.advance().span;
        let name = self.expect_name();
        let type_params = self.parse_type_params();
        self.expect(TokenKind::Eq, "'='");
        let value = self.parse_expr();
        Stmt::TypeAlias(TypeAliasStmt {
            span: start,
            id: self.next_id(),
            name,
            type_params,
            value,
        })
    }

    fn parse_match(&mut self) -> Stmt {
        let start = self.advance().span;
        let subject = self.parse_expr_list();
        self.expect(TokenKind::Colon, "':'");
        self.expect(TokenKind::Newline, "newline");
        self.expect(TokenKind::Indent, "indented match body");
        let mut cases = Vec::new();
        self.skip_blank_lines();
        while self.check(TokenKind::KwCase) {
            let case_start = self.advance().span;
            let pattern = self.parse_or_pattern();
            let guard = if self.eat(TokenKind::KwIf) {
                Some(self.parse_expr())
            } else {
                None
            };
            let body = self.parse_suite();
            cases.push(MatchCase {
                span: case_start,
                pattern,
                guard,
                body,
            });
            self.skip_blank_lines();
        }
        self.expect(TokenKind::Dedent, "dedent");
        Stmt::Match(MatchStmt {
            span: start,
            id: self.next_id(),
            subject,
            cases,
        })
    }

    // ------------------------------------------------------------------
    // Patterns
    // ------------------------------------------------------------------

    fn parse_or_pattern(&mut self) -> Pattern {
        let start = self.span();
        let first = self.parse_as_pattern();
        if !self.check(TokenKind::Pipe) {
            return first;
        }
        let mut alternatives = vec![first];
        while self.eat(TokenKind::Pipe) {
            alternatives.push(self.parse_as_pattern());
        }
        Pattern::Or(OrPattern {
            span: start,
            id: self.next_id(),
            alternatives,
        })
    }

    fn parse_as_pattern(&mut self) -> Pattern {
        let start = self.span();
        let pattern = self.parse_atom_pattern();
        if self.eat(TokenKind::KwAs) {
            let name = self.expect_name();
            return Pattern::As(AsPattern {
                span: start,
                id: self.next_id(),
                pattern: Box::new(pattern),
                name,
            });
        }
        pattern
    }

    fn parse_atom_pattern(&mut self) -> Pattern {
        let start = self.span();
        match self.kind() {
            TokenKind::Name if self.current().lexeme == "_" => {
                self.advance();
                Pattern::Wildcard(WildcardPattern {
                    span: start,
                    id: self.next_id(),
                })
            }
            TokenKind::Name if self.peek_kind_at(1) == TokenKind::Dot => {
                let path = self.parse_primary();
                if self.check(TokenKind::LParen) {
                    self.parse_class_pattern(path, start)
                } else {
                    Pattern::Value(ValuePattern {
                        span: start,
                        id: self.next_id(),
                        path: Box::new(path),
                    })
                }
            }
            TokenKind::Name if self.peek_kind_at(1) == TokenKind::LParen => {
                let path = self.parse_primary_name_only();
                self.parse_class_pattern(path, start)
            }
            TokenKind::Name => {
                let name = self.advance().lexeme;
                Pattern::Capture(CapturePattern {
                    span: start,
                    id: self.next_id(),
                    name,
                })
            }
            TokenKind::Int
            | TokenKind::Float
            | TokenKind::Complex
            | TokenKind::Str
            | TokenKind::Bytes
            | TokenKind::KwTrue
            | TokenKind::KwFalse
            | TokenKind::KwNone => {
                let tok = self.advance();
                Pattern::Literal(LiteralPattern {
                    span: start,
                    id: self.next_id(),
                    value: tok.value.unwrap_or(LiteralValue::None),
                })
            }
            TokenKind::LParen | TokenKind::LBracket => self.parse_sequence_pattern(),
            TokenKind::LBrace => self.parse_mapping_pattern(),
            TokenKind::Star => {
                self.advance();
                let name = if self.check(TokenKind::Name) && self.current().lexeme != "_" {
                    Some(self.expect_name())
                } else {
                    if self.check(TokenKind::Name) {
                        self.advance();
                    }
                    None
                };
                Pattern::Star(StarPattern {
                    span: start,
                    id: self.next_id(),
                    name,
                })
            }
            _ => {
                let span = self.span();
                self.error_here(ParseError::UnexpectedToken {
                    found: self.kind(),
                    span,
                });
                self.advance();
                Pattern::Wildcard(WildcardPattern {
                    span,
                    id: self.next_id(),
                })
            }
        }
    }

    fn parse_primary_name_only(&mut self) -> Expr {
        let name = self.expect_name();
        let span = self.tokens[self.pos.saturating_sub(1)].span;
        Expr::Name(NameExpr {
            span,
            id: self.next_id(),
            value: name,
        })
    }

    fn parse_class_pattern(&mut self, path: Expr, start: Span) -> Pattern {
        self.expect(TokenKind::LParen, "'('");
        let mut positional = Vec::new();
        let mut keyword = Vec::new();
        while !self.check(TokenKind::RParen) && !self.at_eof() {
            if self.check(TokenKind::Name) && self.peek_kind_at(1) == TokenKind::Eq {
                let name = self.expect_name();
                self.advance();
                keyword.push(ClassPatternKeyword {
                    name,
                    pattern: self.parse_or_pattern(),
                });
            } else {
                positional.push(self.parse_or_pattern());
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'");
        Pattern::Class(ClassPattern {
            span: start,
            id: self.next_id(),
            path: Box::new(path),
            positional,
            keyword,
        })
    }

    fn parse_sequence_pattern(&mut self) -> Pattern {
        let close = if self.check(TokenKind::LParen) {
            TokenKind::RParen
        } else {
            TokenKind::RBracket
        };
        let start = self.advance().span;
        let mut elements = Vec::new();
        while !self.check(close) && !self.at_eof() {
            elements.push(self.parse_or_pattern());
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(close, "closing bracket");
        Pattern::Sequence(SequencePattern {
            span: start,
            id: self.next_id(),
            elements,
        })
    }

    fn parse_mapping_pattern(&mut self) -> Pattern {
        let start = self.advance().span;
        let mut entries = Vec::new();
        let mut rest = None;
        while !self.check(TokenKind::RBrace) && !self.at_eof() {
            if self.eat(TokenKind::DoubleStar) {
                rest = Some(self.expect_name());
            } else {
                let key = self.parse_primary();
                self.expect(TokenKind::Colon, "':'");
                let value = self.parse_or_pattern();
                entries.push(MappingEntry { key, value });
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "'}'");
        Pattern::Mapping(MappingPattern {
            span: start,
            id: self.next_id(),
            entries,
            rest,
        })
    }

    // ------------------------------------------------------------------
    // Targets (assignment / for / with-as left-hand sides)
    // ------------------------------------------------------------------

    fn parse_target(&mut self) -> Expr {
        self.parse_primary()
    }

    fn parse_target_list(&mut self) -> Expr {
        let start = self.span();
        let first = self.parse_star_target();
        if !self.check(TokenKind::Comma) {
            return first;
        }
        let mut elements = vec![first];
        while self.eat(TokenKind::Comma) {
            if self.starts_expr() {
                elements.push(self.parse_star_target());
            } else {
                break;
            }
        }
        Expr::Tuple(TupleExpr {
            span: start,
            id: self.next_id(),
            elements,
        })
    }

    fn parse_star_target(&mut self) -> Expr {
        if self.check(TokenKind::Star) {
            let start = self.advance().span;
            let value = self.parse_primary();
            return Expr::Star(StarExpr {
                span: start.merge(value.span()),
                id: self.next_id(),
                value: Box::new(value),
            });
        }
        self.parse_primary()
    }

    // ------------------------------------------------------------------
    // Expressions — entry points
    // ------------------------------------------------------------------

    pub(crate) fn parse_expr(&mut self) -> Expr {
        if self.check(TokenKind::KwLambda) {
            return self.parse_lambda();
        }
        self.parse_ternary()
    }

    /// `expr` in contexts where a bare, comma-joined tuple is legal
    /// without parens (return/assignment RHS, for-loop iterable, ...).
    fn parse_expr_list(&mut self) -> Expr {
        let start = self.span();
        let first = self.parse_star_or_expr();
        if !self.check(TokenKind::Comma) {
            return first;
        }
        let mut elements = vec![first];
        while self.eat(TokenKind::Comma) {
            if !self.starts_expr() {
                break;
            }
            elements.push(self.parse_star_or_expr());
        }
        Expr::Tuple(TupleExpr {
            span: start,
            id: self.next_id(),
            elements,
        })
    }

    fn parse_star_or_expr(&mut self) -> Expr {
        if self.check(TokenKind::Star) {
            let start = self.advance().span;
            let value = self.parse_ternary();
            return Expr::Star(StarExpr {
                span: start.merge(value.span()),
                id: self.next_id(),
                value: Box::new(value),
            });
        }
        self.parse_expr()
    }

    fn parse_named_expr_or_expr(&mut self) -> Expr {
        self.parse_expr()
    }

    fn starts_expr(&self) -> bool {
        !matches!(
            self.kind(),
            TokenKind::Newline
                | TokenKind::Eof
                | TokenKind::Colon
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::Semicolon
        )
    }

    fn parse_lambda(&mut self) -> Expr {
        let start = self.advance().span;
        let mut params = ParamList::default();
        while !self.check(TokenKind::Colon) && !self.at_eof() {
            if self.check(TokenKind::Star) {
                self.advance();
                if self.check(TokenKind::Comma) || self.check(TokenKind::Colon) {
                    // bare '*'
                } else {
                    params.vararg = Some(self.parse_lambda_param());
                }
            } else if self.check(TokenKind::DoubleStar) {
                self.advance();
                params.kwarg = Some(self.parse_lambda_param());
            } else {
                params.positional_or_keyword.push(self.parse_lambda_param());
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Colon, "':'");
        let body = self.parse_expr();
        Expr::Lambda(LambdaExpr {
            span: start.merge(body.span()),
            id: self.next_id(),
            params,
            body: Box::new(body),
        })
    }

    fn parse_lambda_param(&mut self) -> Param {
        let start = self.span();
        let name = self.expect_name();
        let default = if self.eat(TokenKind::Eq) {
            Some(self.parse_expr())
        } else {
            None
        };
        Param {
            name,
            annotation: None,
            default,
            span: start,
        }
    }

    fn parse_ternary(&mut self) -> Expr {
        let body = self.parse_or();
        if self.check(TokenKind::KwIf) {
            self.advance();
            let test = self.parse_or();
            self.expect(TokenKind::KwElse, "'else'");
            let orelse = self.parse_expr();
            return Expr::Ternary(TernaryExpr {
                span: body.span().merge(orelse.span()),
                id: self.next_id(),
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            });
        }
        body
    }

    fn parse_or(&mut self) -> Expr {
        let mut left = self.parse_and();
        while self.check(TokenKind::KwOr) {
            self.advance();
            let right = self.parse_and();
            left = Expr::Binary(BinaryExpr {
                span: left.span().merge(right.span()),
                id: self.next_id(),
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        left
    }

    fn parse_and(&mut self) -> Expr {
        let mut left = self.parse_not();
        while self.check(TokenKind::KwAnd) {
            self.advance();
            let right = self.parse_not();
            left = Expr::Binary(BinaryExpr {
                span: left.span().merge(right.span()),
                id: self.next_id(),
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        left
    }

    fn parse_not(&mut self) -> Expr {
        if self.check(TokenKind::KwNot) {
            let start = self.advance().span;
            let operand = self.parse_not();
            return Expr::Unary(UnaryExpr {
                span: start.merge(operand.span()),
                id: self.next_id(),
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn comparison_op(&mut self) -> Option<BinaryOp> {
        match self.kind() {
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::LtEq => Some(BinaryOp::LtEq),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::GtEq => Some(BinaryOp::GtEq),
            TokenKind::EqEq => Some(BinaryOp::Eq),
            TokenKind::NotEq => Some(BinaryOp::NotEq),
            TokenKind::KwIs => {
                if self.peek_kind_at(1) == TokenKind::KwNot {
                    Some(BinaryOp::IsNot)
                } else {
                    Some(BinaryOp::Is)
                }
            }
            TokenKind::KwIn => Some(BinaryOp::In),
            TokenKind::KwNot if self.peek_kind_at(1) == TokenKind::KwIn => Some(BinaryOp::NotIn),
            _ => None,
        }
    }

    /// Chained comparisons (`a < b < c`) desugar at parse time into
    /// `(a < b) and (b < c)`; the shared middle operand is duplicated
    /// with a fresh [`NodeId`] but an identical span (§4.2, §9 open
    /// question).
    fn parse_comparison(&mut self) -> Expr {
        let left = self.parse_bitor();
        let mut comparators: Vec<(BinaryOp, Expr)> = Vec::new();
        while let Some(op) = self.comparison_op() {
            match op {
                BinaryOp::IsNot => {
                    self.advance();
                    self.advance();
                }
                BinaryOp::NotIn => {
                    self.advance();
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
            let right = self.parse_bitor();
            comparators.push((op, right));
        }
        if comparators.is_empty() {
            return left;
        }
        let mut prev_right = comparators[0].1.clone();
        let mut result = Expr::Binary(BinaryExpr {
            span: left.span().merge(prev_right.span()),
            id: self.next_id(),
            op: comparators[0].0,
            left: Box::new(left),
            right: Box::new(prev_right.clone()),
        });
        for (op, right) in comparators.into_iter().skip(1) {
            let left_dup = self.duplicate_expr(&prev_right);
            let segment = Expr::Binary(BinaryExpr {
                span: left_dup.span().merge(right.span()),
                id: self.next_id(),
                op,
                left: Box::new(left_dup),
                right: Box::new(right.clone()),
            });
            result = Expr::Binary(BinaryExpr {
                span: result.span().merge(segment.span()),
                id: self.next_id(),
                op: BinaryOp::And,
                left: Box::new(result),
                right: Box::new(segment),
            });
            prev_right = right;
        }
        result
    }

    /// Structurally clones `expr`, assigning a fresh [`NodeId`] to it
    /// and to every node it owns, so the duplicate can be owned
    /// independently in the desugared tree while keeping its span.
    fn duplicate_expr(&mut self, expr: &Expr) -> Expr {
        let mut clone = expr.clone();
        self.renumber_expr(&mut clone);
        clone
    }

    fn renumber_expr(&mut self, expr: &mut Expr) {
        macro_rules! id {
            ($target:expr) => {
                $target.id = self.next_id();
            };
        }
        match expr {
            Expr::Name(e) => id!(e),
            Expr::Literal(e) => id!(e),
            Expr::Attribute(e) => {
                id!(e);
                self.renumber_expr(&mut e.value);
            }
            Expr::Call(e) => {
                id!(e);
                self.renumber_expr(&mut e.func);
                for arg in &mut e.args {
                    match arg {
                        Argument::Positional(x) | Argument::Star(x) | Argument::DoubleStar(x) => {
                            self.renumber_expr(x)
                        }
                        Argument::Keyword { value, .. } => self.renumber_expr(value),
                    }
                }
            }
            Expr::Subscript(e) => {
                id!(e);
                self.renumber_expr(&mut e.value);
                self.renumber_expr(&mut e.index);
            }
            Expr::Binary(e) => {
                id!(e);
                self.renumber_expr(&mut e.left);
                self.renumber_expr(&mut e.right);
            }
            Expr::Unary(e) => {
                id!(e);
                self.renumber_expr(&mut e.operand);
            }
            Expr::Group(e) => {
                id!(e);
                self.renumber_expr(&mut e.inner);
            }
            Expr::Star(e) => {
                id!(e);
                self.renumber_expr(&mut e.value);
            }
            Expr::List(e) => {
                id!(e);
                for el in &mut e.elements {
                    self.renumber_expr(el);
                }
            }
            Expr::Tuple(e) => {
                id!(e);
                for el in &mut e.elements {
                    self.renumber_expr(el);
                }
            }
            Expr::Set(e) => {
                id!(e);
                for el in &mut e.elements {
                    self.renumber_expr(el);
                }
            }
            other => {
                // Less commonly chained forms (lambda, comprehensions, HTML,
                // f-strings, ...): reassign the top id only.
                if let Some(id_field) = other_id_mut(other) {
                    *id_field = self.next_id();
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Binary precedence ladder
    // ------------------------------------------------------------------

    fn parse_bitor(&mut self) -> Expr {
        let mut left = self.parse_bitxor();
        while self.check(TokenKind::Pipe) {
            self.advance();
            let right = self.parse_bitxor();
            left = self.binary(BinaryOp::BitOr, left, right);
        }
        left
    }

    fn parse_bitxor(&mut self) -> Expr {
        let mut left = self.parse_bitand();
        while self.check(TokenKind::Caret) {
            self.advance();
            let right = self.parse_bitand();
            left = self.binary(BinaryOp::BitXor, left, right);
        }
        left
    }

    fn parse_bitand(&mut self) -> Expr {
        let mut left = self.parse_shift();
        while self.check(TokenKind::Amper) {
            self.advance();
            let right = self.parse_shift();
            left = self.binary(BinaryOp::BitAnd, left, right);
        }
        left
    }

    fn parse_shift(&mut self) -> Expr {
        let mut left = self.parse_additive();
        loop {
            let op = match self.kind() {
                TokenKind::LShift => BinaryOp::LShift,
                TokenKind::RShift => BinaryOp::RShift,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive();
            left = self.binary(op, left, right);
        }
        left
    }

    fn parse_additive(&mut self) -> Expr {
        let mut left = self.parse_multiplicative();
        loop {
            let op = match self.kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative();
            left = self.binary(op, left, right);
        }
        left
    }

    fn parse_multiplicative(&mut self) -> Expr {
        let mut left = self.parse_unary();
        loop {
            let op = match self.kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::DoubleSlash => BinaryOp::FloorDiv,
                TokenKind::Percent => BinaryOp::Mod,
                TokenKind::At => BinaryOp::MatMul,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary();
            left = self.binary(op, left, right);
        }
        left
    }

    fn parse_unary(&mut self) -> Expr {
        let op = match self.kind() {
            TokenKind::Plus => Some(UnaryOp::Pos),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Tilde => Some(UnaryOp::Invert),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.advance().span;
            let operand = self.parse_unary();
            return Expr::Unary(UnaryExpr {
                span: start.merge(operand.span()),
                id: self.next_id(),
                op,
                operand: Box::new(operand),
            });
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Expr {
        let left = self.parse_await();
        if self.check(TokenKind::DoubleStar) {
            self.advance();
            let right = self.parse_unary();
            return self.binary(BinaryOp::Pow, left, right);
        }
        left
    }

    fn parse_await(&mut self) -> Expr {
        if self.check(TokenKind::KwAwait) {
            let start = self.advance().span;
            let value = self.parse_await();
            return Expr::Await(AwaitExpr {
                span: start.merge(value.span()),
                id: self.next_id(),
                value: Box::new(value),
            });
        }
        self.parse_primary()
    }

    fn binary(&mut self, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary(BinaryExpr {
            span: left.span().merge(right.span()),
            id: self.next_id(),
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    // ------------------------------------------------------------------
    // Primary / postfix chain, atoms
    // ------------------------------------------------------------------

    fn parse_primary(&mut self) -> Expr {
        let mut expr = self.parse_atom();
        loop {
            match self.kind() {
                TokenKind::Dot => {
                    self.advance();
                    let attr = self.expect_name();
                    let span = expr.span().merge(self.tokens[self.pos.saturating_sub(1)].span);
                    expr = Expr::Attribute(AttributeExpr {
                        span,
                        id: self.next_id(),
                        value: Box::new(expr),
                        attr,
                    });
                }
                TokenKind::LParen => {
                    let args = self.parse_call_args();
                    let end = self.tokens[self.pos.saturating_sub(1)].span;
                    expr = Expr::Call(CallExpr {
                        span: expr.span().merge(end),
                        id: self.next_id(),
                        func: Box::new(expr),
                        args,
                    });
                }
                TokenKind::LBracket => {
                    self.advance();
                    expr = self.parse_subscript(expr);
                }
                _ => break,
            }
        }
        expr
    }

    fn parse_call_args(&mut self) -> Vec<Argument> {
        self.advance(); // '('
        let mut args = Vec::new();
        while !self.check(TokenKind::RParen) && !self.at_eof() {
            if self.check(TokenKind::DoubleStar) {
                self.advance();
                args.push(Argument::DoubleStar(self.parse_expr()));
            } else if self.check(TokenKind::Star) {
                self.advance();
                args.push(Argument::Star(self.parse_expr()));
            } else if self.check(TokenKind::Name) && self.peek_kind_at(1) == TokenKind::Eq {
                let name = self.expect_name();
                self.advance();
                args.push(Argument::Keyword {
                    name,
                    value: self.parse_expr(),
                });
            } else {
                args.push(Argument::Positional(self.parse_expr()));
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'");
        args
    }

    /// Parses `[...]` after `expr[`, producing `Subscript` for a plain
    /// index or `Slice` when a `:` is present.
    fn parse_subscript(&mut self, value: Expr) -> Expr {
        let start = value.span();
        if self.check(TokenKind::Colon) {
            return self.finish_slice(value, start, None);
        }
        let first = self.parse_expr();
        if self.check(TokenKind::Colon) {
            return self.finish_slice(value, start, Some(first));
        }
        self.expect(TokenKind::RBracket, "']'");
        Expr::Subscript(SubscriptExpr {
            span: start.merge(self.tokens[self.pos.saturating_sub(1)].span),
            id: self.next_id(),
            value: Box::new(value),
            index: Box::new(first),
        })
    }

    fn finish_slice(&mut self, value: Expr, start: Span, lower: Option<Expr>) -> Expr {
        self.expect(TokenKind::Colon, "':'");
        let upper = if self.check(TokenKind::Colon) || self.check(TokenKind::RBracket) {
            None
        } else {
            Some(self.parse_expr())
        };
        let step = if self.eat(TokenKind::Colon) {
            if self.check(TokenKind::RBracket) {
                None
            } else {
                Some(self.parse_expr())
            }
        } else {
            None
        };
        self.expect(TokenKind::RBracket, "']'");
        let end = self.tokens[self.pos.saturating_sub(1)].span;
        let slice = SliceExpr {
            span: start.merge(end),
            id: self.next_id(),
            lower: lower.map(Box::new),
            upper: upper.map(Box::new),
            step: step.map(Box::new),
        };
        Expr::Subscript(SubscriptExpr {
            span: start.merge(end),
            id: self.next_id(),
            value: Box::new(value),
            index: Box::new(Expr::Slice(slice)),
        })
    }

    fn parse_atom(&mut self) -> Expr {
        let start = self.span();
        match self.kind() {
            TokenKind::Name => {
                let name = self.advance().lexeme;
                let name_expr = NameExpr {
                    span: start,
                    id: self.next_id(),
                    value: name,
                };
                if self.check(TokenKind::ColonEq) {
                    self.advance();
                    let value = self.parse_expr();
                    return Expr::NamedExpr(NamedExprExpr {
                        span: start.merge(value.span()),
                        id: self.next_id(),
                        target: name_expr,
                        value: Box::new(value),
                    });
                }
                Expr::Name(name_expr)
            }
            TokenKind::Int | TokenKind::Float | TokenKind::Complex | TokenKind::Str | TokenKind::Bytes => {
                let tok = self.advance();
                Expr::Literal(LiteralExpr {
                    span: start,
                    id: self.next_id(),
                    value: tok.value.unwrap_or(LiteralValue::None),
                })
            }
            TokenKind::KwTrue => {
                self.advance();
                Expr::Literal(LiteralExpr {
                    span: start,
                    id: self.next_id(),
                    value: LiteralValue::Bool(true),
                })
            }
            TokenKind::KwFalse => {
                self.advance();
                Expr::Literal(LiteralExpr {
                    span: start,
                    id: self.next_id(),
                    value: LiteralValue::Bool(false),
                })
            }
            TokenKind::KwNone => {
                self.advance();
                Expr::Literal(LiteralExpr {
                    span: start,
                    id: self.next_id(),
                    value: LiteralValue::None,
                })
            }
            TokenKind::Ellipsis => {
                self.advance();
                Expr::Literal(LiteralExpr {
                    span: start,
                    id: self.next_id(),
                    value: LiteralValue::Ellipsis,
                })
            }
            TokenKind::FStringStart => self.parse_fstring(),
            TokenKind::KwYield => self.parse_yield_expr(),
            TokenKind::LParen => self.parse_paren_atom(),
            TokenKind::LBracket => self.parse_bracket_atom(),
            TokenKind::LBrace => self.parse_brace_atom(),
            TokenKind::HtmlOpen => html::parse_html_element(self),
            _ => {
                let span = self.span();
                self.error_here(ParseError::UnexpectedToken {
                    found: self.kind(),
                    span,
                });
                if !self.at_eof() {
                    self.advance();
                }
                Expr::Literal(LiteralExpr {
                    span,
                    id: self.next_id(),
                    value: LiteralValue::None,
                })
            }
        }
    }

    fn parse_yield_expr(&mut self) -> Expr {
        let start = self.advance().span;
        if self.eat(TokenKind::KwFrom) {
            let value = self.parse_expr();
            return Expr::Yield(YieldExpr {
                span: start.merge(value.span()),
                id: self.next_id(),
                kind: YieldKind::From(Box::new(value)),
            });
        }
        if !self.func_depth_allows_yield() {
            self.error_here(ParseError::IllegalOutsideFunction {
                what: "'yield'",
                span: start,
            });
        }
        let value = if self.starts_expr() {
            Some(Box::new(self.parse_expr_list()))
        } else {
            None
        };
        Expr::Yield(YieldExpr {
            span: start,
            id: self.next_id(),
            kind: YieldKind::Value(value),
        })
    }

    fn func_depth_allows_yield(&self) -> bool {
        self.func_depth > 0
    }

    fn parse_paren_atom(&mut self) -> Expr {
        let start = self.advance().span;
        if self.check(TokenKind::RParen) {
            let end = self.advance().span;
            return Expr::Tuple(TupleExpr {
                span: start.merge(end),
                id: self.next_id(),
                elements: Vec::new(),
            });
        }
        let first = self.parse_star_or_expr();
        if self.check(TokenKind::KwFor) || self.check(TokenKind::KwAsync) {
            let clauses = self.parse_comprehension_clauses();
            let end = self.expect(TokenKind::RParen, "')'").span;
            return Expr::GeneratorExp(ComprehensionExpr {
                span: start.merge(end),
                id: self.next_id(),
                element: Box::new(first),
                clauses,
            });
        }
        if self.check(TokenKind::Comma) {
            let mut elements = vec![first];
            while self.eat(TokenKind::Comma) {
                if self.check(TokenKind::RParen) {
                    break;
                }
                elements.push(self.parse_star_or_expr());
            }
            let end = self.expect(TokenKind::RParen, "')'").span;
            return Expr::Tuple(TupleExpr {
                span: start.merge(end),
                id: self.next_id(),
                elements,
            });
        }
        let end = self.expect(TokenKind::RParen, "')'").span;
        Expr::Group(GroupExpr {
            span: start.merge(end),
            id: self.next_id(),
            inner: Box::new(first),
        })
    }

    fn parse_bracket_atom(&mut self) -> Expr {
        let start = self.advance().span;
        if self.check(TokenKind::RBracket) {
            let end = self.advance().span;
            return Expr::List(ListExpr {
                span: start.merge(end),
                id: self.next_id(),
                elements: Vec::new(),
            });
        }
        let first = self.parse_star_or_expr();
        if self.check(TokenKind::KwFor) || self.check(TokenKind::KwAsync) {
            let clauses = self.parse_comprehension_clauses();
            let end = self.expect(TokenKind::RBracket, "']'").span;
            return Expr::ListComp(ComprehensionExpr {
                span: start.merge(end),
                id: self.next_id(),
                element: Box::new(first),
                clauses,
            });
        }
        let mut elements = vec![first];
        while self.eat(TokenKind::Comma) {
            if self.check(TokenKind::RBracket) {
                break;
            }
            elements.push(self.parse_star_or_expr());
        }
        let end = self.expect(TokenKind::RBracket, "']'").span;
        Expr::List(ListExpr {
            span: start.merge(end),
            id: self.next_id(),
            elements,
        })
    }

    fn parse_brace_atom(&mut self) -> Expr {
        let start = self.advance().span;
        if self.check(TokenKind::RBrace) {
            let end = self.advance().span;
            return Expr::Dict(DictExpr {
                span: start.merge(end),
                id: self.next_id(),
                entries: Vec::new(),
            });
        }
        if self.eat(TokenKind::DoubleStar) {
            let spread = self.parse_or();
            let mut entries = vec![DictEntry {
                key: None,
                value: spread,
            }];
            while self.eat(TokenKind::Comma) {
                if self.check(TokenKind::RBrace) {
                    break;
                }
                entries.push(self.parse_dict_entry());
            }
            let end = self.expect(TokenKind::RBrace, "'}'").span;
            return Expr::Dict(DictExpr {
                span: start.merge(end),
                id: self.next_id(),
                entries,
            });
        }
        let first = self.parse_star_or_expr();
        if self.check(TokenKind::Colon) {
            self.advance();
            let value = self.parse_expr();
            if self.check(TokenKind::KwFor) || self.check(TokenKind::KwAsync) {
                let clauses = self.parse_comprehension_clauses();
                let end = self.expect(TokenKind::RBrace, "'}'").span;
                return Expr::DictComp(DictComprehensionExpr {
                    span: start.merge(end),
                    id: self.next_id(),
                    key: Box::new(first),
                    value: Box::new(value),
                    clauses,
                });
            }
            let mut entries = vec![DictEntry {
                key: Some(first),
                value,
            }];
            while self.eat(TokenKind::Comma) {
                if self.check(TokenKind::RBrace) {
                    break;
                }
                entries.push(self.parse_dict_entry());
            }
            let end = self.expect(TokenKind::RBrace, "'}'").span;
            return Expr::Dict(DictExpr {
                span: start.merge(end),
                id: self.next_id(),
                entries,
            });
        }
        if self.check(TokenKind::KwFor) || self.check(TokenKind::KwAsync) {
            let clauses = self.parse_comprehension_clauses();
            let end = self.expect(TokenKind::RBrace, "'}'").span;
            return Expr::SetComp(ComprehensionExpr {
                span: start.merge(end),
                id: self.next_id(),
                element: Box::new(first),
                clauses,
            });
        }
        let mut elements = vec![first];
        while self.eat(TokenKind::Comma) {
            if self.check(TokenKind::RBrace) {
                break;
            }
            elements.push(self.parse_star_or_expr());
        }
        let end = self.expect(TokenKind::RBrace, "'}'").span;
        Expr::Set(SetExpr {
            span: start.merge(end),
            id: self.next_id(),
            elements,
        })
    }

    fn parse_dict_entry(&mut self) -> DictEntry {
        if self.eat(TokenKind::DoubleStar) {
            return DictEntry {
                key: None,
                value: self.parse_or(),
            };
        }
        let key = self.parse_expr();
        self.expect(TokenKind::Colon, "':'");
        let value = self.parse_expr();
        DictEntry {
            key: Some(key),
            value,
        }
    }

    fn parse_comprehension_clauses(&mut self) -> Vec<ComprehensionClause> {
        let mut clauses = Vec::new();
        loop {
            let is_async = self.eat(TokenKind::KwAsync);
            if !self.check(TokenKind::KwFor) {
                if is_async {
                    self.error_here(ParseError::Expected {
                        expected: "'for'",
                        found: self.kind(),
                        span: self.span(),
                    });
                }
                break;
            }
            self.advance();
            let target = self.parse_target_list();
            self.expect(TokenKind::KwIn, "'in'");
            let iter = self.parse_or();
            let mut ifs = Vec::new();
            while self.check(TokenKind::KwIf) {
                self.advance();
                ifs.push(self.parse_or());
            }
            clauses.push(ComprehensionClause {
                is_async,
                target,
                iter,
                ifs,
            });
        }
        clauses
    }

    fn parse_fstring(&mut self) -> Expr {
        let start = self.advance().span; // FStringStart
        let mut parts = Vec::new();
        loop {
            match self.kind() {
                TokenKind::FStringMiddle => {
                    let tok = self.advance();
                    parts.push(FStringPart::Text(tok.lexeme));
                }
                TokenKind::InterpolationOpen => {
                    parts.push(FStringPart::Field(self.parse_fstring_field()));
                }
                TokenKind::FStringEnd => {
                    self.advance();
                    break;
                }
                _ => break,
            }
        }
        let end = self.tokens[self.pos.saturating_sub(1)].span;
        Expr::FString(FStringExpr {
            span: start.merge(end),
            id: self.next_id(),
            parts,
        })
    }

    /// The lexer folds a format spec (`{value:spec}`) into one raw
    /// `FStringMiddle` token rather than recursively tokenizing it, so it
    /// is captured here as a single text part; conversions (`!r`/`!s`/
    /// `!a`) are not yet lexed and always come back `None`.
    fn parse_fstring_field(&mut self) -> FStringField {
        let start = self.advance().span; // InterpolationOpen
        let value = self.parse_expr_list();
        let format_spec = if self.check(TokenKind::FStringMiddle) {
            let tok = self.advance();
            Some(vec![FStringPart::Text(tok.lexeme)])
        } else {
            None
        };
        let end = self.expect(TokenKind::InterpolationClose, "'}'").span;
        FStringField {
            span: start.merge(end),
            value: Box::new(value),
            conversion: None,
            format_spec,
        }
    }
}

fn augmented_assign_op(kind: TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::PlusEq => BinaryOp::Add,
        TokenKind::MinusEq => BinaryOp::Sub,
        TokenKind::StarEq => BinaryOp::Mul,
        TokenKind::SlashEq => BinaryOp::Div,
        TokenKind::DoubleSlashEq => BinaryOp::FloorDiv,
        TokenKind::PercentEq => BinaryOp::Mod,
        TokenKind::AtEq => BinaryOp::MatMul,
        TokenKind::AmperEq => BinaryOp::BitAnd,
        TokenKind::PipeEq => BinaryOp::BitOr,
        TokenKind::CaretEq => BinaryOp::BitXor,
        TokenKind::LShiftEq => BinaryOp::LShift,
        TokenKind::RShiftEq => BinaryOp::RShift,
        TokenKind::DoubleStarEq => BinaryOp::Pow,
        _ => return None,
    })
}

fn other_id_mut(expr: &mut Expr) -> Option<&mut NodeId> {
    Some(match expr {
        Expr::FString(e) => &mut e.id,
        Expr::Dict(e) => &mut e.id,
        Expr::ListComp(e) | Expr::SetComp(e) | Expr::GeneratorExp(e) => &mut e.id,
        Expr::DictComp(e) => &mut e.id,
        Expr::Lambda(e) => &mut e.id,
        Expr::Await(e) => &mut e.id,
        Expr::Yield(e) => &mut e.id,
        Expr::TypeParam(e) => &mut e.id,
        Expr::HtmlElement(e) => &mut e.id,
        Expr::HtmlContent(e) => &mut e.id,
        Expr::HtmlText(e) => &mut e.id,
        Expr::HtmlInterpolation(e) => &mut e.id,
        Expr::NamedExpr(e) => &mut e.id,
        Expr::Subscript(e) => &mut e.id,
        Expr::Attribute(e) => &mut e.id,
        Expr::Call(e) => &mut e.id,
        Expr::Binary(e) => &mut e.id,
        Expr::Unary(e) => &mut e.id,
        Expr::Group(e) => &mut e.id,
        Expr::Star(e) => &mut e.id,
        Expr::List(e) => &mut e.id,
        Expr::Tuple(e) => &mut e.id,
        Expr::Set(e) => &mut e.id,
        Expr::Name(e) => &mut e.id,
        Expr::Literal(e) => &mut e.id,
        Expr::Ternary(e) => &mut e.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;

    fn parse_src(src: &str) -> (Module, Vec<ParseError>) {
        let tokens = lexer::scan(src).tokens;
        parse(&tokens)
    }

    #[test]
    fn parses_function_with_fstring_return() {
        let (module, errors) = parse_src("def greet(name):\n    return f\"Hello, {name}!\"\n");
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(module.body.len(), 1);
        match &module.body[0] {
            Stmt::Function(f) => {
                assert_eq!(f.name, "greet");
                assert_eq!(f.params.positional_or_keyword.len(), 1);
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn desugars_chained_comparison() {
        let (module, errors) = parse_src("a < b < c\n");
        assert!(errors.is_empty());
        match &module.body[0] {
            Stmt::Expr(e) => match &e.value {
                Expr::Binary(b) => assert_eq!(b.op, BinaryOp::And),
                other => panic!("expected And, got {other:?}"),
            },
            other => panic!("expected expr stmt, got {other:?}"),
        }
    }

    #[test]
    fn parses_view_with_html_element() {
        let src = "view Greeting(name):\n    return <div class=\"hi\">{name}</div>\n";
        let (module, errors) = parse_src(src);
        assert!(errors.is_empty(), "{errors:?}");
        match &module.body[0] {
            Stmt::View(v) => assert_eq!(v.name, "Greeting"),
            other => panic!("expected view, got {other:?}"),
        }
    }

    #[test]
    fn mismatched_html_close_is_an_error() {
        let src = "x = <div>{1}</span>\n";
        let (_module, errors) = parse_src(src);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ParseError::MismatchedHtmlClose { .. })));
    }

    #[test]
    fn recovers_after_parse_error_and_keeps_parsing_following_statements() {
        let src = ")\ny = 1\n";
        let (module, errors) = parse_src(src);
        assert!(!errors.is_empty());
        assert!(module.body.iter().any(|s| matches!(s, Stmt::Assign(_))));
    }

    #[test]
    fn parses_try_except_star() {
        let src = "try:\n    pass\nexcept* ValueError:\n    pass\n";
        let (module, errors) = parse_src(src);
        assert!(errors.is_empty(), "{errors:?}");
        match &module.body[0] {
            Stmt::Try(t) => assert!(t.handlers[0].is_star),
            other => panic!("expected try, got {other:?}"),
        }
    }

    #[test]
    fn parses_match_statement_with_or_pattern() {
        let src = "match x:\n    case 1 | 2:\n        pass\n    case _:\n        pass\n";
        let (module, errors) = parse_src(src);
        assert!(errors.is_empty(), "{errors:?}");
        match &module.body[0] {
            Stmt::Match(m) => assert_eq!(m.cases.len(), 2),
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn parameter_list_honors_slash_and_star_markers() {
        let src = "def f(a, /, b, *, c):\n    pass\n";
        let (module, errors) = parse_src(src);
        assert!(errors.is_empty(), "{errors:?}");
        match &module.body[0] {
            Stmt::Function(f) => {
                assert_eq!(f.params.positional_only.len(), 1);
                assert_eq!(f.params.positional_or_keyword.len(), 1);
                assert_eq!(f.params.keyword_only.len(), 1);
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn node_spans_contain_child_spans() {
        let (module, _errors) = parse_src("x = 1 + 2 * 3\n");
        if let Stmt::Assign(a) = &module.body[0] {
            if let Expr::Binary(b) = &a.value {
                assert!(b.span().contains(&b.left.span()));
                assert!(b.span().contains(&b.right.span()));
            }
        }
    }
}
