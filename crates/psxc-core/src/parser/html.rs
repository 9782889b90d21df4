// Copyright (c) psxc contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Parses the token stream the lexer already produced for PSX HTML
//! literals (`HtmlOpen`/`Name`/attribute tokens/`HtmlSelfClose`/
//! `HtmlText`/`InterpolationOpen`/`InterpolationClose`/`HtmlClose`) into
//! [`HtmlElementExpr`] trees (§4.2, §4.6).
//!
//! The lexer never emits a token for the plain closing `>` of an open
//! tag — once attributes are done, the next token is either the first
//! child or the matching `HtmlClose`. That asymmetry (no token for `>`
//! but a real `HtmlSelfClose` token for `/>`) is mirrored directly here.

use crate::ast::*;
use crate::parser::{ParseError, Parser};
use crate::span::{Span, Spanned};
use crate::token::TokenKind;

pub(crate) fn parse_html_element(p: &mut Parser) -> Expr {
    let open_span = p.expect(TokenKind::HtmlOpen, "'<'").span;
    let tag_tok = p.expect(TokenKind::Name, "tag name");
    let tag = tag_tok.lexeme.clone();
    let open_tag_span = open_span.merge(tag_tok.span);
    let id = p.next_id();

    let mut attributes = Vec::new();
    loop {
        match p.peek_kind() {
            TokenKind::HtmlSelfClose => {
                let end = p.advance().span;
                return Expr::HtmlElement(HtmlElementExpr {
                    span: open_tag_span.merge(end),
                    id,
                    tag,
                    open_tag_span,
                    attributes,
                    children: Vec::new(),
                    self_closing: true,
                });
            }
            TokenKind::InterpolationOpen => {
                let value = parse_interpolation_value(p);
                attributes.push(HtmlAttribute::Spread(value));
            }
            TokenKind::Name => {
                let name = p.advance().lexeme;
                let value = if p.eat(TokenKind::Eq) {
                    match p.peek_kind() {
                        TokenKind::Str => {
                            let tok = p.advance();
                            let lit = Expr::Literal(LiteralExpr {
                                span: tok.span,
                                id: p.next_id(),
                                value: tok.value.unwrap_or(crate::token::LiteralValue::None),
                            });
                            HtmlAttributeValue::Literal(lit)
                        }
                        TokenKind::InterpolationOpen => {
                            HtmlAttributeValue::Interpolation(parse_interpolation_value(p))
                        }
                        _ => HtmlAttributeValue::Empty,
                    }
                } else {
                    HtmlAttributeValue::Empty
                };
                attributes.push(HtmlAttribute::Named { name, value });
            }
            _ => break,
        }
    }

    let children = parse_html_children(p, &tag, open_tag_span);
    let end = p.last_span();
    Expr::HtmlElement(HtmlElementExpr {
        span: open_tag_span.merge(end),
        id,
        tag,
        open_tag_span,
        attributes,
        children,
        self_closing: false,
    })
}

fn parse_interpolation_value(p: &mut Parser) -> Expr {
    p.expect(TokenKind::InterpolationOpen, "'{'");
    let value = p.parse_expr();
    p.expect(TokenKind::InterpolationClose, "'}'");
    value
}

fn parse_html_children(p: &mut Parser, tag: &str, open_tag_span: Span) -> Vec<HtmlChild> {
    let mut children = Vec::new();
    loop {
        match p.peek_kind() {
            TokenKind::HtmlText => {
                let tok = p.advance();
                children.push(HtmlChild::Text(HtmlTextExpr {
                    span: tok.span,
                    id: p.next_id(),
                    text: tok.lexeme,
                }));
            }
            TokenKind::InterpolationOpen => {
                let start = p.peek_span();
                let value = parse_interpolation_value(p);
                children.push(HtmlChild::Interpolation(HtmlInterpolationExpr {
                    span: start.merge(value.span()),
                    id: p.next_id(),
                    value: Box::new(value),
                }));
            }
            TokenKind::HtmlOpen => {
                if let Expr::HtmlElement(el) = parse_html_element(p) {
                    children.push(HtmlChild::Element(el));
                }
            }
            TokenKind::HtmlClose => {
                let tok = p.advance();
                if tok.lexeme != tag {
                    p.push_error(ParseError::MismatchedHtmlClose {
                        expected: tag.to_string(),
                        found: tok.lexeme,
                        span: open_tag_span,
                    });
                }
                break;
            }
            _ => break,
        }
    }
    children
}
