// Copyright (c) psxc contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! `match`/`case` pattern nodes (§3, §4.2).

use psxc_core_derive::Spanned;

use crate::ast::expr::Expr;
use crate::span::{NodeId, Span};
use crate::token::LiteralValue;

#[derive(Debug, Clone, Spanned)]
pub enum Pattern {
    Literal(LiteralPattern),
    Capture(CapturePattern),
    Wildcard(WildcardPattern),
    Value(ValuePattern),
    Group(GroupPattern),
    Sequence(SequencePattern),
    Star(StarPattern),
    Mapping(MappingPattern),
    Class(ClassPattern),
    As(AsPattern),
    Or(OrPattern),
}

#[derive(Debug, Clone, Spanned)]
pub struct LiteralPattern {
    pub span: Span,
    pub id: NodeId,
    pub value: LiteralValue,
}

/// Binds the matched value to a new local name (`case x:`).
#[derive(Debug, Clone, Spanned)]
pub struct CapturePattern {
    pub span: Span,
    pub id: NodeId,
    pub name: String,
}

/// `case _:`.
#[derive(Debug, Clone, Spanned)]
pub struct WildcardPattern {
    pub span: Span,
    pub id: NodeId,
}

/// A dotted-name or attribute value pattern (`case Color.RED:`) —
/// compared by equality rather than bound as a capture.
#[derive(Debug, Clone, Spanned)]
pub struct ValuePattern {
    pub span: Span,
    pub id: NodeId,
    pub path: Box<Expr>,
}

/// A parenthesized pattern, kept distinct for span fidelity.
#[derive(Debug, Clone, Spanned)]
pub struct GroupPattern {
    pub span: Span,
    pub id: NodeId,
    pub inner: Box<Pattern>,
}

#[derive(Debug, Clone, Spanned)]
pub struct SequencePattern {
    pub span: Span,
    pub id: NodeId,
    pub elements: Vec<Pattern>,
}

/// `*rest` inside a sequence pattern; `name` is `None` for the bare `*_`.
#[derive(Debug, Clone, Spanned)]
pub struct StarPattern {
    pub span: Span,
    pub id: NodeId,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MappingEntry {
    pub key: Expr,
    pub value: Pattern,
}

#[derive(Debug, Clone, Spanned)]
pub struct MappingPattern {
    pub span: Span,
    pub id: NodeId,
    pub entries: Vec<MappingEntry>,
    /// `**rest`, if present.
    pub rest: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClassPatternKeyword {
    pub name: String,
    pub pattern: Pattern,
}

#[derive(Debug, Clone, Spanned)]
pub struct ClassPattern {
    pub span: Span,
    pub id: NodeId,
    pub path: Box<Expr>,
    pub positional: Vec<Pattern>,
    pub keyword: Vec<ClassPatternKeyword>,
}

/// `pattern as name`, binding the whole matched subject on success.
#[derive(Debug, Clone, Spanned)]
pub struct AsPattern {
    pub span: Span,
    pub id: NodeId,
    pub pattern: Box<Pattern>,
    pub name: String,
}

/// `a | b | c` alternation, parsed at a lower precedence than `as`.
#[derive(Debug, Clone, Spanned)]
pub struct OrPattern {
    pub span: Span,
    pub id: NodeId,
    pub alternatives: Vec<Pattern>,
}
