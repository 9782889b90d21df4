// Copyright (c) psxc contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

use crate::span::Span;
use crate::token::TokenKind;

/// Parse errors (§7 taxonomy): unexpected token, expected-X, mismatched
/// bracket, mismatched HTML close, illegal parameter ordering. Collected
/// by the parser's panic-mode recovery rather than aborting the file.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("unexpected token {found:?}")]
    UnexpectedToken { found: TokenKind, span: Span },

    #[error("expected {expected}, found {found:?}")]
    Expected {
        expected: &'static str,
        found: TokenKind,
        span: Span,
    },

    #[error("mismatched bracket: expected {expected:?} to close, found {found:?}")]
    MismatchedBracket {
        expected: TokenKind,
        found: TokenKind,
        span: Span,
    },

    #[error("mismatched HTML closing tag: expected </{expected}>, found </{found}>")]
    MismatchedHtmlClose {
        expected: String,
        found: String,
        /// Span of the *opening* tag, per §4.2.
        span: Span,
    },

    #[error("illegal parameter ordering: {reason}")]
    IllegalParameterOrder { reason: &'static str, span: Span },

    #[error("{what} is only legal inside a function")]
    IllegalOutsideFunction { what: &'static str, span: Span },

    #[error("bare tuple requires at least one comma")]
    BareTupleRequiresComma { span: Span },

    #[error("`except` and `except*` cannot be mixed in the same `try`")]
    MixedExceptStar { span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { span, .. }
            | ParseError::Expected { span, .. }
            | ParseError::MismatchedBracket { span, .. }
            | ParseError::MismatchedHtmlClose { span, .. }
            | ParseError::IllegalParameterOrder { span, .. }
            | ParseError::IllegalOutsideFunction { span, .. }
            | ParseError::BareTupleRequiresComma { span, .. }
            | ParseError::MixedExceptStar { span, .. } => *span,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ParseError::UnexpectedToken { .. } => "E0201",
            ParseError::Expected { .. } => "E0202",
            ParseError::MismatchedBracket { .. } => "E0203",
            ParseError::MismatchedHtmlClose { .. } => "E0204",
            ParseError::IllegalParameterOrder { .. } => "E0205",
            ParseError::IllegalOutsideFunction { .. } => "E0206",
            ParseError::BareTupleRequiresComma { .. } => "E0207",
            ParseError::MixedExceptStar { .. } => "E0208",
        }
    }
}
