// Copyright (c) psxc contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Diagnostics: the accumulator-based error reporting used across every
//! phase (§7, §9 of the spec: "explicit result variants with an
//! accumulator passed through the traversal context" replaces
//! exception-style control flow for carrying errors).

use std::path::PathBuf;

use crate::span::Span;

/// Diagnostic severity. A run with any [`Severity::Error`] diagnostic
/// fails; warning-only runs succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic: severity, location, stable short code, and
/// human-readable message.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub file: PathBuf,
    pub span: Span,
    /// Stable short code, e.g. `E0201` (unbound name) or `W0101` (unused
    /// wildcard import). Codes are grouped by phase: `E01xx` scan, `E02xx`
    /// parse, `E03xx` resolve, `E04xx` import/cycle, `E05xx` transform.
    pub code: &'static str,
    pub message: String,
}

impl Diagnostic {
    pub fn error(file: impl Into<PathBuf>, span: Span, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            file: file.into(),
            span,
            code,
            message: message.into(),
        }
    }

    pub fn warning(file: impl Into<PathBuf>, span: Span, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            file: file.into(),
            span,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// An accumulator threaded through one phase's traversal context.
///
/// Every phase collects diagnostics into one of these rather than
/// returning early on the first error, so later phases can run on a
/// best-effort result (per §7's propagation policy) and the user sees
/// the full diagnostic density for one file in a single pass.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(mut self) -> Vec<Diagnostic> {
        self.sort_by_span();
        self.items
    }

    /// Diagnostics are sorted per file by start position before display (§7).
    pub fn sort_by_span(&mut self) {
        self.items.sort_by(|a, b| {
            a.span
                .start
                .byte_offset
                .cmp(&b.span.start.byte_offset)
                .then_with(|| a.span.end.byte_offset.cmp(&b.span.end.byte_offset))
        });
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}
