// Copyright (c) psxc contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Renders the intermediate artifacts named by the `--emit` surface and
//! the `scan`/`parse`/`inspect` subcommands (§6): `.tok` token dumps,
//! `.ast`/`.tast` s-expression-like trees, and `.res`/`.res.json`
//! resolution reports.
//!
//! Every renderer here is a pure function over an already-computed
//! phase result — no renderer drives the pipeline itself, matching the
//! lexer/parser/resolver/transform split where each phase owns running
//! itself and this module only owns presenting what came out.

use std::collections::HashMap;
use std::path::Path;

use crate::ast::*;
use crate::lexer::errors::LexError;
use crate::resolver::{BindingKind, ResolutionTable, ScopeKind};
use crate::span::{NodeId, Span};
use crate::token::{LiteralValue, Token};

// ------------------------------------------------------------------
// `.tok`
// ------------------------------------------------------------------

/// `<index>: <kind-name> <kind-number> "<lexeme>" <literal-repr> @ <span>`,
/// one line per token, with a trailing `-- Errors (n) --` section when
/// `errors` is non-empty (§6).
pub fn render_tokens(tokens: &[Token], errors: &[LexError]) -> String {
    let mut out = String::new();
    for (index, token) in tokens.iter().enumerate() {
        let literal = match &token.value {
            Some(v) => format_literal(v),
            None => "-".to_string(),
        };
        out.push_str(&format!(
            "{index}: {} {} {:?} {literal} @ {}\n",
            token.kind.as_str(),
            token.kind.as_u16(),
            token.lexeme,
            token.span,
        ));
    }
    if !errors.is_empty() {
        out.push_str(&format!("-- Errors ({}) --\n", errors.len()));
        for err in errors {
            out.push_str(&format!("{} {}: {}\n", err.span(), err.code(), err));
        }
    }
    out
}

fn format_literal(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Bool(b) => b.to_string(),
        LiteralValue::Int { value, radix } => format!("{value:?}/{radix:?}"),
        LiteralValue::BigInt { digits, radix } => format!("{digits}/{radix:?}"),
        LiteralValue::Float(f) => f.to_string(),
        LiteralValue::Complex(f) => format!("{f}j"),
        LiteralValue::Str(s) => format!("{s:?}"),
        LiteralValue::Bytes(b) => format!("{b:?}"),
        LiteralValue::None => "None".to_string(),
        LiteralValue::Ellipsis => "...".to_string(),
    }
}

// ------------------------------------------------------------------
// `.ast` / `.tast`
// ------------------------------------------------------------------

/// Renders a whole module as an indented, span-annotated tree (§6). The
/// same renderer produces `.ast` (pre-transform) and `.tast`
/// (post-transform) output — the two formats differ only in which
/// `Module` is passed in.
pub fn render_ast(module: &Module) -> String {
    node("Module", module.span, vec![field("body", list(module.body.iter().map(fmt_stmt).collect()))])
}

fn indent(s: &str, levels: usize) -> String {
    let pad = "  ".repeat(levels);
    s.lines()
        .map(|l| if l.is_empty() { l.to_string() } else { format!("{pad}{l}") })
        .collect::<Vec<_>>()
        .join("\n")
}

fn field(name: &str, value: String) -> (String, String) {
    (name.to_string(), value)
}

fn node(name: &str, span: Span, fields: Vec<(String, String)>) -> String {
    let header = format!("{name} [{span}]");
    if fields.is_empty() {
        return header;
    }
    let mut out = format!("{header} (\n");
    for (fname, fval) in &fields {
        out.push_str(&indent(&format!("{fname}: {fval}"), 1));
        out.push('\n');
    }
    out.push(')');
    out
}

fn list(items: Vec<String>) -> String {
    if items.is_empty() {
        return "[]".to_string();
    }
    let mut out = String::from("[\n");
    for item in &items {
        out.push_str(&indent(item, 1));
        out.push('\n');
    }
    out.push(']');
    out
}

fn opt(value: Option<String>) -> String {
    value.unwrap_or_else(|| "none".to_string())
}

fn leaf(value: &str) -> String {
    value.to_string()
}

fn fmt_param(p: &Param) -> String {
    let mut s = p.name.clone();
    if let Some(a) = &p.annotation {
        s.push_str(&format!(": {}", fmt_expr(a)));
    }
    if let Some(d) = &p.default {
        s.push_str(&format!(" = {}", fmt_expr(d)));
    }
    s
}

fn fmt_params(params: &ParamList) -> String {
    list(params.iter_all().map(fmt_param).collect())
}

fn fmt_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Expr(s) => node("ExprStmt", s.span, vec![field("value", fmt_expr(&s.value))]),
        Stmt::Assign(s) => node(
            "AssignStmt",
            s.span,
            vec![
                field("targets", list(s.targets.iter().map(fmt_expr).collect())),
                field("value", fmt_expr(&s.value)),
            ],
        ),
        Stmt::AnnotatedAssign(s) => node(
            "AnnotatedAssignStmt",
            s.span,
            vec![
                field("target", fmt_expr(&s.target)),
                field("annotation", fmt_expr(&s.annotation)),
                field("value", opt(s.value.as_ref().map(fmt_expr))),
            ],
        ),
        Stmt::Return(s) => node("ReturnStmt", s.span, vec![field("value", opt(s.value.as_ref().map(fmt_expr)))]),
        Stmt::Raise(s) => node(
            "RaiseStmt",
            s.span,
            vec![
                field("exception", opt(s.exception.as_ref().map(fmt_expr))),
                field("from", opt(s.from.as_ref().map(fmt_expr))),
            ],
        ),
        Stmt::Pass(s) => node("PassStmt", s.span, vec![]),
        Stmt::Break(s) => node("BreakStmt", s.span, vec![]),
        Stmt::Continue(s) => node("ContinueStmt", s.span, vec![]),
        Stmt::YieldStmt(s) => node("YieldStmtStmt", s.span, vec![field("value", fmt_expr(&s.value))]),
        Stmt::Assert(s) => node(
            "AssertStmt",
            s.span,
            vec![
                field("test", fmt_expr(&s.test)),
                field("message", opt(s.message.as_ref().map(fmt_expr))),
            ],
        ),
        Stmt::Global(s) => node("GlobalStmt", s.span, vec![field("names", list(s.names.iter().map(|n| leaf(n)).collect()))]),
        Stmt::Nonlocal(s) => node("NonlocalStmt", s.span, vec![field("names", list(s.names.iter().map(|n| leaf(n)).collect()))]),
        Stmt::Import(s) => node(
            "ImportStmt",
            s.span,
            vec![field("names", list(s.names.iter().map(fmt_alias).collect()))],
        ),
        Stmt::ImportFrom(s) => node(
            "ImportFromStmt",
            s.span,
            vec![
                field("dots", s.dots.to_string()),
                field("module", opt(s.module.clone())),
                field("names", list(s.names.iter().map(fmt_alias).collect())),
                field("wildcard", s.wildcard.to_string()),
            ],
        ),
        Stmt::If(s) => node(
            "IfStmt",
            s.span,
            vec![
                field("test", fmt_expr(&s.test)),
                field("body", list(s.body.iter().map(fmt_stmt).collect())),
                field("orelse", list(s.orelse.iter().map(fmt_stmt).collect())),
            ],
        ),
        Stmt::While(s) => node(
            "WhileStmt",
            s.span,
            vec![
                field("test", fmt_expr(&s.test)),
                field("body", list(s.body.iter().map(fmt_stmt).collect())),
                field("orelse", list(s.orelse.iter().map(fmt_stmt).collect())),
            ],
        ),
        Stmt::For(s) => node(
            "ForStmt",
            s.span,
            vec![
                field("is_async", s.is_async.to_string()),
                field("target", fmt_expr(&s.target)),
                field("iter", fmt_expr(&s.iter)),
                field("body", list(s.body.iter().map(fmt_stmt).collect())),
                field("orelse", list(s.orelse.iter().map(fmt_stmt).collect())),
            ],
        ),
        Stmt::With(s) => node(
            "WithStmt",
            s.span,
            vec![
                field("is_async", s.is_async.to_string()),
                field(
                    "items",
                    list(s
                        .items
                        .iter()
                        .map(|i| {
                            format!(
                                "context: {}, target: {}",
                                fmt_expr(&i.context),
                                opt(i.target.as_ref().map(fmt_expr))
                            )
                        })
                        .collect()),
                ),
                field("body", list(s.body.iter().map(fmt_stmt).collect())),
            ],
        ),
        Stmt::Try(s) => node(
            "TryStmt",
            s.span,
            vec![
                field("body", list(s.body.iter().map(fmt_stmt).collect())),
                field("handlers", list(s.handlers.iter().map(fmt_handler).collect())),
                field("orelse", list(s.orelse.iter().map(fmt_stmt).collect())),
                field("finally", list(s.finally.iter().map(fmt_stmt).collect())),
            ],
        ),
        Stmt::Function(s) => node(
            "FunctionStmt",
            s.span,
            vec![
                field("is_async", s.is_async.to_string()),
                field("name", format!("{:?}", s.name)),
                field("params", fmt_params(&s.params)),
                field("return_type", opt(s.return_type.as_ref().map(fmt_expr))),
                field("body", list(s.body.iter().map(fmt_stmt).collect())),
            ],
        ),
        Stmt::Class(s) => node(
            "ClassStmt",
            s.span,
            vec![
                field("name", format!("{:?}", s.name)),
                field("bases", list(s.bases.iter().map(fmt_expr).collect())),
                field(
                    "keywords",
                    list(s.keywords.iter().map(|(n, v)| format!("{n}={}", fmt_expr(v))).collect()),
                ),
                field("body", list(s.body.iter().map(fmt_stmt).collect())),
            ],
        ),
        Stmt::TypeAlias(s) => node(
            "TypeAliasStmt",
            s.span,
            vec![field("name", format!("{:?}", s.name)), field("value", fmt_expr(&s.value))],
        ),
        Stmt::Match(s) => node(
            "MatchStmt",
            s.span,
            vec![
                field("subject", fmt_expr(&s.subject)),
                field("cases", list(s.cases.iter().map(fmt_case).collect())),
            ],
        ),
        Stmt::Decorated(s) => node(
            "DecoratedStmt",
            s.span,
            vec![
                field("decorators", list(s.decorators.iter().map(fmt_expr).collect())),
                field("target", fmt_stmt(&s.target)),
            ],
        ),
        Stmt::Multi(s) => node(
            "MultiStmt",
            s.span,
            vec![field("statements", list(s.statements.iter().map(fmt_stmt).collect()))],
        ),
        Stmt::View(s) => node(
            "ViewStmt",
            s.span,
            vec![
                field("name", format!("{:?}", s.name)),
                field("params", fmt_params(&s.params)),
                field("body", list(s.body.iter().map(fmt_stmt).collect())),
            ],
        ),
    }
}

fn fmt_alias(a: &ImportAlias) -> String {
    match &a.alias {
        Some(alias) => format!("{} as {}", a.name, alias),
        None => a.name.clone(),
    }
}

fn fmt_handler(h: &ExceptHandler) -> String {
    format!(
        "ExceptHandler [{}] (type: {}, target: {}, is_star: {}, body: {})",
        h.span,
        opt(h.exception_type.as_ref().map(fmt_expr)),
        opt(h.target.clone()),
        h.is_star,
        list(h.body.iter().map(fmt_stmt).collect()),
    )
}

fn fmt_case(c: &MatchCase) -> String {
    format!(
        "MatchCase [{}] (pattern: {}, guard: {}, body: {})",
        c.span,
        fmt_pattern(&c.pattern),
        opt(c.guard.as_ref().map(fmt_expr)),
        list(c.body.iter().map(fmt_stmt).collect()),
    )
}

fn fmt_expr(expr: &Expr) -> String {
    match expr {
        Expr::Name(e) => node("NameExpr", e.span, vec![field("value", format!("{:?}", e.value))]),
        Expr::Literal(e) => node("LiteralExpr", e.span, vec![field("value", format_literal(&e.value))]),
        Expr::FString(e) => node(
            "FStringExpr",
            e.span,
            vec![field("parts", list(e.parts.iter().map(fmt_fstring_part).collect()))],
        ),
        Expr::Attribute(e) => node(
            "AttributeExpr",
            e.span,
            vec![field("value", fmt_expr(&e.value)), field("attr", format!("{:?}", e.attr))],
        ),
        Expr::Call(e) => node(
            "CallExpr",
            e.span,
            vec![
                field("func", fmt_expr(&e.func)),
                field("args", list(e.args.iter().map(fmt_arg).collect())),
            ],
        ),
        Expr::Subscript(e) => node(
            "SubscriptExpr",
            e.span,
            vec![field("value", fmt_expr(&e.value)), field("index", fmt_expr(&e.index))],
        ),
        Expr::Slice(e) => node(
            "SliceExpr",
            e.span,
            vec![
                field("lower", opt(e.lower.as_ref().map(|b| fmt_expr(b)))),
                field("upper", opt(e.upper.as_ref().map(|b| fmt_expr(b)))),
                field("step", opt(e.step.as_ref().map(|b| fmt_expr(b)))),
            ],
        ),
        Expr::Binary(e) => node(
            "BinaryExpr",
            e.span,
            vec![
                field("op", format!("{:?}", e.op)),
                field("left", fmt_expr(&e.left)),
                field("right", fmt_expr(&e.right)),
            ],
        ),
        Expr::Unary(e) => node(
            "UnaryExpr",
            e.span,
            vec![field("op", format!("{:?}", e.op)), field("operand", fmt_expr(&e.operand))],
        ),
        Expr::Ternary(e) => node(
            "TernaryExpr",
            e.span,
            vec![
                field("test", fmt_expr(&e.test)),
                field("body", fmt_expr(&e.body)),
                field("orelse", fmt_expr(&e.orelse)),
            ],
        ),
        Expr::NamedExpr(e) => node(
            "NamedExprExpr",
            e.span,
            vec![field("target", fmt_expr(&Expr::Name(e.target.clone()))), field("value", fmt_expr(&e.value))],
        ),
        Expr::Star(e) => node("StarExpr", e.span, vec![field("value", fmt_expr(&e.value))]),
        Expr::List(e) => node("ListExpr", e.span, vec![field("elements", list(e.elements.iter().map(fmt_expr).collect()))]),
        Expr::Tuple(e) => node("TupleExpr", e.span, vec![field("elements", list(e.elements.iter().map(fmt_expr).collect()))]),
        Expr::Set(e) => node("SetExpr", e.span, vec![field("elements", list(e.elements.iter().map(fmt_expr).collect()))]),
        Expr::Dict(e) => node(
            "DictExpr",
            e.span,
            vec![field("entries", list(e.entries.iter().map(fmt_dict_entry).collect()))],
        ),
        Expr::ListComp(e) => node(
            "ListCompExpr",
            e.span,
            vec![
                field("element", fmt_expr(&e.element)),
                field("clauses", list(e.clauses.iter().map(fmt_clause).collect())),
            ],
        ),
        Expr::SetComp(e) => node(
            "SetCompExpr",
            e.span,
            vec![
                field("element", fmt_expr(&e.element)),
                field("clauses", list(e.clauses.iter().map(fmt_clause).collect())),
            ],
        ),
        Expr::GeneratorExp(e) => node(
            "GeneratorExpExpr",
            e.span,
            vec![
                field("element", fmt_expr(&e.element)),
                field("clauses", list(e.clauses.iter().map(fmt_clause).collect())),
            ],
        ),
        Expr::DictComp(e) => node(
            "DictCompExpr",
            e.span,
            vec![
                field("key", fmt_expr(&e.key)),
                field("value", fmt_expr(&e.value)),
                field("clauses", list(e.clauses.iter().map(fmt_clause).collect())),
            ],
        ),
        Expr::Lambda(e) => node(
            "LambdaExpr",
            e.span,
            vec![field("params", fmt_params(&e.params)), field("body", fmt_expr(&e.body))],
        ),
        Expr::Await(e) => node("AwaitExpr", e.span, vec![field("value", fmt_expr(&e.value))]),
        Expr::Yield(e) => node(
            "YieldExpr",
            e.span,
            vec![field(
                "kind",
                match &e.kind {
                    YieldKind::Value(Some(v)) => fmt_expr(v),
                    YieldKind::Value(None) => "none".to_string(),
                    YieldKind::From(v) => format!("from {}", fmt_expr(v)),
                },
            )],
        ),
        Expr::Group(e) => node("GroupExpr", e.span, vec![field("inner", fmt_expr(&e.inner))]),
        Expr::TypeParam(e) => node(
            "TypeParamExpr",
            e.span,
            vec![
                field("kind", format!("{:?}", e.kind)),
                field("name", format!("{:?}", e.name)),
                field("bound", opt(e.bound.as_ref().map(|b| fmt_expr(b)))),
            ],
        ),
        Expr::HtmlElement(e) => node(
            "HtmlElementExpr",
            e.span,
            vec![
                field("tag", format!("{:?}", e.tag)),
                field("attributes", list(e.attributes.iter().map(fmt_html_attr).collect())),
                field("children", list(e.children.iter().map(fmt_html_child).collect())),
                field("self_closing", e.self_closing.to_string()),
            ],
        ),
        Expr::HtmlContent(e) => node(
            "HtmlContentExpr",
            e.span,
            vec![field("children", list(e.children.iter().map(fmt_html_child).collect()))],
        ),
        Expr::HtmlText(e) => node("HtmlTextExpr", e.span, vec![field("text", format!("{:?}", e.text))]),
        Expr::HtmlInterpolation(e) => node("HtmlInterpolationExpr", e.span, vec![field("value", fmt_expr(&e.value))]),
    }
}

fn fmt_fstring_part(part: &FStringPart) -> String {
    match part {
        FStringPart::Text(t) => format!("Text({t:?})"),
        FStringPart::Field(f) => format!(
            "Field(value: {}, conversion: {}, format_spec: {})",
            fmt_expr(&f.value),
            opt(f.conversion.map(|c| c.to_string())),
            match &f.format_spec {
                Some(parts) => list(parts.iter().map(fmt_fstring_part).collect()),
                None => "none".to_string(),
            }
        ),
    }
}

fn fmt_arg(arg: &Argument) -> String {
    match arg {
        Argument::Positional(e) => fmt_expr(e),
        Argument::Keyword { name, value } => format!("{name}={}", fmt_expr(value)),
        Argument::Star(e) => format!("*{}", fmt_expr(e)),
        Argument::DoubleStar(e) => format!("**{}", fmt_expr(e)),
    }
}

fn fmt_dict_entry(entry: &DictEntry) -> String {
    match &entry.key {
        Some(k) => format!("{}: {}", fmt_expr(k), fmt_expr(&entry.value)),
        None => format!("**{}", fmt_expr(&entry.value)),
    }
}

fn fmt_clause(clause: &ComprehensionClause) -> String {
    format!(
        "for {} in {}{}{}",
        fmt_expr(&clause.target),
        fmt_expr(&clause.iter),
        if clause.is_async { " (async)" } else { "" },
        clause
            .ifs
            .iter()
            .map(|i| format!(" if {}", fmt_expr(i)))
            .collect::<String>(),
    )
}

fn fmt_html_attr(attr: &HtmlAttribute) -> String {
    match attr {
        HtmlAttribute::Named { name, value } => format!(
            "{name}={}",
            match value {
                HtmlAttributeValue::Literal(e) => fmt_expr(e),
                HtmlAttributeValue::Interpolation(e) => format!("{{{}}}", fmt_expr(e)),
                HtmlAttributeValue::Empty => "true".to_string(),
            }
        ),
        HtmlAttribute::Spread(e) => format!("{{...{}}}", fmt_expr(e)),
    }
}

fn fmt_html_child(child: &HtmlChild) -> String {
    match child {
        HtmlChild::Element(e) => fmt_expr(&Expr::HtmlElement(e.clone())),
        HtmlChild::Text(e) => fmt_expr(&Expr::HtmlText(e.clone())),
        HtmlChild::Interpolation(e) => fmt_expr(&Expr::HtmlInterpolation(e.clone())),
    }
}

fn fmt_pattern(pattern: &Pattern) -> String {
    match pattern {
        Pattern::Literal(p) => node("LiteralPattern", p.span, vec![field("value", format_literal(&p.value))]),
        Pattern::Capture(p) => node("CapturePattern", p.span, vec![field("name", format!("{:?}", p.name))]),
        Pattern::Wildcard(p) => node("WildcardPattern", p.span, vec![]),
        Pattern::Value(p) => node("ValuePattern", p.span, vec![field("path", fmt_expr(&p.path))]),
        Pattern::Group(p) => node("GroupPattern", p.span, vec![field("inner", fmt_pattern(&p.inner))]),
        Pattern::Sequence(p) => node(
            "SequencePattern",
            p.span,
            vec![field("elements", list(p.elements.iter().map(fmt_pattern).collect()))],
        ),
        Pattern::Star(p) => node("StarPattern", p.span, vec![field("name", opt(p.name.clone()))]),
        Pattern::Mapping(p) => node(
            "MappingPattern",
            p.span,
            vec![
                field(
                    "entries",
                    list(p
                        .entries
                        .iter()
                        .map(|e| format!("{}: {}", fmt_expr(&e.key), fmt_pattern(&e.value)))
                        .collect()),
                ),
                field("rest", opt(p.rest.clone())),
            ],
        ),
        Pattern::Class(p) => node(
            "ClassPattern",
            p.span,
            vec![
                field("path", fmt_expr(&p.path)),
                field("positional", list(p.positional.iter().map(fmt_pattern).collect())),
                field(
                    "keyword",
                    list(p.keyword.iter().map(|k| format!("{}={}", k.name, fmt_pattern(&k.pattern))).collect()),
                ),
            ],
        ),
        Pattern::As(p) => node(
            "AsPattern",
            p.span,
            vec![field("pattern", fmt_pattern(&p.pattern)), field("name", format!("{:?}", p.name))],
        ),
        Pattern::Or(p) => node(
            "OrPattern",
            p.span,
            vec![field("alternatives", list(p.alternatives.iter().map(fmt_pattern).collect()))],
        ),
    }
}

// ------------------------------------------------------------------
// `.res` (text) / `.res.json`
// ------------------------------------------------------------------

/// Counts, for every `(scope, name)` a use resolved into, how many
/// `Name` expressions resolved there — the "usage counts" §6 asks the
/// `.res` report to carry alongside each declared name.
fn usage_counts(module: &Module, table: &ResolutionTable) -> HashMap<(usize, String), usize> {
    let mut counts = HashMap::new();
    let mut on_name = |id: NodeId, name: &str| {
        if let Some(resolved) = table.resolution_for(id) {
            if let Some(scope) = resolved.scope {
                *counts.entry((scope, name.to_string())).or_insert(0) += 1;
            }
        }
    };
    for stmt in &module.body {
        visit_stmt_names(stmt, &mut on_name);
    }
    counts
}

fn visit_stmt_names(stmt: &Stmt, f: &mut dyn FnMut(NodeId, &str)) {
    for_each_expr_in_stmt(stmt, &mut |e| {
        if let Expr::Name(n) = e {
            f(n.id, &n.value);
        }
    });
}

/// Calls `f` on every [`Expr`] node transitively reachable from `stmt`,
/// including `stmt` itself when it wraps a bare expression.
fn for_each_expr_in_stmt(stmt: &Stmt, f: &mut dyn FnMut(&Expr)) {
    let mut visit_block = |body: &[Stmt], f: &mut dyn FnMut(&Expr)| {
        for s in body {
            for_each_expr_in_stmt(s, f);
        }
    };
    match stmt {
        Stmt::Expr(s) => for_each_expr(&s.value, f),
        Stmt::Assign(s) => {
            for t in &s.targets {
                for_each_expr(t, f);
            }
            for_each_expr(&s.value, f);
        }
        Stmt::AnnotatedAssign(s) => {
            for_each_expr(&s.target, f);
            for_each_expr(&s.annotation, f);
            if let Some(v) = &s.value {
                for_each_expr(v, f);
            }
        }
        Stmt::Return(s) => {
            if let Some(v) = &s.value {
                for_each_expr(v, f);
            }
        }
        Stmt::Raise(s) => {
            if let Some(e) = &s.exception {
                for_each_expr(e, f);
            }
            if let Some(e) = &s.from {
                for_each_expr(e, f);
            }
        }
        Stmt::Pass(_) | Stmt::Break(_) | Stmt::Continue(_) | Stmt::Global(_) | Stmt::Nonlocal(_) | Stmt::Import(_) | Stmt::ImportFrom(_) => {}
        Stmt::YieldStmt(s) => for_each_expr(&s.value, f),
        Stmt::Assert(s) => {
            for_each_expr(&s.test, f);
            if let Some(m) = &s.message {
                for_each_expr(m, f);
            }
        }
        Stmt::If(s) => {
            for_each_expr(&s.test, f);
            visit_block(&s.body, f);
            visit_block(&s.orelse, f);
        }
        Stmt::While(s) => {
            for_each_expr(&s.test, f);
            visit_block(&s.body, f);
            visit_block(&s.orelse, f);
        }
        Stmt::For(s) => {
            for_each_expr(&s.target, f);
            for_each_expr(&s.iter, f);
            visit_block(&s.body, f);
            visit_block(&s.orelse, f);
        }
        Stmt::With(s) => {
            for item in &s.items {
                for_each_expr(&item.context, f);
                if let Some(t) = &item.target {
                    for_each_expr(t, f);
                }
            }
            visit_block(&s.body, f);
        }
        Stmt::Try(s) => {
            visit_block(&s.body, f);
            for h in &s.handlers {
                if let Some(t) = &h.exception_type {
                    for_each_expr(t, f);
                }
                visit_block(&h.body, f);
            }
            visit_block(&s.orelse, f);
            visit_block(&s.finally, f);
        }
        Stmt::Function(s) => {
            for p in s.params.iter_all() {
                if let Some(a) = &p.annotation {
                    for_each_expr(a, f);
                }
                if let Some(d) = &p.default {
                    for_each_expr(d, f);
                }
            }
            if let Some(r) = &s.return_type {
                for_each_expr(r, f);
            }
            visit_block(&s.body, f);
        }
        Stmt::Class(s) => {
            for b in &s.bases {
                for_each_expr(b, f);
            }
            for (_, v) in &s.keywords {
                for_each_expr(v, f);
            }
            visit_block(&s.body, f);
        }
        Stmt::TypeAlias(s) => for_each_expr(&s.value, f),
        Stmt::Match(s) => {
            for_each_expr(&s.subject, f);
            for case in &s.cases {
                for_each_expr_in_pattern(&case.pattern, f);
                if let Some(g) = &case.guard {
                    for_each_expr(g, f);
                }
                visit_block(&case.body, f);
            }
        }
        Stmt::Decorated(s) => {
            for d in &s.decorators {
                for_each_expr(d, f);
            }
            for_each_expr_in_stmt(&s.target, f);
        }
        Stmt::Multi(s) => visit_block(&s.statements, f),
        Stmt::View(s) => {
            for p in s.params.iter_all() {
                if let Some(a) = &p.annotation {
                    for_each_expr(a, f);
                }
                if let Some(d) = &p.default {
                    for_each_expr(d, f);
                }
            }
            visit_block(&s.body, f);
        }
    }
}

fn for_each_expr(expr: &Expr, f: &mut dyn FnMut(&Expr)) {
    f(expr);
    match expr {
        Expr::Name(_) | Expr::Literal(_) | Expr::TypeParam(_) => {}
        Expr::FString(e) => {
            for part in &e.parts {
                for_each_expr_in_fstring_part(part, f);
            }
        }
        Expr::Attribute(e) => for_each_expr(&e.value, f),
        Expr::Call(e) => {
            for_each_expr(&e.func, f);
            for a in &e.args {
                match a {
                    Argument::Positional(v) | Argument::Star(v) | Argument::DoubleStar(v) => for_each_expr(v, f),
                    Argument::Keyword { value, .. } => for_each_expr(value, f),
                }
            }
        }
        Expr::Subscript(e) => {
            for_each_expr(&e.value, f);
            for_each_expr(&e.index, f);
        }
        Expr::Slice(e) => {
            for part in [&e.lower, &e.upper, &e.step] {
                if let Some(v) = part {
                    for_each_expr(v, f);
                }
            }
        }
        Expr::Binary(e) => {
            for_each_expr(&e.left, f);
            for_each_expr(&e.right, f);
        }
        Expr::Unary(e) => for_each_expr(&e.operand, f),
        Expr::Ternary(e) => {
            for_each_expr(&e.test, f);
            for_each_expr(&e.body, f);
            for_each_expr(&e.orelse, f);
        }
        Expr::NamedExpr(e) => {
            f(&Expr::Name(e.target.clone()));
            for_each_expr(&e.value, f);
        }
        Expr::Star(e) => for_each_expr(&e.value, f),
        Expr::List(e) | Expr::Tuple(e) | Expr::Set(e) => {
            for el in &e.elements {
                for_each_expr(el, f);
            }
        }
        Expr::Dict(e) => {
            for entry in &e.entries {
                if let Some(k) = &entry.key {
                    for_each_expr(k, f);
                }
                for_each_expr(&entry.value, f);
            }
        }
        Expr::ListComp(e) | Expr::SetComp(e) | Expr::GeneratorExp(e) => {
            for_each_expr(&e.element, f);
            for clause in &e.clauses {
                for_each_clause(clause, f);
            }
        }
        Expr::DictComp(e) => {
            for_each_expr(&e.key, f);
            for_each_expr(&e.value, f);
            for clause in &e.clauses {
                for_each_clause(clause, f);
            }
        }
        Expr::Lambda(e) => {
            for p in e.params.iter_all() {
                if let Some(d) = &p.default {
                    for_each_expr(d, f);
                }
            }
            for_each_expr(&e.body, f);
        }
        Expr::Await(e) => for_each_expr(&e.value, f),
        Expr::Yield(e) => match &e.kind {
            YieldKind::Value(Some(v)) => for_each_expr(v, f),
            YieldKind::Value(None) => {}
            YieldKind::From(v) => for_each_expr(v, f),
        },
        Expr::Group(e) => for_each_expr(&e.inner, f),
        Expr::HtmlElement(e) => {
            for attr in &e.attributes {
                for_each_expr_in_attr(attr, f);
            }
            for child in &e.children {
                for_each_expr_in_html_child(child, f);
            }
        }
        Expr::HtmlContent(e) => {
            for child in &e.children {
                for_each_expr_in_html_child(child, f);
            }
        }
        Expr::HtmlText(_) => {}
        Expr::HtmlInterpolation(e) => for_each_expr(&e.value, f),
    }
}

fn for_each_expr_in_attr(attr: &HtmlAttribute, f: &mut dyn FnMut(&Expr)) {
    match attr {
        HtmlAttribute::Named { value, .. } => match value {
            HtmlAttributeValue::Literal(e) | HtmlAttributeValue::Interpolation(e) => for_each_expr(e, f),
            HtmlAttributeValue::Empty => {}
        },
        HtmlAttribute::Spread(e) => for_each_expr(e, f),
    }
}

fn for_each_expr_in_html_child(child: &HtmlChild, f: &mut dyn FnMut(&Expr)) {
    match child {
        HtmlChild::Element(e) => for_each_expr(&Expr::HtmlElement(e.clone()), f),
        HtmlChild::Text(_) => {}
        HtmlChild::Interpolation(e) => for_each_expr(&e.value, f),
    }
}

fn for_each_expr_in_fstring_part(part: &FStringPart, f: &mut dyn FnMut(&Expr)) {
    if let FStringPart::Field(field) = part {
        for_each_expr(&field.value, f);
        if let Some(spec) = &field.format_spec {
            for p in spec {
                for_each_expr_in_fstring_part(p, f);
            }
        }
    }
}

fn for_each_clause(clause: &ComprehensionClause, f: &mut dyn FnMut(&Expr)) {
    for_each_expr(&clause.target, f);
    for_each_expr(&clause.iter, f);
    for cond in &clause.ifs {
        for_each_expr(cond, f);
    }
}

fn for_each_expr_in_pattern(pattern: &Pattern, f: &mut dyn FnMut(&Expr)) {
    match pattern {
        Pattern::Literal(_) | Pattern::Capture(_) | Pattern::Wildcard(_) | Pattern::Star(_) => {}
        Pattern::Value(p) => for_each_expr(&p.path, f),
        Pattern::Group(p) => for_each_expr_in_pattern(&p.inner, f),
        Pattern::Sequence(p) => {
            for el in &p.elements {
                for_each_expr_in_pattern(el, f);
            }
        }
        Pattern::Mapping(p) => {
            for entry in &p.entries {
                for_each_expr(&entry.key, f);
                for_each_expr_in_pattern(&entry.value, f);
            }
        }
        Pattern::Class(p) => {
            for_each_expr(&p.path, f);
            for el in &p.positional {
                for_each_expr_in_pattern(el, f);
            }
            for kw in &p.keyword {
                for_each_expr_in_pattern(&kw.pattern, f);
            }
        }
        Pattern::As(p) => for_each_expr_in_pattern(&p.pattern, f),
        Pattern::Or(p) => {
            for alt in &p.alternatives {
                for_each_expr_in_pattern(alt, f);
            }
        }
    }
}

fn binding_kind_label(kind: BindingKind) -> &'static str {
    match kind {
        BindingKind::Parameter => "parameter",
        BindingKind::Local => "local",
        BindingKind::FreeCaptured => "free",
        BindingKind::GlobalDeclared => "global",
        BindingKind::NonlocalDeclared => "nonlocal",
        BindingKind::Imported => "imported",
    }
}

fn scope_kind_label(kind: ScopeKind) -> &'static str {
    match kind {
        ScopeKind::Module => "module",
        ScopeKind::Class => "class",
        ScopeKind::Function => "function",
        ScopeKind::View => "view",
        ScopeKind::Lambda => "lambda",
        ScopeKind::Comprehension => "comprehension",
    }
}

/// Renders the `.res` text format: per scope, its kind and span, then
/// its declared names with classification and usage count, followed by
/// a trailing diagnostics section (§6).
pub fn render_resolution_text(module: &Module, table: &ResolutionTable) -> String {
    let counts = usage_counts(module, table);
    let mut out = String::new();
    for scope in table.scopes() {
        out.push_str(&format!(
            "scope {} ({}) [{}]{}\n",
            scope.id,
            scope_kind_label(scope.kind),
            scope.span,
            match &scope.name {
                Some(n) => format!(" {n:?}"),
                None => String::new(),
            }
        ));
        let mut names: Vec<_> = scope.variables().collect();
        names.sort_by(|a, b| a.name.cmp(&b.name));
        for binding in names {
            let uses = counts.get(&(scope.id, binding.name.clone())).copied().unwrap_or(0);
            out.push_str(&format!(
                "  {} : {} (used {} time{})\n",
                binding.name,
                binding_kind_label(binding.kind),
                uses,
                if uses == 1 { "" } else { "s" }
            ));
        }
    }
    out.push_str(&format!("-- Diagnostics ({}) --\n", table.errors().len()));
    for err in table.errors() {
        out.push_str(&format!("{} {}: {}\n", err.span(), err.code(), err));
    }
    out
}

#[derive(Debug, serde::Serialize)]
struct ScopeJson {
    kind: String,
    span: String,
    parent: Option<usize>,
    variables: Vec<VariableJson>,
}

#[derive(Debug, serde::Serialize)]
struct VariableJson {
    name: String,
    kind: String,
    uses: usize,
}

#[derive(Debug, serde::Serialize)]
struct DiagnosticJson {
    code: &'static str,
    span: String,
    message: String,
}

#[derive(Debug, serde::Serialize)]
struct ResolutionJson {
    file: String,
    scopes: Vec<ScopeJson>,
    views: Vec<String>,
    errors: Vec<DiagnosticJson>,
}

/// Renders the `.res.json` structured format (§6): `{file, scopes,
/// views, errors}`.
pub fn render_resolution_json(file: &Path, module: &Module, table: &ResolutionTable) -> String {
    let counts = usage_counts(module, table);
    let scopes = table
        .scopes()
        .iter()
        .map(|scope| {
            let mut variables: Vec<VariableJson> = scope
                .variables()
                .map(|b| VariableJson {
                    name: b.name.clone(),
                    kind: binding_kind_label(b.kind).to_string(),
                    uses: counts.get(&(scope.id, b.name.clone())).copied().unwrap_or(0),
                })
                .collect();
            variables.sort_by(|a, b| a.name.cmp(&b.name));
            ScopeJson {
                kind: scope_kind_label(scope.kind).to_string(),
                span: scope.span.to_string(),
                parent: scope.parent,
                variables,
            }
        })
        .collect();
    let errors = table
        .errors()
        .iter()
        .map(|e| DiagnosticJson {
            code: e.code(),
            span: e.span().to_string(),
            message: e.to_string(),
        })
        .collect();
    let report = ResolutionJson {
        file: file.display().to_string(),
        scopes,
        views: table.declared_views().to_vec(),
        errors,
    };
    serde_json::to_string_pretty(&report).expect("resolution report is always serializable")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;
    use crate::parser;
    use crate::resolver;

    #[test]
    fn token_dump_includes_index_kind_and_lexeme() {
        let scan = lexer::scan("x = 1\n");
        let out = render_tokens(&scan.tokens, &scan.errors);
        assert!(out.contains("NAME"));
        assert!(out.contains("\"x\""));
    }

    #[test]
    fn ast_dump_includes_span_bracketed_header() {
        let scan = lexer::scan("x = 1\n");
        let (module, _) = parser::parse(&scan.tokens);
        let out = render_ast(&module);
        assert!(out.starts_with("Module ["));
        assert!(out.contains("AssignStmt ["));
    }

    #[test]
    fn resolution_text_counts_each_use_of_a_name() {
        let scan = lexer::scan("x = 1\nprint(x)\nprint(x)\n");
        let (module, _) = parser::parse(&scan.tokens);
        let table = resolver::resolve(&module);
        let out = render_resolution_text(&module, &table);
        // one use for the assignment target itself plus one per `print(x)` call
        assert!(out.contains("x : local (used 3 times)"));
    }

    #[test]
    fn resolution_json_round_trips_through_serde() {
        let scan = lexer::scan("x = 1\n");
        let (module, _) = parser::parse(&scan.tokens);
        let table = resolver::resolve(&module);
        let out = render_resolution_json(Path::new("a.psx"), &module, &table);
        let value: serde_json::Value = serde_json::from_str(&out).expect("valid json");
        assert_eq!(value["file"], "a.psx");
    }
}
