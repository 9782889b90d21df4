//! The final Python textual emitter (§1: "out of scope... referenced
//! only by interface" — its internal design is unspecified beyond
//! consuming a fully desugared AST and producing Python source text).
//! This is a straightforward recursive-descent printer over the same
//! node set `psxc_core::emit`'s debug dumps walk, producing real Python
//! syntax instead of an s-expression trace.
//!
//! By the time a module reaches the printer it has already been through
//! the view transformer, so `view`/HTML nodes are not expected here —
//! they're rendered as a best-effort fallback rather than a panic, since
//! a module whose transform was skipped (§7, resolution had errors) is
//! still a valid `Module` a caller could choose to print anyway.

use psxc_core::ast::*;
use psxc_core::token::{LiteralValue, Radix};

const INDENT: &str = "    ";

pub fn print_module(module: &Module) -> String {
    let mut out = String::new();
    for stmt in &module.body {
        print_stmt(&mut out, stmt, 0);
    }
    out
}

fn push_indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str(INDENT);
    }
}

fn print_block(out: &mut String, body: &[Stmt], level: usize) {
    if body.is_empty() {
        push_indent(out, level);
        out.push_str("pass\n");
        return;
    }
    for stmt in body {
        print_stmt(out, stmt, level);
    }
}

fn print_stmt(out: &mut String, stmt: &Stmt, level: usize) {
    match stmt {
        Stmt::Expr(s) => {
            push_indent(out, level);
            out.push_str(&print_expr(&s.value));
            out.push('\n');
        }
        Stmt::Assign(s) => {
            push_indent(out, level);
            for target in &s.targets {
                out.push_str(&print_expr(target));
                out.push_str(" = ");
            }
            out.push_str(&print_expr(&s.value));
            out.push('\n');
        }
        Stmt::AnnotatedAssign(s) => {
            push_indent(out, level);
            out.push_str(&print_expr(&s.target));
            out.push_str(": ");
            out.push_str(&print_expr(&s.annotation));
            if let Some(value) = &s.value {
                out.push_str(" = ");
                out.push_str(&print_expr(value));
            }
            out.push('\n');
        }
        Stmt::Return(s) => {
            push_indent(out, level);
            out.push_str("return");
            if let Some(value) = &s.value {
                out.push(' ');
                out.push_str(&print_expr(value));
            }
            out.push('\n');
        }
        Stmt::Raise(s) => {
            push_indent(out, level);
            out.push_str("raise");
            if let Some(exc) = &s.exception {
                out.push(' ');
                out.push_str(&print_expr(exc));
            }
            if let Some(from) = &s.from {
                out.push_str(" from ");
                out.push_str(&print_expr(from));
            }
            out.push('\n');
        }
        Stmt::Pass(_) => {
            push_indent(out, level);
            out.push_str("pass\n");
        }
        Stmt::Break(_) => {
            push_indent(out, level);
            out.push_str("break\n");
        }
        Stmt::Continue(_) => {
            push_indent(out, level);
            out.push_str("continue\n");
        }
        Stmt::YieldStmt(s) => {
            push_indent(out, level);
            out.push_str(&print_expr(&s.value));
            out.push('\n');
        }
        Stmt::Assert(s) => {
            push_indent(out, level);
            out.push_str("assert ");
            out.push_str(&print_expr(&s.test));
            if let Some(message) = &s.message {
                out.push_str(", ");
                out.push_str(&print_expr(message));
            }
            out.push('\n');
        }
        Stmt::Global(s) => {
            push_indent(out, level);
            out.push_str("global ");
            out.push_str(&s.names.join(", "));
            out.push('\n');
        }
        Stmt::Nonlocal(s) => {
            push_indent(out, level);
            out.push_str("nonlocal ");
            out.push_str(&s.names.join(", "));
            out.push('\n');
        }
        Stmt::Import(s) => {
            push_indent(out, level);
            out.push_str("import ");
            out.push_str(&s.names.iter().map(print_alias).collect::<Vec<_>>().join(", "));
            out.push('\n');
        }
        Stmt::ImportFrom(s) => {
            push_indent(out, level);
            out.push_str("from ");
            out.push_str(&".".repeat(s.dots as usize));
            if let Some(module_name) = &s.module {
                out.push_str(module_name);
            }
            out.push_str(" import ");
            if s.wildcard {
                out.push('*');
            } else {
                out.push_str(&s.names.iter().map(print_alias).collect::<Vec<_>>().join(", "));
            }
            out.push('\n');
        }
        Stmt::If(s) => {
            push_indent(out, level);
            out.push_str("if ");
            out.push_str(&print_expr(&s.test));
            out.push_str(":\n");
            print_block(out, &s.body, level + 1);
            if !s.orelse.is_empty() {
                push_indent(out, level);
                out.push_str("else:\n");
                print_block(out, &s.orelse, level + 1);
            }
        }
        Stmt::While(s) => {
            push_indent(out, level);
            out.push_str("while ");
            out.push_str(&print_expr(&s.test));
            out.push_str(":\n");
            print_block(out, &s.body, level + 1);
            if !s.orelse.is_empty() {
                push_indent(out, level);
                out.push_str("else:\n");
                print_block(out, &s.orelse, level + 1);
            }
        }
        Stmt::For(s) => {
            push_indent(out, level);
            if s.is_async {
                out.push_str("async ");
            }
            out.push_str("for ");
            out.push_str(&print_expr(&s.target));
            out.push_str(" in ");
            out.push_str(&print_expr(&s.iter));
            out.push_str(":\n");
            print_block(out, &s.body, level + 1);
            if !s.orelse.is_empty() {
                push_indent(out, level);
                out.push_str("else:\n");
                print_block(out, &s.orelse, level + 1);
            }
        }
        Stmt::With(s) => {
            push_indent(out, level);
            if s.is_async {
                out.push_str("async ");
            }
            out.push_str("with ");
            let items: Vec<String> = s
                .items
                .iter()
                .map(|item| match &item.target {
                    Some(target) => format!("{} as {}", print_expr(&item.context), print_expr(target)),
                    None => print_expr(&item.context),
                })
                .collect();
            out.push_str(&items.join(", "));
            out.push_str(":\n");
            print_block(out, &s.body, level + 1);
        }
        Stmt::Try(s) => {
            push_indent(out, level);
            out.push_str("try:\n");
            print_block(out, &s.body, level + 1);
            for handler in &s.handlers {
                push_indent(out, level);
                out.push_str(if handler.is_star { "except*" } else { "except" });
                if let Some(exc_type) = &handler.exception_type {
                    out.push(' ');
                    out.push_str(&print_expr(exc_type));
                    if let Some(target) = &handler.target {
                        out.push_str(" as ");
                        out.push_str(target);
                    }
                }
                out.push_str(":\n");
                print_block(out, &handler.body, level + 1);
            }
            if !s.orelse.is_empty() {
                push_indent(out, level);
                out.push_str("else:\n");
                print_block(out, &s.orelse, level + 1);
            }
            if !s.finally.is_empty() {
                push_indent(out, level);
                out.push_str("finally:\n");
                print_block(out, &s.finally, level + 1);
            }
        }
        Stmt::Function(s) => {
            push_indent(out, level);
            if s.is_async {
                out.push_str("async ");
            }
            out.push_str("def ");
            out.push_str(&s.name);
            out.push('(');
            out.push_str(&print_params(&s.params));
            out.push(')');
            if let Some(return_type) = &s.return_type {
                out.push_str(" -> ");
                out.push_str(&print_expr(return_type));
            }
            out.push_str(":\n");
            print_block(out, &s.body, level + 1);
        }
        Stmt::Class(s) => {
            push_indent(out, level);
            out.push_str("class ");
            out.push_str(&s.name);
            let mut bases: Vec<String> = s.bases.iter().map(print_expr).collect();
            bases.extend(s.keywords.iter().map(|(name, value)| format!("{}={}", name, print_expr(value))));
            if !bases.is_empty() {
                out.push('(');
                out.push_str(&bases.join(", "));
                out.push(')');
            }
            out.push_str(":\n");
            print_block(out, &s.body, level + 1);
        }
        Stmt::TypeAlias(s) => {
            push_indent(out, level);
            out.push_str("type ");
            out.push_str(&s.name);
            out.push_str(" = ");
            out.push_str(&print_expr(&s.value));
            out.push('\n');
        }
        Stmt::Match(s) => {
            push_indent(out, level);
            out.push_str("match ");
            out.push_str(&print_expr(&s.subject));
            out.push_str(":\n");
            for case in &s.cases {
                push_indent(out, level + 1);
                out.push_str("case ");
                out.push_str(&print_pattern(&case.pattern));
                if let Some(guard) = &case.guard {
                    out.push_str(" if ");
                    out.push_str(&print_expr(guard));
                }
                out.push_str(":\n");
                print_block(out, &case.body, level + 2);
            }
        }
        Stmt::Decorated(s) => {
            for decorator in &s.decorators {
                push_indent(out, level);
                out.push('@');
                out.push_str(&print_expr(decorator));
                out.push('\n');
            }
            print_stmt(out, &s.target, level);
        }
        Stmt::Multi(s) => {
            push_indent(out, level);
            let mut parts = Vec::new();
            for inner in &s.statements {
                let mut buf = String::new();
                print_stmt(&mut buf, inner, 0);
                parts.push(buf.trim_end_matches('\n').to_string());
            }
            out.push_str(&parts.join("; "));
            out.push('\n');
        }
        // By construction the transformer desugars every `view` before the
        // printer ever sees it; this path only runs for a module whose
        // transform was deliberately skipped (§7).
        Stmt::View(s) => {
            push_indent(out, level);
            out.push_str("def ");
            out.push_str(&s.name);
            out.push('(');
            out.push_str(&print_params(&s.params));
            out.push_str("):\n");
            print_block(out, &s.body, level + 1);
        }
    }
}

fn print_alias(alias: &ImportAlias) -> String {
    match &alias.alias {
        Some(alias_name) => format!("{} as {}", alias.name, alias_name),
        None => alias.name.clone(),
    }
}

fn print_params(params: &ParamList) -> String {
    let mut parts = Vec::new();
    for param in &params.positional_only {
        parts.push(print_param(param));
    }
    if !params.positional_only.is_empty() {
        parts.push("/".to_string());
    }
    for param in &params.positional_or_keyword {
        parts.push(print_param(param));
    }
    if let Some(vararg) = &params.vararg {
        parts.push(format!("*{}", print_param(vararg)));
    } else if !params.keyword_only.is_empty() {
        parts.push("*".to_string());
    }
    for param in &params.keyword_only {
        parts.push(print_param(param));
    }
    if let Some(kwarg) = &params.kwarg {
        parts.push(format!("**{}", print_param(kwarg)));
    }
    parts.join(", ")
}

fn print_param(param: &Param) -> String {
    let mut out = param.name.clone();
    if let Some(annotation) = &param.annotation {
        out.push_str(": ");
        out.push_str(&print_expr(annotation));
    }
    if let Some(default) = &param.default {
        out.push_str(if param.annotation.is_some() { " = " } else { "=" });
        out.push_str(&print_expr(default));
    }
    out
}

fn print_expr(expr: &Expr) -> String {
    match expr {
        Expr::Name(e) => e.value.clone(),
        Expr::Literal(e) => print_literal(&e.value),
        Expr::FString(e) => print_fstring(&e.parts),
        Expr::Attribute(e) => format!("{}.{}", print_expr(&e.value), e.attr),
        Expr::Call(e) => format!("{}({})", print_expr(&e.func), e.args.iter().map(print_arg).collect::<Vec<_>>().join(", ")),
        Expr::Subscript(e) => format!("{}[{}]", print_expr(&e.value), print_expr(&e.index)),
        Expr::Slice(e) => {
            let lower = e.lower.as_deref().map(print_expr).unwrap_or_default();
            let upper = e.upper.as_deref().map(print_expr).unwrap_or_default();
            match &e.step {
                Some(step) => format!("{}:{}:{}", lower, upper, print_expr(step)),
                None => format!("{}:{}", lower, upper),
            }
        }
        Expr::Binary(e) => format!("{} {} {}", print_expr(&e.left), binary_op_str(e.op), print_expr(&e.right)),
        Expr::Unary(e) => {
            let op = unary_op_str(e.op);
            if op == "not" {
                format!("not {}", print_expr(&e.operand))
            } else {
                format!("{}{}", op, print_expr(&e.operand))
            }
        }
        Expr::Ternary(e) => format!("{} if {} else {}", print_expr(&e.body), print_expr(&e.test), print_expr(&e.orelse)),
        Expr::NamedExpr(e) => format!("({} := {})", e.target.value, print_expr(&e.value)),
        Expr::Star(e) => format!("*{}", print_expr(&e.value)),
        Expr::List(e) => format!("[{}]", e.elements.iter().map(print_expr).collect::<Vec<_>>().join(", ")),
        Expr::Tuple(e) => {
            let items: Vec<String> = e.elements.iter().map(print_expr).collect();
            if items.len() == 1 {
                format!("({},)", items[0])
            } else {
                format!("({})", items.join(", "))
            }
        }
        Expr::Set(e) => {
            if e.elements.is_empty() {
                "set()".to_string()
            } else {
                format!("{{{}}}", e.elements.iter().map(print_expr).collect::<Vec<_>>().join(", "))
            }
        }
        Expr::Dict(e) => format!("{{{}}}", e.entries.iter().map(print_dict_entry).collect::<Vec<_>>().join(", ")),
        Expr::ListComp(e) => format!("[{} {}]", print_expr(&e.element), print_clauses(&e.clauses)),
        Expr::SetComp(e) => format!("{{{} {}}}", print_expr(&e.element), print_clauses(&e.clauses)),
        Expr::DictComp(e) => format!("{{{}: {} {}}}", print_expr(&e.key), print_expr(&e.value), print_clauses(&e.clauses)),
        Expr::GeneratorExp(e) => format!("({} {})", print_expr(&e.element), print_clauses(&e.clauses)),
        Expr::Lambda(e) => format!("lambda {}: {}", print_params(&e.params), print_expr(&e.body)),
        Expr::Await(e) => format!("await {}", print_expr(&e.value)),
        Expr::Yield(e) => match &e.kind {
            YieldKind::Value(Some(value)) => format!("yield {}", print_expr(value)),
            YieldKind::Value(None) => "yield".to_string(),
            YieldKind::From(value) => format!("yield from {}", print_expr(value)),
        },
        Expr::Group(e) => format!("({})", print_expr(&e.inner)),
        Expr::TypeParam(e) => e.name.clone(),
        // HTML nodes never survive a completed transform; a best-effort
        // fallback keeps printing total rather than panicking.
        Expr::HtmlElement(e) => format!("<{}>", e.tag),
        Expr::HtmlContent(_) => "None".to_string(),
        Expr::HtmlText(e) => format!("{:?}", e.text),
        Expr::HtmlInterpolation(e) => print_expr(&e.value),
    }
}

fn print_arg(arg: &Argument) -> String {
    match arg {
        Argument::Positional(value) => print_expr(value),
        Argument::Keyword { name, value } => format!("{}={}", name, print_expr(value)),
        Argument::Star(value) => format!("*{}", print_expr(value)),
        Argument::DoubleStar(value) => format!("**{}", print_expr(value)),
    }
}

fn print_dict_entry(entry: &DictEntry) -> String {
    match &entry.key {
        Some(key) => format!("{}: {}", print_expr(key), print_expr(&entry.value)),
        None => format!("**{}", print_expr(&entry.value)),
    }
}

fn print_clauses(clauses: &[ComprehensionClause]) -> String {
    clauses
        .iter()
        .map(|clause| {
            let mut part = String::new();
            if clause.is_async {
                part.push_str("async ");
            }
            part.push_str("for ");
            part.push_str(&print_expr(&clause.target));
            part.push_str(" in ");
            part.push_str(&print_expr(&clause.iter));
            for cond in &clause.ifs {
                part.push_str(" if ");
                part.push_str(&print_expr(cond));
            }
            part
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_fstring(parts: &[FStringPart]) -> String {
    let mut body = String::new();
    for part in parts {
        match part {
            FStringPart::Text(text) => body.push_str(&text.replace('{', "{{").replace('}', "}}")),
            FStringPart::Field(field) => {
                body.push('{');
                body.push_str(&print_expr(&field.value));
                if let Some(conversion) = field.conversion {
                    body.push('!');
                    body.push(conversion);
                }
                if let Some(spec) = &field.format_spec {
                    body.push(':');
                    body.push_str(&print_fstring(spec));
                }
                body.push('}');
            }
        }
    }
    format!("f{:?}", body)
}

fn print_pattern(pattern: &Pattern) -> String {
    match pattern {
        Pattern::Literal(p) => print_literal(&p.value),
        Pattern::Capture(p) => p.name.clone(),
        Pattern::Wildcard(_) => "_".to_string(),
        Pattern::Value(p) => print_expr(&p.path),
        Pattern::Group(p) => format!("({})", print_pattern(&p.inner)),
        Pattern::Sequence(p) => format!("[{}]", p.elements.iter().map(print_pattern).collect::<Vec<_>>().join(", ")),
        Pattern::Star(p) => match &p.name {
            Some(name) => format!("*{}", name),
            None => "*_".to_string(),
        },
        Pattern::Mapping(p) => {
            let mut entries: Vec<String> = p.entries.iter().map(|e| format!("{}: {}", print_expr(&e.key), print_pattern(&e.value))).collect();
            if let Some(rest) = &p.rest {
                entries.push(format!("**{}", rest));
            }
            format!("{{{}}}", entries.join(", "))
        }
        Pattern::Class(p) => {
            let mut args: Vec<String> = p.positional.iter().map(print_pattern).collect();
            args.extend(p.keyword.iter().map(|k| format!("{}={}", k.name, print_pattern(&k.pattern))));
            format!("{}({})", print_expr(&p.path), args.join(", "))
        }
        Pattern::As(p) => format!("{} as {}", print_pattern(&p.pattern), p.name),
        Pattern::Or(p) => p.alternatives.iter().map(print_pattern).collect::<Vec<_>>().join(" | "),
    }
}

fn print_literal(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        LiteralValue::Int { value, radix } => print_radix_int(&value.to_string(), *radix, *value < 0),
        LiteralValue::BigInt { digits, radix } => print_radix_int(digits, *radix, digits.starts_with('-')),
        LiteralValue::Float(f) => {
            if f.fract() == 0.0 && f.is_finite() {
                format!("{:.1}", f)
            } else {
                f.to_string()
            }
        }
        LiteralValue::Complex(f) => format!("{}j", f),
        LiteralValue::Str(s) => format!("{:?}", s),
        LiteralValue::Bytes(bytes) => format!("b{:?}", String::from_utf8_lossy(bytes)),
        LiteralValue::None => "None".to_string(),
        LiteralValue::Ellipsis => "...".to_string(),
    }
}

fn print_radix_int(digits: &str, radix: Radix, negative: bool) -> String {
    let unsigned = digits.trim_start_matches('-');
    let prefix = match radix {
        Radix::Decimal => "",
        Radix::Hex => "0x",
        Radix::Octal => "0o",
        Radix::Binary => "0b",
    };
    if negative {
        format!("-{}{}", prefix, unsigned)
    } else {
        format!("{}{}", prefix, unsigned)
    }
}

fn binary_op_str(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Or => "or",
        BinaryOp::And => "and",
        BinaryOp::Lt => "<",
        BinaryOp::LtEq => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::GtEq => ">=",
        BinaryOp::Eq => "==",
        BinaryOp::NotEq => "!=",
        BinaryOp::Is => "is",
        BinaryOp::IsNot => "is not",
        BinaryOp::In => "in",
        BinaryOp::NotIn => "not in",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "^",
        BinaryOp::BitAnd => "&",
        BinaryOp::LShift => "<<",
        BinaryOp::RShift => ">>",
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::FloorDiv => "//",
        BinaryOp::Mod => "%",
        BinaryOp::MatMul => "@",
        BinaryOp::Pow => "**",
    }
}

fn unary_op_str(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Pos => "+",
        UnaryOp::Neg => "-",
        UnaryOp::Invert => "~",
        UnaryOp::Not => "not",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psxc_core::{lexer, parser};

    fn print_source(source: &str) -> String {
        let scan = lexer::scan(source);
        let (module, errors) = parser::parse(&scan.tokens);
        assert!(errors.is_empty(), "{:?}", errors);
        print_module(&module)
    }

    #[test]
    fn prints_a_function_with_an_fstring_return() {
        let printed = print_source("def greet(name):\n    return f\"Hello, {name}!\"\n");
        assert_eq!(printed, "def greet(name):\n    return f\"Hello, {name}!\"\n");
    }

    #[test]
    fn prints_a_class_with_bases() {
        let printed = print_source("class Foo(Bar):\n    x = 1\n");
        assert_eq!(printed, "class Foo(Bar):\n    x = 1\n");
    }

    #[test]
    fn prints_an_if_else() {
        let printed = print_source("if x:\n    y = 1\nelse:\n    y = 2\n");
        assert_eq!(printed, "if x:\n    y = 1\nelse:\n    y = 2\n");
    }
}
