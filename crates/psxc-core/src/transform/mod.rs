// Copyright (c) psxc contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Replaces PSX-only AST forms (`view`, HTML literals) with the plain
//! Python forms the textual emitter knows how to print (§4.6).
//!
//! `view Name(params): body` becomes a class inheriting `BaseView`
//! with an `__init__` storing parameters and a `_render(self)` that
//! builds the view's child sequence by appending into a freshly named
//! local list per HTML element — the "naming hygiene" scheme
//! (`_<tag>_children_<counter>`) keeps generated names visually
//! distinct from user code.

pub mod errors;

pub use errors::TransformError;

use crate::ast::*;
use crate::resolver::{ResolutionTable, ScopeKind};
use crate::span::{NodeId, NodeIdGenerator, Span};

/// Per the Open Question decided in §9: resolution is required, and a
/// module with any resolver error skips transform entirely rather than
/// running on a best-effort table.
pub fn transform(module: &Module, table: &ResolutionTable) -> Result<Module, TransformError> {
    if table.has_errors() {
        return Err(TransformError::ResolutionHadErrors);
    }
    let mut t = Transformer::new(table);
    let body = t.transform_block_toplevel(&module.body)?;
    Ok(Module {
        id: module.id,
        span: module.span,
        body,
    })
}

/// One declared slot: its key (`None` is the default slot) and its
/// fallback content, in order of first appearance in the view body.
#[derive(Debug, Clone)]
pub struct SlotInfo {
    pub name: Option<String>,
    pub fallback: Vec<HtmlChild>,
    pub span: Span,
}

/// Walks a view body collecting `<slot>` elements, in first-appearance
/// order, without mutating anything — used both by the transformer and
/// by callers that want to know a view's slot contract ahead of time.
pub fn collect_slots(body: &[Stmt]) -> Vec<SlotInfo> {
    let mut slots = Vec::new();
    for stmt in body {
        collect_slots_stmt(stmt, &mut slots);
    }
    slots
}

fn collect_slots_stmt(stmt: &Stmt, out: &mut Vec<SlotInfo>) {
    match stmt {
        Stmt::Expr(e) => collect_slots_expr(&e.value, out),
        Stmt::Assign(a) => collect_slots_expr(&a.value, out),
        Stmt::AnnotatedAssign(a) => {
            if let Some(v) = &a.value {
                collect_slots_expr(v, out);
            }
        }
        Stmt::Return(r) => {
            if let Some(v) = &r.value {
                collect_slots_expr(v, out);
            }
        }
        Stmt::If(s) => {
            for st in s.body.iter().chain(s.orelse.iter()) {
                collect_slots_stmt(st, out);
            }
        }
        Stmt::While(s) => {
            for st in s.body.iter().chain(s.orelse.iter()) {
                collect_slots_stmt(st, out);
            }
        }
        Stmt::For(s) => {
            for st in s.body.iter().chain(s.orelse.iter()) {
                collect_slots_stmt(st, out);
            }
        }
        Stmt::With(s) => {
            for st in &s.body {
                collect_slots_stmt(st, out);
            }
        }
        _ => {}
    }
}

fn collect_slots_expr(expr: &Expr, out: &mut Vec<SlotInfo>) {
    match expr {
        Expr::HtmlElement(el) if el.tag == "slot" => {
            let name = slot_name_attr(el);
            out.push(SlotInfo {
                name,
                fallback: el.children.clone(),
                span: el.span,
            });
        }
        Expr::HtmlElement(el) => {
            for child in &el.children {
                if let HtmlChild::Element(inner) = child {
                    collect_slots_expr(&Expr::HtmlElement(inner.clone()), out);
                }
            }
        }
        Expr::HtmlContent(c) => {
            for child in &c.children {
                if let HtmlChild::Element(inner) = child {
                    collect_slots_expr(&Expr::HtmlElement(inner.clone()), out);
                }
            }
        }
        _ => {}
    }
}

fn slot_name_attr(el: &HtmlElementExpr) -> Option<String> {
    for attr in &el.attributes {
        if let HtmlAttribute::Named { name, value } = attr {
            if name == "name" {
                if let HtmlAttributeValue::Literal(Expr::Literal(lit)) = value {
                    if let crate::token::LiteralValue::Str(s) = &lit.value {
                        return Some(s.clone());
                    }
                }
            }
        }
    }
    None
}

struct Transformer<'a> {
    table: &'a ResolutionTable,
    ids: NodeIdGenerator,
    /// Stack of currently-open child-list variable names, innermost
    /// last — mirrors the spec's "stack of child-list variable names".
    child_stack: Vec<String>,
    /// Names already bound by the resolver in the view scope currently
    /// being transformed; consulted so generated names never collide.
    user_names: std::collections::HashSet<String>,
    stride: u32,
    counter: u32,
}

const DEFAULT_STRIDE: u32 = 1000;

impl<'a> Transformer<'a> {
    fn new(table: &'a ResolutionTable) -> Self {
        Self {
            table,
            ids: NodeIdGenerator::new(),
            child_stack: Vec::new(),
            user_names: std::collections::HashSet::new(),
            stride: DEFAULT_STRIDE,
            counter: 0,
        }
    }

    fn id(&mut self) -> NodeId {
        self.ids.next_id()
    }

    // ------------------------------------------------------------
    // AST builders
    // ------------------------------------------------------------

    fn name(&mut self, value: &str, span: Span) -> Expr {
        Expr::Name(NameExpr {
            span,
            id: self.id(),
            value: value.to_string(),
        })
    }

    fn str_lit(&mut self, value: &str, span: Span) -> Expr {
        Expr::Literal(LiteralExpr {
            span,
            id: self.id(),
            value: crate::token::LiteralValue::Str(value.to_string()),
        })
    }

    fn none_lit(&mut self, span: Span) -> Expr {
        Expr::Literal(LiteralExpr {
            span,
            id: self.id(),
            value: crate::token::LiteralValue::None,
        })
    }

    fn bool_lit(&mut self, value: bool, span: Span) -> Expr {
        Expr::Literal(LiteralExpr {
            span,
            id: self.id(),
            value: crate::token::LiteralValue::Bool(value),
        })
    }

    fn list_lit(&mut self, elements: Vec<Expr>, span: Span) -> Expr {
        Expr::List(ListExpr {
            span,
            id: self.id(),
            elements,
        })
    }

    fn dict_lit(&mut self, entries: Vec<DictEntry>, span: Span) -> Expr {
        Expr::Dict(DictExpr {
            span,
            id: self.id(),
            entries,
        })
    }

    fn attr(&mut self, value: Expr, attr_name: &str, span: Span) -> Expr {
        Expr::Attribute(AttributeExpr {
            span,
            id: self.id(),
            value: Box::new(value),
            attr: attr_name.to_string(),
        })
    }

    fn call(&mut self, func: Expr, args: Vec<Argument>, span: Span) -> Expr {
        Expr::Call(CallExpr {
            span,
            id: self.id(),
            func: Box::new(func),
            args,
        })
    }

    fn expr_stmt(&mut self, value: Expr, span: Span) -> Stmt {
        Stmt::Expr(ExprStmt {
            span,
            id: self.id(),
            value,
        })
    }

    fn assign(&mut self, target: Expr, value: Expr, span: Span) -> Stmt {
        Stmt::Assign(AssignStmt {
            span,
            id: self.id(),
            targets: vec![target],
            value,
        })
    }

    fn append_call(&mut self, list_name: &str, value: Expr, span: Span) -> Stmt {
        let list_ref = self.name(list_name, span);
        let method = self.attr(list_ref, "append", span);
        let call = self.call(method, vec![Argument::Positional(value)], span);
        self.expr_stmt(call, span)
    }

    /// Bundles statements a lowering produced as a side effect (child-list
    /// initialization/append calls) together with the final statement that
    /// depended on them, as one `Multi` node when there is any prelude.
    fn wrap_with_prelude(&mut self, pre: Vec<Stmt>, stmt: Stmt, span: Span) -> Stmt {
        if pre.is_empty() {
            stmt
        } else {
            Stmt::Multi(MultiStmt {
                span,
                id: self.id(),
                statements: pre.into_iter().chain(std::iter::once(stmt)).collect(),
            })
        }
    }

    /// `_<tag>_children_<n>`, advancing past any name the resolver
    /// already reports as bound in this view's scope.
    fn fresh_child_list_name(&mut self, tag: &str) -> String {
        loop {
            self.counter += self.stride;
            let candidate = format!("_{tag}_children_{}", self.counter);
            if !self.user_names.contains(&candidate) {
                return candidate;
            }
            self.stride *= 2;
        }
    }

    // ------------------------------------------------------------
    // View -> class
    // ------------------------------------------------------------

    fn transform_block_toplevel(&mut self, body: &[Stmt]) -> Result<Vec<Stmt>, TransformError> {
        let mut out = Vec::with_capacity(body.len());
        for stmt in body {
            out.push(self.transform_stmt(stmt)?);
        }
        Ok(out)
    }

    fn transform_stmt(&mut self, stmt: &Stmt) -> Result<Stmt, TransformError> {
        match stmt {
            Stmt::View(v) => self.transform_view(v),
            Stmt::Function(f) => Ok(Stmt::Function(FunctionStmt {
                body: self.transform_block_toplevel(&f.body)?,
                ..f.clone()
            })),
            Stmt::Class(c) => Ok(Stmt::Class(ClassStmt {
                body: self.transform_block_toplevel(&c.body)?,
                ..c.clone()
            })),
            Stmt::If(s) => Ok(Stmt::If(IfStmt {
                body: self.transform_block_toplevel(&s.body)?,
                orelse: self.transform_block_toplevel(&s.orelse)?,
                ..s.clone()
            })),
            Stmt::While(s) => Ok(Stmt::While(WhileStmt {
                body: self.transform_block_toplevel(&s.body)?,
                orelse: self.transform_block_toplevel(&s.orelse)?,
                ..s.clone()
            })),
            Stmt::For(s) => Ok(Stmt::For(ForStmt {
                body: self.transform_block_toplevel(&s.body)?,
                orelse: self.transform_block_toplevel(&s.orelse)?,
                ..s.clone()
            })),
            Stmt::With(s) => Ok(Stmt::With(WithStmt {
                body: self.transform_block_toplevel(&s.body)?,
                ..s.clone()
            })),
            Stmt::Try(s) => {
                let mut handlers = Vec::with_capacity(s.handlers.len());
                for h in &s.handlers {
                    handlers.push(ExceptHandler {
                        body: self.transform_block_toplevel(&h.body)?,
                        ..h.clone()
                    });
                }
                Ok(Stmt::Try(TryStmt {
                    body: self.transform_block_toplevel(&s.body)?,
                    handlers,
                    orelse: self.transform_block_toplevel(&s.orelse)?,
                    finally: self.transform_block_toplevel(&s.finally)?,
                    ..s.clone()
                }))
            }
            Stmt::Decorated(d) => Ok(Stmt::Decorated(DecoratedStmt {
                target: Box::new(self.transform_stmt(d.target.as_ref())?),
                ..d.clone()
            })),
            Stmt::Expr(e) => {
                let (pre, value) = self.lower_value(&e.value)?;
                let stmt = Stmt::Expr(ExprStmt {
                    span: e.span,
                    id: e.id,
                    value,
                });
                Ok(self.wrap_with_prelude(pre, stmt, e.span))
            }
            Stmt::Assign(a) => {
                let (pre, value) = self.lower_value(&a.value)?;
                let stmt = Stmt::Assign(AssignStmt {
                    value,
                    ..a.clone()
                });
                Ok(self.wrap_with_prelude(pre, stmt, a.span))
            }
            other => Ok(other.clone()),
        }
    }

    fn transform_view(&mut self, view: &ViewStmt) -> Result<Stmt, TransformError> {
        let scope = self
            .table
            .scopes()
            .iter()
            .find(|s| s.kind == ScopeKind::View && s.name.as_deref() == Some(view.name.as_str()));
        self.user_names = scope
            .map(|s| s.bindings.keys().cloned().collect())
            .unwrap_or_default();
        self.stride = DEFAULT_STRIDE;
        self.counter = 0;

        let slots = collect_slots(&view.body);
        let mut seen_names = std::collections::HashSet::new();
        for slot in &slots {
            let key = slot.name.clone().unwrap_or_default();
            if !seen_names.insert(key) {
                return Err(TransformError::DuplicateSlotName {
                    name: slot.name.clone().unwrap_or_else(|| "default".to_string()),
                    span: slot.span,
                });
            }
        }

        let init_fn = self.build_init(view);
        let render_fn = self.build_render(view)?;

        let base = self.name("BaseView", view.span);
        Ok(Stmt::Class(ClassStmt {
            span: view.span,
            id: self.id(),
            name: view.name.clone(),
            type_params: view.type_params.clone(),
            bases: vec![base],
            keywords: Vec::new(),
            body: vec![init_fn, render_fn],
        }))
    }

    fn build_init(&mut self, view: &ViewStmt) -> Stmt {
        let span = view.span;
        let mut params = ParamList::default();
        params.positional_or_keyword.push(Param {
            name: "self".to_string(),
            annotation: None,
            default: None,
            span,
        });
        for p in view.params.iter_all() {
            params.positional_or_keyword.push(p.clone());
        }

        let mut body: Vec<Stmt> = view
            .params
            .iter_all()
            .map(|p| {
                let self_expr = self.name("self", span);
                let target = self.attr(self_expr, &p.name, span);
                let value = self.name(&p.name, span);
                self.assign(target, value, span)
            })
            .collect();
        if body.is_empty() {
            body.push(Stmt::Pass(PassStmt { span, id: self.id() }));
        }

        Stmt::Function(FunctionStmt {
            span,
            id: self.id(),
            is_async: false,
            name: "__init__".to_string(),
            type_params: Vec::new(),
            params,
            return_type: None,
            body,
        })
    }

    fn build_render(&mut self, view: &ViewStmt) -> Result<Stmt, TransformError> {
        let span = view.span;
        let mut params = ParamList::default();
        params.positional_or_keyword.push(Param {
            name: "self".to_string(),
            annotation: None,
            default: None,
            span,
        });

        let root_var = self.fresh_child_list_name("view");
        self.child_stack.push(root_var.clone());
        let empty = self.list_lit(Vec::new(), span);
        let mut body = vec![self.assign(self.name(&root_var, span), empty, span)];
        body.extend(self.lower_block_into(&view.body, &root_var)?);
        self.child_stack.pop();

        body.push(Stmt::Return(ReturnStmt {
            span,
            id: self.id(),
            value: Some(self.name(&root_var, span)),
        }));

        Ok(Stmt::Function(FunctionStmt {
            span,
            id: self.id(),
            is_async: false,
            name: "_render".to_string(),
            type_params: Vec::new(),
            params,
            return_type: None,
            body,
        }))
    }

    /// Lowers a statement block where top-level HTML-producing
    /// statements append into `list_name`; everything else is
    /// transformed recursively, with `If`/`For`/`While`/`With` bodies
    /// still contributing to the same list (imperative render logic).
    fn lower_block_into(&mut self, stmts: &[Stmt], list_name: &str) -> Result<Vec<Stmt>, TransformError> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            match stmt {
                Stmt::Expr(e) if is_html(&e.value) => {
                    let (pre, value) = self.lower_value(&e.value)?;
                    out.extend(pre);
                    out.push(self.append_call(list_name, value, e.span));
                }
                Stmt::Assign(a) if is_html(&a.value) => {
                    let (pre, value) = self.lower_value(&a.value)?;
                    out.extend(pre);
                    out.push(Stmt::Assign(AssignStmt {
                        value,
                        ..a.clone()
                    }));
                }
                Stmt::If(s) => out.push(Stmt::If(IfStmt {
                    span: s.span,
                    id: self.id(),
                    test: self.transform_pure(&s.test),
                    body: self.lower_block_into(&s.body, list_name)?,
                    orelse: self.lower_block_into(&s.orelse, list_name)?,
                })),
                Stmt::For(s) => out.push(Stmt::For(ForStmt {
                    span: s.span,
                    id: self.id(),
                    is_async: s.is_async,
                    target: s.target.clone(),
                    iter: self.transform_pure(&s.iter),
                    body: self.lower_block_into(&s.body, list_name)?,
                    orelse: self.lower_block_into(&s.orelse, list_name)?,
                })),
                Stmt::While(s) => out.push(Stmt::While(WhileStmt {
                    span: s.span,
                    id: self.id(),
                    test: self.transform_pure(&s.test),
                    body: self.lower_block_into(&s.body, list_name)?,
                    orelse: self.lower_block_into(&s.orelse, list_name)?,
                })),
                Stmt::With(s) => out.push(Stmt::With(WithStmt {
                    span: s.span,
                    id: self.id(),
                    is_async: s.is_async,
                    items: s.items.clone(),
                    body: self.lower_block_into(&s.body, list_name)?,
                })),
                other => out.push(self.transform_stmt(other)?),
            }
        }
        Ok(out)
    }

    /// Resolves one HTML/fragment/ordinary expression into (prelude
    /// statements, final value expression).
    fn lower_value(&mut self, expr: &Expr) -> Result<(Vec<Stmt>, Expr), TransformError> {
        match expr {
            Expr::HtmlElement(el) => self.lower_element(el),
            Expr::HtmlContent(c) => {
                let items: Vec<Expr> = c
                    .children
                    .iter()
                    .map(|child| self.lower_child_as_literal(child))
                    .collect();
                Ok((Vec::new(), self.list_lit(items, c.span)))
            }
            other => Ok((Vec::new(), self.transform_pure(other))),
        }
    }

    fn lower_element(&mut self, el: &HtmlElementExpr) -> Result<(Vec<Stmt>, Expr), TransformError> {
        if el.tag == "slot" {
            return Ok((Vec::new(), self.lower_slot(el)));
        }

        if el.self_closing && !el.children.is_empty() {
            return Err(TransformError::SelfClosingWithChildren {
                tag: el.tag.clone(),
                span: el.span,
            });
        }

        let list_name = self.fresh_child_list_name(&el.tag);
        self.child_stack.push(list_name.clone());

        let mut stmts = Vec::new();
        let empty = self.list_lit(Vec::new(), el.span);
        stmts.push(self.assign(self.name(&list_name, el.span), empty, el.span));

        for (idx, child) in el.children.iter().enumerate() {
            match child {
                HtmlChild::Text(t) => {
                    let text = trim_at_boundary(&t.text, idx == 0, idx + 1 == el.children.len());
                    if !text.is_empty() {
                        let lit = self.str_lit(&text, t.span);
                        stmts.push(self.append_call(&list_name, lit, t.span));
                    }
                }
                HtmlChild::Interpolation(i) => {
                    let value = self.transform_pure(i.value.as_ref());
                    stmts.push(self.append_call(&list_name, value, i.span));
                }
                HtmlChild::Element(child_el) => {
                    let (pre, value) = self.lower_element(child_el)?;
                    stmts.extend(pre);
                    stmts.push(self.append_call(&list_name, value, child_el.span));
                }
            }
        }

        self.child_stack.pop();

        let attrs = self.build_attrs(&el.attributes, el.span);
        let tag_lit = self.str_lit(&el.tag, el.span);
        let children_ref = self.name(&list_name, el.span);
        let h = self.name("h", el.span);
        let call = self.call(
            h,
            vec![
                Argument::Positional(tag_lit),
                Argument::Positional(attrs),
                Argument::Positional(children_ref),
            ],
            el.span,
        );
        Ok((stmts, call))
    }

    /// `self._slots.get(name, fallback)` — the fallback is built as a
    /// pure list-literal expression since it only evaluates on demand
    /// as a `dict.get` default argument, not via append statements.
    fn lower_slot(&mut self, el: &HtmlElementExpr) -> Expr {
        let name = slot_name_attr(el);
        let span = el.span;
        let self_expr = self.name("self", span);
        let slots = self.attr(self_expr, "_slots", span);
        let get = self.attr(slots, "get", span);
        let key = match &name {
            Some(n) => self.str_lit(n, span),
            None => self.none_lit(span),
        };
        let fallback_items: Vec<Expr> = el.children.iter().map(|c| self.lower_child_as_literal(c)).collect();
        let fallback = self.list_lit(fallback_items, span);
        self.call(get, vec![Argument::Positional(key), Argument::Positional(fallback)], span)
    }

    /// Builds one HTML child as a pure expression (used only for slot
    /// fallback content and top-level fragments, where a list literal
    /// is sufficient and no append-statement hygiene is needed).
    fn lower_child_as_literal(&mut self, child: &HtmlChild) -> Expr {
        match child {
            HtmlChild::Text(t) => self.str_lit(&t.text, t.span),
            HtmlChild::Interpolation(i) => self.transform_pure(i.value.as_ref()),
            HtmlChild::Element(el) => {
                if el.tag == "slot" {
                    return self.lower_slot(el);
                }
                let attrs = self.build_attrs(&el.attributes, el.span);
                let tag_lit = self.str_lit(&el.tag, el.span);
                let items: Vec<Expr> = el.children.iter().map(|c| self.lower_child_as_literal(c)).collect();
                let children = self.list_lit(items, el.span);
                let h = self.name("h", el.span);
                self.call(
                    h,
                    vec![
                        Argument::Positional(tag_lit),
                        Argument::Positional(attrs),
                        Argument::Positional(children),
                    ],
                    el.span,
                )
            }
        }
    }

    fn build_attrs(&mut self, attributes: &[HtmlAttribute], span: Span) -> Expr {
        let entries = attributes
            .iter()
            .map(|attr| match attr {
                HtmlAttribute::Named { name, value } => {
                    let key = self.str_lit(name, span);
                    let value_expr = match value {
                        HtmlAttributeValue::Literal(e) => self.transform_pure(e),
                        HtmlAttributeValue::Interpolation(e) => self.transform_pure(e),
                        HtmlAttributeValue::Empty => self.bool_lit(true, span),
                    };
                    DictEntry {
                        key: Some(key),
                        value: value_expr,
                    }
                }
                HtmlAttribute::Spread(e) => DictEntry {
                    key: None,
                    value: self.transform_pure(e),
                },
            })
            .collect();
        self.dict_lit(entries, span)
    }

    /// Rewrites an expression with no statement-hoisting available.
    /// Any nested HTML here is lowered to an expression-literal form
    /// (`h(tag, attrs, [children...])` built inline) rather than the
    /// append-statement form — HTML nested this deep (e.g. inside a
    /// binary operator) is not expected from the grammar's primary
    /// entry points, so this path exists only as a defensive fallback.
    fn transform_pure(&mut self, expr: &Expr) -> Expr {
        match expr {
            Expr::HtmlElement(el) => self.lower_child_as_literal(&HtmlChild::Element(el.clone())),
            Expr::HtmlContent(c) => {
                let items: Vec<Expr> = c.children.iter().map(|ch| self.lower_child_as_literal(ch)).collect();
                self.list_lit(items, c.span)
            }
            Expr::Binary(b) => Expr::Binary(BinaryExpr {
                left: Box::new(self.transform_pure(&b.left)),
                right: Box::new(self.transform_pure(&b.right)),
                ..b.clone()
            }),
            Expr::Unary(u) => Expr::Unary(UnaryExpr {
                operand: Box::new(self.transform_pure(&u.operand)),
                ..u.clone()
            }),
            Expr::Call(c) => Expr::Call(CallExpr {
                func: Box::new(self.transform_pure(&c.func)),
                args: c.args.iter().map(|a| self.transform_arg(a)).collect(),
                ..c.clone()
            }),
            Expr::List(l) => Expr::List(ListExpr {
                elements: l.elements.iter().map(|e| self.transform_pure(e)).collect(),
                ..l.clone()
            }),
            Expr::Tuple(t) => Expr::Tuple(TupleExpr {
                elements: t.elements.iter().map(|e| self.transform_pure(e)).collect(),
                ..t.clone()
            }),
            Expr::Attribute(a) => Expr::Attribute(AttributeExpr {
                value: Box::new(self.transform_pure(&a.value)),
                ..a.clone()
            }),
            other => other.clone(),
        }
    }

    fn transform_arg(&mut self, arg: &Argument) -> Argument {
        match arg {
            Argument::Positional(e) => Argument::Positional(self.transform_pure(e)),
            Argument::Star(e) => Argument::Star(self.transform_pure(e)),
            Argument::DoubleStar(e) => Argument::DoubleStar(self.transform_pure(e)),
            Argument::Keyword { name, value } => Argument::Keyword {
                name: name.clone(),
                value: self.transform_pure(value),
            },
        }
    }
}

fn is_html(expr: &Expr) -> bool {
    matches!(expr, Expr::HtmlElement(_) | Expr::HtmlContent(_))
}

/// Leading/trailing whitespace-only runs are trimmed at a structural
/// boundary (view top level or element open/close); interior
/// whitespace between children is preserved verbatim (§4.6).
fn trim_at_boundary(text: &str, at_start: bool, at_end: bool) -> String {
    let mut s = text;
    if at_start {
        s = s.trim_start();
    }
    if at_end {
        s = s.trim_end();
    }
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer, parser, resolver};

    fn transform_source(src: &str) -> Module {
        let tokens = lexer::scan(src).tokens;
        let (module, errors) = parser::parse(&tokens);
        assert!(errors.is_empty(), "parse errors: {errors:?}");
        let table = resolver::resolve(&module);
        assert!(!table.has_errors(), "resolve errors: {:?}", table.errors());
        transform(&module, &table).expect("transform should succeed")
    }

    #[test]
    fn view_becomes_a_class_inheriting_base_view() {
        let module = transform_source("view Greeting(name):\n    <p>{name}</p>\n");
        let Stmt::Class(class) = &module.body[0] else {
            panic!("expected a class, got {:?}", module.body[0]);
        };
        assert_eq!(class.name, "Greeting");
        assert_eq!(class.bases.len(), 1);
        assert!(matches!(&class.bases[0], Expr::Name(n) if n.value == "BaseView"));
        assert_eq!(class.body.len(), 2);
        assert!(matches!(&class.body[0], Stmt::Function(f) if f.name == "__init__"));
        assert!(matches!(&class.body[1], Stmt::Function(f) if f.name == "_render"));
    }

    #[test]
    fn init_stores_each_parameter_on_self() {
        let module = transform_source("view Greeting(name, excited):\n    <p>{name}</p>\n");
        let Stmt::Class(class) = &module.body[0] else { unreachable!() };
        let Stmt::Function(init) = &class.body[0] else { unreachable!() };
        assert_eq!(init.params.positional_or_keyword.len(), 3); // self, name, excited
        assert_eq!(init.body.len(), 2);
    }

    #[test]
    fn render_builds_and_returns_a_children_list() {
        let module = transform_source("view Greeting(name):\n    <p>{name}</p>\n");
        let Stmt::Class(class) = &module.body[0] else { unreachable!() };
        let Stmt::Function(render) = &class.body[1] else { unreachable!() };
        assert!(matches!(render.body.last(), Some(Stmt::Return(_))));
    }

    #[test]
    fn transform_is_idempotent_on_already_desugared_output() {
        let first = transform_source("view Greeting(name):\n    <p>{name}</p>\n");
        let table = resolver::resolve(&first);
        let second = transform(&first, &table).expect("re-transform should succeed");
        assert_eq!(format!("{:?}", first.body), format!("{:?}", second.body));
    }

    #[test]
    fn transform_is_skipped_when_resolution_has_errors() {
        let tokens = lexer::scan("print(undefined_name)\n").tokens;
        let (module, errors) = parser::parse(&tokens);
        assert!(errors.is_empty());
        let table = resolver::resolve(&module);
        assert!(table.has_errors());
        assert!(matches!(transform(&module, &table), Err(TransformError::ResolutionHadErrors)));
    }
}
