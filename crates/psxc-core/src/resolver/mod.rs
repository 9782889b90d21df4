// Copyright (c) psxc contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Assigns every `Name` occurrence to a binding and builds the scope
//! tree a module's names live in (§4.3).
//!
//! Resolution runs two passes per scope: a declaration scan records
//! every name the scope binds (assignments, `def`/`class`/`view`
//! heads, imports, `global`/`nonlocal`, parameters, comprehension
//! targets, `with`/`except` `as`-targets, pattern captures), then a
//! body walk binds every `Name` use to the nearest enclosing
//! declaration. Lookup climbs local → enclosing function scopes
//! (class scopes are skipped, but not for the class body's own
//! lookups) → module → builtins.

pub mod errors;

use std::collections::HashMap;

pub use errors::ResolveError;

use crate::ast::*;
use crate::span::{NodeId, Span, Spanned};

/// Names resolvable without any binding: the Python builtins a
/// generated module can assume plus the runtime prelude PSX emits
/// `view`/HTML calls against (§6: "names known from the generated
/// runtime prelude").
const BUILTINS: &[&str] = &[
    "print", "len", "range", "enumerate", "zip", "map", "filter", "sorted", "reversed", "sum",
    "min", "max", "abs", "all", "any", "isinstance", "issubclass", "super", "type", "object",
    "str", "int", "float", "bool", "list", "dict", "set", "tuple", "frozenset", "bytes",
    "bytearray", "repr", "format", "hash", "id", "iter", "next", "open", "input", "callable",
    "getattr", "setattr", "hasattr", "delattr", "vars", "dir", "globals", "locals",
    "staticmethod", "classmethod", "property", "Exception", "BaseException", "ValueError",
    "TypeError", "KeyError", "IndexError", "AttributeError", "StopIteration", "StopAsyncIteration",
    "RuntimeError", "NotImplementedError", "ZeroDivisionError", "OSError", "FileNotFoundError",
    "ImportError", "ModuleNotFoundError", "NotImplemented", "__name__", "__file__",
    // PSX runtime prelude (§4.6): the view base class and element constructor
    // every desugared module imports implicitly.
    "h", "BaseView",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Module,
    Class,
    Function,
    /// A `view Name(params): body` — resolves like a function scope,
    /// kept distinct so `.res` output and the transformer can tell them
    /// apart without a second lookup.
    View,
    Lambda,
    Comprehension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Parameter,
    Local,
    FreeCaptured,
    GlobalDeclared,
    NonlocalDeclared,
    Imported,
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    pub span: Span,
    pub node_id: NodeId,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub id: usize,
    pub kind: ScopeKind,
    pub name: Option<String>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub span: Span,
    pub bindings: HashMap<String, Binding>,
    pub globals: Vec<String>,
    pub nonlocals: Vec<String>,
}

impl Scope {
    pub fn variables(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }
}

/// Where a single `Name` use resolved to. `scope` is `None` for a
/// builtin/prelude name (no scope owns it).
#[derive(Debug, Clone, Copy)]
pub struct ResolvedUse {
    pub scope: Option<usize>,
    pub kind: Option<BindingKind>,
}

#[derive(Debug, Default)]
pub struct ResolutionTable {
    scopes: Vec<Scope>,
    resolved: HashMap<NodeId, ResolvedUse>,
    declared_views: Vec<String>,
    errors: Vec<ResolveError>,
}

impl ResolutionTable {
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn scope(&self, idx: usize) -> &Scope {
        &self.scopes[idx]
    }

    pub fn module_scope(&self) -> &Scope {
        &self.scopes[0]
    }

    pub fn resolution_for(&self, node_id: NodeId) -> Option<&ResolvedUse> {
        self.resolved.get(&node_id)
    }

    pub fn declared_views(&self) -> &[String] {
        &self.declared_views
    }

    pub fn errors(&self) -> &[ResolveError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Resolves one module's scope tree and name bindings.
pub fn resolve(module: &Module) -> ResolutionTable {
    let mut r = Resolver::default();
    let module_scope = r.new_scope(ScopeKind::Module, None, module.span);
    r.scope_stack.push(module_scope);
    r.declare_block(&module.body);
    r.resolve_block(&module.body);
    r.scope_stack.pop();
    r.table
}

#[derive(Default)]
struct Resolver {
    table: ResolutionTable,
    scope_stack: Vec<usize>,
}

impl Resolver {
    fn new_scope(&mut self, kind: ScopeKind, name: Option<String>, span: Span) -> usize {
        let parent = self.scope_stack.last().copied();
        let idx = self.table.scopes.len();
        self.table.scopes.push(Scope {
            id: idx,
            kind,
            name,
            parent,
            children: Vec::new(),
            span,
            bindings: HashMap::new(),
            globals: Vec::new(),
            nonlocals: Vec::new(),
        });
        if let Some(p) = parent {
            self.table.scopes[p].children.push(idx);
        }
        idx
    }

    fn cur(&self) -> usize {
        *self.scope_stack.last().expect("scope stack never empty during resolve")
    }

    fn push_error(&mut self, err: ResolveError) {
        self.table.errors.push(err);
    }

    fn insert_binding(&mut self, name: &str, kind: BindingKind, span: Span, node_id: NodeId) {
        let idx = self.cur();
        self.table.scopes[idx].bindings.insert(
            name.to_string(),
            Binding {
                name: name.to_string(),
                kind,
                span,
                node_id,
            },
        );
    }

    fn record_use(&mut self, node_id: NodeId, resolution: ResolvedUse) {
        self.table.resolved.insert(node_id, resolution);
    }

    // ------------------------------------------------------------
    // Pass 1: declarations
    // ------------------------------------------------------------

    fn declare_block(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.declare_one(stmt);
        }
    }

    fn declare_one(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assign(a) => {
                for target in &a.targets {
                    self.declare_target(target, BindingKind::Local);
                }
            }
            Stmt::AnnotatedAssign(a) => self.declare_target(&a.target, BindingKind::Local),
            Stmt::Global(g) => self.declare_global(g),
            Stmt::Nonlocal(n) => self.declare_nonlocal(n),
            Stmt::Import(i) => {
                for alias in &i.names {
                    let bound = alias
                        .alias
                        .clone()
                        .unwrap_or_else(|| alias.name.split('.').next().unwrap().to_string());
                    self.insert_binding(&bound, BindingKind::Imported, alias.span, NodeId::new(0));
                }
            }
            Stmt::ImportFrom(i) => {
                if i.wildcard && self.table.scopes[self.cur()].kind != ScopeKind::Module {
                    self.push_error(ResolveError::WildcardOutsideModule { span: i.span });
                }
                for alias in &i.names {
                    let bound = alias.alias.clone().unwrap_or_else(|| alias.name.clone());
                    self.insert_binding(&bound, BindingKind::Imported, alias.span, NodeId::new(0));
                }
            }
            Stmt::If(s) => {
                self.declare_block(&s.body);
                self.declare_block(&s.orelse);
            }
            Stmt::While(s) => {
                self.declare_block(&s.body);
                self.declare_block(&s.orelse);
            }
            Stmt::For(s) => {
                self.declare_target(&s.target, BindingKind::Local);
                self.declare_block(&s.body);
                self.declare_block(&s.orelse);
            }
            Stmt::With(s) => {
                for item in &s.items {
                    if let Some(t) = &item.target {
                        self.declare_target(t, BindingKind::Local);
                    }
                }
                self.declare_block(&s.body);
            }
            Stmt::Try(s) => {
                self.declare_block(&s.body);
                for handler in &s.handlers {
                    if let Some(name) = &handler.target {
                        self.insert_binding(name, BindingKind::Local, handler.span, NodeId::new(0));
                    }
                    self.declare_block(&handler.body);
                }
                self.declare_block(&s.orelse);
                self.declare_block(&s.finally);
            }
            Stmt::Function(f) => {
                self.insert_binding(&f.name, BindingKind::Local, f.span, f.id);
            }
            Stmt::Class(c) => {
                self.insert_binding(&c.name, BindingKind::Local, c.span, c.id);
            }
            Stmt::TypeAlias(t) => {
                self.insert_binding(&t.name, BindingKind::Local, t.span, t.id);
            }
            Stmt::View(v) => {
                self.insert_binding(&v.name, BindingKind::Local, v.span, v.id);
                self.table.declared_views.push(v.name.clone());
            }
            Stmt::Match(m) => {
                for case in &m.cases {
                    self.declare_pattern(&case.pattern);
                    self.declare_block(&case.body);
                }
            }
            Stmt::Decorated(d) => self.declare_one(&d.target),
            Stmt::Multi(m) => self.declare_block(&m.statements),
            Stmt::Expr(_)
            | Stmt::Return(_)
            | Stmt::Raise(_)
            | Stmt::Pass(_)
            | Stmt::Break(_)
            | Stmt::Continue(_)
            | Stmt::YieldStmt(_)
            | Stmt::Assert(_) => {}
        }
    }

    fn declare_global(&mut self, g: &GlobalStmt) {
        let idx = self.cur();
        for name in &g.names {
            if let Some(existing) = self.table.scopes[idx].bindings.get(name) {
                if existing.kind == BindingKind::Local {
                    self.push_error(ResolveError::IllegalGlobal {
                        name: name.clone(),
                        span: g.span,
                    });
                }
            }
            self.table.scopes[idx].globals.push(name.clone());
            self.insert_binding(name, BindingKind::GlobalDeclared, g.span, NodeId::new(0));
        }
    }

    fn declare_nonlocal(&mut self, n: &NonlocalStmt) {
        let idx = self.cur();
        for name in &n.names {
            let mut found = false;
            let mut walk = self.table.scopes[idx].parent;
            while let Some(i) = walk {
                let scope = &self.table.scopes[i];
                if scope.kind != ScopeKind::Module
                    && scope.kind != ScopeKind::Class
                    && scope.bindings.contains_key(name)
                {
                    found = true;
                    break;
                }
                walk = scope.parent;
            }
            if !found {
                self.push_error(ResolveError::IllegalNonlocal {
                    name: name.clone(),
                    span: n.span,
                });
            }
            self.table.scopes[idx].nonlocals.push(name.clone());
            self.insert_binding(name, BindingKind::NonlocalDeclared, n.span, NodeId::new(0));
        }
    }

    fn declare_target(&mut self, expr: &Expr, kind: BindingKind) {
        match expr {
            Expr::Name(n) => self.insert_binding(&n.value, kind, n.span, n.id),
            Expr::Tuple(t) => {
                for el in &t.elements {
                    self.declare_target(el, kind);
                }
            }
            Expr::List(l) => {
                for el in &l.elements {
                    self.declare_target(el, kind);
                }
            }
            Expr::Star(s) => self.declare_target(&s.value, kind),
            Expr::Group(g) => self.declare_target(&g.inner, kind),
            // Attribute/Subscript targets write into an existing object;
            // they introduce no new local binding (their sub-expressions
            // are resolved as ordinary uses in the body walk).
            Expr::Attribute(_) | Expr::Subscript(_) => {}
            _ => {}
        }
    }

    fn declare_pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Capture(c) => self.insert_binding(&c.name, BindingKind::Local, c.span, c.id),
            Pattern::Wildcard(_) | Pattern::Literal(_) | Pattern::Value(_) => {}
            Pattern::Group(g) => self.declare_pattern(&g.inner),
            Pattern::Sequence(s) => {
                for el in &s.elements {
                    self.declare_pattern(el);
                }
            }
            Pattern::Star(s) => {
                if let Some(name) = &s.name {
                    self.insert_binding(name, BindingKind::Local, s.span, s.id);
                }
            }
            Pattern::Mapping(m) => {
                for entry in &m.entries {
                    self.declare_pattern(&entry.value);
                }
                if let Some(rest) = &m.rest {
                    self.insert_binding(rest, BindingKind::Local, m.span, m.id);
                }
            }
            Pattern::Class(c) => {
                for p in &c.positional {
                    self.declare_pattern(p);
                }
                for kw in &c.keyword {
                    self.declare_pattern(&kw.pattern);
                }
            }
            Pattern::As(a) => {
                self.declare_pattern(&a.pattern);
                self.insert_binding(&a.name, BindingKind::Local, a.span, a.id);
            }
            Pattern::Or(o) => {
                for alt in &o.alternatives {
                    self.declare_pattern(alt);
                }
            }
        }
    }

    // ------------------------------------------------------------
    // Pass 2: the body walk
    // ------------------------------------------------------------

    fn resolve_block(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.resolve_one(stmt);
        }
    }

    fn resolve_one(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(e) => self.resolve_expr(&e.value),
            Stmt::Assign(a) => {
                self.resolve_expr(&a.value);
                for target in &a.targets {
                    self.resolve_expr(target);
                }
            }
            Stmt::AnnotatedAssign(a) => {
                self.resolve_expr(&a.annotation);
                if let Some(v) = &a.value {
                    self.resolve_expr(v);
                }
                self.resolve_expr(&a.target);
            }
            Stmt::Return(r) => {
                if let Some(v) = &r.value {
                    self.resolve_expr(v);
                }
            }
            Stmt::Raise(r) => {
                if let Some(e) = &r.exception {
                    self.resolve_expr(e);
                }
                if let Some(e) = &r.from {
                    self.resolve_expr(e);
                }
            }
            Stmt::YieldStmt(y) => self.resolve_expr(&y.value),
            Stmt::Assert(a) => {
                self.resolve_expr(&a.test);
                if let Some(m) = &a.message {
                    self.resolve_expr(m);
                }
            }
            Stmt::If(s) => {
                self.resolve_expr(&s.test);
                self.resolve_block(&s.body);
                self.resolve_block(&s.orelse);
            }
            Stmt::While(s) => {
                self.resolve_expr(&s.test);
                self.resolve_block(&s.body);
                self.resolve_block(&s.orelse);
            }
            Stmt::For(s) => {
                self.resolve_expr(&s.iter);
                self.resolve_expr(&s.target);
                self.resolve_block(&s.body);
                self.resolve_block(&s.orelse);
            }
            Stmt::With(s) => {
                for item in &s.items {
                    self.resolve_expr(&item.context);
                    if let Some(t) = &item.target {
                        self.resolve_expr(t);
                    }
                }
                self.resolve_block(&s.body);
            }
            Stmt::Try(s) => {
                self.resolve_block(&s.body);
                for handler in &s.handlers {
                    if let Some(e) = &handler.exception_type {
                        self.resolve_expr(e);
                    }
                    self.resolve_block(&handler.body);
                }
                self.resolve_block(&s.orelse);
                self.resolve_block(&s.finally);
            }
            Stmt::Function(f) => self.resolve_function(f),
            Stmt::Class(c) => self.resolve_class(c),
            Stmt::View(v) => self.resolve_view(v),
            Stmt::TypeAlias(t) => self.resolve_expr(&t.value),
            Stmt::Match(m) => {
                self.resolve_expr(&m.subject);
                for case in &m.cases {
                    self.resolve_pattern_values(&case.pattern);
                    if let Some(g) = &case.guard {
                        self.resolve_expr(g);
                    }
                    self.resolve_block(&case.body);
                }
            }
            Stmt::Decorated(d) => {
                for dec in &d.decorators {
                    self.resolve_expr(dec);
                }
                self.resolve_one(&d.target);
            }
            Stmt::Multi(m) => {
                for s in &m.statements {
                    self.resolve_one(s);
                }
            }
            Stmt::Global(_)
            | Stmt::Nonlocal(_)
            | Stmt::Import(_)
            | Stmt::ImportFrom(_)
            | Stmt::Pass(_)
            | Stmt::Break(_)
            | Stmt::Continue(_) => {}
        }
    }

    fn resolve_params(&mut self, params: &ParamList) {
        // Defaults and annotations evaluate in the *enclosing* scope
        // (the scope the `def`/`lambda`/`view` sits in), before the new
        // scope is pushed.
        for p in params.iter_all() {
            if let Some(default) = &p.default {
                self.resolve_expr(default);
            }
            if let Some(annotation) = &p.annotation {
                self.resolve_expr(annotation);
            }
        }
    }

    fn declare_params(&mut self, params: &ParamList) {
        let mut seen = std::collections::HashSet::new();
        for p in params.iter_all() {
            if !seen.insert(p.name.clone()) {
                self.push_error(ResolveError::DuplicateParameter {
                    name: p.name.clone(),
                    span: p.span,
                });
            }
            self.insert_binding(&p.name, BindingKind::Parameter, p.span, NodeId::new(0));
        }
    }

    fn resolve_function(&mut self, f: &FunctionStmt) {
        self.resolve_params(&f.params);
        if let Some(rt) = &f.return_type {
            self.resolve_expr(rt);
        }
        let scope = self.new_scope(ScopeKind::Function, Some(f.name.clone()), f.span);
        self.scope_stack.push(scope);
        self.declare_params(&f.params);
        self.declare_block(&f.body);
        self.resolve_block(&f.body);
        self.scope_stack.pop();
    }

    fn resolve_view(&mut self, v: &ViewStmt) {
        self.resolve_params(&v.params);
        let scope = self.new_scope(ScopeKind::View, Some(v.name.clone()), v.span);
        self.scope_stack.push(scope);
        self.declare_params(&v.params);
        self.declare_block(&v.body);
        self.resolve_block(&v.body);
        self.scope_stack.pop();
    }

    fn resolve_class(&mut self, c: &ClassStmt) {
        for base in &c.bases {
            self.resolve_expr(base);
        }
        for (_, value) in &c.keywords {
            self.resolve_expr(value);
        }
        let scope = self.new_scope(ScopeKind::Class, Some(c.name.clone()), c.span);
        self.scope_stack.push(scope);
        self.declare_block(&c.body);
        self.resolve_block(&c.body);
        self.scope_stack.pop();
    }

    fn resolve_pattern_values(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Value(v) => self.resolve_expr(&v.path),
            Pattern::Group(g) => self.resolve_pattern_values(&g.inner),
            Pattern::Sequence(s) => {
                for el in &s.elements {
                    self.resolve_pattern_values(el);
                }
            }
            Pattern::Mapping(m) => {
                for entry in &m.entries {
                    self.resolve_expr(&entry.key);
                    self.resolve_pattern_values(&entry.value);
                }
            }
            Pattern::Class(c) => {
                self.resolve_expr(&c.path);
                for p in &c.positional {
                    self.resolve_pattern_values(p);
                }
                for kw in &c.keyword {
                    self.resolve_pattern_values(&kw.pattern);
                }
            }
            Pattern::As(a) => self.resolve_pattern_values(&a.pattern),
            Pattern::Or(o) => {
                for alt in &o.alternatives {
                    self.resolve_pattern_values(alt);
                }
            }
            Pattern::Capture(_) | Pattern::Wildcard(_) | Pattern::Literal(_) | Pattern::Star(_) => {}
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Name(n) => self.resolve_name_use(&n.value, n.span, n.id),
            Expr::Literal(_) => {}
            Expr::FString(f) => {
                for part in &f.parts {
                    if let FStringPart::Field(field) = part {
                        self.resolve_expr(&field.value);
                    }
                }
            }
            Expr::Attribute(a) => self.resolve_expr(&a.value),
            Expr::Call(c) => {
                self.resolve_expr(&c.func);
                for arg in &c.args {
                    match arg {
                        Argument::Positional(e) | Argument::Star(e) | Argument::DoubleStar(e) => {
                            self.resolve_expr(e)
                        }
                        Argument::Keyword { value, .. } => self.resolve_expr(value),
                    }
                }
            }
            Expr::Subscript(s) => {
                self.resolve_expr(&s.value);
                self.resolve_expr(&s.index);
            }
            Expr::Slice(s) => {
                if let Some(e) = &s.lower {
                    self.resolve_expr(e);
                }
                if let Some(e) = &s.upper {
                    self.resolve_expr(e);
                }
                if let Some(e) = &s.step {
                    self.resolve_expr(e);
                }
            }
            Expr::Binary(b) => {
                self.resolve_expr(&b.left);
                self.resolve_expr(&b.right);
            }
            Expr::Unary(u) => self.resolve_expr(&u.operand),
            Expr::Ternary(t) => {
                self.resolve_expr(&t.test);
                self.resolve_expr(&t.body);
                self.resolve_expr(&t.orelse);
            }
            Expr::NamedExpr(n) => {
                self.resolve_expr(&n.value);
                // Walrus targets are declared at the point the walk
                // encounters them rather than in a separate declare
                // pass: a reference to the target before this point
                // could not observe a value anyway.
                let idx = self.cur();
                if !self.table.scopes[idx].bindings.contains_key(&n.target.value) {
                    self.insert_binding(&n.target.value, BindingKind::Local, n.target.span, n.target.id);
                }
                self.resolve_name_use(&n.target.value, n.target.span, n.target.id);
            }
            Expr::Star(s) => self.resolve_expr(&s.value),
            Expr::List(l) => {
                for el in &l.elements {
                    self.resolve_expr(el);
                }
            }
            Expr::Tuple(t) => {
                for el in &t.elements {
                    self.resolve_expr(el);
                }
            }
            Expr::Set(s) => {
                for el in &s.elements {
                    self.resolve_expr(el);
                }
            }
            Expr::Dict(d) => {
                for entry in &d.entries {
                    if let Some(k) = &entry.key {
                        self.resolve_expr(k);
                    }
                    self.resolve_expr(&entry.value);
                }
            }
            Expr::ListComp(c) | Expr::SetComp(c) | Expr::GeneratorExp(c) => {
                self.resolve_comprehension_clauses(&c.clauses, c.span);
                self.resolve_expr(&c.element);
                self.scope_stack.pop();
            }
            Expr::DictComp(d) => {
                self.resolve_comprehension_clauses(&d.clauses, d.span);
                self.resolve_expr(&d.key);
                self.resolve_expr(&d.value);
                self.scope_stack.pop();
            }
            Expr::Lambda(l) => {
                self.resolve_params(&l.params);
                let scope = self.new_scope(ScopeKind::Lambda, None, l.span);
                self.scope_stack.push(scope);
                self.declare_params(&l.params);
                self.resolve_expr(&l.body);
                self.scope_stack.pop();
            }
            Expr::Await(a) => self.resolve_expr(&a.value),
            Expr::Yield(y) => match &y.kind {
                YieldKind::Value(Some(e)) => self.resolve_expr(e),
                YieldKind::Value(None) => {}
                YieldKind::From(e) => self.resolve_expr(e),
            },
            Expr::Group(g) => self.resolve_expr(&g.inner),
            Expr::TypeParam(_) => {}
            Expr::HtmlElement(h) => self.resolve_html_element(h),
            Expr::HtmlContent(c) => {
                for child in &c.children {
                    self.resolve_html_child(child);
                }
            }
            Expr::HtmlText(_) => {}
            Expr::HtmlInterpolation(i) => self.resolve_expr(&i.value),
        }
    }

    /// Pushes the comprehension's scope and declares its targets, per
    /// §4.3: the first clause's iterable evaluates in the *enclosing*
    /// scope; everything else (subsequent iterables, `if` guards, the
    /// element/key/value) evaluates inside the comprehension scope,
    /// which the caller pops after resolving those.
    fn resolve_comprehension_clauses(&mut self, clauses: &[ComprehensionClause], span: Span) {
        let Some((first, rest)) = clauses.split_first() else {
            self.scope_stack.push(self.new_scope(ScopeKind::Comprehension, None, span));
            return;
        };
        self.resolve_expr(&first.iter);
        let scope = self.new_scope(ScopeKind::Comprehension, None, span);
        self.scope_stack.push(scope);
        self.declare_target(&first.target, BindingKind::Local);
        for cond in &first.ifs {
            self.resolve_expr(cond);
        }
        for clause in rest {
            self.resolve_expr(&clause.iter);
            self.declare_target(&clause.target, BindingKind::Local);
            for cond in &clause.ifs {
                self.resolve_expr(cond);
            }
        }
    }

    fn resolve_html_element(&mut self, h: &HtmlElementExpr) {
        for attr in &h.attributes {
            match attr {
                HtmlAttribute::Named { value, .. } => match value {
                    HtmlAttributeValue::Literal(e) | HtmlAttributeValue::Interpolation(e) => {
                        self.resolve_expr(e)
                    }
                    HtmlAttributeValue::Empty => {}
                },
                HtmlAttribute::Spread(e) => self.resolve_expr(e),
            }
        }
        for child in &h.children {
            self.resolve_html_child(child);
        }
    }

    fn resolve_html_child(&mut self, child: &HtmlChild) {
        match child {
            HtmlChild::Element(e) => self.resolve_html_element(e),
            HtmlChild::Text(_) => {}
            HtmlChild::Interpolation(i) => self.resolve_expr(&i.value),
        }
    }

    fn resolve_name_use(&mut self, name: &str, span: Span, node_id: NodeId) {
        let cur = self.cur();

        if let Some(b) = self.table.scopes[cur].bindings.get(name).cloned() {
            match b.kind {
                BindingKind::GlobalDeclared => {
                    let resolution = self.lookup_from(0, name);
                    self.record_use(node_id, resolution);
                    return;
                }
                BindingKind::NonlocalDeclared => {
                    let resolution = self
                        .lookup_enclosing_function(cur, name)
                        .unwrap_or(ResolvedUse { scope: None, kind: None });
                    self.record_use(node_id, resolution);
                    return;
                }
                BindingKind::Local if b.span.start.byte_offset > span.start.byte_offset => {
                    self.push_error(ResolveError::UseBeforeDefinition {
                        name: name.to_string(),
                        span,
                    });
                    self.record_use(
                        node_id,
                        ResolvedUse {
                            scope: Some(cur),
                            kind: Some(b.kind),
                        },
                    );
                    return;
                }
                _ => {
                    self.record_use(
                        node_id,
                        ResolvedUse {
                            scope: Some(cur),
                            kind: Some(b.kind),
                        },
                    );
                    return;
                }
            }
        }

        let resolution = self.lookup_from(cur, name);
        if resolution.scope.is_none() && resolution.kind.is_none() && !BUILTINS.contains(&name) {
            self.push_error(ResolveError::UnresolvedName {
                name: name.to_string(),
                span,
            });
        }
        self.record_use(node_id, resolution);
    }

    /// Climbs from `start`'s parent upward, skipping `Class` scopes,
    /// falling back to the builtin/prelude set.
    fn lookup_from(&self, start: usize, name: &str) -> ResolvedUse {
        let mut walk = self.table.scopes[start].parent;
        while let Some(i) = walk {
            let scope = &self.table.scopes[i];
            if scope.kind != ScopeKind::Class {
                if let Some(b) = scope.bindings.get(name) {
                    return ResolvedUse {
                        scope: Some(i),
                        kind: Some(b.kind),
                    };
                }
            }
            walk = scope.parent;
        }
        ResolvedUse { scope: None, kind: None }
    }

    fn lookup_enclosing_function(&self, start: usize, name: &str) -> Option<ResolvedUse> {
        let mut walk = self.table.scopes[start].parent;
        while let Some(i) = walk {
            let scope = &self.table.scopes[i];
            if scope.kind != ScopeKind::Module && scope.kind != ScopeKind::Class {
                if let Some(b) = scope.bindings.get(name) {
                    return Some(ResolvedUse {
                        scope: Some(i),
                        kind: Some(b.kind),
                    });
                }
            }
            walk = scope.parent;
        }
        None
    }
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind
    }
}
impl PartialEq for BindingKind {
    fn eq(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}
impl Eq for BindingKind {}
impl Clone for BindingKind {
    fn clone(&self) -> Self {
        *self
    }
}
impl Copy for BindingKind {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer, parser};

    fn resolve_source(src: &str) -> (Module, ResolutionTable) {
        let tokens = lexer::scan(src).tokens;
        let (module, errors) = parser::parse(&tokens);
        assert!(errors.is_empty(), "unexpected parse errors: {errors:?}");
        let table = resolve(&module);
        (module, table)
    }

    #[test]
    fn resolves_simple_function_params_and_locals() {
        let (_module, table) = resolve_source("def greet(name):\n    msg = name\n    return msg\n");
        assert_eq!(table.scopes().len(), 2);
        assert_eq!(table.scope(1).kind, ScopeKind::Function);
        assert_eq!(table.scope(1).name.as_deref(), Some("greet"));
        assert!(matches!(
            table.scope(1).bindings.get("name").unwrap().kind,
            BindingKind::Parameter
        ));
        assert!(matches!(
            table.scope(1).bindings.get("msg").unwrap().kind,
            BindingKind::Local
        ));
    }

    #[test]
    fn free_variable_resolves_to_enclosing_function_scope() {
        let (_module, table) =
            resolve_source("def outer():\n    x = 1\n    def inner():\n        return x\n");
        assert!(!table.has_errors(), "{:?}", table.errors());
        // inner's `return x` should resolve to outer's scope (index 1).
        let inner_scope = table
            .scopes()
            .iter()
            .find(|s| s.name.as_deref() == Some("inner"))
            .unwrap();
        assert!(!inner_scope.bindings.contains_key("x"));
    }

    #[test]
    fn nonlocal_without_enclosing_binder_is_illegal() {
        let (_module, table) = resolve_source("def f():\n    def g():\n        nonlocal y\n        y = 1\n");
        assert!(table
            .errors()
            .iter()
            .any(|e| matches!(e, ResolveError::IllegalNonlocal { name, .. } if name == "y")));
    }

    #[test]
    fn unresolved_name_is_reported() {
        let (_module, table) = resolve_source("print(undefined_name)\n");
        assert!(table
            .errors()
            .iter()
            .any(|e| matches!(e, ResolveError::UnresolvedName { name, .. } if name == "undefined_name")));
    }

    #[test]
    fn duplicate_parameter_name_is_reported() {
        let (_module, table) = resolve_source("def f(a, a):\n    pass\n");
        assert!(table
            .errors()
            .iter()
            .any(|e| matches!(e, ResolveError::DuplicateParameter { name, .. } if name == "a")));
    }

    #[test]
    fn wildcard_import_inside_function_is_illegal() {
        let (_module, table) = resolve_source("def f():\n    from os import *\n");
        assert!(table
            .errors()
            .iter()
            .any(|e| matches!(e, ResolveError::WildcardOutsideModule { .. })));
    }

    #[test]
    fn class_scope_is_skipped_for_enclosing_lookup() {
        let src = "class Foo:\n    x = 1\n    def method(self):\n        return x\n";
        let (_module, table) = resolve_source(src);
        assert!(table
            .errors()
            .iter()
            .any(|e| matches!(e, ResolveError::UnresolvedName { name, .. } if name == "x")));
    }

    #[test]
    fn view_declaration_is_tracked_and_opens_view_scope() {
        let (_module, table) = resolve_source("view Greeting(name):\n    <p>{name}</p>\n");
        assert_eq!(table.declared_views(), &["Greeting".to_string()]);
        assert!(table.scopes().iter().any(|s| s.kind == ScopeKind::View));
    }

    #[test]
    fn list_comprehension_target_does_not_leak_to_module_scope() {
        let (_module, table) = resolve_source("xs = [i for i in range(10)]\n");
        assert!(!table.module_scope().bindings.contains_key("i"));
        assert!(!table.has_errors());
    }

    #[test]
    fn global_declared_name_resolves_to_module_scope() {
        let src = "x = 1\ndef f():\n    global x\n    x = 2\n";
        let (_module, table) = resolve_source(src);
        assert!(!table.has_errors(), "{:?}", table.errors());
    }
}
