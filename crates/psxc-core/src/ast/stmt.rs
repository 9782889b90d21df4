// Copyright (c) psxc contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Statement nodes (§3 Data Model).

use psxc_core_derive::Spanned;

use crate::ast::expr::{Expr, ParamList, TypeParamExpr};
use crate::ast::pattern::Pattern;
use crate::span::{NodeId, Span};

#[derive(Debug, Clone, Spanned)]
pub enum Stmt {
    Expr(ExprStmt),
    Assign(AssignStmt),
    AnnotatedAssign(AnnotatedAssignStmt),
    Return(ReturnStmt),
    Raise(RaiseStmt),
    Pass(PassStmt),
    Break(BreakStmt),
    Continue(ContinueStmt),
    YieldStmt(YieldStmtStmt),
    Assert(AssertStmt),
    Global(GlobalStmt),
    Nonlocal(NonlocalStmt),
    Import(ImportStmt),
    ImportFrom(ImportFromStmt),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    With(WithStmt),
    Try(TryStmt),
    Function(FunctionStmt),
    Class(ClassStmt),
    TypeAlias(TypeAliasStmt),
    Match(MatchStmt),
    Decorated(DecoratedStmt),
    Multi(MultiStmt),
    View(ViewStmt),
}

#[derive(Debug, Clone, Spanned)]
pub struct ExprStmt {
    pub span: Span,
    pub id: NodeId,
    pub value: Expr,
}

#[derive(Debug, Clone, Spanned)]
pub struct AssignStmt {
    pub span: Span,
    pub id: NodeId,
    pub targets: Vec<Expr>,
    pub value: Expr,
}

#[derive(Debug, Clone, Spanned)]
pub struct AnnotatedAssignStmt {
    pub span: Span,
    pub id: NodeId,
    pub target: Expr,
    pub annotation: Expr,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, Spanned)]
pub struct ReturnStmt {
    pub span: Span,
    pub id: NodeId,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, Spanned)]
pub struct RaiseStmt {
    pub span: Span,
    pub id: NodeId,
    pub exception: Option<Expr>,
    pub from: Option<Expr>,
}

#[derive(Debug, Clone, Spanned)]
pub struct PassStmt {
    pub span: Span,
    pub id: NodeId,
}

#[derive(Debug, Clone, Spanned)]
pub struct BreakStmt {
    pub span: Span,
    pub id: NodeId,
}

#[derive(Debug, Clone, Spanned)]
pub struct ContinueStmt {
    pub span: Span,
    pub id: NodeId,
}

#[derive(Debug, Clone, Spanned)]
pub struct YieldStmtStmt {
    pub span: Span,
    pub id: NodeId,
    pub value: Expr,
}

#[derive(Debug, Clone, Spanned)]
pub struct AssertStmt {
    pub span: Span,
    pub id: NodeId,
    pub test: Expr,
    pub message: Option<Expr>,
}

#[derive(Debug, Clone, Spanned)]
pub struct GlobalStmt {
    pub span: Span,
    pub id: NodeId,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Spanned)]
pub struct NonlocalStmt {
    pub span: Span,
    pub id: NodeId,
    pub names: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ImportAlias {
    pub name: String,
    pub alias: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, Spanned)]
pub struct ImportStmt {
    pub span: Span,
    pub id: NodeId,
    pub names: Vec<ImportAlias>,
}

#[derive(Debug, Clone, Spanned)]
pub struct ImportFromStmt {
    pub span: Span,
    pub id: NodeId,
    /// Number of leading dots (`.` counts 1, `...` counts 3, §4.2).
    pub dots: u32,
    /// `None` for `from . import x` (package-relative, no module name).
    pub module: Option<String>,
    pub names: Vec<ImportAlias>,
    pub wildcard: bool,
}

#[derive(Debug, Clone, Spanned)]
pub struct IfStmt {
    pub span: Span,
    pub id: NodeId,
    pub test: Expr,
    pub body: Vec<Stmt>,
    pub orelse: Vec<Stmt>,
}

#[derive(Debug, Clone, Spanned)]
pub struct WhileStmt {
    pub span: Span,
    pub id: NodeId,
    pub test: Expr,
    pub body: Vec<Stmt>,
    pub orelse: Vec<Stmt>,
}

#[derive(Debug, Clone, Spanned)]
pub struct ForStmt {
    pub span: Span,
    pub id: NodeId,
    pub is_async: bool,
    pub target: Expr,
    pub iter: Expr,
    pub body: Vec<Stmt>,
    pub orelse: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct WithItem {
    pub context: Expr,
    pub target: Option<Expr>,
}

#[derive(Debug, Clone, Spanned)]
pub struct WithStmt {
    pub span: Span,
    pub id: NodeId,
    pub is_async: bool,
    pub items: Vec<WithItem>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct ExceptHandler {
    pub span: Span,
    /// `None` for a bare `except:`.
    pub exception_type: Option<Expr>,
    pub target: Option<String>,
    pub body: Vec<Stmt>,
    /// `except*` group handler (cannot mix with plain `except`, §4.2).
    pub is_star: bool,
}

#[derive(Debug, Clone, Spanned)]
pub struct TryStmt {
    pub span: Span,
    pub id: NodeId,
    pub body: Vec<Stmt>,
    pub handlers: Vec<ExceptHandler>,
    pub orelse: Vec<Stmt>,
    pub finally: Vec<Stmt>,
}

#[derive(Debug, Clone, Spanned)]
pub struct FunctionStmt {
    pub span: Span,
    pub id: NodeId,
    pub is_async: bool,
    pub name: String,
    pub type_params: Vec<TypeParamExpr>,
    pub params: ParamList,
    pub return_type: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Spanned)]
pub struct ClassStmt {
    pub span: Span,
    pub id: NodeId,
    pub name: String,
    pub type_params: Vec<TypeParamExpr>,
    pub bases: Vec<Expr>,
    pub keywords: Vec<(String, Expr)>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Spanned)]
pub struct TypeAliasStmt {
    pub span: Span,
    pub id: NodeId,
    pub name: String,
    pub type_params: Vec<TypeParamExpr>,
    pub value: Expr,
}

#[derive(Debug, Clone)]
pub struct MatchCase {
    pub span: Span,
    pub pattern: Pattern,
    pub guard: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Spanned)]
pub struct MatchStmt {
    pub span: Span,
    pub id: NodeId,
    pub subject: Expr,
    pub cases: Vec<MatchCase>,
}

/// Wraps a function/class definition together with the decorator
/// expressions that stacked above it, preserving evaluation order
/// (bottom decorator applies first).
#[derive(Debug, Clone, Spanned)]
pub struct DecoratedStmt {
    pub span: Span,
    pub id: NodeId,
    pub decorators: Vec<Expr>,
    pub target: Box<Stmt>,
}

/// Several simple statements joined by `;` on one logical line.
#[derive(Debug, Clone, Spanned)]
pub struct MultiStmt {
    pub span: Span,
    pub id: NodeId,
    pub statements: Vec<Stmt>,
}

/// PSX `view Name(params): body`, parsed like a function but whose body
/// may contain HTML literals (§4.2, §4.6).
#[derive(Debug, Clone, Spanned)]
pub struct ViewStmt {
    pub span: Span,
    pub id: NodeId,
    pub name: String,
    pub type_params: Vec<TypeParamExpr>,
    pub params: ParamList,
    pub body: Vec<Stmt>,
}
