// Copyright (c) psxc contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Expression nodes (§3 Data Model).

use psxc_core_derive::Spanned;

use crate::span::{NodeId, Span};
use crate::token::LiteralValue;

/// Every expression form the parser can produce, including the PSX HTML
/// literal extensions.
#[derive(Debug, Clone, Spanned)]
pub enum Expr {
    Name(NameExpr),
    Literal(LiteralExpr),
    FString(FStringExpr),
    Attribute(AttributeExpr),
    Call(CallExpr),
    Subscript(SubscriptExpr),
    Slice(SliceExpr),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Ternary(TernaryExpr),
    NamedExpr(NamedExprExpr),
    Star(StarExpr),
    List(ListExpr),
    Tuple(TupleExpr),
    Set(SetExpr),
    Dict(DictExpr),
    ListComp(ComprehensionExpr),
    SetComp(ComprehensionExpr),
    DictComp(DictComprehensionExpr),
    GeneratorExp(ComprehensionExpr),
    Lambda(LambdaExpr),
    Await(AwaitExpr),
    Yield(YieldExpr),
    Group(GroupExpr),
    TypeParam(TypeParamExpr),
    HtmlElement(HtmlElementExpr),
    HtmlContent(HtmlContentExpr),
    HtmlText(HtmlTextExpr),
    HtmlInterpolation(HtmlInterpolationExpr),
}

#[derive(Debug, Clone, Spanned)]
pub struct NameExpr {
    pub span: Span,
    pub id: NodeId,
    pub value: String,
}

#[derive(Debug, Clone, Spanned)]
pub struct LiteralExpr {
    pub span: Span,
    pub id: NodeId,
    pub value: LiteralValue,
}

/// A decoded replacement field inside an f-string: the sub-expression,
/// an optional conversion (`!r`, `!s`, `!a`), and an optional format
/// spec, itself a sequence of parts (mirroring the lexer's "format spec
/// is a mini f-string" rule).
#[derive(Debug, Clone)]
pub struct FStringField {
    pub span: Span,
    pub value: Box<Expr>,
    pub conversion: Option<char>,
    pub format_spec: Option<Vec<FStringPart>>,
}

#[derive(Debug, Clone)]
pub enum FStringPart {
    Text(String),
    Field(FStringField),
}

#[derive(Debug, Clone, Spanned)]
pub struct FStringExpr {
    pub span: Span,
    pub id: NodeId,
    pub parts: Vec<FStringPart>,
}

#[derive(Debug, Clone, Spanned)]
pub struct AttributeExpr {
    pub span: Span,
    pub id: NodeId,
    pub value: Box<Expr>,
    /// Not itself a bound `Name` — attribute tails are not lexically
    /// resolved (§3 Resolution table invariant).
    pub attr: String,
}

#[derive(Debug, Clone)]
pub enum Argument {
    Positional(Expr),
    Keyword { name: String, value: Expr },
    Star(Expr),
    DoubleStar(Expr),
}

#[derive(Debug, Clone, Spanned)]
pub struct CallExpr {
    pub span: Span,
    pub id: NodeId,
    pub func: Box<Expr>,
    pub args: Vec<Argument>,
}

#[derive(Debug, Clone, Spanned)]
pub struct SubscriptExpr {
    pub span: Span,
    pub id: NodeId,
    pub value: Box<Expr>,
    pub index: Box<Expr>,
}

#[derive(Debug, Clone, Spanned)]
pub struct SliceExpr {
    pub span: Span,
    pub id: NodeId,
    pub lower: Option<Box<Expr>>,
    pub upper: Option<Box<Expr>>,
    pub step: Option<Box<Expr>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    NotEq,
    Is,
    IsNot,
    In,
    NotIn,
    BitOr,
    BitXor,
    BitAnd,
    LShift,
    RShift,
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    MatMul,
    Pow,
}

#[derive(Debug, Clone, Spanned)]
pub struct BinaryExpr {
    pub span: Span,
    pub id: NodeId,
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Pos,
    Neg,
    Invert,
    Not,
}

#[derive(Debug, Clone, Spanned)]
pub struct UnaryExpr {
    pub span: Span,
    pub id: NodeId,
    pub op: UnaryOp,
    pub operand: Box<Expr>,
}

/// `body if test else orelse`.
#[derive(Debug, Clone, Spanned)]
pub struct TernaryExpr {
    pub span: Span,
    pub id: NodeId,
    pub test: Box<Expr>,
    pub body: Box<Expr>,
    pub orelse: Box<Expr>,
}

/// `name := value` (walrus).
#[derive(Debug, Clone, Spanned)]
pub struct NamedExprExpr {
    pub span: Span,
    pub id: NodeId,
    pub target: NameExpr,
    pub value: Box<Expr>,
}

#[derive(Debug, Clone, Spanned)]
pub struct StarExpr {
    pub span: Span,
    pub id: NodeId,
    pub value: Box<Expr>,
}

#[derive(Debug, Clone, Spanned)]
pub struct ListExpr {
    pub span: Span,
    pub id: NodeId,
    pub elements: Vec<Expr>,
}

#[derive(Debug, Clone, Spanned)]
pub struct TupleExpr {
    pub span: Span,
    pub id: NodeId,
    pub elements: Vec<Expr>,
}

#[derive(Debug, Clone, Spanned)]
pub struct SetExpr {
    pub span: Span,
    pub id: NodeId,
    pub elements: Vec<Expr>,
}

/// A dict entry: either `key: value` or a `**value` spread (`key: None`).
#[derive(Debug, Clone)]
pub struct DictEntry {
    pub key: Option<Expr>,
    pub value: Expr,
}

#[derive(Debug, Clone, Spanned)]
pub struct DictExpr {
    pub span: Span,
    pub id: NodeId,
    pub entries: Vec<DictEntry>,
}

/// One `for`/`if` clause of a comprehension, e.g. `for x in xs if cond`.
#[derive(Debug, Clone)]
pub struct ComprehensionClause {
    pub is_async: bool,
    pub target: Expr,
    pub iter: Expr,
    pub ifs: Vec<Expr>,
}

#[derive(Debug, Clone, Spanned)]
pub struct ComprehensionExpr {
    pub span: Span,
    pub id: NodeId,
    pub element: Box<Expr>,
    pub clauses: Vec<ComprehensionClause>,
}

#[derive(Debug, Clone, Spanned)]
pub struct DictComprehensionExpr {
    pub span: Span,
    pub id: NodeId,
    pub key: Box<Expr>,
    pub value: Box<Expr>,
    pub clauses: Vec<ComprehensionClause>,
}

#[derive(Debug, Clone)]
pub struct LambdaParam {
    pub name: String,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, Spanned)]
pub struct LambdaExpr {
    pub span: Span,
    pub id: NodeId,
    pub params: ParamList,
    pub body: Box<Expr>,
}

#[derive(Debug, Clone, Spanned)]
pub struct AwaitExpr {
    pub span: Span,
    pub id: NodeId,
    pub value: Box<Expr>,
}

#[derive(Debug, Clone)]
pub enum YieldKind {
    Value(Option<Box<Expr>>),
    From(Box<Expr>),
}

#[derive(Debug, Clone, Spanned)]
pub struct YieldExpr {
    pub span: Span,
    pub id: NodeId,
    pub kind: YieldKind,
}

/// A parenthesized expression, kept as its own node (rather than
/// collapsed into its inner value) so the span of the parens is
/// preserved for diagnostics and round-trip printing.
#[derive(Debug, Clone, Spanned)]
pub struct GroupExpr {
    pub span: Span,
    pub id: NodeId,
    pub inner: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeParamKind {
    TypeVar,
    TypeVarTuple,
    ParamSpec,
}

#[derive(Debug, Clone, Spanned)]
pub struct TypeParamExpr {
    pub span: Span,
    pub id: NodeId,
    pub kind: TypeParamKind,
    pub name: String,
    pub bound: Option<Box<Expr>>,
}

// ------------------------------------------------------------------
// PSX HTML literal extensions
// ------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum HtmlAttributeValue {
    Literal(Expr),
    Interpolation(Expr),
    /// A bare boolean-style attribute (`<input disabled>`).
    Empty,
}

#[derive(Debug, Clone)]
pub enum HtmlAttribute {
    Named {
        name: String,
        value: HtmlAttributeValue,
    },
    /// `{...obj}` spread.
    Spread(Expr),
}

/// Any node valid inside an HTML element's children list.
#[derive(Debug, Clone)]
pub enum HtmlChild {
    Element(HtmlElementExpr),
    Text(HtmlTextExpr),
    Interpolation(HtmlInterpolationExpr),
}

#[derive(Debug, Clone, Spanned)]
pub struct HtmlElementExpr {
    pub span: Span,
    pub id: NodeId,
    pub tag: String,
    /// Span of the tag name at the *opening* angle bracket, carried
    /// separately so a mismatched-close diagnostic can point at it
    /// (§4.2: "mismatched closing tags are diagnosed with the open
    /// tag's span").
    pub open_tag_span: Span,
    pub attributes: Vec<HtmlAttribute>,
    pub children: Vec<HtmlChild>,
    pub self_closing: bool,
}

/// A bare run of HTML children not wrapped in an enclosing element —
/// used for a view's top-level body when it yields a fragment of
/// sibling nodes rather than one root element.
#[derive(Debug, Clone, Spanned)]
pub struct HtmlContentExpr {
    pub span: Span,
    pub id: NodeId,
    pub children: Vec<HtmlChild>,
}

#[derive(Debug, Clone, Spanned)]
pub struct HtmlTextExpr {
    pub span: Span,
    pub id: NodeId,
    pub text: String,
}

#[derive(Debug, Clone, Spanned)]
pub struct HtmlInterpolationExpr {
    pub span: Span,
    pub id: NodeId,
    pub value: Box<Expr>,
}

// ------------------------------------------------------------------
// Shared parameter-list shape (functions, lambdas, views)
// ------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub annotation: Option<Expr>,
    pub default: Option<Expr>,
    pub span: Span,
}

/// A function-style parameter list honoring the positional-only `/`
/// marker, `*`/`*args`, keyword-only parameters, and `**kwargs` (§4.2
/// edge-case policies).
#[derive(Debug, Clone, Default)]
pub struct ParamList {
    pub positional_only: Vec<Param>,
    pub positional_or_keyword: Vec<Param>,
    pub vararg: Option<Param>,
    pub keyword_only: Vec<Param>,
    pub kwarg: Option<Param>,
}

impl ParamList {
    pub fn iter_all(&self) -> impl Iterator<Item = &Param> {
        self.positional_only
            .iter()
            .chain(self.positional_or_keyword.iter())
            .chain(self.vararg.iter())
            .chain(self.keyword_only.iter())
            .chain(self.kwarg.iter())
    }
}
