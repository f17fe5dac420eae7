use std::fmt;
use std::ops::Deref;

use crate::helpers::Clock;
use crate::tokens::Span;
use crate::value::Value;

/// Container for nodes with location info.
///
/// This container fulfills two purposes: it adds location information
/// to nodes, but it also ensures the nodes are heap allocated.  The
/// latter is useful to ensure that enum variants do not cause the enum
/// to become too large.
pub struct Spanned<T> {
    node: Box<T>,
    span: Span,
}

impl<T> Spanned<T> {
    /// Creates a new spanned node.
    pub fn new(node: T, span: Span) -> Spanned<T> {
        Spanned {
            node: Box::new(node),
            span,
        }
    }

    /// Accesses the span.
    pub fn span(&self) -> Span {
        self.span
    }
}

impl<T> Deref for Spanned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.node
    }
}

impl<T: fmt::Debug> fmt::Debug for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.node, f)?;
        write!(f, "{:?}", self.span)
    }
}

/// A statement node.
#[derive(Debug)]
pub enum Stmt<'a> {
    Template(Spanned<Template<'a>>),
    EmitRaw(Spanned<EmitRaw<'a>>),
    EmitExpr(Spanned<EmitExpr<'a>>),
    IfCond(Spanned<IfCond<'a>>),
    ForEach(Spanned<ForEach<'a>>),
}

/// Root template node.
#[derive(Debug)]
pub struct Template<'a> {
    pub children: Vec<Stmt<'a>>,
}

/// Outputs raw template data.
#[derive(Debug)]
pub struct EmitRaw<'a> {
    pub raw: &'a str,
}

/// Outputs the result of an expression placeholder.
#[derive(Debug)]
pub struct EmitExpr<'a> {
    pub expr: Expr<'a>,
}

/// An `if (…) { … } else { … }` block.
#[derive(Debug)]
pub struct IfCond<'a> {
    pub cond: Cond<'a>,
    pub true_body: Vec<Stmt<'a>>,
    pub false_body: Vec<Stmt<'a>>,
}

/// A `source.forEach((item, i) => { … })` block.
#[derive(Debug)]
pub struct ForEach<'a> {
    pub source: Vec<&'a str>,
    pub item_var: &'a str,
    pub index_var: Option<&'a str>,
    pub body: Vec<Stmt<'a>>,
}

/// An expression node.
#[derive(Debug)]
pub enum Expr<'a> {
    Path(Spanned<PathRef<'a>>),
    Const(Spanned<Const>),
    Call(Spanned<Call<'a>>),
    Clock(Spanned<ClockCall>),
}

/// A bare or dotted field reference.
#[derive(Debug)]
pub struct PathRef<'a> {
    pub segments: Vec<&'a str>,
}

/// Loads a constant.
#[derive(Debug)]
pub struct Const {
    pub value: Value,
}

/// Calls a helper transform by name.
///
/// Names outside the closed helper set still parse; they resolve to
/// the empty string at evaluation time.
#[derive(Debug)]
pub struct Call<'a> {
    pub name: &'a str,
    pub args: Vec<Expr<'a>>,
}

/// One of the `new Date()` clock shapes.
#[derive(Debug)]
pub struct ClockCall {
    pub kind: Clock,
}

/// A parsed condition.
///
/// Connective chains are flat: the first `&&` or `||` seen fixes the
/// combinator for the whole condition.  There is no operator
/// precedence, matching the upstream flat-split behavior.
#[derive(Debug)]
pub enum Cond<'a> {
    Single(CondAtom<'a>),
    All(Vec<CondAtom<'a>>),
    Any(Vec<CondAtom<'a>>),
}

/// A single comparison or truthiness test.
#[derive(Debug)]
pub enum CondAtom<'a> {
    Compare {
        op: CmpOp,
        left: Expr<'a>,
        right: Expr<'a>,
    },
    Truthy(Expr<'a>),
}

/// A kind of comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Gt,
    Lt,
    StrictEq,
    LooseEq,
}
