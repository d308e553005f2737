// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::lexer::*;
use crate::number::Number;

use std::rc::Rc;

pub type Ref<T> = Rc<T>;
pub type ExprRef = Ref<Expr>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

#[derive(Debug)]
pub enum Expr {
    // Literals
    Null(Span),
    Bool(Span, bool),
    Number(Span, Number),
    String(Span, Rc<str>),
    Array {
        span: Span,
        items: Vec<ExprRef>,
    },

    // References
    Var(Span),
    RefDot {
        span: Span,
        refr: ExprRef,
        field: Span,
    },
    RefBrack {
        span: Span,
        refr: ExprRef,
        index: ExprRef,
    },

    // Operators
    Not {
        span: Span,
        expr: ExprRef,
    },
    BoolExpr {
        span: Span,
        op: BoolOp,
        lhs: ExprRef,
        rhs: ExprRef,
    },
    CompareExpr {
        span: Span,
        op: CompareOp,
        lhs: ExprRef,
        rhs: ExprRef,
    },
    Concat {
        span: Span,
        lhs: ExprRef,
        rhs: ExprRef,
    },

    // `expr | name(args)`
    Filter {
        span: Span,
        expr: ExprRef,
        name: Span,
        args: Vec<ExprRef>,
    },

    // `expr is [not] name`
    Test {
        span: Span,
        expr: ExprRef,
        name: Span,
        negated: bool,
    },

    // `then if cond else otherwise`
    IfElse {
        span: Span,
        cond: ExprRef,
        then: ExprRef,
        otherwise: Option<ExprRef>,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        use Expr::*;
        match self {
            Null(s) | Bool(s, _) | Number(s, _) | String(s, _) | Var(s) => s,
            Array { span, .. }
            | RefDot { span, .. }
            | RefBrack { span, .. }
            | Not { span, .. }
            | BoolExpr { span, .. }
            | CompareExpr { span, .. }
            | Concat { span, .. }
            | Filter { span, .. }
            | Test { span, .. }
            | IfElse { span, .. } => span,
        }
    }
}

#[derive(Debug)]
pub enum Segment {
    Text(Rc<str>),
    Expr(ExprRef),
}

/// A parsed template string: literal text interleaved with `{{ ... }}`
/// expressions.
#[derive(Debug)]
pub struct Template {
    pub source: Source,
    pub segments: Vec<Segment>,
}

impl Template {
    /// The expression of a template that is nothing but one `{{ ... }}`
    /// segment, optionally padded with whitespace. Such templates evaluate to
    /// the native value of the expression rather than to text.
    pub fn single_expr(&self) -> Option<&ExprRef> {
        let mut found = None;
        for segment in &self.segments {
            match segment {
                Segment::Text(t) if t.trim().is_empty() => (),
                Segment::Text(_) => return None,
                Segment::Expr(_) if found.is_some() => return None,
                Segment::Expr(e) => found = Some(e),
            }
        }
        found
    }

    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Text(_)))
    }
}
