use crate::expr::{BinOp, Symbol, TypedExpr};
use crate::location::SourceLocation;
use serde::{Deserialize, Serialize};

/// Where an `Assign` writes. `xs[i] = v`
/// and `d[k] = v` share the same Python syntax (`Subscript`); the frontend
/// always produces `Subscript` and `type_inference` promotes it to
/// `DictKey` once the base's resolved type is known to be a dict, so the
/// emitter never has to re-derive the distinction itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssignTarget {
    Name(Symbol),
    Subscript { base: Box<TypedExpr>, index: Box<TypedExpr> },
    DictKey { base: Box<TypedExpr>, key: Box<TypedExpr> },
}

impl AssignTarget {
    /// `Some(name)` only for a plain-name target; a container write has no
    /// single name to rebind in scope.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            AssignTarget::Name(name) => Some(name.as_str()),
            _ => None,
        }
    }
}

/// A Typed IR statement. `AugAssign` and the comprehension-bearing forms of
/// `Assign` only appear transiently during `TypedIR Builder` normalization
///; by the time a function body is returned from
/// `build_function`, augmented assignment has been rewritten to
/// assign-after-binop and comprehensions have been rewritten to
/// `ForContainer` loops over a synthesized temporary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Assign {
        target: AssignTarget,
        value: TypedExpr,
        loc: SourceLocation,
    },
    AugAssign {
        target: Symbol,
        op: BinOp,
        value: TypedExpr,
        loc: SourceLocation,
    },
    If {
        condition: TypedExpr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
        loc: SourceLocation,
    },
    While {
        condition: TypedExpr,
        body: Vec<Stmt>,
        loc: SourceLocation,
    },
    /// `for i in range(...)`, kept distinct from `ForContainer` because it
    /// emits as a canonical C `for` loop over an induction variable rather
    /// than an HPCL foreach macro ((c)).
    ForRange {
        var: Symbol,
        start: TypedExpr,
        stop: TypedExpr,
        step: TypedExpr,
        body: Vec<Stmt>,
        loc: SourceLocation,
    },
    ForContainer {
        var: Symbol,
        iter: TypedExpr,
        body: Vec<Stmt>,
        loc: SourceLocation,
    },
    Return {
        value: Option<TypedExpr>,
        loc: SourceLocation,
    },
    Break(SourceLocation),
    Continue(SourceLocation),
    ExprStmt {
        value: TypedExpr,
        loc: SourceLocation,
    },
    Assert {
        condition: TypedExpr,
        message: Option<TypedExpr>,
        loc: SourceLocation,
    },
    Pass(SourceLocation),
}

impl Stmt {
    pub fn loc(&self) -> SourceLocation {
        match self {
            Stmt::Assign { loc, .. }
            | Stmt::AugAssign { loc, .. }
            | Stmt::If { loc, .. }
            | Stmt::While { loc, .. }
            | Stmt::ForRange { loc, .. }
            | Stmt::ForContainer { loc, .. }
            | Stmt::Return { loc, .. }
            | Stmt::ExprStmt { loc, .. }
            | Stmt::Assert { loc, .. } => *loc,
            Stmt::Break(loc) | Stmt::Continue(loc) | Stmt::Pass(loc) => *loc,
        }
    }
}
