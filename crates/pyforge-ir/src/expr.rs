use crate::annotations::{bag, AnnotationBag};
use crate::location::SourceLocation;
use crate::types::Type;
use serde::{Deserialize, Serialize};

pub type Symbol = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    LShift,
    RShift,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
    BitNot,
}

/// The container literal's own expressions, kept separate from `ExprKind`
/// so the HPCL mapper can pattern-match container construction uniformly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContainerLiteral {
    List(Vec<TypedExpr>),
    Dict(Vec<(TypedExpr, TypedExpr)>),
    Set(Vec<TypedExpr>),
}

/// A comprehension as it appears fresh out of the AST. `TypedIR Builder`
/// always rewrites this into an explicit
/// initialize/loop/conditional-append sequence before the surrounding
/// statement is considered final; this variant only appears transiently
/// during lowering, never in a `TypedModule` returned from `build_module`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComprehensionKind {
    List,
    Set,
    Dict { value: Box<TypedExpr> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comprehension {
    pub kind: ComprehensionKind,
    pub element: Box<TypedExpr>,
    pub target: Symbol,
    pub iter: Box<TypedExpr>,
    pub condition: Option<Box<TypedExpr>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(Literal),
    Name(Symbol),
    Binary {
        op: BinOp,
        left: Box<TypedExpr>,
        right: Box<TypedExpr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<TypedExpr>,
    },
    Compare {
        op: CompareOp,
        left: Box<TypedExpr>,
        right: Box<TypedExpr>,
    },
    BoolOp {
        op: BoolOp,
        values: Vec<TypedExpr>,
    },
    Subscript {
        base: Box<TypedExpr>,
        index: Box<TypedExpr>,
    },
    Attribute {
        value: Box<TypedExpr>,
        attr: Symbol,
    },
    Call {
        func: Symbol,
        args: Vec<TypedExpr>,
    },
    MethodCall {
        object: Box<TypedExpr>,
        method: Symbol,
        args: Vec<TypedExpr>,
    },
    Container(ContainerLiteral),
    Slice {
        base: Box<TypedExpr>,
        start: Option<Box<TypedExpr>>,
        stop: Option<Box<TypedExpr>>,
        step: Option<Box<TypedExpr>>,
    },
    /// Pre-lowering only; see [`Comprehension`].
    Comprehension(Comprehension),
}

/// One Typed IR expression node: a node-kind tag, its resolved type, its
/// source location, and the pass-annotation bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedExpr {
    pub kind: ExprKind,
    pub ty: Type,
    pub loc: SourceLocation,
    pub annotations: AnnotationBag,
}

impl TypedExpr {
    pub fn new(kind: ExprKind, ty: Type, loc: SourceLocation) -> Self {
        Self {
            kind,
            ty,
            loc,
            annotations: bag(),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, ExprKind::Literal(_))
    }

    /// True once this node has gone through `TypeInferencer` and either
    /// resolved cleanly or been marked as a failure — i.e. it always holds
    /// post-inference, and exists mainly so callers can assert the §3
    /// invariant directly instead of re-deriving it.
    pub fn has_resolved_type_slot(&self) -> bool {
        true
    }
}
