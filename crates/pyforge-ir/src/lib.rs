//! Typed IR node types, the closed type-token set, and the container
//! registry shared by the pyforge frontend, intelligence layer, and emitter.
//!
//! A dependency-light types-only crate that everything else in the
//! workspace builds on, so that e.g. `pyforge-analyzer` does not need to
//! depend on the parser or the emitter just to walk a function body.

pub mod annotations;
pub mod decl;
pub mod expr;
pub mod location;
pub mod module;
pub mod registry;
pub mod stmt;
pub mod types;

pub use annotations::{bag, AnnotationBag, AnnotationValue};
pub use decl::{Decl, FunctionDecl, FunctionProperties, GlobalConstDecl, Param, StructDecl, TypeAliasDecl};
pub use expr::{
    BinOp, BoolOp, Comprehension, ComprehensionKind, CompareOp, ContainerLiteral, ExprKind,
    Literal, Symbol, TypedExpr, UnaryOp,
};
pub use location::SourceLocation;
pub use module::TypedModule;
pub use registry::{ContainerKey, ContainerRegistry};
pub use stmt::{AssignTarget, Stmt};
pub use types::Type;
