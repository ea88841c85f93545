use crate::expr::{Symbol, TypedExpr};
use crate::location::SourceLocation;
use crate::stmt::Stmt;
use crate::types::Type;
use pyforge_annotations::CodegenAnnotations;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: Symbol,
    pub ty: Type,
}

/// Flags answering "is this safe to inline/specialize" for a C target:
/// `FunctionSpecializer`'s memoization candidate needs `is_pure`,
/// `PerformanceAnalyzer` needs `always_terminates` framing for its
/// complexity ladder.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionProperties {
    pub is_pure: bool,
    pub always_terminates: bool,
    pub is_recursive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: Symbol,
    pub params: Vec<Param>,
    pub ret_type: Type,
    pub body: Vec<Stmt>,
    pub properties: FunctionProperties,
    pub annotations: CodegenAnnotations,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: Symbol,
    pub fields: Vec<(Symbol, Type)>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAliasDecl {
    pub name: Symbol,
    pub target: Type,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConstDecl {
    pub name: Symbol,
    pub ty: Type,
    pub value: TypedExpr,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decl {
    Function(FunctionDecl),
    Struct(StructDecl),
    TypeAlias(TypeAliasDecl),
    GlobalConst(GlobalConstDecl),
}

impl Decl {
    pub fn name(&self) -> &str {
        match self {
            Decl::Function(f) => &f.name,
            Decl::Struct(s) => &s.name,
            Decl::TypeAlias(t) => &t.name,
            Decl::GlobalConst(g) => &g.name,
        }
    }
}
