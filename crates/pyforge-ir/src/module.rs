use crate::decl::{Decl, FunctionDecl};
use serde::{Deserialize, Serialize};

/// One translated source unit. The translator is a
/// batch operation per module; this is the root of the Typed IR tree that
/// survives from `TypedIR Builder` through the emitter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypedModule {
    pub decls: Vec<Decl>,
}

impl TypedModule {
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.decls.iter().filter_map(|d| match d {
            Decl::Function(f) => Some(f),
            _ => None,
        })
    }

    pub fn find_function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions().find(|f| f.name == name)
    }
}
