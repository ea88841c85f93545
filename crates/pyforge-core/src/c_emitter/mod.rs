//! Renders a [`TypedModule`] to C source text.
//! Emission is a single linear pass in the module-level order 
//! fixes: includes, container declarations and instantiations, macros and
//! enums, struct/union declarations, typedef aliases, function forward
//! declarations, global variables, then function bodies.

mod decl;
mod expr;
mod stmt;
mod types;
mod writer;

use crate::error::TranslateError;
use crate::options::Options;
use crate::runtime::RuntimeProfile;
use pyforge_ir::{ContainerRegistry, Decl, Type, TypedModule};
use writer::{LastElementKind, Writer};

const STANDARD_INCLUDES: &[&str] = &["stdint.h", "stdbool.h", "stddef.h"];

/// Walks every declaration's types to pre-register every container shape
/// the module references, so the forward-declaration block (module order
/// item 3) is complete before any function body (which may register
/// additional *local* container shapes the emitter discovers while walking
/// expressions) is rendered.
fn collect_container_types(module: &TypedModule, registry: &mut ContainerRegistry) {
    for decl in &module.decls {
        match decl {
            Decl::Function(f) => {
                for p in &f.params {
                    register_if_container(registry, &p.ty);
                }
                register_if_container(registry, &f.ret_type);
            }
            Decl::Struct(s) => {
                for (_, ty) in &s.fields {
                    register_if_container(registry, ty);
                }
            }
            Decl::TypeAlias(t) => register_if_container(registry, &t.target),
            Decl::GlobalConst(g) => register_if_container(registry, &g.ty),
        }
    }
}

fn register_if_container(registry: &mut ContainerRegistry, ty: &Type) {
    if ty.is_container() {
        crate::hpcl::register_type(registry, ty);
    }
}

/// Renders `module` to a complete C translation unit. Returns the source
/// text; the caller (`translate_module`, ) is responsible for
/// writing it out and linking the HPCL/runtime headers it `#include`s.
pub fn emit_module(module: &TypedModule, options: &Options) -> Result<String, TranslateError> {
    let mut registry = ContainerRegistry::new();
    collect_container_types(module, &mut registry);

    let mut w = Writer::new(options);

    for header in STANDARD_INCLUDES {
        w.separate(LastElementKind::Include);
        w.line(format!("#include <{header}>"));
    }
    let runtime_profile = RuntimeProfile::for_module(module, &registry);
    for header in runtime_profile.headers() {
        w.separate(LastElementKind::Include);
        w.line(format!("#include \"{header}\""));
    }

    let container_lines = crate::hpcl::declaration_lines(&registry);
    if !container_lines.is_empty() {
        w.separate(LastElementKind::ContainerDeclaration);
        for line in &container_lines {
            if line.is_empty() {
                w.blank();
            } else {
                w.line(line);
            }
        }
    }

    for struct_decl in module.decls.iter().filter_map(as_struct) {
        w.separate(LastElementKind::TypeDeclaration);
        decl::emit_struct(&mut registry, options, &mut w, struct_decl);
    }

    for alias in module.decls.iter().filter_map(as_type_alias) {
        w.separate(LastElementKind::TypeDeclaration);
        decl::emit_type_alias(&mut registry, options, &mut w, alias);
    }

    let functions: Vec<_> = module.decls.iter().filter_map(as_function).collect();
    for f in &functions {
        w.separate(LastElementKind::ForwardDeclaration);
        decl::emit_forward_declaration(&mut registry, options, &mut w, f);
    }

    for global in module.decls.iter().filter_map(as_global_const) {
        w.separate(LastElementKind::GlobalVariable);
        decl::emit_global_const(&mut registry, options, &mut w, global)?;
    }

    for f in &functions {
        w.separate(LastElementKind::FunctionBody);
        decl::emit_function(&mut registry, options, &mut w, f)?;
    }

    Ok(w.into_string())
}

fn as_function(decl: &Decl) -> Option<&pyforge_ir::FunctionDecl> {
    match decl {
        Decl::Function(f) => Some(f),
        _ => None,
    }
}

fn as_struct(decl: &Decl) -> Option<&pyforge_ir::StructDecl> {
    match decl {
        Decl::Struct(s) => Some(s),
        _ => None,
    }
}

fn as_type_alias(decl: &Decl) -> Option<&pyforge_ir::TypeAliasDecl> {
    match decl {
        Decl::TypeAlias(t) => Some(t),
        _ => None,
    }
}

fn as_global_const(decl: &Decl) -> Option<&pyforge_ir::GlobalConstDecl> {
    match decl {
        Decl::GlobalConst(g) => Some(g),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{convert_module, parse_source};
    use crate::ir_builder::IrBuilder;
    use crate::type_inference::TypeInferencer;

    fn translate(source: &str) -> String {
        let parsed = parse_source(source, "<test>").unwrap();
        let mut m = convert_module(parsed, source).unwrap();
        TypeInferencer::infer_module(&mut m).unwrap();
        IrBuilder::normalize_module(&mut m).unwrap();
        emit_module(&m, &Options::default()).unwrap()
    }

    #[test]
    fn standard_includes_precede_everything_else() {
        let out = translate("def add(a: int, b: int) -> int:\n    return a + b\n");
        let include_pos = out.find("#include <stdint.h>").unwrap();
        let fn_pos = out.find("int32_t add").unwrap();
        assert!(include_pos < fn_pos);
    }

    #[test]
    fn function_forward_declaration_precedes_its_body() {
        let out = translate("def square(n: int) -> int:\n    return n * n\n");
        let forward = out.find("int32_t square(int32_t n);").unwrap();
        let body = out.rfind("int32_t square(int32_t n) {").unwrap();
        assert!(forward < body);
    }

    #[test]
    fn container_declarations_precede_the_function_that_uses_them() {
        let out = translate(
            "def total(xs: list[int]) -> int:\n    acc = 0\n    for x in xs:\n        acc += x\n    return acc\n",
        );
        let decl_pos = out.find("declare_vec(vec_int32, int32);").unwrap();
        let fn_pos = out.find("int32_t total").unwrap();
        assert!(decl_pos < fn_pos);
    }
}
