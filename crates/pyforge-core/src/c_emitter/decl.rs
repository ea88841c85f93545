//! Top-level declaration emission: functions, structs, type aliases, and
//! global constants ( "Module-level emission order" items 6-10).

use super::stmt::emit_block;
use super::types::{base_spelling, declare, return_spelling};
use super::writer::Writer;
use crate::error::TranslateError;
use crate::options::Options;
use pyforge_ir::{ContainerRegistry, FunctionDecl, GlobalConstDecl, StructDecl, TypeAliasDecl};

pub fn function_signature(
    registry: &mut ContainerRegistry,
    options: &Options,
    f: &FunctionDecl,
) -> String {
    let ret = return_spelling(registry, options, &f.ret_type);
    let params: Vec<String> = f
        .params
        .iter()
        .map(|p| declare(registry, options, &p.ty, &p.name))
        .collect();
    let params_s = if params.is_empty() { "void".to_string() } else { params.join(", ") };
    format!("{ret} {}({params_s})", f.name)
}

pub fn emit_forward_declaration(registry: &mut ContainerRegistry, options: &Options, w: &mut Writer<'_>, f: &FunctionDecl) {
    w.line(format!("{};", function_signature(registry, options, f)));
}

pub fn emit_function(
    registry: &mut ContainerRegistry,
    options: &Options,
    w: &mut Writer<'_>,
    f: &FunctionDecl,
) -> Result<(), TranslateError> {
    if options.emit_source_comments {
        w.line(format!("/* from source line {} */", f.loc.line));
    }
    let sig = function_signature(registry, options, f);
    w.open_block(&sig);
    emit_block(w, registry, &f.body)?;
    w.close_block();
    Ok(())
}

pub fn emit_struct(registry: &mut ContainerRegistry, options: &Options, w: &mut Writer<'_>, s: &StructDecl) {
    w.open_block(&format!("typedef struct {}", s.name));
    for (field_name, field_ty) in &s.fields {
        let rendered = declare(registry, options, field_ty, field_name);
        w.line(format!("{rendered};"));
    }
    w.dedent();
    w.line(format!("}} {};", s.name));
    // `open_block`/`close_block` assume a bare `{ ... }` with no trailing
    // tokens, which a typedef struct needs (`} Name;`), so the struct body
    // is closed manually here instead of via `close_block`.
}

pub fn emit_type_alias(registry: &mut ContainerRegistry, options: &Options, w: &mut Writer<'_>, t: &TypeAliasDecl) {
    let _ = options;
    let target = base_spelling(registry, &t.target);
    w.line(format!("typedef {target} {};", t.name));
}

pub fn emit_global_const(
    registry: &mut ContainerRegistry,
    options: &Options,
    w: &mut Writer<'_>,
    g: &GlobalConstDecl,
) -> Result<(), TranslateError> {
    let decl = declare(registry, options, &g.ty, &g.name);
    let value = super::expr::emit_expr(registry, &g.value)?;
    w.line(format!("const {decl} = {value};"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyforge_annotations::CodegenAnnotations;
    use pyforge_ir::{FunctionProperties, Param, SourceLocation, Type};

    fn loc() -> SourceLocation {
        SourceLocation { line: 1, column: 0 }
    }

    #[test]
    fn signature_renders_void_params_for_zero_arity() {
        let options = Options::default();
        let mut registry = ContainerRegistry::new();
        let f = FunctionDecl {
            name: "answer".into(),
            params: vec![],
            ret_type: Type::I32,
            body: vec![],
            properties: FunctionProperties::default(),
            annotations: CodegenAnnotations::default(),
            loc: loc(),
        };
        assert_eq!(function_signature(&mut registry, &options, &f), "int32_t answer(void)");
    }

    #[test]
    fn signature_joins_multiple_params() {
        let options = Options::default();
        let mut registry = ContainerRegistry::new();
        let f = FunctionDecl {
            name: "add".into(),
            params: vec![Param { name: "a".into(), ty: Type::I64 }, Param { name: "b".into(), ty: Type::I64 }],
            ret_type: Type::I64,
            body: vec![],
            properties: FunctionProperties::default(),
            annotations: CodegenAnnotations::default(),
            loc: loc(),
        };
        assert_eq!(function_signature(&mut registry, &options, &f), "int64_t add(int64_t a, int64_t b)");
    }
}
