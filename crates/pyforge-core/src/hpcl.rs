//! HPCL ("high-performance generic-container library") binding: container
//! naming, declaration, and instantiation.
//! Grounded directly on `cgen`'s STC integration layer — this translator's
//! naming scheme (`vec_<elem>`, `hmap_<key>_<val>`, `hset_<elem>`) and its
//! `#define T ... / #include "hpcl/..."` instantiation idiom are a rename,
//! not a reinvention, of that module's `STCTypeMapper`/`STCDeclarationGenerator`.

use pyforge_ir::{ContainerKey, ContainerRegistry, Type};

/// Monomorphized container name for a container shape, e.g.
/// `ContainerKey::List(Type::I32)` -> `vec_int32`.
pub fn container_name(key: &ContainerKey) -> String {
    match key {
        ContainerKey::List(elem) => format!("vec_{}", elem.hpcl_token()),
        ContainerKey::Dict(k, v) => format!("hmap_{}_{}", k.hpcl_token(), v.hpcl_token()),
        ContainerKey::Set(elem) => format!("hset_{}", elem.hpcl_token()),
    }
}

/// Registers `ty`'s container shape (and recursively its element/key/value
/// shapes, since `list[list[int]]` needs both `vec_vec_int64` and its
/// element container declared) in `registry`, returning the outermost
/// monomorphized name. A no-op, returning `ty`'s scalar spelling, for
/// non-container types.
pub fn register_type(registry: &mut ContainerRegistry, ty: &Type) -> String {
    match ContainerKey::from_type(ty) {
        Some(key) => {
            match &key {
                ContainerKey::List(elem) | ContainerKey::Set(elem) => {
                    if elem.is_container() {
                        register_type(registry, elem);
                    }
                }
                ContainerKey::Dict(k, v) => {
                    if k.is_container() {
                        register_type(registry, k);
                    }
                    if v.is_container() {
                        register_type(registry, v);
                    }
                }
            }
            registry.get_or_register(key, container_name)
        }
        None => ty.c_scalar_spelling().to_string(),
    }
}

/// One `declare_*`/`#define T`/`#include` block for a single registered
/// container, in the order `generate_declarations` emits them in `cgen`:
/// all `declare_*` statements first, then a blank line, then one
/// `#define T ... / #include "hpcl/..."` instantiation per container.
pub fn declaration_lines(registry: &ContainerRegistry) -> Vec<String> {
    let mut declares = Vec::new();
    let mut instantiations = Vec::new();
    for (key, name) in registry.iter_in_registration_order() {
        match key {
            ContainerKey::List(elem) => {
                let t = elem.hpcl_token();
                declares.push(format!("declare_vec({name}, {t});"));
                instantiations.push(format!("#define T {name}, {t}, (c_declared)"));
                instantiations.push("#include \"hpcl/vec.h\"".to_string());
                instantiations.push(String::new());
            }
            ContainerKey::Dict(k, v) => {
                let kt = k.hpcl_token();
                let vt = v.hpcl_token();
                declares.push(format!("declare_hmap({name}, {kt}, {vt});"));
                instantiations.push(format!("#define T {name}, {kt}, {vt}, (c_declared)"));
                instantiations.push("#include \"hpcl/hmap.h\"".to_string());
                instantiations.push(String::new());
            }
            ContainerKey::Set(elem) => {
                let t = elem.hpcl_token();
                declares.push(format!("declare_hset({name}, {t});"));
                instantiations.push(format!("#define T {name}, {t}, (c_declared)"));
                instantiations.push("#include \"hpcl/hset.h\"".to_string());
                instantiations.push(String::new());
            }
        }
    }
    if declares.is_empty() {
        return Vec::new();
    }
    declares.push(String::new());
    declares.extend(instantiations);
    declares
}

/// The Python-builtin-method-name to HPCL-accessor mapping (
/// "Method lowering"): `.append`/`.add`/`.insert` on a recognized container
/// lower to the generic `_push`/`_insert` family HPCL exposes uniformly
/// across its three container kinds.
pub fn lower_method_name(container: &ContainerKey, python_method: &str) -> Option<&'static str> {
    match (container, python_method) {
        (ContainerKey::List(_), "append") => Some("push"),
        (ContainerKey::List(_), "pop") => Some("pop"),
        (ContainerKey::Set(_), "add") => Some("insert"),
        (ContainerKey::Dict(_, _), "insert") => Some("insert"),
        (ContainerKey::Dict(_, _), "get") => Some("get"),
        (_, "len") => Some("size"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_of_int_names_vec_int64() {
        let name = container_name(&ContainerKey::List(Type::I64));
        assert_eq!(name, "vec_int64");
    }

    #[test]
    fn dict_of_str_to_int_names_hmap() {
        let name = container_name(&ContainerKey::Dict(Type::CStr, Type::I64));
        assert_eq!(name, "hmap_cstr_int64");
    }

    #[test]
    fn registering_scalar_type_returns_c_spelling() {
        let mut registry = ContainerRegistry::new();
        assert_eq!(register_type(&mut registry, &Type::I32), "int32_t");
        assert!(registry.is_empty());
    }

    #[test]
    fn declaration_lines_follow_declare_then_instantiate_order() {
        let mut registry = ContainerRegistry::new();
        register_type(&mut registry, &Type::List(Box::new(Type::I32)));
        let lines = declaration_lines(&registry);
        assert!(lines[0].starts_with("declare_vec("));
        assert!(lines.iter().any(|l| l == "#include \"hpcl/vec.h\""));
    }

    #[test]
    fn append_on_list_lowers_to_push() {
        let key = ContainerKey::List(Type::I64);
        assert_eq!(lower_method_name(&key, "append"), Some("push"));
    }
}
