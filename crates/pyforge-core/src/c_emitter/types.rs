//! Declares a typed binding's C spelling. Container types spell as their
//! monomorphized HPCL struct name passed by value; everything else uses
//! `Type::c_scalar_spelling` (scalars) or the struct's own name, with
//! pointer placement honoring `pointer_alignment`.

use crate::options::{Options, PointerAlignment};
use pyforge_ir::{ContainerKey, ContainerRegistry, Type};

fn is_pointer_type(ty: &Type) -> bool {
    matches!(ty, Type::CStr)
}

/// Base type spelling ignoring pointer placement, e.g. `int64_t`,
/// `vec_int64`, `const char`, `Point`.
pub fn base_spelling(registry: &mut ContainerRegistry, ty: &Type) -> String {
    match ContainerKey::from_type(ty) {
        Some(key) => registry.get_or_register(key, crate::hpcl::container_name),
        None => match ty {
            Type::CStr => "const char".to_string(),
            Type::Struct(name) => name.clone(),
            other => other.c_scalar_spelling().to_string(),
        },
    }
}

/// Renders `<type> <name>` (a parameter, local, or struct field) honoring
/// `pointer_alignment`.
pub fn declare(registry: &mut ContainerRegistry, options: &Options, ty: &Type, name: &str) -> String {
    let base = base_spelling(registry, ty);
    if !is_pointer_type(ty) {
        return format!("{base} {name}");
    }
    match options.pointer_alignment {
        PointerAlignment::Left => format!("{base}* {name}"),
        PointerAlignment::Middle => format!("{base} * {name}"),
        PointerAlignment::Right => format!("{base} *{name}"),
    }
}

/// Renders a bare return-type spelling for a function signature (no name).
pub fn return_spelling(registry: &mut ContainerRegistry, options: &Options, ty: &Type) -> String {
    let base = base_spelling(registry, ty);
    if !is_pointer_type(ty) {
        return base;
    }
    match options.pointer_alignment {
        PointerAlignment::Left => format!("{base}*"),
        PointerAlignment::Middle | PointerAlignment::Right => format!("{base} *"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_param_declares_plainly() {
        let options = Options::default();
        let mut registry = ContainerRegistry::new();
        assert_eq!(declare(&mut registry, &options, &Type::I32, "n"), "int32_t n");
    }

    #[test]
    fn cstr_param_honors_right_pointer_alignment() {
        let options = Options::default();
        let mut registry = ContainerRegistry::new();
        assert_eq!(declare(&mut registry, &options, &Type::CStr, "s"), "const char *s");
    }

    #[test]
    fn list_param_declares_as_container_value_type() {
        let options = Options::default();
        let mut registry = ContainerRegistry::new();
        let ty = Type::List(Box::new(Type::I64));
        assert_eq!(declare(&mut registry, &options, &ty, "xs"), "vec_int64 xs");
    }
}
