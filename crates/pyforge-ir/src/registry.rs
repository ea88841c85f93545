use crate::types::Type;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// `(container-kind, type-parameters)` key into the container registry
///. Kept separate from `Type::List`/`Dict`/
/// `Set` so registry lookups don't need to reconstruct a full `Type` to
/// query "have we already monomorphized this?".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKey {
    List(Type),
    Dict(Type, Type),
    Set(Type),
}

impl ContainerKey {
    pub fn from_type(ty: &Type) -> Option<ContainerKey> {
        match ty {
            Type::List(elem) => Some(ContainerKey::List((**elem).clone())),
            Type::Dict(k, v) => Some(ContainerKey::Dict((**k).clone(), (**v).clone())),
            Type::Set(elem) => Some(ContainerKey::Set((**elem).clone())),
            _ => None,
        }
    }
}

/// Process-wide (per-translation) table mapping a container shape to its
/// monomorphized HPCL container name. The only globally-mutable resource
/// during translation ( "Shared-resource policy" / §9 "Global
/// mutable state"): owned by the translation context, passed explicitly,
/// zeroed at the start of each `translate_module` call — never a
/// singleton, never thread-local.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerRegistry {
    names: IndexMap<ContainerKey, String>,
}

impl ContainerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing monomorphization name for `key`, registering a
    /// fresh one via `namer` if this is the first time the shape is seen.
    /// Insertion order is preserved so declaration emission is deterministic
    ///.
    pub fn get_or_register(&mut self, key: ContainerKey, namer: impl FnOnce(&ContainerKey) -> String) -> String {
        if let Some(existing) = self.names.get(&key) {
            return existing.clone();
        }
        let name = namer(&key);
        self.names.insert(key, name.clone());
        name
    }

    pub fn get(&self, key: &ContainerKey) -> Option<&str> {
        self.names.get(key).map(String::as_str)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.names.values().any(|n| n == name)
    }

    /// Entries in the order they were first registered — the order the
    /// §4.7/§4.8 declaration pass must forward-declare and instantiate them
    /// in to satisfy the "container closure" testable property.
    pub fn iter_in_registration_order(&self) -> impl Iterator<Item = (&ContainerKey, &str)> {
        self.names.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_registration_returns_the_same_name() {
        let mut registry = ContainerRegistry::new();
        let key = ContainerKey::List(Type::I32);
        let first = registry.get_or_register(key.clone(), |_| "vec_int32".to_string());
        let second = registry.get_or_register(key, |_| "vec_int32_DUPLICATE".to_string());
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registration_order_is_preserved() {
        let mut registry = ContainerRegistry::new();
        registry.get_or_register(ContainerKey::List(Type::I32), |_| "vec_int32".into());
        registry.get_or_register(ContainerKey::Set(Type::CStr), |_| "hset_cstr".into());
        let names: Vec<&str> = registry
            .iter_in_registration_order()
            .map(|(_, n)| n)
            .collect();
        assert_eq!(names, vec!["vec_int32", "hset_cstr"]);
    }
}
