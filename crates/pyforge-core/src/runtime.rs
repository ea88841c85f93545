//! Describes which optional runtime headers one translation unit needs
//!: the emitted C always references
//! the fixed `cgr_` symbol prefix, but not every module exercises every
//! runtime component, so the emitter only `#include`s what it uses.
//!
//! Five runtime components exist (error handling, Python-op shims,
//! STC/HPCL bridge, memory ops, file ops), each behind an include flag
//! this module derives from the module's own contents rather than a
//! user-set config; the runtime sources themselves stay external, so only
//! the header list needs to be correct.

use pyforge_ir::{ContainerRegistry, TypedModule};

/// Which of the fixed runtime header files a translated module needs.
/// Error handling and the Python-op shims are unconditional: every
/// emitted function can assert or use a `cgr_*` arithmetic helper.
/// `stc_bridge`/`memory_ops` only apply when the module actually
/// registers an HPCL container. File ops have no counterpart in the
/// supported Python subset (no file I/O construct exists in the IR) and
/// are never requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeProfile {
    pub needs_error_handling: bool,
    pub needs_python_ops: bool,
    pub needs_stc_bridge: bool,
    pub needs_memory_ops: bool,
}

impl RuntimeProfile {
    pub fn for_module(_module: &TypedModule, registry: &ContainerRegistry) -> Self {
        Self {
            needs_error_handling: true,
            needs_python_ops: true,
            needs_stc_bridge: !registry.is_empty(),
            needs_memory_ops: !registry.is_empty(),
        }
    }

    /// Header names in the fixed order `RuntimeConfig::get_headers` uses:
    /// core components first, then the container-dependent ones.
    pub fn headers(&self) -> Vec<&'static str> {
        let mut headers = Vec::with_capacity(4);
        if self.needs_error_handling {
            headers.push("cgr_error_handling.h");
        }
        if self.needs_python_ops {
            headers.push("cgr_python_ops.h");
        }
        if self.needs_stc_bridge {
            headers.push("cgr_stc_bridge.h");
        }
        if self.needs_memory_ops {
            headers.push("cgr_memory_ops.h");
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyforge_ir::{ContainerKey, Type};

    #[test]
    fn a_container_free_module_skips_the_stc_bridge_and_memory_headers() {
        let module = TypedModule { decls: vec![] };
        let registry = ContainerRegistry::new();
        let profile = RuntimeProfile::for_module(&module, &registry);
        assert_eq!(profile.headers(), vec!["cgr_error_handling.h", "cgr_python_ops.h"]);
    }

    #[test]
    fn a_module_with_a_registered_container_pulls_in_the_bridge_headers() {
        let module = TypedModule { decls: vec![] };
        let mut registry = ContainerRegistry::new();
        registry.get_or_register(ContainerKey::List(Type::I64), |_| "vec_int64".to_string());
        let profile = RuntimeProfile::for_module(&module, &registry);
        assert_eq!(
            profile.headers(),
            vec!["cgr_error_handling.h", "cgr_python_ops.h", "cgr_stc_bridge.h", "cgr_memory_ops.h"]
        );
    }
}
