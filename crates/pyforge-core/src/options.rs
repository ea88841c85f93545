use pyforge_annotations::{AnalysisLevel, BoundsChecking, OptimizationLevel, TargetArch};
use serde::{Deserialize, Serialize};

/// Brace placement for emitted blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BracePlacement {
    #[default]
    Attach,
    NextLine,
}

/// Where `*` lands relative to a pointer declaration's base type and name
///, e.g. `int* p` (left), `int * p` (middle),
/// `int *p` (right).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PointerAlignment {
    Left,
    Middle,
    #[default]
    Right,
}

/// Top-level knobs for one `translate_module` call ( "Pipeline
/// configuration"). Every field has a default so `Options::default()` is a
/// reasonable "just translate it" baseline; individual fields are overridden
/// by per-function `# pyforge:` pragmas where the two disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Options {
    pub analysis_level: AnalysisLevel,
    pub optimization_level: OptimizationLevel,
    pub target_arch: TargetArch,
    pub default_bounds_checking: BoundsChecking,
    /// Run `pyforge-verify`'s provers at all. Off by default: an SMT pass
    /// changes the complexity class of a translation from "always
    /// terminates" to "may time out", so it's opt-in.
    pub enable_verification: bool,
    pub smt_timeout_ms: u64,
    /// Emit a `/* from: ... */` comment above each function carrying the
    /// originating Python source line range.
    pub emit_source_comments: bool,
    /// Width of one indent level in emitted C, in spaces ( "Style
    /// knobs").
    pub indent_width: usize,
    pub line_width: usize,
    pub brace_placement: BracePlacement,
    pub pointer_alignment: PointerAlignment,
    /// When false, container operations fall back to stub patterns instead
    /// of HPCL calls ( `hpcl.enabled`).
    pub hpcl_enabled: bool,
    pub vector_width: usize,
    /// When true, a module using an `UNSUPPORTED_STATIC`/`UNSUPPORTED_DYNAMIC`
    /// feature still translates, with those occurrences surfaced as warnings
    /// instead of a hard error.
    pub allow_best_effort_stub: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            analysis_level: AnalysisLevel::default(),
            optimization_level: OptimizationLevel::default(),
            target_arch: TargetArch::default(),
            default_bounds_checking: BoundsChecking::default(),
            enable_verification: false,
            smt_timeout_ms: 30_000,
            emit_source_comments: true,
            indent_width: 4,
            line_width: 100,
            brace_placement: BracePlacement::default(),
            pointer_alignment: PointerAlignment::default(),
            hpcl_enabled: true,
            vector_width: 4,
            allow_best_effort_stub: false,
        }
    }
}

impl Options {
    pub fn comprehensive() -> Self {
        Self {
            analysis_level: AnalysisLevel::Comprehensive,
            optimization_level: OptimizationLevel::Aggressive,
            enable_verification: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_does_not_enable_verification() {
        assert!(!Options::default().enable_verification);
    }

    #[test]
    fn comprehensive_enables_verification_and_aggressive_optimization() {
        let opts = Options::comprehensive();
        assert!(opts.enable_verification);
        assert_eq!(opts.optimization_level, OptimizationLevel::Aggressive);
    }
}
