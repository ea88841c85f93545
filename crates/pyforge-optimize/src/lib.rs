//! The "Optimizers" share of the intelligence layer: passes
//! that propose transformations rather than apply them outright, each
//! returning an [`OptimizationResult`] carrying a human-readable
//! transformation list and an estimated performance gain.
//!
//! Same contract shape as `pyforge-analyzer`'s passes (one `analyze`-style
//! entry point per pass, a concrete report struct).

pub mod const_eval;
pub mod loop_analysis;
pub mod specialize;
pub mod vectorize;

pub use const_eval::{CompileTimeEvaluator, ConstEvalReport, FoldedExpression};
pub use loop_analysis::{LoopAnalyzer, LoopClassification, LoopFinding, LoopReport};
pub use specialize::{FunctionSpecializer, SpecializationCandidate, SpecializationKind, SpecializeReport};
pub use vectorize::{VectorKind, VectorizationDetector, VectorizationFinding, VectorizeReport};

/// Shared contract every optimizer pass returns, matching the shape of
/// `pyforge-analyzer`'s passes. `transformations` is a textual note rather
/// than a real IR patch for most of these passes: `pyforge-core` surfaces
/// them to the caller as advisory output. `CompileTimeEvaluator` is the one
/// exception — `pyforge-core` realizes its accepted folds into the module
/// before emission, rather than only reporting them.
#[derive(Debug, Clone, Default)]
pub struct OptimizationResult {
    pub success: bool,
    pub performance_gain_estimate: f64,
    pub transformations: Vec<String>,
}

impl OptimizationResult {
    pub fn empty() -> Self {
        Self { success: true, performance_gain_estimate: 1.0, transformations: Vec::new() }
    }
}
