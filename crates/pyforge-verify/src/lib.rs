//! The "Verifiers" share of the intelligence layer: the SMT formula
//! algebra every prover shares, plus the three closed verifier passes --
//! bounds, correctness, and performance -- each following analyzers'/
//! optimizers' own one-`analyze`-style-entry-point, concrete-report-struct
//! shape rather than returning `serde_json::Value`.
//!
//! An optional verification stage, gated the same way
//! `pyforge-core::Options::enable_verification` gates this crate's passes.

pub mod bounds_prover;
pub mod correctness_prover;
pub mod performance_analyzer;
pub mod smt;

pub use bounds_prover::{BoundsProof, BoundsProver, BoundsProverReport, ProofVerdict};
pub use correctness_prover::{
    CorrectnessProof, CorrectnessProver, CorrectnessProverReport, Obligation, ObligationVerdict,
};
pub use performance_analyzer::{
    ComplexityClass, PerformanceAnalysis, PerformanceAnalyzer, PerformanceReport,
};
pub use smt::{CheckResult, Formula, LiteralEvalBackend, Model, MockBackend, SmtBackend, SymValue};

#[cfg(feature = "z3")]
pub use smt::z3_backend::Z3Backend;

/// Picks the live backend for one `translate_module` call (
/// `hpcl.enabled`-style feature gating, applied here to the SMT tier):
/// the real z3 backend when the crate is built with `--features z3`, the
/// mock otherwise. Kept as a thin factory so `pyforge-core` never has to
/// `#[cfg]`-branch on this crate's feature itself.
pub fn default_backend() -> Box<dyn SmtBackend> {
    #[cfg(feature = "z3")]
    {
        Box::new(smt::z3_backend::Z3Backend)
    }
    #[cfg(not(feature = "z3"))]
    {
        Box::new(MockBackend)
    }
}
