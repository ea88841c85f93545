//! The pyforge translator core: Python-subset frontend, the fixed
//! intelligence-layer pass order, and the C emitter, wired together behind
//! the single [`translate_module`] entry point.
//!
//! The one place that owns pass sequencing — every analyzer/optimizer/
//! verifier module stays ignorant of its position in the pipeline, seeing
//! only its own report-producing contract, never each other.

pub mod error;
pub mod frontend;
pub mod hpcl;
pub mod ir_builder;
pub mod options;
pub mod properties;
pub mod runtime;
pub mod subset_validator;
pub mod type_inference;

mod c_emitter;

pub use error::{ErrorKind, TranslateError, TranslateResult};
pub use options::Options;

use ir_builder::IrBuilder;
use properties::PropertyAnalyzer;
use pyforge_analyzer::{
    AnalysisContext, BoundsChecker, BoundsReport, CallGraphAnalyzer, CallGraphReport,
    ControlFlowAnalyzer, ControlFlowReport, SymbolicExecReport, SymbolicExecutor,
};
use pyforge_ir::TypedModule;
use pyforge_optimize::{
    CompileTimeEvaluator, ConstEvalReport, FunctionSpecializer, LoopAnalyzer, LoopReport,
    SpecializeReport, VectorizationDetector,
};
use subset_validator::{FeatureTier, SubsetValidator, ValidationReport};
use type_inference::TypeInferencer;

/// How severe one entry in [`TranslationResult::issues`] is (
/// "Propagation policy"). `Error` only ever appears alongside
/// `success=false`; `Warning` and `Info` never flip `success`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Error,
    Warning,
    Info,
}

/// One entry in `TranslationResult.issues`. `location` is a
/// best-effort `file:line:column`; absent for module-wide findings (e.g. a
/// low-confidence pass run on the whole module).
#[derive(Debug, Clone)]
pub struct Issue {
    pub severity: IssueSeverity,
    pub message: String,
    pub location: Option<error::SourceSpan>,
}

impl Issue {
    fn error(message: impl Into<String>) -> Self {
        Self { severity: IssueSeverity::Error, message: message.into(), location: None }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self { severity: IssueSeverity::Warning, message: message.into(), location: None }
    }

    fn info(message: impl Into<String>) -> Self {
        Self { severity: IssueSeverity::Info, message: message.into(), location: None }
    }

    fn from_translate_error(err: &TranslateError) -> Self {
        Self {
            severity: IssueSeverity::Error,
            message: err.to_string(),
            location: err.location.clone(),
        }
    }
}

/// Every pass's own report, collected as the pipeline runs (
/// "per-pass reports"). A field stays `None` when its pass never ran --
/// either because a hard error aborted the pipeline before the
/// intelligence layer, or (for the three `pyforge-verify` fields) because
/// `Options::enable_verification` was off.
#[derive(Debug, Clone, Default)]
pub struct PassReports {
    pub control_flow: Option<ControlFlowReport>,
    pub bounds: Option<BoundsReport>,
    pub call_graph: Option<CallGraphReport>,
    pub symbolic: Option<SymbolicExecReport>,
    pub const_eval: Option<ConstEvalReport>,
    pub loop_analysis: Option<LoopReport>,
    pub specialize: Option<SpecializeReport>,
    pub vectorize: Option<pyforge_optimize::VectorizeReport>,
    pub subset_validation: Option<ValidationReport>,
    pub bounds_proof: Option<pyforge_verify::BoundsProverReport>,
    pub correctness: Option<pyforge_verify::CorrectnessProverReport>,
    pub performance: Option<pyforge_verify::PerformanceReport>,
}

#[derive(Debug, Clone, Default)]
pub struct TranslationResult {
    pub c_source: String,
    pub pass_reports: PassReports,
    pub success: bool,
    pub issues: Vec<Issue>,
}

/// Translates one Python module's source text to C ( "Primary
/// entry point"). A single batch call: no component suspends or emits
/// partial output across invocations ( "single-threaded
/// cooperative").
pub fn translate_module(source: &str, options: &Options) -> TranslationResult {
    let mut result = TranslationResult::default();

    let (module, validation_report) = match build_typed_module(source, options, &mut result.issues) {
        Some(m) => m,
        None => {
            result.success = false;
            return result;
        }
    };

    for occurrence in &validation_report.occurrences {
        match occurrence.tier {
            FeatureTier::Supported => {}
            FeatureTier::SupportedWithRewrite => result.issues.push(Issue::info(format!(
                "`{}` requires a rewrite pass before emission",
                occurrence.feature
            ))),
            FeatureTier::UnsupportedStatic | FeatureTier::UnsupportedDynamic => {
                result.issues.push(Issue::warning(format!(
                    "`{}` is outside the supported subset; emitted output is a best-effort stub",
                    occurrence.feature
                )))
            }
        }
    }
    result.pass_reports.subset_validation = Some(validation_report);

    result.success = true;
    run_pipeline(module, options, &mut result);
    result
}

/// Runs the frontend through subset validation: parse, AST-bridge, infer
/// types, validate, normalize. Validation runs before `IrBuilder`'s
/// normalization pass so it can still classify the transient
/// `AugAssign`/`Comprehension` node shapes `IrBuilder` lowers away (spec
/// §4.2, §4.3). Any fatal error aborts here with no IR returned (
/// "no C is emitted" on a hard error); this function records the single
/// error that stopped the pipeline into `issues`.
fn build_typed_module(
    source: &str,
    options: &Options,
    issues: &mut Vec<Issue>,
) -> Option<(TypedModule, ValidationReport)> {
    let parsed = frontend::parse_source(source, "<module>")
        .inspect_err(|e| issues.push(Issue::from_translate_error(e)))
        .ok()?;
    let mut module = frontend::convert_module(parsed, source)
        .inspect_err(|e| issues.push(Issue::from_translate_error(e)))
        .ok()?;
    TypeInferencer::infer_module(&mut module)
        .inspect_err(|e| issues.push(Issue::from_translate_error(e)))
        .ok()?;
    let validation_report = SubsetValidator::validate_module(&module, options.allow_best_effort_stub)
        .inspect_err(|e| issues.push(Issue::from_translate_error(e)))
        .ok()?;
    IrBuilder::normalize_module(&mut module)
        .inspect_err(|e| issues.push(Issue::from_translate_error(e)))
        .ok()?;
    Some((module, validation_report))
}

/// The intelligence layer plus emission, run once the frontend has
/// produced a validated [`TypedModule`]. Fixed pass order:
/// control-flow -> bounds -> call-graph -> symbolic-execution ->
/// compile-time-eval -> loop-analysis -> function-specialization ->
/// vectorization -> verifiers -> emission.
fn run_pipeline(mut module: TypedModule, options: &Options, result: &mut TranslationResult) {
    PropertyAnalyzer::compute_module(&mut module);

    let ctx = AnalysisContext::new(&module, options.analysis_level);
    let control_flow = ControlFlowAnalyzer::analyze(&ctx);

    let bounds = BoundsChecker::analyze(&ctx);
    for finding in &bounds.findings {
        if matches!(finding.safety, pyforge_analyzer::BoundsSafety::Unsafe) {
            result.issues.push(Issue::warning(format!(
                "{}: `{}` is provably out of bounds ({})",
                finding.function, finding.expression, finding.reason
            )));
        }
    }

    let call_graph = CallGraphAnalyzer::analyze(&ctx);
    PropertyAnalyzer::apply_recursion(&mut module, &call_graph.recursive_functions);
    // Recomputing the context after mutating `module.decls[*].properties`
    // is unnecessary: `AnalysisContext` only ever reads `decls`/`body`, and
    // no analyzer after this point reads `properties` through `ctx` --
    // `FunctionSpecializer` and `PerformanceAnalyzer` below take `module`
    // directly instead.
    let symbolic = SymbolicExecutor::analyze(&ctx);
    for summary in &symbolic.functions {
        for path in summary.division_by_zero_paths() {
            result.issues.push(Issue::warning(format!(
                "{}: possible division by zero in `{}`",
                summary.function,
                path.conditions.last().cloned().unwrap_or_default()
            )));
        }
    }

    let const_eval = CompileTimeEvaluator::analyze(&module);
    CompileTimeEvaluator::apply(&mut module);
    let loop_report = LoopAnalyzer::analyze(&module);
    let specialize = FunctionSpecializer::analyze(&module, &call_graph);
    let vectorize = VectorizationDetector::analyze(&module, &loop_report.findings, options.target_arch);

    let (bounds_proof, correctness, performance) = if options.enable_verification {
        run_verifiers(&module, &bounds, &call_graph, options, &mut result.issues)
    } else {
        (None, None, None)
    };

    match c_emitter::emit_module(&module, options) {
        Ok(c_source) => result.c_source = c_source,
        Err(e) => {
            result.issues.push(Issue::from_translate_error(&e));
            result.success = false;
        }
    }

    result.pass_reports = PassReports {
        control_flow: Some(control_flow),
        bounds: Some(bounds),
        call_graph: Some(call_graph),
        symbolic: Some(symbolic),
        const_eval: Some(const_eval),
        loop_analysis: Some(loop_report),
        specialize: Some(specialize),
        vectorize: Some(vectorize),
        bounds_proof,
        correctness,
        performance,
    };
}

fn run_verifiers(
    module: &TypedModule,
    bounds: &BoundsReport,
    call_graph: &CallGraphReport,
    options: &Options,
    issues: &mut Vec<Issue>,
) -> (
    Option<pyforge_verify::BoundsProverReport>,
    Option<pyforge_verify::CorrectnessProverReport>,
    Option<pyforge_verify::PerformanceReport>,
) {
    let backend = pyforge_verify::default_backend();
    let timeout_ms = options.smt_timeout_ms;

    let bounds_proof = pyforge_verify::BoundsProver::prove(bounds, backend.as_ref(), timeout_ms);
    for proof in &bounds_proof.proofs {
        if let pyforge_verify::ProofVerdict::Refuted(_) = proof.verdict {
            issues.push(Issue::warning(format!(
                "{}: `{}` refuted by the SMT backend -- access is out of bounds on some input",
                proof.function, proof.expression
            )));
        }
    }
    issues.extend(bounds_proof.warnings.iter().cloned().map(Issue::warning));

    let functions_with_specs: Vec<&pyforge_ir::FunctionDecl> =
        module.functions().filter(|f| !f.annotations.formal_spec.is_empty()).collect();
    let correctness = pyforge_verify::CorrectnessProver::prove(&functions_with_specs, backend.as_ref(), timeout_ms);
    issues.extend(correctness.warnings.iter().cloned().map(Issue::warning));

    let performance = pyforge_verify::PerformanceAnalyzer::analyze(module, call_graph);

    (Some(bounds_proof), Some(correctness), Some(performance))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_a_straight_line_function() {
        let result = translate_module("def add(a: int, b: int) -> int:\n    return a + b\n", &Options::default());
        assert!(result.success);
        assert!(result.c_source.contains("add"));
    }

    #[test]
    fn undefined_reference_fails_without_emitting_c() {
        let result = translate_module("def bad() -> int:\n    return undefined + 1\n", &Options::default());
        assert!(!result.success);
        assert!(result.c_source.is_empty());
        assert!(result.issues.iter().any(|i| i.severity == IssueSeverity::Error));
    }

    #[test]
    fn recursive_function_is_flagged_recursive_and_linear() {
        let source = "def f(n: int) -> int:\n    if n <= 1:\n        return 1\n    return n * f(n - 1)\n";
        let result = translate_module(source, &Options::comprehensive());
        assert!(result.success);
        let call_graph = result.pass_reports.call_graph.as_ref().unwrap();
        assert!(call_graph.recursive_functions.contains(&"f".to_string()));
        let performance = result.pass_reports.performance.as_ref().unwrap();
        assert_eq!(performance.analyses[0].time_complexity, pyforge_verify::ComplexityClass::Linear);
    }

    #[test]
    fn constant_expression_is_folded() {
        let result = translate_module("def g() -> int:\n    return 2 + 3 * 4\n", &Options::default());
        assert!(result.success);
        let const_eval = result.pass_reports.const_eval.as_ref().unwrap();
        assert!(!const_eval.findings.is_empty());
        assert!(result.c_source.contains("return 14;"));
    }

    #[test]
    fn division_by_zero_path_surfaces_as_a_warning() {
        let source = "def div(a: int, b: int) -> int:\n    return a / b\n";
        let result = translate_module(source, &Options::comprehensive());
        assert!(result.success);
        assert!(result.issues.iter().any(|i| i.message.contains("division by zero")));
    }

    #[test]
    fn verification_stays_off_by_default() {
        let result = translate_module("def f(n: int) -> int:\n    return n\n", &Options::default());
        assert!(result.pass_reports.bounds_proof.is_none());
        assert!(result.pass_reports.correctness.is_none());
        assert!(result.pass_reports.performance.is_none());
    }
}
