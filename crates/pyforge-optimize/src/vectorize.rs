//! `VectorizationDetector`: a SIMD-focused specialization of
//! [`crate::loop_analysis::LoopAnalyzer`] that sub-classifies vectorizable
//! loops, picks a target vector width, and estimates speedup.

use crate::loop_analysis::{LoopClassification, LoopFinding};
use pyforge_annotations::TargetArch;
use pyforge_ir::{AssignTarget, BinOp, ExprKind, FunctionDecl, SourceLocation, Stmt, TypedExpr, TypedModule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorKind {
    ElementWise,
    ArrayCopy,
    Reduction,
    DotProduct,
    Strided,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorConstraint {
    HasControlFlow,
    HasFunctionCall,
    HasAliasingRisk,
    HasDataDependency,
    IrregularAccess,
}

#[derive(Debug, Clone)]
pub struct VectorizationFinding {
    pub function: String,
    pub location: SourceLocation,
    pub kind: VectorKind,
    pub vector_width: usize,
    pub suggested_intrinsic_prefix: &'static str,
    pub estimated_speedup: f64,
    pub active_constraints: Vec<VectorConstraint>,
}

#[derive(Debug, Clone, Default)]
pub struct VectorizeReport {
    pub success: bool,
    pub performance_gain_estimate: f64,
    pub transformations: Vec<String>,
    pub findings: Vec<VectorizationFinding>,
}

pub struct VectorizationDetector;

impl VectorizationDetector {
    /// `loop_findings` is [`crate::LoopAnalyzer`]'s output; this pass only
    /// looks more closely at the subset already flagged `vectorizable`
    /// there, rather than re-deriving loop shape from scratch (
    /// "Specialization of LoopAnalyzer").
    pub fn analyze(module: &TypedModule, loop_findings: &[LoopFinding], target: TargetArch) -> VectorizeReport {
        let mut report = VectorizeReport { success: true, ..Default::default() };
        let width = vector_width_for(target);

        for loop_finding in loop_findings.iter().filter(|f| f.vectorizable) {
            let Some(body) = find_loop_body(module, &loop_finding.function, loop_finding.location) else {
                continue;
            };
            let kind = classify_vector_kind(body);
            let constraints = active_constraints(body);
            let efficiency = (1.0 - 0.2 * constraints.len() as f64).max(0.0);
            let finding = VectorizationFinding {
                function: loop_finding.function.clone(),
                location: loop_finding.location,
                kind,
                vector_width: width,
                suggested_intrinsic_prefix: intrinsic_prefix(target),
                estimated_speedup: width as f64 * efficiency,
                active_constraints: constraints,
            };
            report.transformations.push(format!(
                "{}@{}: {:?} width={} speedup={:.2}x",
                finding.function, finding.location, finding.kind, finding.vector_width, finding.estimated_speedup
            ));
            report.findings.push(finding);
        }

        report.performance_gain_estimate = report
            .findings
            .iter()
            .map(|f| f.estimated_speedup)
            .fold(1.0_f64, f64::max);
        report
    }
}

/// x86_64 defaults to SSE width per the enumerated table (,
/// §8 scenario 4); ARM has only the one NEON entry.
fn vector_width_for(target: TargetArch) -> usize {
    match target {
        TargetArch::X86_64 => 4,
        TargetArch::Arm => 4,
    }
}

fn intrinsic_prefix(target: TargetArch) -> &'static str {
    match target {
        TargetArch::X86_64 => "_mm256_",
        TargetArch::Arm => "vld1q_",
    }
}

fn find_loop_body<'a>(module: &'a TypedModule, function: &str, location: SourceLocation) -> Option<&'a [Stmt]> {
    let f = module.find_function(function)?;
    find_body_at(&f.body, location)
}

fn find_body_at(body: &[Stmt], location: SourceLocation) -> Option<&[Stmt]> {
    for stmt in body {
        match stmt {
            Stmt::ForRange { body: inner, loc, .. } | Stmt::ForContainer { body: inner, loc, .. } => {
                if *loc == location {
                    return Some(inner);
                }
                if let Some(found) = find_body_at(inner, location) {
                    return Some(found);
                }
            }
            Stmt::While { body: inner, loc, .. } => {
                if *loc == location {
                    return Some(inner);
                }
                if let Some(found) = find_body_at(inner, location) {
                    return Some(found);
                }
            }
            Stmt::If { then_body, else_body, .. } => {
                if let Some(found) = find_body_at(then_body, location) {
                    return Some(found);
                }
                if let Some(e) = else_body {
                    if let Some(found) = find_body_at(e, location) {
                        return Some(found);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

fn classify_vector_kind(body: &[Stmt]) -> VectorKind {
    let [Stmt::Assign { target, value, .. }] = body else {
        return strided_or_fallback(body);
    };
    let Some(target_name) = target.as_name() else {
        return strided_or_fallback(body);
    };
    match &value.kind {
        ExprKind::Subscript { .. } => VectorKind::ArrayCopy,
        ExprKind::Binary { op: BinOp::Add, left, right } => {
            // `s = s + <term>` (the accumulator-pattern shape `s += <term>`
            // desugars to, ) -- the self-reference can land on
            // either side.
            let is_self_ref = |e: &TypedExpr| matches!(&e.kind, ExprKind::Name(n) if n == target_name);
            if let Some(term) = [left, right].into_iter().find(|e| !is_self_ref(e)) {
                if [left, right].into_iter().any(|e| is_self_ref(e)) {
                    return match accumulator_term_kind(term) {
                        Some(kind) => kind,
                        None => elementwise_or_strided(left, right),
                    };
                }
            }
            elementwise_or_strided(left, right)
        }
        ExprKind::Binary { left, right, .. } => elementwise_or_strided(left, right),
        _ => VectorKind::Strided,
    }
}

/// Classifies the non-accumulator term of `s = s + <term>`: a bare
/// subscript read is a running sum (`Reduction`), a product of two
/// subscript reads is a dot product ( scenario 4's `s = s +
/// a[i]*b[i]`), anything else falls through to the caller's generic check.
fn accumulator_term_kind(term: &TypedExpr) -> Option<VectorKind> {
    match &term.kind {
        ExprKind::Subscript { .. } => Some(VectorKind::Reduction),
        ExprKind::Binary { op: BinOp::Mul, left, right }
            if matches!(left.kind, ExprKind::Subscript { .. }) && matches!(right.kind, ExprKind::Subscript { .. }) =>
        {
            Some(VectorKind::DotProduct)
        }
        _ => None,
    }
}

fn elementwise_or_strided(left: &TypedExpr, right: &TypedExpr) -> VectorKind {
    let left_sub = matches!(left.kind, ExprKind::Subscript { .. });
    let right_sub = matches!(right.kind, ExprKind::Subscript { .. });
    if left_sub && right_sub {
        VectorKind::ElementWise
    } else {
        VectorKind::Strided
    }
}

fn strided_or_fallback(body: &[Stmt]) -> VectorKind {
    if body.iter().any(|s| matches!(s, Stmt::AugAssign { .. })) {
        VectorKind::Reduction
    } else {
        VectorKind::Strided
    }
}

fn active_constraints(body: &[Stmt]) -> Vec<VectorConstraint> {
    let mut constraints = Vec::new();
    if body.iter().any(|s| matches!(s, Stmt::If { .. } | Stmt::While { .. })) {
        constraints.push(VectorConstraint::HasControlFlow);
    }
    if body.iter().any(stmt_has_call) {
        constraints.push(VectorConstraint::HasFunctionCall);
    }
    constraints
}

fn stmt_has_call(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Assign { value, .. } | Stmt::AugAssign { value, .. } | Stmt::ExprStmt { value, .. } => {
            expr_has_call(value)
        }
        _ => false,
    }
}

fn expr_has_call(expr: &TypedExpr) -> bool {
    match &expr.kind {
        ExprKind::Call { .. } | ExprKind::MethodCall { .. } => true,
        ExprKind::Binary { left, right, .. } => expr_has_call(left) || expr_has_call(right),
        ExprKind::Subscript { base, index } => expr_has_call(base) || expr_has_call(index),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loop_analysis::LoopClassification;
    use pyforge_ir::{Decl, Literal, Param, Type};

    fn loc() -> SourceLocation {
        SourceLocation::new(2, 4)
    }

    fn name(n: &str) -> TypedExpr {
        TypedExpr::new(ExprKind::Name(n.to_string()), Type::I64, loc())
    }

    #[test]
    fn element_wise_body_is_classified_as_element_wise() {
        let write = TypedExpr::new(
            ExprKind::Binary {
                op: BinOp::Add,
                left: Box::new(TypedExpr::new(
                    ExprKind::Subscript { base: Box::new(name("a")), index: Box::new(name("i")) },
                    Type::I64,
                    loc(),
                )),
                right: Box::new(TypedExpr::new(
                    ExprKind::Subscript { base: Box::new(name("b")), index: Box::new(name("i")) },
                    Type::I64,
                    loc(),
                )),
            },
            Type::I64,
            loc(),
        );
        let body = vec![Stmt::Assign { target: AssignTarget::Name("tmp".to_string()), value: write, loc: loc() }];
        let kind = classify_vector_kind(&body);
        assert_eq!(kind, VectorKind::ElementWise);
    }

    #[test]
    fn dot_product_accumulator_pattern_is_classified_as_dot_product() {
        let product = TypedExpr::new(
            ExprKind::Binary {
                op: BinOp::Mul,
                left: Box::new(TypedExpr::new(
                    ExprKind::Subscript { base: Box::new(name("a")), index: Box::new(name("i")) },
                    Type::I64,
                    loc(),
                )),
                right: Box::new(TypedExpr::new(
                    ExprKind::Subscript { base: Box::new(name("b")), index: Box::new(name("i")) },
                    Type::I64,
                    loc(),
                )),
            },
            Type::I64,
            loc(),
        );
        let sum = TypedExpr::new(
            ExprKind::Binary { op: BinOp::Add, left: Box::new(name("s")), right: Box::new(product) },
            Type::I64,
            loc(),
        );
        let body = vec![Stmt::Assign { target: AssignTarget::Name("s".to_string()), value: sum, loc: loc() }];
        let kind = classify_vector_kind(&body);
        assert_eq!(kind, VectorKind::DotProduct);
    }

    #[test]
    fn vector_width_matches_x86_64_sse_default() {
        assert_eq!(vector_width_for(TargetArch::X86_64), 4);
        assert_eq!(vector_width_for(TargetArch::Arm), 4);
    }

    #[test]
    fn speedup_degrades_with_active_constraints() {
        let f = FunctionDecl {
            name: "f".to_string(),
            params: vec![Param { name: "a".to_string(), ty: Type::List(Box::new(Type::I64)) }],
            ret_type: Type::Void,
            body: vec![Stmt::ForRange {
                var: "i".to_string(),
                start: TypedExpr::new(ExprKind::Literal(Literal::Int(0)), Type::I64, loc()),
                stop: name("n"),
                step: TypedExpr::new(ExprKind::Literal(Literal::Int(1)), Type::I64, loc()),
                body: vec![Stmt::If {
                    condition: name("flag"),
                    then_body: vec![],
                    else_body: None,
                    loc: loc(),
                }],
                loc: loc(),
            }],
            properties: pyforge_ir::FunctionProperties::default(),
            annotations: Default::default(),
            loc: loc(),
        };
        let m = TypedModule { decls: vec![Decl::Function(f)] };
        let finding = LoopFinding {
            function: "f".to_string(),
            location: loc(),
            classification: LoopClassification::Complex,
            iteration_count: None,
            parallelizable: true,
            vectorizable: true,
            suggested_transforms: vec![],
        };
        let report = VectorizationDetector::analyze(&m, &[finding], TargetArch::X86_64);
        assert_eq!(report.findings[0].active_constraints, vec![VectorConstraint::HasControlFlow]);
        assert!(report.findings[0].estimated_speedup < 8.0);
    }
}
