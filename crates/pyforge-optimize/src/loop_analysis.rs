//! `LoopAnalyzer`: classifies every loop in a module into a
//! pattern, estimates iteration counts for literal-bounded counter loops,
//! and flags parallelizable/vectorizable candidates.

use pyforge_ir::{AssignTarget, BinOp, ExprKind, FunctionDecl, Literal, SourceLocation, Stmt, TypedExpr, TypedModule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopClassification {
    SimpleCounter,
    Accumulator,
    ElementWiseMap,
    NestedIteration,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestedTransform {
    Unroll,
    ConvertToCFor,
    VectorizationPrep,
}

#[derive(Debug, Clone)]
pub struct LoopFinding {
    pub function: String,
    pub location: SourceLocation,
    pub classification: LoopClassification,
    pub iteration_count: Option<i64>,
    pub parallelizable: bool,
    pub vectorizable: bool,
    pub suggested_transforms: Vec<SuggestedTransform>,
}

#[derive(Debug, Clone, Default)]
pub struct LoopReport {
    pub success: bool,
    pub performance_gain_estimate: f64,
    pub transformations: Vec<String>,
    pub findings: Vec<LoopFinding>,
}

pub struct LoopAnalyzer;

impl LoopAnalyzer {
    pub fn analyze(module: &TypedModule) -> LoopReport {
        let mut report = LoopReport { success: true, ..Default::default() };
        for f in module.functions() {
            scan_body(&f.name, &f.body, false, &mut report);
        }
        // Product of each finding's own per-transform factor, capped at 5x
        //.
        let mut gain = 1.0_f64;
        for finding in &report.findings {
            for transform in &finding.suggested_transforms {
                gain *= transform_factor(*transform, &finding.classification);
            }
            report.transformations.push(format!(
                "{}@{}: {:?} ({} transforms)",
                finding.function,
                finding.location,
                finding.classification,
                finding.suggested_transforms.len()
            ));
        }
        report.performance_gain_estimate = gain.min(5.0);
        report
    }
}

fn transform_factor(transform: SuggestedTransform, classification: &LoopClassification) -> f64 {
    match transform {
        SuggestedTransform::Unroll => 1.15,
        SuggestedTransform::ConvertToCFor => 1.05,
        SuggestedTransform::VectorizationPrep if *classification == LoopClassification::ElementWiseMap => 2.0,
        SuggestedTransform::VectorizationPrep => 1.3,
    }
}

fn scan_body(function: &str, body: &[Stmt], nested: bool, report: &mut LoopReport) {
    for stmt in body {
        match stmt {
            Stmt::ForRange { var, start, stop, step, body: inner, loc } => {
                let finding = classify_for_range(function, var, start, stop, step, inner, nested, *loc);
                scan_body(function, inner, true, report);
                report.findings.push(finding);
            }
            Stmt::ForContainer { var, body: inner, loc, .. } => {
                let finding = classify_for_container(function, var, inner, nested, *loc);
                scan_body(function, inner, true, report);
                report.findings.push(finding);
            }
            Stmt::While { body: inner, loc, .. } => {
                let finding = LoopFinding {
                    function: function.to_string(),
                    location: *loc,
                    classification: LoopClassification::Complex,
                    iteration_count: None,
                    parallelizable: false,
                    vectorizable: false,
                    suggested_transforms: Vec::new(),
                };
                scan_body(function, inner, true, report);
                report.findings.push(finding);
            }
            Stmt::If { then_body, else_body, .. } => {
                scan_body(function, then_body, nested, report);
                if let Some(e) = else_body {
                    scan_body(function, e, nested, report);
                }
            }
            _ => {}
        }
    }
}

fn classify_for_range(
    function: &str,
    var: &str,
    start: &TypedExpr,
    stop: &TypedExpr,
    step: &TypedExpr,
    body: &[Stmt],
    nested: bool,
    loc: SourceLocation,
) -> LoopFinding {
    let iteration_count = literal_iteration_count(start, stop, step);
    let has_call = body_has_call(body);
    let has_early_exit = body_has_early_exit(body);
    let carried = has_loop_carried_dependency(var, body);

    let classification = if nested || body.iter().any(contains_loop) {
        LoopClassification::NestedIteration
    } else if is_accumulator_pattern(body) {
        LoopClassification::Accumulator
    } else if is_element_wise_map(body) {
        LoopClassification::ElementWiseMap
    } else if !has_call && !has_early_exit && !carried {
        LoopClassification::SimpleCounter
    } else {
        LoopClassification::Complex
    };

    let parallelizable = !carried && !has_early_exit && !has_call;
    let vectorizable = parallelizable && !body.iter().any(contains_branch) && has_uniform_stride(body);

    let mut transforms = vec![SuggestedTransform::ConvertToCFor];
    if iteration_count.is_some_and(|n| n <= 8) {
        transforms.push(SuggestedTransform::Unroll);
    }
    if vectorizable {
        transforms.push(SuggestedTransform::VectorizationPrep);
    }

    LoopFinding {
        function: function.to_string(),
        location: loc,
        classification,
        iteration_count,
        parallelizable,
        vectorizable,
        suggested_transforms: transforms,
    }
}

fn classify_for_container(
    function: &str,
    _var: &str,
    body: &[Stmt],
    nested: bool,
    loc: SourceLocation,
) -> LoopFinding {
    let has_call = body_has_call(body);
    let has_early_exit = body_has_early_exit(body);

    let classification = if nested || body.iter().any(contains_loop) {
        LoopClassification::NestedIteration
    } else if is_accumulator_pattern(body) {
        LoopClassification::Accumulator
    } else if is_element_wise_map(body) {
        LoopClassification::ElementWiseMap
    } else {
        LoopClassification::Complex
    };

    let parallelizable = !has_early_exit && !has_call;
    let vectorizable = parallelizable && !body.iter().any(contains_branch);

    LoopFinding {
        function: function.to_string(),
        location: loc,
        classification,
        iteration_count: None,
        parallelizable,
        vectorizable,
        suggested_transforms: if vectorizable {
            vec![SuggestedTransform::VectorizationPrep]
        } else {
            Vec::new()
        },
    }
}

fn literal_iteration_count(start: &TypedExpr, stop: &TypedExpr, step: &TypedExpr) -> Option<i64> {
    let (ExprKind::Literal(Literal::Int(start)), ExprKind::Literal(Literal::Int(stop)), ExprKind::Literal(Literal::Int(step))) =
        (&start.kind, &stop.kind, &step.kind)
    else {
        return None;
    };
    if *step == 0 {
        return None;
    }
    let span = stop - start;
    let count = span / step + i64::from(span % step != 0);
    Some(count.max(0))
}

fn contains_loop(stmt: &Stmt) -> bool {
    matches!(stmt, Stmt::ForRange { .. } | Stmt::ForContainer { .. } | Stmt::While { .. })
}

fn contains_branch(stmt: &Stmt) -> bool {
    matches!(stmt, Stmt::If { .. })
}

fn body_has_call(body: &[Stmt]) -> bool {
    body.iter().any(|s| match s {
        Stmt::ExprStmt { value, .. } | Stmt::Assign { value, .. } | Stmt::AugAssign { value, .. } => {
            expr_has_call(value)
        }
        Stmt::If { then_body, else_body, .. } => {
            body_has_call(then_body) || else_body.as_deref().is_some_and(body_has_call)
        }
        _ => false,
    })
}

fn expr_has_call(expr: &TypedExpr) -> bool {
    match &expr.kind {
        ExprKind::Call { .. } | ExprKind::MethodCall { .. } => true,
        ExprKind::Binary { left, right, .. } | ExprKind::Compare { left, right, .. } => {
            expr_has_call(left) || expr_has_call(right)
        }
        ExprKind::Unary { operand, .. } => expr_has_call(operand),
        ExprKind::Subscript { base, index } => expr_has_call(base) || expr_has_call(index),
        _ => false,
    }
}

fn body_has_early_exit(body: &[Stmt]) -> bool {
    body.iter().any(|s| match s {
        Stmt::Break(_) | Stmt::Return { .. } => true,
        Stmt::If { then_body, else_body, .. } => {
            body_has_early_exit(then_body) || else_body.as_deref().is_some_and(body_has_early_exit)
        }
        _ => false,
    })
}

/// A loop-carried dependency exists when the induction variable is read by
/// anything other than a subscript index or the loop header itself (spec
/// §4.5.2's "no loop-carried dependency" parallelizability condition).
fn has_loop_carried_dependency(var: &str, body: &[Stmt]) -> bool {
    body.iter().any(|s| match s {
        Stmt::Assign { target, .. } => target.as_name() == Some(var),
        Stmt::AugAssign { target, .. } => target == var,
        _ => false,
    })
}

/// `s = s op a[i]` or `s += a[i]`: a single accumulator variable updated
/// each iteration from a subscript read, with nothing else assigned.
fn is_accumulator_pattern(body: &[Stmt]) -> bool {
    let assigns: Vec<&str> = body
        .iter()
        .filter_map(|s| match s {
            Stmt::AugAssign { target, .. } => Some(target.as_str()),
            Stmt::Assign { target, value, .. } => {
                target.as_name().filter(|name| expr_reads_name(value, name))
            }
            _ => None,
        })
        .collect();
    assigns.len() == 1 && body.len() == 1
}

fn expr_reads_name(expr: &TypedExpr, name: &str) -> bool {
    match &expr.kind {
        ExprKind::Name(n) => n == name,
        ExprKind::Binary { left, right, .. } => expr_reads_name(left, name) || expr_reads_name(right, name),
        _ => false,
    }
}

/// `c[i] = a[i] op b[i]` or `b[i] = a[i]`: the sole statement writes a
/// subscript whose value reads only subscripts (or literals), none of
/// which is the output target itself.
fn is_element_wise_map(body: &[Stmt]) -> bool {
    let [Stmt::Assign { target: _, value, .. }] = body else { return false };
    matches!(&value.kind, ExprKind::Subscript { .. })
        || matches!(&value.kind, ExprKind::Binary { left, right, .. }
            if matches!(left.kind, ExprKind::Subscript { .. }) && matches!(right.kind, ExprKind::Subscript { .. }))
}

/// Conservative stand-in for a real stride analysis: true unless the body
/// contains a subscript whose index is anything other than a bare name or
/// a name plus/minus a literal offset (i.e. not an affine function of a
/// single induction variable).
fn has_uniform_stride(body: &[Stmt]) -> bool {
    body.iter().all(|s| match s {
        Stmt::Assign { value, .. } | Stmt::AugAssign { value, .. } | Stmt::ExprStmt { value, .. } => {
            expr_has_uniform_stride(value)
        }
        _ => true,
    })
}

fn expr_has_uniform_stride(expr: &TypedExpr) -> bool {
    match &expr.kind {
        ExprKind::Subscript { index, .. } => is_affine_index(index),
        ExprKind::Binary { op: BinOp::Mul, left, right, .. } => {
            expr_has_uniform_stride(left) && expr_has_uniform_stride(right)
        }
        ExprKind::Binary { left, right, .. } => expr_has_uniform_stride(left) && expr_has_uniform_stride(right),
        _ => true,
    }
}

fn is_affine_index(index: &TypedExpr) -> bool {
    match &index.kind {
        ExprKind::Name(_) | ExprKind::Literal(_) => true,
        ExprKind::Binary { op: BinOp::Add | BinOp::Sub, left, right, .. } => {
            matches!(left.kind, ExprKind::Name(_)) && matches!(right.kind, ExprKind::Literal(_))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyforge_ir::{Decl, FunctionProperties, Param, Type};

    fn loc() -> SourceLocation {
        SourceLocation::new(1, 0)
    }

    fn name(n: &str) -> TypedExpr {
        TypedExpr::new(ExprKind::Name(n.to_string()), Type::I64, loc())
    }

    fn int_lit(n: i64) -> TypedExpr {
        TypedExpr::new(ExprKind::Literal(Literal::Int(n)), Type::I64, loc())
    }

    fn module_with(f: FunctionDecl) -> TypedModule {
        TypedModule { decls: vec![Decl::Function(f)] }
    }

    #[test]
    fn literal_bounded_counter_loop_computes_iteration_count() {
        let body = vec![Stmt::Pass(loc())];
        let f = FunctionDecl {
            name: "f".to_string(),
            params: vec![],
            ret_type: Type::Void,
            body: vec![Stmt::ForRange {
                var: "i".to_string(),
                start: int_lit(0),
                stop: int_lit(8),
                step: int_lit(1),
                body,
                loc: loc(),
            }],
            properties: FunctionProperties::default(),
            annotations: Default::default(),
            loc: loc(),
        };
        let report = LoopAnalyzer::analyze(&module_with(f));
        assert_eq!(report.findings[0].iteration_count, Some(8));
        assert!(report.findings[0].suggested_transforms.contains(&SuggestedTransform::Unroll));
    }

    #[test]
    fn accumulator_pattern_is_classified_correctly() {
        let accum = Stmt::AugAssign {
            target: "acc".to_string(),
            op: BinOp::Add,
            value: TypedExpr::new(
                ExprKind::Subscript { base: Box::new(name("xs")), index: Box::new(name("i")) },
                Type::I64,
                loc(),
            ),
            loc: loc(),
        };
        let f = FunctionDecl {
            name: "total".to_string(),
            params: vec![Param { name: "xs".to_string(), ty: Type::List(Box::new(Type::I64)) }],
            ret_type: Type::I64,
            body: vec![Stmt::ForRange {
                var: "i".to_string(),
                start: int_lit(0),
                stop: name("n"),
                step: int_lit(1),
                body: vec![accum],
                loc: loc(),
            }],
            properties: FunctionProperties::default(),
            annotations: Default::default(),
            loc: loc(),
        };
        let report = LoopAnalyzer::analyze(&module_with(f));
        assert_eq!(report.findings[0].classification, LoopClassification::Accumulator);
    }

    #[test]
    fn gain_estimate_is_capped_at_five() {
        let mut report = LoopReport::default();
        for i in 0..20 {
            report.findings.push(LoopFinding {
                function: "f".to_string(),
                location: loc(),
                classification: LoopClassification::ElementWiseMap,
                iteration_count: None,
                parallelizable: true,
                vectorizable: true,
                suggested_transforms: vec![SuggestedTransform::VectorizationPrep],
            });
            let _ = i;
        }
        let mut gain = 1.0_f64;
        for finding in &report.findings {
            for t in &finding.suggested_transforms {
                gain *= transform_factor(*t, &finding.classification);
            }
        }
        assert!(gain.min(5.0) <= 5.0);
    }
}
