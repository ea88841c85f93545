//! `FunctionSpecializer`: profiles call sites recorded by
//! [`pyforge_analyzer::call_graph`] and proposes specialization candidates
//! — constant-folding, type specialization, inlining, and memoization.
//!
//! Reads a [`pyforge_analyzer::CallGraphReport`] for call-site data instead
//! of re-walking the IR for call expressions a second time.

use pyforge_analyzer::{CallGraphReport, CallSite};
use pyforge_ir::{ExprKind, FunctionDecl, Literal, Stmt, TypedExpr, TypedModule};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecializationKind {
    ConstantFolding,
    TypeSpecialization,
    Inlining,
    Memoization,
}

#[derive(Debug, Clone)]
pub struct SpecializationCandidate {
    pub function: String,
    pub kind: SpecializationKind,
    /// Parameter name for constant-folding/type-specialization candidates;
    /// empty for inlining/memoization, which specialize the whole function.
    pub parameter: Option<String>,
    /// `call-site-coverage * per-call-speedup`, the ordering key spec
    /// §4.5.3 names.
    pub estimated_benefit: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SpecializeReport {
    pub success: bool,
    pub performance_gain_estimate: f64,
    pub transformations: Vec<String>,
    pub candidates: Vec<SpecializationCandidate>,
}

/// Default threshold from a parameter must be a literal
/// constant at this many call sites before a constant-folding
/// specialization is proposed.
const CONST_FOLD_CALL_SITE_THRESHOLD: usize = 3;
/// Default threshold: function body must be at or under this many AST
/// nodes to be a candidate for inlining.
const INLINE_NODE_BUDGET: usize = 12;

pub struct FunctionSpecializer;

impl FunctionSpecializer {
    pub fn analyze(module: &TypedModule, call_graph: &CallGraphReport) -> SpecializeReport {
        let mut report = SpecializeReport { success: true, ..Default::default() };
        let call_counts = call_counts_by_callee(&call_graph.call_sites);
        let literal_args = literal_args_by_callee_param(module, &call_graph.call_sites);

        for f in module.functions() {
            let total_calls = call_counts.get(&f.name).copied().unwrap_or(0);

            for (param_idx, param) in f.params.iter().enumerate() {
                if let Some(counts) = literal_args.get(&(f.name.clone(), param_idx)) {
                    if let Some((_, count)) = counts.iter().max_by_key(|(_, c)| *c) {
                        if *count >= CONST_FOLD_CALL_SITE_THRESHOLD {
                            let coverage = *count as f64 / total_calls.max(1) as f64;
                            report.candidates.push(SpecializationCandidate {
                                function: f.name.clone(),
                                kind: SpecializationKind::ConstantFolding,
                                parameter: Some(param.name.clone()),
                                estimated_benefit: coverage * 1.5,
                            });
                        }
                    }
                }
            }

            if total_calls >= 1 && count_nodes_in_body(&f.body) <= INLINE_NODE_BUDGET {
                report.candidates.push(SpecializationCandidate {
                    function: f.name.clone(),
                    kind: SpecializationKind::Inlining,
                    parameter: None,
                    estimated_benefit: (total_calls as f64).sqrt(),
                });
            }

            if f.properties.is_pure && f.params.iter().all(|p| p.ty.is_numeric() || p.ty == pyforge_ir::Type::CStr) {
                report.candidates.push(SpecializationCandidate {
                    function: f.name.clone(),
                    kind: SpecializationKind::Memoization,
                    parameter: None,
                    estimated_benefit: if f.properties.is_recursive { 2.0 } else { 1.2 },
                });
            }
        }

        report
            .candidates
            .sort_by(|a, b| b.estimated_benefit.partial_cmp(&a.estimated_benefit).unwrap_or(std::cmp::Ordering::Equal));
        for c in &report.candidates {
            report.transformations.push(format!("{}: {:?} (benefit {:.2})", c.function, c.kind, c.estimated_benefit));
        }
        report.performance_gain_estimate = 1.0 + report.candidates.iter().map(|c| c.estimated_benefit).sum::<f64>() * 0.1;
        report
    }
}

fn call_counts_by_callee(sites: &[CallSite]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for site in sites {
        *counts.entry(site.callee.clone()).or_insert(0) += 1;
    }
    counts
}

/// For every `(callee, parameter-index)` pair, a histogram of which literal
/// value was passed and how many call sites passed it — the data
/// `ConstantFolding` candidates need to find a parameter that is constant
/// at `>= N` call sites.
fn literal_args_by_callee_param(
    module: &TypedModule,
    sites: &[CallSite],
) -> HashMap<(String, usize), HashMap<String, usize>> {
    let mut histogram: HashMap<(String, usize), HashMap<String, usize>> = HashMap::new();
    for f in module.functions() {
        for site in sites.iter().filter(|s| s.caller == f.name) {
            if let Some(args) = find_call_args(&f.body, &site.callee) {
                for (idx, arg) in args.iter().enumerate() {
                    if let ExprKind::Literal(lit) = &arg.kind {
                        *histogram.entry((site.callee.clone(), idx)).or_default().entry(describe(lit)).or_insert(0) += 1;
                    }
                }
            }
        }
    }
    histogram
}

fn find_call_args<'a>(body: &'a [Stmt], callee: &str) -> Option<&'a [TypedExpr]> {
    for stmt in body {
        let expr = match stmt {
            Stmt::Assign { value, .. } | Stmt::AugAssign { value, .. } | Stmt::ExprStmt { value, .. } => Some(value),
            Stmt::Return { value: Some(v), .. } => Some(v),
            _ => None,
        };
        if let Some(expr) = expr {
            if let ExprKind::Call { func, args } = &expr.kind {
                if func == callee {
                    return Some(args);
                }
            }
        }
        let nested = match stmt {
            Stmt::If { then_body, else_body, .. } => {
                find_call_args(then_body, callee).or_else(|| else_body.as_deref().and_then(|e| find_call_args(e, callee)))
            }
            Stmt::While { body, .. } | Stmt::ForRange { body, .. } | Stmt::ForContainer { body, .. } => {
                find_call_args(body, callee)
            }
            _ => None,
        };
        if nested.is_some() {
            return nested;
        }
    }
    None
}

/// A coarse AST-node count (this pass's "≤ M AST nodes" inlining gate):
/// one unit per statement plus one per expression node it contains.
fn count_nodes_in_body(body: &[Stmt]) -> usize {
    body.iter()
        .map(|stmt| {
            1 + match stmt {
                Stmt::Assign { value, .. } | Stmt::AugAssign { value, .. } | Stmt::ExprStmt { value, .. } => {
                    count_nodes_in_expr(value)
                }
                Stmt::If { condition, then_body, else_body, .. } => {
                    count_nodes_in_expr(condition)
                        + count_nodes_in_body(then_body)
                        + else_body.as_deref().map_or(0, count_nodes_in_body)
                }
                Stmt::While { condition, body, .. } => count_nodes_in_expr(condition) + count_nodes_in_body(body),
                Stmt::ForRange { start, stop, step, body, .. } => {
                    count_nodes_in_expr(start) + count_nodes_in_expr(stop) + count_nodes_in_expr(step) + count_nodes_in_body(body)
                }
                Stmt::ForContainer { iter, body, .. } => count_nodes_in_expr(iter) + count_nodes_in_body(body),
                Stmt::Return { value: Some(v), .. } => count_nodes_in_expr(v),
                Stmt::Assert { condition, message, .. } => {
                    count_nodes_in_expr(condition) + message.as_ref().map_or(0, count_nodes_in_expr)
                }
                Stmt::Return { value: None, .. } | Stmt::Break(_) | Stmt::Continue(_) | Stmt::Pass(_) => 0,
            }
        })
        .sum()
}

fn count_nodes_in_expr(expr: &TypedExpr) -> usize {
    1 + match &expr.kind {
        ExprKind::Binary { left, right, .. } | ExprKind::Compare { left, right, .. } => {
            count_nodes_in_expr(left) + count_nodes_in_expr(right)
        }
        ExprKind::Unary { operand, .. } => count_nodes_in_expr(operand),
        ExprKind::BoolOp { values, .. } => values.iter().map(count_nodes_in_expr).sum(),
        ExprKind::Call { args, .. } => args.iter().map(count_nodes_in_expr).sum(),
        ExprKind::MethodCall { object, args, .. } => {
            count_nodes_in_expr(object) + args.iter().map(count_nodes_in_expr).sum::<usize>()
        }
        ExprKind::Subscript { base, index } => count_nodes_in_expr(base) + count_nodes_in_expr(index),
        ExprKind::Slice { base, start, stop, step } => {
            count_nodes_in_expr(base)
                + [start, stop, step].into_iter().flatten().map(|e| count_nodes_in_expr(e)).sum::<usize>()
        }
        ExprKind::Attribute { value, .. } => count_nodes_in_expr(value),
        ExprKind::Container(lit) => match lit {
            pyforge_ir::ContainerLiteral::List(elts) | pyforge_ir::ContainerLiteral::Set(elts) => {
                elts.iter().map(count_nodes_in_expr).sum()
            }
            pyforge_ir::ContainerLiteral::Dict(entries) => {
                entries.iter().map(|(k, v)| count_nodes_in_expr(k) + count_nodes_in_expr(v)).sum()
            }
        },
        ExprKind::Literal(_) | ExprKind::Name(_) | ExprKind::Comprehension(_) => 0,
    }
}

fn describe(lit: &Literal) -> String {
    match lit {
        Literal::Int(n) => n.to_string(),
        Literal::Float(f) => f.to_string(),
        Literal::Bool(b) => b.to_string(),
        Literal::Str(s) => s.clone(),
        Literal::Null => "null".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyforge_analyzer::{AnalysisContext, CallGraphAnalyzer};
    use pyforge_annotations::AnalysisLevel;
    use pyforge_ir::{Decl, FunctionProperties, Param, SourceLocation, Type};

    fn loc() -> SourceLocation {
        SourceLocation::new(1, 0)
    }

    #[test]
    fn pure_function_with_numeric_params_is_a_memoization_candidate() {
        let f = FunctionDecl {
            name: "square".to_string(),
            params: vec![Param { name: "n".to_string(), ty: Type::I64 }],
            ret_type: Type::I64,
            body: vec![Stmt::Return {
                value: Some(TypedExpr::new(
                    ExprKind::Binary {
                        op: pyforge_ir::BinOp::Mul,
                        left: Box::new(TypedExpr::new(ExprKind::Name("n".to_string()), Type::I64, loc())),
                        right: Box::new(TypedExpr::new(ExprKind::Name("n".to_string()), Type::I64, loc())),
                    },
                    Type::I64,
                    loc(),
                )),
                loc: loc(),
            }],
            properties: FunctionProperties { is_pure: true, always_terminates: true, is_recursive: false },
            annotations: Default::default(),
            loc: loc(),
        };
        let m = TypedModule { decls: vec![Decl::Function(f)] };
        let ctx = AnalysisContext::new(&m, AnalysisLevel::Basic);
        let call_graph = CallGraphAnalyzer::analyze(&ctx);
        let report = FunctionSpecializer::analyze(&m, &call_graph);
        assert!(report.candidates.iter().any(|c| c.kind == SpecializationKind::Memoization));
    }

    #[test]
    fn small_called_function_is_an_inlining_candidate() {
        let callee = FunctionDecl {
            name: "inc".to_string(),
            params: vec![Param { name: "n".to_string(), ty: Type::I64 }],
            ret_type: Type::I64,
            body: vec![Stmt::Return {
                value: Some(TypedExpr::new(
                    ExprKind::Binary {
                        op: pyforge_ir::BinOp::Add,
                        left: Box::new(TypedExpr::new(ExprKind::Name("n".to_string()), Type::I64, loc())),
                        right: Box::new(TypedExpr::new(ExprKind::Literal(Literal::Int(1)), Type::I64, loc())),
                    },
                    Type::I64,
                    loc(),
                )),
                loc: loc(),
            }],
            properties: FunctionProperties::default(),
            annotations: Default::default(),
            loc: loc(),
        };
        let call_expr = TypedExpr::new(
            ExprKind::Call {
                func: "inc".to_string(),
                args: vec![TypedExpr::new(ExprKind::Literal(Literal::Int(1)), Type::I64, loc())],
            },
            Type::I64,
            loc(),
        );
        let caller = FunctionDecl {
            name: "main_fn".to_string(),
            params: vec![],
            ret_type: Type::I64,
            body: vec![Stmt::Return { value: Some(call_expr), loc: loc() }],
            properties: FunctionProperties::default(),
            annotations: Default::default(),
            loc: loc(),
        };
        let m = TypedModule { decls: vec![Decl::Function(caller), Decl::Function(callee)] };
        let ctx = AnalysisContext::new(&m, AnalysisLevel::Basic);
        let call_graph = CallGraphAnalyzer::analyze(&ctx);
        let report = FunctionSpecializer::analyze(&m, &call_graph);
        assert!(report.candidates.iter().any(|c| c.function == "inc" && c.kind == SpecializationKind::Inlining));
    }
}
