//! `PerformanceAnalyzer`: classifies each function's time and
//! space complexity into a fixed ladder by walking its body for loop nesting
//! and recursion shape, a structural-heuristic approach yielding a closed
//! complexity-class enum plus bottleneck/optimization-opportunity prose.

use pyforge_analyzer::CallGraphReport;
use pyforge_ir::{ExprKind, FunctionDecl, Stmt, TypedExpr, TypedModule};

/// The closed complexity ladder, ordered from
/// cheapest to most expensive so `PartialOrd` compares severity directly.
/// `HigherPolynomial` covers any loop nesting depth beyond cubic rather
/// than dead-ending at `Unknown`, since the nesting depth is still known
/// exactly even when it has no one-letter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ComplexityClass {
    Constant,
    Logarithmic,
    Linear,
    Linearithmic,
    Quadratic,
    Cubic,
    HigherPolynomial(u32),
    Exponential,
    Factorial,
    Unknown,
}

impl std::fmt::Display for ComplexityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplexityClass::Constant => write!(f, "O(1)"),
            ComplexityClass::Logarithmic => write!(f, "O(log n)"),
            ComplexityClass::Linear => write!(f, "O(n)"),
            ComplexityClass::Linearithmic => write!(f, "O(n log n)"),
            ComplexityClass::Quadratic => write!(f, "O(n^2)"),
            ComplexityClass::Cubic => write!(f, "O(n^3)"),
            ComplexityClass::HigherPolynomial(k) => write!(f, "O(n^{k})"),
            ComplexityClass::Exponential => write!(f, "O(2^n)"),
            ComplexityClass::Factorial => write!(f, "O(n!)"),
            ComplexityClass::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PerformanceAnalysis {
    pub function: String,
    pub time_complexity: ComplexityClass,
    pub space_complexity: ComplexityClass,
    pub confidence: f64,
    pub bottlenecks: Vec<String>,
    pub optimization_opportunities: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PerformanceReport {
    pub success: bool,
    pub analyses: Vec<PerformanceAnalysis>,
}

pub struct PerformanceAnalyzer;

impl PerformanceAnalyzer {
    /// Classifies every function in `module`, consulting `call_graph` for
    /// each function's self-call count: a single self-call tells O(n)
    /// recursion apart from the two self-calls of O(2^n) recursion.
    pub fn analyze(module: &TypedModule, call_graph: &CallGraphReport) -> PerformanceReport {
        let mut report = PerformanceReport { success: true, ..Default::default() };
        for f in module.functions() {
            report.analyses.push(Self::analyze_function(f, call_graph));
        }
        report
    }

    fn analyze_function(f: &FunctionDecl, call_graph: &CallGraphReport) -> PerformanceAnalysis {
        let self_calls = call_graph
            .call_sites
            .iter()
            .filter(|site| site.caller == f.name && site.callee == f.name)
            .count();
        let max_loop_depth = max_nesting_depth(&f.body);
        let has_loop = max_loop_depth > 0;

        let (time_complexity, confidence) = match (self_calls, max_loop_depth) {
            (0, 0) => (ComplexityClass::Constant, 0.9),
            (0, depth) => (loop_depth_to_class(depth), 0.75),
            (1, 0) if is_halving_recursion(&f.body) => (ComplexityClass::Logarithmic, 0.6),
            (1, _) => (ComplexityClass::Linear, 0.65),
            (n, _) if n >= 2 => (ComplexityClass::Exponential, 0.6),
            _ => (ComplexityClass::Unknown, 0.3),
        };

        let space_complexity = if self_calls > 0 { ComplexityClass::Linear } else { ComplexityClass::Constant };

        let mut bottlenecks = Vec::new();
        if max_loop_depth >= 2 {
            bottlenecks.push(format!("{}: {}-deep nested loop dominates running time", f.name, max_loop_depth));
        }
        if self_calls >= 2 {
            bottlenecks.push(format!("{}: {} recursive self-calls per invocation", f.name, self_calls));
        }

        let mut optimization_opportunities = Vec::new();
        if time_complexity == ComplexityClass::Exponential {
            optimization_opportunities
                .push(format!("{}: memoize to collapse repeated subproblem recomputation", f.name));
        }
        if self_calls == 1 && max_loop_depth == 0 && !is_halving_recursion(&f.body) {
            optimization_opportunities
                .push(format!("{}: convert tail/linear recursion to iteration to bound stack depth", f.name));
        }
        let _ = has_loop;

        PerformanceAnalysis {
            function: f.name.clone(),
            time_complexity,
            space_complexity,
            confidence,
            bottlenecks,
            optimization_opportunities,
        }
    }
}

fn loop_depth_to_class(depth: u32) -> ComplexityClass {
    match depth {
        0 => ComplexityClass::Constant,
        1 => ComplexityClass::Linear,
        2 => ComplexityClass::Quadratic,
        3 => ComplexityClass::Cubic,
        k => ComplexityClass::HigherPolynomial(k),
    }
}

fn max_nesting_depth(body: &[Stmt]) -> u32 {
    body.iter().map(stmt_depth).max().unwrap_or(0)
}

fn stmt_depth(stmt: &Stmt) -> u32 {
    match stmt {
        Stmt::While { body, .. } | Stmt::ForRange { body, .. } | Stmt::ForContainer { body, .. } => {
            1 + max_nesting_depth(body)
        }
        Stmt::If { then_body, else_body, .. } => {
            let then_depth = max_nesting_depth(then_body);
            let else_depth = else_body.as_ref().map(|b| max_nesting_depth(b)).unwrap_or(0);
            then_depth.max(else_depth)
        }
        _ => 0,
    }
}

/// Heuristic for telling the halving recursion binary search exhibits
/// apart from "recursion with single self-call and linear work" (spec
/// §4.6.3): true when some statement builds a call argument out of
/// floor-division by the literal `2`, the idiom `(left + right) // 2`
/// uses.
fn is_halving_recursion(body: &[Stmt]) -> bool {
    body.iter().any(stmt_has_halving_call)
}

fn stmt_has_halving_call(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return { value: Some(expr), .. } | Stmt::ExprStmt { value: expr, .. } => {
            expr_has_halving_call(expr)
        }
        Stmt::If { condition, then_body, else_body, .. } => {
            expr_has_halving_call(condition)
                || then_body.iter().any(stmt_has_halving_call)
                || else_body.as_ref().is_some_and(|b| b.iter().any(stmt_has_halving_call))
        }
        Stmt::Assign { value, .. } => expr_has_halving_call(value),
        _ => false,
    }
}

fn expr_has_halving_call(expr: &TypedExpr) -> bool {
    match &expr.kind {
        ExprKind::Call { args, .. } => args.iter().any(arg_is_floordiv_by_two),
        ExprKind::Binary { left, right, .. } => expr_has_halving_call(left) || expr_has_halving_call(right),
        ExprKind::Unary { operand, .. } => expr_has_halving_call(operand),
        _ => false,
    }
}

fn arg_is_floordiv_by_two(arg: &TypedExpr) -> bool {
    matches!(
        &arg.kind,
        ExprKind::Binary { op: pyforge_ir::BinOp::FloorDiv, right, .. }
            if matches!(&right.kind, ExprKind::Literal(pyforge_ir::Literal::Int(2)))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyforge_analyzer::{AnalysisContext, CallGraphAnalyzer};
    use pyforge_annotations::AnalysisLevel;
    use pyforge_ir::{
        AssignTarget, BinOp, Decl, FunctionProperties, Literal, Param, SourceLocation, Type,
    };

    fn loc() -> SourceLocation {
        SourceLocation::new(1, 0)
    }

    fn name(n: &str, ty: Type) -> TypedExpr {
        TypedExpr::new(ExprKind::Name(n.to_string()), ty, loc())
    }

    fn int_lit(v: i64) -> TypedExpr {
        TypedExpr::new(ExprKind::Literal(Literal::Int(v)), Type::I64, loc())
    }

    fn plain_function(name: &str, body: Vec<Stmt>) -> FunctionDecl {
        FunctionDecl {
            name: name.to_string(),
            params: vec![Param { name: "n".to_string(), ty: Type::I64 }],
            ret_type: Type::I64,
            body,
            properties: FunctionProperties::default(),
            annotations: Default::default(),
            loc: loc(),
        }
    }

    fn report_for(f: FunctionDecl) -> PerformanceReport {
        let m = TypedModule { decls: vec![Decl::Function(f)] };
        let ctx = AnalysisContext::new(&m, AnalysisLevel::Basic);
        let call_graph = CallGraphAnalyzer::analyze(&ctx);
        PerformanceAnalyzer::analyze(&m, &call_graph)
    }

    #[test]
    fn straight_line_function_is_constant() {
        let f = plain_function(
            "f",
            vec![Stmt::Return {
                value: Some(TypedExpr::new(
                    ExprKind::Binary { op: BinOp::Add, left: Box::new(name("n", Type::I64)), right: Box::new(int_lit(1)) },
                    Type::I64,
                    loc(),
                )),
                loc: loc(),
            }],
        );
        let report = report_for(f);
        assert_eq!(report.analyses[0].time_complexity, ComplexityClass::Constant);
    }

    #[test]
    fn single_loop_is_linear() {
        let f = plain_function(
            "total",
            vec![
                Stmt::Assign { target: "acc".to_string(), value: int_lit(0), loc: loc() },
                Stmt::ForContainer {
                    var: "x".to_string(),
                    iter: name("xs", Type::List(Box::new(Type::I64))),
                    body: vec![Stmt::AugAssign {
                        target: "acc".to_string(),
                        op: BinOp::Add,
                        value: name("x", Type::I64),
                        loc: loc(),
                    }],
                    loc: loc(),
                },
                Stmt::Return { value: Some(name("acc", Type::I64)), loc: loc() },
            ],
        );
        let report = report_for(f);
        assert_eq!(report.analyses[0].time_complexity, ComplexityClass::Linear);
    }

    #[test]
    fn doubly_nested_loop_is_quadratic() {
        let inner = Stmt::ForRange {
            var: "j".to_string(),
            start: int_lit(0),
            stop: name("n", Type::I64),
            step: int_lit(1),
            body: vec![Stmt::AugAssign { target: "c".to_string(), op: BinOp::Add, value: int_lit(1), loc: loc() }],
            loc: loc(),
        };
        let outer = Stmt::ForRange {
            var: "i".to_string(),
            start: int_lit(0),
            stop: name("n", Type::I64),
            step: int_lit(1),
            body: vec![inner],
            loc: loc(),
        };
        let f = plain_function(
            "pairs",
            vec![
                Stmt::Assign { target: "c".to_string(), value: int_lit(0), loc: loc() },
                outer,
                Stmt::Return { value: Some(name("c", Type::I64)), loc: loc() },
            ],
        );
        let report = report_for(f);
        assert_eq!(report.analyses[0].time_complexity, ComplexityClass::Quadratic);
        assert!(!report.analyses[0].bottlenecks.is_empty());
    }

    #[test]
    fn two_self_calls_classify_as_exponential_with_memoize_hint() {
        let call = |arg: i64| {
            TypedExpr::new(
                ExprKind::Call {
                    func: "fib".to_string(),
                    args: vec![TypedExpr::new(
                        ExprKind::Binary {
                            op: BinOp::Sub,
                            left: Box::new(name("n", Type::I64)),
                            right: Box::new(int_lit(arg)),
                        },
                        Type::I64,
                        loc(),
                    )],
                },
                Type::I64,
                loc(),
            )
        };
        let body = vec![
            Stmt::If {
                condition: TypedExpr::new(
                    ExprKind::Compare {
                        op: pyforge_ir::CompareOp::LtEq,
                        left: Box::new(name("n", Type::I64)),
                        right: Box::new(int_lit(1)),
                    },
                    Type::Bool,
                    loc(),
                ),
                then_body: vec![Stmt::Return { value: Some(name("n", Type::I64)), loc: loc() }],
                else_body: None,
                loc: loc(),
            },
            Stmt::Return {
                value: Some(TypedExpr::new(
                    ExprKind::Binary { op: BinOp::Add, left: Box::new(call(1)), right: Box::new(call(2)) },
                    Type::I64,
                    loc(),
                )),
                loc: loc(),
            },
        ];
        let f = plain_function("fib", body);
        let report = report_for(f);
        assert_eq!(report.analyses[0].time_complexity, ComplexityClass::Exponential);
        assert!(report.analyses[0].optimization_opportunities.iter().any(|s| s.contains("memoize")));
    }

    #[test]
    fn single_self_call_is_linear() {
        let call = TypedExpr::new(
            ExprKind::Call {
                func: "fact".to_string(),
                args: vec![TypedExpr::new(
                    ExprKind::Binary { op: BinOp::Sub, left: Box::new(name("n", Type::I64)), right: Box::new(int_lit(1)) },
                    Type::I64,
                    loc(),
                )],
            },
            Type::I64,
            loc(),
        );
        let body = vec![Stmt::Return {
            value: Some(TypedExpr::new(
                ExprKind::Binary { op: BinOp::Mul, left: Box::new(name("n", Type::I64)), right: Box::new(call) },
                Type::I64,
                loc(),
            )),
            loc: loc(),
        }];
        let f = plain_function("fact", body);
        let report = report_for(f);
        assert_eq!(report.analyses[0].time_complexity, ComplexityClass::Linear);
    }
}
