//! `SymbolicExecutor`: bounded symbolic execution over a
//! function body, tracking path conditions and flagging division-by-zero
//! and other path-dependent faults that the purely-structural
//! [`crate::bounds::BoundsChecker`] pass can't see.
//!
//! Per-function summaries use the same enum-of-outcomes shape as the
//! other analyzer reports, with a bounded-exploration budget (default 32
//! paths per function, depth-first, oldest-path-dropped when the budget
//! is exhausted).

use crate::AnalysisContext;
use pyforge_ir::{AssignTarget, BinOp, CompareOp, ExprKind, FunctionDecl, Literal, SourceLocation, Stmt, TypedExpr};
use std::collections::HashMap;
use std::fmt;

/// An abstract value tracked along one execution path: either pinned to a
/// concrete literal (propagated through constant arithmetic) or left
/// symbolic once it depends on a parameter or a value the executor can't
/// resolve further.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolicValue {
    Int(i64),
    Bool(bool),
    /// Free variable named for diagnostics, e.g. `"n"` for a parameter or
    /// `"<expr@4:2>"` for an opaque subexpression.
    Symbolic(String),
}

impl fmt::Display for SymbolicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolicValue::Int(n) => write!(f, "{n}"),
            SymbolicValue::Bool(b) => write!(f, "{b}"),
            SymbolicValue::Symbolic(name) => write!(f, "{name}"),
        }
    }
}

/// One conjunct accumulated by a branch taken along a path, e.g. `"n > 0"`
/// or `"NOT (n > 0)"`. Kept as display strings rather than a structured
/// formula tree: `pyforge-verify`'s provers rebuild their own formulas
/// straight from the IR for the functions this pass flags, so this report
/// only needs path conditions to be human-readable, not re-solvable.
pub type PathCondition = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOutcome {
    Returns,
    /// Exceeded `max_depth` statements without reaching a `Return`; explored
    /// no further.
    DepthExceeded,
    DivisionByZero { expression: String },
}

#[derive(Debug, Clone)]
pub struct ExploredPath {
    pub conditions: Vec<PathCondition>,
    pub outcome: PathOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionSymbolicSummary {
    pub function: String,
    pub paths: Vec<ExploredPath>,
    /// True when the path budget was exhausted before every branch in the
    /// function had been explored, i.e. this summary is a sample, not a
    /// proof of exhaustiveness.
    pub truncated: bool,
}

impl FunctionSymbolicSummary {
    pub fn division_by_zero_paths(&self) -> impl Iterator<Item = &ExploredPath> {
        self.paths.iter().filter(|p| matches!(p.outcome, PathOutcome::DivisionByZero { .. }))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymbolicExecReport {
    pub success: bool,
    pub confidence: f64,
    pub warnings: Vec<String>,
    pub functions: Vec<FunctionSymbolicSummary>,
}

pub struct SymbolicExecutor {
    max_paths: usize,
    max_depth: usize,
}

impl Default for SymbolicExecutor {
    fn default() -> Self {
        // Matches the Design Notes' stated default of 32 explored paths per
        // function; depth is a generous multiple so straight-line functions
        // never hit it before `max_paths` does.
        Self { max_paths: 32, max_depth: 256 }
    }
}

impl SymbolicExecutor {
    pub fn with_budget(max_paths: usize, max_depth: usize) -> Self {
        Self { max_paths, max_depth }
    }

    pub fn analyze(ctx: &AnalysisContext<'_>) -> SymbolicExecReport {
        Self::default().run(ctx)
    }

    pub fn run(&self, ctx: &AnalysisContext<'_>) -> SymbolicExecReport {
        let mut report = SymbolicExecReport { success: true, confidence: 1.0, ..Default::default() };
        for f in ctx.module.functions() {
            let summary = self.explore_function(f);
            if summary.truncated {
                report.confidence = report.confidence.min(0.7);
                report.warnings.push(format!("{}: path exploration truncated at budget", f.name));
            }
            report.functions.push(summary);
        }
        report
    }

    fn explore_function(&self, f: &FunctionDecl) -> FunctionSymbolicSummary {
        let mut env: HashMap<String, SymbolicValue> = HashMap::new();
        for p in &f.params {
            env.insert(p.name.clone(), SymbolicValue::Symbolic(p.name.clone()));
        }
        let mut paths = Vec::new();
        let mut truncated = false;
        let mut worklist: Vec<(Vec<Stmt>, HashMap<String, SymbolicValue>, Vec<PathCondition>, usize)> =
            vec![(f.body.clone(), env, Vec::new(), 0)];

        // Explicit worklist rather than recursion, matching the iterative
        // style the other analyzer passes use for unbounded structures.
        while let Some((remaining, env, conditions, depth)) = worklist.pop() {
            if paths.len() >= self.max_paths {
                truncated = true;
                break;
            }
            match self.step(&remaining, env, conditions, depth, &mut worklist) {
                Some(path) => paths.push(path),
                None => {}
            }
        }
        if !worklist.is_empty() {
            truncated = true;
        }

        FunctionSymbolicSummary { function: f.name.clone(), paths, truncated }
    }

    /// Executes `body` from the front, evaluating straight-line statements
    /// in place and pushing a forked continuation per branch arm onto
    /// `worklist` instead of recursing. Returns `Some(path)` only when this
    /// particular frame reaches a terminal outcome (`Return`, depth limit,
    /// or a division-by-zero fault); branching statements always fork and
    /// return `None`, relying on the pushed continuations to eventually
    /// produce their own terminal frames.
    #[allow(clippy::too_many_lines)]
    fn step(
        &self,
        body: &[Stmt],
        mut env: HashMap<String, SymbolicValue>,
        conditions: Vec<PathCondition>,
        mut depth: usize,
        worklist: &mut Vec<(Vec<Stmt>, HashMap<String, SymbolicValue>, Vec<PathCondition>, usize)>,
    ) -> Option<ExploredPath> {
        for (i, stmt) in body.iter().enumerate() {
            if depth >= self.max_depth {
                return Some(ExploredPath { conditions, outcome: PathOutcome::DepthExceeded });
            }
            depth += 1;
            match stmt {
                Stmt::Assign { target, value, .. } => {
                    if let Some(fault) = check_division(value, &env) {
                        return Some(ExploredPath { conditions, outcome: fault });
                    }
                    // A subscript/dict-key write mutates a container in
                    // place; the symbolic env only tracks scalar bindings,
                    // so only a plain-name target rebinds it.
                    if let Some(name) = target.as_name() {
                        let v = eval(value, &env);
                        env.insert(name.to_string(), v);
                    }
                }
                Stmt::AugAssign { target, op, value, .. } => {
                    if let Some(fault) = check_division(value, &env) {
                        return Some(ExploredPath { conditions, outcome: fault });
                    }
                    let lhs = env.get(target).cloned().unwrap_or_else(|| SymbolicValue::Symbolic(target.clone()));
                    let rhs = eval(value, &env);
                    env.insert(target.clone(), eval_binop(*op, &lhs, &rhs));
                }
                Stmt::ExprStmt { value, .. } => {
                    if let Some(fault) = check_division(value, &env) {
                        return Some(ExploredPath { conditions, outcome: fault });
                    }
                }
                Stmt::Return { value, .. } => {
                    if let Some(v) = value {
                        if let Some(fault) = check_division(v, &env) {
                            return Some(ExploredPath { conditions, outcome: fault });
                        }
                    }
                    return Some(ExploredPath { conditions, outcome: PathOutcome::Returns });
                }
                Stmt::If { condition, then_body, else_body, .. } => {
                    let rest = body[i + 1..].to_vec();
                    let desc = describe_expr(condition, &env);

                    let mut then_branch = then_body.clone();
                    then_branch.extend(rest.clone());
                    let mut then_conditions = conditions.clone();
                    then_conditions.push(desc.clone());
                    worklist.push((then_branch, env.clone(), then_conditions, depth));

                    let mut else_branch = else_body.clone().unwrap_or_default();
                    else_branch.extend(rest);
                    let mut else_conditions = conditions;
                    else_conditions.push(format!("NOT ({desc})"));
                    worklist.push((else_branch, env, else_conditions, depth));
                    return None;
                }
                Stmt::While { condition, body: inner, .. } => {
                    // Unrolls at most once per visit to bound exploration
                    // (the Design Notes' "loop unrolling with widening"):
                    // the taken branch re-enters the loop head fresh with a
                    // widened (fully symbolic) environment so repeated
                    // iterations don't multiply the path count.
                    let rest = body[i + 1..].to_vec();
                    let desc = describe_expr(condition, &env);
                    let widened = widen(&env, inner);

                    let mut taken = inner.clone();
                    let mut loop_again = vec![stmt.clone()];
                    loop_again.extend(rest.clone());
                    taken.extend(loop_again);
                    let mut taken_conditions = conditions.clone();
                    taken_conditions.push(desc.clone());
                    worklist.push((taken, widened, taken_conditions, depth));

                    let mut exit_conditions = conditions;
                    exit_conditions.push(format!("NOT ({desc})"));
                    worklist.push((rest, env, exit_conditions, depth));
                    return None;
                }
                Stmt::ForRange { var, body: inner, .. } | Stmt::ForContainer { var, body: inner, .. } => {
                    let rest = body[i + 1..].to_vec();
                    let mut widened = widen(&env, inner);
                    widened.insert(var.clone(), SymbolicValue::Symbolic(var.clone()));
                    let mut taken = inner.clone();
                    taken.extend(rest.clone());
                    worklist.push((taken, widened, conditions.clone(), depth));
                    worklist.push((rest, env, conditions, depth));
                    return None;
                }
                Stmt::Assert { condition, .. } => {
                    if let Some(fault) = check_division(condition, &env) {
                        return Some(ExploredPath { conditions, outcome: fault });
                    }
                }
                Stmt::Break(_) | Stmt::Continue(_) | Stmt::Pass(_) => {}
            }
        }
        Some(ExploredPath { conditions, outcome: PathOutcome::Returns })
    }
}

/// Replaces every name assigned inside `body` with a fresh symbolic value,
/// so a second pass through a loop body doesn't keep stale concrete values
/// from the zeroth iteration around (widening, not full fixpoint iteration).
fn widen(env: &HashMap<String, SymbolicValue>, body: &[Stmt]) -> HashMap<String, SymbolicValue> {
    let mut widened = env.clone();
    for name in assigned_names(body) {
        widened.insert(name.clone(), SymbolicValue::Symbolic(name));
    }
    widened
}

fn assigned_names(body: &[Stmt]) -> Vec<String> {
    let mut names = Vec::new();
    for stmt in body {
        match stmt {
            Stmt::Assign { target, .. } => {
                if let Some(name) = target.as_name() {
                    names.push(name.to_string());
                }
            }
            Stmt::AugAssign { target, .. } => names.push(target.clone()),
            Stmt::If { then_body, else_body, .. } => {
                names.extend(assigned_names(then_body));
                if let Some(e) = else_body {
                    names.extend(assigned_names(e));
                }
            }
            Stmt::While { body, .. } => names.extend(assigned_names(body)),
            Stmt::ForRange { var, body, .. } | Stmt::ForContainer { var, body, .. } => {
                names.push(var.clone());
                names.extend(assigned_names(body));
            }
            _ => {}
        }
    }
    names
}

fn check_division(expr: &TypedExpr, env: &HashMap<String, SymbolicValue>) -> Option<PathOutcome> {
    match &expr.kind {
        ExprKind::Binary { op: BinOp::Div | BinOp::FloorDiv | BinOp::Mod, left, right } => {
            if let Some(fault) = check_division(left, env) {
                return Some(fault);
            }
            if let Some(fault) = check_division(right, env) {
                return Some(fault);
            }
            if matches!(eval(right, env), SymbolicValue::Int(0)) {
                return Some(PathOutcome::DivisionByZero { expression: describe_expr(right, env) });
            }
            None
        }
        ExprKind::Binary { left, right, .. } | ExprKind::Compare { left, right, .. } => {
            check_division(left, env).or_else(|| check_division(right, env))
        }
        ExprKind::Unary { operand, .. } => check_division(operand, env),
        ExprKind::BoolOp { values, .. } => values.iter().find_map(|v| check_division(v, env)),
        ExprKind::Call { args, .. } | ExprKind::MethodCall { args, .. } => {
            args.iter().find_map(|a| check_division(a, env))
        }
        ExprKind::Subscript { base, index } => check_division(base, env).or_else(|| check_division(index, env)),
        _ => None,
    }
}

fn eval(expr: &TypedExpr, env: &HashMap<String, SymbolicValue>) -> SymbolicValue {
    match &expr.kind {
        ExprKind::Literal(Literal::Int(n)) => SymbolicValue::Int(*n),
        ExprKind::Literal(Literal::Bool(b)) => SymbolicValue::Bool(*b),
        ExprKind::Name(n) => env.get(n).cloned().unwrap_or_else(|| SymbolicValue::Symbolic(n.clone())),
        ExprKind::Binary { op, left, right } => eval_binop(*op, &eval(left, env), &eval(right, env)),
        ExprKind::Unary { op: pyforge_ir::UnaryOp::Neg, operand } => match eval(operand, env) {
            SymbolicValue::Int(n) => SymbolicValue::Int(-n),
            other => SymbolicValue::Symbolic(other.to_string()),
        },
        _ => SymbolicValue::Symbolic(describe_expr(expr, env)),
    }
}

fn eval_binop(op: BinOp, left: &SymbolicValue, right: &SymbolicValue) -> SymbolicValue {
    if let (SymbolicValue::Int(a), SymbolicValue::Int(b)) = (left, right) {
        match op {
            BinOp::Add => return SymbolicValue::Int(a.wrapping_add(*b)),
            BinOp::Sub => return SymbolicValue::Int(a.wrapping_sub(*b)),
            BinOp::Mul => return SymbolicValue::Int(a.wrapping_mul(*b)),
            BinOp::Div | BinOp::FloorDiv if *b != 0 => return SymbolicValue::Int(a / b),
            BinOp::Mod if *b != 0 => return SymbolicValue::Int(a % b),
            _ => {}
        }
    }
    SymbolicValue::Symbolic(format!("({left} {} {right})", op_symbol(op)))
}

fn op_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::FloorDiv => "//",
        BinOp::Mod => "%",
        BinOp::Pow => "**",
        BinOp::BitAnd => "&",
        BinOp::BitOr => "|",
        BinOp::BitXor => "^",
        BinOp::LShift => "<<",
        BinOp::RShift => ">>",
    }
}

fn compare_symbol(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "==",
        CompareOp::NotEq => "!=",
        CompareOp::Lt => "<",
        CompareOp::LtEq => "<=",
        CompareOp::Gt => ">",
        CompareOp::GtEq => ">=",
        CompareOp::In => "in",
        CompareOp::NotIn => "not in",
    }
}

fn describe_expr(expr: &TypedExpr, env: &HashMap<String, SymbolicValue>) -> String {
    match &expr.kind {
        ExprKind::Name(n) => env.get(n).map(SymbolicValue::to_string).unwrap_or_else(|| n.clone()),
        ExprKind::Literal(Literal::Int(n)) => n.to_string(),
        ExprKind::Literal(Literal::Bool(b)) => b.to_string(),
        ExprKind::Compare { op, left, right } => {
            format!("{} {} {}", describe_expr(left, env), compare_symbol(*op), describe_expr(right, env))
        }
        ExprKind::Binary { op, left, right } => {
            format!("({} {} {})", describe_expr(left, env), op_symbol(*op), describe_expr(right, env))
        }
        _ => "<expr>".to_string(),
    }
}

#[allow(dead_code)]
fn synthetic_loc() -> SourceLocation {
    SourceLocation::synthetic()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyforge_annotations::AnalysisLevel;
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

    #[test]
    fn flags_division_by_literal_zero() {
        let div = TypedExpr::new(
            ExprKind::Binary { op: BinOp::Div, left: Box::new(name("n")), right: Box::new(int_lit(0)) },
            Type::I64,
            loc(),
        );
        let f = FunctionDecl {
            name: "divide".to_string(),
            params: vec![Param { name: "n".to_string(), ty: Type::I64 }],
            ret_type: Type::I64,
            body: vec![Stmt::Return { value: Some(div), loc: loc() }],
            properties: FunctionProperties::default(),
            annotations: Default::default(),
            loc: loc(),
        };
        let m = pyforge_ir::TypedModule { decls: vec![Decl::Function(f)] };
        let ctx = AnalysisContext::new(&m, AnalysisLevel::Basic);
        let report = SymbolicExecutor::analyze(&ctx);
        let summary = &report.functions[0];
        assert_eq!(summary.division_by_zero_paths().count(), 1);
    }

    #[test]
    fn straight_line_function_returns_single_path() {
        let f = FunctionDecl {
            name: "identity".to_string(),
            params: vec![Param { name: "n".to_string(), ty: Type::I64 }],
            ret_type: Type::I64,
            body: vec![Stmt::Return { value: Some(name("n")), loc: loc() }],
            properties: FunctionProperties::default(),
            annotations: Default::default(),
            loc: loc(),
        };
        let m = pyforge_ir::TypedModule { decls: vec![Decl::Function(f)] };
        let ctx = AnalysisContext::new(&m, AnalysisLevel::Basic);
        let report = SymbolicExecutor::analyze(&ctx);
        assert_eq!(report.functions[0].paths.len(), 1);
        assert_eq!(report.functions[0].paths[0].outcome, PathOutcome::Returns);
    }

    #[test]
    fn branching_function_explores_both_sides() {
        let cond = TypedExpr::new(
            ExprKind::Compare { op: CompareOp::Gt, left: Box::new(name("n")), right: Box::new(int_lit(0)) },
            Type::Bool,
            loc(),
        );
        let f = FunctionDecl {
            name: "sign".to_string(),
            params: vec![Param { name: "n".to_string(), ty: Type::I64 }],
            ret_type: Type::I64,
            body: vec![Stmt::If {
                condition: cond,
                then_body: vec![Stmt::Return { value: Some(int_lit(1)), loc: loc() }],
                else_body: Some(vec![Stmt::Return { value: Some(int_lit(-1)), loc: loc() }]),
                loc: loc(),
            }],
            properties: FunctionProperties::default(),
            annotations: Default::default(),
            loc: loc(),
        };
        let m = pyforge_ir::TypedModule { decls: vec![Decl::Function(f)] };
        let ctx = AnalysisContext::new(&m, AnalysisLevel::Basic);
        let report = SymbolicExecutor::analyze(&ctx);
        assert_eq!(report.functions[0].paths.len(), 2);
    }
}
