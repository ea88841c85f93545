//! Computes each function's [`FunctionProperties`] ahead of the
//! intelligence layer, since `FunctionSpecializer`'s memoization candidates
//! and `pyforge-verify::performance_analyzer`'s complexity classification
//! both read `is_pure`/`always_terminates`/`is_recursive` off the IR rather
//! than recomputing them.
//!
//! This side-effect/termination walk runs right after AST bridging;
//! `is_recursive` is deliberately left to the caller, who has already run
//! [`pyforge_analyzer::CallGraphAnalyzer`], since that's the only pass with
//! the call-graph data needed to classify recursion.

use pyforge_ir::{Decl, ExprKind, FunctionDecl, Stmt, TypedExpr, TypedModule};

pub struct PropertyAnalyzer;

impl PropertyAnalyzer {
    /// Fills in `is_pure` and `always_terminates` for every function in
    /// `module`. `is_recursive` is left at its prior value -- callers set
    /// it from [`pyforge_analyzer::CallGraphReport::recursive_functions`]
    /// once the call graph is available.
    pub fn compute_module(module: &mut TypedModule) {
        for decl in &mut module.decls {
            if let Decl::Function(f) = decl {
                Self::compute_function(f);
            }
        }
    }

    fn compute_function(f: &mut FunctionDecl) {
        f.properties.is_pure = is_pure(&f.body);
        f.properties.always_terminates = always_terminates(&f.body);
    }

    /// Applies `recursive_functions` (as produced by `CallGraphAnalyzer`) to
    /// every function's `is_recursive` flag.
    pub fn apply_recursion(module: &mut TypedModule, recursive_functions: &[String]) {
        for decl in &mut module.decls {
            if let Decl::Function(f) = decl {
                f.properties.is_recursive = recursive_functions.iter().any(|name| name == &f.name);
            }
        }
    }
}

/// Whitelist of builtins known never to mutate external state
/// (`len`/`max`/`min`/`sum`/`abs`); any other call
/// is conservatively treated as a possible side effect. `is_pure` is meant
/// to gate memoization, so a false negative here only loses an
/// optimization opportunity, never correctness.
fn is_pure(body: &[Stmt]) -> bool {
    !body.iter().any(stmt_has_side_effects)
}

fn stmt_has_side_effects(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::ExprStmt { value, .. } => expr_has_side_effects(value),
        Stmt::Assign { value, .. } | Stmt::AugAssign { value, .. } => expr_has_side_effects(value),
        Stmt::If { condition, then_body, else_body, .. } => {
            expr_has_side_effects(condition)
                || then_body.iter().any(stmt_has_side_effects)
                || else_body.as_ref().is_some_and(|b| b.iter().any(stmt_has_side_effects))
        }
        Stmt::While { condition, body, .. } => {
            expr_has_side_effects(condition) || body.iter().any(stmt_has_side_effects)
        }
        Stmt::ForRange { start, stop, step, body, .. } => {
            expr_has_side_effects(start)
                || expr_has_side_effects(stop)
                || expr_has_side_effects(step)
                || body.iter().any(stmt_has_side_effects)
        }
        Stmt::ForContainer { iter, body, .. } => {
            expr_has_side_effects(iter) || body.iter().any(stmt_has_side_effects)
        }
        Stmt::Return { value: Some(expr), .. } => expr_has_side_effects(expr),
        _ => false,
    }
}

fn expr_has_side_effects(expr: &TypedExpr) -> bool {
    match &expr.kind {
        ExprKind::Call { func, args } => {
            !matches!(func.as_str(), "len" | "max" | "min" | "sum" | "abs") || args.iter().any(expr_has_side_effects)
        }
        // Any method call is treated as a mutation through HPCL (append,
        // insert, and friends all mutate their receiver); a read-only
        // accessor method would need its own whitelist, which the
        // supported container API doesn't currently have reason to need.
        ExprKind::MethodCall { .. } => true,
        ExprKind::Binary { left, right, .. } => expr_has_side_effects(left) || expr_has_side_effects(right),
        ExprKind::Unary { operand, .. } => expr_has_side_effects(operand),
        ExprKind::Compare { left, right, .. } => expr_has_side_effects(left) || expr_has_side_effects(right),
        ExprKind::BoolOp { values, .. } => values.iter().any(expr_has_side_effects),
        ExprKind::Subscript { base, index } => expr_has_side_effects(base) || expr_has_side_effects(index),
        ExprKind::Attribute { value, .. } => expr_has_side_effects(value),
        ExprKind::Slice { base, start, stop, step } => {
            expr_has_side_effects(base)
                || start.as_deref().is_some_and(expr_has_side_effects)
                || stop.as_deref().is_some_and(expr_has_side_effects)
                || step.as_deref().is_some_and(expr_has_side_effects)
        }
        _ => false,
    }
}

/// Conservative first-pass termination check:
/// any `while` loop forfeits the guarantee outright, and a `for` loop only
/// keeps it when the iterable is a container literal or an obviously
/// finite builtin call.
fn always_terminates(body: &[Stmt]) -> bool {
    body.iter().all(stmt_always_terminates)
}

fn stmt_always_terminates(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::While { .. } => false,
        Stmt::ForRange { .. } => true,
        Stmt::ForContainer { iter, body, .. } => is_finite_iterable(iter) && always_terminates(body),
        Stmt::If { then_body, else_body, .. } => {
            always_terminates(then_body) && else_body.as_ref().is_none_or(|b| always_terminates(b))
        }
        _ => true,
    }
}

fn is_finite_iterable(expr: &TypedExpr) -> bool {
    match &expr.kind {
        ExprKind::Container(_) => true,
        ExprKind::Call { func, .. } => matches!(func.as_str(), "range" | "enumerate" | "zip"),
        ExprKind::Name(_) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{convert_module, parse_source};
    use crate::ir_builder::IrBuilder;
    use crate::type_inference::TypeInferencer;

    fn build(source: &str) -> TypedModule {
        let module = parse_source(source, "<test>").unwrap();
        let mut m = convert_module(module, source).unwrap();
        TypeInferencer::infer_module(&mut m).unwrap();
        IrBuilder::normalize_module(&mut m).unwrap();
        m
    }

    #[test]
    fn arithmetic_only_function_is_pure_and_terminating() {
        let mut m = build("def add(a: int, b: int) -> int:\n    return a + b\n");
        PropertyAnalyzer::compute_module(&mut m);
        let f = m.find_function("add").unwrap();
        assert!(f.properties.is_pure);
        assert!(f.properties.always_terminates);
    }

    #[test]
    fn while_loop_forfeits_the_termination_guarantee() {
        let mut m = build("def f(n: int) -> int:\n    while n > 0:\n        n = n - 1\n    return n\n");
        PropertyAnalyzer::compute_module(&mut m);
        let f = m.find_function("f").unwrap();
        assert!(!f.properties.always_terminates);
    }

    #[test]
    fn for_loop_over_range_is_terminating() {
        let mut m = build("def f(n: int) -> int:\n    total = 0\n    for i in range(n):\n        total = total + i\n    return total\n");
        PropertyAnalyzer::compute_module(&mut m);
        let f = m.find_function("f").unwrap();
        assert!(f.properties.always_terminates);
    }

    #[test]
    fn method_call_makes_a_function_impure() {
        let mut m = build(
            "def f() -> int:\n    xs = [x for x in range(3)]\n    return 0\n",
        );
        PropertyAnalyzer::compute_module(&mut m);
        let f = m.find_function("f").unwrap();
        assert!(!f.properties.is_pure);
    }

    #[test]
    fn whitelisted_builtin_call_stays_pure() {
        let mut m = build("def f(xs: list) -> int:\n    return len(xs)\n");
        PropertyAnalyzer::compute_module(&mut m);
        let f = m.find_function("f").unwrap();
        assert!(f.properties.is_pure);
    }

    #[test]
    fn apply_recursion_sets_the_flag_from_an_external_name_list() {
        let mut m = build("def f(n: int) -> int:\n    return f(n - 1)\n");
        PropertyAnalyzer::apply_recursion(&mut m, &["f".to_string()]);
        let f = m.find_function("f").unwrap();
        assert!(f.properties.is_recursive);
    }
}
