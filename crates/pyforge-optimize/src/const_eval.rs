//! `CompileTimeEvaluator`: constant folding, algebraic
//! identity simplification, and dead-branch elimination over a function
//! body, applied in three order-sensitive rule groups.
//!
//! Follows a fold-then-simplify pass ordering over the closed Typed IR
//! expression set, restricted to operations that cannot trap (division by
//! zero / negative sqrt are never folded).

use pyforge_ir::{BinOp, ContainerLiteral, Decl, ExprKind, FunctionDecl, Literal, Stmt, TypedExpr, TypedModule, UnaryOp};

/// One constant-folding or simplification rewrite the evaluator found
/// safe to apply, recorded for the report independently of whether
/// [`CompileTimeEvaluator::apply`] goes on to realize it: `analyze` never
/// mutates the IR it's handed, so a caller that only wants the report (or
/// wants to realize it at a different point in the pipeline) can call it
/// alone.
#[derive(Debug, Clone)]
pub struct FoldedExpression {
    pub function: String,
    pub before: String,
    pub after: String,
    pub rule: FoldRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldRule {
    ConstantFold,
    IdentitySimplify,
    DeadBranchElimination,
}

#[derive(Debug, Clone, Default)]
pub struct ConstEvalReport {
    pub success: bool,
    pub performance_gain_estimate: f64,
    pub transformations: Vec<String>,
    pub findings: Vec<FoldedExpression>,
}

pub struct CompileTimeEvaluator;

impl CompileTimeEvaluator {
    pub fn analyze(module: &TypedModule) -> ConstEvalReport {
        let mut report = ConstEvalReport { success: true, ..Default::default() };
        for f in module.functions() {
            Self::scan_function(f, &mut report);
        }
        // Sum of operations eliminated, weighted by a conservative
        // per-operation cost: one eliminated operation is a 2% speedup.
        report.performance_gain_estimate = 1.0 + 0.02 * report.findings.len() as f64;
        for finding in &report.findings {
            report.transformations.push(format!(
                "{}: {} -> {} ({:?})",
                finding.function, finding.before, finding.after, finding.rule
            ));
        }
        report
    }

    fn scan_function(f: &FunctionDecl, report: &mut ConstEvalReport) {
        scan_body(&f.name, &f.body, report);
    }

    /// Realizes every constant-fold and identity-simplify rewrite `analyze`
    /// would report directly into `module`'s function bodies. Dead-branch
    /// elimination is left for the report only: dropping a branch reshapes
    /// a statement list rather than rewriting an expression in place, and
    /// nothing downstream needs that restructuring to emit correct C.
    pub fn apply(module: &mut TypedModule) {
        for decl in &mut module.decls {
            if let Decl::Function(f) = decl {
                apply_body(&mut f.body);
            }
        }
    }
}

fn apply_body(body: &mut [Stmt]) {
    for stmt in body.iter_mut() {
        match stmt {
            Stmt::Assign { value, .. } | Stmt::AugAssign { value, .. } | Stmt::ExprStmt { value, .. } => {
                apply_expr(value);
            }
            Stmt::If { condition, then_body, else_body, .. } => {
                apply_expr(condition);
                apply_body(then_body);
                if let Some(else_body) = else_body {
                    apply_body(else_body);
                }
            }
            Stmt::While { condition, body, .. } => {
                apply_expr(condition);
                apply_body(body);
            }
            Stmt::ForRange { start, stop, step, body, .. } => {
                apply_expr(start);
                apply_expr(stop);
                apply_expr(step);
                apply_body(body);
            }
            Stmt::ForContainer { iter, body, .. } => {
                apply_expr(iter);
                apply_body(body);
            }
            Stmt::Return { value: Some(v), .. } => apply_expr(v),
            Stmt::Assert { condition, message, .. } => {
                apply_expr(condition);
                if let Some(m) = message {
                    apply_expr(m);
                }
            }
            Stmt::Return { value: None, .. } | Stmt::Break(_) | Stmt::Continue(_) | Stmt::Pass(_) => {}
        }
    }
}

fn apply_expr(expr: &mut TypedExpr) {
    match &mut expr.kind {
        ExprKind::Binary { left, right, .. } | ExprKind::Compare { left, right, .. } => {
            apply_expr(left);
            apply_expr(right);
        }
        ExprKind::Unary { operand, .. } => apply_expr(operand),
        ExprKind::BoolOp { values, .. } => {
            for v in values {
                apply_expr(v);
            }
        }
        ExprKind::Call { args, .. } | ExprKind::MethodCall { args, .. } => {
            for a in args {
                apply_expr(a);
            }
        }
        ExprKind::Subscript { base, index } => {
            apply_expr(base);
            apply_expr(index);
        }
        ExprKind::Slice { base, start, stop, step } => {
            apply_expr(base);
            for s in [start, stop, step].iter_mut().flatten() {
                apply_expr(s);
            }
        }
        ExprKind::Attribute { value, .. } => apply_expr(value),
        ExprKind::Container(lit) => match lit {
            ContainerLiteral::List(elts) | ContainerLiteral::Set(elts) => {
                for e in elts {
                    apply_expr(e);
                }
            }
            ContainerLiteral::Dict(entries) => {
                for (k, v) in entries {
                    apply_expr(k);
                    apply_expr(v);
                }
            }
        },
        ExprKind::Literal(_) | ExprKind::Name(_) | ExprKind::Comprehension(_) => {}
    }
    if let Some(folded) = fold(expr) {
        *expr = folded;
    }
}

fn scan_body(function: &str, body: &[Stmt], report: &mut ConstEvalReport) {
    for stmt in body {
        match stmt {
            Stmt::Assign { value, .. } | Stmt::AugAssign { value, .. } | Stmt::ExprStmt { value, .. } => {
                scan_expr(function, value, report);
            }
            Stmt::If { condition, then_body, else_body, .. } => {
                scan_expr(function, condition, report);
                if let Some(folded) = fold(condition) {
                    if let ExprKind::Literal(Literal::Bool(taken)) = folded.kind {
                        let surviving = if taken { "then" } else { "else" };
                        report.findings.push(FoldedExpression {
                            function: function.to_string(),
                            before: describe(condition),
                            after: format!("<{surviving} branch only>"),
                            rule: FoldRule::DeadBranchElimination,
                        });
                    }
                }
                scan_body(function, then_body, report);
                if let Some(else_body) = else_body {
                    scan_body(function, else_body, report);
                }
            }
            Stmt::While { condition, body, .. } => {
                scan_expr(function, condition, report);
                scan_body(function, body, report);
            }
            Stmt::ForRange { start, stop, step, body, .. } => {
                scan_expr(function, start, report);
                scan_expr(function, stop, report);
                scan_expr(function, step, report);
                scan_body(function, body, report);
            }
            Stmt::ForContainer { iter, body, .. } => {
                scan_expr(function, iter, report);
                scan_body(function, body, report);
            }
            Stmt::Return { value: Some(v), .. } => scan_expr(function, v, report),
            Stmt::Assert { condition, message, .. } => {
                scan_expr(function, condition, report);
                if let Some(m) = message {
                    scan_expr(function, m, report);
                }
            }
            Stmt::Return { value: None, .. } | Stmt::Break(_) | Stmt::Continue(_) | Stmt::Pass(_) => {}
        }
    }
}

fn scan_expr(function: &str, expr: &TypedExpr, report: &mut ConstEvalReport) {
    if let Some(folded) = fold(expr) {
        if describe(&folded) != describe(expr) {
            let rule = if expr.is_constant() { FoldRule::ConstantFold } else { FoldRule::IdentitySimplify };
            report.findings.push(FoldedExpression {
                function: function.to_string(),
                before: describe(expr),
                after: describe(&folded),
                rule,
            });
        }
    }
    match &expr.kind {
        ExprKind::Binary { left, right, .. } | ExprKind::Compare { left, right, .. } => {
            scan_expr(function, left, report);
            scan_expr(function, right, report);
        }
        ExprKind::Unary { operand, .. } => scan_expr(function, operand, report),
        ExprKind::BoolOp { values, .. } => {
            for v in values {
                scan_expr(function, v, report);
            }
        }
        ExprKind::Call { args, .. } | ExprKind::MethodCall { args, .. } => {
            for a in args {
                scan_expr(function, a, report);
            }
        }
        ExprKind::Subscript { base, index } => {
            scan_expr(function, base, report);
            scan_expr(function, index, report);
        }
        _ => {}
    }
}

/// Rule (i)+(ii): folds a constant sub-expression to its literal value, or
/// simplifies an algebraic identity, whichever applies; `None` if neither
/// rule changes the expression. Never folds a trapping operation (division
/// or modulo by a literal zero): the caller is left with the original
/// expression so `pyforge-verify`'s bounds/correctness provers still see it.
fn fold(expr: &TypedExpr) -> Option<TypedExpr> {
    match &expr.kind {
        ExprKind::Binary { op, left, right } => {
            let l = fold(left).unwrap_or_else(|| (**left).clone());
            let r = fold(right).unwrap_or_else(|| (**right).clone());
            if let Some(simplified) = simplify_identity(*op, &l, &r, expr) {
                return Some(simplified);
            }
            fold_constant_binary(*op, &l, &r, expr)
        }
        ExprKind::Unary { op, operand } => {
            let inner = fold(operand).unwrap_or_else(|| (**operand).clone());
            if let ExprKind::Unary { op: UnaryOp::Not, operand: inner_operand } = &inner.kind {
                // not not x -> x (rule ii)
                return Some((**inner_operand).clone());
            }
            fold_constant_unary(*op, &inner, expr)
        }
        ExprKind::BoolOp { op, values } => {
            let folded: Vec<TypedExpr> = values.iter().map(|v| fold(v).unwrap_or_else(|| v.clone())).collect();
            fold_bool_op(*op, &folded, expr)
        }
        _ => None,
    }
}

fn fold_constant_binary(op: BinOp, left: &TypedExpr, right: &TypedExpr, orig: &TypedExpr) -> Option<TypedExpr> {
    let (ExprKind::Literal(lv), ExprKind::Literal(rv)) = (&left.kind, &right.kind) else {
        return None;
    };
    match (lv, rv) {
        (Literal::Int(a), Literal::Int(b)) => {
            let result = match op {
                BinOp::Add => a.checked_add(*b),
                BinOp::Sub => a.checked_sub(*b),
                BinOp::Mul => a.checked_mul(*b),
                BinOp::Div | BinOp::FloorDiv if *b != 0 => a.checked_div(*b),
                BinOp::Mod if *b != 0 => a.checked_rem(*b),
                BinOp::BitAnd => Some(a & b),
                BinOp::BitOr => Some(a | b),
                BinOp::BitXor => Some(a ^ b),
                BinOp::LShift if *b >= 0 && *b < 64 => Some(a << b),
                BinOp::RShift if *b >= 0 && *b < 64 => Some(a >> b),
                _ => None,
            }?;
            Some(TypedExpr::new(ExprKind::Literal(Literal::Int(result)), orig.ty.clone(), orig.loc))
        }
        (Literal::Str(a), Literal::Str(b)) if op == BinOp::Add => {
            Some(TypedExpr::new(ExprKind::Literal(Literal::Str(format!("{a}{b}"))), orig.ty.clone(), orig.loc))
        }
        _ => None,
    }
}

fn fold_constant_unary(op: UnaryOp, operand: &TypedExpr, orig: &TypedExpr) -> Option<TypedExpr> {
    let ExprKind::Literal(lit) = &operand.kind else { return None };
    let folded = match (op, lit) {
        (UnaryOp::Neg, Literal::Int(n)) => Literal::Int(-n),
        (UnaryOp::Neg, Literal::Float(f)) => Literal::Float(-f),
        (UnaryOp::Not, Literal::Bool(b)) => Literal::Bool(!b),
        (UnaryOp::BitNot, Literal::Int(n)) => Literal::Int(!n),
        (UnaryOp::Pos, lit) => lit.clone(),
        _ => return None,
    };
    Some(TypedExpr::new(ExprKind::Literal(folded), orig.ty.clone(), orig.loc))
}

fn fold_bool_op(op: pyforge_ir::BoolOp, values: &[TypedExpr], orig: &TypedExpr) -> Option<TypedExpr> {
    use pyforge_ir::BoolOp;
    if values.len() == 1 {
        return Some(values[0].clone());
    }
    // `x and true -> x`, `x or false -> x` (rule ii), applied left-to-right.
    let identity = match op {
        BoolOp::And => Literal::Bool(true),
        BoolOp::Or => Literal::Bool(false),
    };
    let filtered: Vec<TypedExpr> = values
        .iter()
        .filter(|v| !matches!(&v.kind, ExprKind::Literal(l) if *l == identity))
        .cloned()
        .collect();
    if filtered.len() == values.len() {
        return all_literal_bools(values).map(|bools| {
            let result = match op {
                BoolOp::And => bools.iter().all(|b| *b),
                BoolOp::Or => bools.iter().any(|b| *b),
            };
            TypedExpr::new(ExprKind::Literal(Literal::Bool(result)), orig.ty.clone(), orig.loc)
        });
    }
    if filtered.is_empty() {
        return Some(TypedExpr::new(ExprKind::Literal(identity), orig.ty.clone(), orig.loc));
    }
    if filtered.len() == 1 {
        return Some(filtered.into_iter().next().unwrap());
    }
    Some(TypedExpr::new(ExprKind::BoolOp { op, values: filtered }, orig.ty.clone(), orig.loc))
}

fn all_literal_bools(values: &[TypedExpr]) -> Option<Vec<bool>> {
    values
        .iter()
        .map(|v| match &v.kind {
            ExprKind::Literal(Literal::Bool(b)) => Some(*b),
            _ => None,
        })
        .collect()
}

/// Rule (ii): `x+0`, `x*1`, `x*0`, `0+x`, `1*x` style identities. Returns
/// `None` when neither side is the operation's identity/annihilator.
fn simplify_identity(op: BinOp, left: &TypedExpr, right: &TypedExpr, orig: &TypedExpr) -> Option<TypedExpr> {
    let zero = matches!(&right.kind, ExprKind::Literal(Literal::Int(0)));
    let one = matches!(&right.kind, ExprKind::Literal(Literal::Int(1)));
    let left_zero = matches!(&left.kind, ExprKind::Literal(Literal::Int(0)));
    let left_one = matches!(&left.kind, ExprKind::Literal(Literal::Int(1)));

    match op {
        BinOp::Add if zero => Some(left.clone()),
        BinOp::Add if left_zero => Some(right.clone()),
        BinOp::Sub if zero => Some(left.clone()),
        BinOp::Mul if one || left_one => Some(if one { left.clone() } else { right.clone() }),
        BinOp::Mul if zero || left_zero => {
            Some(TypedExpr::new(ExprKind::Literal(Literal::Int(0)), orig.ty.clone(), orig.loc))
        }
        _ => None,
    }
}

fn describe(expr: &TypedExpr) -> String {
    match &expr.kind {
        ExprKind::Literal(Literal::Int(n)) => n.to_string(),
        ExprKind::Literal(Literal::Bool(b)) => b.to_string(),
        ExprKind::Literal(Literal::Float(f)) => f.to_string(),
        ExprKind::Literal(Literal::Str(s)) => format!("{s:?}"),
        ExprKind::Literal(Literal::Null) => "null".to_string(),
        ExprKind::Name(n) => n.clone(),
        _ => "<expr>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyforge_ir::{Decl, FunctionProperties, Param, SourceLocation, Type};

    fn loc() -> SourceLocation {
        SourceLocation::new(1, 0)
    }

    fn int_lit(n: i64) -> TypedExpr {
        TypedExpr::new(ExprKind::Literal(Literal::Int(n)), Type::I64, loc())
    }

    fn func(body: Vec<Stmt>) -> TypedModule {
        let f = FunctionDecl {
            name: "f".to_string(),
            params: vec![Param { name: "n".to_string(), ty: Type::I64 }],
            ret_type: Type::I64,
            body,
            properties: FunctionProperties::default(),
            annotations: Default::default(),
            loc: loc(),
        };
        TypedModule { decls: vec![Decl::Function(f)] }
    }

    #[test]
    fn folds_constant_addition() {
        let sum = TypedExpr::new(
            ExprKind::Binary { op: BinOp::Add, left: Box::new(int_lit(2)), right: Box::new(int_lit(3)) },
            Type::I64,
            loc(),
        );
        let m = func(vec![Stmt::Return { value: Some(sum), loc: loc() }]);
        let report = CompileTimeEvaluator::analyze(&m);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].after, "5");
    }

    #[test]
    fn simplifies_add_zero_identity() {
        let name = TypedExpr::new(ExprKind::Name("n".to_string()), Type::I64, loc());
        let expr = TypedExpr::new(
            ExprKind::Binary { op: BinOp::Add, left: Box::new(name), right: Box::new(int_lit(0)) },
            Type::I64,
            loc(),
        );
        let m = func(vec![Stmt::Return { value: Some(expr), loc: loc() }]);
        let report = CompileTimeEvaluator::analyze(&m);
        assert_eq!(report.findings[0].rule, FoldRule::IdentitySimplify);
        assert_eq!(report.findings[0].after, "n");
    }

    #[test]
    fn does_not_fold_division_by_literal_zero() {
        let div = TypedExpr::new(
            ExprKind::Binary { op: BinOp::Div, left: Box::new(int_lit(4)), right: Box::new(int_lit(0)) },
            Type::I64,
            loc(),
        );
        let m = func(vec![Stmt::Return { value: Some(div), loc: loc() }]);
        let report = CompileTimeEvaluator::analyze(&m);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn apply_realizes_a_folded_constant_expression_into_the_module() {
        let sum = TypedExpr::new(
            ExprKind::Binary {
                op: BinOp::Add,
                left: Box::new(int_lit(2)),
                right: Box::new(TypedExpr::new(
                    ExprKind::Binary { op: BinOp::Mul, left: Box::new(int_lit(3)), right: Box::new(int_lit(4)) },
                    Type::I64,
                    loc(),
                )),
            },
            Type::I64,
            loc(),
        );
        let mut m = func(vec![Stmt::Return { value: Some(sum), loc: loc() }]);
        CompileTimeEvaluator::apply(&mut m);
        let f = m.find_function("f").unwrap();
        let Stmt::Return { value: Some(v), .. } = &f.body[0] else { panic!() };
        assert_eq!(v.kind, ExprKind::Literal(Literal::Int(14)));
    }
}
