//! `BoundsChecker`: classifies every subscript/slice
//! expression in a module as provably safe, provably unsafe, or unknown,
//! and reports the overall "safety percentage" `pyforge-core` surfaces in
//! `TranslationResult`.
//!
//! The three-way split is safe/unsafe/unknown rather than a
//! percentage-of-explicit count, since an unresolved bound is a distinct
//! outcome from a bound proven to fail, not just "less certain".

use crate::AnalysisContext;
use pyforge_ir::{
    AssignTarget, BinOp, CompareOp, ContainerLiteral, ExprKind, FunctionDecl, Param, SourceLocation, Stmt,
    Type, TypedExpr,
};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsSafety {
    /// The index is a `ForRange`/`ForContainer` induction variable (or a
    /// simple affine function of one) whose range is structurally bounded
    /// by the container it indexes.
    Safe,
    /// A literal or range-derived index provably outside the container's
    /// bounds, e.g. `xs[len(xs)]` or a negative literal without wraparound
    /// support.
    Unsafe,
    /// Neither provable: a parameter-derived or computed index with no
    /// known relationship to the container length.
    Unknown,
}

#[derive(Debug, Clone)]
pub struct BoundsFinding {
    pub function: String,
    pub location: SourceLocation,
    pub safety: BoundsSafety,
    pub expression: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct BoundsReport {
    pub success: bool,
    pub confidence: f64,
    pub findings: Vec<BoundsFinding>,
    pub warnings: Vec<String>,
}

impl BoundsReport {
    pub fn safe_count(&self) -> usize {
        self.findings.iter().filter(|f| f.safety == BoundsSafety::Safe).count()
    }

    pub fn unsafe_count(&self) -> usize {
        self.findings.iter().filter(|f| f.safety == BoundsSafety::Unsafe).count()
    }

    /// Fraction of subscript sites provably safe; `1.0` when there are none
    /// to check at all (an empty module is trivially fully-safe).
    pub fn safety_percentage(&self) -> f64 {
        if self.findings.is_empty() {
            return 1.0;
        }
        self.safe_count() as f64 / self.findings.len() as f64
    }
}

pub struct BoundsChecker;

impl BoundsChecker {
    pub fn analyze(ctx: &AnalysisContext<'_>) -> BoundsReport {
        let mut report = BoundsReport { success: true, confidence: 1.0, ..Default::default() };
        for f in ctx.module.functions() {
            let mut checker =
                FunctionChecker { function: &f.name, induction_vars: HashMap::new(), regions: HashMap::new() };
            checker.seed_param_regions(&f.params);
            checker.scan_body(&f.body, &mut report);
        }
        if report.findings.iter().any(|f| f.safety == BoundsSafety::Unknown) {
            report.confidence = 0.8;
        }
        report
    }
}

/// One `[lo, hi)` range a loop variable is known to stay within, keyed by
/// the container expression it was derived from (e.g. `"xs"` for
/// `for i in range(len(xs))`), so a later `xs[i]` lookup can match it back.
#[derive(Debug, Clone)]
struct InductionRange {
    container: String,
}

/// What's known about one variable's backing storage (
/// "`BoundsChecker` maintains a memory-region record per variable"): its
/// element type, whether a literal index against it can be range-checked
/// at all, and whether it's a parameter (whose length is never known
/// locally, only at the call site).
#[derive(Debug, Clone)]
struct MemoryRegion {
    size: Option<usize>,
    #[allow(dead_code)]
    element_type: Type,
    #[allow(dead_code)]
    is_parameter: bool,
}

struct FunctionChecker<'a> {
    function: &'a str,
    induction_vars: HashMap<String, InductionRange>,
    regions: HashMap<String, MemoryRegion>,
}

impl<'a> FunctionChecker<'a> {
    /// Every container-typed parameter gets a region of unknown size: its
    /// length isn't visible at this call site, but it is still a container
    /// worth tracking so a literal index against it can at least be
    /// checked against the negative-indexing rule once a size does appear
    /// (e.g. via a future interprocedural pass).
    fn seed_param_regions(&mut self, params: &[Param]) {
        for p in params {
            if let Some(element_type) = element_type_of(&p.ty) {
                self.regions
                    .insert(p.name.clone(), MemoryRegion { size: None, element_type, is_parameter: true });
            }
        }
    }

    fn scan_body(&mut self, body: &[Stmt], report: &mut BoundsReport) {
        for stmt in body {
            match stmt {
                Stmt::ForRange { var, stop, body, .. } => {
                    if let Some(container) = container_name_of_len(stop) {
                        self.induction_vars.insert(var.clone(), InductionRange { container });
                    }
                    self.scan_exprs_in(stmt, report);
                    self.scan_body(body, report);
                    self.induction_vars.remove(var);
                }
                Stmt::ForContainer { var, iter, body, .. } => {
                    if let Some(container) = container_name_of_expr(iter) {
                        self.induction_vars.insert(var.clone(), InductionRange { container });
                    }
                    self.scan_exprs_in(stmt, report);
                    self.scan_body(body, report);
                }
                Stmt::If { then_body, else_body, .. } => {
                    self.scan_exprs_in(stmt, report);
                    self.scan_body(then_body, report);
                    if let Some(else_body) = else_body {
                        self.scan_body(else_body, report);
                    }
                }
                Stmt::While { body, .. } => {
                    self.scan_exprs_in(stmt, report);
                    self.scan_body(body, report);
                }
                Stmt::Assign { target, value, loc } => {
                    self.scan_exprs_in(stmt, report);
                    match target {
                        AssignTarget::Name(name) => {
                            if let ExprKind::Container(lit) = &value.kind {
                                if let Some(element_type) = element_type_of(&value.ty) {
                                    self.regions.insert(
                                        name.clone(),
                                        MemoryRegion {
                                            size: Some(literal_len(lit)),
                                            element_type,
                                            is_parameter: false,
                                        },
                                    );
                                }
                            }
                        }
                        AssignTarget::Subscript { base, index } => {
                            self.scan_expr(base, report);
                            self.scan_expr(index, report);
                            report.findings.push(self.classify(base, index, *loc));
                        }
                        AssignTarget::DictKey { base, key } => {
                            self.scan_expr(base, report);
                            self.scan_expr(key, report);
                            report.findings.push(self.classify(base, key, *loc));
                        }
                    }
                }
                _ => self.scan_exprs_in(stmt, report),
            }
        }
    }

    fn scan_exprs_in(&mut self, stmt: &Stmt, report: &mut BoundsReport) {
        match stmt {
            Stmt::Assign { value, .. }
            | Stmt::AugAssign { value, .. }
            | Stmt::ExprStmt { value, .. } => self.scan_expr(value, report),
            Stmt::If { condition, .. } | Stmt::While { condition, .. } => self.scan_expr(condition, report),
            Stmt::ForRange { start, stop, step, .. } => {
                self.scan_expr(start, report);
                self.scan_expr(stop, report);
                self.scan_expr(step, report);
            }
            Stmt::ForContainer { iter, .. } => self.scan_expr(iter, report),
            Stmt::Return { value: Some(v), .. } => self.scan_expr(v, report),
            Stmt::Assert { condition, .. } => self.scan_expr(condition, report),
            _ => {}
        }
    }

    fn scan_expr(&mut self, expr: &TypedExpr, report: &mut BoundsReport) {
        match &expr.kind {
            ExprKind::Subscript { base, index } => {
                self.scan_expr(base, report);
                self.scan_expr(index, report);
                report.findings.push(self.classify(base, index, expr.loc));
            }
            ExprKind::Slice { base, start, stop, step } => {
                self.scan_expr(base, report);
                for s in [start, stop, step].into_iter().flatten() {
                    self.scan_expr(s, report);
                }
            }
            ExprKind::Binary { left, right, .. } | ExprKind::Compare { left, right, .. } => {
                self.scan_expr(left, report);
                self.scan_expr(right, report);
            }
            ExprKind::Unary { operand, .. } => self.scan_expr(operand, report),
            ExprKind::BoolOp { values, .. } => {
                for v in values {
                    self.scan_expr(v, report);
                }
            }
            ExprKind::Attribute { value, .. } => self.scan_expr(value, report),
            ExprKind::Call { args, .. } => {
                for a in args {
                    self.scan_expr(a, report);
                }
            }
            ExprKind::MethodCall { object, method, args } => {
                self.scan_expr(object, report);
                for a in args {
                    self.scan_expr(a, report);
                }
                if is_mutating_method(method.as_str()) {
                    if let ExprKind::Name(name) = &object.kind {
                        // The region's tracked size no longer reflects the
                        // container's contents; fall back to unknown length
                        // rather than keep classifying against a stale one.
                        self.regions.remove(name);
                    }
                }
            }
            ExprKind::Container(lit) => match lit {
                pyforge_ir::ContainerLiteral::List(elts) | pyforge_ir::ContainerLiteral::Set(elts) => {
                    for e in elts {
                        self.scan_expr(e, report);
                    }
                }
                pyforge_ir::ContainerLiteral::Dict(entries) => {
                    for (k, v) in entries {
                        self.scan_expr(k, report);
                        self.scan_expr(v, report);
                    }
                }
            },
            ExprKind::Literal(_) | ExprKind::Name(_) | ExprKind::Comprehension(_) => {}
        }
    }

    fn classify(&self, base: &TypedExpr, index: &TypedExpr, loc: SourceLocation) -> BoundsFinding {
        let expression = describe(base, index);
        let base_name = container_name_of_expr(base);
        let region = base_name.as_ref().and_then(|n| self.regions.get(n));

        if let ExprKind::Literal(pyforge_ir::Literal::Int(n)) = &index.kind {
            return match region.and_then(|r| r.size) {
                // A negative literal index is only unsafe outside Python's
                // valid negative-indexing range `[-size, -1]`;
                // within it, it's a safe backward-indexing offset.
                Some(size) => {
                    let size = size as i64;
                    if (0..size).contains(n) {
                        self.finding(loc, BoundsSafety::Safe, expression, "literal index within the container's known length")
                    } else if (-size..0).contains(n) {
                        self.finding(
                            loc,
                            BoundsSafety::Safe,
                            expression,
                            "negative literal index within Python's valid negative-indexing range",
                        )
                    } else {
                        self.finding(loc, BoundsSafety::Unsafe, expression, "literal index out of range for the container's known length")
                    }
                }
                None if *n < 0 => self.finding(
                    loc,
                    BoundsSafety::Unknown,
                    expression,
                    "negative literal index against a container of unknown length",
                ),
                None => self.finding(
                    loc,
                    BoundsSafety::Unknown,
                    expression,
                    "literal index against a container of unknown length",
                ),
            };
        }

        if let ExprKind::Name(idx_name) = &index.kind {
            if let Some(range) = self.induction_vars.get(idx_name) {
                if Some(&range.container) == base_name.as_ref() {
                    return self.finding(
                        loc,
                        BoundsSafety::Safe,
                        expression,
                        "index is this container's own loop induction variable",
                    );
                }
            }
        }

        self.finding(loc, BoundsSafety::Unknown, expression, "index has no statically known relationship to the container length")
    }

    fn finding(&self, loc: SourceLocation, safety: BoundsSafety, expression: String, reason: &str) -> BoundsFinding {
        BoundsFinding {
            function: self.function.to_string(),
            location: loc,
            safety,
            expression,
            reason: reason.to_string(),
        }
    }
}

fn describe(base: &TypedExpr, index: &TypedExpr) -> String {
    format!("{}[{}]", expr_name(base), expr_name(index))
}

fn expr_name(expr: &TypedExpr) -> String {
    match &expr.kind {
        ExprKind::Name(n) => n.clone(),
        ExprKind::Literal(pyforge_ir::Literal::Int(n)) => n.to_string(),
        _ => "<expr>".to_string(),
    }
}

fn container_name_of_expr(expr: &TypedExpr) -> Option<String> {
    match &expr.kind {
        ExprKind::Name(n) => Some(n.clone()),
        _ => None,
    }
}

/// Recognizes `range(len(xs))`/`range(0, len(xs))` as the bound-producing
/// shape a `for i in range(...)` loop needs for its induction variable to
/// be tied back to a specific container (this pass's "loop-derived
/// bound" case).
fn container_name_of_len(stop: &TypedExpr) -> Option<String> {
    match &stop.kind {
        ExprKind::Call { func, args } if func == "len" && args.len() == 1 => container_name_of_expr(&args[0]),
        _ => None,
    }
}

/// The element type a literal index ultimately reads/writes, for `List`/
/// `Set`/`Dict` values; `None` for anything else. The per-variable
/// memory-region record needs this.
fn element_type_of(ty: &Type) -> Option<Type> {
    match ty {
        Type::List(elem) | Type::Set(elem) => Some((**elem).clone()),
        Type::Dict(_, value) => Some((**value).clone()),
        _ => None,
    }
}

fn literal_len(lit: &ContainerLiteral) -> usize {
    match lit {
        ContainerLiteral::List(elts) | ContainerLiteral::Set(elts) => elts.len(),
        ContainerLiteral::Dict(entries) => entries.len(),
    }
}

/// Methods that change a tracked container's length, so a region seeded
/// from a literal's known size can no longer be trusted after one runs.
fn is_mutating_method(name: &str) -> bool {
    matches!(name, "append" | "insert" | "pop" | "remove" | "extend" | "clear")
}

#[allow(dead_code)]
fn is_increasing(op: BinOp) -> bool {
    matches!(op, BinOp::Add)
}

#[allow(dead_code)]
fn is_upper_bound(op: CompareOp) -> bool {
    matches!(op, CompareOp::Lt | CompareOp::LtEq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyforge_annotations::AnalysisLevel;
    use pyforge_ir::{Decl, FunctionProperties, Literal, Param, Type};

    fn loc() -> SourceLocation {
        SourceLocation::new(1, 0)
    }

    fn name(n: &str, ty: Type) -> TypedExpr {
        TypedExpr::new(ExprKind::Name(n.to_string()), ty, loc())
    }

    fn int_lit(n: i64) -> TypedExpr {
        TypedExpr::new(ExprKind::Literal(Literal::Int(n)), Type::I64, loc())
    }

    fn module_with(f: FunctionDecl) -> pyforge_ir::TypedModule {
        pyforge_ir::TypedModule { decls: vec![Decl::Function(f)] }
    }

    #[test]
    fn induction_variable_over_its_own_container_is_safe() {
        let xs_ty = Type::List(Box::new(Type::I64));
        let len_call = TypedExpr::new(
            ExprKind::Call { func: "len".to_string(), args: vec![name("xs", xs_ty.clone())] },
            Type::I64,
            loc(),
        );
        let index_expr = TypedExpr::new(
            ExprKind::Subscript { base: Box::new(name("xs", xs_ty.clone())), index: Box::new(name("i", Type::I64)) },
            Type::I64,
            loc(),
        );
        let body = vec![Stmt::ForRange {
            var: "i".to_string(),
            start: int_lit(0),
            stop: len_call,
            step: int_lit(1),
            body: vec![Stmt::ExprStmt { value: index_expr, loc: loc() }],
            loc: loc(),
        }];
        let f = FunctionDecl {
            name: "f".to_string(),
            params: vec![Param { name: "xs".to_string(), ty: xs_ty }],
            ret_type: Type::Void,
            body,
            properties: FunctionProperties::default(),
            annotations: Default::default(),
            loc: loc(),
        };
        let m = module_with(f);
        let ctx = AnalysisContext::new(&m, AnalysisLevel::Basic);
        let report = BoundsChecker::analyze(&ctx);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].safety, BoundsSafety::Safe);
        assert_eq!(report.safety_percentage(), 1.0);
    }

    #[test]
    fn negative_literal_index_against_unknown_length_param_is_unknown() {
        let xs_ty = Type::List(Box::new(Type::I64));
        let index_expr = TypedExpr::new(
            ExprKind::Subscript { base: Box::new(name("xs", xs_ty.clone())), index: Box::new(int_lit(-1)) },
            Type::I64,
            loc(),
        );
        let f = FunctionDecl {
            name: "g".to_string(),
            params: vec![Param { name: "xs".to_string(), ty: xs_ty }],
            ret_type: Type::Void,
            body: vec![Stmt::ExprStmt { value: index_expr, loc: loc() }],
            properties: FunctionProperties::default(),
            annotations: Default::default(),
            loc: loc(),
        };
        let m = module_with(f);
        let ctx = AnalysisContext::new(&m, AnalysisLevel::Basic);
        let report = BoundsChecker::analyze(&ctx);
        assert_eq!(report.findings[0].safety, BoundsSafety::Unknown);
    }

    #[test]
    fn negative_literal_index_within_known_length_is_safe() {
        let xs_ty = Type::List(Box::new(Type::I64));
        let init = Stmt::Assign {
            target: AssignTarget::Name("xs".to_string()),
            value: TypedExpr::new(
                ExprKind::Container(ContainerLiteral::List(vec![int_lit(1), int_lit(2), int_lit(3)])),
                xs_ty.clone(),
                loc(),
            ),
            loc: loc(),
        };
        let index_expr = TypedExpr::new(
            ExprKind::Subscript { base: Box::new(name("xs", xs_ty.clone())), index: Box::new(int_lit(-1)) },
            Type::I64,
            loc(),
        );
        let f = FunctionDecl {
            name: "g".to_string(),
            params: vec![],
            ret_type: Type::Void,
            body: vec![init, Stmt::ExprStmt { value: index_expr, loc: loc() }],
            properties: FunctionProperties::default(),
            annotations: Default::default(),
            loc: loc(),
        };
        let m = module_with(f);
        let ctx = AnalysisContext::new(&m, AnalysisLevel::Basic);
        let report = BoundsChecker::analyze(&ctx);
        let finding = report.findings.iter().find(|f| f.expression == "xs[-1]").unwrap();
        assert_eq!(finding.safety, BoundsSafety::Safe);
    }

    #[test]
    fn literal_index_past_known_length_is_unsafe() {
        let xs_ty = Type::List(Box::new(Type::I64));
        let init = Stmt::Assign {
            target: AssignTarget::Name("xs".to_string()),
            value: TypedExpr::new(
                ExprKind::Container(ContainerLiteral::List(vec![int_lit(1), int_lit(2)])),
                xs_ty.clone(),
                loc(),
            ),
            loc: loc(),
        };
        let index_expr = TypedExpr::new(
            ExprKind::Subscript { base: Box::new(name("xs", xs_ty.clone())), index: Box::new(int_lit(5)) },
            Type::I64,
            loc(),
        );
        let f = FunctionDecl {
            name: "g".to_string(),
            params: vec![],
            ret_type: Type::Void,
            body: vec![init, Stmt::ExprStmt { value: index_expr, loc: loc() }],
            properties: FunctionProperties::default(),
            annotations: Default::default(),
            loc: loc(),
        };
        let m = module_with(f);
        let ctx = AnalysisContext::new(&m, AnalysisLevel::Basic);
        let report = BoundsChecker::analyze(&ctx);
        let finding = report.findings.iter().find(|f| f.expression == "xs[5]").unwrap();
        assert_eq!(finding.safety, BoundsSafety::Unsafe);
    }

    #[test]
    fn unrelated_index_is_unknown() {
        let xs_ty = Type::List(Box::new(Type::I64));
        let index_expr = TypedExpr::new(
            ExprKind::Subscript { base: Box::new(name("xs", xs_ty.clone())), index: Box::new(name("k", Type::I64)) },
            Type::I64,
            loc(),
        );
        let f = FunctionDecl {
            name: "h".to_string(),
            params: vec![
                Param { name: "xs".to_string(), ty: xs_ty },
                Param { name: "k".to_string(), ty: Type::I64 },
            ],
            ret_type: Type::Void,
            body: vec![Stmt::ExprStmt { value: index_expr, loc: loc() }],
            properties: FunctionProperties::default(),
            annotations: Default::default(),
            loc: loc(),
        };
        let m = module_with(f);
        let ctx = AnalysisContext::new(&m, AnalysisLevel::Basic);
        let report = BoundsChecker::analyze(&ctx);
        assert_eq!(report.findings[0].safety, BoundsSafety::Unknown);
        assert!(report.confidence < 1.0);
    }

    #[test]
    fn appending_to_a_tracked_list_invalidates_its_known_length() {
        let xs_ty = Type::List(Box::new(Type::I64));
        let init = Stmt::Assign {
            target: AssignTarget::Name("xs".to_string()),
            value: TypedExpr::new(ExprKind::Container(ContainerLiteral::List(vec![])), xs_ty.clone(), loc()),
            loc: loc(),
        };
        let append_call = Stmt::ExprStmt {
            value: TypedExpr::new(
                ExprKind::MethodCall {
                    object: Box::new(name("xs", xs_ty.clone())),
                    method: "append".to_string(),
                    args: vec![int_lit(42)],
                },
                Type::Void,
                loc(),
            ),
            loc: loc(),
        };
        let index_expr = TypedExpr::new(
            ExprKind::Subscript { base: Box::new(name("xs", xs_ty.clone())), index: Box::new(int_lit(0)) },
            Type::I64,
            loc(),
        );
        let f = FunctionDecl {
            name: "g".to_string(),
            params: vec![],
            ret_type: Type::Void,
            body: vec![init, append_call, Stmt::ExprStmt { value: index_expr, loc: loc() }],
            properties: FunctionProperties::default(),
            annotations: Default::default(),
            loc: loc(),
        };
        let m = module_with(f);
        let ctx = AnalysisContext::new(&m, AnalysisLevel::Basic);
        let report = BoundsChecker::analyze(&ctx);
        let finding = report.findings.iter().find(|f| f.expression == "xs[0]").unwrap();
        assert_eq!(finding.safety, BoundsSafety::Unknown);
    }
}
