//! The SMT backend abstraction every verifier depends on: a
//! small formula algebra plus a `check` entry point, with a mock backend
//! that always answers `Unknown` when no real solver is wired in.
//!
//! A feature-gated `z3` backend is available behind a cargo feature
//! rather than a hard dependency, since it pulls in the z3 C++ library
//! at link time.

use std::fmt;

/// A symbolic integer/real/bool handle, named the way `create_int`/
/// `create_real`/`create_bool` hand them back to a verifier.
#[derive(Debug, Clone, PartialEq)]
pub enum SymValue {
    Int(String),
    Real(String),
    Bool(String),
    IntLit(i64),
    RealLit(f64),
    BoolLit(bool),
}

impl fmt::Display for SymValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymValue::Int(n) | SymValue::Real(n) | SymValue::Bool(n) => write!(f, "{n}"),
            SymValue::IntLit(n) => write!(f, "{n}"),
            SymValue::RealLit(n) => write!(f, "{n}"),
            SymValue::BoolLit(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    NotEq,
}

/// A formula over [`SymValue`]s. Kept as a plain tree rather than routed
/// straight through an FFI builder so the mock backend can `Display` a
/// formula for diagnostics without a live solver context.
#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    Value(SymValue),
    Arith(ArithOp, Box<Formula>, Box<Formula>),
    Compare(CompareOp, Box<Formula>, Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Not(Box<Formula>),
}

impl Formula {
    pub fn int(name: impl Into<String>) -> Self {
        Formula::Value(SymValue::Int(name.into()))
    }

    pub fn int_lit(n: i64) -> Self {
        Formula::Value(SymValue::IntLit(n))
    }

    pub fn lt(self, other: Formula) -> Formula {
        Formula::Compare(CompareOp::Lt, Box::new(self), Box::new(other))
    }

    pub fn lte(self, other: Formula) -> Formula {
        Formula::Compare(CompareOp::LtEq, Box::new(self), Box::new(other))
    }

    pub fn gte(self, other: Formula) -> Formula {
        Formula::Compare(CompareOp::GtEq, Box::new(self), Box::new(other))
    }

    pub fn and(self, other: Formula) -> Formula {
        match self {
            Formula::And(mut terms) => {
                terms.push(other);
                Formula::And(terms)
            }
            _ => Formula::And(vec![self, other]),
        }
    }

    pub fn not(self) -> Formula {
        Formula::Not(Box::new(self))
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Value(v) => write!(f, "{v}"),
            Formula::Arith(op, l, r) => write!(f, "({l} {} {r})", arith_symbol(*op)),
            Formula::Compare(op, l, r) => write!(f, "({l} {} {r})", compare_symbol(*op)),
            Formula::And(terms) => {
                write!(f, "(")?;
                for (i, t) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " AND ")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, ")")
            }
            Formula::Or(terms) => {
                write!(f, "(")?;
                for (i, t) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " OR ")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, ")")
            }
            Formula::Not(inner) => write!(f, "NOT ({inner})"),
        }
    }
}

fn arith_symbol(op: ArithOp) -> &'static str {
    match op {
        ArithOp::Add => "+",
        ArithOp::Sub => "-",
        ArithOp::Mul => "*",
        ArithOp::Div => "/",
    }
}

fn compare_symbol(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Lt => "<",
        CompareOp::LtEq => "<=",
        CompareOp::Gt => ">",
        CompareOp::GtEq => ">=",
        CompareOp::Eq => "==",
        CompareOp::NotEq => "!=",
    }
}

/// A satisfying assignment returned alongside a `Proven` verdict — spec
/// §4.6.1's "a concrete out-of-bounds index is emitted as counterexample".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub assignments: Vec<(String, i64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckResult {
    /// The formula is unsatisfiable under `assumptions`: whatever it
    /// negates is proven to hold.
    Proven,
    Refuted(Model),
    Unknown,
}

/// The SMT abstraction every verifier is handed: this is the
/// trait object boundary so `pyforge-core` can swap `MockBackend` for a
/// real one at construction time without the verifier modules knowing
/// which is active.
pub trait SmtBackend {
    fn check(&self, formula: &Formula, assumptions: &[Formula], timeout_ms: u64) -> CheckResult;
}

/// Always answers `Unknown`.
/// The default backend whenever the `z3` feature is off or unavailable at
/// runtime; every verifier degrades to heuristic confidence against it.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockBackend;

impl SmtBackend for MockBackend {
    fn check(&self, _formula: &Formula, _assumptions: &[Formula], _timeout_ms: u64) -> CheckResult {
        CheckResult::Unknown
    }
}

/// A tiny decidable fragment the mock tier can still resolve without a real
/// solver: formulas built entirely from integer literals. Lets unit tests
/// (and `BoundsProver`'s fully-static cases) get a real PROVEN/REFUTED
/// verdict without requiring the `z3` feature, while anything touching a
/// free variable still correctly reports `Unknown`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiteralEvalBackend;

impl SmtBackend for LiteralEvalBackend {
    fn check(&self, formula: &Formula, _assumptions: &[Formula], _timeout_ms: u64) -> CheckResult {
        match eval_closed(formula) {
            Some(true) => CheckResult::Refuted(Model::default()),
            Some(false) => CheckResult::Proven,
            None => CheckResult::Unknown,
        }
    }
}

/// Evaluates `formula` to a concrete boolean, if every leaf is a literal.
fn eval_closed(formula: &Formula) -> Option<bool> {
    match formula {
        Formula::Value(SymValue::BoolLit(b)) => Some(*b),
        Formula::Compare(op, l, r) => {
            let l = eval_int(l)?;
            let r = eval_int(r)?;
            Some(match op {
                CompareOp::Lt => l < r,
                CompareOp::LtEq => l <= r,
                CompareOp::Gt => l > r,
                CompareOp::GtEq => l >= r,
                CompareOp::Eq => l == r,
                CompareOp::NotEq => l != r,
            })
        }
        Formula::And(terms) => terms.iter().try_fold(true, |acc, t| Some(acc && eval_closed(t)?)),
        Formula::Or(terms) => terms.iter().try_fold(false, |acc, t| Some(acc || eval_closed(t)?)),
        Formula::Not(inner) => eval_closed(inner).map(|b| !b),
        _ => None,
    }
}

fn eval_int(formula: &Formula) -> Option<i64> {
    match formula {
        Formula::Value(SymValue::IntLit(n)) => Some(*n),
        Formula::Arith(op, l, r) => {
            let l = eval_int(l)?;
            let r = eval_int(r)?;
            Some(match op {
                ArithOp::Add => l + r,
                ArithOp::Sub => l - r,
                ArithOp::Mul => l * r,
                ArithOp::Div if r != 0 => l / r,
                ArithOp::Div => return None,
            })
        }
        _ => None,
    }
}

#[cfg(feature = "z3")]
pub mod z3_backend {
    //! Real-solver tier, built only with `--features z3`. `z3::Config` and
    //! `z3::Context` are process-local per `check()` call rather than
    //! pooled: verification is not a hot path and a fresh context avoids
    //! any cross-query state leaking ( "no concurrent access",
    //! applied here to SMT context reuse specifically).
    use super::{CheckResult, Formula, Model, SmtBackend};
    use std::collections::HashMap;
    use z3::ast::{Ast, Bool, Int};
    use z3::{Config, Context, Params, SatResult, Solver};

    #[derive(Debug, Default)]
    pub struct Z3Backend;

    impl SmtBackend for Z3Backend {
        fn check(&self, formula: &Formula, assumptions: &[Formula], timeout_ms: u64) -> CheckResult {
            let cfg = Config::new();
            let ctx = Context::new(&cfg);
            let solver = Solver::new(&ctx);
            let mut params = Params::new(&ctx);
            params.set_u32("timeout", timeout_ms as u32);
            solver.set_params(&params);

            let mut ints: HashMap<String, Int> = HashMap::new();
            let formula_ast = lower_bool(&ctx, formula, &mut ints);
            for a in assumptions {
                solver.assert(&lower_bool(&ctx, a, &mut ints));
            }
            solver.assert(&formula_ast);

            match solver.check() {
                SatResult::Unsat => CheckResult::Proven,
                SatResult::Sat => {
                    let model = solver.get_model().map(|m| extract_model(&m, &ints)).unwrap_or_default();
                    CheckResult::Refuted(model)
                }
                SatResult::Unknown => CheckResult::Unknown,
            }
        }
    }

    fn extract_model(model: &z3::Model<'_>, ints: &HashMap<String, Int>) -> Model {
        let mut assignments = Vec::new();
        for (name, handle) in ints {
            if let Some(value) = model.eval(handle, true).and_then(|v| v.as_i64()) {
                assignments.push((name.clone(), value));
            }
        }
        Model { assignments }
    }

    fn lower_int<'ctx>(ctx: &'ctx Context, formula: &Formula, ints: &mut HashMap<String, Int<'ctx>>) -> Int<'ctx> {
        match formula {
            Formula::Value(super::SymValue::Int(name)) => {
                ints.entry(name.clone()).or_insert_with(|| Int::new_const(ctx, name.as_str())).clone()
            }
            Formula::Value(super::SymValue::IntLit(n)) => Int::from_i64(ctx, *n),
            Formula::Arith(op, l, r) => {
                let l = lower_int(ctx, l, ints);
                let r = lower_int(ctx, r, ints);
                match op {
                    super::ArithOp::Add => &l + &r,
                    super::ArithOp::Sub => &l - &r,
                    super::ArithOp::Mul => &l * &r,
                    super::ArithOp::Div => &l / &r,
                }
            }
            _ => Int::fresh_const(ctx, "opaque"),
        }
    }

    fn lower_bool<'ctx>(ctx: &'ctx Context, formula: &Formula, ints: &mut HashMap<String, Int<'ctx>>) -> Bool<'ctx> {
        match formula {
            Formula::Value(super::SymValue::BoolLit(b)) => Bool::from_bool(ctx, *b),
            Formula::Compare(op, l, r) => {
                let l = lower_int(ctx, l, ints);
                let r = lower_int(ctx, r, ints);
                match op {
                    super::CompareOp::Lt => l.lt(&r),
                    super::CompareOp::LtEq => l.le(&r),
                    super::CompareOp::Gt => l.gt(&r),
                    super::CompareOp::GtEq => l.ge(&r),
                    super::CompareOp::Eq => l._eq(&r),
                    super::CompareOp::NotEq => l._eq(&r).not(),
                }
            }
            Formula::And(terms) => {
                let lowered: Vec<Bool> = terms.iter().map(|t| lower_bool(ctx, t, ints)).collect();
                let refs: Vec<&Bool> = lowered.iter().collect();
                Bool::and(ctx, &refs)
            }
            Formula::Or(terms) => {
                let lowered: Vec<Bool> = terms.iter().map(|t| lower_bool(ctx, t, ints)).collect();
                let refs: Vec<&Bool> = lowered.iter().collect();
                Bool::or(ctx, &refs)
            }
            Formula::Not(inner) => lower_bool(ctx, inner, ints).not(),
            _ => Bool::fresh_const(ctx, "opaque"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_backend_always_answers_unknown() {
        let backend = MockBackend;
        let formula = Formula::int_lit(1).lt(Formula::int_lit(2));
        assert_eq!(backend.check(&formula, &[], 1_000), CheckResult::Unknown);
    }

    #[test]
    fn literal_eval_backend_proves_true_comparison_unsat_on_negation() {
        let backend = LiteralEvalBackend;
        // "1 < 2" negated is unsatisfiable, i.e. "1 < 2" is proven.
        let negated = Formula::int_lit(1).lt(Formula::int_lit(2)).not();
        assert_eq!(backend.check(&negated, &[], 1_000), CheckResult::Proven);
    }

    #[test]
    fn literal_eval_backend_refutes_false_comparison_negation() {
        let backend = LiteralEvalBackend;
        let negated = Formula::int_lit(5).lt(Formula::int_lit(2)).not();
        assert_eq!(backend.check(&negated, &[], 1_000), CheckResult::Refuted(Model::default()));
    }

    #[test]
    fn free_variable_formula_is_unknown_to_the_literal_tier() {
        let backend = LiteralEvalBackend;
        let formula = Formula::int("n").lt(Formula::int_lit(0));
        assert_eq!(backend.check(&formula, &[], 1_000), CheckResult::Unknown);
    }
}
